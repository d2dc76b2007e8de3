pub mod hit_test;
pub mod lanes;
pub mod ruler;
