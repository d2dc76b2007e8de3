pub mod project;
pub mod session;

pub use project::{Project, ProjectError};
pub use session::TimelineSession;
