pub mod commands;
pub mod shared_str;
pub mod theme;
pub mod timeline;
pub mod types;

pub use commands::{RenderCommand, TextAlign};
pub use shared_str::SharedStr;
pub use theme::ThemeToken;
pub use timeline::{Character, TimeRange, TimeValue, TimelineEvent};
pub use types::{Point, Rect, Viewport};
