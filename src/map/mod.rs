mod highlight;
mod pins;
mod selection;
mod view;
mod viewport;

pub use highlight::{HighlightLayer, HIGHLIGHT_FILL, HIGHLIGHT_OUTLINE};
pub use selection::{Affordance, Route, Selection};
pub use view::{MapView, Notice, NoticeLevel};
pub use viewport::{CursorStyle, HoverState, Viewport, DEFAULT_MIN_ZOOM};
