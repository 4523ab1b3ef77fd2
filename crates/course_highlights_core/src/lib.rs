pub mod compositor;
pub mod domain;
pub mod offsets;
pub mod ports;
pub mod view;

pub use compositor::{composite, render_plain, Segment, Segments};
pub use domain::{
    Chapter, Course, CurrentUser, FieldKey, FieldKeyError, FieldKind, Highlight,
    NewHighlight, Role, Subheading, User, UserCredentials, DEFAULT_HIGHLIGHT_COLOR,
};
pub use offsets::{resolve, NodePosition, RenderedField, ResolvedRange, Selection};
pub use ports::{CourseRepository, HighlightStore, PortError, PortResult, UserRepository};
pub use view::HighlightView;
