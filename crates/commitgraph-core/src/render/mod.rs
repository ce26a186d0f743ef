pub mod container;
pub mod geometry;
pub mod renderer;
pub mod surface;

pub use container::{FixedRowContainer, RowBounds, RowContainer};
pub use geometry::{CubicBezier, Point, Size, Viewport};
pub use renderer::{
    FrameStats, GraphRenderer, NodeClickHandler, NodeHit, NodeHoverHandler, PointerButton,
    PointerEvent, RenderOutcome, RendererState,
};
pub use surface::{DrawCommand, RecordingSurface, Surface};
