pub mod config;
pub mod error;
pub mod layout;
pub mod models;
pub mod palette;
pub mod render;
pub mod session;

pub use config::{GraphConfig, RenderConfig};
pub use error::{GraphError, Result};
pub use layout::{DEFAULT_PALETTE_SIZE, LayoutEngine, LayoutOptions, compute_layout};
pub use models::{
    ActiveColumn, ActiveColumnKind, CommitMeta, CommitRecord, EdgeEnd, EdgeKind, GitRef,
    GitRefKind, GraphLayout, GridPoint, LaneAssignment, LayoutDiagnostic, LayoutEdge, RowEdge,
};
pub use palette::{Palette, Rgb};
pub use render::{GraphRenderer, RecordingSurface, RowContainer, Surface};
pub use session::GraphSession;
