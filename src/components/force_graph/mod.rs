//! Interactive force-directed knowledge graph on a 2D canvas.

mod component;
pub mod controller;
pub mod error;
pub mod events;
pub mod export;
pub mod interaction;
pub mod layout;
pub mod model;
mod render;
pub mod state;
pub mod style;
pub mod sync;
pub mod types;
pub mod viewport;

pub use component::ForceGraphCanvas;
pub use controller::CanvasController;
pub use error::{CanvasError, GraphValidationError, LayoutError, SyncError, ViewportError};
pub use model::{Graph, ingest, sanitize};
pub use state::{CanvasConfig, ForceGraphState};
pub use types::{Edge, Element, ElementRef, GraphPayload, Node, Point, Size};
