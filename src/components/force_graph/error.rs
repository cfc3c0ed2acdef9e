use super::types::ElementKind;

/// Reasons a graph payload or a graph mutation is rejected.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GraphValidationError {
	#[error("{kind:?} id must not be empty")]
	EmptyId { kind: ElementKind },
	#[error("duplicate node id: {0}")]
	DuplicateNode(String),
	#[error("duplicate edge id: {0}")]
	DuplicateEdge(String),
	#[error("edge {edge_id} references missing node {node_id}")]
	MissingEndpoint { edge_id: String, node_id: String },
	#[error("unknown node: {0}")]
	UnknownNode(String),
	#[error("unknown edge: {0}")]
	UnknownEdge(String),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LayoutError {
	#[error("layout setting {name} must be finite, got {value}")]
	InvalidSetting { name: &'static str, value: f64 },
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ViewportError {
	#[error("viewport setting {name} must be finite, got {value}")]
	InvalidSetting { name: &'static str, value: f64 },
	#[error("minScale {min} is larger than maxScale {max}")]
	InvertedScaleRange { min: f64, max: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("failed to encode or decode sync message: {0}")]
	Codec(#[from] serde_json::Error),
	#[error("transport error: {0}")]
	Transport(String),
}

/// Umbrella error for operations on the canvas state.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
	#[error(transparent)]
	Validation(#[from] GraphValidationError),
	#[error(transparent)]
	Layout(#[from] LayoutError),
	#[error(transparent)]
	Viewport(#[from] ViewportError),
	#[error(transparent)]
	Sync(#[from] SyncError),
}
