use thiserror::Error;

/// Surface dimensions that cannot host a simulation yet (layout thrash,
/// minimized windows). The driver skips the frame and tries again.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("surface is not ready: {width}x{height}")]
pub struct GeometryError {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("connection endpoints must be distinct nodes (both were {0})")]
    SelfLoop(usize),
    #[error("connection endpoint {index} is out of range for {node_count} nodes")]
    EndpointOutOfRange { index: usize, node_count: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} range is inverted: {min} > {max}")]
    InvertedRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("palette must contain at least one color")]
    EmptyPalette,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("worker channel is closed")]
    Disconnected,
}
