//! Render errors.

use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
