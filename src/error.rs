//! Error types for the codecube engine
//!
//! Every failure the engine can run into maps onto one of these types. None of
//! them is fatal to the host application: texture failures are answered with a
//! fallback texture, context loss with one recovery attempt, and a missing GPU
//! with a static 2D view.

use std::time::Duration;

use thiserror::Error;

/// Failure while turning an [`ImageSource`](crate::gfx::resources::ImageSource)
/// into texture pixels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextureLoadError {
    /// No source image was supplied at all
    #[error("no source image available")]
    MissingSource,

    /// The bytes could not be fetched (file missing, handle revoked, ...)
    #[error("failed to read source image '{source_name}': {message}")]
    Io { source_name: String, message: String },

    /// The bytes were fetched but could not be decoded
    #[error("failed to decode source image '{source_name}': {message}")]
    Decode { source_name: String, message: String },

    /// The payload is structurally wrong (zero size, short pixel buffer)
    #[error("unsupported image payload from '{source_name}': {message}")]
    Unsupported { source_name: String, message: String },

    /// The load did not finish inside the configured budget
    #[error("loading '{source_name}' timed out after {timeout:?}")]
    Timeout {
        source_name: String,
        timeout: Duration,
    },
}

/// Failure of a single render attempt.
///
/// Returned by every [`RenderBackend`](crate::gfx::rendering::RenderBackend)
/// operation. The lifecycle manager decides what to do with it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The GPU device or surface went away (driver reset, resource exhaustion)
    #[error("rendering context lost: {0}")]
    ContextLost(String),

    /// The surface did not hand out a frame in time; the frame is skipped
    #[error("surface frame acquisition timed out")]
    SurfaceTimeout,

    /// There is nothing to draw yet
    #[error("no texture bound")]
    NoTexture,

    /// Any other backend failure
    #[error("rendering failed: {0}")]
    Backend(String),
}

impl RenderError {
    /// Whether this error means the rendering context has to be recovered.
    pub fn is_context_loss(&self) -> bool {
        matches!(self, RenderError::ContextLost(_))
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Engine-level errors surfaced to the embedding application.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The environment has no usable 3D rendering capability
    #[error("3D rendering is not supported here: {0}")]
    UnsupportedEnvironment(String),

    /// The context was lost and the single recovery attempt failed
    #[error("rendering context could not be recovered: {0}")]
    RecoveryFailed(String),

    /// A snapshot could not be captured or written
    #[error("snapshot export failed: {0}")]
    Export(String),

    /// The engine was already torn down
    #[error("engine has been torn down")]
    TornDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_loss_is_detected() {
        assert!(RenderError::ContextLost("reset".into()).is_context_loss());
        assert!(!RenderError::SurfaceTimeout.is_context_loss());
        assert!(!RenderError::Backend("x".into()).is_context_loss());
    }

    #[test]
    fn texture_errors_mention_source() {
        let err = TextureLoadError::Decode {
            source_name: "code.png".into(),
            message: "bad magic".into(),
        };
        let text = err.to_string();
        assert!(text.contains("code.png"));
        assert!(text.contains("bad magic"));
    }
}
