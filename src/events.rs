//! Status events reported to the embedding application.

use crate::error::TextureLoadError;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A source image became a valid texture
    TextureReady { texture_id: u64 },
    /// Loading failed and the placeholder is shown instead
    TextureFallbackUsed {
        texture_id: u64,
        error: TextureLoadError,
    },
    ContextLost { reason: String },
    ContextRecovered,
    /// 3D rendering is off for the rest of the session
    Degraded { reason: String },
}

impl EngineEvent {
    /// Whether the event reports a problem the user may want to know about.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            EngineEvent::TextureFallbackUsed { .. }
                | EngineEvent::ContextLost { .. }
                | EngineEvent::Degraded { .. }
        )
    }
}
