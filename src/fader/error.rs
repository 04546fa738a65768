use std::time::Duration;
use thiserror::Error;

use crate::ipc::IpcError;

#[derive(Debug, Error)]
pub enum FaderError {
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("fps must be a positive number, got {0}")]
    InvalidFps(f64),

    #[error("fade duration must be greater than zero")]
    InvalidDuration,

    #[error("{0} fps is too fast for a nanosecond timer")]
    ZeroInterval(f64),

    #[error("a {duration:?} fade at {fps} fps has more than {max} frames")]
    TooManyFrames {
        duration: Duration,
        fps: f64,
        max: usize,
    },

    #[error("a {duration:?} fade at {fps} fps has no frames")]
    NoFrames { duration: Duration, fps: f64 },

    #[error("unknown easing function '{0}'")]
    UnknownEasing(String),

    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("command cache size must be greater than zero")]
    InvalidCacheSize,

    #[error("failed to fetch the container tree: {0}")]
    Tree(#[source] IpcError),

    #[error("dispatch of frame {frame} failed: {source}")]
    Dispatch {
        frame: usize,
        #[source]
        source: IpcError,
    },
}

impl FaderError {
    /// Whether this error comes from building the fader rather than running it
    pub fn is_config_error(&self) -> bool {
        !matches!(self, FaderError::Tree(_) | FaderError::Dispatch { .. })
    }
}
