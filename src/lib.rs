//! swayfader - smooth opacity fades for the sway window manager
//!
//! Listens for new windows and workspace switches over sway's IPC socket and
//! fades the affected windows in with a short series of paced `opacity`
//! commands.

pub mod animation;
pub mod config;
pub mod core;
pub mod fader;
pub mod ipc;

// Re-export commonly used types
pub use config::Config;
pub use self::core::daemon::Daemon;
pub use fader::{FadeDispatcher, FaderError, FaderSettings};

pub use animation::{EasingFunction, FrameSequence};
