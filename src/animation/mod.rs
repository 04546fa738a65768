//! Opacity curves: easing functions and precomputed per-frame transitions.

pub mod easing;
pub mod transition;

pub use easing::EasingFunction;
pub use transition::FrameSequence;
