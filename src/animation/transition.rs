use std::ops::Deref;
use std::sync::Arc;

use super::easing::EasingFunction;

/// Precomputed opacity values for one fade, one per frame.
///
/// Cheap to clone; the values are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    values: Arc<[f64]>,
}

impl FrameSequence {
    /// Interpolate `num_frames` values from `from` towards `to`.
    ///
    /// Progress is 1-based: frame `i` sits at `(i + 1) / num_frames`, so the
    /// first frame already differs from `from` and the last one is exactly `to`.
    pub fn generate(from: f64, to: f64, num_frames: usize, easing: EasingFunction) -> Self {
        let dist = to - from;
        let values = (0..num_frames)
            .map(|i| {
                if i + 1 == num_frames {
                    return to;
                }
                let x = (i + 1) as f64 / num_frames as f64;
                from + easing.apply(x) * dist
            })
            .collect();

        Self { values }
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

impl Deref for FrameSequence {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.values
    }
}
