//! The fade scheduling engine: rule resolution, frame generation, command
//! batching and paced dispatch.

use std::time::Duration;
use tracing::debug;

pub mod batch;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod render;
pub mod rules;

pub use batch::{BatchPool, FrameBatch};
pub use dispatcher::{Addressing, FadeDispatcher, ShutdownSignal};
pub use error::FaderError;
pub use job::{ErrorPolicy, FadeJob, JobOptions, JobOutcome, JobSlot};
pub use render::{CommandCache, Target, DEFAULT_CACHE_SIZE};
pub use rules::{Matcher, OpacityRule, RuleSet};

use crate::animation::EasingFunction;

pub const DEFAULT_FROM: f64 = 0.7;
pub const DEFAULT_TO: f64 = 1.0;
pub const DEFAULT_FPS: f64 = 60.0;
pub const DEFAULT_DURATION: Duration = Duration::from_millis(200);
/// Upper bound on frames per fade; every rule stores this many commands per container
pub const MAX_FRAMES: usize = 10_000;

/// Frame interval and frame count derived from fps and fade duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    pub frame_interval: Duration,
    pub num_frames: usize,
}

impl FrameTiming {
    /// `num_frames = floor(duration / frame_interval)`, at least one and at
    /// most [`MAX_FRAMES`].
    pub fn new(fps: f64, duration: Duration) -> Result<Self, FaderError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FaderError::InvalidFps(fps));
        }
        if duration.is_zero() {
            return Err(FaderError::InvalidDuration);
        }

        let frame_interval = Duration::try_from_secs_f64(1.0 / fps)
            .map_err(|_| FaderError::InvalidFps(fps))?;
        if frame_interval.is_zero() {
            return Err(FaderError::ZeroInterval(fps));
        }

        // Computed from the exact ratio; the tiny epsilon keeps 200ms at 60fps
        // from rounding down to 11 frames
        let exact = (duration.as_secs_f64() * fps + 1e-9).floor();
        if exact > MAX_FRAMES as f64 {
            return Err(FaderError::TooManyFrames {
                duration,
                fps,
                max: MAX_FRAMES,
            });
        }
        let num_frames = exact as usize;
        if num_frames == 0 {
            return Err(FaderError::NoFrames { duration, fps });
        }

        Ok(Self {
            frame_interval,
            num_frames,
        })
    }
}

/// Which window property a rule pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    AppId,
    Class,
}

/// A rule as configured, before its pattern is compiled
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub kind: MatchKind,
    pub pattern: String,
    pub from: f64,
    pub to: f64,
    /// Overrides the global easing for this rule
    pub easing: Option<String>,
}

impl RuleSpec {
    pub fn app_id(pattern: impl Into<String>, from: f64, to: f64) -> Self {
        Self {
            kind: MatchKind::AppId,
            pattern: pattern.into(),
            from,
            to,
            easing: None,
        }
    }

    pub fn class(pattern: impl Into<String>, from: f64, to: f64) -> Self {
        Self {
            kind: MatchKind::Class,
            pattern: pattern.into(),
            from,
            to,
            easing: None,
        }
    }

    pub fn with_easing(mut self, easing: impl Into<String>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// Parse a `regex:from:to` command-line target.
    ///
    /// Splits on the last two colons, so the pattern itself may contain `:`.
    pub fn parse_target(kind: MatchKind, target: &str) -> Result<Self, FaderError> {
        let invalid = |reason: String| FaderError::InvalidTarget {
            target: target.to_string(),
            reason,
        };

        let mut parts = target.rsplitn(3, ':');
        let (Some(to), Some(from), Some(pattern)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected \"regex:from:to\"".to_string()));
        };

        let from: f64 = from
            .trim()
            .parse()
            .map_err(|e| invalid(format!("invalid from value: {e}")))?;
        let to: f64 = to
            .trim()
            .parse()
            .map_err(|e| invalid(format!("invalid to value: {e}")))?;

        Ok(Self {
            kind,
            pattern: pattern.to_string(),
            from,
            to,
            easing: None,
        })
    }
}

/// Everything the fader needs, validated by [`FaderSettings::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct FaderSettings {
    pub fps: f64,
    pub duration: Duration,
    pub default_from: f64,
    pub default_to: f64,
    /// Append a match-all class rule after the configured ones
    pub default_rule: bool,
    pub easing: String,
    /// Rules in match order
    pub rules: Vec<RuleSpec>,
    pub cache_size: usize,
    pub addressing: Addressing,
    pub job: JobOptions,
}

impl Default for FaderSettings {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            duration: DEFAULT_DURATION,
            default_from: DEFAULT_FROM,
            default_to: DEFAULT_TO,
            default_rule: true,
            easing: "linear".to_string(),
            rules: Vec::new(),
            cache_size: DEFAULT_CACHE_SIZE,
            addressing: Addressing::default(),
            job: JobOptions::default(),
        }
    }
}

/// Validated, ready-to-run fader state
#[derive(Debug)]
pub struct Fader {
    pub rules: RuleSet,
    pub timing: FrameTiming,
    pub addressing: Addressing,
    pub job: JobOptions,
}

fn easing(name: &str) -> Result<EasingFunction, FaderError> {
    EasingFunction::from_name(name).ok_or_else(|| FaderError::UnknownEasing(name.to_string()))
}

impl FaderSettings {
    pub fn build(&self) -> Result<Fader, FaderError> {
        let timing = FrameTiming::new(self.fps, self.duration)?;
        if self.cache_size == 0 {
            return Err(FaderError::InvalidCacheSize);
        }
        let default_easing = easing(&self.easing)?;

        let mut rules = RuleSet::default();
        for spec in &self.rules {
            let matcher = match spec.kind {
                MatchKind::AppId => Matcher::app_id(&spec.pattern)?,
                MatchKind::Class => Matcher::class(&spec.pattern)?,
            };
            let curve = match &spec.easing {
                Some(name) => easing(name)?,
                None => default_easing,
            };
            rules.push(OpacityRule::new(
                matcher,
                spec.from,
                spec.to,
                timing.num_frames,
                curve,
                self.cache_size,
            ));
        }

        if self.default_rule {
            rules.push(OpacityRule::new(
                Matcher::class(".*")?,
                self.default_from,
                self.default_to,
                timing.num_frames,
                default_easing,
                self.cache_size,
            ));
        }

        debug!(
            "🎨 Built {} fade rules, {} frames every {:?}",
            rules.len(),
            timing.num_frames,
            timing.frame_interval
        );

        Ok(Fader {
            rules,
            timing,
            addressing: self.addressing,
            job: self.job,
        })
    }
}
