use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use crate::fader::{
    Addressing, ErrorPolicy, FaderSettings, JobOptions, MatchKind, RuleSpec, DEFAULT_CACHE_SIZE,
    DEFAULT_FPS, DEFAULT_FROM, DEFAULT_TO,
};

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/sway/swayfader.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub fader: FaderConfig,

    /// Sway socket path, overriding SWAYSOCK
    #[serde(default)]
    pub socket: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FaderConfig {
    /// Frames per second (default: 60)
    #[serde(default = "default_fps")]
    pub fps: f64,

    /// Fade duration in milliseconds (default: 200)
    #[serde(default = "default_duration")]
    pub duration: u64,

    /// Opacity a fade starts from when no rule overrides it (default: 0.7)
    #[serde(default = "default_from")]
    pub default_from: f64,

    /// Opacity a fade ends at when no rule overrides it (default: 1.0)
    #[serde(default = "default_to")]
    pub default_to: f64,

    /// Fade every window not matched by a rule (default: true)
    #[serde(default = "default_true")]
    pub default_rule: bool,

    /// Easing function for all fades (default: "linear")
    #[serde(default = "default_easing")]
    pub easing: String,

    /// Containers per rule whose rendered commands are kept (default: 64)
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Send the first frame immediately instead of one interval later
    #[serde(default)]
    pub immediate_first_frame: bool,

    /// How workspace fades address windows (default: "selector")
    #[serde(default)]
    pub workspace_addressing: Addressing,

    /// What to do when sway rejects a frame (default: "abort")
    #[serde(default)]
    pub on_dispatch_error: ErrorPolicy,

    /// Per app_id overrides, matched before class rules
    #[serde(default)]
    pub app_id: Vec<RuleConfig>,

    /// Per window class overrides
    #[serde(default)]
    pub class: Vec<RuleConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuleConfig {
    pub pattern: String,
    #[serde(default = "default_from")]
    pub from: f64,
    #[serde(default = "default_to")]
    pub to: f64,
    #[serde(default)]
    pub easing: Option<String>,
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}
fn default_duration() -> u64 {
    200
}
fn default_from() -> f64 {
    DEFAULT_FROM
}
fn default_to() -> f64 {
    DEFAULT_TO
}
fn default_true() -> bool {
    true
}
fn default_easing() -> String {
    "linear".to_string()
}
fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

impl Default for FaderConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            duration: default_duration(),
            default_from: default_from(),
            default_to: default_to(),
            default_rule: default_true(),
            easing: default_easing(),
            cache_size: default_cache_size(),
            immediate_first_frame: false,
            workspace_addressing: Addressing::default(),
            on_dispatch_error: ErrorPolicy::default(),
            app_id: Vec::new(),
            class: Vec::new(),
        }
    }
}

impl RuleConfig {
    fn to_spec(&self, kind: MatchKind) -> RuleSpec {
        RuleSpec {
            kind,
            pattern: self.pattern.clone(),
            from: self.from,
            to: self.to,
            easing: self.easing.clone(),
        }
    }
}

/// Values given on the command line; they win over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub fps: Option<f64>,
    pub duration: Option<Duration>,
    pub default_from: Option<f64>,
    pub default_to: Option<f64>,
    pub easing: Option<String>,
    pub socket: Option<String>,
    /// Extra rules, appended after the file's rules of the same kind
    pub rules: Vec<RuleSpec>,
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(path);
        info!("📄 Reading config from: {}", expanded_path);

        let content = fs::read_to_string(expanded_path.as_ref())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", expanded_path, e))?;

        let config = Self::parse(&content)?;
        debug!(
            "📋 Config loaded: {} app_id rules, {} class rules",
            config.fader.app_id.len(),
            config.fader.class.len()
        );
        Ok(config)
    }

    /// Load the file if it exists, falling back to defaults when the default
    /// path is missing. An explicitly requested file must exist.
    pub async fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => {
                let expanded = shellexpand::tilde(DEFAULT_CONFIG_PATH);
                if Path::new(expanded.as_ref()).exists() {
                    Self::load(DEFAULT_CONFIG_PATH).await
                } else {
                    info!("📋 No config file at {}, using defaults", expanded);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Fold command-line values into the configuration
    pub fn apply(&mut self, overrides: Overrides) {
        let fader = &mut self.fader;
        if let Some(fps) = overrides.fps {
            fader.fps = fps;
        }
        if let Some(duration) = overrides.duration {
            fader.duration = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(from) = overrides.default_from {
            fader.default_from = from;
        }
        if let Some(to) = overrides.default_to {
            fader.default_to = to;
        }
        if let Some(easing) = overrides.easing {
            fader.easing = easing;
        }
        if overrides.socket.is_some() {
            self.socket = overrides.socket;
        }

        for spec in overrides.rules {
            let rule = RuleConfig {
                pattern: spec.pattern,
                from: spec.from,
                to: spec.to,
                easing: spec.easing,
            };
            match spec.kind {
                MatchKind::AppId => fader.app_id.push(rule),
                MatchKind::Class => fader.class.push(rule),
            }
        }
    }

    /// Settings for the fade engine: app_id rules, then class rules
    pub fn fader_settings(&self) -> FaderSettings {
        let fader = &self.fader;
        let rules = fader
            .app_id
            .iter()
            .map(|r| r.to_spec(MatchKind::AppId))
            .chain(fader.class.iter().map(|r| r.to_spec(MatchKind::Class)))
            .collect();

        FaderSettings {
            fps: fader.fps,
            duration: Duration::from_millis(fader.duration),
            default_from: fader.default_from,
            default_to: fader.default_to,
            default_rule: fader.default_rule,
            easing: fader.easing.clone(),
            rules,
            cache_size: fader.cache_size,
            addressing: fader.workspace_addressing,
            job: JobOptions {
                error_policy: fader.on_dispatch_error,
                immediate_first_frame: fader.immediate_first_frame,
            },
        }
    }
}
