use regex::Regex;

use super::render::{render, CommandCache, Target};
use super::FaderError;
use crate::animation::{EasingFunction, FrameSequence};
use crate::ipc::ContainerRef;

/// What a rule's pattern is matched against
#[derive(Debug, Clone)]
pub enum Matcher {
    AppId(Regex),
    Class(Regex),
}

impl Matcher {
    pub fn app_id(pattern: &str) -> Result<Self, FaderError> {
        Ok(Matcher::AppId(compile(pattern)?))
    }

    pub fn class(pattern: &str) -> Result<Self, FaderError> {
        Ok(Matcher::Class(compile(pattern)?))
    }

    pub fn pattern(&self) -> &str {
        match self {
            Matcher::AppId(re) | Matcher::Class(re) => re.as_str(),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, FaderError> {
    Regex::new(pattern).map_err(|source| FaderError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// A pattern plus the fade it selects.
///
/// The frames are generated once when the rule is built and the rendered
/// `con_id` commands are cached per container.
#[derive(Debug)]
pub struct OpacityRule {
    matcher: Matcher,
    from: f64,
    to: f64,
    frames: FrameSequence,
    cache: CommandCache,
}

impl OpacityRule {
    pub fn new(
        matcher: Matcher,
        from: f64,
        to: f64,
        num_frames: usize,
        easing: EasingFunction,
        cache_size: usize,
    ) -> Self {
        Self {
            matcher,
            from,
            to,
            frames: FrameSequence::generate(from, to, num_frames, easing),
            cache: CommandCache::new(cache_size),
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn from(&self) -> f64 {
        self.from
    }

    pub fn to(&self) -> f64 {
        self.to
    }

    pub fn frames(&self) -> &FrameSequence {
        &self.frames
    }

    /// Per-frame commands addressing exactly this container
    pub fn commands_for(&mut self, con_id: i64) -> &[String] {
        self.cache.get_or_render(con_id, &self.frames)
    }

    /// Selector addressing every container that shares the value this rule
    /// matched on. `None` when the container lacks that value.
    pub fn selector<'a>(&self, container: &'a ContainerRef) -> Option<Target<'a>> {
        match &self.matcher {
            Matcher::AppId(_) => container.app_id.as_deref().map(Target::AppId),
            Matcher::Class(_) => container.class.as_deref().map(Target::Class),
        }
    }

    /// Uncached per-frame commands for an arbitrary target
    pub fn render_for(&self, target: Target<'_>) -> Vec<String> {
        render(target, &self.frames)
    }

    pub fn cache(&self) -> &CommandCache {
        &self.cache
    }
}

/// Ordered rules; the first match wins.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<OpacityRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<OpacityRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: OpacityRule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpacityRule> {
        self.rules.iter()
    }

    /// Index of the rule that applies to the container.
    ///
    /// App-id rules are tried first when the container has an app_id; class
    /// rules are the fallback, matched against an empty class when absent.
    pub fn resolve_index(&self, container: &ContainerRef) -> Option<usize> {
        if let Some(app_id) = container.app_id.as_deref() {
            let found = self.rules.iter().position(|rule| match &rule.matcher {
                Matcher::AppId(re) => re.is_match(app_id),
                Matcher::Class(_) => false,
            });
            if found.is_some() {
                return found;
            }
        }

        let class = container.class.as_deref().unwrap_or("");
        self.rules.iter().position(|rule| match &rule.matcher {
            Matcher::Class(re) => re.is_match(class),
            Matcher::AppId(_) => false,
        })
    }

    pub fn resolve(&self, container: &ContainerRef) -> Option<&OpacityRule> {
        self.resolve_index(container).map(|i| &self.rules[i])
    }

    pub fn resolve_mut(&mut self, container: &ContainerRef) -> Option<&mut OpacityRule> {
        self.resolve_index(container).map(move |i| &mut self.rules[i])
    }
}
