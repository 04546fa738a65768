use std::collections::HashMap;
use std::fmt::{self, Write};

use crate::animation::FrameSequence;

/// Default number of containers whose commands a rule keeps around
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// How a command addresses its container(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// Exactly one container
    ConId(i64),
    /// Every container with this app_id
    AppId(&'a str),
    /// Every container with this window class
    Class(&'a str),
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::ConId(id) => write!(f, "con_id={id}"),
            Target::AppId(value) => write!(f, "app_id=\"{}\"", exact(value)),
            Target::Class(value) => write!(f, "class=\"{}\"", exact(value)),
        }
    }
}

/// Sway criteria values are regexes: anchor the literal value and escape
/// quotes for the criteria string
fn exact(value: &str) -> String {
    format!("^{}$", regex::escape(value)).replace('"', "\\\"")
}

/// Append a single `[target] opacity <value>;` directive
pub fn write_command(out: &mut String, target: Target<'_>, opacity: f64) {
    // Writing into a String cannot fail
    let _ = write!(out, "[{target}] opacity {opacity:.4};");
}

/// One directive per frame, in frame order
pub fn render(target: Target<'_>, frames: &FrameSequence) -> Vec<String> {
    frames
        .iter()
        .map(|&opacity| {
            let mut command = String::with_capacity(40);
            write_command(&mut command, target, opacity);
            command
        })
        .collect()
}

/// Rendered `con_id` commands per container.
///
/// Not an LRU: once `capacity` containers are cached the whole map is dropped
/// and refilled on demand.
#[derive(Debug)]
pub struct CommandCache {
    entries: HashMap<i64, Vec<String>>,
    capacity: usize,
}

impl CommandCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Cached commands for the container, rendering them on a miss
    pub fn get_or_render(&mut self, con_id: i64, frames: &FrameSequence) -> &[String] {
        if !self.entries.contains_key(&con_id) && self.entries.len() >= self.capacity {
            self.entries.clear();
        }

        self.entries
            .entry(con_id)
            .or_insert_with(|| render(Target::ConId(con_id), frames))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommandCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}
