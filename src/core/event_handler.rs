use tracing::{debug, trace, warn};

use crate::fader::{FadeDispatcher, FaderError};
use crate::ipc::SwayEvent;

/// Feeds sway events to the fade dispatcher.
///
/// Errors while handling a single event are logged and swallowed so one bad
/// tree fetch never stops the daemon.
pub struct EventHandler {
    dispatcher: FadeDispatcher,
    handled: u64,
}

impl EventHandler {
    pub fn new(dispatcher: FadeDispatcher) -> Self {
        Self {
            dispatcher,
            handled: 0,
        }
    }

    pub async fn handle_event(&mut self, event: &SwayEvent) -> Result<Option<u64>, FaderError> {
        trace!("📨 Handling event: {:?}", event);
        self.handled += 1;

        match self.dispatcher.handle_event(event).await {
            Ok(Some(job)) => {
                debug!("✨ Started fade job {}", job);
                Ok(Some(job))
            }
            Ok(None) => Ok(None),
            Err(e) if !e.is_config_error() => {
                warn!("⚠️  Dropping event: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Number of events seen so far
    pub fn handled(&self) -> u64 {
        self.handled
    }

    pub fn dispatcher(&self) -> &FadeDispatcher {
        &self.dispatcher
    }

    pub async fn shutdown(&mut self) {
        self.dispatcher.shutdown().await;
    }
}
