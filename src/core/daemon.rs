use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use crate::config::Config;
use crate::core::event_handler::EventHandler;
use crate::fader::FadeDispatcher;
use crate::ipc::{self, EventStream, SwayIpcClient};

pub struct Daemon {
    client: SwayIpcClient,
    event_handler: EventHandler,
}

impl Daemon {
    pub async fn new(config: Config) -> Result<Self> {
        let fader = config
            .fader_settings()
            .build()
            .context("Invalid fader configuration")?;

        ipc::use_socket(config.socket.as_deref());
        info!("🔌 Connecting to sway IPC");
        let client = SwayIpcClient::connect()
            .await
            .context("Failed to connect to sway")?;

        info!(
            "🎨 {} fade rules, {} frames per fade",
            fader.rules.len(),
            fader.timing.num_frames
        );
        let dispatcher = FadeDispatcher::new(Arc::new(client.clone()), fader);

        Ok(Self {
            client,
            event_handler: EventHandler::new(dispatcher),
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("🚀 Starting swayfader daemon");

        if let Err(e) = self.client.test_connection().await {
            error!("❌ Failed to talk to sway: {}", e);
            return Err(e.into());
        }

        let events = EventStream::subscribe().await?;

        let result = run_event_loop(&mut self.event_handler, events, shutdown_requested()).await;

        info!("👋 Shutting down swayfader");
        result
    }
}

/// Drive the handler until `shutdown` resolves or the event stream fails.
///
/// The running fade is cancelled and awaited before returning, whichever way
/// the loop ends.
pub async fn run_event_loop<F>(
    handler: &mut EventHandler,
    mut events: EventStream,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::pin!(shutdown);
    info!("🔄 Starting event loop");

    let result = loop {
        tokio::select! {
            event = events.next_event() => {
                match event {
                    Ok(event) => {
                        if let Err(e) = handler.handle_event(&event).await {
                            break Err(e.into());
                        }
                    }
                    Err(e) => {
                        error!("❌ Lost the sway event stream: {}", e);
                        break Err(anyhow::Error::new(e).context("Event stream failed"));
                    }
                }
            }

            signal = &mut shutdown => {
                info!("🛑 Received shutdown signal");
                break signal;
            }
        }
    };

    handler.shutdown().await;
    result
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_requested() -> Result<()> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}
