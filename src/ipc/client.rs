use async_trait::async_trait;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use swayipc_async::{Connection, EventType};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use super::types::{visible_containers, ContainerRef, SwayEvent};
use super::{check_outcomes, IpcError, SwayClient, IPC_TIMEOUT};

/// Events the fader subscribes to
pub const SUBSCRIBED_EVENTS: [EventType; 2] = [EventType::Workspace, EventType::Window];

async fn timed<T, F>(request: F) -> Result<T, IpcError>
where
    F: Future<Output = Result<T, swayipc_async::Error>>,
{
    timeout(IPC_TIMEOUT, request)
        .await
        .map_err(|_| IpcError::Timeout(IPC_TIMEOUT))?
        .map_err(IpcError::from)
}

/// Request/reply connection to sway
#[derive(Clone)]
pub struct SwayIpcClient {
    connection: Arc<Mutex<Connection>>,
}

impl SwayIpcClient {
    pub async fn connect() -> Result<Self, IpcError> {
        debug!("🔌 Connecting to sway IPC");
        let connection = timed(Connection::new()).await?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Check that sway answers, logging its version
    pub async fn test_connection(&self) -> Result<(), IpcError> {
        let mut connection = self.connection.lock().await;
        let version = timed(connection.get_version()).await?;
        info!("✅ Connected to {}", version.human_readable);
        Ok(())
    }
}

#[async_trait]
impl SwayClient for SwayIpcClient {
    async fn visible_containers(&self) -> Result<Vec<ContainerRef>, IpcError> {
        let mut connection = self.connection.lock().await;
        let tree = timed(connection.get_tree()).await?;
        Ok(visible_containers(&tree))
    }

    async fn run_command(&self, command: &str) -> Result<(), IpcError> {
        trace!("📤 {}", command);
        let mut connection = self.connection.lock().await;
        let outcomes = timed(connection.run_command(command)).await?;
        check_outcomes(outcomes)
    }
}

/// Dedicated subscribed connection delivering events through a channel
pub struct EventStream {
    receiver: mpsc::Receiver<Result<SwayEvent, IpcError>>,
}

impl EventStream {
    /// Open a second connection and subscribe it to window and workspace
    /// events; a task forwards them until the stream fails.
    pub async fn subscribe() -> Result<Self, IpcError> {
        let connection = timed(Connection::new()).await?;
        let stream = timed(connection.subscribe(SUBSCRIBED_EVENTS)).await?;
        info!("📡 Subscribed to sway events: {:?}", SUBSCRIBED_EVENTS);

        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            let mut stream = Box::pin(stream);
            loop {
                let next = match stream.next().await {
                    Some(Ok(event)) => Ok(SwayEvent::from(event)),
                    Some(Err(e)) => Err(IpcError::from(e)),
                    None => Err(IpcError::Closed),
                };

                let failed = next.is_err();
                if let Err(e) = &next {
                    warn!("⚠️  Sway event stream failed: {}", e);
                }
                if tx.send(next).await.is_err() {
                    debug!("Event receiver dropped, stopping event reader");
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        Ok(Self { receiver: rx })
    }

    pub fn from_receiver(receiver: mpsc::Receiver<Result<SwayEvent, IpcError>>) -> Self {
        Self { receiver }
    }

    /// Next event; the stream ending is reported as an error
    pub async fn next_event(&mut self) -> Result<SwayEvent, IpcError> {
        match self.receiver.recv().await {
            Some(event) => event,
            None => Err(IpcError::Closed),
        }
    }
}
