//! Sway IPC: the `SwayClient` seam the fader talks through, and its
//! implementation on top of `swayipc-async`.

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Duration;

pub mod client;
pub mod types;

pub use client::{EventStream, SwayIpcClient};
pub use types::{visible_containers, ContainerRef, SwayEvent, WorkspaceRef};

/// Timeout for a single request/reply round trip
pub const IPC_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("sway ipc error: {0}")]
    Sway(#[from] swayipc_async::Error),

    #[error("ipc request timed out after {0:?}")]
    Timeout(Duration),

    #[error("command failed: {0}")]
    Command(String),

    #[error("event stream closed")]
    Closed,
}

/// The part of the window manager the fader talks to.
#[async_trait]
pub trait SwayClient: Send + Sync {
    /// Visible containers of the current layout tree, in tree order
    async fn visible_containers(&self) -> Result<Vec<ContainerRef>, IpcError>;

    /// Run one or more `;`-joined commands; any rejected directive is an error
    async fn run_command(&self, command: &str) -> Result<(), IpcError>;
}

/// Fold the per-directive results of a RUN_COMMAND reply into one result
pub fn check_outcomes(
    outcomes: Vec<Result<(), swayipc_async::Error>>,
) -> Result<(), IpcError> {
    let failures: Vec<String> = outcomes
        .into_iter()
        .filter_map(Result::err)
        .map(|e| e.to_string())
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(IpcError::Command(failures.join("; ")))
    }
}

/// Point swayipc at an explicit socket. Without one it reads `I3SOCK` or
/// `SWAYSOCK`, then asks the running sway. Must run before any connection
/// is opened.
pub fn use_socket(explicit: Option<&str>) {
    if let Some(path) = explicit {
        let path = shellexpand::tilde(path);
        for var in ["SWAYSOCK", "I3SOCK"] {
            std::env::set_var(var, path.as_ref());
        }
    }
}
