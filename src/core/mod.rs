pub mod daemon;
pub mod event_handler;

pub use daemon::{run_event_loop, Daemon};
pub use event_handler::EventHandler;
