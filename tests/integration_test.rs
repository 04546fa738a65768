use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio::time::sleep;

use swayfader::config::Config;
use swayfader::core::{run_event_loop, EventHandler};
use swayfader::fader::{
    Addressing, ErrorPolicy, FadeDispatcher, FaderError, FaderSettings, JobOptions, JobOutcome,
    RuleSpec,
};
use swayfader::ipc::{ContainerRef, EventStream, IpcError, SwayClient, SwayEvent, WorkspaceRef};

/// Records every command and serves a fixed layout
#[derive(Default)]
struct MockSway {
    commands: Mutex<Vec<String>>,
    tree: Option<Vec<ContainerRef>>,
    /// Zero-based index of the command that sway rejects
    fail_on: Option<usize>,
}

impl MockSway {
    fn with_tree(tree: Vec<ContainerRef>) -> Self {
        Self {
            tree: Some(tree),
            ..Self::default()
        }
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

#[async_trait]
impl SwayClient for MockSway {
    async fn visible_containers(&self) -> Result<Vec<ContainerRef>, IpcError> {
        self.tree.clone().ok_or(IpcError::Closed)
    }

    async fn run_command(&self, command: &str) -> Result<(), IpcError> {
        let mut commands = self.commands.lock().unwrap();
        let index = commands.len();
        commands.push(command.to_string());

        if self.fail_on == Some(index) {
            return Err(IpcError::Command("No matching node".to_string()));
        }
        Ok(())
    }
}

const FRAME: Duration = Duration::from_micros(16_667);

fn window(id: i64, app_id: Option<&str>, class: Option<&str>) -> ContainerRef {
    ContainerRef {
        id,
        app_id: app_id.map(str::to_string),
        class: class.map(str::to_string),
        visible: true,
    }
}

fn window_new(id: i64, app_id: Option<&str>, class: Option<&str>) -> SwayEvent {
    SwayEvent::WindowNew(window(id, app_id, class))
}

fn workspace_focus() -> SwayEvent {
    SwayEvent::WorkspaceFocus(Some(WorkspaceRef {
        id: 3,
        name: Some("1".to_string()),
    }))
}

fn firefox_settings() -> FaderSettings {
    FaderSettings {
        rules: vec![RuleSpec::class("Firefox", 0.7, 1.0)],
        ..FaderSettings::default()
    }
}

fn make_dispatcher(client: &Arc<MockSway>, settings: FaderSettings) -> FadeDispatcher {
    let client: Arc<dyn SwayClient> = client.clone();
    FadeDispatcher::new(client, settings.build().unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_firefox_window_fades_in_twelve_frames() {
    let sway = Arc::new(MockSway::default());
    let mut dispatcher = make_dispatcher(&sway, firefox_settings());

    let job = dispatcher
        .handle_event(&window_new(42, None, Some("Firefox")))
        .await
        .unwrap();
    assert_eq!(job, Some(1));
    assert!(dispatcher.is_fading());

    let outcome = dispatcher.wait_current().await.unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { frames: 12 }));

    let commands = sway.commands();
    assert_eq!(commands.len(), 12);
    assert_eq!(commands[0], "[con_id=42] opacity 0.7250;");
    assert_eq!(commands[1], "[con_id=42] opacity 0.7500;");
    assert_eq!(commands[11], "[con_id=42] opacity 1.0000;");
}

#[tokio::test(start_paused = true)]
async fn test_frames_are_paced_by_the_ticker() {
    let sway = Arc::new(MockSway::default());
    let mut dispatcher = make_dispatcher(&sway, FaderSettings::default());

    dispatcher
        .handle_event(&window_new(7, Some("foot"), None))
        .await
        .unwrap();

    // Nothing goes out before the first interval has elapsed
    sleep(FRAME / 2).await;
    assert_eq!(sway.count(), 0);

    sleep(FRAME * 3).await;
    assert_eq!(sway.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_first_frame() {
    let sway = Arc::new(MockSway::default());
    let mut dispatcher = make_dispatcher(
        &sway,
        FaderSettings {
            job: JobOptions {
                immediate_first_frame: true,
                ..JobOptions::default()
            },
            ..FaderSettings::default()
        },
    );

    dispatcher
        .handle_event(&window_new(7, Some("foot"), None))
        .await
        .unwrap();
    sleep(Duration::from_millis(1)).await;
    assert_eq!(sway.commands(), vec!["[con_id=7] opacity 0.7250;"]);

    let outcome = dispatcher.wait_current().await.unwrap();
    assert!(outcome.is_completed());
    assert_eq!(sway.count(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_workspace_batch_skips_unmatched_containers() {
    let sway = Arc::new(MockSway::with_tree(vec![
        window(10, None, Some("Firefox")),
        window(11, Some("foot"), None),
    ]));
    let mut dispatcher = make_dispatcher(
        &sway,
        FaderSettings {
            default_rule: false,
            ..firefox_settings()
        },
    );

    let job = dispatcher.handle_event(&workspace_focus()).await.unwrap();
    assert!(job.is_some());
    dispatcher.wait_current().await;

    let commands = sway.commands();
    assert_eq!(commands.len(), 12);
    assert_eq!(commands[0], r#"[class="^Firefox$"] opacity 0.7250;"#);
    assert!(commands.iter().all(|c| !c.contains("foot")));
}

#[tokio::test(start_paused = true)]
async fn test_workspace_batch_groups_containers_per_frame() {
    let sway = Arc::new(MockSway::with_tree(vec![
        window(10, None, Some("Firefox")),
        window(11, Some("foot"), None),
        window(12, None, Some("Firefox")),
    ]));
    let mut dispatcher = make_dispatcher(
        &sway,
        FaderSettings {
            rules: vec![
                RuleSpec::app_id("^foot$", 0.5, 0.9),
                RuleSpec::class("Firefox", 0.7, 1.0),
            ],
            ..FaderSettings::default()
        },
    );

    dispatcher.handle_event(&workspace_focus()).await.unwrap();
    dispatcher.wait_current().await;

    let commands = sway.commands();
    assert_eq!(commands.len(), 12);
    assert_eq!(
        commands[11],
        r#"[class="^Firefox$"] opacity 1.0000;[app_id="^foot$"] opacity 0.9000;"#
    );
}

#[tokio::test(start_paused = true)]
async fn test_con_id_addressing_for_workspace() {
    let sway = Arc::new(MockSway::with_tree(vec![
        window(10, None, Some("Firefox")),
        window(12, None, Some("Firefox")),
    ]));
    let mut dispatcher = make_dispatcher(
        &sway,
        FaderSettings {
            addressing: Addressing::ConId,
            ..firefox_settings()
        },
    );

    dispatcher.handle_event(&workspace_focus()).await.unwrap();
    dispatcher.wait_current().await;

    assert_eq!(
        sway.commands()[11],
        "[con_id=10] opacity 1.0000;[con_id=12] opacity 1.0000;"
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_matching_rule_starts_nothing() {
    let sway = Arc::new(MockSway::with_tree(vec![window(10, Some("foot"), None)]));
    let mut dispatcher = make_dispatcher(
        &sway,
        FaderSettings {
            default_rule: false,
            ..firefox_settings()
        },
    );

    assert_eq!(dispatcher.handle_event(&workspace_focus()).await.unwrap(), None);
    assert_eq!(
        dispatcher
            .handle_event(&window_new(10, Some("foot"), None))
            .await
            .unwrap(),
        None
    );
    assert!(!dispatcher.is_fading());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(sway.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unmatched_window_leaves_running_fade_alone() {
    let sway = Arc::new(MockSway::with_tree(vec![window(10, None, Some("Firefox"))]));
    let mut dispatcher = make_dispatcher(
        &sway,
        FaderSettings {
            default_rule: false,
            ..firefox_settings()
        },
    );

    dispatcher.handle_event(&workspace_focus()).await.unwrap();
    sleep(FRAME * 3 + FRAME / 2).await;

    let job = dispatcher
        .handle_event(&window_new(11, Some("foot"), None))
        .await
        .unwrap();
    assert_eq!(job, None);
    assert_eq!(dispatcher.current_job(), Some(1));

    let outcome = dispatcher.wait_current().await.unwrap();
    assert!(outcome.is_completed());
    let commands = sway.commands();
    assert_eq!(commands.len(), 12);
    assert_eq!(commands[11], r#"[class="^Firefox$"] opacity 1.0000;"#);
}

#[tokio::test]
async fn test_workspace_focus_without_current_is_ignored() {
    let sway = Arc::new(MockSway::default());
    let mut dispatcher = make_dispatcher(&sway, firefox_settings());

    let job = dispatcher
        .handle_event(&SwayEvent::WorkspaceFocus(None))
        .await
        .unwrap();
    assert_eq!(job, None);
    assert_eq!(dispatcher.handle_event(&SwayEvent::Other).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_fade_stops_dispatch() {
    let sway = Arc::new(MockSway::default());
    let mut dispatcher = make_dispatcher(&sway, firefox_settings());

    dispatcher
        .handle_event(&window_new(42, None, Some("Firefox")))
        .await
        .unwrap();

    // Five ticks in, well before the sixth
    sleep(FRAME * 5 + FRAME / 2).await;
    let outcome = dispatcher.cancel_current().await.unwrap();
    assert!(matches!(outcome, JobOutcome::Cancelled { dispatched: 5 }));
    assert!(!dispatcher.is_fading());

    sleep(Duration::from_secs(1)).await;
    let commands = sway.commands();
    assert_eq!(commands.len(), 5);
    assert_eq!(commands[4], "[con_id=42] opacity 0.8250;");
}

#[tokio::test(start_paused = true)]
async fn test_new_event_supersedes_running_fade() {
    let sway = Arc::new(MockSway::with_tree(vec![window(
        20,
        None,
        Some("Alacritty"),
    )]));
    let mut dispatcher = make_dispatcher(&sway, firefox_settings());

    dispatcher
        .handle_event(&window_new(42, None, Some("Firefox")))
        .await
        .unwrap();
    sleep(FRAME * 2 + FRAME / 2).await;

    let second = dispatcher.handle_event(&workspace_focus()).await.unwrap();
    assert_eq!(second, Some(2));
    assert_eq!(dispatcher.current_job(), Some(2));
    dispatcher.wait_current().await;

    let commands = sway.commands();
    assert_eq!(commands.len(), 2 + 12);
    assert!(commands[..2].iter().all(|c| c.starts_with("[con_id=42]")));
    assert!(commands[2..].iter().all(|c| c.contains("Alacritty")));
}

#[tokio::test(start_paused = true)]
async fn test_second_workspace_job_stops_first() {
    let sway = Arc::new(MockSway::with_tree(vec![window(10, None, Some("Firefox"))]));
    let mut dispatcher = make_dispatcher(&sway, firefox_settings());

    dispatcher.handle_event(&workspace_focus()).await.unwrap();
    sleep(FRAME * 3 + FRAME / 2).await;
    assert_eq!(sway.count(), 3);

    dispatcher.handle_event(&workspace_focus()).await.unwrap();

    // The replacement restarts from the first frame one interval later
    sleep(FRAME / 2).await;
    assert_eq!(sway.count(), 3);

    dispatcher.wait_current().await;
    let commands = sway.commands();
    assert_eq!(commands.len(), 3 + 12);
    assert_eq!(commands[2], r#"[class="^Firefox$"] opacity 0.7750;"#);
    assert_eq!(commands[3], r#"[class="^Firefox$"] opacity 0.7250;"#);
}

#[tokio::test(start_paused = true)]
async fn test_abort_policy_stops_on_rejected_frame() {
    let sway = Arc::new(MockSway {
        fail_on: Some(3),
        ..MockSway::default()
    });
    let mut dispatcher = make_dispatcher(&sway, firefox_settings());

    dispatcher
        .handle_event(&window_new(42, None, Some("Firefox")))
        .await
        .unwrap();
    let outcome = dispatcher.wait_current().await.unwrap();

    match outcome {
        JobOutcome::Failed {
            dispatched,
            error: FaderError::Dispatch { frame, .. },
        } => {
            assert_eq!(dispatched, 3);
            assert_eq!(frame, 3);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(sway.count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_continue_policy_sends_remaining_frames() {
    let sway = Arc::new(MockSway {
        fail_on: Some(3),
        ..MockSway::default()
    });
    let mut dispatcher = make_dispatcher(
        &sway,
        FaderSettings {
            job: JobOptions {
                error_policy: ErrorPolicy::Continue,
                ..JobOptions::default()
            },
            ..firefox_settings()
        },
    );

    dispatcher
        .handle_event(&window_new(42, None, Some("Firefox")))
        .await
        .unwrap();
    let outcome = dispatcher.wait_current().await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(sway.count(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_tree_failure_keeps_handler_alive() {
    let sway = Arc::new(MockSway::default());
    let mut handler = EventHandler::new(make_dispatcher(&sway, firefox_settings()));

    assert_eq!(handler.handle_event(&workspace_focus()).await.unwrap(), None);

    let job = handler
        .handle_event(&window_new(5, None, Some("Firefox")))
        .await
        .unwrap();
    assert!(job.is_some());
    assert_eq!(handler.handled(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_event_loop_shutdown_cancels_running_fade() {
    let sway = Arc::new(MockSway::default());
    let mut handler = EventHandler::new(make_dispatcher(&sway, firefox_settings()));
    let signal = handler.dispatcher().shutdown_signal();

    let (tx, rx) = mpsc::channel(8);
    tx.send(Ok(window_new(42, None, Some("Firefox"))))
        .await
        .unwrap();

    let shutdown = async {
        sleep(FRAME * 2 + FRAME / 2).await;
        Ok::<(), anyhow::Error>(())
    };
    run_event_loop(&mut handler, EventStream::from_receiver(rx), shutdown)
        .await
        .unwrap();

    assert!(signal.is_triggered());
    assert!(!handler.dispatcher().is_fading());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(sway.count(), 2);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn test_event_loop_fails_when_stream_closes() {
    let sway = Arc::new(MockSway::default());
    let mut handler = EventHandler::new(make_dispatcher(&sway, firefox_settings()));

    let (tx, rx) = mpsc::channel(8);
    tx.send(Ok(window_new(42, None, Some("Firefox"))))
        .await
        .unwrap();
    drop(tx);

    let result = run_event_loop(
        &mut handler,
        EventStream::from_receiver(rx),
        std::future::pending(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(handler.handled(), 1);
    assert_eq!(sway.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_config_file_drives_dispatcher() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(
        br#"
[fader]
fps = 30.0
duration = 100
default_rule = false

[[fader.app_id]]
pattern = "^foot$"
from = 0.5
to = 0.9
"#,
    )
    .expect("Failed to write config");

    let config = Config::load(file.path().to_str().unwrap())
        .await
        .expect("Failed to load config");
    let sway = Arc::new(MockSway::default());
    let mut dispatcher = make_dispatcher(&sway, config.fader_settings());
    assert_eq!(dispatcher.timing().num_frames, 3);

    dispatcher
        .handle_event(&window_new(3, Some("foot"), None))
        .await
        .unwrap();
    dispatcher.wait_current().await;

    assert_eq!(
        sway.commands(),
        vec![
            "[con_id=3] opacity 0.6333;",
            "[con_id=3] opacity 0.7667;",
            "[con_id=3] opacity 0.9000;",
        ]
    );
}
