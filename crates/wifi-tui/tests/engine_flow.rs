//! End-to-end flows through the mock backend, the dispatcher and the app.
//!
//! These run the real message loop minus the terminal: outcomes travel over
//! the same channel the TUI uses.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wifi_tui::app::StatusKind;
use wifi_tui::tui::perform_actions;
use wifi_tui::{
    App, Backend, Config, Dispatcher, Message, MockBackend, Outcome, ScanMode, ScanTimer, UserInput,
    View,
};

struct Harness {
    app: App,
    dispatcher: Dispatcher,
    timer: ScanTimer,
    rx: mpsc::Receiver<Message>,
}

impl Harness {
    fn new(backend: MockBackend) -> Self {
        Self::with_config(backend, &Config::default())
    }

    fn with_config(backend: MockBackend, config: &Config) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let backend: Arc<dyn Backend> = Arc::new(backend);
        Self {
            app: App::new(config, false),
            dispatcher: Dispatcher::new(backend, tx.clone()),
            timer: ScanTimer::new(tx),
            rx,
        }
    }

    fn start(&mut self) {
        let actions = self.app.start();
        perform_actions(&mut self.app, &self.dispatcher, &mut self.timer, actions);
    }

    fn input(&mut self, input: UserInput) {
        let actions = self.app.update(Message::Input(input));
        perform_actions(&mut self.app, &self.dispatcher, &mut self.timer, actions);
    }

    /// Feed whatever arrives within `window` into the app.
    async fn drain_for(&mut self, window: Duration) {
        let deadline = tokio::time::Instant::now() + window;
        while let Ok(Some(message)) = tokio::time::timeout_at(deadline, self.rx.recv()).await {
            let actions = self.app.update(message);
            perform_actions(&mut self.app, &self.dispatcher, &mut self.timer, actions);
        }
    }

    /// Feed messages into the app until `done` holds.
    async fn pump_until(&mut self, done: impl Fn(&App) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(&self.app) {
                let message = self.rx.recv().await.expect("channel open");
                let actions = self.app.update(message);
                perform_actions(&mut self.app, &self.dispatcher, &mut self.timer, actions);
            }
        })
        .await
        .expect("condition reached in time");
    }

    fn ssids(&self) -> Vec<&str> {
        self.app.connections.iter().map(|c| c.ssid.as_str()).collect()
    }

    fn select(&mut self, ssid: &str) {
        self.app.selected = self
            .app
            .connections
            .iter()
            .position(|c| c.ssid == ssid)
            .expect("network listed");
    }
}

#[tokio::test]
async fn test_initial_list_is_resolved_and_ordered() {
    let mut h = Harness::new(MockBackend::demo());
    h.start();
    h.pump_until(|app| !app.connections.is_empty() && app.radio_enabled.is_some())
        .await;

    assert_eq!(
        h.ssids(),
        vec!["Home", "Neighbour", "Library Guest", "Cafe", "Airport"]
    );
    let home = &h.app.connections[0];
    assert!(home.is_active);
    assert_eq!(home.strength(), 82);
    assert_eq!(home.access_points.len(), 2);
    assert_eq!(h.app.radio_enabled, Some(true));
    assert_eq!(h.app.scan_mode(), ScanMode::Fast);
}

#[tokio::test]
async fn test_forget_removes_saved_network() {
    let mut h = Harness::new(MockBackend::demo());
    h.start();
    h.pump_until(|app| !app.connections.is_empty()).await;

    h.select("Airport");
    h.input(UserInput::Forget);
    h.pump_until(|app| app.find("Airport").is_none()).await;

    assert!(h.app.pending_for("Airport").is_none());
    assert_eq!(h.ssids(), vec!["Home", "Neighbour", "Library Guest", "Cafe"]);
}

#[tokio::test]
async fn test_join_secured_network_through_form() {
    let mut h = Harness::new(MockBackend::demo().with_join_delay(Duration::from_millis(50)));
    h.start();
    h.pump_until(|app| !app.connections.is_empty()).await;

    h.select("Neighbour");
    h.input(UserInput::Activate);
    assert!(matches!(h.app.view, View::Join(_)));

    for c in "hunter22".chars() {
        h.input(UserInput::Char(c));
    }
    h.input(UserInput::Activate);
    assert_eq!(h.app.view, View::List);

    h.pump_until(|app| app.find("Neighbour").is_some_and(|c| c.is_active))
        .await;
    assert_eq!(h.ssids()[0], "Neighbour");
    assert!(h.app.find("Neighbour").is_some_and(|c| c.is_known));
    assert!(h.app.find("Home").is_some_and(|c| !c.is_active));
}

#[tokio::test]
async fn test_wrong_secret_reports_error() {
    let mut h = Harness::new(MockBackend::demo());
    h.start();
    h.pump_until(|app| !app.connections.is_empty()).await;

    h.select("Neighbour");
    h.input(UserInput::Activate);
    for c in "guess".chars() {
        h.input(UserInput::Char(c));
    }
    h.input(UserInput::Activate);

    h.pump_until(|app| app.pending_for("Neighbour").is_none()).await;
    let status = h.app.status.clone().expect("status set");
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.contains("Neighbour"));
    assert!(!h.app.should_quit());
}

#[tokio::test]
async fn test_radio_off_then_on() {
    let mut h = Harness::new(MockBackend::demo());
    h.start();
    h.pump_until(|app| !app.connections.is_empty() && app.radio_enabled == Some(true))
        .await;

    h.input(UserInput::ToggleRadio);
    h.pump_until(|app| app.radio_enabled == Some(false)).await;
    assert!(h.app.connections.is_empty());
    assert!(h.app.offer_radio_enable);

    // Scanning with the radio off is reported, not fatal.
    h.input(UserInput::Scan);
    h.pump_until(|app| {
        app.status
            .as_ref()
            .is_some_and(|s| s.kind == StatusKind::Error)
    })
    .await;
    assert!(h.app.offer_radio_enable);

    h.input(UserInput::ToggleRadio);
    h.pump_until(|app| app.radio_enabled == Some(true) && !app.connections.is_empty())
        .await;
    assert!(!h.app.offer_radio_enable);
}

#[tokio::test]
async fn test_list_requested_before_leaving_view_is_dropped() {
    let backend = MockBackend::demo();
    let mut h = Harness::new(backend.clone());
    h.start();
    h.pump_until(|app| !app.connections.is_empty()).await;
    let before = h.app.connections.clone();

    // Everything goes out of range, but the form opens before the result
    // is consumed.
    backend.set_visible(Vec::new());
    h.input(UserInput::Scan);
    h.input(UserInput::JoinHidden);
    assert_eq!(h.app.scan_mode(), ScanMode::Off);

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let message = h.rx.recv().await.expect("channel open");
            let is_list = matches!(
                &message,
                Message::Outcome {
                    outcome: Outcome::NetworkList { scan: true, .. },
                    ..
                }
            );
            h.app.update(message);
            if is_list {
                break;
            }
        }
    })
    .await
    .expect("list outcome in time");

    assert_eq!(h.app.connections, before);
    assert_eq!(h.app.scan_mode(), ScanMode::Off);
}

#[tokio::test]
async fn test_leaving_view_stops_periodic_scans() {
    let backend = MockBackend::demo();
    let mut config = Config::default();
    config.scan.fast_interval = Duration::from_millis(20);
    config.scan.slow_interval = Duration::from_millis(20);
    let mut h = Harness::with_config(backend.clone(), &config);
    h.start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while backend.scan_count() < 3 {
            h.drain_for(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timer drives scans");

    h.input(UserInput::JoinHidden);
    assert_eq!(h.app.scan_mode(), ScanMode::Off);

    // Scans already dispatched may still land.
    h.drain_for(Duration::from_millis(100)).await;
    let settled = backend.scan_count();

    h.drain_for(Duration::from_millis(200)).await;
    assert_eq!(backend.scan_count(), settled);
}
