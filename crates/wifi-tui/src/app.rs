//! Application state and message handling.
//!
//! [`App`] is the single consumer of [`Message`]s. It performs no I/O:
//! [`App::update`] applies a message and returns the [`AppAction`]s the
//! runtime has to carry out (dispatch backend work, adjust the scan timer,
//! quit). The same code runs under the terminal loop and in tests.

use crate::backend::{ConnectionOptions, JoinRequest};
use crate::command::{Command, Message, Outcome, Ticket};
use crate::config::{Config, UiConfig};
use crate::error::WifiError;
use crate::model::{Connection, SecurityType};
use crate::scheduler::{ScanDirective, ScanMode, ScanScheduler, TimerChange};
use tracing::{debug, info, warn};

/// Intents produced by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput {
    /// Move the selection up
    Up,
    /// Move the selection down
    Down,
    /// Connect to the selected network / submit the join form
    Activate,
    /// Show details of the selected network
    Details,
    /// Leave the current view
    Back,
    /// Forget the selected network
    Forget,
    /// Scan now
    Scan,
    /// Pause or resume periodic scanning
    TogglePause,
    /// Switch the radio
    ToggleRadio,
    /// Flip auto-connect on the selected saved network
    ToggleAutoConnect,
    /// Show the stored secret of the selected network
    RevealSecret,
    /// Open the join form for a hidden network
    JoinHidden,
    /// Type into the join form
    Char(char),
    /// Delete from the join form
    Backspace,
    /// Switch join form field
    NextField,
    /// Leave the application
    Quit,
}

/// Work the runtime must perform after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Run one command
    Dispatch(Command),
    /// Run commands sequentially
    DispatchBatch(Vec<Command>),
    /// Adjust the scan timer
    Timer(TimerChange),
    /// Stop the event loop
    Quit,
}

/// Field focused in the join form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinField {
    /// Network name (hidden networks only)
    Ssid,
    /// Credential
    #[default]
    Password,
}

/// State of the join form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinForm {
    /// Network name
    pub ssid: String,
    /// Credential typed so far
    pub password: String,
    /// Security scheme to configure
    pub security: SecurityType,
    /// Joining a hidden network
    pub hidden: bool,
    /// Focused field
    pub field: JoinField,
}

/// What is on screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    /// Network list
    #[default]
    List,
    /// Details of one network, looked up by SSID on every render
    Details {
        /// Network shown
        ssid: String,
    },
    /// Join form
    Join(JoinForm),
}

impl View {
    /// Whether the view shows live scan data.
    pub fn wants_live_data(&self) -> bool {
        matches!(self, Self::List | Self::Details { .. })
    }
}

/// Severity of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Neutral information
    Info,
    /// A failed operation
    Error,
}

/// The status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Severity
    pub kind: StatusKind,
    /// Text shown
    pub text: String,
}

/// Application running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Application is running normally
    Running,
    /// Application is shutting down
    Quitting,
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    /// Running or quitting
    pub state: AppState,
    /// Latest resolved snapshot, display ordered
    pub connections: Vec<Connection>,
    /// Selected row in the list
    pub selected: usize,
    /// Current view
    pub view: View,
    /// Status line
    pub status: Option<Status>,
    /// Last known radio state
    pub radio_enabled: Option<bool>,
    /// The radio is off and the UI should offer to enable it
    pub offer_radio_enable: bool,
    /// Secret revealed in the details view
    pub revealed_secret: Option<(String, String)>,
    /// Operation in flight per SSID, for display
    pub pending: Vec<(String, &'static str)>,
    /// Presentation settings
    pub ui: UiConfig,
    scheduler: ScanScheduler,
    start_paused: bool,
    highest_ticket: Ticket,
    last_list_ticket: Ticket,
    lists_valid_from: Ticket,
    last_radio_ticket: Ticket,
}

impl App {
    /// Create the application state.
    pub fn new(config: &Config, start_paused: bool) -> Self {
        Self {
            state: AppState::Running,
            connections: Vec::new(),
            selected: 0,
            view: View::List,
            status: None,
            radio_enabled: None,
            offer_radio_enable: false,
            revealed_secret: None,
            pending: Vec::new(),
            ui: config.ui.clone(),
            scheduler: ScanScheduler::new(config.scan.clone()),
            start_paused,
            highest_ticket: 0,
            last_list_ticket: 0,
            lists_valid_from: 0,
            last_radio_ticket: 0,
        }
    }

    /// Actions to run once the event loop starts.
    pub fn start(&mut self) -> Vec<AppAction> {
        let mut actions = vec![AppAction::Dispatch(Command::QueryRadio)];
        if self.start_paused {
            self.scheduler.set_paused(true);
            actions.push(AppAction::Dispatch(Command::Refresh { scan: false }));
        }
        let directive = self.scheduler.enter_view();
        actions.extend(directive_actions(directive));
        actions
    }

    /// Check if the application should quit.
    pub fn should_quit(&self) -> bool {
        self.state == AppState::Quitting
    }

    /// Current scan mode.
    pub fn scan_mode(&self) -> ScanMode {
        self.scheduler.mode()
    }

    /// Whether periodic scanning is paused.
    pub fn scan_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    /// Record the ticket a dispatched command was given.
    pub fn track(&mut self, ticket: Ticket, command: &Command) {
        self.highest_ticket = self.highest_ticket.max(ticket);
        debug!("Tracking ticket {} for {}", ticket, command.name());
    }

    /// The connection under the cursor.
    pub fn selected_connection(&self) -> Option<&Connection> {
        self.connections.get(self.selected)
    }

    /// The connection shown in the details view, fetched by SSID.
    pub fn details_connection(&self) -> Option<&Connection> {
        match &self.view {
            View::Details { ssid } => self.find(ssid),
            _ => None,
        }
    }

    /// Find a connection in the latest snapshot.
    pub fn find(&self, ssid: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.ssid == ssid)
    }

    /// Operation in flight for `ssid`.
    pub fn pending_for(&self, ssid: &str) -> Option<&'static str> {
        self.pending
            .iter()
            .find(|(pending, _)| pending == ssid)
            .map(|(_, op)| *op)
    }

    fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Error,
            text: text.into(),
        });
    }

    fn mark_pending(&mut self, ssid: &str, op: &'static str) {
        self.clear_pending(ssid);
        self.pending.push((ssid.to_string(), op));
    }

    fn clear_pending(&mut self, ssid: &str) {
        self.pending.retain(|(pending, _)| pending != ssid);
    }

    fn report_error(&mut self, context: &str, error: &WifiError) {
        if error.is_wireless_disabled() {
            self.radio_enabled = Some(false);
            self.offer_radio_enable = true;
            self.set_error("Wi-Fi is off. Press w to turn it on");
        } else if error.is_not_supported() {
            self.set_error(format!("{}: not available with this backend", context));
        } else {
            self.set_error(format!("{}: {}", context, error));
        }
        warn!("{}: {}", context, error);
    }

    /// Apply one message.
    pub fn update(&mut self, message: Message) -> Vec<AppAction> {
        match message {
            Message::Outcome { ticket, outcome } => self.apply_outcome(ticket, outcome),
            Message::ScanTick { generation } => {
                directive_actions(self.scheduler.on_tick(generation))
            }
            Message::Input(input) => self.apply_input(input),
            Message::Quit => self.quit(),
        }
    }

    fn quit(&mut self) -> Vec<AppAction> {
        self.state = AppState::Quitting;
        let mut actions = directive_actions(self.scheduler.leave_view());
        actions.push(AppAction::Quit);
        actions
    }

    fn refresh() -> AppAction {
        AppAction::Dispatch(Command::Refresh { scan: false })
    }

    fn set_view(&mut self, view: View) -> Vec<AppAction> {
        let was_live = self.view.wants_live_data();
        let is_live = view.wants_live_data();
        self.view = view;
        self.revealed_secret = None;

        match (was_live, is_live) {
            (true, false) => {
                // Lists requested before this point no longer apply.
                self.lists_valid_from = self.highest_ticket + 1;
                directive_actions(self.scheduler.leave_view())
            }
            (false, true) => directive_actions(self.scheduler.enter_view()),
            _ => Vec::new(),
        }
    }

    /// Whether a list result, success or failure, may still be applied.
    ///
    /// Accepting it makes it the newest applied list result.
    fn fresh_list(&mut self, ticket: Ticket) -> bool {
        if !self.view.wants_live_data() || ticket < self.lists_valid_from {
            debug!("Dropping list from ticket {}, view changed", ticket);
            return false;
        }
        if ticket < self.last_list_ticket {
            debug!(
                "Dropping list from ticket {}, ticket {} already applied",
                ticket, self.last_list_ticket
            );
            return false;
        }
        self.last_list_ticket = ticket;
        true
    }

    fn apply_list(&mut self, ticket: Ticket, scan: bool, list: Vec<Connection>) {
        if !self.fresh_list(ticket) {
            return;
        }

        if scan {
            self.scheduler.record_result(!list.is_empty());
        }

        let selected_ssid = self.selected_connection().map(|c| c.ssid.clone());
        self.connections = list;
        self.selected = selected_ssid
            .and_then(|ssid| self.connections.iter().position(|c| c.ssid == ssid))
            .unwrap_or(0)
            .min(self.connections.len().saturating_sub(1));

        if !self.connections.is_empty() && self.radio_enabled != Some(true) {
            self.radio_enabled = Some(true);
            self.offer_radio_enable = false;
        }

        if let View::Details { ssid } = &self.view {
            if self.find(ssid).is_none() {
                let ssid = ssid.clone();
                self.view = View::List;
                self.set_info(format!("{} is no longer available", ssid));
            }
        }
    }

    /// Radio reports can overtake each other; only the newest counts.
    fn fresh_radio_report(&mut self, ticket: Ticket) -> bool {
        if ticket < self.last_radio_ticket {
            debug!("Dropping radio report from ticket {}", ticket);
            return false;
        }
        self.last_radio_ticket = ticket;
        true
    }

    fn apply_outcome(&mut self, ticket: Ticket, outcome: Outcome) -> Vec<AppAction> {
        match outcome {
            Outcome::NetworkList { scan, result } => {
                match result {
                    Ok(list) => self.apply_list(ticket, scan, list),
                    Err(e) if e.is_wireless_disabled() && ticket < self.last_radio_ticket => {
                        debug!("Dropping radio-off error from ticket {}", ticket);
                    }
                    Err(e) => {
                        if !self.fresh_list(ticket) {
                            return Vec::new();
                        }
                        if scan {
                            self.scheduler.record_result(false);
                        }
                        if e.is_wireless_disabled() {
                            self.connections.clear();
                            self.selected = 0;
                        }
                        self.report_error("Scan failed", &e);
                    }
                }
                Vec::new()
            }
            Outcome::Activated { ssid, result } => {
                self.clear_pending(&ssid);
                match result {
                    Ok(()) => {
                        info!("Connected to {}", ssid);
                        self.set_info(format!("Connected to {}", ssid));
                        vec![Self::refresh()]
                    }
                    Err(e) => {
                        self.report_error(&format!("Connecting to {}", ssid), &e);
                        Vec::new()
                    }
                }
            }
            Outcome::Forgotten { ssid, result } => {
                self.clear_pending(&ssid);
                match result {
                    Ok(()) => {
                        info!("Forgot {}", ssid);
                        self.set_info(format!("Forgot {}", ssid));
                        Vec::new()
                    }
                    Err(e) => {
                        self.report_error(&format!("Forgetting {}", ssid), &e);
                        Vec::new()
                    }
                }
            }
            Outcome::Joined { ssid, result } => {
                self.clear_pending(&ssid);
                match result {
                    Ok(()) => {
                        info!("Joined {}", ssid);
                        self.set_info(format!("Joined {}", ssid));
                        vec![Self::refresh()]
                    }
                    Err(e) => {
                        self.report_error(&format!("Joining {}", ssid), &e);
                        Vec::new()
                    }
                }
            }
            Outcome::Secret { ssid, result } => {
                match result {
                    Ok(secret) => {
                        if self.details_connection().is_some_and(|c| c.ssid == ssid) {
                            self.revealed_secret = Some((ssid, secret));
                        } else {
                            debug!("Secret for {} arrived after its view closed", ssid);
                        }
                    }
                    Err(e) => self.report_error(&format!("Reading secret of {}", ssid), &e),
                }
                Vec::new()
            }
            Outcome::Updated { ssid, result } => {
                self.clear_pending(&ssid);
                match result {
                    Ok(()) => {
                        self.set_info(format!("Updated {}", ssid));
                        vec![Self::refresh()]
                    }
                    Err(e) => {
                        self.report_error(&format!("Updating {}", ssid), &e);
                        Vec::new()
                    }
                }
            }
            Outcome::RadioState { result } => {
                match result {
                    Ok(enabled) if self.fresh_radio_report(ticket) => {
                        self.radio_enabled = Some(enabled);
                        self.offer_radio_enable = !enabled;
                    }
                    Ok(_) => {}
                    Err(e) if e.is_not_supported() => {
                        debug!("Radio state unavailable: {}", e);
                    }
                    Err(e) => self.report_error("Reading radio state", &e),
                }
                Vec::new()
            }
            Outcome::RadioSet { enabled, result } => match result {
                Ok(()) if !self.fresh_radio_report(ticket) => Vec::new(),
                Ok(()) => {
                    self.radio_enabled = Some(enabled);
                    self.offer_radio_enable = !enabled;
                    if enabled {
                        self.set_info("Wi-Fi on");
                        directive_actions(self.scheduler.request_scan())
                    } else {
                        self.set_info("Wi-Fi off");
                        // Lists read before the radio went off are outdated.
                        self.lists_valid_from = self.lists_valid_from.max(ticket + 1);
                        self.connections.clear();
                        self.selected = 0;
                        Vec::new()
                    }
                }
                Err(e) => {
                    let context = if enabled {
                        "Turning Wi-Fi on"
                    } else {
                        "Turning Wi-Fi off"
                    };
                    self.report_error(context, &e);
                    Vec::new()
                }
            },
        }
    }

    fn target_ssid(&self) -> Option<String> {
        match &self.view {
            View::Details { ssid } => Some(ssid.clone()),
            View::List => self.selected_connection().map(|c| c.ssid.clone()),
            View::Join(_) => None,
        }
    }

    fn apply_input(&mut self, input: UserInput) -> Vec<AppAction> {
        if let View::Join(form) = &mut self.view {
            match input {
                UserInput::Char(c) => {
                    match form.field {
                        JoinField::Ssid => form.ssid.push(c),
                        JoinField::Password => form.password.push(c),
                    }
                    return Vec::new();
                }
                UserInput::Backspace => {
                    match form.field {
                        JoinField::Ssid => form.ssid.pop(),
                        JoinField::Password => form.password.pop(),
                    };
                    return Vec::new();
                }
                UserInput::NextField => {
                    if form.hidden {
                        form.field = match form.field {
                            JoinField::Ssid => JoinField::Password,
                            JoinField::Password => JoinField::Ssid,
                        };
                    }
                    return Vec::new();
                }
                UserInput::Activate => return self.submit_join(),
                UserInput::Back => return self.set_view(View::List),
                UserInput::Quit => return self.quit(),
                _ => return Vec::new(),
            }
        }

        match input {
            UserInput::Up => {
                self.selected = self.selected.saturating_sub(1);
                Vec::new()
            }
            UserInput::Down => {
                if self.selected + 1 < self.connections.len() {
                    self.selected += 1;
                }
                Vec::new()
            }
            UserInput::Activate => self.activate_target(),
            UserInput::Details => match self.selected_connection() {
                Some(conn) if self.view == View::List => {
                    let ssid = conn.ssid.clone();
                    self.set_view(View::Details { ssid })
                }
                _ => Vec::new(),
            },
            UserInput::Back => match self.view {
                View::Details { .. } => self.set_view(View::List),
                _ => Vec::new(),
            },
            UserInput::Forget => self.forget_target(),
            UserInput::Scan => {
                self.set_info("Scanning...");
                directive_actions(self.scheduler.request_scan())
            }
            UserInput::TogglePause => {
                let paused = !self.scheduler.is_paused();
                self.set_info(if paused {
                    "Periodic scanning paused"
                } else {
                    "Periodic scanning resumed"
                });
                directive_actions(self.scheduler.set_paused(paused))
            }
            UserInput::ToggleRadio => {
                let enabled = !self.radio_enabled.unwrap_or(true);
                vec![AppAction::Dispatch(Command::SetRadio { enabled })]
            }
            UserInput::ToggleAutoConnect => self.toggle_auto_connect(),
            UserInput::RevealSecret => match self.details_connection() {
                Some(conn) if conn.is_known => {
                    let ssid = conn.ssid.clone();
                    vec![AppAction::Dispatch(Command::GetSecret { ssid })]
                }
                Some(_) => {
                    self.set_info("No saved secret for this network");
                    Vec::new()
                }
                None => Vec::new(),
            },
            UserInput::JoinHidden => self.set_view(View::Join(JoinForm {
                hidden: true,
                security: SecurityType::Wpa,
                field: JoinField::Ssid,
                ..Default::default()
            })),
            UserInput::Quit => self.quit(),
            UserInput::Char(_) | UserInput::Backspace | UserInput::NextField => Vec::new(),
        }
    }

    fn activate_target(&mut self) -> Vec<AppAction> {
        let Some(ssid) = self.target_ssid() else {
            return Vec::new();
        };
        let Some(conn) = self.find(&ssid).cloned() else {
            return Vec::new();
        };

        if conn.is_active {
            self.set_info(format!("Already connected to {}", ssid));
            return Vec::new();
        }
        if self.pending_for(&ssid).is_some() {
            return Vec::new();
        }

        if conn.is_known {
            self.mark_pending(&ssid, "connecting");
            self.set_info(format!("Connecting to {}...", ssid));
            return vec![AppAction::Dispatch(Command::Activate { ssid })];
        }

        if conn.is_secure() {
            return self.set_view(View::Join(JoinForm {
                ssid,
                security: conn.security,
                ..Default::default()
            }));
        }

        self.mark_pending(&ssid, "joining");
        self.set_info(format!("Joining {}...", ssid));
        vec![AppAction::Dispatch(Command::Join(JoinRequest {
            ssid,
            password: String::new(),
            security: SecurityType::Open,
            hidden: false,
        }))]
    }

    fn submit_join(&mut self) -> Vec<AppAction> {
        let View::Join(form) = &self.view else {
            return Vec::new();
        };
        if form.ssid.is_empty() {
            self.set_error("Network name is required");
            return Vec::new();
        }
        if form.security.is_secure() && form.password.is_empty() {
            self.set_error("Password is required");
            return Vec::new();
        }

        let request = JoinRequest {
            ssid: form.ssid.clone(),
            password: form.password.clone(),
            security: if form.password.is_empty() {
                SecurityType::Open
            } else {
                form.security
            },
            hidden: form.hidden,
        };
        let ssid = request.ssid.clone();
        self.mark_pending(&ssid, "joining");
        self.set_info(format!("Joining {}...", ssid));

        let mut actions = vec![AppAction::Dispatch(Command::Join(request))];
        actions.extend(self.set_view(View::List));
        actions
    }

    fn forget_target(&mut self) -> Vec<AppAction> {
        let Some(ssid) = self.target_ssid() else {
            return Vec::new();
        };
        match self.find(&ssid) {
            Some(conn) if conn.is_known => {
                self.mark_pending(&ssid, "forgetting");
                // The list is re-read only after the profile is gone.
                vec![AppAction::DispatchBatch(vec![
                    Command::Forget { ssid },
                    Command::Refresh { scan: false },
                ])]
            }
            Some(_) => {
                self.set_info(format!("{} is not saved", ssid));
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn toggle_auto_connect(&mut self) -> Vec<AppAction> {
        let Some(ssid) = self.target_ssid() else {
            return Vec::new();
        };
        match self.find(&ssid) {
            Some(conn) if conn.is_known => {
                let options = ConnectionOptions {
                    auto_connect: Some(!conn.auto_connect),
                    ..Default::default()
                };
                self.mark_pending(&ssid, "updating");
                vec![AppAction::Dispatch(Command::Update { ssid, options })]
            }
            Some(_) => {
                self.set_info(format!("{} is not saved", ssid));
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}

fn directive_actions(directive: ScanDirective) -> Vec<AppAction> {
    let mut actions = Vec::new();
    if directive.scan_now {
        actions.push(AppAction::Dispatch(Command::Refresh { scan: true }));
    }
    if directive.timer != TimerChange::Keep {
        actions.push(AppAction::Timer(directive.timer));
    }
    actions
}
