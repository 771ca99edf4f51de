//! Terminal User Interface Module
//!
//! Owns the terminal and the event loop. Every state change goes through
//! [`App::update`]; this module only translates keys into [`UserInput`],
//! carries out the returned [`AppAction`]s and redraws.
//!
//! # Layout
//!
//! ```text
//! ┌ Wi-Fi (5 networks) ─ scan: fast ────────────────────────┐
//! │   SSID            Signal  Security  Saved  Auto         │
//! │ > Home              82%   WPA       yes    yes   ●      │
//! │   Neighbour         45%   WPA                           │
//! │   Cafe               -    open      yes    yes          │
//! ├─────────────────────────────────────────────────────────┤
//! │ Connected to Home                                       │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod ui;

use crate::app::{App, AppAction, UserInput, View};
use crate::command::{Dispatcher, Message};
use crate::config::UiConfig;
use crate::scheduler::ScanTimer;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Write};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Translate a key press into an input intent.
///
/// The join form captures printable characters, so it gets its own mapping.
pub fn input_for_key(key: KeyEvent, editing: bool) -> Option<UserInput> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UserInput::Quit);
    }

    if editing {
        return match key.code {
            KeyCode::Enter => Some(UserInput::Activate),
            KeyCode::Esc => Some(UserInput::Back),
            KeyCode::Tab | KeyCode::BackTab => Some(UserInput::NextField),
            KeyCode::Backspace => Some(UserInput::Backspace),
            KeyCode::Char(c) => Some(UserInput::Char(c)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(UserInput::Quit),
        KeyCode::Up | KeyCode::Char('k') => Some(UserInput::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(UserInput::Down),
        KeyCode::Enter => Some(UserInput::Activate),
        KeyCode::Esc => Some(UserInput::Back),
        KeyCode::Char('d') => Some(UserInput::Details),
        KeyCode::Char('f') => Some(UserInput::Forget),
        KeyCode::Char('r') => Some(UserInput::Scan),
        KeyCode::Char('s') => Some(UserInput::TogglePause),
        KeyCode::Char('w') => Some(UserInput::ToggleRadio),
        KeyCode::Char('a') => Some(UserInput::ToggleAutoConnect),
        KeyCode::Char('p') => Some(UserInput::RevealSecret),
        KeyCode::Char('h') => Some(UserInput::JoinHidden),
        _ => None,
    }
}

/// Carry out actions returned by [`App::update`].
///
/// Returns `true` once a quit action has been seen.
pub fn perform_actions(
    app: &mut App,
    dispatcher: &Dispatcher,
    timer: &mut ScanTimer,
    actions: Vec<AppAction>,
) -> bool {
    let mut quit = false;
    for action in actions {
        match action {
            AppAction::Dispatch(command) => {
                let ticket = dispatcher.dispatch(command.clone());
                app.track(ticket, &command);
            }
            AppAction::DispatchBatch(commands) => {
                let tickets = dispatcher.dispatch_batch(commands.clone());
                for (ticket, command) in tickets.into_iter().zip(commands.iter()) {
                    app.track(ticket, command);
                }
            }
            AppAction::Timer(change) => timer.apply(change),
            AppAction::Quit => quit = true,
        }
    }
    quit
}

/// Run the terminal UI until the user quits.
///
/// # Arguments
/// * `app` - The application state
/// * `dispatcher` - Runs backend commands off the event loop
/// * `rx` - Receiver for outcomes, timer ticks and other messages
/// * `tx` - Sender handed to the scan timer
/// * `config` - Presentation settings
pub async fn run_tui(
    mut app: App,
    dispatcher: Dispatcher,
    mut rx: mpsc::Receiver<Message>,
    tx: mpsc::Sender<Message>,
    config: &UiConfig,
) -> anyhow::Result<()> {
    // Restore the terminal if anything panics while it is in raw mode
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = io::stdout().flush();
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    stdout.flush()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    info!("Starting TUI with backend {}", dispatcher.backend_name());

    let mut timer = ScanTimer::new(tx);
    let mut events = EventStream::new();
    let mut redraw = tokio::time::interval(config.tick_rate);

    let start = app.start();
    let mut quit = perform_actions(&mut app, &dispatcher, &mut timer, start);

    while !quit {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        let actions = tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    let editing = matches!(app.view, View::Join(_));
                    match input_for_key(key, editing) {
                        Some(input) => app.update(Message::Input(input)),
                        None => Vec::new(),
                    }
                }
                Some(Ok(_)) => Vec::new(),
                Some(Err(e)) => {
                    warn!("Terminal event error: {}", e);
                    Vec::new()
                }
                None => app.update(Message::Quit),
            },
            message = rx.recv() => match message {
                Some(message) => app.update(message),
                None => app.update(Message::Quit),
            },
            _ = redraw.tick() => Vec::new(),
        };

        quit = perform_actions(&mut app, &dispatcher, &mut timer, actions) || app.should_quit();
    }

    timer.cancel();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    let _ = io::stdout().flush();

    info!("TUI stopped");
    Ok(())
}
