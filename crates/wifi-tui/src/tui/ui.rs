//! Rendering.

use crate::app::{App, JoinField, JoinForm, StatusKind, View};
use crate::model::Connection;
use crate::scheduler::ScanMode;
use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};

/// Draw the whole screen.
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Main area
            Constraint::Length(3), // Status line
            Constraint::Length(1), // Key hints
        ])
        .split(frame.area());

    match &app.view {
        View::List => draw_list(frame, app, chunks[0]),
        View::Details { .. } => {
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[0]);
            draw_list(frame, app, halves[0]);
            draw_details(frame, app, halves[1]);
        }
        View::Join(form) => draw_join_form(frame, form, chunks[0]),
    }

    draw_status(frame, app, chunks[1]);
    draw_hints(frame, app, chunks[2]);
}

fn scan_label(app: &App) -> &'static str {
    if app.scan_paused() {
        return "paused";
    }
    match app.scan_mode() {
        ScanMode::Fast => "fast",
        ScanMode::Slow => "slow",
        ScanMode::Off => "off",
    }
}

fn yes(flag: bool) -> &'static str {
    if flag { "yes" } else { "" }
}

fn signal_cell(conn: &Connection) -> String {
    if conn.is_visible {
        format!("{:>3}%", conn.strength())
    } else {
        "  -".to_string()
    }
}

fn draw_list(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec!["", "SSID", "Signal", "Security", "Saved", "Auto", ""])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .connections
        .iter()
        .map(|conn| {
            let marker = if conn.is_active { "●" } else { "" };
            let state = app.pending_for(&conn.ssid).unwrap_or(marker);
            let style = if conn.is_active {
                Style::default().fg(Color::Green)
            } else if !conn.is_visible {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(if conn.is_hidden { "h" } else { "" }),
                Cell::from(conn.ssid.clone()),
                Cell::from(signal_cell(conn)),
                Cell::from(conn.security.to_string()),
                Cell::from(yes(conn.is_known)),
                Cell::from(yes(conn.is_known && conn.auto_connect)),
                Cell::from(state),
            ])
            .style(style)
        })
        .collect();

    let title = format!(
        " Wi-Fi ({} networks) ─ scan: {} ",
        app.connections.len(),
        scan_label(app)
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(16),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Length(5),
            Constraint::Length(4),
            Constraint::Length(11),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol("> ");

    let mut state = TableState::default();
    if !app.connections.is_empty() {
        state.select(Some(app.selected));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_details(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title(" Details ").borders(Borders::ALL);
    let Some(conn) = app.details_connection() else {
        frame.render_widget(Paragraph::new("Network not available").block(block), area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("SSID:      ", Style::default().fg(Color::Cyan)),
            Span::raw(conn.ssid.clone()),
        ]),
        Line::from(format!("Security:  {}", conn.security)),
        Line::from(format!(
            "State:     {}",
            if conn.is_active {
                "connected"
            } else if conn.is_visible {
                "in range"
            } else {
                "out of range"
            }
        )),
        Line::from(format!("Saved:     {}", if conn.is_known { "yes" } else { "no" })),
    ];

    if conn.is_known {
        lines.push(Line::from(format!(
            "Auto:      {}",
            if conn.auto_connect { "on" } else { "off" }
        )));
        let last = conn
            .last_connected
            .map(|ts| {
                let days = (Utc::now() - ts).num_days();
                match days {
                    0 => "today".to_string(),
                    1 => "yesterday".to_string(),
                    n => format!("{} days ago", n),
                }
            })
            .unwrap_or_else(|| "never".to_string());
        lines.push(Line::from(format!("Last used: {}", last)));
    }

    if let Some((ssid, secret)) = &app.revealed_secret {
        if *ssid == conn.ssid {
            lines.push(Line::from(vec![
                Span::styled("Secret:    ", Style::default().fg(Color::Yellow)),
                Span::raw(secret.clone()),
            ]));
        }
    }

    if !conn.access_points.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Access points",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (ap, bssid) in conn.access_points.iter().zip(conn.bssids()) {
            let band = ap.band().map(|b| b.to_string()).unwrap_or_default();
            let label = if app.ui.show_bssids {
                format!("{}  ", bssid)
            } else {
                String::new()
            };
            lines.push(Line::from(format!(
                "  {}{:>3}%  {} MHz {}",
                label, ap.strength, ap.frequency, band
            )));
        }
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_join_form(frame: &mut Frame, form: &JoinForm, area: Rect) {
    let focus = |field: JoinField| {
        if form.field == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    let title = if form.hidden {
        " Join hidden network ".to_string()
    } else {
        format!(" Join {} ", form.ssid)
    };
    let masked: String = "*".repeat(form.password.chars().count());
    let lines = vec![
        Line::from(vec![
            Span::styled("Network:  ", focus(JoinField::Ssid)),
            Span::raw(form.ssid.clone()),
        ]),
        Line::from(format!("Security: {}", form.security)),
        Line::from(vec![
            Span::styled("Password: ", focus(JoinField::Password)),
            Span::raw(masked),
        ]),
    ];

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL)),
        area,
    );
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = match &app.status {
        Some(status) => (
            status.text.clone(),
            match status.kind {
                StatusKind::Info => Style::default(),
                StatusKind::Error => Style::default().fg(Color::Red),
            },
        ),
        None => (String::new(), Style::default()),
    };
    let radio = match app.radio_enabled {
        Some(true) => "radio on",
        Some(false) => "radio off",
        None => "radio ?",
    };
    frame.render_widget(
        Paragraph::new(Span::styled(text, style))
            .block(Block::default().title(format!(" {} ", radio)).borders(Borders::ALL)),
        area,
    );
}

fn draw_hints(frame: &mut Frame, app: &App, area: Rect) {
    let hints = match (&app.view, app.offer_radio_enable) {
        (View::Join(_), _) => "[Enter] Join  [Tab] Field  [Esc] Cancel",
        (_, true) => "[W] Turn Wi-Fi on  [Q] Quit",
        (View::Details { .. }, _) => {
            "[Enter] Connect  [P] Secret  [A] Auto  [F] Forget  [Esc] Back  [Q] Quit"
        }
        (View::List, _) => {
            "[Enter] Connect  [D] Details  [F] Forget  [R] Scan  [S] Pause  [H] Hidden  [W] Radio  [Q] Quit"
        }
    };
    frame.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
