//! Wi-Fi network state resolution
//!
//! This crate turns raw observations from a wireless backend into one
//! display-ready list of networks, and keeps that list fresh without
//! blocking the interface:
//!
//! - **Backend contract**: saved profiles, visible access points and the
//!   active network, plus connect / forget / join operations
//! - **List resolver**: merges saved and visible data into one entry per SSID
//! - **Ordering**: active first, then visible by signal, then saved by recency
//! - **Adaptive scanning**: fast while things change, slow once stable, off
//!   when nobody is looking
//! - **Async commands**: backend work runs off the event loop and reports
//!   back through one channel
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  keys   ┌────────────────────────────────────────────┐
//! │   Terminal   ├────────►│                    App                      │
//! └──────────────┘         │  update(Message) -> Vec<AppAction>          │
//!                          │  ┌──────────────┐                           │
//!                          │  │ScanScheduler │ fast / slow / off         │
//!                          │  └──────────────┘                           │
//!                          └───────┬──────────────────────────▲──────────┘
//!                                  │ Dispatch / Timer          │ Message
//!                          ┌───────▼────────┐   ┌──────────────┴──────────┐
//!                          │   Dispatcher   ├──►│  mpsc::Sender<Message>  │
//!                          │ (tokio tasks)  │   │  outcomes + scan ticks  │
//!                          └───────┬────────┘   └──────────────▲──────────┘
//!                                  │                           │
//!                          ┌───────▼────────┐          ┌───────┴────────┐
//!                          │ dyn Backend    │          │   ScanTimer    │
//!                          │ resolve + sort │          └────────────────┘
//!                          └────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wifi_tui::{Backend, MockBackend, build_network_list};
//!
//! let backend: Arc<dyn Backend> = Arc::new(MockBackend::demo());
//! for conn in build_network_list(backend.as_ref(), true).await? {
//!     println!("{} {}%", conn.ssid, conn.strength());
//! }
//! ```

pub mod app;
pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod resolver;
pub mod scheduler;
pub mod tui;

pub use app::{App, AppAction, UserInput, View};
pub use backend::{Backend, ConnectionOptions, JoinRequest, MockBackend};
pub use command::{Command, Dispatcher, Message, Outcome, Ticket, execute};
pub use config::Config;
pub use error::{Result, WifiError};
pub use model::{AccessPoint, Connection, KnownNetwork, SecurityType};
pub use ordering::sort_connections;
pub use resolver::{build_network_list, resolve};
pub use scheduler::{ScanMode, ScanScheduler, ScanTimer};
pub use tui::run_tui;
