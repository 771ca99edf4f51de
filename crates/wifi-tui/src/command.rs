//! Asynchronous command/result plumbing.
//!
//! Every backend operation runs as its own tokio task: one backend call plus
//! light post-processing, producing exactly one [`Outcome`] that is posted
//! into the consumer's single inbound channel. Outcomes carry their own
//! context (SSID, requested state) and a monotonically increasing
//! [`Ticket`], so the consumer can apply them regardless of arrival order.

use crate::app::UserInput;
use crate::backend::{Backend, ConnectionOptions, JoinRequest};
use crate::error::{Result, WifiError};
use crate::model::Connection;
use crate::resolver::build_network_list;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Identifies one dispatched unit of work. Later dispatches get larger tickets.
pub type Ticket = u64;

/// A backend operation requested by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a resolution cycle
    Refresh {
        /// Trigger a fresh radio scan first
        scan: bool,
    },
    /// Associate with a saved network
    Activate {
        /// Target network
        ssid: String,
    },
    /// Delete a saved profile
    Forget {
        /// Target network
        ssid: String,
    },
    /// Create a profile and associate
    Join(JoinRequest),
    /// Read a stored credential
    GetSecret {
        /// Target network
        ssid: String,
    },
    /// Modify a saved profile
    Update {
        /// Target network
        ssid: String,
        /// Fields to change
        options: ConnectionOptions,
    },
    /// Read the radio state
    QueryRadio,
    /// Switch the radio
    SetRadio {
        /// Requested state
        enabled: bool,
    },
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Refresh { scan: true } => "scan",
            Self::Refresh { scan: false } => "refresh",
            Self::Activate { .. } => "activate",
            Self::Forget { .. } => "forget",
            Self::Join(_) => "join",
            Self::GetSecret { .. } => "get_secret",
            Self::Update { .. } => "update",
            Self::QueryRadio => "query_radio",
            Self::SetRadio { .. } => "set_radio",
        }
    }
}

/// The typed result of one [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A resolved, display-ordered snapshot
    NetworkList {
        /// Whether a fresh scan was requested
        scan: bool,
        /// Connections or the scan failure
        result: Result<Vec<Connection>>,
    },
    /// Result of [`Command::Activate`]
    Activated {
        /// Target network
        ssid: String,
        /// Success or failure
        result: Result<()>,
    },
    /// Result of [`Command::Forget`]
    Forgotten {
        /// Target network
        ssid: String,
        /// Success or failure
        result: Result<()>,
    },
    /// Result of [`Command::Join`]
    Joined {
        /// Target network
        ssid: String,
        /// Success or failure
        result: Result<()>,
    },
    /// Result of [`Command::GetSecret`]
    Secret {
        /// Target network
        ssid: String,
        /// The stored credential
        result: Result<String>,
    },
    /// Result of [`Command::Update`]
    Updated {
        /// Target network
        ssid: String,
        /// Success or failure
        result: Result<()>,
    },
    /// Result of [`Command::QueryRadio`]
    RadioState {
        /// Whether the radio is on
        result: Result<bool>,
    },
    /// Result of [`Command::SetRadio`]
    RadioSet {
        /// Requested state
        enabled: bool,
        /// Success or failure
        result: Result<()>,
    },
}

impl Outcome {
    /// The failure outcome `command` would have produced.
    pub fn failure(command: &Command, error: WifiError) -> Self {
        match command {
            Command::Refresh { scan } => Self::NetworkList {
                scan: *scan,
                result: Err(error),
            },
            Command::Activate { ssid } => Self::Activated {
                ssid: ssid.clone(),
                result: Err(error),
            },
            Command::Forget { ssid } => Self::Forgotten {
                ssid: ssid.clone(),
                result: Err(error),
            },
            Command::Join(request) => Self::Joined {
                ssid: request.ssid.clone(),
                result: Err(error),
            },
            Command::GetSecret { ssid } => Self::Secret {
                ssid: ssid.clone(),
                result: Err(error),
            },
            Command::Update { ssid, .. } => Self::Updated {
                ssid: ssid.clone(),
                result: Err(error),
            },
            Command::QueryRadio => Self::RadioState { result: Err(error) },
            Command::SetRadio { enabled } => Self::RadioSet {
                enabled: *enabled,
                result: Err(error),
            },
        }
    }

    /// The error carried by this outcome, if any.
    pub fn error(&self) -> Option<&WifiError> {
        match self {
            Self::NetworkList { result, .. } => result.as_ref().err(),
            Self::Secret { result, .. } => result.as_ref().err(),
            Self::RadioState { result } => result.as_ref().err(),
            Self::Activated { result, .. }
            | Self::Forgotten { result, .. }
            | Self::Joined { result, .. }
            | Self::Updated { result, .. }
            | Self::RadioSet { result, .. } => result.as_ref().err(),
        }
    }
}

/// Everything the consumer receives, through one channel.
#[derive(Debug, Clone)]
pub enum Message {
    /// A dispatched command finished
    Outcome {
        /// Ticket returned by the dispatch
        ticket: Ticket,
        /// Its result
        outcome: Outcome,
    },
    /// The scan timer fired
    ScanTick {
        /// Generation the timer was armed with
        generation: u64,
    },
    /// The user did something
    Input(UserInput),
    /// Shut down
    Quit,
}

/// Run one command against a backend.
pub async fn execute(backend: &dyn Backend, command: Command) -> Outcome {
    match command {
        Command::Refresh { scan } => Outcome::NetworkList {
            scan,
            result: build_network_list(backend, scan).await,
        },
        Command::Activate { ssid } => {
            let result = backend.activate(&ssid).await;
            Outcome::Activated { ssid, result }
        }
        Command::Forget { ssid } => {
            let result = backend.forget(&ssid).await;
            Outcome::Forgotten { ssid, result }
        }
        Command::Join(request) => {
            let result = backend.join(&request).await;
            Outcome::Joined {
                ssid: request.ssid,
                result,
            }
        }
        Command::GetSecret { ssid } => {
            let result = backend.get_secret(&ssid).await;
            Outcome::Secret { ssid, result }
        }
        Command::Update { ssid, options } => {
            let result = backend.update_connection(&ssid, &options).await;
            Outcome::Updated { ssid, result }
        }
        Command::QueryRadio => Outcome::RadioState {
            result: backend.is_radio_enabled().await,
        },
        Command::SetRadio { enabled } => Outcome::RadioSet {
            enabled,
            result: backend.set_radio_enabled(enabled).await,
        },
    }
}

/// Run `command` in its own task so a panicking backend still yields an
/// outcome.
async fn execute_guarded(backend: Arc<dyn Backend>, command: Command) -> Outcome {
    let context = command.clone();
    let task = tokio::spawn(async move { execute(backend.as_ref(), command).await });
    match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("{} task did not complete: {}", context.name(), e);
            Outcome::failure(&context, WifiError::failed(format!("backend task failed: {e}")))
        }
    }
}

async fn deliver(tx: &mpsc::Sender<Message>, ticket: Ticket, outcome: Outcome) {
    if let Some(error) = outcome.error() {
        debug!("Ticket {} finished with error: {}", ticket, error);
    }
    if tx.send(Message::Outcome { ticket, outcome }).await.is_err() {
        debug!("Ticket {} outcome dropped, consumer gone", ticket);
    }
}

/// Spawns backend work and routes outcomes back to the consumer.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    tx: mpsc::Sender<Message>,
    next_ticket: Arc<AtomicU64>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backend", &self.backend.name())
            .field("next_ticket", &self.next_ticket.load(Ordering::Relaxed))
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher posting outcomes into `tx`.
    pub fn new(backend: Arc<dyn Backend>, tx: mpsc::Sender<Message>) -> Self {
        Self {
            backend,
            tx,
            next_ticket: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn issue_ticket(&self) -> Ticket {
        self.next_ticket.fetch_add(1, Ordering::Relaxed)
    }

    /// Run `command` concurrently; its outcome arrives as one message.
    pub fn dispatch(&self, command: Command) -> Ticket {
        let ticket = self.issue_ticket();
        info!("Dispatching {} as ticket {}", command.name(), ticket);

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = execute_guarded(backend, command).await;
            deliver(&tx, ticket, outcome).await;
        });
        ticket
    }

    /// Run `commands` one after another in a single task.
    ///
    /// Each command still produces its own outcome message, in order. Later
    /// commands run even if earlier ones fail.
    pub fn dispatch_batch(&self, commands: Vec<Command>) -> Vec<Ticket> {
        let batch: Vec<(Ticket, Command)> = commands
            .into_iter()
            .map(|command| (self.issue_ticket(), command))
            .collect();
        let tickets = batch.iter().map(|(ticket, _)| *ticket).collect();
        info!("Dispatching batch of {} commands", batch.len());

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            for (ticket, command) in batch {
                let outcome = execute_guarded(backend.clone(), command).await;
                deliver(&tx, ticket, outcome).await;
            }
        });
        tickets
    }
}
