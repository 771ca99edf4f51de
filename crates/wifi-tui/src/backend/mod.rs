//! Backend capability contract.
//!
//! A backend translates its own protocol (bus calls, CLI output, ...) into
//! the raw shapes in [`crate::model`]. Capabilities a backend structurally
//! cannot provide keep the default implementation, which reports
//! [`WifiError::NotSupported`]. Callers treat that as a degraded field, never
//! as a reason to abort the rest of a resolution cycle.

pub mod mock;

pub use mock::MockBackend;

use crate::error::{Result, WifiError};
use crate::model::{AccessPoint, KnownNetwork, SecurityType};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Parameters for joining a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// Network name
    pub ssid: String,
    /// Credential, empty for open networks
    pub password: String,
    /// Security scheme to configure
    pub security: SecurityType,
    /// Whether the SSID is not broadcast
    pub hidden: bool,
}

/// Changes to apply to a saved profile. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionOptions {
    /// New auto-connect policy
    pub auto_connect: Option<bool>,
    /// New stored credential
    pub password: Option<String>,
}

/// Raw data for one resolution cycle.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    /// Saved profiles in backend order
    pub known: Vec<KnownNetwork>,
    /// Live access point observations
    pub visible: Vec<AccessPoint>,
    /// SSID of the currently associated network
    pub active: Option<String>,
}

/// Operations every network source is consumed through.
///
/// Methods may block their calling task for as long as the underlying
/// change takes to converge, but must always return.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logs and the status line.
    fn name(&self) -> &'static str;

    /// Saved profiles, in the order the backend reports them.
    async fn known_networks(&self) -> Result<Vec<KnownNetwork>>;

    /// Currently visible access points, triggering a fresh scan if `scan`.
    async fn access_points(&self, scan: bool) -> Result<Vec<AccessPoint>>;

    /// SSID of the network the radio is associated with.
    async fn active_ssid(&self) -> Result<Option<String>>;

    /// Gather everything a resolution cycle needs.
    ///
    /// A failure to read saved profiles degrades to visible-only data. A
    /// failure to read visible access points fails the whole call.
    async fn list_observations(&self, scan: bool) -> Result<Observations> {
        let visible = self.access_points(scan).await?;

        let known = match self.known_networks().await {
            Ok(known) => known,
            Err(e) => {
                warn!("{}: saved profiles unavailable, showing visible only: {}", self.name(), e);
                Vec::new()
            }
        };

        let active = match self.active_ssid().await {
            Ok(active) => active,
            Err(e) => {
                debug!("{}: active network unknown: {}", self.name(), e);
                None
            }
        };

        Ok(Observations {
            known,
            visible,
            active,
        })
    }

    /// Associate with a saved network.
    async fn activate(&self, _ssid: &str) -> Result<()> {
        Err(WifiError::NotSupported("activate"))
    }

    /// Delete a saved profile.
    async fn forget(&self, _ssid: &str) -> Result<()> {
        Err(WifiError::NotSupported("forget"))
    }

    /// Create a profile and associate with it.
    async fn join(&self, _request: &JoinRequest) -> Result<()> {
        Err(WifiError::NotSupported("join"))
    }

    /// Read the stored credential of a saved profile.
    async fn get_secret(&self, _ssid: &str) -> Result<String> {
        Err(WifiError::NotSupported("get_secret"))
    }

    /// Modify a saved profile.
    async fn update_connection(&self, _ssid: &str, _options: &ConnectionOptions) -> Result<()> {
        Err(WifiError::NotSupported("update_connection"))
    }

    /// Whether the wireless radio is on.
    async fn is_radio_enabled(&self) -> Result<bool> {
        Err(WifiError::NotSupported("is_radio_enabled"))
    }

    /// Switch the wireless radio on or off.
    async fn set_radio_enabled(&self, _enabled: bool) -> Result<()> {
        Err(WifiError::NotSupported("set_radio_enabled"))
    }
}

/// Find the saved profile for `ssid`.
///
/// When a backend holds several profiles for the same SSID the first one in
/// backend order wins. Secret retrieval and updates must go through this so
/// the same profile is always the one acted upon.
pub fn find_known<'a>(records: &'a [KnownNetwork], ssid: &str) -> Option<&'a KnownNetwork> {
    records.iter().find(|record| record.ssid == ssid)
}

/// Index of the saved profile [`find_known`] would pick.
pub fn find_known_index(records: &[KnownNetwork], ssid: &str) -> Option<usize> {
    records.iter().position(|record| record.ssid == ssid)
}

/// Poll `check` every `interval` until it reports `true` or `timeout` elapses.
///
/// Turns "fire a command, then watch for the state change" into one bounded
/// call. Errors from `check` end the wait immediately.
pub async fn wait_until<F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check().await? {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(WifiError::failed(format!(
                "timed out after {:?} waiting for {}",
                timeout, what
            )));
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct VisibleOnly;

    #[async_trait]
    impl Backend for VisibleOnly {
        fn name(&self) -> &'static str {
            "visible-only"
        }

        async fn known_networks(&self) -> Result<Vec<KnownNetwork>> {
            Err(WifiError::NotAvailable("bus down".to_string()))
        }

        async fn access_points(&self, _scan: bool) -> Result<Vec<AccessPoint>> {
            Ok(vec![AccessPoint::new("Cafe", 40, 2412)])
        }

        async fn active_ssid(&self) -> Result<Option<String>> {
            Err(WifiError::NotSupported("active_ssid"))
        }
    }

    #[tokio::test]
    async fn test_known_failure_degrades() {
        let obs = VisibleOnly.list_observations(true).await.unwrap();
        assert_eq!(obs.visible.len(), 1);
        assert!(obs.known.is_empty());
        assert!(obs.active.is_none());
    }

    #[tokio::test]
    async fn test_default_capabilities_are_not_supported() {
        let err = VisibleOnly.get_secret("Cafe").await.unwrap_err();
        assert_eq!(err, WifiError::NotSupported("get_secret"));
        assert!(VisibleOnly.set_radio_enabled(true).await.unwrap_err().is_not_supported());
    }

    #[test]
    fn test_find_known_returns_first_duplicate() {
        let records = vec![
            KnownNetwork::new("Home"),
            KnownNetwork {
                auto_connect: true,
                ..KnownNetwork::new("Cafe")
            },
            KnownNetwork::new("Cafe"),
        ];
        let found = find_known(&records, "Cafe").unwrap();
        assert!(found.auto_connect);
        assert_eq!(find_known_index(&records, "Cafe"), Some(1));
        assert!(find_known(&records, "Nope").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_converges() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();
        wait_until("three polls", Duration::from_secs(5), Duration::from_millis(100), || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 2) }
        })
        .await
        .unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_times_out() {
        let err = wait_until("never", Duration::from_secs(1), Duration::from_millis(300), || async {
            Ok(false)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, WifiError::OperationFailed(msg) if msg.contains("never")));
    }
}
