//! In-memory backend.
//!
//! Drives the demo mode of the binary and the tests. State lives behind a
//! mutex that is never held across an await point; failures can be injected
//! per capability to exercise the degraded paths.

use super::{Backend, ConnectionOptions, JoinRequest, find_known_index, wait_until};
use crate::error::{Result, WifiError};
use crate::model::{AccessPoint, KnownNetwork, SecurityType};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
struct MockState {
    /// Saved profiles in backend order
    known: Vec<KnownNetwork>,
    /// Stored secrets, index-aligned with `known`
    secrets: Vec<String>,
    visible: Vec<AccessPoint>,
    /// Passphrases the simulated access points accept, by SSID
    accepted: HashMap<String, String>,
    active: Option<String>,
    radio: bool,
    fail_known: Option<WifiError>,
    fail_scan: Option<WifiError>,
    scans: u64,
}

/// Backend that keeps everything in memory.
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
    join_delay: Duration,
    join_timeout: Duration,
    poll_interval: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an empty backend with the radio on.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                known: Vec::new(),
                secrets: Vec::new(),
                visible: Vec::new(),
                accepted: HashMap::new(),
                active: None,
                radio: true,
                fail_known: None,
                fail_scan: None,
                scans: 0,
            })),
            join_delay: Duration::from_millis(300),
            join_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }

    /// A small neighbourhood used by the binary's demo mode.
    pub fn demo() -> Self {
        let now = Utc::now();
        Self::new()
            .with_known(
                KnownNetwork {
                    security: SecurityType::Wpa,
                    auto_connect: true,
                    last_connected: Some(now),
                    ..KnownNetwork::new("Home")
                },
                "correct horse",
            )
            .with_known(
                KnownNetwork {
                    security: SecurityType::Open,
                    auto_connect: true,
                    last_connected: Some(now - chrono::Duration::days(3)),
                    ..KnownNetwork::new("Cafe")
                },
                "",
            )
            .with_known(
                KnownNetwork {
                    security: SecurityType::Wpa,
                    last_connected: Some(now - chrono::Duration::days(40)),
                    ..KnownNetwork::new("Airport")
                },
                "boarding",
            )
            .with_access_point(
                AccessPoint::new("Home", 82, 5180)
                    .with_bssid("a4:2b:b0:11:22:01")
                    .with_security(SecurityType::Wpa),
            )
            .with_access_point(
                AccessPoint::new("Home", 64, 2437)
                    .with_bssid("a4:2b:b0:11:22:00")
                    .with_security(SecurityType::Wpa),
            )
            .with_access_point(
                AccessPoint::new("Neighbour", 45, 2412)
                    .with_bssid("f0:9f:c2:0a:0b:0c")
                    .with_security(SecurityType::Wpa),
            )
            .with_access_point(
                AccessPoint::new("Library Guest", 38, 2462)
                    .with_bssid("00:1a:1e:aa:bb:cc")
                    .with_security(SecurityType::Open),
            )
            .with_accepted_secret("Neighbour", "hunter22")
            .with_active("Home")
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a saved profile with its stored secret.
    pub fn with_known(self, record: KnownNetwork, secret: &str) -> Self {
        let mut state = self.state();
        state.known.push(record);
        state.secrets.push(secret.to_string());
        drop(state);
        self
    }

    /// Add a visible access point.
    pub fn with_access_point(self, ap: AccessPoint) -> Self {
        self.state().visible.push(ap);
        self
    }

    /// Mark a network as currently associated.
    pub fn with_active(self, ssid: &str) -> Self {
        self.state().active = Some(ssid.to_string());
        self
    }

    /// Require a passphrase when joining `ssid`.
    pub fn with_accepted_secret(self, ssid: &str, secret: &str) -> Self {
        self.state()
            .accepted
            .insert(ssid.to_string(), secret.to_string());
        self
    }

    /// Delay between a join request and association.
    pub fn with_join_delay(mut self, delay: Duration) -> Self {
        self.join_delay = delay;
        self
    }

    /// Upper bound a join waits for association.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Make `known_networks` fail with `error` (or succeed again with `None`).
    pub fn fail_known_networks(&self, error: Option<WifiError>) {
        self.state().fail_known = error;
    }

    /// Make `access_points` fail with `error` (or succeed again with `None`).
    pub fn fail_scan(&self, error: Option<WifiError>) {
        self.state().fail_scan = error;
    }

    /// Replace the visible access points.
    pub fn set_visible(&self, visible: Vec<AccessPoint>) {
        self.state().visible = visible;
    }

    /// Number of scans requested so far.
    pub fn scan_count(&self) -> u64 {
        self.state().scans
    }

    fn profile_index(state: &MockState, ssid: &str) -> Result<usize> {
        find_known_index(&state.known, ssid).ok_or_else(|| WifiError::NotFound(ssid.to_string()))
    }

    fn ensure_radio(&self) -> Result<()> {
        if self.state().radio {
            Ok(())
        } else {
            Err(WifiError::WirelessDisabled)
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn known_networks(&self) -> Result<Vec<KnownNetwork>> {
        let state = self.state();
        if let Some(err) = &state.fail_known {
            return Err(err.clone());
        }
        Ok(state.known.clone())
    }

    async fn access_points(&self, scan: bool) -> Result<Vec<AccessPoint>> {
        let mut state = self.state();
        if !state.radio {
            return Err(WifiError::WirelessDisabled);
        }
        if let Some(err) = &state.fail_scan {
            return Err(err.clone());
        }
        if scan {
            state.scans += 1;
            debug!("mock scan #{}", state.scans);
        }
        Ok(state.visible.clone())
    }

    async fn active_ssid(&self) -> Result<Option<String>> {
        let state = self.state();
        Ok(if state.radio { state.active.clone() } else { None })
    }

    async fn activate(&self, ssid: &str) -> Result<()> {
        self.ensure_radio()?;
        let mut state = self.state();
        let index = Self::profile_index(&state, ssid)?;
        if !state.visible.iter().any(|ap| ap.ssid == ssid) {
            return Err(WifiError::NotFound(ssid.to_string()));
        }
        state.known[index].last_connected = Some(Utc::now());
        state.active = Some(ssid.to_string());
        info!("mock: activated {}", ssid);
        Ok(())
    }

    async fn forget(&self, ssid: &str) -> Result<()> {
        let mut state = self.state();
        let index = Self::profile_index(&state, ssid)?;
        state.known.remove(index);
        state.secrets.remove(index);
        if state.active.as_deref() == Some(ssid) {
            state.active = None;
        }
        info!("mock: forgot {}", ssid);
        Ok(())
    }

    async fn join(&self, request: &JoinRequest) -> Result<()> {
        self.ensure_radio()?;
        {
            let mut state = self.state();
            let visible = state.visible.iter().any(|ap| ap.ssid == request.ssid);
            if !visible && !request.hidden {
                return Err(WifiError::NotFound(request.ssid.clone()));
            }
            if let Some(expected) = state.accepted.get(&request.ssid) {
                if expected != &request.password {
                    return Err(WifiError::failed(format!(
                        "authentication rejected by {}",
                        request.ssid
                    )));
                }
            }
            state.known.push(KnownNetwork {
                ssid: request.ssid.clone(),
                security: request.security,
                auto_connect: true,
                hidden: request.hidden,
                last_connected: None,
            });
            state.secrets.push(request.password.clone());
        }

        let state = self.state.clone();
        let ssid = request.ssid.clone();
        let delay = self.join_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(record) = state.known.iter_mut().rev().find(|k| k.ssid == ssid) {
                record.last_connected = Some(Utc::now());
            }
            state.active = Some(ssid);
        });

        let what = format!("association with {}", request.ssid);
        wait_until(&what, self.join_timeout, self.poll_interval, || {
            let associated = self.state().active.as_deref() == Some(request.ssid.as_str());
            async move { Ok(associated) }
        })
        .await
    }

    async fn get_secret(&self, ssid: &str) -> Result<String> {
        let state = self.state();
        let index = Self::profile_index(&state, ssid)?;
        Ok(state.secrets[index].clone())
    }

    async fn update_connection(&self, ssid: &str, options: &ConnectionOptions) -> Result<()> {
        let mut state = self.state();
        let index = Self::profile_index(&state, ssid)?;
        if let Some(auto_connect) = options.auto_connect {
            state.known[index].auto_connect = auto_connect;
        }
        if let Some(password) = &options.password {
            state.secrets[index] = password.clone();
        }
        Ok(())
    }

    async fn is_radio_enabled(&self) -> Result<bool> {
        Ok(self.state().radio)
    }

    async fn set_radio_enabled(&self, enabled: bool) -> Result<()> {
        let mut state = self.state();
        state.radio = enabled;
        if !enabled {
            state.active = None;
        }
        info!("mock: radio {}", if enabled { "on" } else { "off" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duplicated() -> MockBackend {
        MockBackend::new()
            .with_known(
                KnownNetwork {
                    auto_connect: true,
                    ..KnownNetwork::new("Cafe")
                },
                "first",
            )
            .with_known(KnownNetwork::new("Cafe"), "second")
    }

    #[tokio::test]
    async fn test_get_secret_uses_first_duplicate() {
        let backend = duplicated();
        assert_eq!(backend.get_secret("Cafe").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_update_connection_touches_first_duplicate() {
        let backend = duplicated();
        let options = ConnectionOptions {
            auto_connect: Some(false),
            password: Some("changed".to_string()),
        };
        backend.update_connection("Cafe", &options).await.unwrap();

        let known = backend.known_networks().await.unwrap();
        assert!(!known[0].auto_connect);
        assert!(!known[1].auto_connect);
        assert_eq!(backend.get_secret("Cafe").await.unwrap(), "changed");
    }

    #[tokio::test]
    async fn test_forget_missing_is_not_found() {
        let err = MockBackend::new().forget("Ghost").await.unwrap_err();
        assert_eq!(err, WifiError::NotFound("Ghost".to_string()));
    }

    #[tokio::test]
    async fn test_radio_off_blocks_scan() {
        let backend = MockBackend::demo();
        backend.set_radio_enabled(false).await.unwrap();
        assert_eq!(
            backend.access_points(true).await.unwrap_err(),
            WifiError::WirelessDisabled
        );
        assert_eq!(backend.active_ssid().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_waits_for_association() {
        let backend = MockBackend::new()
            .with_access_point(AccessPoint::new("Lab", 50, 2412))
            .with_join_delay(Duration::from_secs(2));
        let request = JoinRequest {
            ssid: "Lab".to_string(),
            password: String::new(),
            security: SecurityType::Open,
            hidden: false,
        };
        backend.join(&request).await.unwrap();
        assert_eq!(backend.active_ssid().await.unwrap().as_deref(), Some("Lab"));
        assert_eq!(backend.known_networks().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_times_out() {
        let backend = MockBackend::new()
            .with_access_point(AccessPoint::new("Slow", 50, 2412))
            .with_join_delay(Duration::from_secs(30))
            .with_join_timeout(Duration::from_secs(1));
        let request = JoinRequest {
            ssid: "Slow".to_string(),
            password: String::new(),
            security: SecurityType::Open,
            hidden: false,
        };
        let err = backend.join(&request).await.unwrap_err();
        assert!(matches!(err, WifiError::OperationFailed(_)));
    }

    #[tokio::test]
    async fn test_join_wrong_secret_rejected() {
        let backend = MockBackend::demo();
        let request = JoinRequest {
            ssid: "Neighbour".to_string(),
            password: "guess".to_string(),
            security: SecurityType::Wpa,
            hidden: false,
        };
        assert!(backend.join(&request).await.is_err());
    }
}
