//! Value types for networks, access points and saved profiles.
//!
//! Everything here is rebuilt on every resolution cycle. Nothing holds a
//! `Connection` across cycles; the SSID is the only identity the UI keeps.

use chrono::{DateTime, Utc};
use std::fmt;

/// Security scheme advertised by a network.
///
/// Variants are ordered by how much they tell us: `Unknown` carries no
/// information, `Wpa` is the strongest scheme we distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SecurityType {
    /// Nothing reported yet
    #[default]
    Unknown,
    /// No encryption
    Open,
    /// Legacy WEP
    Wep,
    /// WPA / WPA2 / WPA3 personal or enterprise
    Wpa,
}

impl SecurityType {
    /// Parse the security spellings used by the common backends.
    ///
    /// Accepts values such as `"none"`, `"--"`, `"wep"`, `"WPA2"`, `"wpa-psk"`,
    /// `"sae"` or a space separated flag list like `"WPA1 WPA2"`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        if raw.is_empty() {
            return Self::Unknown;
        }
        if raw == "none" || raw == "open" || raw == "--" {
            return Self::Open;
        }

        let mut best = Self::Unknown;
        for token in raw.split(|c: char| c.is_whitespace() || c == ',' || c == '/') {
            let parsed = if token.starts_with("wpa")
                || token.starts_with("rsn")
                || token == "sae"
                || token == "psk"
                || token.contains("802.1x")
                || token == "owe"
            {
                Self::Wpa
            } else if token.starts_with("wep") {
                Self::Wep
            } else {
                Self::Unknown
            };
            best = best.max(parsed);
        }
        best
    }

    /// Whether joining requires a credential.
    pub fn is_secure(&self) -> bool {
        matches!(self, Self::Wep | Self::Wpa)
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Open => write!(f, "open"),
            Self::Wep => write!(f, "WEP"),
            Self::Wpa => write!(f, "WPA"),
        }
    }
}

/// Frequency band an access point operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// 2.4 GHz
    Band2_4GHz,
    /// 5 GHz
    Band5GHz,
    /// 6 GHz (Wi-Fi 6E / 7)
    Band6GHz,
}

impl Band {
    /// Infer the band from a centre frequency in MHz.
    pub fn from_frequency(mhz: u32) -> Option<Self> {
        match mhz {
            2400..=2500 => Some(Self::Band2_4GHz),
            4900..=5924 => Some(Self::Band5GHz),
            5925..=7125 => Some(Self::Band6GHz),
            _ => None,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Band2_4GHz => write!(f, "2.4 GHz"),
            Self::Band5GHz => write!(f, "5 GHz"),
            Self::Band6GHz => write!(f, "6 GHz"),
        }
    }
}

/// One live radio observation of a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    /// Network name, empty for hidden networks before association
    pub ssid: String,
    /// Hardware address, `None` when the backend cannot report it
    pub bssid: Option<String>,
    /// Signal quality 0-100, 0 means no live signal
    pub strength: u8,
    /// Centre frequency in MHz
    pub frequency: u32,
    /// Security scheme reported by this access point
    pub security: SecurityType,
}

impl AccessPoint {
    /// Build an observation, clamping the strength into 0-100.
    pub fn new(ssid: impl Into<String>, strength: i32, frequency: u32) -> Self {
        Self {
            ssid: ssid.into(),
            bssid: None,
            strength: strength.clamp(0, 100) as u8,
            frequency,
            security: SecurityType::Unknown,
        }
    }

    /// Attach a BSSID.
    pub fn with_bssid(mut self, bssid: impl Into<String>) -> Self {
        self.bssid = Some(bssid.into());
        self
    }

    /// Attach the reported security scheme.
    pub fn with_security(mut self, security: SecurityType) -> Self {
        self.security = security;
        self
    }

    /// BSSID for display, `"unknown"` when absent.
    pub fn bssid_label(&self) -> &str {
        self.bssid.as_deref().unwrap_or("unknown")
    }

    /// Band derived from the frequency.
    pub fn band(&self) -> Option<Band> {
        Band::from_frequency(self.frequency)
    }
}

/// A saved network profile as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KnownNetwork {
    /// Network name the profile applies to
    pub ssid: String,
    /// Security scheme stored in the profile
    pub security: SecurityType,
    /// Whether the OS joins this network automatically
    pub auto_connect: bool,
    /// Whether the profile targets a hidden SSID
    pub hidden: bool,
    /// Last successful association
    pub last_connected: Option<DateTime<Utc>>,
}

impl KnownNetwork {
    /// Create a profile with default metadata.
    pub fn new(ssid: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            ..Default::default()
        }
    }
}

/// The resolved view of one network, keyed by SSID.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Connection {
    /// Network name
    pub ssid: String,
    /// Currently associated
    pub is_active: bool,
    /// A saved profile exists
    pub is_known: bool,
    /// Security scheme
    pub security: SecurityType,
    /// At least one access point was observed this cycle
    pub is_visible: bool,
    /// Saved as a hidden SSID
    pub is_hidden: bool,
    /// Observations sorted best first; empty when not visible
    pub access_points: Vec<AccessPoint>,
    /// Last successful association, taken from the saved profile
    pub last_connected: Option<DateTime<Utc>>,
    /// Auto-connect policy from the saved profile
    pub auto_connect: bool,
}

impl Connection {
    /// Signal strength of the best access point, 0 when not visible.
    pub fn strength(&self) -> u8 {
        self.access_points.first().map_or(0, |ap| ap.strength)
    }

    /// Whether joining requires a credential.
    pub fn is_secure(&self) -> bool {
        self.security.is_secure()
    }

    /// All BSSIDs merged under this SSID, best first.
    pub fn bssids(&self) -> impl Iterator<Item = &str> {
        self.access_points.iter().map(AccessPoint::bssid_label)
    }
}
