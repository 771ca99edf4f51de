//! List resolution: merges live access point observations with saved
//! profiles into one [`Connection`] per SSID.
//!
//! Resolution is a pure function of its inputs. Each cycle builds a fresh
//! list; nothing from a previous cycle is reused.

use crate::backend::{Backend, Observations, find_known};
use crate::error::Result;
use crate::model::{AccessPoint, Connection, KnownNetwork, SecurityType};
use crate::ordering::sort_connections;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Rank two observations of the same network, best first.
///
/// Higher strength wins; on a tie the higher frequency wins.
pub fn compare_access_points(a: &AccessPoint, b: &AccessPoint) -> Ordering {
    b.strength
        .cmp(&a.strength)
        .then_with(|| b.frequency.cmp(&a.frequency))
}

/// Group observations by SSID, keeping first-seen order of the groups.
///
/// Observations with an empty SSID (hidden networks before association)
/// cannot be keyed and are skipped.
fn group_by_ssid(visible: &[AccessPoint]) -> Vec<(String, Vec<AccessPoint>)> {
    let mut groups: Vec<(String, Vec<AccessPoint>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut skipped = 0usize;

    for ap in visible {
        if ap.ssid.is_empty() {
            skipped += 1;
            continue;
        }
        match index.get(ap.ssid.as_str()) {
            Some(&slot) => groups[slot].1.push(ap.clone()),
            None => {
                index.insert(ap.ssid.as_str(), groups.len());
                groups.push((ap.ssid.clone(), vec![ap.clone()]));
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} observations without SSID", skipped);
    }
    groups
}

fn visible_connection(
    ssid: String,
    mut access_points: Vec<AccessPoint>,
    known: Option<&KnownNetwork>,
) -> Connection {
    // Stable, so equally ranked observations keep scan order.
    access_points.sort_by(compare_access_points);
    let observed_security = access_points
        .first()
        .map_or(SecurityType::Unknown, |best| best.security);

    match known {
        Some(record) => Connection {
            ssid,
            is_active: false,
            is_known: true,
            security: if record.security == SecurityType::Unknown {
                observed_security
            } else {
                record.security
            },
            is_visible: true,
            is_hidden: record.hidden,
            access_points,
            last_connected: record.last_connected,
            auto_connect: record.auto_connect,
        },
        None => Connection {
            ssid,
            is_active: false,
            is_known: false,
            security: observed_security,
            is_visible: true,
            is_hidden: false,
            access_points,
            last_connected: None,
            auto_connect: false,
        },
    }
}

fn saved_only_connection(record: &KnownNetwork) -> Connection {
    Connection {
        ssid: record.ssid.clone(),
        is_active: false,
        is_known: true,
        security: record.security,
        is_visible: false,
        is_hidden: record.hidden,
        access_points: Vec::new(),
        last_connected: record.last_connected,
        auto_connect: record.auto_connect,
    }
}

/// Merge observations and saved profiles into one connection per SSID.
///
/// Visible networks come first in scan order, followed by saved-only
/// networks in backend order. When several profiles share an SSID the first
/// one is used. The result is not display-ordered; see
/// [`crate::ordering::sort_connections`].
pub fn resolve(
    known: &[KnownNetwork],
    visible: &[AccessPoint],
    active: Option<&str>,
) -> Vec<Connection> {
    let groups = group_by_ssid(visible);
    let mut connections = Vec::with_capacity(groups.len() + known.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(groups.len() + known.len());

    for (ssid, access_points) in groups {
        let record = find_known(known, &ssid);
        seen.insert(ssid.clone());
        connections.push(visible_connection(ssid, access_points, record));
    }

    for record in known {
        if record.ssid.is_empty() || seen.contains(&record.ssid) {
            continue;
        }
        seen.insert(record.ssid.clone());
        connections.push(saved_only_connection(record));
    }

    // Reset, then set: the active flag is never carried over.
    for connection in &mut connections {
        connection.is_active = active == Some(connection.ssid.as_str());
    }

    connections
}

/// Resolve one snapshot of backend data.
pub fn resolve_observations(observations: &Observations) -> Vec<Connection> {
    resolve(
        &observations.known,
        &observations.visible,
        observations.active.as_deref(),
    )
}

/// Run a full resolution cycle against a backend: fetch, merge, order.
///
/// Fails only when the visible scan fails; unreadable saved profiles
/// degrade to a visible-only list.
pub async fn build_network_list(backend: &dyn Backend, scan: bool) -> Result<Vec<Connection>> {
    let observations = backend.list_observations(scan).await?;
    let mut connections = resolve_observations(&observations);
    sort_connections(&mut connections);
    debug!(
        "{}: resolved {} networks from {} observations and {} saved profiles",
        backend.name(),
        connections.len(),
        observations.visible.len(),
        observations.known.len()
    );
    Ok(connections)
}
