//! Display order for resolved connections.

use crate::model::Connection;
use std::cmp::Ordering;

/// Compare two connections for display.
///
/// Rules, first decisive one wins:
/// 1. active before inactive
/// 2. visible before saved-only
/// 3. both visible: stronger signal first
/// 4. both saved-only: most recently connected first, never-connected last
/// 5. SSID ascending
pub fn compare_connections(a: &Connection, b: &Connection) -> Ordering {
    b.is_active
        .cmp(&a.is_active)
        .then_with(|| b.is_visible.cmp(&a.is_visible))
        .then_with(|| match (a.is_visible, b.is_visible) {
            (true, true) => b.strength().cmp(&a.strength()),
            (false, false) => match (a.last_connected, b.last_connected) {
                (Some(a_time), Some(b_time)) => b_time.cmp(&a_time),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            _ => Ordering::Equal,
        })
        .then_with(|| a.ssid.cmp(&b.ssid))
}

/// Sort connections in place for display.
///
/// The sort is stable: entries that compare equal (duplicate SSIDs from a
/// backend, for instance) keep their input order.
pub fn sort_connections(connections: &mut [Connection]) {
    connections.sort_by(compare_connections);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccessPoint;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn visible(ssid: &str, strength: i32) -> Connection {
        Connection {
            ssid: ssid.to_string(),
            is_visible: true,
            access_points: vec![AccessPoint::new(ssid, strength, 2412)],
            ..Default::default()
        }
    }

    fn saved(ssid: &str, days_ago: Option<i64>) -> Connection {
        Connection {
            ssid: ssid.to_string(),
            is_known: true,
            last_connected: days_ago.map(|d| {
                Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap() - chrono::Duration::days(d)
            }),
            ..Default::default()
        }
    }

    fn names(list: &[Connection]) -> Vec<&str> {
        list.iter().map(|c| c.ssid.as_str()).collect()
    }

    #[test]
    fn test_full_ordering() {
        let mut list = vec![
            saved("Never", None),
            visible("Weak", 10),
            saved("Old", Some(30)),
            Connection {
                is_active: true,
                ..visible("Home", 40)
            },
            visible("Strong", 90),
            saved("Recent", Some(1)),
            visible("AlsoWeak", 10),
        ];
        sort_connections(&mut list);
        assert_eq!(
            names(&list),
            vec!["Home", "Strong", "AlsoWeak", "Weak", "Recent", "Old", "Never"]
        );
    }

    #[test]
    fn test_never_connected_sorted_by_ssid() {
        let mut list = vec![saved("b", None), saved("a", None), saved("c", Some(2))];
        sort_connections(&mut list);
        assert_eq!(names(&list), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_duplicate_ssids_keep_input_order() {
        let first = Connection {
            auto_connect: true,
            ..visible("Dup", 50)
        };
        let second = visible("Dup", 50);
        let mut list = vec![first.clone(), visible("Other", 70), second.clone()];
        sort_connections(&mut list);
        assert_eq!(list[1], first);
        assert_eq!(list[2], second);
    }

    fn arb_connection() -> impl Strategy<Value = Connection> {
        (
            prop::sample::select(vec!["a", "b", "c"]),
            any::<bool>(),
            any::<bool>(),
            0i32..=3,
            prop::option::of(0i64..3),
            any::<u8>(),
        )
            .prop_map(|(ssid, active, is_visible, strength, days, tag)| {
                let mut conn = if is_visible {
                    visible(ssid, strength * 25)
                } else {
                    saved(ssid, days)
                };
                conn.is_active = active;
                // Distinguishes otherwise equal entries.
                conn.auto_connect = tag % 2 == 0;
                conn.is_hidden = tag % 3 == 0;
                conn
            })
    }

    proptest! {
        #[test]
        fn prop_ordering_is_total_and_consistent(
            a in arb_connection(),
            b in arb_connection(),
            c in arb_connection(),
        ) {
            prop_assert_eq!(compare_connections(&a, &b), compare_connections(&b, &a).reverse());
            if compare_connections(&a, &b) != Ordering::Greater
                && compare_connections(&b, &c) != Ordering::Greater
            {
                prop_assert_ne!(compare_connections(&a, &c), Ordering::Greater);
            }
        }

        #[test]
        fn prop_equal_rank_keeps_relative_order(list in prop::collection::vec(arb_connection(), 0..16)) {
            let tagged: Vec<(usize, Connection)> = list.into_iter().enumerate().collect();
            let mut sorted = tagged.clone();
            sorted.sort_by(|x, y| compare_connections(&x.1, &y.1));

            for pair in sorted.windows(2) {
                let order = compare_connections(&pair[0].1, &pair[1].1);
                prop_assert_ne!(order, Ordering::Greater);
                if order == Ordering::Equal {
                    prop_assert!(pair[0].0 < pair[1].0);
                }
            }

            let mut plain: Vec<Connection> = tagged.iter().map(|(_, c)| c.clone()).collect();
            sort_connections(&mut plain);
            let expected: Vec<Connection> = sorted.into_iter().map(|(_, c)| c).collect();
            prop_assert_eq!(plain, expected);
        }
    }
}
