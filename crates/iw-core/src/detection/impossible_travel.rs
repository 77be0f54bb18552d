use super::{humanize, partition_by_actor, Detector};
use crate::event::IdentityEvent;
use crate::finding::{Finding, FindingKind};
use chrono::Duration;
use serde_json::json;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Reports consecutive events of one actor from different countries less than
/// an hour apart.
///
/// Only adjacent pairs are compared; multi-hop travel is not evaluated.
#[derive(Debug, Clone)]
pub struct ImpossibleTravelDetector {
    max_gap: Duration,
}

impl ImpossibleTravelDetector {
    pub fn new() -> Self {
        Self {
            max_gap: Duration::hours(1),
        }
    }
}

impl Default for ImpossibleTravelDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ImpossibleTravelDetector {
    fn name(&self) -> &str {
        "impossible_travel"
    }

    fn detect(&self, events: &[IdentityEvent]) -> Vec<Finding> {
        let mut findings = Vec::new();

        for (actor, group) in partition_by_actor(events) {
            for pair in group.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                let (Some(from_country), Some(to_country)) =
                    (from.client.country(), to.client.country())
                else {
                    continue;
                };
                if from_country.eq_ignore_ascii_case(to_country) {
                    continue;
                }

                let delta = to.timestamp - from.timestamp;
                if delta >= self.max_gap {
                    continue;
                }

                let mut finding = Finding::new(
                    FindingKind::ImpossibleTravel,
                    format!(
                        "Possible impossible travel for actor {}: {} -> {} within {}.",
                        actor,
                        from_country,
                        to_country,
                        humanize(delta)
                    ),
                    vec![from.id.clone(), to.id.clone()],
                    Some(actor.to_string()),
                    to.timestamp,
                )
                .with_metadata("from_country", json!(from_country))
                .with_metadata("to_country", json!(to_country))
                .with_metadata("time_delta_seconds", json!(delta.num_seconds()));

                if let (Some(a), Some(b)) = (from.client.coordinates(), to.client.coordinates()) {
                    let distance = haversine_km(a, b);
                    finding = finding.with_metadata("distance_km", json!(distance.round()));
                    if delta > Duration::zero() {
                        let hours = delta.num_milliseconds() as f64 / 3_600_000.0;
                        finding = finding
                            .with_metadata("implied_speed_kmh", json!((distance / hours).round()));
                    }
                }

                findings.push(finding);
            }
        }

        findings
    }
}

/// Great-circle distance between two `(latitude, longitude)` points in degrees.
fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn login(id: &str, actor: &str, minute: i64, country: &str) -> IdentityEvent {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        IdentityEvent::new(id, "user.session.start", base + Duration::minutes(minute))
            .with_actor(actor)
            .with_country(country)
    }

    #[test]
    fn test_country_change_within_hour() {
        let events = vec![login("a", "00u1", 0, "US"), login("b", "00u1", 30, "FR")];
        let findings = ImpossibleTravelDetector::new().detect(&events);
        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.event_ids, vec!["a", "b"]);
        assert_eq!(finding.metadata["from_country"], "US");
        assert_eq!(finding.metadata["to_country"], "FR");
        assert_eq!(finding.metadata["time_delta_seconds"], 1800);
        assert!(!finding.metadata.contains_key("distance_km"));
    }

    #[test]
    fn test_country_change_after_hour_is_ignored() {
        let events = vec![login("a", "00u1", 0, "US"), login("b", "00u1", 90, "FR")];
        assert!(ImpossibleTravelDetector::new().detect(&events).is_empty());
    }

    #[test]
    fn test_exactly_one_hour_is_ignored() {
        let events = vec![login("a", "00u1", 0, "US"), login("b", "00u1", 60, "FR")];
        assert!(ImpossibleTravelDetector::new().detect(&events).is_empty());
    }

    #[test]
    fn test_country_compare_ignores_case_and_blank() {
        let events = vec![
            login("a", "00u1", 0, "us"),
            login("b", "00u1", 5, " US "),
            login("c", "00u1", 10, ""),
            login("d", "00u1", 15, "DE"),
        ];
        assert!(ImpossibleTravelDetector::new().detect(&events).is_empty());
    }

    #[test]
    fn test_only_adjacent_pairs_are_compared() {
        let events = vec![
            login("a", "00u1", 0, "US"),
            login("b", "00u2", 10, "FR"),
            login("c", "00u1", 20, "US"),
        ];
        assert!(ImpossibleTravelDetector::new().detect(&events).is_empty());
    }

    #[test]
    fn test_coordinates_add_distance_and_speed() {
        let events = vec![
            login("a", "00u1", 0, "US").with_coordinates(40.7128, -74.0060),
            login("b", "00u1", 30, "FR").with_coordinates(48.8566, 2.3522),
        ];
        let findings = ImpossibleTravelDetector::new().detect(&events);
        let distance = findings[0].metadata["distance_km"].as_f64().unwrap();
        assert!((5800.0..5900.0).contains(&distance));
        let speed = findings[0].metadata["implied_speed_kmh"].as_f64().unwrap();
        assert!(speed > 11_000.0);
    }
}
