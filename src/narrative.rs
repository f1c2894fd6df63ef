//! Narrative collaborator payloads and label matching.

use serde::{Deserialize, Serialize};

use crate::error::NarrativeError;
use crate::model::Location;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeRequest {
    pub city: String,
    pub stops: Vec<Location>,
    pub session_id: Option<String>,
}

/// Structured itinerary text returned by the narrative collaborator.
///
/// Only the title, the overall duration and a best-effort per-stop
/// association are consumed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Narrative {
    pub title: String,
    pub total_duration: String,
    pub stops: Vec<NarrativeStop>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NarrativeStop {
    pub label: String,
    pub duration: Option<String>,
    pub notes: Option<String>,
}

impl Narrative {
    /// Decodes a collaborator response body.
    pub fn from_json(body: &str) -> Result<Self, NarrativeError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Finds the stop describing `label`.
    ///
    /// Matching is a case-insensitive substring test in either direction, so
    /// `"Louvre"` matches `"The Louvre Museum"` and vice versa.
    pub fn stop_for(&self, label: &str) -> Option<&NarrativeStop> {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return None;
        }

        self.stops.iter().find(|stop| {
            let candidate = stop.label.trim().to_lowercase();
            !candidate.is_empty() && (candidate.contains(&label) || label.contains(&candidate))
        })
    }

    /// Orders `locations` the way the narrative lists them. Locations the
    /// narrative does not mention keep their input order after the matched
    /// ones.
    pub fn order(&self, locations: &[Location]) -> Vec<Location> {
        let mut remaining: Vec<Option<&Location>> = locations.iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(locations.len());

        for stop in &self.stops {
            let needle = stop.label.trim().to_lowercase();
            if needle.is_empty() {
                continue;
            }
            let position = remaining.iter().position(|&slot| {
                slot.is_some_and(|location| {
                    let label = location.as_str().to_lowercase();
                    label.contains(&needle) || needle.contains(&label)
                })
            });
            if let Some(location) = position.and_then(|index| remaining[index].take()) {
                ordered.push(location.clone());
            }
        }

        ordered.extend(remaining.into_iter().flatten().cloned());
        ordered
    }
}

/// Note used for stops the narrative did not describe.
pub fn fallback_note(label: &str, city: &str) -> String {
    if city.trim().is_empty() {
        format!("Take your time exploring {label}.")
    } else {
        format!("Take your time exploring {label} in {city}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations(labels: &[&str]) -> Vec<Location> {
        labels.iter().map(|label| Location::new(*label).unwrap()).collect()
    }

    fn narrative(labels: &[&str]) -> Narrative {
        Narrative {
            title: "A day in Paris".to_string(),
            total_duration: "1 day".to_string(),
            stops: labels
                .iter()
                .map(|label| NarrativeStop {
                    label: label.to_string(),
                    duration: None,
                    notes: None,
                })
                .collect(),
        }
    }

    #[test]
    fn decodes_partial_payload() {
        let narrative = Narrative::from_json(
            r#"{"title":"Paris","stops":[{"label":"Louvre","duration":"2-3 hours"}]}"#,
        )
        .unwrap();
        assert_eq!(narrative.title, "Paris");
        assert_eq!(narrative.total_duration, "");
        assert_eq!(narrative.stops[0].duration.as_deref(), Some("2-3 hours"));
    }

    #[test]
    fn malformed_payload_is_reported() {
        let err = Narrative::from_json("{not json").unwrap_err();
        assert!(matches!(err, NarrativeError::Malformed(_)));
    }

    #[test]
    fn stop_lookup_is_case_insensitive_substring() {
        let narrative = narrative(&["The Louvre Museum", "eiffel tower"]);
        assert_eq!(
            narrative.stop_for("louvre").map(|s| s.label.as_str()),
            Some("The Louvre Museum")
        );
        assert_eq!(
            narrative.stop_for("Eiffel Tower, Paris").map(|s| s.label.as_str()),
            Some("eiffel tower")
        );
        assert!(narrative.stop_for("Arc de Triomphe").is_none());
    }

    #[test]
    fn order_follows_narrative_and_keeps_unmatched() {
        let input = locations(&["Louvre", "Eiffel Tower", "Pantheon", "Orsay"]);
        let ordered = narrative(&["eiffel", "orsay", "louvre"]).order(&input);
        assert_eq!(ordered, locations(&["Eiffel Tower", "Orsay", "Louvre", "Pantheon"]));
    }

    #[test]
    fn order_never_duplicates() {
        let input = locations(&["Louvre", "Orsay"]);
        let ordered = narrative(&["louvre", "Louvre", "LOUVRE"]).order(&input);
        assert_eq!(ordered, locations(&["Louvre", "Orsay"]));
    }
}
