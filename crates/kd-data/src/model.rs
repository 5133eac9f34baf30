//! Dataset documents as served by the dataset endpoints

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use kd_core::Filterable;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the dataset index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Document path relative to the dataset root; defaults to `<id>.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl DatasetInfo {
    pub fn document_path(&self) -> String {
        self.path
            .clone()
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| format!("{}.json", self.id))
    }
}

/// `{ "datasets": [...] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetIndex {
    #[serde(default)]
    pub datasets: Vec<DatasetInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl Entity {
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, alias = "type")]
    pub kind: String,
}

impl Relationship {
    pub fn involves(&self, entity_id: &str) -> bool {
        self.source == entity_id || self.target == entity_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default, alias = "name")]
    pub title: String,
    /// RFC 3339 timestamp or plain `YYYY-MM-DD` date
    #[serde(default, alias = "date")]
    pub timestamp: String,
    #[serde(default, alias = "entities")]
    pub entity_ids: Vec<String>,
    #[serde(default, alias = "location")]
    pub location_id: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Event {
    /// Parsed timestamp, if it is in a recognized format
    pub fn time(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.trim();
        if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
            return Some(time.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
    #[serde(default, alias = "entities")]
    pub entity_ids: Vec<String>,
}

/// A full dataset: `{ entities, relationships, events, locations, ... }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetDocument {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Which collection a search hit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Entity,
    Event,
    Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub kind: HitKind,
    pub id: String,
    pub label: String,
}

impl DatasetDocument {
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|location| location.id == id)
    }

    /// Events in time order; events without a parseable time go last
    pub fn events_sorted(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.events.iter().collect();
        events.sort_by(|a, b| match (a.time(), b.time()) {
            (Some(ta), Some(tb)) => ta.cmp(&tb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        events
    }

    /// Entities connected to `entity_id` by a relationship
    pub fn related_entities(&self, entity_id: &str) -> Vec<&Entity> {
        self.relationships
            .iter()
            .filter(|rel| rel.involves(entity_id))
            .filter_map(|rel| {
                let other = if rel.source == entity_id {
                    &rel.target
                } else {
                    &rel.source
                };
                self.entity(other)
            })
            .collect()
    }

    /// Events that mention an entity
    pub fn events_for_entity(&self, entity_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|event| event.entity_ids.iter().any(|id| id == entity_id))
            .collect()
    }

    /// Case-insensitive match on ids and labels across all collections
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let hit = |text: &str| text.to_lowercase().contains(&query);

        let entities = self
            .entities
            .iter()
            .filter(|e| hit(&e.id) || hit(&e.name) || hit(&e.kind))
            .map(|e| SearchHit {
                kind: HitKind::Entity,
                id: e.id.clone(),
                label: e.label().to_string(),
            });
        let events = self
            .events
            .iter()
            .filter(|e| hit(&e.id) || hit(&e.title) || hit(&e.description))
            .map(|e| SearchHit {
                kind: HitKind::Event,
                id: e.id.clone(),
                label: e.title.clone(),
            });
        let locations = self
            .locations
            .iter()
            .filter(|l| hit(&l.id) || hit(&l.name))
            .map(|l| SearchHit {
                kind: HitKind::Location,
                id: l.id.clone(),
                label: l.name.clone(),
            });

        entities.chain(events).chain(locations).collect()
    }
}

fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

impl Filterable for Entity {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "id" => Some(Cow::Borrowed(&self.id)),
            "name" => Some(Cow::Borrowed(&self.name)),
            "kind" | "type" => Some(Cow::Borrowed(&self.kind)),
            other => self.properties.get(other).map(value_text),
        }
    }
}

impl Filterable for Event {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "id" => Some(Cow::Borrowed(&self.id)),
            "title" | "name" => Some(Cow::Borrowed(&self.title)),
            "timestamp" | "date" => Some(Cow::Borrowed(&self.timestamp)),
            "description" => Some(Cow::Borrowed(&self.description)),
            "location" => self.location_id.as_deref().map(Cow::Borrowed),
            "entities" => Some(Cow::Owned(self.entity_ids.join(","))),
            _ => None,
        }
    }
}

impl Filterable for Location {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "id" => Some(Cow::Borrowed(&self.id)),
            "name" => Some(Cow::Borrowed(&self.name)),
            "latitude" | "lat" => Some(Cow::Owned(self.latitude.to_string())),
            "longitude" | "lng" => Some(Cow::Owned(self.longitude.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use kd_core::filter::{FilterCondition, FilterGroup, FilterOperator};

    pub(crate) const SAMPLE: &str = r#"{
        "entities": [
            { "id": "e1", "name": "Viktor Orlov", "type": "person", "properties": { "risk": 7 } },
            { "id": "e2", "name": "Blue Harbor Ltd", "type": "organization" },
            { "id": "e3", "name": "Mara Quinn", "type": "person", "properties": { "risk": 2 } }
        ],
        "relationships": [
            { "id": "r1", "source": "e1", "target": "e2", "type": "owns" }
        ],
        "events": [
            { "id": "ev2", "title": "Shipment", "date": "2023-05-02", "entities": ["e2"], "location": "l1" },
            { "id": "ev1", "title": "Meeting", "timestamp": "2023-04-01T10:00:00Z", "entities": ["e1", "e3"] },
            { "id": "ev3", "title": "Undated rumor" }
        ],
        "locations": [
            { "id": "l1", "name": "Port of Rotterdam", "lat": 51.95, "lng": 4.14 }
        ],
        "generatedBy": "fixture"
    }"#;

    pub(crate) fn sample() -> DatasetDocument {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_document_parses_aliases_and_ignores_unknown_fields() {
        let doc = sample();
        assert_eq!(doc.entities.len(), 3);
        assert_eq!(doc.entities[0].kind, "person");
        assert_eq!(doc.events[0].entity_ids, vec!["e2"]);
        assert_eq!(doc.events[0].location_id.as_deref(), Some("l1"));
        assert_eq!(doc.locations[0].longitude, 4.14);
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let doc: DatasetDocument = serde_json::from_str(r#"{ "entities": [] }"#).unwrap();
        assert!(doc.events.is_empty());
        assert!(doc.locations.is_empty());
    }

    #[test]
    fn test_events_sorted_by_time() {
        let doc = sample();
        let ids: Vec<&str> = doc.events_sorted().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ev1", "ev2", "ev3"]);
    }

    #[test]
    fn test_related_entities_and_events() {
        let doc = sample();
        let related: Vec<&str> = doc.related_entities("e2").iter().map(|e| e.id.as_str()).collect();
        assert_eq!(related, vec!["e1"]);
        assert_eq!(doc.events_for_entity("e3").len(), 1);
    }

    #[test]
    fn test_search_across_collections() {
        let doc = sample();
        let hits = doc.search("harbor");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, HitKind::Entity);

        let hits = doc.search("ROTTERDAM");
        assert_eq!(hits[0].kind, HitKind::Location);
        assert!(doc.search("  ").is_empty());
    }

    #[test]
    fn test_filter_tree_over_entities() {
        let doc = sample();
        let mut root = FilterGroup::default();
        root.add_condition(&[], FilterCondition::new("type", FilterOperator::Equals, "person"))
            .unwrap();
        root.add_condition(&[], FilterCondition::new("risk", FilterOperator::GreaterThan, "5"))
            .unwrap();

        let matched: Vec<&str> = doc
            .entities
            .iter()
            .filter(|e| root.matches(*e))
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(matched, vec!["e1"]);
    }

    #[test]
    fn test_document_path_defaults_to_id() {
        let info = DatasetInfo {
            id: "ops".into(),
            name: "Ops".into(),
            description: String::new(),
            path: None,
        };
        assert_eq!(info.document_path(), "ops.json");
    }
}
