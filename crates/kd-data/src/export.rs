//! Writing the current view out as JSON or CSV

use ahash::AHashSet;
use chrono::Utc;
use csv::WriterBuilder;
use kd_core::settings::{ExportFormat, ExportPreferences};
use kd_core::{Annotation, SelectionState};
use serde::Serialize;
use tracing::info;

use crate::model::{DatasetDocument, Entity, Event, Location, Relationship};
use crate::DataError;

/// What to export
pub struct ExportRequest<'a> {
    pub dataset_id: &'a str,
    pub document: &'a DatasetDocument,
    /// Restrict the export to the selected items; `None` exports everything
    pub selection: Option<&'a SelectionState>,
    pub annotations: Vec<&'a Annotation>,
}

/// A rendered export, ready to be written to disk
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub file_name: String,
    pub contents: String,
    pub format: ExportFormat,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    dataset_id: &'a str,
    exported_at: String,
    entities: Vec<&'a Entity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relationships: Option<Vec<&'a Relationship>>,
    events: Vec<&'a Event>,
    locations: Vec<&'a Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotations: Option<Vec<&'a Annotation>>,
}

fn collect<'a, T>(
    items: &'a [T],
    id: impl Fn(&T) -> &str,
    selected: Option<&AHashSet<String>>,
) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| selected.map_or(true, |ids| ids.contains(id(*item))))
        .collect()
}

impl<'a> ExportRequest<'a> {
    fn document(&self, prefs: &ExportPreferences) -> ExportDocument<'a> {
        let doc = self.document;
        let entities = collect(&doc.entities, |e| e.id.as_str(), self.selection.map(|s| &s.entities));
        let events = collect(&doc.events, |e| e.id.as_str(), self.selection.map(|s| &s.events));
        let locations = collect(&doc.locations, |l| l.id.as_str(), self.selection.map(|s| &s.locations));

        let relationships = prefs.include_relationships.then(|| {
            let exported: AHashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
            doc.relationships
                .iter()
                .filter(|r| exported.contains(r.source.as_str()) && exported.contains(r.target.as_str()))
                .collect::<Vec<_>>()
        });

        let annotations = prefs.include_annotations.then(|| self.annotations.clone());

        ExportDocument {
            dataset_id: self.dataset_id,
            exported_at: Utc::now().to_rfc3339(),
            entities,
            relationships,
            events,
            locations,
            annotations,
        }
    }
}

/// Render the request in the preferred format
pub fn export_view(request: &ExportRequest<'_>, prefs: &ExportPreferences) -> Result<ExportOutput, DataError> {
    let document = request.document(prefs);
    let contents = match prefs.format {
        ExportFormat::Json if prefs.pretty => serde_json::to_string_pretty(&document)?,
        ExportFormat::Json => serde_json::to_string(&document)?,
        ExportFormat::Csv => write_csv(&document)?,
    };

    info!(
        dataset = request.dataset_id,
        format = ?prefs.format,
        entities = document.entities.len(),
        events = document.events.len(),
        "Exported view"
    );

    Ok(ExportOutput {
        file_name: prefs.file_name(request.dataset_id),
        contents,
        format: prefs.format,
    })
}

fn write_csv(document: &ExportDocument<'_>) -> Result<String, DataError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(["kind", "id", "label", "detail"])?;

    for entity in &document.entities {
        writer.write_record(["entity", entity.id.as_str(), entity.label(), entity.kind.as_str()])?;
    }
    for relationship in document.relationships.iter().flatten() {
        let detail = format!("{} -> {}", relationship.source, relationship.target);
        writer.write_record(["relationship", relationship.id.as_str(), relationship.kind.as_str(), detail.as_str()])?;
    }
    for event in &document.events {
        writer.write_record(["event", event.id.as_str(), event.title.as_str(), event.timestamp.as_str()])?;
    }
    for location in &document.locations {
        let detail = format!("{},{}", location.latitude, location.longitude);
        writer.write_record(["location", location.id.as_str(), location.name.as_str(), detail.as_str()])?;
    }
    for annotation in document.annotations.iter().flatten() {
        let id = annotation.id.to_string();
        let target = format!("{}:{}", annotation.target_type, annotation.target_id);
        writer.write_record(["annotation", id.as_str(), annotation.text.as_str(), target.as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| DataError::Csv(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| DataError::Csv(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::sample;
    use kd_core::{AnnotationService, SelectionRegistry, SelectionSource, TargetType};

    fn prefs(format: ExportFormat) -> ExportPreferences {
        ExportPreferences {
            format,
            ..ExportPreferences::default()
        }
    }

    #[test]
    fn test_json_export_of_whole_dataset() {
        let doc = sample();
        let request = ExportRequest {
            dataset_id: "ops",
            document: &doc,
            selection: None,
            annotations: Vec::new(),
        };

        let output = export_view(&request, &prefs(ExportFormat::Json)).unwrap();
        assert_eq!(output.file_name, "kindi-export-ops.json");

        let value: serde_json::Value = serde_json::from_str(&output.contents).unwrap();
        assert_eq!(value["datasetId"], "ops");
        assert_eq!(value["entities"].as_array().unwrap().len(), 3);
        assert_eq!(value["relationships"].as_array().unwrap().len(), 1);
        assert_eq!(value["annotations"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_selection_limits_entities_and_relationships() {
        let doc = sample();
        let registry = SelectionRegistry::new();
        registry.select_entity("e1", true, SelectionSource::Graph);
        registry.select_entity("e3", false, SelectionSource::Graph);
        let selection = registry.snapshot();

        let request = ExportRequest {
            dataset_id: "ops",
            document: &doc,
            selection: Some(&selection),
            annotations: Vec::new(),
        };
        let mut prefs = prefs(ExportFormat::Json);
        prefs.include_annotations = false;
        prefs.pretty = false;

        let output = export_view(&request, &prefs).unwrap();
        assert!(!output.contents.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&output.contents).unwrap();
        assert_eq!(value["entities"].as_array().unwrap().len(), 2);
        // e2 is not exported, so r1 (e1 -> e2) is dropped
        assert_eq!(value["relationships"].as_array().unwrap().len(), 0);
        assert_eq!(value["events"].as_array().unwrap().len(), 0);
        assert!(value.get("annotations").is_none());
    }

    #[test]
    fn test_csv_export_rows() {
        let doc = sample();
        let mut service = AnnotationService::new();
        service.create("e1", TargetType::Entity, "Known associate, \"V\"", "analyst");
        let annotations = service.all();

        let request = ExportRequest {
            dataset_id: "ops",
            document: &doc,
            selection: None,
            annotations,
        };
        let output = export_view(&request, &prefs(ExportFormat::Csv)).unwrap();
        assert_eq!(output.file_name, "kindi-export-ops.csv");

        let mut reader = csv::Reader::from_reader(output.contents.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["kind", "id", "label", "detail"]);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        // 3 entities, 1 relationship, 3 events, 1 location, 1 annotation
        assert_eq!(rows.len(), 9);
        assert_eq!(&rows[3][0], "relationship");
        assert_eq!(&rows[3][3], "e1 -> e2");
        assert_eq!(&rows[8][2], "Known associate, \"V\"");
    }
}
