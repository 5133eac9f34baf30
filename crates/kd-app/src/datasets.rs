//! Background dataset loading
//!
//! Fetches run on the tokio runtime and report into a [`DatasetSlot`] the
//! frame loop reads from. Outcomes, failures included, are published on the
//! event bus.

use std::sync::Arc;

use kd_core::events::events::{DatasetIndexLoaded, DatasetLoadFailed, DatasetLoaded};
use kd_core::{Annotation, AnnotationService, EventBus, SelectionState, TargetType};
use kd_data::{DatasetDocument, DatasetInfo, DatasetLoader};
use parking_lot::RwLock;
use tracing::{error, info};

/// The dataset currently shown
#[derive(Clone)]
pub struct LoadedDataset {
    pub info: DatasetInfo,
    pub document: Arc<DatasetDocument>,
}

/// Results of background fetches
#[derive(Default)]
pub struct DatasetSlot {
    pub datasets: Vec<DatasetInfo>,
    pub current: Option<LoadedDataset>,
    /// Fetches still running
    pub pending: usize,
}

impl DatasetSlot {
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    pub fn find(&self, dataset_id: &str) -> Option<DatasetInfo> {
        self.datasets.iter().find(|d| d.id == dataset_id).cloned()
    }
}

pub type SharedSlot = Arc<RwLock<DatasetSlot>>;

/// Fetch the index; returns the first dataset so the caller can open it
pub async fn refresh_index(loader: &DatasetLoader, slot: &SharedSlot, bus: &EventBus) -> Option<DatasetInfo> {
    let datasets = loader.list_datasets().await;
    bus.publish(DatasetIndexLoaded {
        dataset_count: datasets.len(),
    });

    let first = datasets.first().cloned();
    slot.write().datasets = datasets;
    first
}

/// Load one document into the slot
pub async fn load_dataset(
    loader: &DatasetLoader,
    slot: &SharedSlot,
    bus: &EventBus,
    info: DatasetInfo,
    force_reload: bool,
) {
    let result = if force_reload {
        loader.reload(&info).await
    } else {
        loader.load(&info).await
    };

    match result {
        Ok(document) => {
            info!(dataset = %info.id, entities = document.entities.len(), "Dataset ready");
            bus.publish(DatasetLoaded {
                dataset_id: info.id.clone(),
                entity_count: document.entities.len(),
                event_count: document.events.len(),
                location_count: document.locations.len(),
            });
            slot.write().current = Some(LoadedDataset { info, document });
        }
        Err(err) => {
            error!(dataset = %info.id, "Dataset failed to load: {}", err);
            bus.publish(DatasetLoadFailed {
                dataset_id: info.id,
                dataset_name: info.name,
                error: err.to_string(),
            });
        }
    }
}

/// Annotations on items the export will contain
pub fn annotations_for_export<'a>(
    service: &'a AnnotationService,
    document: &DatasetDocument,
    selection: Option<&SelectionState>,
) -> Vec<&'a Annotation> {
    service
        .all()
        .into_iter()
        .filter(|annotation| {
            let id = annotation.target_id.as_str();
            let in_document = match annotation.target_type {
                TargetType::Entity => document.entity(id).is_some(),
                TargetType::Event => document.event(id).is_some(),
                TargetType::Location => document.location(id).is_some(),
                TargetType::Relationship => document.relationships.iter().any(|r| r.id == id),
            };
            let selected = match (selection, annotation.target_type) {
                (None, _) => true,
                (Some(s), TargetType::Entity) => s.entities.contains(id),
                (Some(s), TargetType::Event) => s.events.contains(id),
                (Some(s), TargetType::Location) => s.locations.contains(id),
                (Some(s), TargetType::Relationship) => document
                    .relationships
                    .iter()
                    .find(|r| r.id == id)
                    .map_or(false, |r| s.entities.contains(&r.source) && s.entities.contains(&r.target)),
            };
            in_document && selected
        })
        .collect()
}
