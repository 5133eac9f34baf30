//! Annotations on dataset items
//!
//! Analysts attach free-text annotations to entities, events, locations and
//! relationships. Annotations are looked up by `(target_type, target_id)` and
//! the whole set can be exported to and imported from JSON.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::preferences::{keys, PreferenceStore};

/// Unique identifier for an annotation
pub type AnnotationId = Uuid;

/// Current export document version
const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Entity,
    Event,
    Location,
    Relationship,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetType::Entity => "entity",
            TargetType::Event => "event",
            TargetType::Location => "location",
            TargetType::Relationship => "relationship",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,

    /// Id of the annotated item
    pub target_id: String,

    pub target_type: TargetType,

    pub text: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub author: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("annotation {0} not found")]
    NotFound(AnnotationId),

    #[error("could not import annotations: {0}")]
    Import(String),

    #[error("could not export annotations: {0}")]
    Export(#[from] serde_json::Error),
}

/// How imported annotations combine with existing ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Keep existing annotations; on an id collision the newer edit wins
    Merge,
    /// Drop existing annotations first
    Replace,
}

#[derive(Serialize, Deserialize)]
struct AnnotationDocument {
    version: u32,
    annotations: Vec<Annotation>,
}

type TargetKey = (TargetType, String);

/// Stores annotations and indexes them by target
#[derive(Debug, Default)]
pub struct AnnotationService {
    annotations: HashMap<AnnotationId, Annotation>,

    /// Annotation ids per target
    target_index: HashMap<TargetKey, Vec<AnnotationId>>,

    /// Where changes are written back, if anywhere
    store: Option<PreferenceStore>,
}

impl AnnotationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load annotations saved in `store` and write every change back to it
    pub fn persist_to(store: PreferenceStore) -> Self {
        let saved: Vec<Annotation> = store.get_preference(keys::ANNOTATIONS, Vec::new());
        debug!(count = saved.len(), "Loaded saved annotations");

        let mut service = Self {
            store: Some(store),
            ..Self::default()
        };
        for annotation in saved {
            service.insert(annotation);
        }
        service
    }

    /// Create an annotation on a target
    pub fn create(
        &mut self,
        target_id: &str,
        target_type: TargetType,
        text: impl Into<String>,
        author: impl Into<String>,
    ) -> Annotation {
        let now = Utc::now();
        let annotation = Annotation {
            id: Uuid::new_v4(),
            target_id: target_id.to_string(),
            target_type,
            text: text.into(),
            tags: Vec::new(),
            author: author.into(),
            created_at: now,
            updated_at: now,
        };

        self.insert(annotation.clone());
        self.persist();
        annotation
    }

    /// Replace the text of an annotation
    pub fn update(&mut self, id: AnnotationId, text: impl Into<String>) -> Result<&Annotation, AnnotationError> {
        let annotation = self
            .annotations
            .get_mut(&id)
            .ok_or(AnnotationError::NotFound(id))?;
        annotation.text = text.into();
        annotation.updated_at = Utc::now();

        self.persist();
        self.annotations.get(&id).ok_or(AnnotationError::NotFound(id))
    }

    pub fn delete(&mut self, id: AnnotationId) -> Result<Annotation, AnnotationError> {
        let annotation = self.annotations.remove(&id).ok_or(AnnotationError::NotFound(id))?;
        self.unindex(&annotation);
        self.persist();
        Ok(annotation)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    /// Annotations on one target, oldest first
    pub fn for_target(&self, target_id: &str, target_type: TargetType) -> Vec<&Annotation> {
        let key = (target_type, target_id.to_string());
        let mut found: Vec<&Annotation> = self
            .target_index
            .get(&key)
            .map(|ids| ids.iter().filter_map(|id| self.annotations.get(id)).collect())
            .unwrap_or_default();
        found.sort_by_key(|annotation| annotation.created_at);
        found
    }

    pub fn count_for(&self, target_id: &str, target_type: TargetType) -> usize {
        self.target_index
            .get(&(target_type, target_id.to_string()))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// All annotations, oldest first
    pub fn all(&self) -> Vec<&Annotation> {
        let mut all: Vec<&Annotation> = self.annotations.values().collect();
        all.sort_by_key(|annotation| annotation.created_at);
        all
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Case-insensitive search over text and tags
    pub fn search(&self, query: &str) -> Vec<&Annotation> {
        let query = query.to_lowercase();
        self.all()
            .into_iter()
            .filter(|annotation| {
                annotation.text.to_lowercase().contains(&query)
                    || annotation
                        .tags
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&query))
            })
            .collect()
    }

    pub fn add_tag(&mut self, id: AnnotationId, tag: &str) -> Result<(), AnnotationError> {
        let annotation = self.annotations.get_mut(&id).ok_or(AnnotationError::NotFound(id))?;
        if !annotation.tags.iter().any(|t| t == tag) {
            annotation.tags.push(tag.to_string());
            annotation.updated_at = Utc::now();
            self.persist();
        }
        Ok(())
    }

    pub fn remove_tag(&mut self, id: AnnotationId, tag: &str) -> Result<(), AnnotationError> {
        let annotation = self.annotations.get_mut(&id).ok_or(AnnotationError::NotFound(id))?;
        let before = annotation.tags.len();
        annotation.tags.retain(|t| t != tag);
        if annotation.tags.len() != before {
            annotation.updated_at = Utc::now();
            self.persist();
        }
        Ok(())
    }

    /// The full annotation set as a versioned JSON document
    pub fn export_json(&self) -> Result<String, AnnotationError> {
        let document = AnnotationDocument {
            version: EXPORT_VERSION,
            annotations: self.all().into_iter().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Read a document produced by [`AnnotationService::export_json`]. Returns
    /// the number of annotations taken from it.
    pub fn import_json(&mut self, json: &str, mode: ImportMode) -> Result<usize, AnnotationError> {
        let document: AnnotationDocument =
            serde_json::from_str(json).map_err(|err| AnnotationError::Import(err.to_string()))?;
        if document.version > EXPORT_VERSION {
            return Err(AnnotationError::Import(format!(
                "unsupported document version {}",
                document.version
            )));
        }

        if mode == ImportMode::Replace {
            self.annotations.clear();
            self.target_index.clear();
        }

        let mut imported = 0;
        for annotation in document.annotations {
            match self.annotations.get(&annotation.id) {
                Some(existing) if existing.updated_at >= annotation.updated_at => {
                    debug!(id = %annotation.id, "Keeping newer local annotation");
                }
                Some(_) => {
                    if let Some(old) = self.annotations.remove(&annotation.id) {
                        self.unindex(&old);
                    }
                    self.insert(annotation);
                    imported += 1;
                }
                None => {
                    self.insert(annotation);
                    imported += 1;
                }
            }
        }

        self.persist();
        Ok(imported)
    }

    fn insert(&mut self, annotation: Annotation) {
        self.target_index
            .entry((annotation.target_type, annotation.target_id.clone()))
            .or_default()
            .push(annotation.id);
        self.annotations.insert(annotation.id, annotation);
    }

    fn unindex(&mut self, annotation: &Annotation) {
        let key = (annotation.target_type, annotation.target_id.clone());
        if let Some(ids) = self.target_index.get_mut(&key) {
            ids.retain(|id| *id != annotation.id);
            if ids.is_empty() {
                self.target_index.remove(&key);
            }
        }
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let all: Vec<&Annotation> = self.all();
        let outcome = store.save_preference(keys::ANNOTATIONS, &all);
        if !outcome.is_stored() {
            warn!(status = ?outcome.status, "Annotations were not persisted");
        }
    }
}

/// Annotation change for UI updates
#[derive(Debug, Clone)]
pub enum AnnotationEvent {
    Created(AnnotationId),
    Updated(AnnotationId),
    Deleted(AnnotationId),
    Imported(usize),
}
