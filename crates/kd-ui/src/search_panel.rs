//! Dataset search with persisted history

use egui::{Id, Key, ScrollArea, TextEdit, Ui};
use kd_core::settings::SearchHistory;
use kd_core::{SelectionKind, SelectionRegistry, SelectionSource};
use kd_data::model::{HitKind, SearchHit};
use kd_data::DatasetDocument;

use crate::panels::apply_click;

fn selection_kind(kind: HitKind) -> SelectionKind {
    match kind {
        HitKind::Entity => SelectionKind::Entity,
        HitKind::Event => SelectionKind::Event,
        HitKind::Location => SelectionKind::Location,
    }
}

/// Search box over every collection of the loaded dataset
pub struct SearchPanel {
    query: String,
    /// Query the results were computed for
    submitted: String,
    hits: Vec<SearchHit>,
    focus_requested: bool,
}

impl Default for SearchPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPanel {
    pub fn new() -> Self {
        Self {
            query: String::new(),
            submitted: String::new(),
            hits: Vec::new(),
            focus_requested: false,
        }
    }

    fn input_id() -> Id {
        Id::new("kindi_search_input")
    }

    /// Focus the search box on the next frame
    pub fn request_focus(&mut self) {
        self.focus_requested = true;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    /// Run a query and remember it in the history
    pub fn submit(&mut self, query: &str, document: &DatasetDocument, history: &SearchHistory) {
        self.query = query.to_string();
        self.submitted = query.trim().to_string();
        self.hits = document.search(query);
        history.record(query);
    }

    pub fn ui(
        &mut self,
        ui: &mut Ui,
        document: Option<&DatasetDocument>,
        history: &SearchHistory,
        registry: &SelectionRegistry,
    ) {
        let response = ui.add(
            TextEdit::singleline(&mut self.query)
                .id(Self::input_id())
                .hint_text("Search entities, events, locations (Ctrl+F)")
                .desired_width(f32::INFINITY),
        );
        if self.focus_requested {
            response.request_focus();
            self.focus_requested = false;
        }

        let Some(document) = document else {
            ui.weak("Load a dataset to search it");
            return;
        };

        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            let query = self.query.clone();
            self.submit(&query, document, history);
        }

        let recent = history.entries();
        if !recent.is_empty() {
            ui.horizontal_wrapped(|ui| {
                ui.weak("Recent:");
                for entry in &recent {
                    if ui.small_button(entry.as_str()).clicked() {
                        self.submit(entry, document, history);
                    }
                }
                if ui.small_button("Clear history").clicked() {
                    history.clear();
                }
            });
        }

        ui.separator();

        if self.hits.is_empty() {
            if !self.submitted.is_empty() {
                ui.weak(format!("No results for \"{}\"", self.submitted));
            }
            return;
        }

        ui.label(format!("{} result(s)", self.hits.len()));
        ScrollArea::vertical().id_source("search_results").show(ui, |ui| {
            for hit in &self.hits {
                let kind = selection_kind(hit.kind);
                let selected = registry.is_selected(kind, &hit.id);
                let label = format!("{:?}: {}", hit.kind, hit.label);
                let item = ui.selectable_label(selected, label);
                if item.hovered() {
                    registry.set_highlight(Some((kind, hit.id.clone())));
                }
                if item.clicked() {
                    let modifiers = ui.input(|i| i.modifiers);
                    apply_click(registry, kind, &hit.id, SelectionSource::Search, modifiers);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kd_core::PreferenceStore;

    fn document() -> DatasetDocument {
        serde_json::from_str(
            r#"{
                "entities": [ { "id": "e1", "name": "Harbor Master" } ],
                "locations": [ { "id": "l1", "name": "North Harbor", "lat": 1.0, "lng": 2.0 } ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_submit_searches_and_records_history() {
        let store = PreferenceStore::in_memory();
        let history = SearchHistory::new(&store);
        let mut panel = SearchPanel::new();

        panel.submit("  harbor ", &document(), &history);
        assert_eq!(panel.hits().len(), 2);
        assert_eq!(panel.hits()[0].kind, HitKind::Entity);
        assert_eq!(history.entries(), vec!["harbor"]);

        panel.submit("nothing", &document(), &history);
        assert!(panel.hits().is_empty());
        assert_eq!(history.entries(), vec!["nothing", "harbor"]);
    }
}
