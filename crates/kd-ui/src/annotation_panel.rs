//! UI components for annotations on the selected item

use std::collections::BTreeSet;

use egui::*;
use kd_core::annotations::{AnnotationEvent, AnnotationId};
use kd_core::events::events::AnnotationChanged;
use kd_core::{Annotation, AppState, SelectionState, TargetType};
use tracing::warn;

/// The item annotations are shown for: the first selected entity, else
/// event, else location
pub fn primary_target(selection: &SelectionState) -> Option<(TargetType, String)> {
    let first = |ids: &ahash::AHashSet<String>| ids.iter().min().cloned();
    first(&selection.entities)
        .map(|id| (TargetType::Entity, id))
        .or_else(|| first(&selection.events).map(|id| (TargetType::Event, id)))
        .or_else(|| first(&selection.locations).map(|id| (TargetType::Location, id)))
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A single annotation
pub struct AnnotationCard<'a> {
    annotation: &'a Annotation,
    interactive: bool,
}

impl<'a> AnnotationCard<'a> {
    pub fn new(annotation: &'a Annotation) -> Self {
        Self {
            annotation,
            interactive: true,
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn show(self, ui: &mut Ui) -> CardResponse {
        let mut delete_requested = false;
        let mut edit_requested = false;
        let weak = ui.visuals().weak_text_color();

        Frame::group(ui.style()).rounding(4.0).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!("by {}", self.annotation.author))
                        .color(weak)
                        .small(),
                );
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if self.interactive {
                        if ui.small_button("❌").on_hover_text("Delete annotation").clicked() {
                            delete_requested = true;
                        }
                        if ui.small_button("✏").on_hover_text("Edit annotation").clicked() {
                            edit_requested = true;
                        }
                    }
                });
            });

            ui.label(self.annotation.text.as_str());

            if !self.annotation.tags.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    for tag in &self.annotation.tags {
                        ui.label(RichText::new(format!("#{}", tag)).color(weak).small());
                    }
                });
            }

            let edited = if self.annotation.updated_at > self.annotation.created_at {
                " (edited)"
            } else {
                ""
            };
            ui.label(
                RichText::new(format!(
                    "{}{}",
                    self.annotation.created_at.format("%Y-%m-%d %H:%M"),
                    edited
                ))
                .color(weak)
                .small(),
            );
        });

        CardResponse {
            delete_requested,
            edit_requested,
        }
    }
}

pub struct CardResponse {
    pub delete_requested: bool,
    pub edit_requested: bool,
}

/// Creation/editing dialog
pub struct AnnotationEditor {
    pub visible: bool,
    pub annotation_id: Option<AnnotationId>,
    pub target: (TargetType, String),
    pub text: String,
    pub tags: String,
}

impl AnnotationEditor {
    pub fn create(target: (TargetType, String)) -> Self {
        Self {
            visible: true,
            annotation_id: None,
            target,
            text: String::new(),
            tags: String::new(),
        }
    }

    pub fn edit(annotation: &Annotation) -> Self {
        Self {
            visible: true,
            annotation_id: Some(annotation.id),
            target: (annotation.target_type, annotation.target_id.clone()),
            text: annotation.text.clone(),
            tags: annotation.tags.join(", "),
        }
    }

    pub fn show(&mut self, ctx: &Context) -> Option<AnnotationAction> {
        if !self.visible {
            return None;
        }

        let mut action = None;
        let mut should_close = false;
        let title = if self.annotation_id.is_some() {
            "Edit Annotation"
        } else {
            "New Annotation"
        };

        Window::new(title)
            .open(&mut self.visible)
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| {
                ui.label(format!("On {} {}", self.target.0, self.target.1));
                ui.add_space(4.0);
                ui.add(
                    TextEdit::multiline(&mut self.text)
                        .desired_rows(5)
                        .desired_width(f32::INFINITY),
                );
                ui.label("Tags (comma-separated):");
                ui.text_edit_singleline(&mut self.tags);
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    let can_save = !self.text.trim().is_empty();
                    if ui.add_enabled(can_save, Button::new("Save")).clicked() {
                        action = Some(AnnotationAction::Save {
                            id: self.annotation_id,
                            target: self.target.clone(),
                            text: self.text.trim().to_string(),
                            tags: parse_tags(&self.tags),
                        });
                        should_close = true;
                    }
                    if ui.button("Cancel").clicked() {
                        should_close = true;
                    }
                });
            });

        if should_close {
            self.visible = false;
        }
        action
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationAction {
    Save {
        id: Option<AnnotationId>,
        target: (TargetType, String),
        text: String,
        tags: Vec<String>,
    },
    Delete(AnnotationId),
}

/// Annotations for the primary selected item
#[derive(Default)]
pub struct AnnotationPanel {
    search_query: String,
    selected_tags: BTreeSet<String>,
    editor: Option<AnnotationEditor>,
}

impl AnnotationPanel {
    pub fn ui(&mut self, ui: &mut Ui, state: &AppState, author: &str) {
        let target = primary_target(&state.selection.snapshot());
        let mut actions = Vec::new();

        ui.horizontal(|ui| {
            ui.label("🔍");
            ui.text_edit_singleline(&mut self.search_query)
                .on_hover_text("Search all annotations");
            if ui.button("Clear").clicked() {
                self.search_query.clear();
            }
        });

        {
            let service = state.annotations.read();
            let annotations: Vec<&Annotation> = if !self.search_query.trim().is_empty() {
                service.search(&self.search_query)
            } else if let Some((target_type, target_id)) = &target {
                service.for_target(target_id, *target_type)
            } else {
                Vec::new()
            };

            let all_tags: BTreeSet<String> = annotations
                .iter()
                .flat_map(|annotation| annotation.tags.iter().cloned())
                .collect();
            if !all_tags.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    for tag in &all_tags {
                        let mut selected = self.selected_tags.contains(tag);
                        if ui.toggle_value(&mut selected, format!("#{}", tag)).clicked() {
                            if selected {
                                self.selected_tags.insert(tag.clone());
                            } else {
                                self.selected_tags.remove(tag);
                            }
                        }
                    }
                });
            }

            ui.separator();

            match &target {
                Some((target_type, target_id)) => {
                    ui.horizontal(|ui| {
                        ui.strong(format!("{} {}", target_type, target_id));
                        if ui.button("➕ Annotate").clicked() {
                            self.editor = Some(AnnotationEditor::create((*target_type, target_id.clone())));
                        }
                    });
                }
                None if self.search_query.trim().is_empty() => {
                    ui.weak("Select an item to see its annotations");
                }
                None => {}
            }

            ScrollArea::vertical().id_source("annotation_list").show(ui, |ui| {
                for annotation in annotations {
                    if !self.selected_tags.is_empty()
                        && !annotation.tags.iter().any(|tag| self.selected_tags.contains(tag))
                    {
                        continue;
                    }
                    let response = AnnotationCard::new(annotation).show(ui);
                    if response.edit_requested {
                        self.editor = Some(AnnotationEditor::edit(annotation));
                    }
                    if response.delete_requested {
                        actions.push(AnnotationAction::Delete(annotation.id));
                    }
                    ui.add_space(4.0);
                }
            });
        }

        if let Some(editor) = &mut self.editor {
            if let Some(action) = editor.show(ui.ctx()) {
                actions.push(action);
            }
            if !editor.visible {
                self.editor = None;
            }
        }

        for action in actions {
            apply_action(state, action, author);
        }
    }
}

/// Apply an editor or card action to the annotation service
pub fn apply_action(state: &AppState, action: AnnotationAction, author: &str) {
    let mut service = state.annotations.write();
    let change = match action {
        AnnotationAction::Save {
            id: None,
            target: (target_type, target_id),
            text,
            tags,
        } => {
            let created = service.create(&target_id, target_type, text, author);
            for tag in &tags {
                if let Err(err) = service.add_tag(created.id, tag) {
                    warn!("Could not tag annotation: {}", err);
                }
            }
            AnnotationEvent::Created(created.id)
        }
        AnnotationAction::Save {
            id: Some(id),
            text,
            tags,
            ..
        } => {
            if let Err(err) = service.update(id, text) {
                warn!("Could not update annotation: {}", err);
                return;
            }
            let existing = service.get(id).map(|a| a.tags.clone()).unwrap_or_default();
            for tag in existing.iter().filter(|tag| !tags.contains(tag)) {
                let _ = service.remove_tag(id, tag);
            }
            for tag in tags.iter().filter(|tag| !existing.contains(tag)) {
                let _ = service.add_tag(id, tag);
            }
            AnnotationEvent::Updated(id)
        }
        AnnotationAction::Delete(id) => match service.delete(id) {
            Ok(_) => AnnotationEvent::Deleted(id),
            Err(err) => {
                warn!("Could not delete annotation: {}", err);
                return;
            }
        },
    };
    drop(service);
    state.event_bus.publish(AnnotationChanged { change });
}

#[cfg(test)]
mod tests {
    use super::*;
    use kd_core::SelectionSource;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_primary_target_prefers_entities() {
        let state = AppState::in_memory();
        assert_eq!(primary_target(&state.selection.snapshot()), None);

        state.selection.select_location("l1", true, SelectionSource::Map);
        state.selection.select_event("ev2", false, SelectionSource::Timeline);
        state.selection.select_event("ev1", false, SelectionSource::Timeline);
        assert_eq!(
            primary_target(&state.selection.snapshot()),
            Some((TargetType::Event, "ev1".to_string()))
        );

        state.selection.select_entity("e1", false, SelectionSource::Graph);
        assert_eq!(
            primary_target(&state.selection.snapshot()),
            Some((TargetType::Entity, "e1".to_string()))
        );
    }

    #[test]
    fn test_actions_create_update_and_delete() {
        let state = AppState::in_memory();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        state.event_bus.on::<AnnotationChanged, _>(move |event| {
            sink.lock().push(format!("{:?}", event.change));
        });

        apply_action(
            &state,
            AnnotationAction::Save {
                id: None,
                target: (TargetType::Entity, "e1".to_string()),
                text: "Seen at the port".to_string(),
                tags: parse_tags("port, , lead"),
            },
            "analyst",
        );
        let id = {
            let service = state.annotations.read();
            let list = service.for_target("e1", TargetType::Entity);
            assert_eq!(list.len(), 1);
            assert_eq!(list[0].tags, vec!["port", "lead"]);
            list[0].id
        };

        apply_action(
            &state,
            AnnotationAction::Save {
                id: Some(id),
                target: (TargetType::Entity, "e1".to_string()),
                text: "Seen twice".to_string(),
                tags: vec!["lead".to_string(), "confirmed".to_string()],
            },
            "analyst",
        );
        {
            let service = state.annotations.read();
            let annotation = service.get(id).unwrap();
            assert_eq!(annotation.text, "Seen twice");
            assert_eq!(annotation.tags, vec!["lead", "confirmed"]);
        }

        apply_action(&state, AnnotationAction::Delete(id), "analyst");
        assert!(state.annotations.read().is_empty());
        assert_eq!(changes.lock().len(), 3);
    }
}
