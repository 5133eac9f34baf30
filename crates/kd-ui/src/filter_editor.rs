//! Editor for advanced filter trees
//!
//! Rendering collects the edits the user asked for and applies them after the
//! tree has been drawn, so the tree is never mutated while it is borrowed for
//! display.

use egui::{ComboBox, Id, RichText, Ui};
use kd_core::filter::{Combinator, FilterCondition, FilterError, FilterLibrary, FilterOperator};
use kd_core::{FilterGroup, FilterNode, SelectionKind};
use tracing::warn;

/// One edit addressed by path
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEdit {
    AddCondition(Vec<usize>),
    AddGroup(Vec<usize>),
    Remove(Vec<usize>),
    UpdateCondition(Vec<usize>, FilterCondition),
    SetCombinator(Vec<usize>, Combinator),
    SetNegated(Vec<usize>, bool),
}

/// Apply an edit to the tree
pub fn apply_edit(root: &mut FilterGroup, edit: FilterEdit) -> Result<(), FilterError> {
    match edit {
        FilterEdit::AddCondition(path) => root
            .add_condition(&path, FilterCondition::new("name", FilterOperator::Contains, ""))
            .map(|_| ()),
        FilterEdit::AddGroup(path) => root.add_group(&path, Combinator::Or).map(|_| ()),
        FilterEdit::Remove(path) => root.remove(&path).map(|_| ()),
        FilterEdit::UpdateCondition(path, condition) => root.update_condition(&path, condition),
        FilterEdit::SetCombinator(path, combinator) => root.set_combinator(&path, combinator),
        FilterEdit::SetNegated(path, negated) => root.set_negated(&path, negated),
    }
}

/// Fields offered in the field picker; any other name can be typed
const COMMON_FIELDS: [&str; 6] = ["name", "kind", "title", "timestamp", "description", "id"];

pub struct FilterEditor {
    root: FilterGroup,
    scope: Option<SelectionKind>,
    save_name: String,
    status: Option<String>,
}

impl Default for FilterEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterEditor {
    pub fn new() -> Self {
        Self {
            root: FilterGroup::default(),
            scope: None,
            save_name: String::new(),
            status: None,
        }
    }

    /// The active filter tree
    pub fn root(&self) -> &FilterGroup {
        &self.root
    }

    /// Collection the filter applies to
    pub fn scope(&self) -> Option<SelectionKind> {
        self.scope
    }

    pub fn set_root(&mut self, root: FilterGroup) {
        self.root = root;
    }

    pub fn ui(&mut self, ui: &mut Ui, library: &FilterLibrary) {
        ui.horizontal(|ui| {
            ui.label("Applies to:");
            ComboBox::from_id_source("filter_scope")
                .selected_text(scope_label(self.scope))
                .show_ui(ui, |ui| {
                    for scope in [
                        None,
                        Some(SelectionKind::Entity),
                        Some(SelectionKind::Event),
                        Some(SelectionKind::Location),
                    ] {
                        ui.selectable_value(&mut self.scope, scope, scope_label(scope));
                    }
                });
            if ui.button("Reset").clicked() {
                self.root = FilterGroup::default();
            }
        });

        ui.separator();

        let mut edits = Vec::new();
        group_ui(ui, &self.root, &mut Vec::new(), &mut edits);
        for edit in edits {
            if let Err(err) = apply_edit(&mut self.root, edit) {
                warn!("Filter edit rejected: {}", err);
            }
        }

        ui.separator();
        self.library_ui(ui, library);
    }

    fn library_ui(&mut self, ui: &mut Ui, library: &FilterLibrary) {
        ui.label(RichText::new("Saved filters").strong());
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.save_name);
            let can_save = !self.save_name.trim().is_empty();
            if ui.add_enabled(can_save, egui::Button::new("Save")).clicked() {
                let saved = library.save(&self.save_name, &self.root);
                self.status = Some(format!("Saved \"{}\"", saved.name));
                self.save_name.clear();
            }
        });

        for saved in library.list() {
            ui.horizontal(|ui| {
                ui.label(format!("{} ({} conditions)", saved.name, saved.root.condition_count()));
                if ui.small_button("Load").clicked() {
                    self.root = saved.root.clone();
                    self.status = Some(format!("Loaded \"{}\"", saved.name));
                }
                if ui.small_button("🗑").on_hover_text("Delete saved filter").clicked() {
                    library.delete(&saved.name);
                }
            });
        }

        if let Some(status) = &self.status {
            ui.weak(status.as_str());
        }
    }
}

fn scope_label(scope: Option<SelectionKind>) -> &'static str {
    match scope {
        None => "Everything",
        Some(SelectionKind::Entity) => "Entities",
        Some(SelectionKind::Event) => "Events",
        Some(SelectionKind::Location) => "Locations",
    }
}

fn group_ui(ui: &mut Ui, group: &FilterGroup, path: &mut Vec<usize>, edits: &mut Vec<FilterEdit>) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            let mut combinator = group.combinator;
            ComboBox::from_id_source(Id::new("combinator").with(group.id))
                .selected_text(combinator_label(combinator))
                .width(60.0)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut combinator, Combinator::And, "AND");
                    ui.selectable_value(&mut combinator, Combinator::Or, "OR");
                });
            if combinator != group.combinator {
                edits.push(FilterEdit::SetCombinator(path.clone(), combinator));
            }

            let mut negated = group.negated;
            if ui.checkbox(&mut negated, "NOT").changed() {
                edits.push(FilterEdit::SetNegated(path.clone(), negated));
            }

            if ui.small_button("+ Condition").clicked() {
                edits.push(FilterEdit::AddCondition(path.clone()));
            }
            if ui.small_button("+ Group").clicked() {
                edits.push(FilterEdit::AddGroup(path.clone()));
            }
            if !path.is_empty() && ui.small_button("✖").on_hover_text("Remove group").clicked() {
                edits.push(FilterEdit::Remove(path.clone()));
            }
        });

        if group.children.is_empty() {
            ui.weak("Matches everything");
        }

        for (index, child) in group.children.iter().enumerate() {
            path.push(index);
            match child {
                FilterNode::Condition(condition) => condition_ui(ui, condition, group, path, edits),
                FilterNode::Group(subgroup) => {
                    ui.indent(subgroup.id, |ui| group_ui(ui, subgroup, path, edits));
                }
            }
            path.pop();
        }
    });
}

fn condition_ui(
    ui: &mut Ui,
    condition: &FilterCondition,
    parent: &FilterGroup,
    path: &[usize],
    edits: &mut Vec<FilterEdit>,
) {
    let id = Id::new("condition").with(parent.id).with(path);
    let mut edited = condition.clone();

    ui.horizontal(|ui| {
        ComboBox::from_id_source(id.with("field"))
            .selected_text(edited.field.clone())
            .width(100.0)
            .show_ui(ui, |ui| {
                for field in COMMON_FIELDS {
                    ui.selectable_value(&mut edited.field, field.to_string(), field);
                }
            });
        ui.add(egui::TextEdit::singleline(&mut edited.field).desired_width(80.0));

        ComboBox::from_id_source(id.with("operator"))
            .selected_text(edited.operator.label())
            .width(90.0)
            .show_ui(ui, |ui| {
                for operator in FilterOperator::ALL {
                    ui.selectable_value(&mut edited.operator, operator, operator.label());
                }
            });

        if !edited.operator.is_unary() {
            ui.add(egui::TextEdit::singleline(&mut edited.value).desired_width(120.0));
        }

        if ui.small_button("✖").on_hover_text("Remove condition").clicked() {
            edits.push(FilterEdit::Remove(path.to_vec()));
        }
    });

    if edited != *condition {
        edits.push(FilterEdit::UpdateCondition(path.to_vec(), edited));
    }
}

fn combinator_label(combinator: Combinator) -> &'static str {
    match combinator {
        Combinator::And => "AND",
        Combinator::Or => "OR",
    }
}
