//! List selection, bulk-edit targeting, and the environment picker.

use crate::environment_queries::EnvironmentListing;
use codex_env_domain::{EnvironmentId, EnvironmentRecord};
use std::collections::BTreeSet;

/// Views reachable from the environment screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The environments table.
    EnvironmentList,
    /// The create form.
    NewEnvironment,
    /// The edit form for one row.
    EditEnvironment(EnvironmentId),
    /// The chat landing page hosting the picker.
    Chat,
}

/// What the edit button opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    /// Exactly one row: the pre-filled single-edit form.
    Single(EnvironmentId),
    /// Several rows: the empty bulk-edit form.
    Bulk(Vec<EnvironmentId>),
}

/// Checked rows of the environments table.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSelection {
    order: Vec<EnvironmentId>,
    selected: BTreeSet<EnvironmentId>,
}

impl EnvironmentSelection {
    /// Track selection over a listing; nothing is checked.
    #[must_use]
    pub fn new(listing: &EnvironmentListing) -> Self {
        Self {
            order: listing.environments.iter().map(|env| env.id.clone()).collect(),
            selected: BTreeSet::new(),
        }
    }

    /// Flip one row. Ids outside the listing are ignored.
    pub fn toggle(&mut self, id: &EnvironmentId) {
        if !self.order.contains(id) {
            return;
        }
        if !self.selected.remove(id) {
            self.selected.insert(id.clone());
        }
    }

    /// Header checkbox: select everything, or clear when everything is selected.
    pub fn toggle_all(&mut self) {
        if self.all_selected() {
            self.clear();
        } else {
            self.select_all();
        }
    }

    /// Check every row.
    pub fn select_all(&mut self) {
        self.selected = self.order.iter().cloned().collect();
    }

    /// Uncheck every row.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Whether `id` is checked.
    #[must_use]
    pub fn is_selected(&self, id: &EnvironmentId) -> bool {
        self.selected.contains(id)
    }

    /// True when the listing is non-empty and every row is checked.
    #[must_use]
    pub fn all_selected(&self) -> bool {
        !self.order.is_empty() && self.selected.len() == self.order.len()
    }

    /// Number of checked rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// True when nothing is checked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Checked ids in listing order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<EnvironmentId> {
        self.order
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }

    /// Re-sync after the listing reloads: rows that disappeared are unchecked.
    pub fn retain_existing(&mut self, listing: &EnvironmentListing) {
        self.order = listing.environments.iter().map(|env| env.id.clone()).collect();
        let order = &self.order;
        self.selected.retain(|id| order.contains(id));
    }

    /// What the edit button opens, or `None` when nothing is checked.
    #[must_use]
    pub fn edit_target(&self) -> Option<EditTarget> {
        let mut ids = self.selected_ids();
        match ids.len() {
            0 => None,
            1 => ids.pop().map(EditTarget::Single),
            _ => Some(EditTarget::Bulk(ids)),
        }
    }

    /// Label of the bulk submit button.
    #[must_use]
    pub fn bulk_submit_label(&self) -> String {
        let count = self.len();
        if count == 1 {
            "Update 1 Environment".to_string()
        } else {
            format!("Update {count} Environments")
        }
    }
}

/// Trigger text when nothing is selected.
pub const PICKER_PLACEHOLDER: &str = "Select environment";
/// Search box placeholder.
pub const PICKER_SEARCH_PLACEHOLDER: &str = "Find environment";
/// Shown when the search matches nothing.
pub const PICKER_EMPTY_MESSAGE: &str = "No environment found.";
/// Footer action.
pub const PICKER_NEW_ENVIRONMENT: &str = "New environment";

/// One picker entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerOption {
    /// Environment id.
    pub value: String,
    /// `org/repo`, or the environment name.
    pub label: String,
}

/// Environment combobox on the chat landing page.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentPicker {
    options: Vec<PickerOption>,
    selected: Option<String>,
}

impl EnvironmentPicker {
    /// Build options from a listing; the first environment is preselected.
    #[must_use]
    pub fn new(listing: &EnvironmentListing) -> Self {
        let options: Vec<PickerOption> = listing.environments.iter().map(picker_option).collect();
        let selected = options.first().map(|option| option.value.clone());
        Self { options, selected }
    }

    /// Every option, in listing order.
    #[must_use]
    pub fn options(&self) -> &[PickerOption] {
        &self.options
    }

    /// Options whose label contains `query`, ignoring case. A blank query keeps all.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&PickerOption> {
        let needle = query.trim().to_lowercase();
        self.options
            .iter()
            .filter(|option| needle.is_empty() || option.label.to_lowercase().contains(&needle))
            .collect()
    }

    /// Select by id. Returns false, leaving the selection alone, for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        if self.options.iter().any(|option| option.value == id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// The selected option.
    #[must_use]
    pub fn selected(&self) -> Option<&PickerOption> {
        let value = self.selected.as_deref()?;
        self.options.iter().find(|option| option.value == value)
    }

    /// Trigger text: the selected label, or the placeholder.
    #[must_use]
    pub fn trigger_label(&self) -> &str {
        self.selected()
            .map_or(PICKER_PLACEHOLDER, |option| option.label.as_str())
    }

    /// Where the "New environment" action goes.
    #[must_use]
    pub const fn new_environment_route() -> Route {
        Route::NewEnvironment
    }
}

fn picker_option(record: &EnvironmentRecord) -> PickerOption {
    let label = match (non_blank(record.github_org.as_deref()), non_blank(record.github_repo.as_deref())) {
        (Some(org), Some(repo)) => format!("{org}/{repo}"),
        _ => record.name.to_string(),
    };
    PickerOption {
        value: record.id.as_str().to_string(),
        label,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}
