//! Draft state of the environment form.
//!
//! The form is a plain reducer: every [`FormAction`] mutates the draft and
//! returns the full [`FormSnapshot`], which is what the transform stage
//! consumes. Nothing here talks to the network.

use codex_env_domain::{
    ContainerImage, EnvironmentField, EnvironmentRecord, LanguageRuntime, SetupScriptMode,
    VariableRow, VersionPins,
};
use std::collections::BTreeSet;

/// Client-only identifier of a variable row. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl RowId {
    /// Raw arena index, for rendering keys.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Which of the two row sequences an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowList {
    /// Plain variables.
    Variables,
    /// Secrets.
    Secrets,
}

/// Half of a row being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPart {
    /// The key input.
    Key,
    /// The value input.
    Value,
}

/// A row as displayed, with its rendering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRow {
    /// Rendering key.
    pub id: RowId,
    /// Key as typed.
    pub key: String,
    /// Value as typed.
    pub value: String,
}

impl DraftRow {
    /// The typed key/value pair, without the rendering key.
    #[must_use]
    pub fn to_row(&self) -> VariableRow {
        VariableRow::new(self.key.as_str(), self.value.as_str())
    }
}

/// One user edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    /// Edit the name input.
    SetName(String),
    /// Edit the description input.
    SetDescription(String),
    /// Edit the GitHub organization input.
    SetGithubOrg(String),
    /// Edit the GitHub repository input.
    SetGithubRepo(String),
    /// Pick a container image.
    SetContainerImage(ContainerImage),
    /// Pick a runtime version.
    SetVersion(LanguageRuntime, String),
    /// Flip the setup mode toggle (`"1"` automatic, `"2"` manual).
    ///
    /// An empty code is ignored; switching to automatic clears the script.
    SetSetupScriptMode(String),
    /// Edit the setup script.
    SetSetupScript(String),
    /// Toggle container caching.
    SetContainerCaching(bool),
    /// Toggle internet access.
    SetInternetAccess(bool),
    /// Type into one half of a row.
    EditRow {
        /// Target sequence.
        list: RowList,
        /// Target row.
        row: RowId,
        /// Key or value.
        part: RowPart,
        /// New text.
        text: String,
    },
    /// The key input of a row lost focus.
    ///
    /// When that row is the last one and its key is filled, a blank row is
    /// appended.
    BlurKey {
        /// Target sequence.
        list: RowList,
        /// Target row.
        row: RowId,
    },
    /// Append a blank row.
    AppendRow(RowList),
    /// Remove a row; the last remaining row is kept.
    RemoveRow {
        /// Target sequence.
        list: RowList,
        /// Target row.
        row: RowId,
    },
    /// Restore the initial draft.
    Reset,
}

/// Everything the transform stage needs from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    /// Name as typed.
    pub name: String,
    /// Description as typed.
    pub description: String,
    /// GitHub organization as typed.
    pub github_org: String,
    /// GitHub repository as typed.
    pub github_repo: String,
    /// Selected image.
    pub container_image: ContainerImage,
    /// Selected runtime versions. A blank entry means "use the default".
    pub versions: VersionPins,
    /// Two-valued toggle code, `"1"` or `"2"`.
    pub setup_script_mode: String,
    /// Setup script as typed.
    pub setup_script: String,
    /// Container caching toggle.
    pub container_caching_enabled: bool,
    /// Internet access toggle.
    pub internet_access_enabled: bool,
    /// Variable rows, blanks included.
    pub variables: Vec<VariableRow>,
    /// Secret rows, blanks included.
    pub secrets: Vec<VariableRow>,
    /// Columns the user changed since the form was opened.
    pub touched: BTreeSet<EnvironmentField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Draft {
    name: String,
    description: String,
    github_org: String,
    github_repo: String,
    container_image: ContainerImage,
    versions: VersionPins,
    setup_script_mode: String,
    setup_script: String,
    container_caching_enabled: bool,
    internet_access_enabled: bool,
    variables: Vec<DraftRow>,
    secrets: Vec<DraftRow>,
}

/// Form state controller for the add, edit and bulk-edit flows.
#[derive(Debug, Clone)]
pub struct EnvironmentForm {
    initial: Draft,
    draft: Draft,
    touched: BTreeSet<EnvironmentField>,
    next_row: u64,
}

impl Default for EnvironmentForm {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentForm {
    /// Add flow: every field at its default, one blank row per sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(String::new(), String::new(), |_| {})
    }

    /// Bulk-edit flow. Starts like the add flow with empty name and
    /// description; only touched columns are ever written.
    #[must_use]
    pub fn for_bulk_edit() -> Self {
        Self::new()
    }

    /// Single-edit flow, pre-filled with a stored row.
    #[must_use]
    pub fn from_record(record: &EnvironmentRecord) -> Self {
        Self::from_parts(
            record.name.to_string(),
            record.description.as_deref().unwrap_or_default().to_string(),
            |draft| {
                draft.github_org = record.github_org.as_deref().unwrap_or_default().to_string();
                draft.github_repo = record.github_repo.as_deref().unwrap_or_default().to_string();
                draft.container_image = record.container_image;
                draft.versions = record.versions.clone();
                draft.setup_script_mode = record.setup_script_mode.ui_code().to_string();
                if record.setup_script_mode == SetupScriptMode::Manual {
                    draft.setup_script =
                        record.setup_script.as_deref().unwrap_or_default().to_string();
                }
                draft.container_caching_enabled = record.container_caching_enabled;
                draft.internet_access_enabled = record.internet_access_enabled;
            },
        )
    }

    fn from_parts(name: String, description: String, customize: impl FnOnce(&mut Draft)) -> Self {
        let mut draft = Draft {
            name,
            description,
            github_org: String::new(),
            github_repo: String::new(),
            container_image: ContainerImage::default(),
            versions: default_pins(),
            setup_script_mode: SetupScriptMode::Automatic.ui_code().to_string(),
            setup_script: String::new(),
            container_caching_enabled: false,
            internet_access_enabled: false,
            variables: vec![DraftRow {
                id: RowId(0),
                key: String::new(),
                value: String::new(),
            }],
            secrets: vec![DraftRow {
                id: RowId(1),
                key: String::new(),
                value: String::new(),
            }],
        };
        customize(&mut draft);
        Self {
            initial: draft.clone(),
            draft,
            touched: BTreeSet::new(),
            next_row: 2,
        }
    }

    /// Apply one edit and return the resulting snapshot.
    pub fn dispatch(&mut self, action: FormAction) -> FormSnapshot {
        match action {
            FormAction::SetName(text) => {
                self.draft.name = text;
                self.touch(EnvironmentField::Name);
            },
            FormAction::SetDescription(text) => {
                self.draft.description = text;
                self.touch(EnvironmentField::Description);
            },
            FormAction::SetGithubOrg(text) => {
                self.draft.github_org = text;
                self.touch(EnvironmentField::GithubOrg);
            },
            FormAction::SetGithubRepo(text) => {
                self.draft.github_repo = text;
                self.touch(EnvironmentField::GithubRepo);
            },
            FormAction::SetContainerImage(image) => {
                self.draft.container_image = image;
                self.touch(EnvironmentField::ContainerImage);
            },
            FormAction::SetVersion(runtime, version) => {
                self.draft.versions.set(runtime, version);
                self.touch(EnvironmentField::Version(runtime));
            },
            FormAction::SetSetupScriptMode(code) => self.set_setup_mode(&code),
            FormAction::SetSetupScript(text) => {
                self.draft.setup_script = text;
                self.touch(EnvironmentField::SetupScript);
            },
            FormAction::SetContainerCaching(enabled) => {
                self.draft.container_caching_enabled = enabled;
                self.touch(EnvironmentField::ContainerCachingEnabled);
            },
            FormAction::SetInternetAccess(enabled) => {
                self.draft.internet_access_enabled = enabled;
                self.touch(EnvironmentField::InternetAccessEnabled);
            },
            FormAction::EditRow {
                list,
                row,
                part,
                text,
            } => {
                if let Some(target) = self.rows_mut(list).iter_mut().find(|draft| draft.id == row) {
                    match part {
                        RowPart::Key => target.key = text,
                        RowPart::Value => target.value = text,
                    }
                }
            },
            FormAction::BlurKey { list, row } => {
                let grow = self
                    .rows(list)
                    .last()
                    .is_some_and(|last| last.id == row && !last.key.is_empty());
                if grow {
                    self.append_row(list);
                }
            },
            FormAction::AppendRow(list) => self.append_row(list),
            FormAction::RemoveRow { list, row } => {
                let rows = self.rows_mut(list);
                if rows.len() > 1 {
                    rows.retain(|draft| draft.id != row);
                }
            },
            FormAction::Reset => {
                self.draft = self.initial.clone();
                self.touched.clear();
            },
        }
        self.snapshot()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FormSnapshot {
        let draft = &self.draft;
        FormSnapshot {
            name: draft.name.clone(),
            description: draft.description.clone(),
            github_org: draft.github_org.clone(),
            github_repo: draft.github_repo.clone(),
            container_image: draft.container_image,
            versions: draft.versions.clone(),
            setup_script_mode: draft.setup_script_mode.clone(),
            setup_script: draft.setup_script.clone(),
            container_caching_enabled: draft.container_caching_enabled,
            internet_access_enabled: draft.internet_access_enabled,
            variables: draft.variables.iter().map(DraftRow::to_row).collect(),
            secrets: draft.secrets.iter().map(DraftRow::to_row).collect(),
            touched: self.touched.clone(),
        }
    }

    /// Rows of one sequence, in display order.
    #[must_use]
    pub fn rows(&self, list: RowList) -> &[DraftRow] {
        match list {
            RowList::Variables => &self.draft.variables,
            RowList::Secrets => &self.draft.secrets,
        }
    }

    /// Returns true when the draft differs from its initial state.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.draft != self.initial
    }

    fn rows_mut(&mut self, list: RowList) -> &mut Vec<DraftRow> {
        match list {
            RowList::Variables => &mut self.draft.variables,
            RowList::Secrets => &mut self.draft.secrets,
        }
    }

    fn append_row(&mut self, list: RowList) {
        let id = RowId(self.next_row);
        self.next_row += 1;
        self.rows_mut(list).push(DraftRow {
            id,
            key: String::new(),
            value: String::new(),
        });
    }

    fn set_setup_mode(&mut self, code: &str) {
        if code.is_empty() {
            return;
        }
        self.draft.setup_script_mode = code.to_string();
        self.touch(EnvironmentField::SetupScriptMode);
        if SetupScriptMode::from_ui_code(code) == SetupScriptMode::Automatic {
            self.draft.setup_script.clear();
        }
    }

    fn touch(&mut self, field: EnvironmentField) {
        self.touched.insert(field);
    }
}

fn default_pins() -> VersionPins {
    LanguageRuntime::ALL
        .into_iter()
        .fold(VersionPins::default(), |pins, runtime| {
            pins.with(runtime, runtime.default_version())
        })
}

/// A `(value, label)` pair for a select input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOption {
    /// Submitted value.
    pub value: &'static str,
    /// Displayed label.
    pub label: &'static str,
}

/// Container image choices, in picker order.
#[must_use]
pub fn container_image_options() -> Vec<SelectOption> {
    ContainerImage::ALL
        .into_iter()
        .map(|image| SelectOption {
            value: image.as_str(),
            label: image.label(),
        })
        .collect()
}

/// Version choices offered for one runtime, newest first.
#[must_use]
pub fn version_options(runtime: LanguageRuntime) -> Vec<SelectOption> {
    runtime
        .offered_versions()
        .iter()
        .map(|version| SelectOption {
            value: version,
            label: version,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_env_domain::EnvironmentId;

    fn first_row(form: &EnvironmentForm, list: RowList) -> RowId {
        form.rows(list).first().map_or(RowId(u64::MAX), |row| row.id)
    }

    #[test]
    fn new_form_starts_with_defaults_and_one_blank_row_each() {
        let form = EnvironmentForm::new();
        let snapshot = form.snapshot();
        assert_eq!(snapshot.versions.get(LanguageRuntime::Python), "3.12");
        assert_eq!(snapshot.setup_script_mode, "1");
        assert_eq!(snapshot.variables, vec![VariableRow::default()]);
        assert_eq!(snapshot.secrets, vec![VariableRow::default()]);
        assert!(snapshot.touched.is_empty());
        assert!(!form.is_dirty());
    }

    #[test]
    fn filling_the_last_key_grows_the_list_on_blur() {
        let mut form = EnvironmentForm::new();
        let row = first_row(&form, RowList::Variables);
        form.dispatch(FormAction::EditRow {
            list: RowList::Variables,
            row,
            part: RowPart::Key,
            text: "api_key".into(),
        });
        let snapshot = form.dispatch(FormAction::BlurKey {
            list: RowList::Variables,
            row,
        });
        assert_eq!(snapshot.variables.len(), 2);
        assert_eq!(snapshot.secrets.len(), 1);

        // Blurring a row that is no longer last does nothing.
        let snapshot = form.dispatch(FormAction::BlurKey {
            list: RowList::Variables,
            row,
        });
        assert_eq!(snapshot.variables.len(), 2);
    }

    #[test]
    fn blurring_an_empty_key_does_not_grow() {
        let mut form = EnvironmentForm::new();
        let row = first_row(&form, RowList::Secrets);
        let snapshot = form.dispatch(FormAction::BlurKey {
            list: RowList::Secrets,
            row,
        });
        assert_eq!(snapshot.secrets.len(), 1);
    }

    #[test]
    fn last_remaining_row_cannot_be_removed() {
        let mut form = EnvironmentForm::new();
        let row = first_row(&form, RowList::Variables);
        let snapshot = form.dispatch(FormAction::RemoveRow {
            list: RowList::Variables,
            row,
        });
        assert_eq!(snapshot.variables.len(), 1);

        form.dispatch(FormAction::AppendRow(RowList::Variables));
        let snapshot = form.dispatch(FormAction::RemoveRow {
            list: RowList::Variables,
            row,
        });
        assert_eq!(snapshot.variables.len(), 1);
        assert_ne!(first_row(&form, RowList::Variables), row);
    }

    #[test]
    fn row_ids_are_never_reused() {
        let mut form = EnvironmentForm::new();
        form.dispatch(FormAction::AppendRow(RowList::Secrets));
        form.dispatch(FormAction::AppendRow(RowList::Variables));
        let mut ids: Vec<u64> = form
            .rows(RowList::Variables)
            .iter()
            .chain(form.rows(RowList::Secrets))
            .map(|row| row.id.get())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn switching_to_automatic_clears_the_script() {
        let mut form = EnvironmentForm::new();
        form.dispatch(FormAction::SetSetupScriptMode("2".into()));
        form.dispatch(FormAction::SetSetupScript("make setup".into()));
        let snapshot = form.dispatch(FormAction::SetSetupScriptMode(String::new()));
        assert_eq!(snapshot.setup_script_mode, "2");
        assert_eq!(snapshot.setup_script, "make setup");

        let snapshot = form.dispatch(FormAction::SetSetupScriptMode("1".into()));
        assert_eq!(snapshot.setup_script, "");
        assert!(snapshot.touched.contains(&EnvironmentField::SetupScriptMode));
    }

    #[test]
    fn edits_are_tracked_and_reset_restores_everything() {
        let mut form = EnvironmentForm::for_bulk_edit();
        form.dispatch(FormAction::SetVersion(LanguageRuntime::Node, "22".into()));
        let snapshot = form.dispatch(FormAction::SetInternetAccess(true));
        assert_eq!(
            snapshot.touched.iter().copied().collect::<Vec<_>>(),
            vec![
                EnvironmentField::Version(LanguageRuntime::Node),
                EnvironmentField::InternetAccessEnabled,
            ]
        );
        assert!(form.is_dirty());

        let snapshot = form.dispatch(FormAction::Reset);
        assert!(snapshot.touched.is_empty());
        assert_eq!(snapshot.versions.get(LanguageRuntime::Node), "20");
        assert!(!form.is_dirty());
    }

    #[test]
    fn edit_flow_is_prefilled_from_the_record() -> Result<(), codex_env_domain::PrimitiveError> {
        let record = EnvironmentRecord {
            id: EnvironmentId::parse("env-1")?,
            name: "ci-env".into(),
            description: None,
            github_org: Some("acme".into()),
            github_repo: Some("api".into()),
            container_image: ContainerImage::Node,
            versions: VersionPins::default().with(LanguageRuntime::Go, "1.22.4"),
            setup_script_mode: SetupScriptMode::Manual,
            setup_script: Some("make".into()),
            container_caching_enabled: true,
            internet_access_enabled: false,
            created_at: None,
            updated_at: None,
            created_by: None,
        };
        let snapshot = EnvironmentForm::from_record(&record).snapshot();
        assert_eq!(snapshot.name, "ci-env");
        assert_eq!(snapshot.description, "");
        assert_eq!(snapshot.github_org, "acme");
        assert_eq!(snapshot.container_image, ContainerImage::Node);
        assert_eq!(snapshot.versions.get(LanguageRuntime::Go), "1.22.4");
        assert_eq!(snapshot.setup_script_mode, "2");
        assert_eq!(snapshot.setup_script, "make");
        assert!(snapshot.container_caching_enabled);
        Ok(())
    }

    #[test]
    fn catalogs_list_every_choice() {
        let images: Vec<&str> = container_image_options().iter().map(|o| o.value).collect();
        assert_eq!(images, vec!["universal", "node", "python"]);
        let node: Vec<&str> = version_options(LanguageRuntime::Node)
            .iter()
            .map(|o| o.label)
            .collect();
        assert_eq!(node, vec!["22", "20", "18"]);
    }
}
