//! Query parameter editor
//!
//! Holds the ordered rows of one parameter list while the user edits
//! them. Every committed mutation goes through [`ParameterEditor::on_rows_changed`]
//! exactly once, which validates the rows and hands them to the host
//! for saving. Row indices are kept at `1..=N` after every operation.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{renumber, validate_rows, ParamKind, ParameterRow, RowField};
use crate::config::EditorConfig;
use crate::error::{CoreError, Result};
use crate::ports::Severity;

/// Callbacks the editor needs from the view embedding it
#[cfg_attr(test, mockall::automock)]
pub trait EditorHost {
    /// Show a notification to the user
    fn notification(&self, title: &str, message: &str, severity: Severity);

    /// Apply a parameter list to the running query; `None` resets it
    fn on_change_parameters(&self, rows: Option<Vec<ParameterRow>>, kind: ParamKind);

    /// Persist a validated parameter list
    fn save_changes(&self, rows: &[ParameterRow], kind: ParamKind);
}

/// Column of the active dataset, as described by the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub field: String,

    /// Declared data type
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
}

impl ColumnDef {
    /// Create a column definition
    pub fn new(field: &str, data_type: Option<&str>) -> Self {
        ColumnDef {
            field: field.to_string(),
            data_type: data_type.map(str::to_string),
        }
    }
}

/// Editor for one list of query parameters
#[derive(Debug)]
pub struct ParameterEditor<H: EditorHost> {
    kind: ParamKind,
    host: H,
    config: EditorConfig,
    columns: Vec<ColumnDef>,
    rows: Vec<ParameterRow>,
    canonical: Option<Vec<ParameterRow>>,
    hidden: bool,
}

impl<H: EditorHost> ParameterEditor<H> {
    /// Create an editor showing `initial`, the owner's canonical list
    pub fn new(
        kind: ParamKind,
        host: H,
        config: EditorConfig,
        columns: Vec<ColumnDef>,
        initial: Option<Vec<ParameterRow>>,
    ) -> Self {
        let initial = normalized(initial);
        let mut editor = ParameterEditor {
            kind,
            host,
            config,
            columns,
            rows: initial.clone().unwrap_or_default(),
            canonical: initial,
            hidden: false,
        };
        editor.ensure_row();
        editor
    }

    /// Parameter kind being edited
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Current rows, ordered by index
    pub fn rows(&self) -> &[ParameterRow] {
        &self.rows
    }

    /// Host callbacks
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Whether the embedder has hidden the editor
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Append an empty row
    pub fn add_row(&mut self) {
        let old = self.rows.clone();
        self.rows.push(ParameterRow::blank(self.rows.len() as u32 + 1));
        self.on_rows_changed(old);
    }

    /// Remove the row with `index` and renumber the rest.
    ///
    /// Returns `false` when no row has that index. Deleting the last row
    /// leaves a single blank row behind.
    pub fn delete_row(&mut self, index: u32) -> bool {
        let old = self.rows.clone();
        self.rows.retain(|row| row.index != index);
        if self.rows.len() == old.len() {
            return false;
        }
        renumber(&mut self.rows);
        self.ensure_row();
        self.on_rows_changed(old);
        true
    }

    /// Replace one field of the row with `index`.
    ///
    /// Choosing a column fills in the row's data type from the column
    /// definitions, but only while the row has no type yet.
    pub fn edit_cell(&mut self, index: u32, field: RowField, value: Value) -> Result<()> {
        let old = self.rows.clone();
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.index == index)
            .ok_or_else(|| CoreError::InvalidState(format!("no {} row {}", self.kind, index)))?;
        row.set_field(field, value)?;
        if field == RowField::DatasetColumn && row.data_type.is_none() {
            row.data_type = row.dataset_column.as_ref().and_then(|name| {
                self.columns
                    .iter()
                    .find(|c| &c.field == name)
                    .and_then(|c| c.data_type.clone())
            });
        }
        self.on_rows_changed(old);
        Ok(())
    }

    /// Move the row at position `from` to position `to` (0-based) and
    /// renumber every row
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.rows.len() || to >= self.rows.len() {
            return Err(CoreError::InvalidState(format!(
                "cannot move {} row from {} to {}, list has {} rows",
                self.kind,
                from,
                to,
                self.rows.len()
            )));
        }
        let old = self.rows.clone();
        let row = self.rows.remove(from);
        self.rows.insert(to, row);
        renumber(&mut self.rows);
        self.on_rows_changed(old);
        Ok(())
    }

    /// Drop every row and tell the owner the list is unset.
    ///
    /// The owner receives `None`, not an empty list. A blank draft row is
    /// put back for editing without being saved.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.host.on_change_parameters(None, self.kind);
        self.ensure_row();
    }

    /// Validate the rows and apply them to the running query
    pub fn run_query(&mut self) -> bool {
        match validate_rows(&self.rows, self.config.allow_blank_drafts) {
            Ok(()) => {
                self.host.on_change_parameters(Some(self.rows.clone()), self.kind);
                true
            }
            Err(err) => {
                self.notify_invalid(&err);
                false
            }
        }
    }

    /// Show or hide the editor.
    ///
    /// Hiding an editor whose rows diverge from the owner's list checks
    /// them once more so the user learns about mistakes before leaving.
    pub fn set_hidden(&mut self, hidden: bool) {
        let was_hidden = self.hidden;
        self.hidden = hidden;
        if hidden && !was_hidden && self.canonical.as_deref() != Some(self.rows.as_slice()) {
            if let Err(err) = validate_rows(&self.rows, self.config.allow_blank_drafts) {
                self.notify_invalid(&err);
            }
        }
    }

    /// Adopt a new canonical list from the owner, replacing local rows
    /// when it changed. This is not a commit and never saves.
    pub fn sync_external(&mut self, rows: Option<Vec<ParameterRow>>) {
        let rows = normalized(rows);
        if self.canonical == rows {
            return;
        }
        debug!("{} list replaced by owner", self.kind);
        self.rows = rows.clone().unwrap_or_default();
        self.canonical = rows;
        self.ensure_row();
    }

    /// Commit hook, run once per mutation with the rows before it
    fn on_rows_changed(&mut self, old: Vec<ParameterRow>) {
        if old == self.rows || self.rows.is_empty() {
            return;
        }
        if self.hidden {
            debug!("{} editor hidden, not saving", self.kind);
            return;
        }
        match validate_rows(&self.rows, self.config.allow_blank_drafts) {
            Ok(()) => self.host.save_changes(&self.rows, self.kind),
            Err(err) => self.notify_invalid(&err),
        }
    }

    fn notify_invalid(&self, err: &CoreError) {
        debug!("{} rows rejected: {}", self.kind, err);
        self.host.notification(
            self.kind.notification_title(),
            &self.config.correction_message,
            Severity::Error,
        );
    }

    fn ensure_row(&mut self) {
        if self.rows.is_empty() {
            self.rows.push(ParameterRow::blank(1));
        }
    }
}

/// Rows ordered by index and renumbered `1..=N`
fn normalized(rows: Option<Vec<ParameterRow>>) -> Option<Vec<ParameterRow>> {
    rows.map(|mut rows| {
        rows.sort_by_key(|row| row.index);
        renumber(&mut rows);
        rows
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::is_contiguous;
    use proptest::prelude::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum HostEvent {
        Notified(String),
        Changed(Option<Vec<ParameterRow>>),
        Saved(Vec<ParameterRow>),
    }

    #[derive(Debug, Default)]
    struct RecordingHost {
        events: RefCell<Vec<HostEvent>>,
    }

    impl RecordingHost {
        fn events(&self) -> Vec<HostEvent> {
            self.events.borrow().clone()
        }

        fn saves(&self) -> Vec<Vec<ParameterRow>> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    HostEvent::Saved(rows) => Some(rows),
                    _ => None,
                })
                .collect()
        }
    }

    impl EditorHost for RecordingHost {
        fn notification(&self, title: &str, _message: &str, _severity: Severity) {
            self.events.borrow_mut().push(HostEvent::Notified(title.to_string()));
        }

        fn on_change_parameters(&self, rows: Option<Vec<ParameterRow>>, _kind: ParamKind) {
            self.events.borrow_mut().push(HostEvent::Changed(rows));
        }

        fn save_changes(&self, rows: &[ParameterRow], _kind: ParamKind) {
            self.events.borrow_mut().push(HostEvent::Saved(rows.to_vec()));
        }
    }

    fn sort_row(index: u32, column: &str) -> ParameterRow {
        ParameterRow {
            index,
            dataset_column: Some(column.to_string()),
            operation: Some("asc".to_string()),
            ..Default::default()
        }
    }

    fn editor(initial: Option<Vec<ParameterRow>>) -> ParameterEditor<RecordingHost> {
        ParameterEditor::new(
            ParamKind::Sort,
            RecordingHost::default(),
            EditorConfig::default(),
            vec![ColumnDef::new("age", Some("Integer")), ColumnDef::new("name", Some("String"))],
            initial,
        )
    }

    #[test]
    fn test_new_editor_never_empty() {
        let e = editor(None);
        assert_eq!(e.rows(), &[ParameterRow::blank(1)]);
        assert!(e.host().events().is_empty());
    }

    #[test]
    fn test_add_row_appends_and_saves() {
        let mut e = editor(Some(vec![sort_row(1, "age")]));
        e.add_row();
        assert_eq!(e.rows().len(), 2);
        assert_eq!(e.rows()[1], ParameterRow::blank(2));
        assert_eq!(e.host().saves(), vec![e.rows().to_vec()]);
    }

    #[test]
    fn test_delete_renumbers() {
        let mut e = editor(Some(vec![sort_row(1, "age"), sort_row(2, "name"), sort_row(3, "id")]));
        assert!(e.delete_row(2));
        let columns: Vec<_> = e.rows().iter().map(|r| r.dataset_column.clone().unwrap()).collect();
        assert_eq!(columns, vec!["age", "id"]);
        assert!(is_contiguous(e.rows()));

        assert!(!e.delete_row(7));
        assert_eq!(e.host().saves().len(), 1);
    }

    #[test]
    fn test_delete_last_row_inserts_blank_and_saves_it() {
        let mut e = editor(Some(vec![sort_row(1, "age")]));
        assert!(e.delete_row(1));
        assert_eq!(e.rows(), &[ParameterRow::blank(1)]);
        assert_eq!(e.host().saves(), vec![vec![ParameterRow::blank(1)]]);
    }

    #[test]
    fn test_reset_notifies_none_not_empty() {
        let mut e = editor(Some(vec![sort_row(1, "age")]));
        e.reset();
        assert_eq!(e.host().events(), vec![HostEvent::Changed(None)]);
        assert_eq!(e.rows(), &[ParameterRow::blank(1)]);

        // Deleting down to zero is observably different: a one-row save
        let mut e = editor(Some(vec![sort_row(1, "age")]));
        e.delete_row(1);
        let saved = e.host().saves();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].len(), 1);
    }

    #[test]
    fn test_edit_cell_derives_type_once() {
        let mut e = editor(None);
        e.edit_cell(1, RowField::DatasetColumn, json!("age")).unwrap();
        assert_eq!(e.rows()[0].data_type.as_deref(), Some("Integer"));

        // The type stays from the first column chosen
        e.edit_cell(1, RowField::DatasetColumn, json!("name")).unwrap();
        assert_eq!(e.rows()[0].dataset_column.as_deref(), Some("name"));
        assert_eq!(e.rows()[0].data_type.as_deref(), Some("Integer"));
    }

    #[test]
    fn test_edit_cell_validation_notifies_instead_of_saving() {
        let mut e = editor(None);
        e.edit_cell(1, RowField::DatasetColumn, json!("age")).unwrap();
        assert_eq!(
            e.host().events(),
            vec![HostEvent::Notified("Sort notification".to_string())]
        );

        e.edit_cell(1, RowField::Operation, json!("desc")).unwrap();
        assert_eq!(e.host().saves().len(), 1);
        assert_eq!(e.host().saves()[0][0].operation.as_deref(), Some("desc"));
    }

    #[test]
    fn test_edit_cell_unknown_row() {
        let mut e = editor(None);
        let err = e.edit_cell(9, RowField::Operation, json!("asc")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn test_reorder() {
        let mut e = editor(Some(vec![sort_row(1, "a"), sort_row(2, "b"), sort_row(3, "c")]));
        e.reorder(0, 2).unwrap();
        let columns: Vec<_> = e.rows().iter().map(|r| r.dataset_column.clone().unwrap()).collect();
        assert_eq!(columns, vec!["b", "c", "a"]);
        assert!(is_contiguous(e.rows()));
        assert!(e.reorder(0, 3).is_err());

        // A no-op move commits nothing
        e.reorder(1, 1).unwrap();
        assert_eq!(e.host().saves().len(), 1);
    }

    #[test]
    fn test_hidden_editor_does_not_save() {
        let mut e = editor(Some(vec![sort_row(1, "age")]));
        e.set_hidden(true);
        e.add_row();
        assert!(e.host().saves().is_empty());
    }

    #[test]
    fn test_hiding_with_invalid_changes_notifies() {
        let mut e = editor(Some(vec![sort_row(1, "age")]));
        e.edit_cell(1, RowField::Operation, Value::Null).unwrap();
        assert_eq!(e.host().events().len(), 1);

        e.set_hidden(true);
        assert_eq!(
            e.host().events(),
            vec![
                HostEvent::Notified("Sort notification".to_string()),
                HostEvent::Notified("Sort notification".to_string()),
            ]
        );
    }

    #[test]
    fn test_sync_external_replaces_without_saving() {
        let mut e = editor(None);
        e.sync_external(Some(vec![sort_row(1, "age"), sort_row(2, "name")]));
        assert_eq!(e.rows().len(), 2);

        e.sync_external(None);
        assert_eq!(e.rows(), &[ParameterRow::blank(1)]);
        assert!(e.host().saves().is_empty());
    }

    #[test]
    fn test_gapped_rows_are_renumbered_on_intake() {
        let mut e = editor(Some(vec![sort_row(3, "name"), sort_row(1, "age")]));
        let columns: Vec<_> = e.rows().iter().map(|r| r.dataset_column.clone().unwrap()).collect();
        assert_eq!(columns, vec!["age", "name"]);
        assert!(is_contiguous(e.rows()));

        e.add_row();
        let indices: Vec<_> = e.rows().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);

        e.sync_external(Some(vec![sort_row(5, "b"), sort_row(2, "a"), sort_row(9, "c")]));
        let columns: Vec<_> = e.rows().iter().map(|r| r.dataset_column.clone().unwrap()).collect();
        assert_eq!(columns, vec!["a", "b", "c"]);
        assert!(is_contiguous(e.rows()));

        assert!(e.delete_row(2));
        let columns: Vec<_> = e.rows().iter().map(|r| r.dataset_column.clone().unwrap()).collect();
        assert_eq!(columns, vec!["a", "c"]);
    }

    #[test]
    fn test_run_query() {
        let mut host = MockEditorHost::new();
        host.expect_on_change_parameters()
            .withf(|rows, kind| rows.as_ref().map(Vec::len) == Some(1) && *kind == ParamKind::Sort)
            .times(1)
            .return_const(());
        host.expect_notification()
            .withf(|title, message, severity| {
                title == "Sort notification"
                    && message == "Please, correct the mistakes"
                    && *severity == Severity::Error
            })
            .times(1)
            .return_const(());

        let mut e = ParameterEditor::new(
            ParamKind::Sort,
            host,
            EditorConfig::default(),
            vec![],
            Some(vec![sort_row(1, "age")]),
        );
        assert!(e.run_query());

        e.sync_external(Some(vec![ParameterRow {
            index: 1,
            operation: Some("asc".to_string()),
            ..Default::default()
        }]));
        assert!(!e.run_query());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add,
        Delete(u32),
        Reorder(usize, usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Add),
            (1u32..8).prop_map(Op::Delete),
            (0usize..8, 0usize..8).prop_map(|(a, b)| Op::Reorder(a, b)),
        ]
    }

    proptest! {
        #[test]
        fn prop_indices_stay_contiguous(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let mut e = editor(None);
            for op in ops {
                match op {
                    Op::Add => e.add_row(),
                    Op::Delete(index) => { e.delete_row(index); }
                    Op::Reorder(from, to) => { let _ = e.reorder(from, to); }
                }
                prop_assert!(!e.rows().is_empty());
                prop_assert!(is_contiguous(e.rows()));
            }
        }
    }
}
