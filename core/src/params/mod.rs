//! Server-side query parameters
//!
//! A dataset view carries five ordered lists of user-defined query
//! parameters: sorts, filters, aggregates, group-bys and highlights.
//! While being edited (and while stored in the user profile) every
//! entry is a flat [`ParameterRow`]; once complete it is turned into the
//! [`QueryParam`] variant of its kind, which keeps only the fields that
//! kind gives meaning to.

pub mod editor;

pub use editor::{EditorHost, ParameterEditor};

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// The kinds of query parameter lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    /// Ordering
    Sort,
    /// Row filtering
    Filter,
    /// Aggregation
    Aggregate,
    /// Grouping
    GroupBy,
    /// Conditional formatting
    Highlight,
}

impl ParamKind {
    /// Every kind, in the order they are merged into a component
    pub const ALL: [ParamKind; 5] = [
        ParamKind::Filter,
        ParamKind::Aggregate,
        ParamKind::Sort,
        ParamKind::GroupBy,
        ParamKind::Highlight,
    ];

    /// Field of the profile value holding rows of this kind
    pub fn profile_field(&self) -> &'static str {
        match self {
            ParamKind::Sort => "serverSorts",
            ParamKind::Filter => "serverFilters",
            ParamKind::Aggregate => "serverAggregates",
            ParamKind::GroupBy => "serverGroupBy",
            ParamKind::Highlight => "highlights",
        }
    }

    /// Containment feature of a dataset component holding this kind
    pub fn component_feature(&self) -> &'static str {
        match self {
            ParamKind::Sort => "serverSort",
            ParamKind::Filter => "serverFilter",
            ParamKind::Aggregate => "serverAggregation",
            ParamKind::GroupBy => "serverGroupBy",
            ParamKind::Highlight => "highlight",
        }
    }

    /// Model class instantiated for parameters of this kind
    pub fn class_name(&self) -> &'static str {
        match self {
            ParamKind::Sort => "QuerySort",
            ParamKind::Filter => "QueryFilter",
            ParamKind::Aggregate => "QueryAggregate",
            ParamKind::GroupBy => "QueryGroupBy",
            ParamKind::Highlight => "Highlight",
        }
    }

    /// Title of notifications raised by the editor for this kind
    pub fn notification_title(&self) -> &'static str {
        match self {
            ParamKind::Sort => "Sort notification",
            ParamKind::Filter => "Filter notification",
            ParamKind::Aggregate => "Aggregate notification",
            ParamKind::GroupBy => "Group by notification",
            ParamKind::Highlight => "Highlight notification",
        }
    }
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.profile_field())
    }
}

/// Editable column of a parameter row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowField {
    /// Referenced dataset column
    DatasetColumn,
    /// Operation name
    Operation,
    /// Operand
    Value,
    /// Enabled flag
    Enable,
    /// Highlight target
    HighlightType,
    /// Highlight background color
    BackgroundColor,
    /// Highlight text color
    Color,
}

/// One editable entry of a parameter list, as stored in the profile
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterRow {
    /// 1-based position; rows of a list are always numbered `1..=N`
    pub index: u32,

    /// Name of the referenced dataset column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_column: Option<String>,

    /// Operation name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Operand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Enabled flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    /// Data type of the referenced column
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Highlight target (cell, row, column)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_type: Option<String>,

    /// Highlight background color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    /// Highlight text color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ParameterRow {
    /// A row with only its index set
    pub fn blank(index: u32) -> Self {
        ParameterRow {
            index,
            ..Default::default()
        }
    }

    /// Whether every field besides the index is unset
    pub fn is_blank(&self) -> bool {
        *self == ParameterRow::blank(self.index)
    }

    /// Replace one field with a new value.
    ///
    /// `value` is interpreted according to the field: strings for names
    /// and colors, a boolean for `enable`, anything for `value`. `null`
    /// clears the field.
    pub fn set_field(&mut self, field: RowField, value: Value) -> Result<()> {
        match field {
            RowField::DatasetColumn => self.dataset_column = string_field(field, value)?,
            RowField::Operation => self.operation = string_field(field, value)?,
            RowField::Value => self.value = Some(value).filter(|v| !v.is_null()),
            RowField::Enable => {
                self.enable = match value {
                    Value::Null => None,
                    Value::Bool(b) => Some(b),
                    other => {
                        return Err(CoreError::Validation(format!(
                            "enable expects a boolean, got {}",
                            other
                        )))
                    }
                }
            }
            RowField::HighlightType => self.highlight_type = string_field(field, value)?,
            RowField::BackgroundColor => self.background_color = string_field(field, value)?,
            RowField::Color => self.color = string_field(field, value)?,
        }
        Ok(())
    }
}

fn string_field(field: RowField, value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(CoreError::Validation(format!(
            "{:?} expects a string, got {}",
            field, other
        ))),
    }
}

/// Renumber rows to `1..=N` in their current order
pub fn renumber(rows: &mut [ParameterRow]) {
    for (position, row) in rows.iter_mut().enumerate() {
        row.index = position as u32 + 1;
    }
}

/// Whether row indices are exactly `1..=N` in order
pub fn is_contiguous(rows: &[ParameterRow]) -> bool {
    rows.iter()
        .enumerate()
        .all(|(position, row)| row.index == position as u32 + 1)
}

/// Check a row for completeness.
///
/// Blank rows pass when `allow_blank` is set: they are drafts the user
/// has not started filling in. Any other row needs a column and an
/// operation.
pub fn validate_row(row: &ParameterRow, allow_blank: bool) -> Result<()> {
    if allow_blank && row.is_blank() {
        return Ok(());
    }
    if row.dataset_column.is_none() {
        return Err(CoreError::Validation(format!("row {} has no column", row.index)));
    }
    if row.operation.is_none() {
        return Err(CoreError::Validation(format!("row {} has no operation", row.index)));
    }
    Ok(())
}

/// Check every row of a list
pub fn validate_rows(rows: &[ParameterRow], allow_blank: bool) -> Result<()> {
    rows.iter().try_for_each(|row| validate_row(row, allow_blank))
}

/// Ordering parameter
#[derive(Debug, Clone, PartialEq)]
pub struct SortParam {
    /// Position in the list
    pub index: u32,
    /// Column name
    pub column: String,
    /// Sort direction
    pub operation: String,
    /// Enabled flag
    pub enable: Option<bool>,
}

/// Filtering parameter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParam {
    /// Position in the list
    pub index: u32,
    /// Column name
    pub column: String,
    /// Comparison operation
    pub operation: String,
    /// Operand
    pub value: Option<Value>,
    /// Enabled flag
    pub enable: Option<bool>,
    /// Column data type the operand is interpreted as
    pub data_type: Option<String>,
}

/// Aggregation parameter
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateParam {
    /// Position in the list
    pub index: u32,
    /// Column name
    pub column: String,
    /// Aggregate function
    pub operation: String,
    /// Enabled flag
    pub enable: Option<bool>,
}

/// Grouping parameter
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByParam {
    /// Position in the list
    pub index: u32,
    /// Column name
    pub column: String,
    /// Aggregate applied to the group
    pub operation: String,
    /// Output column name
    pub value: Option<Value>,
    /// Enabled flag
    pub enable: Option<bool>,
}

/// Conditional formatting parameter
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightParam {
    /// Position in the list
    pub index: u32,
    /// Column name
    pub column: String,
    /// Comparison operation
    pub operation: String,
    /// Operand
    pub value: Option<Value>,
    /// Enabled flag
    pub enable: Option<bool>,
    /// Column data type the operand is interpreted as
    pub data_type: Option<String>,
    /// Highlight target
    pub highlight_type: Option<String>,
    /// Background color
    pub background_color: Option<String>,
    /// Text color
    pub color: Option<String>,
}

/// A complete query parameter of one kind
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    /// Ordering
    Sort(SortParam),
    /// Row filtering
    Filter(FilterParam),
    /// Aggregation
    Aggregate(AggregateParam),
    /// Grouping
    GroupBy(GroupByParam),
    /// Conditional formatting
    Highlight(HighlightParam),
}

impl QueryParam {
    /// Build the typed parameter of `kind` from a stored row.
    ///
    /// Returns `None` for drafts: rows without an operation or a column.
    pub fn from_row(kind: ParamKind, row: &ParameterRow) -> Option<Self> {
        let operation = row.operation.clone()?;
        let column = row.dataset_column.clone()?;
        let index = row.index;
        let enable = row.enable;
        Some(match kind {
            ParamKind::Sort => QueryParam::Sort(SortParam {
                index,
                column,
                operation,
                enable,
            }),
            ParamKind::Filter => QueryParam::Filter(FilterParam {
                index,
                column,
                operation,
                value: row.value.clone(),
                enable,
                data_type: row.data_type.clone(),
            }),
            ParamKind::Aggregate => QueryParam::Aggregate(AggregateParam {
                index,
                column,
                operation,
                enable,
            }),
            ParamKind::GroupBy => QueryParam::GroupBy(GroupByParam {
                index,
                column,
                operation,
                value: row.value.clone(),
                enable,
            }),
            ParamKind::Highlight => QueryParam::Highlight(HighlightParam {
                index,
                column,
                operation,
                value: row.value.clone(),
                enable,
                data_type: row.data_type.clone(),
                highlight_type: row.highlight_type.clone(),
                background_color: row.background_color.clone(),
                color: row.color.clone(),
            }),
        })
    }

    /// Kind of this parameter
    pub fn kind(&self) -> ParamKind {
        match self {
            QueryParam::Sort(_) => ParamKind::Sort,
            QueryParam::Filter(_) => ParamKind::Filter,
            QueryParam::Aggregate(_) => ParamKind::Aggregate,
            QueryParam::GroupBy(_) => ParamKind::GroupBy,
            QueryParam::Highlight(_) => ParamKind::Highlight,
        }
    }

    /// Position in the list
    pub fn index(&self) -> u32 {
        match self {
            QueryParam::Sort(p) => p.index,
            QueryParam::Filter(p) => p.index,
            QueryParam::Aggregate(p) => p.index,
            QueryParam::GroupBy(p) => p.index,
            QueryParam::Highlight(p) => p.index,
        }
    }

    /// Referenced column name
    pub fn column(&self) -> &str {
        match self {
            QueryParam::Sort(p) => &p.column,
            QueryParam::Filter(p) => &p.column,
            QueryParam::Aggregate(p) => &p.column,
            QueryParam::GroupBy(p) => &p.column,
            QueryParam::Highlight(p) => &p.column,
        }
    }

    /// Attribute values to store on the model object, besides the column
    pub fn attributes(&self) -> Vec<(&'static str, Value)> {
        let mut attrs = Vec::new();
        let mut push = |name: &'static str, value: Option<Value>| {
            if let Some(value) = value {
                attrs.push((name, value));
            }
        };
        match self {
            QueryParam::Sort(p) => {
                push("operation", Some(Value::from(p.operation.clone())));
                push("enable", p.enable.map(Value::from));
            }
            QueryParam::Aggregate(p) => {
                push("operation", Some(Value::from(p.operation.clone())));
                push("enable", p.enable.map(Value::from));
            }
            QueryParam::Filter(p) => {
                push("operation", Some(Value::from(p.operation.clone())));
                push("value", p.value.clone());
                push("enable", p.enable.map(Value::from));
                push("type", p.data_type.clone().map(Value::from));
            }
            QueryParam::GroupBy(p) => {
                push("operation", Some(Value::from(p.operation.clone())));
                push("value", p.value.clone());
                push("enable", p.enable.map(Value::from));
            }
            QueryParam::Highlight(p) => {
                push("operation", Some(Value::from(p.operation.clone())));
                push("value", p.value.clone());
                push("enable", p.enable.map(Value::from));
                push("type", p.data_type.clone().map(Value::from));
                push("highlightType", p.highlight_type.clone().map(Value::from));
                push("backgroundColor", p.background_color.clone().map(Value::from));
                push("color", p.color.clone().map(Value::from));
            }
        }
        attrs
    }
}
