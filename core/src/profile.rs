//! User profile parameters
//!
//! The profile is a flat list of `{key, value}` entries, one per
//! artifact, where `value` is a JSON-encoded string. Entries are found
//! by linear scan. For a dataset component the decoded value carries
//! the five parameter lists plus the name of the active component
//! variant; for a view it carries simple display settings.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::model::ModelObject;
use crate::params::{ParamKind, ParameterRow};

/// One profile entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// Id of the artifact the entry belongs to
    pub key: String,

    /// JSON-encoded settings
    pub value: String,
}

/// Snapshot of the current user's profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Login name of the user
    pub user_name: String,

    /// Entries, at most one per key
    #[serde(default)]
    pub params: Vec<ProfileEntry>,
}

impl UserProfile {
    /// Entry for `key`
    pub fn entry(&self, key: &str) -> Option<&ProfileEntry> {
        self.params.iter().find(|p| p.key == key)
    }

    /// Decoded entry for `key`; `Ok(None)` when there is no entry
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.entry(key)
            .map(|entry| serde_json::from_str(&entry.value).map_err(CoreError::Json))
            .transpose()
    }
}

/// Merge `params` into an encoded entry value.
///
/// Keys of `params` overwrite keys of the existing object. `None`
/// removes the entry, signalled by returning `Ok(None)`.
pub fn merge_entry_value(existing: Option<&str>, params: Option<Value>) -> Result<Option<String>> {
    let Some(params) = params else {
        return Ok(None);
    };
    let mut merged = match existing {
        Some(encoded) => match serde_json::from_str::<Value>(encoded)? {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        None => Map::new(),
    };
    match params {
        Value::Object(map) => merged.extend(map),
        other => {
            return Err(CoreError::Validation(format!(
                "profile parameters must be an object, got {}",
                other
            )))
        }
    }
    Ok(Some(serde_json::to_string(&Value::Object(merged))?))
}

/// Profile value stored for a dataset component or dataset view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetProfile {
    /// Name of the active component variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Filter rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_filters: Option<Vec<ParameterRow>>,

    /// Aggregate rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_aggregates: Option<Vec<ParameterRow>>,

    /// Sort rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_sorts: Option<Vec<ParameterRow>>,

    /// Group-by rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_group_by: Option<Vec<ParameterRow>>,

    /// Highlight rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<ParameterRow>>,
}

impl DatasetProfile {
    /// Decode a profile entry value
    pub fn decode(value: &str) -> Result<Self> {
        Ok(serde_json::from_str(value)?)
    }

    /// Encode as a profile entry value
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rows stored for `kind`, `None` when the list was never stored
    pub fn rows(&self, kind: ParamKind) -> Option<&[ParameterRow]> {
        self.slot(kind).as_deref()
    }

    /// Store rows for `kind`
    pub fn set_rows(&mut self, kind: ParamKind, rows: Option<Vec<ParameterRow>>) {
        *self.slot_mut(kind) = rows;
    }

    fn slot(&self, kind: ParamKind) -> &Option<Vec<ParameterRow>> {
        match kind {
            ParamKind::Filter => &self.server_filters,
            ParamKind::Aggregate => &self.server_aggregates,
            ParamKind::Sort => &self.server_sorts,
            ParamKind::GroupBy => &self.server_group_by,
            ParamKind::Highlight => &self.highlights,
        }
    }

    fn slot_mut(&mut self, kind: ParamKind) -> &mut Option<Vec<ParameterRow>> {
        match kind {
            ParamKind::Filter => &mut self.server_filters,
            ParamKind::Aggregate => &mut self.server_aggregates,
            ParamKind::Sort => &mut self.server_sorts,
            ParamKind::GroupBy => &mut self.server_group_by,
            ParamKind::Highlight => &mut self.highlights,
        }
    }
}

/// Display settings of a grid view kept in the profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSettings {
    /// Grid theme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    /// Whether duplicate rows are collapsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_uniq_row: Option<bool>,

    /// Page size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_per_page: Option<Value>,
}

impl ViewSettings {
    /// Read the settings set on a view object
    pub fn from_view(view: &ModelObject) -> Self {
        ViewSettings {
            theme: view.str_attr("theme").map(str::to_string),
            show_uniq_row: view.attr("showUniqRow").and_then(Value::as_bool),
            row_per_page: view.attr("rowPerPage").cloned(),
        }
    }

    /// Settings as profile parameters
    pub fn to_params(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EClass;
    use serde_json::json;

    fn profile(entries: &[(&str, &str)]) -> UserProfile {
        UserProfile {
            user_name: "admin".to_string(),
            params: entries
                .iter()
                .map(|(key, value)| ProfileEntry {
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_entry_absent_vs_empty() {
        let p = profile(&[("c1", "{}")]);

        let absent: Option<DatasetProfile> = p.decode("c2").unwrap();
        assert!(absent.is_none());

        let empty: DatasetProfile = p.decode("c1").unwrap().unwrap();
        assert_eq!(empty, DatasetProfile::default());
        assert!(empty.rows(ParamKind::Sort).is_none());
    }

    #[test]
    fn test_decode_bad_json() {
        let p = profile(&[("c1", "not json")]);
        assert!(p.decode::<DatasetProfile>("c1").is_err());
    }

    #[test]
    fn test_dataset_profile_encoding() {
        let mut dp = DatasetProfile {
            name: Some("my report".to_string()),
            ..Default::default()
        };
        dp.set_rows(
            ParamKind::Sort,
            Some(vec![ParameterRow {
                index: 1,
                dataset_column: Some("age".to_string()),
                operation: Some("asc".to_string()),
                ..Default::default()
            }]),
        );
        dp.set_rows(ParamKind::GroupBy, Some(vec![]));

        let encoded = dp.encode().unwrap();
        let json: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(json["serverSorts"][0]["datasetColumn"], "age");
        assert_eq!(json["serverGroupBy"], json!([]));
        assert!(json.get("highlights").is_none());

        assert_eq!(DatasetProfile::decode(&encoded).unwrap(), dp);
    }

    #[test]
    fn test_merge_entry_value() {
        let merged = merge_entry_value(Some(r#"{"name":"a","theme":"dark"}"#), Some(json!({"name": "b"})))
            .unwrap()
            .unwrap();
        let json: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(json, json!({"name": "b", "theme": "dark"}));

        assert_eq!(merge_entry_value(Some("{}"), None).unwrap(), None);
        assert!(merge_entry_value(None, Some(json!(3))).is_err());
    }

    #[test]
    fn test_view_settings_skip_unset() {
        let view = ModelObject::new(EClass::new("DatasetGridView").build())
            .with_attr("theme", "material")
            .with_attr("rowPerPage", 50);
        let params = ViewSettings::from_view(&view).to_params().unwrap();
        assert_eq!(params, json!({"theme": "material", "rowPerPage": 50}));
    }
}
