//! Class annotation lookup
//!
//! UI hints (hidden features, disabled features, documentation) are
//! attached to classes as annotations under a well-known source. These
//! helpers flatten them into a single comma-joined value.

use super::class::{Annotation, ClassDescriptor};

/// Annotation detail keys the UI understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKey {
    /// Comma-separated names of features to hide
    Invisible,
    /// Comma-separated names of read-only features
    Disabled,
    /// Free-form documentation
    Documentation,
}

impl AnnotationKey {
    /// Detail key as stored in the schema
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKey::Invisible => "invisible",
            AnnotationKey::Disabled => "disabled",
            AnnotationKey::Documentation => "documentation",
        }
    }
}

/// Value of `key` among `annotations` from `source`.
///
/// When several details match, the last one wins. Returns an empty
/// string when nothing matches.
pub fn annotation_value(annotations: &[Annotation], source: &str, key: AnnotationKey) -> String {
    let mut value = String::new();
    for annotation in annotations.iter().filter(|a| a.source == source) {
        for detail in annotation.details.iter().filter(|d| d.key == key.as_str()) {
            value = detail.value.clone();
        }
    }
    value
}

/// Annotation value of a class, optionally prefixed by the values of
/// all its ancestors.
///
/// Values are joined with `,` once something has been collected, so an
/// ancestor without the annotation still contributes an empty segment
/// after the first non-empty one.
pub fn class_annotation(
    class: &dyn ClassDescriptor,
    source: &str,
    key: AnnotationKey,
    check_parents: bool,
) -> String {
    let mut joined = String::new();
    if check_parents {
        for super_type in class.all_super_types() {
            joined = join(joined, annotation_value(super_type.annotations(), source, key));
        }
    }
    join(joined, annotation_value(class.annotations(), source, key))
}

/// Split a flattened annotation value into trimmed, non-empty names
pub fn split_names(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

fn join(acc: String, next: String) -> String {
    if acc.is_empty() {
        next
    } else {
        format!("{},{}", acc, next)
    }
}
