//! Form field mapping
//!
//! Picks the editable control for a model feature from its declared
//! type and cardinality, and wires the control's callbacks to an event
//! sink supplied by whoever owns the form. A feature whose type cannot
//! be resolved gets an inert placeholder instead of failing the form.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::debug;
use serde_json::Value;

use crate::model::reflection::{class_annotation, split_names, AnnotationKey};
use crate::model::{ClassDescriptor, DataType, Feature, FieldType, ObjectRef, UpperBound};

/// Value held by a form field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Attribute value
    Scalar(Value),
    /// Single reference
    Ref(ObjectRef),
    /// Multi-valued reference
    Refs(Vec<ObjectRef>),
}

impl FieldValue {
    /// JSON form, as sent to the model client
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Scalar(value) => value.clone(),
            FieldValue::Ref(r) => serde_json::to_value(r).unwrap_or(Value::Null),
            FieldValue::Refs(refs) => serde_json::to_value(refs).unwrap_or(Value::Null),
        }
    }
}

/// Something the user did to a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEvent {
    /// New value entered
    Changed {
        /// Field name
        field: String,
        /// Entered value
        value: FieldValue,
    },

    /// Reference picker opened
    Browse {
        /// The reference feature
        field: Feature,
    },

    /// One target removed from a multi-valued reference
    DeleteRef {
        /// Field name
        field: String,
        /// Removed target
        target: ObjectRef,
    },

    /// Single-valued reference cleared
    DeleteSingle {
        /// Field name
        field: String,
    },
}

/// Receiver of field events
pub type EventSink = Arc<dyn Fn(FieldEvent) + Send + Sync>;

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// What the mapper needs besides the feature
#[derive(Clone)]
pub struct FieldContext {
    /// Current value
    pub value: Option<FieldValue>,

    /// Whether the field is read-only
    pub disabled: bool,

    /// Where control callbacks send events
    pub sink: EventSink,
}

impl FieldContext {
    /// Context for an editable field
    pub fn new(value: Option<FieldValue>, sink: EventSink) -> Self {
        FieldContext {
            value,
            disabled: false,
            sink,
        }
    }
}

/// Kind of control rendered for a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    /// Inert stand-in for a field of unknown type
    Placeholder,
    /// Free text
    Text,
    /// Numeric input
    Number {
        /// Whether fractions are rejected
        integral: bool,
    },
    /// Switch
    Boolean,
    /// Date picker
    Date,
    /// Date and time picker
    DateTime,
    /// Choice among enumeration literals
    Select {
        /// Literal names
        literals: Vec<String>,
    },
    /// Picker for a single reference
    SingleReference {
        /// Referenced class name
        type_name: String,
    },
    /// Picker for a multi-valued reference
    MultiReference {
        /// Referenced class name
        type_name: String,
    },
}

/// A control ready to render, with its callbacks bound to the field
#[derive(Clone)]
pub struct RenderableControl {
    /// Field name
    pub id: String,

    /// Kind of control
    pub kind: ControlKind,

    /// Current value
    pub value: Option<FieldValue>,

    /// Cardinality of the field
    pub upper_bound: UpperBound,

    /// Whether the control is read-only
    pub disabled: bool,

    on_change: Option<Callback<FieldValue>>,
    on_browse: Option<Callback<()>>,
    on_delete: Option<Callback<Option<ObjectRef>>>,
}

impl Debug for RenderableControl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RenderableControl")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("upper_bound", &self.upper_bound)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl RenderableControl {
    fn placeholder(field: &Feature) -> Self {
        RenderableControl {
            id: field.name.clone(),
            kind: ControlKind::Placeholder,
            value: None,
            upper_bound: field.upper_bound,
            disabled: true,
            on_change: None,
            on_browse: None,
            on_delete: None,
        }
    }

    /// Whether the control reacts to input
    pub fn is_interactive(&self) -> bool {
        !self.disabled && self.on_change.is_some()
    }

    /// Report a new value
    pub fn change(&self, value: FieldValue) {
        if self.disabled {
            return;
        }
        if let Some(cb) = &self.on_change {
            cb(value);
        }
    }

    /// Report a picked date, as an ISO-8601 date string
    pub fn change_date(&self, date: NaiveDate) {
        self.change(FieldValue::Scalar(Value::from(date.format("%Y-%m-%d").to_string())));
    }

    /// Report a picked instant, as an RFC 3339 string
    pub fn change_datetime(&self, instant: DateTime<Utc>) {
        self.change(FieldValue::Scalar(Value::from(
            instant.to_rfc3339_opts(SecondsFormat::Secs, true),
        )));
    }

    /// Open the reference picker; `false` for non-reference controls
    pub fn browse(&self) -> bool {
        match (&self.on_browse, self.disabled) {
            (Some(cb), false) => {
                cb(());
                true
            }
            _ => false,
        }
    }

    /// Remove a reference: the given target from a multi-valued field,
    /// or the whole value of a single-valued one
    pub fn delete(&self, target: Option<ObjectRef>) -> bool {
        match (&self.on_delete, self.disabled) {
            (Some(cb), false) => {
                cb(target);
                true
            }
            _ => false,
        }
    }
}

/// Choose and configure the control for `field`
pub fn select_control(field: &Feature, ctx: FieldContext) -> RenderableControl {
    let Some(field_type) = &field.field_type else {
        debug!("field {} has no resolvable type, rendering placeholder", field.name);
        return RenderableControl::placeholder(field);
    };

    let kind = match field_type {
        FieldType::Primitive(data_type) => match data_type {
            DataType::Int | DataType::Long => ControlKind::Number { integral: true },
            DataType::Double | DataType::Decimal => ControlKind::Number { integral: false },
            DataType::Boolean => ControlKind::Boolean,
            DataType::Date => ControlKind::Date,
            DataType::Timestamp => ControlKind::DateTime,
            DataType::String | DataType::Other(_) => ControlKind::Text,
        },
        FieldType::Enumerated { literals, .. } => ControlKind::Select {
            literals: literals.clone(),
        },
        FieldType::Class { name, .. } if field.upper_bound.is_many() => {
            ControlKind::MultiReference {
                type_name: name.clone(),
            }
        }
        FieldType::Class { name, .. } => ControlKind::SingleReference {
            type_name: name.clone(),
        },
    };

    let name = field.name.clone();
    let sink = ctx.sink.clone();
    let on_change: Callback<FieldValue> = Arc::new(move |value| {
        sink(FieldEvent::Changed {
            field: name.clone(),
            value,
        })
    });

    let (on_browse, on_delete) = match &kind {
        ControlKind::SingleReference { .. } => {
            let (browse_sink, delete_sink) = (ctx.sink.clone(), ctx.sink.clone());
            let feature = field.clone();
            let name = field.name.clone();
            let on_browse: Callback<()> = Arc::new(move |_| {
                browse_sink(FieldEvent::Browse {
                    field: feature.clone(),
                })
            });
            let on_delete: Callback<Option<ObjectRef>> = Arc::new(move |_| {
                delete_sink(FieldEvent::DeleteSingle { field: name.clone() })
            });
            (Some(on_browse), Some(on_delete))
        }
        ControlKind::MultiReference { .. } => {
            let (browse_sink, delete_sink) = (ctx.sink.clone(), ctx.sink.clone());
            let feature = field.clone();
            let name = field.name.clone();
            let on_browse: Callback<()> = Arc::new(move |_| {
                browse_sink(FieldEvent::Browse {
                    field: feature.clone(),
                })
            });
            let on_delete: Callback<Option<ObjectRef>> = Arc::new(move |target| {
                if let Some(target) = target {
                    delete_sink(FieldEvent::DeleteRef {
                        field: name.clone(),
                        target,
                    })
                }
            });
            (Some(on_browse), Some(on_delete))
        }
        _ => (None, None),
    };

    RenderableControl {
        id: field.name.clone(),
        kind,
        value: ctx.value,
        upper_bound: field.upper_bound,
        disabled: ctx.disabled,
        on_change: Some(on_change),
        on_browse,
        on_delete,
    }
}

/// A feature shown on a class form
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// The feature
    pub feature: Feature,

    /// Whether the class marks it read-only
    pub disabled: bool,
}

/// Features of `class` to show on its form, ancestors' first.
///
/// Features listed in the class's `invisible` annotation (own or
/// inherited) are left out; those in `disabled` are marked read-only.
pub fn form_fields(class: &dyn ClassDescriptor, annotation_source: &str) -> Vec<FormField> {
    let invisible = class_annotation(class, annotation_source, AnnotationKey::Invisible, true);
    let disabled = class_annotation(class, annotation_source, AnnotationKey::Disabled, true);
    let invisible = split_names(&invisible);
    let disabled = split_names(&disabled);

    class
        .all_super_types()
        .iter()
        .flat_map(|st| st.declared_features().iter())
        .chain(class.declared_features().iter())
        .filter(|f| !invisible.contains(&f.name.as_str()))
        .map(|f| FormField {
            feature: f.clone(),
            disabled: disabled.contains(&f.name.as_str()),
        })
        .collect()
}
