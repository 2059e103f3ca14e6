//! Class descriptors
//!
//! Read-only view of the schema behind a model object: operations,
//! features, super types and annotations. The engine only talks to
//! [`ClassDescriptor`], so any schema representation can be plugged in.
//! [`EClass`] is the in-memory implementation used by clients that load
//! the schema as JSON and by tests.

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Upper bound of a feature or parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum UpperBound {
    /// At most this many values
    Bounded(u32),

    /// Any number of values (`-1` on the wire)
    Unbounded,
}

impl UpperBound {
    /// Exactly one value may be held
    pub fn is_single(&self) -> bool {
        matches!(self, UpperBound::Bounded(1))
    }

    /// More than one value may be held
    pub fn is_many(&self) -> bool {
        match self {
            UpperBound::Unbounded => true,
            UpperBound::Bounded(n) => *n > 1,
        }
    }
}

impl Default for UpperBound {
    fn default() -> Self {
        UpperBound::Bounded(1)
    }
}

impl From<i32> for UpperBound {
    fn from(raw: i32) -> Self {
        if raw < 0 {
            UpperBound::Unbounded
        } else {
            UpperBound::Bounded(raw as u32)
        }
    }
}

impl From<UpperBound> for i32 {
    fn from(bound: UpperBound) -> Self {
        match bound {
            UpperBound::Unbounded => -1,
            UpperBound::Bounded(n) => n as i32,
        }
    }
}

/// Primitive data types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Text
    String,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// Floating point
    Double,
    /// Arbitrary precision decimal
    Decimal,
    /// Boolean
    Boolean,
    /// Calendar date
    Date,
    /// Date and time
    Timestamp,
    /// Any other data type, by name
    Other(String),
}

impl DataType {
    /// Map a schema data type name to a [`DataType`]
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "EString" | "String" | "Text" => DataType::String,
            "EInt" | "EInteger" | "EShort" | "Integer" => DataType::Int,
            "ELong" | "Long" => DataType::Long,
            "EDouble" | "EFloat" | "Double" => DataType::Double,
            "EBigDecimal" | "Decimal" => DataType::Decimal,
            "EBoolean" | "Boolean" => DataType::Boolean,
            "EDate" | "Date" => DataType::Date,
            "Timestamp" => DataType::Timestamp,
            other => DataType::Other(other.to_string()),
        }
    }
}

/// Type of a feature or parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// A primitive data type
    Primitive(DataType),

    /// An enumeration with its literals
    Enumerated {
        /// Enumeration name
        name: String,
        /// Literal names, in declaration order
        literals: Vec<String>,
    },

    /// A reference to another class
    Class {
        /// Class name
        name: String,
        /// Names of every declared subtype
        sub_types: Vec<String>,
    },
}

impl FieldType {
    /// Name of the type
    pub fn name(&self) -> String {
        match self {
            FieldType::Primitive(DataType::Other(name)) => name.clone(),
            FieldType::Primitive(data_type) => format!("{:?}", data_type),
            FieldType::Enumerated { name, .. } | FieldType::Class { name, .. } => name.clone(),
        }
    }
}

/// A structural feature or operation parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name
    pub name: String,

    /// Declared type, absent when the schema could not resolve it
    pub field_type: Option<FieldType>,

    /// Upper bound
    #[serde(default)]
    pub upper_bound: UpperBound,

    /// Whether values are contained by the owner
    #[serde(default)]
    pub containment: bool,
}

impl Feature {
    /// Create a single-valued feature
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Feature {
            name: name.to_string(),
            field_type: Some(field_type),
            upper_bound: UpperBound::default(),
            containment: false,
        }
    }

    /// Set the upper bound
    pub fn with_upper_bound(mut self, upper_bound: UpperBound) -> Self {
        self.upper_bound = upper_bound;
        self
    }
}

/// An operation declared on a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Operation name
    pub name: String,

    /// Parameters, in declaration order
    #[serde(default)]
    pub parameters: Vec<Feature>,
}

impl OperationDescriptor {
    /// Create an operation
    pub fn new(name: &str, parameters: Vec<Feature>) -> Self {
        OperationDescriptor {
            name: name.to_string(),
            parameters,
        }
    }

    /// Whether the operation needs parameters collected before dispatch
    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// A key/value detail of an annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDetail {
    /// Detail key
    pub key: String,
    /// Detail value
    pub value: String,
}

/// An annotation attached to a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation source
    pub source: String,

    /// Details, in declaration order
    #[serde(default)]
    pub details: Vec<AnnotationDetail>,
}

impl Annotation {
    /// Create an annotation with the given details
    pub fn new(source: &str, details: &[(&str, &str)]) -> Self {
        Annotation {
            source: source.to_string(),
            details: details
                .iter()
                .map(|(key, value)| AnnotationDetail {
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }
}

/// Read-only description of a model class
pub trait ClassDescriptor: Debug + Send + Sync {
    /// Class name
    fn name(&self) -> &str;

    /// Operations declared on this class, in declaration order
    fn operations(&self) -> &[OperationDescriptor];

    /// Features declared directly on this class
    fn declared_features(&self) -> &[Feature];

    /// Every ancestor class, farthest first
    fn all_super_types(&self) -> &[Arc<dyn ClassDescriptor>];

    /// Annotations declared on this class
    fn annotations(&self) -> &[Annotation];

    /// Find an operation by name
    fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations().iter().find(|op| op.name == name)
    }

    /// Find a feature by name, searching ancestors after this class
    fn feature(&self, name: &str) -> Option<Feature> {
        if let Some(feature) = self.declared_features().iter().find(|f| f.name == name) {
            return Some(feature.clone());
        }
        self.all_super_types()
            .iter()
            .find_map(|st| st.declared_features().iter().find(|f| f.name == name).cloned())
    }

    /// Whether this class is, or inherits from, the named class
    fn is_kind_of(&self, name: &str) -> bool {
        self.name() == name || self.all_super_types().iter().any(|st| st.name() == name)
    }
}

/// In-memory class descriptor
#[derive(Debug, Clone, Default)]
pub struct EClass {
    name: String,
    operations: Vec<OperationDescriptor>,
    features: Vec<Feature>,
    super_types: Vec<Arc<dyn ClassDescriptor>>,
    annotations: Vec<Annotation>,
}

impl EClass {
    /// Create an empty class
    pub fn new(name: &str) -> Self {
        EClass {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add an operation
    pub fn with_operation(mut self, operation: OperationDescriptor) -> Self {
        self.operations.push(operation);
        self
    }

    /// Add a feature
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Add a direct super type together with its own ancestors
    pub fn with_super_type(mut self, super_type: Arc<dyn ClassDescriptor>) -> Self {
        for ancestor in super_type.all_super_types() {
            if !self.super_types.iter().any(|st| st.name() == ancestor.name()) {
                self.super_types.push(ancestor.clone());
            }
        }
        if !self.super_types.iter().any(|st| st.name() == super_type.name()) {
            self.super_types.push(super_type);
        }
        self
    }

    /// Add an annotation
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Finish building
    pub fn build(self) -> Arc<dyn ClassDescriptor> {
        Arc::new(self)
    }
}

impl ClassDescriptor for EClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    fn declared_features(&self) -> &[Feature] {
        &self.features
    }

    fn all_super_types(&self) -> &[Arc<dyn ClassDescriptor>] {
        &self.super_types
    }

    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// A package of classes, as returned by the model client
#[derive(Debug, Clone)]
pub struct Package {
    /// Short package name
    pub name: String,

    /// Namespace URI
    pub ns_uri: String,

    /// Classes declared in the package
    pub classes: Vec<Arc<dyn ClassDescriptor>>,
}

impl Package {
    /// Whether the package is addressed by `namespace` (short name or URI)
    pub fn matches(&self, namespace: &str) -> bool {
        self.name == namespace || self.ns_uri == namespace
    }

    /// Find a class by name
    pub fn class(&self, name: &str) -> Option<Arc<dyn ClassDescriptor>> {
        self.classes.iter().find(|c| c.name() == name).cloned()
    }
}
