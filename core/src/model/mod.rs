//! Reflective object model
//!
//! This module provides the object graph the engine works on: model
//! objects with typed property slots, the resources that persist them,
//! and the resource set a view is loaded into. Objects are owned by
//! value; references between resources are [`ObjectRef`] URIs resolved
//! through a [`ResourceSet`].

mod class;
pub mod reflection;

pub use class::{
    Annotation, AnnotationDetail, ClassDescriptor, DataType, EClass, Feature, FieldType,
    OperationDescriptor, Package, UpperBound,
};

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `{ref, class}` pointer to an object in some resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object URI, `<resource uri>#<object id>`
    #[serde(rename = "$ref")]
    pub uri: String,

    /// Class name of the target
    #[serde(rename = "eClass")]
    pub class: String,
}

impl ObjectRef {
    /// Create a reference
    pub fn new(uri: &str, class: &str) -> Self {
        ObjectRef {
            uri: uri.to_string(),
            class: class.to_string(),
        }
    }

    /// Resource URI part
    pub fn resource_uri(&self) -> &str {
        self.uri.split('#').next().unwrap_or_default()
    }

    /// Object id part, if any
    pub fn fragment(&self) -> Option<&str> {
        self.uri.split_once('#').map(|(_, fragment)| fragment)
    }
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ({})", self.uri, self.class)
    }
}

/// Value held by a property slot
#[derive(Debug, Clone)]
pub enum Slot {
    /// Attribute value
    Value(Value),

    /// Single non-containment reference
    Ref(ObjectRef),

    /// Multi-valued non-containment reference
    Refs(Vec<ObjectRef>),

    /// Single contained object
    Child(Box<ModelObject>),

    /// Contained objects
    Children(Vec<ModelObject>),
}

/// A node of the reflective object graph
#[derive(Debug, Clone)]
pub struct ModelObject {
    id: Option<String>,
    class: Arc<dyn ClassDescriptor>,
    slots: BTreeMap<String, Slot>,
}

impl ModelObject {
    /// Create an object without identity
    pub fn new(class: Arc<dyn ClassDescriptor>) -> Self {
        ModelObject {
            id: None,
            class,
            slots: BTreeMap::new(),
        }
    }

    /// Set the identity
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Set a slot while building
    pub fn with(mut self, name: &str, slot: Slot) -> Self {
        self.set(name, slot);
        self
    }

    /// Set an attribute while building
    pub fn with_attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Identity, `None` once cleared for cloning
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Replace the identity
    pub fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    /// Class descriptor
    pub fn class(&self) -> &Arc<dyn ClassDescriptor> {
        &self.class
    }

    /// Class name
    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Read a slot
    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    /// Write a slot
    pub fn set(&mut self, name: &str, slot: Slot) {
        self.slots.insert(name.to_string(), slot);
    }

    /// Remove a slot
    pub fn unset(&mut self, name: &str) -> Option<Slot> {
        self.slots.remove(name)
    }

    /// Read an attribute
    pub fn attr(&self, name: &str) -> Option<&Value> {
        match self.slots.get(name) {
            Some(Slot::Value(value)) if !value.is_null() => Some(value),
            _ => None,
        }
    }

    /// Read a string attribute
    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(Value::as_str)
    }

    /// Write an attribute
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>) {
        self.set(name, Slot::Value(value.into()));
    }

    /// The `name` attribute
    pub fn name(&self) -> Option<&str> {
        self.str_attr("name")
    }

    /// Read a single reference
    pub fn reference(&self, name: &str) -> Option<&ObjectRef> {
        match self.slots.get(name) {
            Some(Slot::Ref(r)) => Some(r),
            _ => None,
        }
    }

    /// Read a multi-valued reference
    pub fn references(&self, name: &str) -> &[ObjectRef] {
        match self.slots.get(name) {
            Some(Slot::Refs(refs)) => refs.as_slice(),
            _ => &[],
        }
    }

    /// Read a single contained object
    pub fn child(&self, name: &str) -> Option<&ModelObject> {
        match self.slots.get(name) {
            Some(Slot::Child(child)) => Some(&**child),
            _ => None,
        }
    }

    /// Mutable access to a single contained object
    pub fn child_mut(&mut self, name: &str) -> Option<&mut ModelObject> {
        match self.slots.get_mut(name) {
            Some(Slot::Child(child)) => Some(&mut **child),
            _ => None,
        }
    }

    /// Read a contained collection
    pub fn children(&self, name: &str) -> &[ModelObject] {
        match self.slots.get(name) {
            Some(Slot::Children(children)) => children.as_slice(),
            _ => &[],
        }
    }

    /// Directly contained objects with the feature holding them
    pub fn contents(&self) -> Vec<(&str, &ModelObject)> {
        let mut out = Vec::new();
        for (feature, slot) in &self.slots {
            match slot {
                Slot::Child(child) => out.push((feature.as_str(), &**child)),
                Slot::Children(children) => {
                    out.extend(children.iter().map(|c| (feature.as_str(), c)))
                }
                _ => {}
            }
        }
        out
    }

    pub(crate) fn contents_mut(&mut self) -> impl Iterator<Item = &mut ModelObject> {
        self.slots.values_mut().flat_map(|slot| match slot {
            Slot::Child(child) => std::slice::from_mut(&mut **child).iter_mut(),
            Slot::Children(children) => children.iter_mut(),
            _ => std::slice::IterMut::default(),
        })
    }

    /// This object followed by its whole containment tree, pre-order
    pub fn pre_order(&self) -> Vec<&ModelObject> {
        let mut out = vec![self];
        for (_, child) in self.contents() {
            out.extend(child.pre_order());
        }
        out
    }

    /// Null the identity of this object and everything it contains
    pub fn clear_identities(&mut self) {
        self.id = None;
        for child in self.contents_mut() {
            child.clear_identities();
        }
    }

    /// Find an object by id in this containment tree
    pub fn find(&self, id: &str) -> Option<&ModelObject> {
        self.pre_order().into_iter().find(|o| o.id() == Some(id))
    }

    /// Find an object by id in this containment tree, mutably
    pub fn find_mut(&mut self, id: &str) -> Option<&mut ModelObject> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        for child in self.contents_mut() {
            if let Some(found) = child.find_mut(id) {
                return Some(found);
            }
        }
        None
    }
}

/// A persisted unit holding root objects
#[derive(Debug, Clone)]
pub struct Resource {
    uri: Option<String>,
    rev: u64,
    contents: Vec<ModelObject>,
}

impl Resource {
    /// Create a resource with a single root
    pub fn new(uri: Option<&str>, rev: u64, root: ModelObject) -> Self {
        Resource {
            uri: uri.map(str::to_string),
            rev,
            contents: vec![root],
        }
    }

    /// Location, `None` until the backend allocates one
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Replace the location
    pub fn set_uri(&mut self, uri: Option<String>) {
        self.uri = uri;
    }

    /// Current revision
    pub fn rev(&self) -> u64 {
        self.rev
    }

    /// Root objects
    pub fn contents(&self) -> &[ModelObject] {
        &self.contents
    }

    /// First root object
    pub fn root(&self) -> Option<&ModelObject> {
        self.contents.first()
    }

    /// First root object, mutably
    pub fn root_mut(&mut self) -> Option<&mut ModelObject> {
        self.contents.first_mut()
    }

    /// Find an object by id anywhere in the resource
    pub fn find(&self, id: &str) -> Option<&ModelObject> {
        self.contents.iter().find_map(|root| root.find(id))
    }

    /// Find an object by id anywhere in the resource, mutably
    pub fn find_mut(&mut self, id: &str) -> Option<&mut ModelObject> {
        self.contents.iter_mut().find_map(|root| root.find_mut(id))
    }

    /// Reference to an object of this resource
    pub fn ref_to(&self, object: &ModelObject) -> Option<ObjectRef> {
        let uri = self.uri.as_deref()?;
        let id = object.id()?;
        Some(ObjectRef::new(&format!("{}#{}", uri, id), object.class_name()))
    }
}

/// An object of a resource set together with where it sits
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    /// URI of the owning resource
    pub resource_uri: Option<&'a str>,

    /// Feature of the container holding the object, `None` for roots
    pub containing_feature: Option<&'a str>,

    /// Container, `None` for roots
    pub container: Option<&'a ModelObject>,

    /// The object itself
    pub object: &'a ModelObject,
}

impl<'a> Element<'a> {
    /// Structural position of this element
    pub fn position(&self) -> Option<ObjectPosition> {
        Some(ObjectPosition {
            containing_feature: self.containing_feature?.to_string(),
            container_name: self.container.and_then(|c| c.name()).map(str::to_string),
        })
    }
}

/// Structural position of an object: which feature of which named
/// container holds it. Stable across saves, unlike object identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPosition {
    /// Containing feature name
    pub containing_feature: String,

    /// Name of the container
    pub container_name: Option<String>,
}

/// The set of resources loaded for a view
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    resources: Vec<Resource>,
}

impl ResourceSet {
    /// Create a resource set
    pub fn new(resources: Vec<Resource>) -> Self {
        ResourceSet { resources }
    }

    /// Loaded resources
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Find a resource by URI
    pub fn resource(&self, uri: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.uri() == Some(uri))
    }

    /// Replace the resource with the same URI, or append it
    pub fn upsert(&mut self, resource: Resource) {
        let existing = resource
            .uri()
            .and_then(|uri| self.resources.iter().position(|r| r.uri() == Some(uri)));
        match existing {
            Some(pos) => self.resources[pos] = resource,
            None => self.resources.push(resource),
        }
    }

    /// Resolve a reference to the object it points at
    pub fn resolve(&self, target: &ObjectRef) -> Option<&ModelObject> {
        let resource = self.resource(target.resource_uri())?;
        match target.fragment() {
            Some(id) if !id.is_empty() => resource.find(id),
            _ => resource.root(),
        }
    }

    /// Resolve a reference mutably
    pub fn resolve_mut(&mut self, target: &ObjectRef) -> Option<&mut ModelObject> {
        let resource = self
            .resources
            .iter_mut()
            .find(|r| r.uri() == Some(target.resource_uri()))?;
        match target.fragment() {
            Some(id) if !id.is_empty() => resource.find_mut(id),
            _ => resource.root_mut(),
        }
    }

    /// Every object of every resource, pre-order, with its position
    pub fn elements(&self) -> Vec<Element<'_>> {
        fn walk<'a>(
            resource_uri: Option<&'a str>,
            feature: Option<&'a str>,
            container: Option<&'a ModelObject>,
            object: &'a ModelObject,
            out: &mut Vec<Element<'a>>,
        ) {
            out.push(Element {
                resource_uri,
                containing_feature: feature,
                container,
                object,
            });
            for (child_feature, child) in object.contents() {
                walk(resource_uri, Some(child_feature), Some(object), child, out);
            }
        }

        let mut out = Vec::new();
        for resource in &self.resources {
            for root in resource.contents() {
                walk(resource.uri(), None, None, root, &mut out);
            }
        }
        out
    }

    /// First object occupying `position`
    pub fn find_at(&self, position: &ObjectPosition) -> Option<Element<'_>> {
        self.elements()
            .into_iter()
            .find(|e| e.position().as_ref() == Some(position))
    }
}
