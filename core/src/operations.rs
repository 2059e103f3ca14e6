//! Operation invocation
//!
//! An [`OperationInvoker`] is bound to one model object loaded from a
//! resource. It lists the operations declared by the object's class,
//! collects parameter values when an operation declares any, and
//! dispatches the call through the [`ModelClient`]. Reference-typed
//! parameters are filled through a browse/confirm workflow over the
//! resources of the current [`ResourceSet`].
//!
//! Failed calls are never retried: they go to the [`ErrorChannel`] and
//! the invoker drops back to idle with its parameters discarded.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::ModelConfig;
use crate::error::{CoreError, Result};
use crate::forms::{select_control, EventSink, FieldContext, FieldEvent, FieldValue, RenderableControl};
use crate::model::{ClassDescriptor, Feature, FieldType, ModelObject, ObjectRef, OperationDescriptor, Resource, ResourceSet};
use crate::ports::{ErrorChannel, ModelClient};

/// Operations declared by the class of `object`, in declaration order
pub fn list_operations(object: &ModelObject) -> &[OperationDescriptor] {
    object.class().operations()
}

/// The object operations are invoked on
#[derive(Debug, Clone)]
pub struct InvocationTarget {
    uri: String,
    rev: u64,
    class: Arc<dyn ClassDescriptor>,
}

impl InvocationTarget {
    /// Target the root object of a stored resource
    pub fn from_resource(resource: &Resource) -> Result<Self> {
        let uri = resource
            .uri()
            .ok_or_else(|| CoreError::InvalidState("resource has not been saved yet".to_string()))?;
        let root = resource
            .root()
            .ok_or_else(|| CoreError::InvalidState(format!("resource {} is empty", uri)))?;
        Ok(InvocationTarget {
            uri: uri.to_string(),
            rev: resource.rev(),
            class: root.class().clone(),
        })
    }

    /// Call reference: resource location pinned to its revision
    pub fn call_reference(&self) -> String {
        format!("{}?rev={}", self.uri, self.rev)
    }
}

/// Where the invoker is in its workflow
#[derive(Debug, Clone, PartialEq)]
pub enum InvokerState {
    /// Nothing in progress
    Idle,

    /// Waiting for parameter values of an operation
    CollectingParams(OperationDescriptor),
}

/// Result of selecting or dispatching an operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Parameters must be collected before the call
    Collecting,

    /// The call returned this value
    Completed(Value),

    /// The call failed and was reported
    Failed,
}

/// Reference parameter currently being browsed for
#[derive(Debug, Clone)]
struct PendingReference {
    field: Feature,
    types: Vec<String>,
}

/// Drives operation calls on one object
pub struct OperationInvoker<C: ModelClient> {
    client: Arc<C>,
    errors: Arc<dyn ErrorChannel>,
    config: ModelConfig,
    target: InvocationTarget,
    state: InvokerState,
    params: BTreeMap<String, FieldValue>,
    pending: Option<PendingReference>,
}

impl<C: ModelClient> OperationInvoker<C> {
    /// Create an idle invoker for `target`
    pub fn new(
        client: Arc<C>,
        errors: Arc<dyn ErrorChannel>,
        config: ModelConfig,
        target: InvocationTarget,
    ) -> Self {
        OperationInvoker {
            client,
            errors,
            config,
            target,
            state: InvokerState::Idle,
            params: BTreeMap::new(),
            pending: None,
        }
    }

    /// Current state
    pub fn state(&self) -> &InvokerState {
        &self.state
    }

    /// Parameter values collected so far
    pub fn params(&self) -> &BTreeMap<String, FieldValue> {
        &self.params
    }

    /// Operations of the target's class
    pub fn operations(&self) -> &[OperationDescriptor] {
        self.target.class.operations()
    }

    /// Pick an operation: collect its parameters, or call it right away
    /// when it declares none
    pub async fn select_operation(&mut self, name: &str) -> Result<Outcome> {
        if self.state != InvokerState::Idle {
            return Err(CoreError::InvalidState(format!(
                "cannot select {} while another operation is pending",
                name
            )));
        }
        let operation = self.find_operation(name)?;
        if operation.has_parameters() {
            debug!("collecting {} parameter(s) for {}", operation.parameters.len(), name);
            self.params.clear();
            self.state = InvokerState::CollectingParams(operation);
            return Ok(Outcome::Collecting);
        }
        self.dispatch(name, BTreeMap::new()).await
    }

    /// Controls for the parameters being collected, wired to `sink`
    pub fn parameter_controls(&self, sink: EventSink) -> Vec<RenderableControl> {
        match &self.state {
            InvokerState::CollectingParams(operation) => operation
                .parameters
                .iter()
                .map(|p| {
                    let value = self.params.get(&p.name).cloned();
                    select_control(p, FieldContext::new(value, sink.clone()))
                })
                .collect(),
            InvokerState::Idle => Vec::new(),
        }
    }

    /// Apply an event raised by a parameter control.
    ///
    /// Returns the candidate types when the event opens a reference
    /// browse, `None` otherwise.
    pub fn handle_event(&mut self, event: FieldEvent) -> Option<Vec<String>> {
        match event {
            FieldEvent::Changed { field, value } => {
                self.params.insert(field, value);
                None
            }
            FieldEvent::Browse { field } => Some(self.browse_reference_targets(&field)),
            FieldEvent::DeleteRef { field, target } => {
                self.remove_from_multi_value(&target, &field);
                None
            }
            FieldEvent::DeleteSingle { field } => {
                self.remove_single_value(&field);
                None
            }
        }
    }

    /// Call the pending operation with the collected parameters
    pub async fn confirm_params(&mut self) -> Result<Outcome> {
        let name = match &self.state {
            InvokerState::CollectingParams(operation) => operation.name.clone(),
            InvokerState::Idle => {
                return Err(CoreError::InvalidState("no operation is collecting parameters".to_string()))
            }
        };
        let values = std::mem::take(&mut self.params);
        self.dispatch(&name, values).await
    }

    /// Abandon parameter collection
    pub fn cancel(&mut self) {
        self.reset();
    }

    /// Invoke `operation` on the target.
    ///
    /// Arguments are passed in the operation's declared parameter
    /// order; a parameter without a value is passed as `null`.
    pub async fn dispatch(&mut self, operation: &str, values: BTreeMap<String, FieldValue>) -> Result<Outcome> {
        let descriptor = self.find_operation(operation)?;
        let args: Vec<Value> = descriptor
            .parameters
            .iter()
            .map(|p| values.get(&p.name).map(FieldValue::to_json).unwrap_or(Value::Null))
            .collect();
        let reference = self.target.call_reference();

        info!("calling {} on {}", operation, reference);
        let outcome = match self.client.call(&reference, operation, args).await {
            Ok(result) => Outcome::Completed(result),
            Err(err) => {
                warn!("call {} on {} failed: {}", operation, reference, err);
                self.errors.report(&err);
                Outcome::Failed
            }
        };
        self.reset();
        Ok(outcome)
    }

    /// Start picking targets for a reference parameter; returns the
    /// admissible class names (declared type, then its subtypes)
    pub fn browse_reference_targets(&mut self, field: &Feature) -> Vec<String> {
        let types = match &field.field_type {
            Some(FieldType::Class { name, sub_types }) => {
                let mut types = vec![name.clone()];
                types.extend(sub_types.iter().cloned());
                types
            }
            _ => {
                debug!("{} is not a reference, nothing to browse", field.name);
                self.pending = None;
                return Vec::new();
            }
        };
        self.pending = Some(PendingReference {
            field: field.clone(),
            types: types.clone(),
        });
        types
    }

    /// Resources of `set` whose root is one of the browsed types
    pub fn candidates<'a>(&self, set: &'a ResourceSet) -> Vec<&'a Resource> {
        let Some(pending) = &self.pending else {
            return Vec::new();
        };
        let wildcard = pending.types.first().map(String::as_str) == Some(self.config.wildcard_type.as_str());
        set.resources()
            .iter()
            .filter(|r| match r.root() {
                Some(root) => wildcard || pending.types.iter().any(|t| t == root.class_name()),
                None => false,
            })
            .collect()
    }

    /// Store the picked resources as the browsed parameter's value.
    ///
    /// Picks that are not [`candidates`](Self::candidates) of the browse
    /// are ignored.
    /// A many-valued parameter receives every picked resource, in
    /// resource-set order. A single-valued one keeps only the first
    /// pick, in input order; further picks are dropped.
    pub fn confirm_reference_selection(&mut self, set: &ResourceSet, selected: &[&str]) -> Option<FieldValue> {
        let candidates = self.candidates(set);
        let pending = self.pending.take()?;
        let picked: Vec<&Resource> = candidates
            .into_iter()
            .filter(|r| r.uri().map_or(false, |uri| selected.contains(&uri)))
            .collect();
        if picked.is_empty() {
            return None;
        }

        let value = if pending.field.upper_bound.is_many() {
            FieldValue::Refs(picked.iter().filter_map(|r| root_ref(r)).collect())
        } else {
            if selected.len() > 1 {
                debug!(
                    "{} holds a single reference, keeping the first of {} picks",
                    pending.field.name,
                    selected.len()
                );
            }
            let first = selected
                .iter()
                .find_map(|uri| picked.iter().find(|r| r.uri() == Some(*uri)))
                .and_then(|r| root_ref(r))?;
            FieldValue::Ref(first)
        };
        self.params.insert(pending.field.name.clone(), value.clone());
        Some(value)
    }

    /// Drop `target` from the many-valued parameter `field`
    pub fn remove_from_multi_value(&mut self, target: &ObjectRef, field: &str) {
        if let Some(FieldValue::Refs(refs)) = self.params.get_mut(field) {
            refs.retain(|r| r.uri != target.uri);
        }
    }

    /// Drop the value of the single-valued parameter `field`
    pub fn remove_single_value(&mut self, field: &str) {
        self.params.remove(field);
    }

    fn find_operation(&self, name: &str) -> Result<OperationDescriptor> {
        self.target
            .class
            .operation(name)
            .cloned()
            .ok_or_else(|| CoreError::Resolution(format!("{} has no operation {}", self.target.class.name(), name)))
    }

    fn reset(&mut self) {
        self.state = InvokerState::Idle;
        self.params.clear();
        self.pending = None;
    }
}

fn root_ref(resource: &Resource) -> Option<ObjectRef> {
    let root = resource.root()?;
    resource
        .ref_to(root)
        .or_else(|| resource.uri().map(|uri| ObjectRef::new(uri, root.class_name())))
}
