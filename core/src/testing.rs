//! In-memory fakes of the external ports, for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{CoreError, Result};
use crate::model::{ClassDescriptor, EClass, ModelObject, Package, Resource};
use crate::params::ParamKind;
use crate::ports::{ContextUpdate, Embedder, ErrorChannel, KindFilter, ModelClient, ProfileStore, Severity};
use crate::profile::{merge_entry_value, ProfileEntry, UserProfile};

type CallLog = Vec<(String, String, Vec<Value>)>;

/// Model client backed by a list of resources
#[derive(Default)]
pub struct FakeModelClient {
    packages: Vec<Package>,
    resources: Mutex<Vec<Resource>>,
    calls: Mutex<CallLog>,
    saved: Mutex<Vec<Resource>>,
    last_saved_uri: Mutex<Option<String>>,
    find_by_kind_calls: AtomicUsize,
    next_id: AtomicUsize,
    call_failure: Option<Box<dyn Fn() -> CoreError + Send + Sync>>,
    save_failure: Option<Box<dyn Fn() -> CoreError + Send + Sync>>,
}

impl FakeModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the dataset package and the user class
    pub fn with_dataset_classes(mut self) -> Self {
        let mut classes: Vec<Arc<dyn ClassDescriptor>> = ParamKind::ALL
            .iter()
            .map(|kind| EClass::new(kind.class_name()).build())
            .collect();
        classes.push(EClass::new("DatasetComponent").build());
        self.packages.push(Package {
            name: "dataset".to_string(),
            ns_uri: "ru.neoflex.nfcore.dataset".to_string(),
            classes,
        });
        self.packages.push(Package {
            name: "auth".to_string(),
            ns_uri: "ru.neoflex.nfcore.base.auth".to_string(),
            classes: vec![EClass::new("User").build()],
        });
        self
    }

    pub fn with_resources(self, resources: Vec<Resource>) -> Self {
        *self.resources.lock().unwrap() = resources;
        self
    }

    /// Make every `call` fail with the given error
    pub fn failing_calls(mut self, err: impl Fn() -> CoreError + Send + Sync + 'static) -> Self {
        self.call_failure = Some(Box::new(err));
        self
    }

    /// Make every `save_resource` fail with the given error
    pub fn failing_saves(mut self, err: impl Fn() -> CoreError + Send + Sync + 'static) -> Self {
        self.save_failure = Some(Box::new(err));
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.lock().unwrap().clone()
    }

    /// Resources as they were handed to `save_resource`
    pub fn saved(&self) -> Vec<Resource> {
        self.saved.lock().unwrap().clone()
    }

    pub fn last_saved_uri(&self) -> Option<String> {
        self.last_saved_uri.lock().unwrap().clone()
    }

    pub fn find_by_kind_calls(&self) -> usize {
        self.find_by_kind_calls.load(Ordering::SeqCst)
    }

    fn assign_ids(&self, object: &mut ModelObject) {
        if object.id().is_none() {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            object.set_id(Some(format!("gen{}", n)));
        }
        for child in object.contents_mut() {
            self.assign_ids(child);
        }
    }
}

#[async_trait]
impl ModelClient for FakeModelClient {
    async fn fetch_packages(&self) -> Result<Vec<Package>> {
        Ok(self.packages.clone())
    }

    async fn find_by_kind(&self, class: &dyn ClassDescriptor, filter: &KindFilter) -> Result<Vec<Resource>> {
        self.find_by_kind_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .resources
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.root().map_or(false, |root| {
                    root.class().is_kind_of(class.name())
                        && filter.name.as_deref().map_or(true, |name| root.name() == Some(name))
                })
            })
            .cloned()
            .collect())
    }

    async fn call(&self, reference: &str, operation: &str, args: Vec<Value>) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((reference.to_string(), operation.to_string(), args));
        match &self.call_failure {
            Some(err) => Err(err()),
            None => Ok(json!({"status": "ok"})),
        }
    }

    async fn save_resource(&self, resource: Resource) -> Result<Resource> {
        self.saved.lock().unwrap().push(resource.clone());
        if let Some(err) = &self.save_failure {
            return Err(err());
        }
        let mut stored = resource;
        if stored.uri().is_none() {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            stored.set_uri(Some(format!("/res/new{}", n)));
        }
        if let Some(root) = stored.root_mut() {
            self.assign_ids(root);
        }
        let stored = Resource::new(
            stored.uri(),
            stored.rev() + 1,
            stored.root().cloned().ok_or_else(|| CoreError::InvalidState("empty resource".to_string()))?,
        );
        *self.last_saved_uri.lock().unwrap() = stored.uri().map(str::to_string);
        self.resources.lock().unwrap().push(stored.clone());
        Ok(stored)
    }
}

/// Profile store keeping entries in memory
pub struct FakeProfileStore {
    user_name: String,
    entries: Mutex<Vec<ProfileEntry>>,
}

impl FakeProfileStore {
    pub fn new(user_name: &str) -> Self {
        FakeProfileStore {
            user_name: user_name.to_string(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Store `value` under `key`, replacing any entry
    pub fn put(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.key != key);
        entries.push(ProfileEntry {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    fn user_profile(&self) -> UserProfile {
        UserProfile {
            user_name: self.user_name.clone(),
            params: self.entries.lock().unwrap().clone(),
        }
    }

    async fn change_user_profile(&self, object_id: &str, params: Option<Value>) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let existing = entries.iter().position(|e| e.key == object_id);
        let merged = merge_entry_value(existing.map(|i| entries[i].value.as_str()), params)?;
        match (existing, merged) {
            (Some(i), Some(value)) => entries[i].value = value,
            (Some(i), None) => {
                entries.remove(i);
            }
            (None, Some(value)) => entries.push(ProfileEntry {
                key: object_id.to_string(),
                value,
            }),
            (None, None) => {}
        }
        Ok(())
    }
}

/// Embedder that records what it is told
#[derive(Default)]
pub struct RecordingEmbedder {
    notifications: Mutex<Vec<(String, String, Severity)>>,
    contexts: Mutex<Vec<ContextUpdate>>,
}

impl RecordingEmbedder {
    pub fn notifications(&self) -> Vec<(String, String, Severity)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn contexts(&self) -> Vec<ContextUpdate> {
        self.contexts.lock().unwrap().clone()
    }
}

impl Embedder for RecordingEmbedder {
    fn notification(&self, title: &str, message: &str, severity: Severity) {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string(), severity));
    }

    fn update_context(&self, update: ContextUpdate) {
        self.contexts.lock().unwrap().push(update);
    }
}

/// Error channel that keeps the messages it receives
#[derive(Default)]
pub struct RecordingErrors {
    reported: Mutex<Vec<String>>,
}

impl RecordingErrors {
    pub fn reported(&self) -> Vec<String> {
        self.reported.lock().unwrap().clone()
    }
}

impl ErrorChannel for RecordingErrors {
    fn report(&self, err: &CoreError) {
        self.reported.lock().unwrap().push(err.to_string());
    }
}
