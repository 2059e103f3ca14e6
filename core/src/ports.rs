//! External collaborators
//!
//! The engine never talks HTTP or draws widgets itself. Everything it
//! needs from the outside world is expressed as one of these traits:
//! the model client that loads and saves resources, the per-user
//! profile store, and the embedder that shows notifications and owns
//! the current view context.

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::model::{ClassDescriptor, ObjectRef, Package, Resource};
use crate::profile::UserProfile;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Something completed
    Success,
    /// Needs attention
    Warning,
    /// Something failed
    Error,
}

/// Filter passed to [`ModelClient::find_by_kind`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindFilter {
    /// Only resources whose root has this name
    pub name: Option<String>,
}

impl KindFilter {
    /// Every resource of the class
    pub fn all() -> Self {
        Self::default()
    }

    /// Resources whose root has `name`
    pub fn named(name: &str) -> Self {
        KindFilter {
            name: Some(name.to_string()),
        }
    }
}

/// Client of the object-model server
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Every package known to the server
    async fn fetch_packages(&self) -> Result<Vec<Package>>;

    /// Find a class by namespace (package name or URI) and name
    async fn find_class(&self, namespace: &str, name: &str) -> Result<Arc<dyn ClassDescriptor>> {
        self.fetch_packages()
            .await?
            .iter()
            .filter(|p| p.matches(namespace))
            .find_map(|p| p.class(name))
            .ok_or_else(|| CoreError::Resolution(format!("class {}/{} not found", namespace, name)))
    }

    /// Every class of every package
    async fn fetch_all_classes(&self) -> Result<Vec<Arc<dyn ClassDescriptor>>> {
        Ok(self
            .fetch_packages()
            .await?
            .into_iter()
            .flat_map(|p| p.classes)
            .collect())
    }

    /// Resources whose root object is of `class`
    async fn find_by_kind(
        &self,
        class: &dyn ClassDescriptor,
        filter: &KindFilter,
    ) -> Result<Vec<Resource>>;

    /// Invoke `operation` on the object at `reference` with ordered arguments
    async fn call(&self, reference: &str, operation: &str, args: Vec<Value>) -> Result<Value>;

    /// Persist a resource, returning it as stored (new URI, revision and ids)
    async fn save_resource(&self, resource: Resource) -> Result<Resource>;
}

/// Per-user profile parameters
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Current profile snapshot
    fn user_profile(&self) -> UserProfile;

    /// Merge `params` into the entry for `object_id`; `None` clears it
    async fn change_user_profile(&self, object_id: &str, params: Option<Value>) -> Result<()>;
}

/// Partial update of the embedder's context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextUpdate {
    /// New current view object
    pub view_object: Option<ObjectRef>,
}

/// The application shell hosting the engine
pub trait Embedder: Send + Sync {
    /// Show a notification to the user
    fn notification(&self, title: &str, message: &str, severity: Severity);

    /// Merge `update` into the current context
    fn update_context(&self, update: ContextUpdate);
}

/// Current login session
pub trait Session: Send + Sync {
    /// Drop credentials so the user is asked to log in again
    fn clear(&self);
}

/// Process-wide sink for failed calls
pub trait ErrorChannel: Send + Sync {
    /// Report an error to the user
    fn report(&self, err: &CoreError);
}

/// Error channel that logs failures and ends the session on
/// authorization errors
#[derive(Clone, Default)]
pub struct SessionErrorChannel {
    session: Option<Arc<dyn Session>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl SessionErrorChannel {
    /// Create a channel that only logs
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear `session` on authorization failures
    pub fn with_session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Surface errors as notifications through `embedder`
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }
}

impl ErrorChannel for SessionErrorChannel {
    fn report(&self, err: &CoreError) {
        warn!("{}", err);
        if let Some(embedder) = &self.embedder {
            embedder.notification("Error", &err.to_string(), Severity::Error);
        }
        if err.is_unauthorized() {
            if let Some(session) = &self.session {
                session.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::testing::RecordingEmbedder;

    #[derive(Default)]
    struct CountingSession {
        cleared: AtomicUsize,
    }

    impl Session for CountingSession {
        fn clear(&self) {
            self.cleared.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_unauthorized_clears_session() {
        let session = Arc::new(CountingSession::default());
        let embedder = Arc::new(RecordingEmbedder::default());
        let channel = SessionErrorChannel::new()
            .with_session(session.clone())
            .with_embedder(embedder.clone());

        channel.report(&CoreError::Dispatch("boom".to_string()));
        assert_eq!(session.cleared.load(Ordering::SeqCst), 0);

        channel.report(&CoreError::Unauthorized("expired".to_string()));
        assert_eq!(session.cleared.load(Ordering::SeqCst), 1);
        let notes = embedder.notifications();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1], ("Error".to_string(), "Unauthorized: expired".to_string(), Severity::Error));
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Error).unwrap(), "\"error\"");
    }
}
