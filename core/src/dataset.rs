//! Dataset component persistence
//!
//! A dataset view is linked to one dataset component, but a user may be
//! working on another variant of it (for example one they cloned
//! earlier). The variant in use is named by the user's profile entry for
//! the dataset view. [`DatasetPersister`] resolves that variant, folds
//! the parameter lists the editors left in the profile back into the
//! component, and saves it either in place or as a new clone.
//!
//! Resolution misses (unknown variant name, unknown column) never fail
//! a save. They are logged and skipped.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

use crate::config::ModelConfig;
use crate::error::{CoreError, Result};
use crate::model::{ClassDescriptor, ModelObject, ObjectPosition, ObjectRef, Resource, ResourceSet, Slot};
use crate::params::{ParamKind, QueryParam};
use crate::ports::{ContextUpdate, Embedder, KindFilter, ModelClient, ProfileStore};
use crate::profile::{DatasetProfile, UserProfile, ViewSettings};
use crate::utils::measure_time;

const DATASET_VIEW: &str = "datasetView";
const DATASET_COMPONENT: &str = "datasetComponent";
const DATASET: &str = "dataset";
const DATASET_COLUMN: &str = "datasetColumn";
const AUDIT: &str = "audit";
const AUDIT_FIELDS: [&str; 4] = ["created", "createdBy", "modified", "modifiedBy"];

/// Visibility of a saved component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    /// Visible to every user
    Public,
    /// Visible to its owner only
    Private,
}

impl Access {
    /// Literal stored on the component
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "Public",
            Access::Private => "Private",
        }
    }
}

/// How a component is saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveMode {
    /// Overwrite the active component, keeping its audit data
    Update,

    /// Store a copy under a new name, owned by the current user
    Clone {
        /// Name of the new component
        new_name: String,
    },
}

/// Options chosen in the save dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Update or clone
    pub mode: SaveMode,

    /// Visibility of the result
    pub access: Access,
}

/// Saves dataset components built from profile parameters
pub struct DatasetPersister<C: ModelClient, P: ProfileStore> {
    client: Arc<C>,
    profiles: Arc<P>,
    embedder: Arc<dyn Embedder>,
    config: ModelConfig,
    components: RwLock<Option<Vec<Resource>>>,
}

impl<C: ModelClient, P: ProfileStore> DatasetPersister<C, P> {
    /// Create a persister
    pub fn new(client: Arc<C>, profiles: Arc<P>, embedder: Arc<dyn Embedder>, config: ModelConfig) -> Self {
        DatasetPersister {
            client,
            profiles,
            embedder,
            config,
            components: RwLock::new(None),
        }
    }

    /// Every stored dataset component, fetched once and cached
    pub async fn components(&self) -> Result<Vec<Resource>> {
        if let Some(cached) = self.components.read().await.as_ref() {
            return Ok(cached.clone());
        }
        let class = self
            .client
            .find_class(&self.config.dataset_namespace, &self.config.component_class)
            .await?;
        let fetched = self.client.find_by_kind(class.as_ref(), &KindFilter::all()).await?;
        debug!("fetched {} dataset components", fetched.len());
        *self.components.write().await = Some(fetched.clone());
        Ok(fetched)
    }

    /// Forget the cached component list
    pub async fn invalidate_components(&self) {
        *self.components.write().await = None;
    }

    /// The component variant `view` currently works with.
    ///
    /// The profile entry of the view's dataset view may name a variant
    /// other than the linked one; it is then looked up among all stored
    /// components. Otherwise, or when the named variant no longer
    /// exists, the linked component is used. The returned resource is a
    /// copy and may be changed freely.
    pub async fn resolve_active_component(
        &self,
        set: &ResourceSet,
        view: &ModelObject,
        profile: &UserProfile,
    ) -> Result<Resource> {
        let dataset_view = resolve_ref(set, view, DATASET_VIEW)?;
        let linked_ref = dataset_view
            .reference(DATASET_COMPONENT)
            .ok_or_else(|| CoreError::Resolution("dataset view has no component".to_string()))?;
        let linked = set
            .resource(linked_ref.resource_uri())
            .ok_or_else(|| CoreError::Resolution(format!("component {} is not loaded", linked_ref)))?;
        let linked_name = linked.root().and_then(ModelObject::name);

        let wanted = match dataset_view.id() {
            Some(id) => profile.decode::<DatasetProfile>(id)?.and_then(|p| p.name),
            None => None,
        };
        if let Some(name) = wanted.filter(|name| Some(name.as_str()) != linked_name) {
            let found = self
                .components()
                .await?
                .into_iter()
                .find(|r| r.root().and_then(ModelObject::name) == Some(name.as_str()));
            match found {
                Some(resource) => return Ok(resource),
                None => warn!("dataset component {} not found, using the linked one", name),
            }
        }
        Ok(linked.clone())
    }

    /// Replace the `kind` collection of `component` with the rows stored
    /// in `entry`.
    ///
    /// Rows without an operation are drafts and are skipped. Columns are
    /// matched by name against the columns of the component's dataset;
    /// a row whose column is not found is dropped. An entry that never
    /// stored this kind leaves the collection as it is. Returns the
    /// number of parameters added.
    pub fn merge_parameters_into_component(
        &self,
        component: &mut ModelObject,
        set: &ResourceSet,
        entry: &DatasetProfile,
        kind: ParamKind,
        class: &Arc<dyn ClassDescriptor>,
    ) -> usize {
        let Some(rows) = entry.rows(kind) else {
            return 0;
        };

        let dataset = component.reference(DATASET).cloned();
        let dataset_resource = dataset.as_ref().and_then(|r| set.resource(r.resource_uri()));
        let columns: &[ModelObject] = match (&dataset, dataset_resource) {
            (Some(r), Some(_)) => set.resolve(r).map(|d| d.children(DATASET_COLUMN)).unwrap_or_default(),
            _ => {
                warn!("dataset of component {:?} is not loaded", component.name());
                &[]
            }
        };

        let mut params = Vec::new();
        for row in rows {
            let Some(param) = QueryParam::from_row(kind, row) else {
                continue;
            };
            let column = columns
                .iter()
                .find(|c| c.name() == Some(param.column()))
                .and_then(|c| dataset_resource.and_then(|r| r.ref_to(c)));
            let Some(column) = column else {
                debug!("dropping {} row {}: no column {}", kind, param.index(), param.column());
                continue;
            };
            let mut object = ModelObject::new(class.clone()).with(DATASET_COLUMN, Slot::Ref(column));
            for (name, value) in param.attributes() {
                object.set_attr(name, value);
            }
            params.push(object);
        }

        let added = params.len();
        component.set(kind.component_feature(), Slot::Children(params));
        added
    }

    /// Save the component `view` works with.
    ///
    /// The view's display settings go to the profile first. The active
    /// component then receives the access flag and the parameter lists
    /// held in its profile entry, which is cleared once the save
    /// succeeds. A failed save leaves the profile entries as they were
    /// (only the view settings are already written). A clone
    /// loses every identity, its location and its audit data, gets the
    /// new name and the current user as owner, and becomes the variant
    /// the dataset view resolves to. After saving, the dataset view is
    /// linked to the saved component and the embedder is pointed at the
    /// object now holding the view's position.
    pub async fn save_or_clone(&self, set: &mut ResourceSet, view: &ObjectRef, options: &SaveOptions) -> Result<Resource> {
        let (view_object, position) = {
            let element = set
                .elements()
                .into_iter()
                .find(|e| e.resource_uri == Some(view.resource_uri()) && e.object.id() == view.fragment())
                .ok_or_else(|| CoreError::Resolution(format!("view {} is not loaded", view)))?;
            (element.object.clone(), element.position())
        };

        if let Some(view_id) = view_object.id() {
            let settings = ViewSettings::from_view(&view_object).to_params()?;
            self.profiles.change_user_profile(view_id, Some(settings)).await?;
        }
        let profile = self.profiles.user_profile();

        let mut resource = self.resolve_active_component(set, &view_object, &profile).await?;
        let dataset_view_ref = view_object
            .reference(DATASET_VIEW)
            .cloned()
            .ok_or_else(|| CoreError::Resolution("view has no dataset view".to_string()))?;
        let owner = match &options.mode {
            SaveMode::Clone { .. } => self.current_user(&profile).await?,
            SaveMode::Update => None,
        };

        let component_id = {
            let component = resource
                .root_mut()
                .ok_or_else(|| CoreError::InvalidState("component resource is empty".to_string()))?;
            component.set_attr("access", options.access.as_str());
            if let SaveMode::Clone { .. } = options.mode {
                if let Some(audit) = component.child_mut(AUDIT) {
                    for field in AUDIT_FIELDS {
                        audit.unset(field);
                    }
                }
                match owner {
                    Some(owner) => component.set("owner", Slot::Ref(owner)),
                    None => warn!("user {} not found, clone has no owner", profile.user_name),
                }
            }
            component.id().map(str::to_string)
        };

        if let Some(component_id) = &component_id {
            if let Some(entry) = profile.decode::<DatasetProfile>(component_id)? {
                let mut merged = Vec::with_capacity(ParamKind::ALL.len());
                for kind in ParamKind::ALL {
                    let class = self
                        .client
                        .find_class(&self.config.dataset_namespace, kind.class_name())
                        .await?;
                    merged.push((kind, class));
                }
                if let Some(component) = resource.root_mut() {
                    measure_time("merge profile parameters", || {
                        for (kind, class) in &merged {
                            self.merge_parameters_into_component(component, set, &entry, *kind, class);
                        }
                    });
                }
            }
        }

        if let SaveMode::Clone { new_name } = &options.mode {
            if let Some(component) = resource.root_mut() {
                component.clear_identities();
                component.set_attr("name", new_name.as_str());
            }
            resource.set_uri(None);
        }

        let saved = self.client.save_resource(resource).await?;

        // the profile only changes once the component is stored
        if let Some(component_id) = &component_id {
            self.profiles.change_user_profile(component_id, None).await?;
        }
        if let SaveMode::Clone { new_name } = &options.mode {
            if let Some(dataset_view_id) = dataset_view_ref.fragment() {
                self.profiles
                    .change_user_profile(dataset_view_id, Some(json!({ "name": new_name })))
                    .await?;
            }
        }
        info!(
            "saved dataset component {:?} at {:?} ({})",
            saved.root().and_then(ModelObject::name),
            saved.uri(),
            match options.mode {
                SaveMode::Update => "update",
                SaveMode::Clone { .. } => "clone",
            }
        );

        let saved_ref = saved.root().and_then(|root| saved.ref_to(root));
        set.upsert(saved.clone());
        match (saved_ref, set.resolve_mut(&dataset_view_ref)) {
            (Some(saved_ref), Some(dataset_view)) => dataset_view.set(DATASET_COMPONENT, Slot::Ref(saved_ref)),
            _ => warn!("could not link {} to the saved component", dataset_view_ref),
        }

        match position.and_then(|p| view_at(set, &p)) {
            Some(view_object) => self.embedder.update_context(ContextUpdate {
                view_object: Some(view_object),
            }),
            None => debug!("view {} has no position to re-resolve", view),
        }

        if let SaveMode::Clone { .. } = options.mode {
            self.invalidate_components().await;
        }
        Ok(saved)
    }

    async fn current_user(&self, profile: &UserProfile) -> Result<Option<ObjectRef>> {
        let class = self
            .client
            .fetch_all_classes()
            .await?
            .into_iter()
            .find(|c| c.name() == self.config.user_class);
        let Some(class) = class else {
            return Ok(None);
        };
        let users = self
            .client
            .find_by_kind(class.as_ref(), &KindFilter::named(&profile.user_name))
            .await?;
        Ok(users.iter().find_map(|r| {
            let root = r.root()?;
            if root.name() == Some(profile.user_name.as_str()) {
                r.ref_to(root)
            } else {
                None
            }
        }))
    }
}

fn resolve_ref<'a>(set: &'a ResourceSet, object: &ModelObject, feature: &str) -> Result<&'a ModelObject> {
    let target = object
        .reference(feature)
        .ok_or_else(|| CoreError::Resolution(format!("{} has no {}", object.class_name(), feature)))?;
    set.resolve(target)
        .ok_or_else(|| CoreError::Resolution(format!("{} is not loaded", target)))
}

fn view_at(set: &ResourceSet, position: &ObjectPosition) -> Option<ObjectRef> {
    let element = set.find_at(position)?;
    let resource = set.resource(element.resource_uri?)?;
    resource.ref_to(element.object)
}
