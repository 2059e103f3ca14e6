//! # Metaview Core
//!
//! Engine behind a metadata-driven administration front-end. Views,
//! forms and trees are rendered from a live object model instead of
//! per-entity screens; this crate holds the logic that does not depend
//! on any widget toolkit:
//!
//! - [`model`]: reflective object graph, class descriptors and annotations
//! - [`forms`]: choosing the control for a model feature
//! - [`operations`]: invoking class operations with collected parameters
//! - [`params`]: query parameter rows and their editor
//! - [`dataset`]: folding profile parameters into dataset components and saving them
//!
//! Everything outside (the model server client, the profile store, the
//! application shell) is reached through the traits in [`ports`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod forms;
pub mod layout;
pub mod model;
pub mod operations;
pub mod params;
pub mod ports;
pub mod profile;
pub mod utils;

#[cfg(test)]
mod testing;

/// Re-export common types for ease of use
pub use config::{CoreConfig, EditorConfig, ModelConfig};
pub use dataset::{Access, DatasetPersister, SaveMode, SaveOptions};
pub use error::{CoreError, Result};
pub use forms::{select_control, ControlKind, FieldEvent, FieldValue, RenderableControl};
pub use model::{ClassDescriptor, ModelObject, ObjectRef, Resource, ResourceSet};
pub use operations::{list_operations, OperationInvoker, Outcome};
pub use params::{ParamKind, ParameterEditor, ParameterRow, QueryParam};
pub use ports::{Embedder, ErrorChannel, ModelClient, ProfileStore, Severity};
pub use profile::{DatasetProfile, UserProfile};

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
