/// Metaview - metadata-driven view binding and query parameter engine
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `metaview-core`: model reflection, form mapping, operation invocation,
///   query parameter editing and dataset profile persistence

pub use metaview_core as engine;

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
