//! Layer store
//!
//! Layers are named units of build output with availability flags. Each
//! build context owns one directory of layer records; a record holds the
//! fingerprint the layer was built from so a later build can decide
//! whether to reuse it.

pub mod context;
pub mod metadata;
pub mod store;

pub use context::BuildContextId;
pub use metadata::{Layer, LayerFlags};
pub use store::LayerStore;

/// Package cache populated by `dotnet restore`
pub const NUGET_CACHE: &str = "nuget-cache";
/// Published application output
pub const PUBLISH_OUTPUT: &str = "publish-output";
/// Debugger launch support, present only for debug builds
pub const DEBUG_SUPPORT: &str = "debug-support";
