//! dotpub - layer-caching build core for a .NET publish buildpack
//!
//! Fingerprints a project's dependency manifests and sources, reuses the
//! cached layers whose inputs are unchanged, and drives `dotnet publish`
//! for the layers that must be rebuilt.

pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod execute;
pub mod fingerprint;
pub mod layer;
pub mod plan;
pub mod report;

pub use error::{DotpubError, DotpubResult};
