//! Per-layer reuse decisions

use crate::error::{DotpubError, DotpubResult};
use crate::fingerprint::{Fingerprint, FingerprintKind};
use crate::layer::{LayerFlags, LayerStore, DEBUG_SUPPORT, NUGET_CACHE, PUBLISH_OUTPUT};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Outcome of the cache check for one layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Stored layer matches; skip its build step
    Reuse,
    /// Missing or stale; run its build step and store the new fingerprint
    Rebuild,
}

impl fmt::Display for CacheDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reuse => write!(f, "reuse"),
            Self::Rebuild => write!(f, "rebuild"),
        }
    }
}

/// One layer bound to its validation domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerBinding {
    pub name: String,
    pub kind: FingerprintKind,
    pub flags: LayerFlags,
}

/// Ordered table of layer name -> validation domain
#[derive(Debug, Clone, Default)]
pub struct ValidationDomains {
    bindings: Vec<LayerBinding>,
}

impl ValidationDomains {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings for a .NET publish build, in build order
    pub fn standard(debug_support: bool) -> Self {
        let domains = Self::new()
            .bind(
                NUGET_CACHE,
                FingerprintKind::Dependencies,
                LayerFlags::new(false, false, true),
            )
            .bind(
                PUBLISH_OUTPUT,
                FingerprintKind::FullSource,
                LayerFlags::new(true, false, true),
            );

        if debug_support {
            domains.bind(
                DEBUG_SUPPORT,
                FingerprintKind::Toolchain,
                LayerFlags::new(true, false, true),
            )
        } else {
            domains
        }
    }

    /// Add or replace a binding; replacing keeps the original position
    pub fn bind(mut self, name: &str, kind: FingerprintKind, flags: LayerFlags) -> Self {
        let binding = LayerBinding {
            name: name.to_string(),
            kind,
            flags,
        };
        match self.bindings.iter_mut().find(|b| b.name == name) {
            Some(existing) => *existing = binding,
            None => self.bindings.push(binding),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&LayerBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Fingerprints computed for the current build, one per domain
#[derive(Debug, Clone, Default)]
pub struct CurrentFingerprints {
    by_kind: BTreeMap<FingerprintKind, Fingerprint>,
}

impl CurrentFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: FingerprintKind, fingerprint: Fingerprint) -> Self {
        self.by_kind.insert(kind, fingerprint);
        self
    }

    pub fn insert(&mut self, kind: FingerprintKind, fingerprint: Fingerprint) {
        self.by_kind.insert(kind, fingerprint);
    }

    pub fn get(&self, kind: FingerprintKind) -> Option<&Fingerprint> {
        self.by_kind.get(&kind)
    }
}

/// Decision for one layer, with the inputs it was made from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDecision {
    pub binding: LayerBinding,
    pub fingerprint: Fingerprint,
    pub decision: CacheDecision,
}

impl LayerDecision {
    pub fn name(&self) -> &str {
        &self.binding.name
    }
}

/// `Reuse` iff the store holds this layer with exactly `current`
pub async fn decide(
    layer: &str,
    current: &Fingerprint,
    store: &LayerStore,
) -> DotpubResult<CacheDecision> {
    let decision = if store.is_valid(layer, current).await? {
        CacheDecision::Reuse
    } else {
        CacheDecision::Rebuild
    };
    debug!("Cache decision for {}: {} ({})", layer, decision, current.short());
    Ok(decision)
}

/// Decide every bound layer against its own domain's fingerprint
pub async fn decide_all(
    domains: &ValidationDomains,
    fingerprints: &CurrentFingerprints,
    store: &LayerStore,
) -> DotpubResult<Vec<LayerDecision>> {
    let mut decisions = Vec::with_capacity(domains.len());

    for binding in domains.iter() {
        let fingerprint = fingerprints.get(binding.kind).ok_or_else(|| {
            DotpubError::User(format!(
                "No {} fingerprint computed for layer '{}'",
                binding.kind, binding.name
            ))
        })?;

        let decision = decide(&binding.name, fingerprint, store).await?;
        decisions.push(LayerDecision {
            binding: binding.clone(),
            fingerprint: fingerprint.clone(),
            decision,
        });
    }

    Ok(decisions)
}
