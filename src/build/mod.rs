//! Build pipeline
//!
//! One build of one context runs sequentially: fingerprint the inputs, plan,
//! decide each layer against its own validation domain, execute and commit
//! the layers that must be rebuilt, then render the report. Each layer is
//! committed as soon as its step succeeds, so a later failure does not undo
//! earlier layers.

use crate::cache::{
    decide_all, CacheDecision, CurrentFingerprints, LayerDecision, ValidationDomains,
};
use crate::config::options::BuildOptions;
use crate::config::{Config, ConfigManager};
use crate::error::{DotpubError, DotpubResult};
use crate::execute::{BuildExecutor, CancelToken, ExecutionOutput, ExecutionScope};
use crate::fingerprint::{
    dependency_manifests, fingerprint, source_files, Fingerprint, FingerprintKind,
};
use crate::layer::{BuildContextId, LayerStore, DEBUG_SUPPORT, NUGET_CACHE, PUBLISH_OUTPUT};
use crate::plan::{plan, BuildPlan, ProjectMetadata, PublishLayout, ToolchainInventory};
use crate::report::BuildReporter;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Where one build reads its source and keeps its layers
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub id: BuildContextId,
    pub source_root: PathBuf,
    pub store_root: PathBuf,
    pub runtime_identifier: String,
}

impl BuildContext {
    /// Context for `source_root`, with the id derived from the path unless given
    pub fn new(source_root: &Path, id: Option<BuildContextId>, config: &Config) -> Self {
        Self {
            id: id.unwrap_or_else(|| BuildContextId::for_source(source_root)),
            source_root: source_root.to_path_buf(),
            store_root: ConfigManager::store_root(config),
            runtime_identifier: config.toolchain.runtime_identifier.clone(),
        }
    }

    /// Layer store for this context
    pub fn store(&self) -> LayerStore {
        LayerStore::new(&self.store_root, self.id.clone())
    }

    /// Directory containing the project file
    pub fn project_root(&self, options: &BuildOptions) -> PathBuf {
        match &options.project_path {
            Some(rel) => self.source_root.join(rel),
            None => self.source_root.clone(),
        }
    }
}

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub plan: BuildPlan,
    pub decisions: Vec<LayerDecision>,
    pub report: String,
}

impl BuildOutcome {
    /// Decision made for `layer`
    pub fn decision(&self, layer: &str) -> Option<CacheDecision> {
        self.decisions
            .iter()
            .find(|d| d.name() == layer)
            .map(|d| d.decision)
    }
}

/// Drives the pipeline with a given executor
pub struct Builder {
    executor: Arc<dyn BuildExecutor>,
    inventory: ToolchainInventory,
    reporter: BuildReporter,
}

impl Builder {
    pub fn new(
        executor: Arc<dyn BuildExecutor>,
        inventory: ToolchainInventory,
        reporter: BuildReporter,
    ) -> Self {
        Self {
            executor,
            inventory,
            reporter,
        }
    }

    /// Plan the build without touching the store
    pub async fn plan(
        &self,
        ctx: &BuildContext,
        options: &BuildOptions,
    ) -> DotpubResult<BuildPlan> {
        let project =
            ProjectMetadata::discover(&ctx.source_root, options.project_path.as_deref()).await?;
        let store = ctx.store();
        let layout = PublishLayout {
            source_root: ctx.source_root.clone(),
            output_dir: store.payload_dir(PUBLISH_OUTPUT)?,
            runtime_identifier: ctx.runtime_identifier.clone(),
        };
        plan(&project, options, &self.inventory, &layout)
    }

    /// Run one build of `ctx`
    pub async fn build(
        &self,
        ctx: &BuildContext,
        options: &BuildOptions,
        cancel: &CancelToken,
    ) -> DotpubResult<BuildOutcome> {
        info!("Building context {} with {}", ctx.id, self.executor.name());

        let mut fingerprints =
            input_fingerprints(ctx.source_root.clone(), ctx.project_root(options)).await?;
        let plan = self.plan(ctx, options).await?;
        fingerprints.insert(FingerprintKind::Toolchain, toolchain_fingerprint(&plan));

        let store = ctx.store();
        let domains = ValidationDomains::standard(plan.debug_support);
        let decisions = decide_all(&domains, &fingerprints, &store).await?;

        let mut tool_output = vec![];
        for decision in decisions.iter().filter(|d| d.decision == CacheDecision::Rebuild) {
            let output = self.rebuild(&store, &plan, decision, cancel).await?;
            if decision.name() != DEBUG_SUPPORT {
                tool_output.push(output);
            }
        }

        let report = self.reporter.report(&plan, options, &decisions, &tool_output);
        Ok(BuildOutcome {
            plan,
            decisions,
            report,
        })
    }

    /// Execute one layer's step and commit its record
    async fn rebuild(
        &self,
        store: &LayerStore,
        plan: &BuildPlan,
        decision: &LayerDecision,
        cancel: &CancelToken,
    ) -> DotpubResult<ExecutionOutput> {
        let name = decision.name();
        let payload = store.payload_dir(name)?;
        tokio::fs::create_dir_all(&payload).await.map_err(|e| {
            DotpubError::store(name, format!("creating {}: {}", payload.display(), e))
        })?;

        let scope = match name {
            NUGET_CACHE => ExecutionScope::Restore {
                packages_dir: payload.clone(),
            },
            PUBLISH_OUTPUT => ExecutionScope::Publish {
                packages_dir: store.payload_dir(NUGET_CACHE)?,
            },
            DEBUG_SUPPORT => ExecutionScope::DebugSupport {
                layer_dir: payload.clone(),
            },
            other => {
                return Err(DotpubError::User(format!(
                    "No build step for layer '{}'",
                    other
                )))
            }
        };

        debug!("Rebuilding {} ({})", name, decision.fingerprint.short());
        let output = self.executor.execute(plan, &scope, cancel).await?;

        let mut extra = BTreeMap::new();
        extra.insert("sdk_version".to_string(), plan.sdk_version.to_string());
        extra.insert("configuration".to_string(), plan.configuration.to_string());
        extra.insert("target_framework".to_string(), plan.target_framework.to_string());

        store
            .put_with(
                name,
                decision.fingerprint.clone(),
                decision.binding.kind,
                decision.binding.flags,
                &payload,
                extra,
            )
            .await?;
        Ok(output)
    }
}

/// Dependency and full-source fingerprints, hashed on the blocking pool
async fn input_fingerprints(
    source_root: PathBuf,
    project_root: PathBuf,
) -> DotpubResult<CurrentFingerprints> {
    tokio::task::spawn_blocking(move || hash_inputs(&source_root, &project_root))
        .await
        .map_err(|e| DotpubError::User(format!("Fingerprint task failed: {}", e)))?
}

fn hash_inputs(source_root: &Path, project_root: &Path) -> DotpubResult<CurrentFingerprints> {
    let manifests = dependency_manifests(project_root)?;
    let dependencies = fingerprint(source_root, &manifests, FingerprintKind::Dependencies)?;

    let sources = source_files(source_root)?;
    let full_source = fingerprint(source_root, &sources, FingerprintKind::FullSource)?;

    debug!(
        "Fingerprints: dependencies {} ({} files), full-source {} ({} files)",
        dependencies.short(),
        manifests.len(),
        full_source.short(),
        sources.len()
    );
    Ok(CurrentFingerprints::new()
        .with(FingerprintKind::Dependencies, dependencies)
        .with(FingerprintKind::FullSource, full_source))
}

/// Fingerprint of the toolchain inputs the debug-support layer depends on
pub fn toolchain_fingerprint(plan: &BuildPlan) -> Fingerprint {
    Fingerprint::of_parts([
        plan.sdk_version.to_string(),
        plan.configuration.to_string(),
        plan.target_framework.to_string(),
    ])
}
