//! Lifecycle controller driving the provisioning engine from a declarative
//! tree.
//!
//! Each pass expands the tree into a [`ClusterConfig`], renders it to the
//! engine's document format, stages it in a [`ScopedWorkspace`] together
//! with any carried engine state, and invokes the engine. Whatever the
//! engine reports back is flattened into the tree again, so the tree the
//! orchestrator stores always mirrors the cluster that actually exists.
//!
//! The controller holds no state of its own between passes. Everything it
//! needs travels inside the [`ClusterResource`]: the tree plus the identity
//! assigned on creation.

use std::{thread, time::Duration};

use rand::Rng;
use snafu::Snafu;
use tracing::{debug, info, warn};

use crate::{
    engine::{DiagnosticLog, EngineError, EngineInvocation, ProvisioningEngine},
    patch,
    transcode::{self, expand_cluster, flatten_snapshot},
    tree::Tree,
};

pub mod workspace;

pub use workspace::ScopedWorkspace;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Expand { source: transcode::Error },

    #[snafu(transparent)]
    Render { source: patch::Error },

    #[snafu(transparent)]
    Workspace { source: workspace::Error },

    #[snafu(display("engine invocation failed{diagnostics}"))]
    Engine {
        source: EngineError,
        diagnostics: String,
    },
}

/// Where a managed cluster stands in its lifecycle.
///
/// `Creating` and `Updating` only exist for the duration of the matching
/// controller call; between passes a cluster is either `Absent` or
/// `Present`, decided by whether it carries an identity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    Absent,
    Creating,
    Present,
    Updating,
    Removed,
}

/// One managed cluster as the orchestrator hands it to the controller.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusterResource {
    /// Assigned on the first successful create, empty while absent.
    pub identity: String,

    /// The declarative tree, refreshed in place by every pass.
    pub tree: Tree,
}

impl ClusterResource {
    pub fn new(tree: Tree) -> Self {
        Self {
            identity: String::new(),
            tree,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.identity.is_empty()
    }

    pub fn state(&self) -> LifecycleState {
        if self.is_absent() {
            LifecycleState::Absent
        } else {
            LifecycleState::Present
        }
    }
}

pub struct Reconciler<E> {
    engine: E,
}

impl<E: ProvisioningEngine> Reconciler<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Provisions the cluster and assigns its identity.
    ///
    /// Honors an optional `delay_on_creation` (seconds) from the tree
    /// before the first engine call. The identity is only assigned once
    /// the engine has converged, so a failed create leaves the resource
    /// absent and a later retry starts from scratch.
    pub fn create(&self, resource: &mut ClusterResource) -> Result<()> {
        info!(state = %LifecycleState::Creating, "creating cluster");

        let delay = resource.tree.int("delay_on_creation").unwrap_or(0);
        if delay > 0 {
            debug!(seconds = delay, "waiting before creation");
            thread::sleep(Duration::from_secs(delay.unsigned_abs()));
        }

        self.converge(resource)?;

        resource.identity = random_identity();
        info!(
            identity = %resource.identity,
            state = %LifecycleState::Present,
            "cluster created"
        );
        Ok(())
    }

    /// Refreshes the tree from the engine's view of the cluster.
    ///
    /// A missing engine state is not an error: the cluster is gone, the
    /// identity is cleared and the orchestrator will schedule a fresh
    /// create on its next pass. The reverse holds too: found state on a
    /// resource without an identity assigns one, adopting the cluster
    /// instead of re-creating it.
    pub fn read(&self, resource: &mut ClusterResource) -> Result<()> {
        let config = expand_cluster(&resource.tree)?;
        let rendered = patch::render_cluster_document(&config)?;

        let workspace = ScopedWorkspace::create()?;
        workspace.write_cluster_config(&rendered)?;
        materialize_carried_state(&workspace, &resource.tree)?;

        let mut log = DiagnosticLog::new();
        let outcome = {
            let mut invocation = EngineInvocation {
                workspace: workspace.path(),
                log: &mut log,
            };
            self.engine.lookup(&mut invocation)
        };
        let snapshot = match outcome {
            Ok(snapshot) => snapshot,
            Err(EngineError::StateNotFound) => {
                info!(state = %LifecycleState::Absent, "no engine state, cluster is absent");
                resource.identity.clear();
                return Ok(());
            }
            Err(source) => {
                return Err(Error::Engine {
                    source,
                    diagnostics: diagnostics_suffix(&log),
                });
            }
        };

        let mut tree = flatten_snapshot(&snapshot, &resource.tree);
        absorb_workspace_artifacts(&workspace, &mut tree)?;
        tree.set("cluster_yaml", rendered);
        resource.tree = tree;
        if resource.identity.is_empty() {
            resource.identity = random_identity();
            info!(
                identity = %resource.identity,
                state = %LifecycleState::Present,
                "found existing cluster state, adopting the cluster"
            );
        }
        Ok(())
    }

    /// Converges the cluster onto the current tree, keeping its identity.
    pub fn update(&self, resource: &mut ClusterResource) -> Result<()> {
        info!(
            identity = %resource.identity,
            state = %LifecycleState::Updating,
            "updating cluster"
        );
        self.converge(resource)?;
        info!(state = %LifecycleState::Present, "cluster updated");
        Ok(())
    }

    /// Tears the cluster down.
    ///
    /// The identity is cleared even when teardown fails: the engine removes
    /// what it can, and a retry would have to start from scratch anyway.
    pub fn delete(&self, resource: &mut ClusterResource) -> Result<()> {
        info!(identity = %resource.identity, "removing cluster");

        let config = expand_cluster(&resource.tree)?;
        let rendered = patch::render_cluster_document(&config)?;

        let workspace = ScopedWorkspace::create()?;
        workspace.write_cluster_config(&rendered)?;
        materialize_carried_state(&workspace, &resource.tree)?;

        let mut log = DiagnosticLog::new();
        let outcome = {
            let mut invocation = EngineInvocation {
                workspace: workspace.path(),
                log: &mut log,
            };
            self.engine.teardown(&mut invocation)
        };

        resource.identity.clear();
        match outcome {
            Ok(()) => {
                info!(state = %LifecycleState::Removed, "cluster removed");
                Ok(())
            }
            Err(source) => {
                warn!("engine teardown failed, identity cleared regardless");
                Err(Error::Engine {
                    source,
                    diagnostics: diagnostics_suffix(&log),
                })
            }
        }
    }

    /// The shared create/update pass: expand, render, stage, initialize,
    /// apply, flatten the resulting snapshot back into the tree.
    fn converge(&self, resource: &mut ClusterResource) -> Result<()> {
        let config = expand_cluster(&resource.tree)?;
        let rendered = patch::render_cluster_document(&config)?;

        let workspace = ScopedWorkspace::create()?;
        workspace.write_cluster_config(&rendered)?;
        materialize_carried_state(&workspace, &resource.tree)?;

        let mut log = DiagnosticLog::new();
        self.invoke(&workspace, &mut log, |engine, invocation| {
            engine.initialize(invocation)
        })?;
        let snapshot = self.invoke(&workspace, &mut log, |engine, invocation| {
            engine.apply(invocation)
        })?;

        let mut tree = flatten_snapshot(&snapshot, &resource.tree);
        absorb_workspace_artifacts(&workspace, &mut tree)?;
        tree.set("cluster_yaml", rendered);
        resource.tree = tree;
        Ok(())
    }

    fn invoke<T>(
        &self,
        workspace: &ScopedWorkspace,
        log: &mut DiagnosticLog,
        call: impl FnOnce(&E, &mut EngineInvocation<'_>) -> Result<T, EngineError>,
    ) -> Result<T> {
        let outcome = {
            let mut invocation = EngineInvocation {
                workspace: workspace.path(),
                log: &mut *log,
            };
            call(&self.engine, &mut invocation)
        };
        outcome.map_err(|source| Error::Engine {
            source,
            diagnostics: diagnostics_suffix(log),
        })
    }
}

/// Stages engine state carried in the tree from earlier passes. Empty
/// values are treated as absent, like everywhere else in the tree.
fn materialize_carried_state(
    workspace: &ScopedWorkspace,
    tree: &Tree,
) -> Result<(), workspace::Error> {
    if let Some(state) = tree.str("cluster_state").filter(|state| !state.is_empty()) {
        workspace.write_cluster_state(state)?;
    }
    if let Some(kube_config) = tree.str("kube_config").filter(|config| !config.is_empty()) {
        workspace.write_kube_config(kube_config)?;
    }
    Ok(())
}

/// Carries engine state left in the workspace back into the tree.
fn absorb_workspace_artifacts(
    workspace: &ScopedWorkspace,
    tree: &mut Tree,
) -> Result<(), workspace::Error> {
    if let Some(state) = workspace.read_cluster_state()?.filter(|state| !state.is_empty()) {
        tree.set("cluster_state", state);
    }
    if let Some(config) = workspace.read_kube_config()?.filter(|config| !config.is_empty()) {
        tree.set("kube_config", config);
    }
    Ok(())
}

/// A fresh 128-bit identity rendered as lowercase hex.
fn random_identity() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn diagnostics_suffix(log: &DiagnosticLog) -> String {
    if log.is_empty() {
        String::new()
    } else {
        format!(", engine output:\n{}", log.to_text())
    }
}
