//! Declarative cluster topology reconciliation for the Capstan provisioning
//! engine.
//!
//! An orchestrator hands this crate a declarative tree describing a cluster.
//! The crate expands the tree into the engine's canonical cluster document,
//! drives the engine through the cluster's lifecycle, and flattens whatever
//! the engine reports back into the tree again, so the stored tree always
//! mirrors the cluster that actually exists.

pub mod engine;
pub mod logging;
pub mod model;
pub mod patch;
pub mod reconcile;
pub mod transcode;
pub mod tree;
pub mod validation;
