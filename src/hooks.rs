//! Extension points invoked at fixed stages of a build pass.
//!
//! Hooks are owned by the caller and passed to the planner as an ordered slice;
//! the invocation order within a stage is the slice order. Stages differ in how
//! they combine multiple hooks:
//!
//! - [`BuildHook::ignore_asset`]: any hook returning `true` excludes the asset.
//! - [`BuildHook::format_bundle_name`]: the first hook returning `Some` wins and
//!   the asset's manifest entry records the name as an explicit bundle reference.
//! - [`BuildHook::create_item`]: the first hook returning `true` stops the chain;
//!   when none claims the node, the planner fills in a default item.
//! - [`BuildHook::modify_item`], [`BuildHook::generate_build_work`] and the
//!   lifecycle stages run every hook unconditionally.

use std::path::Path;

use crate::models::{BuildWork, BundleBuild, ManifestItem, ManifestNode};

/// Observer and extension interface for one build pass.
///
/// Every method has a no-op default, so implementors override only the stages
/// they care about.
pub trait BuildHook {
  /// Called once before any asset is classified.
  fn prepare(&mut self, _output_dir: &Path) {}

  /// Exclude an already-classified asset from the pass.
  fn ignore_asset(&mut self, _asset: &str, _module: &str, _dist: &str, _norm: &str) -> bool {
    false
  }

  /// Override the bundle name for an asset. Returning `Some` both renames the
  /// bundle and marks the manifest entry with an explicit bundle reference.
  fn format_bundle_name(
    &mut self,
    _asset: &str,
    _module: &str,
    _dist: &str,
    _norm: &str,
  ) -> Option<String> {
    None
  }

  /// Populate a freshly-created manifest node. Return `true` to claim the node
  /// and stop later hooks from seeing it.
  fn create_item(&mut self, _node: &mut ManifestNode) -> bool {
    false
  }

  /// Adjust a manifest item after creation and default type inference.
  fn modify_item(&mut self, _item: &mut ManifestItem) {}

  /// Amend one bundle's build work, e.g. to attach a variant or request a
  /// forced artifact refresh via `work.force_refresh`.
  fn generate_build_work(
    &mut self,
    _bundle: &mut BundleBuild,
    _work: &mut BuildWork,
    _bundle_index: usize,
  ) {
  }

  /// Called once after the plan is assembled, regardless of outcome.
  fn cleanup(&mut self) {}

  /// Called once after the pass completes successfully.
  fn on_success(&mut self) {}
}

/// A no-op hook, useful as a placeholder in hook lists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl BuildHook for NoopHook {}
