//! Cooperatively-staged planning task.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use tracing::{info, trace};

use crate::classify::{Classifier, SkipReason};
use crate::hooks::BuildHook;
use crate::models::{BuildPlan, ManifestItem, ManifestItemType, Manifest};
use crate::naming::format_bundle_name;
use crate::plan::combine::combine;

/// What happened to a single asset during planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
  /// The asset joined the plan.
  Classified {
    /// Module whose build work the asset belongs to; empty for main.
    module: String,
    /// Distribution the asset belongs to; empty for the un-forked channel.
    dist: String,
    /// Bundle the asset was assigned to.
    bundle: String,
  },
  /// The classifier excluded the asset.
  Skipped(SkipReason),
  /// A hook excluded the asset after classification.
  HookIgnored,
}

/// One step of a planning task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
  /// One asset was processed.
  Asset {
    /// The asset's project path.
    path: String,
    /// What happened to it.
    outcome: AssetOutcome,
  },
  /// Every asset has been processed; call [`PlanTask::finish`].
  Finished,
}

/// An in-progress planning pass over the asset database.
///
/// The caller pumps [`PlanTask::advance`] one asset at a time, which keeps the
/// pass interruptible and lets callers report progress. Dropping the task
/// cancels the pass; hooks still get their [`BuildHook::cleanup`] call.
pub struct PlanTask<'a> {
  classifier: Classifier<'a>,
  hooks: &'a mut [Box<dyn BuildHook>],
  assets: Vec<String>,
  cursor: usize,
  // Physical grouping: module -> bundle name -> assets, bundles in the order
  // their first asset arrived. That order becomes the bundle index.
  mod2build: BTreeMap<String, IndexMap<String, Vec<String>>>,
  // Logical grouping: manifest module -> dist -> manifest.
  mod2mani: BTreeMap<String, BTreeMap<String, Manifest>>,
  cleaned: bool,
}

impl<'a> PlanTask<'a> {
  /// Start a planning pass; runs every hook's [`BuildHook::prepare`].
  pub fn new(
    classifier: Classifier<'a>,
    hooks: &'a mut [Box<dyn BuildHook>],
    output_dir: &Path,
  ) -> Self {
    for hook in hooks.iter_mut() {
      hook.prepare(output_dir);
    }
    let assets = classifier.database().all_asset_paths();
    info!(assets = assets.len(), "planning build pass");
    Self {
      classifier,
      hooks,
      assets,
      cursor: 0,
      mod2build: BTreeMap::new(),
      mod2mani: BTreeMap::new(),
      cleaned: false,
    }
  }

  /// Process the next asset, or report that the pass is done.
  pub fn advance(&mut self) -> PlanStep {
    let Some(path) = self.assets.get(self.cursor).cloned() else {
      return PlanStep::Finished;
    };
    self.cursor += 1;
    let outcome = self.process(&path);
    PlanStep::Asset { path, outcome }
  }

  /// Fraction of assets processed so far, in `0.0..=1.0`.
  pub fn progress(&self) -> f64 {
    if self.assets.is_empty() {
      1.0
    } else {
      self.cursor as f64 / self.assets.len() as f64
    }
  }

  fn process(&mut self, asset: &str) -> AssetOutcome {
    let classification = match self.classifier.classify(asset) {
      Ok(classification) => classification,
      Err(reason) => {
        trace!(asset, %reason, "skipping asset");
        return AssetOutcome::Skipped(reason);
      }
    };
    if self.hooks.iter_mut().any(|hook| {
      hook.ignore_asset(
        asset,
        &classification.module,
        &classification.dist,
        &classification.norm,
      )
    }) {
      trace!(asset, "asset ignored by hook");
      return AssetOutcome::HookIgnored;
    }

    // Bundles are named after the manifest module, so an optional module
    // folded into the main package still gets bundles of its own; only the
    // physical grouping below folds.
    let mut custom = None;
    for hook in self.hooks.iter_mut() {
      if let Some(name) = hook.format_bundle_name(
        asset,
        classification.manifest_module(),
        &classification.dist,
        &classification.norm,
      ) {
        custom = Some(name);
        break;
      }
    }
    let bundle = custom.clone().unwrap_or_else(|| {
      format_bundle_name(
        asset,
        classification.manifest_module(),
        &classification.dist,
        &classification.norm,
      )
    });

    self
      .mod2build
      .entry(classification.module.clone())
      .or_default()
      .entry(bundle.clone())
      .or_default()
      .push(asset.to_string());

    let manifest_module = classification.manifest_module().to_string();
    let manifest = self
      .mod2mani
      .entry(manifest_module.clone())
      .or_default()
      .entry(classification.dist.clone())
      .or_insert_with(|| {
        let mut manifest = Manifest::new(manifest_module, classification.dist.clone());
        // Only folded optional modules flag their manifests; the main
        // manifest itself stays unflagged.
        manifest.in_main = classification.optional_module.is_some();
        manifest
      });

    // Hooks see the node before any item exists; the default item (with the
    // explicit bundle reference when a hook renamed the bundle) is created
    // only when no hook claimed the node.
    let node = manifest.add_or_get(asset);
    for hook in self.hooks.iter_mut() {
      if hook.create_item(node) {
        break;
      }
    }
    let item = node.item.get_or_insert_with(|| ManifestItem {
      type_code: infer_item_type(asset) as i32,
      b_ref: custom,
      ..ManifestItem::default()
    });
    for hook in self.hooks.iter_mut() {
      hook.modify_item(item);
    }

    AssetOutcome::Classified {
      module: classification.module,
      dist: classification.dist,
      bundle,
    }
  }

  /// Assemble the final plan, run the build-work hooks and fire the success
  /// and cleanup stages.
  pub fn finish(mut self) -> BuildPlan {
    let mod2build = std::mem::take(&mut self.mod2build);
    let mod2mani = std::mem::take(&mut self.mod2mani);
    let plan = combine(mod2build, mod2mani, &mut *self.hooks);
    for hook in self.hooks.iter_mut() {
      hook.on_success();
    }
    for hook in self.hooks.iter_mut() {
      hook.cleanup();
    }
    self.cleaned = true;
    plan
  }
}

impl Drop for PlanTask<'_> {
  fn drop(&mut self) {
    if !self.cleaned {
      for hook in self.hooks.iter_mut() {
        hook.cleanup();
      }
    }
  }
}

/// Default item type for assets no hook claimed.
fn infer_item_type(asset: &str) -> ManifestItemType {
  if asset.ends_with(".unity") {
    ManifestItemType::Scene
  } else if asset.ends_with(".prefab") {
    ManifestItemType::Prefab
  } else {
    ManifestItemType::Normal
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn infers_types_by_extension() {
    assert_eq!(infer_item_type("a/b.unity"), ManifestItemType::Scene);
    assert_eq!(infer_item_type("a/b.prefab"), ManifestItemType::Prefab);
    assert_eq!(infer_item_type("a/b.png"), ManifestItemType::Normal);
  }
}
