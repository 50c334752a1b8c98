//! Post-plan validation: cross-module/distribution references and dependencies
//! on assets that no bundle builds.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::assets::AssetDatabase;
use crate::config::PipelineConfig;
use crate::models::BuildPlan;
use crate::naming::{bundle_matches_key, NO_DEP_TRACK_SUFFIX};
use crate::registry::ModuleRegistry;

/// A reference from a built asset to a built asset in an incompatible
/// module/distribution pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossReference {
  /// The referring asset.
  pub asset: String,
  /// Canonical resource key of the referring asset.
  pub asset_key: String,
  /// The referenced asset.
  pub dependency: String,
  /// Canonical resource key of the referenced asset.
  pub dependency_key: String,
}

/// A dependency on a content asset that no bundle in the plan builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonBuildDependency {
  /// The referring asset.
  pub asset: String,
  /// The referenced asset missing from the plan.
  pub dependency: String,
}

/// Outcome of [`check_plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
  /// Illegal cross-pair references, in asset order.
  pub cross_references: Vec<CrossReference>,
  /// Content dependencies absent from the plan, in asset order.
  pub non_build_dependencies: Vec<NonBuildDependency>,
}

impl CheckReport {
  /// Whether the plan passed both checks.
  pub fn is_clean(&self) -> bool {
    self.cross_references.is_empty() && self.non_build_dependencies.is_empty()
  }

  /// Human-readable report text.
  pub fn render(&self) -> String {
    let mut out = String::new();
    if self.cross_references.is_empty() {
      out.push_str("No cross mod/dist reference found.\n");
    } else {
      out.push_str("Cross mod/dist reference found! See below:\n");
      for cross in &self.cross_references {
        out.push_str(&format!(
          "{} ({}) -> {} ({})\n",
          cross.asset, cross.asset_key, cross.dependency, cross.dependency_key
        ));
      }
    }
    out.push('\n');
    if self.non_build_dependencies.is_empty() {
      out.push_str("No non build dependency found.\n");
    } else {
      out.push_str("Non build dependency found! See below:\n");
      for dep in &self.non_build_dependencies {
        out.push_str(&format!("{} -> {}\n", dep.asset, dep.dependency));
      }
    }
    out
  }

  /// Write the rendered report to a file.
  pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, self.render())
      .with_context(|| format!("Failed to write check report to {}", path.display()))
  }
}

/// Transitive content dependencies of the built assets, both directions.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
  /// Asset to its transitive dependencies.
  pub dependencies: BTreeMap<String, BTreeSet<String>>,
  /// Dependency to the assets that reach it.
  pub referenced_by: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
  /// Walk the dependency closure of every given asset.
  pub fn build<'s>(
    assets: impl IntoIterator<Item = &'s str>,
    db: &dyn AssetDatabase,
    config: &PipelineConfig,
  ) -> Self {
    let mut graph = Self::default();
    for asset in assets {
      let deps = transitive_dependencies(db, config, asset);
      let entry = graph.dependencies.entry(asset.to_string()).or_default();
      for dep in deps {
        entry.insert(dep.clone());
        graph
          .referenced_by
          .entry(dep)
          .or_default()
          .insert(asset.to_string());
      }
    }
    graph
  }
}

/// Breadth-first closure of an asset's dependencies, excluding the asset
/// itself and any script assets.
///
/// A lookup failure on one node drops that node's edges and keeps walking.
pub fn transitive_dependencies(
  db: &dyn AssetDatabase,
  config: &PipelineConfig,
  asset: &str,
) -> Vec<String> {
  let mut deps = Vec::new();
  if asset.is_empty() || config.is_script(asset) {
    return deps;
  }
  let mut seen = BTreeSet::from([asset.to_string()]);
  let mut queue = VecDeque::from([asset.to_string()]);
  while let Some(current) = queue.pop_front() {
    let direct = match db.direct_dependencies(&current) {
      Ok(direct) => direct,
      Err(err) => {
        debug!(asset = current.as_str(), error = %err, "dependency lookup failed");
        continue;
      }
    };
    for dep in direct {
      if config.is_script(&dep) {
        continue;
      }
      if seen.insert(dep.clone()) {
        queue.push_back(dep.clone());
        deps.push(dep);
      }
    }
  }
  deps
}

/// A dependency between two built assets is legal when the pairs agree, the
/// dependency lives in the main package, a dist fork depends on its own
/// module's un-forked assets, or a module depends on main-package assets of
/// its own dist.
fn is_legal_reference(asset_key: &str, dep_key: &str) -> bool {
  dep_key == asset_key
    || dep_key == "m--d-"
    || (dep_key.ends_with("-d-") && asset_key.starts_with(dep_key))
    || (dep_key.starts_with("m--d-") && asset_key.ends_with(&dep_key[2..]))
}

/// Module a packaged dependency belongs to, when the registry can resolve it.
fn packaged_module<'r>(
  registry: &'r ModuleRegistry,
  config: &PipelineConfig,
  dep: &str,
) -> Option<&'r str> {
  let rest = dep.strip_prefix(&config.package_root)?;
  let token = rest.split('/').next().unwrap_or(rest);
  registry.package_module(token)
}

/// Validate a build plan against the project's dependency graph.
pub fn check_plan(
  plan: &BuildPlan,
  db: &dyn AssetDatabase,
  config: &PipelineConfig,
  registry: &ModuleRegistry,
) -> CheckReport {
  // Assign each built asset the resource key of the manifest whose pair its
  // bundle name matches. Reference-injection bundles are exempt from
  // dependency tracking entirely.
  let mut asset_keys: BTreeMap<String, String> = BTreeMap::new();
  let mut untracked: BTreeSet<String> = BTreeSet::new();
  for work in plan.values() {
    for manifest in &work.manifests {
      let key = manifest.key().canonical();
      for bundle in &work.bundles {
        if bundle.name.ends_with(NO_DEP_TRACK_SUFFIX) {
          untracked.extend(bundle.assets.iter().cloned());
          continue;
        }
        let name = bundle.effective_name();
        if bundle_matches_key(&name, &manifest.m_flag, &manifest.d_flag) {
          for asset in &bundle.assets {
            asset_keys.insert(asset.clone(), key.clone());
          }
        }
      }
    }
  }

  let graph = DependencyGraph::build(
    asset_keys.keys().map(String::as_str),
    db,
    config,
  );

  let mut report = CheckReport::default();
  for (asset, deps) in &graph.dependencies {
    let asset_key = &asset_keys[asset];
    for dep in deps {
      match asset_keys.get(dep) {
        Some(dep_key) => {
          if !is_legal_reference(asset_key, dep_key) {
            report.cross_references.push(CrossReference {
              asset: asset.clone(),
              asset_key: asset_key.clone(),
              dependency: dep.clone(),
              dependency_key: dep_key.clone(),
            });
          }
        }
        None => {
          if untracked.contains(dep) {
            continue;
          }
          let in_project = dep.starts_with(&config.project_root);
          let in_package = dep.starts_with(&config.package_root)
            && packaged_module(registry, config, dep).is_some();
          if in_project || in_package {
            report.non_build_dependencies.push(NonBuildDependency {
              asset: asset.clone(),
              dependency: dep.clone(),
            });
          }
        }
      }
    }
  }
  report
}
