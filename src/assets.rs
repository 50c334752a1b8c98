//! Abstraction over the host's asset database.
//!
//! The pipeline never touches the asset store directly; enumeration, dependency
//! resolution and type lookups go through [`AssetDatabase`] so the planner and
//! checker can run against the real project or against fixtures.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

/// Read-only view of the project's virtual asset tree.
pub trait AssetDatabase {
  /// Every asset path known to the project, in a stable order.
  fn all_asset_paths(&self) -> Vec<String>;

  /// Direct (non-transitive) dependencies of an asset.
  ///
  /// Failures are treated by callers as "no dependencies from this node", never
  /// as fatal; a single malformed asset must not abort a whole closure walk.
  fn direct_dependencies(&self, asset: &str) -> Result<Vec<String>>;

  /// Whether the path names a directory rather than an asset file.
  fn is_directory(&self, _asset: &str) -> bool {
    false
  }

  /// Type name of a serialized scriptable asset, when the store knows it.
  fn scriptable_type(&self, _asset: &str) -> Option<String> {
    None
  }
}

/// In-memory asset database, used by tests and check-only invocations that
/// operate on a captured snapshot of the tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetDatabase {
  assets: Vec<String>,
  dependencies: BTreeMap<String, Vec<String>>,
  directories: BTreeSet<String>,
  scriptable_types: BTreeMap<String, String>,
}

impl MemoryAssetDatabase {
  /// Empty database.
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an asset with no dependencies.
  pub fn add_asset(&mut self, path: impl Into<String>) -> &mut Self {
    let path = path.into();
    if !self.assets.contains(&path) {
      self.assets.push(path);
    }
    self
  }

  /// Add an asset with the given direct dependencies.
  pub fn add_asset_with_deps(
    &mut self,
    path: impl Into<String>,
    deps: impl IntoIterator<Item = impl Into<String>>,
  ) -> &mut Self {
    let path = path.into();
    self.add_asset(path.clone());
    self
      .dependencies
      .insert(path, deps.into_iter().map(Into::into).collect());
    self
  }

  /// Mark a path as a directory.
  pub fn add_directory(&mut self, path: impl Into<String>) -> &mut Self {
    let path = path.into();
    self.directories.insert(path.clone());
    self.add_asset(path);
    self
  }

  /// Record the scriptable type of a serialized asset.
  pub fn set_scriptable_type(
    &mut self,
    path: impl Into<String>,
    type_name: impl Into<String>,
  ) -> &mut Self {
    self.scriptable_types.insert(path.into(), type_name.into());
    self
  }
}

impl AssetDatabase for MemoryAssetDatabase {
  fn all_asset_paths(&self) -> Vec<String> {
    self.assets.clone()
  }

  fn direct_dependencies(&self, asset: &str) -> Result<Vec<String>> {
    Ok(self.dependencies.get(asset).cloned().unwrap_or_default())
  }

  fn is_directory(&self, asset: &str) -> bool {
    self.directories.contains(asset)
  }

  fn scriptable_type(&self, asset: &str) -> Option<String> {
    self.scriptable_types.get(asset).cloned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memory_database_answers_lookups() {
    let mut db = MemoryAssetDatabase::new();
    db.add_asset_with_deps("Assets/CapsRes/a.prefab", ["Assets/CapsRes/tex.png"]);
    db.add_asset("Assets/CapsRes/tex.png");
    db.add_directory("Assets/CapsRes/sub");
    db.set_scriptable_type("Assets/CapsRes/light.asset", "LightingDataAsset");

    assert_eq!(db.all_asset_paths().len(), 3);
    assert_eq!(
      db.direct_dependencies("Assets/CapsRes/a.prefab").unwrap(),
      vec!["Assets/CapsRes/tex.png".to_string()]
    );
    assert!(db.direct_dependencies("Assets/CapsRes/tex.png").unwrap().is_empty());
    assert!(db.is_directory("Assets/CapsRes/sub"));
    assert_eq!(
      db.scriptable_type("Assets/CapsRes/light.asset").as_deref(),
      Some("LightingDataAsset")
    );
  }
}
