//! Serialization of planned manifests to the output tree.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::{BuildPlan, Manifest};

/// Write every manifest in the plan under `dir` as pretty-printed JSON, one
/// file per manifest named after its resource key.
///
/// Returns the written paths in plan order.
pub fn write_manifests(plan: &BuildPlan, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
  let dir = dir.as_ref();
  fs::create_dir_all(dir)
    .with_context(|| format!("Failed to create manifest directory {}", dir.display()))?;

  let mut written = Vec::new();
  for work in plan.values() {
    for manifest in &work.manifests {
      let path = dir.join(manifest.key().manifest_asset_name());
      let json = serde_json::to_string_pretty(manifest)
        .with_context(|| format!("Failed to serialize manifest {}", manifest.key()))?;
      fs::write(&path, json)
        .with_context(|| format!("Failed to write manifest {}", path.display()))?;
      debug!(path = %path.display(), nodes = manifest.nodes.len(), "wrote manifest");
      written.push(path);
    }
  }
  Ok(written)
}

/// Read one manifest back from disk.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<Manifest> {
  let path = path.as_ref();
  let contents = fs::read_to_string(path)
    .with_context(|| format!("Failed to read manifest {}", path.display()))?;
  serde_json::from_str(&contents)
    .with_context(|| format!("Failed to parse manifest {}", path.display()))
}

/// Lowercased manifest file names the plan will produce.
///
/// Output files in the manifest directory whose names are absent from this set
/// belong to earlier passes and can be pruned.
pub fn manifest_names(plan: &BuildPlan) -> BTreeSet<String> {
  plan
    .values()
    .flat_map(|work| &work.manifests)
    .map(|manifest| manifest.key().manifest_asset_name())
    .collect()
}
