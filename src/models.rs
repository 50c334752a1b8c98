//! Data structures produced while partitioning assets into build work.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::naming::ResourceKey;

/// Well-known manifest item type tags.
///
/// The numeric representation is part of the manifest format; extensions may
/// use codes beyond the reserved range, which is why [`ManifestItem`] stores a
/// raw code rather than this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ManifestItemType {
  /// No type assigned yet.
  None = 0,
  /// Plain content asset.
  Normal = 1,
  /// Instantiable object template.
  Prefab = 2,
  /// Loadable scene.
  Scene = 3,
  /// Entry that redirects to another manifest entry.
  Redirect = 4,
}

/// Payload of one manifest entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
  /// Type tag; one of [`ManifestItemType`] or an extension-defined code.
  pub type_code: i32,
  /// Explicit bundle reference for externally-named bundles.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub b_ref: Option<String>,
  /// Cross-reference slot resolved by the manifest compiler (redirect targets).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ref_index: Option<u32>,
  /// Opaque extension payload attached by hooks.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ex_info: Option<Value>,
}

impl ManifestItem {
  /// Item with the given well-known type and no extension data.
  pub fn of_type(item_type: ManifestItemType) -> Self {
    Self {
      type_code: item_type as i32,
      ..Self::default()
    }
  }
}

/// One asset entry inside a manifest, keyed by the asset's project path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
  /// Project path of the asset this node describes.
  pub path: String,
  /// Item payload; filled by hooks or by default type inference.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub item: Option<ManifestItem>,
}

/// Per-(module, distribution) record of the assets contributing to one resource key.
///
/// Created lazily the first time an asset maps to the pair and persisted at the
/// end of a build pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
  /// Module flag of the owning pair (display-cased).
  pub m_flag: String,
  /// Distribution flag of the owning pair (display-cased).
  pub d_flag: String,
  /// The pair's assets are physically folded into the main package.
  pub in_main: bool,
  /// Entries keyed by asset path.
  pub nodes: BTreeMap<String, ManifestNode>,
}

impl Manifest {
  /// Empty manifest for a module/distribution pair.
  pub fn new(m_flag: impl Into<String>, d_flag: impl Into<String>) -> Self {
    Self {
      m_flag: m_flag.into(),
      d_flag: d_flag.into(),
      ..Self::default()
    }
  }

  /// Resource key identifying this manifest.
  pub fn key(&self) -> ResourceKey {
    ResourceKey::new(self.m_flag.clone(), self.d_flag.clone())
  }

  /// Fetch or create the node for an asset path.
  pub fn add_or_get(&mut self, path: &str) -> &mut ManifestNode {
    self
      .nodes
      .entry(path.to_string())
      .or_insert_with(|| ManifestNode {
        path: path.to_string(),
        item: None,
      })
  }
}

/// A named unit of source assets handed to the bundle compiler as one output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleBuild {
  /// Bundle file name.
  pub name: String,
  /// Optional variant suffix appended to the compiled file name.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variant: Option<String>,
  /// Project paths of the assets compiled into this bundle.
  pub assets: Vec<String>,
}

impl BundleBuild {
  /// Bundle with the given name and asset list and no variant.
  pub fn new(name: impl Into<String>, assets: Vec<String>) -> Self {
    Self {
      name: name.into(),
      variant: None,
      assets,
    }
  }

  /// The compiled file name, including the variant suffix when present.
  pub fn effective_name(&self) -> String {
    match &self.variant {
      Some(variant) => format!("{}.{}", self.name, variant),
      None => self.name.clone(),
    }
  }
}

/// Everything required to compile one module's bundles in a single build pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildWork {
  /// Bundles in build order; indices are stable for the duration of the pass.
  pub bundles: Vec<BundleBuild>,
  /// Manifests relevant to this module.
  pub manifests: Vec<Manifest>,
  /// Indices into `bundles` whose prior artifacts must be deleted before rebuild.
  pub force_refresh: BTreeSet<usize>,
  /// Open-ended extension data attached by hooks during planning.
  pub attached: BTreeMap<String, Value>,
}

impl BuildWork {
  /// Lowercased compiled file names of the bundles whose prior artifacts may be
  /// kept, i.e. everything not marked for force refresh.
  ///
  /// The packager deletes any on-disk bundle artifact whose name is absent from
  /// this set before invoking the compiler.
  pub fn retained_artifact_names(&self) -> BTreeSet<String> {
    self
      .bundles
      .iter()
      .enumerate()
      .filter(|(index, _)| !self.force_refresh.contains(index))
      .map(|(_, bundle)| bundle.effective_name().to_lowercase())
      .collect()
  }
}

/// Build plan for one pass: a [`BuildWork`] per module key, the empty key being
/// the main package.
pub type BuildPlan = BTreeMap<String, BuildWork>;
