//! Deterministic bundle naming and the canonical resource-key format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Extension of every compiled bundle file.
pub const BUNDLE_EXT: &str = ".ab";
/// Suffix of a serialized manifest asset awaiting compilation.
pub const MANIFEST_ASSET_SUFFIX: &str = ".m.asset";
/// Suffix of a compiled manifest bundle.
pub const MANIFEST_BUNDLE_SUFFIX: &str = ".m.ab";
/// Bundles carrying this suffix are reference-injection targets whose assets are
/// exempt from dependency tracking.
pub const NO_DEP_TRACK_SUFFIX: &str = ".=.ab";

/// Identity of one manifest/build group: a module flag and a distribution flag,
/// either of which may be empty (the main package has both empty).
///
/// The canonical string form `m-{module}-d-{dist}` lowercases both segments;
/// display-cased names are preserved in the struct fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
  /// Module flag, empty for the main package.
  pub module: String,
  /// Distribution flag, empty for the un-forked channel.
  pub dist: String,
}

impl ResourceKey {
  /// Key for the given module and distribution flags.
  pub fn new(module: impl Into<String>, dist: impl Into<String>) -> Self {
    Self {
      module: module.into(),
      dist: dist.into(),
    }
  }

  /// The main-package key (both segments empty).
  pub fn main() -> Self {
    Self::default()
  }

  /// Whether this is the main-package key.
  pub fn is_main(&self) -> bool {
    self.module.is_empty() && self.dist.is_empty()
  }

  /// Canonical lowercase join key, `m-{module}-d-{dist}`.
  pub fn canonical(&self) -> String {
    format!(
      "m-{}-d-{}",
      self.module.to_lowercase(),
      self.dist.to_lowercase()
    )
  }

  /// Parse a key token of the form `m-{module}-d-{dist}` or the short `d-{dist}`.
  pub fn parse_token(token: &str) -> Option<Self> {
    if let Some(rest) = token.strip_prefix("m-") {
      let split = rest.find("-d-")?;
      Some(Self::new(&rest[..split], &rest[split + "-d-".len()..]))
    } else {
      token.strip_prefix("d-").map(|dist| Self::new("", dist))
    }
  }

  /// File name of the serialized manifest for this key.
  pub fn manifest_asset_name(&self) -> String {
    format!("{}{}", self.canonical(), MANIFEST_ASSET_SUFFIX)
  }

  /// File name of the compiled manifest bundle for this key.
  pub fn manifest_bundle_name(&self) -> String {
    format!("{}{}", self.canonical(), MANIFEST_BUNDLE_SUFFIX)
  }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.canonical())
  }
}

/// Directory part of a normalized path, empty when the file sits at the content root.
fn directory_of(norm: &str) -> &str {
  match norm.rfind(['/', '\\']) {
    Some(index) => &norm[..index],
    None => "",
  }
}

/// File name of a normalized path without its final extension.
fn file_stem_of(norm: &str) -> &str {
  let name_start = norm.rfind(['/', '\\']).map_or(0, |index| index + 1);
  let name = &norm[name_start..];
  match name.rfind('.') {
    Some(index) => &name[..index],
    None => name,
  }
}

/// Default deterministic bundle name for a classified asset.
///
/// The name concatenates the module, distribution and normalized directory with
/// path separators collapsed to `-`. Scene files get their own bundle per file
/// (`-{stem}.s`), prefabs share the directory bundle under an `.o` marker. The
/// scheme is injective for distinct (module, dist, directory) triples; a
/// collision between different owning modules is a structural bug that the
/// planner reports as a warning.
pub fn format_bundle_name(_asset: &str, module: &str, dist: &str, norm: &str) -> String {
  let mut name = format!("m-{}-d-{}-{}", module, dist, directory_of(norm))
    .replace(['\\', '/'], "-");
  if norm.ends_with(".unity") {
    name.push('-');
    name.push_str(file_stem_of(norm));
    name.push_str(".s");
  } else if norm.ends_with(".prefab") {
    name.push_str(".o");
  }
  name.push_str(BUNDLE_EXT);
  name
}

/// Whether a bundle file name belongs to the given module/distribution pair.
///
/// Matches the default naming scheme by prefix and externally-named bundles by a
/// `.ab.m-{module}-d-{dist}` suffix convention, both case-insensitively.
pub fn bundle_matches_key(bundle: &str, module: &str, dist: &str) -> bool {
  let key = format!("m-{}-d-{}", module, dist).to_lowercase();
  let bundle = bundle.to_lowercase();
  bundle.starts_with(&format!("{key}-")) || bundle.ends_with(&format!("{BUNDLE_EXT}.{key}"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonical_key_lowercases_segments() {
    let key = ResourceKey::new("Combat", "GooglePlay");
    assert_eq!(key.canonical(), "m-combat-d-googleplay");
    assert_eq!(key.to_string(), "m-combat-d-googleplay");
    assert_eq!(ResourceKey::main().canonical(), "m--d-");
  }

  #[test]
  fn parses_key_tokens() {
    assert_eq!(
      ResourceKey::parse_token("m-combat-d-gp"),
      Some(ResourceKey::new("combat", "gp"))
    );
    assert_eq!(
      ResourceKey::parse_token("m--d-"),
      Some(ResourceKey::main())
    );
    assert_eq!(
      ResourceKey::parse_token("d-gp"),
      Some(ResourceKey::new("", "gp"))
    );
    assert_eq!(ResourceKey::parse_token("x-whatever"), None);
    assert_eq!(ResourceKey::parse_token("m-combat"), None);
  }

  #[test]
  fn manifest_names_follow_the_key() {
    let key = ResourceKey::new("X", "D1");
    assert_eq!(key.manifest_asset_name(), "m-x-d-d1.m.asset");
    assert_eq!(key.manifest_bundle_name(), "m-x-d-d1.m.ab");
  }

  #[test]
  fn names_directory_bundles() {
    assert_eq!(
      format_bundle_name("Assets/CapsRes/sub/b.txt", "", "", "sub/b.txt"),
      "m--d--sub.ab"
    );
    assert_eq!(
      format_bundle_name("Assets/CapsRes/b.txt", "", "", "b.txt"),
      "m--d--.ab"
    );
  }

  #[test]
  fn scenes_and_prefabs_get_type_markers() {
    assert_eq!(
      format_bundle_name("Assets/CapsRes/a.prefab", "", "", "a.prefab"),
      "m--d--.o.ab"
    );
    assert_eq!(
      format_bundle_name(
        "Assets/Mods/X/CapsRes/dist/D1/c.unity",
        "X",
        "D1",
        "c.unity"
      ),
      "m-X-d-D1--c.s.ab"
    );
    assert_eq!(
      format_bundle_name("Assets/CapsRes/maps/town.unity", "", "", "maps/town.unity"),
      "m--d--maps-town.s.ab"
    );
  }

  #[test]
  fn distinct_triples_produce_distinct_names() {
    let base = format_bundle_name("a", "m1", "d1", "dir/f.txt");
    assert_ne!(base, format_bundle_name("a", "m2", "d1", "dir/f.txt"));
    assert_ne!(base, format_bundle_name("a", "m1", "d2", "dir/f.txt"));
    assert_ne!(base, format_bundle_name("a", "m1", "d1", "other/f.txt"));
    assert_eq!(base, format_bundle_name("b", "m1", "d1", "dir/g.txt"));
  }

  #[test]
  fn matches_bundles_by_prefix_and_suffix() {
    assert!(bundle_matches_key("m-x-d-d1--c.s.ab", "X", "D1"));
    assert!(bundle_matches_key("custom.ab.m-x-d-d1", "x", "d1"));
    assert!(!bundle_matches_key("m-x-d-d2--c.s.ab", "X", "D1"));
    assert!(!bundle_matches_key("m-xy-d-d1--c.s.ab", "X", "D1"));
  }
}
