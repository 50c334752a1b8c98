//! Recovery of resource keys from built artifact names and directory layouts,
//! used when packaging build output into per-key archives.

use crate::naming::{BUNDLE_EXT, MANIFEST_ASSET_SUFFIX, MANIFEST_BUNDLE_SUFFIX, ResourceKey};
use crate::registry::ModuleRegistry;

/// Archive identity recovered from a built manifest file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveKey {
  /// Resource key the archive ships, with the module folded the same way the
  /// classifier folds it (optional modules keep their own key).
  pub key: ResourceKey,
  /// Physical module folder the bundles were compiled into; empty when the
  /// bundles live in the root output directory.
  pub folder_module: String,
}

impl ArchiveKey {
  /// File name of the archive for this key.
  pub fn archive_file_name(&self) -> String {
    format!("{}.zip", self.key.canonical())
  }
}

/// Module/distribution guess recovered from a bundle file name alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleNameKey {
  /// Module segment, lowercased; `None` when the name has no `m-` part.
  pub module: Option<String>,
  /// Distribution segment, lowercased; `None` when none could be recovered.
  pub dist: Option<String>,
}

/// Resolves artifact names back to resource keys using the registry's
/// true-cased module list and distribution flags.
pub struct ArchiveKeyResolver<'a> {
  registry: &'a ModuleRegistry,
}

impl<'a> ArchiveKeyResolver<'a> {
  /// Resolver over the given registry.
  pub fn new(registry: &'a ModuleRegistry) -> Self {
    Self { registry }
  }

  /// Recover the archive key from a manifest file name such as
  /// `m-guns-d-d1.m.ab`.
  ///
  /// The module is true-cased against the registry. The key keeps the module
  /// name, but the classifier's fold rule decides the physical folder: modules
  /// shipping in the main package have their bundles in the root output
  /// directory rather than a per-module folder.
  pub fn resolve_manifest_name(&self, file_name: &str) -> Option<ArchiveKey> {
    let token = file_name
      .strip_suffix(MANIFEST_BUNDLE_SUFFIX)
      .or_else(|| file_name.strip_suffix(MANIFEST_ASSET_SUFFIX))?;
    let parsed = ResourceKey::parse_token(token)?;

    let mut module = parsed.module;
    if !module.is_empty()
      && let Some(cased) = self.registry.true_cased_module(&module)
    {
      module = cased.to_string();
    }

    let is_main_package = self
      .registry
      .module_package(&module)
      .is_some_and(|binding| !binding.standalone);
    let desc = self.registry.descriptor(&module);
    let mut folder_module = module.clone();
    if desc.is_none() || desc.is_some_and(|d| d.in_main) || is_main_package {
      folder_module = String::new();
    }

    Some(ArchiveKey {
      key: ResourceKey::new(module, parsed.dist),
      folder_module,
    })
  }

  /// Best-effort recovery of the module/distribution pair encoded in a bundle
  /// file name.
  ///
  /// Works on the lowercased name with everything from the first `.` dropped
  /// when the name is a bundle. The distribution part is matched against the
  /// registered distribution flags by prefix; without a match, everything up
  /// to the first `-` counts.
  pub fn resolve_bundle_name(&self, name: &str) -> BundleNameKey {
    let mut name = name.to_lowercase();
    if name.ends_with(BUNDLE_EXT)
      && let Some(index) = name.find('.')
    {
      name.truncate(index);
    }

    let mut result = BundleNameKey::default();
    let dpart = if let Some(rest) = name.strip_prefix("m-") {
      let Some(mend) = rest.find("-d-") else {
        return result;
      };
      // Main-package bundles have an empty module segment; keep it.
      result.module = Some(rest[..mend].to_string());
      &rest[mend + "-d-".len()..]
    } else if let Some(rest) = name.strip_prefix("d-") {
      rest
    } else {
      return result;
    };

    for flag in self.registry.dist_flags() {
      let flag = flag.to_lowercase();
      if dpart.starts_with(&flag) {
        result.dist = Some(flag);
        return result;
      }
    }
    if let Some(dend) = dpart.find('-') {
      result.dist = Some(dpart[..dend].to_string());
    }
    result
  }
}

/// Whether an output file is a compiled bundle artifact: a plain `.ab` file or
/// a single-suffix variant (`name.ab.hd`), but never the compiler's `.manifest`
/// side file.
pub fn is_bundle_artifact(file_name: &str) -> bool {
  if file_name.ends_with(BUNDLE_EXT) {
    return true;
  }
  let Some(split) = file_name.rfind(".ab.") else {
    return false;
  };
  let ext = &file_name[split + ".ab.".len()..];
  !ext.contains('.') && ext != "manifest"
}

/// Recover the module and distribution from an archive-relative directory
/// layout: `mod/{module}/…` and, below that, `dist/{dist}/…`.
pub fn split_relative_key(path: &str) -> (Option<String>, Option<String>) {
  let normalized = path.replace('\\', "/");
  let mut rest = normalized.trim_matches('/');

  let mut module = None;
  if let Some(tail) = strip_prefix_ignore_case(rest, "mod/") {
    let tail = tail.trim_start_matches('/');
    match tail.find('/') {
      Some(index) => {
        module = Some(tail[..index].to_string());
        rest = tail[index + 1..].trim_start_matches('/');
      }
      None => {
        module = Some(tail.to_string());
        rest = "";
      }
    }
  }

  let mut dist = None;
  if let Some(tail) = strip_prefix_ignore_case(rest, "dist/") {
    let tail = tail.trim_start_matches('/');
    dist = Some(match tail.find('/') {
      Some(index) => tail[..index].to_string(),
      None => tail.to_string(),
    });
  }

  (module, dist)
}

fn strip_prefix_ignore_case<'s>(text: &'s str, prefix: &str) -> Option<&'s str> {
  if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
    Some(&text[prefix.len()..])
  } else {
    None
  }
}

/// Source asset paths recorded in a compiled bundle's side manifest: the
/// `- path` lines of its `Assets:` block.
pub fn manifest_asset_list(text: &str) -> Vec<String> {
  let mut assets = Vec::new();
  let mut started = false;
  for line in text.lines() {
    if started {
      if line.trim().is_empty() {
        continue;
      }
      if let Some(asset) = line.strip_prefix("- ") {
        assets.push(asset.to_string());
      } else {
        break;
      }
    } else if line == "Assets:" {
      started = true;
    }
  }
  assets
}

/// Whether a compiled bundle has gone stale: any source asset recorded in its
/// side manifest no longer exists. Stale artifacts must be deleted before the
/// next incremental build.
pub fn stale_artifact(manifest_text: &str, exists: impl Fn(&str) -> bool) -> bool {
  manifest_asset_list(manifest_text)
    .iter()
    .any(|asset| !exists(asset))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registry::{DistributeDesc, PackageBinding};

  fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::default();
    registry.add_descriptor(DistributeDesc {
      flag: "Guns".into(),
      ..DistributeDesc::default()
    });
    registry.add_descriptor(DistributeDesc {
      flag: "Extra".into(),
      in_main: true,
      is_optional: true,
      ..DistributeDesc::default()
    });
    registry.add_descriptor(DistributeDesc {
      flag: "Bonus".into(),
      in_main: true,
      ..DistributeDesc::default()
    });
    registry.add_package(PackageBinding {
      package: "com.example.world".into(),
      module: "World".into(),
      standalone: true,
    });
    registry.add_dist_flag("GooglePlay");
    registry.add_dist_flag("GP2");
    registry
  }

  #[test]
  fn resolves_manifest_names_with_true_casing() {
    let registry = registry();
    let resolver = ArchiveKeyResolver::new(&registry);
    let key = resolver.resolve_manifest_name("m-guns-d-d1.m.ab").unwrap();
    assert_eq!(key.key, ResourceKey::new("Guns", "d1"));
    assert_eq!(key.folder_module, "Guns");
    assert_eq!(key.archive_file_name(), "m-guns-d-d1.zip");
  }

  #[test]
  fn folding_follows_the_descriptor() {
    let registry = registry();
    let resolver = ArchiveKeyResolver::new(&registry);

    // Optional in-main module: bundles in the root folder, own key kept.
    let key = resolver.resolve_manifest_name("m-extra-d-.m.ab").unwrap();
    assert_eq!(key.key, ResourceKey::new("Extra", ""));
    assert_eq!(key.folder_module, "");

    // Plain in-main module: key kept, folder folded.
    let key = resolver.resolve_manifest_name("m-bonus-d-.m.ab").unwrap();
    assert_eq!(key.key, ResourceKey::new("Bonus", ""));
    assert_eq!(key.folder_module, "");

    // Unknown modules have no descriptor, so their folder folds too.
    let key = resolver.resolve_manifest_name("m-mystery-d-d1.m.asset").unwrap();
    assert_eq!(key.key, ResourceKey::new("mystery", "d1"));
    assert_eq!(key.folder_module, "");

    // Standalone packages keep their key; without a descriptor the folder
    // still folds.
    let key = resolver.resolve_manifest_name("m-world-d-.m.ab").unwrap();
    assert_eq!(key.key, ResourceKey::new("World", ""));
    assert_eq!(key.folder_module, "");

    assert!(resolver.resolve_manifest_name("whatever.ab").is_none());
  }

  #[test]
  fn recovers_keys_from_bundle_names() {
    let registry = registry();
    let resolver = ArchiveKeyResolver::new(&registry);

    let key = resolver.resolve_bundle_name("m-Guns-d-D1-sub.ab");
    assert_eq!(key.module.as_deref(), Some("guns"));
    assert_eq!(key.dist.as_deref(), Some("d1"));

    // Main-package dist bundles keep their empty module segment.
    let key = resolver.resolve_bundle_name("m--d-d1-sub.ab");
    assert_eq!(key.module.as_deref(), Some(""));
    assert_eq!(key.dist.as_deref(), Some("d1"));

    // Registered flags win even without a trailing dash.
    let key = resolver.resolve_bundle_name("d-googleplay.ab");
    assert_eq!(key.module, None);
    assert_eq!(key.dist.as_deref(), Some("googleplay"));

    // No flag, no dash: nothing to recover.
    let key = resolver.resolve_bundle_name("d-mystery.ab");
    assert_eq!(key.dist, None);

    let key = resolver.resolve_bundle_name("ordinary-file.txt");
    assert_eq!(key, BundleNameKey::default());
  }

  #[test]
  fn identifies_bundle_artifacts() {
    assert!(is_bundle_artifact("m--d--sub.ab"));
    assert!(is_bundle_artifact("m--d--sub.ab.hd"));
    assert!(!is_bundle_artifact("m--d--sub.ab.manifest"));
    assert!(!is_bundle_artifact("m--d--sub.ab.hd.manifest"));
    assert!(!is_bundle_artifact("version.txt"));
  }

  #[test]
  fn splits_relative_layouts() {
    assert_eq!(
      split_relative_key("mod/Guns/dist/D1/file.ab"),
      (Some("Guns".into()), Some("D1".into()))
    );
    assert_eq!(
      split_relative_key("dist/D1/file.ab"),
      (None, Some("D1".into()))
    );
    assert_eq!(split_relative_key("mod\\Guns\\file.ab"), (Some("Guns".into()), None));
    assert_eq!(split_relative_key("plain/file.ab"), (None, None));
    assert_eq!(split_relative_key("mod/Guns"), (Some("Guns".into()), None));
  }

  #[test]
  fn parses_compiled_manifest_asset_blocks() {
    let text = "ManifestFileVersion: 0\n\
                Assets:\n\
                - Assets/CapsRes/a.prefab\n\
                - Assets/CapsRes/b.png\n\
                Dependencies: {}\n";
    assert_eq!(
      manifest_asset_list(text),
      vec![
        "Assets/CapsRes/a.prefab".to_string(),
        "Assets/CapsRes/b.png".to_string()
      ]
    );
    assert!(manifest_asset_list("Dependencies: {}\n").is_empty());

    assert!(!stale_artifact(text, |_| true));
    assert!(stale_artifact(text, |asset| asset.ends_with(".prefab")));
  }
}
