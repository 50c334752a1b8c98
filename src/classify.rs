//! Classification of raw asset paths into (module, distribution, normalized path).

use regex::Regex;
use thiserror::Error;

use crate::assets::AssetDatabase;
use crate::config::{ConfigError, PipelineConfig};
use crate::registry::{FlagSet, ModuleRegistry};

/// Why an asset was excluded from the build plan.
///
/// Every variant is an expected, non-fatal outcome; the planner records the
/// reason as a diagnostic and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
  /// The input path was empty.
  #[error("empty path")]
  EmptyPath,
  /// The path names a directory, not an asset.
  #[error("path is a directory")]
  Directory,
  /// The asset is code, which is never packaged as content.
  #[error("script asset")]
  Script,
  /// The asset's extension is in the never-packaged set.
  #[error("ignored by extension")]
  IgnoredByExtension,
  /// The asset is an editor-only serialized type.
  #[error("ignored by scriptable asset type")]
  IgnoredByScriptableType,
  /// A configured ignore pattern matched the path.
  #[error("ignored by filter")]
  IgnoredByFilter,
  /// A module segment could not be extracted from the path.
  #[error("cannot parse module")]
  CannotParseModule,
  /// The module segment resolved to an empty name.
  #[error("empty module")]
  EmptyModule,
  /// The module is excluded unless selected and is not in the flag set.
  #[error("module excluded by selected flags")]
  ModuleExcludedByFlags,
  /// The path is not under a recognized content root.
  #[error("not under a recognized content root")]
  NotUnderContentRoot,
  /// Nothing remained of the path after stripping the grammar segments.
  #[error("normalized path is empty")]
  EmptyNormalizedPath,
  /// The distribution is excluded unless selected and is not in the flag set.
  #[error("distribution excluded by selected flags")]
  DistributionExcludedByFlags,
}

/// Result of classifying one asset path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
  /// Owning module; empty for main-package content (including folded modules).
  pub module: String,
  /// Distribution fork; empty for the un-forked channel.
  pub dist: String,
  /// Path relative to the content root, with module/dist segments stripped.
  pub norm: String,
  /// The asset ships in the main package.
  pub in_main_package: bool,
  /// Original module name for optional modules folded into the main package;
  /// such assets still get a manifest of their own.
  pub optional_module: Option<String>,
}

impl Classification {
  /// Module key used for manifest grouping: the optional module when the asset
  /// was folded into main, the physical module otherwise.
  pub fn manifest_module(&self) -> &str {
    self.optional_module.as_deref().unwrap_or(&self.module)
  }
}

/// Classifies raw asset paths against the configured path grammar, the module
/// registry and the selected-flag set.
pub struct Classifier<'a> {
  config: &'a PipelineConfig,
  registry: &'a ModuleRegistry,
  flags: &'a FlagSet,
  db: &'a dyn AssetDatabase,
  ignore_patterns: Vec<Regex>,
}

impl<'a> Classifier<'a> {
  /// Build a classifier, compiling the configured ignore patterns.
  pub fn new(
    config: &'a PipelineConfig,
    registry: &'a ModuleRegistry,
    flags: &'a FlagSet,
    db: &'a dyn AssetDatabase,
  ) -> Result<Self, ConfigError> {
    let ignore_patterns = config.compile_ignore_patterns()?;
    Ok(Self {
      config,
      registry,
      flags,
      db,
      ignore_patterns,
    })
  }

  /// The asset database this classifier reads from.
  pub fn database(&self) -> &'a dyn AssetDatabase {
    self.db
  }

  /// Classify a raw asset path, or explain why it is excluded.
  pub fn classify(&self, asset: &str) -> Result<Classification, SkipReason> {
    if asset.is_empty() {
      return Err(SkipReason::EmptyPath);
    }
    if self.db.is_directory(asset) {
      return Err(SkipReason::Directory);
    }
    if self.config.is_script(asset) {
      return Err(SkipReason::Script);
    }
    if self.config.has_ignored_extension(asset) {
      return Err(SkipReason::IgnoredByExtension);
    }
    if self.is_ignored_scriptable(asset) {
      return Err(SkipReason::IgnoredByScriptableType);
    }
    if self.ignore_patterns.iter().any(|pattern| pattern.is_match(asset)) {
      return Err(SkipReason::IgnoredByFilter);
    }

    let in_package = asset.starts_with(&self.config.package_root);
    if in_package || asset.starts_with(&self.config.mods_root) {
      self.classify_modular(asset, in_package)
    } else if let Some(rest) = asset.strip_prefix(&self.config.plain_content_root) {
      let (dist, norm) = self.split_dist(rest);
      self.finish(String::new(), dist, norm, None)
    } else {
      Err(SkipReason::NotUnderContentRoot)
    }
  }

  /// Classify a path under the mods root or the package root.
  fn classify_modular(
    &self,
    asset: &str,
    in_package: bool,
  ) -> Result<Classification, SkipReason> {
    let root = if in_package {
      &self.config.package_root
    } else {
      &self.config.mods_root
    };
    let sub = &asset[root.len()..];
    let Some(index) = sub.find('/') else {
      return Err(SkipReason::CannotParseModule);
    };
    let token = &sub[..index];

    let mut module = if in_package {
      self
        .registry
        .package_module(token)
        .unwrap_or_default()
        .to_string()
    } else {
      token.to_string()
    };
    if module.is_empty() {
      return Err(SkipReason::EmptyModule);
    }
    if self
      .registry
      .descriptor(&module)
      .is_some_and(|desc| desc.no_select_no_build)
      && !self.flags.contains(&module)
    {
      return Err(SkipReason::ModuleExcludedByFlags);
    }

    let sub = &sub[index + 1..];
    let Some(rest) = sub.strip_prefix(&self.config.content_dir) else {
      return Err(SkipReason::NotUnderContentRoot);
    };

    // A package that is not promoted to a standalone module always folds into
    // the main package, even without a descriptor.
    let desc = self.registry.descriptor(&module);
    let is_main_package = in_package && !self.registry.package_treated_as_module(token);
    let mut optional_module = None;
    if desc.is_none() || desc.is_some_and(|d| d.in_main) || is_main_package {
      if let Some(desc) = desc
        && desc.is_optional
        && !is_main_package
      {
        optional_module = Some(desc.flag.clone());
      }
      module = String::new();
    }

    let (dist, norm) = self.split_dist(rest);
    self.finish(module, dist, norm, optional_module)
  }

  /// Extract a distribution segment from the content-root remainder.
  ///
  /// The segment only counts when a further `/` follows the distribution name;
  /// a bare `dist/<name>` file keeps the whole remainder as its normalized path.
  fn split_dist(&self, rest: &str) -> (String, String) {
    if let Some(tail) = rest.strip_prefix(&self.config.dist_dir)
      && let Some(index) = tail.find('/')
      && index > 0
    {
      return (tail[..index].to_string(), tail[index + 1..].to_string());
    }
    (String::new(), rest.to_string())
  }

  /// Shared tail checks: the normalized path must be non-empty and a selected
  /// distribution when the distribution opts out of unselected builds.
  fn finish(
    &self,
    module: String,
    dist: String,
    norm: String,
    optional_module: Option<String>,
  ) -> Result<Classification, SkipReason> {
    if norm.is_empty() {
      return Err(SkipReason::EmptyNormalizedPath);
    }
    if !dist.is_empty()
      && self
        .registry
        .descriptor(&dist)
        .is_some_and(|desc| desc.no_select_no_build)
      && !self.flags.contains(&dist)
    {
      return Err(SkipReason::DistributionExcludedByFlags);
    }
    Ok(Classification {
      in_main_package: module.is_empty(),
      module,
      dist,
      norm,
      optional_module,
    })
  }

  fn is_ignored_scriptable(&self, asset: &str) -> bool {
    asset.ends_with(".asset")
      && self.db.scriptable_type(asset).is_some_and(|type_name| {
        self
          .config
          .ignored_scriptable_types
          .iter()
          .any(|known| known == &type_name)
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assets::MemoryAssetDatabase;
  use crate::registry::{DistributeDesc, PackageBinding};

  struct Fixture {
    config: PipelineConfig,
    registry: ModuleRegistry,
    flags: FlagSet,
    db: MemoryAssetDatabase,
  }

  impl Fixture {
    fn new() -> Self {
      let mut registry = ModuleRegistry::default();
      registry.add_descriptor(DistributeDesc {
        flag: "Guns".into(),
        ..DistributeDesc::default()
      });
      registry.add_descriptor(DistributeDesc {
        flag: "World".into(),
        ..DistributeDesc::default()
      });
      registry.add_descriptor(DistributeDesc {
        flag: "Extra".into(),
        in_main: true,
        is_optional: true,
        ..DistributeDesc::default()
      });
      registry.add_descriptor(DistributeDesc {
        flag: "Seasonal".into(),
        no_select_no_build: true,
        ..DistributeDesc::default()
      });
      registry.add_descriptor(DistributeDesc {
        flag: "Beta".into(),
        no_select_no_build: true,
        ..DistributeDesc::default()
      });
      registry.add_package(PackageBinding {
        package: "com.example.audio".into(),
        module: "Audio".into(),
        standalone: false,
      });
      registry.add_package(PackageBinding {
        package: "com.example.world".into(),
        module: "World".into(),
        standalone: true,
      });
      Self {
        config: PipelineConfig::default(),
        registry,
        flags: FlagSet::default(),
        db: MemoryAssetDatabase::new(),
      }
    }

    fn classify(&self, asset: &str) -> Result<Classification, SkipReason> {
      Classifier::new(&self.config, &self.registry, &self.flags, &self.db)
        .expect("classifier builds")
        .classify(asset)
    }
  }

  #[test]
  fn classifies_plain_content_root_assets() {
    let fixture = Fixture::new();
    let c = fixture.classify("Assets/CapsRes/sub/foo.txt").unwrap();
    assert_eq!(c.module, "");
    assert_eq!(c.dist, "");
    assert_eq!(c.norm, "sub/foo.txt");
    assert!(c.in_main_package);
    assert!(c.optional_module.is_none());
  }

  #[test]
  fn classifies_module_assets() {
    let fixture = Fixture::new();
    let c = fixture.classify("Assets/Mods/Guns/CapsRes/foo.txt").unwrap();
    assert_eq!(c.module, "Guns");
    assert_eq!(c.dist, "");
    assert_eq!(c.norm, "foo.txt");
    assert!(!c.in_main_package);
  }

  #[test]
  fn extracts_distribution_segments() {
    let fixture = Fixture::new();
    let c = fixture
      .classify("Assets/Mods/Guns/CapsRes/dist/D1/bar.txt")
      .unwrap();
    assert_eq!(c.module, "Guns");
    assert_eq!(c.dist, "D1");
    assert_eq!(c.norm, "bar.txt");

    let c = fixture.classify("Assets/CapsRes/dist/D1/bar.txt").unwrap();
    assert_eq!(c.module, "");
    assert_eq!(c.dist, "D1");
    assert_eq!(c.norm, "bar.txt");
  }

  #[test]
  fn bare_dist_file_keeps_full_normalized_path() {
    let fixture = Fixture::new();
    let c = fixture.classify("Assets/CapsRes/dist/orphan.txt").unwrap();
    assert_eq!(c.dist, "");
    assert_eq!(c.norm, "dist/orphan.txt");
  }

  #[test]
  fn folds_in_main_modules_and_remembers_optional_ones() {
    let fixture = Fixture::new();
    let c = fixture.classify("Assets/Mods/Extra/CapsRes/foo.txt").unwrap();
    assert_eq!(c.module, "");
    assert!(c.in_main_package);
    assert_eq!(c.optional_module.as_deref(), Some("Extra"));
    assert_eq!(c.manifest_module(), "Extra");
  }

  #[test]
  fn modules_without_descriptors_fold_into_main() {
    let fixture = Fixture::new();
    let c = fixture
      .classify("Assets/Mods/Unregistered/CapsRes/foo.txt")
      .unwrap();
    assert_eq!(c.module, "");
    assert!(c.in_main_package);
    assert!(c.optional_module.is_none());
  }

  #[test]
  fn folds_non_standalone_packages_into_main() {
    let fixture = Fixture::new();
    let c = fixture
      .classify("Packages/com.example.audio/CapsRes/bank.txt")
      .unwrap();
    assert_eq!(c.module, "");
    assert!(c.in_main_package);
    assert!(c.optional_module.is_none());
  }

  #[test]
  fn keeps_standalone_packages_as_modules() {
    let fixture = Fixture::new();
    let c = fixture
      .classify("Packages/com.example.world/CapsRes/map.txt")
      .unwrap();
    assert_eq!(c.module, "World");
    assert!(!c.in_main_package);
  }

  #[test]
  fn unbound_packages_have_no_module() {
    let fixture = Fixture::new();
    assert_eq!(
      fixture.classify("Packages/com.unknown/CapsRes/x.txt"),
      Err(SkipReason::EmptyModule)
    );
  }

  #[test]
  fn excludes_unselected_no_select_modules() {
    let mut fixture = Fixture::new();
    let asset = "Assets/Mods/Seasonal/CapsRes/event.txt";
    assert_eq!(
      fixture.classify(asset),
      Err(SkipReason::ModuleExcludedByFlags)
    );

    fixture.flags = FlagSet::new(["seasonal"]);
    let c = fixture.classify(asset).unwrap();
    assert_eq!(c.module, "Seasonal");
  }

  #[test]
  fn excludes_unselected_no_select_distributions() {
    let mut fixture = Fixture::new();
    let asset = "Assets/CapsRes/dist/Beta/new.txt";
    assert_eq!(
      fixture.classify(asset),
      Err(SkipReason::DistributionExcludedByFlags)
    );

    fixture.flags = FlagSet::new(["Beta"]);
    let c = fixture.classify(asset).unwrap();
    assert_eq!(c.dist, "Beta");
  }

  #[test]
  fn rejects_paths_outside_content_roots() {
    let fixture = Fixture::new();
    assert_eq!(
      fixture.classify("Assets/Editor/tool.png"),
      Err(SkipReason::NotUnderContentRoot)
    );
    assert_eq!(
      fixture.classify("Assets/Mods/Guns/Scripts/gun.txt"),
      Err(SkipReason::NotUnderContentRoot)
    );
    assert_eq!(
      fixture.classify("Assets/Mods/Guns"),
      Err(SkipReason::CannotParseModule)
    );
  }

  #[test]
  fn rejects_filtered_assets_before_parsing() {
    let mut fixture = Fixture::new();
    fixture.db.add_directory("Assets/CapsRes/sub");
    fixture
      .db
      .set_scriptable_type("Assets/CapsRes/light.asset", "LightingDataAsset");
    fixture.config.ignore_patterns = vec!["(?i)/wip/".into()];

    assert_eq!(fixture.classify(""), Err(SkipReason::EmptyPath));
    assert_eq!(
      fixture.classify("Assets/CapsRes/sub"),
      Err(SkipReason::Directory)
    );
    assert_eq!(
      fixture.classify("Assets/CapsRes/Logic.cs"),
      Err(SkipReason::Script)
    );
    assert_eq!(
      fixture.classify("Assets/CapsRes/shader.hlsl"),
      Err(SkipReason::IgnoredByExtension)
    );
    assert_eq!(
      fixture.classify("Assets/CapsRes/light.asset"),
      Err(SkipReason::IgnoredByScriptableType)
    );
    assert_eq!(
      fixture.classify("Assets/CapsRes/wip/tmp.txt"),
      Err(SkipReason::IgnoredByFilter)
    );
  }
}
