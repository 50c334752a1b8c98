//! Module/distribution descriptors, package bindings and the selected-flag set.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Descriptor attached to a module or distribution flag.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DistributeDesc {
  /// Display-cased flag name.
  pub flag: String,
  /// The module's assets are physically folded into the main package.
  pub in_main: bool,
  /// The module is optional at runtime; folded assets still get their own manifest.
  pub is_optional: bool,
  /// Exclude the flag entirely unless it is explicitly selected.
  pub no_select_no_build: bool,
}

/// Binding between an external package and the module it contributes content for.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageBinding {
  /// Package identifier as it appears under the package root.
  pub package: String,
  /// Module name the package's content belongs to.
  pub module: String,
  /// Treat the package as a standalone module rather than main-package content.
  pub standalone: bool,
}

/// On-disk layout of a registry file.
#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
  #[serde(default)]
  descriptors: Vec<DistributeDesc>,
  #[serde(default)]
  packages: Vec<PackageBinding>,
  #[serde(default)]
  dist_flags: Vec<String>,
}

/// Errors that can occur while loading a registry file.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// Failed to read the registry file from disk.
  #[error("failed to read {}: {source}", path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// Failed to parse the JSON registry file.
  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
}

/// The canonical list of modules, packages and distribution flags known to a project.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
  descriptors: BTreeMap<String, DistributeDesc>,
  packages: Vec<PackageBinding>,
  modules: Vec<String>,
  dist_flags: Vec<String>,
}

impl ModuleRegistry {
  /// Load a registry description from a JSON file; a missing file yields an empty registry.
  pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
      Ok(contents) => contents,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        return Ok(Self::default());
      }
      Err(err) => {
        return Err(RegistryError::Io {
          path: path.to_path_buf(),
          source: err,
        });
      }
    };

    let file: RegistryFile =
      serde_json::from_str(&contents).map_err(|err| RegistryError::Parse {
        path: path.to_path_buf(),
        source: err,
      })?;
    Ok(Self::from(file))
  }

  /// Register a module or distribution descriptor.
  pub fn add_descriptor(&mut self, desc: DistributeDesc) {
    if desc.flag.is_empty() {
      return;
    }
    if !self.modules.iter().any(|known| known == &desc.flag) {
      self.modules.push(desc.flag.clone());
    }
    self.descriptors.insert(desc.flag.to_lowercase(), desc);
  }

  /// Register a package-to-module binding.
  pub fn add_package(&mut self, binding: PackageBinding) {
    if binding.package.is_empty() || binding.module.is_empty() {
      return;
    }
    if !self.modules.iter().any(|known| known == &binding.module) {
      self.modules.push(binding.module.clone());
    }
    self.packages.push(binding);
  }

  /// Register a distribution flag name for archive-key recovery.
  pub fn add_dist_flag(&mut self, flag: impl Into<String>) {
    let flag = flag.into();
    if !flag.is_empty() && !self.dist_flags.iter().any(|known| known == &flag) {
      self.dist_flags.push(flag);
    }
  }

  /// Descriptor for a module or distribution flag, matched case-insensitively.
  pub fn descriptor(&self, flag: &str) -> Option<&DistributeDesc> {
    self.descriptors.get(&flag.to_lowercase())
  }

  /// The module a package contributes content for.
  pub fn package_module(&self, package: &str) -> Option<&str> {
    self
      .packages
      .iter()
      .find(|binding| binding.package == package)
      .map(|binding| binding.module.as_str())
  }

  /// The package backing a module, when the module comes from the package root.
  pub fn module_package(&self, module: &str) -> Option<&PackageBinding> {
    self
      .packages
      .iter()
      .find(|binding| binding.module.eq_ignore_ascii_case(module))
  }

  /// Whether a package ships as its own module instead of main-package content.
  pub fn package_treated_as_module(&self, package: &str) -> bool {
    self
      .packages
      .iter()
      .any(|binding| binding.package == package && binding.standalone)
  }

  /// All known module names in registration order, display-cased.
  pub fn modules(&self) -> &[String] {
    &self.modules
  }

  /// Registered distribution flag names in registration order.
  pub fn dist_flags(&self) -> &[String] {
    &self.dist_flags
  }

  /// Recover the display-cased module name from an arbitrarily-cased token.
  pub fn true_cased_module(&self, name: &str) -> Option<&str> {
    self
      .modules
      .iter()
      .find(|known| known.eq_ignore_ascii_case(name))
      .map(String::as_str)
  }
}

impl From<RegistryFile> for ModuleRegistry {
  fn from(file: RegistryFile) -> Self {
    let mut registry = Self::default();
    for desc in file.descriptors {
      registry.add_descriptor(desc);
    }
    for binding in file.packages {
      registry.add_package(binding);
    }
    for flag in file.dist_flags {
      registry.add_dist_flag(flag);
    }
    registry
  }
}

/// Ordered set of selected distribution/module flags, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
  order: Vec<String>,
  lowered: BTreeSet<String>,
}

impl FlagSet {
  /// Build a flag set from the caller's selection, preserving order and dropping blanks.
  pub fn new(flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
    let mut set = Self::default();
    for flag in flags {
      let flag = flag.into();
      let trimmed = flag.trim();
      if trimmed.is_empty() {
        continue;
      }
      if set.lowered.insert(trimmed.to_lowercase()) {
        set.order.push(trimmed.to_string());
      }
    }
    set
  }

  /// Whether the flag is selected, ignoring case.
  pub fn contains(&self, flag: &str) -> bool {
    self.lowered.contains(&flag.to_lowercase())
  }

  /// The selected flags in the order they were supplied.
  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.order.iter().map(String::as_str)
  }

  /// True when no flag is selected.
  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }
}
