//! Final assembly of grouped assets into per-module build work.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::warn;

use crate::hooks::BuildHook;
use crate::models::{BuildPlan, BuildWork, BundleBuild, Manifest};

/// Turn the planner's groupings into a [`BuildPlan`].
///
/// Bundle indices follow the grouping's insertion order. Manifests attach to
/// the module that builds their assets; manifests whose module has no build
/// work of its own (optional modules folded into the main package) ride along
/// with the main module's work. The last step runs every hook's
/// `generate_build_work` over every bundle.
pub fn combine(
  mod2build: BTreeMap<String, IndexMap<String, Vec<String>>>,
  mut mod2mani: BTreeMap<String, BTreeMap<String, Manifest>>,
  hooks: &mut [Box<dyn BuildHook>],
) -> BuildPlan {
  warn_on_cross_module_collisions(&mod2build);

  let mut plan = BuildPlan::new();
  for (module, bundles) in mod2build {
    let mut work = BuildWork::default();
    for (name, assets) in bundles {
      work.bundles.push(BundleBuild::new(name, assets));
    }
    if let Some(manifests) = mod2mani.remove(&module) {
      work.manifests.extend(manifests.into_values());
    }
    plan.insert(module, work);
  }

  if !mod2mani.is_empty() {
    let main = plan.entry(String::new()).or_default();
    for manifests in mod2mani.into_values() {
      main.manifests.extend(manifests.into_values());
    }
  }

  for work in plan.values_mut() {
    for index in 0..work.bundles.len() {
      // Detach the bundle so hooks can mutate it and the surrounding work at
      // the same time.
      let mut bundle = std::mem::take(&mut work.bundles[index]);
      for hook in hooks.iter_mut() {
        hook.generate_build_work(&mut bundle, work, index);
      }
      work.bundles[index] = bundle;
    }
  }

  plan
}

/// The default naming scheme only collides across modules when two modules
/// resolve to the same name, which breaks artifact bookkeeping downstream.
fn warn_on_cross_module_collisions(mod2build: &BTreeMap<String, IndexMap<String, Vec<String>>>) {
  let mut owners: BTreeMap<String, &str> = BTreeMap::new();
  for (module, bundles) in mod2build {
    for bundle in bundles.keys() {
      let key = bundle.to_lowercase();
      match owners.get(key.as_str()) {
        Some(owner) if *owner != module.as_str() => {
          warn!(
            bundle = bundle.as_str(),
            first = owner,
            second = module.as_str(),
            "bundle name collides across modules"
          );
        }
        Some(_) => {}
        None => {
          owners.insert(key, module);
        }
      }
    }
  }
}
