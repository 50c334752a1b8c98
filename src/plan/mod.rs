//! Build-pass planning: classify every asset, group assets into bundles and
//! manifests, and assemble per-module build work.

mod combine;
mod task;

use std::path::Path;

use crate::assets::AssetDatabase;
use crate::classify::Classifier;
use crate::config::{ConfigError, PipelineConfig};
use crate::hooks::BuildHook;
use crate::models::BuildPlan;
use crate::registry::{FlagSet, ModuleRegistry};

pub use task::{AssetOutcome, PlanStep, PlanTask};

/// Run a full planning pass in one call.
///
/// Equivalent to constructing a [`PlanTask`], pumping [`PlanTask::advance`]
/// until it reports [`PlanStep::Finished`] and calling [`PlanTask::finish`].
/// Callers that want per-asset progress or cancellation drive the task
/// themselves instead.
pub fn generate_build_plan(
  config: &PipelineConfig,
  registry: &ModuleRegistry,
  flags: &FlagSet,
  db: &dyn AssetDatabase,
  hooks: &mut [Box<dyn BuildHook>],
  output_dir: &Path,
) -> Result<BuildPlan, ConfigError> {
  let classifier = Classifier::new(config, registry, flags, db)?;
  let mut task = PlanTask::new(classifier, hooks, output_dir);
  while !matches!(task.advance(), PlanStep::Finished) {}
  Ok(task.finish())
}
