#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod archive;
pub mod assets;
pub mod checker;
pub mod classify;
pub mod config;
pub mod hooks;
pub mod models;
pub mod naming;
pub mod persist;
pub mod plan;
pub mod registry;

pub use assets::{AssetDatabase, MemoryAssetDatabase};
pub use checker::{check_plan, CheckReport};
pub use classify::{Classification, Classifier, SkipReason};
pub use config::PipelineConfig;
pub use hooks::BuildHook;
pub use models::{BuildPlan, BuildWork, BundleBuild, Manifest};
pub use naming::ResourceKey;
pub use plan::{generate_build_plan, PlanStep, PlanTask};
pub use registry::{FlagSet, ModuleRegistry};
