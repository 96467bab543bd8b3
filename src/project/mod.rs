// src/project/mod.rs
//
// Project-level plumbing around the analyzer: the manifest, module
// sources, the import graph and the per-variant passes.

pub mod analysis_cache;
pub mod bootstrap;
pub mod config;
pub mod driver;
pub mod graph;
pub mod provider;

pub use analysis_cache::{AnalysisCache, ModuleOutcome, ModuleResult};
pub use bootstrap::Bootstrap;
pub use config::{BuildVariant, ProjectConfig};
pub use driver::{CompileOutput, PassOutput, Project};
pub use graph::{ImportEdge, ImportTarget, ModuleGraph};
pub use provider::{FsProvider, MemoryProvider, SourceProvider};
