// src/sema/mod.rs
pub mod analyzer;
pub mod compatibility;
pub mod compilation_db;
pub mod expression_data;
pub mod generic;
pub mod implement_registry;
pub mod instance_cache;
pub mod prelude;
pub mod query;
pub mod resolve;
pub mod scope;
pub mod types;

pub use analyzer::{AbortedAnalysis, AnalysisContext, Analyzer, ImportedModule, ModuleAnalysis};
pub use compatibility::{matches, strict_matches};
pub use compilation_db::{CompilationDb, SharedDb};
pub use expression_data::{CallTarget, ExpressionData};
pub use implement_registry::{ImplementRegistry, MethodImpl, MethodKey, RegistryDiagnostic};
pub use instance_cache::{InstanceCache, SharedInstances};
pub use prelude::Builtins;
pub use query::{InlayHint, ModuleQuery, SymbolIndex};
pub use scope::{Binding, BindingKind, ModuleInterface, ScopeId};
pub use types::{FlowStatus, FunctionType, StructDef, StructInstance, TraitDef, Type, TypeKind};
