//! Node-level analysis results.
//!
//! ExpressionData holds everything the code generator reads back from
//! analysis, keyed by NodeId: expression types, where blocks stop emitting,
//! how each call dispatches, and which declaration each name resolved to.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::frontend::{NodeId, Symbol};
use crate::sema::scope::{Binding, FunctionDef};
use crate::sema::types::{StructInstance, TraitInstance, Type};

/// How a call expression dispatches.
#[derive(Debug, Clone)]
pub enum CallTarget {
    /// Free function, called by name or path
    Function(Rc<FunctionDef>),
    /// `Type.method(..)` on a method without receiver
    StaticMethod {
        owner: Rc<StructInstance>,
        method: Rc<FunctionDef>,
    },
    /// `value.method(..)` resolved statically
    InstanceMethod {
        receiver: Type,
        method: Rc<FunctionDef>,
    },
    /// Method of a trait called on a dyn value or bounded generic
    DynMethod {
        trait_ref: Rc<TraitInstance>,
        method: Symbol,
    },
    /// Closure or other function-typed value
    Value,
}

/// Encapsulates all NodeId-keyed metadata from semantic analysis.
#[derive(Debug, Default, Clone)]
pub struct ExpressionData {
    /// Type of each expression node
    types: FxHashMap<NodeId, Type>,
    /// Index of the statement after which a block stops emitting
    block_stops: FxHashMap<NodeId, usize>,
    /// Dispatch of each call expression
    calls: FxHashMap<NodeId, CallTarget>,
    /// Declaration each identifier or path expression resolved to
    symbols: FxHashMap<NodeId, Rc<Binding>>,
    /// Instance built by each struct literal
    instances: FxHashMap<NodeId, Rc<StructInstance>>,
}

impl ExpressionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the type of an expression by its NodeId
    pub fn get_type(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    pub fn set_type(&mut self, node: NodeId, ty: Type) {
        self.types.insert(node, ty);
    }

    /// Statement index (inclusive) where emission stops for a truncated block
    pub fn block_stop(&self, block: NodeId) -> Option<usize> {
        self.block_stops.get(&block).copied()
    }

    pub fn set_block_stop(&mut self, block: NodeId, index: usize) {
        self.block_stops.insert(block, index);
    }

    pub fn get_call(&self, node: NodeId) -> Option<&CallTarget> {
        self.calls.get(&node)
    }

    pub fn set_call(&mut self, node: NodeId, target: CallTarget) {
        self.calls.insert(node, target);
    }

    pub fn get_symbol(&self, node: NodeId) -> Option<&Rc<Binding>> {
        self.symbols.get(&node)
    }

    pub fn set_symbol(&mut self, node: NodeId, binding: Rc<Binding>) {
        self.symbols.insert(node, binding);
    }

    pub fn get_instance(&self, node: NodeId) -> Option<&Rc<StructInstance>> {
        self.instances.get(&node)
    }

    pub fn set_instance(&mut self, node: NodeId, instance: Rc<StructInstance>) {
        self.instances.insert(node, instance);
    }

    pub fn types(&self) -> &FxHashMap<NodeId, Type> {
        &self.types
    }

    pub fn calls(&self) -> &FxHashMap<NodeId, CallTarget> {
        &self.calls
    }
}
