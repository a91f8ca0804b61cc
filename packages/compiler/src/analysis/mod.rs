//! Whole-package semantic analysis.
//!
//! Runs after the full closure is loaded and before any emission. The
//! async fixed point ([`async_prop`]) is program-wide; everything else
//! ([`var_ref`], [`blocks`]) is computed per package. The resulting tables
//! are write-once: emitters only read them, and queries for unknown keys
//! answer the defined default (`false` / `None`).

pub mod async_prop;
pub mod blocks;
pub mod var_ref;
mod walk;

use std::collections::HashMap;

use bitflags::bitflags;
use indexmap::IndexMap;

pub use async_prop::{analyze_async, AsyncInfo, AsyncSeeds};
pub use walk::Walker;

use crate::loader::{Package, Program};
use crate::source::NodeId;
use crate::types::ObjectId;

bitflags! {
    /// Per-object annotation bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u8 {
        /// The variable's address is taken; its declaration becomes a
        /// reference cell and every value access goes through `!.value`.
        const NEEDS_VAR_REF = 1 << 0;
        /// Pointer variable known to hold a reference cell (it was
        /// assigned `&v` of a reified variable).
        const VAR_REF_ALIAS = 1 << 1;
        /// Method receiver is referenced inside the body.
        const RECEIVER_USED = 1 << 2;
    }
}

bitflags! {
    /// Per-node annotation bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Block must open with a disposable-stack acquisition.
        const NEEDS_DEFER_STACK = 1 << 0;
        /// Node sits inside an async function or function literal.
        const IN_ASYNC_CONTEXT = 1 << 1;
    }
}

/// Rebinding of names already visible from an outer scope inside a
/// short-scoped construct. Maps each shadowed name to the outer object and
/// the temporary the emitter lifts it into.
#[derive(Debug, Clone, Default)]
pub struct ShadowingInfo {
    pub entries: IndexMap<String, ShadowedVar>,
}

#[derive(Debug, Clone)]
pub struct ShadowedVar {
    pub outer: ObjectId,
    pub temp: String,
}

/// Read-only annotation table for one package.
#[derive(Debug, Default)]
pub struct Analysis {
    object_flags: HashMap<ObjectId, ObjectFlags>,
    node_flags: HashMap<NodeId, NodeFlags>,
    shadowing: HashMap<NodeId, ShadowingInfo>,
    /// Plain short declarations that re-bind a visible name: the fresh
    /// binding is renamed to a deterministic temporary so its initializer
    /// can still read the outer value without tripping the target
    /// language's dead zone.
    rebinds: HashMap<NodeId, Vec<(ObjectId, String)>>,
    /// Bare `return` statements mapped to the enclosing function's named
    /// result list.
    bare_returns: HashMap<NodeId, Vec<String>>,
}

impl Analysis {
    pub(crate) fn set_object_flag(&mut self, obj: ObjectId, flag: ObjectFlags) {
        *self.object_flags.entry(obj).or_default() |= flag;
    }

    pub(crate) fn set_node_flag(&mut self, node: NodeId, flag: NodeFlags) {
        *self.node_flags.entry(node).or_default() |= flag;
    }

    pub(crate) fn set_shadowing(&mut self, node: NodeId, info: ShadowingInfo) {
        self.shadowing.insert(node, info);
    }

    pub(crate) fn set_rebinds(&mut self, node: NodeId, renames: Vec<(ObjectId, String)>) {
        self.rebinds.insert(node, renames);
    }

    pub(crate) fn set_bare_return(&mut self, node: NodeId, names: Vec<String>) {
        self.bare_returns.insert(node, names);
    }

    pub fn needs_var_ref(&self, obj: ObjectId) -> bool {
        self.object_flags
            .get(&obj)
            .is_some_and(|f| f.contains(ObjectFlags::NEEDS_VAR_REF))
    }

    pub fn is_var_ref_alias(&self, obj: ObjectId) -> bool {
        self.object_flags
            .get(&obj)
            .is_some_and(|f| f.contains(ObjectFlags::VAR_REF_ALIAS))
    }

    pub fn is_receiver_used(&self, method: ObjectId) -> bool {
        self.object_flags
            .get(&method)
            .is_some_and(|f| f.contains(ObjectFlags::RECEIVER_USED))
    }

    pub fn needs_defer_stack(&self, block: NodeId) -> bool {
        self.node_flags
            .get(&block)
            .is_some_and(|f| f.contains(NodeFlags::NEEDS_DEFER_STACK))
    }

    pub fn in_async_context(&self, node: NodeId) -> bool {
        self.node_flags
            .get(&node)
            .is_some_and(|f| f.contains(NodeFlags::IN_ASYNC_CONTEXT))
    }

    pub fn shadowing(&self, node: NodeId) -> Option<&ShadowingInfo> {
        self.shadowing.get(&node)
    }

    pub fn rebinds(&self, node: NodeId) -> Option<&[(ObjectId, String)]> {
        self.rebinds.get(&node).map(|v| v.as_slice())
    }

    pub fn bare_return_names(&self, node: NodeId) -> Option<&[String]> {
        self.bare_returns.get(&node).map(|v| v.as_slice())
    }
}

/// Computes the per-package annotation table. The program-wide async
/// fixed point must already be available.
pub fn analyze_package(program: &Program, pkg: &Package, async_info: &AsyncInfo) -> Analysis {
    let mut analysis = Analysis::default();
    var_ref::analyze(program, pkg, &mut analysis);
    blocks::analyze(program, pkg, async_info, &mut analysis);
    analysis
}
