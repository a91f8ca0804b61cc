//! Per-package type-information tables keyed by syntax node.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::objects::{ConstValue, ObjectId};
use super::typ::TypeId;
use crate::source::NodeId;

/// Resolved type of an expression, plus its value when the expression is
/// constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeAndValue {
    pub typ: TypeId,
    #[serde(default)]
    pub value: Option<ConstValue>,
}

/// Type information for one package, as computed by the external checker.
/// All tables are total on the nodes they claim to cover; lookups for any
/// other node answer `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Identifier occurrences resolved to the object they refer to.
    #[serde(default)]
    pub uses: HashMap<NodeId, ObjectId>,
    /// Declaration sites mapped to the freshly created object.
    #[serde(default)]
    pub defs: HashMap<NodeId, ObjectId>,
    /// Expression nodes mapped to their resolved type and constant value.
    #[serde(default)]
    pub types: HashMap<NodeId, TypeAndValue>,
}

impl TypeInfo {
    /// Looks up the object an identifier refers to, consulting `uses`
    /// first and falling back to `defs`, mirroring `ObjectOf` in the
    /// source language's checker API.
    pub fn object_of(&self, node: NodeId) -> Option<ObjectId> {
        self.uses.get(&node).or_else(|| self.defs.get(&node)).copied()
    }

    pub fn type_of(&self, node: NodeId) -> Option<TypeId> {
        self.types.get(&node).map(|tv| tv.typ)
    }

    pub fn const_of(&self, node: NodeId) -> Option<&ConstValue> {
        self.types.get(&node).and_then(|tv| tv.value.as_ref())
    }
}
