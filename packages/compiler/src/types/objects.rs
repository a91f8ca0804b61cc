//! Semantic objects: the named entities declarations create. One arena per
//! loaded program, indexed by [`ObjectId`], so identity survives across
//! package boundaries.

use serde::{Deserialize, Serialize};

use super::typ::TypeId;

/// Index into the program's object arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

/// An evaluated constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// Complex constants have no TypeScript literal form; the display
    /// string is emitted inside a placeholder comment.
    Complex(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKind {
    Const {
        value: ConstValue,
    },
    Var {
        /// True for function and method parameters (including results).
        #[serde(default)]
        param: bool,
        /// True for struct fields.
        #[serde(default)]
        field: bool,
    },
    Func {
        /// Receiver type for methods; `None` for plain functions.
        #[serde(default)]
        recv: Option<TypeId>,
    },
    TypeName,
    PkgName {
        imported: String,
    },
    Builtin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    /// Declaring package path; `None` for universe-scope objects.
    #[serde(default)]
    pub pkg: Option<String>,
    pub typ: TypeId,
    pub kind: ObjectKind,
}

impl Object {
    pub fn is_const(&self) -> bool {
        matches!(self.kind, ObjectKind::Const { .. })
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, ObjectKind::Var { .. })
    }

    pub fn is_param(&self) -> bool {
        matches!(self.kind, ObjectKind::Var { param: true, .. })
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, ObjectKind::Func { .. })
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, ObjectKind::Func { recv: Some(_) })
    }

    pub fn is_pkg_name(&self) -> bool {
        matches!(self.kind, ObjectKind::PkgName { .. })
    }

    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.kind {
            ObjectKind::Const { value } => Some(value),
            _ => None,
        }
    }

    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(|c| c.is_uppercase())
    }
}
