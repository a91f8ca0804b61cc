//! Semantic model: types, objects and the per-package type-information
//! tables produced by the external type checker.

pub mod info;
pub mod objects;
pub mod typ;

pub use info::{TypeAndValue, TypeInfo};
pub use objects::{ConstValue, Object, ObjectId, ObjectKind};
pub use typ::{BasicKind, IfaceMethod, StructField, Type, TypeId};
