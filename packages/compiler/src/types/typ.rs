//! Resolved types. All types of a loaded program live in one arena indexed
//! by [`TypeId`]; named types reference their declaring object and their
//! underlying type by id, which keeps cyclic types (a struct containing a
//! slice of itself) representable without ownership knots.

use serde::{Deserialize, Serialize};

use super::objects::ObjectId;
use crate::source::token::ChanDir;

/// Index into the program's type arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn is_numeric(self) -> bool {
        use BasicKind::*;
        matches!(
            self,
            Int | Int8
                | Int16
                | Int32
                | Int64
                | Uint
                | Uint8
                | Uint16
                | Uint32
                | Uint64
                | Uintptr
                | Float32
                | Float64
                | Complex64
                | Complex128
                | UntypedInt
                | UntypedRune
                | UntypedFloat
                | UntypedComplex
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    /// Go spelling of the kind, used in runtime type descriptors.
    pub fn name(self) -> &'static str {
        use BasicKind::*;
        match self {
            Bool | UntypedBool => "bool",
            Int | UntypedInt => "int",
            Int8 => "int8",
            Int16 => "int16",
            Int32 | UntypedRune => "int32",
            Int64 => "int64",
            Uint => "uint",
            Uint8 => "uint8",
            Uint16 => "uint16",
            Uint32 => "uint32",
            Uint64 => "uint64",
            Uintptr => "uintptr",
            Float32 => "float32",
            Float64 | UntypedFloat => "float64",
            Complex64 => "complex64",
            Complex128 | UntypedComplex => "complex128",
            String | UntypedString => "string",
            UnsafePointer => "unsafe.Pointer",
            UntypedNil => "nil",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub typ: TypeId,
    #[serde(default)]
    pub embedded: bool,
    #[serde(default)]
    pub exported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfaceMethod {
    pub name: String,
    pub sig: TypeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    Invalid,
    Basic {
        basic: BasicKind,
    },
    Named {
        name: String,
        /// Declaring package path; `None` for universe types like `error`.
        #[serde(default)]
        pkg: Option<String>,
        #[serde(default)]
        obj: Option<ObjectId>,
        underlying: TypeId,
        /// Method objects declared on this type (value and pointer
        /// receivers alike).
        #[serde(default)]
        methods: Vec<ObjectId>,
    },
    Pointer {
        elem: TypeId,
    },
    Slice {
        elem: TypeId,
    },
    Array {
        elem: TypeId,
        len: u64,
    },
    Map {
        key: TypeId,
        value: TypeId,
    },
    Chan {
        dir: ChanDir,
        elem: TypeId,
    },
    Struct {
        #[serde(default)]
        fields: Vec<StructField>,
    },
    Interface {
        #[serde(default)]
        methods: Vec<IfaceMethod>,
    },
    Signature {
        #[serde(default)]
        recv: Option<TypeId>,
        #[serde(default)]
        params: Vec<TypeId>,
        #[serde(default)]
        results: Vec<TypeId>,
        #[serde(default)]
        variadic: bool,
    },
    Tuple {
        #[serde(default)]
        types: Vec<TypeId>,
    },
    TypeParam {
        constraint: TypeId,
    },
}

impl Type {
    pub fn as_basic(&self) -> Option<BasicKind> {
        match self {
            Type::Basic { basic } => Some(*basic),
            _ => None,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, Type::Interface { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct { .. })
    }
}
