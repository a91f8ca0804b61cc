//! Source-language operator and keyword tokens plus their TypeScript
//! spellings.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Binary operators as they appear in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

/// Unary operators. `Addr` is the address operator `&x`; `Recv` is the
/// channel receive arrow `<-x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    Xor,
    Addr,
    Recv,
}

/// Assignment tokens. `Define` is the short declaration `:=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Define,
    Assign,
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
}

/// Branch statement keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchTok {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

/// Keyword of a general declaration group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclTok {
    Import,
    Const,
    Var,
    Type,
}

/// Channel directionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

static BINARY_OPERATORS: Lazy<HashMap<BinaryOp, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(BinaryOp::Add, "+");
    m.insert(BinaryOp::Sub, "-");
    m.insert(BinaryOp::Mul, "*");
    m.insert(BinaryOp::Quo, "/");
    m.insert(BinaryOp::Rem, "%");
    m.insert(BinaryOp::And, "&");
    m.insert(BinaryOp::Or, "|");
    m.insert(BinaryOp::Xor, "^");
    m.insert(BinaryOp::Shl, "<<");
    m.insert(BinaryOp::Shr, ">>");
    m.insert(BinaryOp::LAnd, "&&");
    m.insert(BinaryOp::LOr, "||");
    m.insert(BinaryOp::Eql, "==");
    m.insert(BinaryOp::Neq, "!=");
    m.insert(BinaryOp::Lss, "<");
    m.insert(BinaryOp::Leq, "<=");
    m.insert(BinaryOp::Gtr, ">");
    m.insert(BinaryOp::Geq, ">=");
    m
});

static ASSIGN_OPERATORS: Lazy<HashMap<AssignOp, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(AssignOp::Assign, "=");
    m.insert(AssignOp::Add, "+=");
    m.insert(AssignOp::Sub, "-=");
    m.insert(AssignOp::Mul, "*=");
    m.insert(AssignOp::Quo, "/=");
    m.insert(AssignOp::Rem, "%=");
    m.insert(AssignOp::And, "&=");
    m.insert(AssignOp::Or, "|=");
    m.insert(AssignOp::Xor, "^=");
    m.insert(AssignOp::Shl, "<<=");
    m.insert(AssignOp::Shr, ">>=");
    m
});

impl BinaryOp {
    /// TypeScript spelling of the operator. `AndNot` has no direct
    /// equivalent and is rewritten by the expression emitter.
    pub fn to_ts(self) -> Option<&'static str> {
        BINARY_OPERATORS.get(&self).copied()
    }
}

impl AssignOp {
    /// TypeScript spelling of the assignment operator. `Define` and
    /// `AndNot` are handled structurally by the assignment emitter.
    pub fn to_ts(self) -> Option<&'static str> {
        ASSIGN_OPERATORS.get(&self).copied()
    }
}
