//! Data model for the source language: syntax trees, tokens and positions.
//!
//! The shapes mirror the Go syntax tree the export front end serializes.
//! Every node carries a [`NodeId`] that keys the type-information and
//! analysis tables, plus a byte [`Pos`] resolved through the package's
//! shared [`position::FileSet`].

pub mod ast;
pub mod position;
pub mod token;

pub use ast::*;
pub use position::{FileSet, Pos, Position, NO_POS};
pub use token::{AssignOp, BinaryOp, BranchTok, ChanDir, DeclTok, UnaryOp};

use serde::{Deserialize, Serialize};

/// Stable identity of a syntax node within a loaded program.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);
