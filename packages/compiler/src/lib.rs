#![deny(clippy::all)]

//! Whole-program Go to TypeScript compiler.
//!
//! The compiler consumes fully type-checked Go syntax trees (produced by an
//! external export front end, see [`loader`]), runs whole-package semantic
//! analysis ([`analysis`]) and emits asynchronous, promise-based TypeScript
//! ([`codegen`]) that targets the `@goty/builtin` runtime, imported as `$`
//! in every generated file.

pub mod analysis;
pub mod codegen;
pub mod compiler;
mod config;
mod error;
pub mod loader;
pub mod overlay;
pub mod source;
pub mod testing;
pub mod types;
pub mod util;

pub use compiler::{CompilationResult, Compiler};
pub use config::Config;
pub use error::{Error, Result};
pub use loader::Program;
