//! Semantic middle-end of the CA compiler.
//!
//! This crate provides:
//! - `AstBuilder` - the constructor surface the external parser drives
//! - `CompilerContext` - interner, scopes, types and options in one
//!   explicitly threaded bundle
//! - expression inference/determination (`infer`)
//! - the method/trait/domain resolver (`resolver`)
//! - function-name mangling (`mangle`)
//! - `Emitter` - the two-pass AST → IR lowering driver
//! - `CompileOptions` - the driver configuration surface

pub mod build;
pub mod context;
pub mod emit;
pub mod infer;
pub mod mangle;
pub mod options;
pub mod resolver;

pub use build::AstBuilder;
pub use context::CompilerContext;
pub use emit::{Emitter, OperandKind, OperandValue};
pub use options::{CompileOptions, EmitKind, OptLevel};

use ca_ast::arena::RootTree;
use ca_backend::Backend;
use ca_common::diagnostics::CaResult;

/// Run both lowering passes over a finished program.
pub fn lower(ctx: &mut CompilerContext, backend: &mut dyn Backend, tree: &RootTree) -> CaResult<()> {
    Emitter::new(ctx, backend).walk(tree)
}
