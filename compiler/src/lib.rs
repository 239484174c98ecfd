// pclc — PCL compiler
//
// Library root. Passes run in order: lexer, parser, resolve, type_infer,
// analyze (arrow components) or lir (do-block components), codegen. The
// pipeline module drives them; the binary in main.rs is a thin CLI shell.

pub mod analyze;
pub mod ast;
pub mod codegen;
pub mod diag;
pub mod hir;
pub mod id;
pub mod lexer;
pub mod lir;
pub mod parser;
pub mod pass;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod scope;
pub mod signal;
pub mod type_infer;
