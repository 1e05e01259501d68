//! `splc`: a compiler for SPL, a small statically-typed imperative
//! language, targeting x86-64 NASM assembly.
//!
//! The pipeline is six free functions, one per phase, threaded through a
//! `Program` and a `SymbolTables` value: [`lex`], [`parse`],
//! [`build_symbols`], [`typecheck`], [`allocate`], [`codegen`]. [`compile`]
//! and [`compile_config`] drive all six phases in order; this is the only
//! supported entry point for embedders. The CLI binary (`main.rs`) is the
//! only caller that converts a [`CompileError`] into a process exit code.

pub mod alloc;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod symbol_builder;
pub mod symbols;
pub mod token;
pub mod typecheck;

use std::io::Write;

pub use ast::Program;
pub use config::CompilerConfig;
pub use diagnostics::CompileError;
pub use symbols::SymbolTables;
pub use token::TokenStream;

pub fn lex(source: &[u8]) -> Result<TokenStream, CompileError> {
    lexer::lex(source)
}

pub fn parse(tokens: TokenStream) -> Result<Program, CompileError> {
    parser::parse(tokens)
}

pub fn build_symbols(program: &Program) -> Result<SymbolTables, CompileError> {
    symbol_builder::build(program)
}

pub fn typecheck(program: &mut Program, symbols: &SymbolTables) -> Result<(), CompileError> {
    typecheck::check_program(program, symbols)
}

pub fn allocate(program: &Program, symbols: &mut SymbolTables) -> Result<(), CompileError> {
    alloc::allocate(program, symbols)
}

pub fn codegen(
    program: &Program,
    symbols: &SymbolTables,
    config: &CompilerConfig,
    out: &mut impl Write,
) -> Result<(), CompileError> {
    let text = codegen::codegen_program(program, symbols, config)?;
    out.write_all(text.as_bytes())
        .map_err(|e| CompileError::internal(format!("failed writing output: {}", e)))
}

/// Compile `source` (raw SPL bytes, NUL-terminated) end to end, writing
/// NASM text to `out`.
pub fn compile(source: &[u8], out: &mut impl Write) -> Result<(), CompileError> {
    compile_config(source, &CompilerConfig::new(), out)
}

/// As [`compile`], with an explicit [`CompilerConfig`] for embedders.
pub fn compile_config(
    source: &[u8],
    config: &CompilerConfig,
    out: &mut impl Write,
) -> Result<(), CompileError> {
    let tokens = lex(source)?;
    let mut program = parse(tokens)?;
    let mut symbols = build_symbols(&program)?;
    typecheck(&mut program, &symbols)?;
    allocate(&program, &mut symbols)?;
    codegen(&program, &symbols, config, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_empty_main_to_valid_header() {
        let mut out = Vec::new();
        compile(b"proc main() { }\0", &mut out).unwrap();
        let asm = String::from_utf8(out).unwrap();
        assert!(asm.starts_with("section .text\n"));
        assert!(asm.contains("global main"));
        assert!(asm.contains("main:"));
    }

    #[test]
    fn reports_the_first_error_and_stops() {
        let mut out = Vec::new();
        let err = compile(b"proc main() { x := 1; }\0", &mut out).unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn compile_config_threads_line_comments() {
        let mut out = Vec::new();
        let config = CompilerConfig::new().with_line_comments(true);
        compile_config(b"proc main() { var x: int; x := 1; }\0", &config, &mut out).unwrap();
        let asm = String::from_utf8(out).unwrap();
        assert!(asm.contains("; line"));
    }
}
