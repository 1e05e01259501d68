//! Top-level driver: NASM header, one `global`/body/`extern` per procedure.

use std::fmt::Write as _;

use crate::alloc::round_up_16;
use crate::ast::{Program, ProcDecl};
use crate::config::CompilerConfig;
use crate::symbols::{Symbol, SymbolTables};

use super::error::CodeGenError;
use super::frame::CodeGen;
use super::statements::gen_stmts;

/// Built-ins every generated program may call.
const EXTERN_BUILTINS: &[&str] = &["printi", "printc", "readi", "readc", "exit", "time_"];

pub fn codegen_program(
    program: &Program,
    tables: &SymbolTables,
    config: &CompilerConfig,
) -> Result<String, CodeGenError> {
    let mut cg = CodeGen::new(tables, config.emit_line_comments);

    writeln!(cg.output, "section .text")?;
    writeln!(cg.output, "extern {}", EXTERN_BUILTINS.join(", "))?;
    for proc in &program.proc_decls {
        writeln!(cg.output, "global {}", proc.name)?;
    }
    writeln!(cg.output)?;

    for proc in &program.proc_decls {
        codegen_proc(&mut cg, proc)?;
    }

    Ok(cg.output)
}

fn codegen_proc(cg: &mut CodeGen, proc: &ProcDecl) -> Result<(), CodeGenError> {
    let proc_id = cg
        .tables
        .global
        .lookup(&proc.name)
        .ok_or_else(|| CodeGenError::Logic(format!("undeclared procedure '{}'", proc.name)))?;
    let procedure = match cg.tables.global.get(proc_id) {
        Symbol::Procedure(p) => p.clone(),
        Symbol::Variable(_) => unreachable!("'{}' is a procedure entry", proc.name),
    };
    let table_id = procedure
        .locals
        .ok_or_else(|| CodeGenError::Logic(format!("'{}' has no local table", proc.name)))?;

    cg.current_table = Some(table_id);

    writeln!(cg.output, "{}:", proc.name)?;
    writeln!(cg.output, "    push rbp")?;
    writeln!(cg.output, "    mov rbp, rsp")?;

    let frame_size = round_up_16(procedure.local_area + procedure.arg_area + procedure.outgoing_area);
    if frame_size > 0 {
        writeln!(cg.output, "    sub rsp, {}", frame_size)?;
    }

    for param in procedure.params.iter().take(6) {
        let offset = cg.tables.locals(table_id).variable(param.symbol).offset;
        writeln!(cg.output, "    mov [rbp{:+}], {}", offset, param.reg_class.reg64())?;
    }

    gen_stmts(cg, &proc.body)?;

    writeln!(cg.output, "    mov rsp, rbp")?;
    writeln!(cg.output, "    pop rbp")?;
    writeln!(cg.output, "    ret")?;
    writeln!(cg.output)?;

    cg.current_table = None;
    Ok(())
}
