//! Stack-frame allocator: assigns every local and parameter a frame offset
//! and sizes each procedure's local, register-spill, and outgoing-argument
//! areas.

use crate::ast::{Program, ProcDecl, Stmt};
use crate::diagnostics::CompileError;
use crate::symbols::{Symbol, SymbolId, SymbolTables, TableId};

/// First six positional arguments travel in registers; the rest are
/// stack-passed.
const REG_ARG_SLOTS: usize = 6;

pub fn allocate(program: &Program, tables: &mut SymbolTables) -> Result<(), CompileError> {
    for proc in &program.proc_decls {
        allocate_proc(proc, tables)?;
    }
    Ok(())
}

fn allocate_proc(proc: &ProcDecl, tables: &mut SymbolTables) -> Result<(), CompileError> {
    let proc_id = tables
        .global
        .lookup(&proc.name)
        .expect("symbol builder already registered every declared procedure");
    let table_id = match tables.global.get(proc_id) {
        Symbol::Procedure(p) => p
            .locals
            .expect("user procedures always get a local table from the symbol builder"),
        Symbol::Variable(_) => unreachable!("'{}' is a procedure entry", proc.name),
    };

    let num_params = proc.params.len();
    let (param_ids, local_ids) = split_params_and_locals(tables, table_id, num_params);

    // Step 1: locals, negative offsets growing downward.
    let mut offset: i32 = 0;
    for id in &local_ids {
        let size = variable_size(tables, table_id, *id) as i32;
        offset -= size;
        set_offset(tables, table_id, *id, offset);
    }
    let local_area = (-offset) as u32;

    // Step 2: register-parameter spill slots continue downward from the
    // locals; stack-passed parameters (7th onward) get positive offsets
    // starting at +16, growing upward in declaration order.
    let reg_count = num_params.min(REG_ARG_SLOTS);
    for id in &param_ids[..reg_count] {
        offset -= 8;
        set_offset(tables, table_id, *id, offset);
    }
    let arg_area = (reg_count * 8) as u32;

    let mut stack_offset: i32 = 16;
    for id in &param_ids[reg_count..] {
        set_offset(tables, table_id, *id, stack_offset);
        stack_offset += 8;
    }

    // Step 3: outgoing-argument area, sized from the call site with the
    // most stack-passed arguments anywhere in the body.
    let max_excess = max_call_stack_args(&proc.body);
    let outgoing_area = (max_excess * 8) as u32;

    match tables.global.get_mut(proc_id) {
        Symbol::Procedure(p) => {
            p.local_area = local_area;
            p.arg_area = arg_area;
            p.outgoing_area = outgoing_area;
        }
        Symbol::Variable(_) => unreachable!(),
    }

    Ok(())
}

/// The local table's arena holds parameters first, then locals, both in
/// declaration order (`symbol_builder::build_proc` inserts them in that
/// sequence), so the first `num_params` entries are exactly the parameters.
fn split_params_and_locals(
    tables: &SymbolTables,
    table_id: TableId,
    num_params: usize,
) -> (Vec<SymbolId>, Vec<SymbolId>) {
    let ids: Vec<SymbolId> = tables.locals(table_id).iter().map(|(id, _)| id).collect();
    let (params, locals) = ids.split_at(num_params.min(ids.len()));
    (params.to_vec(), locals.to_vec())
}

fn variable_size(tables: &SymbolTables, table_id: TableId, id: SymbolId) -> u32 {
    let ty = tables.locals(table_id).variable(id).ty;
    if tables.locals(table_id).variable(id).is_ref {
        // A reference (every `ref` parameter, and every array parameter
        // regardless of `ref`) occupies one pointer-sized slot, not the
        // size of the referent.
        8
    } else {
        tables.types.size_of(ty)
    }
}

fn set_offset(tables: &mut SymbolTables, table_id: TableId, id: SymbolId, offset: i32) {
    match tables.locals_mut(table_id).get_mut(id) {
        Symbol::Variable(v) => v.offset = offset,
        Symbol::Procedure(_) => unreachable!("locals table only holds Variable entries"),
    }
}

/// Largest (arg_count - 6) over every call statement in `stmts`, walking
/// into `if`/`while`/block bodies; 0 if no call passes more than six args.
fn max_call_stack_args(stmts: &[Stmt]) -> usize {
    let mut max_excess = 0;
    for stmt in stmts {
        let excess = match stmt {
            Stmt::Call { args, .. } => args.len().saturating_sub(REG_ARG_SLOTS),
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                let then_excess = max_call_stack_args(then_branch);
                let else_excess = else_branch
                    .as_deref()
                    .map(max_call_stack_args)
                    .unwrap_or(0);
                then_excess.max(else_excess)
            }
            Stmt::While { body, .. } => max_call_stack_args(body),
            Stmt::Block(inner) => max_call_stack_args(inner),
            Stmt::Assign { .. } => 0,
        };
        max_excess = max_excess.max(excess);
    }
    max_excess
}

/// Round a frame size up to preserve 16-byte RSP alignment at call
/// boundaries.
pub fn round_up_16(size: u32) -> u32 {
    (size + 15) & !15
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse as parse_program;
    use crate::symbol_builder::build;

    fn allocate_src(src: &str) -> (Program, SymbolTables) {
        let mut buf = src.as_bytes().to_vec();
        buf.push(0);
        let program = parse_program(lex(&buf).unwrap()).unwrap();
        let mut tables = build(&program).unwrap();
        allocate(&program, &mut tables).unwrap();
        (program, tables)
    }

    fn procedure<'a>(tables: &'a SymbolTables, name: &str) -> &'a crate::symbols::Procedure {
        let id = tables.global.lookup(name).unwrap();
        match tables.global.get(id) {
            Symbol::Procedure(p) => p,
            _ => panic!(),
        }
    }

    #[test]
    fn locals_get_negative_offsets_growing_downward() {
        let (_, tables) = allocate_src("proc main() { var a: int; var b: int; }");
        let proc = procedure(&tables, "main");
        let table = tables.locals(proc.locals.unwrap());
        let a = table.variable(table.lookup("a").unwrap());
        let b = table.variable(table.lookup("b").unwrap());
        assert_eq!(a.offset, -8);
        assert_eq!(b.offset, -16);
        assert_eq!(proc.local_area, 16);
    }

    #[test]
    fn seventh_param_gets_positive_stack_offset() {
        let src = "proc f(a: int, b: int, c: int, d: int, e: int, g: int, h: int, i: int) { }";
        let (_, tables) = allocate_src(src);
        let proc = procedure(&tables, "f");
        let table = tables.locals(proc.locals.unwrap());
        let h = table.variable(table.lookup("h").unwrap());
        let i = table.variable(table.lookup("i").unwrap());
        assert_eq!(h.offset, 16);
        assert_eq!(i.offset, 24);
        assert_eq!(proc.arg_area, 48); // 6 register-spilled params * 8
    }

    #[test]
    fn outgoing_area_sized_from_widest_call() {
        let src = "proc g(a: int, b: int, c: int, d: int, e: int, g: int, h: int) { } \
                   proc main() { g(1, 2, 3, 4, 5, 6, 7); }";
        let (_, tables) = allocate_src(src);
        let proc = procedure(&tables, "main");
        assert_eq!(proc.outgoing_area, 8); // one stack-passed argument
    }

    #[test]
    fn no_call_over_six_args_means_zero_outgoing_area() {
        let (_, tables) = allocate_src("proc main() { printi(1); }");
        let proc = procedure(&tables, "main");
        assert_eq!(proc.outgoing_area, 0);
    }

    #[test]
    fn ref_array_param_takes_one_pointer_slot() {
        let src = "type A = array[4] of int; \
                    proc f(a: A) { var x: int; } \
                    proc main() { }";
        let (_, tables) = allocate_src(src);
        let proc = procedure(&tables, "f");
        let table = tables.locals(proc.locals.unwrap());
        let x = table.variable(table.lookup("x").unwrap());
        // a's spill slot is one 8-byte pointer, then x starts at -16.
        assert_eq!(x.offset, -8);
    }

    #[test]
    fn round_up_16_snaps_to_next_multiple() {
        assert_eq!(round_up_16(0), 0);
        assert_eq!(round_up_16(1), 16);
        assert_eq!(round_up_16(16), 16);
        assert_eq!(round_up_16(17), 32);
    }

    #[test]
    fn outgoing_area_searches_inside_branches() {
        let src = "proc g(a: int, b: int, c: int, d: int, e: int, g: int, h: int) { } \
                   proc main() { var x: int; if (x = 0) { g(1, 2, 3, 4, 5, 6, 7); } }";
        let (_, tables) = allocate_src(src);
        let proc = procedure(&tables, "main");
        assert_eq!(proc.outgoing_area, 8);
    }
}
