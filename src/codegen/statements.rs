//! Statement dispatch and expression evaluation.
//!
//! Every expression leaves its result in RAX; binary operators use RCX to
//! hold the already-evaluated left operand while the right operand is
//! evaluated into RAX, giving a "RAX = RCX op RAX" convention. Indexed-
//! variable addresses are computed into R10, a register otherwise unused
//! by this codegen, so address computation never disturbs a caller's
//! in-flight RAX/RCX value.

use std::fmt::Write as _;

use crate::ast::{ArithOp, CallArg, Comparison, Expr, Stmt, Var};
use crate::symbols::{ParamInfo, Symbol, Variable};

use super::control_flow::emit_comparison;
use super::error::CodeGenError;
use super::frame::CodeGen;

pub(super) fn gen_stmts(cg: &mut CodeGen, stmts: &[Stmt]) -> Result<(), CodeGenError> {
    for stmt in stmts {
        gen_stmt(cg, stmt)?;
    }
    Ok(())
}

fn gen_stmt(cg: &mut CodeGen, stmt: &Stmt) -> Result<(), CodeGenError> {
    if cg.emit_line_comments {
        writeln!(cg.output, "    ; line {}", stmt.line() + 1)?;
    }
    match stmt {
        Stmt::Assign { target, value, .. } => {
            gen_expr(cg, value)?;
            gen_store(cg, target)
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => gen_if(cg, cond, then_branch, else_branch.as_deref()),
        Stmt::While { cond, body, .. } => gen_while(cg, cond, body),
        Stmt::Call { callee, args, .. } => gen_call(cg, callee, args),
        Stmt::Block(stmts) => gen_stmts(cg, stmts),
    }
}

fn gen_if(
    cg: &mut CodeGen,
    cond: &Comparison,
    then_branch: &[Stmt],
    else_branch: Option<&[Stmt]>,
) -> Result<(), CodeGenError> {
    let false_label = cg.next_label();
    emit_comparison(cg, cond, &false_label)?;
    gen_stmts(cg, then_branch)?;
    match else_branch {
        Some(else_branch) => {
            let end_label = cg.next_label();
            writeln!(cg.output, "    jmp {}", end_label)?;
            writeln!(cg.output, "{}:", false_label)?;
            gen_stmts(cg, else_branch)?;
            writeln!(cg.output, "{}:", end_label)?;
        }
        None => {
            writeln!(cg.output, "{}:", false_label)?;
        }
    }
    Ok(())
}

fn gen_while(cg: &mut CodeGen, cond: &Comparison, body: &[Stmt]) -> Result<(), CodeGenError> {
    let top_label = cg.next_label();
    let bottom_label = cg.next_label();
    writeln!(cg.output, "{}:", top_label)?;
    emit_comparison(cg, cond, &bottom_label)?;
    gen_stmts(cg, body)?;
    writeln!(cg.output, "    jmp {}", top_label)?;
    writeln!(cg.output, "{}:", bottom_label)?;
    Ok(())
}

pub(super) fn gen_expr(cg: &mut CodeGen, expr: &Expr) -> Result<(), CodeGenError> {
    match expr {
        Expr::IntLit { value, .. } => {
            writeln!(cg.output, "    mov rax, {}", value)?;
            Ok(())
        }
        Expr::UnaryMinus { operand, .. } => {
            gen_expr(cg, operand)?;
            writeln!(cg.output, "    neg rax")?;
            Ok(())
        }
        Expr::Bin { op, lhs, rhs, .. } => {
            gen_expr(cg, lhs)?;
            writeln!(cg.output, "    push rax")?;
            gen_expr(cg, rhs)?;
            writeln!(cg.output, "    pop rcx")?;
            // rcx = lhs, rax = rhs from here on.
            match op {
                ArithOp::Add => writeln!(cg.output, "    add rax, rcx")?,
                ArithOp::Sub => {
                    writeln!(cg.output, "    sub rcx, rax")?;
                    writeln!(cg.output, "    mov rax, rcx")?;
                }
                ArithOp::Mul => writeln!(cg.output, "    imul rax, rcx")?,
                ArithOp::Div => {
                    writeln!(cg.output, "    xchg rax, rcx")?;
                    writeln!(cg.output, "    cqo")?;
                    writeln!(cg.output, "    idiv rcx")?;
                }
            }
            Ok(())
        }
        Expr::Var { var, .. } => gen_load(cg, var),
    }
}

fn find_variable<'a>(cg: &'a CodeGen, name: &str) -> Result<&'a Variable, CodeGenError> {
    let table = cg.locals();
    let id = table
        .lookup(name)
        .ok_or_else(|| CodeGenError::Logic(format!("unresolved variable '{}'", name)))?;
    match table.get(id) {
        Symbol::Variable(v) => Ok(v),
        Symbol::Procedure(_) => Err(CodeGenError::Logic(format!(
            "'{}' resolved to a procedure, not a variable",
            name
        ))),
    }
}

fn gen_load(cg: &mut CodeGen, var: &Var) -> Result<(), CodeGenError> {
    match var {
        Var::Named { name, .. } => {
            let variable = find_variable(cg, name)?;
            let offset = variable.offset;
            let is_ref = variable.is_ref;
            writeln!(cg.output, "    mov rax, [rbp{:+}]", offset)?;
            if is_ref {
                writeln!(cg.output, "    mov rax, [rax]")?;
            }
            Ok(())
        }
        Var::Indexed { .. } => {
            compute_element_address(cg, var)?;
            writeln!(cg.output, "    mov rax, [r10]")?;
            Ok(())
        }
    }
}

fn gen_store(cg: &mut CodeGen, var: &Var) -> Result<(), CodeGenError> {
    match var {
        Var::Named { name, .. } => {
            let variable = find_variable(cg, name)?;
            let offset = variable.offset;
            let is_ref = variable.is_ref;
            if is_ref {
                writeln!(cg.output, "    mov r10, [rbp{:+}]", offset)?;
                writeln!(cg.output, "    mov [r10], rax")?;
            } else {
                writeln!(cg.output, "    mov [rbp{:+}], rax", offset)?;
            }
            Ok(())
        }
        Var::Indexed { .. } => {
            writeln!(cg.output, "    push rax")?;
            compute_element_address(cg, var)?;
            writeln!(cg.output, "    pop rax")?;
            writeln!(cg.output, "    mov [r10], rax")?;
            Ok(())
        }
    }
}

/// Compute the address of `var` into R10. For a bare name this is the
/// local's frame slot (or, for an array ref parameter, the pointer it
/// holds); for an indexed variable it recurses into the base array and
/// then applies the bounds-checked index.
fn compute_element_address(cg: &mut CodeGen, var: &Var) -> Result<(), CodeGenError> {
    match var {
        Var::Named { name, .. } => {
            let variable = find_variable(cg, name)?;
            let offset = variable.offset;
            let is_ref = variable.is_ref;
            if is_ref {
                writeln!(cg.output, "    mov r10, [rbp{:+}]", offset)?;
            } else {
                writeln!(cg.output, "    lea r10, [rbp{:+}]", offset)?;
            }
            Ok(())
        }
        Var::Indexed { base, index, ty, line } => {
            compute_element_address(cg, base)?;
            writeln!(cg.output, "    push r10")?;
            gen_expr(cg, index)?;
            writeln!(cg.output, "    pop r10")?;

            let base_ty = base.type_slot().ok_or_else(|| {
                CodeGenError::Logic("indexed variable's base has no resolved type".to_string())
            })?;
            let len = cg.tables.types.array_len(base_ty).ok_or_else(|| {
                CodeGenError::Logic(format!("base of index at line {} is not an array", line + 1))
            })?;
            let elem_ty = ty.ok_or_else(|| {
                CodeGenError::Logic("indexed expression has no resolved element type".to_string())
            })?;
            let elem_size = cg.tables.types.size_of(elem_ty);

            let oob_label = cg.next_label();
            let ok_label = cg.next_label();
            writeln!(cg.output, "    cmp rax, 0")?;
            writeln!(cg.output, "    jl {}", oob_label)?;
            writeln!(cg.output, "    cmp rax, {}", len)?;
            writeln!(cg.output, "    jge {}", oob_label)?;
            writeln!(cg.output, "    jmp {}", ok_label)?;
            writeln!(cg.output, "{}:", oob_label)?;
            writeln!(cg.output, "    mov rdi, 1")?;
            writeln!(cg.output, "    call exit")?;
            writeln!(cg.output, "{}:", ok_label)?;
            writeln!(cg.output, "    imul rax, {}", elem_size)?;
            writeln!(cg.output, "    add r10, rax")?;
            Ok(())
        }
    }
}

fn gen_call(cg: &mut CodeGen, callee: &str, args: &[CallArg]) -> Result<(), CodeGenError> {
    let proc_id = cg
        .tables
        .global
        .lookup(callee)
        .ok_or_else(|| CodeGenError::Logic(format!("call to undefined procedure '{}'", callee)))?;
    let params: Vec<ParamInfo> = match cg.tables.global.get(proc_id) {
        Symbol::Procedure(p) => p.params.clone(),
        Symbol::Variable(_) => {
            return Err(CodeGenError::Logic(format!("'{}' is not callable", callee)))
        }
    };

    // Evaluate in reverse declaration order, each result pushed to a
    // temporary stack area.
    for (arg, param) in args.iter().zip(params.iter()).rev() {
        gen_arg_value(cg, arg, param)?;
        writeln!(cg.output, "    push rax")?;
    }

    // Pop back in forward order: first six into argument registers, the
    // rest into the frame's pre-allocated outgoing area.
    for (i, param) in params.iter().enumerate() {
        if i < 6 {
            writeln!(cg.output, "    pop {}", param.reg_class.reg64())?;
        } else {
            writeln!(cg.output, "    pop rax")?;
            writeln!(cg.output, "    mov [rsp+{}], rax", (i - 6) * 8)?;
        }
    }

    writeln!(cg.output, "    call {}", callee)?;
    Ok(())
}

fn gen_arg_value(cg: &mut CodeGen, arg: &CallArg, param: &ParamInfo) -> Result<(), CodeGenError> {
    match arg {
        CallArg::VarRef(var) if param.is_ref => {
            compute_element_address(cg, var)?;
            writeln!(cg.output, "    mov rax, r10")?;
            Ok(())
        }
        CallArg::VarRef(var) => gen_load(cg, var),
        CallArg::Expr(expr) => gen_expr(cg, expr),
    }
}

#[cfg(test)]
mod tests {
    use super::super::program::codegen_program;
    use crate::alloc::allocate;
    use crate::lexer::lex;
    use crate::parser::parse as parse_program;
    use crate::symbol_builder::build;
    use crate::typecheck::check_program;

    fn compile(src: &str) -> String {
        let mut buf = src.as_bytes().to_vec();
        buf.push(0);
        let mut program = parse_program(lex(&buf).unwrap()).unwrap();
        let mut tables = build(&program).unwrap();
        check_program(&mut program, &tables).unwrap();
        allocate(&program, &mut tables).unwrap();
        codegen_program(&program, &tables, &crate::config::CompilerConfig::new()).unwrap()
    }

    #[test]
    fn binary_op_evaluates_lhs_before_rhs() {
        let asm = compile("proc main() { var x: int; x := 2 - 3; }");
        // lhs (2) pushed, rhs (3) evaluated into rax, popped into rcx, then
        // `sub rcx, rax; mov rax, rcx` computes lhs - rhs.
        assert!(asm.contains("mov rax, 2"));
        assert!(asm.contains("push rax"));
        assert!(asm.contains("mov rax, 3"));
        assert!(asm.contains("pop rcx"));
        assert!(asm.contains("sub rcx, rax"));
    }

    #[test]
    fn division_uses_cqo_idiv() {
        let asm = compile("proc main() { var x: int; x := 10 / 2; }");
        assert!(asm.contains("xchg rax, rcx"));
        assert!(asm.contains("cqo"));
        assert!(asm.contains("idiv rcx"));
    }

    #[test]
    fn ref_param_is_dereferenced_on_load() {
        let asm = compile("proc inc(ref x: int) { x := x + 1; } proc main() { }");
        // x is the sole (register-class) parameter, spilled to [rbp-8] in
        // the prologue like any other first-six parameter; loading it
        // dereferences the pointer that slot holds.
        assert!(asm.contains("mov [rbp-8], rdi"));
        assert!(asm.contains("mov rax, [rbp-8]"));
        assert!(asm.contains("mov rax, [rax]"));
    }

    #[test]
    fn array_index_emits_bounds_check_and_exit_call() {
        let src = "type A = array[4] of int; \
                   proc main() { var a: A; var i: int; a[i] := 1; }";
        let asm = compile(src);
        assert!(asm.contains("cmp rax, 0"));
        assert!(asm.contains("cmp rax, 4"));
        assert!(asm.contains("call exit"));
        assert!(asm.contains("imul rax, 8"));
    }

    #[test]
    fn while_loop_has_top_and_bottom_labels() {
        let asm = compile(
            "proc main() { var x: int; while (x < 10) { x := x + 1; } }",
        );
        assert!(asm.contains(".L0:"));
        assert!(asm.contains("jge .L1"));
        assert!(asm.contains("jmp .L0"));
        assert!(asm.contains(".L1:"));
    }
}
