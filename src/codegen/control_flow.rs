//! Comparison-to-jump lowering for conditionals.

use std::fmt::Write as _;

use crate::ast::Comparison;

use super::error::CodeGenError;
use super::frame::CodeGen;
use super::statements::gen_expr;

/// Evaluate both sides of `cmp` and emit a conditional jump to `false_label`
/// taken when the comparison does **not** hold.
pub(super) fn emit_comparison(
    cg: &mut CodeGen,
    cmp: &Comparison,
    false_label: &str,
) -> Result<(), CodeGenError> {
    gen_expr(cg, &cmp.lhs)?;
    writeln!(cg.output, "    push rax")?;
    gen_expr(cg, &cmp.rhs)?;
    writeln!(cg.output, "    pop rcx")?;
    writeln!(cg.output, "    cmp rcx, rax")?;
    writeln!(cg.output, "    {} {}", cmp.op.false_jump(), false_label)?;
    Ok(())
}
