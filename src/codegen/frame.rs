//! `CodeGen` state: the output buffer and the bookkeeping needed while
//! emitting one procedure's body.

use crate::symbols::{SymbolTables, TableId};

pub struct CodeGen<'a> {
    pub(super) output: String,
    pub(super) tables: &'a SymbolTables,
    /// Local table of the procedure currently being generated; `None`
    /// between procedures.
    pub(super) current_table: Option<TableId>,
    /// Monotonic counter for `.L` labels.
    pub(super) label_counter: usize,
    pub(super) emit_line_comments: bool,
}

impl<'a> CodeGen<'a> {
    pub fn new(tables: &'a SymbolTables, emit_line_comments: bool) -> Self {
        CodeGen {
            output: String::new(),
            tables,
            current_table: None,
            label_counter: 0,
            emit_line_comments,
        }
    }

    /// Allocate the next `.L` label.
    pub(super) fn next_label(&mut self) -> String {
        let label = format!(".L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    pub(super) fn locals(&self) -> &crate::symbols::SymbolTable {
        self.tables.locals(
            self.current_table
                .expect("statement codegen only runs inside a procedure body"),
        )
    }
}
