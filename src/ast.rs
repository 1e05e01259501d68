//! Abstract syntax tree for SPL.
//!
//! One Rust type per node kind, kept as an owned recursive tree
//! (`Vec`/`Box` nesting) rather than a flat integer arena. Expression-shaped
//! nodes carry a type-slot filled in by the semantic analyzer; the unset
//! value is simply `None`.

use crate::symbols::TypeId;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub type_decls: Vec<TypeDecl>,
    pub proc_decls: Vec<ProcDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named { name: String, line: usize },
    Array {
        elem: Box<TypeExpr>,
        len: i64,
        line: usize,
    },
}

impl TypeExpr {
    pub fn line(&self) -> usize {
        match self {
            TypeExpr::Named { line, .. } => *line,
            TypeExpr::Array { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub is_ref: bool,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign {
        target: Var,
        value: Expr,
        line: usize,
    },
    If {
        cond: Comparison,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
        line: usize,
    },
    While {
        cond: Comparison,
        body: Vec<Stmt>,
        line: usize,
    },
    Call {
        callee: String,
        args: Vec<CallArg>,
        line: usize,
    },
    Block(Vec<Stmt>),
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::Assign { line, .. }
            | Stmt::If { line, .. }
            | Stmt::While { line, .. }
            | Stmt::Call { line, .. } => *line,
            Stmt::Block(stmts) => stmts.first().map(Stmt::line).unwrap_or(0),
        }
    }
}

/// A call argument: a plain expression, or a variable reference used where
/// the callee's parameter is `ref` (or an array parameter, which is always
/// passed by reference regardless of the `ref` keyword).
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Expr(Expr),
    VarRef(Var),
}

impl CallArg {
    pub fn line(&self) -> usize {
        match self {
            CallArg::Expr(e) => e.line(),
            CallArg::VarRef(v) => v.line(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub op: CmpOp,
    pub lhs: Expr,
    pub rhs: Expr,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    /// The conditional jump that is taken when the comparison is **false**,
    /// i.e. the inverse of the six operators.
    pub fn false_jump(self) -> &'static str {
        match self {
            CmpOp::Eq => "jne",
            CmpOp::NotEq => "je",
            CmpOp::Lt => "jge",
            CmpOp::LtEq => "jg",
            CmpOp::Gt => "jle",
            CmpOp::GtEq => "jl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bin {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        line: usize,
        ty: Option<TypeId>,
    },
    UnaryMinus {
        operand: Box<Expr>,
        line: usize,
        ty: Option<TypeId>,
    },
    IntLit {
        value: i64,
        line: usize,
        ty: Option<TypeId>,
    },
    Var {
        var: Box<Var>,
        ty: Option<TypeId>,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Bin { line, .. } => *line,
            Expr::UnaryMinus { line, .. } => *line,
            Expr::IntLit { line, .. } => *line,
            Expr::Var { var, .. } => var.line(),
        }
    }

    pub fn type_slot(&self) -> Option<TypeId> {
        match self {
            Expr::Bin { ty, .. } | Expr::UnaryMinus { ty, .. } | Expr::IntLit { ty, .. } => *ty,
            Expr::Var { ty, .. } => *ty,
        }
    }

    pub fn set_type(&mut self, id: TypeId) {
        match self {
            Expr::Bin { ty, .. } | Expr::UnaryMinus { ty, .. } | Expr::IntLit { ty, .. } => {
                *ty = Some(id)
            }
            Expr::Var { ty, .. } => *ty = Some(id),
        }
    }
}

/// A variable reference: a bare name, or a name indexed one or more times.
#[derive(Debug, Clone, PartialEq)]
pub enum Var {
    Named {
        name: String,
        line: usize,
        ty: Option<TypeId>,
    },
    Indexed {
        base: Box<Var>,
        index: Box<Expr>,
        line: usize,
        ty: Option<TypeId>,
    },
}

impl Var {
    pub fn line(&self) -> usize {
        match self {
            Var::Named { line, .. } => *line,
            Var::Indexed { line, .. } => *line,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Var::Named { name, .. } => name,
            Var::Indexed { base, .. } => base.name(),
        }
    }

    pub fn type_slot(&self) -> Option<TypeId> {
        match self {
            Var::Named { ty, .. } | Var::Indexed { ty, .. } => *ty,
        }
    }

    pub fn set_type(&mut self, id: TypeId) {
        match self {
            Var::Named { ty, .. } | Var::Indexed { ty, .. } => *ty = Some(id),
        }
    }
}
