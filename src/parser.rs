//! Recursive-descent parser for SPL.
//!
//! Holds `tokens`/`pos` and a `check`/`consume`/`advance`/`is_at_end`
//! helper quartet.

use crate::ast::*;
use crate::diagnostics::CompileError;
use crate::token::{Token, TokenKind, TokenStream};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(stream: TokenStream) -> Self {
        Parser {
            tokens: stream.tokens,
            pos: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Program, CompileError> {
        let mut program = Program {
            type_decls: Vec::new(),
            proc_decls: Vec::new(),
        };
        while !self.check(&TokenKind::Eof) {
            if self.check(&TokenKind::Type) {
                program.type_decls.push(self.parse_type_decl()?);
            } else if self.check(&TokenKind::Proc) {
                program.proc_decls.push(self.parse_proc_decl()?);
            } else {
                return self.unexpected("expected a type or procedure declaration");
            }
        }
        Ok(program)
    }

    // ---- declarations ----

    fn parse_type_decl(&mut self) -> Result<TypeDecl, CompileError> {
        let line = self.current().line;
        self.expect(&TokenKind::Type)?;
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        let ty = self.parse_type_expr()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(TypeDecl { name, ty, line })
    }

    fn parse_type_expr(&mut self) -> Result<TypeExpr, CompileError> {
        let line = self.current().line;
        if self.consume(&TokenKind::Array) {
            self.expect(&TokenKind::LBracket)?;
            let len = self.expect_int_literal()?;
            self.expect(&TokenKind::RBracket)?;
            self.expect(&TokenKind::Of)?;
            let elem = self.parse_type_expr()?;
            Ok(TypeExpr::Array {
                elem: Box::new(elem),
                len,
                line,
            })
        } else {
            let name = self.expect_identifier()?;
            Ok(TypeExpr::Named { name, line })
        }
    }

    fn parse_proc_decl(&mut self) -> Result<ProcDecl, CompileError> {
        let line = self.current().line;
        self.expect(&TokenKind::Proc)?;
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            params.push(self.parse_param()?);
            while self.consume(&TokenKind::Comma) {
                params.push(self.parse_param()?);
            }
        }
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::LBrace)?;
        let mut locals = Vec::new();
        while self.check(&TokenKind::Var) {
            locals.push(self.parse_var_decl()?);
        }
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            body.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(ProcDecl {
            name,
            params,
            locals,
            body,
            line,
        })
    }

    fn parse_param(&mut self) -> Result<Param, CompileError> {
        let is_ref = self.consume(&TokenKind::Ref);
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Colon)?;
        let ty = self.parse_type_expr()?;
        Ok(Param { name, is_ref, ty })
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, CompileError> {
        let line = self.current().line;
        self.expect(&TokenKind::Var)?;
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Colon)?;
        let ty = self.parse_type_expr()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(VarDecl { name, ty, line })
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        match &self.current().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Identifier(_) => {
                // Disambiguate `ident(...)` call from `var := expr`/`var[...] := expr`.
                if self.peek_at(1).map(|t| &t.kind) == Some(&TokenKind::LParen) {
                    self.parse_call()
                } else {
                    self.parse_assign()
                }
            }
            _ => self.unexpected("expected a statement"),
        }
    }

    fn parse_block(&mut self) -> Result<Stmt, CompileError> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Stmt::Block(stmts))
    }

    fn parse_assign(&mut self) -> Result<Stmt, CompileError> {
        let line = self.current().line;
        let target = self.parse_var()?;
        self.expect(&TokenKind::Assign)?;
        let value = self.parse_expr()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(Stmt::Assign {
            target,
            value,
            line,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        let line = self.current().line;
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_comparison()?;
        self.expect(&TokenKind::RParen)?;
        let then_branch = vec![self.parse_stmt()?];
        let else_branch = if self.consume(&TokenKind::Else) {
            Some(vec![self.parse_stmt()?])
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
            line,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        let line = self.current().line;
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_comparison()?;
        self.expect(&TokenKind::RParen)?;
        let body = vec![self.parse_stmt()?];
        Ok(Stmt::While { cond, body, line })
    }

    fn parse_call(&mut self) -> Result<Stmt, CompileError> {
        let line = self.current().line;
        let callee = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_call_arg()?);
            while self.consume(&TokenKind::Comma) {
                args.push(self.parse_call_arg()?);
            }
        }
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(Stmt::Call {
            callee,
            args,
            line,
        })
    }

    fn parse_call_arg(&mut self) -> Result<CallArg, CompileError> {
        let expr = self.parse_expr()?;
        // A bare variable reference parses to `Expr::Var` with no arithmetic
        // wrapper; whether it is *used* as a reference depends on the
        // callee's parameter (checked in `typecheck.rs`), but the syntactic
        // shape needed to pass one is available here unconditionally.
        match expr {
            Expr::Var { var, .. } => Ok(CallArg::VarRef(*var)),
            other => Ok(CallArg::Expr(other)),
        }
    }

    fn parse_comparison(&mut self) -> Result<Comparison, CompileError> {
        let line = self.current().line;
        let lhs = self.parse_expr()?;
        let op = match &self.current().kind {
            TokenKind::Eq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::NotEq,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::LtEq => CmpOp::LtEq,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::GtEq => CmpOp::GtEq,
            _ => return self.unexpected("expected a comparison operator"),
        };
        self.advance();
        let rhs = self.parse_expr()?;
        Ok(Comparison { op, lhs, rhs, line })
    }

    // ---- expressions ----
    // expr = term { ("+"|"-") term } .

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match &self.current().kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            let line = self.current().line;
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
                ty: None,
            };
        }
        Ok(lhs)
    }

    // term = factor { ("*"|"/") factor } .
    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match &self.current().kind {
                TokenKind::Star => ArithOp::Mul,
                TokenKind::Slash => ArithOp::Div,
                _ => break,
            };
            let line = self.current().line;
            self.advance();
            let rhs = self.parse_factor()?;
            lhs = Expr::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
                ty: None,
            };
        }
        Ok(lhs)
    }

    // factor = intLit | charLit | var | "-" factor | "(" expr ")" .
    fn parse_factor(&mut self) -> Result<Expr, CompileError> {
        let line = self.current().line;
        match self.current().kind.clone() {
            TokenKind::IntLiteral(value) | TokenKind::CharLiteral(value) => {
                self.advance();
                Ok(Expr::IntLit {
                    value,
                    line,
                    ty: None,
                })
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_factor()?;
                Ok(Expr::UnaryMinus {
                    operand: Box::new(operand),
                    line,
                    ty: None,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Identifier(_) => {
                let var = self.parse_var()?;
                Ok(Expr::Var {
                    var: Box::new(var),
                    ty: None,
                })
            }
            _ => self.unexpected("expected a literal, variable, or parenthesized expression"),
        }
    }

    // var = ident { "[" expr "]" } .
    fn parse_var(&mut self) -> Result<Var, CompileError> {
        let line = self.current().line;
        let name = self.expect_identifier()?;
        let mut var = Var::Named {
            name,
            line,
            ty: None,
        };
        while self.check(&TokenKind::LBracket) {
            let line = self.current().line;
            self.advance();
            let index = self.parse_expr()?;
            self.expect(&TokenKind::RBracket)?;
            var = Var::Indexed {
                base: Box::new(var),
                index: Box::new(index),
                line,
                ty: None,
            };
        }
        Ok(var)
    }

    // ---- token-stream helpers ----

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), CompileError> {
        if self.consume(kind) {
            Ok(())
        } else {
            self.unexpected(&format!("expected {:?}", kind))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        match self.current().kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => self.unexpected("expected an identifier"),
        }
    }

    fn expect_int_literal(&mut self) -> Result<i64, CompileError> {
        match self.current().kind.clone() {
            TokenKind::IntLiteral(value) => {
                self.advance();
                Ok(value)
            }
            _ => self.unexpected("expected an integer literal"),
        }
    }

    fn unexpected<T>(&self, message: &str) -> Result<T, CompileError> {
        let tok = self.current();
        Err(CompileError::syntax(message, tok.kind.clone(), tok.line))
    }
}

pub fn parse(stream: TokenStream) -> Result<Program, CompileError> {
    Parser::new(stream).parse()
}
