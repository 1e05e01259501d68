//! Symbol builder: walks the AST to populate the global table and one local
//! table per procedure.

use std::collections::HashMap;

use crate::ast::*;
use crate::diagnostics::CompileError;
use crate::symbols::*;

/// Built-in procedure signatures, installed before user declarations so
/// user code may call them.
const BUILTINS: &[(&str, &[bool])] = &[
    ("printi", &[false]),
    ("printc", &[false]),
    ("readi", &[true]),
    ("readc", &[true]),
    ("exit", &[]),
    ("time_", &[true]),
];

pub fn build(program: &Program) -> Result<SymbolTables, CompileError> {
    let mut tables = SymbolTables::new();
    install_builtins(&mut tables);
    build_type_decls(program, &mut tables)?;

    for proc in &program.proc_decls {
        if tables.global.lookup(&proc.name).is_some() {
            return Err(CompileError::semantic(
                format!("'{}' is already declared", proc.name),
                proc.line,
            ));
        }
        // Reserve the name now (with an empty signature) so mutually
        // recursive calls resolve; `build_proc` overwrites it below.
        tables.global.insert(
            proc.name.clone(),
            Symbol::Procedure(Procedure {
                name: proc.name.clone(),
                locals: None,
                params: Vec::new(),
                local_area: 0,
                arg_area: 0,
                outgoing_area: 0,
                is_builtin: false,
            }),
        );
    }

    for proc in &program.proc_decls {
        build_proc(proc, &mut tables)?;
    }

    Ok(tables)
}

fn install_builtins(tables: &mut SymbolTables) {
    for (name, ref_flags) in BUILTINS {
        let params = ref_flags
            .iter()
            .enumerate()
            .map(|(i, is_ref)| ParamInfo {
                // Built-ins have no local table to index into; the id is
                // unused by codegen, which special-cases builtin calls.
                symbol: SymbolId(i as u32),
                is_ref: *is_ref,
                reg_class: RegisterClass::for_position(i),
                ty: INT_TYPE,
            })
            .collect();
        tables.global.insert(
            *name,
            Symbol::Procedure(Procedure {
                name: (*name).to_string(),
                locals: None,
                params,
                local_area: 0,
                arg_area: 0,
                outgoing_area: 0,
                is_builtin: true,
            }),
        );
    }
}

fn build_type_decls(program: &Program, tables: &mut SymbolTables) -> Result<(), CompileError> {
    // The global `SymbolTable` only models variables and procedures, so
    // declared type names are tracked in a side map keyed by name
    // (`SymbolTables::named_types`) rather than as `Symbol` entries.
    let mut named_types: HashMap<String, TypeId> = HashMap::new();
    named_types.insert("int".to_string(), INT_TYPE);

    for decl in &program.type_decls {
        let target = resolve_type_expr(&decl.ty, tables, &named_types)?;
        let alias = tables.types.insert_alias(target);
        if named_types.insert(decl.name.clone(), alias).is_some() {
            return Err(CompileError::semantic(
                format!("type '{}' declared more than once", decl.name),
                decl.line,
            ));
        }
    }

    tables.named_types = named_types;
    Ok(())
}

/// Resolve a type-expression into a `TypeId` against the fully-built
/// `named_types` map. Every named type must already be present: `TypeDecl`s
/// are processed strictly in declaration order, and this function is also
/// used after that pass completes, by which point `named_types` is final.
fn resolve_type_expr(
    expr: &TypeExpr,
    tables: &mut SymbolTables,
    named_types: &HashMap<String, TypeId>,
) -> Result<TypeId, CompileError> {
    match expr {
        TypeExpr::Named { name, line } => named_types
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::semantic(format!("unknown type '{}'", name), *line)),
        TypeExpr::Array { elem, len, line } => {
            if *len < 0 {
                return Err(CompileError::semantic(
                    "array length must be non-negative",
                    *line,
                ));
            }
            let elem_id = resolve_type_expr(elem, tables, named_types)?;
            Ok(tables.types.insert_array(elem_id, *len as u32))
        }
    }
}

fn lookup_type(expr: &TypeExpr, tables: &mut SymbolTables) -> Result<TypeId, CompileError> {
    let named_types = tables.named_types.clone();
    resolve_type_expr(expr, tables, &named_types)
}

/// Build one procedure's local table and patch its already-reserved global
/// signature. Each parameter/local type expression is resolved exactly
/// once, so the `TypeId` stored on the `ParamInfo` in the global signature
/// and on the corresponding `Variable` in the local table always match.
fn build_proc(proc: &ProcDecl, tables: &mut SymbolTables) -> Result<(), CompileError> {
    let table_id = tables.new_procedure_table();
    let mut params = Vec::with_capacity(proc.params.len());

    for (i, param) in proc.params.iter().enumerate() {
        let ty = lookup_type(&param.ty, tables)?;
        let is_ref = param.is_ref || tables.types.is_array(ty);
        let reg_class = RegisterClass::for_position(i);
        let symbol = tables.locals_mut(table_id).insert(
            param.name.clone(),
            Symbol::Variable(Variable {
                ty,
                offset: 0,
                is_param: true,
                is_ref,
                reg_class,
            }),
        );
        params.push(ParamInfo {
            symbol,
            is_ref,
            reg_class,
            ty,
        });
    }

    for local in &proc.locals {
        if tables.locals(table_id).lookup(&local.name).is_some() {
            return Err(CompileError::semantic(
                format!("'{}' declared more than once", local.name),
                local.line,
            ));
        }
        let ty = lookup_type(&local.ty, tables)?;
        tables.locals_mut(table_id).insert(
            local.name.clone(),
            Symbol::Variable(Variable {
                ty,
                offset: 0,
                is_param: false,
                is_ref: false,
                reg_class: RegisterClass::Stack,
            }),
        );
    }

    let proc_symbol = tables
        .global
        .lookup(&proc.name)
        .expect("procedure name was reserved before build_proc ran");
    match tables.global.get_mut(proc_symbol) {
        Symbol::Procedure(p) => {
            p.locals = Some(table_id);
            p.params = params;
        }
        Symbol::Variable(_) => unreachable!("reserved entries are always Procedure"),
    }

    Ok(())
}
