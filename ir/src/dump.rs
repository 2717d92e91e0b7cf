//! Writes a formula back to SMT-LIB v2, honouring all substitutions.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::{CmdKind, Formula, IrError, Item, ScopeId, TermId, TermKind};

pub fn dump_to_file(formula: &Formula, path: &Path) -> Result<(), IrError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_formula(formula, &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn to_string(formula: &Formula) -> String {
    let mut buf = Vec::new();
    // writing into a Vec cannot fail
    let _ = write_formula(formula, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Renders the whole file. Header commands (`set-logic`, `set-option`,
/// `set-info`) at the start of the file stay in front of the fresh
/// declarations introduced during reduction.
pub fn write_formula<W: Write>(formula: &Formula, out: &mut W) -> io::Result<()> {
    let root = formula.root();
    let header = root
        .items
        .iter()
        .take_while(|item| matches!(item, Item::Cmd(c) if formula.cmd(*c).is_header()))
        .count();
    for item in &root.items[..header] {
        write_item(formula, *item, out)?;
    }
    for item in &formula.scope(formula.reserved_id()).items {
        write_item(formula, *item, out)?;
    }
    for item in &root.items[header..] {
        write_item(formula, *item, out)?;
    }
    Ok(())
}

fn write_item<W: Write>(formula: &Formula, item: Item, out: &mut W) -> io::Result<()> {
    match item {
        Item::Cmd(c) if !formula.subst_cmds.is_subst(c) => write_cmd(formula, c, out),
        Item::Scope(s) if !formula.subst_scopes.is_subst(s) => write_scope(formula, s, out),
        _ => Ok(()),
    }
}

fn write_scope<W: Write>(formula: &Formula, id: ScopeId, out: &mut W) -> io::Result<()> {
    let scope = formula.scope(id);
    writeln!(out, "(push 1)")?;
    for item in &scope.items {
        write_item(formula, *item, out)?;
    }
    if scope.closed {
        writeln!(out, "(pop 1)")?;
    }
    Ok(())
}

fn write_cmd<W: Write>(formula: &Formula, id: crate::CmdId, out: &mut W) -> io::Result<()> {
    let cmd = formula.cmd(id);
    match &cmd.kind {
        CmdKind::SetLogic(logic) => write!(out, "(set-logic {})", logic)?,
        CmdKind::SetOption(text)
        | CmdKind::SetInfo(text)
        | CmdKind::DeclareSort(text)
        | CmdKind::DefineSort(text)
        | CmdKind::Other(text) => write!(out, "{}", text)?,
        CmdKind::DeclareFun { name, params, ret } => {
            let params: Vec<String> = params.iter().map(|s| s.to_string()).collect();
            write!(out, "(declare-fun {} ({}) {})", name, params.join(" "), ret)?
        }
        CmdKind::DeclareConst { name, sort } => write!(out, "(declare-const {} {})", name, sort)?,
        CmdKind::DefineFun { name, ret } => {
            let (body, params) = match cmd.children.split_last() {
                Some(split) => split,
                None => return Ok(()),
            };
            write!(out, "(define-fun {} (", name)?;
            for (i, p) in params.iter().enumerate() {
                if i > 0 {
                    write!(out, " ")?;
                }
                write_binder(formula, *p, out)?;
            }
            write!(out, ") {} ", ret)?;
            write_term(formula, *body, out)?;
            write!(out, ")")?
        }
        CmdKind::Assert => {
            write!(out, "(assert ")?;
            for t in &cmd.children {
                write_term(formula, *t, out)?;
            }
            write!(out, ")")?
        }
        CmdKind::CheckSat => write!(out, "(check-sat)")?,
        CmdKind::GetValue => {
            write!(out, "(get-value (")?;
            write_list(formula, &cmd.children, out)?;
            write!(out, "))")?
        }
        CmdKind::Exit => write!(out, "(exit)")?,
    }
    writeln!(out)
}

/// `(name sort)` of a quantified variable or parameter; always the binder's
/// own name, whatever its occurrences were replaced with.
fn write_binder<W: Write>(formula: &Formula, id: TermId, out: &mut W) -> io::Result<()> {
    let term = formula.term(id);
    let name = term.symbol().unwrap_or("_");
    match &term.sort {
        Some(sort) => write!(out, "({} {})", name, sort),
        None => write!(out, "({})", name),
    }
}

/// Space separated children, skipping removed ones.
fn write_list<W: Write>(formula: &Formula, children: &[TermId], out: &mut W) -> io::Result<()> {
    let mut first = true;
    for c in children {
        if formula.resolve_term(*c).is_none() {
            continue;
        }
        if !first {
            write!(out, " ")?;
        }
        first = false;
        write_term(formula, *c, out)?;
    }
    Ok(())
}

pub fn write_term<W: Write>(formula: &Formula, id: TermId, out: &mut W) -> io::Result<()> {
    stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
        let term = match formula.resolved(id) {
            Some(term) => term,
            None => return Ok(()),
        };
        match &term.kind {
            TermKind::Const(text) => write!(out, "{}", text),
            TermKind::Symbol(name) => write!(out, "{}", name),
            TermKind::Builtin(op) if term.children.is_empty() => write!(out, "{}", op),
            TermKind::Builtin(op) => {
                write!(out, "({} ", op)?;
                write_list(formula, &term.children, out)?;
                write!(out, ")")
            }
            TermKind::Apply => {
                write!(out, "(")?;
                write_list(formula, &term.children, out)?;
                write!(out, ")")
            }
            TermKind::Ite => {
                write!(out, "(ite ")?;
                write_list(formula, &term.children, out)?;
                write!(out, ")")
            }
            TermKind::Let => {
                let (body, bindings) = match term.children.split_last() {
                    Some(split) => split,
                    None => return Ok(()),
                };
                let live: Vec<TermId> = bindings
                    .iter()
                    .copied()
                    .filter(|b| formula.resolve_term(*b).is_some())
                    .collect();
                if live.is_empty() {
                    return write_term(formula, *body, out);
                }
                write!(out, "(let (")?;
                write_list(formula, &live, out)?;
                write!(out, ") ")?;
                write_term(formula, *body, out)?;
                write!(out, ")")
            }
            TermKind::VarBinding => {
                let name = term
                    .children
                    .first()
                    .and_then(|v| formula.term(*v).symbol())
                    .unwrap_or("_");
                write!(out, "({} ", name)?;
                if let Some(bound) = term.children.get(1) {
                    write_term(formula, *bound, out)?;
                }
                write!(out, ")")
            }
            TermKind::Forall | TermKind::Exists => {
                let (body, vars) = match term.children.split_last() {
                    Some(split) => split,
                    None => return Ok(()),
                };
                let quant = if matches!(term.kind, TermKind::Forall) { "forall" } else { "exists" };
                write!(out, "({} (", quant)?;
                for (i, v) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(out, " ")?;
                    }
                    write_binder(formula, *v, out)?;
                }
                write!(out, ") ")?;
                write_term(formula, *body, out)?;
                write!(out, ")")
            }
            TermKind::Annotated(attributes) => {
                write!(out, "(! ")?;
                write_list(formula, &term.children, out)?;
                write!(out, " {})", attributes)
            }
        }
    })
}
