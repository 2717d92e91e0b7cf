use std::collections::HashMap;

use ir::term::bv_literal;
use ir::{CmdKind, Formula, Logic, Op, ScopeId, Sort, TermId, TermKind};
use log::{debug, warn};

use crate::sorts::{builtin_sort, parse_sort, SortDefs};
use crate::{ParseError, SExpr};

/// A declared or defined function visible at the current position.
#[derive(Debug, Clone)]
struct Fun {
    symbol: TermId,
    ret: Sort,
}

struct Builder {
    formula: Formula,
    scope: ScopeId,
    /// name -> visible declarations, innermost last
    funs: HashMap<String, Vec<Fun>>,
    /// names declared per open scope, root first
    declared: Vec<Vec<String>>,
    /// let / quantifier / parameter frames, innermost last
    bound: Vec<HashMap<String, TermId>>,
    unknown: HashMap<String, TermId>,
    sort_defs: SortDefs,
}

/// Builds a formula from the top-level s-expressions of a script.
///
/// Ids are handed out in source order, which fixes the order the reducer
/// visits candidates in.
pub fn build(exprs: &[SExpr]) -> Result<Formula, ParseError> {
    // numerals are sorted by the logic, so it has to be known up front
    let logic = exprs
        .iter()
        .find_map(|e| match e {
            SExpr::List(v) => match v.as_slice() {
                [SExpr::Atom(c), SExpr::Atom(l)] if c == "set-logic" => Some(Logic::parse(l)),
                _ => None,
            },
            SExpr::Atom(_) => None,
        })
        .unwrap_or_else(Logic::all);
    debug!("logic: {}", logic.name);

    let formula = Formula::new(logic);
    let mut builder = Builder {
        scope: formula.root_id(),
        formula,
        funs: HashMap::new(),
        declared: vec![Vec::new()],
        bound: Vec::new(),
        unknown: HashMap::new(),
        sort_defs: SortDefs::new(),
    };
    for e in exprs {
        builder.command(e)?;
    }
    debug!(
        "parsed {} scope(s), {} command(s), {} term(s)",
        builder.formula.num_scopes(),
        builder.formula.num_cmds(),
        builder.formula.num_terms()
    );
    Ok(builder.formula)
}

/// `|x|` and `x` denote the same symbol.
fn key(name: &str) -> String {
    if name.len() >= 2 && name.starts_with('|') && name.ends_with('|') {
        let inner = &name[1..name.len() - 1];
        if !inner.is_empty() && !inner.chars().any(|c| c.is_whitespace() || "()|;\"".contains(c)) {
            return inner.to_string();
        }
    }
    name.to_string()
}

fn invalid(e: &SExpr, msg: &str) -> ParseError {
    let mut what = e.to_string();
    if what.len() > 60 {
        let cut = (0..=60).rev().find(|i| what.is_char_boundary(*i)).unwrap_or(0);
        what.truncate(cut);
        what.push_str("...");
    }
    ParseError::Invalid { what: format!("'{}'", what), msg: msg.to_string() }
}

fn is_numeral(a: &str) -> bool {
    !a.is_empty() && a.chars().all(|c| c.is_ascii_digit())
}

fn is_decimal(a: &str) -> bool {
    match a.split_once('.') {
        Some((i, f)) => is_numeral(i) && is_numeral(f),
        None => false,
    }
}

impl Builder {
    fn command(&mut self, e: &SExpr) -> Result<(), ParseError> {
        let v = match e {
            SExpr::List(v) if !v.is_empty() => v,
            _ => return Err(invalid(e, "expected a command")),
        };
        let name = v[0].atom().ok_or_else(|| invalid(e, "expected a command name"))?;
        match name {
            "set-logic" => {
                let logic = v.get(1).and_then(SExpr::atom).ok_or_else(|| invalid(e, "missing logic"))?;
                self.formula.logic = Logic::parse(logic);
                self.add(CmdKind::SetLogic(logic.to_string()), Vec::new());
            }
            "set-option" => self.add(CmdKind::SetOption(e.to_string()), Vec::new()),
            "set-info" => self.add(CmdKind::SetInfo(e.to_string()), Vec::new()),
            "declare-sort" => self.add(CmdKind::DeclareSort(e.to_string()), Vec::new()),
            "define-sort" => {
                let (sort_name, params, body) = match v.as_slice() {
                    [_, SExpr::Atom(n), SExpr::List(p), body] => (n, p, body),
                    _ => return Err(invalid(e, "expected (define-sort name (params) sort)")),
                };
                let params = params
                    .iter()
                    .map(|p| p.atom().map(str::to_string).ok_or_else(|| invalid(e, "bad sort parameter")))
                    .collect::<Result<Vec<_>, _>>()?;
                self.sort_defs.insert(sort_name.clone(), (params, body.clone()));
                self.add(CmdKind::DefineSort(e.to_string()), Vec::new());
            }
            "declare-fun" => {
                let (fname, params, ret) = match v.as_slice() {
                    [_, SExpr::Atom(n), SExpr::List(p), ret] => (n, p, ret),
                    _ => return Err(invalid(e, "expected (declare-fun name (sorts) sort)")),
                };
                let params = params
                    .iter()
                    .map(|p| parse_sort(p, &self.sort_defs))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = parse_sort(ret, &self.sort_defs)?;
                let symbol = self.declare(fname, params.is_empty(), ret.clone());
                self.add(CmdKind::DeclareFun { name: fname.clone(), params, ret }, vec![symbol]);
            }
            "declare-const" => {
                let (cname, sort) = match v.as_slice() {
                    [_, SExpr::Atom(n), sort] => (n, sort),
                    _ => return Err(invalid(e, "expected (declare-const name sort)")),
                };
                let sort = parse_sort(sort, &self.sort_defs)?;
                let symbol = self.declare(cname, true, sort.clone());
                self.add(CmdKind::DeclareConst { name: cname.clone(), sort }, vec![symbol]);
            }
            "define-fun" => {
                let (fname, params, ret, body) = match v.as_slice() {
                    [_, SExpr::Atom(n), SExpr::List(p), ret, body] => (n, p, ret, body),
                    _ => return Err(invalid(e, "expected (define-fun name (params) sort body)")),
                };
                let ret = parse_sort(ret, &self.sort_defs)?;
                let mut frame = HashMap::new();
                let mut children = Vec::new();
                for p in params {
                    let var = self.sorted_var(e, p)?;
                    if let Some(n) = self.formula.term(var).symbol() {
                        frame.insert(key(n), var);
                    }
                    children.push(var);
                }
                self.bound.push(frame);
                let body = self.term(body);
                self.bound.pop();
                children.push(body?);
                self.declare(fname, params.is_empty(), ret.clone());
                self.add(CmdKind::DefineFun { name: fname.clone(), ret }, children);
            }
            "assert" => {
                let t = match v.as_slice() {
                    [_, t] => self.term(t)?,
                    _ => return Err(invalid(e, "expected (assert term)")),
                };
                self.add(CmdKind::Assert, vec![t]);
            }
            "check-sat" => self.add(CmdKind::CheckSat, Vec::new()),
            "get-value" => {
                let terms = match v.as_slice() {
                    [_, SExpr::List(ts)] if !ts.is_empty() => self.terms(ts)?,
                    _ => return Err(invalid(e, "expected (get-value (terms))")),
                };
                self.add(CmdKind::GetValue, terms);
            }
            "push" => {
                for _ in 0..self.count(e, v)? {
                    self.scope = self.formula.new_scope(self.scope);
                    self.declared.push(Vec::new());
                }
            }
            "pop" => {
                let n = self.count(e, v)?;
                for _ in 0..n {
                    self.pop_scope().ok_or(ParseError::UnbalancedPop(n))?;
                }
            }
            "exit" => self.add(CmdKind::Exit, Vec::new()),
            _ => self.add(CmdKind::Other(e.to_string()), Vec::new()),
        }
        Ok(())
    }

    fn add(&mut self, kind: CmdKind, children: Vec<TermId>) {
        self.formula.new_cmd(self.scope, kind, children);
    }

    /// Argument of `push`/`pop`, 1 if absent.
    fn count(&self, e: &SExpr, v: &[SExpr]) -> Result<u32, ParseError> {
        match v.get(1) {
            None => Ok(1),
            Some(SExpr::Atom(n)) => n.parse().map_err(|_| invalid(e, "expected a numeral")),
            Some(_) => Err(invalid(e, "expected a numeral")),
        }
    }

    fn pop_scope(&mut self) -> Option<()> {
        let parent = self.formula.scope(self.scope).parent?;
        self.formula.close_scope(self.scope);
        for name in self.declared.pop()? {
            if let Some(stack) = self.funs.get_mut(&name) {
                stack.pop();
            }
        }
        self.scope = parent;
        Some(())
    }

    /// Creates the shared symbol node of a new function and makes it visible.
    fn declare(&mut self, name: &str, nullary: bool, ret: Sort) -> TermId {
        let sort = if nullary { Some(ret.clone()) } else { None };
        let symbol = self.formula.new_term(TermKind::Symbol(name.to_string()), Vec::new(), sort);
        let k = key(name);
        self.formula.reserve_name(&k);
        self.funs.entry(k.clone()).or_default().push(Fun { symbol, ret });
        if let Some(names) = self.declared.last_mut() {
            names.push(k);
        }
        symbol
    }

    fn lookup_fun(&self, name: &str) -> Option<&Fun> {
        self.funs.get(&key(name)).and_then(|stack| stack.last())
    }

    fn lookup_bound(&self, name: &str) -> Option<TermId> {
        let k = key(name);
        self.bound.iter().rev().find_map(|frame| frame.get(&k).copied())
    }

    /// `(x S)` in a quantifier or parameter list.
    fn sorted_var(&mut self, e: &SExpr, p: &SExpr) -> Result<TermId, ParseError> {
        match p {
            SExpr::List(pv) => match pv.as_slice() {
                [SExpr::Atom(x), sort] => {
                    let sort = parse_sort(sort, &self.sort_defs)?;
                    self.formula.reserve_name(&key(x));
                    Ok(self.formula.new_term(TermKind::Symbol(x.clone()), Vec::new(), Some(sort)))
                }
                _ => Err(invalid(e, "expected (name sort)")),
            },
            SExpr::Atom(_) => Err(invalid(e, "expected (name sort)")),
        }
    }

    fn sort_of(&self, t: TermId) -> Option<Sort> {
        self.formula.term(t).sort.clone()
    }

    fn terms(&mut self, es: &[SExpr]) -> Result<Vec<TermId>, ParseError> {
        es.iter().map(|e| self.term(e)).collect()
    }

    fn term(&mut self, e: &SExpr) -> Result<TermId, ParseError> {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.term_inner(e))
    }

    fn term_inner(&mut self, e: &SExpr) -> Result<TermId, ParseError> {
        let v = match e {
            SExpr::Atom(a) => return Ok(self.atom(a)),
            SExpr::List(v) => v,
        };
        let head = v.first().ok_or_else(|| invalid(e, "empty term"))?;
        let h = match head {
            SExpr::Atom(h) => h.as_str(),
            SExpr::List(hv) => return self.qualified_application(hv, &v[1..]),
        };
        match h {
            "_" => {
                let sort = bv_literal(&e.to_string()).map(|lit| Sort::BitVec(lit.width));
                Ok(self.formula.const_term(&e.to_string(), sort))
            }
            "as" => {
                let sort = match v.as_slice() {
                    [_, _, sort] => Some(parse_sort(sort, &self.sort_defs)?),
                    _ => None,
                };
                Ok(self.formula.const_term(&e.to_string(), sort))
            }
            "let" => self.let_term(e, v),
            "forall" | "exists" => self.quantifier(e, v, h == "forall"),
            "!" => {
                let (t, attrs) = match v.as_slice() {
                    [_, t, attrs @ ..] if !attrs.is_empty() => (t, attrs),
                    _ => return Err(invalid(e, "expected (! term attributes)")),
                };
                let t = self.term(t)?;
                let attrs: Vec<String> = attrs.iter().map(|a| a.to_string()).collect();
                let sort = self.sort_of(t);
                Ok(self.formula.new_term(TermKind::Annotated(attrs.join(" ")), vec![t], sort))
            }
            "ite" if v.len() == 4 => {
                let children = self.terms(&v[1..])?;
                let sort = self.sort_of(children[1]).or_else(|| self.sort_of(children[2]));
                Ok(self.formula.new_term(TermKind::Ite, children, sort))
            }
            _ => self.application(h, &v[1..]),
        }
    }

    fn atom(&mut self, a: &str) -> TermId {
        match a {
            "true" => return self.formula.bool_const(true),
            "false" => return self.formula.bool_const(false),
            _ => {}
        }
        if let Some(t) = self.lookup_bound(a) {
            return t;
        }
        if let Some(fun) = self.lookup_fun(a) {
            return fun.symbol;
        }
        if is_numeral(a) {
            let logic = &self.formula.logic;
            let sort = if logic.has_real() && !logic.has_int() { Sort::Real } else { Sort::Int };
            return self.formula.const_term(a, Some(sort));
        }
        if is_decimal(a) {
            return self.formula.const_term(a, Some(Sort::Real));
        }
        if let Some(lit) = bv_literal(a) {
            return self.formula.const_term(a, Some(Sort::BitVec(lit.width)));
        }
        if a.starts_with('"') {
            return self.formula.const_term(a, Some(Sort::Named("String".into(), Vec::new())));
        }
        if let Some(t) = self.unknown.get(a) {
            return *t;
        }
        warn!("undeclared symbol '{}'", a);
        let t = self.formula.new_term(TermKind::Symbol(a.to_string()), Vec::new(), None);
        self.unknown.insert(a.to_string(), t);
        t
    }

    fn application(&mut self, h: &str, args: &[SExpr]) -> Result<TermId, ParseError> {
        let args = self.terms(args)?;
        if self.lookup_bound(h).is_none() {
            if let Some(fun) = self.lookup_fun(h).cloned() {
                let mut children = vec![fun.symbol];
                children.extend(args);
                return Ok(self.formula.new_term(TermKind::Apply, children, Some(fun.ret)));
            }
        }
        let op = Op::new(h);
        let sorts: Vec<Option<Sort>> = args.iter().map(|a| self.sort_of(*a)).collect();
        let sort = builtin_sort(&op, &sorts);
        Ok(self.formula.new_term(TermKind::Builtin(op), args, sort))
    }

    /// `((_ extract 7 0) x)` or `((as const (Array Int Int)) 0)`.
    fn qualified_application(&mut self, hv: &[SExpr], args: &[SExpr]) -> Result<TermId, ParseError> {
        let children = self.terms(args)?;
        let (op, sort) = match hv {
            [SExpr::Atom(u), SExpr::Atom(name), indices @ ..] if u == "_" => {
                let op = Op::indexed(name.clone(), indices.iter().map(|i| i.to_string()).collect());
                let sorts: Vec<Option<Sort>> = children.iter().map(|c| self.sort_of(*c)).collect();
                let sort = builtin_sort(&op, &sorts);
                (op, sort)
            }
            [SExpr::Atom(a), _, sort] if a == "as" => {
                let sort = parse_sort(sort, &self.sort_defs)?;
                (Op::new(SExpr::List(hv.to_vec()).to_string()), Some(sort))
            }
            _ => (Op::new(SExpr::List(hv.to_vec()).to_string()), None),
        };
        Ok(self.formula.new_term(TermKind::Builtin(op), children, sort))
    }

    /// Bindings are evaluated outside the new frame (parallel `let`).
    fn let_term(&mut self, e: &SExpr, v: &[SExpr]) -> Result<TermId, ParseError> {
        let (bindings, body) = match v {
            [_, SExpr::List(b), body] => (b, body),
            _ => return Err(invalid(e, "expected (let ((name term) ...) term)")),
        };
        let mut frame = HashMap::new();
        let mut children = Vec::new();
        for b in bindings {
            let (x, t) = match b {
                SExpr::List(bv) => match bv.as_slice() {
                    [SExpr::Atom(x), t] => (x, t),
                    _ => return Err(invalid(e, "expected (name term)")),
                },
                SExpr::Atom(_) => return Err(invalid(e, "expected (name term)")),
            };
            let bound = self.term(t)?;
            let sort = self.sort_of(bound);
            self.formula.reserve_name(&key(x));
            let var = self.formula.new_term(TermKind::Symbol(x.clone()), Vec::new(), sort);
            children.push(self.formula.new_term(TermKind::VarBinding, vec![var, bound], None));
            frame.insert(key(x), var);
        }
        self.bound.push(frame);
        let body = self.term(body);
        self.bound.pop();
        let body = body?;
        let sort = self.sort_of(body);
        children.push(body);
        Ok(self.formula.new_term(TermKind::Let, children, sort))
    }

    fn quantifier(&mut self, e: &SExpr, v: &[SExpr], forall: bool) -> Result<TermId, ParseError> {
        let (vars, body) = match v {
            [_, SExpr::List(vars), body] if !vars.is_empty() => (vars, body),
            _ => return Err(invalid(e, "expected (quantifier ((name sort) ...) term)")),
        };
        let mut frame = HashMap::new();
        let mut children = Vec::new();
        for p in vars {
            let var = self.sorted_var(e, p)?;
            if let Some(n) = self.formula.term(var).symbol() {
                frame.insert(key(n), var);
            }
            children.push(var);
        }
        self.bound.push(frame);
        let body = self.term(body);
        self.bound.pop();
        children.push(body?);
        let kind = if forall { TermKind::Forall } else { TermKind::Exists };
        Ok(self.formula.new_term(kind, children, Some(Sort::Bool)))
    }
}

#[cfg(test)]
mod tests {
    use crate::{parse, ParseError};
    use ir::dump::to_string;
    use ir::{CmdKind, Sort, TermKind};

    #[test]
    fn test_declarations_are_shared() {
        let f = parse("(set-logic QF_BV)(declare-fun x () (_ BitVec 3))(assert (= (bvor x #b000) x))").unwrap();
        assert!(f.logic.has_bv());
        let root = f.root();
        let cmds: Vec<_> = root.cmds().collect();
        assert_eq!(cmds.len(), 3);
        let decl = f.cmd(cmds[1]);
        let x = decl.children[0];
        assert_eq!(f.term(x).sort, Some(Sort::BitVec(3)));

        let eq = f.term(f.cmd(cmds[2]).children[0]);
        assert_eq!(eq.sort, Some(Sort::Bool));
        let bvor = f.term(eq.children[0]);
        assert!(bvor.is_bvor());
        assert_eq!(bvor.sort, Some(Sort::BitVec(3)));
        assert_eq!(bvor.children[0], x);
        assert_eq!(eq.children[1], x);
        assert!(f.term(bvor.children[1]).is_false_bvconst());
    }

    #[test]
    fn test_round_trip() {
        let src = "(set-logic QF_AUFLIA)\n\
                   (declare-fun a () (Array Int Int))\n\
                   (declare-fun f (Int) Int)\n\
                   (define-fun g ((x Int) (y Int)) Bool (< (f x) y))\n\
                   (assert (let ((z (select a 1))) (g z (ite (> z 0) z 0))))\n\
                   (assert (forall ((k Int)) (! (> (f k) 0) :named pos)))\n\
                   (check-sat)\n\
                   (get-value ((f 0) (store a 0 1)))\n\
                   (exit)\n";
        let f = parse(src).unwrap();
        assert_eq!(to_string(&f), src);
    }

    #[test]
    fn test_scopes() {
        let f = parse("(declare-const b Bool)(push 1)(assert b)(push 2)(assert (not b))(pop 2)(pop 1)(push)(check-sat)").unwrap();
        let root = f.root();
        let top: Vec<_> = root.scopes().collect();
        assert_eq!(top.len(), 2);
        let s1 = f.scope(top[0]);
        assert_eq!(s1.level, 1);
        assert!(s1.closed);
        let inner: Vec<_> = s1.scopes().collect();
        assert_eq!(inner.len(), 1);
        let s2 = f.scope(inner[0]);
        assert_eq!(s2.level, 2);
        let s3 = f.scope(s2.scopes().next().unwrap());
        assert_eq!(s3.level, 3);
        assert_eq!(s3.cmds().count(), 1);
        assert!(!f.scope(top[1]).closed);
    }

    #[test]
    fn test_unbalanced_pop() {
        assert!(matches!(parse("(push 1)(pop 2)"), Err(ParseError::UnbalancedPop(2))));
    }

    #[test]
    fn test_let_variables_are_shared() {
        let f = parse("(declare-const p Bool)(assert (let ((q (not p))) (and q q)))").unwrap();
        let assert = f.cmd(f.root().cmds().nth(1).unwrap());
        let let_term = f.term(assert.children[0]);
        assert!(let_term.is_let());
        let binding = f.term(let_term.children[0]);
        assert!(binding.is_varb());
        let var = binding.children[0];
        assert_eq!(f.term(var).sort, Some(Sort::Bool));
        let body = f.term(let_term.children[1]);
        assert_eq!(body.children, vec![var, var]);
    }

    #[test]
    fn test_numerals_follow_logic() {
        let f = parse("(set-logic QF_LRA)(assert (> 1 0.5))").unwrap();
        let gt = f.term(f.cmd(f.root().cmds().nth(1).unwrap()).children[0]);
        assert_eq!(f.term(gt.children[0]).sort, Some(Sort::Real));
        let f = parse("(set-logic QF_LIA)(assert (> 1 0))").unwrap();
        let gt = f.term(f.cmd(f.root().cmds().nth(1).unwrap()).children[0]);
        assert_eq!(f.term(gt.children[0]).sort, Some(Sort::Int));
    }

    #[test]
    fn test_unknown_commands_and_symbols() {
        let f = parse("(set-option :produce-models true)(get-model)(assert (frob u))").unwrap();
        let cmds: Vec<_> = f.root().cmds().map(|c| f.cmd(c).kind.clone()).collect();
        assert_eq!(cmds[0], CmdKind::SetOption("(set-option :produce-models true)".into()));
        assert_eq!(cmds[1], CmdKind::Other("(get-model)".into()));
        let frob = f.term(f.cmd(f.root().cmds().nth(2).unwrap()).children[0]);
        assert!(matches!(&frob.kind, TermKind::Builtin(op) if op.name == "frob"));
        assert_eq!(frob.sort, None);
    }

    #[test]
    fn test_binder_names_are_not_reused() {
        let mut f = parse(
            "(declare-const x Int)\n\
             (define-fun f ((_substvar_2_ Int)) Int _substvar_2_)\n\
             (assert (let ((_substvar_0_ x)) (forall ((|_substvar_1_| Int)) (> _substvar_0_ _substvar_1_))))\n",
        )
        .unwrap();
        let v = f.add_fresh_declfun(Sort::Int);
        assert_eq!(f.term(v).symbol(), Some("_substvar_3_"));
    }

    #[test]
    fn test_oversized_indices_leave_sort_unknown() {
        let f = parse("(declare-const v (_ BitVec 4))(assert (= ((_ repeat 1073741824) v) ((_ zero_extend 4294967295) v)))")
            .unwrap();
        let eq = f.term(f.cmd(f.root().cmds().nth(1).unwrap()).children[0]);
        assert_eq!(f.term(eq.children[0]).sort, None);
        assert_eq!(f.term(eq.children[1]).sort, None);
    }

    #[test]
    fn test_indexed_operators() {
        let f = parse("(declare-const v (_ BitVec 8))(assert (= ((_ extract 3 0) v) (_ bv2 4)))").unwrap();
        let eq = f.term(f.cmd(f.root().cmds().nth(1).unwrap()).children[0]);
        assert_eq!(f.term(eq.children[0]).sort, Some(Sort::BitVec(4)));
        assert_eq!(f.term(eq.children[1]).sort, Some(Sort::BitVec(4)));
        assert_eq!(to_string(&f), "(declare-const v (_ BitVec 8))\n(assert (= ((_ extract 3 0) v) (_ bv2 4)))\n");
    }
}
