//! Candidate selection. Every selector returns live entities only, in a
//! deterministic order, so that partitions are reproducible.

use std::collections::BTreeSet;
use std::collections::HashSet;

use ir::{Cmd, CmdId, Formula, Scope, ScopeId, Term, TermId};

/// Scopes below `root` (the whole tree if `None`) matching `pred`. A removed
/// scope hides its subtree.
pub fn select_scopes<F>(formula: &Formula, pred: F, root: Option<ScopeId>) -> Vec<ScopeId>
where
    F: Fn(&Scope) -> bool,
{
    let mut scopes = Vec::new();
    let mut to_visit = vec![root.unwrap_or_else(|| formula.root_id())];
    while let Some(id) = to_visit.pop() {
        if formula.subst_scopes.is_subst(id) {
            continue;
        }
        let scope = formula.scope(id);
        if pred(scope) {
            scopes.push(id);
        }
        to_visit.extend(scope.scopes());
    }
    scopes
}

/// Live commands of all live regular scopes plus the fresh declarations,
/// matching `pred`, in ascending id order.
pub fn select_cmds<F>(formula: &Formula, pred: F) -> Vec<CmdId>
where
    F: Fn(&Cmd) -> bool,
{
    let scopes = select_scopes(formula, |s| s.is_regular(), None);
    let candidates = scopes
        .iter()
        .flat_map(|s| formula.scope(*s).cmds())
        .chain(formula.declfun_table().values().copied());
    let cmds: BTreeSet<CmdId> = candidates
        .filter(|c| !formula.subst_cmds.is_subst(*c) && pred(formula.cmd(*c)))
        .collect();
    cmds.into_iter().collect()
}

/// Term roots of `cmds`: every value of `get-value`, the payload otherwise.
pub fn term_roots(formula: &Formula, cmds: &[CmdId]) -> Vec<TermId> {
    cmds.iter()
        .flat_map(|c| formula.cmd(*c).term_roots().iter().copied())
        .collect()
}

/// Live terms reachable from `roots` that match `pred`, in ascending id
/// order. Applications whose function symbol was substituted are not
/// descended into.
pub fn select_terms<F>(formula: &Formula, pred: F, roots: &[TermId]) -> Vec<TermId>
where
    F: Fn(&Formula, &Term) -> bool,
{
    let mut terms = Vec::new();
    let mut visited = HashSet::new();
    let mut to_visit = roots.to_vec();
    while let Some(id) = to_visit.pop() {
        let cur = match formula.resolve_term(id) {
            Some(cur) => cur,
            None => continue,
        };
        if !visited.insert(cur) {
            continue;
        }
        let term = formula.term(cur);
        if term.is_fun() {
            if let Some(head) = term.children.first() {
                if formula.subst_terms.is_subst(*head) {
                    continue;
                }
            }
        }
        if pred(formula, term) {
            terms.push(cur);
        }
        to_visit.extend(term.children.iter().copied());
    }
    terms.sort();
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Formula {
        parser::parse(
            "(set-logic QF_LIA)\n\
             (declare-fun x () Int)\n\
             (declare-fun f (Int) Int)\n\
             (assert (> (f x) 0))\n\
             (push 1)\n\
             (assert (< x 3))\n\
             (push 1)\n\
             (assert (= x (f x)))\n\
             (pop 1)\n\
             (pop 1)\n\
             (get-value (x (f 1)))\n",
        )
        .unwrap()
    }

    #[test]
    fn test_select_scopes() {
        let mut f = sample();
        let level1 = select_scopes(&f, |s| s.level == 1, None);
        let level2 = select_scopes(&f, |s| s.level == 2, None);
        assert_eq!(level1.len(), 1);
        assert_eq!(level2.len(), 1);
        assert!(select_scopes(&f, |s| !s.is_regular(), None).is_empty());

        f.subst_scopes.subst(level1[0], None);
        assert!(select_scopes(&f, |s| s.level == 2, None).is_empty());
        assert_eq!(select_scopes(&f, |_| true, None), vec![f.root_id()]);
    }

    #[test]
    fn test_select_cmds() {
        let mut f = sample();
        let asserts = select_cmds(&f, |c| c.is_assert());
        assert_eq!(asserts.len(), 3);
        assert!(asserts.windows(2).all(|w| w[0] < w[1]));

        f.subst_cmds.subst(asserts[1], None);
        assert_eq!(select_cmds(&f, |c| c.is_assert()), vec![asserts[0], asserts[2]]);

        let v = f.add_fresh_declfun(ir::Sort::Int);
        let decls = select_cmds(&f, |c| c.is_declfun());
        assert_eq!(decls.len(), 3);
        assert_eq!(f.cmd(*decls.last().unwrap()).children, vec![v]);
    }

    #[test]
    fn test_select_terms() {
        let mut f = sample();
        let asserts = select_cmds(&f, |c| c.is_assert());
        let roots = term_roots(&f, &asserts);
        assert_eq!(roots.len(), 3);

        let is_int = |_: &Formula, t: &Term| !t.is_const() && t.sort == Some(ir::Sort::Int);
        // x is shared, the two applications of f are not
        let ints = select_terms(&f, is_int, &roots);
        assert_eq!(ints.len(), 3);
        assert!(ints.windows(2).all(|w| w[0] < w[1]));

        let getvalue = select_cmds(&f, |c| c.is_getvalue());
        assert_eq!(term_roots(&f, &getvalue).len(), 2);

        f.subst_terms.subst(ints[1], Some(ints[0]));
        assert_eq!(select_terms(&f, is_int, &roots).len(), 2);
    }

    #[test]
    fn test_substituted_function_is_not_descended() {
        let mut f = sample();
        let asserts = select_cmds(&f, |c| c.is_assert());
        let roots = term_roots(&f, &asserts[..1]);
        let apps = select_terms(&f, |_, t| t.is_fun(), &roots);
        assert_eq!(apps.len(), 1);
        let head = f.term(apps[0]).children[0];
        let zero = f.int_zero_const();
        f.subst_terms.subst(head, Some(zero));
        let all = select_terms(&f, |_, _| true, &roots);
        // only (> (f x) 0) and 0
        assert_eq!(all.len(), 2);
    }
}
