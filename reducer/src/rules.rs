//! Term rewrite rules, in the order the driver tries them.

use ir::{Cmd, Formula, Logic, Term, TermId};

/// Statement group whose payloads a term rule is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    DefineFun,
    Assert,
    GetValue,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::DefineFun, Group::Assert, Group::GetValue];

    pub fn name(self) -> &'static str {
        match self {
            Group::DefineFun => "define-fun",
            Group::Assert => "assert",
            Group::GetValue => "get-value",
        }
    }

    pub fn contains(self, cmd: &Cmd) -> bool {
        match self {
            Group::DefineFun => cmd.is_definefun(),
            Group::Assert => cmd.is_assert(),
            Group::GetValue => cmd.is_getvalue(),
        }
    }
}

pub struct TermRule {
    pub name: &'static str,
    pub description: &'static str,
    /// Whether the rule makes sense for the logic of the input.
    pub enabled: fn(&Logic) -> bool,
    pub applies: fn(&Formula, &Term) -> bool,
    pub rewrite: fn(&mut Formula, TermId) -> Option<TermId>,
    /// The rewrite declares fresh variables.
    pub with_vars: bool,
}

fn always(_: &Logic) -> bool {
    true
}

fn bv_logic(logic: &Logic) -> bool {
    logic.has_bv()
}

fn arith_logic(logic: &Logic) -> bool {
    logic.has_int() || logic.has_real()
}

fn real_logic(logic: &Logic) -> bool {
    logic.has_real()
}

fn array_logic(logic: &Logic) -> bool {
    logic.has_arrays()
}

fn is_bv(_: &Formula, t: &Term) -> bool {
    !t.is_const() && t.sort.as_ref().map_or(false, |s| s.is_bv())
}

fn is_int(_: &Formula, t: &Term) -> bool {
    !t.is_const() && t.sort.as_ref().map_or(false, |s| s.is_int())
}

fn is_real(_: &Formula, t: &Term) -> bool {
    !t.is_const() && t.sort.as_ref().map_or(false, |s| s.is_real())
}

fn is_bool(_: &Formula, t: &Term) -> bool {
    !t.is_const() && t.sort.as_ref().map_or(false, |s| s.is_bool())
}

fn is_bv_var(f: &Formula, t: &Term) -> bool {
    is_bv(f, t) && !f.is_substvar(t.id)
}

fn is_int_var(f: &Formula, t: &Term) -> bool {
    is_int(f, t) && !f.is_substvar(t.id)
}

fn is_real_var(f: &Formula, t: &Term) -> bool {
    is_real(f, t) && !f.is_substvar(t.id)
}

fn is_bool_var(f: &Formula, t: &Term) -> bool {
    is_bool(f, t) && !f.is_substvar(t.id)
}

/// Whether the resolved child `i` of `t` satisfies `pred`.
fn child_is(f: &Formula, t: &Term, i: usize, pred: fn(&Term) -> bool) -> bool {
    t.children.get(i).and_then(|c| f.resolved(*c)).map_or(false, pred)
}

/// The resolved child of a binary term other than the one matching `neutral`.
fn other_child(f: &Formula, id: TermId, neutral: fn(&Term) -> bool) -> Option<TermId> {
    let t = f.term(id);
    let (lhs, rhs) = (*t.children.first()?, *t.children.get(1)?);
    if f.resolved(lhs).map_or(false, neutral) {
        f.resolve_term(rhs)
    } else {
        f.resolve_term(lhs)
    }
}

fn child(f: &Formula, id: TermId, i: usize) -> Option<TermId> {
    f.term(id).children.get(i).and_then(|c| f.resolve_term(*c))
}

fn fresh_var(f: &mut Formula, id: TermId) -> Option<TermId> {
    let sort = f.term(id).sort.clone()?;
    Some(f.add_fresh_declfun(sort))
}

fn bv_zero(f: &mut Formula, id: TermId) -> Option<TermId> {
    let width = f.term(id).sort.as_ref()?.bv_width()?;
    Some(f.bv_zero_const(width))
}

pub static CATALOG: &[TermRule] = &[
    TermRule {
        name: "bv0",
        description: "substitute BV terms with '0'",
        enabled: bv_logic,
        applies: is_bv,
        rewrite: bv_zero,
        with_vars: false,
    },
    TermRule {
        name: "bvor",
        description: "substitute (bvor term false) with term",
        enabled: bv_logic,
        applies: |f, t| {
            t.is_bvor() && (child_is(f, t, 0, Term::is_false_bvconst) || child_is(f, t, 1, Term::is_false_bvconst))
        },
        rewrite: |f, id| other_child(f, id, Term::is_false_bvconst),
        with_vars: false,
    },
    TermRule {
        name: "bvand",
        description: "substitute (bvand term true) with term",
        enabled: bv_logic,
        applies: |f, t| {
            t.is_bvand() && (child_is(f, t, 0, Term::is_true_bvconst) || child_is(f, t, 1, Term::is_true_bvconst))
        },
        rewrite: |f, id| other_child(f, id, Term::is_true_bvconst),
        with_vars: false,
    },
    TermRule {
        name: "bvvar",
        description: "substitute BV terms with fresh variables",
        enabled: bv_logic,
        applies: is_bv_var,
        rewrite: fresh_var,
        with_vars: true,
    },
    TermRule {
        name: "int0",
        description: "substitute Int terms with '0'",
        enabled: arith_logic,
        applies: is_int,
        rewrite: |f, _| Some(f.int_zero_const()),
        with_vars: false,
    },
    TermRule {
        name: "intvar",
        description: "substitute Int terms with fresh variables",
        enabled: arith_logic,
        applies: is_int_var,
        rewrite: fresh_var,
        with_vars: true,
    },
    TermRule {
        name: "real0",
        description: "substitute Real terms with '0.0'",
        enabled: real_logic,
        applies: is_real,
        rewrite: |f, _| Some(f.real_zero_const()),
        with_vars: false,
    },
    TermRule {
        name: "realvar",
        description: "substitute Real terms with fresh variables",
        enabled: real_logic,
        applies: is_real_var,
        rewrite: fresh_var,
        with_vars: true,
    },
    TermRule {
        name: "let",
        description: "substitute LETs with child term",
        enabled: always,
        applies: |_, t| t.is_let(),
        rewrite: |f, id| {
            let body = *f.term(id).children.last()?;
            f.resolve_term(body)
        },
        with_vars: false,
    },
    TermRule {
        name: "varb",
        description: "eliminate redundant variable bindings",
        enabled: always,
        applies: |f, t| t.is_varb() && t.children.first().map_or(false, |v| f.subst_terms.is_subst(*v)),
        rewrite: |_, _| None,
        with_vars: false,
    },
    TermRule {
        name: "false",
        description: "substitute Boolean terms with 'false'",
        enabled: always,
        applies: is_bool,
        rewrite: |f, _| Some(f.bool_const(false)),
        with_vars: false,
    },
    TermRule {
        name: "or",
        description: "substitute (or term false) with term",
        enabled: always,
        applies: |f, t| {
            t.is_or() && (child_is(f, t, 0, Term::is_false_const) || child_is(f, t, 1, Term::is_false_const))
        },
        rewrite: |f, id| other_child(f, id, Term::is_false_const),
        with_vars: false,
    },
    TermRule {
        name: "true",
        description: "substitute Boolean terms with 'true'",
        enabled: always,
        applies: is_bool,
        rewrite: |f, _| Some(f.bool_const(true)),
        with_vars: false,
    },
    TermRule {
        name: "and",
        description: "substitute (and term true) with term",
        enabled: always,
        applies: |f, t| {
            t.is_and() && (child_is(f, t, 0, Term::is_true_const) || child_is(f, t, 1, Term::is_true_const))
        },
        rewrite: |f, id| other_child(f, id, Term::is_true_const),
        with_vars: false,
    },
    TermRule {
        name: "boolvar",
        description: "substitute Boolean terms with fresh variables",
        enabled: always,
        applies: is_bool_var,
        rewrite: fresh_var,
        with_vars: true,
    },
    TermRule {
        name: "store",
        description: "substitute STOREs with array child",
        enabled: array_logic,
        applies: |_, t| t.is_store(),
        rewrite: |f, id| child(f, id, 0),
        with_vars: false,
    },
    TermRule {
        name: "iteleft",
        description: "substitute ITE with left child",
        enabled: always,
        applies: |_, t| t.is_ite(),
        rewrite: |f, id| child(f, id, 1),
        with_vars: false,
    },
    TermRule {
        name: "iteright",
        description: "substitute ITE with right child",
        enabled: always,
        applies: |_, t| t.is_ite(),
        rewrite: |f, id| child(f, id, 2),
        with_vars: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::{select_cmds, select_terms, term_roots};

    fn rule(name: &str) -> &'static TermRule {
        CATALOG.iter().find(|r| r.name == name).unwrap()
    }

    fn candidates(f: &Formula, rule: &TermRule) -> Vec<TermId> {
        let roots = term_roots(f, &select_cmds(f, |c| c.is_assert()));
        select_terms(f, rule.applies, &roots)
    }

    #[test]
    fn test_catalog_order() {
        let names: Vec<&str> = CATALOG.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "bv0", "bvor", "bvand", "bvvar", "int0", "intvar", "real0", "realvar", "let", "varb", "false",
                "or", "true", "and", "boolvar", "store", "iteleft", "iteright"
            ]
        );
        assert!(CATALOG.iter().filter(|r| r.with_vars).all(|r| r.name.ends_with("var")));
    }

    #[test]
    fn test_gating() {
        let bv = Logic::parse("QF_BV");
        let lra = Logic::parse("QF_LRA");
        assert!((rule("bv0").enabled)(&bv));
        assert!(!(rule("int0").enabled)(&bv));
        assert!((rule("int0").enabled)(&lra));
        assert!((rule("real0").enabled)(&lra));
        assert!(!(rule("store").enabled)(&lra));
        assert!((rule("store").enabled)(&Logic::parse("QF_AUFBV")));
    }

    #[test]
    fn test_neutral_elements() {
        let mut f = parser::parse(
            "(set-logic QF_BV)\n\
             (declare-fun x () (_ BitVec 4))\n\
             (assert (= (bvor #b0000 x) (bvand x #xf) (bvor x x)))\n",
        )
        .unwrap();
        let x = f.root().cmds().nth(1).map(|c| f.cmd(c).children[0]).unwrap();

        let ors = candidates(&f, rule("bvor"));
        assert_eq!(ors.len(), 1);
        assert_eq!((rule("bvor").rewrite)(&mut f, ors[0]), Some(x));

        let ands = candidates(&f, rule("bvand"));
        assert_eq!(ands.len(), 1);
        assert_eq!((rule("bvand").rewrite)(&mut f, ands[0]), Some(x));

        // x, the two bvor and the bvand, but no literal
        assert_eq!(candidates(&f, rule("bv0")).len(), 4);
        let zero = (rule("bv0").rewrite)(&mut f, x).unwrap();
        assert_eq!(ir::dump::to_string(&f).lines().count(), 3);
        assert_eq!(f.term(zero).kind, ir::TermKind::Const("(_ bv0 4)".into()));
    }

    #[test]
    fn test_boolean_rules() {
        let mut f = parser::parse(
            "(declare-fun p () Bool)\n\
             (declare-fun q () Bool)\n\
             (assert (or (and p true) false))\n\
             (assert (ite p q (let ((r q)) r)))\n",
        )
        .unwrap();
        let or = candidates(&f, rule("or"));
        assert_eq!(or.len(), 1);
        let and = (rule("or").rewrite)(&mut f, or[0]).unwrap();
        assert!(f.term(and).is_and());
        assert_eq!(candidates(&f, rule("and")), vec![and]);

        let lets = candidates(&f, rule("let"));
        assert_eq!(lets.len(), 1);
        let body = (rule("let").rewrite)(&mut f, lets[0]).unwrap();
        assert_eq!(f.term(body).symbol(), Some("r"));

        assert!(candidates(&f, rule("varb")).is_empty());
        let q = f.root().cmds().nth(1).map(|c| f.cmd(c).children[0]).unwrap();
        f.subst_terms.subst(body, Some(q));
        assert_eq!(candidates(&f, rule("varb")).len(), 1);

        let ite = candidates(&f, rule("iteleft"));
        assert_eq!(ite.len(), 1);
        assert_eq!((rule("iteleft").rewrite)(&mut f, ite[0]), Some(q));
        assert_eq!((rule("iteright").rewrite)(&mut f, ite[0]), Some(lets[0]));
    }

    #[test]
    fn test_fresh_variables_are_not_replaced_again() {
        let mut f = parser::parse("(set-logic QF_LIA)(declare-fun n () Int)(assert (> (+ n 1) n))").unwrap();
        let ints = candidates(&f, rule("intvar"));
        assert_eq!(ints.len(), 2);
        let v = (rule("intvar").rewrite)(&mut f, ints[0]).unwrap();
        f.subst_terms.subst(ints[0], Some(v));
        assert!(f.is_substvar(v));
        // n is now the fresh variable; only (+ n 1) is left
        assert_eq!(candidates(&f, rule("intvar")).len(), 1);
        assert_eq!(candidates(&f, rule("int0")).len(), 2);
    }
}
