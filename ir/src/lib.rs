//! In-memory representation of an SMT-LIB v2 file for delta debugging.
//!
//! A `Formula` is three arenas (scopes, commands, terms) addressed by dense
//! ids, plus one substitution ledger per arena. Reduction never deletes an
//! entity: it records in the ledger that the entity is replaced by another
//! one or removed, and the serializer in `dump` honours those records.
//! Terms form a DAG; symbols and constants are shared between all their
//! occurrences.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use thiserror::Error;

#[macro_use]
mod macros;

pub mod cmd;
pub mod dump;
pub mod logic;
pub mod scope;
pub mod sort;
pub mod subst;
pub mod term;

pub use cmd::{Cmd, CmdKind};
pub use logic::Logic;
pub use scope::{Item, Scope, ScopeKind};
pub use sort::Sort;
pub use subst::{Snapshot, SubstTable};
pub use term::{Op, Term, TermKind};

entity_id!(
    /// Id of a scope, in creation order.
    ScopeId,
    "scope"
);
entity_id!(
    /// Id of a top-level command, in creation order.
    CmdId,
    "cmd"
);
entity_id!(
    /// Id of a term node, in creation order.
    TermId,
    "term"
);

#[derive(Error, Debug)]
pub enum IrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown function '{0}'")]
    UnknownFun(String),

    #[error("inconsistent declaration table: {0}")]
    Inconsistent(String),
}

/// State needed to undo the declarations of a rejected trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    declfun_cmds: IndexMap<String, CmdId>,
    journal_len: usize,
}

#[derive(Debug, Clone)]
pub struct Formula {
    pub logic: Logic,
    scopes: Vec<Scope>,
    cmds: Vec<Cmd>,
    terms: Vec<Term>,
    root: ScopeId,
    reserved: ScopeId,
    pub subst_scopes: SubstTable<ScopeId>,
    pub subst_cmds: SubstTable<CmdId>,
    pub subst_terms: SubstTable<TermId>,
    consts: HashMap<(String, Option<Sort>), TermId>,
    substvars: HashSet<TermId>,
    names: HashSet<String>,
    next_fresh: usize,
    /// Fresh declarations created since the last checkpoint.
    journal: Vec<CmdId>,
}

impl Default for Formula {
    fn default() -> Self {
        Formula::new(Logic::all())
    }
}

impl Formula {
    pub fn new(logic: Logic) -> Formula {
        let root = ScopeId::new(0);
        let reserved = ScopeId::new(1);
        Formula {
            logic,
            scopes: vec![
                Scope::new(root, 0, None, ScopeKind::Global),
                Scope::new(reserved, 0, Some(root), ScopeKind::Reserved),
            ],
            cmds: Vec::new(),
            terms: Vec::new(),
            root,
            reserved,
            subst_scopes: SubstTable::new(),
            subst_cmds: SubstTable::new(),
            subst_terms: SubstTable::new(),
            consts: HashMap::new(),
            substvars: HashSet::new(),
            names: HashSet::new(),
            next_fresh: 0,
            journal: Vec::new(),
        }
    }

    // ---------------- accessors ----------------

    pub fn root_id(&self) -> ScopeId {
        self.root
    }

    pub fn reserved_id(&self) -> ScopeId {
        self.reserved
    }

    pub fn root(&self) -> &Scope {
        self.scope(self.root)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn cmd(&self, id: CmdId) -> &Cmd {
        &self.cmds[id.index()]
    }

    pub fn term(&self, id: TermId) -> &Term {
        &self.terms[id.index()]
    }

    pub fn num_scopes(&self) -> usize {
        self.scopes.len()
    }

    pub fn num_cmds(&self) -> usize {
        self.cmds.len()
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    /// Current replacement of `id`, `None` if it was removed.
    pub fn resolve_term(&self, id: TermId) -> Option<TermId> {
        self.subst_terms.resolve(id)
    }

    /// Resolved term node, `None` if it was removed.
    pub fn resolved(&self, id: TermId) -> Option<&Term> {
        self.resolve_term(id).map(|t| self.term(t))
    }

    pub fn is_substvar(&self, id: TermId) -> bool {
        self.substvars.contains(&id)
    }

    // ---------------- construction ----------------

    /// Opens a nested `Push` scope at the end of `parent`.
    pub fn new_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId::new(self.scopes.len() as u32);
        let level = self.scope(parent).level + 1;
        self.scopes.push(Scope::new(id, level, Some(parent), ScopeKind::Push));
        self.scope_mut(parent).items.push(Item::Scope(id));
        id
    }

    pub fn close_scope(&mut self, id: ScopeId) {
        self.scope_mut(id).closed = true;
    }

    /// Appends a command to `scope` and registers the name it declares.
    pub fn new_cmd(&mut self, scope: ScopeId, kind: CmdKind, children: Vec<TermId>) -> CmdId {
        let id = CmdId::new(self.cmds.len() as u32);
        let cmd = Cmd { id, kind, children, scope };
        if let Some(name) = cmd.declared_name() {
            let name = name.to_string();
            self.names.insert(name.clone());
            self.scope_mut(scope).funs.insert(name, id);
        }
        self.cmds.push(cmd);
        self.scope_mut(scope).items.push(Item::Cmd(id));
        id
    }

    pub fn new_term(&mut self, kind: TermKind, children: Vec<TermId>, sort: Option<Sort>) -> TermId {
        let id = TermId::new(self.terms.len() as u32);
        self.terms.push(Term { id, kind, children, sort });
        id
    }

    /// Shared constant node for `text` of the given sort.
    pub fn const_term(&mut self, text: &str, sort: Option<Sort>) -> TermId {
        let key = (text.to_string(), sort);
        if let Some(id) = self.consts.get(&key) {
            return *id;
        }
        let id = self.new_term(TermKind::Const(key.0.clone()), Vec::new(), key.1.clone());
        self.consts.insert(key, id);
        id
    }

    pub fn bool_const(&mut self, value: bool) -> TermId {
        self.const_term(if value { "true" } else { "false" }, Some(Sort::Bool))
    }

    pub fn bv_zero_const(&mut self, width: u32) -> TermId {
        self.const_term(&format!("(_ bv0 {})", width), Some(Sort::BitVec(width)))
    }

    pub fn int_zero_const(&mut self) -> TermId {
        self.const_term("0", Some(Sort::Int))
    }

    pub fn real_zero_const(&mut self) -> TermId {
        self.const_term("0.0", Some(Sort::Real))
    }

    // ---------------- declarations ----------------

    /// Looks `name` up from `scope` outwards, then in the table of fresh
    /// declarations.
    pub fn find_fun(&self, name: &str, scope: ScopeId) -> Option<CmdId> {
        let mut cur = Some(scope);
        while let Some(id) = cur {
            let s = self.scope(id);
            if let Some(cmd) = s.funs.get(name) {
                return Some(*cmd);
            }
            cur = s.parent;
        }
        self.root()
            .declfun_cmds
            .get(name)
            .or_else(|| self.scope(self.reserved).funs.get(name))
            .copied()
    }

    /// Keeps a binder or declared name out of the fresh-name space.
    pub fn reserve_name(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    fn fresh_name(&mut self) -> String {
        loop {
            let name = format!("_substvar_{}_", self.next_fresh);
            self.next_fresh += 1;
            if !self.names.contains(&name) {
                return name;
            }
        }
    }

    /// Declares a fresh constant of `sort` and returns its symbol term.
    pub fn add_fresh_declfun(&mut self, sort: Sort) -> TermId {
        let name = self.fresh_name();
        let term = self.new_term(TermKind::Symbol(name.clone()), Vec::new(), Some(sort.clone()));
        let kind = CmdKind::DeclareFun { name: name.clone(), params: Vec::new(), ret: sort };
        let cmd = self.new_cmd(self.reserved, kind, vec![term]);
        let root = self.root;
        self.scope_mut(root).declfun_cmds.insert(name, cmd);
        self.substvars.insert(term);
        self.journal.push(cmd);
        term
    }

    /// Removes a fresh declaration from every table. The nodes stay in the
    /// arenas but are no longer reachable.
    pub fn delete_fun(&mut self, name: &str) -> Result<(), IrError> {
        let reserved = self.reserved;
        let cmd = self
            .scope_mut(reserved)
            .funs
            .shift_remove(name)
            .ok_or_else(|| IrError::UnknownFun(name.to_string()))?;
        self.scope_mut(reserved).items.retain(|item| *item != Item::Cmd(cmd));
        let root = self.root;
        self.scope_mut(root).declfun_cmds.shift_remove(name);
        for t in self.cmds[cmd.index()].children.clone() {
            self.substvars.remove(&t);
        }
        self.names.remove(name);
        Ok(())
    }

    /// Verifies that every entry of the fresh declaration table resolves.
    pub fn check_declfuns(&self) -> Result<(), IrError> {
        for name in self.root().declfun_cmds.keys() {
            if self.find_fun(name, self.root).is_none() {
                return Err(IrError::Inconsistent(format!("'{}' is not declared", name)));
            }
        }
        Ok(())
    }

    // ---------------- trials ----------------

    pub fn checkpoint(&mut self) -> Checkpoint {
        self.journal.clear();
        Checkpoint { declfun_cmds: self.root().declfun_cmds.clone(), journal_len: 0 }
    }

    /// Keeps everything created since `checkpoint`.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        self.journal.truncate(checkpoint.journal_len);
    }

    /// Restores the declaration table and deletes every fresh declaration
    /// created since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> Result<(), IrError> {
        let created: Vec<CmdId> = self.journal.drain(checkpoint.journal_len..).collect();
        let root = self.root;
        self.scope_mut(root).declfun_cmds = checkpoint.declfun_cmds;
        for cmd in created {
            let name = self.cmds[cmd.index()]
                .declared_name()
                .map(str::to_string)
                .ok_or_else(|| IrError::Inconsistent(format!("{} is not a declaration", cmd)))?;
            self.delete_fun(&name)?;
        }
        Ok(())
    }

    /// Snapshot of the fresh declaration table, for comparisons.
    pub fn declfun_table(&self) -> &IndexMap<String, CmdId> {
        &self.root().declfun_cmds
    }

    /// Number of live scopes, commands and terms reachable from the root.
    /// Fresh declarations are counted through their uses only, so no
    /// accepted substitution increases the count.
    pub fn entity_count(&self) -> usize {
        let mut count = 0;
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        let mut scopes = vec![self.root];
        while let Some(id) = scopes.pop() {
            if self.subst_scopes.is_subst(id) {
                continue;
            }
            if id != self.root {
                count += 1;
            }
            for item in &self.scope(id).items {
                match *item {
                    Item::Scope(s) => scopes.push(s),
                    Item::Cmd(c) if !self.subst_cmds.is_subst(c) => {
                        count += 1;
                        terms.extend(self.cmd(c).children.iter().copied());
                    }
                    Item::Cmd(_) => {}
                }
            }
        }
        while let Some(t) = terms.pop() {
            let t = match self.resolve_term(t) {
                Some(t) => t,
                None => continue,
            };
            if seen.insert(t) {
                count += 1;
                terms.extend(self.term(t).children.iter().copied());
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_shared() {
        let mut f = Formula::default();
        let a = f.bool_const(false);
        let b = f.bool_const(false);
        let c = f.bool_const(true);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(f.bv_zero_const(4), f.bv_zero_const(4));
        assert_ne!(f.bv_zero_const(4), f.bv_zero_const(8));
        let z = f.real_zero_const();
        assert_eq!(f.term(z).sort, Some(Sort::Real));
    }

    #[test]
    fn test_scopes_and_lookup() {
        let mut f = Formula::default();
        let x = f.new_term(TermKind::Symbol("x".into()), vec![], Some(Sort::Int));
        let decl = f.new_cmd(
            f.root_id(),
            CmdKind::DeclareFun { name: "x".into(), params: vec![], ret: Sort::Int },
            vec![x],
        );
        let inner = f.new_scope(f.root_id());
        let innermost = f.new_scope(inner);
        assert_eq!(f.scope(inner).level, 1);
        assert_eq!(f.scope(innermost).level, 2);
        assert_eq!(f.find_fun("x", innermost), Some(decl));
        assert_eq!(f.find_fun("y", innermost), None);
        assert_eq!(f.root().scopes().collect::<Vec<_>>(), vec![inner]);
        assert_eq!(f.root().cmds().collect::<Vec<_>>(), vec![decl]);
        assert!(!f.scope(f.reserved_id()).is_regular());
    }

    #[test]
    fn test_fresh_declarations_rollback() {
        let mut f = Formula::default();
        let kept = f.add_fresh_declfun(Sort::Bool);
        let cp = f.checkpoint();
        f.commit(cp);

        let before = f.declfun_table().clone();
        let cp = f.checkpoint();
        let v = f.add_fresh_declfun(Sort::BitVec(8));
        assert!(f.is_substvar(v));
        assert_eq!(f.declfun_table().len(), 2);
        f.rollback(cp).unwrap();

        assert_eq!(f.declfun_table(), &before);
        assert!(!f.is_substvar(v));
        assert!(f.is_substvar(kept));
        assert_eq!(f.scope(f.reserved_id()).items.len(), 1);
        assert!(f.check_declfuns().is_ok());
    }

    #[test]
    fn test_fresh_names_avoid_existing() {
        let mut f = Formula::default();
        f.new_cmd(
            f.root_id(),
            CmdKind::DeclareConst { name: "_substvar_0_".into(), sort: Sort::Int },
            vec![],
        );
        let v = f.add_fresh_declfun(Sort::Int);
        assert_eq!(f.term(v).symbol(), Some("_substvar_1_"));
    }

    #[test]
    fn test_fresh_names_avoid_binders() {
        let mut f = Formula::default();
        f.reserve_name("_substvar_0_");
        f.reserve_name("_substvar_1_");
        let v = f.add_fresh_declfun(Sort::Int);
        assert_eq!(f.term(v).symbol(), Some("_substvar_2_"));
    }

    #[test]
    fn test_entity_count() {
        let mut f = Formula::default();
        let root = f.root_id();
        let p = f.new_term(TermKind::Symbol("p".into()), vec![], Some(Sort::Bool));
        f.new_cmd(root, CmdKind::DeclareConst { name: "p".into(), sort: Sort::Bool }, vec![p]);
        let not = f.new_term(TermKind::Builtin(Op::new("not")), vec![p], Some(Sort::Bool));
        let s = f.new_scope(root);
        let a = f.new_cmd(s, CmdKind::Assert, vec![not]);
        // scope, 2 cmds, 2 terms
        assert_eq!(f.entity_count(), 5);
        f.subst_terms.subst(not, Some(p));
        assert_eq!(f.entity_count(), 4);
        f.subst_cmds.subst(a, None);
        assert_eq!(f.entity_count(), 3);
        f.subst_scopes.subst(s, None);
        assert_eq!(f.entity_count(), 2);
    }

    #[test]
    fn test_entity_count_with_fresh_vars() {
        let mut f = Formula::default();
        let root = f.root_id();
        let p = f.new_term(TermKind::Symbol("p".into()), vec![], Some(Sort::Bool));
        f.new_cmd(root, CmdKind::DeclareConst { name: "p".into(), sort: Sort::Bool }, vec![p]);
        let not = f.new_term(TermKind::Builtin(Op::new("not")), vec![p], Some(Sort::Bool));
        f.new_cmd(root, CmdKind::Assert, vec![not]);
        assert_eq!(f.entity_count(), 4);
        let v = f.add_fresh_declfun(Sort::Bool);
        f.subst_terms.subst(p, Some(v));
        assert_eq!(f.entity_count(), 4);
        let w = f.add_fresh_declfun(Sort::Bool);
        f.subst_terms.subst(not, Some(w));
        assert_eq!(f.entity_count(), 4);
    }

    #[test]
    fn test_delete_unknown() {
        let mut f = Formula::default();
        assert!(matches!(f.delete_fun("nope"), Err(IrError::UnknownFun(_))));
    }
}
