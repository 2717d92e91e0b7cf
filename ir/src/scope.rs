use indexmap::IndexMap;

use crate::{CmdId, ScopeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The file itself, level 0.
    Global,
    /// A `(push 1)` ... `(pop 1)` block.
    Push,
    /// Holder for declarations created during reduction; not part of the
    /// scope tree.
    Reserved,
}

/// Scope content in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Cmd(CmdId),
    Scope(ScopeId),
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub level: u32,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub items: Vec<Item>,
    /// Functions declared or defined directly in this scope.
    pub funs: IndexMap<String, CmdId>,
    /// Global table of fresh declarations. Only the root's table is used.
    pub declfun_cmds: IndexMap<String, CmdId>,
    /// Whether the source contained the matching `pop`.
    pub closed: bool,
}

impl Scope {
    pub fn new(id: ScopeId, level: u32, parent: Option<ScopeId>, kind: ScopeKind) -> Scope {
        Scope {
            id,
            level,
            parent,
            kind,
            items: Vec::new(),
            funs: IndexMap::new(),
            declfun_cmds: IndexMap::new(),
            closed: false,
        }
    }

    pub fn is_regular(&self) -> bool {
        !matches!(self.kind, ScopeKind::Reserved)
    }

    pub fn cmds(&self) -> impl Iterator<Item = CmdId> + '_ {
        self.items.iter().filter_map(|item| match item {
            Item::Cmd(c) => Some(*c),
            Item::Scope(_) => None,
        })
    }

    pub fn scopes(&self) -> impl Iterator<Item = ScopeId> + '_ {
        self.items.iter().filter_map(|item| match item {
            Item::Scope(s) => Some(*s),
            Item::Cmd(_) => None,
        })
    }
}
