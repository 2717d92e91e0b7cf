use crate::sort::Sort;
use crate::{CmdId, ScopeId, TermId};

/// Top-level SMT-LIB command.
///
/// Commands the reducer never inspects keep their source text and are
/// written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdKind {
    SetLogic(String),
    SetOption(String),
    SetInfo(String),
    DeclareSort(String),
    DefineSort(String),
    DeclareFun { name: String, params: Vec<Sort>, ret: Sort },
    DeclareConst { name: String, sort: Sort },
    /// children: parameter symbols..., body
    DefineFun { name: String, ret: Sort },
    Assert,
    CheckSat,
    GetValue,
    Exit,
    Other(String),
}

#[derive(Debug, Clone)]
pub struct Cmd {
    pub id: CmdId,
    pub kind: CmdKind,
    pub children: Vec<TermId>,
    pub scope: ScopeId,
}

impl Cmd {
    pub fn is_assert(&self) -> bool {
        matches!(self.kind, CmdKind::Assert)
    }

    pub fn is_definefun(&self) -> bool {
        matches!(self.kind, CmdKind::DefineFun { .. })
    }

    pub fn is_declfun(&self) -> bool {
        matches!(self.kind, CmdKind::DeclareFun { .. } | CmdKind::DeclareConst { .. })
    }

    pub fn is_getvalue(&self) -> bool {
        matches!(self.kind, CmdKind::GetValue)
    }

    pub fn is_setlogic(&self) -> bool {
        matches!(self.kind, CmdKind::SetLogic(_))
    }

    pub fn is_exit(&self) -> bool {
        matches!(self.kind, CmdKind::Exit)
    }

    /// Commands that belong to the file header and stay in front of any
    /// declarations added during reduction.
    pub fn is_header(&self) -> bool {
        matches!(
            self.kind,
            CmdKind::SetLogic(_) | CmdKind::SetOption(_) | CmdKind::SetInfo(_)
        )
    }

    /// Name introduced by a declaration or definition.
    pub fn declared_name(&self) -> Option<&str> {
        match &self.kind {
            CmdKind::DeclareFun { name, .. }
            | CmdKind::DeclareConst { name, .. }
            | CmdKind::DefineFun { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Term roots the reducer descends into: every child of `get-value`,
    /// the last child otherwise.
    pub fn term_roots(&self) -> &[TermId] {
        if self.is_getvalue() {
            &self.children
        } else {
            match self.children.len() {
                0 => &[],
                n => &self.children[n - 1..],
            }
        }
    }
}
