use std::fmt;

use crate::sort::Sort;
use crate::TermId;

/// A theory operator, possibly indexed as in `(_ extract 7 0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Op {
    pub name: String,
    pub indices: Vec<String>,
}

impl Op {
    pub fn new(name: impl Into<String>) -> Op {
        Op { name: name.into(), indices: Vec::new() }
    }

    pub fn indexed(name: impl Into<String>, indices: Vec<String>) -> Op {
        Op { name: name.into(), indices }
    }

    /// True for the plain (non-indexed) operator `name`.
    pub fn is(&self, name: &str) -> bool {
        self.indices.is_empty() && self.name == name
    }

    /// Numeric index `i`, if present and well formed.
    pub fn index(&self, i: usize) -> Option<u32> {
        self.indices.get(i).and_then(|s| s.parse().ok())
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.indices.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "(_ {} {})", self.name, self.indices.join(" "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// Literal, rendered verbatim.
    Const(String),
    /// Function symbol or bound variable. All occurrences share one node.
    Symbol(String),
    /// Theory operator application over the children.
    Builtin(Op),
    /// User function application; `children[0]` is the function symbol.
    Apply,
    /// condition, then, else
    Ite,
    /// bindings..., body
    Let,
    /// bound variable, bound term
    VarBinding,
    /// sorted variables..., body
    Forall,
    Exists,
    /// `(! t <attributes>)`
    Annotated(String),
}

#[derive(Debug, Clone)]
pub struct Term {
    pub id: TermId,
    pub kind: TermKind,
    pub children: Vec<TermId>,
    pub sort: Option<Sort>,
}

impl Term {
    pub fn is_const(&self) -> bool {
        matches!(self.kind, TermKind::Const(_))
    }

    pub fn is_fun(&self) -> bool {
        matches!(self.kind, TermKind::Apply)
    }

    pub fn is_let(&self) -> bool {
        matches!(self.kind, TermKind::Let)
    }

    pub fn is_varb(&self) -> bool {
        matches!(self.kind, TermKind::VarBinding)
    }

    pub fn is_ite(&self) -> bool {
        matches!(self.kind, TermKind::Ite)
    }

    pub fn is_store(&self) -> bool {
        self.is_builtin("store") && self.children.len() == 3
    }

    pub fn is_or(&self) -> bool {
        self.is_binary("or")
    }

    pub fn is_and(&self) -> bool {
        self.is_binary("and")
    }

    pub fn is_bvor(&self) -> bool {
        self.is_binary("bvor")
    }

    pub fn is_bvand(&self) -> bool {
        self.is_binary("bvand")
    }

    fn is_builtin(&self, name: &str) -> bool {
        matches!(&self.kind, TermKind::Builtin(op) if op.is(name))
    }

    fn is_binary(&self, name: &str) -> bool {
        self.is_builtin(name) && self.children.len() == 2
    }

    pub fn symbol(&self) -> Option<&str> {
        match &self.kind {
            TermKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_true_const(&self) -> bool {
        matches!(&self.kind, TermKind::Const(c) if c == "true")
    }

    pub fn is_false_const(&self) -> bool {
        matches!(&self.kind, TermKind::Const(c) if c == "false")
    }

    /// Bit-vector literal with all bits cleared.
    pub fn is_false_bvconst(&self) -> bool {
        match &self.kind {
            TermKind::Const(c) => matches!(bv_literal(c), Some(BvLiteral { zero: true, .. })),
            _ => false,
        }
    }

    /// Bit-vector literal with all bits set, the neutral element of `bvand`.
    pub fn is_true_bvconst(&self) -> bool {
        match &self.kind {
            TermKind::Const(c) => matches!(bv_literal(c), Some(BvLiteral { ones: true, .. })),
            _ => false,
        }
    }
}

/// Shape of a bit-vector literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvLiteral {
    pub width: u32,
    pub zero: bool,
    pub ones: bool,
}

/// Classifies `#b…`, `#x…` and `(_ bvN w)` literals.
pub fn bv_literal(text: &str) -> Option<BvLiteral> {
    if let Some(bits) = text.strip_prefix("#b") {
        if bits.is_empty() || !bits.chars().all(|c| c == '0' || c == '1') {
            return None;
        }
        return Some(BvLiteral {
            width: bits.len() as u32,
            zero: bits.chars().all(|c| c == '0'),
            ones: bits.chars().all(|c| c == '1'),
        });
    }
    if let Some(hex) = text.strip_prefix("#x") {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return Some(BvLiteral {
            width: hex.len() as u32 * 4,
            zero: hex.chars().all(|c| c == '0'),
            ones: hex.chars().all(|c| c == 'f' || c == 'F'),
        });
    }
    let inner = text.strip_prefix("(_")?.strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let value = parts.next()?.strip_prefix("bv")?;
    let width: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let zero = value.chars().all(|c| c == '0');
    // widths above 128 bits are never reported as all-ones
    let ones = width > 0
        && width <= 128
        && value.parse::<u128>().ok() == Some(u128::MAX >> (128 - width));
    Some(BvLiteral { width, zero, ones })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(text: &str) -> Term {
        Term { id: TermId::new(0), kind: TermKind::Const(text.into()), children: vec![], sort: None }
    }

    #[test]
    fn test_bv_literal() {
        assert_eq!(bv_literal("#b000"), Some(BvLiteral { width: 3, zero: true, ones: false }));
        assert_eq!(bv_literal("#xFf"), Some(BvLiteral { width: 8, zero: false, ones: true }));
        assert_eq!(bv_literal("(_ bv15 4)"), Some(BvLiteral { width: 4, zero: false, ones: true }));
        assert_eq!(bv_literal("(_ bv0 32)"), Some(BvLiteral { width: 32, zero: true, ones: false }));
        assert_eq!(bv_literal("(_ bv3 4)"), Some(BvLiteral { width: 4, zero: false, ones: false }));
        assert_eq!(bv_literal("#b"), None);
        assert_eq!(bv_literal("12"), None);
    }

    #[test]
    fn test_constant_predicates() {
        assert!(constant("#b000").is_false_bvconst());
        assert!(!constant("#b010").is_false_bvconst());
        assert!(constant("#b111").is_true_bvconst());
        assert!(constant("true").is_true_const());
        assert!(constant("false").is_false_const());
        assert!(!constant("false").is_true_bvconst());
    }

    #[test]
    fn test_op_display() {
        assert_eq!(Op::new("bvadd").to_string(), "bvadd");
        assert_eq!(Op::indexed("extract", vec!["7".into(), "0".into()]).to_string(), "(_ extract 7 0)");
        assert_eq!(Op::indexed("zero_extend", vec!["4".into()]).index(0), Some(4));
        assert!(!Op::indexed("extract", vec!["1".into(), "0".into()]).is("extract"));
    }
}
