use std::fmt;

/// Theory type of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    BitVec(u32),
    Int,
    Real,
    Array(Box<Sort>, Box<Sort>),
    /// Uninterpreted or user-defined sort, with its (possibly empty) arguments.
    Named(String, Vec<Sort>),
}

impl Sort {
    pub fn array(index: Sort, element: Sort) -> Sort {
        Sort::Array(Box::new(index), Box::new(element))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Sort::Bool)
    }

    pub fn is_bv(&self) -> bool {
        matches!(self, Sort::BitVec(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Sort::Int)
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Sort::Real)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Sort::Array(..))
    }

    pub fn bv_width(&self) -> Option<u32> {
        match self {
            Sort::BitVec(w) => Some(*w),
            _ => None,
        }
    }

    /// Element sort of an array sort.
    pub fn element(&self) -> Option<&Sort> {
        match self {
            Sort::Array(_, e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Real => write!(f, "Real"),
            Sort::BitVec(w) => write!(f, "(_ BitVec {})", w),
            Sort::Array(i, e) => write!(f, "(Array {} {})", i, e),
            Sort::Named(name, args) if args.is_empty() => write!(f, "{}", name),
            Sort::Named(name, args) => {
                write!(f, "({}", name)?;
                for a in args {
                    write!(f, " {}", a)?;
                }
                write!(f, ")")
            }
        }
    }
}
