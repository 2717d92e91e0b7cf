use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BV: Regex = Regex::new(r"BV").unwrap();
    static ref INT: Regex = Regex::new(r"(IA|IRA|IDL)").unwrap();
    static ref REAL: Regex = Regex::new(r"(RA|RDL)").unwrap();
    static ref ARRAYS: Regex = Regex::new(r"^(QF_)?A|AX").unwrap();
}

/// Theories enabled by the `set-logic` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logic {
    pub name: String,
    pub bv: bool,
    pub int: bool,
    pub real: bool,
    pub arrays: bool,
}

impl Logic {
    /// Logic of a file without `set-logic`: every theory is considered.
    pub fn all() -> Logic {
        Logic { name: "ALL".to_string(), bv: true, int: true, real: true, arrays: true }
    }

    /// Derives the theories from an SMT-LIB logic name such as `QF_AUFBV`.
    pub fn parse(name: &str) -> Logic {
        let upper = name.to_ascii_uppercase();
        if upper == "ALL" || upper == "ALL_SUPPORTED" {
            return Logic { name: name.to_string(), ..Logic::all() };
        }
        Logic {
            name: name.to_string(),
            bv: BV.is_match(&upper),
            int: INT.is_match(&upper),
            real: REAL.is_match(&upper),
            arrays: ARRAYS.is_match(&upper),
        }
    }

    pub fn has_bv(&self) -> bool {
        self.bv
    }

    pub fn has_int(&self) -> bool {
        self.int
    }

    pub fn has_real(&self) -> bool {
        self.real
    }

    pub fn has_arrays(&self) -> bool {
        self.arrays
    }
}

impl Default for Logic {
    fn default() -> Self {
        Logic::all()
    }
}
