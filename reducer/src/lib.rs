//! Delta debugging of SMT-LIB formulas.
//!
//! The driver runs rounds of strategies over a `Formula`. Each strategy picks
//! candidates with the selectors and hands them to the substitution engine,
//! which keeps a rewrite only if the oracle still answers like it did on the
//! original input.

use std::time::Duration;

pub mod driver;
pub mod engine;
mod error;
pub mod oracle;
pub mod rules;
pub mod select;
#[cfg(test)]
mod testing;

pub use driver::{reduce, Stats};
pub use engine::{Reducer, Substitutable};
pub use error::ReduceError;
pub use oracle::{CommandOracle, Oracle, RunOutcome};

#[derive(Debug, Clone)]
pub struct Config {
    /// Wall-clock limit per oracle run, unbounded if `None`.
    pub timeout: Option<Duration>,
    /// Verify the declaration table after every rollback.
    pub check_consistency: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config { timeout: None, check_consistency: true }
    }
}
