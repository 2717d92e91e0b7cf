use std::path::PathBuf;

use ir::Formula;
use tempfile::TempDir;

use crate::{Config, Oracle, ReduceError, Reducer, RunOutcome};

/// Oracle that inspects the scratch file in-process.
pub struct ScriptOracle<F> {
    scratch: PathBuf,
    check: F,
    runs: usize,
    /// Entity count of every accepted candidate, in order.
    pub accepted: Vec<usize>,
}

impl<F: FnMut(&str) -> bool> Oracle for ScriptOracle<F> {
    fn golden(&mut self) -> Result<RunOutcome, ReduceError> {
        self.runs += 1;
        Ok(RunOutcome::Exited(Some(0)))
    }

    fn test(&mut self, candidate: &Formula) -> Result<bool, ReduceError> {
        self.runs += 1;
        let text = std::fs::read_to_string(&self.scratch)?;
        let pass = (self.check)(&text);
        if pass {
            self.accepted.push(candidate.entity_count());
        }
        Ok(pass)
    }

    fn runs(&self) -> usize {
        self.runs
    }
}

/// Reducer over `source` writing to `scratch.smt2` and `out.smt2` in a
/// fresh temporary directory.
pub fn setup<F: FnMut(&str) -> bool>(source: &str, check: F) -> (TempDir, Reducer<ScriptOracle<F>>) {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch.smt2");
    let outfile = dir.path().join("out.smt2");
    let formula = parser::parse(source).unwrap();
    let oracle = ScriptOracle { scratch: scratch.clone(), check, runs: 0, accepted: Vec::new() };
    let reducer = Reducer::new(formula, oracle, &scratch, &outfile, Config::default());
    (dir, reducer)
}
