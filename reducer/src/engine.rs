use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ir::{CmdId, Formula, ScopeId, SubstTable, TermId};
use log::debug;

use crate::{Config, Oracle, ReduceError};

/// Entity kinds with a substitution ledger in `Formula`.
pub trait Substitutable: Copy + Eq + Hash + Ord + Debug {
    fn table(formula: &Formula) -> &SubstTable<Self>;
    fn table_mut(formula: &mut Formula) -> &mut SubstTable<Self>;
}

impl Substitutable for ScopeId {
    fn table(formula: &Formula) -> &SubstTable<Self> {
        &formula.subst_scopes
    }

    fn table_mut(formula: &mut Formula) -> &mut SubstTable<Self> {
        &mut formula.subst_scopes
    }
}

impl Substitutable for CmdId {
    fn table(formula: &Formula) -> &SubstTable<Self> {
        &formula.subst_cmds
    }

    fn table_mut(formula: &mut Formula) -> &mut SubstTable<Self> {
        &mut formula.subst_cmds
    }
}

impl Substitutable for TermId {
    fn table(formula: &Formula) -> &SubstTable<Self> {
        &formula.subst_terms
    }

    fn table_mut(formula: &mut Formula) -> &mut SubstTable<Self> {
        &mut formula.subst_terms
    }
}

/// Owns the formula under reduction and runs oracle-gated trials on it.
pub struct Reducer<O: Oracle> {
    formula: Formula,
    oracle: O,
    scratch: PathBuf,
    outfile: PathBuf,
    config: Config,
    interrupted: Arc<AtomicBool>,
}

impl<O: Oracle> Reducer<O> {
    pub fn new(formula: Formula, oracle: O, scratch: &Path, outfile: &Path, config: Config) -> Self {
        Reducer {
            formula,
            oracle,
            scratch: scratch.to_path_buf(),
            outfile: outfile.to_path_buf(),
            config,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the reducer stop before the next trial once `flag` is raised.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn into_formula(self) -> Formula {
        self.formula
    }

    /// Oracle runs so far.
    pub fn tests(&self) -> usize {
        self.oracle.runs()
    }

    fn dump(&self, path: &Path) -> Result<(), ReduceError> {
        ir::dump::dump_to_file(&self.formula, path)
            .map_err(|source| ReduceError::Dump { path: path.to_path_buf(), source })
    }

    fn check_interrupt(&self) -> Result<(), ReduceError> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(ReduceError::Interrupted);
        }
        Ok(())
    }

    /// Tries `rewrite` on shrinking chunks of `candidates` and keeps every
    /// chunk the oracle accepts. Returns the number of substitutions kept.
    ///
    /// Chunks are consecutive slices of `candidates`; accepted chunks are not
    /// retried, rejected ones are split further. `with_vars` marks rewrites
    /// that declare fresh variables.
    pub fn substitute<K, F>(&mut self, candidates: Vec<K>, mut rewrite: F, with_vars: bool) -> Result<usize, ReduceError>
    where
        K: Substitutable,
        F: FnMut(&mut Formula, K) -> Option<K>,
    {
        let mut total = 0;
        let mut superset = candidates;
        let mut gran = superset.len();
        while gran > 0 {
            let subsets: Vec<Vec<K>> = superset.chunks(gran).map(<[K]>::to_vec).collect();
            let nsubsets = subsets.len();
            let mut remaining = Vec::with_capacity(superset.len());
            for subset in subsets {
                self.check_interrupt()?;
                let snapshot = K::table(&self.formula).snapshot();
                let checkpoint = self.formula.checkpoint();
                let mut nsubst = 0;
                for item in &subset {
                    if !K::table(&self.formula).is_subst(*item) {
                        let target = rewrite(&mut self.formula, *item);
                        K::table_mut(&mut self.formula).subst(*item, target);
                        nsubst += 1;
                    }
                }
                if nsubst == 0 {
                    self.formula.commit(checkpoint);
                    remaining.extend(subset);
                    continue;
                }

                self.dump(&self.scratch)?;
                if self.oracle.test(&self.formula)? {
                    self.dump(&self.outfile)?;
                    self.formula.commit(checkpoint);
                    total += nsubst;
                    debug!("    granularity: {}, subsets: {}, substituted: {}", gran, nsubsets, nsubst);
                } else {
                    debug!("    granularity: {}, subsets: {}, substituted: 0", gran, nsubsets);
                    K::table_mut(&mut self.formula).restore(snapshot);
                    self.formula.rollback(checkpoint)?;
                    if with_vars && self.config.check_consistency {
                        self.formula.check_declfuns()?;
                    }
                    remaining.extend(subset);
                }
            }
            superset = remaining;
            gran /= 2;
        }
        Ok(total)
    }
}
