use std::fmt;

use ir::CmdId;
use log::{debug, info, trace};

use crate::rules::{Group, TermRule, CATALOG};
use crate::select::{select_cmds, select_scopes, select_terms, term_roots};
use crate::{Oracle, ReduceError, Reducer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub rounds: usize,
    /// Oracle runs, the golden run excluded.
    pub tests: usize,
    pub scopes: usize,
    pub cmds: usize,
    pub terms: usize,
}

impl Stats {
    pub fn total(&self) -> usize {
        self.scopes + self.cmds + self.terms
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rounds total: {}", self.rounds)?;
        writeln!(f, "tests  total: {}", self.tests)?;
        writeln!(f, "substs total: {}", self.total())?;
        writeln!(f, "scopes substituted: {}", self.scopes)?;
        writeln!(f, "cmds   substituted: {}", self.cmds)?;
        write!(f, "terms  substituted: {}", self.terms)
    }
}

/// Outcome of one strategy, compared against the label that last
/// succeeded.
enum Step {
    Continue,
    Exhausted,
}

struct Driver<'r, O: Oracle> {
    reducer: &'r mut Reducer<O>,
    stats: Stats,
    last_success: Option<String>,
}

impl<'r, O: Oracle> Driver<'r, O> {
    fn record(&mut self, label: String, nsubst: usize) -> Step {
        if nsubst > 0 {
            self.last_success = Some(label);
            Step::Continue
        } else if self.last_success.as_deref() == Some(label.as_str()) {
            debug!("no change since last '{}', stopping", label);
            Step::Exhausted
        } else {
            Step::Continue
        }
    }

    /// Removes scopes level by level, outermost first.
    fn substitute_scopes(&mut self) -> Result<usize, ReduceError> {
        debug!("substitute SCOPES:");
        let tests = self.reducer.tests();
        let mut total = 0;
        let mut level = 1;
        loop {
            let scopes = select_scopes(self.reducer.formula(), |s| s.level == level && s.is_regular(), None);
            if scopes.is_empty() {
                break;
            }
            total += self.reducer.substitute(scopes, |_, _| None, false)?;
            level += 1;
        }
        debug!("  >> {} scope(s) substituted in total", total);
        trace!("  >> {} test(s)", self.reducer.tests() - tests);
        Ok(total)
    }

    fn substitute_cmds(&mut self, asserts_only: bool) -> Result<usize, ReduceError> {
        debug!("substitute COMMANDS:");
        let tests = self.reducer.tests();
        let cmds = if asserts_only {
            select_cmds(self.reducer.formula(), |c| c.is_assert())
        } else {
            select_cmds(self.reducer.formula(), |c| !c.is_setlogic() && !c.is_exit())
        };
        let total = self.reducer.substitute(cmds, |_, _| None, false)?;
        debug!("  >> {} command(s) substituted in total", total);
        trace!("  >> {} test(s)", self.reducer.tests() - tests);
        Ok(total)
    }

    fn substitute_terms(&mut self, rule: &TermRule, cmds: &[CmdId]) -> Result<usize, ReduceError> {
        debug!("  {}", rule.description);
        let tests = self.reducer.tests();
        let formula = self.reducer.formula();
        let candidates = select_terms(formula, rule.applies, &term_roots(formula, cmds));
        let total = self.reducer.substitute(candidates, rule.rewrite, rule.with_vars)?;
        debug!("    >> {} term(s) substituted in total", total);
        trace!("    >> {} test(s)", self.reducer.tests() - tests);
        Ok(total)
    }

    /// One round: scopes, then commands, then every enabled term rule per
    /// statement group. Returns `None` once a full cycle passed without
    /// change.
    fn round(&mut self) -> Result<Option<usize>, ReduceError> {
        let mut nsubst_round = 0;

        let n = self.substitute_scopes()?;
        self.stats.scopes += n;
        nsubst_round += n;
        if let Step::Exhausted = self.record("scopes".to_string(), n) {
            return Ok(None);
        }

        // deleting declarations before their uses are simplified rarely
        // works, so the first round only tries assertions
        let n = self.substitute_cmds(self.stats.rounds == 1)?;
        self.stats.cmds += n;
        nsubst_round += n;
        if let Step::Exhausted = self.record("cmds".to_string(), n) {
            return Ok(None);
        }

        let groups: Vec<(Group, Vec<CmdId>)> = Group::ALL
            .iter()
            .map(|g| (*g, select_cmds(self.reducer.formula(), |c| g.contains(c))))
            .collect();
        'groups: for (group, cmds) in &groups {
            if cmds.is_empty() {
                continue;
            }
            debug!("substitute TERMs in '{}' cmds:", group.name());
            for rule in CATALOG {
                if !(rule.enabled)(&self.reducer.formula().logic) {
                    continue;
                }
                let n = self.substitute_terms(rule, cmds)?;
                self.stats.terms += n;
                nsubst_round += n;
                if let Step::Exhausted = self.record(format!("{}_{}", rule.name, group.name()), n) {
                    break 'groups;
                }
            }
        }
        Ok(Some(nsubst_round))
    }
}

/// Runs rounds until nothing changes and returns what was done. The oracle
/// must already hold its golden result.
pub fn reduce<O: Oracle>(reducer: &mut Reducer<O>) -> Result<Stats, ReduceError> {
    let tests = reducer.tests();
    let mut driver = Driver { reducer, stats: Stats::default(), last_success: None };
    loop {
        driver.stats.rounds += 1;
        info!("round {}", driver.stats.rounds);
        match driver.round()? {
            Some(n) if n > 0 => {}
            _ => break,
        }
    }
    let mut stats = driver.stats;
    stats.tests = reducer.tests() - tests;
    for line in stats.to_string().lines() {
        info!("{}", line);
    }
    if stats.total() == 0 {
        return Err(ReduceError::NoReduction);
    }
    Ok(stats)
}
