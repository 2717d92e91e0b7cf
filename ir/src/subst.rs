use std::collections::HashMap;
use std::hash::Hash;

/// Substitution ledger for one entity kind.
///
/// An entry `id -> Some(target)` forwards `id` to `target`, an entry
/// `id -> None` removes `id`. Entities themselves are never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstTable<K: Copy + Eq + Hash> {
    substs: HashMap<K, Option<K>>,
}

/// Frozen copy of a ledger, used to undo a rejected trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<K: Copy + Eq + Hash>(HashMap<K, Option<K>>);

impl<K: Copy + Eq + Hash> Default for SubstTable<K> {
    fn default() -> Self {
        SubstTable { substs: HashMap::new() }
    }
}

impl<K: Copy + Eq + Hash> SubstTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subst(&self, id: K) -> bool {
        self.substs.contains_key(&id)
    }

    pub fn subst(&mut self, id: K, target: Option<K>) {
        self.substs.insert(id, target);
    }

    /// Raw ledger entry, without following chains.
    pub fn get(&self, id: K) -> Option<Option<K>> {
        self.substs.get(&id).copied()
    }

    /// Follows the ledger to the current replacement of `id`.
    ///
    /// # Returns
    /// * `Some(id)` if `id` is not substituted
    /// * `Some(target)` for the end of the forwarding chain
    /// * `None` if anything along the chain was removed
    pub fn resolve(&self, id: K) -> Option<K> {
        let mut cur = id;
        let mut steps = 0usize;
        loop {
            match self.substs.get(&cur) {
                None => return Some(cur),
                Some(None) => return None,
                Some(Some(next)) => cur = *next,
            }
            steps += 1;
            debug_assert!(steps <= self.substs.len(), "substitution cycle");
        }
    }

    pub fn len(&self) -> usize {
        self.substs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substs.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot<K> {
        Snapshot(self.substs.clone())
    }

    pub fn restore(&mut self, snapshot: Snapshot<K>) {
        self.substs = snapshot.0;
    }
}
