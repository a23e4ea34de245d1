//! DFA reconstruction and analysis.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::reader::TableReader;
use crate::{DfaError, Result};

/// Upper bound on `def` hops while resolving one transition.
const MAX_FOLLOW_STEPS: usize = 1 << 16;

/// Reconstruction options.
#[derive(Clone, Debug)]
pub struct DfaOptions {
    /// Skip transitions on equivalence class 0 unless they extend an existing edge.
    pub strip_nulls: bool,
    /// Drop transitions into these states.
    pub strip_states: BTreeSet<u32>,
}

impl DfaOptions {
    pub fn new() -> Self {
        Self {
            strip_nulls: true,
            strip_states: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn with_strip_nulls(mut self, strip_nulls: bool) -> Self {
        self.strip_nulls = strip_nulls;
        self
    }

    #[must_use]
    pub fn with_strip_states(mut self, states: impl IntoIterator<Item = u32>) -> Self {
        self.strip_states.extend(states);
        self
    }
}

impl Default for DfaOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A scanner automaton: states with their accepted rule, and byte-labelled
/// transitions merged per state pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dfa {
    states: BTreeMap<u32, u32>,
    edges: BTreeMap<(u32, u32), BTreeSet<u8>>,
}

impl Dfa {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state accepting rule `accepts` (0 for non-accepting).
    pub fn add_state(&mut self, state: u32, accepts: u32) {
        self.states.insert(state, accepts);
    }

    /// Add bytes to the transition `from -> to`, creating it if needed.
    pub fn add_transition(&mut self, from: u32, to: u32, bytes: impl IntoIterator<Item = u8>) {
        self.edges.entry((from, to)).or_default().extend(bytes);
    }

    /// Check for a transition `from -> to`.
    pub fn has_transition(&self, from: u32, to: u32) -> bool {
        self.edges.contains_key(&(from, to))
    }

    /// Bytes labelling `from -> to`.
    pub fn alphabet(&self, from: u32, to: u32) -> Option<&BTreeSet<u8>> {
        self.edges.get(&(from, to))
    }

    pub fn accepts(&self, state: u32) -> Option<u32> {
        self.states.get(&state).copied()
    }

    pub fn contains(&self, state: u32) -> bool {
        self.states.contains_key(&state)
    }

    /// States with their accepted rule, ascending.
    pub fn states(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.states.iter().map(|(&s, &a)| (s, a))
    }

    /// Transitions as `(from, to, bytes)`, ascending.
    pub fn transitions(&self) -> impl Iterator<Item = (u32, u32, &BTreeSet<u8>)> + '_ {
        self.edges.iter().map(|(&(u, v), bytes)| (u, v, bytes))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.edges.len()
    }

    /// Highest rule number accepted by any state.
    pub fn max_accept(&self) -> u32 {
        self.states.values().copied().max().unwrap_or(0)
    }

    /// States without incoming transitions.
    pub fn sources(&self) -> Vec<u32> {
        let targets: FxHashSet<u32> = self.edges.keys().map(|&(_, v)| v).collect();
        self.states
            .keys()
            .copied()
            .filter(|s| !targets.contains(s))
            .collect()
    }

    /// For every accepting state, the bytes with no transition out of it.
    pub fn exits(&self) -> BTreeMap<u32, BTreeSet<u8>> {
        self.states
            .iter()
            .filter(|&(_, &accepts)| accepts != 0)
            .map(|(&state, _)| {
                let taken: BTreeSet<u8> = self
                    .edges
                    .range((state, 0)..=(state, u32::MAX))
                    .flat_map(|(_, bytes)| bytes.iter().copied())
                    .collect();
                let exits = (1..=u8::MAX).filter(|b| !taken.contains(b)).collect();
                (state, exits)
            })
            .collect()
    }

    /// Sub-automaton induced by `keep`.
    fn induced(&self, keep: &FxHashSet<u32>) -> Self {
        let states = self
            .states
            .iter()
            .filter(|(s, _)| keep.contains(*s))
            .map(|(&s, &a)| (s, a))
            .collect();
        let edges = self
            .edges
            .iter()
            .filter(|((u, v), _)| keep.contains(u) && keep.contains(v))
            .map(|(&k, bytes)| (k, bytes.clone()))
            .collect();
        Self { states, edges }
    }

    /// Walk transitions from `roots`, forwards or backwards.
    fn closure(&self, roots: impl IntoIterator<Item = u32>, reverse: bool) -> FxHashSet<u32> {
        let mut adjacency: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for &(u, v) in self.edges.keys() {
            let (from, to) = if reverse { (v, u) } else { (u, v) };
            adjacency.entry(from).or_default().push(to);
        }

        let mut seen: FxHashSet<u32> = FxHashSet::default();
        let mut stack: Vec<u32> = roots.into_iter().collect();
        while let Some(state) = stack.pop() {
            if !seen.insert(state) {
                continue;
            }
            if let Some(next) = adjacency.get(&state) {
                stack.extend(next.iter().filter(|to| !seen.contains(*to)));
            }
        }
        seen
    }

    /// States reachable from `start`, `start` included.
    #[must_use]
    pub fn reachable_from(&self, start: u32) -> Self {
        self.induced(&self.closure([start], false))
    }

    /// The part of the automaton that can end in a state accepting rule `out`.
    ///
    /// Accepting states for lower rules are promoted to `out`; states for
    /// higher rules become non-accepting.
    #[must_use]
    pub fn restrict_to_accept(&self, out: u32) -> Self {
        let finals = self
            .states
            .iter()
            .filter(|&(_, &a)| a == out)
            .map(|(&s, _)| s);
        let mut sub = self.induced(&self.closure(finals, true));
        for accepts in sub.states.values_mut() {
            if *accepts == 0 {
                continue;
            }
            if *accepts < out {
                *accepts = out;
            } else if *accepts > out {
                *accepts = 0;
            }
        }
        sub
    }
}

/// Resolve the transition of `state` on `class` the way the generated scanner does.
fn follow(reader: &TableReader<'_>, state: u32, class: u32, max_state: u32) -> Result<u32> {
    let (mut s, mut c) = (state, class);
    for _ in 0..MAX_FOLLOW_STEPS {
        let slot = u64::from(reader.base(s)?) + u64::from(c);
        if reader.chk(slot)? == s {
            return reader.nxt(slot);
        }
        s = reader.def(s)?;
        if s >= max_state {
            c = reader.meta(c)?;
        }
    }
    Err(DfaError::TransitionCycle { state, class })
}

/// Bytes 1..=255 grouped by equivalence class, classes in order of first byte.
fn equivalence_classes(reader: &TableReader<'_>) -> Result<Vec<(u32, BTreeSet<u8>)>> {
    let mut classes: Vec<(u32, BTreeSet<u8>)> = Vec::new();
    for byte in 1..=u8::MAX {
        let class = reader.ec(byte)?;
        match classes.iter_mut().find(|(c, _)| *c == class) {
            Some((_, bytes)) => {
                bytes.insert(byte);
            }
            None => classes.push((class, BTreeSet::from([byte]))),
        }
    }
    Ok(classes)
}

/// Rebuild the scanner DFA for states `0..max_state`.
///
/// Transitions into states outside that range (flex template states) are
/// dropped.
pub fn reconstruct(reader: &TableReader<'_>, max_state: u32, options: &DfaOptions) -> Result<Dfa> {
    if max_state < 2 {
        return Err(DfaError::InvalidMaxState(max_state));
    }

    let classes = equivalence_classes(reader)?;
    debug!(classes = classes.len(), max_state, "read equivalence classes");

    let mut dfa = Dfa::new();
    for state in 0..max_state {
        dfa.add_state(state, reader.accept(state)?);
    }

    for state in 1..max_state {
        for (class, bytes) in &classes {
            let next = follow(reader, state, *class, max_state)?;
            if options.strip_states.contains(&next) {
                continue;
            }
            if !dfa.has_transition(state, next) && options.strip_nulls && *class == 0 {
                continue;
            }
            dfa.add_transition(state, next, bytes.iter().copied());
        }
        trace!(state, accepts = dfa.accepts(state), "resolved state");
    }

    dfa.edges.retain(|&(_, v), _| v < max_state);
    debug!(
        states = dfa.state_count(),
        transitions = dfa.transition_count(),
        "reconstructed dfa"
    );
    Ok(dfa)
}
