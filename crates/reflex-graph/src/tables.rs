//! Candidate table base addresses.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::attrs::AttrKind;
use crate::graph::DataflowGraph;
use crate::{GraphError, Result};

/// Distinct tables a flex scanner reads: accept, base, chk, def, ec, meta
/// and nxt.
pub const MIN_TABLE_GUESSES: usize = 7;

/// Constant addresses read by the function that point into read-only data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableGuesses {
    addresses: BTreeSet<u64>,
}

impl TableGuesses {
    /// Collect guesses from input values flagged as possible tables.
    pub fn collect(graph: &DataflowGraph) -> Self {
        let addresses = graph
            .value_nodes()
            .filter(|node| node.attrs.is_set(AttrKind::CouldBeTable))
            .filter_map(|node| node.attrs.get_int(AttrKind::Address))
            .collect();
        Self { addresses }
    }

    /// Addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.addresses.iter().copied()
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.addresses.contains(&addr)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Check there are enough candidates for a full table set.
    pub fn is_sufficient(&self) -> bool {
        self.len() >= MIN_TABLE_GUESSES
    }
}

impl FromIterator<u64> for TableGuesses {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}

/// Guess table bases, failing when fewer than [`MIN_TABLE_GUESSES`] are found.
pub fn guess_tables(graph: &DataflowGraph) -> Result<TableGuesses> {
    let guesses = TableGuesses::collect(graph);
    if !guesses.is_sufficient() {
        warn!(found = guesses.len(), needed = MIN_TABLE_GUESSES, "not enough table guesses");
        return Err(GraphError::InsufficientTables {
            found: guesses.len(),
        });
    }
    debug!(count = guesses.len(), "guessed table bases");
    Ok(guesses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_graph;
    use reflex_ir::{FunctionIr, MemoryBlock, MemoryMap, Opcode, PcodeOp, Space, Varnode};

    fn memory() -> MemoryMap {
        MemoryMap::new(64)
            .with_block(MemoryBlock::new(".rodata", 0x601000, 0x602000).backed_by(0x1000))
            .with_block(MemoryBlock::new(".data", 0x603000, 0x604000).writable(true))
    }

    /// One LOAD per address, each with its own constant varnode.
    fn loads(addresses: &[u64]) -> FunctionIr {
        let mut next_id = 0;
        let mut id = || {
            next_id += 1;
            next_id
        };
        let ops = addresses
            .iter()
            .map(|&addr| {
                PcodeOp::with_output(
                    Opcode::Load,
                    vec![Varnode::constant(id(), 0x1b1, 4), Varnode::constant(id(), addr, 8)],
                    Varnode::new(id(), Space::Unique, addr, 4),
                )
            })
            .collect();
        FunctionIr::new(ops)
    }

    #[test]
    fn test_six_guesses_fail() {
        let addrs: Vec<u64> = (0..6).map(|i| 0x601000 + i * 0x100).collect();
        let graph = build_graph(&loads(&addrs), &memory());
        assert_eq!(
            guess_tables(&graph),
            Err(GraphError::InsufficientTables { found: 6 })
        );
    }

    #[test]
    fn test_seven_guesses_succeed() {
        let addrs: Vec<u64> = (0..7).map(|i| 0x601000 + i * 0x100).collect();
        let graph = build_graph(&loads(&addrs), &memory());
        let guesses = guess_tables(&graph).unwrap();
        assert_eq!(guesses.addresses().collect::<Vec<_>>(), addrs);
    }

    #[test]
    fn test_duplicates_and_writable_addresses_do_not_count() {
        let mut addrs: Vec<u64> = (0..6).map(|i| 0x601000 + i * 0x100).collect();
        addrs.push(0x601000);
        addrs.push(0x603000);
        let graph = build_graph(&loads(&addrs), &memory());
        let guesses = TableGuesses::collect(&graph);
        assert_eq!(guesses.len(), 6);
        assert!(!guesses.contains(0x603000));
        assert!(guess_tables(&graph).is_err());
    }
}
