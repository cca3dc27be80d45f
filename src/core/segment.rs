//! Dendrite segments own synapses.
//!
//! A `ProximalDendrite` belongs to a column and connects it to input bits; every column has exactly one.
//! A `DistalDendrite` belongs to a cell and connects it to other cells. Distal segments are grown
//! lazily by the Temporal Memory, carry a creation ordinal for ordering, and remember the last
//! iteration they were active so the least recently used one can be evicted when a cell is full.

use super::ids::{CellId, ColumnId, SegmentId, SynapseId};
use super::synapses::{Pool, Synapse, SynapseSource};

/// Operations shared by proximal and distal segments.
pub trait Dendrite {
    /// Index of the segment: the column index for proximal, the flat segment index for distal.
    fn index(&self) -> usize;

    /// The synapses of the segment.
    fn pool(&self) -> &Pool;

    /// Adds a synapse from `source` with the given permanence.
    fn create_synapse(&mut self, id: SynapseId, source: SynapseSource, permanence: f64) -> Synapse;

    fn num_synapses(&self) -> usize {
        self.pool().len()
    }
}

/// The proximal segment of a column, connecting it to its potential pool of input bits.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximalDendrite {
    column: ColumnId,
    pool: Pool,
}

impl ProximalDendrite {
    pub fn new(column: ColumnId, connected_threshold: f64) -> Self {
        Self {
            column,
            pool: Pool::new(connected_threshold),
        }
    }

    #[inline]
    pub fn column(&self) -> ColumnId {
        self.column
    }

    #[inline]
    pub fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    /// Drops every synapse, leaving an empty pool with the same threshold.
    pub fn clear(&mut self) {
        self.pool = Pool::new(self.pool.connected_threshold());
    }
}

impl Dendrite for ProximalDendrite {
    #[inline]
    fn index(&self) -> usize {
        self.column().index()
    }

    #[inline]
    fn pool(&self) -> &Pool {
        &self.pool
    }

    fn create_synapse(&mut self, id: SynapseId, source: SynapseSource, permanence: f64) -> Synapse {
        debug_assert!(matches!(source, SynapseSource::Input(_)));
        let synapse = Synapse {
            id,
            source,
            permanence,
        };
        self.pool.insert(synapse);
        synapse
    }
}

/// A distal segment on a cell, detecting activity patterns of presynaptic cells.
#[derive(Debug, Clone, PartialEq)]
pub struct DistalDendrite {
    /// Flat index of the segment.
    pub id: SegmentId,

    /// The cell this segment belongs to.
    pub cell: CellId,

    /// Creation order; orders segments of the same cell.
    pub ordinal: u64,

    /// Temporal Memory iteration in which the segment was last active.
    pub last_used_iteration: u64,

    pool: Pool,
}

impl DistalDendrite {
    pub fn new(
        id: SegmentId,
        cell: CellId,
        ordinal: u64,
        last_used_iteration: u64,
        connected_threshold: f64,
    ) -> Self {
        Self {
            id,
            cell,
            ordinal,
            last_used_iteration,
            pool: Pool::new(connected_threshold),
        }
    }

    #[inline]
    pub(crate) fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    /// Presynaptic cells this segment has synapses to, ascending.
    pub fn presynaptic_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.pool.potential().map(CellId)
    }
}

impl Dendrite for DistalDendrite {
    #[inline]
    fn index(&self) -> usize {
        self.id.index()
    }

    #[inline]
    fn pool(&self) -> &Pool {
        &self.pool
    }

    fn create_synapse(&mut self, id: SynapseId, source: SynapseSource, permanence: f64) -> Synapse {
        debug_assert!(matches!(source, SynapseSource::Cell(_)));
        let synapse = Synapse {
            id,
            source,
            permanence,
        };
        self.pool.insert(synapse);
        synapse
    }
}
