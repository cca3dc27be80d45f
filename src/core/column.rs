//! A `Column` in HTM represents one feature detector or receptive field in the Spatial Pooler.
//!
//! Biological inspiration:
//! Columns in HTM are inspired by cortical mini-columns found in the brain.
//! They consist of a group of neurons, which in HTM are modeled as "cells".
//!
//! Meaning in HTM:
//! Each column receives input from a random subset of the input space through the synapses of its
//! single proximal dendrite, computes its overlap score with the current input, and competes with
//! other columns to become active. Its cells then compete inside the column in the Temporal Memory,
//! each cell standing for the column's feature in one particular temporal context.

use super::connections::HtmStatistics;
use super::ids::{CellId, ColumnId, SegmentId, SynapseId};
use super::segment::{Dendrite, ProximalDendrite};
use super::synapses::{Pool, SynapseSource};
use std::cmp::Ordering;
use std::ops::Range;

/// Represents a cortical column in the HTM model.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The index of the column.
    pub index: ColumnId,

    /// Global indices of the cells of this column.
    cells: Range<usize>,

    /// The proximal segment connecting the column to the input space.
    pub proximal: ProximalDendrite,
}

impl Column {
    /// Creates a column with `cells_per_column` cells and an empty potential pool.
    pub fn new(index: ColumnId, cells_per_column: usize, connected_threshold: f64) -> Self {
        let first = index.index() * cells_per_column;
        Self {
            index,
            cells: first..first + cells_per_column,
            proximal: ProximalDendrite::new(index, connected_threshold),
        }
    }

    /// Global indices of the cells in this column, ascending.
    #[inline]
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.clone().map(CellId)
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn pool(&self) -> &Pool {
        self.proximal.pool()
    }

    #[inline]
    pub fn pool_mut(&mut self) -> &mut Pool {
        self.proximal.pool_mut()
    }

    /// Replaces the potential pool with one synapse per input bit, all at `permanence`.
    /// Synapse ids are taken from `next_synapse`, which is advanced past the ones used.
    pub fn create_potential_pool(
        &mut self,
        inputs: &[usize],
        permanence: f64,
        next_synapse: &mut usize,
    ) {
        self.proximal.clear();
        for &input in inputs {
            self.proximal.create_synapse(
                SynapseId(*next_synapse),
                SynapseSource::Input(input),
                permanence,
            );
            *next_synapse += 1;
        }
    }

    /// Number of connected synapses whose input bit is on. Overlaps below `stimulus_threshold`
    /// are reported as 0.
    pub fn overlap(&self, input: &[bool], stimulus_threshold: f64) -> f64 {
        let overlap = self
            .pool()
            .connected()
            .filter(|&bit| input[bit])
            .count() as f64;

        if overlap < stimulus_threshold {
            0.0
        } else {
            overlap
        }
    }

    /// Permanence statistics of the connected proximal synapses.
    pub fn statistics(&self) -> HtmStatistics {
        let pool = self.pool();
        let mut stats = HtmStatistics {
            min_permanence: f64::MAX,
            ..HtmStatistics::default()
        };
        let mut sum = 0.0;

        for syn in pool.iter().filter(|syn| pool.is_connected(syn.source.index())) {
            sum += syn.permanence;
            stats.min_permanence = stats.min_permanence.min(syn.permanence);
            stats.max_permanence = stats.max_permanence.max(syn.permanence);
            stats.connected_synapses += 1;
        }

        stats.synapses = pool.len();
        if stats.connected_synapses == 0 {
            stats.min_permanence = 0.0;
        } else {
            stats.avg_permanence = sum / stats.connected_synapses as f64;
        }
        if stats.synapses > 0 {
            stats.synaptic_activity = stats.connected_synapses as f64 / stats.synapses as f64;
        }
        stats
    }
}

/// A cell of a column. Ordered and compared by its global index only.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Global index, `column * cells_per_column + slot`.
    pub index: CellId,

    /// The column that owns this cell.
    pub column: ColumnId,

    /// Distal segments of the cell in creation order.
    pub(crate) segments: Vec<SegmentId>,
}

impl Cell {
    pub fn new(index: CellId, column: ColumnId) -> Self {
        Self {
            index,
            column,
            segments: Vec::new(),
        }
    }

    /// Distal segments of this cell, oldest first.
    #[inline]
    pub fn segments(&self) -> &[SegmentId] {
        &self.segments
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}
