//! `Connections` is the connectivity memory shared by the Spatial Pooler and the Temporal Memory.
//!
//! It owns every column, cell, distal segment and synapse of a model, plus the global counters
//! (iteration, segment and synapse ordinals) that both algorithms advance. It enforces the
//! structural invariants of the graph but contains no learning policy:
//! - columns and cells are created once by [`Connections::init`] and never destroyed,
//! - distal segments and synapses are created and destroyed on demand; destroying one removes
//!   every cross-reference to it,
//! - a cell never holds more than `max_segments_per_cell` segments and a segment never holds more
//!   than `max_synapses_per_segment` synapses; creation evicts first when a limit is reached.
//!
//! Columns are kept in a [`SparseObjectMatrix`] whose backing [`Dictionary`] can be swapped. Cells
//! and distal segments live in flat arenas addressed by [`CellId`] and [`SegmentId`]; the slot of a
//! destroyed segment is recycled by the next one created.

use super::column::{Cell, Column};
use super::config::HtmConfig;
use super::error::{HtmError, Result};
use super::ids::{CellId, ColumnId, SegmentId, SynapseId};
use super::segment::{Dendrite, DistalDendrite};
use super::sparse_matrix::{Dictionary, SparseObjectMatrix};
use super::synapses::SynapseSource;
use super::topology::Topology;
use fxhash::{FxHashMap, FxHashSet};
use log::debug;
use serde::{Deserialize, Serialize};

/// Tolerance used when comparing permanences against thresholds.
pub const EPSILON: f64 = 0.00001;

/// Per-segment synapse counts against a set of active cells, indexed by flat segment index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentActivity {
    /// Synapses with a connected permanence whose presynaptic cell is active.
    pub active: Vec<usize>,

    /// Synapses of any permanence whose presynaptic cell is active.
    pub potential: Vec<usize>,
}

impl SegmentActivity {
    #[inline]
    pub fn active_count(&self, segment: SegmentId) -> usize {
        self.active.get(segment.index()).copied().unwrap_or(0)
    }

    #[inline]
    pub fn potential_count(&self, segment: SegmentId) -> usize {
        self.potential.get(segment.index()).copied().unwrap_or(0)
    }
}

/// Permanence statistics over proximal synapses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HtmStatistics {
    /// Lowest permanence among connected synapses.
    pub min_permanence: f64,

    /// Highest permanence among connected synapses.
    pub max_permanence: f64,

    /// Average permanence of connected synapses.
    pub avg_permanence: f64,

    pub connected_synapses: usize,

    pub synapses: usize,

    /// Fraction of synapses that are connected.
    pub synaptic_activity: f64,
}

/// The connectivity memory: columns, cells, distal segments and synapses of one model.
pub struct Connections {
    config: HtmConfig,
    input_topology: Topology,
    columns: SparseObjectMatrix<Column>,
    cells: Vec<Cell>,

    /// Distal segment arena; `None` marks a recyclable slot.
    segments: Vec<Option<DistalDendrite>>,
    free_segments: Vec<SegmentId>,

    /// Segments that have a synapse from a given presynaptic cell.
    receptors: FxHashMap<CellId, FxHashSet<SegmentId>>,

    num_synapses: usize,
    next_segment_ordinal: u64,
    next_synapse_ordinal: usize,
    iteration: u64,
    initialized: bool,
}

impl Connections {
    /// Validates `config` and creates an empty memory with in-memory column storage.
    pub fn new(config: HtmConfig) -> Result<Self> {
        config.validate()?;
        let columns = SparseObjectMatrix::new(&config.column_dimensions);
        Ok(Self::from_parts(config, columns))
    }

    /// Validates `config` and creates an empty memory that stores columns in `dictionary`.
    pub fn with_dictionary(config: HtmConfig, dictionary: Box<dyn Dictionary<Column>>) -> Result<Self> {
        config.validate()?;
        let columns = SparseObjectMatrix::with_dictionary(&config.column_dimensions, dictionary);
        Ok(Self::from_parts(config, columns))
    }

    fn from_parts(config: HtmConfig, columns: SparseObjectMatrix<Column>) -> Self {
        Self {
            input_topology: Topology::new(&config.input_dimensions),
            columns,
            cells: Vec::new(),
            segments: Vec::new(),
            free_segments: Vec::new(),
            receptors: FxHashMap::default(),
            num_synapses: 0,
            next_segment_ordinal: 0,
            next_synapse_ordinal: 0,
            iteration: 0,
            initialized: false,
            config,
        }
    }

    /// Creates every column and cell. Can only run once.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(HtmError::AlreadyInitialized);
        }

        let cells_per_column = self.config.cells_per_column;
        let num_columns = self.config.num_columns();
        self.cells = Vec::with_capacity(num_columns * cells_per_column);

        for index in 0..num_columns {
            let column = Column::new(ColumnId(index), cells_per_column, self.config.syn_perm_connected);
            self.cells
                .extend(column.cells().map(|cell| Cell::new(cell, column.index)));
            self.columns.set(index, column)?;
        }

        self.initialized = true;
        debug!(
            "initialized {} columns with {} cells each ({} inputs)",
            num_columns,
            cells_per_column,
            self.config.num_inputs()
        );
        Ok(())
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The parameters of this memory.
    #[inline]
    pub fn config(&self) -> &HtmConfig {
        &self.config
    }

    #[inline]
    pub fn input_topology(&self) -> &Topology {
        &self.input_topology
    }

    #[inline]
    pub fn column_topology(&self) -> &Topology {
        self.columns.topology()
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input_topology.size()
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.max_index()
    }

    /// Number of cells created by [`Connections::init`].
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    // Columns

    pub fn column(&self, id: ColumnId) -> Result<&Column> {
        self.columns
            .get(id.index())
            .ok_or_else(|| self.missing_column(id))
    }

    pub fn column_mut(&mut self, id: ColumnId) -> Result<&mut Column> {
        let error = self.missing_column(id);
        self.columns.get_mut(id.index()).ok_or(error)
    }

    fn missing_column(&self, id: ColumnId) -> HtmError {
        if self.initialized {
            HtmError::out_of_bounds("column", id.index(), self.num_columns())
        } else {
            HtmError::NotInitialized
        }
    }

    /// Looks up several columns at once.
    pub fn columns_for(&self, indices: &[usize]) -> Result<Vec<&Column>> {
        indices.iter().map(|&i| self.column(ColumnId(i))).collect()
    }

    /// All columns in index order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.values()
    }

    /// Creates the potential pool of a column: one proximal synapse per input bit, each starting
    /// exactly at the connected threshold.
    pub fn create_potential_pool(&mut self, column: ColumnId, inputs: &[usize]) -> Result<()> {
        let num_inputs = self.num_inputs();
        if let Some(&bit) = inputs.iter().find(|&&bit| bit >= num_inputs) {
            return Err(HtmError::out_of_bounds("input", bit, num_inputs));
        }

        let permanence = self.config.syn_perm_connected;
        let mut next = self.next_synapse_ordinal;
        self.column_mut(column)?
            .create_potential_pool(inputs, permanence, &mut next);
        self.next_synapse_ordinal = next;
        Ok(())
    }

    /// Dense permanence row of a column over the input space.
    pub fn dense_permanences(&self, column: ColumnId) -> Result<Vec<f64>> {
        Ok(self.column(column)?.pool().dense_permanences(self.num_inputs()))
    }

    /// Dense connected mask of a column over the input space.
    pub fn dense_connected(&self, column: ColumnId) -> Result<Vec<bool>> {
        Ok(self.column(column)?.pool().dense_connected(self.num_inputs()))
    }

    /// Dense potential mask of a column over the input space.
    pub fn dense_potential(&self, column: ColumnId) -> Result<Vec<bool>> {
        Ok(self.column(column)?.pool().dense_potential(self.num_inputs()))
    }

    /// Number of connected proximal synapses per column.
    pub fn connected_counts(&self) -> Vec<usize> {
        self.columns().map(|col| col.pool().num_connected()).collect()
    }

    /// Permanence statistics aggregated over every column.
    pub fn statistics(&self) -> HtmStatistics {
        let mut stats = HtmStatistics {
            min_permanence: f64::MAX,
            ..HtmStatistics::default()
        };
        let mut avg_sum = 0.0;
        let mut learned_columns = 0;

        for col in self.columns() {
            let col_stats = col.statistics();
            stats.synapses += col_stats.synapses;
            if col_stats.connected_synapses == 0 {
                continue;
            }
            stats.connected_synapses += col_stats.connected_synapses;
            stats.min_permanence = stats.min_permanence.min(col_stats.min_permanence);
            stats.max_permanence = stats.max_permanence.max(col_stats.max_permanence);
            avg_sum += col_stats.avg_permanence;
            learned_columns += 1;
        }

        if learned_columns == 0 {
            stats.min_permanence = 0.0;
        } else {
            stats.avg_permanence = avg_sum / learned_columns as f64;
        }
        if stats.synapses > 0 {
            stats.synaptic_activity = stats.connected_synapses as f64 / stats.synapses as f64;
        }
        stats
    }

    // Cells

    pub fn cell(&self, id: CellId) -> Result<&Cell> {
        if !self.initialized {
            return Err(HtmError::NotInitialized);
        }
        self.cells
            .get(id.index())
            .ok_or_else(|| HtmError::out_of_bounds("cell", id.index(), self.cells.len()))
    }

    /// Looks up several cells at once.
    pub fn cells_for(&self, indices: &[usize]) -> Result<Vec<&Cell>> {
        indices.iter().map(|&i| self.cell(CellId(i))).collect()
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cells of the given column.
    pub fn cells_of_column(&self, column: ColumnId) -> impl Iterator<Item = CellId> {
        let cells_per_column = self.config.cells_per_column;
        let first = column.index() * cells_per_column;
        (first..first + cells_per_column).map(CellId)
    }

    // Distal segments

    #[inline]
    pub fn segment(&self, id: SegmentId) -> Option<&DistalDendrite> {
        self.segments.get(id.index()).and_then(Option::as_ref)
    }

    /// Distal segments of a cell, oldest first.
    #[inline]
    pub fn segments_for_cell(&self, cell: CellId) -> &[SegmentId] {
        self.cells.get(cell.index()).map_or(&[], |c| c.segments())
    }

    /// Number of live distal segments.
    #[inline]
    pub fn num_segments(&self) -> usize {
        self.segments.len() - self.free_segments.len()
    }

    #[inline]
    pub fn num_segments_for_cell(&self, cell: CellId) -> usize {
        self.segments_for_cell(cell).len()
    }

    /// Size of the segment arena; flat segment indices are below this.
    #[inline]
    pub fn segment_capacity(&self) -> usize {
        self.segments.len()
    }

    /// Number of live distal synapses.
    #[inline]
    pub fn num_synapses(&self) -> usize {
        self.num_synapses
    }

    pub fn column_for_segment(&self, id: SegmentId) -> Option<ColumnId> {
        self.segment(id)
            .map(|seg| seg.cell.column(self.config.cells_per_column))
    }

    /// Sorts segments by owning cell, then by creation order.
    pub fn sort_segments(&self, segments: &mut [SegmentId]) {
        segments.sort_by_key(|&id| self.segment(id).map(|seg| (seg.cell, seg.ordinal)));
    }

    /// Creates a distal segment on `cell`. If the cell is full, its least recently used segment is
    /// destroyed first.
    pub fn create_distal_segment(&mut self, cell: CellId) -> Result<SegmentId> {
        self.cell(cell)?;

        while self.num_segments_for_cell(cell) >= self.config.max_segments_per_cell {
            let lru = self
                .segments_for_cell(cell)
                .iter()
                .copied()
                .filter_map(|id| self.segment(id))
                .min_by_key(|seg| (seg.last_used_iteration, seg.ordinal))
                .map(|seg| seg.id);
            let Some(lru) = lru else { break };
            debug!("{} is full, evicting least recently used {}", cell, lru);
            self.destroy_segment(lru)?;
        }

        let ordinal = self.next_segment_ordinal;
        self.next_segment_ordinal += 1;

        let id = match self.free_segments.pop() {
            Some(id) => id,
            None => {
                self.segments.push(None);
                SegmentId(self.segments.len() - 1)
            }
        };
        self.segments[id.index()] = Some(DistalDendrite::new(
            id,
            cell,
            ordinal,
            self.iteration,
            self.config.connected_permanence,
        ));
        self.cells[cell.index()].segments.push(id);
        Ok(id)
    }

    /// Destroys a distal segment together with all of its synapses.
    pub fn destroy_segment(&mut self, id: SegmentId) -> Result<()> {
        let size = self.segments.len();
        let segment = self
            .segments
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(HtmError::out_of_bounds("segment", id.index(), size))?;

        for presynaptic in segment.presynaptic_cells() {
            self.remove_receptor(presynaptic, id);
        }
        self.num_synapses -= segment.num_synapses();
        self.cells[segment.cell.index()]
            .segments
            .retain(|&seg| seg != id);
        self.free_segments.push(id);
        Ok(())
    }

    /// Creates a synapse from `presynaptic` on a distal segment. If the segment is full, its
    /// weakest synapse is destroyed first. An existing synapse from the same cell is overwritten.
    pub fn create_synapse(
        &mut self,
        segment: SegmentId,
        presynaptic: CellId,
        permanence: f64,
    ) -> Result<SynapseId> {
        self.cell(presynaptic)?;
        let max_synapses = self.config.max_synapses_per_segment;

        if !self.segment_mut(segment)?.pool().contains(presynaptic.index()) {
            loop {
                let seg = self.segment_mut(segment)?;
                if seg.num_synapses() < max_synapses {
                    break;
                }
                let Some(weakest) = seg.pool().weakest().map(|syn| syn.source) else { break };
                debug!("{} is full, evicting weakest synapse from {:?}", segment, weakest);
                self.destroy_synapse(segment, CellId(weakest.index()))?;
            }
        }

        let id = SynapseId(self.next_synapse_ordinal);
        self.next_synapse_ordinal += 1;

        let seg = self.segment_mut(segment)?;
        let replaced = seg.pool().contains(presynaptic.index());
        seg.create_synapse(id, SynapseSource::Cell(presynaptic), permanence);
        if !replaced {
            self.num_synapses += 1;
            self.receptors.entry(presynaptic).or_default().insert(segment);
        }
        Ok(id)
    }

    /// Destroys the synapse from `presynaptic` on a distal segment. The segment itself is kept even
    /// if this was its last synapse.
    pub fn destroy_synapse(&mut self, segment: SegmentId, presynaptic: CellId) -> Result<()> {
        let seg = self.segment_mut(segment)?;
        if seg.pool_mut().remove(presynaptic.index()).is_some() {
            self.num_synapses -= 1;
            self.remove_receptor(presynaptic, segment);
        }
        Ok(())
    }

    /// Writes the permanence of a distal synapse, clamped to `[0, 1]`.
    pub fn set_synapse_permanence(
        &mut self,
        segment: SegmentId,
        presynaptic: CellId,
        permanence: f64,
    ) -> Result<f64> {
        let seg = self.segment_mut(segment)?;
        let size = seg.num_synapses();
        seg.pool_mut()
            .set_permanence(presynaptic.index(), permanence)
            .ok_or(HtmError::out_of_bounds("synapse", presynaptic.index(), size))
    }

    fn segment_mut(&mut self, id: SegmentId) -> Result<&mut DistalDendrite> {
        let size = self.segments.len();
        self.segments
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| HtmError::out_of_bounds("segment", id.index(), size))
    }

    fn remove_receptor(&mut self, presynaptic: CellId, segment: SegmentId) {
        if let Some(receptors) = self.receptors.get_mut(&presynaptic) {
            receptors.remove(&segment);
            if receptors.is_empty() {
                self.receptors.remove(&presynaptic);
            }
        }
    }

    // Activity

    /// Counts, for every distal segment, its synapses from `active_cells`. A synapse counts as
    /// active when its permanence is at least `connected_permanence - EPSILON`.
    pub fn compute_activity(&self, active_cells: &[CellId]) -> SegmentActivity {
        let threshold = self.config.connected_permanence - EPSILON;
        let mut activity = SegmentActivity {
            active: vec![0; self.segments.len()],
            potential: vec![0; self.segments.len()],
        };

        for cell in active_cells {
            let Some(receptors) = self.receptors.get(cell) else { continue };
            for &segment in receptors {
                let Some(permanence) = self
                    .segment(segment)
                    .and_then(|seg| seg.pool().permanence(cell.index()))
                else {
                    continue;
                };
                activity.potential[segment.index()] += 1;
                if permanence >= threshold {
                    activity.active[segment.index()] += 1;
                }
            }
        }
        activity
    }

    /// Marks a segment as used in the current iteration.
    pub fn record_segment_activity(&mut self, id: SegmentId) {
        let iteration = self.iteration;
        if let Ok(seg) = self.segment_mut(id) {
            seg.last_used_iteration = iteration;
        }
    }

    /// Advances the learning iteration counter.
    #[inline]
    pub fn start_new_iteration(&mut self) {
        self.iteration += 1;
    }

    #[inline]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sparse_matrix::ShardedDictionary;

    fn connections(cells_per_column: usize) -> Connections {
        let config = HtmConfig {
            cells_per_column,
            max_segments_per_cell: 2,
            max_synapses_per_segment: 3,
            ..HtmConfig::new(vec![16], vec![8])
        };
        let mut conn = Connections::new(config).unwrap();
        conn.init().unwrap();
        conn
    }

    #[test]
    fn init_creates_every_cell_once() {
        let mut conn = connections(4);
        assert_eq!(conn.num_cells(), 32);
        assert_eq!(conn.cell(CellId(13)).unwrap().column, ColumnId(3));
        assert!(matches!(conn.init(), Err(HtmError::AlreadyInitialized)));
    }

    #[test]
    fn lookups_before_init_fail() {
        let conn = Connections::new(HtmConfig::new(vec![16], vec![8])).unwrap();
        assert!(matches!(conn.column(ColumnId(0)), Err(HtmError::NotInitialized)));
        assert!(matches!(conn.cell(CellId(0)), Err(HtmError::NotInitialized)));
    }

    #[test]
    fn out_of_range_lookups_fail() {
        let conn = connections(4);
        assert!(matches!(
            conn.column(ColumnId(8)),
            Err(HtmError::IndexOutOfBounds { kind: "column", .. })
        ));
        assert!(conn.cells_for(&[0, 31]).is_ok());
        assert!(conn.cells_for(&[0, 32]).is_err());
        assert_eq!(conn.columns_for(&[1, 5]).unwrap()[1].index, ColumnId(5));
    }

    #[test]
    fn sharded_column_store_behaves_like_in_memory() {
        let config = HtmConfig::new(vec![16], vec![8]);
        let mut conn =
            Connections::with_dictionary(config, Box::new(ShardedDictionary::new(3, 8))).unwrap();
        conn.init().unwrap();
        conn.create_potential_pool(ColumnId(7), &[0, 15]).unwrap();
        assert_eq!(conn.connected_counts(), vec![0, 0, 0, 0, 0, 0, 0, 2]);
        assert!(conn.dense_potential(ColumnId(7)).unwrap()[15]);
    }

    #[test]
    fn potential_pool_rejects_bits_outside_the_input() {
        let mut conn = connections(1);
        assert!(conn.create_potential_pool(ColumnId(0), &[3, 16]).is_err());
    }

    #[test]
    fn segment_slots_are_recycled_but_ordinals_grow() {
        let mut conn = connections(2);
        let a = conn.create_distal_segment(CellId(0)).unwrap();
        let b = conn.create_distal_segment(CellId(1)).unwrap();
        conn.create_synapse(a, CellId(5), 0.6).unwrap();
        conn.destroy_segment(a).unwrap();
        assert_eq!(conn.num_synapses(), 0);
        assert_eq!(conn.num_segments(), 1);

        let c = conn.create_distal_segment(CellId(2)).unwrap();
        assert_eq!(c, a);
        assert!(conn.segment(c).unwrap().ordinal > conn.segment(b).unwrap().ordinal);
        assert_eq!(conn.column_for_segment(c), Some(ColumnId(1)));
        assert!(conn.compute_activity(&[CellId(5)]).potential.iter().all(|&n| n == 0));
    }

    #[test]
    fn full_cell_evicts_least_recently_used_segment() {
        let mut conn = connections(1);
        let old = conn.create_distal_segment(CellId(0)).unwrap();
        conn.start_new_iteration();
        let recent = conn.create_distal_segment(CellId(0)).unwrap();
        conn.start_new_iteration();
        conn.record_segment_activity(old);

        let new = conn.create_distal_segment(CellId(0)).unwrap();
        assert_eq!(conn.num_segments_for_cell(CellId(0)), 2);
        assert_eq!(new, recent);
        assert_eq!(conn.segment(new).unwrap().ordinal, 2);
        assert_eq!(conn.segments_for_cell(CellId(0)), &[old, new]);
    }

    #[test]
    fn full_segment_evicts_weakest_synapse() {
        let mut conn = connections(1);
        let seg = conn.create_distal_segment(CellId(0)).unwrap();
        conn.create_synapse(seg, CellId(1), 0.5).unwrap();
        conn.create_synapse(seg, CellId(2), 0.2).unwrap();
        conn.create_synapse(seg, CellId(3), 0.7).unwrap();
        conn.create_synapse(seg, CellId(4), 0.3).unwrap();

        let presynaptic: Vec<_> = conn.segment(seg).unwrap().presynaptic_cells().collect();
        assert_eq!(presynaptic, vec![CellId(1), CellId(3), CellId(4)]);
        assert_eq!(conn.num_synapses(), 3);
    }

    #[test]
    fn activity_counts_connected_and_potential_synapses() {
        let mut conn = connections(1);
        let seg = conn.create_distal_segment(CellId(0)).unwrap();
        conn.create_synapse(seg, CellId(1), 0.5).unwrap();
        conn.create_synapse(seg, CellId(2), 0.2).unwrap();
        conn.create_synapse(seg, CellId(3), 0.499995).unwrap();

        let activity = conn.compute_activity(&[CellId(1), CellId(2), CellId(3), CellId(4)]);
        assert_eq!(activity.active_count(seg), 2);
        assert_eq!(activity.potential_count(seg), 3);

        conn.destroy_synapse(seg, CellId(1)).unwrap();
        let activity = conn.compute_activity(&[CellId(1)]);
        assert_eq!(activity.potential_count(seg), 0);
    }

    #[test]
    fn segments_sort_by_cell_then_ordinal() {
        let mut conn = connections(2);
        let a = conn.create_distal_segment(CellId(3)).unwrap();
        let b = conn.create_distal_segment(CellId(1)).unwrap();
        let c = conn.create_distal_segment(CellId(3)).unwrap();
        let mut segments = vec![c, a, b];
        conn.sort_segments(&mut segments);
        assert_eq!(segments, vec![b, a, c]);
    }

    #[test]
    fn statistics_aggregate_connected_permanences() {
        let mut conn = connections(1);
        conn.create_potential_pool(ColumnId(0), &[0, 1]).unwrap();
        conn.create_potential_pool(ColumnId(1), &[2]).unwrap();
        conn.column_mut(ColumnId(1))
            .unwrap()
            .pool_mut()
            .set_permanence(2, 0.3);

        let stats = conn.statistics();
        assert_eq!(stats.synapses, 3);
        assert_eq!(stats.connected_synapses, 3);
        assert!((stats.min_permanence - 0.1).abs() < 1e-9);
        assert!((stats.max_permanence - 0.3).abs() < 1e-9);
        assert!((stats.avg_permanence - 0.2).abs() < 1e-9);
    }
}
