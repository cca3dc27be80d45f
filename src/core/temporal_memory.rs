//! The `TemporalMemory` module implements a core component of HTM that learns and predicts temporal sequences.
//!
//! At a high level, it models a set of columns, where each column contains multiple cells.
//! Each cell can form multiple dendritic segments, which in turn consist of synapses.
//! All of them live in [`Connections`]; the Temporal Memory only keeps the activity of the
//! current time step and a random generator for tie-breaks.
//!
//! Bursting:
//! - When a column becomes active due to feed-forward input but no cell was correctly predicted, all cells in the column are activated.
//! - This process allows the system to learn new sequences and is called bursting.
//!
//! Winner Cells:
//! - One cell per active column, selected based on its predictive state or through bursting, which then guides the learning process.
//!
//! How It Works:
//! - The Temporal Memory processes input in discrete time steps.
//! - For each time step, it receives a set of active (feed-forward) columns.
//! - In each active column, it checks if any cell was correctly predicted by an active dendritic segment.
//! - If so, those cells are activated; otherwise, the column bursts.
//! - The algorithm then updates dendritic segments by reinforcing synapses that correctly predicted activity.
//! - It also punishes segments that predicted a column which did not become active.
//! - Additionally, new synapses are grown on learning segments towards the previous winner cells.
//! - Finally, segments are evaluated against the new active cells to produce the predictions for the next step.

use super::{
    connections::{Connections, SegmentActivity, EPSILON},
    error::{HtmError, Result},
    ids::{CellId, ColumnId, SegmentId},
    segment::Dendrite,
};
use crate::core::config::HtmConfig;
use fxhash::{FxHashMap, FxHashSet};
use log::{debug, trace};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::mem;

/// Output of one Temporal Memory time step. Cells ascending, segments ordered by (cell, ordinal).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeCycle {
    pub active_cells: Vec<CellId>,
    pub winner_cells: Vec<CellId>,
    /// Cells predicted to become active in the next time step.
    pub predictive_cells: Vec<CellId>,
    pub active_segments: Vec<SegmentId>,
    pub matching_segments: Vec<SegmentId>,
}

/// Activity of the previous time step that learning refers back to.
struct PreviousState {
    active_cells: FxHashSet<CellId>,
    winner_cells: Vec<CellId>,
}

/// Implements the Temporal Memory algorithm which models the activation and learning of temporal sequences.
///
/// The Temporal Memory processes feed-forward input by activating columns and cells, predicting future activity
/// based on past patterns, and adapting synapse permanences through Hebbian-like learning rules. It operates in
/// discrete time steps and incorporates phases such as activating predicted cells, bursting columns without predictions,
/// and punishing erroneous predictions to gradually learn the temporal structure of the input data.
pub struct TemporalMemory {
    /// Seeded generator used for least-used-cell tie-breaks and synapse sampling.
    pub rand: StdRng,

    active_cells: Vec<CellId>,
    winner_cells: Vec<CellId>,
    predictive_cells: Vec<CellId>,
    active_segments: Vec<SegmentId>,
    matching_segments: Vec<SegmentId>,
    last_activity: SegmentActivity,
    initialized: bool,
}

impl TemporalMemory {
    /// Creates a Temporal Memory whose random generator is seeded from `config.seed`.
    pub fn new(config: &HtmConfig) -> Self {
        Self {
            rand: StdRng::seed_from_u64(config.seed),
            active_cells: Vec::new(),
            winner_cells: Vec::new(),
            predictive_cells: Vec::new(),
            active_segments: Vec::new(),
            matching_segments: Vec::new(),
            last_activity: SegmentActivity::default(),
            initialized: false,
        }
    }

    /// Binds the Temporal Memory to `conn`, creating its columns and cells if needed.
    pub fn init(&mut self, conn: &mut Connections) -> Result<()> {
        if self.initialized {
            return Err(HtmError::AlreadyInitialized);
        }
        if !conn.is_initialized() {
            conn.init()?;
        }
        self.initialized = true;
        debug!(
            "temporal memory initialized: {} columns, {} cells",
            conn.num_columns(),
            conn.num_cells()
        );
        Ok(())
    }

    /// Executes one time step of the Temporal Memory algorithm.
    ///
    /// - Groups last step's active and matching segments by column.
    /// - For each column, determines the appropriate action:
    ///   - **Activate:** the column is active and holds an active segment.
    ///   - **Burst:** the column is active but no cell in it was predicted.
    ///   - **Punish:** the column is inactive but holds matching segments (learning only).
    /// - Evaluates every segment against the new active cells to find active and matching segments.
    ///
    /// `active_columns` may be unsorted and contain duplicates, but must not be empty or hold an
    /// index outside the column space.
    pub fn compute(
        &mut self,
        conn: &mut Connections,
        active_columns: &[usize],
        learn: bool,
    ) -> Result<ComputeCycle> {
        if !self.initialized || !conn.is_initialized() {
            return Err(HtmError::NotInitialized);
        }
        if active_columns.is_empty() {
            return Err(HtmError::EmptyInput);
        }
        let num_columns = conn.num_columns();
        if let Some(&col) = active_columns.iter().find(|&&col| col >= num_columns) {
            return Err(HtmError::out_of_bounds("column", col, num_columns));
        }

        self.activate_cells(conn, active_columns, learn)?;
        self.activate_dendrites(conn, learn);

        trace!(
            "tm: {} active cells, {} winners, {} active segments, {} matching segments",
            self.active_cells.len(),
            self.winner_cells.len(),
            self.active_segments.len(),
            self.matching_segments.len()
        );
        Ok(self.cycle())
    }

    /// Calculates the active and winner cells of this time step, learning on the way.
    fn activate_cells(
        &mut self,
        conn: &mut Connections,
        active_columns: &[usize],
        learn: bool,
    ) -> Result<()> {
        let prev = PreviousState {
            active_cells: mem::take(&mut self.active_cells).into_iter().collect(),
            winner_cells: mem::take(&mut self.winner_cells),
        };

        let active_by_column = Self::group_by_column(conn, &self.active_segments);
        let matching_by_column = Self::group_by_column(conn, &self.matching_segments);
        let active_columns: BTreeSet<usize> = active_columns.iter().copied().collect();

        let mut columns: BTreeSet<usize> = active_columns.clone();
        if learn {
            columns.extend(matching_by_column.keys().copied());
        }

        for col in columns {
            let active_segments = active_by_column.get(&col).map_or(&[][..], Vec::as_slice);
            let matching_segments = matching_by_column.get(&col).map_or(&[][..], Vec::as_slice);

            if active_columns.contains(&col) {
                if active_segments.is_empty() {
                    self.burst_column(conn, ColumnId(col), matching_segments, &prev, learn)?;
                } else {
                    self.activate_predicted_column(conn, active_segments, &prev, learn)?;
                }
            } else if learn {
                Self::punish_predicted_column(conn, matching_segments, &prev)?;
            }
        }

        self.active_cells.sort_unstable();
        self.active_cells.dedup();
        self.winner_cells.sort_unstable();
        self.winner_cells.dedup();
        Ok(())
    }

    fn group_by_column(
        conn: &Connections,
        segments: &[SegmentId],
    ) -> FxHashMap<usize, Vec<SegmentId>> {
        let mut grouped: FxHashMap<usize, Vec<SegmentId>> = FxHashMap::default();
        for &seg in segments {
            if let Some(col) = conn.column_for_segment(seg) {
                grouped.entry(col.index()).or_default().push(seg);
            }
        }
        grouped
    }

    /// Activates the cells of a correctly predicted column:
    /// - Every cell owning one of the column's active segments becomes active.
    /// - The cell of the segment with the most active synapses (oldest on ties) becomes the winner.
    ///
    /// If learning is enabled, every active segment is adapted towards the previous active cells
    /// and grows synapses to previous winner cells until it has `max_new_synapse_count` potential
    /// synapses on them.
    fn activate_predicted_column(
        &mut self,
        conn: &mut Connections,
        segments: &[SegmentId],
        prev: &PreviousState,
        learn: bool,
    ) -> Result<()> {
        let activity = &self.last_activity;
        let mut winner = None;
        let mut best = (0, u64::MAX);

        for seg in segments.iter().filter_map(|&id| conn.segment(id)) {
            self.active_cells.push(seg.cell);
            let active = activity.active_count(seg.id);
            if winner.is_none() || active > best.0 || (active == best.0 && seg.ordinal < best.1) {
                best = (active, seg.ordinal);
                winner = Some(seg.cell);
            }
        }
        self.winner_cells.extend(winner);

        if learn {
            let config = conn.config();
            let (increment, decrement) = (config.permanence_increment, config.permanence_decrement);
            let max_new = config.max_new_synapse_count;

            for &seg in segments {
                Self::adapt_segment(conn, seg, &prev.active_cells, increment, decrement)?;
                let missing = max_new.saturating_sub(self.last_activity.potential_count(seg));
                if missing > 0 && conn.segment(seg).is_some() {
                    self.grow_synapses(conn, seg, &prev.winner_cells, missing)?;
                }
            }
        }
        Ok(())
    }

    /// Bursts a column when no cell in the column was predicted to become active:
    /// - Marks all cells in the column as active.
    /// - The cell of the best matching segment (most potential synapses on previous active cells) wins.
    /// - Without a matching segment, the least used cell wins and, when learning and there are
    ///   previous winner cells, grows a new segment towards them.
    fn burst_column(
        &mut self,
        conn: &mut Connections,
        column: ColumnId,
        matching_segments: &[SegmentId],
        prev: &PreviousState,
        learn: bool,
    ) -> Result<()> {
        self.active_cells.extend(conn.cells_of_column(column));

        let config = conn.config();
        let (increment, decrement) = (config.permanence_increment, config.permanence_decrement);
        let max_new = config.max_new_synapse_count;

        let mut best: Option<(SegmentId, usize)> = None;
        for &seg in matching_segments {
            let potential = self.last_activity.potential_count(seg);
            if best.map_or(true, |(_, score)| potential > score) {
                best = Some((seg, potential));
            }
        }

        match best.and_then(|(seg, potential)| conn.segment(seg).map(|s| (seg, s.cell, potential))) {
            Some((seg, cell, potential)) => {
                self.winner_cells.push(cell);
                if learn {
                    Self::adapt_segment(conn, seg, &prev.active_cells, increment, decrement)?;
                    let missing = max_new.saturating_sub(potential);
                    if missing > 0 && conn.segment(seg).is_some() {
                        self.grow_synapses(conn, seg, &prev.winner_cells, missing)?;
                    }
                }
            }
            None => {
                let cell = self.least_used_cell(conn, column);
                self.winner_cells.push(cell);
                if learn {
                    let count = max_new.min(prev.winner_cells.len());
                    if count > 0 {
                        let seg = conn.create_distal_segment(cell)?;
                        self.grow_synapses(conn, seg, &prev.winner_cells, count)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Punishes the matching segments of a column that was predicted but did not become active:
    /// synapses to previously active cells lose `predicted_segment_decrement`, the others are left alone.
    fn punish_predicted_column(
        conn: &mut Connections,
        matching_segments: &[SegmentId],
        prev: &PreviousState,
    ) -> Result<()> {
        let decrement = conn.config().predicted_segment_decrement;
        if decrement <= 0.0 {
            return Ok(());
        }
        for &seg in matching_segments {
            Self::adapt_segment(conn, seg, &prev.active_cells, -decrement, 0.0)?;
        }
        Ok(())
    }

    /// Hebbian update of a distal segment:
    /// - Synapses from cells in `prev_active_cells` gain `increment`, all others lose `decrement`.
    /// - Permanences are clamped to `[0, 1]`; synapses that reach zero are destroyed.
    /// - A segment left without synapses is destroyed.
    pub fn adapt_segment(
        conn: &mut Connections,
        segment: SegmentId,
        prev_active_cells: &FxHashSet<CellId>,
        increment: f64,
        decrement: f64,
    ) -> Result<()> {
        let Some(seg) = conn.segment(segment) else {
            return Ok(());
        };
        let synapses: Vec<(CellId, f64)> = seg
            .pool()
            .iter()
            .map(|syn| (CellId(syn.source.index()), syn.permanence))
            .collect();

        for (presynaptic, permanence) in synapses {
            let permanence = if prev_active_cells.contains(&presynaptic) {
                permanence + increment
            } else {
                permanence - decrement
            }
            .clamp(0.0, 1.0);

            if permanence < EPSILON {
                conn.destroy_synapse(segment, presynaptic)?;
            } else {
                conn.set_synapse_permanence(segment, presynaptic, permanence)?;
            }
        }

        if conn.segment(segment).is_some_and(|seg| seg.num_synapses() == 0) {
            conn.destroy_segment(segment)?;
        }
        Ok(())
    }

    /// Identifies and returns the cell with the fewest segments within a column.
    /// If multiple cells have the same minimum count, one is chosen at random.
    pub fn least_used_cell(&mut self, conn: &Connections, column: ColumnId) -> CellId {
        let mut min_segments = usize::MAX;
        let mut min_cells = Vec::new();

        for cell in conn.cells_of_column(column) {
            let seg_count = conn.num_segments_for_cell(cell);
            if seg_count < min_segments {
                min_segments = seg_count;
                min_cells.clear();
                min_cells.push(cell);
            } else if seg_count == min_segments {
                min_cells.push(cell);
            }
        }

        if min_cells.len() > 1 {
            min_cells[self.rand.random_range(0..min_cells.len())]
        } else {
            min_cells[0]
        }
    }

    /// Grows up to `count` new synapses on `segment`, each to a randomly chosen cell of
    /// `candidates` that the segment is not yet connected to, at `initial_permanence`.
    pub fn grow_synapses(
        &mut self,
        conn: &mut Connections,
        segment: SegmentId,
        candidates: &[CellId],
        count: usize,
    ) -> Result<()> {
        let Some(seg) = conn.segment(segment) else {
            return Ok(());
        };
        let mut candidates: Vec<CellId> = candidates
            .iter()
            .copied()
            .filter(|cell| !seg.pool().contains(cell.index()))
            .collect();
        if candidates.is_empty() || count == 0 {
            return Ok(());
        }

        candidates.sort_unstable();
        candidates.shuffle(&mut self.rand);
        candidates.truncate(count);
        candidates.sort_unstable();

        let permanence = conn.config().initial_permanence;
        for presynaptic in candidates {
            conn.create_synapse(segment, presynaptic, permanence)?;
        }
        Ok(())
    }

    /// Evaluates every distal segment against the current active cells:
    /// - Active segments reach `activation_threshold` connected synapses on active cells; their
    ///   cells become the predictive cells.
    /// - Matching segments reach `min_threshold` potential synapses on active cells.
    ///
    /// When learning, active segments are marked as used and the iteration counter advances.
    fn activate_dendrites(&mut self, conn: &mut Connections, learn: bool) {
        let activity = conn.compute_activity(&self.active_cells);
        let config = conn.config();
        let (activation_threshold, min_threshold) =
            (config.activation_threshold, config.min_threshold);

        let live = (0..conn.segment_capacity())
            .map(SegmentId)
            .filter(|&id| conn.segment(id).is_some());
        let (mut active, mut matching): (Vec<_>, Vec<_>) = (Vec::new(), Vec::new());
        for id in live {
            if activity.active_count(id) >= activation_threshold {
                active.push(id);
            }
            if activity.potential_count(id) >= min_threshold {
                matching.push(id);
            }
        }
        conn.sort_segments(&mut active);
        conn.sort_segments(&mut matching);

        self.predictive_cells = active
            .iter()
            .filter_map(|&id| conn.segment(id).map(|seg| seg.cell))
            .collect();
        self.predictive_cells.sort_unstable();
        self.predictive_cells.dedup();

        if learn {
            for &id in &active {
                conn.record_segment_activity(id);
            }
            conn.start_new_iteration();
        }

        self.active_segments = active;
        self.matching_segments = matching;
        self.last_activity = activity;
    }

    /// Starts a new sequence: forgets the current activity without touching learned synapses.
    pub fn reset(&mut self) {
        self.active_cells.clear();
        self.winner_cells.clear();
        self.predictive_cells.clear();
        self.active_segments.clear();
        self.matching_segments.clear();
        self.last_activity = SegmentActivity::default();
    }

    /// A snapshot of the current time step.
    pub fn cycle(&self) -> ComputeCycle {
        ComputeCycle {
            active_cells: self.active_cells.clone(),
            winner_cells: self.winner_cells.clone(),
            predictive_cells: self.predictive_cells.clone(),
            active_segments: self.active_segments.clone(),
            matching_segments: self.matching_segments.clone(),
        }
    }

    #[inline]
    pub fn active_cells(&self) -> &[CellId] {
        &self.active_cells
    }

    #[inline]
    pub fn winner_cells(&self) -> &[CellId] {
        &self.winner_cells
    }

    #[inline]
    pub fn predictive_cells(&self) -> &[CellId] {
        &self.predictive_cells
    }

    #[inline]
    pub fn active_segments(&self) -> &[SegmentId] {
        &self.active_segments
    }

    #[inline]
    pub fn matching_segments(&self) -> &[SegmentId] {
        &self.matching_segments
    }

    /// Segment activity computed at the end of the last time step.
    #[inline]
    pub fn last_activity(&self) -> &SegmentActivity {
        &self.last_activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HtmConfig {
        HtmConfig {
            cells_per_column: 4,
            activation_threshold: 3,
            min_threshold: 2,
            initial_permanence: 0.21,
            connected_permanence: 0.5,
            permanence_increment: 0.1,
            permanence_decrement: 0.1,
            predicted_segment_decrement: 0.05,
            max_new_synapse_count: 3,
            ..HtmConfig::new(vec![32], vec![32])
        }
    }

    fn memory(config: HtmConfig) -> (TemporalMemory, Connections) {
        let mut tm = TemporalMemory::new(&config);
        let mut conn = Connections::new(config).unwrap();
        tm.init(&mut conn).unwrap();
        (tm, conn)
    }

    fn cells(ids: &[usize]) -> FxHashSet<CellId> {
        ids.iter().copied().map(CellId).collect()
    }

    #[test]
    fn adapt_segment_reinforces_active_presynaptic_cells() {
        let (_, mut conn) = memory(config());
        let a = conn.create_distal_segment(CellId(4)).unwrap();
        let b = conn.create_distal_segment(CellId(8)).unwrap();
        conn.create_synapse(a, CellId(0), 0.3).unwrap();
        conn.create_synapse(b, CellId(0), 0.6).unwrap();

        let active = cells(&[0]);
        TemporalMemory::adapt_segment(&mut conn, a, &active, 0.1, 0.1).unwrap();
        TemporalMemory::adapt_segment(&mut conn, b, &active, 0.1, 0.1).unwrap();

        let perm = |seg: SegmentId| conn.segment(seg).unwrap().pool().permanence(0).unwrap();
        assert!((perm(a) - 0.4).abs() < 0.01);
        assert!((perm(b) - 0.7).abs() < 0.01);
    }

    #[test]
    fn adapt_segment_destroys_dead_synapses_and_empty_segments() {
        let (_, mut conn) = memory(config());
        let seg = conn.create_distal_segment(CellId(4)).unwrap();
        conn.create_synapse(seg, CellId(0), 0.05).unwrap();
        conn.create_synapse(seg, CellId(1), 0.5).unwrap();

        TemporalMemory::adapt_segment(&mut conn, seg, &cells(&[1]), 0.1, 0.1).unwrap();
        assert_eq!(conn.num_synapses(), 1);
        let permanence = conn.segment(seg).unwrap().pool().permanence(1).unwrap();
        assert!((permanence - 0.6).abs() < 1e-9);

        TemporalMemory::adapt_segment(&mut conn, seg, &cells(&[]), 0.1, 0.6).unwrap();
        assert!(conn.segment(seg).is_none());
        assert_eq!(conn.num_segments_for_cell(CellId(4)), 0);
    }

    #[test]
    fn least_used_cell_prefers_cells_without_segments() {
        let (mut tm, mut conn) = memory(config());
        for cell in [0, 1, 3] {
            conn.create_distal_segment(CellId(cell)).unwrap();
        }
        assert_eq!(tm.least_used_cell(&conn, ColumnId(0)), CellId(2));
    }

    #[test]
    fn grow_synapses_skips_connected_cells() {
        let (mut tm, mut conn) = memory(config());
        let seg = conn.create_distal_segment(CellId(40)).unwrap();
        conn.create_synapse(seg, CellId(1), 0.3).unwrap();

        let candidates = [CellId(1), CellId(2), CellId(3)];
        tm.grow_synapses(&mut conn, seg, &candidates, 5).unwrap();
        let presynaptic: Vec<_> = conn.segment(seg).unwrap().presynaptic_cells().collect();
        assert_eq!(presynaptic, vec![CellId(1), CellId(2), CellId(3)]);
        assert_eq!(conn.segment(seg).unwrap().pool().permanence(2), Some(0.21));
    }

    #[test]
    fn unpredicted_columns_burst() {
        let (mut tm, mut conn) = memory(config());
        let cycle = tm.compute(&mut conn, &[1, 3], true).unwrap();
        assert_eq!(cycle.active_cells.len(), 8);
        assert!(cycle.active_cells.iter().all(|c| c.column(4) == ColumnId(1) || c.column(4) == ColumnId(3)));
        assert_eq!(cycle.winner_cells.len(), 2);
        assert!(cycle.predictive_cells.is_empty());
        // Nothing to connect to on the first step.
        assert_eq!(conn.num_segments(), 0);
    }

    #[test]
    fn bursting_grows_segments_towards_previous_winners() {
        let (mut tm, mut conn) = memory(config());
        let first = tm.compute(&mut conn, &[0, 1, 2], true).unwrap();
        tm.compute(&mut conn, &[5, 6, 7], true).unwrap();

        assert_eq!(conn.num_segments(), 3);
        for &winner in tm.winner_cells() {
            let seg = conn.segments_for_cell(winner)[0];
            let presynaptic: Vec<_> = conn.segment(seg).unwrap().presynaptic_cells().collect();
            assert_eq!(presynaptic, first.winner_cells);
        }
    }

    #[test]
    fn learned_transition_is_predicted() {
        let config = HtmConfig {
            initial_permanence: 0.6,
            ..config()
        };
        let (mut tm, mut conn) = memory(config);
        tm.compute(&mut conn, &[0, 1, 2], true).unwrap();
        tm.compute(&mut conn, &[5, 6, 7], true).unwrap();
        tm.reset();

        tm.compute(&mut conn, &[0, 1, 2], false).unwrap();
        let predicted = tm.predictive_cells().to_vec();
        assert_eq!(predicted.len(), 3);

        let cycle = tm.compute(&mut conn, &[5, 6, 7], false).unwrap();
        assert_eq!(cycle.active_cells, predicted);
        assert_eq!(cycle.winner_cells, predicted);
    }

    #[test]
    fn wrong_predictions_are_punished() {
        let config = HtmConfig {
            initial_permanence: 0.6,
            ..config()
        };
        let (mut tm, mut conn) = memory(config);
        tm.compute(&mut conn, &[0, 1, 2], true).unwrap();
        tm.compute(&mut conn, &[5, 6, 7], true).unwrap();
        tm.reset();
        tm.compute(&mut conn, &[0, 1, 2], true).unwrap();
        let segments = tm.matching_segments().to_vec();
        assert_eq!(segments.len(), 3);

        tm.compute(&mut conn, &[20], true).unwrap();
        for seg in segments {
            for syn in conn.segment(seg).unwrap().pool().iter() {
                assert!((syn.permanence - 0.55).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn inference_does_not_learn() {
        let (mut tm, mut conn) = memory(config());
        tm.compute(&mut conn, &[0, 1], false).unwrap();
        tm.compute(&mut conn, &[2, 3], false).unwrap();
        assert_eq!(conn.num_segments(), 0);
        assert_eq!(conn.iteration(), 0);
    }

    #[test]
    fn reset_forgets_the_sequence() {
        let (mut tm, mut conn) = memory(config());
        tm.compute(&mut conn, &[0, 1, 2], true).unwrap();
        tm.reset();
        assert!(tm.active_cells().is_empty());
        assert!(tm.winner_cells().is_empty());

        tm.compute(&mut conn, &[5, 6, 7], true).unwrap();
        assert_eq!(conn.num_segments(), 0);
    }

    #[test]
    fn invalid_column_sets_are_rejected() {
        let (mut tm, mut conn) = memory(config());
        assert!(matches!(tm.compute(&mut conn, &[], true), Err(HtmError::EmptyInput)));
        assert!(matches!(
            tm.compute(&mut conn, &[3, 32], true),
            Err(HtmError::IndexOutOfBounds { kind: "column", index: 32, size: 32 })
        ));

        let config = config();
        let mut fresh = TemporalMemory::new(&config);
        let mut conn = Connections::new(config).unwrap();
        assert!(matches!(
            fresh.compute(&mut conn, &[0], true),
            Err(HtmError::NotInitialized)
        ));
    }
}
