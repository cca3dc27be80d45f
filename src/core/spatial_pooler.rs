//! The `SpatialPooler` is a core component of HTM that:
//! - Builds, for every column, a potential pool of synapses into its own subset of the input space.
//! - Computes an "overlap" score for each column based on how many connected synapses match the current input.
//! - Enforces sparse activity via inhibition, allowing only a subset of top columns to become "winner columns".
//! - Learns to increase/decrease synapse permanence (strength) values if the connected input bit was active/inactive.
//!
//! Each column selectively "tunes" its connections to represent frequently encountered input patterns, leading to SDRs.
//!
//! What are duty cycles?
//! - They are rolling metrics that measure how often each column is meeting certain criteria over time.
//! - The SP tracks: overlap duty cycles (ODC) and active duty cycles (ADC).
//! - ODC tracks how frequently a column has a non-zero overlap score with the input.
//! - ADC tracks how frequently a column is chosen as a winner after inhibition.
//! - By comparing these metrics to thresholds, the SP can decide whether to boost columns.
//! - This prevents columns from becoming inactive or uncompetitive over time.
//!
//! The columns and their proximal synapses live in [`Connections`]; the pooler owns only its
//! per-column bookkeeping (overlaps, duty cycles, boost factors) and its random generator.
//! With [`Execution::Parallel`] the per-column overlap and learning loops run on the rayon thread
//! pool. Winner selection waits for every overlap, and learned permanences are written back in
//! column order, so both modes produce identical results.

use super::{
    config::HtmConfig,
    connections::Connections,
    error::{HtmError, Result},
    homeostasis::HomeostaticPlasticityController,
    ids::ColumnId,
    synapses::Pool,
    topology::Topology,
};
use log::{debug, trace};
use rand::{rngs::StdRng, seq::IteratorRandom, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How the per-column loops of the pooler are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Execution {
    /// Every column is processed on the calling thread.
    #[default]
    Sequential,
    /// Overlaps and permanence updates are computed on the rayon thread pool.
    Parallel,
}

/// The SpatialPooler turns binary input vectors into sparse sets of active columns.
/// It computes overlaps, applies inhibition, boosts weak columns, and adapts synapses during learning.
pub struct SpatialPooler {
    /// A seeded pseudo-random number generator for reproducible potential pools and permanences.
    pub rand: StdRng,

    /// Whether per-column work runs sequentially or on the rayon pool.
    pub execution: Execution,

    /// The total number of compute iterations performed so far (whether learning or not).
    pub iteration_num: u32,

    /// The number of compute iterations performed so far with learning enabled.
    pub iteration_learn_num: u32,

    /// Size of a column's local neighborhood for local inhibition and local minimum duty cycles.
    pub inhibition_radius: usize,

    /// Number of connected synapses on active input bits for each column, 0 below the stimulus threshold.
    pub overlaps: Vec<f64>,

    /// Overlaps multiplied by boost factors (equal to `overlaps` when not learning).
    pub boosted_overlaps: Vec<f64>,

    /// Rolling average of how often each column has an overlap > 0 in the current time window.
    pub overlap_duty_cycles: Vec<f64>,

    /// Rolling average of how often each column is chosen as a winner.
    pub active_duty_cycles: Vec<f64>,

    /// The threshold for each column's overlap duty cycle, columns below this threshold get their permanences bumped.
    pub min_overlap_duty_cycles: Vec<f64>,

    /// The threshold for each column's active duty cycle, columns below this threshold get their overlap boosted.
    pub min_active_duty_cycles: Vec<f64>,

    /// A multiplier applied to a column's overlap if it is underactive.
    pub boost_factors: Vec<f64>,

    /// The indices of columns that won the inhibition process this iteration, ascending.
    pub winner_columns: Vec<usize>,

    /// Optional controller that ends the new-born stage and reports output stability.
    homeostasis: Option<HomeostaticPlasticityController>,

    /// Cleared for good once the new-born stage is over.
    boosting_enabled: bool,

    initialized: bool,
}

impl SpatialPooler {
    /// Creates a pooler whose random generator is seeded from `config.seed`.
    /// It has no columns until [`SpatialPooler::init`] runs.
    pub fn new(config: &HtmConfig) -> Self {
        Self {
            rand: StdRng::seed_from_u64(config.seed),
            execution: Execution::Sequential,
            iteration_num: 0,
            iteration_learn_num: 0,
            inhibition_radius: 0,
            overlaps: Vec::new(),
            boosted_overlaps: Vec::new(),
            overlap_duty_cycles: Vec::new(),
            active_duty_cycles: Vec::new(),
            min_overlap_duty_cycles: Vec::new(),
            min_active_duty_cycles: Vec::new(),
            boost_factors: Vec::new(),
            winner_columns: Vec::new(),
            homeostasis: None,
            boosting_enabled: true,
            initialized: false,
        }
    }

    /// Sets how per-column work is executed.
    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Attaches a homeostatic plasticity controller. Every learning cycle is reported to it and
    /// boosting is switched off as soon as it ends the new-born stage.
    pub fn with_homeostasis(mut self, controller: HomeostaticPlasticityController) -> Self {
        self.homeostasis = Some(controller);
        self
    }

    pub fn homeostasis(&self) -> Option<&HomeostaticPlasticityController> {
        self.homeostasis.as_ref()
    }

    /// True if a homeostatic controller is attached and reports a stable output.
    pub fn is_stable(&self) -> bool {
        self.homeostasis.as_ref().is_some_and(|h| h.is_stable())
    }

    #[inline]
    pub fn is_boosting_enabled(&self) -> bool {
        self.boosting_enabled
    }

    /// Initializes the `SpatialPooler`:
    /// - Creates the columns and cells of `conn` if that has not happened yet.
    /// - Sizes the per-column bookkeeping.
    /// - Builds and configures the potential pool of every column.
    /// - Derives the initial inhibition radius from the connected synapses.
    pub fn init(&mut self, conn: &mut Connections) -> Result<()> {
        if self.initialized {
            return Err(HtmError::AlreadyInitialized);
        }
        if !conn.is_initialized() {
            conn.init()?;
        }

        let num_columns = conn.num_columns();
        self.overlaps = vec![0.0; num_columns];
        self.boosted_overlaps = vec![0.0; num_columns];
        self.overlap_duty_cycles = vec![0.0; num_columns];
        self.active_duty_cycles = vec![0.0; num_columns];
        self.min_overlap_duty_cycles = vec![0.0; num_columns];
        self.min_active_duty_cycles = vec![0.0; num_columns];
        self.boost_factors = vec![1.0; num_columns];
        self.winner_columns = Vec::with_capacity(num_columns);

        self.connect_and_configure_inputs(conn)?;
        self.update_inhibition_radius(conn)?;
        self.initialized = true;

        debug!(
            "spatial pooler initialized: {} columns, {} inputs, inhibition radius {}",
            num_columns,
            conn.num_inputs(),
            self.inhibition_radius
        );
        Ok(())
    }

    /// Processes the current `input`, writing the dense active-column mask into `active_columns`:
    /// - Updates iteration counters.
    /// - Calculates overlaps between columns and the input.
    /// - Applies boosting if learning is enabled.
    /// - Performs inhibition to pick winner columns.
    ///
    /// If learning is enabled:
    /// - Updates synapse permanence values of the winners.
    /// - Updates duty cycles and boost factors, bumps weak columns.
    /// - Every `update_period` iterations, recomputes the inhibition radius and minimum duty cycles.
    /// - Reports the winners to the homeostatic controller, if one is attached.
    pub fn compute(
        &mut self,
        conn: &mut Connections,
        input: &[bool],
        active_columns: &mut [bool],
        learn: bool,
    ) -> Result<()> {
        self.check_compute_args(conn, input)?;
        if active_columns.len() != conn.num_columns() {
            return Err(HtmError::DimensionMismatch {
                expected: conn.num_columns(),
                actual: active_columns.len(),
            });
        }

        self.update_iteration_number(learn);
        self.calculate_overlaps(conn, input)?;
        self.boost(learn);
        self.inhibit_columns(conn);

        if learn {
            self.adapt_synapses(conn, input)?;
            self.update_duty_cycles(conn);
            self.bump_up_weak_columns(conn)?;
            self.update_boost_factors(conn);
            if self.is_update_round(conn) {
                self.update_inhibition_radius(conn)?;
                self.update_min_duty_cycles(conn);
            }
        }

        active_columns.fill(false);
        for &col in &self.winner_columns {
            active_columns[col] = true;
        }
        if learn {
            self.update_homeostasis(input);
        }

        trace!(
            "sp iteration {}: {} active columns",
            self.iteration_num,
            self.winner_columns.len()
        );
        Ok(())
    }

    /// Like [`SpatialPooler::compute`], but returns the sorted indices of the active columns.
    pub fn compute_active(
        &mut self,
        conn: &mut Connections,
        input: &[bool],
        learn: bool,
    ) -> Result<Vec<usize>> {
        let mut active = vec![false; conn.num_columns()];
        self.compute(conn, input, &mut active, learn)?;
        Ok(self.winner_columns.clone())
    }

    fn update_homeostasis(&mut self, input: &[bool]) {
        let Some(controller) = self.homeostasis.as_mut() else {
            return;
        };
        controller.compute(input, &self.winner_columns);
        if self.boosting_enabled && !controller.is_newborn() {
            self.disable_boosting();
        }
    }

    /// Ends boosting: every boost factor becomes 1.0 and the minimum duty cycles stay at 0, so
    /// neither boost factors nor weak-column bumps change from here on.
    pub fn disable_boosting(&mut self) {
        self.boosting_enabled = false;
        self.boost_factors.fill(1.0);
        self.min_overlap_duty_cycles.fill(0.0);
        self.min_active_duty_cycles.fill(0.0);
        debug!(
            "spatial pooler boosting disabled at iteration {}",
            self.iteration_num
        );
    }

    fn check_compute_args(&self, conn: &Connections, input: &[bool]) -> Result<()> {
        if !self.initialized || !conn.is_initialized() {
            return Err(HtmError::NotInitialized);
        }
        if self.overlaps.len() != conn.num_columns() {
            return Err(HtmError::DimensionMismatch {
                expected: self.overlaps.len(),
                actual: conn.num_columns(),
            });
        }
        if input.len() != conn.num_inputs() {
            return Err(HtmError::DimensionMismatch {
                expected: conn.num_inputs(),
                actual: input.len(),
            });
        }
        Ok(())
    }

    /// Increments the global iteration counters, including a separate counter if `learn` is true.
    #[inline]
    pub fn update_iteration_number(&mut self, learn: bool) {
        self.iteration_num += 1;
        if learn {
            self.iteration_learn_num += 1;
        }
    }

    /// Returns true if enough iterations have passed to refresh the inhibition radius and minimum duty cycles.
    #[inline]
    pub fn is_update_round(&self, conn: &Connections) -> bool {
        self.iteration_num % conn.config().update_period == 0
    }

    /// Calculates the overlap of every column with the current input:
    /// - Counts how many connected synapses map to an active input bit.
    /// - Overlaps below the stimulus threshold are set to 0.
    ///
    /// This is the only per-column phase that runs before inhibition; in parallel mode it is the
    /// work that inhibition has to wait for.
    pub fn calculate_overlaps(&mut self, conn: &Connections, input: &[bool]) -> Result<()> {
        let stimulus_threshold = conn.config().stimulus_threshold;
        let overlap = |col: usize| -> Result<f64> {
            Ok(conn.column(ColumnId(col))?.overlap(input, stimulus_threshold))
        };

        self.overlaps = match self.execution {
            Execution::Sequential => (0..conn.num_columns())
                .map(overlap)
                .collect::<Result<Vec<_>>>()?,
            Execution::Parallel => (0..conn.num_columns())
                .into_par_iter()
                .map(overlap)
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(())
    }

    /// Multiplies each column's overlap by its boost factor if learning is on; otherwise the
    /// boosted overlaps are the raw overlaps.
    pub fn boost(&mut self, learn: bool) {
        self.boosted_overlaps.clone_from(&self.overlaps);
        if learn {
            for (overlap, boost) in self.boosted_overlaps.iter_mut().zip(&self.boost_factors) {
                *overlap *= *boost;
            }
        }
    }

    /// Selects the winner columns from the boosted overlaps, globally or locally.
    /// Local inhibition falls back to global once the inhibition radius exceeds the column space.
    pub fn inhibit_columns(&mut self, conn: &Connections) {
        let config = conn.config();
        let global = config.global_inhibition
            || self.inhibition_radius > conn.column_topology().max_dimension();

        self.winner_columns = if global {
            self.inhibit_columns_global(conn)
        } else {
            let density = self.inhibition_density(conn);
            self.inhibit_columns_local(conn, density)
        };
    }

    /// Number of columns that survive global inhibition: `num_active_columns_per_inh_area` rounded,
    /// or `local_area_density` of all columns if that is set, capped at the number of columns.
    pub fn num_active_columns_global(&self, conn: &Connections) -> usize {
        let config = conn.config();
        let num_columns = conn.num_columns();
        let wanted = if config.local_area_density > 0.0 {
            config.local_area_density * num_columns as f64
        } else {
            config.num_active_columns_per_inh_area
        };
        (wanted.round().max(0.0) as usize).min(num_columns)
    }

    /// Implements global inhibition:
    /// - Sorts every column by boosted overlap descending, then boost factor descending, then index.
    /// - Takes the first [`SpatialPooler::num_active_columns_global`] columns.
    ///
    /// The winner count is fixed, so even an all-zero input yields a full set of winners picked by
    /// boost factor and index.
    pub fn inhibit_columns_global(&self, conn: &Connections) -> Vec<usize> {
        let mut candidates: Vec<usize> = (0..self.boosted_overlaps.len()).collect();
        candidates.sort_by(|&a, &b| {
            self.boosted_overlaps[b]
                .total_cmp(&self.boosted_overlaps[a])
                .then_with(|| self.boost_factors[b].total_cmp(&self.boost_factors[a]))
                .then_with(|| a.cmp(&b))
        });
        candidates.truncate(self.num_active_columns_global(conn));
        candidates.sort_unstable();
        candidates
    }

    /// Implements local inhibition. A column above the stimulus threshold wins if fewer than
    /// `0.5 + density * |neighborhood|` of its neighbors have a higher overlap. Columns are visited
    /// in index order and every winner's overlap is nudged up slightly, so among equal overlaps the
    /// lower index wins.
    pub fn inhibit_columns_local(&self, conn: &Connections, density: f64) -> Vec<usize> {
        let config = conn.config();
        let overlaps = &self.boosted_overlaps;
        let max_overlap = overlaps.iter().copied().fold(0.0, f64::max);
        let winner_delta = if max_overlap == 0.0 {
            0.001
        } else {
            max_overlap / 1000.0
        };

        let mut tie_broken = overlaps.clone();
        let mut winners = Vec::new();

        for (col, &overlap) in overlaps.iter().enumerate() {
            if overlap < config.stimulus_threshold {
                continue;
            }
            let neighborhood: Vec<usize> = conn
                .column_topology()
                .neighborhood(col, self.inhibition_radius, config.wrap_around)
                .collect();
            let num_higher = neighborhood
                .iter()
                .filter(|&&n| tie_broken[n] > overlap)
                .count();
            let num_active = (0.5 + density * neighborhood.len() as f64) as usize;

            if num_higher < num_active {
                winners.push(col);
                tie_broken[col] += winner_delta;
            }
        }
        winners
    }

    /// Fraction of columns allowed to win within one inhibition area:
    /// `local_area_density` if set, otherwise `num_active_columns_per_inh_area` over the inhibition
    /// area, capped at `max_inhibition_density`.
    pub fn inhibition_density(&self, conn: &Connections) -> f64 {
        let config = conn.config();
        if config.local_area_density > 0.0 {
            return config.local_area_density;
        }

        let dims = conn.column_topology().num_dimensions() as i32;
        let area = ((2 * self.inhibition_radius + 1) as f64)
            .powi(dims)
            .min(conn.num_columns() as f64);
        (config.num_active_columns_per_inh_area / area).min(config.max_inhibition_density)
    }

    /// Adjusts synapses of each winner column after an input is processed:
    /// - Increments permanence of synapses whose input bit was active.
    /// - Decrements permanence of synapses whose input bit was inactive.
    /// - Raises the column back to the stimulus threshold if needed, trims and clamps.
    ///
    /// Implements Hebbian-like learning that shapes columns towards frequently active inputs.
    pub fn adapt_synapses(&self, conn: &mut Connections, input: &[bool]) -> Result<()> {
        let config = conn.config();
        let options = config.proximal_permanence_options();
        let stimulus_threshold = config.stimulus_threshold;

        self.update_pools(conn, &self.winner_columns, |pool| {
            pool.update_permanences(|bit, permanence| {
                if input[bit] {
                    permanence + options.active_increment
                } else {
                    permanence - options.inactive_decrement
                }
            });
            pool.update_column_permanences(true, stimulus_threshold, &options);
        })
    }

    /// Increases permanence on "weak" columns whose overlap duty cycle is below their minimum:
    /// - Bumps every potential synapse of such a column by `syn_perm_below_stimulus_inc`.
    /// - Raises, trims and clamps the column like any other permanence update.
    ///
    /// Prevents columns from perpetually remaining low-overlap, giving them a chance to learn and stay relevant.
    pub fn bump_up_weak_columns(&self, conn: &mut Connections) -> Result<()> {
        let weak: Vec<usize> = self
            .overlap_duty_cycles
            .iter()
            .zip(&self.min_overlap_duty_cycles)
            .enumerate()
            .filter(|(_, (&odc, &min))| odc < min)
            .map(|(col, _)| col)
            .collect();
        if weak.is_empty() {
            return Ok(());
        }

        let config = conn.config();
        let options = config.proximal_permanence_options();
        let stimulus_threshold = config.stimulus_threshold;

        self.update_pools(conn, &weak, |pool| {
            pool.update_permanences(|_, permanence| permanence + options.below_stimulus_increment);
            pool.update_column_permanences(true, stimulus_threshold, &options);
        })
    }

    /// Applies `update` to the pools of `columns`. In parallel mode the updates are computed on
    /// copies of the pools and committed afterwards in column order.
    fn update_pools<F>(&self, conn: &mut Connections, columns: &[usize], update: F) -> Result<()>
    where
        F: Fn(&mut Pool) + Send + Sync,
    {
        match self.execution {
            Execution::Sequential => {
                for &col in columns {
                    update(conn.column_mut(ColumnId(col))?.pool_mut());
                }
            }
            Execution::Parallel => {
                let shared: &Connections = conn;
                let updated = columns
                    .par_iter()
                    .map(|&col| {
                        let mut pool = shared.column(ColumnId(col))?.pool().clone();
                        update(&mut pool);
                        Ok((col, pool))
                    })
                    .collect::<Result<Vec<_>>>()?;

                for (col, pool) in updated {
                    *conn.column_mut(ColumnId(col))?.pool_mut() = pool;
                }
            }
        }
        Ok(())
    }

    /// Updates the rolling duty cycles for overlap and active states:
    /// `dc = (dc * (period - 1) + value) / period` with `period = min(duty_cycle_period, iteration)`.
    pub fn update_duty_cycles(&mut self, conn: &Connections) {
        let period = self
            .iteration_num
            .min(conn.config().duty_cycle_period)
            .max(1) as f64;

        for (duty, &overlap) in self.overlap_duty_cycles.iter_mut().zip(&self.overlaps) {
            let value = if overlap > 0.0 { 1.0 } else { 0.0 };
            *duty = (*duty * (period - 1.0) + value) / period;
        }

        let mut active = vec![false; self.active_duty_cycles.len()];
        for &col in &self.winner_columns {
            active[col] = true;
        }
        for (duty, &is_active) in self.active_duty_cycles.iter_mut().zip(&active) {
            let value = if is_active { 1.0 } else { 0.0 };
            *duty = (*duty * (period - 1.0) + value) / period;
        }
    }

    /// Recalculates each column's boost factor based on its active duty cycle:
    /// - If no column has a positive minimum active duty cycle, the factors are left unchanged.
    /// - A column at or above its minimum gets 1.0.
    /// - Otherwise the factor falls linearly from `max_boost` (never active) towards 1.0.
    pub fn update_boost_factors(&mut self, conn: &Connections) {
        if !self.min_active_duty_cycles.iter().any(|&min| min > 0.0) {
            return;
        }

        let max_boost = conn.config().max_boost;
        self.boost_factors
            .iter_mut()
            .zip(&self.min_active_duty_cycles)
            .zip(&self.active_duty_cycles)
            .for_each(|((boost, &min), &active)| {
                *boost = if active >= min {
                    1.0
                } else {
                    (1.0 - max_boost) / min * active + max_boost
                };
            });
    }

    /// Updates the minimum duty cycles, globally or per neighborhood. Does nothing once boosting
    /// is disabled.
    pub fn update_min_duty_cycles(&mut self, conn: &Connections) {
        if !self.boosting_enabled {
            return;
        }
        if conn.config().global_inhibition || self.inhibition_radius > conn.num_inputs() {
            self.update_min_duty_cycles_global(conn);
        } else {
            self.update_min_duty_cycles_local(conn);
        }
    }

    /// Sets every column's minimum duty cycles to a fraction of the largest duty cycles in the region.
    pub fn update_min_duty_cycles_global(&mut self, conn: &Connections) {
        let config = conn.config();
        let max_overlap = self.overlap_duty_cycles.iter().copied().fold(0.0, f64::max);
        let max_active = self.active_duty_cycles.iter().copied().fold(0.0, f64::max);
        self.min_overlap_duty_cycles
            .fill(config.min_pct_overlap_duty_cycles * max_overlap);
        self.min_active_duty_cycles
            .fill(config.min_pct_active_duty_cycles * max_active);
    }

    /// Sets each column's minimum duty cycles to a fraction of the largest duty cycles within its
    /// inhibition neighborhood.
    pub fn update_min_duty_cycles_local(&mut self, conn: &Connections) {
        let config = conn.config();
        let topology = conn.column_topology();

        for col in 0..self.min_active_duty_cycles.len() {
            let (max_active, max_overlap) = topology
                .neighborhood(col, self.inhibition_radius, config.wrap_around)
                .fold((0.0_f64, 0.0_f64), |(active, overlap), n| {
                    (
                        active.max(self.active_duty_cycles[n]),
                        overlap.max(self.overlap_duty_cycles[n]),
                    )
                });
            self.min_active_duty_cycles[col] = max_active * config.min_pct_active_duty_cycles;
            self.min_overlap_duty_cycles[col] = max_overlap * config.min_pct_overlap_duty_cycles;
        }
    }

    /// Updates the inhibition radius from the average span of connected synapses and the average
    /// number of columns per input. With global inhibition it is the largest column dimension.
    pub fn update_inhibition_radius(&mut self, conn: &Connections) -> Result<()> {
        if conn.config().global_inhibition {
            self.inhibition_radius = conn.column_topology().max_dimension();
            return Ok(());
        }

        let mut span_sum = 0.0;
        for col in 0..conn.num_columns() {
            span_sum += self.avg_span_of_connected_synapses(conn, ColumnId(col))?;
        }
        let avg_connected_span = span_sum / conn.num_columns() as f64;

        let diameter = avg_connected_span * Self::avg_columns_per_input(conn);
        let radius = ((diameter - 1.0) / 2.0).max(1.0);
        self.inhibition_radius = (radius + 0.5) as usize;

        debug!("inhibition radius set to {}", self.inhibition_radius);
        Ok(())
    }

    /// Average, over the input dimensions, of the extent covered by a column's connected synapses.
    /// 0 if the column has no connected synapse.
    pub fn avg_span_of_connected_synapses(&self, conn: &Connections, column: ColumnId) -> Result<f64> {
        let topology = conn.input_topology();
        let dims = topology.num_dimensions();
        let mut min_coord = vec![usize::MAX; dims];
        let mut max_coord = vec![0; dims];
        let mut any = false;

        for bit in conn.column(column)?.pool().connected() {
            any = true;
            for (d, coord) in topology.coordinates(bit).into_iter().enumerate() {
                min_coord[d] = min_coord[d].min(coord);
                max_coord[d] = max_coord[d].max(coord);
            }
        }
        if !any {
            return Ok(0.0);
        }

        let spans: usize = max_coord
            .iter()
            .zip(&min_coord)
            .map(|(max, min)| max - min + 1)
            .sum();
        Ok(spans as f64 / dims as f64)
    }

    /// Average ratio of columns to inputs across all dimensions.
    pub fn avg_columns_per_input(conn: &Connections) -> f64 {
        let config = conn.config();
        let ratios: f64 = config
            .column_dimensions
            .iter()
            .zip(&config.input_dimensions)
            .map(|(&cols, &inputs)| cols as f64 / inputs as f64)
            .sum();
        ratios / config.column_dimensions.len() as f64
    }

    /// Allocates and configures each column's proximal synapses:
    /// - Calls `map_potential()` for each column to select the input bits of its potential pool.
    /// - Creates the pool with every synapse at the connected threshold.
    /// - Randomizes the permanences based on `init_connected_pct`, then raises, trims and clamps them.
    ///
    /// Establishes each column's initial "potential synapses", which define where it can learn to connect.
    pub fn connect_and_configure_inputs(&mut self, conn: &mut Connections) -> Result<()> {
        let config = conn.config().clone();
        let options = config.proximal_permanence_options();

        for col in 0..conn.num_columns() {
            let column = ColumnId(col);
            let potential = self.map_potential(conn, column);
            if (potential.len() as f64) < config.stimulus_threshold {
                return Err(HtmError::config(
                    "stimulus_threshold",
                    format!(
                        "{} exceeds the {} inputs in the potential pool of {}",
                        config.stimulus_threshold,
                        potential.len(),
                        column
                    ),
                ));
            }

            conn.create_potential_pool(column, &potential)?;

            let rand = &mut self.rand;
            let pool = conn.column_mut(column)?.pool_mut();
            pool.update_permanences(|_, _| Self::init_permanence(&config, rand));
            pool.update_column_permanences(true, config.stimulus_threshold, &options);
        }
        Ok(())
    }

    /// A random initial permanence: with probability `init_connected_pct` in
    /// `[syn_perm_connected, syn_perm_max)`, otherwise in `[0, syn_perm_connected)`.
    /// Values are truncated to 5 decimals; values below the trim threshold become 0.
    pub fn init_permanence(config: &HtmConfig, rand: &mut StdRng) -> f64 {
        let permanence = if rand.random::<f64>() <= config.init_connected_pct {
            config.syn_perm_connected
                + (config.syn_perm_max - config.syn_perm_connected) * rand.random::<f64>()
        } else {
            config.syn_perm_connected * rand.random::<f64>()
        };
        let permanence = (permanence * 100_000.0).trunc() / 100_000.0;

        if permanence < config.syn_perm_trim_threshold {
            0.0
        } else {
            permanence
        }
    }

    /// Samples which input bits fall within a column's potential radius:
    /// - Determines the center input index for the column via `map_column()`.
    /// - Gathers all input indices within the potential radius from that center, wrapping if configured.
    /// - Randomly selects `potential_pct` of them (rounded) as the potential pool.
    ///
    /// Returns the selected input bits, ascending.
    pub fn map_potential(&mut self, conn: &Connections, column: ColumnId) -> Vec<usize> {
        let config = conn.config();
        let center = Self::map_column(conn.column_topology(), conn.input_topology(), column);
        let receptive_field = conn.input_topology().neighborhood(
            center,
            config.effective_potential_radius(),
            config.wrap_around,
        );
        let size = Self::potential_synapses(receptive_field.size_hint().0, config.potential_pct);

        let mut sample = receptive_field.choose_multiple(&mut self.rand, size);
        sample.sort_unstable();
        sample.dedup();
        sample
    }

    /// How many potential synapses a column gets from a receptive field of `input_size` bits.
    #[inline]
    pub fn potential_synapses(input_size: usize, potential_pct: f64) -> usize {
        ((input_size as f64 * potential_pct) + 0.5) as usize
    }

    /// Maps a column index to the "center" input index in the input space:
    /// - Proportionally maps the column's coordinates to the input grid coordinates.
    /// - Offset by half a column span for better distribution.
    /// - Clamps the result to the valid input range.
    pub fn map_column(columns: &Topology, inputs: &Topology, column: ColumnId) -> usize {
        let coords: Vec<usize> = columns
            .coordinates(column.index())
            .into_iter()
            .zip(columns.dimensions())
            .zip(inputs.dimensions())
            .map(|((index, &col_dim), &in_dim)| {
                let ratio = index as f64 / col_dim as f64;
                let span = in_dim as f64 / col_dim as f64;
                ((ratio * in_dim as f64 + span * 0.5) as usize).min(in_dim - 1)
            })
            .collect();
        inputs.index_from_coordinates(&coords)
    }

    /// Removes the columns that have never been active from `active_columns`. Such columns cannot
    /// represent a learned pattern; only useful for inference with a trained pooler.
    pub fn strip_unlearned_columns(&self, active_columns: &[usize]) -> Vec<usize> {
        active_columns
            .iter()
            .copied()
            .filter(|&col| self.active_duty_cycles.get(col).is_some_and(|&dc| dc > 0.0))
            .collect()
    }

    /// Ratio of each column's last overlap to its number of connected synapses (0 when unconnected).
    pub fn overlap_percentages(&self, conn: &Connections) -> Vec<f64> {
        conn.connected_counts()
            .into_iter()
            .zip(&self.overlaps)
            .map(|(count, &overlap)| {
                if count == 0 {
                    0.0
                } else {
                    overlap / count as f64
                }
            })
            .collect()
    }
}
