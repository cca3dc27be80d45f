//! `HtmConfig` is the single parameter bag shared by the Spatial Pooler and the Temporal Memory.
//!
//! It is created once, validated when handed to [`Connections`](super::connections::Connections),
//! and from then on only read. Both algorithms look up their parameters through the
//! connectivity memory they operate on, so there is exactly one source of truth per model.
//!
//! Parameters can be set field by field (`..Default::default()`), or loaded from a JSON document in
//! which any missing field falls back to its default.

use super::error::{HtmError, Result};
use super::synapses::SynapsePermanenceOptions;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Algorithm parameters for a Spatial Pooler / Temporal Memory pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmConfig {
    /// The shape (dimensions) of the input space.
    pub input_dimensions: Vec<usize>,

    /// The shape (dimensions) of the column grid.
    pub column_dimensions: Vec<usize>,

    /// Radius (in input space) around a column's center from which potential synapses are drawn. -1 means the entire input space.
    pub potential_radius: i32,

    /// Fraction of the inputs within `potential_radius` that become potential synapses of a column.
    pub potential_pct: f64,

    /// If true, winner columns are selected from the whole column space instead of local neighborhoods.
    pub global_inhibition: bool,

    /// Desired density of active columns within a local inhibition area. Only used when positive.
    pub local_area_density: f64,

    /// Number of columns that may be active within one inhibition area.
    pub num_active_columns_per_inh_area: f64,

    /// Upper bound for the density derived from `num_active_columns_per_inh_area` under local inhibition.
    pub max_inhibition_density: f64,

    /// Minimum number of connected synapses on active inputs for a column to have a non-zero overlap.
    pub stimulus_threshold: f64,

    /// Permanence decrement applied to proximal synapses on inactive input bits.
    pub syn_perm_inactive_dec: f64,

    /// Permanence increment applied to proximal synapses on active input bits.
    pub syn_perm_active_inc: f64,

    /// Permanence at or above which a proximal synapse counts as connected.
    pub syn_perm_connected: f64,

    /// Increment applied to every potential synapse of a column that lacks enough connected synapses.
    pub syn_perm_below_stimulus_inc: f64,

    /// Proximal permanences at or below this value are trimmed to zero.
    pub syn_perm_trim_threshold: f64,

    /// Lower permanence bound.
    pub syn_perm_min: f64,

    /// Upper permanence bound.
    pub syn_perm_max: f64,

    /// Fraction of each column's potential synapses that start out connected.
    pub init_connected_pct: f64,

    /// Fraction of the neighborhood maximum below which a column's overlap duty cycle is too low.
    pub min_pct_overlap_duty_cycles: f64,

    /// Fraction of the neighborhood maximum below which a column's active duty cycle is too low.
    pub min_pct_active_duty_cycles: f64,

    /// Window of the exponential moving average used for duty cycles.
    pub duty_cycle_period: u32,

    /// How often (in iterations) the inhibition radius and minimum duty cycles are recomputed.
    pub update_period: u32,

    /// Maximum boost factor of a chronically under-active column.
    pub max_boost: f64,

    /// If true, neighborhoods wrap around the edges of the input and column spaces.
    pub wrap_around: bool,

    /// Number of cells in every column.
    pub cells_per_column: usize,

    /// Number of connected active synapses that make a distal segment active.
    pub activation_threshold: usize,

    /// Number of potential active synapses that make a distal segment matching.
    pub min_threshold: usize,

    /// Permanence of newly grown distal synapses.
    pub initial_permanence: f64,

    /// Permanence at or above which a distal synapse counts as connected.
    pub connected_permanence: f64,

    /// Permanence increment for distal synapses on previously active cells.
    pub permanence_increment: f64,

    /// Permanence decrement for distal synapses on previously inactive cells.
    pub permanence_decrement: f64,

    /// Decrement applied to matching segments of columns that did not become active.
    pub predicted_segment_decrement: f64,

    /// Maximum number of synapses grown on a segment in one learning step.
    pub max_new_synapse_count: usize,

    /// Maximum number of distal segments per cell.
    pub max_segments_per_cell: usize,

    /// Maximum number of synapses per distal segment.
    pub max_synapses_per_segment: usize,

    /// Seed for the pseudo-random generators of both algorithms.
    pub seed: u64,
}

impl Default for HtmConfig {
    fn default() -> Self {
        Self {
            input_dimensions: vec![100],
            column_dimensions: vec![2048],
            potential_radius: 15,
            potential_pct: 0.75,
            global_inhibition: true,
            local_area_density: -1.0,
            num_active_columns_per_inh_area: 0.02 * 2048.0,
            max_inhibition_density: 0.5,
            stimulus_threshold: 5.0,
            syn_perm_inactive_dec: 0.008,
            syn_perm_active_inc: 0.05,
            syn_perm_connected: 0.1,
            syn_perm_below_stimulus_inc: 0.01,
            syn_perm_trim_threshold: 0.05,
            syn_perm_min: 0.0,
            syn_perm_max: 1.0,
            init_connected_pct: 0.5,
            min_pct_overlap_duty_cycles: 0.001,
            min_pct_active_duty_cycles: 0.001,
            duty_cycle_period: 1000,
            update_period: 50,
            max_boost: 10.0,
            wrap_around: true,
            cells_per_column: 32,
            activation_threshold: 10,
            min_threshold: 9,
            initial_permanence: 0.21,
            connected_permanence: 0.5,
            permanence_increment: 0.10,
            permanence_decrement: 0.10,
            predicted_segment_decrement: 0.1,
            max_new_synapse_count: 20,
            max_segments_per_cell: 225,
            max_synapses_per_segment: 225,
            seed: 42,
        }
    }
}

impl HtmConfig {
    /// Creates a config with default parameters for the given input and column dimensions.
    pub fn new(input_dimensions: Vec<usize>, column_dimensions: Vec<usize>) -> Self {
        Self {
            input_dimensions,
            column_dimensions,
            ..Default::default()
        }
    }

    /// Parses a JSON document. Fields that are absent keep their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: HtmConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Total number of input bits.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input_dimensions.iter().product()
    }

    /// Total number of columns.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.column_dimensions.iter().product()
    }

    /// Total number of cells.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.num_columns() * self.cells_per_column
    }

    /// The potential radius with -1 resolved to the size of the input space.
    #[inline]
    pub fn effective_potential_radius(&self) -> usize {
        if self.potential_radius < 0 {
            self.num_inputs()
        } else {
            self.potential_radius as usize
        }
    }

    /// Permanence bounds and steps used when updating proximal synapses.
    pub fn proximal_permanence_options(&self) -> SynapsePermanenceOptions {
        SynapsePermanenceOptions {
            inactive_decrement: self.syn_perm_inactive_dec,
            active_increment: self.syn_perm_active_inc,
            connected: self.syn_perm_connected,
            below_stimulus_increment: self.syn_perm_below_stimulus_inc,
            min: self.syn_perm_min,
            max: self.syn_perm_max,
            trim_threshold: self.syn_perm_trim_threshold,
        }
    }

    /// Checks every parameter and their mutual consistency.
    pub fn validate(&self) -> Result<()> {
        check_dimensions("input_dimensions", &self.input_dimensions)?;
        check_dimensions("column_dimensions", &self.column_dimensions)?;
        if self.input_dimensions.len() != self.column_dimensions.len() {
            return Err(HtmError::config(
                "column_dimensions",
                format!(
                    "{} column dimensions for {} input dimensions",
                    self.column_dimensions.len(),
                    self.input_dimensions.len()
                ),
            ));
        }
        if self.cells_per_column == 0 {
            return Err(HtmError::config("cells_per_column", "must be at least 1"));
        }
        if self.potential_radius < -1 {
            return Err(HtmError::config("potential_radius", "must be -1 or non-negative"));
        }
        check_unit("potential_pct", self.potential_pct)?;
        if self.potential_pct == 0.0 {
            return Err(HtmError::config("potential_pct", "must be greater than 0"));
        }
        if self.num_active_columns_per_inh_area <= 0.0
            && (self.local_area_density <= 0.0 || self.local_area_density > 0.5)
        {
            return Err(HtmError::config(
                "num_active_columns_per_inh_area",
                "either num_active_columns_per_inh_area or a local_area_density in (0, 0.5] is required",
            ));
        }
        if self.stimulus_threshold < 0.0 {
            return Err(HtmError::config("stimulus_threshold", "must be non-negative"));
        }
        check_unit("syn_perm_min", self.syn_perm_min)?;
        check_unit("syn_perm_max", self.syn_perm_max)?;
        if self.syn_perm_min >= self.syn_perm_max {
            return Err(HtmError::config("syn_perm_max", "must be greater than syn_perm_min"));
        }
        if self.syn_perm_connected < self.syn_perm_min || self.syn_perm_connected > self.syn_perm_max
        {
            return Err(HtmError::config(
                "syn_perm_connected",
                "must lie within [syn_perm_min, syn_perm_max]",
            ));
        }
        if self.syn_perm_below_stimulus_inc <= 0.0 {
            return Err(HtmError::config("syn_perm_below_stimulus_inc", "must be positive"));
        }
        check_unit("syn_perm_active_inc", self.syn_perm_active_inc)?;
        check_unit("syn_perm_inactive_dec", self.syn_perm_inactive_dec)?;
        check_unit("syn_perm_trim_threshold", self.syn_perm_trim_threshold)?;
        check_unit("init_connected_pct", self.init_connected_pct)?;
        check_unit("max_inhibition_density", self.max_inhibition_density)?;
        if self.duty_cycle_period == 0 {
            return Err(HtmError::config("duty_cycle_period", "must be at least 1"));
        }
        if self.update_period == 0 {
            return Err(HtmError::config("update_period", "must be at least 1"));
        }
        if self.max_boost < 1.0 {
            return Err(HtmError::config("max_boost", "must be at least 1.0"));
        }
        if self.activation_threshold == 0 {
            return Err(HtmError::config("activation_threshold", "must be at least 1"));
        }
        check_unit("initial_permanence", self.initial_permanence)?;
        check_unit("connected_permanence", self.connected_permanence)?;
        check_unit("permanence_increment", self.permanence_increment)?;
        check_unit("permanence_decrement", self.permanence_decrement)?;
        check_unit("predicted_segment_decrement", self.predicted_segment_decrement)?;
        if self.max_segments_per_cell == 0 {
            return Err(HtmError::config("max_segments_per_cell", "must be at least 1"));
        }
        if self.max_synapses_per_segment == 0 {
            return Err(HtmError::config("max_synapses_per_segment", "must be at least 1"));
        }
        Ok(())
    }
}

fn check_dimensions(name: &'static str, dims: &[usize]) -> Result<()> {
    if dims.is_empty() || dims.contains(&0) {
        return Err(HtmError::config(name, format!("invalid dimensions {:?}", dims)));
    }
    Ok(())
}

fn check_unit(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(HtmError::config(name, format!("{} is outside [0, 1]", value)));
    }
    Ok(())
}
