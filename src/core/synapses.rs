//! A `Synapse` is a single permanence-weighted connection owned by one dendrite segment.
//! Proximal synapses connect a column to an input bit; distal synapses connect a cell's segment
//! to a presynaptic cell.
//!
//! If the permanence is at or above the connected threshold, the synapse is "connected".
//! During learning, permanence is increased or decreased depending on whether the source was active.
//!
//! A `Pool` holds the synapses of one segment keyed by source index. The keys form the segment's
//! sparse row of potential connections; the pool also tracks which of those sources are currently
//! connected. That subset is updated on every permanence write, so it never needs a rescan, and it
//! always equals what [`Pool::recompute_connected`] would derive from the permanences.

use super::ids::{CellId, SynapseId};
use std::collections::{BTreeMap, BTreeSet};

/// The source a synapse receives activity from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynapseSource {
    /// A bit of the input vector (proximal synapses).
    Input(usize),
    /// A presynaptic cell (distal synapses).
    Cell(CellId),
}

impl SynapseSource {
    /// Flat index of the source in its own space.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            SynapseSource::Input(index) => index,
            SynapseSource::Cell(cell) => cell.index(),
        }
    }
}

/// A synapse connecting a segment to a source, holding a permanence value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Synapse {
    /// Creation ordinal; also the tie-break between equally weak synapses.
    pub id: SynapseId,

    /// Points to which input bit or presynaptic cell this synapse connects to.
    pub source: SynapseSource,

    /// Represents the strength of the connection.
    pub permanence: f64,
}

/// Options governing how proximal synapse permanence is adjusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynapsePermanenceOptions {
    pub inactive_decrement: f64,
    pub active_increment: f64,
    pub connected: f64,
    pub below_stimulus_increment: f64,
    pub min: f64,
    pub max: f64,
    pub trim_threshold: f64,
}

/// Synapses of one segment keyed by source index, plus the connected subset of those sources.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    synapses: BTreeMap<usize, Synapse>,
    connected: BTreeSet<usize>,
    connected_threshold: f64,
}

impl Pool {
    /// Creates an empty pool whose synapses count as connected at `connected_threshold`.
    pub fn new(connected_threshold: f64) -> Self {
        Self {
            synapses: BTreeMap::new(),
            connected: BTreeSet::new(),
            connected_threshold,
        }
    }

    /// The permanence at or above which a synapse of this pool is connected.
    #[inline]
    pub fn connected_threshold(&self) -> f64 {
        self.connected_threshold
    }

    /// Adds a synapse, clamping its permanence to `[0, 1]`. Returns the synapse it replaced, if any.
    pub fn insert(&mut self, mut synapse: Synapse) -> Option<Synapse> {
        let key = synapse.source.index();
        synapse.permanence = synapse.permanence.clamp(0.0, 1.0);
        self.track(key, synapse.permanence);
        self.synapses.insert(key, synapse)
    }

    /// Removes the synapse from `source`.
    pub fn remove(&mut self, source: usize) -> Option<Synapse> {
        self.connected.remove(&source);
        self.synapses.remove(&source)
    }

    /// Writes a permanence (clamped to `[0, 1]`) and updates the connected subset.
    /// Returns the stored value, or `None` if there is no synapse from `source`.
    pub fn set_permanence(&mut self, source: usize, permanence: f64) -> Option<f64> {
        let permanence = permanence.clamp(0.0, 1.0);
        let synapse = self.synapses.get_mut(&source)?;
        synapse.permanence = permanence;
        self.track(source, permanence);
        Some(permanence)
    }

    #[inline]
    fn track(&mut self, source: usize, permanence: f64) {
        if permanence >= self.connected_threshold {
            self.connected.insert(source);
        } else {
            self.connected.remove(&source);
        }
    }

    /// The synapse from `source`.
    #[inline]
    pub fn get(&self, source: usize) -> Option<&Synapse> {
        self.synapses.get(&source)
    }

    /// The permanence of the synapse from `source`.
    #[inline]
    pub fn permanence(&self, source: usize) -> Option<f64> {
        self.synapses.get(&source).map(|syn| syn.permanence)
    }

    #[inline]
    pub fn contains(&self, source: usize) -> bool {
        self.synapses.contains_key(&source)
    }

    /// Number of synapses in the pool.
    #[inline]
    pub fn len(&self) -> usize {
        self.synapses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.synapses.is_empty()
    }

    /// Synapses in ascending source order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Synapse> + '_ {
        self.synapses.values()
    }

    /// Source indices of all potential synapses, ascending.
    #[inline]
    pub fn potential(&self) -> impl Iterator<Item = usize> + '_ {
        self.synapses.keys().copied()
    }

    /// Source indices of connected synapses, ascending.
    #[inline]
    pub fn connected(&self) -> impl Iterator<Item = usize> + '_ {
        self.connected.iter().copied()
    }

    #[inline]
    pub fn num_connected(&self) -> usize {
        self.connected.len()
    }

    #[inline]
    pub fn is_connected(&self, source: usize) -> bool {
        self.connected.contains(&source)
    }

    /// The connected subset derived from scratch; always equal to [`Pool::connected`].
    pub fn recompute_connected(&self) -> BTreeSet<usize> {
        self.synapses
            .iter()
            .filter(|(_, syn)| syn.permanence >= self.connected_threshold)
            .map(|(&source, _)| source)
            .collect()
    }

    /// The weakest synapse; ties go to the oldest one.
    pub fn weakest(&self) -> Option<&Synapse> {
        self.synapses.values().min_by(|a, b| {
            a.permanence
                .total_cmp(&b.permanence)
                .then_with(|| a.id.cmp(&b.id))
        })
    }

    /// Dense permanence row of length `size`; sources outside the pool are 0.
    pub fn dense_permanences(&self, size: usize) -> Vec<f64> {
        let mut dense = vec![0.0; size];
        for (&source, syn) in &self.synapses {
            dense[source] = syn.permanence;
        }
        dense
    }

    /// Dense potential mask of length `size`.
    pub fn dense_potential(&self, size: usize) -> Vec<bool> {
        let mut dense = vec![false; size];
        for &source in self.synapses.keys() {
            dense[source] = true;
        }
        dense
    }

    /// Dense connected mask of length `size`.
    pub fn dense_connected(&self, size: usize) -> Vec<bool> {
        let mut dense = vec![false; size];
        for &source in &self.connected {
            dense[source] = true;
        }
        dense
    }

    /// Applies `update` to every permanence, in ascending source order, then stores the results.
    pub fn update_permanences(&mut self, mut update: impl FnMut(usize, f64) -> f64) {
        let threshold = self.connected_threshold;
        for (&source, syn) in self.synapses.iter_mut() {
            syn.permanence = update(source, syn.permanence).clamp(0.0, 1.0);
            if syn.permanence >= threshold {
                self.connected.insert(source);
            } else {
                self.connected.remove(&source);
            }
        }
    }

    /// Proximal permanence update:
    /// - if `raise_permanences` is true, first raise values until `stimulus_threshold` synapses are connected,
    /// - then trim values at or below the trim threshold to zero,
    /// - finally clamp values to `[options.min, options.max]`.
    pub fn update_column_permanences(
        &mut self,
        raise_permanences: bool,
        stimulus_threshold: f64,
        options: &SynapsePermanenceOptions,
    ) {
        if raise_permanences {
            self.raise_permanences_to_threshold(stimulus_threshold, options);
        }

        self.update_permanences(|_, permanence| {
            if permanence <= options.trim_threshold {
                0.0
            } else {
                permanence.clamp(options.min, options.max)
            }
        });
    }

    /// Raises every permanence by `options.below_stimulus_increment` until at least
    /// `stimulus_threshold` synapses are connected. A pool with fewer synapses than the threshold
    /// is left clamped but otherwise untouched.
    pub fn raise_permanences_to_threshold(
        &mut self,
        stimulus_threshold: f64,
        options: &SynapsePermanenceOptions,
    ) {
        self.update_permanences(|_, permanence| permanence.clamp(options.min, options.max));

        if (self.len() as f64) < stimulus_threshold {
            return;
        }

        while (self.num_connected() as f64) < stimulus_threshold {
            self.update_permanences(|_, permanence| {
                (permanence + options.below_stimulus_increment).min(options.max)
            });
        }
    }
}
