//! Learns a short repeating sequence of symbols with a Spatial Pooler feeding a Temporal Memory.
//!
//! Every symbol is encoded as a contiguous block of active input bits. After a few epochs the
//! Temporal Memory predicts the next symbol, which shows up as fewer bursting columns and a high
//! share of correctly predicted active cells.
//!
//! Usage: `cargo run --release --example sequence_learning [config.json]`

use anyhow::{bail, Result};
use htm_cla::{CellId, Connections, HtmConfig, SpatialPooler, TemporalMemory};

const SEQUENCE: &str = "ABCDEFGH";
const BITS_PER_SYMBOL: usize = 16;
const EPOCHS: usize = 12;

/// Encodes a symbol as a block of `BITS_PER_SYMBOL` active bits.
fn encode(symbol: char, num_inputs: usize) -> Vec<bool> {
    let offset = (symbol as usize - 'A' as usize) * BITS_PER_SYMBOL;
    (0..num_inputs)
        .map(|bit| bit >= offset && bit < offset + BITS_PER_SYMBOL)
        .collect()
}

fn default_config() -> HtmConfig {
    HtmConfig {
        potential_radius: -1,
        potential_pct: 0.8,
        num_active_columns_per_inh_area: 10.0,
        stimulus_threshold: 2.0,
        cells_per_column: 8,
        activation_threshold: 6,
        min_threshold: 4,
        max_new_synapse_count: 10,
        ..HtmConfig::new(vec![SEQUENCE.len() * BITS_PER_SYMBOL], vec![256])
    }
}

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => HtmConfig::from_json_file(path)?,
        None => default_config(),
    };
    if config.num_inputs() < SEQUENCE.len() * BITS_PER_SYMBOL {
        bail!(
            "input space of {} bits is too small for {} symbols",
            config.num_inputs(),
            SEQUENCE.len()
        );
    }

    println!(
        "Initializing {} columns x {} cells...",
        config.num_columns(),
        config.cells_per_column
    );
    let mut conn = Connections::new(config.clone())?;
    let mut sp = SpatialPooler::new(&config);
    let mut tm = TemporalMemory::new(&config);
    sp.init(&mut conn)?;
    tm.init(&mut conn)?;

    let inputs: Vec<Vec<bool>> = SEQUENCE
        .chars()
        .map(|symbol| encode(symbol, config.num_inputs()))
        .collect();

    for epoch in 0..EPOCHS {
        let mut predicted: Vec<CellId> = Vec::new();
        let mut correct = 0;
        let mut total = 0;

        for input in &inputs {
            let columns = sp.compute_active(&mut conn, input, true)?;
            let cycle = tm.compute(&mut conn, &columns, true)?;

            correct += cycle
                .active_cells
                .iter()
                .filter(|&cell| predicted.binary_search(cell).is_ok())
                .count();
            total += cycle.active_cells.len();
            predicted = cycle.predictive_cells;
        }
        tm.reset();

        println!(
            "Epoch {:>2}: {:>5.1}% of active cells predicted, {} segments, {} synapses",
            epoch + 1,
            100.0 * correct as f64 / total.max(1) as f64,
            conn.num_segments(),
            conn.num_synapses()
        );
    }

    let stats = conn.statistics();
    println!(
        "Proximal synapses: {} connected of {}, avg permanence {:.3}",
        stats.connected_synapses, stats.synapses, stats.avg_permanence
    );
    Ok(())
}
