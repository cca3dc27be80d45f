use htm_cla::{CellId, Connections, HtmConfig, SegmentId, SpatialPooler, TemporalMemory};
use htm_cla::core::segment::Dendrite;
use proptest::prelude::*;

fn config() -> HtmConfig {
    HtmConfig {
        cells_per_column: 4,
        activation_threshold: 3,
        min_threshold: 2,
        initial_permanence: 0.6,
        connected_permanence: 0.5,
        max_new_synapse_count: 4,
        ..HtmConfig::new(vec![32], vec![32])
    }
}

fn memory(config: HtmConfig) -> (TemporalMemory, Connections) {
    let mut tm = TemporalMemory::new(&config);
    let mut conn = Connections::new(config).unwrap();
    tm.init(&mut conn).unwrap();
    (tm, conn)
}

#[test]
fn repeated_column_set_is_recalled_from_predictions() {
    let (mut tm, mut conn) = memory(config());
    let columns = [2, 9, 17, 25];

    let first = tm.compute(&mut conn, &columns, true).unwrap();
    assert_eq!(first.active_cells.len(), 16);

    // Learns the transition from the set to itself.
    let second = tm.compute(&mut conn, &columns, true).unwrap();
    assert_eq!(second.predictive_cells.len(), 4);

    let third = tm.compute(&mut conn, &columns, true).unwrap();
    assert!(!third.active_cells.is_empty());
    assert!(third
        .active_cells
        .iter()
        .all(|cell| second.predictive_cells.contains(cell)));
    assert_eq!(third.winner_cells, third.active_cells);
}

#[test]
fn learned_sequence_is_predicted_one_step_ahead() {
    let (mut tm, mut conn) = memory(config());
    let sequence = [[0, 1, 2, 3], [8, 9, 10, 11], [20, 21, 22, 23]];

    for _ in 0..3 {
        for columns in &sequence {
            tm.compute(&mut conn, columns, true).unwrap();
        }
        tm.reset();
    }

    tm.compute(&mut conn, &sequence[0], false).unwrap();
    let cycle = tm.compute(&mut conn, &sequence[1], false).unwrap();
    assert_eq!(cycle.active_cells.len(), 4);
    let predicted_columns: Vec<usize> = cycle
        .predictive_cells
        .iter()
        .map(|cell| cell.column(4).index())
        .collect();
    assert_eq!(predicted_columns, vec![20, 21, 22, 23]);
}

#[test]
fn inference_leaves_connections_untouched() {
    let (mut tm, mut conn) = memory(config());
    for columns in [[0, 1, 2, 3], [4, 5, 6, 7]] {
        tm.compute(&mut conn, &columns, true).unwrap();
    }
    tm.reset();

    let segments = conn.num_segments();
    let synapses = conn.num_synapses();
    let iteration = conn.iteration();

    let first = tm.compute(&mut conn, &[0, 1, 2, 3], false).unwrap();
    tm.reset();
    let second = tm.compute(&mut conn, &[0, 1, 2, 3], false).unwrap();

    // Bursting winners are drawn at random; everything else is a function of the input.
    assert_eq!(first.active_cells, second.active_cells);
    assert_eq!(first.predictive_cells, second.predictive_cells);
    assert_eq!(first.active_segments, second.active_segments);
    assert_eq!(first.matching_segments, second.matching_segments);
    assert_eq!(conn.num_segments(), segments);
    assert_eq!(conn.num_synapses(), synapses);
    assert_eq!(conn.iteration(), iteration);
}

#[test]
fn spatial_pooler_feeds_temporal_memory() {
    let config = HtmConfig {
        num_active_columns_per_inh_area: 4.0,
        stimulus_threshold: 1.0,
        ..config()
    };
    let mut sp = SpatialPooler::new(&config);
    let (mut tm, mut conn) = memory(config);
    sp.init(&mut conn).unwrap();

    let input: Vec<bool> = (0..32).map(|bit| bit % 3 == 0).collect();
    let columns = sp.compute_active(&mut conn, &input, true).unwrap();
    let cycle = tm.compute(&mut conn, &columns, true).unwrap();
    assert_eq!(cycle.active_cells.len(), columns.len() * 4);
    assert_eq!(cycle.winner_cells.len(), columns.len());
}

fn live_segments(conn: &Connections) -> impl Iterator<Item = SegmentId> + '_ {
    (0..conn.segment_capacity())
        .map(SegmentId)
        .filter(|&id| conn.segment(id).is_some())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn capacity_and_permanence_bounds_hold(
        steps in prop::collection::vec(prop::collection::btree_set(0usize..16, 1..6), 1..30),
    ) {
        let config = HtmConfig {
            cells_per_column: 2,
            activation_threshold: 2,
            min_threshold: 1,
            initial_permanence: 0.55,
            max_new_synapse_count: 3,
            max_segments_per_cell: 2,
            max_synapses_per_segment: 4,
            predicted_segment_decrement: 0.2,
            ..HtmConfig::new(vec![16], vec![16])
        };
        let (mut tm, mut conn) = memory(config);

        for columns in &steps {
            let columns: Vec<usize> = columns.iter().copied().collect();
            tm.compute(&mut conn, &columns, true).unwrap();

            for cell in 0..conn.num_cells() {
                prop_assert!(conn.num_segments_for_cell(CellId(cell)) <= 2);
            }
            for id in live_segments(&conn) {
                let seg = conn.segment(id).unwrap();
                prop_assert!(seg.pool().len() <= 4);
                for syn in seg.pool().iter() {
                    prop_assert!((0.0..=1.0).contains(&syn.permanence));
                }
            }
            let total: usize = live_segments(&conn).map(|id| conn.segment(id).unwrap().pool().len()).sum();
            prop_assert_eq!(total, conn.num_synapses());
        }
    }
}
