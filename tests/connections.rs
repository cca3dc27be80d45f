use htm_cla::core::sparse_matrix::ShardedDictionary;
use htm_cla::{CellId, ColumnId, Connections, HtmConfig, HtmError};
use proptest::prelude::*;

fn config(input_dimensions: Vec<usize>, column_dimensions: Vec<usize>, cells_per_column: usize) -> HtmConfig {
    HtmConfig {
        cells_per_column,
        ..HtmConfig::new(input_dimensions, column_dimensions)
    }
}

proptest! {
    #[test]
    fn init_creates_cells_per_column_for_every_column(
        dims in prop::collection::vec(1usize..6, 1..4),
        cells_per_column in 1usize..6,
    ) {
        let mut conn = Connections::new(config(dims.clone(), dims.clone(), cells_per_column)).unwrap();
        conn.init().unwrap();

        let num_columns: usize = dims.iter().product();
        prop_assert_eq!(conn.num_cells(), num_columns * cells_per_column);
        prop_assert_eq!(conn.cells().len(), num_columns * cells_per_column);
        prop_assert_eq!(conn.columns().count(), num_columns);
        for column in conn.columns() {
            prop_assert_eq!(column.num_cells(), cells_per_column);
        }
    }
}

#[test]
fn invalid_config_is_rejected_before_init() {
    let result = Connections::new(config(vec![10, 10], vec![20], 4));
    assert!(matches!(
        result,
        Err(HtmError::InvalidConfig { name: "column_dimensions", .. })
    ));

    let result = Connections::new(config(vec![10], vec![20], 0));
    assert!(matches!(
        result,
        Err(HtmError::InvalidConfig { name: "cells_per_column", .. })
    ));
}

#[test]
fn sharded_store_is_a_drop_in_replacement() {
    let config = config(vec![16], vec![12], 3);
    let mut plain = Connections::new(config.clone()).unwrap();
    let mut sharded =
        Connections::with_dictionary(config, Box::new(ShardedDictionary::new(4, 12))).unwrap();
    plain.init().unwrap();
    sharded.init().unwrap();

    for conn in [&mut plain, &mut sharded] {
        conn.create_potential_pool(ColumnId(7), &[1, 4, 9]).unwrap();
    }
    assert_eq!(
        plain.dense_potential(ColumnId(7)).unwrap(),
        sharded.dense_potential(ColumnId(7)).unwrap()
    );
    assert_eq!(
        plain.columns().map(|c| c.index).collect::<Vec<_>>(),
        sharded.columns().map(|c| c.index).collect::<Vec<_>>()
    );
    assert_eq!(
        plain.cells_of_column(ColumnId(11)).collect::<Vec<_>>(),
        vec![CellId(33), CellId(34), CellId(35)]
    );
}

#[test]
fn distal_synapses_are_tracked_across_segment_lifetimes() {
    let mut conn = Connections::new(config(vec![8], vec![8], 2)).unwrap();
    conn.init().unwrap();

    let seg = conn.create_distal_segment(CellId(3)).unwrap();
    conn.create_synapse(seg, CellId(0), 0.6).unwrap();
    conn.create_synapse(seg, CellId(1), 0.2).unwrap();
    assert_eq!(conn.num_synapses(), 2);
    assert_eq!(conn.column_for_segment(seg), Some(ColumnId(1)));

    let activity = conn.compute_activity(&[CellId(0), CellId(1)]);
    assert_eq!(activity.active_count(seg), 1);
    assert_eq!(activity.potential_count(seg), 2);

    conn.destroy_segment(seg).unwrap();
    assert_eq!(conn.num_synapses(), 0);
    assert_eq!(conn.num_segments(), 0);
    let activity = conn.compute_activity(&[CellId(0), CellId(1)]);
    assert!(activity.potential.iter().all(|&count| count == 0));
}
