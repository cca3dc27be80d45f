use htm_cla::{
    ColumnId, Connections, Execution, HomeostaticPlasticityController, HtmConfig, SpatialPooler,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn pooler(config: HtmConfig, execution: Execution) -> (SpatialPooler, Connections) {
    let mut sp = SpatialPooler::new(&config).with_execution(execution);
    let mut conn = Connections::new(config).unwrap();
    sp.init(&mut conn).unwrap();
    (sp, conn)
}

fn random_input(rng: &mut StdRng, size: usize, density: f64) -> Vec<bool> {
    (0..size).map(|_| rng.random::<f64>() < density).collect()
}

#[test]
fn global_inhibition_picks_highest_overlaps_then_lowest_index() {
    let config = HtmConfig {
        potential_radius: -1,
        potential_pct: 1.0,
        global_inhibition: true,
        num_active_columns_per_inh_area: 3.0,
        stimulus_threshold: 0.0,
        ..HtmConfig::new(vec![9], vec![5])
    };
    let (mut sp, mut conn) = pooler(config, Execution::Sequential);

    let active = sp.compute_active(&mut conn, &[true; 9], false).unwrap();
    assert_eq!(active.len(), 3);

    let overlaps = sp.boosted_overlaps.clone();
    let mut expected: Vec<usize> = (0..5).collect();
    expected.sort_by(|&a, &b| overlaps[b].total_cmp(&overlaps[a]).then(a.cmp(&b)));
    expected.truncate(3);
    expected.sort_unstable();
    assert_eq!(active, expected);

    for col in 0..5 {
        let connected = conn.dense_connected(ColumnId(col)).unwrap();
        assert_eq!(overlaps[col], connected.iter().filter(|&&c| c).count() as f64);
    }
}

#[test]
fn inference_is_idempotent() {
    let config = HtmConfig {
        num_active_columns_per_inh_area: 5.0,
        ..HtmConfig::new(vec![64], vec![32])
    };
    let (mut sp, mut conn) = pooler(config, Execution::Sequential);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        let input = random_input(&mut rng, 64, 0.3);
        sp.compute_active(&mut conn, &input, true).unwrap();
    }

    let input = random_input(&mut rng, 64, 0.3);
    let permanences = conn.dense_permanences(ColumnId(3)).unwrap();
    let first = sp.compute_active(&mut conn, &input, false).unwrap();
    let second = sp.compute_active(&mut conn, &input, false).unwrap();
    assert_eq!(first, second);
    assert_eq!(conn.dense_permanences(ColumnId(3)).unwrap(), permanences);
}

#[test]
fn parallel_execution_matches_sequential() {
    let config = HtmConfig {
        num_active_columns_per_inh_area: 6.0,
        stimulus_threshold: 1.0,
        update_period: 5,
        ..HtmConfig::new(vec![100], vec![64])
    };
    let (mut seq, mut seq_conn) = pooler(config.clone(), Execution::Sequential);
    let (mut par, mut par_conn) = pooler(config, Execution::Parallel);

    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..25 {
        let input = random_input(&mut rng, 100, 0.2);
        let a = seq.compute_active(&mut seq_conn, &input, true).unwrap();
        let b = par.compute_active(&mut par_conn, &input, true).unwrap();
        assert_eq!(a, b);
    }
    assert_eq!(seq.boost_factors, par.boost_factors);
    assert_eq!(seq.inhibition_radius, par.inhibition_radius);
    for col in 0..64 {
        assert_eq!(
            seq_conn.dense_permanences(ColumnId(col)).unwrap(),
            par_conn.dense_permanences(ColumnId(col)).unwrap()
        );
    }
}

#[test]
fn all_zero_input_still_activates_n_columns() {
    let config = HtmConfig {
        num_active_columns_per_inh_area: 7.0,
        ..HtmConfig::new(vec![64], vec![40])
    };
    for execution in [Execution::Sequential, Execution::Parallel] {
        let (mut sp, mut conn) = pooler(config.clone(), execution);
        for learn in [false, true, false, true] {
            for _ in 0..5 {
                let active = sp.compute_active(&mut conn, &[false; 64], learn).unwrap();
                assert_eq!(active.len(), 7);
                assert!(active.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}

/// Every overlap stays below the stimulus threshold, so winners are decided by boost factor and
/// index alone and only boosting can change them.
fn boosted_only_config() -> HtmConfig {
    HtmConfig {
        potential_radius: -1,
        potential_pct: 1.0,
        num_active_columns_per_inh_area: 2.0,
        stimulus_threshold: 16.0,
        duty_cycle_period: 10,
        update_period: 1,
        ..HtmConfig::new(vec![16], vec![8])
    }
}

fn block_input(start: usize) -> Vec<bool> {
    (0..16).map(|bit| (start..start + 4).contains(&bit)).collect()
}

#[test]
fn boosting_changes_factors_without_homeostasis() {
    let (mut sp, mut conn) = pooler(boosted_only_config(), Execution::Sequential);
    let inputs = [block_input(0), block_input(8)];
    for step in 0..6 {
        sp.compute_active(&mut conn, &inputs[step % 2], true).unwrap();
    }
    assert!(sp.is_boosting_enabled());
    assert!(sp.boost_factors.iter().any(|&boost| boost > 1.0));
    assert!(!sp.is_stable());
}

#[test]
fn boost_factors_freeze_once_homeostasis_reports_stable() {
    let config = boosted_only_config();
    let mut sp = SpatialPooler::new(&config)
        .with_homeostasis(HomeostaticPlasticityController::new(6, 2, 1.0));
    let mut conn = Connections::new(config).unwrap();
    sp.init(&mut conn).unwrap();

    let inputs = [block_input(0), block_input(8)];
    let mut step = 0;
    while !sp.is_stable() {
        assert!(step < 100, "pooler never became stable");
        sp.compute_active(&mut conn, &inputs[step % 2], true).unwrap();
        step += 1;
    }
    assert!(!sp.is_boosting_enabled());
    assert!(sp.homeostasis().is_some_and(|h| !h.is_newborn()));
    assert_eq!(sp.homeostasis().map(|h| h.num_inputs()), Some(2));

    let boost_factors = sp.boost_factors.clone();
    assert!(boost_factors.iter().all(|&boost| boost == 1.0));
    for _ in 0..20 {
        let active = sp.compute_active(&mut conn, &inputs[step % 2], true).unwrap();
        step += 1;
        assert_eq!(active, vec![0, 1]);
        assert_eq!(sp.boost_factors, boost_factors);
        assert!(sp.min_active_duty_cycles.iter().all(|&min| min == 0.0));
    }
    assert!(sp.is_stable());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn global_inhibition_activates_exactly_n_columns(
        input in prop::collection::vec(any::<bool>(), 16),
        learn in any::<bool>(),
    ) {
        let config = HtmConfig {
            num_active_columns_per_inh_area: 4.0,
            stimulus_threshold: 1.0,
            ..HtmConfig::new(vec![16], vec![12])
        };
        let (mut sp, mut conn) = pooler(config, Execution::Sequential);
        let active = sp.compute_active(&mut conn, &input, learn).unwrap();
        prop_assert_eq!(active.len(), 4);
        prop_assert!(active.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn proximal_permanences_stay_in_unit_range(
        inputs in prop::collection::vec(prop::collection::vec(any::<bool>(), 24), 1..15),
    ) {
        let config = HtmConfig {
            num_active_columns_per_inh_area: 3.0,
            stimulus_threshold: 1.0,
            syn_perm_active_inc: 0.3,
            syn_perm_inactive_dec: 0.3,
            ..HtmConfig::new(vec![24], vec![10])
        };
        let (mut sp, mut conn) = pooler(config, Execution::Sequential);
        for input in &inputs {
            sp.compute_active(&mut conn, input, true).unwrap();
        }
        for col in 0..10 {
            for permanence in conn.dense_permanences(ColumnId(col)).unwrap() {
                prop_assert!((0.0..=1.0).contains(&permanence));
            }
            let pool = conn.column(ColumnId(col)).unwrap().pool();
            prop_assert_eq!(pool.connected().collect::<Vec<_>>(), pool.recompute_connected().into_iter().collect::<Vec<_>>());
        }
    }
}
