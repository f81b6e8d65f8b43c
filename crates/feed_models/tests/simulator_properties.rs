//! Property tests over the valid parameter space of every simulator.

use feed_models::prelude::*;
use proptest::prelude::*;

const CALLS: usize = 1_000;

fn run(simulator: &Simulator, start: f64, seed: u64) -> Vec<f64> {
    let mut rng = SimulationRng::from_seed(seed);
    let mut price = start;
    (0..CALLS)
        .map(|_| {
            price = simulator.generate_next_price(price, &mut rng);
            price
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn multiplicative_output_is_finite(
        sd in 0.0001f64..0.05,
        mean in -0.001f64..0.001,
        start in 1.0f64..1_000.0,
        seed in any::<u64>(),
    ) {
        let config = ModelConfig::RandomMultiplicative(RandomMultiplicativeConfig {
            standard_deviation: sd,
            mean,
        });
        let simulator = Simulator::from_config(&config).unwrap();
        prop_assert!(run(&simulator, start, seed).iter().all(|p| p.is_finite()));
    }

    #[test]
    fn mean_reverting_output_is_finite(
        mean in 1.0f64..500.0,
        kappa in 0.01f64..10.0,
        sigma in 0.0f64..50.0,
        dt in 0.0001f64..0.1,
        start in 1.0f64..1_000.0,
        seed in any::<u64>(),
    ) {
        let config = ModelConfig::MeanReverting(MeanRevertingConfig { mean, kappa, sigma, dt });
        let simulator = Simulator::from_config(&config).unwrap();
        prop_assert!(run(&simulator, start, seed).iter().all(|p| p.is_finite()));
    }

    #[test]
    fn additive_walk_output_is_finite(
        weights in prop::collection::vec(0.01f64..1.0, 1..8),
        deltas in prop::collection::vec(-5.0f64..5.0, 8),
        start in -100.0f64..100.0,
        seed in any::<u64>(),
    ) {
        let total: f64 = weights.iter().sum();
        let steps: Vec<WalkStep> = weights
            .iter()
            .zip(deltas.iter())
            .map(|(w, d)| WalkStep::new(w / total, *d))
            .collect();
        let config = ModelConfig::RandomAdditiveWalk(RandomAdditiveWalkConfig {
            steps: RandomWalkSteps::new(steps).unwrap(),
        });
        let simulator = Simulator::from_config(&config).unwrap();
        prop_assert!(run(&simulator, start, seed).iter().all(|p| p.is_finite()));
    }

    #[test]
    fn flat_never_moves(start in -1e6f64..1e6, seed in any::<u64>()) {
        let simulator = Simulator::from_config(&ModelConfig::Flat).unwrap();
        prop_assert!(run(&simulator, start, seed).iter().all(|p| *p == start));
    }

    #[test]
    fn normal_zero_sd_is_identity(mean in -1e6f64..1e6, seed in any::<u64>()) {
        let mut rng = SimulationRng::from_seed(seed);
        prop_assert_eq!(NormalDistribution::generate(mean, 0.0, &mut rng).unwrap(), mean);
    }
}

#[test]
fn walk_steps_reject_probability_sum_above_tolerance() {
    let result = RandomWalkSteps::new(vec![
        WalkStep::new(0.5, 0.01),
        WalkStep::new(0.56, -0.01),
    ]);
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

#[test]
fn walk_steps_reject_probability_out_of_range() {
    let above = RandomWalkSteps::new(vec![WalkStep::new(1.2, 0.01), WalkStep::new(-0.2, 0.0)]);
    assert!(above.is_err());

    let below = RandomWalkSteps::new(vec![WalkStep::new(-0.1, 0.01), WalkStep::new(1.1, 0.0)]);
    assert!(below.is_err());
}

#[test]
fn multiplicative_rejects_non_positive_sd() {
    for sd in [0.0, -0.01] {
        let config = ModelConfig::RandomMultiplicative(RandomMultiplicativeConfig {
            standard_deviation: sd,
            mean: 0.0,
        });
        assert!(Simulator::from_config(&config).is_err());
        assert!(RandomMultiplicativeProcess::new(sd, 0.0).is_err());
    }
}

#[test]
fn single_step_walk_adds_delta() {
    let steps = RandomWalkSteps::new(vec![WalkStep::new(1.0, 0.5)]).unwrap();
    let process = RandomAdditiveWalkProcess::new(steps);
    let mut rng = SimulationRng::from_seed(1);
    assert_eq!(process.generate_next_price(100.0, &mut rng), 100.5);
}

#[test]
fn mean_reverting_deterministic_convergence() {
    let process = MeanRevertingProcess::new(100.0, 0.5, 0.0, 0.1).unwrap();
    let mut rng = SimulationRng::from_seed(0);

    let mut price = 120.0;
    for _ in 0..10 {
        let next = process.generate_next_price(price, &mut rng);
        assert!(next < price);
        assert!(next > 100.0);
        price = next;
    }
}

#[test]
fn same_seed_reproduces_path() {
    let simulator = Simulator::from_config(&ModelConfig::default_for(ModelType::MeanReverting))
        .unwrap();
    assert_eq!(run(&simulator, 100.0, 42), run(&simulator, 100.0, 42));
}
