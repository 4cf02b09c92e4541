//! End-to-end solver scenarios over small hand-verified models.

use imdp_algo::{Problem, RobustValueIteration, StrategyCache};
use imdp_core::{
    DenseIntervalMatrix, Direction, FactoredImdp, ImdpError, IntervalMdp, Marginal, Property,
    Rational64, SatisfactionMode, SparseIntervalMatrix, Specification, StationaryStrategy,
    Strategy, StrategyMode,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rat(n: i64, d: i64) -> Rational64 {
    Rational64::new(n, d)
}

/// Three-state interval Markov chain: states 0 and 1 lead into the
/// absorbing state 2.
fn three_state_chain() -> IntervalMdp<DenseIntervalMatrix<f64>> {
    let lower = vec![0.0, 0.1, 0.2, 0.5, 0.3, 0.1, 0.0, 0.0, 1.0];
    let upper = vec![0.5, 0.6, 0.7, 0.7, 0.5, 0.3, 0.0, 0.0, 1.0];
    let matrix = DenseIntervalMatrix::try_new(3, 3, lower, upper).unwrap();
    IntervalMdp::chain(matrix).unwrap()
}

/// Four-state IMDP: states 0 and 1 choose between two actions leading
/// to the target (2) and trap (3) absorbing states.
///
/// Pessimistic worst cases per column, hand-computed:
///   state 0, action 0: 0.7 to target    state 0, action 1: 0.5
///   state 1, action 0: 0.4 to target    state 1, action 1: 0.55
/// so Pessimistic/Maximize settles on actions [0, 1].
fn decision_triplets() -> Vec<(usize, usize, f64, f64)> {
    vec![
        // state 0, action 0 (column 0)
        (2, 0, 0.7, 0.9),
        (3, 0, 0.1, 0.3),
        // state 0, action 1 (column 1)
        (2, 1, 0.5, 1.0),
        (3, 1, 0.0, 0.5),
        // state 1, action 0 (column 2)
        (2, 2, 0.2, 0.6),
        (3, 2, 0.2, 0.6),
        // state 1, action 1 (column 3)
        (2, 3, 0.55, 0.95),
        (3, 3, 0.05, 0.45),
        // absorbing target and trap
        (2, 4, 1.0, 1.0),
        (3, 5, 1.0, 1.0),
    ]
}

fn decision_imdp() -> IntervalMdp<SparseIntervalMatrix<f64>> {
    let matrix = SparseIntervalMatrix::try_from_triplets(4, 6, &decision_triplets()).unwrap();
    IntervalMdp::new(matrix, vec![0, 2, 4, 5, 6]).unwrap()
}

fn reach_spec(
    horizon: Option<usize>,
    satisfaction: SatisfactionMode,
) -> Specification<f64> {
    let property = match horizon {
        Some(horizon) => Property::FiniteTimeReachability {
            reach: vec![2],
            horizon,
        },
        None => Property::InfiniteTimeReachability {
            reach: vec![2],
            epsilon: 1e-6,
        },
    };
    Specification::new(property, satisfaction, StrategyMode::Maximize)
}

#[test]
fn chain_reachability_is_monotone_over_ten_steps() {
    let model = three_state_chain();
    let spec = Specification::new(
        Property::FiniteTimeReachability {
            reach: vec![2],
            horizon: 10,
        },
        SatisfactionMode::Pessimistic,
        StrategyMode::Maximize,
    );
    let problem = Problem::new(model, spec);

    let mut history: Vec<Vec<f64>> = Vec::new();
    let mut callback = |v: &[f64], _k: usize| -> anyhow::Result<()> {
        history.push(v.to_vec());
        Ok(())
    };
    let solution = RobustValueIteration::new()
        .solve_with(&problem, StrategyCache::None, Some(&mut callback))
        .unwrap();

    assert_eq!(solution.iterations, 10);
    assert_eq!(solution.value_function[2], 1.0);
    assert_eq!(history.len(), 10);
    for window in history.windows(2) {
        for (earlier, later) in window[0].iter().zip(window[1].iter()) {
            assert!(later >= earlier);
        }
    }
    // In particular the last step did not regress.
    let v9 = &history[8];
    let v10 = &history[9];
    for (a, b) in v9.iter().zip(v10.iter()) {
        assert!(b >= a);
    }
}

#[test]
fn imdp_pessimistic_maximize_selects_the_robust_actions() {
    let problem = Problem::new(
        decision_imdp(),
        reach_spec(None, SatisfactionMode::Pessimistic),
    );
    let solution = RobustValueIteration::new().synthesize(&problem).unwrap();

    assert!(solution.converged);
    let v = &solution.value_function;
    assert!((v[0] - 0.7).abs() < 1e-9);
    assert!((v[1] - 0.55).abs() < 1e-9);
    assert_eq!(v[2], 1.0);
    assert_eq!(v[3], 0.0);

    match solution.strategy {
        Some(Strategy::Stationary(s)) => assert_eq!(s.actions, vec![0, 1, 0, 0]),
        other => panic!("expected a stationary strategy, got {other:?}"),
    }
}

#[test]
fn optimistic_dominates_pessimistic() {
    for horizon in [Some(4), None] {
        let pess = RobustValueIteration::new()
            .verify(&Problem::new(
                decision_imdp(),
                reach_spec(horizon, SatisfactionMode::Pessimistic),
            ))
            .unwrap();
        let opt = RobustValueIteration::new()
            .verify(&Problem::new(
                decision_imdp(),
                reach_spec(horizon, SatisfactionMode::Optimistic),
            ))
            .unwrap();
        for (p, o) in pess
            .value_function
            .iter()
            .zip(opt.value_function.iter())
        {
            assert!(o >= p);
        }
    }
}

#[test]
fn synthesized_strategy_evaluates_to_the_same_values() {
    let problem = Problem::new(
        decision_imdp(),
        reach_spec(None, SatisfactionMode::Pessimistic),
    );
    let vi = RobustValueIteration::new();
    let synthesized = vi.synthesize(&problem).unwrap();
    let strategy = synthesized.strategy.clone().unwrap();

    let evaluated = vi.evaluate(&problem, strategy).unwrap();
    // This model hits its fixed point exactly, so the two runs agree
    // bitwise.
    assert_eq!(synthesized.value_function, evaluated.value_function);
}

#[test]
fn discounted_reward_synthesis_is_constant_over_the_horizon() {
    // Two states, two actions each, all point distributions: stay or
    // move to the other state. Rewards favor state 0, so the optimal
    // decision at every step is stay in 0, move from 1.
    let triplets = vec![
        (0, 0, 1.0, 1.0), // state 0 stays
        (1, 1, 1.0, 1.0), // state 0 moves
        (1, 2, 1.0, 1.0), // state 1 stays
        (0, 3, 1.0, 1.0), // state 1 moves
    ];
    let matrix = SparseIntervalMatrix::try_from_triplets(2, 4, &triplets).unwrap();
    let model = IntervalMdp::new(matrix, vec![0, 2, 4]).unwrap();
    let spec = Specification::new(
        Property::FiniteTimeReward {
            reward: vec![2.0, 1.0],
            discount: 0.9,
            horizon: 10,
        },
        SatisfactionMode::Pessimistic,
        StrategyMode::Maximize,
    );
    let solution = RobustValueIteration::new()
        .synthesize(&Problem::new(model, spec))
        .unwrap();

    // v0 follows v0 <- 2 + 0.9 v0 from v0 = 2; v1 trails it by one.
    let expected_v0 = 20.0 * (1.0 - 0.9f64.powi(11));
    assert!((solution.value_function[0] - expected_v0).abs() < 1e-9);
    assert!((solution.value_function[1] - (expected_v0 - 1.0)).abs() < 1e-9);

    match solution.strategy {
        Some(Strategy::TimeVarying(tv)) => {
            assert_eq!(tv.horizon(), 10);
            for step in &tv.steps {
                assert_eq!(step, &vec![0, 1]);
            }
        }
        other => panic!("expected a time-varying strategy, got {other:?}"),
    }
}

#[test]
fn factored_singleton_marginals_match_the_joint_chain() {
    // Point marginals p = (1/4, 3/4), q = (1/2, 1/3, 1/6). With zero
    // gaps the factored contraction and the Kronecker-product joint
    // chain describe the same (single-distribution) ambiguity set, so
    // the value functions agree exactly.
    let p = [rat(1, 4), rat(3, 4)];
    let q = [rat(1, 2), rat(1, 3), rat(1, 6)];

    let a = DenseIntervalMatrix::try_new(2, 1, p.to_vec(), p.to_vec()).unwrap();
    let b = DenseIntervalMatrix::try_new(3, 1, q.to_vec(), q.to_vec()).unwrap();
    let factored = FactoredImdp::new(
        vec![2, 3],
        vec![],
        vec![
            Marginal::try_new(a, vec![], vec![]).unwrap(),
            Marginal::try_new(b, vec![], vec![]).unwrap(),
        ],
    )
    .unwrap();

    // Joint chain over the 6 flat states; every source has the same
    // product distribution.
    let mut triplets = Vec::new();
    for col in 0..6 {
        for (t1, &pp) in p.iter().enumerate() {
            for (t2, &qq) in q.iter().enumerate() {
                let row = t1 * 3 + t2;
                triplets.push((row, col, pp * qq, pp * qq));
            }
        }
    }
    let joint_matrix =
        SparseIntervalMatrix::try_from_triplets(6, 6, &triplets).unwrap();
    let joint = IntervalMdp::chain(joint_matrix).unwrap();

    for satisfaction in [SatisfactionMode::Pessimistic, SatisfactionMode::Optimistic] {
        let property = Property::FiniteTimeReachability {
            reach: vec![5],
            horizon: 3,
        };
        let spec = Specification::new(property, satisfaction, StrategyMode::Maximize);

        let from_factored = RobustValueIteration::new()
            .verify(&Problem::new(factored.clone(), spec.clone()))
            .unwrap();
        let from_joint = RobustValueIteration::new()
            .verify(&Problem::new(joint.clone(), spec))
            .unwrap();

        assert_eq!(from_factored.value_function, from_joint.value_function);
    }
}

#[test]
fn factored_gapped_marginals_match_hand_computed_contraction() {
    // Marginal A: lower (1/10, 3/10), upper (6/10, 7/10); marginal B:
    // lower (1/5, 1/10, 1/5), upper (2/5, 1/2, 3/5); V = 3*t1 + t2.
    // One upper contraction gives 7/2, one lower contraction gives 2.
    let a = DenseIntervalMatrix::try_new(
        2,
        1,
        vec![rat(1, 10), rat(3, 10)],
        vec![rat(6, 10), rat(7, 10)],
    )
    .unwrap();
    let b = DenseIntervalMatrix::try_new(
        3,
        1,
        vec![rat(1, 5), rat(1, 10), rat(1, 5)],
        vec![rat(2, 5), rat(1, 2), rat(3, 5)],
    )
    .unwrap();
    let model = FactoredImdp::new(
        vec![2, 3],
        vec![],
        vec![
            Marginal::try_new(a, vec![], vec![]).unwrap(),
            Marginal::try_new(b, vec![], vec![]).unwrap(),
        ],
    )
    .unwrap();

    use imdp_algo::RobustBellman;
    let v_prev: Vec<Rational64> = (0..6).map(|i| rat(i, 1)).collect();
    let mut v_cur = vec![rat(0, 1); 6];
    let mut chosen = vec![0usize; 6];

    model
        .step(
            &v_prev,
            &mut v_cur,
            &mut chosen,
            Direction::Upper,
            StrategyMode::Maximize,
            None,
        )
        .unwrap();
    assert!(v_cur.iter().all(|&v| v == rat(7, 2)));

    model
        .step(
            &v_prev,
            &mut v_cur,
            &mut chosen,
            Direction::Lower,
            StrategyMode::Maximize,
            None,
        )
        .unwrap();
    assert!(v_cur.iter().all(|&v| v == rat(2, 1)));
}

#[test]
fn safety_and_exit_time_fixed_points() {
    // Safety against avoid = {1} on the three-state chain: state 2 is
    // absorbing and safe (value 1), state 1 is unsafe (value 0), and
    // state 0 satisfies v0 = 0.2 v0 + 0.2 under the worst case, so 1/4.
    let problem = Problem::new(
        three_state_chain(),
        Specification::new(
            Property::InfiniteTimeSafety {
                avoid: vec![1],
                epsilon: 1e-9,
            },
            SatisfactionMode::Pessimistic,
            StrategyMode::Maximize,
        ),
    );
    let solution = RobustValueIteration::new().verify(&problem).unwrap();
    assert!(solution.converged);
    assert!((solution.value_function[0] - 0.25).abs() < 1e-6);
    assert_eq!(solution.value_function[1], 0.0);
    assert_eq!(solution.value_function[2], 1.0);

    // Deterministic walk 0 -> 1 -> 2 with terminal {2}: exit times are
    // exactly (2, 1, 0).
    let triplets = vec![
        (1, 0, 1.0, 1.0),
        (2, 1, 1.0, 1.0),
        (2, 2, 1.0, 1.0),
    ];
    let matrix = SparseIntervalMatrix::try_from_triplets(3, 3, &triplets).unwrap();
    let walk = IntervalMdp::chain(matrix).unwrap();
    let problem = Problem::new(
        walk,
        Specification::new(
            Property::ExpectedExitTime {
                terminal: vec![2],
                epsilon: 1e-9,
            },
            SatisfactionMode::Pessimistic,
            StrategyMode::Maximize,
        ),
    );
    let solution = RobustValueIteration::new().verify(&problem).unwrap();
    assert!(solution.converged);
    assert_eq!(solution.value_function, vec![2.0, 1.0, 0.0]);
}

#[test]
fn results_are_bitwise_deterministic_across_thread_pools() {
    let solve = || {
        let problem = Problem::new(
            decision_imdp(),
            reach_spec(None, SatisfactionMode::Pessimistic),
        );
        RobustValueIteration::new().synthesize(&problem).unwrap()
    };

    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(solve);
    let multi = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .unwrap()
        .install(solve);

    let single_bits: Vec<u64> = single.value_function.iter().map(|v| v.to_bits()).collect();
    let multi_bits: Vec<u64> = multi.value_function.iter().map(|v| v.to_bits()).collect();
    assert_eq!(single_bits, multi_bits);
    assert_eq!(single.strategy, multi.strategy);
}

#[test]
fn random_feasible_distributions_never_beat_the_kernel() {
    use imdp_algo::{extremal_expectation, SortWorkspace};
    use imdp_core::IntervalMatrix;

    let lower = vec![0.05, 0.0, 0.3, 0.1, 0.0];
    let upper = vec![0.4, 0.35, 0.8, 0.5, 0.25];
    let matrix = DenseIntervalMatrix::try_new(5, 1, lower.clone(), upper.clone()).unwrap();
    let values = [0.9, 0.2, 0.4, 0.7, 0.55];

    let mut ws = SortWorkspace::new();
    let mut assigned = Vec::new();
    let sup = extremal_expectation(
        &matrix.column(0),
        matrix.sum_lower(0),
        None,
        &values,
        Direction::Upper,
        &mut ws,
        &mut assigned,
    );
    let inf = extremal_expectation(
        &matrix.column(0),
        matrix.sum_lower(0),
        None,
        &values,
        Direction::Lower,
        &mut ws,
        &mut assigned,
    );
    assert!(inf <= sup);

    let slo: f64 = lower.iter().sum();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        // Waterfill the leftover mass along a random priority order to
        // get a feasible sample.
        let mut gamma = lower.clone();
        let mut remaining = 1.0 - slo;
        let mut order: Vec<usize> = (0..gamma.len()).collect();
        for i in (1..order.len()).rev() {
            let j = rng.gen_range(0..=i);
            order.swap(i, j);
        }
        for &i in &order {
            let delta = (upper[i] - lower[i]).min(remaining);
            gamma[i] += delta;
            remaining -= delta;
        }
        assert!(remaining.abs() < 1e-12);

        let expectation: f64 = gamma.iter().zip(values.iter()).map(|(g, v)| g * v).sum();
        assert!(expectation <= sup + 1e-9);
        assert!(expectation >= inf - 1e-9);
    }
}

#[test]
fn tiny_epsilon_hits_the_iteration_cap() {
    let problem = Problem::new(
        three_state_chain(),
        Specification::new(
            Property::InfiniteTimeReachability {
                reach: vec![2],
                epsilon: 1e-300,
            },
            SatisfactionMode::Pessimistic,
            StrategyMode::Maximize,
        ),
    );
    let solution = RobustValueIteration::new()
        .with_max_iterations(50)
        .verify(&problem)
        .unwrap();
    assert!(!solution.converged);
    assert!(matches!(
        solution.ensure_converged(),
        Err(ImdpError::NotConverged { .. })
    ));
}

#[test]
fn evaluating_a_fixed_suboptimal_strategy_loses_value() {
    let problem = Problem::new(
        decision_imdp(),
        reach_spec(None, SatisfactionMode::Pessimistic),
    );
    let vi = RobustValueIteration::new();
    let best = vi.verify(&problem).unwrap();
    let worst = vi
        .evaluate(
            &problem,
            Strategy::Stationary(StationaryStrategy::new(vec![1, 0, 0, 0])),
        )
        .unwrap();
    assert!(worst.value_function[0] < best.value_function[0]);
    assert!(worst.value_function[1] < best.value_function[1]);
}
