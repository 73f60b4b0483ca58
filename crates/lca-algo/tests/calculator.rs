mod common;

use common::*;
use lca_algo::{
    CalculationConfig, Calculator, ProviderStrategy, ResultCache, ResultKind,
};
use lca_core::{FlowId, FlowIndex, LcaError, LinearModel, Matrix, SolverKind, TechIndex};

fn uncompressed() -> CalculationConfig {
    CalculationConfig {
        compress: false,
        ..Default::default()
    }
}

#[test]
fn test_two_entry_chain_all_backends() {
    for sparse in [false, true] {
        for kind in [SolverKind::Faer, SolverKind::Sparse] {
            let calculator = Calculator::new(two_entry_chain(sparse), kind.build_solver());
            let result = calculator.calculate_simple().unwrap();

            assert_eq!(result.kind(), ResultKind::Simple);
            assert_close(result.scaling_vector()[0], 10.0);
            assert_close(result.scaling_vector()[1], 5.0);
            assert_close(result.total_flow_vector()[0], 10.0);
            assert_close(result.total_flow_vector()[1], 10.0);
            assert_close(result.scaling_factor(&tech(2)), 5.0);
            assert_close(result.total_flow(&CO2), 10.0);
            assert_close(result.total_flow(&SO2), 10.0);
            assert_eq!(result.loop_factor(), 1.0);
        }
    }
}

#[test]
fn test_singular_model_fails_in_every_mode() {
    let mut techs = TechIndex::new(tech(1), 1.0);
    techs.put(tech(2));
    let mut flows = FlowIndex::new();
    flows.put_output(CO2);
    let a = Matrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0]]);
    let b = Matrix::from_rows(&[vec![1.0, 1.0]]);
    let model = LinearModel::new(techs, flows, a, b).unwrap();

    for solver in [SolverKind::Faer, SolverKind::Sparse] {
        let calculator = Calculator::new(model.clone(), solver.build_solver());
        for kind in [ResultKind::Simple, ResultKind::Contribution, ResultKind::Full] {
            let err = calculator.calculate(kind).unwrap_err();
            assert!(
                matches!(err, LcaError::SingularMatrix(_)),
                "{:?} with {}: {err}",
                kind,
                solver.as_str()
            );
        }
    }
}

#[test]
fn test_self_loop_correction() {
    init_tracing();
    let calculator = Calculator::new(self_loop_model(false), SolverKind::Faer.build_solver());
    let result = calculator.calculate_simple().unwrap();

    assert_close(result.scaling_factor(&tech(1)), 10.0);
    assert_close(result.total_requirement(&tech(1)), 12.0);
    assert_close(result.loop_factor(), 10.0 / 12.0);

    let real = result.real_demands();
    for (r, t) in real.iter().zip(result.total_requirements()) {
        assert_close(*r, t * 10.0 / 12.0);
    }
    assert_close(real[0], 10.0);
}

#[test]
fn test_without_loop_real_demands_equal_total_requirements() {
    let calculator = Calculator::new(steel_model(false), SolverKind::Faer.build_solver());
    let result = calculator.calculate_simple().unwrap();
    assert_eq!(result.loop_factor(), 1.0);
    assert_eq!(result.real_demands(), result.total_requirements().to_vec());
}

#[test]
fn test_capabilities_follow_kind_and_model() {
    let calculator = Calculator::new(steel_model(false), SolverKind::Faer.build_solver());

    let simple = calculator.calculate(ResultKind::Simple).unwrap();
    assert!(!simple.has_direct());
    assert!(!simple.has_upstream());
    assert!(simple.has_impacts());
    assert!(simple.has_costs());
    assert!(simple.solutions().is_none());

    let contributions = calculator.calculate(ResultKind::Contribution).unwrap();
    assert_eq!(contributions.kind(), ResultKind::Contribution);
    assert!(contributions.has_direct());
    assert!(!contributions.has_upstream());

    let full = calculator.calculate(ResultKind::Full).unwrap();
    assert_eq!(full.kind(), ResultKind::Full);
    assert!(full.has_direct());
    assert!(full.has_upstream());
    assert!(full.solutions().is_some());

    let chain = Calculator::new(two_entry_chain(false), SolverKind::Faer.build_solver())
        .calculate_full()
        .unwrap();
    assert!(!chain.has_impacts());
    assert!(!chain.has_costs());
}

#[test]
fn test_totals_and_sign_convention() {
    let calculator = Calculator::with_config(
        steel_model(false),
        SolverKind::Faer.build_solver(),
        uncompressed(),
    );
    let result = calculator.calculate_simple().unwrap();

    // raw input flows are negative, accessors report positive amounts
    assert_close(result.total_flow_vector()[1], -4.0);
    assert_close(result.total_flow(&CRUDE_OIL), 4.0);
    assert_close(result.total_flow(&CO2), 2.2);

    let so2 = result.total_flow(&SO2);
    assert_eq!(so2, 0.0);
    assert!(so2.is_sign_positive());
    assert_eq!(result.total_flow(&FlowId::new(999)), 0.0);

    let values = result.total_flow_values();
    assert_eq!(values.len(), 2);
    assert!(values.iter().any(|(f, input, v)| *f == CRUDE_OIL && *input && (v - 4.0).abs() < 1e-9));
    assert!(values.iter().all(|(f, _, _)| *f != SO2));

    assert_close(result.total_impact(&GWP), 2.2);
    assert_close(result.total_impact(&RESOURCES), 4.0);
    let impacts = result.total_impact_values();
    assert_eq!(impacts.len(), 3);
    assert!(impacts.contains(&(ACIDIFICATION, 0.0)));

    assert_close(result.total_costs(), 11.0);
}

#[test]
fn test_input_flow_with_zero_total_is_positive_zero() {
    let mut techs = TechIndex::new(tech(1), 1.0);
    techs.put(tech(2));
    let mut flows = FlowIndex::new();
    flows.put_input(CRUDE_OIL);
    // only the unused entry extracts crude oil; its scaling factor is 0
    let a = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
    let b = Matrix::from_rows(&[vec![0.0, -3.0]]);
    let model = LinearModel::new(techs, flows, a, b).unwrap();

    let calculator = Calculator::with_config(model, SolverKind::Faer.build_solver(), uncompressed());
    let result = calculator.calculate_contributions().unwrap();
    let value = result.total_flow(&CRUDE_OIL);
    assert_eq!(value, 0.0);
    assert!(value.is_sign_positive());
    let direct = result.direct_flow(&tech(2), &CRUDE_OIL);
    assert!(direct.is_sign_positive());
    assert!(result.total_flow_values().is_empty());
}

#[test]
fn test_missing_capabilities_read_as_zero() {
    let calculator = Calculator::new(two_entry_chain(false), SolverKind::Faer.build_solver());
    let simple = calculator.calculate_simple().unwrap();
    assert_eq!(simple.total_impact(&GWP), 0.0);
    assert!(simple.total_impact_values().is_empty());
    assert!(simple.total_impact_vector().is_none());
    assert_eq!(simple.total_costs(), 0.0);
    assert_eq!(simple.direct_flow(&tech(1), &CO2), 0.0);
    assert_eq!(simple.upstream_flow(&tech(1), &CO2).unwrap(), 0.0);

    let contributions = calculator.calculate_contributions().unwrap();
    assert_close(contributions.direct_flow(&tech(1), &CO2), 10.0);
    assert_eq!(contributions.upstream_flow(&tech(1), &CO2).unwrap(), 0.0);
    assert_eq!(contributions.direct_impact(&tech(1), &GWP), 0.0);
}

#[test]
fn test_direct_results() {
    let calculator = Calculator::new(steel_model(true), SolverKind::Sparse.build_solver());
    let result = calculator.calculate_contributions().unwrap();

    assert_close(result.direct_flow(&steel(), &CO2), 1.0);
    assert_close(result.direct_flow(&electricity(), &CO2), 1.0);
    assert_close(result.direct_flow(&coal(), &CO2), 0.2);
    assert_close(result.direct_flow(&coal(), &CRUDE_OIL), 4.0);
    assert_close(result.direct_impact(&coal(), &RESOURCES), 4.0);
    assert_close(result.direct_impact(&electricity(), &GWP), 1.0);
    assert_close(result.flow_impact(&GWP, &CO2), 2.2);
    assert_close(result.flow_impact(&RESOURCES, &CRUDE_OIL), 4.0);
    assert_close(result.impact_factor(&RESOURCES, &CRUDE_OIL), -1.0);
    assert_close(result.direct_cost(&coal()), 4.0);

    let sum: f64 = [steel(), electricity(), coal()]
        .iter()
        .map(|t| result.direct_flow(t, &CO2))
        .sum();
    assert_close(sum, result.total_flow(&CO2));
}

#[test]
fn test_upstream_results() {
    for strategy in [ProviderStrategy::Dense, ProviderStrategy::Lazy] {
        let config = CalculationConfig {
            strategy,
            ..Default::default()
        };
        let calculator =
            Calculator::with_config(steel_model(true), SolverKind::Sparse.build_solver(), config);
        let result = calculator.calculate_full().unwrap();

        assert_close(result.upstream_flow(&steel(), &CO2).unwrap(), 2.2);
        assert_close(result.upstream_flow(&electricity(), &CO2).unwrap(), 1.1);
        assert_close(result.upstream_flow(&coal(), &CRUDE_OIL).unwrap(), 4.0);
        assert_close(result.upstream_impact(&electricity(), &RESOURCES).unwrap(), 2.0);
        assert_close(result.upstream_cost(&electricity()).unwrap(), 4.0);
        assert_close(result.upstream_cost(&steel()).unwrap(), 11.0);
        assert_eq!(result.upstream_flow(&briquettes(), &CO2).unwrap(), 0.0);
    }
}

#[test]
fn test_upstream_of_reference_in_loop_equals_total() {
    let calculator = Calculator::new(self_loop_model(true), SolverKind::Sparse.build_solver());
    let result = calculator.calculate_full().unwrap();
    assert_close(result.total_flow(&CO2), 20.0);
    assert_close(result.upstream_flow(&tech(1), &CO2).unwrap(), 20.0);
}

#[test]
fn test_dense_and_lazy_providers_agree() {
    init_tracing();
    let dense = Calculator::with_config(
        steel_model(false),
        SolverKind::Faer.build_solver(),
        CalculationConfig {
            strategy: ProviderStrategy::Dense,
            compress: false,
            ..Default::default()
        },
    )
    .calculate_full()
    .unwrap();
    let lazy = Calculator::with_config(
        steel_model(true),
        SolverKind::Sparse.build_solver(),
        CalculationConfig {
            strategy: ProviderStrategy::Lazy,
            compress: false,
            ..Default::default()
        },
    )
    .calculate_full()
    .unwrap();

    assert_eq!(dense.solutions().map(|s| s.id()), Some("dense"));
    assert_eq!(lazy.solutions().map(|s| s.id()), Some("lazy"));
    for t in [steel(), electricity(), coal(), briquettes()] {
        assert_close(dense.scaling_factor(&t), lazy.scaling_factor(&t));
        for flow in [CO2, CRUDE_OIL, SO2] {
            assert_close(
                dense.upstream_flow(&t, &flow).unwrap(),
                lazy.upstream_flow(&t, &flow).unwrap(),
            );
        }
        for impact in [GWP, RESOURCES, ACIDIFICATION] {
            assert_close(
                dense.upstream_impact(&t, &impact).unwrap(),
                lazy.upstream_impact(&t, &impact).unwrap(),
            );
        }
        assert_close(dense.upstream_cost(&t).unwrap(), lazy.upstream_cost(&t).unwrap());
    }
}

#[test]
fn test_compression_keeps_results() {
    let full = Calculator::with_config(
        steel_model(false),
        SolverKind::Faer.build_solver(),
        uncompressed(),
    );
    let compressed = Calculator::new(steel_model(false), SolverKind::Faer.build_solver());

    assert_eq!(full.model().tech_index().size(), 4);
    assert_eq!(compressed.model().tech_index().size(), 3);
    assert!(!compressed.model().flow_index().contains(&SO2));
    assert!(!compressed
        .model()
        .impact_index()
        .is_some_and(|idx| idx.contains(&ACIDIFICATION)));

    let a = full.calculate_full().unwrap();
    let b = compressed.calculate_full().unwrap();
    for t in [steel(), electricity(), coal()] {
        assert_close(a.scaling_factor(&t), b.scaling_factor(&t));
        assert_close(a.direct_flow(&t, &CO2), b.direct_flow(&t, &CO2));
        assert_close(
            a.upstream_flow(&t, &CRUDE_OIL).unwrap(),
            b.upstream_flow(&t, &CRUDE_OIL).unwrap(),
        );
    }
    for flow in [CO2, CRUDE_OIL] {
        assert_close(a.total_flow(&flow), b.total_flow(&flow));
    }
    for impact in [GWP, RESOURCES] {
        assert_close(a.total_impact(&impact), b.total_impact(&impact));
    }
    assert_close(a.total_costs(), b.total_costs());
    assert_eq!(b.scaling_factor(&briquettes()), 0.0);
}

#[test]
fn test_results_are_kept_in_cache() {
    let calculator = Calculator::new(steel_model(false), SolverKind::Faer.build_solver());
    let mut cache = ResultCache::new();

    let simple = calculator.calculate_into(ResultKind::Simple, &mut cache).unwrap();
    let full = calculator.calculate_into(ResultKind::Full, &mut cache).unwrap();
    assert_ne!(simple, full);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&full).map(|r| r.kind()), Some(ResultKind::Full));

    let removed = cache.pop(&simple).unwrap();
    assert_close(removed.total_flow(&CO2), 2.2);
    assert!(!cache.contains(&simple));
    assert!(cache.pop(&simple).is_none());

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_calculator_from_config() {
    let config = CalculationConfig::from_toml_str("solver = \"sparse\"\nstrategy = \"auto\"\n").unwrap();
    let calculator = Calculator::from_config(steel_model(true), config);
    assert_eq!(calculator.solver().id(), "sparse");

    let result = calculator.calculate_full().unwrap();
    // sparse model with the auto strategy
    assert_eq!(result.solutions().map(|s| s.id()), Some("lazy"));
    assert_close(result.total_impact(&GWP), 2.2);
}
