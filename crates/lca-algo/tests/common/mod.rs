#![allow(dead_code)]

use lca_core::{
    FlowId, FlowIndex, ImpactId, ImpactIndex, LinearModel, Matrix, ProcessId, TechFlow, TechIndex,
};

pub const CO2: FlowId = FlowId::new(100);
pub const CRUDE_OIL: FlowId = FlowId::new(101);
pub const SO2: FlowId = FlowId::new(102);

pub const GWP: ImpactId = ImpactId::new(1);
pub const RESOURCES: ImpactId = ImpactId::new(2);
pub const ACIDIFICATION: ImpactId = ImpactId::new(3);

/// Routes calculation logs to the test output (respects RUST_LOG).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn tech(id: u64) -> TechFlow {
    TechFlow::new(ProcessId::new(id), FlowId::new(id + 10))
}

pub fn steel() -> TechFlow {
    tech(1)
}

pub fn electricity() -> TechFlow {
    tech(2)
}

pub fn coal() -> TechFlow {
    tech(3)
}

pub fn briquettes() -> TechFlow {
    tech(4)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// A = [[1, 0], [-0.5, 1]], B = [[1, 0], [0, 2]], demand 10 for entry 0.
pub fn two_entry_chain(sparse: bool) -> LinearModel {
    let mut techs = TechIndex::new(tech(1), 10.0);
    techs.put(tech(2));
    let mut flows = FlowIndex::new();
    flows.put_output(CO2);
    flows.put_output(SO2);
    let a = Matrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, -0.5), (1, 1, 1.0)], sparse);
    let b = Matrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, 2.0)], sparse);
    LinearModel::new(techs, flows, a, b).unwrap()
}

/// Steel (reference, demand 1) uses 2 electricity and 1 coal; electricity
/// uses 0.5 coal. Briquette production also uses coal but nothing uses
/// briquettes.
///
/// ```text
/// s = [1, 2, 2, 0]
/// g = [CO2 2.2, crude oil -4, SO2 0]
/// h = [GWP 2.2, resources 4, acidification 0]
/// costs = 5·1 + 1·2 + 2·2 = 11
/// ```
pub fn steel_model(sparse: bool) -> LinearModel {
    let mut techs = TechIndex::new(steel(), 1.0);
    techs.put(electricity());
    techs.put(coal());
    techs.put(briquettes());

    let mut flows = FlowIndex::new();
    flows.put_output(CO2);
    flows.put_input(CRUDE_OIL);
    flows.put_output(SO2);

    let a = Matrix::from_triplets(
        4,
        4,
        &[
            (0, 0, 1.0),
            (1, 0, -2.0),
            (2, 0, -1.0),
            (1, 1, 1.0),
            (2, 1, -0.5),
            (2, 2, 1.0),
            (3, 3, 1.0),
            (2, 3, -1.0),
        ],
        sparse,
    );
    let b = Matrix::from_triplets(
        3,
        4,
        &[
            (0, 0, 1.0),
            (0, 1, 0.5),
            (0, 2, 0.1),
            (1, 2, -2.0),
            (2, 3, 3.0),
        ],
        sparse,
    );

    let impacts: ImpactIndex = [GWP, RESOURCES, ACIDIFICATION].into_iter().collect();
    let c = Matrix::from_triplets(3, 3, &[(0, 0, 1.0), (1, 1, -1.0), (2, 2, 1.0)], sparse);

    LinearModel::new(techs, flows, a, b)
        .unwrap()
        .with_impacts(impacts, c)
        .unwrap()
        .with_costs(vec![5.0, 1.0, 2.0, 7.0])
        .unwrap()
}

/// The reference product is partly consumed again by its only supplier:
/// A = [[1.2, -0.2], [-1, 1]], B = [[1, 1]], demand 10.
pub fn self_loop_model(sparse: bool) -> LinearModel {
    let mut techs = TechIndex::new(tech(1), 10.0);
    techs.put(tech(2));
    let mut flows = FlowIndex::new();
    flows.put_output(CO2);
    let a = Matrix::from_triplets(
        2,
        2,
        &[(0, 0, 1.2), (0, 1, -0.2), (1, 0, -1.0), (1, 1, 1.0)],
        sparse,
    );
    let b = Matrix::from_triplets(1, 2, &[(0, 0, 1.0), (0, 1, 1.0)], sparse);
    LinearModel::new(techs, flows, a, b).unwrap()
}
