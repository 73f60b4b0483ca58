//! On-demand provider for large sparse systems.
//!
//! Only the scaling vector of the reference demand is solved up front. The
//! solution for a unit demand of entry `j` is computed when first asked for:
//! the entries reachable from `j` over the non-zeros of `A` form a closed
//! subsystem (no column inside it has entries outside of it), so solving the
//! reduced system and scattering it back yields the full solution vector.
//! Solutions and their derived flow results are cached per entry.
//!
//! The caches use interior mutability and are not synchronized; the provider
//! is `Send` but not `Sync`, callers share it behind their own lock.

use std::cell::RefCell;
use std::sync::Arc;

use hashbrown::HashMap;
use lca_core::model::reachable_from;
use lca_core::{LcaResult, LinearModel, MatrixSolver};
use tracing::debug;

use super::SolutionProvider;

pub struct LazySolutionProvider {
    model: Arc<LinearModel>,
    solver: Arc<dyn MatrixSolver>,
    scaling_vector: Vec<f64>,
    total_flows: Vec<f64>,
    total_impacts: Option<Vec<f64>>,
    total_costs: Option<f64>,
    solutions: RefCell<HashMap<usize, Vec<f64>>>,
    flow_results: RefCell<HashMap<usize, Vec<f64>>>,
}

impl LazySolutionProvider {
    pub fn create(model: Arc<LinearModel>, solver: Arc<dyn MatrixSolver>) -> LcaResult<Self> {
        let idx = model.tech_index().reference_position();
        let demand = model.tech_index().demand();

        let scaling_vector = solver.solve(model.tech_matrix(), idx, demand)?;
        let total_flows = solver.multiply_vec(model.envi_matrix(), &scaling_vector)?;
        let total_impacts = match model.impact_matrix() {
            Some(c) if model.has_impacts() => Some(solver.multiply_vec(c, &total_flows)?),
            _ => None,
        };
        let total_costs = model.cost_vector().map(|costs| dot(costs, &scaling_vector));

        Ok(Self {
            model,
            solver,
            scaling_vector,
            total_flows,
            total_impacts,
            total_costs,
            solutions: RefCell::new(HashMap::new()),
            flow_results: RefCell::new(HashMap::new()),
        })
    }

    /// Number of entries whose unit solution has been computed so far.
    pub fn cached_solutions(&self) -> usize {
        self.solutions.borrow().len()
    }

    fn solve_reduced(&self, product: usize) -> LcaResult<Vec<f64>> {
        let a = self.model.tech_matrix();
        let n = a.columns();
        if product >= n {
            // Let the solver report the out-of-range index.
            return self.solver.solve(a, product, 1.0);
        }

        let reachable = reachable_from(a, product);
        if reachable.len() == n {
            return self.solver.solve(a, product, 1.0);
        }

        let local = reachable
            .iter()
            .position(|&i| i == product)
            .unwrap_or_default();
        let sub = a.select(&reachable, &reachable);
        let partial = self.solver.solve(&sub, local, 1.0)?;
        debug!(
            entry = product,
            subsystem = reachable.len(),
            entries = n,
            "solved reduced system"
        );

        let mut solution = vec![0.0; n];
        for (value, &pos) in partial.into_iter().zip(reachable.iter()) {
            solution[pos] = value;
        }
        Ok(solution)
    }
}

impl SolutionProvider for LazySolutionProvider {
    fn id(&self) -> &str {
        "lazy"
    }

    fn scaling_vector(&self) -> &[f64] {
        &self.scaling_vector
    }

    fn total_flows(&self) -> &[f64] {
        &self.total_flows
    }

    fn total_impacts(&self) -> Option<&[f64]> {
        self.total_impacts.as_deref()
    }

    fn total_costs(&self) -> Option<f64> {
        self.total_costs
    }

    fn tech_value(&self, row: usize, col: usize) -> f64 {
        self.model.tech_matrix().get(row, col)
    }

    fn solution_of_one(&self, product: usize) -> LcaResult<Vec<f64>> {
        if let Some(cached) = self.solutions.borrow().get(&product) {
            return Ok(cached.clone());
        }
        let solution = self.solve_reduced(product)?;
        self.solutions
            .borrow_mut()
            .insert(product, solution.clone());
        Ok(solution)
    }

    fn total_flows_of_one(&self, product: usize) -> LcaResult<Vec<f64>> {
        if let Some(cached) = self.flow_results.borrow().get(&product) {
            return Ok(cached.clone());
        }
        let solution = self.solution_of_one(product)?;
        let flows = self
            .solver
            .multiply_vec(self.model.envi_matrix(), &solution)?;
        self.flow_results
            .borrow_mut()
            .insert(product, flows.clone());
        Ok(flows)
    }

    fn total_impacts_of_one(&self, product: usize) -> LcaResult<Option<Vec<f64>>> {
        let c = match self.model.impact_matrix() {
            Some(c) if self.model.has_impacts() => c,
            _ => return Ok(None),
        };
        let flows = self.total_flows_of_one(product)?;
        Ok(Some(self.solver.multiply_vec(c, &flows)?))
    }

    fn total_cost_of_one(&self, product: usize) -> LcaResult<Option<f64>> {
        let Some(costs) = self.model.cost_vector() else {
            return Ok(None);
        };
        let solution = self.solution_of_one(product)?;
        Ok(Some(dot(costs, &solution)))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solutions::DenseSolutionProvider;
    use lca_core::{FlowId, FlowIndex, Matrix, ProcessId, SolverKind, TechFlow, TechIndex};

    fn tech(id: u64) -> TechFlow {
        TechFlow::new(ProcessId::new(id), FlowId::new(id))
    }

    // Chain 0 <- 1 <- 2 <- 3; the subsystem of entry 2 is {2, 3}.
    fn model() -> Arc<LinearModel> {
        let mut techs = TechIndex::new(tech(1), 2.0);
        for id in 2..=4 {
            techs.put(tech(id));
        }
        let mut flows = FlowIndex::new();
        flows.put_output(FlowId::new(100));
        let a = Matrix::from_triplets(
            4,
            4,
            &[
                (0, 0, 1.0),
                (1, 0, -2.0),
                (1, 1, 1.0),
                (2, 1, -0.5),
                (2, 2, 1.0),
                (3, 2, -1.0),
                (3, 3, 1.0),
            ],
            true,
        );
        let b = Matrix::from_triplets(1, 4, &[(0, 0, 1.0), (0, 1, 1.0), (0, 2, 1.0), (0, 3, 1.0)], true);
        Arc::new(LinearModel::new(techs, flows, a, b).unwrap())
    }

    #[test]
    fn test_lazy_matches_dense() {
        let model = model();
        let solver = SolverKind::Sparse.build_solver();
        let dense = DenseSolutionProvider::create(model.clone(), solver.as_ref()).unwrap();
        let lazy = LazySolutionProvider::create(model, solver).unwrap();

        assert_eq!(lazy.scaling_vector().len(), 4);
        for (l, d) in lazy.scaling_vector().iter().zip(dense.scaling_vector()) {
            assert!((l - d).abs() < 1e-10);
        }
        for j in 0..4 {
            let l = lazy.solution_of_one(j).unwrap();
            let d = dense.solution_of_one(j).unwrap();
            for (a, b) in l.iter().zip(&d) {
                assert!((a - b).abs() < 1e-10, "entry {j}: {a} != {b}");
            }
            let lf = lazy.loop_factor_of(j).unwrap();
            let df = dense.loop_factor_of(j).unwrap();
            assert!((lf - df).abs() < 1e-10);
        }
    }

    #[test]
    fn test_solutions_are_cached() {
        let lazy = LazySolutionProvider::create(model(), SolverKind::Faer.build_solver()).unwrap();
        assert_eq!(lazy.cached_solutions(), 0);
        let first = lazy.solution_of_one(2).unwrap();
        let second = lazy.solution_of_one(2).unwrap();
        assert_eq!(first, second);
        assert_eq!(lazy.cached_solutions(), 1);
        // Entries upstream of 2 only: 0 and 1 stay zero.
        assert_eq!(first[0], 0.0);
        assert_eq!(first[1], 0.0);
        assert!((first[3] - 1.0).abs() < 1e-12);
    }
}
