//! Eager provider based on the full inverse of the technology matrix.
//!
//! ```text
//! X = A⁻¹            (n × n)
//! M = B · X          flow intensities    (m × n)
//! N = C · M          impact intensities  (p × n)
//! k = cᵀ · X         cost intensities    (n)
//!
//! s = d · X[:, ref]   g = d · M[:, ref]   h = d · N[:, ref]
//! ```
//!
//! Every per-entry query afterwards is a column copy. Suitable as long as a
//! dense `n × n` matrix fits into memory.

use std::sync::Arc;

use lca_core::{LcaResult, LinearModel, Matrix, MatrixSolver};
use tracing::debug;

use super::SolutionProvider;

pub struct DenseSolutionProvider {
    model: Arc<LinearModel>,
    inverse: Matrix,
    flow_intensities: Matrix,
    impact_intensities: Option<Matrix>,
    cost_intensities: Option<Vec<f64>>,
    scaling_vector: Vec<f64>,
    total_flows: Vec<f64>,
    total_impacts: Option<Vec<f64>>,
    total_costs: Option<f64>,
}

impl DenseSolutionProvider {
    pub fn create(model: Arc<LinearModel>, solver: &dyn MatrixSolver) -> LcaResult<Self> {
        let idx = model.tech_index().reference_position();
        let demand = model.tech_index().demand();
        debug!(
            entries = model.tech_index().size(),
            solver = solver.id(),
            "inverting technology matrix"
        );

        let inverse = solver.invert(model.tech_matrix())?;
        let scaling_vector: Vec<f64> = inverse.column(idx).iter().map(|v| v * demand).collect();

        let flow_intensities = solver.multiply(model.envi_matrix(), &inverse)?;
        let total_flows: Vec<f64> = flow_intensities
            .column(idx)
            .iter()
            .map(|v| v * demand)
            .collect();

        let impact_intensities = match model.impact_matrix() {
            Some(c) if model.has_impacts() => Some(solver.multiply(c, &flow_intensities)?),
            _ => None,
        };
        let total_impacts = impact_intensities
            .as_ref()
            .map(|n| n.column(idx).iter().map(|v| v * demand).collect());

        let cost_intensities = model.cost_vector().map(|costs| {
            (0..inverse.columns())
                .map(|j| {
                    costs
                        .iter()
                        .enumerate()
                        .map(|(i, c)| c * inverse.get(i, j))
                        .sum::<f64>()
                })
                .collect::<Vec<f64>>()
        });
        let total_costs = cost_intensities.as_ref().map(|k| k[idx] * demand);

        Ok(Self {
            model,
            inverse,
            flow_intensities,
            impact_intensities,
            cost_intensities,
            scaling_vector,
            total_flows,
            total_impacts,
            total_costs,
        })
    }

    pub fn inverse(&self) -> &Matrix {
        &self.inverse
    }
}

impl SolutionProvider for DenseSolutionProvider {
    fn id(&self) -> &str {
        "dense"
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
        Ok(self.inverse.column(product))
    }

    fn total_flows_of_one(&self, product: usize) -> LcaResult<Vec<f64>> {
        Ok(self.flow_intensities.column(product))
    }

    fn total_impacts_of_one(&self, product: usize) -> LcaResult<Option<Vec<f64>>> {
        Ok(self.impact_intensities.as_ref().map(|n| n.column(product)))
    }

    fn total_cost_of_one(&self, product: usize) -> LcaResult<Option<f64>> {
        Ok(self
            .cost_intensities
            .as_ref()
            .map(|k| k.get(product).copied().unwrap_or(0.0)))
    }

    fn loop_factor_of(&self, product: usize) -> LcaResult<f64> {
        let f = self.tech_value(product, product) * self.inverse.get(product, product);
        if f == 0.0 {
            return Ok(0.0);
        }
        Ok(1.0 / f)
    }
}
