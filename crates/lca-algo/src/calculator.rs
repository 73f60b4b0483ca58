//! Matrix-based LCA calculation.
//!
//! Given a [`LinearModel`] with technology matrix `A`, intervention matrix
//! `B`, optional impact matrix `C` and cost vector `c`, and a demand `d` for
//! the reference entry `r`:
//!
//! ```text
//! A · s = d · eᵣ              scaling vector
//! t[i] = A[i,i] · s[i]        total requirements
//! g = B · s                   total flows
//! h = C · g                   total impacts
//! k = cᵀ · s                  total costs
//! ```
//!
//! The contribution mode adds the per-entry direct results (`B · diag(s)`,
//! `C · B · diag(s)`, `C · diag(g)`, `c ∘ s`). The full mode adds a
//! [`SolutionProvider`] for upstream results of every entry.

use std::sync::Arc;

use lca_core::{LcaResult, LinearModel, Matrix, MatrixSolver, TechIndex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::ResultCache;
use crate::config::CalculationConfig;
use crate::result::{CalculationResult, Capabilities, ResultKind};
use crate::solutions::{DenseSolutionProvider, LazySolutionProvider, SolutionProvider};
use crate::upstream::{TreeDimension, UpstreamTree};

/// Deviation of the reference total requirement from the demand that still
/// counts as "no loop".
const LOOP_EPSILON: f64 = 1e-12;

pub struct Calculator {
    model: Arc<LinearModel>,
    solver: Arc<dyn MatrixSolver>,
    config: CalculationConfig,
}

impl Calculator {
    pub fn new(model: LinearModel, solver: Arc<dyn MatrixSolver>) -> Self {
        Self::with_config(model, solver, CalculationConfig::default())
    }

    /// Calculator with explicit settings; the model is compressed here when
    /// `config.compress` is set.
    pub fn with_config(
        mut model: LinearModel,
        solver: Arc<dyn MatrixSolver>,
        config: CalculationConfig,
    ) -> Self {
        if config.compress {
            model.compress();
        }
        Self {
            model: Arc::new(model),
            solver,
            config,
        }
    }

    /// Calculator using the solver backend named in `config`.
    pub fn from_config(model: LinearModel, config: CalculationConfig) -> Self {
        let solver = config.build_solver();
        Self::with_config(model, solver, config)
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn solver(&self) -> &dyn MatrixSolver {
        self.solver.as_ref()
    }

    pub fn config(&self) -> &CalculationConfig {
        &self.config
    }

    pub fn calculate(&self, kind: ResultKind) -> LcaResult<CalculationResult> {
        match kind {
            ResultKind::Simple => self.calculate_simple(),
            ResultKind::Contribution => self.calculate_contributions(),
            ResultKind::Full => self.calculate_full(),
        }
    }

    /// Runs a calculation and stores the result in `cache`.
    pub fn calculate_into(&self, kind: ResultKind, cache: &mut ResultCache) -> LcaResult<Uuid> {
        let result = self.calculate(kind)?;
        Ok(cache.put(result))
    }

    /// Totals only.
    pub fn calculate_simple(&self) -> LcaResult<CalculationResult> {
        self.log_start(ResultKind::Simple);
        let s = self.solve_scaling()?;
        let g = self
            .solver
            .multiply_vec(self.model.envi_matrix(), &s)?;
        let mut result = self.totals(ResultKind::Simple, s, g)?;
        result.capabilities = self.capabilities(false, false);
        Ok(result)
    }

    /// Totals plus direct contributions of every technology entry.
    pub fn calculate_contributions(&self) -> LcaResult<CalculationResult> {
        self.log_start(ResultKind::Contribution);
        let s = self.solve_scaling()?;
        let g = self
            .solver
            .multiply_vec(self.model.envi_matrix(), &s)?;
        let mut result = self.totals(ResultKind::Contribution, s, g)?;
        self.add_direct_results(&mut result)?;
        result.capabilities = self.capabilities(true, false);
        Ok(result)
    }

    /// Totals, direct contributions and upstream results.
    pub fn calculate_full(&self) -> LcaResult<CalculationResult> {
        self.log_start(ResultKind::Full);
        let provider: Box<dyn SolutionProvider> =
            if self.config.use_lazy_provider(self.model.is_sparse()) {
                Box::new(LazySolutionProvider::create(
                    self.model.clone(),
                    self.solver.clone(),
                )?)
            } else {
                Box::new(DenseSolutionProvider::create(
                    self.model.clone(),
                    self.solver.as_ref(),
                )?)
            };
        debug!(provider = provider.id(), "created solution provider");

        let s = provider.scaling_vector().to_vec();
        let g = provider.total_flows().to_vec();
        let mut result = self.totals(ResultKind::Full, s, g)?;
        self.add_direct_results(&mut result)?;
        result.capabilities = self.capabilities(true, true);
        result.solutions = Some(provider);
        Ok(result)
    }

    /// Upstream tree over `result`, bounded by the configured depth.
    pub fn upstream_tree<'r>(
        &self,
        result: &'r CalculationResult,
        dimension: TreeDimension,
    ) -> LcaResult<UpstreamTree<'r>> {
        Ok(UpstreamTree::new(result, dimension)?.with_max_depth(self.config.tree_max_depth))
    }

    fn log_start(&self, kind: ResultKind) {
        info!(
            kind = kind.as_str(),
            solver = self.solver.id(),
            entries = self.model.tech_index().size(),
            flows = self.model.flow_index().size(),
            reference = %self.model.tech_index().reference(),
            "running calculation"
        );
    }

    fn solve_scaling(&self) -> LcaResult<Vec<f64>> {
        let index = self.model.tech_index();
        self.solver.solve(
            self.model.tech_matrix(),
            index.reference_position(),
            index.demand(),
        )
    }

    fn capabilities(&self, has_direct: bool, has_upstream: bool) -> Capabilities {
        Capabilities {
            has_direct,
            has_upstream,
            has_impacts: self.model.has_impacts(),
            has_costs: self.model.has_costs(),
        }
    }

    fn totals(&self, kind: ResultKind, s: Vec<f64>, g: Vec<f64>) -> LcaResult<CalculationResult> {
        let a = self.model.tech_matrix();
        let total_requirements = total_requirements(a, &s);
        let loop_factor = loop_factor(a, &s, self.model.tech_index());
        if loop_factor != 1.0 {
            warn!(
                loop_factor,
                reference = %self.model.tech_index().reference(),
                "reference entry is consumed in its own supply chain"
            );
        }

        let total_impacts = match self.model.impact_matrix() {
            Some(c) if self.model.has_impacts() => Some(self.solver.multiply_vec(c, &g)?),
            _ => None,
        };
        let total_costs = self
            .model
            .cost_vector()
            .map(|costs| costs.iter().zip(&s).map(|(c, s)| c * s).sum::<f64>());

        Ok(CalculationResult {
            kind,
            capabilities: Capabilities::default(),
            model: self.model.clone(),
            scaling_vector: s,
            total_requirements,
            loop_factor,
            total_flows: g,
            total_impacts,
            total_costs,
            direct_flows: None,
            direct_impacts: None,
            direct_flow_impacts: None,
            direct_costs: None,
            solutions: None,
        })
    }

    fn add_direct_results(&self, result: &mut CalculationResult) -> LcaResult<()> {
        let mut direct_flows = self.model.envi_matrix().clone();
        direct_flows.scale_columns(&result.scaling_vector);

        if let Some(c) = self.model.impact_matrix().filter(|_| self.model.has_impacts()) {
            result.direct_impacts = Some(self.solver.multiply(c, &direct_flows)?);
            let mut flow_impacts = c.clone();
            flow_impacts.scale_columns(&result.total_flows);
            result.direct_flow_impacts = Some(flow_impacts);
        }

        result.direct_costs = self.model.cost_vector().map(|costs| {
            costs
                .iter()
                .zip(&result.scaling_vector)
                .map(|(c, s)| c * s)
                .collect()
        });
        result.direct_flows = Some(direct_flows);
        Ok(())
    }
}

/// `t[i] = A[i,i] · s[i]`: the gross output of every technology entry.
pub fn total_requirements(a: &Matrix, s: &[f64]) -> Vec<f64> {
    s.iter()
        .enumerate()
        .map(|(i, si)| a.get(i, i) * si)
        .collect()
}

/// Ratio of the demand to the total requirement of the reference entry.
///
/// Exactly `1.0` unless the reference product is also consumed upstream;
/// `0.0` when the total requirement of the reference entry is zero.
pub fn loop_factor(a: &Matrix, s: &[f64], tech_index: &TechIndex) -> f64 {
    let idx = tech_index.reference_position();
    let total = a.get(idx, idx) * s.get(idx).copied().unwrap_or(0.0);
    let demand = tech_index.demand();
    if (total - demand).abs() < LOOP_EPSILON {
        return 1.0;
    }
    if total == 0.0 {
        return 0.0;
    }
    demand / total
}

/// Total requirements scaled by the loop factor.
pub fn real_demands(total_requirements: &[f64], loop_factor: f64) -> Vec<f64> {
    if loop_factor == 1.0 {
        return total_requirements.to_vec();
    }
    total_requirements.iter().map(|t| t * loop_factor).collect()
}

/// Scaling vector taken from a precomputed inverse of `A`.
pub fn scaling_vector(inverse: &Matrix, tech_index: &TechIndex) -> Vec<f64> {
    let demand = tech_index.demand();
    inverse
        .column(tech_index.reference_position())
        .into_iter()
        .map(|v| v * demand)
        .collect()
}
