//! Calculation results.
//!
//! All three calculation modes produce a [`CalculationResult`]. The
//! [`ResultKind`] tag records which mode built it and the [`Capabilities`]
//! tell which groups of values are present:
//!
//! | Kind | totals | direct | upstream |
//! |------|--------|--------|----------|
//! | `Simple` | yes | - | - |
//! | `Contribution` | yes | yes | - |
//! | `Full` | yes | yes | yes |
//!
//! Accessors are keyed by domain identities ([`TechFlow`], [`FlowId`],
//! [`ImpactId`]). Unknown keys and absent capabilities yield `0.0`.
//!
//! ## Sign convention
//!
//! Inside the matrices input flows are negative. Flow values read through
//! this module are sign-adjusted so that inputs and outputs both report as
//! positive amounts. A zero is always returned as `+0.0`.

use std::fmt;
use std::sync::Arc;

use lca_core::{
    FlowId, FlowIndex, ImpactId, ImpactIndex, LcaResult, LinearModel, Matrix, TechFlow, TechIndex,
};

use crate::solutions::SolutionProvider;

/// Calculation mode that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Simple,
    Contribution,
    Full,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Simple => "simple",
            ResultKind::Contribution => "contribution",
            ResultKind::Full => "full",
        }
    }
}

/// Groups of values a result can answer for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub has_direct: bool,
    pub has_upstream: bool,
    pub has_impacts: bool,
    pub has_costs: bool,
}

/// Result of one calculation over a [`LinearModel`].
pub struct CalculationResult {
    pub(crate) kind: ResultKind,
    pub(crate) capabilities: Capabilities,
    pub(crate) model: Arc<LinearModel>,
    pub(crate) scaling_vector: Vec<f64>,
    pub(crate) total_requirements: Vec<f64>,
    pub(crate) loop_factor: f64,
    pub(crate) total_flows: Vec<f64>,
    pub(crate) total_impacts: Option<Vec<f64>>,
    pub(crate) total_costs: Option<f64>,
    pub(crate) direct_flows: Option<Matrix>,
    pub(crate) direct_impacts: Option<Matrix>,
    pub(crate) direct_flow_impacts: Option<Matrix>,
    pub(crate) direct_costs: Option<Vec<f64>>,
    pub(crate) solutions: Option<Box<dyn SolutionProvider>>,
}

impl fmt::Debug for CalculationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculationResult")
            .field("kind", &self.kind)
            .field("capabilities", &self.capabilities)
            .field("entries", &self.scaling_vector.len())
            .field("flows", &self.total_flows.len())
            .field("loop_factor", &self.loop_factor)
            .field("solutions", &self.solutions.as_ref().map(|s| s.id().to_string()))
            .finish_non_exhaustive()
    }
}

/// Flips input flows to positive amounts and normalizes `-0.0`.
#[inline]
pub(crate) fn adopt_flow_sign(value: f64, is_input: bool) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    if is_input {
        -value
    } else {
        value
    }
}

impl CalculationResult {
    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn has_direct(&self) -> bool {
        self.capabilities.has_direct
    }

    pub fn has_upstream(&self) -> bool {
        self.capabilities.has_upstream
    }

    pub fn has_impacts(&self) -> bool {
        self.capabilities.has_impacts
    }

    pub fn has_costs(&self) -> bool {
        self.capabilities.has_costs
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn tech_index(&self) -> &TechIndex {
        self.model.tech_index()
    }

    pub fn flow_index(&self) -> &FlowIndex {
        self.model.flow_index()
    }

    pub fn impact_index(&self) -> Option<&ImpactIndex> {
        self.model.impact_index()
    }

    /// Solution provider of a full result.
    pub fn solutions(&self) -> Option<&dyn SolutionProvider> {
        self.solutions.as_deref()
    }

    // --- raw vectors ------------------------------------------------------

    pub fn scaling_vector(&self) -> &[f64] {
        &self.scaling_vector
    }

    pub fn total_requirements(&self) -> &[f64] {
        &self.total_requirements
    }

    /// Unsigned total flow vector `g`, in flow index order.
    pub fn total_flow_vector(&self) -> &[f64] {
        &self.total_flows
    }

    pub fn total_impact_vector(&self) -> Option<&[f64]> {
        if !self.has_impacts() {
            return None;
        }
        self.total_impacts.as_deref()
    }

    /// Loop factor of the reference entry; `1.0` without self-consumption.
    pub fn loop_factor(&self) -> f64 {
        self.loop_factor
    }

    /// Total requirements corrected for the reference entry's loop.
    pub fn real_demands(&self) -> Vec<f64> {
        crate::calculator::real_demands(&self.total_requirements, self.loop_factor)
    }

    // --- technology entries -----------------------------------------------

    pub fn scaling_factor(&self, tech: &TechFlow) -> f64 {
        self.tech_index()
            .position(tech)
            .and_then(|i| self.scaling_vector.get(i).copied())
            .unwrap_or(0.0)
    }

    pub fn total_requirement(&self, tech: &TechFlow) -> f64 {
        self.tech_index()
            .position(tech)
            .and_then(|i| self.total_requirements.get(i).copied())
            .unwrap_or(0.0)
    }

    // --- totals -------------------------------------------------------------

    pub fn total_flow(&self, flow: &FlowId) -> f64 {
        let index = self.flow_index();
        let Some(pos) = index.position(flow) else {
            return 0.0;
        };
        let value = self.total_flows.get(pos).copied().unwrap_or(0.0);
        adopt_flow_sign(value, index.is_input_at(pos))
    }

    /// Non-zero total flows as `(flow, is_input, amount)`, sign-adjusted.
    pub fn total_flow_values(&self) -> Vec<(FlowId, bool, f64)> {
        self.flow_index()
            .iter()
            .filter_map(|(pos, flow, is_input)| {
                let value = self.total_flows.get(pos).copied().unwrap_or(0.0);
                if value == 0.0 {
                    return None;
                }
                Some((*flow, is_input, adopt_flow_sign(value, is_input)))
            })
            .collect()
    }

    pub fn total_impact(&self, impact: &ImpactId) -> f64 {
        if !self.has_impacts() {
            return 0.0;
        }
        let (Some(index), Some(values)) = (self.impact_index(), self.total_impacts.as_ref()) else {
            return 0.0;
        };
        index
            .position(impact)
            .and_then(|i| values.get(i).copied())
            .unwrap_or(0.0)
    }

    /// All impact categories with their total result, zeros included.
    pub fn total_impact_values(&self) -> Vec<(ImpactId, f64)> {
        if !self.has_impacts() {
            return Vec::new();
        }
        let (Some(index), Some(values)) = (self.impact_index(), self.total_impacts.as_ref()) else {
            return Vec::new();
        };
        index
            .iter()
            .map(|(i, impact)| (*impact, values.get(i).copied().unwrap_or(0.0)))
            .collect()
    }

    pub fn total_costs(&self) -> f64 {
        if !self.has_costs() {
            return 0.0;
        }
        self.total_costs.unwrap_or(0.0)
    }

    // --- direct contributions -------------------------------------------

    pub fn direct_flow(&self, tech: &TechFlow, flow: &FlowId) -> f64 {
        let (Some(j), Some(f)) = (self.tech_index().position(tech), self.flow_index().position(flow))
        else {
            return 0.0;
        };
        let Some(direct) = self.direct_flows.as_ref() else {
            return 0.0;
        };
        adopt_flow_sign(direct.get(f, j), self.flow_index().is_input_at(f))
    }

    /// Unsigned direct flow values of one technology entry, in flow index order.
    pub fn direct_flows_of(&self, tech: &TechFlow) -> Vec<f64> {
        let (Some(j), Some(direct)) = (self.tech_index().position(tech), self.direct_flows.as_ref())
        else {
            return Vec::new();
        };
        direct.column(j)
    }

    pub fn direct_impact(&self, tech: &TechFlow, impact: &ImpactId) -> f64 {
        if !self.has_impacts() {
            return 0.0;
        }
        let Some(j) = self.tech_index().position(tech) else {
            return 0.0;
        };
        let Some(k) = self.impact_index().and_then(|idx| idx.position(impact)) else {
            return 0.0;
        };
        self.direct_impacts
            .as_ref()
            .map(|m| m.get(k, j))
            .unwrap_or(0.0)
    }

    pub fn direct_cost(&self, tech: &TechFlow) -> f64 {
        if !self.has_costs() {
            return 0.0;
        }
        let (Some(j), Some(costs)) = (self.tech_index().position(tech), self.direct_costs.as_ref())
        else {
            return 0.0;
        };
        costs.get(j).copied().unwrap_or(0.0)
    }

    /// Contribution of the total amount of `flow` to the result of `impact`.
    pub fn flow_impact(&self, impact: &ImpactId, flow: &FlowId) -> f64 {
        if !self.has_impacts() {
            return 0.0;
        }
        let Some(f) = self.flow_index().position(flow) else {
            return 0.0;
        };
        let Some(k) = self.impact_index().and_then(|idx| idx.position(impact)) else {
            return 0.0;
        };
        self.direct_flow_impacts
            .as_ref()
            .map(|m| m.get(k, f))
            .unwrap_or(0.0)
    }

    /// Characterization factor of `flow` for `impact`, as stored in `C`.
    pub fn impact_factor(&self, impact: &ImpactId, flow: &FlowId) -> f64 {
        if !self.has_impacts() {
            return 0.0;
        }
        let Some(f) = self.flow_index().position(flow) else {
            return 0.0;
        };
        let Some(k) = self.impact_index().and_then(|idx| idx.position(impact)) else {
            return 0.0;
        };
        self.model
            .impact_matrix()
            .map(|c| c.get(k, f))
            .unwrap_or(0.0)
    }

    // --- upstream ---------------------------------------------------------

    /// Factor that scales a unit result of `tech` to its upstream result in
    /// this product system: total requirement times loop factor.
    fn upstream_factor(&self, provider: &dyn SolutionProvider, j: usize) -> LcaResult<f64> {
        let tr = self.total_requirements.get(j).copied().unwrap_or(0.0);
        if tr == 0.0 {
            return Ok(0.0);
        }
        Ok(tr * provider.loop_factor_of(j)?)
    }

    /// Unsigned upstream flow vector of `tech`, in flow index order.
    pub fn upstream_flows_of(&self, tech: &TechFlow) -> LcaResult<Vec<f64>> {
        let (Some(provider), Some(j)) = (self.solutions(), self.tech_index().position(tech)) else {
            return Ok(Vec::new());
        };
        let factor = self.upstream_factor(provider, j)?;
        Ok(provider
            .total_flows_of_one(j)?
            .into_iter()
            .map(|v| v * factor)
            .collect())
    }

    pub fn upstream_flow(&self, tech: &TechFlow, flow: &FlowId) -> LcaResult<f64> {
        let (Some(provider), Some(j)) = (self.solutions(), self.tech_index().position(tech)) else {
            return Ok(0.0);
        };
        let Some(f) = self.flow_index().position(flow) else {
            return Ok(0.0);
        };
        let factor = self.upstream_factor(provider, j)?;
        if factor == 0.0 {
            return Ok(0.0);
        }
        let value = provider.total_flows_of_one(j)?.get(f).copied().unwrap_or(0.0) * factor;
        Ok(adopt_flow_sign(value, self.flow_index().is_input_at(f)))
    }

    pub fn upstream_impact(&self, tech: &TechFlow, impact: &ImpactId) -> LcaResult<f64> {
        if !self.has_impacts() {
            return Ok(0.0);
        }
        let (Some(provider), Some(j)) = (self.solutions(), self.tech_index().position(tech)) else {
            return Ok(0.0);
        };
        let Some(k) = self.impact_index().and_then(|idx| idx.position(impact)) else {
            return Ok(0.0);
        };
        let factor = self.upstream_factor(provider, j)?;
        if factor == 0.0 {
            return Ok(0.0);
        }
        let value = provider
            .total_impacts_of_one(j)?
            .and_then(|h| h.get(k).copied())
            .unwrap_or(0.0);
        Ok(value * factor)
    }

    pub fn upstream_cost(&self, tech: &TechFlow) -> LcaResult<f64> {
        if !self.has_costs() {
            return Ok(0.0);
        }
        let (Some(provider), Some(j)) = (self.solutions(), self.tech_index().position(tech)) else {
            return Ok(0.0);
        };
        let factor = self.upstream_factor(provider, j)?;
        if factor == 0.0 {
            return Ok(0.0);
        }
        Ok(provider.total_cost_of_one(j)?.unwrap_or(0.0) * factor)
    }
}
