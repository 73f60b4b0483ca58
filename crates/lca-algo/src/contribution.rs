//! Contribution analysis on top of a [`CalculationResult`].
//!
//! Splits a total (a flow, an impact or the costs) into the direct
//! contributions of the technology entries or of the elementary flows, with
//! their share of the total. Lists are sorted by descending amount and skip
//! zero contributions.

use lca_core::{FlowId, ImpactId, LcaResult, TechFlow};
use serde::Serialize;

use crate::result::CalculationResult;

/// `amount / total`, or `0` when the total is zero.
#[inline]
pub fn share_of(amount: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    amount / total
}

/// An item with its amount and share of some total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution<T> {
    pub item: T,
    pub amount: f64,
    pub share: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl<T> Contribution<T> {
    pub fn new(item: T, amount: f64) -> Self {
        Self {
            item,
            amount,
            share: 0.0,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn compute_share(&mut self, total: f64) {
        self.share = share_of(self.amount, total);
    }
}

/// Keeps the `n` largest contributions and folds the others into a rest
/// entry with `item == None`. No rest entry is added when nothing is cut.
pub fn top_with_rest<T>(contributions: Vec<Contribution<T>>, n: usize) -> Vec<Contribution<Option<T>>> {
    let mut sorted = contributions;
    sort_descending(&mut sorted);

    let mut top = Vec::with_capacity(n.min(sorted.len()) + 1);
    let mut rest: Option<Contribution<Option<T>>> = None;
    for (i, c) in sorted.into_iter().enumerate() {
        if i < n {
            top.push(Contribution {
                item: Some(c.item),
                amount: c.amount,
                share: c.share,
                unit: c.unit,
            });
            continue;
        }
        let r = rest.get_or_insert_with(|| Contribution {
            item: None,
            amount: 0.0,
            share: 0.0,
            unit: c.unit.clone(),
        });
        r.amount += c.amount;
        r.share += c.share;
    }
    top.extend(rest);
    top
}

fn sort_descending<T>(list: &mut [Contribution<T>]) {
    list.sort_by(|a, b| b.amount.total_cmp(&a.amount));
}

/// Direct and upstream result of one technology entry for an impact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryImpactResult {
    pub impact: ImpactId,
    pub direct: f64,
    pub upstream: f64,
    pub share: f64,
}

pub struct ContributionAnalyzer<'r> {
    result: &'r CalculationResult,
}

impl<'r> ContributionAnalyzer<'r> {
    pub fn new(result: &'r CalculationResult) -> Self {
        Self { result }
    }

    fn collect<T>(
        &self,
        items: impl Iterator<Item = (T, f64)>,
        total: f64,
    ) -> Vec<Contribution<T>> {
        let mut list: Vec<Contribution<T>> = items
            .filter(|(_, amount)| *amount != 0.0)
            .map(|(item, amount)| {
                let mut c = Contribution::new(item, amount);
                c.compute_share(total);
                c
            })
            .collect();
        sort_descending(&mut list);
        list
    }

    fn entries(&self) -> impl Iterator<Item = TechFlow> + 'r {
        self.result.tech_index().entries().iter().copied()
    }

    /// Direct contributions of the technology entries to the total of `flow`.
    pub fn entry_contributions_to_flow(&self, flow: &FlowId) -> Vec<Contribution<TechFlow>> {
        if !self.result.has_direct() {
            return Vec::new();
        }
        let total = self.result.total_flow(flow);
        self.collect(
            self.entries()
                .map(|tech| (tech, self.result.direct_flow(&tech, flow))),
            total,
        )
    }

    /// Direct contributions of the technology entries to the total of `impact`.
    pub fn entry_contributions_to_impact(&self, impact: &ImpactId) -> Vec<Contribution<TechFlow>> {
        if !self.result.has_direct() || !self.result.has_impacts() {
            return Vec::new();
        }
        let total = self.result.total_impact(impact);
        self.collect(
            self.entries()
                .map(|tech| (tech, self.result.direct_impact(&tech, impact))),
            total,
        )
    }

    /// Direct contributions of the technology entries to the total costs.
    pub fn entry_contributions_to_costs(&self) -> Vec<Contribution<TechFlow>> {
        if !self.result.has_direct() || !self.result.has_costs() {
            return Vec::new();
        }
        let total = self.result.total_costs();
        self.collect(
            self.entries()
                .map(|tech| (tech, self.result.direct_cost(&tech))),
            total,
        )
    }

    /// Contributions of the elementary flows to the total of `impact`.
    pub fn flow_contributions_to_impact(&self, impact: &ImpactId) -> Vec<Contribution<FlowId>> {
        if !self.result.has_direct() || !self.result.has_impacts() {
            return Vec::new();
        }
        let total = self.result.total_impact(impact);
        self.collect(
            self.result
                .flow_index()
                .flows()
                .iter()
                .map(|flow| (*flow, self.result.flow_impact(impact, flow))),
            total,
        )
    }

    /// Contributions of the direct flows of `tech` to its direct result of
    /// `impact`.
    pub fn flow_contributions_of_entry(
        &self,
        tech: &TechFlow,
        impact: &ImpactId,
    ) -> Vec<Contribution<FlowId>> {
        if !self.result.has_direct() || !self.result.has_impacts() {
            return Vec::new();
        }
        let total = self.result.direct_impact(tech, impact);
        let direct = self.result.direct_flows_of(tech);
        if direct.is_empty() {
            return Vec::new();
        }
        self.collect(
            self.result
                .flow_index()
                .flows()
                .iter()
                .zip(direct)
                .map(|(flow, amount)| (*flow, self.result.impact_factor(impact, flow) * amount)),
            total,
        )
    }

    /// Direct and upstream impact results of `tech` for every impact
    /// category. Upstream values are zero unless the result is a full one.
    pub fn impact_results_of_entry(&self, tech: &TechFlow) -> LcaResult<Vec<EntryImpactResult>> {
        let Some(index) = self.result.impact_index().filter(|_| self.result.has_impacts()) else {
            return Ok(Vec::new());
        };
        let mut results = Vec::with_capacity(index.size());
        for impact in index.keys() {
            let upstream = self.result.upstream_impact(tech, impact)?;
            results.push(EntryImpactResult {
                impact: *impact,
                direct: self.result.direct_impact(tech, impact),
                upstream,
                share: share_of(upstream, self.result.total_impact(impact)),
            });
        }
        Ok(results)
    }
}
