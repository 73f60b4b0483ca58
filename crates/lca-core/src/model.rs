//! The assembled linear model of a product system.
//!
//! ```text
//!            tech entries (n)              flows (m)
//!          ┌──────────────┐             ┌──────────┐
//! tech (n) │      A       │  impacts (p)│    C     │
//!          └──────────────┘             └──────────┘
//!          ┌──────────────┐
//! flows (m)│      B       │   costs: c (length n)
//!          └──────────────┘
//! ```
//!
//! A model owns its matrices and indices exclusively. Calculations only ever
//! read from it; the one mutating step is [`LinearModel::compress`], which
//! drops technology entries that cannot contribute to the reference demand.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{LcaError, LcaResult};
use crate::index::{FlowIndex, ImpactIndex, TechIndex};
use crate::matrix::Matrix;

#[derive(Debug, Clone)]
pub struct LinearModel {
    tech_index: TechIndex,
    flow_index: FlowIndex,
    impact_index: Option<ImpactIndex>,
    tech_matrix: Matrix,
    envi_matrix: Matrix,
    impact_matrix: Option<Matrix>,
    cost_vector: Option<Vec<f64>>,
    sparse: bool,
}

impl LinearModel {
    /// Creates a model without impact factors and costs.
    ///
    /// Fails with [`LcaError::InvalidModel`] when `A` is not square, when
    /// `A` does not match the technology index, or when `B` does not match
    /// `A` and the flow index.
    pub fn new(
        tech_index: TechIndex,
        flow_index: FlowIndex,
        tech_matrix: Matrix,
        envi_matrix: Matrix,
    ) -> LcaResult<Self> {
        let n = tech_index.size();
        if !tech_matrix.is_square() {
            return Err(LcaError::InvalidModel(format!(
                "technology matrix must be square, got {}x{}",
                tech_matrix.rows(),
                tech_matrix.columns()
            )));
        }
        if tech_matrix.rows() != n {
            return Err(LcaError::InvalidModel(format!(
                "technology matrix has {} rows but the index has {} entries",
                tech_matrix.rows(),
                n
            )));
        }
        if envi_matrix.columns() != n {
            return Err(LcaError::InvalidModel(format!(
                "intervention matrix has {} columns, expected {}",
                envi_matrix.columns(),
                n
            )));
        }
        if envi_matrix.rows() != flow_index.size() {
            return Err(LcaError::InvalidModel(format!(
                "intervention matrix has {} rows but the flow index has {} flows",
                envi_matrix.rows(),
                flow_index.size()
            )));
        }
        let sparse = tech_matrix.is_sparse();
        Ok(Self {
            tech_index,
            flow_index,
            impact_index: None,
            tech_matrix,
            envi_matrix,
            impact_matrix: None,
            cost_vector: None,
            sparse,
        })
    }

    /// Adds characterization factors: `C` has one row per impact category
    /// and one column per flow of the flow index.
    pub fn with_impacts(mut self, impact_index: ImpactIndex, impact_matrix: Matrix) -> LcaResult<Self> {
        if impact_matrix.columns() != self.flow_index.size() {
            return Err(LcaError::InvalidModel(format!(
                "impact matrix has {} columns but the flow index has {} flows",
                impact_matrix.columns(),
                self.flow_index.size()
            )));
        }
        if impact_matrix.rows() != impact_index.size() {
            return Err(LcaError::InvalidModel(format!(
                "impact matrix has {} rows but the impact index has {} categories",
                impact_matrix.rows(),
                impact_index.size()
            )));
        }
        self.impact_index = Some(impact_index);
        self.impact_matrix = Some(impact_matrix);
        Ok(self)
    }

    /// Adds one cost value per technology entry.
    pub fn with_costs(mut self, costs: Vec<f64>) -> LcaResult<Self> {
        if costs.len() != self.tech_index.size() {
            return Err(LcaError::InvalidModel(format!(
                "cost vector has {} values, expected {}",
                costs.len(),
                self.tech_index.size()
            )));
        }
        self.cost_vector = Some(costs);
        Ok(self)
    }

    /// Overrides the density hint taken from the technology matrix.
    pub fn with_sparse_hint(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    pub fn tech_index(&self) -> &TechIndex {
        &self.tech_index
    }

    pub fn flow_index(&self) -> &FlowIndex {
        &self.flow_index
    }

    pub fn impact_index(&self) -> Option<&ImpactIndex> {
        self.impact_index.as_ref()
    }

    pub fn tech_matrix(&self) -> &Matrix {
        &self.tech_matrix
    }

    pub fn envi_matrix(&self) -> &Matrix {
        &self.envi_matrix
    }

    pub fn impact_matrix(&self) -> Option<&Matrix> {
        self.impact_matrix.as_ref()
    }

    pub fn cost_vector(&self) -> Option<&[f64]> {
        self.cost_vector.as_deref()
    }

    pub fn has_impacts(&self) -> bool {
        self.impact_matrix.is_some()
            && self.impact_index.as_ref().map_or(false, |idx| !idx.is_empty())
    }

    pub fn has_costs(&self) -> bool {
        self.cost_vector.is_some()
    }

    /// Density hint: `true` when the model should be treated as sparse.
    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    /// Positions of the technology entries reachable from the reference
    /// entry, in ascending order.
    ///
    /// Column `j` of `A` lists what entry `j` consumes, so a breadth-first
    /// walk over the column non-zeros starting at the reference column
    /// visits every entry in its supply chain.
    pub fn reachable_entries(&self) -> Vec<usize> {
        reachable_from(&self.tech_matrix, self.tech_index.reference_position())
    }

    /// Removes technology entries that are unreachable from the reference
    /// entry, then flows without any non-zero intervention in the remaining
    /// columns, then impact categories without any non-zero factor for the
    /// remaining flows.
    ///
    /// Results for the surviving keys are unchanged. Calling it twice is a
    /// no-op the second time.
    pub fn compress(&mut self) {
        let n = self.tech_index.size();
        let techs = self.reachable_entries();

        let mut flow_used = vec![false; self.flow_index.size()];
        for &col in &techs {
            for (row, _) in self.envi_matrix.column_entries(col) {
                flow_used[row] = true;
            }
        }
        let flows: Vec<usize> = (0..flow_used.len()).filter(|&i| flow_used[i]).collect();

        let impacts: Option<Vec<usize>> = self.impact_matrix.as_ref().map(|c| {
            let mut used = vec![false; c.rows()];
            for &col in &flows {
                for (row, _) in c.column_entries(col) {
                    used[row] = true;
                }
            }
            (0..used.len()).filter(|&i| used[i]).collect()
        });

        let unchanged = techs.len() == n
            && flows.len() == self.flow_index.size()
            && impacts
                .as_ref()
                .zip(self.impact_matrix.as_ref())
                .map_or(true, |(kept, c)| kept.len() == c.rows());
        if unchanged {
            debug!(entries = n, "model compression: nothing to remove");
            return;
        }

        debug!(
            entries_before = n,
            entries_after = techs.len(),
            flows_before = self.flow_index.size(),
            flows_after = flows.len(),
            "compressing linear model"
        );

        self.tech_matrix = self.tech_matrix.select(&techs, &techs);
        self.envi_matrix = self.envi_matrix.select(&flows, &techs);
        self.tech_index = self.tech_index.retain_positions(&techs);
        self.flow_index = self.flow_index.retain_positions(&flows);
        if let Some(costs) = self.cost_vector.as_mut() {
            *costs = techs.iter().map(|&i| costs[i]).collect();
        }
        if let (Some(kept), Some(c), Some(idx)) = (
            impacts,
            self.impact_matrix.as_mut(),
            self.impact_index.as_mut(),
        ) {
            *c = c.select(&kept, &flows);
            *idx = idx.retain_positions(&kept);
        }
    }
}

/// Breadth-first walk over the column non-zeros of `a`, starting at `start`.
/// Returns the visited positions in ascending order.
pub fn reachable_from(a: &Matrix, start: usize) -> Vec<usize> {
    let n = a.columns();
    if start >= n {
        return Vec::new();
    }
    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();
    visited[start] = true;
    queue.push_back(start);
    while let Some(col) = queue.pop_front() {
        for (row, _) in a.column_entries(col) {
            if !visited[row] {
                visited[row] = true;
                queue.push_back(row);
            }
        }
    }
    (0..n).filter(|&i| visited[i]).collect()
}
