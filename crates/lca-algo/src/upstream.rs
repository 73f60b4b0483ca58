//! Upstream trees over a full result.
//!
//! The tree starts at the reference entry and follows the inputs of the
//! technology matrix. A node for entry `i` below a parent `p` carries
//!
//! ```text
//! required = -A[i,p] · scaling(p)        amount of i's product used by p
//! scaling  = required / A[i,i]
//! result   = required · intensity(i)     intensity = total result per unit of i
//! direct   = scaling · direct intensity(i)
//! ```
//!
//! so `direct + Σ children.result == result` holds at every node, also in
//! models with loops. Children are computed when first requested, one
//! solution provider query per new entry. An entry that already occurs on
//! the path from the root is not expanded again; its node is marked as
//! truncated. A node whose suppliers lie below the configured depth bound
//! gets no children and is marked as depth limited.
//!
//! Nodes live in an arena and are addressed by [`NodeId`].

use hashbrown::{HashMap, HashSet};
use lca_core::{FlowId, ImpactId, LcaResult, TechFlow};
use tracing::debug;

use crate::contribution::share_of;
use crate::result::{adopt_flow_sign, CalculationResult};

/// Quantity a tree breaks down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeDimension {
    Flow(FlowId),
    Impact(ImpactId),
    Costs,
}

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct UpstreamNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Position of the entry in the technology index.
    pub position: usize,
    pub tech_flow: TechFlow,
    pub depth: usize,
    pub required_amount: f64,
    pub scaling: f64,
    pub result: f64,
    pub direct: f64,
    /// The entry is an ancestor of itself; no children are computed.
    pub truncated: bool,
    /// The node has suppliers below the depth bound that were not added.
    pub depth_limited: bool,
    children: Option<Vec<NodeId>>,
}

impl UpstreamNode {
    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    /// Children computed so far; empty before expansion.
    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }
}

pub struct UpstreamTree<'r> {
    result: &'r CalculationResult,
    dimension: TreeDimension,
    nodes: Vec<UpstreamNode>,
    total: f64,
    max_depth: Option<usize>,
    intensities: HashMap<usize, f64>,
}

impl<'r> UpstreamTree<'r> {
    /// Tree for `dimension` with only the root node. The root requires the
    /// demand of the reference entry and carries the total result. Without
    /// upstream results the root cannot be expanded and stays a leaf.
    pub fn new(result: &'r CalculationResult, dimension: TreeDimension) -> LcaResult<Self> {
        let index = result.tech_index();
        let root_pos = index.reference_position();
        let tech_flow = index.reference();
        let required = index.demand();
        let a_rr = result.model().tech_matrix().get(root_pos, root_pos);
        let scaling = if a_rr == 0.0 { 0.0 } else { required / a_rr };

        let total = match dimension {
            TreeDimension::Flow(flow) => result.total_flow(&flow),
            TreeDimension::Impact(impact) => result.total_impact(&impact),
            TreeDimension::Costs => result.total_costs(),
        };

        let mut tree = Self {
            result,
            dimension,
            nodes: Vec::new(),
            total,
            max_depth: None,
            intensities: HashMap::new(),
        };
        let direct = tree.signed(scaling * tree.direct_intensity(root_pos));
        let upstream = result.has_upstream() && tree.has_dimension();
        tree.nodes.push(UpstreamNode {
            id: 0,
            parent: None,
            position: root_pos,
            tech_flow,
            depth: 0,
            required_amount: required,
            scaling,
            result: total,
            direct,
            truncated: false,
            depth_limited: false,
            children: if upstream { None } else { Some(Vec::new()) },
        });
        Ok(tree)
    }

    /// Nodes at `max_depth` below the root get no children; those that have
    /// suppliers are flagged with [`UpstreamNode::depth_limited`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn dimension(&self) -> TreeDimension {
        self.dimension
    }

    pub fn root(&self) -> &UpstreamNode {
        &self.nodes[0]
    }

    /// Total result of the dimension, equal to the root's result.
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn node(&self, id: NodeId) -> Option<&UpstreamNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[UpstreamNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Share of the node's result in the root total; `0` for a zero total.
    pub fn share(&self, id: NodeId) -> f64 {
        self.nodes
            .get(id)
            .map(|node| share_of(node.result, self.total))
            .unwrap_or(0.0)
    }

    /// Children of `id`, computing them on first access.
    pub fn children(&mut self, id: NodeId) -> LcaResult<Vec<NodeId>> {
        let Some(node) = self.nodes.get(id) else {
            return Ok(Vec::new());
        };
        if let Some(children) = node.children.clone() {
            return Ok(children);
        }
        let open = self.open_path(id);
        self.expand_with(id, &open)
    }

    /// Expands the tree down to `max_depth` levels below the root. Branches
    /// that would revisit an open ancestor stay truncated leaves.
    pub fn expand_all(&mut self, max_depth: usize) -> LcaResult<()> {
        let mut open = HashSet::new();
        self.expand_recursive(0, max_depth, &mut open)
    }

    /// Follows `path` from the root, expanding on the way. Returns the node
    /// reached, or `None` when some step has no matching child.
    pub fn find_path(&mut self, path: &[TechFlow]) -> LcaResult<Option<NodeId>> {
        let mut current = 0;
        for tech in path {
            let children = self.children(current)?;
            match children
                .into_iter()
                .find(|&c| self.nodes[c].tech_flow == *tech)
            {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Entries of the path from the root to `id`, in root-first order.
    pub fn path(&self, id: NodeId) -> Vec<TechFlow> {
        let mut path = Vec::new();
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            path.push(node.tech_flow);
            current = node.parent.and_then(|p| self.nodes.get(p));
        }
        path.reverse();
        path
    }

    fn expand_recursive(
        &mut self,
        id: NodeId,
        depth_left: usize,
        open: &mut HashSet<usize>,
    ) -> LcaResult<()> {
        if depth_left == 0 || self.nodes[id].truncated {
            return Ok(());
        }
        let position = self.nodes[id].position;
        open.insert(position);
        let children = match self.nodes[id].children.clone() {
            Some(children) => children,
            None => self.expand_with(id, open)?,
        };
        for child in children {
            self.expand_recursive(child, depth_left - 1, open)?;
        }
        open.remove(&position);
        Ok(())
    }

    fn open_path(&self, id: NodeId) -> HashSet<usize> {
        let mut open = HashSet::new();
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            open.insert(node.position);
            current = node.parent.and_then(|p| self.nodes.get(p));
        }
        open
    }

    /// Computes the children of `id`; `open` holds the positions on the
    /// path from the root to `id`, both ends included.
    fn expand_with(&mut self, id: NodeId, open: &HashSet<usize>) -> LcaResult<Vec<NodeId>> {
        let source = self.result;
        let (p, parent_scaling, depth, truncated) = {
            let parent = &self.nodes[id];
            (parent.position, parent.scaling, parent.depth + 1, parent.truncated)
        };
        if truncated || !source.has_upstream() {
            self.nodes[id].children = Some(Vec::new());
            return Ok(Vec::new());
        }

        let a = source.model().tech_matrix();
        if self.max_depth.is_some_and(|max| depth > max) {
            let has_suppliers = a
                .column_entries(p)
                .into_iter()
                .any(|(i, a_ip)| i != p && a_ip * parent_scaling != 0.0);
            if has_suppliers {
                debug!(entry = %self.nodes[id].tech_flow, depth, "upstream tree cut at depth bound");
            }
            let node = &mut self.nodes[id];
            node.depth_limited = has_suppliers;
            node.children = Some(Vec::new());
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for (i, a_ip) in a.column_entries(p) {
            if i == p {
                continue;
            }
            let required = -a_ip * parent_scaling;
            if required == 0.0 {
                continue;
            }
            let a_ii = a.get(i, i);
            let scaling = if a_ii == 0.0 { 0.0 } else { required / a_ii };
            let intensity = self.intensity(i)?;
            let result = self.signed(required * intensity);
            let direct = self.signed(scaling * self.direct_intensity(i));
            candidates.push((i, required, scaling, result, direct));
        }
        candidates.sort_by(|x, y| y.3.abs().total_cmp(&x.3.abs()));

        let mut children = Vec::with_capacity(candidates.len());
        for (i, required, scaling, result, direct) in candidates {
            let Some(tech_flow) = source.tech_index().key_at(i).copied() else {
                continue;
            };
            let truncated = open.contains(&i);
            if truncated {
                debug!(entry = %tech_flow, depth, "truncated upstream loop");
            }
            let child = self.nodes.len();
            self.nodes.push(UpstreamNode {
                id: child,
                parent: Some(id),
                position: i,
                tech_flow,
                depth,
                required_amount: required,
                scaling,
                result,
                direct,
                truncated,
                depth_limited: false,
                children: if truncated { Some(Vec::new()) } else { None },
            });
            children.push(child);
        }
        self.nodes[id].children = Some(children.clone());
        Ok(children)
    }

    fn has_dimension(&self) -> bool {
        match self.dimension {
            TreeDimension::Flow(flow) => self.result.flow_index().contains(&flow),
            TreeDimension::Impact(impact) => {
                self.result.has_impacts()
                    && self
                        .result
                        .impact_index()
                        .is_some_and(|idx| idx.contains(&impact))
            }
            TreeDimension::Costs => self.result.has_costs(),
        }
    }

    /// Flow values are reported with the sign convention of the result
    /// accessors.
    fn signed(&self, value: f64) -> f64 {
        match self.dimension {
            TreeDimension::Flow(flow) => {
                adopt_flow_sign(value, self.result.flow_index().is_input(&flow))
            }
            _ => {
                if value == 0.0 {
                    0.0
                } else {
                    value
                }
            }
        }
    }

    /// Unsigned total result per unit of net output of entry `i`.
    fn intensity(&mut self, i: usize) -> LcaResult<f64> {
        if let Some(v) = self.intensities.get(&i) {
            return Ok(*v);
        }
        let value = match self.result.solutions() {
            None => 0.0,
            Some(provider) => match self.dimension {
                TreeDimension::Flow(flow) => match self.result.flow_index().position(&flow) {
                    Some(f) => provider.total_flows_of_one(i)?.get(f).copied().unwrap_or(0.0),
                    None => 0.0,
                },
                TreeDimension::Impact(impact) => {
                    match self.result.impact_index().and_then(|idx| idx.position(&impact)) {
                        Some(k) => provider
                            .total_impacts_of_one(i)?
                            .and_then(|h| h.get(k).copied())
                            .unwrap_or(0.0),
                        None => 0.0,
                    }
                }
                TreeDimension::Costs => provider.total_cost_of_one(i)?.unwrap_or(0.0),
            },
        };
        self.intensities.insert(i, value);
        Ok(value)
    }

    /// Unsigned direct result per unit of scaling of entry `i`.
    fn direct_intensity(&self, i: usize) -> f64 {
        let model = self.result.model();
        match self.dimension {
            TreeDimension::Flow(flow) => model
                .flow_index()
                .position(&flow)
                .map(|f| model.envi_matrix().get(f, i))
                .unwrap_or(0.0),
            TreeDimension::Impact(impact) => {
                let (Some(k), Some(c)) = (
                    model.impact_index().and_then(|idx| idx.position(&impact)),
                    model.impact_matrix(),
                ) else {
                    return 0.0;
                };
                model
                    .envi_matrix()
                    .column_entries(i)
                    .into_iter()
                    .map(|(f, b)| c.get(k, f) * b)
                    .sum()
            }
            TreeDimension::Costs => model
                .cost_vector()
                .and_then(|costs| costs.get(i).copied())
                .unwrap_or(0.0),
        }
    }
}
