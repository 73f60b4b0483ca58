//! Solution providers for full results.
//!
//! A full result needs, besides the scaling vector of the reference demand,
//! the solution of `A · x = eⱼ` for arbitrary technology entries `j` to
//! answer upstream queries. Two strategies trade memory for recomputation:
//!
//! | Provider | Up front | Per entry query |
//! |----------|----------|-----------------|
//! | [`DenseSolutionProvider`] | inverse of `A`, intensity matrices | column lookup |
//! | [`LazySolutionProvider`] | one solve for `s` | reduced solve, cached |
//!
//! Both return the same numbers; only the timing of the work differs.

pub mod dense;
pub mod lazy;

pub use dense::DenseSolutionProvider;
pub use lazy::LazySolutionProvider;

use lca_core::LcaResult;

/// Access to the solutions of the technology matrix.
///
/// "Of one" quantities refer to one unit of net output of a technology
/// entry, i.e. the solution of `A · x = eⱼ` and the results derived from it.
pub trait SolutionProvider: Send {
    /// Unique identifier (e.g., "dense", "lazy")
    fn id(&self) -> &str;

    /// Scaling vector for the reference demand.
    fn scaling_vector(&self) -> &[f64];

    /// Total flow result `g = B · s`.
    fn total_flows(&self) -> &[f64];

    /// Total impact result `h = C · g`; `None` without impact factors.
    fn total_impacts(&self) -> Option<&[f64]>;

    /// Total costs; `None` without a cost vector.
    fn total_costs(&self) -> Option<f64>;

    /// Value `A[row, col]` of the technology matrix.
    fn tech_value(&self, row: usize, col: usize) -> f64;

    /// Solution `x` of `A · x = eⱼ` (column `j` of the inverse).
    fn solution_of_one(&self, product: usize) -> LcaResult<Vec<f64>>;

    /// Flow result per unit of net output of `product`: `B · x`.
    fn total_flows_of_one(&self, product: usize) -> LcaResult<Vec<f64>>;

    /// Impact result per unit of net output of `product`: `C · B · x`.
    fn total_impacts_of_one(&self, product: usize) -> LcaResult<Option<Vec<f64>>>;

    /// Costs per unit of net output of `product`.
    fn total_cost_of_one(&self, product: usize) -> LcaResult<Option<f64>>;

    /// Correction for products that are consumed in their own supply chain:
    /// `1 / (A[j,j] · x[j])`, or `0` when that product is zero.
    fn loop_factor_of(&self, product: usize) -> LcaResult<f64> {
        let aii = self.tech_value(product, product);
        let ii = self
            .solution_of_one(product)?
            .get(product)
            .copied()
            .unwrap_or(0.0);
        let f = aii * ii;
        if f == 0.0 {
            return Ok(0.0);
        }
        Ok(1.0 / f)
    }
}
