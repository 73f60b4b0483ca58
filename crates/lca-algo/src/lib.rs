//! # lca-algo: Calculations over Linear Technology Models
//!
//! This crate runs matrix-based life cycle calculations on a
//! [`lca_core::LinearModel`] and analyses their results.
//!
//! ## Calculation Modes
//!
//! The [`Calculator`] offers three granularities, all returning a
//! [`CalculationResult`] tagged with its [`ResultKind`]:
//!
//! | Mode | Method | Answers |
//! |------|--------|---------|
//! | [`ResultKind::Simple`] | [`Calculator::calculate_simple`] | totals |
//! | [`ResultKind::Contribution`] | [`Calculator::calculate_contributions`] | totals, direct contributions |
//! | [`ResultKind::Full`] | [`Calculator::calculate_full`] | totals, direct and upstream results |
//!
//! ### Solution Providers
//!
//! Full results answer upstream queries through a [`SolutionProvider`]:
//!
//! - **[`DenseSolutionProvider`]**: inverts the technology matrix once
//! - **[`LazySolutionProvider`]**: solves per entry on demand and caches
//!
//! The choice follows [`CalculationConfig::strategy`] and the model's
//! sparsity hint.
//!
//! ## Analysis
//!
//! - [`ContributionAnalyzer`]: direct contributions with shares
//! - [`UpstreamTree`]: lazily expanded supply chain breakdown
//! - [`ResultCache`]: results kept by id across several queries
//!
//! ## Example
//!
//! ```ignore
//! use lca_algo::{CalculationConfig, Calculator, UpstreamTree, TreeDimension};
//!
//! let config = CalculationConfig::load("lca.toml")?;
//! let calculator = Calculator::from_config(model, config);
//!
//! let result = calculator.calculate_full()?;
//! println!("CO2: {:.3} kg", result.total_flow(&co2));
//!
//! let mut tree = UpstreamTree::new(&result, TreeDimension::Flow(co2))?;
//! tree.expand_all(3)?;
//! ```

pub mod cache;
pub mod calculator;
pub mod config;
pub mod contribution;
pub mod result;
pub mod solutions;
pub mod upstream;

pub use cache::ResultCache;
pub use calculator::{loop_factor, real_demands, scaling_vector, total_requirements, Calculator};
pub use config::{CalculationConfig, ProviderStrategy};
pub use contribution::{share_of, top_with_rest, Contribution, ContributionAnalyzer, EntryImpactResult};
pub use result::{CalculationResult, Capabilities, ResultKind};
pub use solutions::{DenseSolutionProvider, LazySolutionProvider, SolutionProvider};
pub use upstream::{NodeId, TreeDimension, UpstreamNode, UpstreamTree};
