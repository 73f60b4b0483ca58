//! Calculation settings.
//!
//! Settings can be built in code or read from a TOML file. Every field is
//! optional in the file; missing values use the defaults below.
//!
//! ```toml
//! solver = "sparse"
//! strategy = "lazy"
//! compress = true
//! sparse_density_threshold = 0.1
//! tree_max_depth = 16
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use lca_core::{LcaError, LcaResult, MatrixSolver, SolverKind};
use serde::{Deserialize, Serialize};

/// How the full-result path computes upstream results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStrategy {
    /// Lazy for models flagged sparse, dense otherwise.
    #[default]
    Auto,
    /// Invert the technology matrix once up front.
    Dense,
    /// Solve per entry on demand and cache the solutions.
    Lazy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationConfig {
    /// Linear algebra backend.
    pub solver: SolverKind,

    /// Solution provider for full results.
    pub strategy: ProviderStrategy,

    /// Remove unreachable entries before solving.
    pub compress: bool,

    /// Density below which the sparse backend creates sparse matrices.
    pub sparse_density_threshold: f64,

    /// Depth bound for eager upstream tree expansion.
    pub tree_max_depth: usize,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            solver: SolverKind::Faer,
            strategy: ProviderStrategy::Auto,
            compress: true,
            sparse_density_threshold: 0.25,
            tree_max_depth: 32,
        }
    }
}

impl CalculationConfig {
    pub fn from_toml_str(text: &str) -> LcaResult<Self> {
        let config: CalculationConfig =
            toml::from_str(text).map_err(|e| LcaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading calculation config {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("parsing calculation config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> LcaResult<()> {
        if !(0.0..=1.0).contains(&self.sparse_density_threshold) {
            return Err(LcaError::Config(format!(
                "sparse_density_threshold must be within [0, 1], got {}",
                self.sparse_density_threshold
            )));
        }
        Ok(())
    }

    /// Builds the configured solver backend.
    pub fn build_solver(&self) -> Arc<dyn MatrixSolver> {
        self.solver
            .build_solver_with_threshold(self.sparse_density_threshold)
    }

    /// Whether the full-result path should use the lazy provider for a model
    /// with the given density hint.
    pub fn use_lazy_provider(&self, model_is_sparse: bool) -> bool {
        match self.strategy {
            ProviderStrategy::Auto => model_is_sparse,
            ProviderStrategy::Dense => false,
            ProviderStrategy::Lazy => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CalculationConfig::default();
        assert_eq!(config.solver, SolverKind::Faer);
        assert_eq!(config.strategy, ProviderStrategy::Auto);
        assert!(config.compress);
        assert_eq!(config.tree_max_depth, 32);
        assert!(config.use_lazy_provider(true));
        assert!(!config.use_lazy_provider(false));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CalculationConfig::from_toml_str("solver = \"sparse\"\n").unwrap();
        assert_eq!(config.solver, SolverKind::Sparse);
        assert!(config.compress);
        assert_eq!(config.build_solver().id(), "sparse");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            CalculationConfig::from_toml_str("sparse_density_threshold = 2.0"),
            Err(LcaError::Config(_))
        ));
        assert!(matches!(
            CalculationConfig::from_toml_str("solver = \"cholesky\""),
            Err(LcaError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "strategy = \"lazy\"\ncompress = false\ntree_max_depth = 4").unwrap();
        let config = CalculationConfig::load(file.path()).unwrap();
        assert_eq!(config.strategy, ProviderStrategy::Lazy);
        assert!(!config.compress);
        assert_eq!(config.tree_max_depth, 4);
        assert!(config.use_lazy_provider(false));
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(CalculationConfig::load("/nonexistent/lca.toml").is_err());
    }
}
