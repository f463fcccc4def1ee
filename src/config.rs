//! Aggregated configuration for the patch pipeline, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::patches::{NormalizeConfig, SamplingConfig};
use crate::training::TrainingConfig;
use crate::whitening::WhiteningConfig;

/// Every hyperparameter of a run. Missing TOML tables and fields fall back to
/// their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sampling: SamplingConfig,
    pub normalize: NormalizeConfig,
    pub whitening: WhiteningConfig,
    pub training: TrainingConfig,
}

impl PipelineConfig {
    /// Default configuration rendered as TOML.
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let cfg: PipelineConfig = toml::from_str(toml_str)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.normalize.validate()?;
        self.whitening.validate()?;
        self.training.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PatchError;
    use crate::whitening::{InverseSqrtSolver, WhiteningMethod};

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = PipelineConfig::from_toml("").unwrap();
        assert_eq!(cfg.whitening.gamma, WhiteningConfig::default().gamma);
        assert_eq!(cfg.sampling.patch_height, 8);
        assert!(cfg.normalize.hard_beta);
    }

    #[test]
    fn partial_tables_override_only_given_fields() {
        let cfg = PipelineConfig::from_toml(
            r#"
            [normalize]
            beta = 0.5

            [whitening]
            gamma = 0.1
            method = "pca"

            [whitening.solver]
            kind = "newton_schulz"
            iterations = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.normalize.beta, 0.5);
        assert!(cfg.normalize.remove_mean);
        assert_eq!(cfg.whitening.method, WhiteningMethod::Pca);
        assert_eq!(cfg.whitening.solver, InverseSqrtSolver::NewtonSchulz { iterations: 30 });
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = PipelineConfig::from_toml("[whitening]\ngamma = -1.0\n").unwrap_err();
        assert!(matches!(err, PatchError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PipelineConfig::from_toml("[whitening\n").unwrap_err();
        assert!(matches!(err, PatchError::ConfigParse(_)));
    }

    #[test]
    fn default_toml_round_trips() {
        let text = PipelineConfig::default_toml().unwrap();
        let cfg = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(cfg.training.hidden_dim, TrainingConfig::default().hidden_dim);
    }

    #[test]
    fn newton_schulz_solver_renders_and_reads_back() {
        let mut cfg = PipelineConfig::default();
        cfg.whitening.solver = InverseSqrtSolver::NewtonSchulz { iterations: 30 };
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(back.whitening.solver, cfg.whitening.solver);
    }
}
