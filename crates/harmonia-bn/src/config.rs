//! Harmony search parameters.
//!
//! Parameters can be built in code with the `with_*` methods or loaded from
//! TOML; every field is optional in the file and falls back to its default.
//!
//! ```toml
//! hms = 30
//! max_iters = 500
//! hmcr = 0.95
//! par = 0.2
//! amnesia = 50
//! seed = 42
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{BnError, Result};

/// Configuration of a harmony search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonyConfig {
    /// Harmony memory size
    pub hms: usize,

    /// Number of improvisations
    pub max_iters: usize,

    /// Stop once the best score reaches this value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_quality: Option<f64>,

    /// Harmony memory consideration rate
    pub hmcr: f64,

    /// Pitch adjustment rate
    pub par: f64,

    /// Inject a memory-independent random network every this many iterations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amnesia: Option<usize>,

    /// Edge probability per ordered pair when memory is ignored (default 1/n)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_edge_rate: Option<f64>,

    /// Attempts per density level when generating random networks
    pub max_attempts: usize,

    /// CPT blending factor
    pub bias: f64,

    /// Progress report interval in iterations (0 disables reports)
    pub report_every: usize,

    /// Estimate node CPTs in parallel
    pub parallel_cpt: bool,

    /// RNG seed; runs are reproducible when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for HarmonyConfig {
    fn default() -> Self {
        Self {
            hms: 30,
            max_iters: 500,
            target_quality: None,
            hmcr: 0.95,
            par: 0.2,
            amnesia: None,
            random_edge_rate: None,
            max_attempts: 50,
            bias: 0.0,
            report_every: 10,
            parallel_cpt: true,
            seed: None,
        }
    }
}

impl HarmonyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hms(mut self, hms: usize) -> Self {
        self.hms = hms;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_target_quality(mut self, target: f64) -> Self {
        self.target_quality = Some(target);
        self
    }

    pub fn with_hmcr(mut self, hmcr: f64) -> Self {
        self.hmcr = hmcr;
        self
    }

    pub fn with_par(mut self, par: f64) -> Self {
        self.par = par;
        self
    }

    pub fn with_amnesia(mut self, period: usize) -> Self {
        self.amnesia = Some(period);
        self
    }

    pub fn with_random_edge_rate(mut self, rate: f64) -> Self {
        self.random_edge_rate = Some(rate);
        self
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_report_every(mut self, every: usize) -> Self {
        self.report_every = every;
        self
    }

    pub fn with_parallel_cpt(mut self, parallel: bool) -> Self {
        self.parallel_cpt = parallel;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.hms == 0 {
            return Err(BnError::InvalidConfig("hms must be at least 1".to_string()));
        }
        for (name, rate) in [("hmcr", Some(self.hmcr)), ("par", Some(self.par))]
            .into_iter()
            .chain([("random_edge_rate", self.random_edge_rate)])
        {
            if let Some(rate) = rate {
                if !(0.0..=1.0).contains(&rate) {
                    return Err(BnError::InvalidConfig(format!(
                        "{} must be in [0, 1], got {}",
                        name, rate
                    )));
                }
            }
        }
        if self.amnesia == Some(0) {
            return Err(BnError::InvalidConfig(
                "amnesia period must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(BnError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.target_quality.is_some_and(f64::is_nan) {
            return Err(BnError::InvalidConfig(
                "target_quality must not be NaN".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render as a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarmonyConfig::default();
        assert_eq!(config.hms, 30);
        assert_eq!(config.max_iters, 500);
        assert_eq!(config.hmcr, 0.95);
        assert_eq!(config.par, 0.2);
        assert!(config.target_quality.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = HarmonyConfig::new()
            .with_hms(5)
            .with_amnesia(7)
            .with_target_quality(-120.5)
            .with_seed(9);
        let toml_str = config.to_toml_string().unwrap();
        let parsed = HarmonyConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = HarmonyConfig::from_toml_str("hms = 4\nmax_iters = 12\n").unwrap();
        assert_eq!(config.hms, 4);
        assert_eq!(config.max_iters, 12);
        assert_eq!(config.hmcr, 0.95);
        assert!(config.amnesia.is_none());
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            HarmonyConfig::from_toml_str("hms = \"many\""),
            Err(BnError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_validation() {
        assert!(HarmonyConfig::new().with_hms(0).validate().is_err());
        assert!(HarmonyConfig::new().with_hmcr(1.5).validate().is_err());
        assert!(HarmonyConfig::new().with_par(-0.1).validate().is_err());
        assert!(HarmonyConfig::new().with_amnesia(0).validate().is_err());
        assert!(HarmonyConfig::new().with_max_attempts(0).validate().is_err());
        assert!(HarmonyConfig::new()
            .with_random_edge_rate(2.0)
            .validate()
            .is_err());
        assert!(HarmonyConfig::new()
            .with_target_quality(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("harmonia-config-{}.toml", std::process::id()));
        let config = HarmonyConfig::new().with_hms(3).with_bias(0.25);
        config.save(&path).unwrap();
        let loaded = HarmonyConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config, loaded);
    }
}
