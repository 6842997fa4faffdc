//! Configuration for synthesis runs, survey deployments and export.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::logging::LogConfig;
use crate::survey::SurveyType;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VeraConfig {
    /// Synthesis engine tuning
    pub synthesis: SynthesisConfig,

    /// Logging setup
    pub logging: LogConfig,

    /// Artifact export
    pub export: ExportConfig,
}

/// Tuning knobs for one synthesis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Rows in every synthetic table
    pub num_samples: usize,

    /// |r| above which an original correlation becomes a target
    pub significance_threshold: f64,

    /// Iteration cap for correlation adjustment
    pub max_iterations: usize,

    /// Targeted pairs closer than this to their target are left alone
    pub tolerance: f64,

    /// |r| above which a non-targeted pair counts as spurious
    pub spurious_threshold: f64,

    /// Stop once an iteration's summed adjustment falls below this
    pub convergence_epsilon: f64,

    /// Std of the damping noise, in units of the column's own std
    pub noise_scale: f64,

    /// Density grid resolution for marginal sampling
    pub grid_points: usize,

    /// Bookkeeping fields never synthesized
    pub excluded_fields: Vec<String>,

    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            num_samples: 100,
            significance_threshold: 0.3,
            max_iterations: 200,
            tolerance: 0.01,
            spurious_threshold: 0.2,
            convergence_epsilon: 0.001,
            noise_scale: 0.1,
            grid_points: 1000,
            excluded_fields: vec![
                "_id".to_string(),
                "created_at".to_string(),
                "expires_at".to_string(),
                "submitted_at".to_string(),
                "session_id".to_string(),
            ],
            seed: None,
        }
    }
}

impl SynthesisConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving `synthetic_data_*.csv`; no files are written when unset
    pub output_dir: Option<PathBuf>,
}

/// Per-survey deployment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyConfig {
    pub survey: SurveyType,
    pub database_name: String,
    pub collection_name: String,
    /// Link prefix; session links are `<base_url>?session=<id>`
    pub base_url: String,
    pub session_duration_minutes: i64,
}

impl SurveyConfig {
    /// Defaults for a survey type, with the base URL overridable through
    /// `<SLUG>_BASE_URL` (e.g. `SUBSTANCE_USE_BASE_URL`)
    pub fn for_survey(survey: SurveyType) -> Self {
        let env_key = format!("{}_BASE_URL", survey.slug().to_uppercase());
        let base_url = std::env::var(&env_key)
            .unwrap_or_else(|_| format!("http://localhost:8501/{}", survey.slug()));

        Self {
            survey,
            database_name: survey.database_name().to_string(),
            collection_name: "responses".to_string(),
            base_url,
            session_duration_minutes: 10,
        }
    }
}

impl VeraConfig {
    /// Load configuration from file, with `VERA_` environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VERA").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("VERA").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
