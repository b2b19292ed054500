use crate::errors::{EngineError, EngineResult};
use crate::payoff::sampler::MIN_SAMPLE_POINTS;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    /// Sample count used when a curve request doesn't name one
    pub default_sample_points: usize,
    /// Upper bound on requested sample counts
    pub max_sample_points: usize,
    /// Optional directory of static files (e.g. a separately built chart
    /// front-end) served for non-API paths. Unset means API only.
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        let default_sample_points = env_var_or("DEFAULT_SAMPLE_POINTS", "180")
            .parse::<usize>()
            .map_err(|e| EngineError::Config(format!("DEFAULT_SAMPLE_POINTS: {e}")))?;

        let max_sample_points = env_var_or("MAX_SAMPLE_POINTS", "2000")
            .parse::<usize>()
            .map_err(|e| EngineError::Config(format!("MAX_SAMPLE_POINTS: {e}")))?;

        let cfg = Self {
            server_port,
            default_sample_points,
            max_sample_points,
            static_dir: std::env::var("STATIC_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.max_sample_points < MIN_SAMPLE_POINTS {
            return Err(EngineError::Config(format!(
                "MAX_SAMPLE_POINTS must be at least {MIN_SAMPLE_POINTS}"
            )));
        }
        if self.default_sample_points > self.max_sample_points {
            return Err(EngineError::Config(
                "DEFAULT_SAMPLE_POINTS exceeds MAX_SAMPLE_POINTS".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3001,
            default_sample_points: 180,
            max_sample_points: 2000,
            static_dir: None,
        }
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
