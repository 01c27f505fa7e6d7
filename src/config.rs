use std::path::PathBuf;

/// Where the pipeline reads raw documents and writes tables. Resolved from
/// the environment (after `dotenvy` has loaded `.env`), overridable by CLI
/// flags in the binary.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub table_dir: PathBuf,
    pub force_refresh: bool,
}

pub const RAW_DIR_ENV: &str = "APP_MATCH_DATA_DIR";
pub const TABLE_DIR_ENV: &str = "APP_TABLE_DIR";
pub const FORCE_REFRESH_ENV: &str = "APP_FORCE_REFRESH";

const DEFAULT_RAW_DIR: &str = "./data";
const DEFAULT_TABLE_DIR: &str = "./csv_output";

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            table_dir: PathBuf::from(DEFAULT_TABLE_DIR),
            force_refresh: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = env_path(RAW_DIR_ENV) {
            config.raw_dir = dir;
        }
        if let Some(dir) = env_path(TABLE_DIR_ENV) {
            config.table_dir = dir;
        }
        config.force_refresh = env_flag(FORCE_REFRESH_ENV);
        config
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|raw| matches!(raw.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
