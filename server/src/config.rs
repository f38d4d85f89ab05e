use shopsearch_advisor::AdvisorConfig;
use shopsearch_core::RankingParams;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Catalog file or directory, loaded once at startup.
    pub data_path: PathBuf,
    /// Results per search when the request does not say.
    pub default_results: usize,
    /// Upper bound on `k`.
    pub max_results: usize,
    pub ranking: RankingParams,
    /// `None` disables the advisor; `?advise=true` then answers "unavailable".
    pub advisor: Option<AdvisorConfig>,
    /// Comma-separated origins; any origin when unset or unparsable.
    pub cors_allow_origin: Option<String>,
}

impl ServerConfig {
    pub fn new<P: Into<PathBuf>>(data_path: P) -> Self {
        Self {
            data_path: data_path.into(),
            default_results: shopsearch_core::DEFAULT_LIMIT,
            max_results: 100,
            ranking: RankingParams::default(),
            advisor: None,
            cors_allow_origin: None,
        }
    }

    /// `new` plus `CORS_ALLOW_ORIGIN` and the advisor's `LLM_*` variables.
    pub fn from_env<P: Into<PathBuf>>(data_path: P) -> Self {
        let mut config = Self::new(data_path);
        config.cors_allow_origin = std::env::var("CORS_ALLOW_ORIGIN").ok();
        config.advisor = Some(AdvisorConfig::from_env());
        config
    }
}

/// Load `KEY=value` lines into the process environment, from `path` or else from
/// the first `.env` found in the working directory or its parents. Variables that
/// are already set keep their value. Returns the file that was read.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    let loaded = match path {
        Some(p) => dotenvy::from_path(p).map(|()| p.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(file) => Some(file),
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable env file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_file_fills_unset_variables_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(".env");
        std::fs::write(
            &file,
            "SHOPSEARCH_ENV_FILE_ONLY=from-file\nSHOPSEARCH_ENV_FILE_KEEP=from-file\n",
        )
        .unwrap();
        std::env::set_var("SHOPSEARCH_ENV_FILE_KEEP", "from-shell");

        assert_eq!(load_env_file(Some(&file)), Some(file.clone()));
        assert_eq!(std::env::var("SHOPSEARCH_ENV_FILE_ONLY").as_deref(), Ok("from-file"));
        assert_eq!(std::env::var("SHOPSEARCH_ENV_FILE_KEEP").as_deref(), Ok("from-shell"));
    }

    #[test]
    fn missing_env_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_env_file(Some(&dir.path().join("absent.env"))), None);
    }
}
