// Configuration loading and parsing (league.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::espn::PoolSort;
use crate::stats::resolve::InclusionFlags;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("no config directory found (looked for ./config and the user config dir)")]
    NoConfigDir,
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    /// Recognized stat-source keys, in resolution order. Versioned data: a
    /// new season's key is a config edit, not a code change.
    pub source_keys: Vec<String>,
    pub inclusion: InclusionFlags,
    pub ws_port: u16,
    pub pool_query: PoolQueryConfig,
    pub data_paths: DataPaths,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    sources: SourcesSection,
    #[serde(default)]
    inclusion: InclusionSection,
    websocket: WebsocketSection,
    pool_query: PoolQuerySection,
    data: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub id: u64,
    pub season: u16,
    /// Scoring-period context required by the provider's pool query.
    pub scoring_period: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct SourcesSection {
    keys: Vec<String>,
}

/// Inclusion defaults. Both false: DTD/questionable and out players are
/// excluded from stat contribution unless the dashboard toggles them on.
#[derive(Debug, Clone, Default, Deserialize)]
struct InclusionSection {
    #[serde(default)]
    include_day_to_day: bool,
    #[serde(default)]
    include_out: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct PoolQuerySection {
    limit: usize,
    sort: String,
}

#[derive(Debug, Clone)]
pub struct PoolQueryConfig {
    pub limit: usize,
    pub sort: PoolSort,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub schedule: String,
    pub team_ids: String,
    pub projections: String,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub espn_s2: Option<String>,
    pub swid: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse_league_file(text: &str, path: &Path) -> Result<LeagueFile, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse_pool_sort(raw: &str) -> Result<PoolSort, ConfigError> {
    match raw {
        "ownership" => Ok(PoolSort::OwnershipPct),
        "draft_rank" => Ok(PoolSort::DraftRank),
        other => Err(ConfigError::ValidationError {
            field: "pool_query.sort".into(),
            message: format!("unknown sort `{other}` (expected `ownership` or `draft_rank`)"),
        }),
    }
}

/// Load configuration from `league.toml` and (optionally)
/// `credentials.toml` in the given directory.
pub fn load_config_from(config_dir: &Path) -> Result<Config, ConfigError> {
    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file = parse_league_file(&league_text, &league_path)?;

    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        league: league_file.league,
        source_keys: league_file.sources.keys,
        inclusion: InclusionFlags {
            include_day_to_day: league_file.inclusion.include_day_to_day,
            include_out: league_file.inclusion.include_out,
        },
        ws_port: league_file.websocket.port,
        pool_query: PoolQueryConfig {
            limit: league_file.pool_query.limit,
            sort: parse_pool_sort(&league_file.pool_query.sort)?,
        },
        data_paths: league_file.data,
        credentials,
    };

    validate(&config)?;
    Ok(config)
}

/// Load configuration from `./config` when present, falling back to the
/// platform config directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let local = PathBuf::from("config");
    if local.join("league.toml").exists() {
        return load_config_from(&local);
    }
    let dirs = directories::ProjectDirs::from("", "", "courtcast")
        .ok_or(ConfigError::NoConfigDir)?;
    load_config_from(dirs.config_dir())
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.source_keys.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "sources.keys".into(),
            message: "at least one recognized source key is required".into(),
        });
    }
    if config.league.id == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.id".into(),
            message: "league id must be nonzero".into(),
        });
    }
    if config.pool_query.limit == 0 {
        return Err(ConfigError::ValidationError {
            field: "pool_query.limit".into(),
            message: "pool query limit must be nonzero".into(),
        });
    }
    Ok(())
}
