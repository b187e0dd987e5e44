use crate::pipeline::Stage;
use crate::retry::RetryPolicy;
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Neo4jSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub query_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub movies: PathBuf,
    pub ratings: PathBuf,
    pub tags: PathBuf,
    pub links: PathBuf,
}

impl SourcePaths {
    /// Path of the CSV feeding `stage`; genre seeding has no file.
    pub fn for_stage(&self, stage: Stage) -> Option<&PathBuf> {
        match stage {
            Stage::Genres => None,
            Stage::Movies => Some(&self.movies),
            Stage::Ratings => Some(&self.ratings),
            Stage::Tags => Some(&self.tags),
            Stage::Links => Some(&self.links),
        }
    }
}

/// Per-source record caps. `None` means read the whole file.
#[derive(Debug, Clone, Default)]
pub struct RecordLimits {
    pub movies: Option<usize>,
    pub ratings: Option<usize>,
    pub tags: Option<usize>,
    pub links: Option<usize>,
}

impl RecordLimits {
    pub fn for_stage(&self, stage: Stage) -> Option<usize> {
        match stage {
            Stage::Genres => None,
            Stage::Movies => self.movies,
            Stage::Ratings => self.ratings,
            Stage::Tags => self.tags,
            Stage::Links => self.links,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub neo4j: Neo4jSettings,
    pub sources: SourcePaths,
    pub limits: RecordLimits,
    pub retry: RetryPolicy,
    pub strict_references: bool,
    pub ensure_constraints: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Unset and empty
    /// variables both fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let uri = match get("NEO4J_URI") {
            Some(uri) => uri,
            None => {
                let host = get("NEO4J_HOST").unwrap_or_else(|| "localhost".to_string());
                format!("bolt://{}:7687", host)
            }
        };

        let data_dir = PathBuf::from(get("DATA_PATH").unwrap_or_else(|| "data".to_string()));
        let source = |key: &str, file: &str| get(key).map(PathBuf::from).unwrap_or_else(|| data_dir.join(file));

        let retry = RetryPolicy {
            max_attempts: parse_or(&get, "CONNECT_MAX_ATTEMPTS", 8u32)?,
            initial_backoff: Duration::from_millis(parse_or(&get, "CONNECT_INITIAL_BACKOFF_MS", 1000u64)?),
            max_backoff: Duration::from_millis(parse_or(&get, "CONNECT_MAX_BACKOFF_MS", 30_000u64)?),
            attempt_timeout: Duration::from_secs(parse_or(&get, "CONNECT_TIMEOUT_SECS", 10u64)?),
        };
        if retry.max_attempts == 0 {
            bail!("CONNECT_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            neo4j: Neo4jSettings {
                uri,
                user: get("NEO4J_USER").unwrap_or_else(|| "neo4j".to_string()),
                password: get("NEO4J_PASSWORD").unwrap_or_else(|| "password".to_string()),
                query_timeout: Duration::from_secs(parse_or(&get, "QUERY_TIMEOUT_SECS", 30u64)?),
            },
            sources: SourcePaths {
                movies: source("MOVIES_CSV", "movies.csv"),
                ratings: source("RATINGS_CSV", "ratings.csv"),
                tags: source("TAGS_CSV", "tags.csv"),
                links: source("LINKS_CSV", "links.csv"),
            },
            limits: RecordLimits {
                movies: parse_opt(&get, "MAX_MOVIES")?,
                ratings: parse_opt(&get, "MAX_RATINGS")?,
                tags: parse_opt(&get, "MAX_TAGS")?,
                links: parse_opt(&get, "MAX_LINKS")?,
            },
            retry,
            strict_references: parse_or(&get, "STRICT_REFERENCES", false)?,
            ensure_constraints: parse_or(&get, "ENSURE_CONSTRAINTS", true)?,
        })
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}
