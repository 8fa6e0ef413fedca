//! Configuration loading from environment variables.
//!
//! Every key is prefixed with `GIGO_`. Only the database URL is required;
//! every other tunable falls back to the defaults of
//! [`LifecycleSettings`] and [`PullThroughSettings`].

use crate::pull_through::services::PullThroughSettings;
use crate::status::DEFAULT_QUEUE_DEPTH;
use crate::telemetry::{LogFormat, TelemetryConfig};
use crate::workspace::services::LifecycleSettings;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DATABASE_URL: &str = "GIGO_DATABASE_URL";
const OBJECT_STORE_ROOT: &str = "GIGO_OBJECT_STORE_ROOT";
const CREATE_EXPIRATION_MINUTES: &str = "GIGO_CREATE_EXPIRATION_MINUTES";
const REUSE_EXPIRATION_MINUTES: &str = "GIGO_REUSE_EXPIRATION_MINUTES";
const AGENT_EXTENSION_MINUTES: &str = "GIGO_AGENT_EXTENSION_MINUTES";
const AFK_CEILING_MINUTES: &str = "GIGO_AFK_CEILING_MINUTES";
const STATUS_QUEUE_DEPTH: &str = "GIGO_STATUS_QUEUE_DEPTH";
const OUTBOX_BATCH_SIZE: &str = "GIGO_OUTBOX_BATCH_SIZE";
const OUTBOX_POLL_SECONDS: &str = "GIGO_OUTBOX_POLL_SECONDS";
const OUTBOX_RETENTION_MINUTES: &str = "GIGO_OUTBOX_RETENTION_MINUTES";
const REAPER_INTERVAL_SECONDS: &str = "GIGO_REAPER_INTERVAL_SECONDS";
const RELEASE_BASE: &str = "GIGO_RELEASE_BASE";
const EXTENSION_REGISTRY: &str = "GIGO_EXTENSION_REGISTRY";
const USER_AGENT: &str = "GIGO_USER_AGENT";
const NEGOTIATION_TTL_SECONDS: &str = "GIGO_NEGOTIATION_TTL_SECONDS";
const NEGOTIATION_CANDIDATES: &str = "GIGO_NEGOTIATION_CANDIDATES";
const LOG_FILTER: &str = "GIGO_LOG_FILTER";
const LOG_FORMAT: &str = "GIGO_LOG_FORMAT";

const DEFAULT_OBJECT_STORE_ROOT: &str = "/var/lib/gigo/cache";
const DEFAULT_OUTBOX_POLL: Duration = Duration::from_secs(5);
const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(60);

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Offending variable.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// `PostgreSQL` connection URL.
    pub database_url: String,
    /// Root directory of the filesystem object store.
    pub object_store_root: PathBuf,
    /// Lifecycle expiration windows and outbox tunables.
    pub lifecycle: LifecycleSettings,
    /// Per-subscriber status queue depth.
    pub status_queue_depth: usize,
    /// Delay between outbox redelivery passes.
    pub outbox_poll_interval: Duration,
    /// Delay between expiration sweeps.
    pub reaper_interval: Duration,
    /// Upstream endpoints and negotiation tunables.
    pub pull_through: PullThroughSettings,
    /// Log filter and format.
    pub telemetry: TelemetryConfig,
}

impl OrchestratorConfig {
    /// Loads configuration from the process environment.
    ///
    /// A `.env` file in the working directory or one of its parents is
    /// loaded first when present. Variables already set in the environment
    /// take precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `GIGO_DATABASE_URL` is unset and
    /// [`ConfigError::Invalid`] when a value cannot be parsed.
    pub fn from_env() -> ConfigResult<Self> {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            tracing::warn!(error = %err, "failed to load .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a key to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `GIGO_DATABASE_URL` is absent and
    /// [`ConfigError::Invalid`] when a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);
        let database_url = env
            .string(DATABASE_URL)
            .ok_or(ConfigError::Missing(DATABASE_URL))?;

        let defaults = LifecycleSettings::default();
        let lifecycle = LifecycleSettings {
            create_expiration: env
                .minutes(CREATE_EXPIRATION_MINUTES)?
                .unwrap_or(defaults.create_expiration),
            reuse_expiration: env
                .minutes(REUSE_EXPIRATION_MINUTES)?
                .unwrap_or(defaults.reuse_expiration),
            agent_extension: env
                .minutes(AGENT_EXTENSION_MINUTES)?
                .unwrap_or(defaults.agent_extension),
            afk_ceiling: env
                .minutes(AFK_CEILING_MINUTES)?
                .unwrap_or(defaults.afk_ceiling),
            outbox_batch_size: env
                .positive(OUTBOX_BATCH_SIZE)?
                .unwrap_or(defaults.outbox_batch_size),
            outbox_retention: env
                .minutes(OUTBOX_RETENTION_MINUTES)?
                .unwrap_or(defaults.outbox_retention),
        };

        let cache_defaults = PullThroughSettings::default();
        let pull_through = PullThroughSettings {
            release_base: env
                .string(RELEASE_BASE)
                .unwrap_or(cache_defaults.release_base),
            extension_registry: env
                .string(EXTENSION_REGISTRY)
                .unwrap_or(cache_defaults.extension_registry),
            user_agent: env.string(USER_AGENT).unwrap_or(cache_defaults.user_agent),
            negotiation_ttl: env
                .seconds(NEGOTIATION_TTL_SECONDS)?
                .unwrap_or(cache_defaults.negotiation_ttl),
            negotiation_candidates: env
                .positive(NEGOTIATION_CANDIDATES)?
                .unwrap_or(cache_defaults.negotiation_candidates),
        };

        let telemetry_defaults = TelemetryConfig::default();
        let telemetry = TelemetryConfig {
            default_filter: env
                .string(LOG_FILTER)
                .unwrap_or(telemetry_defaults.default_filter),
            format: env
                .parsed::<LogFormat>(LOG_FORMAT)?
                .unwrap_or(telemetry_defaults.format),
        };

        Ok(Self {
            database_url,
            object_store_root: env
                .string(OBJECT_STORE_ROOT)
                .map_or_else(|| PathBuf::from(DEFAULT_OBJECT_STORE_ROOT), PathBuf::from),
            lifecycle,
            status_queue_depth: env
                .positive(STATUS_QUEUE_DEPTH)?
                .unwrap_or(DEFAULT_QUEUE_DEPTH),
            outbox_poll_interval: env
                .seconds(OUTBOX_POLL_SECONDS)?
                .unwrap_or(DEFAULT_OUTBOX_POLL),
            reaper_interval: env
                .seconds(REAPER_INTERVAL_SECONDS)?
                .unwrap_or(DEFAULT_REAPER_INTERVAL),
            pull_through,
            telemetry,
        })
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T>(&self, key: &'static str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|err| ConfigError::Invalid {
                    key,
                    reason: err.to_string(),
                })
            })
            .transpose()
    }

    fn positive(&self, key: &'static str) -> ConfigResult<Option<usize>> {
        match self.parsed::<usize>(key)? {
            Some(0) => Err(ConfigError::Invalid {
                key,
                reason: "must be greater than zero".to_owned(),
            }),
            other => Ok(other),
        }
    }

    fn minutes(&self, key: &'static str) -> ConfigResult<Option<chrono::Duration>> {
        Ok(self
            .positive_u32(key)?
            .map(|minutes| chrono::Duration::minutes(i64::from(minutes))))
    }

    fn seconds(&self, key: &'static str) -> ConfigResult<Option<Duration>> {
        Ok(self
            .positive_u32(key)?
            .map(|seconds| Duration::from_secs(u64::from(seconds))))
    }

    fn positive_u32(&self, key: &'static str) -> ConfigResult<Option<u32>> {
        match self.parsed::<u32>(key)? {
            Some(0) => Err(ConfigError::Invalid {
                key,
                reason: "must be greater than zero".to_owned(),
            }),
            other => Ok(other),
        }
    }
}
