use std::path::PathBuf;

use crate::annotations::EntityType;
use crate::app_config::{AppConfig, Environment, MAX_RETENTION_DAYS, MAX_WINDOW_DAYS};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.into(),
    }
}

/// Build application configuration using the provided env-var lookup function.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero"));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SPORTREND_ENV", "development"))?;
    let log_level = or_default("SPORTREND_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("SPORTREND_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SPORTREND_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "SPORTREND_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds SPORTREND_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("SPORTREND_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    let queries_path = PathBuf::from(or_default(
        "SPORTREND_QUERIES_PATH",
        "./config/queries.yaml",
    ));

    let feed_url = optional("SPORTREND_FEED_URL").map(|u| u.trim_end_matches('/').to_string());
    let feed_api_key = optional("SPORTREND_FEED_API_KEY");
    let feed_timeout_secs = parse_u64("SPORTREND_FEED_TIMEOUT_SECS", "30")?;
    let feed_user_agent = or_default("SPORTREND_FEED_USER_AGENT", "sportrend/0.1 (trend-collector)");
    let backoff_base_secs = parse_u64("SPORTREND_BACKOFF_BASE_SECS", "15")?;
    let backoff_cap_secs = parse_u64("SPORTREND_BACKOFF_CAP_SECS", "900")?;
    if backoff_cap_secs < backoff_base_secs {
        return Err(invalid(
            "SPORTREND_BACKOFF_CAP_SECS",
            format!("{backoff_cap_secs} is below SPORTREND_BACKOFF_BASE_SECS ({backoff_base_secs})"),
        ));
    }
    let max_retries = parse_u32("SPORTREND_MAX_RETRIES", "5")?;
    let inter_request_delay_ms = parse_u64("SPORTREND_INTER_REQUEST_DELAY_MS", "1000")?;
    let max_items_per_query = parse_positive_usize("SPORTREND_MAX_ITEMS_PER_QUERY", "100")?;

    let batch_size = parse_positive_usize("SPORTREND_BATCH_SIZE", "100")?;
    let enrich_concurrency = parse_positive_usize("SPORTREND_ENRICH_CONCURRENCY", "4")?;
    let stage_timeout_secs = parse_u64("SPORTREND_STAGE_TIMEOUT_SECS", "0")?;
    let claim_lease_secs = parse_u64("SPORTREND_CLAIM_LEASE_SECS", "600")?;
    let model_url = optional("SPORTREND_MODEL_URL").map(|u| u.trim_end_matches('/').to_string());

    let window_days = parse_u32("SPORTREND_WINDOW_DAYS", "7")?;
    if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
        return Err(invalid(
            "SPORTREND_WINDOW_DAYS",
            format!("must be between 1 and {MAX_WINDOW_DAYS}"),
        ));
    }
    let entity_types = parse_entity_types(&or_default(
        "SPORTREND_ENTITY_TYPES",
        "PLAYER,TEAM,COMPETITION",
    ))?;

    let pipeline_cron = or_default("SPORTREND_PIPELINE_CRON", "0 0 0 * * *");
    let retention_cron = or_default("SPORTREND_RETENTION_CRON", "0 30 3 * * *");
    let retention_days = parse_u32("SPORTREND_RETENTION_DAYS", "30")?;
    if retention_days > MAX_RETENTION_DAYS {
        return Err(invalid(
            "SPORTREND_RETENTION_DAYS",
            format!("must be at most {MAX_RETENTION_DAYS}"),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        queries_path,
        feed_url,
        feed_api_key,
        feed_timeout_secs,
        feed_user_agent,
        backoff_base_secs,
        backoff_cap_secs,
        max_retries,
        inter_request_delay_ms,
        max_items_per_query,
        batch_size,
        enrich_concurrency,
        stage_timeout_secs,
        claim_lease_secs,
        model_url,
        window_days,
        entity_types,
        pipeline_cron,
        retention_cron,
        retention_days,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(invalid(
            "SPORTREND_ENV",
            format!("unknown environment '{other}'"),
        )),
    }
}

/// Parse a comma-separated entity type list, dropping duplicates.
fn parse_entity_types(raw: &str) -> Result<Vec<EntityType>, ConfigError> {
    let mut types = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let entity_type = part
            .parse::<EntityType>()
            .map_err(|e| invalid("SPORTREND_ENTITY_TYPES", e.to_string()))?;
        if !types.contains(&entity_type) {
            types.push(entity_type);
        }
    }
    if types.is_empty() {
        return Err(invalid(
            "SPORTREND_ENTITY_TYPES",
            "at least one entity type is required",
        ));
    }
    Ok(types)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
