use anyhow::Context;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub case_server_url: String,
    pub account_lookup_url: String,
    pub party_lookup_url: String,
    pub lookup_timeout_secs: u64,
    pub lookup_failure_threshold: u32,
    pub lookup_reset_timeout_secs: u64,
    pub normalize_concurrency: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            case_server_url: parse_base_url("CASE_SERVER_URL", &env::var("CASE_SERVER_URL")?)?,
            account_lookup_url: parse_base_url(
                "ACCOUNT_LOOKUP_URL",
                &env::var("ACCOUNT_LOOKUP_URL")?,
            )?,
            party_lookup_url: parse_base_url("PARTY_LOOKUP_URL", &env::var("PARTY_LOOKUP_URL")?)?,
            lookup_timeout_secs: env::var("LOOKUP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("LOOKUP_TIMEOUT_SECS must be an integer")?,
            lookup_failure_threshold: env::var("LOOKUP_FAILURE_THRESHOLD")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("LOOKUP_FAILURE_THRESHOLD must be an integer")?,
            lookup_reset_timeout_secs: env::var("LOOKUP_RESET_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("LOOKUP_RESET_TIMEOUT_SECS must be an integer")?,
            normalize_concurrency: parse_concurrency(
                &env::var("NORMALIZE_CONCURRENCY").unwrap_or_else(|_| "8".to_string()),
            )?,
        })
    }
}

fn parse_base_url(name: &str, raw: &str) -> anyhow::Result<String> {
    let value = raw.trim();
    let url = Url::parse(value).with_context(|| format!("{} is not a valid URL", name))?;

    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("{} must use http or https", name);
    }

    Ok(value.trim_end_matches('/').to_string())
}

fn parse_concurrency(raw: &str) -> anyhow::Result<usize> {
    let value: usize = raw
        .trim()
        .parse()
        .context("NORMALIZE_CONCURRENCY must be an integer")?;

    if value == 0 {
        anyhow::bail!("NORMALIZE_CONCURRENCY must be at least 1");
    }

    Ok(value)
}
