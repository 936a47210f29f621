use anyhow::{Context, Result};
use clap::{Arg, Command};

pub struct Options {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub session_lookup_timeout_ms: u64,
    pub default_language: String,
    pub frontend_base_url: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            jwt_secret: matches
                .get_one::<String>("jwt-secret")
                .cloned()
                .context("missing required argument: --jwt-secret")?,
            jwt_issuer: matches
                .get_one::<String>("jwt-issuer")
                .cloned()
                .unwrap_or_default(),
            jwt_audience: matches
                .get_one::<String>("jwt-audience")
                .cloned()
                .unwrap_or_default(),
            token_ttl_seconds: matches
                .get_one::<i64>("token-ttl-seconds")
                .copied()
                .unwrap_or(1800),
            session_ttl_seconds: matches
                .get_one::<i64>("session-ttl-seconds")
                .copied()
                .unwrap_or(43200),
            session_lookup_timeout_ms: matches
                .get_one::<u64>("session-lookup-timeout-ms")
                .copied()
                .unwrap_or(2000),
            default_language: matches
                .get_one::<String>("default-language")
                .cloned()
                .unwrap_or_else(|| "tr".to_string()),
            frontend_base_url: matches
                .get_one::<String>("frontend-base-url")
                .cloned()
                .unwrap_or_default(),
        })
    }
}

pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_session_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("jwt-secret")
                .long("jwt-secret")
                .help("HMAC signing secret for access tokens")
                .env("ANTREPO_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("jwt-issuer")
                .long("jwt-issuer")
                .help("Issuer claim stamped on access tokens")
                .env("ANTREPO_JWT_ISSUER")
                .default_value("https://identity.antrepo.dev"),
        )
        .arg(
            Arg::new("jwt-audience")
                .long("jwt-audience")
                .help("Audience claim stamped on access tokens")
                .env("ANTREPO_JWT_AUDIENCE")
                .default_value("antrepo"),
        )
        .arg(
            Arg::new("token-ttl-seconds")
                .long("token-ttl-seconds")
                .help("Access token TTL in seconds")
                .env("ANTREPO_TOKEN_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session record TTL in seconds")
                .env("ANTREPO_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("session-lookup-timeout-ms")
                .long("session-lookup-timeout-ms")
                .help("Per-backend timeout for session lookups in milliseconds")
                .env("ANTREPO_SESSION_LOOKUP_TIMEOUT_MS")
                .default_value("2000")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("default-language")
                .long("default-language")
                .help("Fallback language when Accept-Language is absent or unknown")
                .env("ANTREPO_DEFAULT_LANGUAGE")
                .default_value("tr")
                .value_parser(["tr", "en"]),
        )
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL allowed for CORS")
                .env("ANTREPO_FRONTEND_BASE_URL")
                .default_value("https://antrepo.dev"),
        )
}
