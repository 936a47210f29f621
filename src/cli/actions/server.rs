use crate::api;
use crate::session::Language;
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub session_lookup_timeout_ms: u64,
    pub default_language: Language,
    pub frontend_base_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the signing secret is empty or the server fails to
/// start.
pub async fn execute(args: Args) -> Result<()> {
    let config = api::AuthConfig::new()
        .with_issuer(args.jwt_issuer)
        .with_audience(args.jwt_audience)
        .with_frontend_base_url(args.frontend_base_url)
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_lookup_timeout_ms(args.session_lookup_timeout_ms)
        .with_default_language(args.default_language);

    api::new(
        args.port,
        args.dsn,
        args.redis_url,
        SecretString::from(args.jwt_secret),
        config,
    )
    .await
}
