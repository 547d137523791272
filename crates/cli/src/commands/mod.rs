//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Error loading CLI settings from the environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Missing environment variable: STOREFRONT_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,
}

/// Storefront database URL, falling back to `DATABASE_URL`.
pub fn database_url() -> Result<SecretString, EnvError> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| EnvError::MissingDatabaseUrl)
}
