//! # API configuration
//!
//! Reads server settings from environment variables.
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `API_HOST` | No | Bind address (default `0.0.0.0`) |
//! | `API_PORT` | **Yes** | Port |
//! | `DATABASE_URL` | **Yes** | PostgreSQL connection URL |
//! | `JWT_SECRET` | **Yes** | HS256 signing key |
//! | `ADMIN_LOGIN` | **Yes** | Platform administrator login |
//! | `ADMIN_PASSWORD` | **Yes** | Platform administrator password |
//! | `UPLOADS_DIR` | No | File storage root (default `./uploads`) |
//! | `TELEGRAM_BOT_TOKEN` | No | Telegram delivery disabled when unset |
//! | `ADMIN_CHAT_ID` | No | Telegram chat that receives the admin one-time code |

use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub admin_login: String,
    pub admin_password: String,
    pub uploads_dir: String,
    pub telegram_bot_token: Option<String>,
    pub admin_chat_id: Option<String>,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_port(&env::var("API_PORT").context("API_PORT is not set")?)?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            admin_login: env::var("ADMIN_LOGIN").context("ADMIN_LOGIN is not set")?,
            admin_password: env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD is not set")?,
            uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            admin_chat_id: env::var("ADMIN_CHAT_ID").ok(),
        })
    }
}

fn parse_port(value: &str) -> anyhow::Result<u16> {
    value
        .parse()
        .context("API_PORT must be a valid port number")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("8080", Some(8080))]
    #[case("1", Some(1))]
    #[case("", None)]
    #[case("not-a-port", None)]
    #[case("70000", None)]
    fn test_parse_port(#[case] value: &str, #[case] expected: Option<u16>) {
        assert_eq!(parse_port(value).ok(), expected);
    }
}
