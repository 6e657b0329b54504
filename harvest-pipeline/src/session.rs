//! Turns a dotenv-style secrets file into an API session.
//!
//! A missing or incomplete secrets file is not fatal: the caller still gets a
//! session, and the fetches made with it fail and are reported by the collector.

use harvest_core::{ConfigError, CoreError, ErrorExt};
use reddit_client::{RedditClient, RedditCredentials};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const CLIENT_ID_KEY: &str = "REDDIT_CLIENT_ID";
pub const CLIENT_SECRET_KEY: &str = "REDDIT_CLIENT_SECRET";
pub const USERNAME_KEY: &str = "REDDIT_USERNAME";
pub const PASSWORD_KEY: &str = "REDDIT_PASSWORD";
pub const USER_AGENT_KEY: &str = "REDDIT_USER_AGENT";

/// Printed when the secrets file does not parse.
pub const QUOTING_HINT: &str =
    "Values containing spaces must be quoted, e.g. REDDIT_USER_AGENT=\"my-app/0.1 by my_username\"";

/// User agent for sessions built without a secrets file.
pub const FALLBACK_USER_AGENT: &str = "subreddit-harvest/0.1";

pub fn load_credentials(path: &Path) -> Result<RedditCredentials, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let entries = dotenvy::from_path_iter(path).map_err(|e| ConfigError::InvalidFormat {
        details: e.to_string(),
    })?;

    let mut values = HashMap::new();
    for entry in entries {
        let (key, value) = entry.map_err(|e| ConfigError::InvalidFormat {
            details: e.to_string(),
        })?;
        values.insert(key, value);
    }

    let mut take = |key: &str| -> Result<String, ConfigError> {
        values
            .remove(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: key.to_string(),
            })
    };

    Ok(RedditCredentials {
        client_id: take(CLIENT_ID_KEY)?,
        client_secret: take(CLIENT_SECRET_KEY)?,
        username: take(USERNAME_KEY)?,
        password: take(PASSWORD_KEY)?,
        user_agent: take(USER_AGENT_KEY)?,
    })
}

/// Loads credentials from `path` and authenticates.
///
/// Only a failure to build the HTTP client is returned as an error; credential
/// and authentication problems are printed and yield an unauthenticated session.
pub async fn connect(path: &Path) -> Result<RedditClient, CoreError> {
    let credentials = match load_credentials(path) {
        Ok(credentials) => {
            println!("✅ Environment variables loaded from {}!", path.display());
            credentials
        }
        Err(e) => {
            e.log_warn();
            match &e {
                ConfigError::FileNotFound { .. } => {
                    println!(
                        "❌ Error: '{}' not found. Environment variables not loaded.",
                        path.display()
                    );
                    println!("Please ensure the secrets file exists at the configured path.");
                }
                ConfigError::InvalidFormat { details } => {
                    println!("❌ Error: could not parse {}: {}", path.display(), details);
                    println!("{}", QUOTING_HINT);
                }
                _ => println!("❌ Error: {}", e.user_friendly_message()),
            }
            return RedditClient::unauthenticated(FALLBACK_USER_AGENT);
        }
    };

    let mut client = RedditClient::new(credentials)?;
    if let Err(e) = client.authenticate().await {
        println!("❌ Reddit authentication failed: {}", e.user_friendly_message());
        return Ok(client);
    }

    println!("✅ Reddit API authenticated successfully!");
    match client.get_user_info().await {
        Ok(user) => {
            info!("Authenticated as {}", user.name);
            println!("Connected as: {}", user.name);
        }
        Err(e) => warn!("Could not look up the authenticated account: {}", e),
    }

    Ok(client)
}
