pub mod api;
pub mod metrics;


pub use api::{RedditApiClient, RedditPostData, RedditUserData};

use harvest_core::{CoreError, RedditApiError};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, ResourceOwnerPassword,
    ResourceOwnerUsername, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Credentials of a Reddit "script" application.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { token: RedditToken },
    Failed { reason: String },
}

/// Source of posts for the collector.
#[allow(async_fn_in_trait)]
pub trait PostSource {
    async fn hot_posts(&self, subreddit: &str, limit: u32)
        -> Result<Vec<RedditPostData>, CoreError>;

    async fn search_posts(
        &self,
        subreddit: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<RedditPostData>, CoreError>;
}

/// An API session. Built once per run and only read after authentication.
#[derive(Debug)]
pub struct RedditClient {
    credentials: Option<RedditCredentials>,
    api: RedditApiClient,
    auth_state: AuthState,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(credentials.user_agent.clone())?;
        Ok(Self {
            credentials: Some(credentials),
            api,
            auth_state: AuthState::NotAuthenticated,
        })
    }

    /// A session with no credentials; every API call on it fails.
    pub fn unauthenticated(user_agent: &str) -> Result<Self, CoreError> {
        Ok(Self {
            credentials: None,
            api: RedditApiClient::new(user_agent.to_string())?,
            auth_state: AuthState::NotAuthenticated,
        })
    }

    pub async fn authenticate(&mut self) -> Result<RedditToken, CoreError> {
        let result = self.request_token().await;
        match &result {
            Ok(token) => {
                info!("Obtained Reddit access token");
                self.auth_state = AuthState::Authenticated {
                    token: token.clone(),
                };
            }
            Err(e) => {
                error!("Reddit authentication failed: {}", e);
                self.auth_state = AuthState::Failed {
                    reason: e.to_string(),
                };
            }
        }
        result
    }

    async fn request_token(&self) -> Result<RedditToken, CoreError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: "No credentials configured".to_string(),
            })
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| CoreError::Internal {
                message: format!("Invalid auth URL: {}", e),
            })?,
            Some(
                TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(|e| CoreError::Internal {
                    message: format!("Invalid token URL: {}", e),
                })?,
            ),
        );

        let username = ResourceOwnerUsername::new(credentials.username.clone());
        let password = ResourceOwnerPassword::new(credentials.password.clone());
        let http_client = self.api.http_client().clone();

        debug!("Requesting password-grant token for {}", credentials.username);
        let response = oauth_client
            .exchange_password(&username, &password)
            .request_async(|request| send_oauth_request(http_client, request))
            .await
            .map_err(|e| {
                CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: e.to_string(),
                })
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        Ok(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope,
        })
    }

    pub fn set_token(&mut self, token: RedditToken) {
        self.auth_state = AuthState::Authenticated { token };
    }

    pub fn get_auth_state(&self) -> &AuthState {
        &self.auth_state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&self.auth_state, AuthState::Authenticated { token } if !token.is_expired())
    }

    fn access_token(&self) -> Result<&str, CoreError> {
        match &self.auth_state {
            AuthState::Authenticated { token } if token.is_expired() => {
                Err(CoreError::RedditApi(RedditApiError::InvalidToken))
            }
            AuthState::Authenticated { token } => Ok(&token.access_token),
            AuthState::NotAuthenticated => {
                Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: "Not authenticated".to_string(),
                }))
            }
            AuthState::Failed { reason } => {
                Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: format!("Authentication previously failed: {}", reason),
                }))
            }
        }
    }

    pub async fn get_user_info(&self) -> Result<RedditUserData, CoreError> {
        let token = self.access_token()?;
        self.api.get_user_info(token).await
    }

    pub async fn get_api_metrics(&self) -> metrics::ApiMetrics {
        self.api.get_metrics().await
    }
}

impl PostSource for RedditClient {
    async fn hot_posts(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let token = self.access_token()?;
        self.api.get_hot_posts(token, subreddit, limit).await
    }

    async fn search_posts(
        &self,
        subreddit: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let token = self.access_token()?;
        self.api.search_posts(token, subreddit, query, limit).await
    }
}

/// Sends the token exchange through the session's HTTP client, carrying its user agent.
async fn send_oauth_request(
    client: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
