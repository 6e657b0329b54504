use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics};
use harvest_core::{permalink_url, CoreError, PostRecord, RedditApiError};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER: u64 = 60;

/// Reddit returns at most this many children per listing page.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// A submission as the listing endpoints return it. Link posts, galleries and
/// crossposts omit different fields, so everything not always present is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditPostData {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub subreddit: String,
    #[serde(default)]
    pub url: Option<String>,
    pub permalink: String,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub upvote_ratio: Option<f64>,
    #[serde(default)]
    pub is_self: Option<bool>,
    #[serde(default)]
    pub link_flair_text: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

impl RedditPostData {
    pub fn into_record(self, search_query: &str) -> PostRecord {
        let permalink = permalink_url(&self.permalink);
        let author = self
            .author
            .filter(|name| !name.is_empty() && name != "[deleted]");

        PostRecord {
            title: self.title,
            score: self.score,
            upvote_ratio: self.upvote_ratio,
            num_comments: self.num_comments,
            author,
            subreddit: self.subreddit,
            url: self.url.unwrap_or_else(|| permalink.clone()),
            permalink,
            created_utc: self.created_utc,
            is_self: self.is_self,
            selftext: self.selftext,
            flair: self.link_flair_text.filter(|flair| !flair.is_empty()),
            domain: self.domain,
            search_query: search_query.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    metrics: Arc<MetricsCollector>,
    user_agent: String,
    base_url: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_base_url(user_agent, REDDIT_API_BASE)
    }

    /// A client sending its requests to `base_url` instead of the public API host.
    pub fn with_base_url(user_agent: String, base_url: &str) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            metrics: Arc::new(MetricsCollector::new()),
            user_agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, String)],
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let start_time = Instant::now();

        info!("Making Reddit API request: {} {}", method, endpoint);
        let result = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .query(query_params)
            .send()
            .await;

        let (outcome, status_code) = match result {
            Ok(response) if response.status().is_success() => {
                debug!("Request successful: {} {}", response.status(), endpoint);
                let status = response.status().as_u16();
                (Ok(response), Some(status))
            }
            Ok(response) => {
                error!(
                    "Request failed with status: {} for {}",
                    response.status(),
                    endpoint
                );
                let status = response.status();
                (
                    Err(status_error(status, response.headers(), endpoint)),
                    Some(status.as_u16()),
                )
            }
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                let err = if e.is_timeout() {
                    CoreError::RedditApi(RedditApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                };
                (Err(err), None)
            }
        };

        let rate_limited = matches!(
            outcome,
            Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded { .. }))
        );
        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                status_code,
                response_time: start_time.elapsed(),
                success: outcome.is_ok(),
                rate_limited,
            })
            .await;

        outcome
    }

    pub async fn get_user_info(&self, access_token: &str) -> Result<RedditUserData, CoreError> {
        let response = self
            .make_request(Method::GET, "/api/v1/me", access_token, &[])
            .await?;

        let user_data: RedditUserData = response.json().await.map_err(|e| {
            error!("Failed to parse user data: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "Failed to parse user data".to_string(),
            })
        })?;

        debug!("Retrieved user info for: {}", user_data.name);
        Ok(user_data)
    }

    /// Currently popular posts of `subreddit`, up to `limit`.
    pub async fn get_hot_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/hot", subreddit);
        let posts = self
            .collect_listing(access_token, &endpoint, Vec::new(), limit)
            .await?;

        info!("Retrieved {} hot posts from r/{}", posts.len(), subreddit);
        Ok(posts)
    }

    /// Posts of `subreddit` matching `query`, up to `limit`.
    pub async fn search_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/search", subreddit);
        let params = vec![
            ("q", query.to_string()),
            ("restrict_sr", "on".to_string()),
            ("sort", "relevance".to_string()),
            ("t", "all".to_string()),
        ];
        let posts = self
            .collect_listing(access_token, &endpoint, params, limit)
            .await?;

        info!(
            "Retrieved {} posts matching '{}' from r/{}",
            posts.len(),
            query,
            subreddit
        );
        Ok(posts)
    }

    /// Walks listing pages via the `after` cursor until `limit` posts are
    /// collected or the listing runs out.
    async fn collect_listing(
        &self,
        access_token: &str,
        endpoint: &str,
        params: Vec<(&str, String)>,
        limit: u32,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let wanted = limit as usize;
        let mut posts = Vec::with_capacity(wanted.min(MAX_PAGE_SIZE as usize));
        let mut after: Option<String> = None;

        while posts.len() < wanted {
            let page_size = (wanted - posts.len()).min(MAX_PAGE_SIZE as usize);
            let mut query = params.clone();
            query.push(("limit", page_size.to_string()));
            query.push(("raw_json", "1".to_string()));
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }

            let response = self
                .make_request(Method::GET, endpoint, access_token, &query)
                .await?;
            let listing: RedditListing<serde_json::Value> = response.json().await.map_err(|e| {
                error!("Failed to parse listing for {}: {}", endpoint, e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Failed to parse listing for {}", endpoint),
                })
            })?;

            let page_len = listing.data.children.len();
            for child in listing.data.children {
                if child.kind != "t3" {
                    debug!("Skipping {} child in {}", child.kind, endpoint);
                    continue;
                }
                let post: RedditPostData = serde_json::from_value(child.data).map_err(|e| {
                    error!("Failed to parse post in {}: {}", endpoint, e);
                    CoreError::RedditApi(RedditApiError::InvalidResponse {
                        details: format!("Malformed post in listing for {}", endpoint),
                    })
                })?;
                posts.push(post);
            }
            debug!("Page of {} from {}, {} so far", page_len, endpoint, posts.len());

            after = listing.data.after;
            if page_len == 0 || after.is_none() {
                break;
            }
        }

        posts.truncate(wanted);
        Ok(posts)
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }
}

fn status_error(status: StatusCode, headers: &HeaderMap, endpoint: &str) -> CoreError {
    let api_error = match status.as_u16() {
        429 => {
            let retry_after = headers
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER);
            warn!("Rate limited, retry after {} seconds", retry_after);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        404 => RedditApiError::SubredditNotFound {
            subreddit: subreddit_of(endpoint).to_string(),
        },
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::InvalidResponse {
            details: format!("Unexpected status {} for {}", code, endpoint),
        },
    };
    CoreError::RedditApi(api_error)
}

fn subreddit_of(endpoint: &str) -> &str {
    endpoint
        .strip_prefix("/r/")
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(endpoint)
}
