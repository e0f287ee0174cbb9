use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::model::Item;

const API: &str = "timeline";
const USER_TIMELINE_PATH: &str = "1.1/statuses/user_timeline.json";

/// Source of new timeline items for the watched account.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    /// Items newer than `since` (all recent items when `None`), newest-first.
    async fn fetch_since(&self, since: Option<&str>) -> Result<Vec<Item>>;
}

#[derive(Clone)]
pub struct TwitterTimeline {
    http: Client,
    base_url: Url,
    bearer_token: String,
    screen_name: String,
    count: u32,
    exclude_replies: bool,
    trim_user: bool,
}

impl fmt::Debug for TwitterTimeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterTimeline")
            .field("base_url", &self.base_url)
            .field("screen_name", &self.screen_name)
            .finish_non_exhaustive()
    }
}

/// Wire shape of a v1.1 status; everything besides these fields is ignored.
#[derive(Deserialize)]
struct Status {
    id_str: String,
    text: String,
}

impl Status {
    fn into_item(self) -> Item {
        Item {
            id: self.id_str,
            text: self.text,
        }
    }
}

impl TwitterTimeline {
    pub fn new(base_url: Url, bearer_token: String, screen_name: String) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("promo-watcher/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .context("failed to build timeline HTTP client")?;
        Ok(Self {
            http,
            base_url,
            bearer_token,
            screen_name,
            count: 100,
            exclude_replies: true,
            trim_user: true,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let tl = &cfg.timeline;
        let base_url = Url::parse(&tl.api_base).context("invalid timeline.api_base")?;
        let mut client = Self::new(base_url, tl.bearer_token.clone(), tl.screen_name.clone())?;
        client.count = tl.count;
        client.exclude_replies = tl.exclude_replies;
        client.trim_user = tl.trim_user;
        Ok(client)
    }

    pub fn build_request(&self, since: Option<&str>) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(USER_TIMELINE_PATH)
            .context("invalid timeline base URL")?;
        let mut query = vec![
            ("screen_name", self.screen_name.clone()),
            ("count", self.count.to_string()),
            ("exclude_replies", self.exclude_replies.to_string()),
            ("trim_user", self.trim_user.to_string()),
        ];
        if let Some(since_id) = since {
            query.push(("since_id", since_id.to_string()));
        }
        self.http
            .get(endpoint)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .query(&query)
            .build()
            .context("failed to build timeline request")
    }
}

/// Decode a user_timeline response body, keeping its order.
pub fn parse_statuses(body: &str) -> Result<Vec<Item>, ApiError> {
    let statuses: Vec<Status> =
        serde_json::from_str(body).map_err(|source| ApiError::Decode { api: API, source })?;
    Ok(statuses.into_iter().map(Status::into_item).collect())
}

#[async_trait]
impl TimelineSource for TwitterTimeline {
    async fn fetch_since(&self, since: Option<&str>) -> Result<Vec<Item>> {
        let request = self.build_request(since)?;
        debug!(url = %request.url(), "fetching timeline");

        let res = self
            .http
            .execute(request)
            .await
            .map_err(|source| ApiError::Transport { api: API, source })?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("rate limited by timeline API");
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Status { api: API, status, body }.into());
        }

        let body = res
            .text()
            .await
            .map_err(|source| ApiError::Transport { api: API, source })?;
        let items = parse_statuses(&body)?;
        info!(count = items.len(), since = since.unwrap_or("none"), "fetched timeline");
        Ok(items)
    }
}
