//! Data acquisition client: one method per repository resource
//!
//! Optional sub-resources (README, community profile, governance files,
//! badge) come back as `None`/empty on 404. Everything else that is not a
//! success is surfaced as an [`ApiError`].

use super::conditional::{Conditional, ConditionalRequestCache};
use super::foundation::{self, FoundationTier};
use super::retry::{RetryPolicy, RetryScheduler, Sleeper, TokioSleeper};
use super::transport::{ApiRequest, RawResponse, Transport, UreqTransport};
use super::ttl::TtlCache;
use super::types::{
    BadgeProject, Commit, CommunityProfile, Contributor, GovernanceFiles, Issue, PullRequest,
    Release, Repository, GOVERNANCE_PATHS,
};
use super::{ApiError, ApiResult, Fetched, RepoId};
use chrono::{DateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const API_VERSION: &str = "2022-11-28";

/// State filter for issue and pull-request lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Open,
    Closed,
    All,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Open => "open",
            ItemState::Closed => "closed",
            ItemState::All => "all",
        }
    }
}

/// Connection settings for [`DataClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub base_url: String,
    pub badge_url: String,
    pub user_agent: String,
    pub token: Option<String>,
    pub per_page: u32,
    pub max_pages: u32,
    pub badge_ttl: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            badge_url: "https://www.bestpractices.dev".to_string(),
            user_agent: concat!("repohealth/", env!("CARGO_PKG_VERSION")).to_string(),
            token: None,
            per_page: 100,
            max_pages: 5,
            badge_ttl: Duration::from_secs(3600),
        }
    }
}

/// How a single endpoint is requested and which statuses mean "no data"
struct Endpoint {
    resource: &'static str,
    path: String,
    params: Vec<(&'static str, String)>,
    accept: &'static str,
    absent_statuses: &'static [u16],
}

impl Endpoint {
    fn required(resource: &'static str, path: String) -> Self {
        Self {
            resource,
            path,
            params: Vec::new(),
            accept: JSON_MEDIA_TYPE,
            absent_statuses: &[],
        }
    }

    fn optional(resource: &'static str, path: String) -> Self {
        Self {
            absent_statuses: &[404],
            ..Self::required(resource, path)
        }
    }

    fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }
}

pub struct DataClient<T, S = TokioSleeper> {
    transport: T,
    retry: RetryScheduler<S>,
    cache: Arc<ConditionalRequestCache>,
    badges: TtlCache<Option<String>>,
    options: ClientOptions,
}

impl DataClient<UreqTransport, TokioSleeper> {
    /// Production client: ureq transport, tokio timer, fresh cache
    pub fn with_ureq(options: ClientOptions, policy: RetryPolicy, timeout: Duration) -> Self {
        Self::new(
            UreqTransport::new(timeout),
            RetryScheduler::new(policy),
            Arc::new(ConditionalRequestCache::new()),
            options,
        )
    }
}

impl<T: Transport, S: Sleeper> DataClient<T, S> {
    pub fn new(
        transport: T,
        retry: RetryScheduler<S>,
        cache: Arc<ConditionalRequestCache>,
        options: ClientOptions,
    ) -> Self {
        let badges = TtlCache::new(options.badge_ttl);
        Self {
            transport,
            retry,
            cache,
            badges,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<ConditionalRequestCache> {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry(&self) -> &RetryScheduler<S> {
        &self.retry
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Repository metadata. A missing repository is an error.
    pub async fn get_repository(&self, repo: &RepoId) -> ApiResult<Fetched<Repository>> {
        let endpoint = Endpoint::required("repository", repo_path(repo, ""));
        let fetched = self.fetch(&endpoint).await?;
        let from_cache = fetched.from_cache;
        let payload = fetched.data.ok_or_else(|| ApiError::NotFound {
            resource: repo.full_name(),
        })?;
        Ok(Fetched::new(decode(endpoint.resource, &payload)?, from_cache))
    }

    /// Commits authored since the start of `since`'s UTC day. The day
    /// granularity keeps the cache key stable across runs on the same day.
    pub async fn get_commits(
        &self,
        repo: &RepoId,
        since: DateTime<Utc>,
    ) -> ApiResult<Fetched<Vec<Commit>>> {
        let day_start = Utc.from_utc_datetime(&since.date_naive().and_time(NaiveTime::MIN));
        let mut endpoint = Endpoint::required("commits", repo_path(repo, "/commits"))
            .param("since", day_start.to_rfc3339_opts(SecondsFormat::Secs, true));
        // An empty repository answers 409
        endpoint.absent_statuses = &[409];
        self.fetch_list(endpoint).await
    }

    pub async fn get_contributors(&self, repo: &RepoId) -> ApiResult<Fetched<Vec<Contributor>>> {
        let endpoint = Endpoint::required("contributors", repo_path(repo, "/contributors"));
        self.fetch_list(endpoint).await
    }

    /// Issues in `state`, with pull requests filtered out
    pub async fn get_issues(
        &self,
        repo: &RepoId,
        state: ItemState,
    ) -> ApiResult<Fetched<Vec<Issue>>> {
        let endpoint =
            Endpoint::required("issues", repo_path(repo, "/issues")).param("state", state.as_str());
        let fetched: Fetched<Vec<Issue>> = self.fetch_list(endpoint).await?;
        Ok(fetched.map(|issues| {
            issues
                .into_iter()
                .filter(|issue| !issue.is_pull_request())
                .collect()
        }))
    }

    pub async fn get_pull_requests(
        &self,
        repo: &RepoId,
        state: ItemState,
    ) -> ApiResult<Fetched<Vec<PullRequest>>> {
        let endpoint = Endpoint::required("pull requests", repo_path(repo, "/pulls"))
            .param("state", state.as_str());
        self.fetch_list(endpoint).await
    }

    pub async fn get_releases(&self, repo: &RepoId) -> ApiResult<Fetched<Vec<Release>>> {
        let endpoint = Endpoint::required("releases", repo_path(repo, "/releases"));
        self.fetch_list(endpoint).await
    }

    pub async fn get_community_profile(
        &self,
        repo: &RepoId,
    ) -> ApiResult<Fetched<Option<CommunityProfile>>> {
        let endpoint =
            Endpoint::optional("community profile", repo_path(repo, "/community/profile"));
        let fetched = self.fetch(&endpoint).await?;
        let from_cache = fetched.from_cache;
        let profile = match fetched.data {
            Some(payload) => Some(decode(endpoint.resource, &payload)?),
            None => None,
        };
        Ok(Fetched::new(profile, from_cache))
    }

    /// README text, `None` when the repository has none
    pub async fn get_readme(&self, repo: &RepoId) -> ApiResult<Fetched<Option<String>>> {
        let mut endpoint = Endpoint::optional("readme", repo_path(repo, "/readme"));
        endpoint.accept = RAW_MEDIA_TYPE;
        self.fetch(&endpoint).await
    }

    /// Probe each governance path; a 404 means the file does not exist
    pub async fn get_governance_files(&self, repo: &RepoId) -> ApiResult<Fetched<GovernanceFiles>> {
        let mut found = Vec::new();
        let mut from_cache = true;
        for path in GOVERNANCE_PATHS {
            let endpoint =
                Endpoint::optional("governance file", repo_path(repo, &format!("/contents/{path}")));
            let fetched = self.fetch(&endpoint).await?;
            from_cache &= fetched.from_cache;
            if fetched.data.is_some() {
                found.push(path.to_string());
            }
        }
        debug!("{}: governance files found: {:?}", repo, found);
        Ok(Fetched::new(GovernanceFiles { found }, from_cache))
    }

    /// Best-practices badge level (`none` when the project is not
    /// registered, `None` when the lookup has no data for it)
    pub async fn get_external_badge(&self, repo: &RepoId) -> ApiResult<Fetched<Option<String>>> {
        let key = format!("badge:{}", repo.full_name().to_lowercase());
        let project_url = format!("https://github.com/{}", repo.full_name());
        let url = format!(
            "{}/projects.json?url={}",
            self.options.badge_url.trim_end_matches('/'),
            encode_query_value(&project_url)
        );

        self.badges
            .get_or_fetch(&key, || async {
                let response = self
                    .retry
                    .run("badge", || self.send(ApiRequest::get(url.as_str())))
                    .await?;
                match response.status {
                    404 => Ok(None),
                    s if (200..300).contains(&s) => {
                        let projects: Vec<BadgeProject> = decode_list("badge", &response.body)?;
                        Ok(Some(badge_level(&projects)))
                    }
                    s => Err(ApiError::from_status(
                        s,
                        response.rate_limit_remaining,
                        "badge",
                        &response.body,
                    )),
                }
            })
            .await
    }

    /// Foundation affiliation from repository metadata and README
    pub async fn detect_foundation_affiliation(
        &self,
        repo: &RepoId,
    ) -> ApiResult<Fetched<Option<FoundationTier>>> {
        let (repository, readme) =
            tokio::try_join!(self.get_repository(repo), self.get_readme(repo))?;
        let tier = foundation::detect(&repository.data, readme.data.as_deref());
        Ok(Fetched::new(tier, repository.from_cache && readme.from_cache))
    }

    /// Paginated list fetch. Stops at the first short page or `max_pages`.
    async fn fetch_list<I: DeserializeOwned>(&self, endpoint: Endpoint) -> ApiResult<Fetched<Vec<I>>> {
        let per_page = self.options.per_page.max(1);
        let mut items = Vec::new();
        let mut from_cache = true;

        for page in 1..=self.options.max_pages.max(1) {
            let page_endpoint = Endpoint {
                resource: endpoint.resource,
                path: endpoint.path.clone(),
                params: endpoint
                    .params
                    .iter()
                    .cloned()
                    .chain([("per_page", per_page.to_string()), ("page", page.to_string())])
                    .collect(),
                accept: endpoint.accept,
                absent_statuses: endpoint.absent_statuses,
            };

            let fetched = self.fetch(&page_endpoint).await?;
            from_cache &= fetched.from_cache;
            let Some(payload) = fetched.data else {
                from_cache = false;
                break;
            };

            let batch: Vec<I> = decode_list(endpoint.resource, &payload)?;
            let count = batch.len();
            items.extend(batch);
            if count < per_page as usize {
                break;
            }
        }

        debug!("{}: {} items (cached: {})", endpoint.path, items.len(), from_cache);
        Ok(Fetched::new(items, from_cache))
    }

    /// Conditional fetch of one endpoint, retrying the underlying call
    async fn fetch(&self, endpoint: &Endpoint) -> ApiResult<Fetched<Option<String>>> {
        let url = build_url(&self.options.base_url, &endpoint.path, &endpoint.params);
        let params: Vec<(&str, String)> = endpoint
            .params
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();

        self.cache
            .fetch_conditional(&endpoint.path, &params, |etag| {
                let url = url.as_str();
                async move {
                    self.retry
                        .run(endpoint.resource, || {
                            self.send_conditional(endpoint, url, etag.as_deref())
                        })
                        .await
                }
            })
            .await
    }

    async fn send_conditional(
        &self,
        endpoint: &Endpoint,
        url: &str,
        etag: Option<&str>,
    ) -> ApiResult<Conditional> {
        let mut request = ApiRequest::get(url).header("Accept", endpoint.accept);
        if let Some(etag) = etag {
            request = request.header("If-None-Match", etag);
        }
        let response = self.send(request).await?;
        classify(endpoint, response)
    }

    /// Send with the common headers
    async fn send(&self, request: ApiRequest) -> ApiResult<RawResponse> {
        let mut request = request
            .header("User-Agent", self.options.user_agent.as_str())
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.options.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        self.transport.get(request).await
    }
}

fn classify(endpoint: &Endpoint, response: RawResponse) -> ApiResult<Conditional> {
    match response.status {
        304 => Ok(Conditional::NotModified),
        s if (200..300).contains(&s) => Ok(Conditional::Modified {
            etag: response.etag,
            payload: response.body,
        }),
        s if endpoint.absent_statuses.contains(&s) => Ok(Conditional::Absent),
        s => Err(ApiError::from_status(
            s,
            response.rate_limit_remaining,
            endpoint.resource,
            &response.body,
        )),
    }
}

fn repo_path(repo: &RepoId, suffix: &str) -> String {
    format!("/repos/{}/{}{}", repo.owner, repo.name, suffix)
}

fn build_url(base: &str, path: &str, params: &[(&'static str, String)]) -> String {
    let base = base.trim_end_matches('/');
    if params.is_empty() {
        return format!("{base}{path}");
    }
    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{k}={}", encode_query_value(v)))
        .collect();
    format!("{base}{path}?{}", query.join("&"))
}

/// Percent-encode everything except unreserved characters and `:` `/`
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b':' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn badge_level(projects: &[BadgeProject]) -> String {
    projects
        .first()
        .and_then(|p| p.badge_level.as_deref())
        .map(|level| level.trim().to_lowercase().replace([' ', '-'], "_"))
        .filter(|level| !level.is_empty())
        .unwrap_or_else(|| "none".to_string())
}

fn decode<D: DeserializeOwned>(resource: &str, payload: &str) -> ApiResult<D> {
    serde_json::from_str(payload).map_err(|e| ApiError::Decode {
        resource: resource.to_string(),
        message: e.to_string(),
    })
}

/// Lists may come back as an empty body (204 for empty repositories)
fn decode_list<D: DeserializeOwned>(resource: &str, payload: &str) -> ApiResult<Vec<D>> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    decode(resource, payload)
}
