//! Repository search for candidate (abandoned) projects.
//!
//! [`SearchRequest`] renders the search query and [`parse_search_response`]
//! reads the API's answer. [`GithubSearch`] sends the request over HTTP;
//! [`FixedProjects`] serves a fixed list for offline runs.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{AnnotatorError, AnnotatorResult};
use crate::guards::{search_page, SEARCH_ACCEPT_HEADER, SEARCH_API_VERSION, SEARCH_BASE_URL};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("annotator-core/", env!("CARGO_PKG_VERSION"));

/// Search criteria for candidate projects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub min_stars: u32,
    /// Only repositories last pushed before this date (`YYYY-MM-DD`).
    pub last_pushed_date: String,
    pub language: String,
    pub exclude_archived: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_stars: 100,
            last_pushed_date: "2022-01-01".to_string(),
            language: "java".to_string(),
            exclude_archived: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    pub url: String,
    pub query: String,
    pub per_page: usize,
    pub page: usize,
    pub headers: Vec<(String, String)>,
}

impl SearchRequest {
    pub fn build(config: &DiscoveryConfig, amount: usize) -> Self {
        let mut query = format!(
            "language:{} stars:>={} pushed:<{}",
            config.language, config.min_stars, config.last_pushed_date
        );
        if config.exclude_archived {
            query.push_str(" archived:false");
        }
        Self {
            url: SEARCH_BASE_URL.to_string(),
            query,
            per_page: amount,
            page: search_page(amount),
            headers: vec![
                ("Accept".to_string(), SEARCH_ACCEPT_HEADER.to_string()),
                ("X-GitHub-Api-Version".to_string(), SEARCH_API_VERSION.to_string()),
            ],
        }
    }

    /// Query-string parameters in request order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.query.clone()),
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}

/// A candidate project returned by the search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub name: String,
    pub html_url: String,
}

impl ProjectRef {
    pub fn clone_url(&self) -> String {
        format!("{}.git", self.html_url.trim_end_matches('/'))
    }
}

/// Read the `items` of a search response. A response without `items` is empty.
pub fn parse_search_response(body: &str) -> AnnotatorResult<Vec<ProjectRef>> {
    let value: Value = serde_json::from_str(body)?;
    let Some(items) = value.get("items") else {
        return Ok(Vec::new());
    };
    let items = items
        .as_array()
        .ok_or_else(|| AnnotatorError::Discovery("'items' is not an array".into()))?;

    let mut projects = Vec::with_capacity(items.len());
    for item in items {
        let project: ProjectRef = serde_json::from_value(item.clone())
            .map_err(|e| AnnotatorError::Discovery(format!("malformed search item: {e}")))?;
        projects.push(project);
    }
    debug!("Search returned {} projects", projects.len());
    Ok(projects)
}

/// Transport for repository search.
pub trait RepositorySearch {
    fn find_projects(&self, config: &DiscoveryConfig, amount: usize) -> AnnotatorResult<Vec<ProjectRef>>;
}

/// Returns a fixed list of projects, truncated to the requested amount.
#[derive(Clone, Debug, Default)]
pub struct FixedProjects(pub Vec<ProjectRef>);

impl RepositorySearch for FixedProjects {
    fn find_projects(&self, _config: &DiscoveryConfig, amount: usize) -> AnnotatorResult<Vec<ProjectRef>> {
        Ok(self.0.iter().take(amount).cloned().collect())
    }
}

/// Repository search against the GitHub search API.
pub struct GithubSearch {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl GithubSearch {
    pub fn new() -> AnnotatorResult<Self> {
        let http = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url: SEARCH_BASE_URL.to_string(),
            token: None,
        })
    }

    /// Send searches to `url` instead of the public API endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl RepositorySearch for GithubSearch {
    fn find_projects(&self, config: &DiscoveryConfig, amount: usize) -> AnnotatorResult<Vec<ProjectRef>> {
        let mut request = SearchRequest::build(config, amount);
        request.url = self.base_url.clone();
        info!("Searching repositories: {}", request.query);

        let mut builder = self.http.get(&request.url).query(&request.params());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(AnnotatorError::Discovery(format!(
                "search API returned {status}: {body}"
            )));
        }

        let mut projects = parse_search_response(&body)?;
        projects.truncate(amount);
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serve one canned HTTP response; the handle yields the raw request.
    fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}/search/repositories"), handle)
    }

    #[test]
    fn query_reflects_config() {
        let req = SearchRequest::build(&DiscoveryConfig::default(), 10);
        assert_eq!(req.query, "language:java stars:>=100 pushed:<2022-01-01");
        assert_eq!((req.per_page, req.page), (10, 1));

        let cfg = DiscoveryConfig {
            exclude_archived: true,
            ..Default::default()
        };
        let req = SearchRequest::build(&cfg, 250);
        assert!(req.query.ends_with(" archived:false"));
        assert_eq!(req.page, 2);
        assert_eq!(req.params()[2], ("page", "2".to_string()));
    }

    #[test]
    fn headers_pin_api_version() {
        let req = SearchRequest::build(&DiscoveryConfig::default(), 1);
        assert!(req
            .headers
            .contains(&("X-GitHub-Api-Version".to_string(), "2022-11-28".to_string())));
    }

    #[test]
    fn parses_items() {
        let body = r#"{"total_count":2,"items":[
            {"name":"alpha","html_url":"https://github.com/o/alpha","stargazers_count":120},
            {"name":"beta","html_url":"https://github.com/o/beta"}]}"#;
        let projects = parse_search_response(body).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].name, "beta");
        assert_eq!(projects[0].clone_url(), "https://github.com/o/alpha.git");
    }

    #[test]
    fn missing_items_is_empty() {
        assert!(parse_search_response(r#"{"message":"rate limited"}"#).unwrap().is_empty());
        assert!(matches!(
            parse_search_response(r#"{"items":[{"name":"x"}]}"#),
            Err(AnnotatorError::Discovery(_))
        ));
    }

    #[test]
    fn github_search_sends_query_and_headers() {
        let body = r#"{"items":[
            {"name":"alpha","html_url":"https://github.com/o/alpha"},
            {"name":"beta","html_url":"https://github.com/o/beta"},
            {"name":"gamma","html_url":"https://github.com/o/gamma"}]}"#;
        let (url, server) = serve_once("200 OK", body);
        let search = GithubSearch::new().unwrap().with_base_url(url).with_token("t0ken");

        let projects = search.find_projects(&DiscoveryConfig::default(), 2).unwrap();
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        let request = server.join().unwrap().to_lowercase();
        assert!(request.starts_with("get /search/repositories?q=language%3ajava"));
        assert!(request.contains("per_page=2&page=1"));
        assert!(request.contains("x-github-api-version: 2022-11-28"));
        assert!(request.contains("accept: application/vnd.github+json"));
        assert!(request.contains("authorization: bearer t0ken"));
    }

    #[test]
    fn github_search_rejection_is_discovery_error() {
        let (url, server) = serve_once("403 Forbidden", r#"{"message":"rate limited"}"#);
        let search = GithubSearch::new().unwrap().with_base_url(url);
        let err = search.find_projects(&DiscoveryConfig::default(), 5).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, AnnotatorError::Discovery(_)));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn fixed_projects_truncate() {
        let fixed = FixedProjects(vec![
            ProjectRef { name: "a".into(), html_url: "https://github.com/o/a".into() },
            ProjectRef { name: "b".into(), html_url: "https://github.com/o/b".into() },
        ]);
        assert_eq!(fixed.find_projects(&DiscoveryConfig::default(), 1).unwrap().len(), 1);
    }
}
