//! GitHub REST client for browsing a user's repositories
//!
//! Unauthenticated, so responses are cached per process to stay inside the
//! rate limit. Directory listings and file contents come from the contents
//! API; file bodies arrive base64 encoded with embedded newlines.

use crate::error::{VoxError, VoxResult};
use base64::Engine as _;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

const API_BASE: &str = "https://api.github.com";
const REPO_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    pub updated_at: String,
}

/// One entry of a directory listing ("file" or "dir")
#[derive(Debug, Clone, Deserialize)]
pub struct GithubFile {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub download_url: Option<String>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

/// The contents API returns an object for a file path and an array for a
/// directory path
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<GithubFile>),
    Single(GithubFile),
}

pub struct GithubClient {
    http: reqwest::Client,
    repo_cache: Mutex<HashMap<String, Vec<GithubRepo>>>,
    contents_cache: Mutex<HashMap<String, Vec<GithubFile>>>,
    file_cache: Mutex<HashMap<String, String>>,
}

impl GithubClient {
    pub fn new() -> VoxResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("voxprep")
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            repo_cache: Mutex::new(HashMap::new()),
            contents_cache: Mutex::new(HashMap::new()),
            file_cache: Mutex::new(HashMap::new()),
        })
    }

    async fn get_checked(&self, url: &str, subject: &str) -> VoxResult<reqwest::Response> {
        debug!("GET {url}");
        let response = self.http.get(url).send().await?;
        match response.status().as_u16() {
            404 => Err(VoxError::Api(format!("{subject} not found"))),
            403 => Err(VoxError::Api(
                "GitHub rate limit exceeded; try again later".into(),
            )),
            s if !response.status().is_success() => {
                Err(VoxError::Api(format!("GitHub request failed: {s}")))
            }
            _ => Ok(response),
        }
    }

    /// Most recently updated public repositories for a user
    pub async fn list_repos(&self, username: &str) -> VoxResult<Vec<GithubRepo>> {
        if let Some(cached) = self.repo_cache.lock().await.get(username) {
            return Ok(cached.clone());
        }

        let url = format!(
            "{API_BASE}/users/{}/repos?sort=updated&per_page={REPO_PAGE_SIZE}",
            urlencoding::encode(username)
        );
        let repos: Vec<GithubRepo> = self
            .get_checked(&url, &format!("user '{username}'"))
            .await?
            .json()
            .await?;

        self.repo_cache
            .lock()
            .await
            .insert(username.to_string(), repos.clone());
        Ok(repos)
    }

    /// List a repository path. A file path yields a single-entry listing.
    pub async fn list_contents(
        &self,
        username: &str,
        repo: &str,
        path: &str,
    ) -> VoxResult<Vec<GithubFile>> {
        let cache_key = format!("{username}/{repo}/{path}");
        if let Some(cached) = self.contents_cache.lock().await.get(&cache_key) {
            return Ok(cached.clone());
        }

        let encoded_path = path
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!(
            "{API_BASE}/repos/{}/{}/contents/{encoded_path}",
            urlencoding::encode(username),
            urlencoding::encode(repo)
        );

        let body: ContentsResponse = self
            .get_checked(&url, &format!("path '{path}' in {username}/{repo}"))
            .await?
            .json()
            .await?;

        let mut files = match body {
            ContentsResponse::Listing(files) => files,
            ContentsResponse::Single(file) => vec![file],
        };
        // Directories first, then alphabetical, like the web UI
        files.sort_by(|a, b| (&a.kind, &a.name).cmp(&(&b.kind, &b.name)));

        self.contents_cache
            .lock()
            .await
            .insert(cache_key, files.clone());
        Ok(files)
    }

    /// Fetch and decode a file body given its contents API url
    pub async fn file_content(&self, url: &str) -> VoxResult<String> {
        if let Some(cached) = self.file_cache.lock().await.get(url) {
            return Ok(cached.clone());
        }

        let body: FileContent = self.get_checked(url, "file").await?.json().await?;
        let text = decode_content(&body.content, &body.encoding)?;

        self.file_cache
            .lock()
            .await
            .insert(url.to_string(), text.clone());
        Ok(text)
    }
}

/// Contents API bodies are base64 with newlines every 60 characters
fn decode_content(content: &str, encoding: &str) -> VoxResult<String> {
    if encoding != "base64" {
        return Err(VoxError::Api(format!(
            "unexpected content encoding '{encoding}'"
        )));
    }
    let stripped: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(stripped)
        .map_err(|e| VoxError::Api(format!("invalid base64 file body: {e}")))?;
    String::from_utf8(bytes).map_err(|e| VoxError::Api(format!("file is not UTF-8: {e}")))
}
