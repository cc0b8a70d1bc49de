use super::{Category, Record, Records, SearchEngine, SearchError};
use crate::types::SearchOptions;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_MAX_RESULTS: usize = 10;
const MAX_PAGES: u32 = 5;

#[derive(Debug, Clone)]
pub struct NetworkOptions {
    pub proxy: Option<String>,
    pub timeout: Option<Duration>,
    pub verify_tls: bool,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(Duration::from_secs(5)),
            verify_tls: true,
        }
    }
}

/// Blocking client for a SearXNG instance's JSON API.
///
/// Building this client on an async worker thread panics, and dropping it
/// blocks while its runtime thread shuts down. It is created inside the
/// worker pool and released on a blocking thread.
#[derive(Debug, Clone)]
pub struct SearxngClient {
    search_url: Url,
    client: Client,
}

// SearXNG API types
#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Default, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    engine: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnail_src: Option<String>,
    #[serde(default)]
    img_src: Option<String>,
    /// "1920 x 1080" style image size
    #[serde(default)]
    resolution: Option<String>,
    #[serde(default)]
    iframe_src: Option<String>,
    /// video length, e.g. "3:42"
    #[serde(default)]
    length: Option<Value>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(rename = "publishedDate", default)]
    published_date: Option<Value>,
}

impl SearxngClient {
    pub fn new(base_url: &str, network: &NetworkOptions) -> Result<Self, SearchError> {
        let search_url = Url::parse(&format!("{}/search", base_url.trim_end_matches('/')))
            .map_err(|e| SearchError::Config(format!("invalid SearXNG URL '{}': {}", base_url, e)))?;

        let mut builder = Client::builder()
            .user_agent("Search-API/1.0")
            .danger_accept_invalid_certs(!network.verify_tls);
        if let Some(timeout) = network.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = &network.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| SearchError::Config(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        info!("SearXNG search URL: {}", search_url);
        Ok(Self {
            search_url,
            client: builder.build()?,
        })
    }

    fn paginate(&self, category: Category, query: &str, options: &SearchOptions) -> Records {
        let limit = options
            .max_results
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);
        let first_page = options.page.unwrap_or(1).max(1);
        Box::new(Pages {
            client: self.clone(),
            category,
            params: build_params(category, query, options),
            next_page: first_page,
            pages_left: MAX_PAGES,
            remaining: limit,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            exhausted: limit == 0,
        })
    }

    fn fetch_page(
        &self,
        category: Category,
        params: &[(String, String)],
        page: u32,
    ) -> Result<Vec<Record>, SearchError> {
        debug!("Fetching {} page {} from {}", category, page, self.search_url);
        let resp = self
            .client
            .get(self.search_url.clone())
            .query(params)
            .query(&[("pageno", page.to_string())])
            .header("Accept", "application/json")
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            return Err(SearchError::Status { status, body });
        }

        let parsed: SearxngResponse = resp.json()?;
        debug!("SearXNG returned {} results", parsed.results.len());
        Ok(parsed
            .results
            .into_iter()
            .map(|result| to_record(category, result))
            .collect())
    }
}

impl SearchEngine for SearxngClient {
    fn text(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError> {
        Ok(self.paginate(Category::Text, query, options))
    }

    fn images(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError> {
        Ok(self.paginate(Category::Images, query, options))
    }

    fn videos(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError> {
        Ok(self.paginate(Category::Videos, query, options))
    }

    fn news(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError> {
        Ok(self.paginate(Category::News, query, options))
    }

    fn books(&self, query: &str, options: &SearchOptions) -> Result<Records, SearchError> {
        Ok(self.paginate(Category::Books, query, options))
    }
}

/// Pulls result pages on demand until `max_results` hits were yielded.
struct Pages {
    client: SearxngClient,
    category: Category,
    params: Vec<(String, String)>,
    next_page: u32,
    pages_left: u32,
    remaining: usize,
    buffer: VecDeque<Record>,
    seen: HashSet<String>,
    exhausted: bool,
}

impl Iterator for Pages {
    type Item = Result<Record, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        while self.buffer.is_empty() {
            if self.exhausted || self.pages_left == 0 {
                return None;
            }
            let page = self.next_page;
            self.next_page = self.next_page.saturating_add(1);
            self.pages_left -= 1;
            let records = match self.client.fetch_page(self.category, &self.params, page) {
                Ok(records) => records,
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            };
            if records.is_empty() {
                self.exhausted = true;
            }
            let field = self.category.mandatory_field();
            for record in records {
                // Unusable hits must not count against max_results
                if !self.category.accepts(&record) {
                    continue;
                }
                if let Some(key) = record.get(field).and_then(Value::as_str) {
                    if !self.seen.insert(key.to_owned()) {
                        continue;
                    }
                }
                self.buffer.push_back(record);
            }
        }
        self.remaining -= 1;
        self.buffer.pop_front().map(Ok)
    }
}

fn build_params(category: Category, query: &str, options: &SearchOptions) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("q".into(), query.to_string()),
        ("format".into(), "json".into()),
        ("categories".into(), searxng_category(category).into()),
    ];
    if let Some(region) = &options.region {
        params.push(("language".into(), region_to_language(region)));
    }
    if let Some(level) = options.safesearch.as_deref().and_then(safesearch_level) {
        params.push(("safesearch".into(), level.into()));
    }
    if let Some(limit) = &options.timelimit {
        match time_range(limit) {
            Some(range) => params.push(("time_range".into(), range.into())),
            None => debug!("Dropping unsupported timelimit '{}'", limit),
        }
    }
    if let Some(backend) = &options.backend {
        if !backend.is_empty() && backend != "auto" {
            params.push(("engines".into(), backend.clone()));
        }
    }
    for (key, value) in &options.extra {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Null => continue,
            other => other.to_string(),
        };
        params.push((key.clone(), value));
    }
    params
}

fn searxng_category(category: Category) -> &'static str {
    match category {
        Category::Text => "general",
        other => other.as_str(),
    }
}

/// `us-en` style regions become SearXNG `en-US` locales; `wt-wt` means any.
fn region_to_language(region: &str) -> String {
    if region.eq_ignore_ascii_case("wt-wt") {
        return "all".to_string();
    }
    match region.split_once('-') {
        Some((country, lang)) if country.len() == 2 && lang.len() == 2 => {
            format!("{}-{}", lang.to_ascii_lowercase(), country.to_ascii_uppercase())
        }
        _ => region.to_string(),
    }
}

fn safesearch_level(value: &str) -> Option<&'static str> {
    match value.to_ascii_lowercase().as_str() {
        "off" | "0" => Some("0"),
        "moderate" | "1" => Some("1"),
        "on" | "strict" | "2" => Some("2"),
        _ => None,
    }
}

fn time_range(limit: &str) -> Option<&'static str> {
    match limit {
        "d" | "day" => Some("day"),
        "w" | "week" => Some("week"),
        "m" | "month" => Some("month"),
        "y" | "year" => Some("year"),
        _ => None,
    }
}

fn value_as_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn parse_resolution(resolution: Option<&str>) -> (Option<u32>, Option<u32>) {
    let Some((w, h)) = resolution.and_then(|r| r.split_once(|c: char| c == 'x' || c == '×')) else {
        return (None, None);
    };
    (w.trim().parse().ok(), h.trim().parse().ok())
}

fn to_record(category: Category, r: SearxngResult) -> Record {
    let value = match category {
        Category::Text => json!({
            "title": r.title,
            "href": r.url,
            "body": r.content,
        }),
        Category::Images => {
            let (width, height) = parse_resolution(r.resolution.as_deref());
            json!({
                "title": r.title,
                "image": r.img_src,
                "thumbnail": r.thumbnail_src.or(r.thumbnail),
                "url": r.url,
                "height": height,
                "width": width,
                "source": r.engine,
            })
        }
        Category::Videos => {
            let images = r
                .thumbnail
                .as_ref()
                .map(|t| json!({ "large": t, "medium": t, "small": t }));
            json!({
                "title": r.title,
                "content": r.url,
                "description": r.content,
                "duration": value_as_string(r.length),
                "embed_url": r.iframe_src,
                "images": images,
                "provider": r.engine,
                "published": value_as_string(r.published_date),
                "publisher": r.publisher,
                "uploader": r.author,
            })
        }
        Category::News => json!({
            "title": r.title,
            "body": r.content,
            "url": r.url,
            "image": r.img_src.or(r.thumbnail),
            "date": value_as_string(r.published_date),
            "source": r.engine,
        }),
        Category::Books => json!({
            "title": r.title,
            "author": r.author,
            "publisher": r.publisher,
            "info": r.content,
            "url": r.url,
            "thumbnail": r.thumbnail.or(r.img_src),
        }),
    };
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
