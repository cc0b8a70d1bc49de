use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MAX_RESULTS_LIMIT: u32 = 100;

/// Options forwarded to the search backend together with the query.
///
/// Also the shape of `DEFAULT_SEARCH_PARAMS`: any key other than the common
/// ones lands in `extra` and is passed through untouched.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safesearch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timelimit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchOptions {
    /// Layer `overrides` on top of `self`; fields set in `overrides` win.
    pub fn merged_with(&self, overrides: &SearchOptions) -> SearchOptions {
        let mut merged = self.clone();
        if overrides.region.is_some() {
            merged.region = overrides.region.clone();
        }
        if overrides.safesearch.is_some() {
            merged.safesearch = overrides.safesearch.clone();
        }
        if overrides.timelimit.is_some() {
            merged.timelimit = overrides.timelimit.clone();
        }
        if overrides.max_results.is_some() {
            merged.max_results = overrides.max_results;
        }
        if overrides.page.is_some() {
            merged.page = overrides.page;
        }
        if overrides.backend.is_some() {
            merged.backend = overrides.backend.clone();
        }
        for (key, value) in &overrides.extra {
            merged.extra.insert(key.clone(), value.clone());
        }
        merged
    }

    fn set_extra(&mut self, key: &str, value: &Option<String>) {
        if let Some(v) = value {
            self.extra.insert(key.to_string(), Value::String(v.clone()));
        }
    }
}

/// Fields shared by every search endpoint.
///
/// Kept free of `#[serde(flatten)]` so it also decodes from a query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub safesearch: Option<String>,
    #[serde(default)]
    pub timelimit: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub backend: Option<String>,
}

impl SearchRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.query.is_empty() {
            return Err("query must not be empty".to_string());
        }
        validate_max_results(self.max_results)?;
        if self.page == Some(0) {
            return Err("page must be greater than or equal to 1".to_string());
        }
        Ok(())
    }

    /// Request fields over the configured defaults.
    pub fn to_options(&self, defaults: &SearchOptions) -> SearchOptions {
        defaults.merged_with(&SearchOptions {
            region: self.region.clone(),
            safesearch: self.safesearch.clone(),
            timelimit: self.timelimit.clone(),
            max_results: self.max_results,
            page: self.page,
            backend: self.backend.clone(),
            extra: Map::new(),
        })
    }
}

pub fn validate_max_results(max_results: Option<u32>) -> Result<(), String> {
    match max_results {
        Some(n) if n == 0 || n > MAX_RESULTS_LIMIT => Err(format!(
            "max_results must be between 1 and {}",
            MAX_RESULTS_LIMIT
        )),
        _ => Ok(()),
    }
}

pub type TextSearchRequest = SearchRequest;
pub type NewsSearchRequest = SearchRequest;
pub type BooksSearchRequest = SearchRequest;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagesSearchRequest {
    #[serde(flatten)]
    pub base: SearchRequest,
    /// Small, Medium, Large, Wallpaper
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// photo, clipart, gif, transparent, line
    #[serde(default)]
    pub type_image: Option<String>,
    /// Square, Tall, Wide
    #[serde(default)]
    pub layout: Option<String>,
    /// any, Public, Share, Modify, ModifyCommercially
    #[serde(default)]
    pub license_image: Option<String>,
}

impl ImagesSearchRequest {
    pub fn to_options(&self, defaults: &SearchOptions) -> SearchOptions {
        let mut options = self.base.to_options(defaults);
        options.set_extra("size", &self.size);
        options.set_extra("color", &self.color);
        options.set_extra("type_image", &self.type_image);
        options.set_extra("layout", &self.layout);
        options.set_extra("license_image", &self.license_image);
        options
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideosSearchRequest {
    #[serde(flatten)]
    pub base: SearchRequest,
    /// high, standard
    #[serde(default)]
    pub resolution: Option<String>,
    /// short, medium, long
    #[serde(default)]
    pub duration: Option<String>,
    /// creativeCommon, youtube
    #[serde(default)]
    pub license_videos: Option<String>,
}

impl VideosSearchRequest {
    pub fn to_options(&self, defaults: &SearchOptions) -> SearchOptions {
        let mut options = self.base.to_options(defaults);
        options.set_extra("resolution", &self.resolution);
        options.set_extra("duration", &self.duration);
        options.set_extra("license_videos", &self.license_videos);
        options
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// Result items returned by the agent tools

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TextSearchItem {
    /// web title
    #[serde(default)]
    pub title: String,
    /// url
    pub href: String,
    /// summary
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImagesSearchItem {
    #[serde(default)]
    pub title: String,
    /// image url
    pub image: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// web url where image is from
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    /// search engine source
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VideosSearchItem {
    #[serde(default)]
    pub title: String,
    /// web url where video is from
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    /// thumbnail urls keyed by size
    #[serde(default)]
    pub images: Option<Map<String, Value>>,
    #[serde(default)]
    pub provider: Option<String>,
    /// published time (UTC)
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewsSearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BooksSearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    pub url: String,
    /// cover url
    #[serde(default)]
    pub thumbnail: Option<String>,
}
