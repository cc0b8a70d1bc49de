//! Process-wide settings.
//!
//! Every option can be given on the command line or through the environment
//! variable named next to it.

use crate::engine::{Category, NetworkOptions};
use crate::pool::DEFAULT_CAPACITY;
use crate::types::SearchOptions;
use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_TOOL_MAX_RESULTS: u32 = 10;

#[derive(Debug, Clone, Parser)]
#[command(name = "search-api", version, about = "HTTP and MCP front for a metasearch backend")]
pub struct Settings {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Base URL of the SearXNG instance
    #[arg(long, env = "SEARXNG_URL", default_value = "http://localhost:8888")]
    pub searxng_url: String,

    /// Proxy for backend requests (http, https or socks5 URL)
    #[arg(long, env = "SEARCH_PROXY")]
    pub proxy: Option<String>,

    /// Backend request timeout in seconds; 0 disables it
    #[arg(long, env = "SEARCH_TIMEOUT", default_value_t = 5)]
    pub timeout: u64,

    /// Verify TLS certificates of the backend
    #[arg(long, env = "SEARCH_VERIFY_TLS", default_value_t = true, action = ArgAction::Set)]
    pub verify_tls: bool,

    #[arg(long, env = "DEFAULT_REGION")]
    pub default_region: Option<String>,

    #[arg(long, env = "DEFAULT_SAFESEARCH")]
    pub default_safesearch: Option<String>,

    #[arg(long, env = "DEFAULT_TIMELIMIT")]
    pub default_timelimit: Option<String>,

    #[arg(long, env = "DEFAULT_MAX_RESULTS", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub default_max_results: Option<u32>,

    #[arg(long, env = "DEFAULT_PAGE", value_parser = clap::value_parser!(u32).range(1..))]
    pub default_page: Option<u32>,

    #[arg(long, env = "DEFAULT_BACKEND")]
    pub default_backend: Option<String>,

    /// JSON object of default search options; DEFAULT_* values take precedence
    #[arg(long, env = "DEFAULT_SEARCH_PARAMS", value_parser = parse_search_options)]
    pub default_search_params: Option<SearchOptions>,

    /// Comma-separated bearer tokens; empty disables authentication
    #[arg(long, env = "API_KEYS", value_delimiter = ',')]
    pub api_keys: Vec<String>,

    /// Path prefix for every API route
    #[arg(long, env = "API_PREFIX", default_value = "", value_parser = normalize_prefix)]
    pub api_prefix: String,

    /// Search categories exposed as agent tools
    #[arg(long, env = "MCP_ENABLE_TOOLS", value_enum, value_delimiter = ',', default_value = "text")]
    pub mcp_enable_tools: Vec<Category>,

    /// Number of workers running blocking backend calls
    #[arg(long, env = "EXECUTOR_MAX_WORKERS", default_value_t = DEFAULT_CAPACITY, value_parser = parse_capacity)]
    pub executor_max_workers: usize,
}

impl Settings {
    /// Options merged under every request.
    pub fn default_search_options(&self) -> SearchOptions {
        let mut options = self.default_search_params.clone().unwrap_or_default();
        if let Some(region) = &self.default_region {
            options.region = Some(region.clone());
        }
        if let Some(safesearch) = &self.default_safesearch {
            options.safesearch = Some(safesearch.clone());
        }
        if let Some(timelimit) = &self.default_timelimit {
            options.timelimit = Some(timelimit.clone());
        }
        if let Some(max_results) = self.default_max_results {
            options.max_results = Some(max_results);
        }
        if let Some(page) = self.default_page {
            options.page = Some(page);
        }
        if let Some(backend) = &self.default_backend {
            options.backend = Some(backend.clone());
        }
        options
    }

    /// Bearer token allow-list. Empty means authentication is off.
    pub fn allowed_tokens(&self) -> Vec<String> {
        self.api_keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn network_options(&self) -> NetworkOptions {
        NetworkOptions {
            proxy: self.proxy.clone().filter(|p| !p.is_empty()),
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            verify_tls: self.verify_tls,
        }
    }

    pub fn tool_max_results(&self) -> u32 {
        self.default_search_options()
            .max_results
            .unwrap_or(DEFAULT_TOOL_MAX_RESULTS)
    }

    pub fn tool_enabled(&self, category: Category) -> bool {
        self.mcp_enable_tools.contains(&category)
    }
}

fn parse_search_options(raw: &str) -> Result<SearchOptions, String> {
    if raw.trim().is_empty() {
        return Ok(SearchOptions::default());
    }
    serde_json::from_str(raw).map_err(|e| format!("expected a JSON object of search options: {}", e))
}

fn normalize_prefix(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        Ok(String::new())
    } else if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{}", trimmed))
    }
}

fn parse_capacity(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Settings {
        let mut argv = vec!["search-api"];
        argv.extend_from_slice(args);
        Settings::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(normalize_prefix("").unwrap(), "");
        assert_eq!(normalize_prefix("/").unwrap(), "");
        assert_eq!(normalize_prefix("api").unwrap(), "/api");
        assert_eq!(normalize_prefix("/api/v1/").unwrap(), "/api/v1");
    }

    #[test]
    fn test_individual_defaults_override_param_object() {
        let settings = parse(&[
            "--default-search-params",
            r#"{"region": "de-de", "safesearch": "off", "backend": "bing"}"#,
            "--default-region",
            "us-en",
        ]);
        let options = settings.default_search_options();
        assert_eq!(options.region.as_deref(), Some("us-en"));
        assert_eq!(options.safesearch.as_deref(), Some("off"));
        assert_eq!(options.backend.as_deref(), Some("bing"));
    }

    #[test]
    fn test_api_keys_and_tools_lists() {
        let settings = parse(&["--api-keys", "alpha, ,beta", "--mcp-enable-tools", "text,news"]);
        assert_eq!(settings.allowed_tokens(), ["alpha", "beta"]);
        assert!(settings.tool_enabled(Category::News));
        assert!(!settings.tool_enabled(Category::Images));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Settings::try_parse_from(["search-api", "--executor-max-workers", "0"]).is_err());
        assert!(Settings::try_parse_from(["search-api", "--default-max-results", "500"]).is_err());
        assert!(Settings::try_parse_from(["search-api", "--default-search-params", "[1]"]).is_err());
    }

    #[test]
    fn test_network_options() {
        let settings = parse(&["--timeout", "0", "--verify-tls", "false", "--proxy", "socks5://127.0.0.1:9150"]);
        let network = settings.network_options();
        assert_eq!(network.timeout, None);
        assert!(!network.verify_tls);
        assert_eq!(network.proxy.as_deref(), Some("socks5://127.0.0.1:9150"));
    }
}
