//! Agent tools shared by the HTTP and stdio MCP surfaces.

use crate::engine::{Category, Record};
use crate::types::*;
use crate::AppState;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ToolArgs {
    /// search query
    pub query: String,
    /// maximum number of results to return
    #[serde(default)]
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

pub fn descriptor(category: Category) -> ToolDescriptor {
    let (name, description) = match category {
        Category::Text => ("search_text", "search web pages"),
        Category::Images => ("search_images", "search images"),
        Category::Videos => ("search_videos", "search videos"),
        Category::News => ("search_news", "search news"),
        Category::Books => ("search_books", "search books"),
    };
    ToolDescriptor {
        name,
        description,
        category,
    }
}

/// Tools switched on in this process, in category order.
pub fn enabled_tools(state: &AppState) -> Vec<ToolDescriptor> {
    Category::ALL
        .into_iter()
        .filter(|c| state.enabled_tools.contains(c))
        .map(descriptor)
        .collect()
}

pub fn input_schema() -> serde_json::Map<String, Value> {
    match serde_json::to_value(schemars::schema_for!(ToolArgs)) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

/// Run a tool call. Backend failures come back as an empty list.
pub async fn call_tool(state: &AppState, name: &str, arguments: Value) -> Result<Vec<Value>, ToolError> {
    let tool = enabled_tools(state)
        .into_iter()
        .find(|t| t.name == name)
        .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

    let args: ToolArgs = serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    if args.query.is_empty() {
        return Err(ToolError::InvalidArguments("query must not be empty".to_string()));
    }
    validate_max_results(args.max_results).map_err(ToolError::InvalidArguments)?;

    let options = state.defaults.merged_with(&SearchOptions {
        max_results: Some(args.max_results.unwrap_or(state.tool_max_results)),
        ..Default::default()
    });
    info!("Tool {} called with query: {}", tool.name, args.query);

    match state.search.search(tool.category, &args.query, options.clone()).await {
        Ok(records) => Ok(shape(tool.category, records)),
        Err(e) => {
            error!(
                "Error in tool {}: {}, query: {}, options: {:?}",
                tool.name, e, args.query, options
            );
            Ok(Vec::new())
        }
    }
}

/// Project raw records onto the tool's item model, dropping unknown fields.
pub fn shape(category: Category, records: Vec<Record>) -> Vec<Value> {
    match category {
        Category::Text => shape_as::<TextSearchItem>(records),
        Category::Images => shape_as::<ImagesSearchItem>(records),
        Category::Videos => shape_as::<VideosSearchItem>(records),
        Category::News => shape_as::<NewsSearchItem>(records),
        Category::Books => shape_as::<BooksSearchItem>(records),
    }
}

fn shape_as<T: DeserializeOwned + Serialize>(records: Vec<Record>) -> Vec<Value> {
    records
        .into_iter()
        .filter_map(|record| serde_json::from_value::<T>(Value::Object(record)).ok())
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{to_record, ScriptedEngine};
    use crate::test_support::state_with;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_schema_requires_query() {
        let schema = input_schema();
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["required"], json!(["query"]));
        assert!(schema["properties"]["max_results"].is_object());
    }

    #[test]
    fn test_shape_drops_extra_fields() {
        let records = vec![to_record(&json!({
            "title": "Rust", "href": "https://www.rust-lang.org", "body": "lang", "engine": "bing"
        }))];
        let shaped = shape(Category::Text, records);
        assert_eq!(
            shaped,
            vec![json!({"title": "Rust", "href": "https://www.rust-lang.org", "body": "lang"})]
        );
    }

    #[tokio::test]
    async fn test_only_enabled_tools_are_callable() {
        let state = state_with(ScriptedEngine::returning(vec![]), |s| {
            s.enabled_tools = vec![Category::Text, Category::Books];
        });
        let names: Vec<_> = enabled_tools(&state).iter().map(|t| t.name).collect();
        assert_eq!(names, ["search_text", "search_books"]);

        let err = call_tool(&state, "search_news", json!({"query": "rust"})).await.unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("search_news".to_string()));
    }

    #[tokio::test]
    async fn test_tool_uses_default_max_results() {
        let engine = Arc::new(ScriptedEngine::returning(vec![json!({"title": "a", "href": "https://a"})]));
        let state = state_with(engine.clone(), |s| s.tool_max_results = 7);

        let results = call_tool(&state, "search_text", json!({"query": "rust"})).await.unwrap();
        assert_eq!(results, vec![json!({"title": "a", "href": "https://a", "body": ""})]);
        call_tool(&state, "search_text", json!({"query": "rust", "max_results": 2}))
            .await
            .unwrap();

        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls[0].2.max_results, Some(7));
        assert_eq!(calls[1].2.max_results, Some(2));
    }

    #[tokio::test]
    async fn test_tool_failure_collapses_to_empty() {
        let state = state_with(ScriptedEngine::failing("network down"), |_| {});
        let results = call_tool(&state, "search_text", json!({"query": "rust"})).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_tool_argument_validation() {
        let state = state_with(ScriptedEngine::returning(vec![]), |_| {});
        for args in [json!({}), json!({"query": ""}), json!({"query": "x", "max_results": 0})] {
            let err = call_tool(&state, "search_text", args).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
        }
    }
}
