use crate::engine::{Category, Record, SearchEngine, SearchError};
use crate::pool::WorkerPool;
use crate::types::SearchOptions;
use std::sync::Arc;
use tracing::{debug, info};

/// Async front for a blocking [`SearchEngine`].
///
/// Holds no per-call state; concurrent searches only compete for pool workers.
#[derive(Clone)]
pub struct SearchService {
    pool: WorkerPool,
    engine: Arc<dyn SearchEngine>,
}

impl SearchService {
    pub fn new(pool: WorkerPool, engine: Arc<dyn SearchEngine>) -> Self {
        Self { pool, engine }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Run one search on the worker pool and return every valid hit.
    ///
    /// The engine's lazy result stream is drained on the worker, so a failure
    /// on any page fails the whole call. Hits missing the category's mandatory
    /// field are dropped.
    pub async fn search(
        &self,
        category: Category,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<Record>, SearchError> {
        info!("Searching {} for: {}", category, query);
        let engine = Arc::clone(&self.engine);
        let query = query.to_string();

        let records = self
            .pool
            .submit(move || -> Result<Vec<Record>, SearchError> {
                engine.search(category, &query, &options)?.collect()
            })
            .await??;

        let total = records.len();
        let results: Vec<Record> = records
            .into_iter()
            .filter(|record| category.accepts(record))
            .collect();
        debug!(
            "Kept {} of {} {} results",
            results.len(),
            total,
            category
        );
        Ok(results)
    }

    pub async fn text(&self, query: &str, options: SearchOptions) -> Result<Vec<Record>, SearchError> {
        self.search(Category::Text, query, options).await
    }

    pub async fn images(&self, query: &str, options: SearchOptions) -> Result<Vec<Record>, SearchError> {
        self.search(Category::Images, query, options).await
    }

    pub async fn videos(&self, query: &str, options: SearchOptions) -> Result<Vec<Record>, SearchError> {
        self.search(Category::Videos, query, options).await
    }

    pub async fn news(&self, query: &str, options: SearchOptions) -> Result<Vec<Record>, SearchError> {
        self.search(Category::News, query, options).await
    }

    pub async fn books(&self, query: &str, options: SearchOptions) -> Result<Vec<Record>, SearchError> {
        self.search(Category::Books, query, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{to_record, ScriptedEngine};
    use crate::pool::PoolError;
    use serde_json::json;

    fn service(engine: ScriptedEngine) -> (SearchService, Arc<ScriptedEngine>) {
        let engine = Arc::new(engine);
        let pool = WorkerPool::new(4).unwrap();
        (SearchService::new(pool, engine.clone()), engine)
    }

    #[tokio::test]
    async fn test_records_without_mandatory_field_are_dropped() {
        let (service, _) = service(ScriptedEngine::returning(vec![
            json!({"title": "Rust", "href": "https://www.rust-lang.org", "body": "lang"}),
            json!({"title": "no url", "body": "dropped"}),
            json!({"title": "Crates", "href": "https://crates.io", "body": "registry"}),
        ]));

        let results = service.text("rust", SearchOptions::default()).await.unwrap();
        let hrefs: Vec<_> = results.iter().map(|r| r["href"].as_str().unwrap()).collect();
        assert_eq!(hrefs, ["https://www.rust-lang.org", "https://crates.io"]);
    }

    #[tokio::test]
    async fn test_each_category_uses_its_own_method_and_field() {
        let (service, engine) = service(ScriptedEngine::new(|category, _, _| {
            Ok(vec![to_record(&json!({"title": category.as_str(), "image": "https://img"}))])
        }));

        assert_eq!(service.images("crab", SearchOptions::default()).await.unwrap().len(), 1);
        assert!(service.news("crab", SearchOptions::default()).await.unwrap().is_empty());
        assert!(service.books("crab", SearchOptions::default()).await.unwrap().is_empty());
        assert!(service.videos("crab", SearchOptions::default()).await.unwrap().is_empty());

        let calls: Vec<Category> = engine.calls.lock().unwrap().iter().map(|c| c.0).collect();
        assert_eq!(
            calls,
            [Category::Images, Category::News, Category::Books, Category::Videos]
        );
    }

    #[tokio::test]
    async fn test_empty_backend_result_is_empty_vec() {
        let (service, _) = service(ScriptedEngine::returning(vec![]));
        let results = service.news("quiet day", SearchOptions::default()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_is_returned_to_caller() {
        let (service, _) = service(ScriptedEngine::failing("rate limited"));
        let err = service.text("rust", SearchOptions::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "rate limited");
    }

    #[tokio::test]
    async fn test_options_reach_the_engine() {
        let (service, engine) = service(ScriptedEngine::returning(vec![]));
        let options = SearchOptions {
            region: Some("us-en".into()),
            max_results: Some(5),
            ..Default::default()
        };
        service.text("rust", options.clone()).await.unwrap();

        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls[0].1, "rust");
        assert_eq!(calls[0].2, options);
    }

    #[tokio::test]
    async fn test_search_after_pool_shutdown_fails() {
        let (service, _) = service(ScriptedEngine::returning(vec![]));
        service.pool().shutdown().await.unwrap();
        let err = service.text("rust", SearchOptions::default()).await.unwrap_err();
        assert!(matches!(err, SearchError::Pool(PoolError::ShutDown)));
    }
}
