//! Shared pipeline wiring for integration tests.

use std::sync::Arc;
use std::time::Duration;

use rater::{
    Config, FeedExtractor, Item, KeyValueStore, MemoryStore, MockTransport, PipelineService,
    RecordingSink,
};

pub const TEST_API_KEY: &str = "sk-test";

pub fn test_config() -> Config {
    Config {
        api_key: Some(TEST_API_KEY.to_string()),
        streaming: false,
        min_request_interval: Duration::ZERO,
        ..Config::default()
    }
}

pub fn streaming_config() -> Config {
    Config {
        streaming: true,
        ..test_config()
    }
}

/// A service wired to in-memory collaborators.
pub struct Pipeline {
    pub service: Arc<PipelineService>,
    pub transport: Arc<MockTransport>,
    pub feed: Arc<FeedExtractor>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<dyn KeyValueStore>,
}

pub struct PipelineBuilder {
    config: Config,
    transport: MockTransport,
    store: Arc<dyn KeyValueStore>,
}

impl PipelineBuilder {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            config: test_config(),
            transport,
            store: Arc::new(MemoryStore::new()),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = store;
        self
    }

    pub fn build(self) -> Pipeline {
        let transport = Arc::new(self.transport);
        let feed = Arc::new(FeedExtractor::new());
        let sink = Arc::new(RecordingSink::new());
        let service = PipelineService::new(
            self.config,
            Arc::clone(&transport) as _,
            Arc::clone(&self.store),
            Arc::clone(&feed) as _,
            Arc::clone(&sink) as _,
        );
        Pipeline {
            service: Arc::new(service),
            transport,
            feed,
            sink,
            store: self.store,
        }
    }
}

pub fn post(id: &str, author: &str, text: &str) -> Item {
    Item::new(id, author, text)
}
