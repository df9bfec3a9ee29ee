use std::sync::Arc;

use crate::{
    config::Config,
    database::{KeyValueStore, RedisStore},
};

pub struct State {
    pub config: Config,
    pub store: Arc<dyn KeyValueStore>,
}

impl State {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let store = RedisStore::connect(&config.redis_url)
            .await
            .expect("Failed to connect to Redis");

        Arc::new(Self {
            config,
            store: Arc::new(store),
        })
    }

    #[cfg(test)]
    pub fn for_tests(store: Arc<dyn KeyValueStore>) -> Arc<Self> {
        Arc::new(Self {
            config: Config {
                port: 0,
                redis_url: String::new(),
                admin_password: Some("test-password".to_string()),
                token_secret: Some("test-token-secret".to_string()),
            },
            store,
        })
    }
}
