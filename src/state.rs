// Shared application state: configuration, the upstream client and the
// ephemeral folder cache, built once at boot.
use crate::cache::FolderCache;
use crate::config::Config;
use crate::upstream::UpstreamClient;
use anyhow::{Context, Result};
use std::time::Duration;

pub struct AppState {
    pub config: Config,
    pub upstream: UpstreamClient,
    pub folder_cache: FolderCache,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let upstream =
            UpstreamClient::new(&config.upstream).context("build upstream client failed")?;
        let folder_cache = FolderCache::new(Duration::from_secs(config.cache.folder_ttl_s));
        Ok(Self {
            config,
            upstream,
            folder_cache,
        })
    }
}
