//! Configuration snapshot store
//!
//! Caches the latest committed configuration per channel. Each channel has
//! its own async lock around the cached snapshot, so concurrent callers for
//! one channel share a single round trip while channels never wait on each
//! other.

use crate::ports::ordering_service::{OrderingError, OrderingService};
use chanconf_domain::{ChannelConfig, ChannelId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct ChannelSnapshots {
    current: Mutex<Option<Arc<ChannelConfig>>>,
    previous: RwLock<Option<Arc<ChannelConfig>>>,
}

/// Per-channel cache of fetched configurations
pub struct ConfigSnapshotStore<O: OrderingService + 'static> {
    orderer: Arc<O>,
    channels: RwLock<HashMap<ChannelId, Arc<ChannelSnapshots>>>,
}

impl<O: OrderingService + 'static> ConfigSnapshotStore<O> {
    pub fn new(orderer: Arc<O>) -> Self {
        Self {
            orderer,
            channels: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, channel: &ChannelId) -> Arc<ChannelSnapshots> {
        if let Some(entry) = self
            .channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
        {
            return Arc::clone(entry);
        }
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(channels.entry(channel.clone()).or_default())
    }

    /// Latest observed configuration, fetched on first access or after
    /// [`invalidate`](Self::invalidate)
    pub async fn fetch_current(&self, channel: &ChannelId) -> Result<Arc<ChannelConfig>, OrderingError> {
        let entry = self.entry(channel);
        let mut current = entry.current.lock().await;
        if let Some(config) = current.as_ref() {
            return Ok(Arc::clone(config));
        }

        debug!("Fetching configuration for channel {}", channel);
        let config = Arc::new(self.orderer.fetch_config(channel).await?);
        debug!(
            "Channel {} at config sequence {}",
            channel, config.sequence
        );
        *current = Some(Arc::clone(&config));
        Ok(config)
    }

    /// Drop the cached snapshot; the next fetch goes to the ordering service.
    /// The dropped snapshot is kept as [`previous`](Self::previous).
    pub async fn invalidate(&self, channel: &ChannelId) {
        let entry = self.entry(channel);
        let mut current = entry.current.lock().await;
        if let Some(stale) = current.take() {
            debug!(
                "Invalidated channel {} snapshot at sequence {}",
                channel, stale.sequence
            );
            *entry.previous.write().unwrap_or_else(|e| e.into_inner()) = Some(stale);
        }
    }

    /// The snapshot most recently invalidated for `channel`
    pub fn previous(&self, channel: &ChannelId) -> Option<Arc<ChannelConfig>> {
        self.entry(channel)
            .previous
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chanconf_domain::{ChannelTemplate, ConfigEnvelope, OrdererResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Orderer that counts fetches and bumps the sequence on every fetch
    struct CountingOrderer {
        fetches: AtomicUsize,
    }

    impl CountingOrderer {
        fn new() -> Self {
            Self {
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OrderingService for CountingOrderer {
        async fn fetch_config(&self, channel: &ChannelId) -> Result<ChannelConfig, OrderingError> {
            if channel.as_str() == "missing" {
                return Err(OrderingError::ChannelNotFound(channel.clone()));
            }
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            let mut config = ChannelTemplate::new().build(channel.clone());
            config.sequence = n as u64;
            Ok(config)
        }

        async fn broadcast(&self, _envelope: &ConfigEnvelope) -> Result<OrdererResponse, OrderingError> {
            Ok(OrdererResponse::Accepted { sequence: 0 })
        }
    }

    #[tokio::test]
    async fn test_fetch_is_cached() {
        let orderer = Arc::new(CountingOrderer::new());
        let store = ConfigSnapshotStore::new(Arc::clone(&orderer));
        let channel = ChannelId::new("mychannel");

        let first = store.fetch_current(&channel).await.unwrap();
        let second = store.fetch_current(&channel).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(orderer.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_round_trip() {
        let orderer = Arc::new(CountingOrderer::new());
        let store = Arc::new(ConfigSnapshotStore::new(Arc::clone(&orderer)));
        let channel = ChannelId::new("mychannel");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let channel = channel.clone();
                tokio::spawn(async move { store.fetch_current(&channel).await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(orderer.fetches(), 1);
    }

    #[tokio::test]
    async fn test_channels_are_independent() {
        let orderer = Arc::new(CountingOrderer::new());
        let store = ConfigSnapshotStore::new(Arc::clone(&orderer));

        store.fetch_current(&ChannelId::new("a")).await.unwrap();
        store.fetch_current(&ChannelId::new("b")).await.unwrap();
        store.invalidate(&ChannelId::new("a")).await;
        store.fetch_current(&ChannelId::new("b")).await.unwrap();

        assert_eq!(orderer.fetches(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_refetches_and_keeps_previous() {
        let orderer = Arc::new(CountingOrderer::new());
        let store = ConfigSnapshotStore::new(Arc::clone(&orderer));
        let channel = ChannelId::new("mychannel");

        assert!(store.previous(&channel).is_none());
        let first = store.fetch_current(&channel).await.unwrap();
        store.invalidate(&channel).await;
        let second = store.fetch_current(&channel).await.unwrap();

        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(store.previous(&channel).unwrap().sequence, 0);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_and_is_not_cached() {
        let orderer = Arc::new(CountingOrderer::new());
        let store = ConfigSnapshotStore::new(orderer);
        let channel = ChannelId::new("missing");

        assert!(matches!(
            store.fetch_current(&channel).await,
            Err(OrderingError::ChannelNotFound(_))
        ));
        assert!(store.fetch_current(&channel).await.is_err());
    }
}
