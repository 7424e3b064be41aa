//! In-memory prediction cache
//!
//! Holds the latest record per (symbol, provider) plus a short history per
//! key. Only the scheduler writes; the API server reads. Records are
//! immutable and shared as `Arc`s, so a reader holding one is unaffected by a
//! later `put`.

use crate::record::{CacheKey, PredictionRecord, Provider};
use crate::symbol::Symbol;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Default)]
struct Entries {
    latest: HashMap<CacheKey, Arc<PredictionRecord>>,
    history: HashMap<CacheKey, VecDeque<Arc<PredictionRecord>>>,
}

/// Thread-safe store of the most recent predictions
#[derive(Clone)]
pub struct PredictionCache {
    entries: Arc<RwLock<Entries>>,
    history_limit: usize,
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl PredictionCache {
    /// Create an empty cache keeping up to `history_limit` records per key
    pub fn new(history_limit: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries::default())),
            history_limit: history_limit.max(1),
        }
    }

    /// Store a record, replacing the previous one for its key.
    pub async fn put(&self, record: PredictionRecord) {
        let key = record.key();
        let record = Arc::new(record);

        let mut entries = self.entries.write().await;
        let history = entries.history.entry(key.clone()).or_default();
        history.push_back(Arc::clone(&record));
        while history.len() > self.history_limit {
            history.pop_front();
        }
        entries.latest.insert(key, record);
    }

    /// Latest record for a pair
    pub async fn get(&self, symbol: &Symbol, provider: Provider) -> Option<Arc<PredictionRecord>> {
        let key = CacheKey::new(symbol.clone(), provider);
        self.entries.read().await.latest.get(&key).cloned()
    }

    /// Snapshot of every latest record, ordered by symbol then provider
    pub async fn get_all(&self) -> Vec<Arc<PredictionRecord>> {
        let entries = self.entries.read().await;
        let mut keys: Vec<&CacheKey> = entries.latest.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|k| entries.latest.get(k).cloned())
            .collect()
    }

    /// Latest records for one symbol, ordered by provider
    pub async fn get_symbol(&self, symbol: &Symbol) -> Vec<Arc<PredictionRecord>> {
        let entries = self.entries.read().await;
        Provider::ALL
            .iter()
            .filter_map(|p| entries.latest.get(&CacheKey::new(symbol.clone(), *p)).cloned())
            .collect()
    }

    /// Recent records for a pair, oldest first
    pub async fn history(&self, symbol: &Symbol, provider: Provider) -> Vec<Arc<PredictionRecord>> {
        let key = CacheKey::new(symbol.clone(), provider);
        self.entries
            .read()
            .await
            .history
            .get(&key)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of (symbol, provider) pairs with a record
    pub async fn len(&self) -> usize {
        self.entries.read().await.latest.len()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictError;
    use crate::parse::ParsedPrediction;
    use crate::record::PredictionRequest;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn ok_record(symbol: &str, provider: Provider, price: f64) -> PredictionRecord {
        let request = PredictionRequest::new(
            sym(symbol),
            provider,
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        );
        let parsed = ParsedPrediction {
            predicted_price: Some(price),
            ..Default::default()
        };
        PredictionRecord::from_parsed(&request, "model", parsed, String::new(), Duration::ZERO)
    }

    fn error_record(symbol: &str, provider: Provider) -> PredictionRecord {
        let request = PredictionRequest::new(
            sym(symbol),
            provider,
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        );
        PredictionRecord::failed(
            &request,
            "model",
            &PredictError::Network("connection reset".into()),
            None,
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_empty_cache() {
        let cache = PredictionCache::default();
        assert!(cache.is_empty().await);
        assert!(cache.get_all().await.is_empty());
        assert!(cache.get(&sym("AAPL"), Provider::Gpt).await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let cache = PredictionCache::default();
        cache.put(ok_record("AAPL", Provider::Gpt, 200.0)).await;
        let first = cache.get(&sym("AAPL"), Provider::Gpt).await.unwrap();

        cache.put(error_record("AAPL", Provider::Gpt)).await;
        let second = cache.get(&sym("AAPL"), Provider::Gpt).await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(second.error_detail.is_some());
        // A reader holding the old record still sees it intact
        assert_eq!(first.predicted_price, Some(200.0));
    }

    #[tokio::test]
    async fn test_get_all_bounded_by_pairs() {
        let cache = PredictionCache::default();
        for _ in 0..3 {
            for symbol in ["AAPL", "TSLA"] {
                for provider in Provider::ALL {
                    cache.put(ok_record(symbol, provider, 1.0)).await;
                }
            }
        }

        let all = cache.get_all().await;
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].symbol, sym("AAPL"));
        assert_eq!(all[0].provider, Provider::Gpt);
        assert_eq!(all[3].symbol, sym("TSLA"));
        assert_eq!(all[3].provider, Provider::Grok);
    }

    #[test]
    fn test_clones_share_entries() {
        let writer = PredictionCache::default();
        let reader = writer.clone();

        tokio_test::block_on(writer.put(ok_record("BTC-USD", Provider::Grok, 64_000.0)));

        let record = tokio_test::block_on(reader.get(&sym("btc-usd"), Provider::Grok));
        assert_eq!(record.unwrap().predicted_price, Some(64_000.0));
    }

    #[tokio::test]
    async fn test_get_symbol() {
        let cache = PredictionCache::default();
        cache.put(ok_record("AAPL", Provider::Grok, 1.0)).await;
        cache.put(ok_record("TSLA", Provider::Gpt, 1.0)).await;

        let aapl = cache.get_symbol(&sym("AAPL")).await;
        assert_eq!(aapl.len(), 1);
        assert_eq!(aapl[0].provider, Provider::Grok);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let cache = PredictionCache::new(3);
        for price in 1..=5 {
            cache.put(ok_record("NVDA", Provider::Gpt, f64::from(price))).await;
        }

        let history = cache.history(&sym("NVDA"), Provider::Gpt).await;
        let prices: Vec<f64> = history.iter().filter_map(|r| r.predicted_price).collect();
        assert_eq!(prices, vec![3.0, 4.0, 5.0]);
        assert!(cache.history(&sym("NVDA"), Provider::Grok).await.is_empty());
    }
}
