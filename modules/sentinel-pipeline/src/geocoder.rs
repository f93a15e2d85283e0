use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
const DEFAULT_CACHE_MAXSIZE: usize = 2048;

/// Geocoding result for a single location, per §3 "GeoResult".
#[derive(Debug, Clone, PartialEq)]
pub struct GeoResult {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
    pub region: Option<String>,
}

struct RateLimitState {
    last_request: Option<Instant>,
}

/// Name → coordinates via Nominatim, with caching and rate limiting, per §4.4.
///
/// `cache` and the rate-limit clock share one mutex: the wait-then-call
/// sequence and the cache write both happen while holding it, mirroring the
/// single `asyncio.Lock` the design is grounded on.
pub struct Geocoder {
    client: reqwest::Client,
    user_agent: String,
    rate_limit: Duration,
    cache_maxsize: usize,
    state: Mutex<GeocoderState>,
}

struct GeocoderState {
    cache: HashMap<String, Option<GeoResult>>,
    order: Vec<String>,
    rate: RateLimitState,
}

impl Geocoder {
    pub fn new(user_agent: String, rate_limit_secs: f64) -> Self {
        Self::with_cache_size(user_agent, rate_limit_secs, DEFAULT_CACHE_MAXSIZE)
    }

    pub fn with_cache_size(user_agent: String, rate_limit_secs: f64, cache_maxsize: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent,
            rate_limit: Duration::from_secs_f64(rate_limit_secs.max(0.0)),
            cache_maxsize,
            state: Mutex::new(GeocoderState {
                cache: HashMap::new(),
                order: Vec::new(),
                rate: RateLimitState { last_request: None },
            }),
        }
    }

    /// Resolve `location_name` to coordinates, or `None` if unresolvable.
    pub async fn geocode(&self, location_name: &str) -> Option<GeoResult> {
        if location_name.trim().is_empty() {
            return None;
        }
        let cache_key = location_name.trim().to_lowercase();

        {
            let state = self.state.lock().await;
            if let Some(cached) = state.cache.get(&cache_key) {
                debug!(location_name, "geocoder cache hit");
                return cached.clone();
            }
        }

        let mut state = self.state.lock().await;
        // Re-check under lock: another waiter may have populated it.
        if let Some(cached) = state.cache.get(&cache_key) {
            return cached.clone();
        }

        if let Some(last) = state.rate.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.rate_limit {
                tokio::time::sleep(self.rate_limit - elapsed).await;
            }
        }

        let result = self.nominatim_search(location_name).await;
        state.rate.last_request = Some(Instant::now());

        if state.cache.len() >= self.cache_maxsize && !state.order.is_empty() {
            let oldest = state.order.remove(0);
            state.cache.remove(&oldest);
        }
        state.cache.insert(cache_key.clone(), result.clone());
        state.order.push(cache_key);

        result
    }

    async fn nominatim_search(&self, query: &str) -> Option<GeoResult> {
        let response = self
            .client
            .get(NOMINATIM_SEARCH_URL)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1"), ("addressdetails", "1")])
            .header("User-Agent", &self.user_agent)
            .timeout(Duration::from_secs(15))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(query, error = %e, "geocoder request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(query, status = %response.status(), "nominatim returned non-success status");
            return None;
        }

        let results: Vec<NominatimResult> = match response.json().await {
            Ok(r) => r,
            Err(e) => {
                warn!(query, error = %e, "geocoder response failed to parse");
                return None;
            }
        };

        let top = results.into_iter().next()?;
        let lat: f64 = top.lat.parse().ok()?;
        let lon: f64 = top.lon.parse().ok()?;

        Some(GeoResult {
            name: top.display_name.unwrap_or_else(|| query.to_string()),
            latitude: lat,
            longitude: lon,
            country: top.address.as_ref().and_then(|a| a.country.clone()),
            region: top
                .address
                .as_ref()
                .and_then(|a| a.state.clone().or_else(|| a.region.clone())),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: Option<String>,
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    country: Option<String>,
    state: Option<String>,
    region: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_name_returns_none_without_network() {
        let geocoder = Geocoder::new("test-agent/1.0".to_string(), 1.0);
        assert_eq!(geocoder.geocode("").await, None);
        assert_eq!(geocoder.geocode("   ").await, None);
    }

    #[tokio::test]
    async fn cache_eviction_respects_maxsize() {
        let geocoder = Geocoder::with_cache_size("test-agent/1.0".to_string(), 0.0, 2);
        let mut state = geocoder.state.lock().await;
        state.cache.insert("a".into(), None);
        state.order.push("a".into());
        state.cache.insert("b".into(), None);
        state.order.push("b".into());
        drop(state);

        // Simulate what geocode() would do on a third distinct miss.
        let mut state = geocoder.state.lock().await;
        if state.cache.len() >= geocoder.cache_maxsize {
            let oldest = state.order.remove(0);
            state.cache.remove(&oldest);
        }
        state.cache.insert("c".into(), None);
        state.order.push("c".into());

        assert!(!state.cache.contains_key("a"));
        assert!(state.cache.contains_key("b"));
        assert!(state.cache.contains_key("c"));
    }
}
