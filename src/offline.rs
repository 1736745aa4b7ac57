//! Static asset caching for offline play
//!
//! The caching policy of the page's service worker, expressed against two
//! small traits so it can run (and be tested) without a browser:
//! - precache a fixed URL list on install, all or nothing
//! - drop caches from older versions on activate
//! - cache-first fetches, storing successful same-origin responses
//! - fall back to the cached shell document when offline

use std::collections::BTreeMap;

/// Cache name for the current release. Bump to invalidate old caches.
pub const CACHE_VERSION: &str = "bubble-pop-v1";

/// Shell document served to navigations when the network is gone
pub const FALLBACK_DOCUMENT: &str = "/index.html";

/// Assets fetched on install
pub const PRECACHE_URLS: &[&str] = &[
    "/",
    "/index.html",
    "/manifest.json",
    "/bubble-pop/index.html",
];

/// What the browser intends to do with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Page navigation
    Document,
    Script,
    Style,
    Image,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub destination: Destination,
}

impl Request {
    pub fn new(url: impl Into<String>, destination: Destination) -> Self {
        Self {
            url: url.into(),
            destination,
        }
    }

    pub fn document(url: impl Into<String>) -> Self {
        Self::new(url, Destination::Document)
    }
}

/// Response tainting, as reported by fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Same-origin
    Basic,
    Cors,
    Opaque,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub kind: ResponseKind,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            kind: ResponseKind::Basic,
            body: body.into(),
        }
    }

    /// Worth keeping: a complete same-origin response
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }
}

/// Transport-level failure (no response at all)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OfflineError {
    #[error("fetching {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("precaching {url} returned status {status}")]
    BadStatus { url: String, status: u16 },
    #[error("offline and {url} is not cached")]
    Unavailable { url: String },
}

/// Named caches of url -> response
pub trait CacheStorage {
    fn cache_names(&self) -> Vec<String>;
    fn get(&self, cache: &str, url: &str) -> Option<Response>;
    /// Creates the cache if needed
    fn put(&mut self, cache: &str, url: &str, response: Response);
    /// Returns true if a cache by that name existed
    fn delete_cache(&mut self, cache: &str) -> bool;
}

pub trait Network {
    fn fetch(&mut self, request: &Request) -> Result<Response, FetchError>;
}

/// In-memory `CacheStorage`
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStorage {
    caches: BTreeMap<String, BTreeMap<String, Response>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in one cache (0 if it does not exist)
    pub fn len(&self, cache: &str) -> usize {
        self.caches.get(cache).map_or(0, BTreeMap::len)
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn cache_names(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    fn get(&self, cache: &str, url: &str) -> Option<Response> {
        self.caches.get(cache)?.get(url).cloned()
    }

    fn put(&mut self, cache: &str, url: &str, response: Response) {
        self.caches
            .entry(cache.to_string())
            .or_default()
            .insert(url.to_string(), response);
    }

    fn delete_cache(&mut self, cache: &str) -> bool {
        self.caches.remove(cache).is_some()
    }
}

/// Caching policy for one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCache {
    pub version: String,
    pub fallback_document: String,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new(CACHE_VERSION, FALLBACK_DOCUMENT)
    }
}

impl AssetCache {
    pub fn new(version: impl Into<String>, fallback_document: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            fallback_document: fallback_document.into(),
        }
    }

    /// Fetch every URL and store them under the current version. Nothing is
    /// written unless every fetch succeeds with status 200.
    pub fn install<S, N>(&self, store: &mut S, net: &mut N, urls: &[&str]) -> Result<usize, OfflineError>
    where
        S: CacheStorage + ?Sized,
        N: Network + ?Sized,
    {
        let mut fetched = Vec::with_capacity(urls.len());
        for &url in urls {
            let request = Request::new(url, Destination::Other);
            let response = net.fetch(&request).map_err(|source| OfflineError::Fetch {
                url: url.to_string(),
                source,
            })?;
            if response.status != 200 {
                return Err(OfflineError::BadStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            fetched.push((url, response));
        }

        let count = fetched.len();
        for (url, response) in fetched {
            store.put(&self.version, url, response);
        }
        log::info!("Precached {} assets into {}", count, self.version);
        Ok(count)
    }

    /// Delete every cache left behind by other versions
    pub fn activate<S: CacheStorage + ?Sized>(&self, store: &mut S) -> Vec<String> {
        let mut deleted = Vec::new();
        for name in store.cache_names() {
            if name != self.version && store.delete_cache(&name) {
                log::info!("Deleting old cache: {}", name);
                deleted.push(name);
            }
        }
        deleted
    }

    /// Serve a request cache-first
    pub fn respond<S, N>(&self, store: &mut S, net: &mut N, request: &Request) -> Result<Response, OfflineError>
    where
        S: CacheStorage + ?Sized,
        N: Network + ?Sized,
    {
        if let Some(hit) = store.get(&self.version, &request.url) {
            return Ok(hit);
        }

        match net.fetch(request) {
            Ok(response) => {
                if response.is_cacheable() {
                    store.put(&self.version, &request.url, response.clone());
                }
                Ok(response)
            }
            Err(source) => {
                if request.destination == Destination::Document {
                    if let Some(shell) = store.get(&self.version, &self.fallback_document) {
                        log::warn!(
                            "Offline: serving {} for {}",
                            self.fallback_document,
                            request.url
                        );
                        return Ok(shell);
                    }
                    return Err(OfflineError::Unavailable {
                        url: request.url.clone(),
                    });
                }
                Err(OfflineError::Fetch {
                    url: request.url.clone(),
                    source,
                })
            }
        }
    }
}
