//! Asset Cache: size-probe fetch + consume-once load.
//!
//! The probe pipeline fetches `assets/<path>` through the platform's
//! [`AssetFetcher`], parks the bytes in the cache, and reports the byte length
//! through the completion queue. The load side copies a cached entry into a
//! guest-supplied buffer exactly once and removes it; a load without a prior
//! successful probe is an error, not a miss-then-fetch.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

use crate::abi::err_code;
use crate::completion::Completion;

/// Fixed assets root, joined with the requested path for every asset and
/// audio fetch. The bootstrap module path is resolved against the fetcher
/// root directly, without this prefix.
pub const ASSETS_ROOT: &str = "assets";

pub fn asset_url(path: &str) -> String {
    format!("{ASSETS_ROOT}/{path}")
}

/// Failure of a fetch pipeline stage.
///
/// `Io` carries a message rather than the source error so completions stay
/// `Send + 'static` and cheap to route through the queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Not Found")]
    NotFound,
    #[error("fetch failed with status {0}")]
    Status(u16),
    #[error("fetch failed: {0}")]
    Io(String),
    #[error("empty content")]
    EmptyContent,
}

impl FetchError {
    /// ABI error code delivered through completion callbacks.
    pub fn code(&self) -> u32 {
        match self {
            FetchError::NotFound => err_code::NOT_FOUND,
            FetchError::Status(_) => err_code::STATUS,
            FetchError::Io(_) => err_code::IO,
            FetchError::EmptyContent => err_code::EMPTY_CONTENT,
        }
    }
}

pub type FetchResult = Result<Vec<u8>, FetchError>;
pub type BoxFetch = Pin<Box<dyn Future<Output = FetchResult> + Send>>;

/// Retrieval seam supplied by the embedding layer at construction.
///
/// Paths are relative to the fetcher's root (the hosting location); asset
/// fetches arrive already prefixed with [`ASSETS_ROOT`]. Implementations
/// decide the transport. There is no cancellation: once started, a fetch runs
/// to completion or failure.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, path: &str) -> BoxFetch;

    /// Whether [`AssetFetcher::fetch_chunked`] returns a live stream. The
    /// bootstrap loader uses this as its streaming-instantiation probe.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Chunked variant used by the streaming bootstrap path. `None` means
    /// unsupported; callers fall back to [`AssetFetcher::fetch`].
    fn fetch_chunked(&self, path: &str) -> Option<mpsc::Receiver<FetchResult>> {
        let _ = path;
        None
    }
}

/// Filesystem-backed fetcher: resolves paths against a root directory the way
/// the original environment resolved them against the hosting page.
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

const CHUNK_LEN: usize = 64 * 1024;

impl AssetFetcher for DirFetcher {
    fn fetch(&self, path: &str) -> BoxFetch {
        let full = self.resolve(path);
        Box::pin(async move {
            match tokio::fs::read(&full).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound),
                Err(e) => Err(FetchError::Io(e.to_string())),
            }
        })
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn fetch_chunked(&self, path: &str) -> Option<mpsc::Receiver<FetchResult>> {
        let full = self.resolve(path);
        let (tx, rx) = mpsc::channel(4);
        crate::rt::spawn(async move {
            let mut file = match tokio::fs::File::open(&full).await {
                Ok(f) => f,
                Err(e) => {
                    let err = if e.kind() == std::io::ErrorKind::NotFound {
                        FetchError::NotFound
                    } else {
                        FetchError::Io(e.to_string())
                    };
                    let _ = tx.send(Err(err)).await;
                    return;
                }
            };

            loop {
                let mut chunk = vec![0u8; CHUNK_LEN];
                match file.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => {
                        chunk.truncate(n);
                        if tx.send(Ok(chunk)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(FetchError::Io(e.to_string()))).await;
                        break;
                    }
                }
            }
        });
        Some(rx)
    }
}

/// Why a synchronous load did not copy anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConsumeError {
    /// No live entry for the path: never probed, or already consumed.
    #[error("empty content")]
    Miss,
    /// Destination smaller than the cached entry; the entry is retained.
    #[error("destination buffer too small (need {needed} bytes)")]
    TooSmall { needed: usize },
}

/// Path -> owned byte buffer, at most one live entry per path.
#[derive(Default)]
pub struct AssetCache {
    entries: HashMap<String, Vec<u8>>,
}

impl AssetCache {
    /// Park probed bytes under the path. A re-probe replaces the entry.
    pub fn insert(&mut self, path: String, bytes: Vec<u8>) {
        self.entries.insert(path, bytes);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume-once read: copy the entry into `dst` and remove it.
    ///
    /// An undersized destination errors without copying and *retains* the
    /// entry, so the caller can retry with a correctly sized buffer.
    pub fn consume_into(&mut self, path: &str, dst: &mut [u8]) -> Result<usize, ConsumeError> {
        let needed = match self.entries.get(path) {
            Some(bytes) => bytes.len(),
            None => return Err(ConsumeError::Miss),
        };
        if dst.len() < needed {
            return Err(ConsumeError::TooSmall { needed });
        }

        let bytes = self
            .entries
            .remove(path)
            .expect("entry vanished between get and remove");
        dst[..needed].copy_from_slice(&bytes);
        Ok(needed)
    }
}

/// Fetch an asset (assets-root relative) and apply the empty-body rule.
pub async fn fetch_asset(fetcher: &dyn AssetFetcher, path: &str) -> FetchResult {
    let bytes = fetcher.fetch(&asset_url(path)).await?;
    if bytes.is_empty() {
        return Err(FetchError::EmptyContent);
    }
    Ok(bytes)
}

/// Kick off a size probe on the shared runtime. The result lands in the
/// completion queue and is only delivered to the guest by the pump, so the
/// callback never fires within the requesting call.
pub fn spawn_size_probe(
    fetcher: Arc<dyn AssetFetcher>,
    tx: mpsc::UnboundedSender<Completion>,
    path: String,
    request_id: u32,
) {
    crate::rt::spawn(async move {
        let result = fetch_asset(fetcher.as_ref(), &path).await;
        // Receiver dropped means the bridge is gone; nothing left to notify.
        let _ = tx.send(Completion::AssetSize {
            request_id,
            path,
            result,
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_before_probe_is_a_miss_and_leaves_dst_untouched() {
        let mut cache = AssetCache::default();
        let mut dst = [0xAAu8; 8];

        assert_eq!(
            cache.consume_into("level1.bin", &mut dst),
            Err(ConsumeError::Miss)
        );
        assert_eq!(dst, [0xAAu8; 8]);
    }

    #[test]
    fn consume_once_then_miss() {
        let mut cache = AssetCache::default();
        cache.insert("level1.bin".into(), vec![1, 2, 3, 4]);

        let mut dst = [0u8; 8];
        assert_eq!(cache.consume_into("level1.bin", &mut dst), Ok(4));
        assert_eq!(&dst[..4], &[1, 2, 3, 4]);

        // Second load without a new probe always reports the miss.
        assert_eq!(
            cache.consume_into("level1.bin", &mut dst),
            Err(ConsumeError::Miss)
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn undersized_destination_errors_and_retains_entry() {
        let mut cache = AssetCache::default();
        cache.insert("big.bin".into(), vec![9u8; 16]);

        let mut small = [0u8; 4];
        assert_eq!(
            cache.consume_into("big.bin", &mut small),
            Err(ConsumeError::TooSmall { needed: 16 })
        );
        assert_eq!(small, [0u8; 4]);
        assert!(cache.contains("big.bin"));

        // A correctly sized retry still succeeds.
        let mut right = [0u8; 16];
        assert_eq!(cache.consume_into("big.bin", &mut right), Ok(16));
    }

    #[test]
    fn reprobe_replaces_entry() {
        let mut cache = AssetCache::default();
        cache.insert("a.bin".into(), vec![1]);
        cache.insert("a.bin".into(), vec![2, 3]);
        assert_eq!(cache.len(), 1);

        let mut dst = [0u8; 2];
        assert_eq!(cache.consume_into("a.bin", &mut dst), Ok(2));
        assert_eq!(dst, [2, 3]);
    }

    #[tokio::test]
    async fn dir_fetcher_reads_assets_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/level1.bin"), vec![7u8; 1024]).unwrap();

        let fetcher = DirFetcher::new(dir.path());
        let bytes = fetch_asset(&fetcher, "level1.bin").await.unwrap();
        assert_eq!(bytes.len(), 1024);
    }

    #[tokio::test]
    async fn dir_fetcher_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = DirFetcher::new(dir.path());

        let err = fetch_asset(&fetcher, "missing.bin").await.unwrap_err();
        assert_eq!(err, FetchError::NotFound);
        assert_eq!(err.to_string(), "Not Found");
    }

    #[tokio::test]
    async fn empty_body_is_reported_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/empty.bin"), b"").unwrap();

        let fetcher = DirFetcher::new(dir.path());
        let err = fetch_asset(&fetcher, "empty.bin").await.unwrap_err();
        assert_eq!(err, FetchError::EmptyContent);
        assert_eq!(err.code(), err_code::EMPTY_CONTENT);
    }

    #[tokio::test]
    async fn chunked_fetch_reassembles_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let body: Vec<u8> = (0..200_000usize).map(|i| (i % 251) as u8).collect();
        std::fs::write(dir.path().join("main.wasm"), &body).unwrap();

        let fetcher = DirFetcher::new(dir.path());
        assert!(fetcher.supports_streaming());

        let mut rx = fetcher.fetch_chunked("main.wasm").unwrap();
        let mut got = Vec::new();
        while let Some(chunk) = rx.recv().await {
            got.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(got, body);
    }
}
