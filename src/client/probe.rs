//! Reachability Probes
//!
//! A probe answers one question: can the backend be reached right now? It
//! never reports why not; errors and "no" look the same to the monitor.

use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// Async reachability check against the remote backend
pub trait ReachabilityProbe: Send + Sync {
    fn probe(&self) -> BoxFuture<'static, bool>;
}

/// Probe backed by a closure returning a future
pub struct FnProbe<F> {
    check: F,
}

impl<F> fmt::Debug for FnProbe<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnProbe")
    }
}

/// Wrap a closure as a [`ReachabilityProbe`]
pub fn probe_fn<F, Fut>(check: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send + 'static,
{
    FnProbe { check }
}

impl<F, Fut> ReachabilityProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send + 'static,
{
    fn probe(&self) -> BoxFuture<'static, bool> {
        Box::pin((self.check)())
    }
}

#[cfg(feature = "http-probe")]
pub use http::HttpProbe;

#[cfg(feature = "http-probe")]
mod http {
    use super::ReachabilityProbe;
    use crate::shared::config::SyncConfig;
    use futures_util::future::BoxFuture;

    /// Probe issuing a GET against the backend health endpoint
    #[derive(Debug, Clone)]
    pub struct HttpProbe {
        client: reqwest::Client,
        url: String,
    }

    impl HttpProbe {
        pub fn new(url: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                url: url.into(),
            }
        }

        pub fn from_config(config: &SyncConfig) -> Self {
            Self::new(config.health_url())
        }

        pub fn url(&self) -> &str {
            &self.url
        }
    }

    impl ReachabilityProbe for HttpProbe {
        fn probe(&self) -> BoxFuture<'static, bool> {
            let client = self.client.clone();
            let url = self.url.clone();
            Box::pin(async move {
                match client.get(&url).send().await {
                    Ok(response) => {
                        let ok = response.status().is_success();
                        if !ok {
                            tracing::debug!("[NET] probe {} returned {}", url, response.status());
                        }
                        ok
                    }
                    Err(e) => {
                        tracing::debug!("[NET] probe {} failed: {}", url, e);
                        false
                    }
                }
            })
        }
    }
}
