// Format catalog fetcher - one backend round trip per query, newest query wins

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use super::errors::{Result, SubmitError};
use super::format_selector::FormatSelector;
use super::models::FormatCatalog;
use super::traits::RpcClient;
use crate::rpc::RpcError;

#[derive(Default)]
struct InFlight {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Queries formats without caching; a second query for the same URL
/// goes back to the backend.
pub struct FormatCatalogFetcher {
    client: Arc<dyn RpcClient>,
    session: CancellationToken,
    in_flight: Mutex<InFlight>,
}

impl FormatCatalogFetcher {
    /// `session` cancels every query started through this fetcher
    pub fn new(client: Arc<dyn RpcClient>, session: CancellationToken) -> Self {
        Self {
            client,
            session,
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    /// Fetch the catalog for `url`.
    ///
    /// Starting a query cancels the one still outstanding; its caller gets
    /// [`SubmitError::Superseded`]. An empty catalog counts as a failure.
    pub async fn fetch(&self, url: &str) -> Result<FormatCatalog> {
        let (generation, token) = self.begin();

        tracing::debug!(url, generation, via = self.client.name(), "querying formats");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(if self.session.is_cancelled() {
                SubmitError::Cancelled
            } else {
                SubmitError::Superseded(url.to_string())
            }),
            res = self.client.formats(url) => res.map_err(SubmitError::from),
        };

        self.finish(generation);

        let catalog = result?;
        if !FormatSelector::is_usable(&catalog) {
            tracing::warn!(url, "backend returned no usable formats");
            return Err(SubmitError::FetchFailed(RpcError::EmptyResult));
        }

        tracing::debug!(url, formats = catalog.formats.len(), "formats ready");
        Ok(catalog)
    }

    /// Cancel the outstanding query, if any
    pub fn cancel(&self) {
        let mut in_flight = self.lock();
        if let Some(token) = in_flight.token.take() {
            token.cancel();
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.lock().token.is_some()
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let mut in_flight = self.lock();
        if let Some(previous) = in_flight.token.take() {
            tracing::debug!(generation = in_flight.generation, "superseding format query");
            previous.cancel();
        }
        in_flight.generation += 1;
        let token = self.session.child_token();
        in_flight.token = Some(token.clone());
        (in_flight.generation, token)
    }

    fn finish(&self, generation: u64) {
        let mut in_flight = self.lock();
        if in_flight.generation == generation {
            in_flight.token = None;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}
