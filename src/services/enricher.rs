//! Concurrent per-hit enrichment with ordered fan-in.

use crate::api::{CoarseHit, RemoteService, Slot};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Fetches the detailed record for every coarse hit.
pub struct ResultEnricher<R> {
    remote: Arc<R>,
}

impl<R: RemoteService> ResultEnricher<R> {
    #[must_use]
    pub fn new(remote: Arc<R>) -> Self {
        Self { remote }
    }

    /// Enriches `hits` concurrently and returns one slot per hit, in input order.
    ///
    /// Each call writes into the slot addressed by its input index, so the
    /// order in which calls finish has no effect on the output. A call that
    /// fails, reports a rate limit, or whose task dies leaves the sentinel in
    /// its slot. Waits for every call to settle.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn enrich(&self, hits: &[CoarseHit]) -> Vec<Slot> {
        let mut slots: Vec<Option<Slot>> = vec![None; hits.len()];
        let mut tasks = JoinSet::new();

        for (index, hit) in hits.iter().enumerate() {
            let remote = Arc::clone(&self.remote);
            let login = hit.login.clone();
            tasks.spawn(async move {
                let result = remote.fetch_user(&login).await;
                (index, login, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(record))) => slots[index] = Some(Slot::Record(record)),
                Ok((index, login, Err(e))) => {
                    tracing::debug!(%login, code = e.code(), "Enrichment failed: {e}");
                    slots[index] = Some(Slot::RateLimited);
                }
                // Slot stays empty and becomes the sentinel below
                Err(e) => tracing::warn!("Enrichment task did not complete: {e}"),
            }
        }

        let slots: Vec<Slot> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Slot::RateLimited))
            .collect();

        let sentinels = slots.iter().filter(|s| s.is_sentinel()).count();
        if sentinels > 0 {
            tracing::warn!(
                total = slots.len(),
                sentinels,
                "Some hits could not be enriched"
            );
        }

        slots
    }
}
