#![allow(dead_code)]

//! Request fetcher: loads the records for a filter and commits only the
//! newest response.
//!
//! Each call to `RequestFetcher::fetch` takes a generation ticket. When the
//! store answers, the result is committed to `FetchState` only if no newer
//! fetch has started in the meantime; older responses are dropped.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::AppError;
use crate::models::request::ServiceRequestRow;
use crate::requests::filter::RequestFilter;
use crate::store::RequestStore;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Pull the full dataset and filter it in process.
    InMemory,
    /// Push the filter down to the store as query parameters.
    #[default]
    ServerSide,
}

#[derive(Debug, Error)]
#[error("unknown fetch mode '{0}', expected 'memory' or 'server'")]
pub struct ParseFetchModeError(String);

impl FromStr for FetchMode {
    type Err = ParseFetchModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "in_memory" => Ok(FetchMode::InMemory),
            "server" | "server_side" => Ok(FetchMode::ServerSide),
            other => Err(ParseFetchModeError(other.to_string())),
        }
    }
}

/// Loads the records matching `filter`.
pub async fn load(
    store: &dyn RequestStore,
    mode: FetchMode,
    filter: &RequestFilter,
) -> Result<Vec<ServiceRequestRow>, AppError> {
    match mode {
        FetchMode::ServerSide => store.fetch_requests(filter).await,
        FetchMode::InMemory => {
            let all = store.fetch_requests(&RequestFilter::default()).await?;
            if filter.is_unrestricted() {
                return Ok(all);
            }
            Ok(all.into_iter().filter(|r| filter.matches(r)).collect())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Ready(Arc<Vec<ServiceRequestRow>>),
    Failed(String),
}

pub struct RequestFetcher {
    store: Arc<dyn RequestStore>,
    mode: FetchMode,
    generation: AtomicU64,
    state: Mutex<FetchState>,
}

impl RequestFetcher {
    pub fn new(store: Arc<dyn RequestStore>, mode: FetchMode) -> Self {
        Self {
            store,
            mode,
            generation: AtomicU64::new(0),
            state: Mutex::new(FetchState::Idle),
        }
    }

    pub async fn state(&self) -> FetchState {
        self.state.lock().await.clone()
    }

    /// Fetches for `filter`. Returns `Ok(None)` when a newer fetch started
    /// before this one resolved; the stale result is discarded.
    pub async fn fetch(
        &self,
        filter: &RequestFilter,
    ) -> Result<Option<Arc<Vec<ServiceRequestRow>>>, AppError> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.lock().await = FetchState::Loading;

        let result = load(self.store.as_ref(), self.mode, filter).await;

        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != ticket {
            debug!("Discarding stale fetch generation {ticket}");
            return Ok(None);
        }
        match result {
            Ok(rows) => {
                let rows = Arc::new(rows);
                *state = FetchState::Ready(Arc::clone(&rows));
                Ok(Some(rows))
            }
            Err(e) => {
                *state = FetchState::Failed(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lookup::{LookupKind, LookupRow};
    use crate::models::request::{AiAnalysisRow, NewAnalysis, NewServiceRequest, RequestHistoryRow};
    use crate::requests::filter::FilterState;
    use crate::store::memory::MemoryStore;
    use crate::testing::Seed;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;
    use uuid::Uuid;

    /// Store whose fetches each block until the test releases them.
    struct GatedStore {
        inner: MemoryStore,
        gates: std::sync::Mutex<VecDeque<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl RequestStore for GatedStore {
        async fn lookups(&self, kind: LookupKind) -> Result<Vec<LookupRow>, AppError> {
            self.inner.lookups(kind).await
        }

        async fn fetch_requests(
            &self,
            filter: &RequestFilter,
        ) -> Result<Vec<ServiceRequestRow>, AppError> {
            let gate = self.gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                gate.await.ok();
            }
            self.inner.fetch_requests(filter).await
        }

        async fn get_request(&self, id: Uuid) -> Result<Option<ServiceRequestRow>, AppError> {
            self.inner.get_request(id).await
        }

        async fn history(&self, id: Uuid) -> Result<Vec<RequestHistoryRow>, AppError> {
            self.inner.history(id).await
        }

        async fn analysis(&self, id: Uuid) -> Result<Option<AiAnalysisRow>, AppError> {
            self.inner.analysis(id).await
        }

        async fn update_status(
            &self,
            id: Uuid,
            status_id: Uuid,
            note: &str,
            updated_by: &str,
        ) -> Result<(), AppError> {
            self.inner.update_status(id, status_id, note, updated_by).await
        }

        async fn create_request(
            &self,
            request: &NewServiceRequest,
            analysis: &NewAnalysis,
        ) -> Result<Uuid, AppError> {
            self.inner.create_request(request, analysis).await
        }
    }

    fn seeded_store(seed: &Seed) -> MemoryStore {
        let store = MemoryStore::with_lookups(seed.rows());
        store.seed(seed.request("pothole", &seed.pothole, 1));
        let mut closed = seed.request("graffiti", &seed.graffiti, 2);
        closed.status_id = seed.closed.id;
        store.seed(closed);
        store
    }

    #[tokio::test]
    async fn test_server_side_and_in_memory_agree() {
        let seed = Seed::new();
        let store = seeded_store(&seed);
        let mut filters = FilterState::default();
        let filter = filters.select(LookupKind::Status, [seed.closed.id]);

        let server = load(&store, FetchMode::ServerSide, &filter).await.unwrap();
        let memory = load(&store, FetchMode::InMemory, &filter).await.unwrap();
        assert_eq!(server, memory);
        assert_eq!(server.len(), 1);
        assert_eq!(server[0].summary, "graffiti");
    }

    #[tokio::test]
    async fn test_in_memory_without_filter_returns_everything() {
        let seed = Seed::new();
        let store = seeded_store(&seed);
        let filter = RequestFilter::default();

        let memory = load(&store, FetchMode::InMemory, &filter).await.unwrap();
        assert_eq!(memory.len(), 2);
        assert_eq!(memory, load(&store, FetchMode::ServerSide, &filter).await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_commits_ready_state() {
        let seed = Seed::new();
        let fetcher = RequestFetcher::new(Arc::new(seeded_store(&seed)), FetchMode::InMemory);
        assert!(matches!(fetcher.state().await, FetchState::Idle));
        let rows = fetcher.fetch(&RequestFilter::default()).await.unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(matches!(fetcher.state().await, FetchState::Ready(r) if r.len() == 2));
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let seed = Seed::new();
        let (release_first, first_gate) = oneshot::channel();
        let (release_second, second_gate) = oneshot::channel();
        let store = GatedStore {
            inner: seeded_store(&seed),
            gates: std::sync::Mutex::new(VecDeque::from([first_gate, second_gate])),
        };
        let fetcher = RequestFetcher::new(Arc::new(store), FetchMode::ServerSide);

        let mut filters = FilterState::default();
        let everything = filters.current().clone();
        let only_closed = filters.select(LookupKind::Status, [seed.closed.id]);

        // The older fetch resolves last and must not overwrite the newer result.
        let (older, newer, _) = tokio::join!(
            fetcher.fetch(&everything),
            fetcher.fetch(&only_closed),
            async {
                release_second.send(()).ok();
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                release_first.send(()).ok();
            }
        );

        assert!(older.unwrap().is_none());
        let newer = newer.unwrap().expect("newest fetch commits");
        assert_eq!(newer.len(), 1);
        match fetcher.state().await {
            FetchState::Ready(rows) => assert_eq!(rows[0].summary, "graffiti"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_fetch_mode_parses() {
        assert_eq!("memory".parse::<FetchMode>().unwrap(), FetchMode::InMemory);
        assert_eq!("SERVER".parse::<FetchMode>().unwrap(), FetchMode::ServerSide);
        assert!("cache".parse::<FetchMode>().is_err());
    }
}
