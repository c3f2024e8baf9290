//! At most one backend search in flight, run on a worker thread.

use crate::{
    backend::Backend,
    error::{BackendError, SearchError},
    form_state::FormState,
    query::build_request,
    results::SearchResult,
};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{self, Receiver, TryRecvError},
    },
    thread,
};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchStatus {
    Idle,
    Running,
    Success(SearchResult),
    Aborted,
    TransportError(String),
    BackendError(String),
    ProtocolError(String),
}

impl SearchStatus {
    fn from_outcome(outcome: Result<SearchResult, BackendError>) -> Self {
        match outcome {
            Ok(result) => Self::Success(result),
            Err(BackendError::Transport(msg)) => Self::TransportError(msg),
            Err(BackendError::Remote { message }) => Self::BackendError(message),
            Err(BackendError::Protocol(msg)) => Self::ProtocolError(msg),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Running => "Searching...".to_string(),
            Self::Success(_) => "Search successful.".to_string(),
            Self::Aborted => "Search aborted.".to_string(),
            Self::TransportError(msg) => {
                format!("ERROR: Cannot communicate with the Lattice Builder service: {msg}")
            }
            Self::BackendError(msg) => format!("ERROR: {msg}"),
            Self::ProtocolError(msg) => format!("ERROR: malformed response: {msg}"),
        }
    }
}

/// Outcome of the version check run before the first search.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    Unchecked,
    Available { version: String },
    Unavailable { reason: String },
}

struct Shared {
    active: Mutex<Option<u64>>,
    status: Mutex<SearchStatus>,
}

impl Shared {
    /// Releases the session if run `id` still owns it and records `status`.
    fn finish(&self, id: u64, status: SearchStatus) -> bool {
        let mut active = self.active.lock().expect("search lock poisoned");
        if *active != Some(id) {
            return false;
        }
        *active = None;
        *self.status.lock().expect("search status lock poisoned") = status;
        true
    }
}

pub struct SearchSession {
    backend: Arc<dyn Backend>,
    shared: Arc<Shared>,
    next_run: AtomicU64,
    availability: Mutex<Availability>,
}

impl SearchSession {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            shared: Arc::new(Shared {
                active: Mutex::new(None),
                status: Mutex::new(SearchStatus::Idle),
            }),
            next_run: AtomicU64::new(0),
            availability: Mutex::new(Availability::Unchecked),
        }
    }

    /// Asks the backend for its version. A failure disables search until a
    /// later check succeeds.
    pub fn check_backend(&self) -> Result<String, BackendError> {
        let outcome = self.backend.backend_version();
        let availability = match &outcome {
            Ok(version) => {
                info!(version = %version, "backend available");
                Availability::Available {
                    version: version.clone(),
                }
            }
            Err(err) => {
                warn!(error = %err, "backend unavailable; search disabled");
                Availability::Unavailable {
                    reason: err.to_string(),
                }
            }
        };
        *self
            .availability
            .lock()
            .expect("search availability lock poisoned") = availability;
        outcome
    }

    pub fn availability(&self) -> Availability {
        self.availability
            .lock()
            .expect("search availability lock poisoned")
            .clone()
    }

    pub fn status(&self) -> SearchStatus {
        self.shared
            .status
            .lock()
            .expect("search status lock poisoned")
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared
            .active
            .lock()
            .expect("search lock poisoned")
            .is_some()
    }

    /// Validates `state`, then sends the request from a worker thread.
    /// Refused when the last backend check failed.
    pub fn start(&self, state: &FormState) -> Result<SearchHandle, SearchError> {
        if let Availability::Unavailable { reason } = self.availability() {
            return Err(SearchError::BackendUnavailable(reason));
        }
        let request = build_request(state)?;
        let id = self.next_run.fetch_add(1, Ordering::SeqCst);
        {
            let mut active = self.shared.active.lock().expect("search lock poisoned");
            if active.is_some() {
                return Err(SearchError::AlreadyRunning);
            }
            *active = Some(id);
            *self.shared.status.lock().expect("search status lock poisoned") =
                SearchStatus::Running;
        }
        info!(run = id, construction = %request.construction, "search started");

        let (tx, rx) = mpsc::channel();
        let aborted = Arc::new(AtomicBool::new(false));
        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&self.shared);
        let worker_aborted = Arc::clone(&aborted);
        let params = request.to_params();
        thread::spawn(move || {
            let outcome = backend.latbuilder_exec(&params);
            if worker_aborted.load(Ordering::SeqCst) {
                info!(run = id, "discarding result of aborted search");
                return;
            }
            let status = SearchStatus::from_outcome(outcome);
            if let SearchStatus::TransportError(msg)
            | SearchStatus::BackendError(msg)
            | SearchStatus::ProtocolError(msg) = &status
            {
                warn!(run = id, error = %msg, "search failed");
            }
            shared.finish(id, status.clone());
            let _ = tx.send(status);
        });

        Ok(SearchHandle {
            id,
            rx,
            aborted,
            shared: Arc::clone(&self.shared),
            outcome: None,
        })
    }
}

pub struct SearchHandle {
    id: u64,
    rx: Receiver<SearchStatus>,
    aborted: Arc<AtomicBool>,
    shared: Arc<Shared>,
    outcome: Option<SearchStatus>,
}

impl SearchHandle {
    /// Detaches from the worker. Its eventual result is discarded and the
    /// session is free for a new search right away. A search that already
    /// finished keeps its outcome.
    pub fn abort(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        self.aborted.store(true, Ordering::SeqCst);
        if self.shared.finish(self.id, SearchStatus::Aborted) {
            self.outcome = Some(SearchStatus::Aborted);
            info!(run = self.id, "search aborted");
            return;
        }
        // The worker recorded its status first and sends it right after.
        let status = self.rx.recv().unwrap_or_else(|_| self.lost_worker());
        info!(run = self.id, "search already finished; abort ignored");
        self.outcome = Some(status);
    }

    /// The final status, if the search is over.
    pub fn try_result(&mut self) -> Option<SearchStatus> {
        if self.outcome.is_none() {
            match self.rx.try_recv() {
                Ok(status) => self.outcome = Some(status),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => self.outcome = Some(self.lost_worker()),
            }
        }
        self.outcome.clone()
    }

    /// Blocks until the search is over.
    pub fn wait(mut self) -> SearchStatus {
        if let Some(status) = self.outcome.take() {
            return status;
        }
        self.rx.recv().unwrap_or_else(|_| self.lost_worker())
    }

    fn lost_worker(&self) -> SearchStatus {
        let status = SearchStatus::TransportError("search worker ended without a result".into());
        self.shared.finish(self.id, status.clone());
        status
    }
}
