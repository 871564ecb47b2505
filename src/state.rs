use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    notify::NotificationQueue,
    store::{InMemorySessionStore, QuestionBank, RecordingStore, ResultStore, SessionStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<dyn SessionStore>,
    pub questions: QuestionBank,
    pub results: ResultStore,
    pub recordings: RecordingStore,
    pub notifier: NotificationQueue,
}

impl AppState {
    /// Builds state with file stores rooted at the configured paths.
    pub fn new(
        config: Config,
        sessions: Arc<dyn SessionStore>,
        notifier: NotificationQueue,
    ) -> Self {
        Self {
            questions: QuestionBank::new(&config.questions_path),
            results: ResultStore::new(&config.results_path),
            recordings: RecordingStore::new(&config.recordings_path),
            config,
            sessions,
            notifier,
        }
    }

    /// In-memory sessions, notifications disabled.
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(InMemorySessionStore::new()),
            NotificationQueue::disabled(),
        )
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn SessionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for QuestionBank {
    fn from_ref(state: &AppState) -> Self {
        state.questions.clone()
    }
}

impl FromRef<AppState> for ResultStore {
    fn from_ref(state: &AppState) -> Self {
        state.results.clone()
    }
}
