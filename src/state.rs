use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, quiz::QuizService, storage::DynStorage};

#[derive(Clone)]
pub struct AppState {
    pub storage: DynStorage,
    pub quiz: QuizService,
    pub config: Config,
}

impl AppState {
    pub fn new(storage: DynStorage, config: Config) -> Self {
        let quiz = QuizService::new(Arc::clone(&storage), config.review_policy);
        Self {
            storage,
            quiz,
            config,
        }
    }
}

impl FromRef<AppState> for DynStorage {
    fn from_ref(state: &AppState) -> Self {
        state.storage.clone()
    }
}

impl FromRef<AppState> for QuizService {
    fn from_ref(state: &AppState) -> Self {
        state.quiz.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
