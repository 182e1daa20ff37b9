// Shared router state

use axum::extract::FromRef;
use smartstudy_core::{Assistant, EventStore, TaskStore};
use std::sync::Arc;

use crate::auth::AuthState;

/// App state for every API route
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(assistant: Assistant, auth: AuthState) -> Self {
        Self {
            assistant: Arc::new(assistant),
            auth,
        }
    }

    pub fn events(&self) -> &dyn EventStore {
        self.assistant.dispatcher().events().as_ref()
    }

    pub fn tasks(&self) -> &dyn TaskStore {
        self.assistant.dispatcher().tasks().as_ref()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}
