//! Owned, lazily-initialized speech model.
//!
//! The handle loads its model on first use and hands out the cached instance
//! afterwards. A failed load is remembered: every later request fails with
//! [`VidloreError::ModelLoad`] without touching the loader until [`SpeechModelHandle::reload`]
//! succeeds. Loading happens under the state lock, so concurrent first use loads once.

use super::{SpeechModel, SpeechModelLoader};
use crate::error::{Result, VidloreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

enum ModelState {
    Unloaded,
    Ready(Arc<dyn SpeechModel>),
    Failed(String),
}

/// Observable state of a [`SpeechModelHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// No load has been attempted yet.
    NotLoaded,
    /// The model is loaded and cached.
    Loaded,
    /// The last load failed with this message.
    Failed(String),
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelStatus::NotLoaded => write!(f, "not loaded"),
            ModelStatus::Loaded => write!(f, "loaded"),
            ModelStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Process-wide speech model with a guarded single initialization.
pub struct SpeechModelHandle {
    loader: Arc<dyn SpeechModelLoader>,
    model_size: String,
    state: Mutex<ModelState>,
    load_attempts: AtomicUsize,
}

impl SpeechModelHandle {
    pub fn new(loader: Arc<dyn SpeechModelLoader>, model_size: &str) -> Self {
        Self {
            loader,
            model_size: model_size.to_string(),
            state: Mutex::new(ModelState::Unloaded),
            load_attempts: AtomicUsize::new(0),
        }
    }

    pub fn model_size(&self) -> &str {
        &self.model_size
    }

    /// Number of times the loader has been invoked.
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> ModelStatus {
        match &*self.state.lock().await {
            ModelState::Unloaded => ModelStatus::NotLoaded,
            ModelState::Ready(_) => ModelStatus::Loaded,
            ModelState::Failed(reason) => ModelStatus::Failed(reason.clone()),
        }
    }

    /// Get the model, loading it on first use.
    pub async fn get(&self) -> Result<Arc<dyn SpeechModel>> {
        let mut state = self.state.lock().await;

        match &*state {
            ModelState::Ready(model) => return Ok(Arc::clone(model)),
            ModelState::Failed(reason) => return Err(VidloreError::ModelLoad(reason.clone())),
            ModelState::Unloaded => {}
        }

        info!("Loading speech model: {}", self.model_size);
        self.load_attempts.fetch_add(1, Ordering::SeqCst);

        match self.loader.load(&self.model_size).await {
            Ok(model) => {
                info!("Speech model {} loaded successfully", model.name());
                *state = ModelState::Ready(Arc::clone(&model));
                Ok(model)
            }
            Err(e) => {
                let reason = match e {
                    VidloreError::ModelLoad(reason) => reason,
                    other => other.to_string(),
                };
                error!("Failed to load speech model {}: {}", self.model_size, reason);
                *state = ModelState::Failed(reason.clone());
                Err(VidloreError::ModelLoad(reason))
            }
        }
    }

    /// Discard any cached model or remembered failure and load again.
    pub async fn reload(&self) -> Result<Arc<dyn SpeechModel>> {
        {
            let mut state = self.state.lock().await;
            *state = ModelState::Unloaded;
        }
        self.get().await
    }
}
