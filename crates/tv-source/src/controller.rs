//! Tracks the resolution of the currently selected source.
//!
//! Every request bumps a generation counter. A finished resolution only
//! publishes its outcome if its generation is still current when it
//! completes, so a slow answer for a channel the user already left can
//! never replace the state of the newer request. Superseded tasks are
//! also aborted.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

use crate::{
    builder::build_playback_url,
    resolver::{HttpFetcher, ReqwestFetcher, ResolutionOutcome, StreamResolver},
    source::{SourceDescriptor, SourceKey},
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolutionState {
    Idle,
    Resolving { key: SourceKey },
    Resolved { key: SourceKey, url: String },
    Failed { key: SourceKey },
}

impl ResolutionState {
    pub fn key(&self) -> Option<&SourceKey> {
        match self {
            ResolutionState::Idle => None,
            ResolutionState::Resolving { key }
            | ResolutionState::Resolved { key, .. }
            | ResolutionState::Failed { key } => Some(key),
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, ResolutionState::Resolving { .. })
    }
}

/// Where `parse` sources get resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Run the [`StreamResolver`] in-process.
    #[default]
    Local,
    /// Hand the source to a resolve proxy at `base`.
    Proxy { base: String },
}

#[derive(Default)]
struct Inner {
    generation: u64,
    source: Option<SourceDescriptor>,
    task: Option<JoinHandle<()>>,
}

pub struct ResolutionController<F = ReqwestFetcher> {
    resolver: Arc<StreamResolver<F>>,
    mode: ResolutionMode,
    inner: Arc<Mutex<Inner>>,
    state: Arc<watch::Sender<ResolutionState>>,
}

impl<F: HttpFetcher + 'static> ResolutionController<F> {
    pub fn new(resolver: Arc<StreamResolver<F>>, mode: ResolutionMode) -> Self {
        let (state, _) = watch::channel(ResolutionState::Idle);
        Self {
            resolver,
            mode,
            inner: Arc::new(Mutex::new(Inner::default())),
            state: Arc::new(state),
        }
    }

    pub fn resolver(&self) -> &Arc<StreamResolver<F>> {
        &self.resolver
    }

    pub fn mode(&self) -> &ResolutionMode {
        &self.mode
    }

    /// Starts resolving `source` unless it is already the current request.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request(&self, source: &SourceDescriptor) {
        let mut inner = self.inner.lock();
        if inner.source.as_ref().map(SourceDescriptor::key) == Some(source.key()) {
            debug!("Ignoring repeated request for {}", source.key());
            return;
        }
        self.start(&mut inner, source.clone());
    }

    /// Resolves the current source again, e.g. after it failed.
    pub fn refresh(&self) {
        let mut inner = self.inner.lock();
        if let Some(source) = inner.source.clone() {
            self.start(&mut inner, source);
        }
    }

    pub fn current_state(&self) -> ResolutionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.state.subscribe()
    }

    /// The playable URL, once the current request has resolved.
    pub fn playback_url(&self) -> Option<String> {
        match &*self.state.borrow() {
            ResolutionState::Resolved { url, .. } => Some(url.clone()),
            _ => None,
        }
    }

    /// Waits until the current request leaves `Resolving`.
    pub async fn settled(&self) -> ResolutionState {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(ResolutionState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.current_state(),
        }
    }

    fn start(&self, inner: &mut Inner, source: SourceDescriptor) {
        inner.generation += 1;
        let generation = inner.generation;
        let key = source.key();

        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.source = Some(source.clone());

        if !source.parse {
            debug!("Direct source {}", key);
            self.state.send_replace(ResolutionState::Resolved {
                key,
                url: source.url,
            });
            return;
        }

        if let ResolutionMode::Proxy { base } = &self.mode {
            let url = build_playback_url(&source, base);
            debug!("Routing {} through proxy as {}", key, url);
            self.state
                .send_replace(ResolutionState::Resolved { key, url });
            return;
        }

        debug!("Resolving {} (generation {})", key, generation);
        self.state
            .send_replace(ResolutionState::Resolving { key: key.clone() });

        let resolver = self.resolver.clone();
        let shared = self.inner.clone();
        let state = self.state.clone();
        inner.task = Some(tokio::spawn(async move {
            let outcome = resolver.resolve(&source.url).await;
            commit(&shared, &state, generation, key, outcome);
        }));
    }
}

/// Publishes `outcome` if `generation` is still the current request.
fn commit(
    inner: &Mutex<Inner>,
    state: &watch::Sender<ResolutionState>,
    generation: u64,
    key: SourceKey,
    outcome: ResolutionOutcome,
) -> bool {
    let mut inner = inner.lock();
    if inner.generation != generation {
        debug!(
            "Dropping stale result for {} (generation {}, current {})",
            key, generation, inner.generation
        );
        return false;
    }

    inner.task = None;
    state.send_replace(match outcome {
        ResolutionOutcome::Resolved(url) => ResolutionState::Resolved { key, url },
        ResolutionOutcome::Failed => ResolutionState::Failed { key },
    });
    true
}

impl<F> Drop for ResolutionController<F> {
    fn drop(&mut self) {
        if let Some(task) = self.inner.lock().task.take() {
            task.abort();
        }
    }
}
