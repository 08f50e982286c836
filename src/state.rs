//! Application state: the quiz generator, generation defaults, and the in-memory session store.
//!
//! Each session owns its own `QuizFlow`; sessions are never shared between attempts.
//! The store lock is never held across a generation call. Sessions untouched for longer
//! than `session_ttl` are evicted by a periodic sweep (`spawn_session_sweeper`).

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::load_config_from_env;
use crate::domain::{GenerationOptions, SourceMaterial};
use crate::error::ServiceError;
use crate::generator::{QuizGenerator, ReviewerGenerator};
use crate::openai::OpenAI;
use crate::playback::{Action, Effect, QuizFlow};
use crate::seeds::SeedGenerator;

/// One quiz attempt plus what is needed to regenerate it.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub source: SourceMaterial,
    pub options: GenerationOptions,
    pub flow: QuizFlow,
    /// Refreshed on every access through `with_session`.
    pub last_touched: Instant,
}

const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, QuizSession>>>,
    pub generator: Arc<dyn QuizGenerator>,
    pub reviewer: Arc<dyn ReviewerGenerator>,
    pub defaults: GenerationOptions,
    pub session_ttl: Duration,
}

impl AppState {
    /// Build state from env: load config, then pick OpenAI when a key is present, else the seed quiz.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_config_from_env().unwrap_or_default();

        let (generator, reviewer): (Arc<dyn QuizGenerator>, Arc<dyn ReviewerGenerator>) =
            match OpenAI::from_env(cfg.prompts) {
                Some(oa) => {
                    info!(target: "pic2quiz", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
                    let oa = Arc::new(oa);
                    let generator: Arc<dyn QuizGenerator> = oa.clone();
                    let reviewer: Arc<dyn ReviewerGenerator> = oa;
                    (generator, reviewer)
                }
                None => {
                    info!(target: "pic2quiz", "OpenAI disabled (no OPENAI_API_KEY). Serving the built-in seed quiz.");
                    let generator: Arc<dyn QuizGenerator> = Arc::new(SeedGenerator);
                    let reviewer: Arc<dyn ReviewerGenerator> = Arc::new(SeedGenerator);
                    (generator, reviewer)
                }
            };

        let ttl = std::env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);
        info!(target: "pic2quiz", ttl_secs = ttl, "Session expiry configured");

        Self::new(generator, cfg.defaults)
            .with_reviewer(reviewer)
            .with_session_ttl(Duration::from_secs(ttl))
    }

    /// State with the seed reviewer and the default session expiry.
    pub fn new(generator: Arc<dyn QuizGenerator>, defaults: GenerationOptions) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            generator,
            reviewer: Arc::new(SeedGenerator),
            defaults,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }

    pub fn with_reviewer(mut self, reviewer: Arc<dyn ReviewerGenerator>) -> Self {
        self.reviewer = reviewer;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Register a new session already in `Loading`; returns its id and load epoch.
    #[instrument(level = "debug", skip_all, fields(source_len = source.as_str().len()))]
    pub async fn insert_session(&self, source: SourceMaterial, options: GenerationOptions) -> (String, u64) {
        let id = Uuid::new_v4().to_string();
        let mut flow = QuizFlow::new();
        let epoch = begin_load(&mut flow);
        self.sessions
            .write()
            .await
            .insert(id.clone(), QuizSession { source, options, flow, last_touched: Instant::now() });
        (id, epoch)
    }

    /// Run `f` against the session under the write lock.
    pub async fn with_session<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut QuizSession) -> R,
    ) -> Result<R, ServiceError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        session.last_touched = Instant::now();
        Ok(f(session))
    }

    pub async fn remove_session(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Drop every session idle for longer than `max_idle`; returns how many were removed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_touched.elapsed() <= max_idle);
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Background sweep evicting idle sessions. Runs every `ttl / 4` (at least once a second).
pub fn spawn_session_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let ttl = state.session_ttl;
    let period = (ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = state.evict_idle(ttl).await;
            if evicted > 0 {
                info!(target: "quiz", evicted, "Evicted idle quiz sessions");
            } else {
                debug!(target: "quiz", "Session sweep found nothing to evict");
            }
        }
    })
}

/// Start a new load on `flow` and return the epoch its result must carry.
pub fn begin_load(flow: &mut QuizFlow) -> u64 {
    match flow.apply(Action::BeginLoad) {
        Ok(Effect::LoadStarted { epoch }) => epoch,
        _ => flow.epoch(),
    }
}
