//! Per-model session lifecycle.
//!
//! Each model kind has one slot moving through
//! `Uninitialized → Loading → Ready`, or `Failed` when every provider was
//! rejected. Creation is single-flight: concurrent callers wait on the
//! same load and share its result. `Failed` and released slots can be
//! created again. A create whose future is dropped mid-load leaves the slot
//! `Uninitialized`.

use super::{
    BackendAttempt, DeclaredContract, ExecutionProvider, ModelKind, ModelSession, SessionFactory,
    ValidatedContract,
};
use crate::cache::{AssetSource, ModelCache};
use crate::error::{Error, Result};
use crate::tensor::Tensor;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Everything needed to create a session for one model.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Where the bundled model bytes come from.
    pub asset: Arc<dyn AssetSource>,
    /// File name inside the model cache.
    pub cache_key: String,
    /// Optional SHA-256 of the model file.
    pub sha256: Option<String>,
    /// Expected input/output shapes.
    pub contract: DeclaredContract,
}

/// Public view of a session slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Never created, or released.
    Uninitialized,
    /// Creation in progress.
    Loading,
    /// Usable; runs on `provider`.
    Ready {
        /// Provider the session was created on.
        provider: ExecutionProvider,
    },
    /// Last creation attempt failed.
    Failed {
        /// Error message of the failed attempt.
        reason: String,
    },
}

/// Output of one inference run.
#[derive(Debug, Clone)]
pub struct InferenceOutput {
    /// First model output.
    pub tensor: Tensor,
    /// Wall time spent inside the runtime.
    pub latency: Duration,
}

struct LoadedSession {
    kind: ModelKind,
    provider: ExecutionProvider,
    contract: ValidatedContract,
    session: Mutex<Box<dyn ModelSession>>,
}

impl LoadedSession {
    fn run(&self, input: Tensor) -> Result<InferenceOutput> {
        // A poisoned lock only means an earlier run panicked; the session
        // itself holds no per-run state.
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        let started = Instant::now();
        let tensor = session
            .run(self.contract.input_name(), input, self.contract.output_name())
            .map_err(|e| Error::Inference {
                model: self.kind,
                reason: e.to_string(),
            })?;
        let latency = started.elapsed();

        self.contract.check_output(&tensor)?;
        debug!(
            "{} inference on {} took {:.1} ms",
            self.kind,
            self.provider.id(),
            latency.as_secs_f64() * 1000.0
        );
        Ok(InferenceOutput { tensor, latency })
    }
}

#[derive(Clone)]
enum SlotState {
    Uninitialized,
    Loading,
    Ready(Arc<LoadedSession>),
    Failed(String),
}

impl SlotState {
    fn status(&self) -> SessionStatus {
        match self {
            Self::Uninitialized => SessionStatus::Uninitialized,
            Self::Loading => SessionStatus::Loading,
            Self::Ready(s) => SessionStatus::Ready {
                provider: s.provider,
            },
            Self::Failed(reason) => SessionStatus::Failed {
                reason: reason.clone(),
            },
        }
    }
}

struct Slot {
    kind: ModelKind,
    spec: ModelSpec,
    create_lock: tokio::sync::Mutex<()>,
    state: watch::Sender<SlotState>,
}

impl Slot {
    fn new(kind: ModelKind, spec: ModelSpec) -> Self {
        let (state, _) = watch::channel(SlotState::Uninitialized);
        Self {
            kind,
            spec,
            create_lock: tokio::sync::Mutex::new(()),
            state,
        }
    }
}

/// Puts a slot back to `Uninitialized` if a create is dropped mid-load, so
/// the slot never stays `Loading` with nobody left to finish it.
struct LoadingGuard<'a> {
    slot: Option<&'a Slot>,
}

impl<'a> LoadingGuard<'a> {
    fn new(slot: &'a Slot) -> Self {
        Self { slot: Some(slot) }
    }

    fn disarm(mut self) {
        self.slot = None;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot {
            warn!("{} session creation was cancelled", slot.kind);
            slot.state.send_replace(SlotState::Uninitialized);
        }
    }
}

/// Owns the classification and detection sessions.
pub struct SessionManager {
    factory: Arc<dyn SessionFactory>,
    cache: Arc<ModelCache>,
    providers: Vec<ExecutionProvider>,
    classification: Slot,
    detection: Slot,
}

impl SessionManager {
    /// Manager that loads models through `factory`, trying `providers` in order.
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        cache: Arc<ModelCache>,
        providers: Vec<ExecutionProvider>,
        classification: ModelSpec,
        detection: ModelSpec,
    ) -> Self {
        Self {
            factory,
            cache,
            providers,
            classification: Slot::new(ModelKind::Classification, classification),
            detection: Slot::new(ModelKind::Detection, detection),
        }
    }

    fn slot(&self, kind: ModelKind) -> &Slot {
        match kind {
            ModelKind::Classification => &self.classification,
            ModelKind::Detection => &self.detection,
        }
    }

    /// Provider order used for every creation.
    pub fn providers(&self) -> &[ExecutionProvider] {
        &self.providers
    }

    /// Current state of a model's session.
    pub fn status(&self, kind: ModelKind) -> SessionStatus {
        self.slot(kind).state.borrow().status()
    }

    /// Create the session for `kind` if it is not already ready.
    ///
    /// Calls made while a creation is in flight wait for it instead of
    /// starting another one. Returns the provider the session runs on.
    pub async fn create_session(&self, kind: ModelKind) -> Result<ExecutionProvider> {
        let slot = self.slot(kind);
        let _guard = slot.create_lock.lock().await;

        if let SlotState::Ready(loaded) = &*slot.state.borrow() {
            debug!("{} session already ready", kind);
            return Ok(loaded.provider);
        }

        slot.state.send_replace(SlotState::Loading);
        info!("Creating {} session", kind);
        let loading = LoadingGuard::new(slot);

        let outcome = self.load(slot).await;
        loading.disarm();

        match outcome {
            Ok(loaded) => {
                let provider = loaded.provider;
                slot.state.send_replace(SlotState::Ready(Arc::new(loaded)));
                info!("{} session ready on {}", kind, provider);
                Ok(provider)
            }
            Err(e) => {
                warn!("{} session failed: {}", kind, e);
                slot.state.send_replace(SlotState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn load(&self, slot: &Slot) -> Result<LoadedSession> {
        let spec = &slot.spec;
        let model_path = self
            .cache
            .ensure_local(Arc::clone(&spec.asset), &spec.cache_key, spec.sha256.as_deref())
            .await?;

        let factory = Arc::clone(&self.factory);
        let providers = self.providers.clone();
        let contract = spec.contract.clone();
        let kind = slot.kind;

        tokio::task::spawn_blocking(move || {
            select_backend(factory.as_ref(), kind, &model_path, &providers, &contract)
        })
        .await
        .map_err(|e| Error::TaskJoin {
            stage: "session create",
            source: e,
        })?
    }

    /// Wait until `kind` is ready, or fail if its creation fails.
    ///
    /// An uninitialized slot is waited on until someone creates it.
    pub async fn wait_ready(&self, kind: ModelKind) -> Result<ExecutionProvider> {
        let mut rx = self.slot(kind).state.subscribe();
        loop {
            let outcome = match &*rx.borrow_and_update() {
                SlotState::Ready(loaded) => Some(Ok(loaded.provider)),
                SlotState::Failed(reason) => {
                    debug!("{} session failed earlier: {}", kind, reason);
                    Some(Err(Error::SessionNotReady { model: kind }))
                }
                SlotState::Uninitialized | SlotState::Loading => None,
            };
            if let Some(result) = outcome {
                return result;
            }
            rx.changed().await.map_err(|_| Error::SessionNotReady { model: kind })?;
        }
    }

    /// Drop the session for `kind`. Runs already in flight finish first;
    /// the next [`create_session`](Self::create_session) builds a new one.
    pub async fn release(&self, kind: ModelKind) {
        let slot = self.slot(kind);
        let _guard = slot.create_lock.lock().await;
        slot.state.send_replace(SlotState::Uninitialized);
        info!("{} session released", kind);
    }

    /// Run the model on `input`.
    ///
    /// Fails with [`Error::SessionNotReady`] unless the session is ready. A
    /// failed run leaves the session usable.
    pub async fn run(&self, kind: ModelKind, input: Tensor) -> Result<InferenceOutput> {
        let loaded = self.ready_session(kind)?;
        loaded.contract.check_input(&input)?;

        tokio::task::spawn_blocking(move || loaded.run(input))
            .await
            .map_err(|e| Error::TaskJoin {
                stage: "inference",
                source: e,
            })?
    }

    fn ready_session(&self, kind: ModelKind) -> Result<Arc<LoadedSession>> {
        match &*self.slot(kind).state.borrow() {
            SlotState::Ready(loaded) => Ok(Arc::clone(loaded)),
            _ => Err(Error::SessionNotReady { model: kind }),
        }
    }
}

fn select_backend(
    factory: &dyn SessionFactory,
    kind: ModelKind,
    model_path: &Path,
    providers: &[ExecutionProvider],
    contract: &DeclaredContract,
) -> Result<LoadedSession> {
    let mut attempts = Vec::with_capacity(providers.len());

    for &provider in providers {
        match factory.create(model_path, provider) {
            Ok(session) => {
                let validated = contract.validate(kind, session.inputs(), session.outputs())?;
                return Ok(LoadedSession {
                    kind,
                    provider,
                    contract: validated,
                    session: Mutex::new(session),
                });
            }
            Err(e) => {
                warn!(
                    "{} provider {} rejected {}, falling back: {}",
                    kind,
                    provider.id(),
                    model_path.display(),
                    e
                );
                attempts.push(BackendAttempt {
                    provider,
                    reason: e.to_string(),
                });
            }
        }
    }

    Err(Error::SessionInitFailed {
        model: kind,
        attempts,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::StaticAsset;
    use crate::inference::BackendError;
    use tempfile::TempDir;

    struct RejectAll;

    impl SessionFactory for RejectAll {
        fn create(
            &self,
            _model_path: &Path,
            provider: ExecutionProvider,
        ) -> std::result::Result<Box<dyn ModelSession>, BackendError> {
            Err(BackendError::new(format!("{} unavailable", provider.id())))
        }
    }

    fn spec() -> ModelSpec {
        ModelSpec {
            asset: Arc::new(StaticAsset::new("m", b"not really onnx")),
            cache_key: "m.onnx".to_string(),
            sha256: None,
            contract: DeclaredContract {
                input_dims: vec![1, 2],
                output_dims: vec![1, 2],
            },
        }
    }

    fn manager(dir: &TempDir, factory: Arc<dyn SessionFactory>) -> SessionManager {
        SessionManager::new(
            factory,
            Arc::new(ModelCache::new(dir.path())),
            vec![ExecutionProvider::Xnnpack, ExecutionProvider::Cpu],
            spec(),
            spec(),
        )
    }

    #[tokio::test]
    async fn test_all_providers_failing_reports_each_attempt() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, Arc::new(RejectAll));

        let err = manager
            .create_session(ModelKind::Classification)
            .await
            .unwrap_err();

        match err {
            Error::SessionInitFailed { model, attempts } => {
                assert_eq!(model, ModelKind::Classification);
                let tried: Vec<_> = attempts.iter().map(|a| a.provider).collect();
                assert_eq!(tried, vec![ExecutionProvider::Xnnpack, ExecutionProvider::Cpu]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            manager.status(ModelKind::Classification),
            SessionStatus::Failed { .. }
        ));
        assert_eq!(
            manager.status(ModelKind::Detection),
            SessionStatus::Uninitialized
        );
    }

    #[tokio::test]
    async fn test_run_before_ready_is_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, Arc::new(RejectAll));
        let input = Tensor::new(vec![1, 2], vec![0.0, 1.0]).unwrap();

        let result = manager.run(ModelKind::Detection, input).await;

        assert!(matches!(
            result,
            Err(Error::SessionNotReady {
                model: ModelKind::Detection
            })
        ));
    }
}
