use anyhow::Result;
use async_trait::async_trait;
use phc_protocol::{
    ErrorSignatureMatch, IterationCount, PrecedentMatch, Proposal, UserIntervention,
};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;

pub const ERROR_SIGNATURE: &str = "error_signature";
pub const ITERATION_COUNTER: &str = "iteration_counter";
pub const PRECEDENT_MATCHER: &str = "precedent_matcher";
pub const USER_INTERVENTION: &str = "user_intervention";
pub const COMBINED_SIGNAL: &str = "combined_signal";

/// A pluggable scorer consulted by the checkpoint.
#[async_trait]
pub trait Detector: Send + Sync {
    type Output: Serialize + Send + Sync + 'static;

    async fn detect(&self, proposal: &Proposal) -> Result<Self::Output>;
}

pub type DynDetector<T> = Arc<dyn Detector<Output = T>>;

/// The four optional detector slots. An empty slot is simply skipped.
#[derive(Clone, Default)]
pub struct Detectors {
    pub error_signature: Option<DynDetector<ErrorSignatureMatch>>,
    pub iteration: Option<DynDetector<IterationCount>>,
    pub precedent: Option<DynDetector<PrecedentMatch>>,
    pub user_intervention: Option<DynDetector<UserIntervention>>,
}

impl Detectors {
    pub fn is_empty(&self) -> bool {
        self.error_signature.is_none()
            && self.iteration.is_none()
            && self.precedent.is_none()
            && self.user_intervention.is_none()
    }
}

/// Returns a fixed result; used to feed externally computed signals.
#[derive(Debug, Clone)]
pub struct StaticDetector<T> {
    value: T,
}

impl<T> StaticDetector<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> StaticDetector<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    pub fn shared(value: T) -> DynDetector<T> {
        Arc::new(Self::new(value))
    }
}

#[async_trait]
impl<T> Detector for StaticDetector<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    type Output = T;

    async fn detect(&self, _proposal: &Proposal) -> Result<T> {
        Ok(self.value.clone())
    }
}

/// Outcome of one detector call: the result, or the error text it failed with.
pub(crate) type DetectorRun<T> = std::result::Result<T, String>;

/// Runs one detector on its own task. A panic inside the detector is
/// reported as its error text, like any other failure.
pub(crate) async fn run_detector<T>(
    name: &str,
    detector: Option<&DynDetector<T>>,
    proposal: &Proposal,
) -> Option<DetectorRun<T>>
where
    T: Serialize + Send + Sync + 'static,
{
    let detector = Arc::clone(detector?);
    let proposal = proposal.clone();
    let joined = tokio::spawn(async move { detector.detect(&proposal).await }).await;

    let message = match joined {
        Ok(Ok(value)) => return Some(Ok(value)),
        Ok(Err(err)) => format!("{err:#}"),
        Err(err) if err.is_panic() => {
            format!("detector panicked: {}", panic_message(err.into_panic()))
        }
        Err(err) => format!("detector task failed: {err}"),
    };
    log::warn!("Detector {name} failed: {message}");
    Some(Err(message))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
