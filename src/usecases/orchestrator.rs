//! Analysis orchestrator. Turns one request into one result.
//!
//! Flow:
//! 1. Fingerprint the request and check the cache
//! 2. Pick eligible providers (kind supported, credential present)
//! 3. Race them on a good network, otherwise try them one by one
//! 4. Parse the winning answer and write it through to the cache

use crate::adapters::ai::ResultParser;
use crate::domain::{
    AnalysisError, AnalysisRequest, AnalysisResult, Fingerprint, ProviderId, RequestKind,
    Strategy,
};
use crate::ports::{
    CachePort, CredentialProvider, ProgressReporter, ProgressSink, ProgressStage, ProviderClient,
};
use crate::usecases::network_monitor::NetworkConditionMonitor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Cache,
    Provider(ProviderId),
}

/// Terminal outcome of one successful analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub source: ResultSource,
    /// `None` when served from cache.
    pub strategy: Option<Strategy>,
    pub completed_at: DateTime<Utc>,
}

/// A provider cleared to take part in one analysis.
#[derive(Clone)]
struct Candidate {
    client: Arc<dyn ProviderClient>,
    api_key: Option<String>,
    timeout: Duration,
}

impl Candidate {
    fn id(&self) -> ProviderId {
        self.client.id()
    }

    /// Paid remote providers. Only these race.
    fn is_credentialed(&self) -> bool {
        self.id().descriptor().requires_credential
    }
}

pub struct AnalysisOrchestrator {
    /// Priority order.
    providers: Vec<Arc<dyn ProviderClient>>,
    credentials: Arc<dyn CredentialProvider>,
    network: Arc<NetworkConditionMonitor>,
    cache: Arc<dyn CachePort>,
    progress: ProgressReporter,
    network_retries: u32,
}

impl AnalysisOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn ProviderClient>>,
        credentials: Arc<dyn CredentialProvider>,
        network: Arc<NetworkConditionMonitor>,
        cache: Arc<dyn CachePort>,
    ) -> Self {
        Self {
            providers,
            credentials,
            network,
            cache,
            progress: ProgressReporter::none(),
            network_retries: 1,
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = ProgressReporter::new(sink);
        self
    }

    /// Same-provider retries after a transport failure, sequential mode only.
    pub fn with_network_retries(mut self, retries: u32) -> Self {
        self.network_retries = retries;
        self
    }

    /// Analyse one request. Cached results are returned without any network call.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        request.validate()?;

        debug!(phase = "cache_check", kind = ?request.kind(), "analysis started");
        self.progress.emit(ProgressStage::CheckingCache);
        let fingerprint = Fingerprint::compute(request).await;

        if let Some(result) = self.cache.get(&fingerprint).await {
            info!(fingerprint = %fingerprint, "serving analysis from cache");
            self.progress.emit(ProgressStage::CacheHit);
            self.progress.emit(ProgressStage::Completed);
            return Ok(AnalysisOutcome {
                result,
                source: ResultSource::Cache,
                strategy: None,
                completed_at: Utc::now(),
            });
        }

        if request.kind() == RequestKind::Image {
            self.progress.emit(ProgressStage::OptimizingImage);
        }

        let candidates = self.candidates(request)?;
        let strategy = self.select_strategy(&candidates);
        debug!(
            phase = "strategy_select",
            strategy = %strategy,
            candidates = candidates.len(),
            "strategy selected"
        );
        self.progress.emit(ProgressStage::SelectingStrategy(strategy));

        let request = Arc::new(request.clone());
        let (provider, result) = match strategy {
            Strategy::Racing => self.race(&request, candidates).await?,
            Strategy::Sequential => self.sequential(&request, candidates).await?,
        };

        self.cache.put(fingerprint, result.clone()).await;
        self.progress.emit(ProgressStage::Completed);
        info!(
            provider = %provider,
            strategy = %strategy,
            items = result.food_items.len(),
            total_carbohydrates = result.total_carbohydrates,
            confidence = %result.confidence,
            "analysis complete"
        );

        Ok(AnalysisOutcome {
            result,
            source: ResultSource::Provider(provider),
            strategy: Some(strategy),
            completed_at: Utc::now(),
        })
    }

    /// Eligible providers in priority order, hinted provider first.
    fn candidates(&self, request: &AnalysisRequest) -> Result<Vec<Candidate>, AnalysisError> {
        let kind = request.kind();
        let network_timeout = self.network.recommended_timeout();

        let mut candidates: Vec<Candidate> = self
            .providers
            .iter()
            .filter_map(|client| {
                let descriptor = client.id().descriptor();
                if !descriptor.supports(kind) {
                    return None;
                }
                let api_key = self
                    .credentials
                    .api_key(client.id())
                    .filter(|k| !k.trim().is_empty());
                if descriptor.requires_credential && api_key.is_none() {
                    return None;
                }
                Some(Candidate {
                    client: Arc::clone(client),
                    api_key,
                    timeout: descriptor.recommended_timeout.unwrap_or(network_timeout),
                })
            })
            .collect();

        if let Some(hint) = request.provider_hint() {
            if let Some(pos) = candidates.iter().position(|c| c.id() == hint) {
                let preferred = candidates.remove(pos);
                candidates.insert(0, preferred);
            }
        }

        if candidates.is_empty() {
            warn!(kind = ?kind, "no provider available for request");
            return Err(AnalysisError::NoCredential);
        }
        Ok(candidates)
    }

    fn select_strategy(&self, candidates: &[Candidate]) -> Strategy {
        let credentialed = candidates.iter().filter(|c| c.is_credentialed()).count();
        if self.network.should_race_providers() && credentialed > 1 {
            Strategy::Racing
        } else {
            Strategy::Sequential
        }
    }

    /// All credentialed candidates at once. First success wins, the rest are aborted.
    async fn race(
        &self,
        request: &Arc<AnalysisRequest>,
        candidates: Vec<Candidate>,
    ) -> Result<(ProviderId, AnalysisResult), AnalysisError> {
        let mut tasks = JoinSet::new();
        for candidate in candidates.into_iter().filter(Candidate::is_credentialed) {
            let request = Arc::clone(request);
            let progress = self.progress.clone();
            tasks.spawn(async move {
                let id = candidate.id();
                (id, attempt(&candidate, &request, &progress).await)
            });
        }
        info!(racers = tasks.len(), "racing providers");

        let mut best: Option<AnalysisError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(result))) => {
                    tasks.abort_all();
                    debug!(provider = %id, "race won");
                    return Ok((id, result));
                }
                Ok((id, Err(e))) => {
                    warn!(provider = %id, error = %e, "racer failed");
                    best = Some(more_specific(best, e));
                }
                Err(join_error) => {
                    warn!(error = %join_error, "racer task ended abnormally");
                }
            }
        }

        Err(best.unwrap_or(AnalysisError::NoCredential))
    }

    /// One provider at a time, strictly in order.
    async fn sequential(
        &self,
        request: &AnalysisRequest,
        candidates: Vec<Candidate>,
    ) -> Result<(ProviderId, AnalysisResult), AnalysisError> {
        let mut last_error: Option<AnalysisError> = None;

        for candidate in &candidates {
            let mut retries_left = self.network_retries;
            loop {
                match attempt(candidate, request, &self.progress).await {
                    Ok(result) => return Ok((candidate.id(), result)),
                    Err(e) if e.is_transient() && retries_left > 0 => {
                        retries_left -= 1;
                        warn!(
                            provider = %candidate.id(),
                            error = %e,
                            retries_left,
                            "retrying provider"
                        );
                    }
                    Err(e) => {
                        warn!(provider = %candidate.id(), error = %e, "provider failed; moving on");
                        last_error = Some(e);
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(AnalysisError::NoCredential))
    }
}

/// One provider call under its own deadline, then parse.
async fn attempt(
    candidate: &Candidate,
    request: &AnalysisRequest,
    progress: &ProgressReporter,
) -> Result<AnalysisResult, AnalysisError> {
    let id = candidate.id();
    progress.emit(ProgressStage::SendingRequest(id));

    let call = candidate
        .client
        .call(request, candidate.api_key.as_deref(), candidate.timeout);
    let raw = tokio::time::timeout(candidate.timeout, call)
        .await
        .map_err(|_| AnalysisError::Timeout(candidate.timeout))??;

    progress.emit(ProgressStage::ParsingResponse(id));
    let text = candidate.client.interpret(&raw)?;
    Ok(ResultParser::parse(&text))
}

/// Keep whichever error tells the user more. Ties keep the earlier one.
fn more_specific(current: Option<AnalysisError>, candidate: AnalysisError) -> AnalysisError {
    match current {
        Some(existing) if existing.specificity() >= candidate.specificity() => existing,
        _ => candidate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockProvider;
    use crate::adapters::cache::ResultCache;
    use crate::domain::{Confidence, NetworkClassification, TransportKind};
    use crate::shared::StaticCredentials;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    const BANANA: &str = r#"{"food_items": [{"name": "Banana", "portion_estimate": "1 medium", "carbohydrates": 27, "calories": 105}], "confidence": 0.7}"#;
    const RICE: &str = r#"{"food_items": [{"name": "Rice", "portion_estimate": "1 cup", "carbohydrates": 45}]}"#;

    fn good_network() -> Arc<NetworkConditionMonitor> {
        Arc::new(NetworkConditionMonitor::new(NetworkClassification {
            connected: true,
            expensive: false,
            constrained: false,
            transport: TransportKind::Wired,
        }))
    }

    fn poor_network() -> Arc<NetworkConditionMonitor> {
        Arc::new(NetworkConditionMonitor::default())
    }

    fn all_keys() -> Arc<StaticCredentials> {
        Arc::new(
            StaticCredentials::new()
                .with_key(ProviderId::OpenAi, "sk-openai")
                .with_key(ProviderId::Claude, "sk-claude")
                .with_key(ProviderId::Gemini, "g-key"),
        )
    }

    fn orchestrator(
        providers: Vec<Arc<MockProvider>>,
        credentials: Arc<StaticCredentials>,
        network: Arc<NetworkConditionMonitor>,
    ) -> AnalysisOrchestrator {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn ProviderClient>)
            .collect();
        AnalysisOrchestrator::new(
            providers,
            credentials,
            network,
            Arc::new(ResultCache::default()),
        )
    }

    fn banana_request() -> AnalysisRequest {
        AnalysisRequest::text("banana", "Analyse this meal")
    }

    #[tokio::test]
    async fn test_banana_analysis() {
        let openai = Arc::new(MockProvider::responding(ProviderId::OpenAi, BANANA));
        let orch = orchestrator(vec![openai], all_keys(), poor_network());

        let outcome = orch.analyze(&banana_request()).await.unwrap();

        assert_eq!(outcome.source, ResultSource::Provider(ProviderId::OpenAi));
        assert_eq!(outcome.strategy, Some(Strategy::Sequential));
        assert_eq!(outcome.result.food_items.len(), 1);
        assert_eq!(outcome.result.total_carbohydrates, 27.0);
        assert_eq!(outcome.result.total_calories, Some(105.0));
        assert_eq!(outcome.result.confidence, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_second_identical_request_hits_cache() {
        let openai = Arc::new(MockProvider::responding(ProviderId::OpenAi, BANANA));
        let orch = orchestrator(vec![openai.clone()], all_keys(), poor_network());

        let first = orch.analyze(&banana_request()).await.unwrap();
        let second = orch
            .analyze(&AnalysisRequest::text("  Banana ", "other prompt"))
            .await
            .unwrap();

        assert_eq!(openai.calls(), 1);
        assert_eq!(first.result, second.result);
        assert_eq!(second.source, ResultSource::Cache);
        assert_eq!(second.strategy, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_returns_fast_winner_and_cancels_the_rest() {
        let slow_openai = Arc::new(
            MockProvider::responding(ProviderId::OpenAi, RICE).with_delay(Duration::from_secs(10)),
        );
        let fast = Arc::new(
            MockProvider::responding(ProviderId::Claude, BANANA).with_delay(Duration::from_secs(1)),
        );
        let slow_gemini = Arc::new(
            MockProvider::responding(ProviderId::Gemini, RICE).with_delay(Duration::from_secs(12)),
        );
        let orch = orchestrator(
            vec![slow_openai.clone(), fast.clone(), slow_gemini.clone()],
            all_keys(),
            good_network(),
        );

        let started = Instant::now();
        let outcome = orch.analyze(&banana_request()).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome.strategy, Some(Strategy::Racing));
        assert_eq!(outcome.source, ResultSource::Provider(ProviderId::Claude));
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
        assert_eq!(slow_openai.calls(), 1);
        assert_eq!(slow_gemini.calls(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(slow_openai.completed(), 0);
        assert_eq!(slow_gemini.completed(), 0);
    }

    #[tokio::test]
    async fn test_race_reports_most_specific_error() {
        let openai = Arc::new(MockProvider::network_failure(ProviderId::OpenAi));
        let claude = Arc::new(MockProvider::failing_with_status(
            ProviderId::Claude,
            400,
            r#"{"error": {"message": "Your credit balance is too low"}}"#,
        ));
        let gemini = Arc::new(MockProvider::failing_with_status(ProviderId::Gemini, 500, "boom"));
        let orch = orchestrator(vec![openai, claude, gemini], all_keys(), good_network());

        let err = orch.analyze(&banana_request()).await.unwrap_err();
        assert_eq!(err, AnalysisError::CreditsExhausted(ProviderId::Claude));
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_success() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Arc::new(
            MockProvider::failing_with_status(ProviderId::OpenAi, 500, "down")
                .with_call_log(log.clone()),
        );
        let b = Arc::new(
            MockProvider::responding(ProviderId::Claude, BANANA).with_call_log(log.clone()),
        );
        let c = Arc::new(
            MockProvider::responding(ProviderId::Gemini, RICE).with_call_log(log.clone()),
        );
        let orch = orchestrator(vec![a.clone(), b, c.clone()], all_keys(), poor_network());

        let outcome = orch.analyze(&banana_request()).await.unwrap();

        assert_eq!(outcome.source, ResultSource::Provider(ProviderId::Claude));
        assert_eq!(c.calls(), 0);
        assert_eq!(*log.lock().unwrap(), vec![ProviderId::OpenAi, ProviderId::Claude]);
    }

    #[tokio::test]
    async fn test_sequential_returns_last_error() {
        let a = Arc::new(MockProvider::failing_with_status(ProviderId::OpenAi, 401, "bad key"));
        let b = Arc::new(MockProvider::failing_with_status(ProviderId::Claude, 500, "down"));
        let orch = orchestrator(vec![a, b], all_keys(), poor_network());

        let err = orch.analyze(&banana_request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let flaky = Arc::new(MockProvider::flaky(ProviderId::OpenAi, 1, BANANA));
        let backup = Arc::new(MockProvider::responding(ProviderId::Claude, RICE));
        let orch = orchestrator(vec![flaky.clone(), backup.clone()], all_keys(), poor_network());

        let outcome = orch.analyze(&banana_request()).await.unwrap();

        assert_eq!(outcome.source, ResultSource::Provider(ProviderId::OpenAi));
        assert_eq!(flaky.calls(), 2);
        assert_eq!(backup.calls(), 0);
    }

    #[tokio::test]
    async fn test_retries_can_be_disabled() {
        let flaky = Arc::new(MockProvider::flaky(ProviderId::OpenAi, 1, BANANA));
        let orch =
            orchestrator(vec![flaky.clone()], all_keys(), poor_network()).with_network_retries(0);

        let err = orch.analyze(&banana_request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Network(_)));
        assert_eq!(flaky.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let slow = Arc::new(
            MockProvider::responding(ProviderId::OpenAi, BANANA)
                .with_delay(Duration::from_secs(120)),
        );
        let orch = orchestrator(vec![slow.clone()], all_keys(), poor_network());

        let err = orch.analyze(&banana_request()).await.unwrap_err();
        assert_eq!(err, AnalysisError::Timeout(Duration::from_secs(45)));
        assert_eq!(slow.completed(), 0);
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let openai = Arc::new(MockProvider::responding(ProviderId::OpenAi, BANANA));
        let orch = orchestrator(
            vec![openai.clone()],
            Arc::new(StaticCredentials::new()),
            good_network(),
        );

        let err = orch.analyze(&banana_request()).await.unwrap_err();
        assert_eq!(err, AnalysisError::NoCredential);
        assert_eq!(openai.calls(), 0);
    }

    #[tokio::test]
    async fn test_hint_moves_provider_to_front() {
        let openai = Arc::new(MockProvider::responding(ProviderId::OpenAi, RICE));
        let gemini = Arc::new(MockProvider::responding(ProviderId::Gemini, BANANA));
        let orch = orchestrator(vec![openai.clone(), gemini], all_keys(), poor_network());

        let outcome = orch
            .analyze(&banana_request().with_provider_hint(ProviderId::Gemini))
            .await
            .unwrap();

        assert_eq!(outcome.source, ResultSource::Provider(ProviderId::Gemini));
        assert_eq!(openai.calls(), 0);
    }

    #[tokio::test]
    async fn test_basic_estimator_does_not_race() {
        let openai = Arc::new(MockProvider::failing_with_status(ProviderId::OpenAi, 500, "down"));
        let basic = Arc::new(MockProvider::responding(ProviderId::Basic, BANANA));
        let orch = orchestrator(
            vec![openai, basic.clone()],
            Arc::new(StaticCredentials::new().with_key(ProviderId::OpenAi, "sk")),
            good_network(),
        );

        let outcome = orch.analyze(&banana_request()).await.unwrap();

        assert_eq!(outcome.strategy, Some(Strategy::Sequential));
        assert_eq!(outcome.source, ResultSource::Provider(ProviderId::Basic));
        assert_eq!(basic.calls(), 1);
    }

    #[tokio::test]
    async fn test_image_with_description_goes_out_as_image_request() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let openai = Arc::new(MockProvider::responding(ProviderId::OpenAi, RICE));
        let orch = orchestrator(vec![openai.clone()], all_keys(), poor_network())
            .with_progress(Arc::new(tx));

        let req = AnalysisRequest::image(vec![1, 2, 3], "p").with_text("lunch");
        assert!(orch.analyze(&req).await.is_ok());
        assert_eq!(openai.calls(), 1);

        let mut saw_image_stage = false;
        while let Ok(stage) = rx.try_recv() {
            saw_image_stage |= stage == ProgressStage::OptimizingImage;
        }
        assert!(saw_image_stage);
    }

    #[tokio::test]
    async fn test_progress_stages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let openai = Arc::new(MockProvider::responding(ProviderId::OpenAi, BANANA));
        let orch =
            orchestrator(vec![openai], all_keys(), poor_network()).with_progress(Arc::new(tx));

        orch.analyze(&banana_request()).await.unwrap();

        let mut stages = Vec::new();
        while let Ok(stage) = rx.try_recv() {
            stages.push(stage);
        }
        assert_eq!(
            stages,
            vec![
                ProgressStage::CheckingCache,
                ProgressStage::SelectingStrategy(Strategy::Sequential),
                ProgressStage::SendingRequest(ProviderId::OpenAi),
                ProgressStage::ParsingResponse(ProviderId::OpenAi),
                ProgressStage::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_any_call() {
        let openai = Arc::new(MockProvider::responding(ProviderId::OpenAi, BANANA));
        let orch = orchestrator(vec![openai.clone()], all_keys(), poor_network());

        let err = orch
            .analyze(&AnalysisRequest::image(Vec::new(), "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ImageProcessingFailed(_)));
        assert_eq!(openai.calls(), 0);
    }
}
