//! Submission controller: one outbound generation call at a time.
//!
//! A submission takes an in-flight token and shows the busy flag until the
//! call settles. While a token is outstanding further submissions are
//! rejected without issuing a call; a completion whose token no longer
//! matches is discarded.

use std::sync::Arc;

use imagegen_core::{GenerateError, GeneratedImage, GenerationRequest, ImageService, ResultsList};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::notifier::Notifier;

/// Whether the busy indicator is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyFlag {
    Hidden,
    Visible,
}

/// Identifies one outstanding outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Started(InFlightToken),
    /// A call was already outstanding; nothing was sent.
    Rejected,
}

/// How a call settled, reported back to the host for its activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Succeeded { entry_id: u64, prompt: String },
    Failed { message: String },
}

struct Completion {
    token: InFlightToken,
    outcome: Result<GeneratedImage, GenerateError>,
}

pub struct SubmissionController {
    service: Arc<dyn ImageService>,
    notifier: Arc<dyn Notifier>,
    runtime: Handle,
    results: ResultsList,
    in_flight: Option<InFlightToken>,
    next_token: u64,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl SubmissionController {
    pub fn new(
        service: Arc<dyn ImageService>,
        notifier: Arc<dyn Notifier>,
        runtime: Handle,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            service,
            notifier,
            runtime,
            results: ResultsList::new(),
            in_flight: None,
            next_token: 1,
            completion_tx,
            completion_rx,
        }
    }

    pub fn generate(
        &mut self,
        configuration: &str,
        model_name: &str,
        prompt: &str,
        size: &str,
        quality: &str,
        style: &str,
    ) -> SubmitOutcome {
        self.submit(GenerationRequest {
            configuration: configuration.to_string(),
            model_name: model_name.to_string(),
            prompt: prompt.to_string(),
            size: size.to_string(),
            quality: quality.to_string(),
            style: style.to_string(),
        })
    }

    /// Start one outbound call for `request`, unless one is already outstanding.
    pub fn submit(&mut self, request: GenerationRequest) -> SubmitOutcome {
        if let Some(token) = self.in_flight {
            debug!(?token, "submission rejected while a call is outstanding");
            return SubmitOutcome::Rejected;
        }

        let token = InFlightToken(self.next_token);
        self.next_token += 1;
        self.in_flight = Some(token);

        info!(
            configuration = %request.configuration,
            model = %request.model_name,
            size = %request.size,
            quality = %request.quality,
            style = %request.style,
            "submitting image generation"
        );

        let service = Arc::clone(&self.service);
        let completion_tx = self.completion_tx.clone();
        let call = self
            .runtime
            .spawn(async move { service.generate(request).await });
        self.runtime.spawn(async move {
            // A call that dies without an outcome still has to settle its token.
            let outcome = match call.await {
                Ok(outcome) => outcome,
                Err(err) => Err(GenerateError::TaskFailed(err.to_string())),
            };
            // The receiver only disappears with the controller itself.
            let _ = completion_tx.send(Completion { token, outcome });
        });

        SubmitOutcome::Started(token)
    }

    /// Apply any completed calls. Called once per frame from the UI thread.
    pub fn poll(&mut self) -> Vec<Settlement> {
        let mut settled = Vec::new();
        while let Ok(completion) = self.completion_rx.try_recv() {
            if self.in_flight != Some(completion.token) {
                warn!(token = ?completion.token, "discarding stale completion");
                continue;
            }
            self.in_flight = None;

            match completion.outcome {
                Ok(image) => {
                    let prompt = image.prompt.clone();
                    let entry_id = self.results.prepend(image);
                    info!(entry_id, "image generated");
                    settled.push(Settlement::Succeeded { entry_id, prompt });
                }
                Err(err) => {
                    let message = err.notification_message();
                    warn!(error = %err, "image generation failed");
                    self.notifier.show_error(&message);
                    settled.push(Settlement::Failed { message });
                }
            }
        }
        settled
    }

    pub fn busy_flag(&self) -> BusyFlag {
        if self.in_flight.is_some() {
            BusyFlag::Visible
        } else {
            BusyFlag::Hidden
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy_flag() == BusyFlag::Visible
    }

    pub fn results(&self) -> &ResultsList {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn show_error(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    /// Records every call and holds it open until released.
    struct FakeService {
        calls: Mutex<Vec<GenerationRequest>>,
        release: Notify,
        fail: bool,
    }

    impl FakeService {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                release: Notify::new(),
                fail,
            })
        }

        fn calls(&self) -> Vec<GenerationRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageService for FakeService {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GeneratedImage, GenerateError> {
            self.calls.lock().unwrap().push(request.clone());
            self.release.notified().await;
            if self.fail {
                Err(GenerateError::Service {
                    status: Some(400),
                    payload: json!({ "message": "Invalid size" }),
                })
            } else {
                Ok(GeneratedImage::remote(
                    format!("http://x/{}.png", request.prompt),
                    request.prompt,
                ))
            }
        }
    }

    fn controller(service: Arc<FakeService>) -> (SubmissionController, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let controller = SubmissionController::new(service, notifier.clone(), Handle::current());
        (controller, notifier)
    }

    async fn wait_for_calls(service: &FakeService, count: usize) {
        for _ in 0..500 {
            if service.calls().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("service never received {count} call(s)");
    }

    async fn wait_until_idle(controller: &mut SubmissionController) -> Vec<Settlement> {
        for _ in 0..500 {
            let settled = controller.poll();
            if !controller.is_busy() {
                return settled;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("call never settled");
    }

    async fn run_to_completion(
        controller: &mut SubmissionController,
        service: &FakeService,
        prompt: &str,
    ) -> Vec<Settlement> {
        let calls_before = service.calls().len();
        assert!(matches!(
            controller.generate("cfgA", "dall-e-3", prompt, "1024x1024", "hd", "vivid"),
            SubmitOutcome::Started(_)
        ));
        wait_for_calls(service, calls_before + 1).await;
        service.release.notify_one();
        wait_until_idle(controller).await
    }

    #[tokio::test]
    async fn success_prepends_result() {
        let service = FakeService::new(false);
        let (mut controller, notifier) = controller(service.clone());

        run_to_completion(&mut controller, &service, "first").await;
        let settled = run_to_completion(&mut controller, &service, "second").await;

        assert_eq!(controller.results().len(), 2);
        let newest = controller.results().first().unwrap();
        assert_eq!(newest.image.prompt, "second");
        assert_eq!(
            settled,
            vec![Settlement::Succeeded {
                entry_id: newest.id,
                prompt: "second".to_string()
            }]
        );
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn failure_notifies_and_keeps_results() {
        let service = FakeService::new(true);
        let (mut controller, notifier) = controller(service.clone());

        let settled = run_to_completion(&mut controller, &service, "a cat").await;

        assert!(controller.results().is_empty());
        assert_eq!(controller.busy_flag(), BusyFlag::Hidden);
        assert_eq!(notifier.messages(), vec![r#"{"message":"Invalid size"}"#.to_string()]);
        assert_eq!(
            settled,
            vec![Settlement::Failed {
                message: r#"{"message":"Invalid size"}"#.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn busy_flag_tracks_outstanding_call() {
        let service = FakeService::new(false);
        let (mut controller, _notifier) = controller(service.clone());
        assert_eq!(controller.busy_flag(), BusyFlag::Hidden);

        controller.generate("cfgA", "dall-e-3", "a cat", "1024x1024", "hd", "vivid");
        assert_eq!(controller.busy_flag(), BusyFlag::Visible);

        wait_for_calls(&service, 1).await;
        controller.poll();
        assert_eq!(controller.busy_flag(), BusyFlag::Visible);

        service.release.notify_one();
        wait_until_idle(&mut controller).await;
        assert_eq!(controller.busy_flag(), BusyFlag::Hidden);
    }

    #[tokio::test]
    async fn fields_reach_single_call_unmodified() {
        let service = FakeService::new(false);
        let (mut controller, _notifier) = controller(service.clone());

        run_to_completion(&mut controller, &service, "a cat").await;

        assert_eq!(
            service.calls(),
            vec![GenerationRequest {
                configuration: "cfgA".to_string(),
                model_name: "dall-e-3".to_string(),
                prompt: "a cat".to_string(),
                size: "1024x1024".to_string(),
                quality: "hd".to_string(),
                style: "vivid".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn empty_prompt_passes_through() {
        let service = FakeService::new(false);
        let (mut controller, _notifier) = controller(service.clone());

        run_to_completion(&mut controller, &service, "").await;

        assert_eq!(service.calls()[0].prompt, "");
        assert_eq!(controller.results().len(), 1);
    }

    #[tokio::test]
    async fn second_submission_while_busy_is_rejected() {
        let service = FakeService::new(false);
        let (mut controller, _notifier) = controller(service.clone());

        let first = controller.generate("cfgA", "dall-e-3", "one", "1024x1024", "hd", "vivid");
        assert!(matches!(first, SubmitOutcome::Started(_)));
        let second = controller.generate("cfgA", "dall-e-3", "two", "1024x1024", "hd", "vivid");
        assert_eq!(second, SubmitOutcome::Rejected);

        wait_for_calls(&service, 1).await;
        service.release.notify_one();
        wait_until_idle(&mut controller).await;

        assert_eq!(service.calls().len(), 1);
        assert_eq!(controller.results().len(), 1);
    }

    struct PanickingService;

    #[async_trait]
    impl ImageService for PanickingService {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GeneratedImage, GenerateError> {
            panic!("provider client blew up");
        }
    }

    #[tokio::test]
    async fn panicking_call_settles_as_failure() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = Arc::new(PanickingService);
        let mut controller =
            SubmissionController::new(service, notifier.clone(), Handle::current());

        let first = controller.generate("cfgA", "dall-e-3", "a cat", "1024x1024", "hd", "vivid");
        assert!(matches!(first, SubmitOutcome::Started(_)));

        let settled = wait_until_idle(&mut controller).await;

        assert_eq!(controller.busy_flag(), BusyFlag::Hidden);
        assert!(controller.results().is_empty());
        assert!(matches!(
            settled.as_slice(),
            [Settlement::Failed { message }] if message.contains("generation task failed")
        ));
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("generation task failed"));

        let next = controller.generate("cfgA", "dall-e-3", "a dog", "1024x1024", "hd", "vivid");
        assert!(matches!(next, SubmitOutcome::Started(_)));
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let service = FakeService::new(false);
        let (mut controller, _notifier) = controller(service);

        let sent = controller.completion_tx.send(Completion {
            token: InFlightToken(99),
            outcome: Ok(GeneratedImage::remote("http://x/stale.png", "stale")),
        });
        assert!(sent.is_ok());

        assert!(controller.poll().is_empty());
        assert!(controller.results().is_empty());
    }
}
