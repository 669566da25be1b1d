//! The completion adapter: one inbound [`ChatRequest`] in, one
//! [`CompletionResult`] out.

use tracing::{debug, warn};

use crate::error::{BackendError, CompletionError};
use crate::persona::GenerationHandle;
use crate::types::{ChatRequest, CompletionResult};

/// Maps chat requests onto a [`GenerationHandle`].
///
/// Holds no mutable state, so one instance can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct CompletionAdapter {
    handle: GenerationHandle,
}

impl CompletionAdapter {
    pub fn new(handle: GenerationHandle) -> Self {
        Self { handle }
    }

    pub fn model(&self) -> &str {
        self.handle.model()
    }

    pub fn handle(&self) -> &GenerationHandle {
        &self.handle
    }

    /// Complete the latest message of `request`.
    ///
    /// An empty request fails with [`CompletionError::NoMessages`] without
    /// touching the backend. Backend errors come back as
    /// [`CompletionResult::Failure`]; this never panics or retries.
    pub async fn complete(&self, request: &ChatRequest) -> CompletionResult {
        let Some(latest) = request.latest() else {
            debug!("rejecting chat request with no messages");
            return CompletionResult::Failure(CompletionError::NoMessages);
        };

        debug!(
            history_len = request.messages.len(),
            content_len = latest.content.len(),
            persona = %self.handle.persona().mode(),
            "completing latest message"
        );

        match self.handle.generate(&latest.content).await {
            Ok(text) => CompletionResult::Success { text },
            Err(e @ BackendError::MissingCredential) => {
                warn!(error = %e, "generation handle has no usable credential");
                CompletionResult::Failure(CompletionError::Configuration(e.to_string()))
            }
            Err(e) => {
                warn!(error = %e, model = %self.handle.model(), "generation failed");
                CompletionResult::Failure(CompletionError::Backend(e))
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::backend::Generator;
    use crate::persona::{Persona, PersonaConfig};
    use crate::types::Message;

    /// Records every call; replies with `reply` or fails with a quota error.
    struct Recorder {
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, Option<String>)>>,
        reply: Option<String>,
    }

    impl Recorder {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()), reply: Some(text.into()) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()), reply: None })
        }

        fn last(&self) -> (String, Option<String>) {
            self.seen.lock().unwrap().last().cloned().expect("at least one call")
        }
    }

    #[async_trait]
    impl Generator for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn generate(&self, prompt: &str, instruction: Option<&str>) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((prompt.to_owned(), instruction.map(str::to_owned)));
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(BackendError::Api {
                    status: 429,
                    message: "Resource has been exhausted (e.g. check quota).".into(),
                }),
            }
        }
    }

    fn adapter(generator: Arc<Recorder>, persona: Persona) -> CompletionAdapter {
        CompletionAdapter::new(PersonaConfig::new("test-model", persona).configure(generator).unwrap())
    }

    #[tokio::test]
    async fn empty_request_never_reaches_backend() {
        let rec = Recorder::replying("unused");
        let result = adapter(rec.clone(), Persona::None).complete(&ChatRequest::default()).await;

        assert_eq!(result.reason().as_deref(), Some("no messages provided"));
        assert!(matches!(result, CompletionResult::Failure(CompletionError::NoMessages)));
        assert_eq!(rec.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn only_the_last_message_is_sent() {
        let rec = Recorder::replying("ok");
        let req = ChatRequest::new(vec![
            Message::user("first"),
            Message::assistant("reply"),
            Message::new(None, "last"),
        ]);
        let result = adapter(rec.clone(), Persona::None).complete(&req).await;

        assert!(result.is_success());
        assert_eq!(rec.calls.load(Ordering::SeqCst), 1);
        assert_eq!(rec.last(), ("last".to_owned(), None));
    }

    #[tokio::test]
    async fn standing_persona_is_not_prepended() {
        let rec = Recorder::replying("ok");
        let a = adapter(rec.clone(), Persona::Standing("PERSONA".into()));
        let _ = a.complete(&ChatRequest::single("hello")).await;

        assert_eq!(rec.last(), ("hello".to_owned(), Some("PERSONA".to_owned())));
    }

    #[tokio::test]
    async fn inline_persona_is_concatenated_exactly() {
        let rec = Recorder::replying("ok");
        let a = adapter(
            rec.clone(),
            Persona::Inline { text: "PERSONA".into(), separator: " | ".into() },
        );

        for content in ["hello", "", "오늘 하루는 맑았다"] {
            let _ = a.complete(&ChatRequest::single(content)).await;
            assert_eq!(rec.last(), (format!("PERSONA | {content}"), None));
        }
        assert_eq!(rec.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn backend_text_is_returned_unchanged() {
        let rec = Recorder::replying("맑고 고요한 하루였답니다.");
        let result = adapter(rec, Persona::None)
            .complete(&ChatRequest::single("오늘 하루는 맑았다"))
            .await;

        assert_eq!(result.into_result().unwrap(), "맑고 고요한 하루였답니다.");
    }

    #[tokio::test]
    async fn backend_failure_becomes_failure_result() {
        let rec = Recorder::failing();
        let result = adapter(rec.clone(), Persona::None).complete(&ChatRequest::single("hi")).await;

        let reason = result.reason().expect("failure");
        assert!(reason.contains("Resource has been exhausted"), "reason was {reason}");
        assert!(matches!(result, CompletionResult::Failure(CompletionError::Backend(_))));
        assert_eq!(rec.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_credential_is_a_configuration_failure() {
        struct Keyless;

        #[async_trait]
        impl Generator for Keyless {
            fn name(&self) -> &str {
                "keyless"
            }

            async fn generate(&self, _: &str, _: Option<&str>) -> Result<String, BackendError> {
                Err(BackendError::MissingCredential)
            }
        }

        let handle = PersonaConfig::new("m", Persona::None).configure(Arc::new(Keyless)).unwrap();
        let result = CompletionAdapter::new(handle).complete(&ChatRequest::single("hi")).await;
        assert!(matches!(result, CompletionResult::Failure(CompletionError::Configuration(_))));
    }

    #[tokio::test]
    async fn every_non_empty_request_yields_one_variant() {
        for rec in [Recorder::replying("ok"), Recorder::failing()] {
            let a = adapter(rec, Persona::Standing("P".into()));
            for req in [
                ChatRequest::single(""),
                ChatRequest::single("x"),
                ChatRequest::new(vec![Message::new(Some("system".into()), "s"); 4]),
            ] {
                let r = a.complete(&req).await;
                assert_ne!(r.is_success(), r.reason().is_some());
            }
        }
    }
}
