//! In-memory gateway for tests.
//!
//! Requests are matched to rules by a substring of the system prompt, so a
//! rule keyed on a role's prompt answers for that role only.

use crate::llm::{CompletionGateway, CompletionRequest, GatewayError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Fail(String),
    Hang,
}

#[derive(Debug, Clone)]
struct Rule {
    key: String,
    script: Script,
    delay: Duration,
}

/// Scripted gateway with call recording and an in-flight high-water mark.
#[derive(Debug, Default)]
pub(crate) struct ScriptedGateway {
    rules: Vec<Rule>,
    default_reply: Option<String>,
    calls: Mutex<Vec<CompletionRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer every unmatched request with `text`.
    pub(crate) fn default_reply(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Some(text.into());
        self
    }

    pub(crate) fn reply(self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.rule(key, Script::Reply(text.into()), Duration::ZERO)
    }

    pub(crate) fn reply_after(
        self,
        key: impl Into<String>,
        text: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.rule(key, Script::Reply(text.into()), delay)
    }

    pub(crate) fn fail(self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.rule(key, Script::Fail(message.into()), Duration::ZERO)
    }

    pub(crate) fn hang(self, key: impl Into<String>) -> Self {
        self.rule(key, Script::Hang, Duration::ZERO)
    }

    fn rule(mut self, key: impl Into<String>, script: Script, delay: Duration) -> Self {
        self.rules.push(Rule {
            key: key.into(),
            script,
            delay,
        });
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let rule = self
            .rules
            .iter()
            .find(|r| request.system_prompt.contains(&r.key))
            .cloned();
        self.calls.lock().unwrap().push(request);

        // Yield so sibling calls in the same wave overlap.
        tokio::task::yield_now().await;

        let Some(rule) = rule else {
            return self
                .default_reply
                .clone()
                .ok_or_else(|| GatewayError::InvalidResponse("no scripted reply".to_string()));
        };

        if !rule.delay.is_zero() {
            tokio::time::sleep(rule.delay).await;
        }

        match rule.script {
            Script::Reply(text) => Ok(text),
            Script::Fail(message) => Err(GatewayError::Transport(message)),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GatewayError::EmptyAnswer)
            }
        }
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}
