/*!
 * Mock analyzer implementations for testing.
 *
 * Two layers are mocked:
 * - `MockTransport` simulates the raw transport under the robust adapter
 *   (canned replies, failures, malformed output, slowness)
 * - `ScriptedAnalyzer` implements the analyzer port directly with scripted
 *   answers matched by question substring, and counts calls so tests can
 *   assert the at-most-one-call-per-key cache invariant
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::AnalyzerError;

use super::{AnalyzerRequest, AnalyzerTransport, SemanticAnalyzer, StructuredAnswer};

/// Behavior mode for the mock transport
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always returns the given reply
    Reply(&'static str),
    /// Fails the first N requests, then returns the reply
    FailThenReply {
        /// Number of leading failures
        failures: usize,
        /// Reply returned afterwards
        reply: &'static str,
    },
    /// Always fails with a server error
    Failing,
    /// Returns a reply that is not valid JSON
    Malformed,
    /// Simulates a slow service (for timeout testing)
    Slow {
        /// Delay before replying
        delay_ms: u64,
    },
}

/// Mock transport for adapter tests
#[derive(Debug)]
pub struct MockTransport {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter
    request_count: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Create a mock transport with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self { behavior, request_count: Arc::new(AtomicUsize::new(0)) }
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self { behavior: self.behavior, request_count: Arc::clone(&self.request_count) }
    }
}

#[async_trait]
impl AnalyzerTransport for MockTransport {
    async fn complete(&self, _prompt: String) -> Result<String, AnalyzerError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Reply(reply) => Ok(reply.to_string()),

            MockBehavior::FailThenReply { failures, reply } => {
                if count < failures {
                    Err(AnalyzerError::ApiError {
                        status_code: 503,
                        message: format!("simulated failure #{}", count + 1),
                    })
                } else {
                    Ok(reply.to_string())
                }
            }

            MockBehavior::Failing => Err(AnalyzerError::ApiError {
                status_code: 500,
                message: "simulated transport failure".to_string(),
            }),

            MockBehavior::Malformed => Ok("I think the answer is probably yes?".to_string()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(r#"{"answer": true, "confidence": 50}"#.to_string())
            }
        }
    }

    async fn test_connection(&self) -> Result<(), AnalyzerError> {
        Ok(())
    }
}

/// One scripted answer rule
struct ScriptRule {
    /// Substring the question must contain
    question_contains: String,
    /// Answer to return
    answer: StructuredAnswer,
}

/// Scripted analyzer implementing the port directly.
///
/// Rules are checked in insertion order; the first whose substring matches
/// the question wins. Without a match the default answer is returned, or an
/// error when no default is set.
pub struct ScriptedAnalyzer {
    rules: Mutex<Vec<ScriptRule>>,
    default_answer: Mutex<Option<StructuredAnswer>>,
    call_count: Arc<AtomicUsize>,
    asked_questions: Mutex<Vec<String>>,
}

impl std::fmt::Debug for ScriptedAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedAnalyzer")
            .field("calls", &self.call_count.load(Ordering::SeqCst))
            .finish()
    }
}

impl ScriptedAnalyzer {
    /// Create an empty script
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            default_answer: Mutex::new(None),
            call_count: Arc::new(AtomicUsize::new(0)),
            asked_questions: Mutex::new(Vec::new()),
        }
    }

    /// Script an answer for questions containing a substring
    pub fn on_question(self, question_contains: &str, answer: StructuredAnswer) -> Self {
        self.rules.lock().push(ScriptRule {
            question_contains: question_contains.to_string(),
            answer,
        });
        self
    }

    /// Set the answer for unmatched questions
    pub fn with_default(self, answer: StructuredAnswer) -> Self {
        *self.default_answer.lock() = Some(answer);
        self
    }

    /// Number of calls made
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Questions asked so far, in order
    pub fn asked_questions(&self) -> Vec<String> {
        self.asked_questions.lock().clone()
    }

    /// Calls whose question contained the substring
    pub fn calls_matching(&self, substring: &str) -> usize {
        self.asked_questions
            .lock()
            .iter()
            .filter(|q| q.contains(substring))
            .count()
    }
}

impl Default for ScriptedAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SemanticAnalyzer for ScriptedAnalyzer {
    async fn ask(&self, request: AnalyzerRequest) -> Result<StructuredAnswer, AnalyzerError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.asked_questions.lock().push(request.question.clone());

        let rules = self.rules.lock();
        for rule in rules.iter() {
            if request.question.contains(&rule.question_contains) {
                return Ok(rule.answer.clone());
            }
        }
        drop(rules);

        match self.default_answer.lock().clone() {
            Some(answer) => Ok(answer),
            None => Err(AnalyzerError::RetriesExhausted(format!(
                "no scripted answer for question: {}",
                request.question
            ))),
        }
    }
}
