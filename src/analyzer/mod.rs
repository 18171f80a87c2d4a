/*!
 * Semantic analyzer port.
 *
 * The engine delegates bounded natural-language questions about document text
 * to an external capability. This module defines the contract that capability
 * must satisfy: a single logical operation `ask(question, context, schema)`
 * returning a structured answer with a confidence score. Check modules never
 * handle transport or parsing concerns - those live in the adapter.
 *
 * - `adapter`: robust wrapper (timeout, retry, repair-and-reparse)
 * - `http`: HTTP-backed transport client
 * - `mock`: scripted implementations for tests
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::AnalyzerError;

pub mod adapter;
pub mod http;
pub mod mock;

pub use adapter::{AnalyzerOptions, RobustAnalyzer};
pub use http::HttpAnalyzer;
pub use mock::{MockBehavior, MockTransport, ScriptedAnalyzer};

/// Shape the structured answer must have
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerSchema {
    /// A yes/no judgment
    YesNo,
    /// One of a closed set of options
    Choice {
        /// Allowed options, lowercase
        options: Vec<String>,
    },
    /// A list of short strings (country names, terms)
    List,
    /// Free text (an extracted value)
    Text,
}

/// The parsed answer value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Yes/no
    Bool(bool),
    /// Chosen option or extracted text
    Text(String),
    /// List of strings
    List(Vec<String>),
}

impl AnswerValue {
    /// The boolean value, if this is a yes/no answer
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text value, if this is a choice or text answer
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The list value, if this is a list answer
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

/// A validated structured answer from the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    /// The answer, shaped per the request schema
    pub value: AnswerValue,
    /// Confidence 0-100
    pub confidence: u8,
}

impl StructuredAnswer {
    /// A yes/no answer
    pub fn yes_no(value: bool, confidence: u8) -> Self {
        Self { value: AnswerValue::Bool(value), confidence: confidence.min(100) }
    }

    /// A choice/text answer
    pub fn text(value: impl Into<String>, confidence: u8) -> Self {
        Self { value: AnswerValue::Text(value.into()), confidence: confidence.min(100) }
    }

    /// A list answer
    pub fn list(items: Vec<String>, confidence: u8) -> Self {
        Self { value: AnswerValue::List(items), confidence: confidence.min(100) }
    }
}

/// A bounded question about a text span
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerRequest {
    /// The question to answer
    pub question: String,
    /// The text span the question is about
    pub context_text: String,
    /// Expected answer shape
    pub schema: AnswerSchema,
}

impl AnalyzerRequest {
    /// Build a request
    pub fn new(question: impl Into<String>, context_text: impl Into<String>, schema: AnswerSchema) -> Self {
        Self { question: question.into(), context_text: context_text.into(), schema }
    }
}

/// The semantic analyzer port.
///
/// Implementations must be safe to share across the concurrently running
/// check modules.
#[async_trait]
pub trait SemanticAnalyzer: Send + Sync + Debug {
    /// Answer a bounded question about a text span
    async fn ask(&self, request: AnalyzerRequest) -> Result<StructuredAnswer, AnalyzerError>;
}

/// Raw transport under the robust adapter: takes a rendered prompt, returns
/// the unparsed reply text.
#[async_trait]
pub trait AnalyzerTransport: Send + Sync + Debug {
    /// Complete a prompt
    async fn complete(&self, prompt: String) -> Result<String, AnalyzerError>;

    /// Test the connection to the service
    async fn test_connection(&self) -> Result<(), AnalyzerError>;
}
