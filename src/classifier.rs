/*!
 * Entity classifier.
 *
 * Classifies a mentioned term into security / service provider / concept /
 * excluded. Resolution order: cache lookup, static exclusion list, then one
 * bounded analyzer question. The result is cached by the normalized term only
 * (not by context): a term's category is treated as context-independent
 * within one document, bounding the run to O(distinct terms) external calls.
 */

use log::warn;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Arc;

use crate::analyzer::{AnalyzerRequest, AnswerSchema, SemanticAnalyzer, StructuredAnswer};
use crate::document::context::{DocumentContext, TermClassification, TermType};
use crate::text_utils::normalize_term;

/// Confidence attached to the conservative fallback classification
const FALLBACK_CONFIDENCE: u8 = 30;

/// Terms that never reach the analyzer: common financial vocabulary, month
/// names, and well-known service providers.
static STATIC_EXCLUSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        // Common vocabulary that looks like a proper noun in titles
        "fund", "portfolio", "benchmark", "index", "market", "equity", "equities", "bond",
        "bonds", "performance", "risk", "return", "returns", "volatility", "allocation",
        "strategy", "outlook", "europe", "asia", "america", "world", "global", "esg",
        "sustainability", "growth", "value", "income", "yield", "duration", "liquidity",
        // Month names, frequent in performance tables
        "january", "february", "march", "april", "may", "june", "july", "august",
        "september", "october", "november", "december",
        // Service providers commonly named in fund documents
        "bloomberg", "morningstar", "msci", "ftse", "euroclear", "clearstream",
        "state street", "bny mellon", "caceis",
    ])
});

/// Rule-based + semantic-assisted classification of mentioned terms
#[derive(Debug)]
pub struct EntityClassifier {
    analyzer: Arc<dyn SemanticAnalyzer>,
    /// Document-specific exclusions (fund family, management company)
    extra_exclusions: HashSet<String>,
}

impl EntityClassifier {
    /// Create a classifier over the given analyzer port
    pub fn new(analyzer: Arc<dyn SemanticAnalyzer>) -> Self {
        Self { analyzer, extra_exclusions: HashSet::new() }
    }

    /// Exclude document-specific names (the fund family and the management
    /// company are never "securities mentioned")
    pub fn with_exclusions<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.extra_exclusions
            .extend(names.into_iter().map(|n| normalize_term(&n)).filter(|n| !n.is_empty()));
        self
    }

    fn is_excluded(&self, normalized: &str) -> bool {
        STATIC_EXCLUSIONS.contains(normalized)
            || self
                .extra_exclusions
                .iter()
                .any(|e| e == normalized || normalized.contains(e.as_str()))
    }

    /// Classify a term given its surrounding text.
    ///
    /// At most one external call per distinct normalized term per run; all
    /// subsequent lookups are cache hits.
    pub async fn classify(
        &self,
        ctx: &DocumentContext,
        term: &str,
        local_context: &str,
    ) -> TermClassification {
        let normalized = normalize_term(term);
        if normalized.is_empty() {
            return TermClassification {
                term_type: TermType::Excluded,
                is_security: false,
                confidence: 100,
            };
        }

        let question = format!(
            "Is '{}' a tradable security, a service provider, or a general concept, \
             given this surrounding text?",
            term
        );
        let context_text = local_context.to_string();

        ctx.classification_cache
            .get_or_compute(normalized.clone(), || async move {
                if self.is_excluded(&normalized) {
                    return TermClassification {
                        term_type: TermType::Excluded,
                        is_security: false,
                        confidence: 100,
                    };
                }

                ctx.record_semantic_call();
                let request = AnalyzerRequest::new(
                    question,
                    context_text,
                    AnswerSchema::Choice {
                        options: vec![
                            "security".to_string(),
                            "service_provider".to_string(),
                            "concept".to_string(),
                        ],
                    },
                );
                match self.analyzer.ask(request).await {
                    Ok(answer) => from_answer(&answer),
                    Err(e) => {
                        // Fail conservative: flag for review rather than
                        // silently clearing a possible violation
                        warn!("Classification of '{}' failed: {}", normalized, e);
                        TermClassification {
                            term_type: TermType::Unknown,
                            is_security: true,
                            confidence: FALLBACK_CONFIDENCE,
                        }
                    }
                }
            })
            .await
    }
}

fn from_answer(answer: &StructuredAnswer) -> TermClassification {
    let term_type = match answer.value.as_text() {
        Some("security") => TermType::Security,
        Some("service_provider") => TermType::ServiceProvider,
        Some("concept") => TermType::Concept,
        _ => TermType::Unknown,
    };
    TermClassification {
        term_type,
        is_security: matches!(term_type, TermType::Security | TermType::Unknown),
        confidence: answer.confidence,
    }
}
