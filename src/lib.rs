/*!
 * # promolint - compliance linting for fund marketing documents
 *
 * A Rust library for automated first-pass compliance screening of structured
 * marketing documents (slide-by-slide text, tables, metadata) against a
 * corpus of regulatory rules.
 *
 * ## Features
 *
 * - Eight independent check modules: structure, registration, disclaimers,
 *   general rules, securities mentions, ESG, performance, prospectus
 *   alignment
 * - Deterministic field checks combined with a semantic-judgment port whose
 *   answers are cached and reused across modules
 * - Reconciliation of multilingual, loosely-formatted text against exact
 *   reference values (registration tables, disclaimer templates, prospectus
 *   facts)
 * - Confidence filtering and curated false-positive suppression with a full
 *   audit trail
 * - Per-module failure isolation: one broken check never aborts the run
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Document model and per-run context with semantic caches
 * - `reference`: Rule corpus and reference datasets
 * - `analyzer`: Semantic analyzer port, robust adapter, HTTP client, mocks
 * - `classifier`: Entity classification of mentioned terms
 * - `checks`: The eight check modules
 * - `engine`: Concurrent runner, violation filter, report aggregator
 * - `violation`: Violation, severity, and location types
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod analyzer;
pub mod app_config;
pub mod checks;
pub mod classifier;
pub mod document;
pub mod engine;
pub mod errors;
pub mod file_utils;
pub mod reference;
pub mod text_utils;
pub mod violation;

// Re-export main types for easier usage
pub use analyzer::{AnalyzerRequest, RobustAnalyzer, SemanticAnalyzer, StructuredAnswer};
pub use app_config::Config;
pub use document::{Document, DocumentContext, MetadataOverrides};
pub use engine::{Engine, Report, ViolationFilter};
pub use errors::{AnalyzerError, AppError, EngineError, ReferenceError};
pub use reference::ReferenceStore;
pub use violation::{ModuleId, Severity, Violation};
