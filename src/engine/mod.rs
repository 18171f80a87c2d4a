/*!
 * Evaluation engine: concurrent runner, violation filter, report aggregator.
 */

pub mod filter;
pub mod report;
pub mod runner;

pub use filter::{
    DEFAULT_CONFIDENCE_THRESHOLD, FalsePositivePattern, FilterOutcome, FilterReason,
    FilteredViolation, ViolationFilter,
};
pub use report::{ModuleRecord, ModuleStatus, Report, ReportAggregator, SeverityCounts};
pub use runner::Engine;
