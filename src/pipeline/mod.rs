//! Pipeline components: context, scan, filter, priority, bounded processing, budget, aggregation.

pub mod aggregate;
pub mod budget;
pub mod cancel;
pub mod context;
pub mod error_handler;
pub mod filter;
pub mod orchestrator;
pub mod pool;
pub mod priority;
pub mod progress;
pub mod scan;
pub mod telemetry;

pub use budget::{BudgetDecision, BudgetLedger, TruncationSettings, enforce_budget};
pub use cancel::CancellationToken;
pub use context::PipelineContext;
pub use error_handler::{ErrorContext, ErrorKind, ErrorReporter, ErrorStage, LogReporter};
pub use filter::{FilterDecision, FilterOptions, FilterReason, FilterService};
pub use orchestrator::DigestGenerator;
pub use pool::{Task, run_bounded};
pub use priority::{priority_score, sort_by_priority};
pub use scan::{ScanOptions, ScanReport, Scanner, WalkOutcome};
pub use telemetry::{LogTelemetry, Telemetry, TelemetryEvent};
