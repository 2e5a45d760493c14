pub mod dictionary;
pub mod discovery;
pub mod normalizer;
pub mod output;
pub mod parallel_processing;
pub mod reader;
pub mod report;
pub mod resegmenter;
pub mod unit;

// Re-export the engine surface
pub use dictionary::{BucketKey, DictionaryError, Lexicon, ShardedDictionary};
pub use normalizer::normalize;
pub use parallel_processing::{run_ordered, Engine, EngineConfig};
pub use report::{FileReporter, MemoryReporter, NullReporter, ReportConfig, ReportFormat, UnknownWordSink};
pub use resegmenter::{decide, resegment, MergeDecision, MergeRule, ReportEntry, Resegmented, Window};
pub use unit::{CleanedUnit, RawRow, Unit, UnitError, UnitOutcome};
