pub mod matching_engine;

pub use matching_engine::{
    CancelReport, EngineError, EngineResult, MatchingEngine, ReplaceReport, SubmitReport,
};
