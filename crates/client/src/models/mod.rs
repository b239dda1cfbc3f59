//! Data models for job snapshots and decoded results.

pub mod jobs;
pub mod results;

pub use jobs::{CreateJobOptions, DispatchState, ExecMode, JobAction, JobContent, SearchMode};
pub use results::{
    FieldValue, Message, MessageLevel, RecordKind, ResultRecord, ResultRow, ResultsParams,
};
