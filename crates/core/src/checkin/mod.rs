//! Slash-command check-in processing: input parsing and the staged pipeline.

pub mod parser;
pub mod pipeline;

pub use parser::{parse_checkin, CheckinInput, ParseError};
pub use pipeline::{
    CheckinError, CheckinPipeline, CheckinService, CREATE_FAILED_REPLY, PROMPT_REPLY,
    SCORE_FAILED_REPLY, SUGGESTION_FAILED_REPLY, USAGE_REPLY,
};
