pub mod checkin;
pub mod config;
pub mod domain;
pub mod sentiment;
pub mod store;

pub use checkin::{
    parse_checkin, CheckinError, CheckinInput, CheckinPipeline, CheckinService, ParseError,
};
pub use config::{
    AppConfig, ConfigError, ConfigOverrides, DatabaseConfig, GeminiConfig, LoadOptions, LogFormat,
    LoggingConfig, ServerConfig, SlackConfig,
};
pub use domain::{
    CreateEmotionRequest, Emotion, EmotionId, ScoreOutOfRange, SentimentScore,
    UpdateEmotionRequest,
};
pub use sentiment::{SentimentError, SentimentService};
pub use store::{EmotionStore, StoreError};
