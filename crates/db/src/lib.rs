pub mod connection;
pub mod emotion_store;
pub mod migrations;

pub use connection::{connect, ping, DbPool, PoolSettings};
pub use emotion_store::SqlEmotionStore;
