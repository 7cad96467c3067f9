//! Gemini-backed implementation of the sentiment contract.

pub mod gemini;
pub mod prompts;

pub use gemini::GeminiService;
