//! Slack Integration - Socket Mode bot interface
//!
//! This crate provides the Slack interface for vibecheck:
//! - **Socket Mode** (`socket`) - transport trait plus the event loop with reconnect/backoff
//! - **Slash Commands** (`commands`) - the `/vibe` check-in payload
//! - **Events** (`events`) - tagged envelope model and the handler dispatcher
//! - **Chat** (`chat`) - Web API client used to post replies
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and add the `/vibe` slash command
//! 3. Set env vars: `VIBECHECK_SLACK_APP_TOKEN`, `VIBECHECK_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack Envelope → SocketModeRunner → EventDispatcher → CheckinService
//!                        ↓ ack                               ↓
//!                     transport                 ChatClient ← reply text
//! ```
//!
//! # Key Types
//!
//! - `SocketModeRunner` - pumps a transport, acks envelopes, spawns dispatch
//! - `EventDispatcher` - routes envelopes to handlers by payload kind
//! - `SlashCommandHandler` - feeds `/vibe` payloads into the check-in pipeline
//! - `ChatClient` - posts the resulting reply to the channel

pub mod chat;
pub mod commands;
pub mod events;
pub mod socket;
