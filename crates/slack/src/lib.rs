//! Slack Integration - Socket Mode bot interface
//!
//! This crate provides the Slack interface for teamdraw:
//! - **Socket Mode** (`socket`) - event loop over a pluggable transport
//! - **Slash Commands** (`commands`) - `/pick voice|user|text`, `/team [size] @...`
//! - **Draw Service** (`service`) - resolves candidates and runs the draw engine
//! - **Roster** (`roster`) - known members and voice room occupancy
//! - **Events** (`events`) - slash commands and voice state changes
//! - **Block Kit** (`blocks`) - team and pick result messages
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and subscribe to huddle events
//! 3. Add slash commands: `/pick`, `/team`
//! 4. Set env vars: `TEAMDRAW_SLACK_APP_TOKEN`, `TEAMDRAW_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → Handlers → RosterDrawService → Draw Engine
//!                    ↓                              ↓
//!              Block Kit UI ← Response        InMemoryRoster
//! ```
//!
//! # Key Types
//!
//! - `SocketModeRunner` - event loop with reconnection logic
//! - `EventDispatcher` - Routes events to appropriate handlers
//! - `DrawCommandService` - Trait for command handlers
//! - `RosterProvider` - Trait for member and voice room lookups

pub mod blocks;
pub mod commands;
pub mod events;
pub mod roster;
pub mod service;
pub mod socket;
