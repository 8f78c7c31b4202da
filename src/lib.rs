//! # Chat Trivia Library
//!
//! This library runs trivia games inside chat channels. A game draws
//! questions from a collection, posts them one at a time, awards points to
//! the first participant whose message is an accepted answer (exactly or
//! within a fuzzy similarity threshold) and posts the final standings. At
//! most one game runs per channel and only in channels that allow it.
//!
//! The chat platform is abstracted behind [`chat::Chat`]; [`service::Trivia`]
//! is the entry point a platform adapter calls.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

pub mod chat;
pub mod checker;
pub mod config;
pub mod constants;
pub mod loader;
pub mod question;
pub mod registry;
pub mod scoreboard;
pub mod service;
pub mod session;

pub use chat::{ChannelId, Chat, LocalChat};
pub use config::{GameOptions, Settings};
pub use service::Trivia;
