//! Larkgate — a Lark/Feishu bot gateway.
//!
//! Single Rust binary. Receives webhook callbacks over HTTP, verifies the
//! request signature and verification token, dispatches typed events to
//! registered listeners, and replies through the Lark Open API with text
//! or card messages.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod event;
pub mod handler;
pub mod webhook;

pub mod api;
pub mod card;
pub mod token;
