//! Core types and trait definitions for the gate pass service.
//!
//! No HTTP or database dependencies live here.
//! Storage, imaging and transport live behind the [`store::GatePassStore`]
//! and [`render::QrRenderer`] traits.

// Trait methods spell out `+ Send` futures; impls use plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod credential;
pub mod error;
pub mod identity;
pub mod log;
pub mod pass;
pub mod render;
pub mod service;
pub mod store;

pub use error::{Error, Result};
