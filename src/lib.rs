// src/lib.rs

//! slotwatch library
//!
//! Watches an appointment booking page, turns it into availability records,
//! and sends a Telegram alert when the observed set changes.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
