//! vigil-sync - Reusable synchronization primitives for the Vigil core
//!
//! This crate provides the `Gate`, a named two-state barrier used by the
//! scheduling core to coordinate one recurring producer with arbitrarily many
//! blocked consumers. Unlike a one-shot latch, a gate is designed to be
//! raised and dropped repeatedly over its lifetime.

#![warn(missing_docs)]

mod gate;

pub use gate::{Gate, WaitError};
