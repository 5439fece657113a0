//! Shared test utilities for entkv crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`Foo`] - Minimal entity body used throughout the store tests
//! - [`foo_ent`] / [`seed_ents`] - Entity constructors and the standard seed set
//! - [`strategies`] - Proptest strategies for ids, names and entities
//! - [`init_tracing`] - Route `tracing` output through the test harness
//! - [`capture_spans`] - Record the spans emitted by a closure

#![deny(unsafe_code)]

mod capture;
mod fixtures;
pub use capture::{CapturedSpan, capture_spans};
pub use fixtures::{Foo, foo_ent, seed_ents};

pub mod strategies;

/// Installs a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`, defaulting to `entkv=debug`. Safe to call from every test;
/// only the first call installs the subscriber.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("entkv=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
