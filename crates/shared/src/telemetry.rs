//! Tracing initialization.
//!
//! Core services never touch global logging state; the process entry point
//! calls [`init`] exactly once before constructing any component, and every
//! component simply emits through `tracing` from then on.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `default_directives` is used when `RUST_LOG` is not set, e.g.
/// `"papyra=debug,sea_orm=info"`.
///
/// # Panics
///
/// Panics if a global subscriber is already installed. Call this once, from
/// the binary's `main`, never from library code.
pub fn init(default_directives: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
