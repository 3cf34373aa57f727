#![doc = include_str!("../README.md")]
#![cfg_attr(feature = "doc_cfg", feature(doc_cfg))]
// If this was in Cargo.toml, it would cover the inspect-platform binary as well
#![warn(
    missing_docs,
    clippy::panic_in_result_fn,
    clippy::missing_assert_message,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    rustdoc::broken_intra_doc_links
)]

mod platform_check;

#[macro_use]
mod macros;

pub mod error;
pub use error::{Error, Result};

/// Platform-specific functionality.
///
/// Only the `unix` module exists at the moment. The Windows named pipe transport is expected to
/// expose the same surface as [`os::unix`] once it lands: a reference-counted handle, a stream with
/// the same end-of-stream and short-write policies, and a listener.
pub mod os {
    #[cfg(unix)]
    #[cfg_attr(feature = "doc_cfg", doc(cfg(unix)))]
    pub mod unix;
}

#[cfg(test)]
#[path = "../tests/index.rs"]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests;
