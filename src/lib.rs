//! # Quantum Optimizer
//!
//! Re-encodes images smaller: resize, rotate and flip, adjust brightness,
//! contrast and saturation, stamp a text watermark, then encode to JPEG, PNG,
//! WebP or AVIF. Encoding can search for the highest quality that fits a
//! byte budget, and every result can be converted to extra formats alongside
//! the primary one.
//!
//! # Architecture: One Pipeline, Many Callers
//!
//! ```text
//! bytes → decode → resize → transform → filters → watermark → encode ─┬→ primary
//!                                                   (target-size search) └→ alternates
//! ```
//!
//! Every stage below decode is a pure function of a [`imaging::RasterImage`]
//! and an [`imaging::OptimizeRequest`]. Only decode and encode touch codecs,
//! and they do so through the [`imaging::ImageBackend`] trait, so unit tests
//! run the whole pipeline against a mock that never encodes a pixel.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | The pipeline stages, the backend trait and the pure-Rust backend |
//! | [`session`] | Interactive editing state: one loaded image plus accumulated settings |
//! | [`batch`] | Walks inputs, optimizes files in parallel, writes outputs and the JSON report |
//! | [`config`] | `quantum-optimizer.toml` loading, layering over defaults, validation |
//! | [`naming`] | `<stem>-optimized.<ext>` output file names |
//! | [`output`] | CLI output formatting for batch progress, totals and `info` |
//!
//! # Design Decisions
//!
//! ## Requests Are Values
//!
//! A [`session::Session`] accumulates edits, but each preview or optimize
//! call snapshots them into an immutable [`imaging::OptimizeRequest`]. The
//! pipeline never sees mutable state, which is what lets the batch driver
//! hand the same request to every rayon worker.
//!
//! ## Blur Is Preview-Only
//!
//! The blur setting softens the on-screen preview and is never applied to
//! an encoded file. Config comments and the `--blur` help say so.
//!
//! ## Target Size Is Best Effort
//!
//! The quality search stops at the attempt cap or the quality floor. Missing
//! the target is not an error: the last probe is returned with
//! `achieved = false` and the CLI reports it.
//!
//! ## Pure-Rust Codecs
//!
//! Decoding and encoding use the `image` crate only (AVIF behind the default
//! `avif` feature). No system libraries are needed at build or run time.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
