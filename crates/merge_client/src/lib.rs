//! Client for the roster merge service: dataset upload and the single
//! reconciliation round trip.
//!
//! The service owns the matching. This crate only ships rows and join keys
//! across and decodes what comes back. No retries, no streaming.

mod client;

pub use client::{ClientError, MergeClient, MergeRequest, APRICOT_EXTENSION, ONESITE_EXTENSION};
