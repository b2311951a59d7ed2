//! Shared functionality
//!
//! This crate supplies the plumbing shared by the Cascata parsers: the
//! decoded code-point stream with its encoding selection, and source
//! location tracking.

pub mod byte_stream;
