//! Content fingerprinting
//!
//! This module provides the streaming MD5 checksum used by directory
//! manifests. MD5 is kept for compatibility with manifests written by
//! earlier runs; it detects accidental corruption, not tampering.

pub mod checksum;

pub use checksum::{compute_md5, compute_md5_bytes, ChecksumStream};
