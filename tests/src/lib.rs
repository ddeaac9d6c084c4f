//! # SnartNet Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs        # Publish → broadcast → pipeline → sync
//!     ├── properties.rs   # Replay, rate limit, sync bounds, partial failure
//!     └── adversarial.rs  # Forged, tampered and junk input
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sn-tests
//! cargo test -p sn-tests integration::properties::
//! ```

pub mod integration;
