//! Shared test fixtures for docexpiry
//!
//! Compiled for unit tests and, through the `testing` feature, for the
//! integration tests under `tests/`.
//!
//! ```rust,ignore
//! use docexpiry::testing::TestFixtures;
//!
//! // Settings and state with every Google endpoint pointed at a mock server
//! let state = TestFixtures::app_state("http://127.0.0.1:8089");
//! assert_eq!(state.settings.token_store.backend, "memory");
//! ```

pub mod fixtures;

pub use fixtures::TestFixtures;
