//! Infrastructure layer: store adapters and external service clients.
//!
//! - [`memory`]: RwLock-backed implementations of every collaborator trait,
//!   used by tests and the default dev wiring.
//! - [`postgres`]: sqlx adapters over the relational data store's tables.
//! - [`gentext`]: generative-text clients behind the `TextGenerator` trait.

pub mod gentext;
pub mod memory;
pub mod postgres;

mod integration_tests;
