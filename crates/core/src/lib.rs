//! `cliphub-core` — domain foundation building blocks.
//!
//! Pure domain primitives shared by every other crate: strongly-typed
//! identifiers and the domain error model. No infrastructure concerns here.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{LogEntryId, NotificationId, UserId, VideoId};
