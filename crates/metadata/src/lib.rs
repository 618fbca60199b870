//! Data model and metadata store facade.
//!
//! This crate defines the records the rest of the workspace operates on
//! ([`File`], [`Course`], [`View`]) and the [`MetadataStore`] trait through
//! which they are listed and through which the checkout ledger is mutated.
//! The store itself — typically an embedded database populated by a remote
//! session — lives outside this workspace; only its contract is consumed.
//!
//! The records are read-only snapshots for the duration of one
//! reconciliation/checkout cycle. The checkout ledger is the single source
//! of truth distinguishing "file the user deleted on purpose" from "file
//! never yet linked": a checkout record exists for a file in a view iff the
//! system believes a live hardlink exists at its templated location.

pub mod error;
mod memory;
mod models;
mod store;

pub use crate::memory::MemoryStore;
pub use crate::models::course::Course;
pub use crate::models::file::{CourseRef, File};
pub use crate::models::view::{Charset, EscapeMode, View};
pub use crate::store::{MetadataStore, SyncPolicy, SyncSelection};
