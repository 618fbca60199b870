pub mod error;
mod escape;
pub mod sync;
mod template;
mod util;

pub use crate::escape::escape_file_name;
pub use crate::sync::{CachedFile, CheckoutReport, Reconciliation, RemoveReport, ViewSynchronizer};
pub use crate::template::{PathTemplate, Tokens};
