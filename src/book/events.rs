//! Notification hooks invoked after each processed batch.
//!
//! Handlers receive borrowed views that are only valid for the duration of
//! the call, and they run while the book's lock is held: they must return
//! promptly and must not call back into the book.

use crate::book::types::{PriceLevelChangeSet, PriceLevelSet};
use std::sync::Arc;

/// Listener receiving a full view of the visible book.
///
/// Used for both the new-book notification and the per-batch top-N view.
pub type BookListener = Arc<dyn Fn(&PriceLevelSet) + Send + Sync>;

/// Listener receiving the incremental change-set of one batch.
pub type ChangeSetListener = Arc<dyn Fn(&PriceLevelChangeSet) + Send + Sync>;
