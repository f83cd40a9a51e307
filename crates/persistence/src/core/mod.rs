//! Core traits and abstractions.
//!
//! The sync engine never talks to a concrete database or search client. It
//! is handed implementations of these traits instead:
//!
//! - [`Backend`] - lifecycle (health check, schema initialization)
//! - [`RelationalStore`] - CRUD on the store of record
//! - [`OutboxStore`] - relational writes that also record index intents
//! - [`SearchIndex`] - index administration, document writes and search
//!
//! ```text
//! RelationalStore<E>
//!     └── OutboxStore<E>
//!
//! SearchIndex
//! ```

mod backend;
mod outbox;
mod relational;
mod search_index;

pub use backend::{Backend, BackendKind};
pub use outbox::{IndexMutation, OutboxEntry, OutboxStore};
pub use relational::RelationalStore;
pub use search_index::{
    BulkItem, BulkItemResult, BulkResponse, CreateIndexOutcome, DeleteOutcome, Refresh,
    SearchIndex,
};
