//! Storage engine for the mlmeta registry.
//!
//! The registry tracks a three-level hierarchy — models, hyperparameter
//! sets, checkpoints — behind one behavioral contract,
//! [`RepositoryStorage`]: create/read/update/list with merge-update
//! semantics, bottom-up hierarchy enforcement, and cursor-based
//! pagination (ascending key order, exclusive marker, default page size
//! of 10).
//!
//! # Backends
//!
//! - [`InMemoryStorage`] — sorted index under one reader-writer lock;
//!   the reference implementation of the contract semantics.
//! - [`ObjectStoreStorage`] — one JSON document per entity in any
//!   [`object_store`] backend, listed via prefix+delimiter enumeration.
//!
//! Behavioral equivalence between backends is enforced by the scenarios
//! in [`suite`], which any third backend can reuse.
//!
//! # Design Rules
//!
//! 1. Creation is append-only and conflict-checked; a failed operation
//!    performs no partial mutation.
//! 2. Updates merge; nothing is ever deleted.
//! 3. Every read returns an owned copy, never a reference into the store.
//! 4. Backend I/O failures propagate unchanged; not-found conditions are
//!    translated into the `NotExist` taxonomy error.

pub mod error;
pub mod memory;
pub mod object;
pub mod paths;
pub mod suite;
pub mod traits;

pub use error::{EntityKind, ErrorKind, StorageError, StorageResult};
pub use memory::InMemoryStorage;
pub use object::ObjectStoreStorage;
pub use traits::{effective_page_size, RepositoryStorage, DEFAULT_PAGE_SIZE};
