//! Fetch orchestration for ContactCache.
//!
//! Ties the record store and the view registry to an asynchronous,
//! paginated contacts backend.
//!
//! # Components
//!
//! - **Backend**: the [`ContactBackend`] seam, its [`Query`] type and an
//!   in-memory [`MockBackend`](backend::mock::MockBackend)
//! - **Cache**: the composition root owning the store, the lists and views,
//!   and the changes waiting to be fetched
//! - **Orchestrator**: runs the list pipeline and turns debounced change
//!   notifications into batched fetches
//!
//! # Data flow
//!
//! 1. The pipeline queries the favorites, all and online lists in turn
//! 2. Every page is stored and its list reconciled against the results so
//!    far, so rows appear while later pages are still loading
//! 3. Views follow their list through filter projection and notify their
//!    subscribers
//! 4. Change notifications are coalesced until the backend goes quiet,
//!    then fetched with one query
//!
//! # Example
//!
//! ```
//! use contactcache_sync::{CacheConfig, FetchOrchestrator};
//! use contactcache_sync::backend::mock::MockBackend;
//! use contactcache_types::{Contact, ListKind};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let backend = Arc::new(MockBackend::with_contacts([
//!     Contact::new("contacts::1").with_name("Ada", "Lovelace"),
//! ]));
//! let mut orchestrator = FetchOrchestrator::new(backend, CacheConfig::default());
//! let view = orchestrator.cache_mut().register_view(ListKind::All, None);
//! orchestrator.populate().await.unwrap();
//! assert_eq!(orchestrator.cache().rows(view).unwrap().len(), 1);
//! # });
//! ```

pub mod backend;
mod cache;
mod config;
mod debounce;
mod error;
mod orchestrator;
mod pending;

pub use backend::{ChangeNotification, ContactBackend, ContactStream, Query, QueryFilter};
pub use cache::Cache;
pub use config::CacheConfig;
pub use debounce::ChangeDebouncer;
pub use error::{BackendError, BackendResult, CacheError, CacheResult};
pub use orchestrator::FetchOrchestrator;
pub use pending::PendingChangeSet;
