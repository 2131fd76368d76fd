//! The contacts backend seam.
//!
//! The cache never talks to a contacts database directly. It issues
//! [`Query`]s through a [`ContactBackend`] and receives results as a stream
//! of pages; change notifications arrive separately on a channel.

pub mod mock;

use crate::error::BackendResult;
use async_trait::async_trait;
use contactcache_types::{BackendId, Contact, ListKind, SortOrder};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Pages of records produced by a query. The stream ending means the query
/// finished.
pub type ContactStream = BoxStream<'static, BackendResult<Vec<Contact>>>;

/// Which records a query selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFilter {
    /// Every record in a list, in sort order.
    List(ListKind),
    /// Specific records, in no particular order.
    Ids(Vec<BackendId>),
}

/// A paginated backend query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub filter: QueryFilter,
    pub sort: SortOrder,
    pub page_size: usize,
}

impl Query {
    pub fn list(list: ListKind, sort: SortOrder, page_size: usize) -> Self {
        Self {
            filter: QueryFilter::List(list),
            sort,
            page_size,
        }
    }

    pub fn ids(ids: Vec<BackendId>, sort: SortOrder, page_size: usize) -> Self {
        Self {
            filter: QueryFilter::Ids(ids),
            sort,
            page_size,
        }
    }
}

/// A change reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeNotification {
    Added(Vec<BackendId>),
    Changed(Vec<BackendId>),
    Removed(Vec<BackendId>),
}

/// Asynchronous access to the contacts database.
#[async_trait]
pub trait ContactBackend: Send + Sync {
    /// Starts a query. Pages are delivered in sort order.
    async fn fetch(&self, query: Query) -> BackendResult<ContactStream>;

    /// Stores contacts, assigning identifiers to new ones. Returns the
    /// identifier of each contact, in input order.
    async fn save(&self, contacts: Vec<Contact>) -> BackendResult<Vec<BackendId>>;

    /// Deletes records.
    async fn remove(&self, ids: Vec<BackendId>) -> BackendResult<()>;
}
