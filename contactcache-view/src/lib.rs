//! Ordered, filtered views for ContactCache.
//!
//! The [`ViewRegistry`] keeps one unfiltered row list per backend query
//! and any number of views over each. Views hold record handles only; the
//! records themselves live in the [`RecordStore`](contactcache_store::RecordStore).
//!
//! Every structural change reaches a view's subscribers as a pair of
//! [`ViewEvent`]s, the `AboutTo*` event before the rows change and the
//! past-tense event after, in ascending index order.

mod error;
mod event;
mod filter;
mod list;
mod registry;

pub use error::{ViewError, ViewResult};
pub use event::{EventLog, ViewEvent, ViewSubscriber};
pub use filter::{SearchFilter, SearchTokens, ViewFilter};
pub use registry::ViewRegistry;
