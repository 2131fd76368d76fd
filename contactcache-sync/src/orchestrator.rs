//! Drives the cache from the backend.
//!
//! The orchestrator owns the [`Cache`] and is the only caller of the
//! backend. It runs the list pipeline, batches change notifications
//! through a [`ChangeDebouncer`] and fetches whatever they name in one
//! query per flush.

use crate::backend::{ChangeNotification, ContactBackend, Query};
use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::debounce::ChangeDebouncer;
use crate::error::CacheResult;
use crate::pending::PendingChangeSet;
use contactcache_types::{BackendId, Contact, ListKind, RecordHandle, SortOrder};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest interval between expiry sweeps.
const MIN_EXPIRY_PERIOD: Duration = Duration::from_secs(1);

/// Owns a [`Cache`] and keeps it in step with a [`ContactBackend`].
pub struct FetchOrchestrator<B: ContactBackend> {
    backend: Arc<B>,
    cache: Cache,
    debouncer: ChangeDebouncer,
}

impl<B: ContactBackend> FetchOrchestrator<B> {
    pub fn new(backend: Arc<B>, config: CacheConfig) -> Self {
        let debouncer = ChangeDebouncer::new(config.debounce_window(), config.debounce_max_wait());
        Self {
            backend,
            cache: Cache::new(config),
            debouncer,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// When the pending changes are due to be fetched, if any are pending.
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    // ── Pipeline ────────────────────────────────────────────────────

    /// Queries every list in pipeline order, reconciling each page as it
    /// arrives. Each list's query completes before the next starts.
    pub async fn populate(&mut self) -> CacheResult<()> {
        let pipeline = self.cache.config().pipeline.clone();
        for list in pipeline {
            self.fetch_list(list).await?;
        }
        info!(lists = self.cache.config().pipeline.len(), "pipeline complete");
        Ok(())
    }

    async fn fetch_list(&mut self, list: ListKind) -> CacheResult<()> {
        let config = self.cache.config();
        let query = Query::list(list, config.sort_order, config.page_size());
        let mut pages = self.backend.fetch(query).await?;

        self.cache.begin_list(list);
        let mut count = 0;
        while let Some(page) = pages.next().await {
            let page = page?;
            count += page.len();
            self.cache.apply_list_batch(list, page)?;
        }
        self.cache.finish_list(list);
        debug!(%list, count, "list query finished");
        Ok(())
    }

    // ── Change notifications ────────────────────────────────────────

    /// Records a backend change notification received at `now`.
    pub fn notify(&mut self, notification: ChangeNotification, now: Instant) {
        debug!(?notification, "change notification");
        self.cache.record_notification(notification);
        self.debouncer.touch(now);
    }

    /// Asks for a record to be fetched with the next flush.
    pub fn request(&mut self, handle: RecordHandle, now: Instant) -> bool {
        let queued = self.cache.request(handle);
        if queued {
            self.debouncer.touch(now);
        }
        queued
    }

    /// Flushes pending changes if the debounce deadline has passed.
    pub async fn flush_if_due(&mut self, now: Instant) -> CacheResult<bool> {
        if !self.debouncer.is_due(now) {
            return Ok(false);
        }
        self.flush().await?;
        Ok(true)
    }

    /// Applies every pending change: removals locally, changed and
    /// requested records through one query by identifier, and additions
    /// by querying the lists again.
    ///
    /// If the backend fails, whatever was not applied stays pending and
    /// is retried after the next debounce window.
    pub async fn flush(&mut self) -> CacheResult<()> {
        self.debouncer.reset();
        let mut changes = self.cache.take_pending();

        let removed: Vec<RecordHandle> = std::mem::take(&mut changes.removed).into_keys().collect();
        self.cache.remove_records(&removed);

        let requested = self.cache.take_requested();
        let mut wanted: BTreeMap<RecordHandle, BackendId> = changes.changed.clone();
        for &handle in &requested {
            wanted
                .entry(handle)
                .or_insert_with(|| BackendId::for_handle(handle));
        }

        changes.relist |= !changes.added.is_empty();
        if !wanted.is_empty() {
            match self.fetch_by_id(wanted.into_values().collect()).await {
                Ok(reorder) => {
                    // Anything still waiting got no result.
                    for &handle in &requested {
                        self.cache.cancel_request(handle);
                    }
                    changes.relist |= reorder;
                }
                Err(err) => {
                    self.retry_later(changes, &requested);
                    return Err(err);
                }
            }
        }

        if changes.relist
            && let Err(err) = self.populate().await
        {
            let relist = PendingChangeSet {
                relist: true,
                ..PendingChangeSet::new()
            };
            self.retry_later(relist, &[]);
            return Err(err);
        }
        Ok(())
    }

    fn retry_later(&mut self, changes: PendingChangeSet, requested: &[RecordHandle]) {
        warn!(
            added = changes.added.len(),
            changed = changes.changed.len(),
            requested = requested.len(),
            relist = changes.relist,
            "flush failed, keeping changes for the next window"
        );
        self.cache.restore_pending(changes);
        for &handle in requested {
            self.cache.requeue(handle);
        }
        self.debouncer.touch(Instant::now());
    }

    async fn fetch_by_id(&mut self, ids: Vec<BackendId>) -> CacheResult<bool> {
        debug!(count = ids.len(), "fetching changed records");
        let config = self.cache.config();
        let query = Query::ids(ids, config.sort_order, config.page_size());
        let mut pages = self.backend.fetch(query).await?;

        let mut refresh = false;
        while let Some(page) = pages.next().await {
            refresh |= self.cache.apply_updates(page?)?;
        }
        Ok(refresh)
    }

    // ── Edits ───────────────────────────────────────────────────────

    /// Saves contacts, showing the edits immediately.
    ///
    /// If the backend rejects the save the local edits are rolled back.
    pub async fn save(&mut self, contacts: Vec<Contact>) -> CacheResult<Vec<BackendId>> {
        let snapshot = self.cache.apply_local(&contacts)?;
        match self.backend.save(contacts).await {
            Ok(ids) => {
                debug!(count = ids.len(), "saved contacts");
                Ok(ids)
            }
            Err(err) => {
                warn!(error = %err, "save failed, rolling back");
                self.cache.rollback(snapshot)?;
                Err(err.into())
            }
        }
    }

    /// Deletes records, dropping them locally once the backend confirms.
    pub async fn remove(&mut self, ids: Vec<BackendId>) -> CacheResult<()> {
        let handles: Vec<RecordHandle> = ids.iter().filter_map(BackendId::handle).collect();
        self.backend.remove(ids).await?;
        self.cache.remove_records(&handles);
        Ok(())
    }

    /// Changes the list sort order and queries every list again; rows move
    /// through reconciliation.
    pub async fn set_sort_order(&mut self, order: SortOrder) -> CacheResult<()> {
        if self.cache.config().sort_order == order {
            return Ok(());
        }
        info!(?order, "sort order changed");
        self.cache.set_sort_order(order);
        self.populate().await
    }

    // ── Event loop ──────────────────────────────────────────────────

    /// Processes change notifications until the channel closes, flushing
    /// after each quiet period and sweeping expired records.
    ///
    /// Changes still pending when the channel closes are flushed before
    /// returning.
    pub async fn run(
        &mut self,
        mut notifications: mpsc::UnboundedReceiver<ChangeNotification>,
    ) -> CacheResult<()> {
        let period = self.cache.config().expiry_grace().max(MIN_EXPIRY_PERIOD);
        let mut expiry = time::interval(period);
        expiry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("orchestrator running");
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                notification = notifications.recv() => match notification {
                    Some(notification) => self.notify(notification, Instant::now()),
                    None => break,
                },
                () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Err(err) = self.flush().await {
                        warn!(error = %err, "failed to apply changes");
                    }
                }
                _ = expiry.tick() => {
                    let evicted = self.cache.expire(Instant::now());
                    if !evicted.is_empty() {
                        debug!(count = evicted.len(), "expired records");
                    }
                }
            }
        }

        if self.debouncer.deadline().is_some() {
            self.flush().await?;
        }
        info!("notification channel closed, orchestrator stopped");
        Ok(())
    }
}
