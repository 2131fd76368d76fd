//! View filters.

use contactcache_store::RecordStore;
use contactcache_types::{normalize_phone, Contact, RecordHandle, ViewId};
use std::fmt;
use std::sync::Arc;

/// Predicate deciding which records of a list a view shows.
#[derive(Clone)]
pub enum ViewFilter {
    Favorites,
    Online,
    Search(SearchFilter),
    Custom(Arc<dyn Fn(&Contact) -> bool + Send + Sync>),
}

impl ViewFilter {
    /// A search over names, nickname, emails and phone digits.
    pub fn search(query: &str) -> Self {
        Self::Search(SearchFilter::new(query))
    }

    /// An arbitrary predicate. It must depend on the contact only.
    pub fn custom(predicate: impl Fn(&Contact) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    /// Whether the record passes. Records without data never pass.
    pub fn matches(&self, handle: RecordHandle, store: &RecordStore, view: ViewId) -> bool {
        let Some(contact) = store.lookup(handle) else {
            return false;
        };
        match self {
            Self::Favorites => contact.favorite,
            Self::Online => contact.presence.is_online(),
            Self::Search(search) => match store.listener_data::<SearchTokens>(handle, view) {
                Some(tokens) => tokens.matches(search),
                None => SearchTokens::from_contact(contact).matches(search),
            },
            Self::Custom(predicate) => predicate(contact),
        }
    }

    /// Whether every record passing `self` also passes `previous`, so
    /// switching from `previous` can only remove rows.
    pub fn refines(&self, previous: &ViewFilter) -> bool {
        match (self, previous) {
            (Self::Favorites, Self::Favorites) | (Self::Online, Self::Online) => true,
            (Self::Search(new), Self::Search(old)) => new.refines(old),
            (Self::Custom(new), Self::Custom(old)) => Arc::ptr_eq(new, old),
            _ => false,
        }
    }

    /// Caches search tokens on the entries a search view is about to
    /// evaluate.
    pub(crate) fn prime(&self, handles: &[RecordHandle], store: &mut RecordStore, view: ViewId) {
        if !matches!(self, Self::Search(_)) {
            return;
        }
        for &handle in handles {
            if store.listener_data::<SearchTokens>(handle, view).is_some() {
                continue;
            }
            let tokens = match store.lookup(handle) {
                Some(contact) => SearchTokens::from_contact(contact),
                None => continue,
            };
            // The entry exists: it just yielded a contact.
            let _ = store.set_listener_data(handle, view, tokens);
        }
    }
}

impl fmt::Debug for ViewFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Favorites => f.write_str("Favorites"),
            Self::Online => f.write_str("Online"),
            Self::Search(search) => f.debug_tuple("Search").field(search).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A prefix search: every term must start some token of the record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchFilter {
    terms: Vec<String>,
}

impl SearchFilter {
    pub fn new(query: &str) -> Self {
        Self {
            terms: query.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// True when each previous term is extended by some new term, e.g.
    /// `"jo"` after `"j"` or `"jo sm"` after `"jo"`.
    pub fn refines(&self, previous: &SearchFilter) -> bool {
        previous
            .terms
            .iter()
            .all(|old| self.terms.iter().any(|new| new.starts_with(old.as_str())))
    }
}

/// Lowercased search tokens of a record, cached per search view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTokens(Vec<String>);

impl SearchTokens {
    pub fn from_contact(contact: &Contact) -> Self {
        let words = [
            &contact.first_name,
            &contact.last_name,
            &contact.nickname,
            &contact.display_label,
        ]
        .into_iter()
        .flat_map(|field| field.split_whitespace())
        .map(str::to_lowercase);

        let emails = contact.emails.iter().flat_map(|email| {
            let email = email.trim().to_lowercase();
            let local = email.split('@').next().unwrap_or_default().to_string();
            [email, local]
        });

        let phones = contact
            .phone_numbers
            .iter()
            .filter_map(|phone| normalize_phone(phone))
            .map(|phone| phone.trim_start_matches('+').to_string());

        let mut tokens: Vec<String> = words
            .chain(emails)
            .chain(phones)
            .filter(|token| !token.is_empty())
            .collect();
        tokens.sort();
        tokens.dedup();
        Self(tokens)
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn matches(&self, search: &SearchFilter) -> bool {
        search
            .terms
            .iter()
            .all(|term| self.0.iter().any(|token| token.starts_with(term.as_str())))
    }
}
