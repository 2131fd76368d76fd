//! The contact record snapshot delivered by the backend.

use crate::ids::{BackendId, RecordHandle};
use serde::{Deserialize, Serialize};

/// Presence state reported for a contact's accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    #[default]
    Unknown,
    Offline,
    Away,
    Busy,
    Available,
}

impl Presence {
    /// Whether the contact counts as online for the "online" list.
    #[must_use]
    pub fn is_online(self) -> bool {
        matches!(self, Self::Available | Self::Away | Self::Busy)
    }
}

/// Which name component leads a generated display label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLabelOrder {
    #[default]
    FirstNameFirst,
    LastNameFirst,
}

/// Sort key the backend orders list queries by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    FirstName,
    LastName,
    DisplayLabel,
}

/// A contact as delivered by the backend.
///
/// Property-detail parsing happens upstream; the cache only needs the
/// fields that drive ordering, filtering and secondary lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: BackendId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub display_label: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub presence: Presence,
    #[serde(default)]
    pub modified_at: i64,
}

impl Contact {
    /// Creates an empty contact for a backend identifier.
    pub fn new(id: impl Into<BackendId>) -> Self {
        Self {
            id: id.into(),
            first_name: String::new(),
            last_name: String::new(),
            display_label: String::new(),
            nickname: String::new(),
            avatar: None,
            phone_numbers: Vec::new(),
            emails: Vec::new(),
            favorite: false,
            presence: Presence::Unknown,
            modified_at: 0,
        }
    }

    /// Sets first and last name.
    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    #[must_use]
    pub fn with_phone(mut self, number: impl Into<String>) -> Self {
        self.phone_numbers.push(number.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }

    #[must_use]
    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    #[must_use]
    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    /// The internal handle for this record, if its identifier is well formed.
    #[must_use]
    pub fn handle(&self) -> Option<RecordHandle> {
        self.id.handle()
    }

    /// Returns the display label, generating one from the name parts when
    /// the backend did not supply it.
    #[must_use]
    pub fn label(&self, order: DisplayLabelOrder) -> String {
        if !self.display_label.is_empty() {
            return self.display_label.clone();
        }

        let (a, b) = match order {
            DisplayLabelOrder::FirstNameFirst => (&self.first_name, &self.last_name),
            DisplayLabelOrder::LastNameFirst => (&self.last_name, &self.first_name),
        };
        let label = [a.as_str(), b.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        if !label.is_empty() {
            label
        } else if !self.nickname.is_empty() {
            self.nickname.clone()
        } else if let Some(email) = self.emails.first() {
            email.clone()
        } else {
            self.phone_numbers.first().cloned().unwrap_or_default()
        }
    }

    /// Whether the fields that define how the contact renders differ.
    ///
    /// Names, labels and avatar change what a row shows; everything else
    /// only affects filtering and lookup.
    #[must_use]
    pub fn role_fields_differ(&self, other: &Self) -> bool {
        self.first_name != other.first_name
            || self.last_name != other.last_name
            || self.display_label != other.display_label
            || self.nickname != other.nickname
            || self.avatar != other.avatar
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
