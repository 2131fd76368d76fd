use contactcache_types::{
    normalize_email, normalize_phone, phone_match_key, Contact, DisplayLabelOrder, KeyKind,
    Presence, SecondaryKey,
};

// ── Contact ──────────────────────────────────────────────────────

#[test]
fn label_prefers_explicit_display_label() {
    let mut c = Contact::new("contacts::1").with_name("Ada", "Lovelace");
    c.display_label = "Countess".into();
    assert_eq!(c.label(DisplayLabelOrder::FirstNameFirst), "Countess");
}

#[test]
fn label_follows_name_order() {
    let c = Contact::new("contacts::1").with_name("Ada", "Lovelace");
    assert_eq!(c.label(DisplayLabelOrder::FirstNameFirst), "Ada Lovelace");
    assert_eq!(c.label(DisplayLabelOrder::LastNameFirst), "Lovelace Ada");
}

#[test]
fn label_falls_back_to_contact_details() {
    let c = Contact::new("contacts::1").with_email("ada@example.org");
    assert_eq!(c.label(DisplayLabelOrder::FirstNameFirst), "ada@example.org");

    let c = Contact::new("contacts::2").with_phone("555 0100");
    assert_eq!(c.label(DisplayLabelOrder::FirstNameFirst), "555 0100");

    let c = Contact::new("contacts::3");
    assert_eq!(c.label(DisplayLabelOrder::FirstNameFirst), "");
}

#[test]
fn role_fields_cover_names_and_avatar() {
    let base = Contact::new("contacts::1").with_name("Ada", "Lovelace");

    let renamed = base.clone().with_name("Augusta", "Lovelace");
    assert!(base.role_fields_differ(&renamed));

    let mut avatar = base.clone();
    avatar.avatar = Some("file:///ada.png".into());
    assert!(base.role_fields_differ(&avatar));

    let favorite = base.clone().with_favorite(true).with_email("ada@example.org");
    assert!(!base.role_fields_differ(&favorite));
}

#[test]
fn presence_online_states() {
    assert!(Presence::Available.is_online());
    assert!(Presence::Away.is_online());
    assert!(Presence::Busy.is_online());
    assert!(!Presence::Offline.is_online());
    assert!(!Presence::Unknown.is_online());
}

#[test]
fn json_round_trip_with_missing_fields() {
    let c = Contact::from_json(r#"{"id":"contacts::3","first_name":"Joe"}"#).unwrap();
    assert_eq!(c.first_name, "Joe");
    assert_eq!(c.presence, Presence::Unknown);
    assert!(!c.favorite);

    let json = c.to_json().unwrap();
    assert_eq!(Contact::from_json(&json).unwrap(), c);
}

#[test]
fn invalid_json_is_an_error() {
    assert!(Contact::from_json("{").is_err());
}

// ── Secondary keys ───────────────────────────────────────────────

#[test]
fn phone_normalization_strips_separators() {
    assert_eq!(normalize_phone("+1 (555) 010-2000").as_deref(), Some("+15550102000"));
    assert_eq!(normalize_phone("555.010.2000").as_deref(), Some("5550102000"));
    assert_eq!(normalize_phone("  ").as_deref(), None);
    assert_eq!(normalize_phone("+").as_deref(), None);
}

#[test]
fn phone_match_key_joins_local_and_international_forms() {
    let intl = phone_match_key("+1 (555) 010-2000").unwrap();
    let local = phone_match_key("555-010-2000").unwrap();
    assert_eq!(intl, local);
    assert_eq!(intl, "0102000");
}

#[test]
fn short_numbers_keep_all_digits() {
    assert_eq!(phone_match_key("112").as_deref(), Some("112"));
}

#[test]
fn email_normalization() {
    assert_eq!(normalize_email("  Ada@Example.ORG ").as_deref(), Some("ada@example.org"));
    assert_eq!(normalize_email("not-an-email"), None);
    assert_eq!(normalize_email("@example.org"), None);
}

#[test]
fn secondary_key_construction() {
    let key = SecondaryKey::new(KeyKind::Email, "Joe@Example.com").unwrap();
    assert_eq!(key.kind, KeyKind::Email);
    assert_eq!(key.value, "joe@example.com");
    assert!(SecondaryKey::new(KeyKind::Phone, "n/a").is_none());
}
