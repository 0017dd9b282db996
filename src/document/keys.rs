use std::fmt;

use super::Document;

/// Top-level keys of a stored player document, plus the keys of each asset entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    IdentityHandle,
    LastUsername,
    UniqueId,
    FirstSeen,
    LastSeen,
    TimeOnlineMs,
    KnownIps,
    KnownUsernames,
    Settings,
    Assets,
    TypeDescriptor,
    Meta,
}

impl DocumentKey {
    pub const PLAYER_FIELDS: [DocumentKey; 10] = [
        DocumentKey::IdentityHandle,
        DocumentKey::LastUsername,
        DocumentKey::UniqueId,
        DocumentKey::FirstSeen,
        DocumentKey::LastSeen,
        DocumentKey::TimeOnlineMs,
        DocumentKey::KnownIps,
        DocumentKey::KnownUsernames,
        DocumentKey::Settings,
        DocumentKey::Assets,
    ];

    /// Top-level keys of `doc` that are not player fields, in key order.
    pub fn unknown_player_fields(doc: &Document) -> Vec<&str> {
        doc.keys()
            .map(String::as_str)
            .filter(|key| !Self::PLAYER_FIELDS.iter().any(|field| field.as_str() == *key))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKey::IdentityHandle => "identity-handle",
            DocumentKey::LastUsername => "last-username",
            DocumentKey::UniqueId => "unique-id",
            DocumentKey::FirstSeen => "first-seen",
            DocumentKey::LastSeen => "last-seen",
            DocumentKey::TimeOnlineMs => "time-online-ms",
            DocumentKey::KnownIps => "known-ips",
            DocumentKey::KnownUsernames => "known-usernames",
            DocumentKey::Settings => "settings",
            DocumentKey::Assets => "assets",
            DocumentKey::TypeDescriptor => "type-descriptor",
            DocumentKey::Meta => "meta",
        }
    }
}

impl AsRef<str> for DocumentKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
