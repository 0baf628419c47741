// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorities (role names) carried in tokens and trust assertions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single authority string, e.g. `ROLE_USER`.
///
/// Authority checks are exact, case-sensitive string membership tests.
/// There is no hierarchy: `ROLE_ADMIN` does not imply `ROLE_USER`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct Authority(String);

impl Authority {
    /// Authority granted to every registered user.
    pub const USER: &'static str = "ROLE_USER";
    /// Authority granted to administrators.
    pub const ADMIN: &'static str = "ROLE_ADMIN";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn user() -> Self {
        Self::new(Self::USER)
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, de-duplicated list of authorities.
///
/// Producers disagree on the wire shape of the authorities claim: some emit a
/// JSON array, others a single comma-delimited string. Both are accepted on
/// deserialization and normalized here, so nothing downstream ever sees the
/// ambiguous form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(from = "RawAuthorities")]
pub struct Authorities(Vec<Authority>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAuthorities {
    List(Vec<String>),
    Delimited(String),
}

impl From<RawAuthorities> for Authorities {
    fn from(raw: RawAuthorities) -> Self {
        match raw {
            RawAuthorities::List(items) => Authorities::new(items),
            RawAuthorities::Delimited(joined) => Authorities::parse_delimited(&joined),
        }
    }
}

impl Authorities {
    /// Build from any sequence of names. Names are trimmed, empty names are
    /// dropped and duplicates keep their first position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in names {
            set.push(Authority::new(name.as_ref()));
        }
        set
    }

    /// Parse a comma-delimited list such as `ROLE_USER, ROLE_ADMIN`.
    pub fn parse_delimited(joined: &str) -> Self {
        Self::new(joined.split(','))
    }

    pub fn push(&mut self, authority: Authority) {
        let name = authority.as_str().trim();
        if name.is_empty() || self.contains(name) {
            return;
        }
        self.0.push(Authority::new(name));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|a| a.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Authority> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form used by the `X-User-Roles` header.
    pub fn join(&self) -> String {
        self.0
            .iter()
            .map(Authority::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|a| a.as_str().to_string()).collect()
    }
}

impl FromIterator<Authority> for Authorities {
    fn from_iter<T: IntoIterator<Item = Authority>>(iter: T) -> Self {
        let mut set = Self::default();
        for authority in iter {
            set.push(authority);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_and_deduplicates_in_order() {
        let set = Authorities::new([" ROLE_USER", "ROLE_ADMIN", "ROLE_USER", ""]);
        assert_eq!(set.to_strings(), vec!["ROLE_USER", "ROLE_ADMIN"]);
    }

    #[test]
    fn parse_delimited_tolerates_spaces() {
        let set = Authorities::parse_delimited("ROLE_USER , ROLE_ADMIN,,");
        assert_eq!(set.join(), "ROLE_USER,ROLE_ADMIN");
    }

    #[test]
    fn contains_is_exact_and_case_sensitive() {
        let set = Authorities::new([Authority::USER]);
        assert!(set.contains("ROLE_USER"));
        assert!(!set.contains("role_user"));
        assert!(!set.contains("ROLE_ADMIN"));
    }

    #[test]
    fn deserializes_list_or_delimited_string() {
        let from_list: Authorities = serde_json::from_str(r#"["ROLE_USER","ROLE_ADMIN"]"#).unwrap();
        let from_string: Authorities = serde_json::from_str(r#""ROLE_USER, ROLE_ADMIN""#).unwrap();
        assert_eq!(from_list, from_string);
        assert_eq!(from_list.len(), 2);
    }

    #[test]
    fn serializes_as_plain_list() {
        let set = Authorities::new([Authority::USER]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["ROLE_USER"]"#);
    }
}
