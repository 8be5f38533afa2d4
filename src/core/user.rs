use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a user taking part in a split or a settlement.
///
/// The ordering of user ids is the stable key used everywhere a tie has to be
/// broken (remainder cents, equal debts), so results are reproducible.
///
/// # Examples
///
/// ```
/// use expense_engine::core::user::UserId;
///
/// let alice = UserId::new("alice");
/// let bob = UserId::new("bob");
/// assert!(alice < bob);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_equality() {
        assert_eq!(UserId::new("u-17"), UserId::new("u-17"));
        assert_ne!(UserId::new("u-17"), UserId::new("u-18"));
    }

    #[test]
    fn test_user_display() {
        assert_eq!(format!("{}", UserId::from("carol")), "carol");
    }

    #[test]
    fn test_user_ordering_is_lexicographic() {
        let mut users = vec![UserId::new("C"), UserId::new("A"), UserId::new("B")];
        users.sort();
        assert_eq!(users, vec![UserId::new("A"), UserId::new("B"), UserId::new("C")]);
    }

    #[test]
    fn test_user_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::new("dave")).unwrap();
        assert_eq!(json, "\"dave\"");
    }
}
