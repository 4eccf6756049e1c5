//! Channel directory models.

use serde::Serialize;

/// A forum channel row.
#[derive(Debug, Clone, Serialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub is_private: bool,
    pub owner_name: Option<String>,
    pub created_at: i64,
}

impl Channel {
    /// True if `username` is the recorded owner, compared exactly.
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner_name.as_deref() == Some(username)
    }

    /// True if `username` is the recorded owner, ignoring ASCII case.
    /// Invite authorization uses this looser match.
    pub fn is_owned_by_nocase(&self, username: &str) -> bool {
        self.owner_name
            .as_deref()
            .is_some_and(|o| o.eq_ignore_ascii_case(username))
    }
}

/// A channel listing row with live counts.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub is_private: bool,
    pub owner_name: Option<String>,
    pub member_count: i64,
    pub post_count: i64,
}

/// A membership row as shown in member listings.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelMember {
    pub username: String,
    pub role: String,
    pub invited_by: Option<String>,
    pub joined_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(owner: Option<&str>) -> Channel {
        Channel {
            id: 1,
            name: "sleep-vip".to_string(),
            icon: None,
            description: None,
            is_private: true,
            owner_name: owner.map(String::from),
            created_at: 0,
        }
    }

    #[test]
    fn test_owner_match_exact() {
        let c = channel(Some("Alice"));
        assert!(c.is_owned_by("Alice"));
        assert!(!c.is_owned_by("alice"));
        assert!(!channel(None).is_owned_by("Alice"));
    }

    #[test]
    fn test_owner_match_nocase() {
        let c = channel(Some("Alice"));
        assert!(c.is_owned_by_nocase("alice"));
        assert!(c.is_owned_by_nocase("ALICE"));
        assert!(!c.is_owned_by_nocase("bob"));
        assert!(!channel(None).is_owned_by_nocase("alice"));
    }
}
