use std::fmt;

use serde::{Deserialize, Serialize};

/// Site role mapping for core.user_role, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "core.user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Editor,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Editor, Role::Moderator, Role::Admin];

    /// Role required to see the moderation queue and decide comments.
    pub const MODERATION: Role = Role::Moderator;

    pub fn rank(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Editor => 1,
            Self::Moderator => 2,
            Self::Admin => 3,
        }
    }

    /// Returns true when `self` ranks at or above `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Editor => "editor",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn satisfies_is_reflexive() {
        for role in Role::ALL {
            assert!(role.satisfies(role), "{role} should satisfy itself");
        }
    }

    #[test]
    fn satisfies_is_monotonic_in_actual_rank() {
        for required in Role::ALL {
            let mut seen_satisfied = false;
            for actual in Role::ALL {
                let ok = actual.satisfies(required);
                if seen_satisfied {
                    assert!(ok, "{actual} must satisfy {required} once a lower rank does");
                }
                seen_satisfied |= ok;
            }
        }
    }

    #[test]
    fn moderation_requires_moderator_or_above() {
        assert!(!Role::User.satisfies(Role::MODERATION));
        assert!(!Role::Editor.satisfies(Role::MODERATION));
        assert!(Role::Moderator.satisfies(Role::MODERATION));
        assert!(Role::Admin.satisfies(Role::MODERATION));
    }

    #[test]
    fn rank_matches_declared_order() {
        let ranks: Vec<u8> = Role::ALL.iter().map(|role| role.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(Role::User < Role::Admin);
    }

    #[test]
    fn parse_accepts_known_roles_case_insensitively() {
        assert_eq!(Role::parse("Moderator"), Some(Role::Moderator));
        assert_eq!(Role::parse(" admin "), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }
}
