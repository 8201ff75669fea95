use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{profiles::Profile, roles::Role},
    telemetry::BusinessEvent,
};

/// What is known about the caller when a gated view or action runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    /// The identity provider has not answered yet.
    Resolving,
    Anonymous,
    Authenticated {
        user_id: Uuid,
        profile: Option<Profile>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum AccessDecision {
    Loading,
    Granted { user_id: Uuid, role: Role },
    Unauthenticated,
    ProfileIncomplete { user_id: Uuid },
    AccountDeactivated { user_id: Uuid },
    InsufficientRole { required: Role, actual: Role },
}

/// Proof that the gate granted access. Only [`AccessGate`] creates these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    user_id: Uuid,
    role: Role,
}

impl Actor {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

pub struct AccessGate;

impl AccessGate {
    /// Checks run in a fixed order and the first that applies decides:
    /// pending identity, no identity, no profile, inactive profile, role.
    /// An inactive account is denied before its role is looked at.
    pub fn evaluate(identity: &Identity, required: Option<Role>) -> AccessDecision {
        let (user_id, profile) = match identity {
            Identity::Resolving => return AccessDecision::Loading,
            Identity::Anonymous => return AccessDecision::Unauthenticated,
            Identity::Authenticated { user_id, profile } => (*user_id, profile),
        };

        let Some(profile) = profile else {
            return AccessDecision::ProfileIncomplete { user_id };
        };

        if !profile.is_active {
            return AccessDecision::AccountDeactivated { user_id };
        }

        if let Some(required) = required {
            if !profile.role.satisfies(required) {
                return AccessDecision::InsufficientRole {
                    required,
                    actual: profile.role,
                };
            }
        }

        AccessDecision::Granted {
            user_id,
            role: profile.role,
        }
    }

    /// Evaluates the gate and converts a denial into the matching error.
    pub fn require(identity: &Identity, required: Option<Role>) -> Result<Actor, AppError> {
        let decision = Self::evaluate(identity, required);
        if !decision.is_granted() && decision != AccessDecision::Loading {
            BusinessEvent::AccessDenied {
                user_id: identity_user_id(identity),
                reason: decision.reason().to_string(),
                required,
            }
            .log();
        }
        decision.into_actor()
    }
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Granted { .. } => "granted",
            Self::Unauthenticated => "unauthenticated",
            Self::ProfileIncomplete { .. } => "profile_incomplete",
            Self::AccountDeactivated { .. } => "account_deactivated",
            Self::InsufficientRole { .. } => "insufficient_role",
        }
    }

    pub fn into_actor(self) -> Result<Actor, AppError> {
        match self {
            Self::Granted { user_id, role } => Ok(Actor { user_id, role }),
            Self::Loading => Err(AppError::ServiceUnavailable(
                "Identity is still being resolved".to_string(),
            )),
            Self::Unauthenticated => Err(AppError::Unauthorized(
                "Sign in to continue".to_string(),
            )),
            Self::ProfileIncomplete { .. } => Err(AppError::ProfileIncomplete(
                "No profile exists for this account yet".to_string(),
            )),
            Self::AccountDeactivated { .. } => Err(AppError::AccountDeactivated(
                "This account has been deactivated".to_string(),
            )),
            Self::InsufficientRole { required, actual } => {
                Err(AppError::InsufficientRole { required, actual })
            }
        }
    }
}

fn identity_user_id(identity: &Identity) -> Option<Uuid> {
    match identity {
        Identity::Authenticated { user_id, .. } => Some(*user_id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(role: Role, is_active: bool) -> Profile {
        Profile {
            user_id: Uuid::from_u128(7),
            display_name: "Sam".to_string(),
            role,
            is_active,
            created_at: Utc::now(),
        }
    }

    fn signed_in(profile: Option<Profile>) -> Identity {
        Identity::Authenticated {
            user_id: Uuid::from_u128(7),
            profile,
        }
    }

    #[test]
    fn resolving_identity_is_loading() {
        assert_eq!(
            AccessGate::evaluate(&Identity::Resolving, Some(Role::Admin)),
            AccessDecision::Loading
        );
    }

    #[test]
    fn anonymous_is_unauthenticated_even_without_required_role() {
        assert_eq!(
            AccessGate::evaluate(&Identity::Anonymous, None),
            AccessDecision::Unauthenticated
        );
    }

    #[test]
    fn missing_profile_is_distinct_from_unauthenticated() {
        assert_eq!(
            AccessGate::evaluate(&signed_in(None), None),
            AccessDecision::ProfileIncomplete {
                user_id: Uuid::from_u128(7)
            }
        );
    }

    #[test]
    fn deactivated_account_is_denied_before_role_check() {
        let identity = signed_in(Some(profile(Role::User, false)));
        assert_eq!(
            AccessGate::evaluate(&identity, Some(Role::Moderator)),
            AccessDecision::AccountDeactivated {
                user_id: Uuid::from_u128(7)
            }
        );

        let admin = signed_in(Some(profile(Role::Admin, false)));
        assert!(matches!(
            AccessGate::evaluate(&admin, None),
            AccessDecision::AccountDeactivated { .. }
        ));
    }

    #[test]
    fn insufficient_role_reports_both_roles() {
        let identity = signed_in(Some(profile(Role::Editor, true)));
        assert_eq!(
            AccessGate::evaluate(&identity, Some(Role::Moderator)),
            AccessDecision::InsufficientRole {
                required: Role::Moderator,
                actual: Role::Editor,
            }
        );
    }

    #[test]
    fn higher_rank_is_granted() {
        let identity = signed_in(Some(profile(Role::Admin, true)));
        let actor = AccessGate::require(&identity, Some(Role::Moderator)).expect("granted");
        assert_eq!(actor.role(), Role::Admin);
        assert_eq!(actor.user_id(), Uuid::from_u128(7));
    }

    #[test]
    fn denials_map_to_distinct_errors() {
        assert!(matches!(
            AccessGate::require(&Identity::Anonymous, None),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            AccessGate::require(&signed_in(None), None),
            Err(AppError::ProfileIncomplete(_))
        ));
        assert!(matches!(
            AccessGate::require(&signed_in(Some(profile(Role::Admin, false))), None),
            Err(AppError::AccountDeactivated(_))
        ));
        assert!(matches!(
            AccessGate::require(&Identity::Resolving, None),
            Err(AppError::ServiceUnavailable(_))
        ));
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_value(AccessDecision::InsufficientRole {
            required: Role::Moderator,
            actual: Role::User,
        })
        .expect("json");
        assert_eq!(json["decision"], "insufficientRole");
        assert_eq!(json["required"], "moderator");
        assert_eq!(json["actual"], "user");
    }
}
