use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved roles, declared from lowest to highest priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Subscriber,
    Admin,
    Superuser,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Subscriber, Role::Admin, Role::Superuser];

    /// Every account holds this role; revocation falls back to it.
    pub const BASELINE: Role = Role::User;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Subscriber => "subscriber",
            Role::Admin => "admin",
            Role::Superuser => "superuser",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::User => "Registered user",
            Role::Subscriber => "User with an active subscription",
            Role::Admin => "Administrator",
            Role::Superuser => "Superuser with unrestricted access",
        }
    }

    pub fn is_reserved(name: &str) -> bool {
        name.parse::<Role>().is_ok()
    }

    pub fn priority_index(name: &str) -> Result<usize, UnknownRole> {
        let role = name.parse::<Role>()?;
        Ok(Self::ALL
            .iter()
            .position(|candidate| *candidate == role)
            .unwrap_or_default())
    }

    /// Unknown names on either side never grant access.
    pub fn at_least(actual: &str, required: &str) -> bool {
        match (Self::priority_index(actual), Self::priority_index(required)) {
            (Ok(actual), Ok(required)) => actual >= required,
            _ => false,
        }
    }

    /// Highest-priority reserved role among `names`, or the baseline.
    pub fn highest<'a>(names: impl IntoIterator<Item = &'a str>) -> Role {
        names
            .into_iter()
            .filter_map(|name| name.parse::<Role>().ok())
            .max()
            .unwrap_or(Self::BASELINE)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Role::User),
            "subscriber" => Ok(Role::Subscriber),
            "admin" => Ok(Role::Admin),
            "superuser" => Ok(Role::Superuser),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait RequiredRole {
    fn required() -> Role;
}

pub struct AdminRole;

impl RequiredRole for AdminRole {
    fn required() -> Role {
        Role::Admin
    }
}

/// Which half of a pair a token is; each is only accepted where it belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub jti: Uuid,
    pub user_id: Uuid,
    pub iat: i64, // issued at (unix)
    pub exp: i64, // expiry (unix)
    pub role: String,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// A freshly minted pair together with the claims that went into it.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access: String,
    pub refresh: String,
    pub access_claims: Claims,
    pub refresh_claims: Claims,
}

impl IssuedTokens {
    pub fn pair(&self) -> TokenPair {
        TokenPair {
            access_token: self.access.clone(),
            refresh_token: self.refresh.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AdminRole, RequiredRole, Role, UnknownRole};

    #[test]
    fn role_string_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            "manager".parse::<Role>(),
            Err(UnknownRole("manager".to_string()))
        );
    }

    #[test]
    fn priority_follows_declaration_order() {
        assert_eq!(Role::priority_index("user"), Ok(0));
        assert_eq!(Role::priority_index("subscriber"), Ok(1));
        assert_eq!(Role::priority_index("admin"), Ok(2));
        assert_eq!(Role::priority_index("superuser"), Ok(3));
        assert!(Role::priority_index("Admin").is_err());
    }

    #[test]
    fn at_least_matches_priority_comparison_over_catalog() {
        for actual in Role::ALL {
            for required in Role::ALL {
                let expected = Role::priority_index(actual.as_str()).expect("reserved role")
                    >= Role::priority_index(required.as_str()).expect("reserved role");
                assert_eq!(
                    Role::at_least(actual.as_str(), required.as_str()),
                    expected,
                    "{actual} vs {required}"
                );
            }
        }
    }

    #[test]
    fn at_least_fails_closed_on_unknown_names() {
        assert!(!Role::at_least("editor", "user"));
        assert!(!Role::at_least("superuser", "editor"));
        assert!(!Role::at_least("", ""));
    }

    #[test]
    fn highest_picks_top_reserved_role_and_ignores_custom_ones() {
        assert_eq!(Role::highest(["user", "admin", "editor"]), Role::Admin);
        assert_eq!(Role::highest(["editor"]), Role::User);
        assert_eq!(Role::highest(Vec::<&str>::new()), Role::User);
    }

    #[test]
    fn admin_marker_requires_admin() {
        assert_eq!(AdminRole::required(), Role::Admin);
    }
}
