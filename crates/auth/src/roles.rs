use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use portal_core::DomainError;

/// Privilege tier used for route and menu gating.
///
/// The set is closed and totally ordered: `Guest < User < Manager < Admin`.
/// The derived `Ord` follows declaration order, which is the hierarchy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Unauthenticated or unrecognised identity.
    #[default]
    Guest,
    User,
    Manager,
    Admin,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Role; 4] = [Role::Guest, Role::User, Role::Manager, Role::Admin];

    /// Numeric privilege level; strictly increasing over [`Role::ALL`].
    pub const fn level(self) -> u8 {
        match self {
            Role::Guest => 0,
            Role::User => 1,
            Role::Manager => 2,
            Role::Admin => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::User => "USER",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
        }
    }

    /// Human-facing name used in guard notices.
    pub const fn display_name(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "member",
            Role::Manager => "manager",
            Role::Admin => "administrator",
        }
    }

    /// Parse a role name that may be missing or malformed.
    ///
    /// Anything that is not a known role becomes [`Role::Guest`]: identity
    /// data never grants more than the lowest tier by accident.
    pub fn from_name_lenient(name: Option<&str>) -> Role {
        match name.map(str::parse::<Role>) {
            Some(Ok(role)) => role,
            Some(Err(err)) => {
                tracing::debug!("treating unrecognised role as GUEST: {err}");
                Role::Guest
            }
            None => Role::Guest,
        }
    }
}

/// Level of a role name, failing safe to the guest level.
pub fn level_of(name: Option<&str>) -> u8 {
    Role::from_name_lenient(name).level()
}

/// `true` when `user_role` sits at or above `required_role` in the hierarchy.
pub fn has_minimum_role(user_role: Role, required_role: Role) -> bool {
    user_role.level() >= required_role.level()
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| DomainError::unknown_role(name))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde helper for identity payloads: missing, null or unknown roles
/// deserialize as [`Role::Guest`] instead of failing the whole document.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let name = raw.as_ref().and_then(serde_json::Value::as_str);
    Ok(Role::from_name_lenient(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn levels_follow_declaration_order() {
        let levels: Vec<u8> = Role::ALL.iter().map(|r| r.level()).collect();
        assert_eq!(levels, vec![0, 1, 2, 3]);
        assert!(Role::Guest < Role::User);
        assert!(Role::Manager < Role::Admin);
    }

    #[test]
    fn unknown_or_missing_role_is_guest_level() {
        assert_eq!(level_of(None), Role::Guest.level());
        assert_eq!(level_of(Some("SUPERUSER")), Role::Guest.level());
        assert_eq!(level_of(Some("")), Role::Guest.level());
        assert_eq!(level_of(Some("admin")), Role::Admin.level());
    }

    #[test]
    fn parse_is_case_insensitive_and_strict_on_unknowns() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(" USER ".parse::<Role>().unwrap(), Role::User);
        assert_eq!(
            "root".parse::<Role>().unwrap_err(),
            DomainError::UnknownRole("root".to_string())
        );
    }

    #[test]
    fn serde_uses_uppercase_names() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"MANAGER\"");
        let role: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn lenient_deserializer_degrades_to_guest() {
        #[derive(Deserialize)]
        struct Identity {
            #[serde(default, deserialize_with = "deserialize_lenient")]
            role: Role,
        }

        let parsed: Identity = serde_json::from_str(r#"{"role":"OWNER"}"#).unwrap();
        assert_eq!(parsed.role, Role::Guest);
        let parsed: Identity = serde_json::from_str(r#"{"role":null}"#).unwrap();
        assert_eq!(parsed.role, Role::Guest);
        let parsed: Identity = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(parsed.role, Role::Guest);
        let parsed: Identity = serde_json::from_str(r#"{"role":42}"#).unwrap();
        assert_eq!(parsed.role, Role::Guest);
        let parsed: Identity = serde_json::from_str(r#"{"role":"MANAGER"}"#).unwrap();
        assert_eq!(parsed.role, Role::Manager);
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the minimum-role predicate is exactly a level comparison.
        #[test]
        fn has_minimum_role_matches_levels(a in any_role(), b in any_role()) {
            prop_assert_eq!(has_minimum_role(a, b), a.level() >= b.level());
        }

        /// Property: level is strictly monotonic with the role ordering.
        #[test]
        fn level_is_strictly_monotonic(a in any_role(), b in any_role()) {
            prop_assert_eq!(a < b, a.level() < b.level());
        }

        /// Property: arbitrary strings never resolve above their parsed role.
        #[test]
        fn lenient_parse_never_escalates(name in ".{0,12}") {
            let role = Role::from_name_lenient(Some(&name));
            match name.parse::<Role>() {
                Ok(parsed) => prop_assert_eq!(role, parsed),
                Err(_) => prop_assert_eq!(role, Role::Guest),
            }
        }
    }
}
