use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ability::{Ability, Action, Grant, Subject};
use crate::error::ParseNameError;

/// Built-in roles, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    User,
    Guest,
}

impl RoleName {
    pub const ALL: [Self; 3] = [Self::Admin, Self::User, Self::Guest];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Guest => "guest",
        }
    }

    /// Parse stored role names, dropping the ones that are not recognized.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Self> {
        names.into_iter().filter_map(|n| n.parse().ok()).collect()
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseNameError {
                kind: "role",
                value: s.to_owned(),
            })
    }
}

fn owned_by(username: &str) -> Map<String, Value> {
    let mut conditions = Map::new();
    conditions.insert("username".to_owned(), Value::String(username.to_owned()));
    conditions
}

/// Compute the ability of an actor holding `roles`.
///
/// The highest role wins: `admin` may manage everything; `user` may read
/// users, profiles and items, create items, and update or delete the items
/// it owns; `guest` (or no recognized role) may do nothing.
#[must_use]
pub fn ability_for(roles: &[RoleName], username: &str) -> Ability {
    if roles.contains(&RoleName::Admin) {
        return Ability::new(vec![Grant::new(Action::Manage, Subject::All)]);
    }
    if roles.contains(&RoleName::User) {
        return Ability::new(vec![
            Grant::new(Action::Read, Subject::User),
            Grant::new(Action::Read, Subject::Profile),
            Grant::new(Action::Read, Subject::Item),
            Grant::new(Action::Create, Subject::Item),
            Grant::new(Action::Update, Subject::Item).with_conditions(owned_by(username)),
            Grant::new(Action::Delete, Subject::Item).with_conditions(owned_by(username)),
        ]);
    }
    Ability::empty()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_of(username: &str) -> Map<String, Value> {
        json!({"id": 1, "username": username, "name": "desk"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn admin_can_delete_any_item() {
        let ability = ability_for(&[RoleName::Admin], "root");
        assert_eq!(ability.grants().len(), 1);
        assert!(ability.can(Action::Delete, Subject::Item, Some(&item_of("bob"))));
        assert!(ability.can(Action::Delete, Subject::Item, None));
    }

    #[test]
    fn admin_takes_precedence_over_other_roles() {
        let ability = ability_for(&[RoleName::Guest, RoleName::User, RoleName::Admin], "root");
        assert_eq!(
            ability.grants(),
            &[Grant::new(Action::Manage, Subject::All)]
        );
    }

    #[test]
    fn user_updates_own_items_only() {
        let ability = ability_for(&[RoleName::User], "ann");
        assert!(ability.can(Action::Update, Subject::Item, Some(&item_of("ann"))));
        assert!(!ability.can(Action::Update, Subject::Item, Some(&item_of("bob"))));
        assert!(ability.can(Action::Delete, Subject::Item, Some(&item_of("ann"))));
        assert!(!ability.can(Action::Delete, Subject::Item, Some(&item_of("bob"))));
    }

    #[test]
    fn user_reads_and_creates_but_cannot_administer() {
        let ability = ability_for(&[RoleName::User], "ann");
        assert!(ability.can(Action::Read, Subject::User, None));
        assert!(ability.can(Action::Read, Subject::Profile, None));
        assert!(ability.can(Action::Read, Subject::Item, None));
        assert!(ability.can(Action::Create, Subject::Item, None));
        assert!(!ability.can(Action::Read, Subject::Role, None));
        assert!(!ability.can(Action::ResetPassword, Subject::User, None));
        assert!(!ability.can(Action::Update, Subject::UserRole, None));
    }

    #[test]
    fn guest_or_no_role_can_do_nothing() {
        for roles in [&[RoleName::Guest][..], &[][..]] {
            let ability = ability_for(roles, "anyone");
            assert!(ability.is_empty());
            for action in Action::ALL {
                for subject in Subject::ALL {
                    assert!(!ability.can(action, subject, None));
                }
            }
        }
    }

    #[test]
    fn unknown_role_names_are_ignored() {
        assert_eq!(
            RoleName::from_names(["user", "superuser", "guest"]),
            [RoleName::User, RoleName::Guest]
        );
    }
}
