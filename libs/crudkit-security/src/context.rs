use crate::ability::{Ability, Action, Attributes, Subject};
use crate::error::PermissionError;
use crate::roles::{RoleName, ability_for};

/// `SecurityContext` carries the caller's identity and ability through one request.
///
/// The ability is computed once, when the context is built for an
/// authenticated caller. An anonymous context has no ability at all, which
/// is reported as [`PermissionError::NoAbilityComputed`], never as "allow".
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityContext {
    username: Option<String>,
    roles: Vec<RoleName>,
    ability: Option<Ability>,
}

impl SecurityContext {
    /// Create a new `SecurityContext` builder
    #[must_use]
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    /// Create an anonymous `SecurityContext` with no identity and no ability
    #[must_use]
    pub fn anonymous() -> Self {
        SecurityContextBuilder::default().build()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn roles(&self) -> &[RoleName] {
        &self.roles
    }

    /// The caller's ability.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::NoAbilityComputed`] for anonymous callers.
    pub fn ability(&self) -> Result<&Ability, PermissionError> {
        self.ability.as_ref().ok_or(PermissionError::NoAbilityComputed)
    }

    /// `false` for anonymous callers.
    #[must_use]
    pub fn can(&self, action: Action, subject: Subject, instance: Option<&Attributes>) -> bool {
        self.ability
            .as_ref()
            .is_some_and(|a| a.can(action, subject, instance))
    }

    /// # Errors
    ///
    /// Returns [`PermissionError::NoAbilityComputed`] for anonymous callers
    /// and [`PermissionError::Denied`] when no grant permits the request.
    pub fn authorize(
        &self,
        action: Action,
        subject: Subject,
        instance: Option<&Attributes>,
    ) -> Result<(), PermissionError> {
        self.ability()?.authorize(action, subject, instance)
    }
}

#[derive(Default)]
pub struct SecurityContextBuilder {
    username: Option<String>,
    roles: Vec<RoleName>,
    ability: Option<Ability>,
}

impl SecurityContextBuilder {
    #[must_use]
    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_owned());
        self
    }

    #[must_use]
    pub fn roles(mut self, roles: Vec<RoleName>) -> Self {
        self.roles = roles;
        self
    }

    /// Use `ability` instead of the one derived from the roles. Ignored for
    /// anonymous callers.
    #[must_use]
    pub fn ability(mut self, ability: Ability) -> Self {
        self.ability = Some(ability);
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityContext {
        let ability = self.username.as_deref().map(|username| {
            self.ability
                .unwrap_or_else(|| ability_for(&self.roles, username))
        });
        SecurityContext {
            username: self.username,
            roles: self.roles,
            ability,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::ability::Grant;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn anonymous_has_no_ability() {
        let ctx = SecurityContext::anonymous();
        assert!(ctx.username().is_none());
        assert_eq!(ctx.ability(), Err(PermissionError::NoAbilityComputed));
        assert!(!ctx.can(Action::Read, Subject::Item, None));
        assert_eq!(
            ctx.authorize(Action::Read, Subject::Item, None),
            Err(PermissionError::NoAbilityComputed)
        );
    }

    #[test]
    fn roles_without_username_do_not_grant_anything() {
        let ctx = SecurityContext::builder()
            .roles(vec![RoleName::Admin])
            .build();
        assert_eq!(ctx.ability(), Err(PermissionError::NoAbilityComputed));
    }

    #[test]
    fn builder_computes_ability_from_roles() {
        let ctx = SecurityContext::builder()
            .username("ann")
            .roles(vec![RoleName::User])
            .build();
        assert_eq!(ctx.username(), Some("ann"));
        assert_eq!(ctx.roles(), &[RoleName::User]);

        let own = json!({"username": "ann"}).as_object().cloned().unwrap();
        assert!(ctx.authorize(Action::Update, Subject::Item, Some(&own)).is_ok());
    }

    #[test]
    fn authenticated_without_roles_has_empty_ability() {
        let ctx = SecurityContext::builder().username("nobody").build();
        assert!(ctx.ability().is_ok_and(Ability::is_empty));
    }

    #[test]
    fn explicit_ability_replaces_role_ability() {
        let readonly = Ability::new(vec![Grant::new(Action::Read, Subject::Item)]);
        let ctx = SecurityContext::builder()
            .username("ann")
            .roles(vec![RoleName::Admin])
            .ability(readonly.clone())
            .build();
        assert!(ctx.can(Action::Read, Subject::Item, None));
        assert!(!ctx.can(Action::Read, Subject::User, None));

        let anonymous = SecurityContext::builder().ability(readonly).build();
        assert_eq!(anonymous.ability(), Err(PermissionError::NoAbilityComputed));
    }

    #[test]
    #[traced_test]
    fn denial_is_logged() {
        let ctx = SecurityContext::builder()
            .username("ann")
            .roles(vec![RoleName::Guest])
            .build();
        let err = ctx.authorize(Action::Create, Subject::Item, None);
        assert_eq!(
            err,
            Err(PermissionError::Denied {
                action: Action::Create,
                subject: Subject::Item
            })
        );
        assert!(logs_contain("permission denied"));
    }
}
