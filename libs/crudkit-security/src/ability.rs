//! Grants and abilities.
//!
//! An [`Ability`] is an ordered set of [`Grant`]s. A grant permits one action
//! on one subject type, optionally restricted by an attribute predicate that
//! the target instance must satisfy.
//!
//! # Semantics
//!
//! - [`Action::Manage`] stands for every action, [`Subject::All`] for every
//!   subject type
//! - a predicate matches when every key equals the instance's attribute
//! - a predicate never matches when no instance is given (fail-closed)
//! - an ability with no grants denies everything

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ParseNameError, PermissionError};

/// Attributes of a concrete instance, or the predicate a grant places on them.
pub type Attributes = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Wildcard: any action.
    Manage,
    Read,
    Create,
    Update,
    Delete,
    ResetPassword,
    SetRole,
}

impl Action {
    pub const ALL: [Self; 7] = [
        Self::Manage,
        Self::Read,
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::ResetPassword,
        Self::SetRole,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manage => "manage",
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ResetPassword => "resetPassword",
            Self::SetRole => "setRole",
        }
    }

    /// `true` if a grant for `self` permits `requested`.
    #[inline]
    #[must_use]
    pub fn covers(self, requested: Self) -> bool {
        self == Self::Manage || self == requested
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseNameError {
                kind: "action",
                value: s.to_owned(),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// Wildcard: any subject type.
    All,
    User,
    Profile,
    Role,
    Item,
    UserRole,
}

impl Subject {
    pub const ALL: [Self; 6] = [
        Self::All,
        Self::User,
        Self::Profile,
        Self::Role,
        Self::Item,
        Self::UserRole,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::User => "user",
            Self::Profile => "profile",
            Self::Role => "role",
            Self::Item => "item",
            Self::UserRole => "user_role",
        }
    }

    #[inline]
    #[must_use]
    pub fn covers(self, requested: Self) -> bool {
        self == Self::All || self == requested
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseNameError {
                kind: "subject",
                value: s.to_owned(),
            })
    }
}

/// One permitted (action, subject, predicate) triple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    action: Action,
    subject: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conditions: Option<Attributes>,
}

impl Grant {
    /// An unconditional grant.
    #[must_use]
    pub fn new(action: Action, subject: Subject) -> Self {
        Self {
            action,
            subject,
            conditions: None,
        }
    }

    /// Restrict the grant to instances whose attributes equal `conditions`.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Attributes) -> Self {
        self.conditions = Some(conditions);
        self
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn conditions(&self) -> Option<&Attributes> {
        self.conditions.as_ref()
    }

    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.conditions.is_some()
    }

    /// `true` if the grant permits `action` on `subject` for `instance`.
    #[must_use]
    pub fn permits(&self, action: Action, subject: Subject, instance: Option<&Attributes>) -> bool {
        if !self.action.covers(action) || !self.subject.covers(subject) {
            return false;
        }
        match (&self.conditions, instance) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(conditions), Some(attrs)) => conditions
                .iter()
                .all(|(key, expected)| attrs.get(key) == Some(expected)),
        }
    }
}

/// The complete set of grants of one actor. Immutable once built.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    grants: Vec<Grant>,
}

impl Ability {
    #[must_use]
    pub fn new(grants: Vec<Grant>) -> Self {
        Self { grants }
    }

    /// An ability that denies everything.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Answer "may this actor do `action` on `subject` (matching `instance`)?".
    #[must_use]
    pub fn can(&self, action: Action, subject: Subject, instance: Option<&Attributes>) -> bool {
        self.grants
            .iter()
            .any(|g| g.permits(action, subject, instance))
    }

    /// Like [`Ability::can`], turning a refusal into an error.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::Denied`] if no grant permits the request.
    pub fn authorize(
        &self,
        action: Action,
        subject: Subject,
        instance: Option<&Attributes>,
    ) -> Result<(), PermissionError> {
        if self.can(action, subject, instance) {
            return Ok(());
        }
        tracing::warn!(
            action = %action,
            subject = %subject,
            with_instance = instance.is_some(),
            "permission denied"
        );
        Err(PermissionError::Denied { action, subject })
    }
}
