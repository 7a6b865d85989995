#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Full action x subject matrix for each role, through the public API.

use crudkit_security::{
    Action, Attributes, PermissionError, RoleName, SecurityContext, Subject,
};
use serde_json::json;

fn owned(username: &str) -> Attributes {
    json!({"id": 3, "username": username, "name": "desk", "price": 10.0})
        .as_object()
        .cloned()
        .unwrap()
}

fn ctx(username: &str, roles: &[&str]) -> SecurityContext {
    SecurityContext::builder()
        .username(username)
        .roles(RoleName::from_names(roles.iter().copied()))
        .build()
}

#[test]
fn admin_is_allowed_everything() {
    let admin = ctx("root", &["admin"]);
    for action in Action::ALL {
        for subject in Subject::ALL {
            assert!(admin.can(action, subject, None), "{action} {subject}");
            assert!(admin.can(action, subject, Some(&owned("ann"))));
        }
    }
}

#[test]
fn user_matrix() {
    let ann = ctx("ann", &["user"]);
    let mine = owned("ann");
    let theirs = owned("bob");

    for subject in [Subject::User, Subject::Profile, Subject::Item] {
        assert!(ann.can(Action::Read, subject, None), "read {subject}");
    }
    for subject in [Subject::Role, Subject::UserRole, Subject::All] {
        assert!(!ann.can(Action::Read, subject, None), "read {subject}");
    }
    assert!(ann.can(Action::Create, Subject::Item, Some(&mine)));
    assert!(ann.can(Action::Create, Subject::Item, None));

    for action in [Action::Update, Action::Delete] {
        assert!(ann.can(action, Subject::Item, Some(&mine)));
        assert!(!ann.can(action, Subject::Item, Some(&theirs)));
        // owner predicates need an instance
        assert!(!ann.can(action, Subject::Item, None));
    }
    for action in [Action::ResetPassword, Action::SetRole, Action::Manage] {
        assert!(!ann.can(action, Subject::User, None), "{action}");
    }
}

#[test]
fn guest_and_unknown_roles_get_nothing() {
    for roles in [&["guest"][..], &["auditor"][..], &[][..]] {
        let caller = ctx("gus", roles);
        for action in Action::ALL {
            for subject in Subject::ALL {
                assert!(!caller.can(action, subject, None));
            }
        }
        assert_eq!(
            caller.authorize(Action::Read, Subject::Item, None),
            Err(PermissionError::Denied {
                action: Action::Read,
                subject: Subject::Item
            })
        );
    }
}

#[test]
fn anonymous_callers_have_no_ability() {
    let anonymous = SecurityContext::anonymous();
    assert!(!anonymous.can(Action::Read, Subject::Item, None));
    assert_eq!(
        anonymous.authorize(Action::Read, Subject::Item, None),
        Err(PermissionError::NoAbilityComputed)
    );
}

#[test]
fn names_round_trip_through_strings() {
    for action in Action::ALL {
        assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
    }
    for subject in Subject::ALL {
        assert_eq!(subject.as_str().parse::<Subject>().unwrap(), subject);
    }
    assert_eq!("resetPassword".parse::<Action>().unwrap(), Action::ResetPassword);
    assert_eq!("user_role".parse::<Subject>().unwrap(), Subject::UserRole);
    assert!("publish".parse::<Action>().is_err());
}
