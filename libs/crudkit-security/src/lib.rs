#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod ability;
pub mod context;
pub mod error;
pub mod roles;

pub use ability::{Ability, Action, Attributes, Grant, Subject};
pub use context::{SecurityContext, SecurityContextBuilder};
pub use error::{ParseNameError, PermissionError};
pub use roles::{RoleName, ability_for};
