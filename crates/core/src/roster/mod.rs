//! Roster entity model and the computations derived from it.

/// Ability eligibility rules.
pub mod abilities;
mod models;
/// Battalion requirement reconciliation.
pub mod reconcile;
/// Point accounting and composition bounds.
pub mod rules;

#[cfg(test)]
pub(crate) mod test_support;

pub use abilities::is_ability_available;
pub use models::{
    Roster, RosterBattalion, RosterBattalionId, RosterUnit, RosterUnitId, WeaponOptionSelection,
    DEFAULT_ROSTER_NAME,
};
pub use reconcile::{battalion_lines, outstanding_requirements, BattalionLine, RequirementStatus};
pub use rules::{evaluate_categories, BattlelineTiers, Composition, CompositionWarning, MIN_LEADERS};
