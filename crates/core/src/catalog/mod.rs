//! Read-only catalog of units, battalions, abilities and army options.

mod index;
/// Catalog parsing, reference resolution and caching.
pub mod loader;
/// Catalog entity definitions.
pub mod models;

pub use index::Catalog;
pub use loader::{to_camel_case, CatalogLoader, CatalogSource};
pub use models::{
    AbilityCategory, AbilityText, Allegiance, ArmyOption, ArmyOptions, AvailabilityRule,
    Battalion, BattalionUnit, CategoryRule, CategoryTag, ExtraAbility, Faction, GrandAlliance,
    Model, Unit, UnitCategory, WeaponOption, WeaponOptionGroup,
};
