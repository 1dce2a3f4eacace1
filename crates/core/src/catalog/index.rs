use std::{collections::HashMap, sync::Arc};

use crate::manifest::CatalogMetadata;

use super::models::{
    Allegiance, ArmyOption, ArmyOptions, Battalion, ExtraAbility, Faction, Model, Unit,
};

/// Read-only catalog with every reference resolved to a shared entity.
///
/// Built once by [`super::CatalogLoader`] and shared behind an `Arc` by every roster.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub(super) metadata: CatalogMetadata,
    pub(super) models: Vec<Arc<Model>>,
    pub(super) factions: Vec<Arc<Faction>>,
    pub(super) allegiances: Vec<Arc<Allegiance>>,
    pub(super) units: Vec<Arc<Unit>>,
    pub(super) battalions: Vec<Arc<Battalion>>,
    pub(super) extra_abilities: Vec<Arc<ExtraAbility>>,
    pub(super) army_options: ArmyOptions,
    pub(super) unit_index: HashMap<String, Arc<Unit>>,
    pub(super) ability_index: HashMap<String, Arc<ExtraAbility>>,
}

impl Catalog {
    /// Snapshot metadata.
    pub fn metadata(&self) -> &CatalogMetadata {
        &self.metadata
    }

    /// Unit by catalog id.
    pub fn unit(&self, id: &str) -> Option<&Arc<Unit>> {
        self.unit_index.get(id)
    }

    /// Extra ability by catalog id.
    pub fn extra_ability(&self, id: &str) -> Option<&Arc<ExtraAbility>> {
        self.ability_index.get(id)
    }

    /// Battalion by catalog id.
    pub fn battalion(&self, id: &str) -> Option<&Arc<Battalion>> {
        self.battalions.iter().find(|battalion| battalion.id == id)
    }

    /// Allegiance by catalog id.
    pub fn allegiance(&self, id: &str) -> Option<&Arc<Allegiance>> {
        self.allegiances.iter().find(|allegiance| allegiance.id == id)
    }

    /// First allegiance entry; new rosters and unresolvable records fall back to it.
    pub fn default_allegiance(&self) -> &Arc<Allegiance> {
        // The loader refuses catalogs without allegiances.
        &self.allegiances[0]
    }

    /// Allegiances in catalog order; the first is the default.
    pub fn allegiances(&self) -> &[Arc<Allegiance>] {
        &self.allegiances
    }

    /// Units sorted by model name.
    pub fn units(&self) -> &[Arc<Unit>] {
        &self.units
    }

    /// Models sorted by name.
    pub fn models(&self) -> &[Arc<Model>] {
        &self.models
    }

    /// Factions in catalog order.
    pub fn factions(&self) -> &[Arc<Faction>] {
        &self.factions
    }

    /// Battalions in catalog order.
    pub fn battalions(&self) -> &[Arc<Battalion>] {
        &self.battalions
    }

    /// Command traits and artifacts of every allegiance.
    pub fn extra_abilities(&self) -> &[Arc<ExtraAbility>] {
        &self.extra_abilities
    }

    /// Army option declared for an allegiance, if any.
    pub fn army_options(&self, allegiance_id: &str) -> Option<&ArmyOption> {
        self.army_options.get(allegiance_id)
    }
}
