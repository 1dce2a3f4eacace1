//! Immutable catalog entities shared by every roster.

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

/// A physical miniature type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Coarse army affiliation.
///
/// Catalog sources spell it in lowercase; persisted rosters store the ordinal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GrandAlliance {
    /// Ordinal 0.
    Chaos,
    /// Ordinal 1.
    #[default]
    Order,
    /// Ordinal 2.
    Death,
    /// Ordinal 3.
    Destruction,
}

impl GrandAlliance {
    /// Numeric ordinal used by the roster record format.
    pub fn ordinal(self) -> u8 {
        match self {
            GrandAlliance::Chaos => 0,
            GrandAlliance::Order => 1,
            GrandAlliance::Death => 2,
            GrandAlliance::Destruction => 3,
        }
    }

    /// Inverse of [`GrandAlliance::ordinal`].
    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(GrandAlliance::Chaos),
            1 => Some(GrandAlliance::Order),
            2 => Some(GrandAlliance::Death),
            3 => Some(GrandAlliance::Destruction),
            _ => None,
        }
    }
}

impl fmt::Display for GrandAlliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GrandAlliance::Chaos => "chaos",
            GrandAlliance::Order => "order",
            GrandAlliance::Death => "death",
            GrandAlliance::Destruction => "destruction",
        };
        f.write_str(label)
    }
}

impl FromStr for GrandAlliance {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "chaos" => Ok(GrandAlliance::Chaos),
            "order" => Ok(GrandAlliance::Order),
            "death" => Ok(GrandAlliance::Death),
            "destruction" => Ok(GrandAlliance::Destruction),
            other => Err(format!("unknown grand alliance {other:?}")),
        }
    }
}

/// Faction a unit or battalion belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Faction {
    /// Catalog identifier, e.g. `STORMCASTETERNALS`.
    pub id: String,
    /// Alliance the entity sits under.
    pub grand_alliance: GrandAlliance,
    /// Display name.
    pub name: String,
}

/// Fine-grained army selection used for ability eligibility and army options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allegiance {
    /// Catalog identifier, derived from the name when the source omits it.
    pub id: String,
    /// Alliance the entity sits under.
    pub grand_alliance: GrandAlliance,
    /// Display name.
    pub name: String,
}

/// Composition category a unit can count towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    /// Hero able to lead the army.
    Leader,
    /// Core troops; the roster needs an exact number of them.
    Battleline,
    /// Monster or war machine counted against the behemoth cap.
    #[serde(alias = "behemot")]
    Behemoth,
    /// Counted against the artillery cap.
    Artillery,
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnitCategory::Leader => "leader",
            UnitCategory::Battleline => "battleline",
            UnitCategory::Behemoth => "behemoth",
            UnitCategory::Artillery => "artillery",
        };
        f.write_str(label)
    }
}

/// Condition under which a [`CategoryTag`] applies to a roster unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryRule {
    /// Counts unconditionally.
    #[default]
    Always,
    /// Counts only while the roster unit is the general.
    WhenGeneral,
    /// Counts only while the roster unit is not the general.
    WhenNotGeneral,
}

/// A category a unit may count towards, gated by a roster-dependent rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CategoryTagRepr")]
pub struct CategoryTag {
    /// Category counted when the rule holds.
    pub category: UnitCategory,
    /// Roster condition for the tag to apply.
    #[serde(default)]
    pub when: CategoryRule,
}

impl CategoryTag {
    /// Tag that counts regardless of the general.
    pub fn always(category: UnitCategory) -> Self {
        Self {
            category,
            when: CategoryRule::Always,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryTagRepr {
    Bare(UnitCategory),
    Full {
        category: UnitCategory,
        #[serde(default)]
        when: CategoryRule,
    },
}

impl From<CategoryTagRepr> for CategoryTag {
    fn from(repr: CategoryTagRepr) -> Self {
        match repr {
            CategoryTagRepr::Bare(category) => CategoryTag::always(category),
            CategoryTagRepr::Full { category, when } => CategoryTag { category, when },
        }
    }
}

/// One selectable weapon option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponOption {
    /// Identifier, unique within its group.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// An option group attached to a unit; a roster unit picks at most one entry per group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeaponOptionGroup {
    /// Mutually exclusive choices.
    pub options: Vec<WeaponOption>,
}

impl WeaponOptionGroup {
    /// Find an option of this group by id.
    pub fn option(&self, id: &str) -> Option<&WeaponOption> {
        self.options.iter().find(|option| option.id == id)
    }
}

/// A selectable unit type with its point cost.
#[derive(Debug, Clone)]
pub struct Unit {
    /// Catalog identifier; defaults to the model id.
    pub id: String,
    /// Miniature the unit is built from.
    pub model: Arc<Model>,
    /// Models per block bought for `points`.
    pub size: u32,
    /// Cost of one block.
    pub points: u32,
    /// Factions the unit can be fielded by.
    pub factions: Vec<Arc<Faction>>,
    /// Free-form label such as `Battleline` shown next to the name.
    pub sub_type: Option<String>,
    /// Option groups, positionally matched by roster selections.
    pub weapon_options: Vec<WeaponOptionGroup>,
    /// Advisory upper bound on models; never enforced.
    pub max_size: Option<u32>,
    /// Advisory upper bound on points; never enforced.
    pub max_points: Option<u32>,
    /// Categories the unit may count towards, see [`crate::roster::evaluate_categories`].
    pub categories: Vec<CategoryTag>,
}

impl Unit {
    /// True when any tag for `category` exists, whatever its rule.
    pub fn has_category(&self, category: UnitCategory) -> bool {
        self.categories.iter().any(|tag| tag.category == category)
    }
}

/// A required unit allocation inside a battalion.
#[derive(Debug, Clone)]
pub struct BattalionUnit {
    /// Required catalog unit.
    pub unit: Arc<Unit>,
    /// Number of roster entries of `unit` the battalion asks for.
    pub count: u32,
}

/// Formation bundle: costs points and requires unit allocations.
#[derive(Debug, Clone)]
pub struct Battalion {
    /// Catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Rules text, when the source provides one.
    pub description: Option<String>,
    /// Required allocations, in catalog order.
    pub units: Vec<BattalionUnit>,
    /// Cost added on top of the member units.
    pub points: u32,
    /// Factions able to field the battalion.
    pub factions: Vec<Arc<Faction>>,
}

/// Name and rules text of an extra ability.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbilityText {
    /// Display name.
    pub name: String,
    /// Rules text.
    #[serde(default)]
    pub description: String,
}

/// Kind of extra ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityCategory {
    /// Command trait carried by the general.
    Command,
    /// Artifact carried by a leader.
    #[serde(alias = "artefact")]
    Artifact,
}

/// Eligibility rule deciding whether an ability can be given to a roster unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AvailabilityRule {
    /// General only, one per roster.
    CommandTrait,
    /// Leaders only, one per unit, `1 + battalions` per roster.
    Artifact,
    /// No restriction.
    Always,
}

impl From<AbilityCategory> for AvailabilityRule {
    fn from(category: AbilityCategory) -> Self {
        match category {
            AbilityCategory::Command => AvailabilityRule::CommandTrait,
            AbilityCategory::Artifact => AvailabilityRule::Artifact,
        }
    }
}

/// Command trait or artifact selectable for a roster unit.
#[derive(Debug, Clone)]
pub struct ExtraAbility {
    /// Catalog identifier; derived from allegiance and ability name when omitted.
    pub id: String,
    /// Name and rules text.
    pub ability: AbilityText,
    /// Only rosters of this allegiance are offered the ability.
    pub allegiance: Arc<Allegiance>,
    /// Command trait or artifact.
    pub category: AbilityCategory,
    /// Grouping label used by some allegiances, e.g. a stormhost name.
    pub sub_category: Option<String>,
    /// Eligibility rule; defaults from `category`.
    pub rule: AvailabilityRule,
}

/// Allegiance-specific free-choice setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmyOption {
    /// Label of the setting, e.g. `Stormhost`.
    pub name: String,
    /// Suggested values; rosters may store anything.
    pub values: Vec<String>,
}

/// Army options keyed by allegiance id.
pub type ArmyOptions = HashMap<String, ArmyOption>;
