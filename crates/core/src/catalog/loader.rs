use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::manifest::{self, CatalogMetadata};

use super::{
    index::Catalog,
    models::{
        AbilityCategory, AbilityText, Allegiance, ArmyOptions, AvailabilityRule, Battalion,
        BattalionUnit, CategoryTag, ExtraAbility, Faction, GrandAlliance, Model, Unit,
        WeaponOptionGroup,
    },
};

/// Thread-safe loader that reads the catalog once and hands out shared snapshots.
#[derive(Clone)]
pub struct CatalogLoader {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    path: PathBuf,
    cache: Option<Arc<Catalog>>,
}

impl CatalogLoader {
    /// Build a loader for a catalog file or a directory of catalog fragments.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                path: path.into(),
                cache: None,
            })),
        }
    }

    /// Location the catalog is read from.
    pub fn path(&self) -> PathBuf {
        self.inner.read().path.clone()
    }

    /// Point the loader at a new location and drop the cached snapshot.
    pub fn refresh(&self, path: impl Into<PathBuf>) {
        let mut inner = self.inner.write();
        inner.path = path.into();
        inner.cache = None;
    }

    /// Return the catalog, reading it on first use.
    pub fn catalog(&self) -> Result<Arc<Catalog>> {
        let mut inner = self.inner.write();
        if let Some(catalog) = &inner.cache {
            return Ok(Arc::clone(catalog));
        }

        let catalog = Arc::new(Catalog::from_path(&inner.path)?);
        info!(
            units = catalog.units().len(),
            battalions = catalog.battalions().len(),
            "loaded catalog {} from {}",
            catalog.metadata().label(),
            inner.path.display()
        );
        inner.cache = Some(Arc::clone(&catalog));
        Ok(catalog)
    }
}

impl Catalog {
    /// Parse and resolve a catalog from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        CatalogSource::parse(json)?.resolve()
    }

    /// Read a catalog file, or merge every `*.json` fragment below a directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            return load_directory(path);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        CatalogSource::parse(&contents)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?
            .resolve()
    }
}

fn load_directory(root: &Path) -> Result<Catalog> {
    let mut source = CatalogSource::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('.'))
            .unwrap_or(false);
        if hidden {
            continue;
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog fragment {}", path.display()))?;
        let fragment = CatalogSource::parse(&contents)
            .with_context(|| format!("failed to parse catalog fragment {}", path.display()))?;
        source.merge(fragment);
    }

    if let Some(metadata) = CatalogMetadata::load(manifest::manifest_path(root))? {
        source.metadata = Some(metadata);
    }
    source.resolve()
}

/// Unresolved catalog document: every cross reference is still a string id.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogSource {
    metadata: Option<CatalogMetadata>,
    models: Vec<ModelSource>,
    factions: Vec<AffiliationSource>,
    allegiances: Vec<AffiliationSource>,
    units: Vec<UnitSource>,
    battalions: Vec<BattalionSource>,
    extra_abilities: Vec<ExtraAbilitySource>,
    army_options: ArmyOptions,
}

#[derive(Debug, Deserialize)]
struct ModelSource {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AffiliationSource {
    id: Option<String>,
    grand_alliance: GrandAlliance,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitSource {
    id: Option<String>,
    model: String,
    #[serde(default = "default_size")]
    size: u32,
    #[serde(default)]
    points: u32,
    #[serde(default)]
    factions: Vec<String>,
    sub_type: Option<String>,
    #[serde(default)]
    weapon_options: Vec<WeaponOptionGroup>,
    max_size: Option<u32>,
    max_points: Option<u32>,
    #[serde(default)]
    categories: Vec<CategoryTag>,
}

fn default_size() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct BattalionUnitSource {
    unit: String,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct BattalionSource {
    id: Option<String>,
    name: String,
    description: Option<String>,
    #[serde(default)]
    units: Vec<BattalionUnitSource>,
    #[serde(default)]
    points: u32,
    #[serde(default)]
    factions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtraAbilitySource {
    id: Option<String>,
    ability: AbilityText,
    allegiance: String,
    category: AbilityCategory,
    sub_category: Option<String>,
    rule: Option<AvailabilityRule>,
}

impl CatalogSource {
    /// Parse a catalog document or fragment.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid catalog document")
    }

    /// Append the entries of another fragment; a later manifest wins.
    pub fn merge(&mut self, other: CatalogSource) {
        if other.metadata.is_some() {
            self.metadata = other.metadata;
        }
        self.models.extend(other.models);
        self.factions.extend(other.factions);
        self.allegiances.extend(other.allegiances);
        self.units.extend(other.units);
        self.battalions.extend(other.battalions);
        self.extra_abilities.extend(other.extra_abilities);
        self.army_options.extend(other.army_options);
    }

    /// Resolve string references into shared entities.
    ///
    /// Entries whose mandatory reference cannot be resolved are skipped with a warning.
    pub fn resolve(self) -> Result<Catalog> {
        let mut model_index = HashMap::new();
        let mut models = Vec::new();
        for source in self.models {
            let id = source.id.unwrap_or_else(|| to_camel_case(&source.name));
            let model = Arc::new(Model {
                id: id.clone(),
                name: source.name,
            });
            if insert_unique(&mut model_index, id, &model, "model") {
                models.push(model);
            }
        }
        models.sort_by(|a, b| a.name.cmp(&b.name));

        let mut faction_index = HashMap::new();
        let mut factions = Vec::new();
        for source in self.factions {
            let id = source.id.unwrap_or_else(|| to_camel_case(&source.name));
            let faction = Arc::new(Faction {
                id: id.clone(),
                grand_alliance: source.grand_alliance,
                name: source.name,
            });
            if insert_unique(&mut faction_index, id, &faction, "faction") {
                factions.push(faction);
            }
        }

        let mut allegiance_index = HashMap::new();
        let mut allegiances = Vec::new();
        for source in self.allegiances {
            let id = source.id.unwrap_or_else(|| to_camel_case(&source.name));
            let allegiance = Arc::new(Allegiance {
                id: id.clone(),
                grand_alliance: source.grand_alliance,
                name: source.name,
            });
            if insert_unique(&mut allegiance_index, id, &allegiance, "allegiance") {
                allegiances.push(allegiance);
            }
        }
        if allegiances.is_empty() {
            bail!("catalog declares no allegiances");
        }

        let mut unit_index = HashMap::new();
        let mut units = Vec::new();
        for source in self.units {
            let Some(model) = model_index.get(&source.model) else {
                warn!(
                    "Skipping unit {}: unknown model {}",
                    source.id.as_deref().unwrap_or(&source.model),
                    source.model
                );
                continue;
            };
            let id = source.id.unwrap_or_else(|| model.id.clone());
            let unit = Arc::new(Unit {
                factions: resolve_factions(&source.factions, &faction_index, &id),
                id: id.clone(),
                model: Arc::clone(model),
                size: source.size,
                points: source.points,
                sub_type: source.sub_type,
                weapon_options: source.weapon_options,
                max_size: source.max_size,
                max_points: source.max_points,
                categories: source.categories,
            });
            if insert_unique(&mut unit_index, id, &unit, "unit") {
                units.push(unit);
            }
        }
        units.sort_by(|a, b| a.model.name.cmp(&b.model.name));

        let mut battalions: Vec<Arc<Battalion>> = Vec::new();
        for source in self.battalions {
            let id = source.id.unwrap_or_else(|| to_camel_case(&source.name));
            if battalions.iter().any(|battalion| battalion.id == id) {
                warn!("Duplicate battalion id {id}; keeping the first entry");
                continue;
            }
            let mut required = Vec::with_capacity(source.units.len());
            for entry in source.units {
                match unit_index.get(&entry.unit) {
                    Some(unit) => required.push(BattalionUnit {
                        unit: Arc::clone(unit),
                        count: entry.count,
                    }),
                    None => warn!(
                        "Battalion {id}: dropping requirement on unknown unit {}",
                        entry.unit
                    ),
                }
            }
            battalions.push(Arc::new(Battalion {
                factions: resolve_factions(&source.factions, &faction_index, &id),
                id,
                name: source.name,
                description: source.description,
                units: required,
                points: source.points,
            }));
        }

        let mut ability_index = HashMap::new();
        let mut extra_abilities = Vec::new();
        for source in self.extra_abilities {
            let Some(allegiance) = allegiance_index.get(&source.allegiance) else {
                warn!(
                    "Skipping ability {}: unknown allegiance {}",
                    source.ability.name, source.allegiance
                );
                continue;
            };
            let id = source.id.unwrap_or_else(|| {
                to_camel_case(&format!("{}{}", allegiance.name, source.ability.name))
            });
            let ability = Arc::new(ExtraAbility {
                id: id.clone(),
                rule: source
                    .rule
                    .unwrap_or_else(|| AvailabilityRule::from(source.category)),
                ability: source.ability,
                allegiance: Arc::clone(allegiance),
                category: source.category,
                sub_category: source.sub_category,
            });
            if insert_unique(&mut ability_index, id, &ability, "extra ability") {
                extra_abilities.push(ability);
            }
        }

        Ok(Catalog {
            metadata: self.metadata.unwrap_or_default(),
            models,
            factions,
            allegiances,
            units,
            battalions,
            extra_abilities,
            army_options: self.army_options,
            unit_index,
            ability_index,
        })
    }
}

fn insert_unique<T>(
    index: &mut HashMap<String, Arc<T>>,
    id: String,
    value: &Arc<T>,
    kind: &str,
) -> bool {
    if index.contains_key(&id) {
        warn!("Duplicate {kind} id {id}; keeping the first entry");
        return false;
    }
    index.insert(id, Arc::clone(value));
    true
}

fn resolve_factions(
    ids: &[String],
    index: &HashMap<String, Arc<Faction>>,
    owner: &str,
) -> Vec<Arc<Faction>> {
    ids.iter()
        .filter_map(|id| {
            let faction = index.get(id).cloned();
            if faction.is_none() {
                warn!("{owner}: ignoring unknown faction {id}");
            }
            faction
        })
        .collect()
}

/// Derive a catalog id from a display name (`"Tempest's Eye"` → `"tempestSEye"`).
pub fn to_camel_case(name: &str) -> String {
    static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"[^A-Za-z0-9_]+([A-Za-z0-9_])").expect("invalid separator regex")
    });
    static NON_WORD_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("invalid non-word regex"));

    let joined = SEPARATOR_RE.replace_all(name, |caps: &Captures<'_>| caps[1].to_uppercase());
    let mut chars = joined.chars();
    let lowered: String = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    };
    NON_WORD_RE.replace(&lowered, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::UnitCategory;
    use tempfile::tempdir;

    const FIXTURE: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/catalog.json"
    ));

    #[test]
    fn camel_case_matches_generated_ids() {
        assert_eq!(to_camel_case("Stormcast Eternals"), "stormcastEternals");
        assert_eq!(to_camel_case("Tempest's Eye"), "tempestSEye");
        assert_eq!(to_camel_case("Orcs & Goblins"), "orcsGoblins");
        assert_eq!(to_camel_case("Lord-Celestant"), "lordCelestant");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn resolves_fixture_catalog() -> Result<()> {
        let catalog = Catalog::from_json_str(FIXTURE)?;

        assert_eq!(catalog.default_allegiance().id, "chaos");
        assert!(catalog.allegiance("stormcastEternals").is_some());
        assert_eq!(catalog.metadata().version.as_deref(), Some("GHB 2018"));

        let liberators = catalog.unit("liberators").expect("liberators");
        assert_eq!(liberators.model.name, "Liberators");
        assert_eq!(liberators.points, 100);
        assert_eq!(liberators.max_size, Some(30));
        assert_eq!(liberators.weapon_options.len(), 2);
        assert!(liberators.has_category(UnitCategory::Battleline));
        assert_eq!(liberators.factions[0].id, "STORMCASTETERNALS");

        let names: Vec<_> = catalog
            .units()
            .iter()
            .map(|unit| unit.model.name.as_str())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let lords = catalog.battalion("lordsOfTheStorm").expect("battalion");
        assert_eq!(lords.units.len(), 2);
        assert_eq!(lords.units[1].unit.id, "liberators");

        let trait_ = catalog
            .extra_ability("stormcastEternalsShieldedByFaith")
            .expect("ability");
        assert_eq!(trait_.rule, AvailabilityRule::CommandTrait);
        assert_eq!(trait_.allegiance.id, "stormcastEternals");

        let stormhost = catalog.army_options("stormcastEternals").expect("options");
        assert_eq!(stormhost.name, "Stormhost");
        assert!(catalog.army_options("khorne").is_none());
        Ok(())
    }

    #[test]
    fn skips_dangling_references() -> Result<()> {
        let catalog = Catalog::from_json_str(
            r#"{
                "models": [{"name": "Bloodreavers"}],
                "factions": [{"id": "KHORNE", "grandAlliance": "chaos", "name": "Khorne"}],
                "allegiances": [{"grandAlliance": "chaos", "name": "Khorne"}],
                "units": [
                    {"model": "bloodreavers", "points": 70, "factions": ["KHORNE", "GONE"]},
                    {"id": "orphan", "model": "missing", "points": 10}
                ],
                "battalions": [
                    {"name": "Gorechosen", "points": 120,
                     "units": [{"unit": "bloodreavers", "count": 2}, {"unit": "orphan", "count": 1}]}
                ],
                "extraAbilities": [
                    {"ability": {"name": "Arch-slaughterer"}, "allegiance": "khorne", "category": "command"},
                    {"ability": {"name": "Lost"}, "allegiance": "nowhere", "category": "artefact"}
                ]
            }"#,
        )?;

        let unit = catalog.unit("bloodreavers").expect("derived unit id");
        assert_eq!(unit.size, 1);
        assert_eq!(unit.factions.len(), 1);
        assert!(catalog.unit("orphan").is_none());

        let gorechosen = catalog.battalion("gorechosen").expect("derived battalion id");
        assert_eq!(gorechosen.units.len(), 1);

        assert_eq!(catalog.extra_abilities().len(), 1);
        assert!(catalog.extra_ability("khorneArchSlaughterer").is_some());
        Ok(())
    }

    #[test]
    fn rejects_catalog_without_allegiances() {
        let err = Catalog::from_json_str(r#"{"models": []}"#).unwrap_err();
        assert!(err.to_string().contains("no allegiances"));
    }

    #[test]
    fn merges_fragment_directory() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("01-allegiances.json"),
            r#"{"allegiances": [{"grandAlliance": "order", "name": "Order"}]}"#,
        )?;
        fs::create_dir_all(dir.path().join("units"))?;
        fs::write(
            dir.path().join("units/stormcast.json"),
            r#"{"models": [{"id": "judicators", "name": "Judicators"}],
                "units": [{"model": "judicators", "size": 5, "points": 160}]}"#,
        )?;
        fs::write(dir.path().join("notes.txt"), "not a catalog")?;
        fs::write(
            manifest::manifest_path(dir.path()),
            r#"{"version": "fragments"}"#,
        )?;

        let catalog = Catalog::from_path(dir.path())?;
        assert_eq!(catalog.default_allegiance().id, "order");
        assert_eq!(catalog.unit("judicators").map(|unit| unit.points), Some(160));
        assert_eq!(catalog.metadata().version.as_deref(), Some("fragments"));
        Ok(())
    }

    #[test]
    fn loader_caches_until_refresh() -> Result<()> {
        let dir = tempdir()?;
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        fs::write(&first, FIXTURE)?;
        fs::write(
            &second,
            r#"{"allegiances": [{"grandAlliance": "death", "name": "Death"}]}"#,
        )?;

        let loader = CatalogLoader::new(&first);
        let a = loader.catalog()?;
        let b = loader.catalog()?;
        assert!(Arc::ptr_eq(&a, &b));

        loader.refresh(&second);
        assert_eq!(loader.path(), second);
        let c = loader.catalog()?;
        assert_eq!(c.default_allegiance().id, "death");
        assert!(c.units().is_empty());
        Ok(())
    }
}
