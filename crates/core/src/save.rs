//! Roster persistence against a durable key-value store.

use std::{
    collections::HashMap,
    fs, io,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    catalog::{Catalog, GrandAlliance},
    roster::{Roster, DEFAULT_ROSTER_NAME},
};

/// Root directory under the user's data directory used for stored rosters.
pub const DEFAULT_STORE_DIR: &str = "warscroll";
/// Key of the default slot.
pub const DEFAULT_SLOT_KEY: &str = "warscroll";
/// Key holding the ordered list of named slots.
pub const SLOT_LIST_KEY: &str = "warscrolls";

/// Failures talking to the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading a key failed.
    #[error("failed to read {key}: {source}")]
    Read {
        /// Key being read.
        key: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Writing or removing a key failed.
    #[error("failed to write {key}: {source}")]
    Write {
        /// Key being written.
        key: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A stored value is not valid JSON of the expected shape.
    #[error("failed to parse {key}: {source}")]
    Parse {
        /// Key holding the value.
        key: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A record could not be serialized.
    #[error("failed to encode roster record: {0}")]
    Encode(#[from] serde_json::Error),
    /// Named slots need a non-blank name.
    #[error("slot name {0:?} is blank")]
    BlankSlotName(String),
}

/// Storage key of a slot: the default key, or `warscroll/<name>`.
pub fn slot_key(slot: Option<&str>) -> String {
    match slot {
        Some(name) if !name.is_empty() => format!("{DEFAULT_SLOT_KEY}/{name}"),
        _ => DEFAULT_SLOT_KEY.to_string(),
    }
}

/// Synchronous text store addressed by string keys.
pub trait KeyValueStore {
    /// Text stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Replace the text stored under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Forget `key`; removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-process store, used by tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key below a root directory.
///
/// `/` in a key maps to a sub directory; other unsafe characters are percent-encoded.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_STORE_DIR)
    }

    /// Directory the store writes below.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        let mut segments = key.split('/').peekable();
        while let Some(segment) = segments.next() {
            let component = encode_component(segment);
            if segments.peek().is_some() {
                path.push(component);
            } else {
                path.push(format!("{component}.json"));
            }
        }
        path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let write_err = |source: io::Error| StoreError::Write {
            key: key.to_string(),
            source,
        };
        let parent = path.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(parent).map_err(write_err)?;

        let mut file = NamedTempFile::new_in(parent).map_err(write_err)?;
        file.write_all(value.as_bytes()).map_err(write_err)?;
        file.persist(&path).map_err(|err| write_err(err.error))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                key: key.to_string(),
                source,
            }),
        }
    }
}

fn encode_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            result.push(char::from(byte));
        } else {
            result.push_str(&format!("%{byte:02X}"));
        }
    }
    if result.is_empty() {
        "_".to_string()
    } else {
        result
    }
}

/// Persisted form of a roster. Catalog entities are referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedRoster {
    /// Roster name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Units in roster order.
    #[serde(default)]
    pub units: Vec<SerializedUnit>,
    /// Battalions in roster order.
    #[serde(default)]
    pub battalions: Vec<SerializedBattalion>,
    /// Grand alliance ordinal.
    #[serde(default = "default_grand_alliance")]
    pub grand_alliance: u8,
    /// Allegiance id.
    #[serde(default)]
    pub allegiance: String,
    /// Army option value.
    #[serde(default)]
    pub army_option: String,
}

fn default_name() -> String {
    DEFAULT_ROSTER_NAME.to_string()
}

fn default_grand_alliance() -> u8 {
    GrandAlliance::default().ordinal()
}

/// Persisted roster unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedUnit {
    /// Catalog unit id.
    pub unit_id: String,
    /// Block count.
    pub count: u32,
    /// Set on the general's record.
    #[serde(default)]
    pub is_general: bool,
    /// One entry per option group; `null` entries are skipped on restore.
    #[serde(default)]
    pub weapon_options: Vec<Option<SerializedWeaponOption>>,
    /// Catalog ability ids.
    #[serde(default)]
    pub extra_abilities: Vec<String>,
}

/// Persisted weapon option selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedWeaponOption {
    /// Option id within the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    /// Models carrying the option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// Persisted roster battalion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedBattalion {
    /// Catalog battalion id.
    pub battalion_id: String,
}

impl SerializedRoster {
    /// Capture the roster's persistent state.
    pub fn capture(roster: &Roster) -> Self {
        Self {
            name: roster.name.clone(),
            units: roster
                .units()
                .iter()
                .map(|unit| SerializedUnit {
                    unit_id: unit.unit.id.clone(),
                    count: unit.count,
                    is_general: roster.is_general(unit.id),
                    weapon_options: unit
                        .weapon_options
                        .iter()
                        .map(|selection| {
                            Some(SerializedWeaponOption {
                                option: selection
                                    .weapon_option
                                    .as_ref()
                                    .map(|option| option.id.clone()),
                                count: selection.count,
                            })
                        })
                        .collect(),
                    extra_abilities: unit
                        .extra_abilities
                        .iter()
                        .map(|ability| ability.id.clone())
                        .collect(),
                })
                .collect(),
            battalions: roster
                .battalions()
                .iter()
                .map(|entry| SerializedBattalion {
                    battalion_id: entry.battalion.id.clone(),
                })
                .collect(),
            grand_alliance: roster.grand_alliance.ordinal(),
            allegiance: roster.allegiance.id.clone(),
            army_option: roster.army_option.clone(),
        }
    }

    /// Repopulate `roster` in place from this record.
    ///
    /// References missing from the catalog are skipped; the serial keeps counting so
    /// restored entities get fresh ids.
    pub fn restore_into(self, roster: &mut Roster, catalog: &Catalog) {
        roster.clear();
        roster.name = self.name;
        roster.grand_alliance = GrandAlliance::from_ordinal(self.grand_alliance)
            .unwrap_or_else(|| {
                warn!(
                    "Unknown grand alliance ordinal {}; using {}",
                    self.grand_alliance,
                    GrandAlliance::default()
                );
                GrandAlliance::default()
            });
        roster.allegiance = match catalog.allegiance(&self.allegiance) {
            Some(allegiance) => Arc::clone(allegiance),
            None => {
                warn!(
                    "Unknown allegiance {:?}; falling back to {}",
                    self.allegiance,
                    catalog.default_allegiance().id
                );
                Arc::clone(catalog.default_allegiance())
            }
        };
        roster.army_option = self.army_option;

        let mut general = None;
        for saved in self.units {
            let Some(unit) = catalog.unit(&saved.unit_id) else {
                warn!("Skipping unit {}: not in catalog", saved.unit_id);
                continue;
            };
            let mut entry = roster.new_unit(Arc::clone(unit));
            entry.count = saved.count;
            if saved.is_general {
                general = Some(entry.id);
            }

            for (slot, selection) in saved.weapon_options.into_iter().enumerate() {
                let Some(selection) = selection else {
                    continue;
                };
                let (Some(group), Some(target)) =
                    (unit.weapon_options.get(slot), entry.weapon_options.get_mut(slot))
                else {
                    debug!("Unit {}: ignoring weapon slot {slot}", unit.id);
                    continue;
                };
                target.weapon_option = selection
                    .option
                    .as_deref()
                    .and_then(|id| group.option(id))
                    .cloned();
                target.count = selection.count;
            }

            for ability_id in saved.extra_abilities {
                match catalog.extra_ability(&ability_id) {
                    Some(ability) => entry.extra_abilities.push(Arc::clone(ability)),
                    None => warn!("Unit {}: skipping unknown ability {ability_id}", unit.id),
                }
            }
            roster.push_unit(entry);
        }
        roster.set_general(general);

        for saved in self.battalions {
            match catalog.battalion(&saved.battalion_id) {
                Some(battalion) => {
                    roster.add_battalion(Arc::clone(battalion));
                }
                None => warn!("Skipping battalion {}: not in catalog", saved.battalion_id),
            }
        }
    }
}

/// Reads and writes roster slots and the slot list.
#[derive(Debug)]
pub struct SaveManager<S> {
    storage: S,
}

impl<S: KeyValueStore> SaveManager<S> {
    /// Wrap a key-value store.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Underlying store.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Serialize the roster into `slot` (default slot when `None`).
    pub fn save(&mut self, roster: &Roster, slot: Option<&str>) -> Result<(), StoreError> {
        let key = slot_key(slot);
        let serialised = serde_json::to_string(&SerializedRoster::capture(roster))?;
        self.storage.set(&key, &serialised)?;
        debug!(key = %key, units = roster.units().len(), "saved roster");
        Ok(())
    }

    /// Parsed record stored in `slot`, if any.
    pub fn read_record(&self, slot: Option<&str>) -> Result<Option<SerializedRoster>, StoreError> {
        let key = slot_key(slot);
        let Some(content) = self.storage.get(&key)? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&content)
            .map_err(|source| StoreError::Parse { key, source })?;
        Ok(Some(record))
    }

    /// Restore `slot` into `roster`. Returns `false`, leaving the roster untouched,
    /// when the slot is empty.
    pub fn load(
        &self,
        roster: &mut Roster,
        catalog: &Catalog,
        slot: Option<&str>,
    ) -> Result<bool, StoreError> {
        let Some(record) = self.read_record(slot)? else {
            return Ok(false);
        };
        record.restore_into(roster, catalog);
        info!(
            key = %slot_key(slot),
            units = roster.units().len(),
            battalions = roster.battalions().len(),
            "loaded roster"
        );
        Ok(true)
    }

    /// Known named slots in their stored order.
    pub fn slots(&self) -> Result<Vec<String>, StoreError> {
        let Some(content) = self.storage.get(SLOT_LIST_KEY)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            key: SLOT_LIST_KEY.to_string(),
            source,
        })
    }

    /// Replace the stored slot list.
    pub fn write_slots(&mut self, names: &[String]) -> Result<(), StoreError> {
        let serialised = serde_json::to_string(names)?;
        self.storage.set(SLOT_LIST_KEY, &serialised)
    }

    /// Delete the record of a named slot.
    pub fn delete(&mut self, slot: &str) -> Result<(), StoreError> {
        self.storage.remove(&slot_key(Some(slot)))
    }
}
