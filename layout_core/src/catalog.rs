use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Dimensions;

/// Name expected in the `registry` field of building type registry files.
pub const REGISTRY_NAME: &str = "building_types";

/// Registry of the types used by the built-in templates.
pub const SAMPLE_REGISTRY: &str = include_str!("../assets/building_types.reg.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid registry file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid building type list: {0}")]
    Json(#[from] serde_json::Error),
    #[error("registry file is for [{found}], expected [{expected}]")]
    WrongRegistry {
        expected: &'static str,
        found: String,
    },
    #[error("building type [{key}] must be at least 1x1, found {w}x{h}")]
    InvalidDimensions { key: String, w: u32, h: u32 },
    #[error("building types [{existing}] and [{key}] share code {code}")]
    CodeCollision {
        code: u8,
        existing: String,
        key: String,
    },
}

/// An immutable catalog record. Buildings share these through [`Arc`].
#[derive(Clone, CopyGetters, Debug, Deserialize, Eq, Getters, PartialEq, Serialize)]
pub struct BuildingType {
    /// Registry key, e.g. `farm`. Filled in from the registry table name.
    #[serde(skip)]
    #[getset(get = "pub")]
    key: String,
    /// Numeric id used in layout codes.
    #[getset(get_copy = "pub")]
    code: u8,
    #[getset(get = "pub")]
    name: String,
    #[serde(default = "default_colour")]
    #[getset(get = "pub")]
    colour: String,
    #[serde(default)]
    #[getset(get = "pub")]
    icon: String,
    #[getset(get_copy = "pub")]
    w: u32,
    #[getset(get_copy = "pub")]
    h: u32,
    /// Roads may be exempted from the overlap rule.
    #[serde(default)]
    #[getset(get_copy = "pub")]
    road: bool,
}

fn default_colour() -> String {
    String::from("#ffffff")
}

impl BuildingType {
    pub fn new<K: Into<String>, N: Into<String>>(key: K, code: u8, name: N, w: u32, h: u32) -> Self {
        BuildingType {
            key: key.into(),
            code,
            name: name.into(),
            colour: default_colour(),
            icon: String::new(),
            w,
            h,
            road: false,
        }
    }

    pub fn with_road(mut self, road: bool) -> Self {
        self.road = road;
        self
    }

    pub fn with_colour<C: Into<String>>(mut self, colour: C) -> Self {
        self.colour = colour.into();
        self
    }

    pub fn with_icon<I: Into<String>>(mut self, icon: I) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.w, self.h)
    }
}

#[derive(Deserialize, Serialize)]
struct RegistryTomlFile {
    #[serde(default)]
    priority: i32,
    registry: String,
    #[serde(default)]
    values: HashMap<String, toml::Value>,
}

/// One entry of the generated `building-types.json` list, where the numeric
/// id is the only key.
#[derive(Deserialize)]
struct JsonTypeEntry {
    id: u8,
    name: String,
    #[serde(default = "default_colour")]
    colour: String,
    #[serde(default)]
    icon: String,
    w: u32,
    h: u32,
}

/// Building types by registry key and by code.
///
/// Entries can be overridden by later registry files of the same or higher
/// priority.
#[derive(Clone, Debug, Default)]
pub struct TypeCatalog {
    values: HashMap<String, (i32, Arc<BuildingType>)>,
    codes: HashMap<u8, String>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        TypeCatalog::default()
    }

    /// Catalog of the sample registry shipped with the crate.
    pub fn sample() -> Result<Self, CatalogError> {
        let mut catalog = TypeCatalog::new();
        catalog.load_registry_str(SAMPLE_REGISTRY)?;
        Ok(catalog)
    }

    /// Imports the JSON list format, keying each type by its numeric id.
    pub fn from_json_list(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<JsonTypeEntry> = serde_json::from_str(json)?;
        let mut catalog = TypeCatalog::new();
        for entry in entries {
            let building_type = BuildingType::new(entry.id.to_string(), entry.id, entry.name, entry.w, entry.h)
                .with_colour(entry.colour)
                .with_icon(entry.icon);
            catalog.insert(building_type)?;
        }
        Ok(catalog)
    }

    /// Adds a type at priority 0.
    pub fn insert(&mut self, building_type: BuildingType) -> Result<(), CatalogError> {
        self.add(0, building_type)
    }

    /// Loads the `[values.*]` tables of a registry TOML file. Returns how many
    /// entries were read.
    ///
    /// Entries apply in key order. If any entry is rejected the catalog is
    /// left as it was.
    pub fn load_registry_str(&mut self, source: &str) -> Result<usize, CatalogError> {
        let registry_file = toml::from_str::<RegistryTomlFile>(source)?;
        if registry_file.registry != REGISTRY_NAME {
            return Err(CatalogError::WrongRegistry {
                expected: REGISTRY_NAME,
                found: registry_file.registry,
            });
        }
        let priority = registry_file.priority;
        let mut building_types = registry_file
            .values
            .into_iter()
            .map(|(key, value)| {
                let mut building_type: BuildingType = value.try_into()?;
                building_type.key = key;
                Ok(building_type)
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;
        building_types.sort_by(|a, b| a.key.cmp(&b.key));
        let count = building_types.len();
        let mut staged = self.clone();
        for building_type in building_types {
            staged.add(priority, building_type)?;
        }
        *self = staged;
        Ok(count)
    }

    pub fn load_registry_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, CatalogError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading building types from {:?}", path);
        self.load_registry_str(&source)
    }

    fn add(&mut self, priority: i32, building_type: BuildingType) -> Result<(), CatalogError> {
        let key = building_type.key().clone();
        if building_type.w == 0 || building_type.h == 0 {
            return Err(CatalogError::InvalidDimensions {
                key,
                w: building_type.w,
                h: building_type.h,
            });
        }
        if let Some(existing) = self.codes.get(&building_type.code) {
            if *existing != key {
                return Err(CatalogError::CodeCollision {
                    code: building_type.code,
                    existing: existing.clone(),
                    key,
                });
            }
        }
        if let Some((current_priority, current)) = self.values.get(&key) {
            if priority < *current_priority {
                log::trace!(
                    "Registry [{}] kept key [{}] over a lower priority entry",
                    REGISTRY_NAME,
                    key
                );
                return Ok(());
            }
            let old_code = current.code;
            self.codes.remove(&old_code);
        }
        self.codes.insert(building_type.code, key.clone());
        log::trace!("Registry [{}] loaded key [{}]", REGISTRY_NAME, key);
        self.values.insert(key, (priority, Arc::new(building_type)));
        Ok(())
    }

    pub fn by_key(&self, key: &str) -> Option<&Arc<BuildingType>> {
        self.values.get(key).map(|(_, value)| value)
    }

    pub fn by_code(&self, code: u8) -> Option<&Arc<BuildingType>> {
        self.codes.get(&code).and_then(|key| self.by_key(key))
    }

    /// The first road type, by code.
    pub fn road(&self) -> Option<&Arc<BuildingType>> {
        self.iter().into_iter().find(|building_type| building_type.road())
    }

    /// All types, ordered by code.
    pub fn iter(&self) -> Vec<&Arc<BuildingType>> {
        let mut types: Vec<_> = self.values.values().map(|(_, value)| value).collect();
        types.sort_by_key(|building_type| building_type.code);
        types
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
