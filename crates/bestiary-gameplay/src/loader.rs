//! Loading authored definitions.
//!
//! This module provides:
//! - [`DefinitionSet`]: weapons, hunter tuning, monsters and quests from one document
//! - TOML or RON parsing, chosen by file extension
//! - Schema version check and validation on load
//! - Lookup by name

use std::fs;
use std::path::Path;

use ahash::AHashSet;
use bestiary_common::{BestiaryError, BestiaryResult, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::definitions::{HunterDefinition, MonsterDefinition, QuestDefinition, WeaponDefinition};

/// Document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl DefinitionFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> BestiaryResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("ron") => Ok(Self::Ron),
            _ => Err(BestiaryError::Parse {
                path: path.display().to_string(),
                message: String::from("unsupported extension, expected .toml or .ron"),
            }),
        }
    }
}

/// All authored data for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionSet {
    /// Schema of the document.
    pub schema_version: SchemaVersion,
    /// Hunter tuning; built-in values when absent.
    pub hunter: Option<HunterDefinition>,
    /// Available weapons.
    pub weapons: Vec<WeaponDefinition>,
    /// Monster species.
    pub monsters: Vec<MonsterDefinition>,
    /// Quests.
    pub quests: Vec<QuestDefinition>,
}

impl DefinitionSet {
    /// Loads and validates a document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> BestiaryResult<Self> {
        let path = path.as_ref();
        let format = DefinitionFormat::from_path(path)?;
        let text = fs::read_to_string(path)?;
        let set = Self::parse(&text, format, &path.display().to_string())?;
        info!(
            "loaded {} weapon(s), {} monster(s), {} quest(s) from {}",
            set.weapons.len(),
            set.monsters.len(),
            set.quests.len(),
            path.display()
        );
        Ok(set)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> BestiaryResult<Self> {
        Self::parse(text, DefinitionFormat::Toml, "<toml>")
    }

    /// Parses and validates a RON document.
    pub fn from_ron_str(text: &str) -> BestiaryResult<Self> {
        Self::parse(text, DefinitionFormat::Ron, "<ron>")
    }

    fn parse(text: &str, format: DefinitionFormat, origin: &str) -> BestiaryResult<Self> {
        let parse_error = |message: String| BestiaryError::Parse {
            path: origin.to_string(),
            message,
        };
        let set: Self = match format {
            DefinitionFormat::Toml => toml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
            DefinitionFormat::Ron => ron::from_str(text).map_err(|e| parse_error(e.to_string()))?,
        };
        SchemaVersion::DEFINITIONS.ensure_readable(&set.schema_version)?;
        set.validate()?;
        debug!("definitions from {} validated", origin);
        Ok(set)
    }

    /// Checks every definition and rejects duplicate names.
    pub fn validate(&self) -> BestiaryResult<()> {
        if let Some(hunter) = &self.hunter {
            hunter.validate()?;
        }
        for weapon in &self.weapons {
            weapon.validate()?;
        }
        for monster in &self.monsters {
            monster.validate()?;
        }
        for quest in &self.quests {
            quest.validate()?;
        }
        ensure_unique("weapon", self.weapons.iter().map(|w| w.name.as_str()))?;
        ensure_unique("monster", self.monsters.iter().map(|m| m.name.as_str()))?;
        ensure_unique("quest", self.quests.iter().map(|q| q.name.as_str()))
    }

    /// Serializes to pretty TOML.
    pub fn to_toml_string(&self) -> BestiaryResult<String> {
        toml::to_string_pretty(self).map_err(|e| BestiaryError::Parse {
            path: String::from("<toml>"),
            message: e.to_string(),
        })
    }

    /// Weapon by name.
    #[must_use]
    pub fn weapon(&self, name: &str) -> Option<&WeaponDefinition> {
        self.weapons.iter().find(|weapon| weapon.name == name)
    }

    /// Monster by name.
    #[must_use]
    pub fn monster(&self, name: &str) -> Option<&MonsterDefinition> {
        self.monsters.iter().find(|monster| monster.name == name)
    }

    /// Quest by name.
    #[must_use]
    pub fn quest(&self, name: &str) -> Option<&QuestDefinition> {
        self.quests.iter().find(|quest| quest.name == name)
    }
}

fn ensure_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> BestiaryResult<()> {
    let mut seen = AHashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(BestiaryError::InvalidDefinition(format!(
                "duplicate {kind} name '{name}'"
            )));
        }
    }
    Ok(())
}
