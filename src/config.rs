//! Store configuration and the manifold context
//!
//! ```toml
//! [manifold]
//! name = "plant_a"
//!
//! [atoms]
//! hexadecimal_threshold = 10000000
//! hexadecimal_prefix = "#x"
//! space_character = "_"
//!
//! [integrity]
//! verify_on_read = true
//! ```

use crate::core::atom::{Atom, AtomFormat};
use crate::core::atom_path::AtomPathView;
use crate::core::cell::{Cell, CellId, TextFormat, WireCell};
use crate::error::{CellError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_MANIFOLD: &str = "local";

/// Characters that survive an atom format/parse round trip as spaces
const SPACE_CHARACTERS: [char; 3] = [' ', '-', '_'];

/// Whole configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub manifold: ManifoldSection,
    /// How atoms are written as text
    pub atoms: AtomFormat,
    pub integrity: IntegritySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifoldSection {
    /// Manifold identity, a non-empty atom
    #[serde(serialize_with = "serialize_atom", deserialize_with = "deserialize_atom")]
    pub name: Atom,
}

impl Default for ManifoldSection {
    fn default() -> Self {
        ManifoldSection {
            name: Atom::parse(DEFAULT_MANIFOLD).unwrap_or(Atom::EMPTY),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegritySection {
    /// Verify cell checksums when copying cells out
    pub verify_on_read: bool,
}

impl Default for IntegritySection {
    fn default() -> Self {
        IntegritySection { verify_on_read: true }
    }
}

impl StoreConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), manifold = %config.manifold.name, "loaded store configuration");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CellError::Config(e.to_string()))
    }

    /// Checks:
    /// - manifold name is not empty
    /// - space character is one of ` `, `-`, `_`
    /// - hexadecimal prefix is non-empty ASCII punctuation or letters, not a digit
    /// - enclosure characters are not alphanumeric
    pub fn validate(&self) -> Result<()> {
        if self.manifold.name.is_empty() {
            return Err(CellError::Config("manifold name must not be empty".to_string()));
        }

        let atoms = &self.atoms;
        if !SPACE_CHARACTERS.contains(&atoms.space_character) {
            return Err(CellError::Config(format!(
                "space character {:?} does not round-trip, use one of ' ', '-', '_'",
                atoms.space_character
            )));
        }

        let prefix = &atoms.hexadecimal_prefix;
        if prefix.is_empty()
            || !prefix.is_ascii()
            || prefix.starts_with(|c: char| c.is_ascii_digit())
        {
            return Err(CellError::Config(format!(
                "invalid hexadecimal prefix {:?}",
                prefix
            )));
        }

        for enclosure in [atoms.string_enclosure, atoms.string_enclosure_end]
            .into_iter()
            .flatten()
        {
            if enclosure.is_alphanumeric() {
                return Err(CellError::Config(format!(
                    "enclosure character {:?} collides with atom text",
                    enclosure
                )));
            }
        }

        Ok(())
    }

    pub fn manifold(&self) -> Result<Manifold> {
        Manifold::from_config(self)
    }
}

fn serialize_atom<S>(atom: &Atom, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&atom.format())
}

fn deserialize_atom<'de, D>(deserializer: D) -> std::result::Result<Atom, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Atom::parse(&s).map_err(serde::de::Error::custom)
}

/// Identity and policies of one cell store
///
/// Passed explicitly to the copy-out and copy-in helpers.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    name: Atom,
    atom_format: AtomFormat,
    verify_on_read: bool,
}

impl Manifold {
    /// Manifold with default formatting that verifies on read
    pub fn new(name: Atom) -> Self {
        Manifold {
            name,
            atom_format: AtomFormat::default(),
            verify_on_read: true,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Manifold {
            name: config.manifold.name,
            atom_format: config.atoms.clone(),
            verify_on_read: config.integrity.verify_on_read,
        })
    }

    pub fn name(&self) -> Atom {
        self.name
    }

    pub fn atom_format(&self) -> &AtomFormat {
        &self.atom_format
    }

    pub fn verify_on_read(&self) -> bool {
        self.verify_on_read
    }

    /// Text format carrying this manifold's atom options
    pub fn text_format(&self) -> TextFormat {
        TextFormat {
            atoms: self.atom_format.clone(),
            ..TextFormat::default()
        }
    }

    pub fn format_path(&self, path: &[Atom]) -> String {
        AtomPathView::from(path).format_with(&self.atom_format)
    }

    /// Copy a cell out for transport
    ///
    /// With `verify_on_read`, a damaged cell is marked invalid and the
    /// copy is refused.
    pub fn read(&self, cell: &Cell, id: CellId) -> Result<WireCell> {
        if self.verify_on_read && !cell.check_integrity() {
            tracing::warn!(manifold = %self.name, cell = %id, "refusing to copy out damaged cell");
            return Err(CellError::ChecksumMismatch);
        }
        Ok(cell.snapshot(id))
    }

    /// Copy a transported cell in, rejecting copies that fail their checksum
    pub fn write(&self, cell: &Cell, wire: &WireCell) -> Result<()> {
        if !wire.verify_checksum() {
            tracing::warn!(manifold = %self.name, cell = %wire.id(), "rejecting damaged wire cell");
            return Err(CellError::ChecksumMismatch);
        }
        cell.load(wire);
        tracing::debug!(manifold = %self.name, cell = %wire.id(), "cell copied in");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cell::Information;

    #[test]
    fn test_defaults() -> Result<()> {
        let config = StoreConfig::from_toml_str("")?;
        assert_eq!(config.manifold.name, Atom::parse("local")?);
        assert_eq!(config.atoms, AtomFormat::default());
        assert!(config.integrity.verify_on_read);
        Ok(())
    }

    #[test]
    fn test_parse_sections() -> Result<()> {
        let config = StoreConfig::from_toml_str(
            r##"
            [manifold]
            name = "plant_a"

            [atoms]
            hexadecimal_threshold = 0
            hexadecimal_prefix = "#"
            space_character = "-"

            [integrity]
            verify_on_read = false
            "##,
        )?;
        assert_eq!(config.manifold.name, Atom::parse("plant a")?);
        assert_eq!(config.atoms.hexadecimal_threshold, 0);
        assert_eq!(config.atoms.hexadecimal_prefix, "#");
        assert_eq!(config.atoms.space_character, '-');
        assert!(!config.integrity.verify_on_read);
        Ok(())
    }

    #[test]
    fn test_validation_errors() {
        let bad_space = "[atoms]\nspace_character = \"*\"";
        assert!(matches!(StoreConfig::from_toml_str(bad_space), Err(CellError::Config(_))));

        let bad_prefix = "[atoms]\nhexadecimal_prefix = \"0x\"";
        assert!(matches!(StoreConfig::from_toml_str(bad_prefix), Err(CellError::Config(_))));

        let bad_name = "[manifold]\nname = \"not an atom because it is far too long\"";
        assert!(matches!(StoreConfig::from_toml_str(bad_name), Err(CellError::ConfigParse(_))));

        let bad_toml = "[manifold";
        assert!(matches!(StoreConfig::from_toml_str(bad_toml), Err(CellError::ConfigParse(_))));
    }

    #[test]
    fn test_toml_round_trip() -> Result<()> {
        let config = StoreConfig::default();
        let text = config.to_toml_string()?;
        assert_eq!(StoreConfig::from_toml_str(&text)?, config);
        Ok(())
    }

    #[test]
    fn test_manifold_copy_out_and_in() -> Result<()> {
        let manifold = StoreConfig::default().manifold()?;
        let source = Cell::with_information(&Information::from_value(12.5f64)?);
        let wire = manifold.read(&source, CellId::new(1, 4))?;
        assert_eq!(wire.id(), CellId::new(1, 4));

        let target = Cell::new();
        manifold.write(&target, &wire)?;
        assert_eq!(target.get::<f64>(0), Ok(12.5));

        let mut damaged = wire;
        damaged.0[40] ^= 0x10;
        assert!(matches!(manifold.write(&target, &damaged), Err(CellError::ChecksumMismatch)));
        Ok(())
    }

    #[test]
    fn test_manifold_refuses_damaged_cell() -> Result<()> {
        let manifold = Manifold::new(Atom::parse("plant")?);
        let cell = Cell::with_information(&Information::from_value(1u8)?);
        cell.acquire().set_base(CellId::new(1, 1));
        assert!(matches!(manifold.read(&cell, CellId::new(1, 2)), Err(CellError::ChecksumMismatch)));
        assert!(cell.specs().flags.invalid());
        Ok(())
    }

    #[test]
    fn test_format_path_uses_manifold_options() -> Result<()> {
        let config = StoreConfig::from_toml_str("[atoms]\nspace_character = \"-\"")?;
        let manifold = config.manifold()?;
        let path = [Atom::parse("pump one")?, Atom::EMPTY];
        assert_eq!(manifold.format_path(&path), "pump-one/..");
        Ok(())
    }
}
