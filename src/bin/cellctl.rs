//! Cell store diagnostics
//!
//! Inspects atoms, atom paths and wire cells from the command line.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use scada_cells::{Atom, AtomFormat, AtomPath, StoreConfig, WireCell};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cellctl")]
#[command(about = "Diagnostics for atoms, atom paths and wire cells")]
struct Args {
    /// Store configuration (TOML), supplies atom formatting options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode one atom and show its raw word and character breakdown
    Atom { text: String },
    /// Parse a `/`-separated atom path
    Path { text: String },
    /// Decode a 64-byte wire cell given as 128 hex digits
    Wire { hex: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let format = match &args.config {
        Some(path) => {
            let config = StoreConfig::load(path)
                .with_context(|| format!("loading configuration {}", path.display()))?;
            info!(manifold = %config.manifold.name, "configuration loaded");
            config.atoms
        }
        None => AtomFormat::default(),
    };

    match &args.command {
        Command::Atom { text } => show_atom(text, &format, args.json),
        Command::Path { text } => show_path(text, &format, args.json),
        Command::Wire { hex } => show_wire(hex, args.json),
    }
}

fn show_atom(text: &str, format: &AtomFormat, json: bool) -> anyhow::Result<()> {
    let atom = Atom::parse(text).with_context(|| format!("parsing atom {:?}", text))?;
    let characters: Vec<serde_json::Value> = atom
        .decompose_with(format)
        .map(|d| {
            d.characters()
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "character": c.character.to_string(),
                        "value": c.value,
                        "wide": c.wide,
                        "trail": c.trail,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if json {
        let value = serde_json::json!({
            "raw": format!("{:#018x}", atom.raw()),
            "numeric": atom.numeric(),
            "text": atom.format_with(format),
            "characters": characters,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("raw      {:#018x}", atom.raw());
    println!("text     {}", atom.format_with(format));
    match (atom.numeric(), atom.decompose_with(format)) {
        (Some(number), _) => println!("numeric  {}", number),
        (None, Some(decomposition)) => {
            for c in decomposition.characters() {
                let kind = match (c.wide, c.trail) {
                    (_, true) => "trail",
                    (true, false) => "wide",
                    (false, false) => "narrow",
                };
                println!("  {:?}  {:2}  {}", c.character, c.value, kind);
            }
        }
        (None, None) => {}
    }
    Ok(())
}

fn show_path(text: &str, format: &AtomFormat, json: bool) -> anyhow::Result<()> {
    let path = AtomPath::parse(text).with_context(|| format!("parsing path {:?}", text))?;

    if json {
        let atoms: Vec<serde_json::Value> = path
            .as_slice()
            .iter()
            .map(|atom| {
                serde_json::json!({
                    "raw": format!("{:#018x}", atom.raw()),
                    "text": atom.format_with(format),
                })
            })
            .collect();
        let value = serde_json::json!({
            "path": path.format_with(format),
            "depth": path.len(),
            "atoms": atoms,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("path   {}", path.format_with(format));
    println!("depth  {}", path.len());
    for atom in path.as_slice() {
        println!("  {:#018x}  {}", atom.raw(), atom.format_with(format));
    }
    Ok(())
}

fn show_wire(hex: &str, json: bool) -> anyhow::Result<()> {
    let bytes = decode_hex(hex)?;
    let Some(wire) = WireCell::from_slice(&bytes) else {
        bail!("wire cell needs 64 bytes, got {}", bytes.len());
    };
    let valid = wire.verify_checksum();
    if !valid {
        tracing::warn!(cell = %wire.id(), "wire cell checksum mismatch");
    }

    if json {
        let value = serde_json::json!({
            "id": wire.id().to_string(),
            "checksum": format!("{:#06x}", wire.checksum()),
            "checksum_valid": valid,
            "timestamp": wire.timestamp().to_string(),
            "base": wire.base().to_string(),
            "expression_id": wire.expression_id().to_string(),
            "value": format!("{}", wire.information()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", wire);
    println!("checksum {:#06x} {}", wire.checksum(), if valid { "ok" } else { "MISMATCH" });
    Ok(())
}

fn decode_hex(text: &str) -> anyhow::Result<Vec<u8>> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':')
        .collect();
    hex::decode(&digits).with_context(|| format!("invalid hex input {:?}", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_skips_separators() {
        assert_eq!(decode_hex("0a:FF 10\n").unwrap(), vec![0x0A, 0xFF, 0x10]);
        assert!(decode_hex("abc").is_err());
        assert!(decode_hex("zz").is_err());
    }

    #[test]
    fn test_wire_cell_from_hex() {
        let cell = scada_cells::Cell::with_information(&scada_cells::Information::from_value(7u8).unwrap());
        let wire = cell.snapshot(scada_cells::CellId::new(1, 2));
        let text = hex::encode(wire.0);
        let bytes = decode_hex(&text).unwrap();
        let decoded = WireCell::from_slice(&bytes).unwrap();
        assert!(decoded.verify_checksum());
        assert_eq!(decoded.id(), scada_cells::CellId::new(1, 2));
    }
}
