//! Store configuration files and manifold transport

use scada_cells::{Atom, Cell, CellError, CellId, Information, Manifold, StoreConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r##"
        [manifold]
        name = "plant_b"

        [atoms]
        hexadecimal_threshold = 256
        hexadecimal_prefix = "#"
        string_enclosure = "'"
        "##,
    );

    let config = StoreConfig::load(file.path()).unwrap();
    assert_eq!(config.manifold.name, Atom::parse("plant b").unwrap());
    assert!(config.integrity.verify_on_read);

    let manifold = config.manifold().unwrap();
    let path = [Atom::parse("pump").unwrap(), Atom::from_number(300).unwrap()];
    assert_eq!(manifold.format_path(&path), "'pump'/#12C");

    let text = Information::from_value(Atom::parse("valve").unwrap())
        .unwrap()
        .to_string(0, Some(&manifold.text_format()))
        .unwrap();
    assert_eq!(text, "'valve'");
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = StoreConfig::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(CellError::Io(_))));
}

#[test]
fn test_invalid_file_is_rejected() {
    let file = write_config("[atoms]\nstring_enclosure = \"x\"\n");
    assert!(matches!(StoreConfig::load(file.path()), Err(CellError::Config(_))));

    let file = write_config("[integrity]\nverify_on_read = \"sometimes\"\n");
    assert!(matches!(StoreConfig::load(file.path()), Err(CellError::ConfigParse(_))));
}

#[test]
fn test_saved_config_loads_back() {
    let config = StoreConfig::from_toml_str("[manifold]\nname = \"north\"\n[integrity]\nverify_on_read = false").unwrap();
    let file = write_config(&config.to_toml_string().unwrap());
    assert_eq!(StoreConfig::load(file.path()).unwrap(), config);
}

#[test]
fn test_transport_between_manifolds() {
    let source = Manifold::new(Atom::parse("north").unwrap());
    let target = StoreConfig::default().manifold().unwrap();

    let cell = Cell::with_information(&Information::from_value("open").unwrap());
    let wire = source.read(&cell, CellId::new(5, 12)).unwrap();

    let copy = Cell::new();
    target.write(&copy, &wire).unwrap();
    assert_eq!(copy.get::<String>(0).as_deref(), Ok("open"));
    assert_eq!(copy.update_time(), cell.update_time());
    assert!(copy.verify_checksum());
}

#[test]
fn test_unverified_reads_pass_damaged_cells() {
    let config = StoreConfig::from_toml_str("[integrity]\nverify_on_read = false").unwrap();
    let manifold = config.manifold().unwrap();

    let cell = Cell::with_information(&Information::from_value(3u8).unwrap());
    cell.acquire().set_base(CellId::new(1, 1));

    let wire = manifold.read(&cell, CellId::new(1, 2)).unwrap();
    assert!(!wire.verify_checksum());
    assert!(!cell.specs().flags.invalid());
    assert!(matches!(manifold.write(&Cell::new(), &wire), Err(CellError::ChecksumMismatch)));
}
