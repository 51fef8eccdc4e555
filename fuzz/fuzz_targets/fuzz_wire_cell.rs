#![no_main]
use libfuzzer_sys::fuzz_target;
use scada_cells::{Cell, CellId, WireCell};

fuzz_target!(|data: &[u8]| {
    let Some(wire) = WireCell::from_slice(data.get(..64).unwrap_or(data)) else {
        return;
    };

    // describing arbitrary bytes must never panic
    let _ = format!("{}", wire);
    let info = wire.information();
    let _ = info.to_raw_data_vec();
    let _ = info.to_string(0, None);

    let cell = Cell::from_wire(&wire);
    assert_eq!(cell.verify_checksum(), wire.verify_checksum());

    let copy = cell.snapshot(wire.id());
    assert_eq!(copy.checksum(), wire.checksum());
    assert_eq!(copy.information().to_bytes(), info.to_bytes());

    if !cell.check_integrity() {
        assert!(cell.specs().flags.invalid());
        assert!(cell.verify_checksum());
    }
    let _ = cell.snapshot(CellId::NONE);
});
