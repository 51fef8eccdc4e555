#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use scada_cells::{Atom, Information, TextFormat};

#[derive(Arbitrary, Debug)]
struct Input {
    bytes: [u8; 36],
    index: u8,
    hexadecimal: bool,
    precision: Option<u8>,
    width: u8,
}

fuzz_target!(|input: Input| {
    let info = Information::from_bytes(&input.bytes);
    let index = input.index as usize;
    let format = TextFormat {
        hexadecimal: input.hexadecimal,
        precision: input.precision.map(|p| p as usize % 20),
        width: input.width as usize % 64,
        ..TextFormat::default()
    };

    let _ = format!("{}", info);
    let _ = info.to_boolean(index);
    let _ = info.to_integer::<i64>(index);
    let _ = info.to_integer::<u8>(index);
    let _ = info.to_float::<f32>(index);
    let _ = info.to_string(index, None);
    let _ = info.to_string(index, Some(&format));
    let _ = info.to_ascii(index, None);
    let _ = info.to_utf16(index, Some(&format));
    let _ = info.to_str();
    let _ = info.to_file_time(index);
    let _ = info.to_address(index);
    let _ = info.to_atom_path();
    let _ = info.to_raw_data_vec();

    if let Ok(atom) = info.to::<Atom>(index) {
        let _ = atom.format();
    }

    // re-encoding a decodable value keeps it equal
    if let Ok(payload) = info.decode() {
        let mut copy = info;
        if copy.set_payload(&payload).is_ok() && !info.flags().external() {
            assert_eq!(copy.kind(), info.kind());
        }
    }
});
