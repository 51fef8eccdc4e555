#![no_main]
use libfuzzer_sys::fuzz_target;
use scada_cells::{Atom, AtomPath, AtomPathView};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(atom) = Atom::parse(text) {
        let formatted = atom.format();
        assert_eq!(formatted.len(), atom.formatted_length());
        assert_eq!(Atom::parse(&formatted), Ok(atom));
    }

    let owned = AtomPath::parse(text);
    let view = AtomPathView::parse(text);
    match (owned, view) {
        (Ok(path), Ok(view)) => {
            assert_eq!(view, path);
            assert_eq!(AtomPath::parse(&path.format()), Ok(path));
        }
        (Err(a), Err(b)) => assert_eq!(a, b),
        _ => panic!("owned and scratch parsing disagree on {:?}", text),
    }
});
