//! # scada-cells - checksum-protected process data cells
//!
//! `scada-cells` provides the storage primitives of a real-time tag/value
//! store:
//!
//! - **Atoms**: 64-bit words holding a 63-bit number or a short string
//! - **Atom paths**: `/`-separated atom sequences naming cells
//! - **Cells**: 64-byte records with a reader/writer spinlock, a timestamp,
//!   two cell references and a tagged value, sealed by a 16-bit checksum
//! - **Information**: the tagged value with a full conversion matrix to
//!   host types
//!
//! ## Quick Start
//!
//! ```rust
//! use scada_cells::{Atom, AtomPath, Cell, Information, Result, SetMode};
//!
//! # fn main() -> Result<()> {
//! let path = AtomPath::parse("plant/pump1/speed")?;
//! assert_eq!(path.len(), 3);
//! assert_eq!(Atom::parse("42")?.numeric(), Some(42));
//!
//! let cell = Cell::new();
//! cell.set_value(&Information::from_value(1450u16)?, SetMode::Always)?;
//! assert_eq!(cell.get::<u32>(0), Ok(1450));
//! assert!(cell.verify_checksum());
//! # Ok(())
//! # }
//! ```
//!
//! ## Writers
//!
//! ```rust
//! use scada_cells::{Cell, CellId, Information, Result};
//!
//! # fn main() -> Result<()> {
//! let cell = Cell::new();
//! let mut guard = cell.acquire();
//! guard.set_information(&Information::from_value("running")?);
//! guard.set_base(CellId::new(1, 20));
//! guard.commit(); // restamp, re-seal, release
//!
//! assert_eq!(cell.get::<String>(0).as_deref(), Ok("running"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;

pub use crate::config::{Manifold, StoreConfig};
pub use crate::core::{
    address::{Address, Guid},
    atom::{Atom, AtomFormat, Decomposition},
    atom_path::{AtomPath, AtomPathView},
    cell::{
        Cell, CellId, CellWriteGuard, Expression, Flags, FromInformation, Information,
        IntoInformation, Payload, SetMode, Specs, TextFormat, ValueType, WireCell,
    },
    filetime::FileTime,
    wide::{DoubleInteger, I256, U256},
};
pub use crate::error::{CellError, Conversion, InvalidInputReason, Result};
