//! 64-byte cell records
//!
//! ```text
//! offset  size  field
//! 0       2     lock word (live) | id segment (wire)
//! 2       2     checksum
//! 4       4     reserved, zero (live) | id index (wire)
//! 8       8     timestamp, FILETIME
//! 16      6     base cell id
//! 22      6     expression cell id
//! 28      36    information
//! ```
//!
//! Readers take the lock shared and copy the information out; writers
//! take it exclusively through a [`CellWriteGuard`] and re-seal the
//! checksum on commit.

pub mod checksum;
pub mod conversion;
mod describe;
pub mod expression;
pub mod id;
pub mod information;
pub mod lock;
pub mod payload;

use std::cell::UnsafeCell;
use std::fmt;

use crate::core::filetime::FileTime;
use crate::error::{CellError, Conversion, Result};

pub use conversion::{FromInformation, TextFormat};
pub use expression::{Expression, Input, InputFlags, Operation};
pub use id::CellId;
pub use information::{Flags, Information, IntoInformation, Specs, ValueType, INFORMATION_SIZE};
pub use lock::RwSpinLock;
pub use payload::{Payload, Scalar};

pub const CELL_SIZE: usize = 64;
pub const CHECKSUM_OFFSET: usize = 2;
pub const RESERVED_OFFSET: usize = 4;
pub const TIMESTAMP_OFFSET: usize = 8;
pub const BASE_OFFSET: usize = 16;
pub const EXPRESSION_OFFSET: usize = 22;
pub const INFORMATION_OFFSET: usize = 28;

const LOCK_SIZE: usize = 2;
const RECORD_SIZE: usize = CELL_SIZE - LOCK_SIZE;

const _: () = assert!(std::mem::size_of::<Cell>() == CELL_SIZE);
const _: () = assert!(std::mem::size_of::<WireCell>() == CELL_SIZE);
const _: () = assert!(INFORMATION_SIZE == 36);
const _: () = assert!(INFORMATION_OFFSET + INFORMATION_SIZE == CELL_SIZE);
const _: () = assert!(BASE_OFFSET + CellId::SIZE == EXPRESSION_OFFSET);
const _: () = assert!(EXPRESSION_OFFSET + CellId::SIZE == INFORMATION_OFFSET);

/// Cell bytes after the lock word
type Record = [u8; RECORD_SIZE];

const fn at(offset: usize) -> usize {
    offset - LOCK_SIZE
}

fn read_checksum(record: &Record) -> u16 {
    let offset = at(CHECKSUM_OFFSET);
    u16::from_le_bytes([record[offset], record[offset + 1]])
}

fn write_checksum(record: &mut Record, checksum: u16) {
    let offset = at(CHECKSUM_OFFSET);
    record[offset..offset + 2].copy_from_slice(&checksum.to_le_bytes());
}

fn read_time(record: &Record) -> FileTime {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&record[at(TIMESTAMP_OFFSET)..at(BASE_OFFSET)]);
    FileTime(u64::from_le_bytes(bytes))
}

fn write_time(record: &mut Record, time: FileTime) {
    record[at(TIMESTAMP_OFFSET)..at(BASE_OFFSET)].copy_from_slice(&time.ticks().to_le_bytes());
}

fn read_id(record: &Record, offset: usize) -> CellId {
    let mut bytes = [0u8; CellId::SIZE];
    bytes.copy_from_slice(&record[at(offset)..at(offset) + CellId::SIZE]);
    CellId::from_bytes(&bytes)
}

fn write_id(record: &mut Record, offset: usize, id: CellId) {
    record[at(offset)..at(offset) + CellId::SIZE].copy_from_slice(&id.to_bytes());
}

fn read_information(record: &Record) -> Information {
    let mut bytes = [0u8; INFORMATION_SIZE];
    bytes.copy_from_slice(&record[at(INFORMATION_OFFSET)..]);
    Information::from_bytes(&bytes)
}

fn write_information(record: &mut Record, information: &Information) {
    record[at(INFORMATION_OFFSET)..].copy_from_slice(&information.to_bytes());
}

fn seal(record: &Record) -> u16 {
    let mut image = [0u8; CELL_SIZE];
    image[LOCK_SIZE..].copy_from_slice(record);
    checksum::compute(&image)
}

/// How [`Cell::set_value`] treats an unchanged value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetMode {
    /// Always write and restamp
    #[default]
    Always,
    /// Leave the cell untouched when the value compares equal
    UpdateOnChangeOnly,
}

/// Live cell record guarded by its own spinlock
#[repr(C, align(64))]
pub struct Cell {
    lock: RwSpinLock,
    record: UnsafeCell<Record>,
}

// SAFETY: `record` is only read under the shared lock and only written
// under the exclusive lock or through `&mut self`.
unsafe impl Sync for Cell {}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl Cell {
    /// Null cell stamped at the FILETIME epoch
    pub fn new() -> Self {
        let mut cell = Cell {
            lock: RwSpinLock::new(),
            record: UnsafeCell::new([0u8; RECORD_SIZE]),
        };
        cell.finalize_at(FileTime::ZERO);
        cell
    }

    /// Cell holding `information`, stamped now
    pub fn with_information(information: &Information) -> Self {
        let mut cell = Cell::new();
        write_information(cell.record.get_mut(), information);
        cell.finalize();
        cell
    }

    /// Copy of the record, taken under the shared lock
    fn read_record(&self) -> Record {
        let _shared = self.lock.read();
        // SAFETY: shared lock held, no writer can be active
        unsafe { *self.record.get() }
    }

    /// Exclusive access; spins until every other holder is gone
    pub fn acquire(&self) -> CellWriteGuard<'_> {
        self.lock.acquire();
        CellWriteGuard { cell: self }
    }

    pub fn try_acquire(&self) -> Option<CellWriteGuard<'_>> {
        self.lock.try_acquire().then(|| CellWriteGuard { cell: self })
    }

    /// Copy of the current value
    pub fn information(&self) -> Information {
        read_information(&self.read_record())
    }

    /// Convert element `index` of the current value
    pub fn get<T: FromInformation>(&self, index: usize) -> std::result::Result<T, Conversion> {
        self.information().to(index)
    }

    /// As [`Cell::get`], `None` if a writer holds the cell
    pub fn try_get<T: FromInformation>(&self, index: usize) -> Option<std::result::Result<T, Conversion>> {
        let shared = self.lock.try_read()?;
        // SAFETY: shared lock held
        let information = read_information(unsafe { &*self.record.get() });
        drop(shared);
        Some(information.to(index))
    }

    pub fn specs(&self) -> Specs {
        self.information().specs
    }

    pub fn update_time(&self) -> FileTime {
        read_time(&self.read_record())
    }

    pub fn base(&self) -> CellId {
        read_id(&self.read_record(), BASE_OFFSET)
    }

    pub fn expression_id(&self) -> CellId {
        read_id(&self.read_record(), EXPRESSION_OFFSET)
    }

    pub fn checksum(&self) -> u16 {
        read_checksum(&self.read_record())
    }

    /// Checksum the cell will carry after writing `information` at `time`
    ///
    /// Lets a writer do the CRC work before taking the lock; pair with
    /// [`CellWriteGuard::commit_precomputed`]. Only valid if base and
    /// expression ids do not change in between.
    pub fn precompute_checksum(&self, time: FileTime, information: &Information) -> u16 {
        let mut record = self.read_record();
        write_time(&mut record, time);
        write_information(&mut record, information);
        seal(&record)
    }

    /// Stamp now and re-seal; for cells not yet shared
    pub fn finalize(&mut self) {
        let time = FileTime::now();
        self.finalize_at(time);
    }

    pub fn finalize_at(&mut self, time: FileTime) {
        let record = self.record.get_mut();
        write_time(record, time);
        let checksum = seal(record);
        write_checksum(record, checksum);
    }

    /// Stamp and store a checksum computed elsewhere
    pub fn finalize_with(&mut self, time: FileTime, checksum: u16) {
        let record = self.record.get_mut();
        write_time(record, time);
        write_checksum(record, checksum);
    }

    pub fn verify_checksum(&self) -> bool {
        let record = self.read_record();
        seal(&record) == read_checksum(&record)
    }

    /// Recompute the stored checksum without restamping
    pub fn update_checksum(&mut self) {
        let record = self.record.get_mut();
        let checksum = seal(record);
        write_checksum(record, checksum);
    }

    /// Verify the checksum; a damaged cell is marked invalid and re-sealed
    ///
    /// Returns whether the cell was intact. The invalid flag stays set
    /// until [`Cell::reset_invalid`].
    pub fn check_integrity(&self) -> bool {
        let mut guard = self.acquire();
        if guard.verify_checksum() {
            return true;
        }
        let stored = read_checksum(guard.record());
        let computed = seal(guard.record());
        tracing::warn!(stored, computed, "cell checksum mismatch, marking invalid");
        guard.set_flags(Flags::INVALID, true);
        let time = guard.timestamp();
        guard.commit_at(time);
        false
    }

    /// Store a new value and restamp
    ///
    /// Returns whether the cell changed. Persistent flags
    /// (`base_cell_dependent`, `fixed_type`, `constant`) come from the
    /// cell, the rest from `information`.
    pub fn set_value(&self, information: &Information, mode: SetMode) -> Result<bool> {
        if information.kind() == Some(ValueType::Stream) {
            return Err(CellError::StreamNotStorable);
        }

        let mut guard = self.acquire();
        let current = guard.information();
        let flags = current.specs.flags;
        if flags.constant() {
            return Err(CellError::Constant);
        }
        if flags.fixed_type() && !current.specs.same_type(information.specs) {
            return Err(CellError::FixedType {
                from: shape(current.specs),
                to: shape(information.specs),
            });
        }

        let mut next = *information;
        next.specs.flags = Flags(
            (information.specs.flags.0 & !Flags::PERSISTENT) | (flags.0 & Flags::PERSISTENT),
        );
        if mode == SetMode::UpdateOnChangeOnly && next == current {
            return Ok(false);
        }

        guard.set_information(&next);
        guard.commit();
        tracing::debug!(value = %next, "cell value written");
        Ok(true)
    }

    /// Set or clear flag bits and restamp
    pub fn set_flags(&self, mask: u8, value: bool) {
        let mut guard = self.acquire();
        guard.set_flags(mask, value);
        guard.commit();
    }

    pub fn set_invalid(&self) {
        tracing::warn!("cell marked invalid");
        self.set_flags(Flags::INVALID, true);
    }

    pub fn reset_invalid(&self) {
        self.set_flags(Flags::INVALID, false);
    }

    /// Wire copy tagged with `id`
    pub fn snapshot(&self, id: CellId) -> WireCell {
        let record = self.read_record();
        let mut bytes = [0u8; CELL_SIZE];
        bytes[LOCK_SIZE..].copy_from_slice(&record);
        let mut wire = WireCell(bytes);
        wire.set_id(id);
        wire
    }

    /// Live cell from a wire copy, checksum carried over unchanged
    pub fn from_wire(wire: &WireCell) -> Cell {
        let mut cell = Cell::new();
        let record = cell.record.get_mut();
        record.copy_from_slice(&wire.0[LOCK_SIZE..]);
        record[at(RESERVED_OFFSET)..at(TIMESTAMP_OFFSET)].fill(0);
        cell
    }

    /// Overwrite this cell with a wire copy, checksum carried over
    pub fn load(&self, wire: &WireCell) {
        let mut guard = self.acquire();
        let record = guard.record_mut();
        record.copy_from_slice(&wire.0[LOCK_SIZE..]);
        record[at(RESERVED_OFFSET)..at(TIMESTAMP_OFFSET)].fill(0);
    }
}

fn shape(specs: Specs) -> String {
    let kind = specs
        .kind()
        .map_or_else(|| format!("{:#04x}", specs.value_type), |kind| kind.name().to_string());
    format!("{}(width {}, count {})", kind, specs.width, specs.count)
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("lock", &self.lock.state())
            .field("record", &format_args!("{}", self))
            .finish()
    }
}

/// Exclusive access to a [`Cell`]
///
/// Dropping the guard without committing releases the lock and leaves
/// timestamp and checksum as they are.
pub struct CellWriteGuard<'a> {
    cell: &'a Cell,
}

impl CellWriteGuard<'_> {
    fn record(&self) -> &Record {
        // SAFETY: exclusive lock held for the guard's lifetime
        unsafe { &*self.cell.record.get() }
    }

    fn record_mut(&mut self) -> &mut Record {
        // SAFETY: exclusive lock held, `&mut self` prevents aliasing
        unsafe { &mut *self.cell.record.get() }
    }

    pub fn information(&self) -> Information {
        read_information(self.record())
    }

    pub fn set_information(&mut self, information: &Information) {
        write_information(self.record_mut(), information);
    }

    pub fn specs(&self) -> Specs {
        self.information().specs
    }

    pub fn set_flags(&mut self, mask: u8, value: bool) {
        let mut information = self.information();
        information.specs.flags.set(mask, value);
        self.set_information(&information);
    }

    pub fn base(&self) -> CellId {
        read_id(self.record(), BASE_OFFSET)
    }

    pub fn set_base(&mut self, id: CellId) {
        write_id(self.record_mut(), BASE_OFFSET, id);
    }

    pub fn expression_id(&self) -> CellId {
        read_id(self.record(), EXPRESSION_OFFSET)
    }

    pub fn set_expression_id(&mut self, id: CellId) {
        write_id(self.record_mut(), EXPRESSION_OFFSET, id);
    }

    pub fn timestamp(&self) -> FileTime {
        read_time(self.record())
    }

    pub fn verify_checksum(&self) -> bool {
        seal(self.record()) == read_checksum(self.record())
    }

    /// Stamp `max(now, previous)`, re-seal and release
    pub fn commit(self) {
        let time = FileTime::now().max(self.timestamp());
        self.commit_at(time);
    }

    pub fn commit_at(mut self, time: FileTime) {
        let record = self.record_mut();
        write_time(record, time);
        let checksum = seal(record);
        write_checksum(record, checksum);
    }

    /// Stamp `time` and store a checksum from [`Cell::precompute_checksum`]
    pub fn commit_precomputed(mut self, time: FileTime, checksum: u16) {
        let record = self.record_mut();
        write_time(record, time);
        write_checksum(record, checksum);
    }
}

impl Drop for CellWriteGuard<'_> {
    fn drop(&mut self) {
        self.cell.lock.release();
    }
}

/// Wire copy of a cell with its id in place of the lock
///
/// The id occupies bytes 0..2 (segment) and 4..8 (index), both outside
/// the checksum.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct WireCell(pub [u8; CELL_SIZE]);

impl WireCell {
    pub fn from_bytes(bytes: [u8; CELL_SIZE]) -> Self {
        WireCell(bytes)
    }

    /// `None` unless `bytes` is exactly one record long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; CELL_SIZE] = bytes.try_into().ok()?;
        Some(WireCell(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; CELL_SIZE] {
        &self.0
    }

    pub fn id(&self) -> CellId {
        CellId::new(
            u16::from_le_bytes([self.0[0], self.0[1]]),
            u32::from_le_bytes([self.0[4], self.0[5], self.0[6], self.0[7]]),
        )
    }

    pub fn set_id(&mut self, id: CellId) {
        self.0[0..2].copy_from_slice(&id.segment.to_le_bytes());
        self.0[RESERVED_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&id.index.to_le_bytes());
    }

    pub fn checksum(&self) -> u16 {
        u16::from_le_bytes([self.0[CHECKSUM_OFFSET], self.0[CHECKSUM_OFFSET + 1]])
    }

    pub fn timestamp(&self) -> FileTime {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.0[TIMESTAMP_OFFSET..BASE_OFFSET]);
        FileTime(u64::from_le_bytes(bytes))
    }

    pub fn base(&self) -> CellId {
        self.cell_id_at(BASE_OFFSET)
    }

    pub fn expression_id(&self) -> CellId {
        self.cell_id_at(EXPRESSION_OFFSET)
    }

    fn cell_id_at(&self, offset: usize) -> CellId {
        let mut bytes = [0u8; CellId::SIZE];
        bytes.copy_from_slice(&self.0[offset..offset + CellId::SIZE]);
        CellId::from_bytes(&bytes)
    }

    pub fn information(&self) -> Information {
        let mut bytes = [0u8; INFORMATION_SIZE];
        bytes.copy_from_slice(&self.0[INFORMATION_OFFSET..]);
        Information::from_bytes(&bytes)
    }

    /// Checksum check ignoring the id fields
    pub fn verify_checksum(&self) -> bool {
        checksum::compute_wire(&self.0) == self.checksum()
    }
}

impl fmt::Debug for WireCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WireCell({})", self)
    }
}
