//! Atoms, atom paths and cell records

pub mod address;
pub mod atom;
pub mod atom_path;
pub mod cell;
pub mod filetime;
pub mod scratch;
pub mod wide;
