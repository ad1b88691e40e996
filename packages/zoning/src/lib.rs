#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! NYC Zoning Resolution rule engine.
//!
//! Maps a parcel's facts (zoning districts, lot geometry, building class,
//! transit zone) onto the residential bulk, density, parking, and yard
//! rules of the Zoning Resolution. Every result carries its citation, the
//! caveats that were not evaluated, and whether a person must review it.
//!
//! The engine does no I/O. [`evaluate`] is the entry point; the modules
//! are public so callers can run individual calculators.

pub mod calculators;
pub mod classify;
pub mod derived;
pub mod district;
pub mod multi_district;
pub mod report;
pub mod tables;

pub use report::evaluate;
