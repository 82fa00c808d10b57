//! Domain models for the medscan system.

mod medication;
mod scan;

pub use medication::*;
pub use scan::*;
