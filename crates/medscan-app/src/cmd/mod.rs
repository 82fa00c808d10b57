//! Command-line entry points.

use serde::Serialize;

use crate::prelude::*;

pub mod chat;
pub mod identify;
pub mod registry;
pub mod serve;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}
