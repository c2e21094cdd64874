#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod boost;
pub mod build_ext;
pub mod cmake;
pub mod error;
pub mod flags;
pub mod path;
pub mod pkgconfig;
pub mod probe;
pub mod requirement;
pub mod runtime;
pub mod sibling;
pub mod steps;
pub mod target;
pub mod utils;
pub mod version;

#[cfg(test)]
mod mock;

use alloc::string::String;
use core::fmt::Write as _;

pub use crate::build_ext::BuildExt;
pub use crate::error::BuildError;
pub use crate::flags::{AssemblerOptions, Extension, ExtensionSpec, FlagAssembler, Macro};
pub use crate::probe::{Probe, SearchConfig};
pub use crate::requirement::{Requirement, normalize};
pub use crate::target::{LibrarySpec, Target};
pub use crate::version::LooseVersion;

/// Human-readable summary of this crate and the prefixes it searches.
pub fn get_config(probe: &Probe) -> Result<String, BuildError> {
    let mut config = String::new();
    let _ = writeln!(
        config,
        "{}: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(config, "  - system: {:?}", probe.machine().system);
    let _ = writeln!(config, "  - search prefixes:");
    for prefix in probe.resolve_search_paths(&[])? {
        let _ = writeln!(config, "    - {prefix}");
    }
    Ok(String::from(config.trim_end()))
}
