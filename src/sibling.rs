use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::error::BuildError;
use crate::path::Path;
use crate::probe::Probe;
use crate::requirement::{Requirement, normalize};

/// Include directories and compiled libraries of sibling packages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiblingLibraries {
    pub include_dirs: Vec<Path>,
    pub libraries: Vec<String>,
    pub library_dirs: Vec<Path>,
}

/// Locates the headers and libraries installed by sibling packages such as `bob.core`.
///
/// Every sibling contributes its `include` directory. A library named after
/// the package (`bob.core` gives `bob_core`) is looked up under the package's
/// installed root; the first match wins, and siblings without one only
/// contribute headers.
pub fn get_bob_libraries<S: AsRef<str>>(
    probe: &Probe,
    siblings: &[S],
) -> Result<SiblingLibraries, BuildError> {
    let siblings = siblings
        .iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .collect::<Vec<_>>();

    let mut result = SiblingLibraries::default();
    let mut seen = HashSet::new();

    for entry in normalize(&siblings)? {
        let requirement = Requirement::parse(&entry)?;
        if !seen.insert(requirement.name.clone()) {
            continue;
        }
        if requirement.constraint.is_some() {
            tracing::debug!("Ignoring version constraint of sibling package `{requirement}'");
        }

        let name = requirement.name;
        let root = probe
            .runtime()
            .package_dir(&name)
            .map_err(|_| BuildError::PackageNotFound(name.clone()))?;
        result.include_dirs.push(root.join("include"));

        let lib_name = name.replace('.', "_");
        let found = probe.find_library(&lib_name, None, &[], &[root], false)?;
        if let Some(dir) = found.first().and_then(Path::parent) {
            tracing::debug!("Sibling {name}: linking lib{lib_name} from {dir}");
            result.libraries.push(lib_name);
            result.library_dirs.push(dir);
        }
    }

    Ok(result)
}
