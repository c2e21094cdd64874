use alloc::format;
use alloc::string::{String, ToString as _};
use alloc::vec::Vec;

use crate::error::BuildError;
use crate::flags::Macro;
use crate::path::Path;
use crate::probe::Probe;
use crate::requirement::Requirement;
use crate::utils::{egrep, uniq};
use crate::version::LooseVersion;

/// A Boost installation found by looking for `boost/version.hpp`.
///
/// Boost rarely ships pkg-config metadata, so headers and libraries are
/// located by probing the search prefixes directly.
#[derive(Clone)]
pub struct Boost {
    probe: Probe,
    version: LooseVersion,
    lib_version: String,
    include_dir: Path,
}

/// `BOOST_VERSION` and `BOOST_LIB_VERSION` from a `version.hpp` header.
fn parse_version_header(probe: &Probe, header: &Path) -> Result<Option<(String, String)>, BuildError> {
    let define_value = |line: &str| line.split_whitespace().nth(2).map(String::from);

    let version = egrep(probe.runtime(), header, "#define BOOST_VERSION ")?
        .first()
        .and_then(|line| define_value(line.as_str()))
        .and_then(|value| value.parse::<u64>().ok());
    let lib_version = egrep(probe.runtime(), header, "#define BOOST_LIB_VERSION ")?
        .first()
        .and_then(|line| define_value(line.as_str()))
        .map(|value| value.trim_matches('"').to_string());

    let Some(number) = version else {
        return Ok(None);
    };
    let version = format!("{}.{}.{}", number / 100000, number / 100 % 1000, number % 100);
    let lib_version = lib_version.unwrap_or_else(|| {
        format!("{}_{}", number / 100000, number / 100 % 1000)
    });
    Ok(Some((version, lib_version)))
}

/// Link name of a library file: `libboost_system-mt.so.1.55.0` gives `boost_system-mt`.
fn link_name(library: &Path) -> Option<String> {
    let file_name = library.file_name()?;
    let stem = file_name.strip_prefix("lib").unwrap_or(file_name);
    stem.split('.').next().map(String::from)
}

impl Boost {
    /// Finds the first Boost installation satisfying `requirement`.
    pub fn new(probe: &Probe, requirement: &Requirement) -> Result<Self, BuildError> {
        let headers = probe.find_header("boost/version.hpp", &[], &[])?;
        let mut rejected = None;

        for header in headers {
            let Some((version, lib_version)) = parse_version_header(probe, &header)? else {
                tracing::warn!("Ignoring {header}: no BOOST_VERSION definition");
                continue;
            };
            let version = LooseVersion::parse(version);
            if !requirement.is_satisfied_by(&version) {
                tracing::debug!("Boost {version} at {header} does not satisfy `{requirement}'");
                rejected.get_or_insert(version);
                continue;
            }

            let Some(include_dir) = header.parent().and_then(|boost| boost.parent()) else {
                continue;
            };
            tracing::debug!("Using Boost {version} from {include_dir}");
            return Ok(Self {
                probe: probe.clone(),
                version,
                lib_version,
                include_dir,
            });
        }

        match rejected {
            Some(found) => Err(BuildError::UnsatisfiedRequirement {
                requirement: requirement.to_string(),
                found: found.to_string(),
            }),
            None => Err(BuildError::PackageNotFound(requirement.name.clone())),
        }
    }

    pub fn version(&self) -> &LooseVersion {
        &self.version
    }

    /// Version tag embedded in library file names, e.g. `1_55`.
    pub fn lib_version(&self) -> &str {
        &self.lib_version
    }

    pub fn include_directory(&self) -> &Path {
        &self.include_dir
    }

    fn module_candidates(&self, module: &str) -> [String; 6] {
        let tag = &self.lib_version;
        [
            format!("boost_{module}-mt-{tag}"),
            format!("boost_{module}-{tag}"),
            // compiler tagged, e.g. boost_system-gcc48-mt-1_55
            format!("boost_{module}-*-mt-{tag}"),
            format!("boost_{module}-*-{tag}"),
            format!("boost_{module}-mt"),
            format!("boost_{module}"),
        ]
    }

    /// Library directories and link names for the given Boost modules.
    pub fn libconfig<S: AsRef<str>>(&self, modules: &[S]) -> Result<(Vec<Path>, Vec<String>), BuildError> {
        let prefixes = self.include_dir.parent().into_iter().collect::<Vec<_>>();
        let mut dirs = Vec::new();
        let mut names = Vec::new();

        'modules: for module in modules {
            let module = module.as_ref().trim();
            for candidate in self.module_candidates(module) {
                let found = self
                    .probe
                    .find_library(&candidate, None, &[], &prefixes, false)?;
                let Some(first) = found.first() else {
                    continue;
                };
                if let (Some(dir), Some(name)) = (first.parent(), link_name(first)) {
                    dirs.push(dir);
                    names.push(name);
                    continue 'modules;
                }
            }
            return Err(BuildError::PackageNotFound(format!("boost_{module}")));
        }

        Ok((uniq(dirs), names))
    }

    pub fn macros(&self) -> Vec<Macro> {
        alloc::vec![
            Macro::new("HAVE_BOOST", "1"),
            Macro::new("BOOST_VERSION_STRING", format!("\"{}\"", self.version)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;

    use super::*;
    use crate::mock::MockRuntime;
    use crate::probe::{PREFIX_PATH_ENV, SearchConfig};

    const VERSION_1_55: &str = "#ifndef BOOST_VERSION_HPP\n#define BOOST_VERSION 105500\n#define BOOST_LIB_VERSION \"1_55\"\n#endif\n";
    const VERSION_1_48: &str = "#define BOOST_VERSION 104800\n#define BOOST_LIB_VERSION \"1_48\"\n";

    fn probe(rt: MockRuntime) -> Probe {
        let config = SearchConfig::from_runtime(&rt).unwrap();
        Probe::new(Rc::new(rt), config).unwrap()
    }

    fn req(s: &str) -> Requirement {
        Requirement::parse(s).unwrap()
    }

    #[test]
    fn test_detects_version_and_include_dir() {
        let probe = probe(MockRuntime::linux64().with_file("/usr/include/boost/version.hpp", VERSION_1_55));
        let boost = Boost::new(&probe, &req("boost >= 1.40")).unwrap();
        assert_eq!(boost.version().as_str(), "1.55.0");
        assert_eq!(boost.lib_version(), "1_55");
        assert_eq!(boost.include_directory(), &Path::from("/usr/include"));
        assert_eq!(
            boost.macros(),
            vec![
                Macro::new("HAVE_BOOST", "1"),
                Macro::new("BOOST_VERSION_STRING", "\"1.55.0\""),
            ]
        );
    }

    #[test]
    fn test_skips_installations_too_old() {
        let probe = probe(
            MockRuntime::linux64()
                .with_env(PREFIX_PATH_ENV, "/opt/old")
                .with_file("/opt/old/include/boost/version.hpp", VERSION_1_48)
                .with_file("/usr/local/include/boost/version.hpp", VERSION_1_55),
        );
        let boost = Boost::new(&probe, &req("boost >= 1.50")).unwrap();
        assert_eq!(boost.include_directory(), &Path::from("/usr/local/include"));
    }

    #[test]
    fn test_unsatisfied_and_missing() {
        let installed = probe(MockRuntime::linux64().with_file("/usr/include/boost/version.hpp", VERSION_1_48));
        let err = Boost::new(&installed, &req("boost >= 1.50")).err().unwrap();
        assert!(matches!(err, BuildError::UnsatisfiedRequirement { found, .. } if found == "1.48.0"));

        let missing = probe(MockRuntime::linux64());
        let err = Boost::new(&missing, &req("boost")).err().unwrap();
        assert!(matches!(err, BuildError::PackageNotFound(name) if name == "boost"));
    }

    #[test]
    fn test_libconfig_prefers_tagged_names() {
        let probe = probe(
            MockRuntime::linux64()
                .with_file("/usr/include/boost/version.hpp", VERSION_1_55)
                .with_file("/usr/lib/x86_64-linux-gnu/libboost_system.so", "")
                .with_file("/usr/lib/x86_64-linux-gnu/libboost_filesystem-mt.so", "")
                .with_file("/usr/lib/x86_64-linux-gnu/libboost_filesystem.so", "")
                .with_file("/usr/lib64/libboost_python-gcc48-mt-1_55.so.1.55.0", "")
                .with_file("/usr/lib64/libboost_python-gcc48-mt-1_55.so", ""),
        );
        let boost = Boost::new(&probe, &req("boost")).unwrap();
        let (dirs, names) = boost.libconfig(&["system", "filesystem", "python"]).unwrap();
        assert_eq!(
            dirs,
            vec![Path::from("/usr/lib/x86_64-linux-gnu"), Path::from("/usr/lib64")]
        );
        assert_eq!(
            names,
            vec!["boost_system", "boost_filesystem-mt", "boost_python-gcc48-mt-1_55"]
        );
    }

    #[test]
    fn test_libconfig_missing_module() {
        let probe = probe(MockRuntime::linux64().with_file("/usr/include/boost/version.hpp", VERSION_1_55));
        let boost = Boost::new(&probe, &req("boost")).unwrap();
        let err = boost.libconfig(&["thread"]).unwrap_err();
        assert!(matches!(err, BuildError::PackageNotFound(name) if name == "boost_thread"));
    }

    #[test]
    fn test_link_name() {
        assert_eq!(
            link_name(&Path::from("/usr/lib/libboost_system-mt.so.1.55.0")),
            Some("boost_system-mt".to_string())
        );
        assert_eq!(
            link_name(&Path::from("C:/boost/lib/libboost_thread-vc120-mt-1_55.dll")),
            Some("boost_thread-vc120-mt-1_55".to_string())
        );
    }
}
