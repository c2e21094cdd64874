use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{BuildError, ErrorContext};
use crate::path::Path;
use crate::runtime::{MachineInfo, Runtime, System};
use crate::utils::uniq;

/// Environment variable holding prefixes searched before anything else.
pub const PREFIX_PATH_ENV: &str = "BOB_PREFIX_PATH";

pub const DEFAULT_PREFIXES: [&str; 3] = ["/usr", "/usr/local", "/opt/local"];

/// Where to look for headers and libraries, in priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Prefixes from the environment override, searched first.
    pub env_prefixes: Vec<Path>,
    /// Platform prefixes, searched last.
    pub default_prefixes: Vec<Path>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            env_prefixes: Vec::new(),
            default_prefixes: DEFAULT_PREFIXES.iter().map(Path::from).collect(),
        }
    }
}

impl SearchConfig {
    /// Reads [`PREFIX_PATH_ENV`] from the runtime, split on the host's list separator.
    pub fn from_runtime(runtime: &dyn Runtime) -> Result<Self, BuildError> {
        let machine = runtime
            .host_machine()
            .context_runtime("Failed to detect host machine")?;
        let env_prefixes = runtime
            .get_env(PREFIX_PATH_ENV)
            .map(|value| {
                value
                    .split(machine.system.path_list_separator())
                    .filter(|p| !p.is_empty())
                    .map(Path::from)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            env_prefixes,
            ..Default::default()
        })
    }

    /// Environment prefixes, then `explicit`, then the defaults; first occurrence wins.
    pub fn prefixes(&self, explicit: &[Path]) -> Vec<Path> {
        uniq(
            self.env_prefixes
                .iter()
                .chain(explicit)
                .chain(&self.default_prefixes)
                .cloned(),
        )
    }
}

/// Locates files on disk following header and library naming conventions.
#[derive(Clone)]
pub struct Probe {
    runtime: Rc<dyn Runtime>,
    config: SearchConfig,
    machine: MachineInfo,
}

impl Probe {
    pub fn new(runtime: Rc<dyn Runtime>, config: SearchConfig) -> Result<Self, BuildError> {
        let machine = runtime
            .host_machine()
            .context_runtime("Failed to detect host machine")?;
        Ok(Self {
            runtime,
            config,
            machine,
        })
    }

    pub fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    pub fn runtime_rc(&self) -> Rc<dyn Runtime> {
        self.runtime.clone()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn machine(&self) -> &MachineInfo {
        &self.machine
    }

    fn expand(&self, pattern: &Path) -> Result<Vec<Path>, BuildError> {
        self.runtime
            .glob(pattern)
            .with_context_runtime(|| format!("Failed to expand `{pattern}'"))
    }

    /// Existing search prefixes, in priority order, with globs expanded.
    pub fn resolve_search_paths(&self, explicit: &[Path]) -> Result<Vec<Path>, BuildError> {
        let mut resolved = Vec::new();
        for prefix in self.config.prefixes(explicit) {
            resolved.extend(self.expand(&prefix)?);
        }
        Ok(resolved)
    }

    /// Every existing `prefix/subpath/name`, and `prefix/name`, for every prefix.
    ///
    /// Matches are returned in search order; callers decide precedence.
    pub fn find_file(
        &self,
        name: &str,
        subpaths: &[String],
        prefixes: &[Path],
    ) -> Result<Vec<Path>, BuildError> {
        let mut search = Vec::new();
        for prefix in self.config.prefixes(prefixes) {
            for subpath in subpaths {
                search.push(prefix.join(subpath));
            }
            search.push(prefix);
        }

        let mut found = Vec::new();
        for dir in search {
            for dir in self.expand(&dir)? {
                found.extend(self.expand(&dir.join(name))?);
            }
        }

        tracing::trace!("find_file({name}) -> {found:?}");
        Ok(found)
    }

    pub fn find_header(
        &self,
        name: &str,
        subpaths: &[String],
        prefixes: &[Path],
    ) -> Result<Vec<Path>, BuildError> {
        let subpaths = if subpaths.is_empty() {
            alloc::vec!["include".into()]
        } else {
            subpaths
                .iter()
                .map(|s| Path::from("include").join(s).as_str().into())
                .collect()
        };
        self.find_file(name, &subpaths, prefixes)
    }

    fn library_subpaths(&self) -> Vec<&'static str> {
        if self.machine.is_64bit() {
            alloc::vec!["lib", "lib/x86_64-linux-gnu", "lib64"]
        } else {
            alloc::vec!["lib", "lib/i386-linux-gnu", "lib32"]
        }
    }

    pub fn library_extensions(&self, only_static: bool) -> &'static [&'static str] {
        if only_static {
            return &[".a"];
        }
        match self.machine.system {
            System::Darwin => &[".dylib", ".a"],
            System::Windows => &[".dll", ".a"],
            _ => &[".so", ".a"],
        }
    }

    /// Finds `lib<name>` with any of the platform's library extensions.
    ///
    /// With a version, versioned file names (`libz.1.2.dylib` on macOS,
    /// `libz.so.1.2` elsewhere) are listed ahead of the unversioned ones.
    pub fn find_library(
        &self,
        name: &str,
        version: Option<&str>,
        subpaths: &[String],
        prefixes: &[Path],
        only_static: bool,
    ) -> Result<Vec<Path>, BuildError> {
        let libpaths = self.library_subpaths();
        let subpaths: Vec<String> = if subpaths.is_empty() {
            libpaths.iter().map(|lp| String::from(*lp)).collect()
        } else {
            libpaths
                .iter()
                .flat_map(|lp| subpaths.iter().map(move |s| Path::from(lp).join(s)))
                .map(|p| p.as_str().into())
                .collect()
        };

        let extensions = self.library_extensions(only_static);
        let mut found = Vec::new();

        if let Some(version) = version.filter(|v| !v.is_empty()) {
            for ext in extensions {
                let libname = match self.machine.system {
                    System::Darwin => format!("lib{name}.{version}{ext}"),
                    _ => format!("lib{name}{ext}.{version}"),
                };
                found.extend(self.find_file(&libname, &subpaths, prefixes)?);
            }
        }

        for ext in extensions {
            let libname = format!("lib{name}{ext}");
            found.extend(self.find_file(&libname, &subpaths, prefixes)?);
        }

        tracing::debug!("find_library({name}) -> {} candidate(s)", found.len());
        Ok(found)
    }
}
