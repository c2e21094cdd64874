use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString as _};
use alloc::vec::Vec;
use core::cmp::Ordering;

use hashbrown::HashSet;

use crate::error::{BuildError, ErrorContext, bail_runtime_error};
use crate::flags::Macro;
use crate::path::Path;
use crate::probe::SearchConfig;
use crate::requirement::Requirement;
use crate::runtime::{Command, Runtime, System};
use crate::utils::uniq;
use crate::version::LooseVersion;

/// A package located on the system, with everything needed to compile and
/// link against it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPackage {
    name: String,
    version: LooseVersion,
    include_dirs: Vec<Path>,
    libraries: Vec<String>,
    library_dirs: Vec<Path>,
    other_cflags: Vec<String>,
    other_libraries: Vec<String>,
}

impl ResolvedPackage {
    pub fn new(name: impl Into<String>, version: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            version: LooseVersion::parse(version),
            include_dirs: Vec::new(),
            libraries: Vec::new(),
            library_dirs: Vec::new(),
            other_cflags: Vec::new(),
            other_libraries: Vec::new(),
        }
    }

    pub fn with_include_dirs<I: IntoIterator<Item = impl Into<Path>>>(mut self, dirs: I) -> Self {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn with_libraries<I: IntoIterator<Item = impl Into<String>>>(mut self, libs: I) -> Self {
        self.libraries.extend(libs.into_iter().map(Into::into));
        self
    }

    pub fn with_library_dirs<I: IntoIterator<Item = impl Into<Path>>>(mut self, dirs: I) -> Self {
        self.library_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn with_other_cflags<I: IntoIterator<Item = impl Into<String>>>(mut self, flags: I) -> Self {
        self.other_cflags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn with_other_libraries<I: IntoIterator<Item = impl Into<String>>>(mut self, flags: I) -> Self {
        self.other_libraries.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &LooseVersion {
        &self.version
    }

    pub fn include_directories(&self) -> &[Path] {
        &self.include_dirs
    }

    pub fn library_directories(&self) -> &[Path] {
        &self.library_dirs
    }

    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    pub fn other_cflags(&self) -> &[String] {
        &self.other_cflags
    }

    pub fn other_libraries(&self) -> &[String] {
        &self.other_libraries
    }

    /// `HAVE_<NAME>=1` and `<NAME>_VERSION="<version>"`.
    pub fn package_macros(&self) -> Vec<Macro> {
        let name = self.name.replace(['-', '.'], "_").to_uppercase();
        alloc::vec![
            Macro::new(format!("HAVE_{name}"), "1"),
            Macro::new(format!("{name}_VERSION"), format!("\"{}\"", self.version)),
        ]
    }

    /// Whether this is one of the family's own pkg-config packages (`bob-*`).
    pub fn is_sibling_family(&self) -> bool {
        self.name.starts_with("bob-")
    }

    /// Link names of a family package, qualified with its version so the
    /// exact shared object gets picked up.
    pub fn versioned_libraries(&self, system: &System) -> Result<Vec<String>, BuildError> {
        let version = &self.version;
        match system {
            System::Darwin => Ok(self
                .libraries
                .iter()
                .map(|lib| format!("{lib}.{version}"))
                .collect()),
            System::Linux => Ok(self
                .libraries
                .iter()
                .map(|lib| format!(":lib{lib}.so.{version}"))
                .collect()),
            other => Err(BuildError::UnsupportedPlatform(format!(
                "versioned libraries of `{}' can only be linked on macOS and Linux, not {other:?}",
                self.name
            ))),
        }
    }

    pub fn satisfies(&self, requirement: &Requirement) -> bool {
        requirement.is_satisfied_by(&self.version)
    }
}

impl PartialEq<&str> for ResolvedPackage {
    fn eq(&self, other: &&str) -> bool {
        self.version == LooseVersion::parse(other)
    }
}

impl PartialOrd<&str> for ResolvedPackage {
    fn partial_cmp(&self, other: &&str) -> Option<Ordering> {
        Some(self.version.cmp(&LooseVersion::parse(other)))
    }
}

/// Resolves a package name into compiler and linker metadata.
pub trait PackageQuery {
    fn query(&self, name: &str) -> Result<ResolvedPackage, BuildError>;
}

/// [`PackageQuery`] backed by the `pkg-config` executable.
pub struct PkgConfig {
    runtime: Rc<dyn Runtime>,
    program: Path,
    search_path: Option<String>,
}

impl PkgConfig {
    pub fn new(runtime: Rc<dyn Runtime>, config: &SearchConfig) -> Result<Self, BuildError> {
        let program = runtime
            .find_program("pkg-config")
            .map_err(|_| BuildError::ToolNotFound("pkg-config".into()))?;

        let separator = runtime
            .host_machine()
            .context_runtime("Failed to detect host machine")?
            .system
            .path_list_separator();

        // prefixes from the environment also hold .pc files
        let mut search = config
            .env_prefixes
            .iter()
            .map(|p| p.join("lib/pkgconfig").as_str().to_string())
            .collect::<Vec<_>>();
        let search_path = if search.is_empty() {
            None
        } else {
            search.extend(runtime.get_env("PKG_CONFIG_PATH"));
            Some(search.join(&separator.to_string()))
        };

        Ok(Self {
            runtime,
            program,
            search_path,
        })
    }

    fn run(&self, flag: &str, name: &str) -> Result<Option<String>, BuildError> {
        let mut cmd = Command::new(self.program.clone()).args([flag, name]);
        if let Some(search_path) = &self.search_path {
            cmd = cmd.env("PKG_CONFIG_PATH", search_path.as_str());
        }
        let output = self
            .runtime
            .run_command(&cmd)
            .with_context_runtime(|| format!("Failed to run pkg-config {flag} {name}"))?;
        if !output.success() {
            tracing::debug!("pkg-config {flag} {name} failed: {}", output.stderr.trim());
            return Ok(None);
        }
        Ok(Some(output.stdout.trim().to_string()))
    }

    fn flags(&self, flag: &str, name: &str) -> Result<Vec<String>, BuildError> {
        let Some(output) = self.run(flag, name)? else {
            bail_runtime_error!("pkg-config {} {} exited with an error", flag, name);
        };
        Ok(output.split_whitespace().map(String::from).collect())
    }

    fn stripped(&self, flag: &str, name: &str, prefix: &str) -> Result<Vec<String>, BuildError> {
        Ok(self
            .flags(flag, name)?
            .into_iter()
            .map(|f| f.strip_prefix(prefix).map(String::from).unwrap_or(f))
            .collect())
    }

    /// Value of a variable declared in the package's `.pc` file.
    pub fn variable(&self, name: &str, variable: &str) -> Result<String, BuildError> {
        self.run(&format!("--variable={variable}"), name)?
            .ok_or_else(|| BuildError::PackageNotFound(name.into()))
    }
}

impl PackageQuery for PkgConfig {
    fn query(&self, name: &str) -> Result<ResolvedPackage, BuildError> {
        let Some(version) = self.run("--modversion", name)? else {
            return Err(BuildError::PackageNotFound(name.into()));
        };

        let package = ResolvedPackage {
            name: name.into(),
            version: LooseVersion::parse(&version),
            include_dirs: uniq(self.stripped("--cflags-only-I", name, "-I")?)
                .into_iter()
                .map(Path::from)
                .collect(),
            libraries: uniq(self.stripped("--libs-only-l", name, "-l")?),
            library_dirs: uniq(self.stripped("--libs-only-L", name, "-L")?)
                .into_iter()
                .map(Path::from)
                .collect(),
            other_cflags: self.flags("--cflags-only-other", name)?,
            other_libraries: self.flags("--libs-only-other", name)?,
        };

        tracing::debug!("pkg-config: found {name} {version}");
        Ok(package)
    }
}

/// Resolves every requirement and checks its version constraint.
///
/// A package may only be named once per call, whatever its constraints;
/// recurring requirements are rejected with
/// [`BuildError::DuplicateRequirement`].
pub fn check_all<S: AsRef<str>>(
    query: &dyn PackageQuery,
    requirements: &[S],
) -> Result<Vec<ResolvedPackage>, BuildError> {
    let mut used = HashSet::new();
    let mut resolved = Vec::new();

    for requirement in uniq(requirements.iter().map(|r| r.as_ref())) {
        let requirement = Requirement::parse(requirement)?;

        if !used.insert(requirement.name.clone()) {
            return Err(BuildError::DuplicateRequirement(requirement.name));
        }

        let package = query.query(&requirement.name)?;
        if !package.satisfies(&requirement) {
            return Err(BuildError::UnsatisfiedRequirement {
                requirement: requirement.to_string(),
                found: package.version().to_string(),
            });
        }

        resolved.push(package);
    }

    Ok(resolved)
}
