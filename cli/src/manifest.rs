//! `bob.toml` build manifest.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use bob_extension::path::Path as BobPath;
use bob_extension::{ExtensionSpec, LibrarySpec, Macro, Target};
use serde::Deserialize;

pub const DEFAULT_MANIFEST: &str = "bob.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Manifest {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BuildSection {
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    pub compiler: Option<String>,
    /// Searched after `BOB_PREFIX_PATH` and before the system prefixes.
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Roots holding installed sibling packages.
    #[serde(default)]
    pub package_roots: Vec<PathBuf>,
    pub self_include_dir: Option<String>,
    #[serde(default = "default_python_major")]
    pub python_major: u32,
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_python_major() -> u32 {
    3
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            compiler: None,
            prefixes: Vec::new(),
            package_roots: Vec::new(),
            self_include_dir: None,
            python_major: default_python_major(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetEntry {
    Library(LibraryEntry),
    Extension(ExtensionEntry),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LibraryEntry {
    pub name: String,
    pub sources: Vec<String>,
    pub version: String,
    #[serde(default)]
    pub bob_packages: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub boost_modules: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub system_include_dirs: Vec<String>,
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub library_dirs: Vec<String>,
    #[serde(default)]
    pub define_macros: Vec<(String, String)>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExtensionEntry {
    pub name: String,
    pub sources: Vec<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub bob_packages: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub boost_modules: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub system_include_dirs: Vec<String>,
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub library_dirs: Vec<String>,
    #[serde(default)]
    pub runtime_library_dirs: Vec<String>,
    #[serde(default)]
    pub define_macros: Vec<(String, String)>,
    #[serde(default)]
    pub extra_compile_args: Vec<String>,
    #[serde(default)]
    pub extra_link_args: Vec<String>,
}

fn paths(items: &[String]) -> Vec<BobPath> {
    items.iter().map(BobPath::from).collect()
}

fn macros(items: &[(String, String)]) -> Vec<Macro> {
    items
        .iter()
        .map(|(name, value)| Macro::new(name.as_str(), value.as_str()))
        .collect()
}

impl TargetEntry {
    pub fn name(&self) -> &str {
        match self {
            TargetEntry::Library(entry) => &entry.name,
            TargetEntry::Extension(entry) => &entry.name,
        }
    }

    pub fn to_target(&self) -> Target {
        match self {
            TargetEntry::Library(entry) => Target::Library(LibrarySpec {
                name: entry.name.clone(),
                sources: paths(&entry.sources),
                version: entry.version.clone(),
                bob_packages: entry.bob_packages.clone(),
                packages: entry.packages.clone(),
                boost_modules: entry.boost_modules.clone(),
                include_dirs: paths(&entry.include_dirs),
                system_include_dirs: paths(&entry.system_include_dirs),
                libraries: entry.libraries.clone(),
                library_dirs: paths(&entry.library_dirs),
                define_macros: macros(&entry.define_macros),
            }),
            TargetEntry::Extension(entry) => Target::Extension(ExtensionSpec {
                name: entry.name.clone(),
                sources: paths(&entry.sources),
                version: entry.version.clone(),
                packages: entry.packages.clone(),
                boost_modules: entry.boost_modules.clone(),
                bob_packages: entry.bob_packages.clone(),
                include_dirs: paths(&entry.include_dirs),
                system_include_dirs: paths(&entry.system_include_dirs),
                libraries: entry.libraries.clone(),
                library_dirs: paths(&entry.library_dirs),
                runtime_library_dirs: paths(&entry.runtime_library_dirs),
                define_macros: macros(&entry.define_macros),
                extra_compile_args: entry.extra_compile_args.clone(),
                extra_link_args: entry.extra_link_args.clone(),
            }),
        }
    }
}

impl Manifest {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn targets(&self) -> Vec<Target> {
        self.targets.iter().map(TargetEntry::to_target).collect()
    }

    pub fn target(&self, name: &str) -> Option<&TargetEntry> {
        self.targets.iter().find(|t| t.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[build]
build_dir = "out"
compiler = "clang++"
prefixes = ["/opt/bob"]

[[target]]
kind = "library"
name = "bob.io.base.bob_io_base"
sources = ["bob/io/base/cpp/File.cpp"]
version = "2.0.1"
packages = ["hdf5 >= 1.8"]
define_macros = [["NDEBUG", "1"]]

[[target]]
kind = "extension"
name = "bob.io.base._library"
sources = ["bob/io/base/main.cpp"]
version = "2.0.1"
bob_packages = ["bob.core"]
boost_modules = ["system"]
extra_link_args = ["-Wl,--as-needed"]
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.build.build_dir, PathBuf::from("out"));
        assert_eq!(manifest.build.compiler.as_deref(), Some("clang++"));
        assert_eq!(manifest.build.python_major, 3);
        assert_eq!(manifest.targets.len(), 2);

        let targets = manifest.targets();
        let Target::Library(lib) = &targets[0] else {
            panic!("expected a library target");
        };
        assert_eq!(lib.version, "2.0.1");
        assert_eq!(lib.define_macros, vec![Macro::new("NDEBUG", "1")]);

        let Target::Extension(ext) = &targets[1] else {
            panic!("expected an extension target");
        };
        assert_eq!(ext.bob_packages, vec!["bob.core"]);
        assert_eq!(ext.sources, vec![BobPath::from("bob/io/base/main.cpp")]);
        assert_eq!(ext.extra_link_args, vec!["-Wl,--as-needed"]);

        assert!(manifest.target("bob.io.base._library").is_some());
        assert!(manifest.target("bob.io.base._missing").is_none());
    }

    #[test]
    fn test_defaults_and_errors() {
        let manifest = Manifest::parse("").unwrap();
        assert_eq!(manifest.build, BuildSection::default());
        assert!(manifest.targets.is_empty());

        let unknown_kind = "[[target]]\nkind = \"program\"\nname = \"a.b\"\nsources = []\n";
        Manifest::parse(unknown_kind).unwrap_err();

        let library_without_version = "[[target]]\nkind = \"library\"\nname = \"a.b\"\nsources = []\n";
        Manifest::parse(library_without_version).unwrap_err();
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_MANIFEST);
        fs::write(&path, MANIFEST).unwrap();
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.targets[0].name(), "bob.io.base.bob_io_base");

        let err = Manifest::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read manifest"));
    }
}
