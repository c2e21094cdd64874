use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString as _};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::boost::Boost;
use crate::error::BuildError;
use crate::path::Path;
use crate::pkgconfig::{PackageQuery, PkgConfig, check_all};
use crate::probe::Probe;
use crate::requirement::{Requirement, normalize};
use crate::runtime::System;
use crate::sibling::get_bob_libraries;
use crate::utils::uniq;

/// A preprocessor definition, `-D<name>=<value>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Macro {
    pub name: String,
    pub value: String,
}

impl Macro {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Declarative description of a native extension and its dependencies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionSpec {
    /// Dotted module name, e.g. `bob.core._convert`.
    pub name: String,
    pub sources: Vec<Path>,
    pub version: Option<String>,
    /// pkg-config requirements, `boost` included.
    pub packages: Vec<String>,
    pub boost_modules: Vec<String>,
    /// Sibling packages whose headers and libraries are used.
    pub bob_packages: Vec<String>,
    pub include_dirs: Vec<Path>,
    pub system_include_dirs: Vec<Path>,
    pub libraries: Vec<String>,
    pub library_dirs: Vec<Path>,
    pub runtime_library_dirs: Vec<Path>,
    pub define_macros: Vec<Macro>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
}

impl ExtensionSpec {
    pub fn new(name: impl Into<String>, sources: impl IntoIterator<Item = impl Into<Path>>) -> Self {
        Self {
            name: name.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Fully resolved compile and link parameters of one extension module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extension {
    pub name: String,
    pub sources: Vec<Path>,
    pub include_dirs: Vec<Path>,
    pub library_dirs: Vec<Path>,
    pub libraries: Vec<String>,
    pub runtime_library_dirs: Vec<Path>,
    pub define_macros: Vec<Macro>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
    pub language: String,
}

/// What the resolved packages (Boost and pkg-config) contributed on their own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageFlags {
    pub include_dirs: Vec<Path>,
    pub libraries: Vec<String>,
    pub library_dirs: Vec<Path>,
    pub macros: Vec<Macro>,
    /// pkg-config compiler flags other than `-I`.
    pub compile_args: Vec<String>,
    /// pkg-config linker flags other than `-L` and `-l`.
    pub link_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub extension: Extension,
    pub packages: PackageFlags,
}

pub const LANGUAGE: &str = "c++";
pub const STD_FLAG: &str = "-std=c++0x";
const ISYSTEM: &str = "-isystem";

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblerOptions {
    /// Headers shipped with this toolkit, added to every extension.
    pub self_include_dir: Option<Path>,
    /// Major version of the Python the extensions are built for.
    pub python_major: u32,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            self_include_dir: None,
            python_major: 3,
        }
    }
}

/// Splits the Boost requirement out of an already normalized package list.
pub fn partition_boost(packages: Vec<String>) -> Result<(Option<Requirement>, Vec<String>), BuildError> {
    let mut boost = None;
    let mut rest = Vec::new();
    for package in packages {
        let requirement = Requirement::parse(&package)?;
        if requirement.name != "boost" {
            rest.push(package);
        } else if boost.is_some() {
            return Err(BuildError::DuplicateRequirement(requirement.name));
        } else {
            boost = Some(requirement);
        }
    }
    Ok((boost, rest))
}

/// Module prefix, module name, entry point and version of an extension.
pub fn self_macros(
    name: &str,
    version: Option<&str>,
    python_major: u32,
) -> Result<Vec<Macro>, BuildError> {
    let Some(version) = version else {
        return Ok(Vec::new());
    };
    let Some((prefix, module)) = name.rsplit_once('.') else {
        return Err(BuildError::InvalidTargetName(name.into()));
    };

    let entry = if python_major >= 3 {
        format!("PyInit_{module}")
    } else {
        format!("init{module}")
    };

    let mut macros = alloc::vec![
        Macro::new("BOB_EXT_MODULE_PREFIX", format!("\"{prefix}\"")),
        Macro::new("BOB_EXT_MODULE_NAME", format!("\"{module}\"")),
        Macro::new("BOB_EXT_ENTRY_NAME", entry),
    ];
    if !version.is_empty() {
        macros.push(Macro::new("BOB_EXT_MODULE_VERSION", format!("\"{version}\"")));
    }
    Ok(macros)
}

/// Moves every `-isystem <dir>` pair to the end of `args`, most specific
/// directory first.
///
/// Directories are sorted by decreasing length, ties in lexical order, so
/// generic ones such as `/usr/include` are consulted last.
pub fn reorganize_isystem(args: Vec<String>) -> Vec<String> {
    let mut remainder = Vec::new();
    let mut includes = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg != ISYSTEM {
            remainder.push(arg);
            continue;
        }
        match args.next() {
            Some(dir) => includes.push(dir),
            None => remainder.push(arg),
        }
    }

    let mut includes = uniq(includes);
    includes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    for dir in includes {
        remainder.push(ISYSTEM.into());
        remainder.push(dir);
    }
    remainder
}

/// Turns [`ExtensionSpec`]s into compile and link parameters.
pub struct FlagAssembler {
    probe: Probe,
    options: AssemblerOptions,
    query: RefCell<Option<Rc<dyn PackageQuery>>>,
}

impl FlagAssembler {
    pub fn new(probe: Probe, options: AssemblerOptions) -> Self {
        Self {
            probe,
            options,
            query: RefCell::new(None),
        }
    }

    /// Resolves packages through `query` instead of `pkg-config`.
    pub fn with_package_query(self, query: Rc<dyn PackageQuery>) -> Self {
        *self.query.borrow_mut() = Some(query);
        self
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    fn package_query(&self) -> Result<Rc<dyn PackageQuery>, BuildError> {
        if let Some(query) = self.query.borrow().as_ref() {
            return Ok(query.clone());
        }
        let runtime = self.probe.runtime_rc();
        let query: Rc<dyn PackageQuery> = Rc::new(PkgConfig::new(runtime, self.probe.config())?);
        *self.query.borrow_mut() = Some(query.clone());
        Ok(query)
    }

    /// Assembles every spec independently; a failure only affects its own target.
    pub fn build_all<'a>(
        &self,
        specs: impl IntoIterator<Item = &'a ExtensionSpec>,
    ) -> Vec<Result<Assembled, BuildError>> {
        specs.into_iter().map(|spec| self.build(spec)).collect()
    }

    pub fn build(&self, spec: &ExtensionSpec) -> Result<Assembled, BuildError> {
        tracing::debug!("Assembling flags for {}", spec.name);
        let system = &self.probe.machine().system;

        let packages = spec
            .packages
            .iter()
            .map(|p| p.trim().to_lowercase())
            .collect::<Vec<_>>();
        let packages = normalize(&packages)?;

        let siblings = get_bob_libraries(&self.probe, &spec.bob_packages)?;
        let mut system_includes = spec.system_include_dirs.clone();

        let (boost_req, packages) = partition_boost(packages)?;
        let boost_req = match boost_req {
            Some(req) => Some(req),
            None if !spec.boost_modules.is_empty() => Some(Requirement::parse("boost >= 1.0")?),
            None => None,
        };

        let mut define_macros = self_macros(
            &spec.name,
            spec.version.as_deref(),
            self.options.python_major,
        )?;
        let mut extra_compile_args = alloc::vec![STD_FLAG.to_string()];
        if *system == System::Darwin {
            extra_compile_args.push("-Wno-#warnings".into());
        }
        let mut library_dirs = Vec::new();
        let mut libraries = siblings.libraries.clone();

        let user_includes = &spec.include_dirs;
        let mut pkg = PackageFlags::default();

        if let Some(req) = boost_req {
            let boost = Boost::new(&self.probe, &req)?;
            define_macros.extend(boost.macros());

            // the headers alone are enough for the template libraries
            let include_dir = boost.include_directory();
            if !user_includes.contains(include_dir) {
                system_includes.push(include_dir.clone());
                pkg.include_dirs.push(include_dir.clone());
            }

            if !spec.boost_modules.is_empty() {
                let (dirs, libs) = boost.libconfig(&spec.boost_modules)?;
                library_dirs.extend(dirs.iter().cloned());
                pkg.library_dirs.extend(dirs);
                libraries.extend(libs.iter().cloned());
                pkg.libraries.extend(libs);
            }
        }

        let resolved = if packages.is_empty() {
            Vec::new()
        } else {
            check_all(self.package_query()?.as_ref(), &packages)?
        };

        for package in resolved {
            let macros = package.package_macros();
            define_macros.extend(macros.iter().cloned());
            pkg.macros.extend(macros);

            for dir in package.include_directories() {
                if user_includes.contains(dir) || pkg.include_dirs.contains(dir) {
                    continue;
                }
                system_includes.push(dir.clone());
                pkg.include_dirs.push(dir.clone());
            }

            library_dirs.extend(package.library_directories().iter().cloned());
            pkg.library_dirs
                .extend(package.library_directories().iter().cloned());

            let libs = if package.is_sibling_family() {
                package.versioned_libraries(system)?
            } else {
                package.libraries().to_vec()
            };
            libraries.extend(libs.iter().cloned());
            pkg.libraries.extend(libs);

            pkg.compile_args
                .extend(package.other_cflags().iter().cloned());
            pkg.link_args
                .extend(package.other_libraries().iter().cloned());
        }

        extra_compile_args.extend(uniq(pkg.compile_args.iter().cloned()));
        for dir in system_includes {
            extra_compile_args.push(ISYSTEM.into());
            extra_compile_args.push(dir.as_str().into());
        }

        // ours first, then whatever the caller declared
        let define_macros = uniq(define_macros.into_iter().chain(spec.define_macros.iter().cloned()));
        let libraries = uniq(libraries.into_iter().chain(spec.libraries.iter().cloned()));
        let mut library_dirs = uniq(library_dirs.into_iter().chain(spec.library_dirs.iter().cloned()));
        extra_compile_args.extend(spec.extra_compile_args.iter().cloned());
        let extra_compile_args = reorganize_isystem(extra_compile_args);
        let extra_link_args = uniq(pkg.link_args.iter().chain(&spec.extra_link_args).cloned());

        // sibling headers take precedence over everything else
        let include_dirs = uniq(
            siblings
                .include_dirs
                .iter()
                .chain(user_includes)
                .chain(&self.options.self_include_dir)
                .cloned(),
        );

        let runtime_library_dirs = if *system == System::Linux {
            uniq(spec.runtime_library_dirs.iter().chain(&library_dirs).cloned())
        } else {
            spec.runtime_library_dirs.clone()
        };

        // sibling libraries are found through their package, not through rpath
        library_dirs.extend(siblings.library_dirs);

        let extension = Extension {
            name: spec.name.clone(),
            sources: spec.sources.clone(),
            include_dirs,
            library_dirs,
            libraries,
            runtime_library_dirs,
            define_macros,
            extra_compile_args,
            extra_link_args,
            language: LANGUAGE.into(),
        };

        Ok(Assembled {
            extension,
            packages: pkg,
        })
    }
}
