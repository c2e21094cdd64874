use alloc::string::String;
use alloc::vec::Vec;

use crate::cmake::CMakeLists;
use crate::error::{BuildError, BuildPhase, ErrorContext};
use crate::flags::{ExtensionSpec, FlagAssembler, Macro};
use crate::path::Path;
use crate::runtime::{Command, Runtime};
use crate::sibling::get_bob_libraries;
use crate::utils::uniq;

/// Declarative inputs of a native shared library built before the extensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibrarySpec {
    /// Qualified name, e.g. `bob.io.base.bob_io_base`; the leaf is the library name.
    pub name: String,
    pub sources: Vec<Path>,
    pub version: String,
    pub bob_packages: Vec<String>,
    pub packages: Vec<String>,
    pub boost_modules: Vec<String>,
    pub include_dirs: Vec<Path>,
    pub system_include_dirs: Vec<Path>,
    pub libraries: Vec<String>,
    pub library_dirs: Vec<Path>,
    pub define_macros: Vec<Macro>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Library(LibrarySpec),
    Extension(ExtensionSpec),
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Library(spec) => &spec.name,
            Target::Extension(spec) => &spec.name,
        }
    }
}

/// A [`LibrarySpec`] with every dependency resolved, ready to be compiled with CMake.
#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    name: String,
    leaf_name: String,
    package_dir: Path,
    target_dir: Path,
    cmake: Path,
    lists: CMakeLists,
}

impl Library {
    pub fn new(assembler: &FlagAssembler, spec: &LibrarySpec) -> Result<Self, BuildError> {
        let Some((parent, leaf)) = spec.name.rsplit_once('.') else {
            return Err(BuildError::InvalidTargetName(spec.name.clone()));
        };

        let probe = assembler.probe();
        let runtime = probe.runtime();
        let package_dir = runtime
            .current_dir()
            .context_runtime("Failed to get the package directory")?;
        let target_dir = package_dir.join_all(parent.split('.'));

        let siblings = get_bob_libraries(probe, &spec.bob_packages)?;

        let cmake = runtime
            .find_program("cmake")
            .map_err(|_| BuildError::ToolNotFound("cmake".into()))?;

        let packages = assembler
            .build(&ExtensionSpec {
                packages: spec.packages.clone(),
                boost_modules: spec.boost_modules.clone(),
                ..ExtensionSpec::new(spec.name.as_str(), spec.sources.iter().cloned())
            })?
            .packages;

        let include_dirs = siblings
            .include_dirs
            .into_iter()
            .chain([target_dir.join("include")])
            .chain(spec.include_dirs.iter().cloned());
        let system_include_dirs = spec
            .system_include_dirs
            .iter()
            .cloned()
            .chain(packages.include_dirs);
        let libraries = siblings
            .libraries
            .into_iter()
            .chain(spec.libraries.iter().cloned())
            .chain(packages.libraries);
        let library_dirs = siblings
            .library_dirs
            .into_iter()
            .chain(spec.library_dirs.iter().cloned())
            .chain(packages.library_dirs);
        let macros = spec.define_macros.iter().cloned().chain(packages.macros);

        let lists = CMakeLists {
            name: leaf.into(),
            sources: spec.sources.clone(),
            target_directory: target_dir.clone(),
            version: spec.version.clone(),
            include_directories: uniq(include_dirs),
            system_include_directories: uniq(system_include_dirs),
            libraries: uniq(libraries),
            library_directories: uniq(library_dirs),
            macros: uniq(macros),
            compile_flags: uniq(packages.compile_args),
            link_flags: uniq(packages.link_args),
        };

        Ok(Self {
            name: spec.name.clone(),
            leaf_name: leaf.into(),
            package_dir,
            target_dir,
            cmake,
            lists,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name the library is linked with, the last component of the qualified name.
    pub fn leaf_name(&self) -> &str {
        &self.leaf_name
    }

    pub fn package_directory(&self) -> &Path {
        &self.package_dir
    }

    /// Where the compiled library is placed.
    pub fn target_directory(&self) -> &Path {
        &self.target_dir
    }

    pub fn include_directory(&self) -> Path {
        self.target_dir.join("include")
    }

    pub fn cmake_lists(&self) -> &CMakeLists {
        &self.lists
    }

    fn run(
        &self,
        runtime: &dyn Runtime,
        cmd: Command,
        phase: BuildPhase,
    ) -> Result<(), BuildError> {
        tracing::info!("Running {} ({phase}) for {}", cmd.program, self.name);
        let output = runtime
            .run_command(&cmd)
            .with_context_runtime(|| alloc::format!("Failed to run {}", cmd.program))?;
        if !output.success() {
            return Err(BuildError::NativeBuildFailed {
                target: self.name.clone(),
                phase,
            });
        }
        Ok(())
    }

    /// Writes `CMakeLists.txt` into the package directory, then configures
    /// and builds it inside `build_dir`.
    pub fn compile(
        &self,
        runtime: &dyn Runtime,
        build_dir: &Path,
        compiler: Option<&str>,
    ) -> Result<(), BuildError> {
        let lists_path = self.package_dir.join("CMakeLists.txt");
        runtime
            .write_file(&lists_path, self.lists.generate().as_bytes())
            .with_context_runtime(|| alloc::format!("Failed to write {lists_path}"))?;

        let with_env = |mut cmd: Command| {
            cmd = cmd
                .cwd(build_dir.clone())
                .default_env("VERBOSE", "1")
                .inherit_output();
            if let Some(compiler) = compiler {
                cmd = cmd.env("CXX", compiler);
            }
            cmd
        };

        let configure = with_env(Command::new(self.cmake.clone()).arg(self.package_dir.as_str()));
        self.run(runtime, configure, BuildPhase::Configure)?;

        let make = runtime
            .find_program("make")
            .map_err(|_| BuildError::ToolNotFound("make".into()))?;
        self.run(runtime, with_env(Command::new(make)), BuildPhase::Compile)
    }
}
