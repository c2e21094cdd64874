use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{BuildError, ErrorContext};
use crate::flags::{Extension, ExtensionSpec, FlagAssembler};
use crate::path::Path;
use crate::steps::BuildSteps;
use crate::target::{Library, LibrarySpec, Target};
use crate::utils::uniq;

/// Outputs of the native libraries built so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltLibraries {
    pub libraries: Vec<String>,
    pub library_dirs: Vec<Path>,
    pub include_dirs: Vec<Path>,
}

impl BuiltLibraries {
    fn record(&mut self, library: &Library) {
        self.libraries.push(library.leaf_name().into());
        self.library_dirs.push(library.target_directory().clone());
        self.include_dirs.push(library.include_directory());
    }

    /// Puts the built libraries ahead of whatever the extension already uses.
    pub fn prepend_to(&self, extension: &mut Extension) {
        let prepend = |built: &[Path], own: &mut Vec<Path>| {
            *own = uniq(built.iter().chain(own.iter()).cloned());
        };
        prepend(&self.library_dirs, &mut extension.library_dirs);
        prepend(&self.include_dirs, &mut extension.include_dirs);
        extension.libraries = uniq(self.libraries.iter().chain(&extension.libraries).cloned());
    }
}

/// Two-phase build: native libraries with CMake first, then the extensions
/// that may link against them.
pub struct BuildExt {
    assembler: FlagAssembler,
    steps: Rc<dyn BuildSteps>,
    build_dir: Path,
    compiler: Option<String>,
}

impl BuildExt {
    pub fn new(assembler: FlagAssembler, steps: impl BuildSteps, build_dir: impl Into<Path>) -> Self {
        Self {
            assembler,
            steps: Rc::new(steps),
            build_dir: build_dir.into(),
            compiler: None,
        }
    }

    /// C++ compiler handed to CMake through `CXX`.
    pub fn compiler(&mut self, compiler: impl Into<String>) -> &mut Self {
        self.compiler = Some(compiler.into());
        self
    }

    pub fn assembler(&self) -> &FlagAssembler {
        &self.assembler
    }

    /// Configures and builds every library in declaration order; the first
    /// failure stops the batch.
    pub fn build_libraries<'a>(
        &self,
        specs: impl IntoIterator<Item = &'a LibrarySpec>,
    ) -> Result<BuiltLibraries, BuildError> {
        let runtime = self.assembler.probe().runtime();
        let mut built = BuiltLibraries::default();

        for spec in specs {
            let library = Library::new(&self.assembler, spec)?;
            let build_dir = self.build_dir.join(library.name());
            runtime
                .create_dir_all(&build_dir)
                .with_context_runtime(|| alloc::format!("Failed to create {build_dir}"))?;

            library.compile(runtime, &build_dir, self.compiler.as_deref())?;
            tracing::info!(
                "Built lib{} into {}",
                library.leaf_name(),
                library.target_directory()
            );
            built.record(&library);
        }

        Ok(built)
    }

    /// Resolves the flags of every extension and links in the built libraries.
    ///
    /// Each extension is resolved on its own: the ones that fail are returned
    /// by name next to the ones that succeeded.
    pub fn prepare_extensions<'a>(
        &self,
        specs: impl IntoIterator<Item = &'a ExtensionSpec>,
        built: &BuiltLibraries,
    ) -> (Vec<Extension>, Vec<(String, BuildError)>) {
        let specs = specs.into_iter().collect::<Vec<_>>();
        let results = self.assembler.build_all(specs.iter().copied());

        let mut extensions = Vec::new();
        let mut failures = Vec::new();
        for (spec, result) in specs.into_iter().zip(results) {
            match result {
                Ok(assembled) => {
                    let mut extension = assembled.extension;
                    built.prepend_to(&mut extension);
                    extensions.push(extension);
                }
                Err(err) => {
                    tracing::error!("Cannot resolve {}: {err}", spec.name);
                    failures.push((spec.name.clone(), err));
                }
            }
        }
        (extensions, failures)
    }

    /// Runs both phases and returns the extensions handed to the build steps.
    ///
    /// A library failure stops the run. An extension that cannot be resolved
    /// only drops that extension: the rest are still built, and the failures
    /// are reported afterwards as [`BuildError::ExtensionsFailed`].
    pub fn run(&self, targets: &[Target]) -> anyhow::Result<Vec<Extension>> {
        let libraries = targets.iter().filter_map(|t| match t {
            Target::Library(spec) => Some(spec),
            Target::Extension(_) => None,
        });
        let extensions = targets.iter().filter_map(|t| match t {
            Target::Extension(spec) => Some(spec),
            Target::Library(_) => None,
        });

        let built = self.build_libraries(libraries)?;
        let (extensions, failures) = self.prepare_extensions(extensions, &built);

        tracing::info!("Building {} extension(s)", extensions.len());
        self.steps.build_extensions(&extensions)?;

        if !failures.is_empty() {
            return Err(BuildError::ExtensionsFailed(failures).into());
        }
        Ok(extensions)
    }
}
