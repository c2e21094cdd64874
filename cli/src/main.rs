use std::io;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context as _;
use bob_extension::path::Path as BobPath;
use bob_extension::pkgconfig::PkgConfig;
use bob_extension::target::Library;
use bob_extension::{AssemblerOptions, BuildExt, FlagAssembler, Probe, SearchConfig, Target};
use tracing_subscriber::EnvFilter;

mod cli;
mod manifest;
mod runtime;
mod steps;

use cli::{Command, SearchArgs};
use manifest::{BuildSection, Manifest};
use runtime::Host;
use steps::JsonSteps;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// The manifest if there is one; probing commands also work without it.
fn load_optional(path: &Path) -> anyhow::Result<Manifest> {
    if path.exists() {
        Manifest::load(path)
    } else {
        tracing::debug!("No manifest at {}, using defaults", path.display());
        Ok(Manifest::parse("")?)
    }
}

fn probe(build: &BuildSection) -> anyhow::Result<Probe> {
    let host = Host::new(build.package_roots.clone());
    let mut config = SearchConfig::from_runtime(&host)?;
    config.default_prefixes = build
        .prefixes
        .iter()
        .map(BobPath::from)
        .chain(config.default_prefixes)
        .collect();
    Ok(Probe::new(Rc::new(host), config)?)
}

fn assembler(build: &BuildSection) -> anyhow::Result<FlagAssembler> {
    let options = AssemblerOptions {
        self_include_dir: build.self_include_dir.as_deref().map(BobPath::from),
        python_major: build.python_major,
    };
    Ok(FlagAssembler::new(probe(build)?, options))
}

fn search_prefixes(search: &SearchArgs) -> Vec<BobPath> {
    search.prefixes.iter().map(BobPath::from).collect()
}

fn print_paths(paths: &[BobPath]) {
    for path in paths {
        println!("{path}");
    }
}

fn build(
    manifest: &Manifest,
    build_dir: Option<&Path>,
    compiler: Option<String>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let build_dir = build_dir.unwrap_or(&manifest.build.build_dir);
    let steps = JsonSteps::new(output.map(Path::to_path_buf));

    let mut build_ext = BuildExt::new(
        assembler(&manifest.build)?,
        steps,
        BobPath::from(build_dir.to_string_lossy()),
    );
    if let Some(compiler) = compiler.or_else(|| manifest.build.compiler.clone()) {
        build_ext.compiler(compiler);
    }

    let extensions = build_ext.run(&manifest.targets())?;
    tracing::info!("Resolved {} extension(s)", extensions.len());
    Ok(())
}

fn flags(manifest: &Manifest, name: &str) -> anyhow::Result<()> {
    let entry = manifest
        .target(name)
        .with_context(|| format!("No target named {name} in the manifest"))?;
    let assembler = assembler(&manifest.build)?;

    match entry.to_target() {
        Target::Extension(spec) => {
            let extension = assembler.build(&spec)?.extension;
            println!("{}", steps::to_json(&[extension])?);
        }
        Target::Library(spec) => {
            let library = Library::new(&assembler, &spec)?;
            print!("{}", library.cmake_lists().generate());
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = cli::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Build {
            build_dir,
            compiler,
            output,
        } => {
            let manifest = Manifest::load(&args.manifest)?;
            build(&manifest, build_dir.as_deref(), compiler, output.as_deref())?;
        }
        Command::Flags { target } => {
            let manifest = Manifest::load(&args.manifest)?;
            flags(&manifest, &target)?;
        }
        Command::FindLibrary {
            name,
            lib_version,
            only_static,
            search,
        } => {
            let probe = probe(&load_optional(&args.manifest)?.build)?;
            let found = probe.find_library(
                &name,
                lib_version.as_deref(),
                &search.subpaths,
                &search_prefixes(&search),
                only_static,
            )?;
            print_paths(&found);
        }
        Command::FindHeader { name, search } => {
            let probe = probe(&load_optional(&args.manifest)?.build)?;
            print_paths(&probe.find_header(&name, &search.subpaths, &search_prefixes(&search))?);
        }
        Command::FindFile { name, search } => {
            let probe = probe(&load_optional(&args.manifest)?.build)?;
            print_paths(&probe.find_file(&name, &search.subpaths, &search_prefixes(&search))?);
        }
        Command::Normalize { requirements } => {
            for requirement in bob_extension::normalize(&requirements)? {
                println!("{requirement}");
            }
        }
        Command::PkgVariable { package, variable } => {
            let probe = probe(&load_optional(&args.manifest)?.build)?;
            let pkg_config = PkgConfig::new(probe.runtime_rc(), probe.config())?;
            println!("{}", pkg_config.variable(&package, &variable)?);
        }
        Command::Config => {
            let probe = probe(&load_optional(&args.manifest)?.build)?;
            println!("{}", bob_extension::get_config(&probe)?);
        }
    }

    Ok(())
}
