use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::manifest::DEFAULT_MANIFEST;

#[derive(Parser, Debug)]
#[command(name = "bob-build")]
#[command(about = "Resolves native dependencies and builds C++ python extensions")]
#[command(version)]
pub struct Args {
    /// Build manifest
    #[arg(short, long, value_name = "file", default_value = DEFAULT_MANIFEST, global = true)]
    pub manifest: PathBuf,

    /// Log debug messages (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Where to search, shared by the probing subcommands.
#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Additional prefix to search (can be used multiple times)
    #[arg(long = "prefix", value_name = "dir")]
    pub prefixes: Vec<String>,

    /// Subdirectory of each prefix to search (can be used multiple times)
    #[arg(long = "subpath", value_name = "dir")]
    pub subpaths: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build native libraries, then write the resolved extension descriptors
    Build {
        /// Build directory (overrides the manifest)
        #[arg(long, value_name = "dir")]
        build_dir: Option<PathBuf>,

        /// C++ compiler used for native libraries (overrides the manifest)
        #[arg(long, value_name = "cxx")]
        compiler: Option<String>,

        /// Write the descriptors here instead of stdout
        #[arg(short, long, value_name = "file")]
        output: Option<PathBuf>,
    },

    /// Print the resolved compiler and linker flags of one extension
    Flags {
        /// Qualified target name
        target: String,
    },

    /// List the libraries matching a name
    FindLibrary {
        name: String,

        /// Look for version-qualified file names first
        #[arg(long, value_name = "version")]
        lib_version: Option<String>,

        /// Only static archives
        #[arg(long = "static")]
        only_static: bool,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// List the headers matching a name
    FindHeader {
        name: String,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// List the files matching a name
    FindFile {
        name: String,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Print a normalized requirement list, one per line
    Normalize {
        #[arg(required = true)]
        requirements: Vec<String>,
    },

    /// Print a variable declared in a package's pkg-config file
    PkgVariable {
        package: String,

        /// Variable name, e.g. `libdir` or `prefix`
        variable: String,
    },

    /// Print the configuration and search prefixes
    Config,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let args = Args::parse_from(["bob-build", "-v", "build", "--compiler", "g++", "-o", "ext.json"]);
        assert!(args.verbose);
        assert_eq!(args.manifest, PathBuf::from(DEFAULT_MANIFEST));
        match args.command {
            Command::Build {
                build_dir,
                compiler,
                output,
            } => {
                assert_eq!(build_dir, None);
                assert_eq!(compiler.as_deref(), Some("g++"));
                assert_eq!(output, Some(PathBuf::from("ext.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_find_library() {
        let args = Args::parse_from([
            "bob-build",
            "find-library",
            "hdf5",
            "--static",
            "--prefix",
            "/opt/a",
            "--prefix",
            "/opt/b",
            "--manifest",
            "other.toml",
        ]);
        assert_eq!(args.manifest, PathBuf::from("other.toml"));
        match args.command {
            Command::FindLibrary {
                name,
                lib_version,
                only_static,
                search,
            } => {
                assert_eq!(name, "hdf5");
                assert_eq!(lib_version, None);
                assert!(only_static);
                assert_eq!(search.prefixes, vec!["/opt/a", "/opt/b"]);
                assert!(search.subpaths.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_pkg_variable() {
        let args = Args::parse_from(["bob-build", "pkg-variable", "hdf5", "libdir"]);
        match args.command {
            Command::PkgVariable { package, variable } => {
                assert_eq!(package, "hdf5");
                assert_eq!(variable, "libdir");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_normalize_needs_requirements() {
        Args::try_parse_from(["bob-build", "normalize"]).unwrap_err();
    }
}
