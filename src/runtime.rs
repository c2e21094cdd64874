use alloc::string::String;
use alloc::vec::Vec;

use crate::path::Path;

pub type Result<T> = anyhow::Result<T>;

/// Operating system family, as far as library naming is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum System {
    Linux,
    Darwin,
    Windows,
    Other(String),
}

impl System {
    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => System::Linux,
            "macos" | "darwin" => System::Darwin,
            "windows" | "win32" => System::Windows,
            other => System::Other(other.into()),
        }
    }

    /// Separator used by list-valued environment variables such as `BOB_PREFIX_PATH`.
    pub fn path_list_separator(&self) -> char {
        match self {
            System::Windows => ';',
            _ => ':',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInfo {
    pub system: System,
    pub pointer_width: u32,
}

impl MachineInfo {
    pub fn is_64bit(&self) -> bool {
        self.pointer_width >= 64
    }
}

/// A subprocess invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub program: Path,
    pub args: Vec<String>,
    pub cwd: Option<Path>,
    /// Variables set on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Variables applied only when not already present in the inherited environment.
    pub default_env: Vec<(String, String)>,
    /// Capture stdout/stderr instead of forwarding them to the terminal.
    pub capture: bool,
}

impl Command {
    pub fn new(program: impl Into<Path>) -> Self {
        Self {
            program: program.into(),
            capture: true,
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<Path>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn default_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_env.push((key.into(), value.into()));
        self
    }

    pub fn inherit_output(mut self) -> Self {
        self.capture = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunCommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i64,
}

impl RunCommandOutput {
    pub fn success(&self) -> bool {
        self.returncode == 0
    }
}

/// Host services needed to resolve dependencies and drive native builds.
///
/// Nothing in this crate touches the environment, the filesystem or
/// subprocesses directly; everything goes through an implementation of this
/// trait so that the whole pipeline can run against a simulated host.
pub trait Runtime: 'static {
    // env
    fn get_env(&self, key: &str) -> Option<String>;
    fn host_machine(&self) -> Result<MachineInfo>;
    fn current_dir(&self) -> Result<Path>;

    // fs
    fn is_file(&self, path: &Path) -> Result<bool>;
    fn is_dir(&self, path: &Path) -> Result<bool>;
    fn exists(&self, path: &Path) -> Result<bool>;
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Expands a shell-style pattern into the existing paths it matches.
    ///
    /// A pattern without wildcards yields itself if it exists, and nothing
    /// otherwise.
    fn glob(&self, pattern: &Path) -> Result<Vec<Path>>;

    // programs
    fn find_program(&self, name: &str) -> Result<Path>;
    fn run_command(&self, cmd: &Command) -> Result<RunCommandOutput>;

    /// Installed root directory of a python package of the same family, e.g.
    /// `.../site-packages/bob/core` for `bob.core`.
    fn package_dir(&self, package: &str) -> Result<Path>;
}
