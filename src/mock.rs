//! In-memory [`Runtime`] used by the unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{anyhow, bail};

use crate::path::Path;
use crate::runtime::{Command, MachineInfo, Result, RunCommandOutput, Runtime, System};

pub struct MockRuntime {
    machine: MachineInfo,
    cwd: Path,
    env: HashMap<String, String>,
    files: RefCell<BTreeMap<Path, Vec<u8>>>,
    dirs: RefCell<BTreeSet<Path>>,
    programs: HashMap<String, Path>,
    packages: HashMap<String, Path>,
    responses: HashMap<String, RunCommandOutput>,
    pub commands: RefCell<Vec<Command>>,
}

impl MockRuntime {
    pub fn new(system: System, pointer_width: u32) -> Self {
        Self {
            machine: MachineInfo {
                system,
                pointer_width,
            },
            cwd: Path::from("/work/pkg"),
            env: HashMap::new(),
            files: RefCell::default(),
            dirs: RefCell::default(),
            programs: HashMap::new(),
            packages: HashMap::new(),
            responses: HashMap::new(),
            commands: RefCell::default(),
        }
    }

    pub fn linux64() -> Self {
        Self::new(System::Linux, 64)
    }

    pub fn darwin() -> Self {
        Self::new(System::Darwin, 64)
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        let path = Path::from(path);
        self.add_parents(&path);
        self.files
            .borrow_mut()
            .insert(path, content.as_bytes().to_vec());
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        let path = Path::from(path);
        self.add_parents(&path);
        self.dirs.borrow_mut().insert(path);
        self
    }

    pub fn with_program(mut self, name: &str, path: &str) -> Self {
        self.programs.insert(name.into(), Path::from(path));
        self
    }

    pub fn with_package(mut self, name: &str, dir: &str) -> Self {
        self.packages.insert(name.into(), Path::from(dir));
        self.with_dir(dir)
    }

    /// Scripts the output of `<program file name> <args...>`.
    pub fn with_response(mut self, command: &str, stdout: &str, returncode: i64) -> Self {
        self.responses.insert(
            command.into(),
            RunCommandOutput {
                stdout: stdout.into(),
                stderr: String::new(),
                returncode,
            },
        );
        self
    }

    pub fn with_pkg_config(self, name: &str, version: &str, cflags: &str, libs: &str) -> Self {
        let split = |flags: &str, prefix: &str| {
            flags
                .split_whitespace()
                .filter(|f| f.starts_with(prefix))
                .collect::<Vec<_>>()
                .join(" ")
        };
        let other = |flags: &str, prefix: &str| {
            flags
                .split_whitespace()
                .filter(|f| !f.starts_with(prefix))
                .collect::<Vec<_>>()
                .join(" ")
        };
        let rt = self
            .with_program("pkg-config", "/usr/bin/pkg-config")
            .with_response(&format!("pkg-config --modversion {name}"), version, 0)
            .with_response(
                &format!("pkg-config --cflags-only-I {name}"),
                &split(cflags, "-I"),
                0,
            )
            .with_response(
                &format!("pkg-config --cflags-only-other {name}"),
                &other(cflags, "-I"),
                0,
            )
            .with_response(&format!("pkg-config --libs-only-L {name}"), &split(libs, "-L"), 0)
            .with_response(&format!("pkg-config --libs-only-l {name}"), &split(libs, "-l"), 0);
        let others = libs
            .split_whitespace()
            .filter(|f| !f.starts_with("-L") && !f.starts_with("-l"))
            .collect::<Vec<_>>()
            .join(" ");
        rt.with_response(&format!("pkg-config --libs-only-other {name}"), &others, 0)
    }

    fn add_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            current = dir.parent().filter(|p| *p != dir);
            self.dirs.borrow_mut().insert(dir);
        }
    }

    fn all_paths(&self) -> Vec<Path> {
        let files = self.files.borrow();
        let dirs = self.dirs.borrow();
        files.keys().chain(dirs.iter()).cloned().collect()
    }

    pub fn file_content(&self, path: &str) -> Option<String> {
        self.files
            .borrow()
            .get(&Path::from(path))
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }
}

impl Runtime for MockRuntime {
    fn get_env(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    fn host_machine(&self) -> Result<MachineInfo> {
        Ok(self.machine.clone())
    }

    fn current_dir(&self) -> Result<Path> {
        Ok(self.cwd.clone())
    }

    fn is_file(&self, path: &Path) -> Result<bool> {
        Ok(self.files.borrow().contains_key(path))
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        Ok(self.dirs.borrow().contains(path))
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.is_file(path)? || self.is_dir(path)?)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("No such file: {path}"))
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.add_parents(path);
        self.files.borrow_mut().insert(path.clone(), data.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_parents(path);
        self.dirs.borrow_mut().insert(path.clone());
        Ok(())
    }

    fn glob(&self, pattern: &Path) -> Result<Vec<Path>> {
        let wanted = pattern
            .components()
            .iter()
            .map(|part| glob::Pattern::new(part))
            .collect::<core::result::Result<Vec<_>, _>>()
            .map_err(|e| anyhow!("Invalid pattern {pattern}: {e}"))?;
        let absolute = pattern.as_str().starts_with('/');
        let mut matches = self
            .all_paths()
            .into_iter()
            .filter(|candidate| candidate.as_str().starts_with('/') == absolute)
            .filter(|candidate| {
                let parts = candidate.components();
                parts.len() == wanted.len()
                    && parts
                        .iter()
                        .zip(&wanted)
                        .all(|(part, pat)| pat.matches(part))
            })
            .collect::<Vec<_>>();
        matches.sort();
        matches.dedup();
        Ok(matches)
    }

    fn find_program(&self, name: &str) -> Result<Path> {
        self.programs
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Not found: {name}"))
    }

    fn run_command(&self, cmd: &Command) -> Result<RunCommandOutput> {
        self.commands.borrow_mut().push(cmd.clone());
        let program = cmd.program.file_name().unwrap_or_default();
        let mut key = String::from(program);
        for arg in &cmd.args {
            key.push(' ');
            key.push_str(arg);
        }
        match self.responses.get(&key) {
            Some(output) => Ok(output.clone()),
            None if self.programs.values().any(|p| *p == cmd.program) => Ok(RunCommandOutput {
                stdout: String::new(),
                stderr: format!("unexpected command: {key}"),
                returncode: 1,
            }),
            None => bail!("No such program: {}", cmd.program),
        }
    }

    fn package_dir(&self, package: &str) -> Result<Path> {
        self.packages
            .get(package)
            .cloned()
            .ok_or_else(|| anyhow!("Package {package} is not installed"))
    }
}
