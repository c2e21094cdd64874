use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::{env, fs};

use anyhow::{Context as _, bail};
use bob_extension::path::Path as BobPath;
use bob_extension::runtime::{self, MachineInfo, RunCommandOutput, System};

/// Environment variable listing extra roots holding sibling packages.
pub const PACKAGE_PATH_ENV: &str = "BOB_PACKAGE_PATH";

/// The machine this process runs on.
pub struct Host {
    package_roots: Vec<PathBuf>,
}

impl Host {
    pub fn new(package_roots: Vec<PathBuf>) -> Self {
        Self { package_roots }
    }

    fn roots(&self) -> Vec<PathBuf> {
        let mut roots = env::var_os(PACKAGE_PATH_ENV)
            .map(|value| env::split_paths(&value).collect::<Vec<_>>())
            .unwrap_or_default();
        roots.extend(self.package_roots.iter().cloned());
        roots.extend(env::current_dir().ok());
        roots
    }
}

fn to_path(path: &Path) -> BobPath {
    BobPath::from(path.to_string_lossy())
}

impl runtime::Runtime for Host {
    fn get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn host_machine(&self) -> runtime::Result<MachineInfo> {
        Ok(MachineInfo {
            system: System::from_name(env::consts::OS),
            pointer_width: usize::BITS,
        })
    }

    fn current_dir(&self) -> runtime::Result<BobPath> {
        Ok(to_path(&env::current_dir()?))
    }

    fn is_file(&self, path: &BobPath) -> runtime::Result<bool> {
        Ok(Path::new(path.as_str()).is_file())
    }
    fn is_dir(&self, path: &BobPath) -> runtime::Result<bool> {
        Ok(Path::new(path.as_str()).is_dir())
    }
    fn exists(&self, path: &BobPath) -> runtime::Result<bool> {
        Ok(Path::new(path.as_str()).exists())
    }
    fn read_file(&self, path: &BobPath) -> runtime::Result<Vec<u8>> {
        Ok(fs::read(path.as_str())?)
    }
    fn write_file(&self, path: &BobPath, data: &[u8]) -> runtime::Result<()> {
        Ok(fs::write(path.as_str(), data)?)
    }
    fn create_dir_all(&self, path: &BobPath) -> runtime::Result<()> {
        Ok(fs::create_dir_all(path.as_str())?)
    }

    fn glob(&self, pattern: &BobPath) -> runtime::Result<Vec<BobPath>> {
        let mut matches = Vec::new();
        for entry in glob::glob(pattern.as_str())? {
            matches.push(to_path(&entry?));
        }
        Ok(matches)
    }

    fn find_program(&self, name: &str) -> runtime::Result<BobPath> {
        let program = which::which(name).with_context(|| format!("Not found: {name}"))?;
        Ok(to_path(&program))
    }

    fn run_command(&self, cmd: &runtime::Command) -> runtime::Result<RunCommandOutput> {
        tracing::debug!("Running command: {} {:?}", cmd.program, cmd.args);

        let mut command = Command::new(cmd.program.as_str());
        command.args(&cmd.args);
        if let Some(cwd) = &cmd.cwd {
            command.current_dir(cwd.as_str());
        }
        for (key, value) in &cmd.default_env {
            if env::var_os(key).is_none() {
                command.env(key, value);
            }
        }
        command.envs(cmd.env.iter().map(|(k, v)| (k, v)));

        if !cmd.capture {
            let status = command
                .stdin(Stdio::null())
                .status()
                .with_context(|| format!("Failed to spawn {}", cmd.program))?;
            return Ok(RunCommandOutput {
                returncode: status.code().unwrap_or(-1) as i64,
                ..Default::default()
            });
        }

        let output = command
            .output()
            .with_context(|| format!("Failed to spawn {}", cmd.program))?;
        Ok(RunCommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            returncode: output.status.code().unwrap_or(-1) as i64,
        })
    }

    fn package_dir(&self, package: &str) -> runtime::Result<BobPath> {
        let relative: PathBuf = package.split('.').collect();
        for root in self.roots() {
            let candidate = root.join(&relative);
            if candidate.is_dir() {
                return Ok(to_path(&candidate));
            }
        }
        bail!("Package {package} is not installed");
    }
}

#[cfg(test)]
mod tests {
    use bob_extension::runtime::Runtime as _;

    use super::*;

    #[test]
    fn test_glob_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = to_path(dir.path());
        let host = Host::new(vec![]);

        host.create_dir_all(&root.join("lib/x86_64-linux-gnu")).unwrap();
        host.write_file(&root.join("lib/libz.so"), b"").unwrap();
        host.write_file(&root.join("lib/libz.a"), b"").unwrap();

        assert!(host.is_file(&root.join("lib/libz.so")).unwrap());
        assert!(host.is_dir(&root.join("lib")).unwrap());
        assert!(!host.exists(&root.join("lib64")).unwrap());

        let found = host.glob(&root.join("lib/libz.*")).unwrap();
        assert_eq!(found, vec![root.join("lib/libz.a"), root.join("lib/libz.so")]);
        assert!(host.glob(&root.join("lib64")).unwrap().is_empty());
        assert_eq!(host.glob(&root.join("lib")).unwrap(), vec![root.join("lib")]);
    }

    #[test]
    fn test_package_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bob/core")).unwrap();
        let host = Host::new(vec![dir.path().to_path_buf()]);
        assert_eq!(
            host.package_dir("bob.core").unwrap(),
            to_path(&dir.path().join("bob/core"))
        );
        host.package_dir("bob.not_installed").unwrap_err();
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(vec![]);
        let sh = host.find_program("sh").unwrap();

        let cmd = runtime::Command::new(sh.clone())
            .args(["-c", "echo $BOB_TEST_VALUE; pwd"])
            .cwd(to_path(dir.path()))
            .env("BOB_TEST_VALUE", "hello");
        let output = host.run_command(&cmd).unwrap();
        assert!(output.success());
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("hello"));
        let cwd = PathBuf::from(lines.next().unwrap());
        assert_eq!(
            cwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );

        let failing = runtime::Command::new(sh).args(["-c", "exit 3"]);
        assert_eq!(host.run_command(&failing).unwrap().returncode, 3);
    }
}
