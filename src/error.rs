use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// External build step that can fail while producing a native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Configure,
    Compile,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildPhase::Configure => write!(f, "configure"),
            BuildPhase::Compile => write!(f, "compile"),
        }
    }
}

#[derive(Debug)]
pub enum BuildError {
    MalformedRequirement(String),
    PackageNotFound(String),
    UnsatisfiedRequirement {
        requirement: String,
        found: String,
    },
    DuplicateRequirement(String),
    UnsupportedPlatform(String),
    ToolNotFound(String),
    NativeBuildFailed {
        target: String,
        phase: BuildPhase,
    },
    InvalidTargetName(String),
    /// Extensions that could not be resolved, by target name. The others
    /// were still handed to the build steps.
    ExtensionsFailed(Vec<(String, BuildError)>),
    Runtime(Cow<'static, str>),
}

macro_rules! bail_runtime_error {
    ($msg:expr, $($arg:tt)*) => { return Err($crate::error::BuildError::Runtime(alloc::format!($msg, $($arg)*).into())) };
    ($msg:expr) =>              { return Err($crate::error::BuildError::Runtime(alloc::format!($msg).into())) };
}

pub(crate) use bail_runtime_error;

pub trait ErrorContext: Sized {
    type Ok;
    fn context_runtime(self, msg: impl Into<Cow<'static, str>>) -> Result<Self::Ok, BuildError> {
        self.with_context_runtime(|| msg)
    }
    fn with_context_runtime<R: Into<Cow<'static, str>>>(
        self,
        f: impl FnOnce() -> R,
    ) -> Result<Self::Ok, BuildError>;
}

impl<T, E: fmt::Display> ErrorContext for Result<T, E> {
    type Ok = T;
    fn with_context_runtime<R: Into<Cow<'static, str>>>(
        self,
        f: impl FnOnce() -> R,
    ) -> Result<T, BuildError> {
        self.map_err(|e| BuildError::Runtime(Cow::from(format!("{}: {}", f().into(), e))))
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::MalformedRequirement(req) => {
                write!(f, "Cannot parse requirement `{req}'")
            }
            BuildError::PackageNotFound(name) => write!(f, "Package `{name}' not found"),
            BuildError::UnsatisfiedRequirement { requirement, found } => {
                write!(f, "Requirement `{requirement}' not satisfied (found version {found})")
            }
            BuildError::DuplicateRequirement(name) => write!(
                f,
                "Package `{name}' had already been requested - cannot handle recurring requirements"
            ),
            BuildError::UnsupportedPlatform(what) => {
                write!(f, "Unsupported platform: {what}")
            }
            BuildError::ToolNotFound(tool) => {
                write!(f, "Required build tool `{tool}' cannot be found")
            }
            BuildError::NativeBuildFailed { target, phase } => {
                write!(f, "Native build of `{target}' failed during the {phase} step")
            }
            BuildError::InvalidTargetName(name) => write!(
                f,
                "Target name `{name}' must contain the package name, e.g. bob.core.bob_core"
            ),
            BuildError::ExtensionsFailed(failures) => {
                write!(f, "{} extension(s) could not be resolved", failures.len())?;
                for (target, err) in failures {
                    write!(f, "\n  - {target}: {err}")?;
                }
                Ok(())
            }
            BuildError::Runtime(msg) => write!(f, "Runtime error: {msg}"),
        }
    }
}

impl core::error::Error for BuildError {}
