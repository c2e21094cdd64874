use crate::flags::Extension;

/// Hand-off to the step that compiles and links the python extension modules.
///
/// Native libraries are built by [`BuildExt`](crate::BuildExt) itself; the
/// extensions, with their fully resolved flags, are passed on to an
/// implementation of this trait (typically the language's own extension
/// builder).
pub trait BuildSteps: 'static {
    /// Builds every extension, in order.
    ///
    /// # Arguments
    /// * `extensions` - Extension modules with the libraries built in the
    ///   first phase already prepended to their include directories, library
    ///   directories and libraries
    fn build_extensions(&self, extensions: &[Extension]) -> anyhow::Result<()>;
}
