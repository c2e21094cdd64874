use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// A `/`-separated filesystem path as seen through the [`Runtime`](crate::runtime::Runtime).
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Path(String);

const SEP: &str = "/";

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self.0)
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Self::from(path)
    }
}

impl From<String> for Path {
    fn from(path: String) -> Self {
        Self::from(path)
    }
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().replace("\\", "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bytes in the textual form, used when ranking include paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, path: impl AsRef<str>) -> Self {
        let path = path.as_ref().replace("\\", "/");
        if path.starts_with(SEP) || self.0.is_empty() {
            return Self(path);
        }
        if path.is_empty() {
            return self.clone();
        }

        let mut new_path = String::from(self.0.trim_end_matches(SEP));
        new_path.push_str(SEP);
        new_path.push_str(&path);
        Self(new_path)
    }

    /// Joins every component in order, like repeated calls to [`Path::join`].
    pub fn join_all<I, S>(&self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        parts
            .into_iter()
            .fold(self.clone(), |acc, part| acc.join(part))
    }

    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.trim_end_matches(SEP);
        let idx = trimmed.rfind(SEP)?;
        if idx == 0 {
            return Some(Self(SEP.into()));
        }
        Some(Self(trimmed[..idx].into()))
    }

    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.0.trim_end_matches(SEP);
        let name = match trimmed.rfind(SEP) {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        };
        (!name.is_empty()).then_some(name)
    }

    pub fn components(&self) -> Vec<&str> {
        self.0.split(SEP).filter(|c| !c.is_empty()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(Path::from("/usr").join("include"), Path::from("/usr/include"));
        assert_eq!(Path::from("/usr/").join("lib64"), Path::from("/usr/lib64"));
        assert_eq!(Path::from("/usr").join("/opt"), Path::from("/opt"));
        assert_eq!(Path::from("/usr").join(""), Path::from("/usr"));
        assert_eq!(Path::new().join("lib"), Path::from("lib"));
        assert_eq!(
            Path::from("/pkg").join_all(["bob", "core"]),
            Path::from("/pkg/bob/core")
        );
    }

    #[test]
    fn test_parent_and_file_name() {
        let path = Path::from("/usr/lib/libz.so");
        assert_eq!(path.parent(), Some(Path::from("/usr/lib")));
        assert_eq!(path.file_name(), Some("libz.so"));
        assert_eq!(Path::from("/usr").parent(), Some(Path::from("/")));
        assert_eq!(Path::from("libz.so").parent(), None);
    }

    #[test]
    fn test_backslashes_are_normalized() {
        assert_eq!(Path::from("C:\\boost\\include"), Path::from("C:/boost/include"));
    }
}
