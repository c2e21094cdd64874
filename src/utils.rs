use alloc::string::{String, ToString as _};
use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::error::{BuildError, ErrorContext};
use crate::path::Path;
use crate::runtime::Runtime;

/// Removes duplicates, keeping the first occurrence of every element.
pub fn uniq<T: Eq + Hash + Clone>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Returns the lines of `path` that start with `prefix`, leading whitespace ignored.
pub fn egrep(runtime: &dyn Runtime, path: &Path, prefix: &str) -> Result<Vec<String>, BuildError> {
    let data = runtime
        .read_file(path)
        .with_context_runtime(|| alloc::format!("Failed to read {path}"))?;
    let text = String::from_utf8_lossy(&data);
    Ok(text
        .lines()
        .map(str::trim_start)
        .filter(|line| line.starts_with(prefix))
        .map(|line| line.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRuntime;

    #[test]
    fn test_uniq_keeps_first_occurrence() {
        assert_eq!(uniq(["a", "b", "a", "c", "b"]), vec!["a", "b", "c"]);
        assert_eq!(uniq(Vec::<u8>::new()), Vec::<u8>::new());
    }

    #[test]
    fn test_egrep() {
        let rt = MockRuntime::linux64().with_file(
            "/usr/include/boost/version.hpp",
            "// comment\n#define BOOST_VERSION 105500\n  #define BOOST_LIB_VERSION \"1_55\"\n",
        );
        let lines = egrep(&rt, &Path::from("/usr/include/boost/version.hpp"), "#define").unwrap();
        assert_eq!(
            lines,
            vec![
                "#define BOOST_VERSION 105500".to_string(),
                "#define BOOST_LIB_VERSION \"1_55\"".to_string(),
            ]
        );
        egrep(&rt, &Path::from("/missing"), "#define").unwrap_err();
    }
}
