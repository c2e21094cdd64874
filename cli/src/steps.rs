use std::fs;
use std::io::{self, Write as _};
use std::path::PathBuf;

use anyhow::Context as _;
use bob_extension::Extension;
use bob_extension::steps::BuildSteps;
use serde::Serialize;

/// Extension descriptor in the shape the python build step expects.
#[derive(Debug, Serialize, PartialEq)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub sources: Vec<String>,
    pub include_dirs: Vec<String>,
    pub library_dirs: Vec<String>,
    pub libraries: Vec<String>,
    pub runtime_library_dirs: Vec<String>,
    pub define_macros: Vec<(String, String)>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
    pub language: String,
}

fn strings<'a>(paths: impl IntoIterator<Item = &'a bob_extension::path::Path>) -> Vec<String> {
    paths.into_iter().map(|p| p.as_str().to_string()).collect()
}

impl From<&Extension> for ExtensionDescriptor {
    fn from(ext: &Extension) -> Self {
        Self {
            name: ext.name.clone(),
            sources: strings(&ext.sources),
            include_dirs: strings(&ext.include_dirs),
            library_dirs: strings(&ext.library_dirs),
            libraries: ext.libraries.clone(),
            runtime_library_dirs: strings(&ext.runtime_library_dirs),
            define_macros: ext
                .define_macros
                .iter()
                .map(|m| (m.name.clone(), m.value.clone()))
                .collect(),
            extra_compile_args: ext.extra_compile_args.clone(),
            extra_link_args: ext.extra_link_args.clone(),
            language: ext.language.clone(),
        }
    }
}

pub fn to_json(extensions: &[Extension]) -> anyhow::Result<String> {
    let descriptors = extensions
        .iter()
        .map(ExtensionDescriptor::from)
        .collect::<Vec<_>>();
    Ok(serde_json::to_string_pretty(&descriptors)?)
}

/// Writes the extension descriptors as JSON, to a file or to stdout.
pub struct JsonSteps {
    output: Option<PathBuf>,
}

impl JsonSteps {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }
}

impl BuildSteps for JsonSteps {
    fn build_extensions(&self, extensions: &[Extension]) -> anyhow::Result<()> {
        let json = to_json(extensions)?;
        match &self.output {
            Some(path) => {
                tracing::info!("Writing {} extension(s) to {}", extensions.len(), path.display());
                fs::write(path, json + "\n")
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            None => writeln!(io::stdout(), "{json}")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bob_extension::Macro;
    use bob_extension::path::Path;

    use super::*;

    fn extension() -> Extension {
        Extension {
            name: "bob.core._convert".into(),
            sources: vec![Path::from("bob/core/convert.cpp")],
            include_dirs: vec![Path::from("/site/bob/blitz/include")],
            libraries: vec!["bob_core".into()],
            define_macros: vec![Macro::new("HAVE_BLITZ", "1")],
            extra_compile_args: vec!["-std=c++0x".into()],
            extra_link_args: vec!["-pthread".into()],
            language: "c++".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_writes_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extensions.json");
        JsonSteps::new(Some(path.clone()))
            .build_extensions(&[extension()])
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!([{
                "name": "bob.core._convert",
                "sources": ["bob/core/convert.cpp"],
                "include_dirs": ["/site/bob/blitz/include"],
                "library_dirs": [],
                "libraries": ["bob_core"],
                "runtime_library_dirs": [],
                "define_macros": [["HAVE_BLITZ", "1"]],
                "extra_compile_args": ["-std=c++0x"],
                "extra_link_args": ["-pthread"],
                "language": "c++",
            }])
        );
    }
}
