use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use crate::flags::{Macro, STD_FLAG};
use crate::path::Path;

/// Contents of the `CMakeLists.txt` that builds one shared library.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CMakeLists {
    pub name: String,
    pub sources: Vec<Path>,
    pub target_directory: Path,
    pub version: String,
    pub include_directories: Vec<Path>,
    pub system_include_directories: Vec<Path>,
    pub libraries: Vec<String>,
    pub library_directories: Vec<Path>,
    pub macros: Vec<Macro>,
    pub compile_flags: Vec<String>,
    /// Passed through `target_link_libraries`, after the libraries.
    pub link_flags: Vec<String>,
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn definition(m: &Macro) -> String {
    if m.value.is_empty() {
        format!("-D{}", m.name)
    } else {
        format!("-D{}={}", m.name, m.value)
    }
}

impl CMakeLists {
    pub fn generate(&self) -> String {
        let name = &self.name;
        let mut out = String::new();

        // writing into a String cannot fail
        let _ = writeln!(out, "# automatically generated, do not edit");
        let _ = writeln!(out, "cmake_minimum_required(VERSION 2.8)");
        let _ = writeln!(out, "project({name})");
        let _ = writeln!(out, "set(CMAKE_CXX_FLAGS \"${{CMAKE_CXX_FLAGS}} {STD_FLAG}\")");
        out.push('\n');

        for dir in &self.include_directories {
            let _ = writeln!(out, "include_directories({})", quote(dir.as_str()));
        }
        for dir in &self.system_include_directories {
            let _ = writeln!(out, "include_directories(SYSTEM {})", quote(dir.as_str()));
        }
        for dir in &self.library_directories {
            let _ = writeln!(out, "link_directories({})", quote(dir.as_str()));
        }
        for m in &self.macros {
            let _ = writeln!(out, "add_definitions({})", quote(&definition(m)));
        }
        for flag in &self.compile_flags {
            let _ = writeln!(out, "add_definitions({})", quote(flag));
        }
        out.push('\n');

        let sources = self
            .sources
            .iter()
            .map(|s| quote(s.as_str()))
            .collect::<Vec<_>>()
            .join("\n    ");
        let _ = writeln!(out, "add_library({name} SHARED\n    {sources}\n)");
        if !self.version.is_empty() {
            let _ = writeln!(
                out,
                "set_target_properties({name} PROPERTIES VERSION {})",
                self.version
            );
        }
        let _ = writeln!(
            out,
            "set_target_properties({name} PROPERTIES LIBRARY_OUTPUT_DIRECTORY {})",
            quote(self.target_directory.as_str())
        );
        if !self.libraries.is_empty() || !self.link_flags.is_empty() {
            let libraries = self
                .libraries
                .iter()
                .chain(&self.link_flags)
                .map(|l| quote(l))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "target_link_libraries({name} {libraries})");
        }

        out
    }
}
