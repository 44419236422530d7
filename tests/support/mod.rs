//! Fixture helpers shared by the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// True when `tool` resolves to an executable on `PATH`
pub fn has_tool(tool: &str) -> bool {
    which::which(tool).is_ok()
}

/// Print a skip notice and return true when any of `tools` is missing
pub fn skip_without(tools: &[&str]) -> bool {
    for tool in tools {
        if !has_tool(tool) {
            eprintln!("skipping: {} not installed", tool);
            return true;
        }
    }
    false
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(&path, content).expect("Failed to write fixture file");
    path
}

/// A `build.sh` with the given body. Left non-executable; the strategy fixes
/// permissions itself.
pub fn write_build_script(dir: &Path, body: &str) -> PathBuf {
    write(dir, "build.sh", &format!("#!/bin/sh\n{}\n", body))
}

pub const MISSING_ZLIB: &str =
    "echo 'main.c:1:10: fatal error: zlib.h: No such file or directory' >&2; exit 1";
