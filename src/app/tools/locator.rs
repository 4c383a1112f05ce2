use std::path::{Path, PathBuf};

use crate::app::models::ToolKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTool {
    /// An existing file under the install directory.
    Located(PathBuf),
    /// Neither candidate exists; the bare binary name is left to the OS search path.
    Bare(String),
}

impl ResolvedTool {
    pub fn program(&self) -> &Path {
        match self {
            ResolvedTool::Located(path) => path,
            ResolvedTool::Bare(name) => Path::new(name),
        }
    }

    pub fn working_dir(&self) -> Option<&Path> {
        match self {
            ResolvedTool::Located(path) => path.parent(),
            ResolvedTool::Bare(_) => None,
        }
    }
}

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|candidate| candidate.strip_suffix('"'))
    {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|candidate| candidate.strip_suffix('\''))
    {
        return inner.trim().to_string();
    }
    trimmed.to_string()
}

/// `<install_dir>/Tools/<kind>/<binary>`, then `<install_dir>/<binary>`, then the bare name.
pub fn resolve_tool(install_dir: &Path, kind: ToolKind, binary: &str) -> ResolvedTool {
    let binary = normalize_command_path(binary);
    let primary = install_dir
        .join("Tools")
        .join(kind.tools_subdir())
        .join(&binary);
    if primary.is_file() {
        return ResolvedTool::Located(primary);
    }
    let secondary = install_dir.join(&binary);
    if secondary.is_file() {
        return ResolvedTool::Located(secondary);
    }
    ResolvedTool::Bare(binary)
}

/// Splits an argument string on whitespace; double quotes group, no other shell syntax.
pub fn split_arguments(arguments: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in arguments.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}
