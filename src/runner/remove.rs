//! In-process removal of build artifacts
//!
//! Used by clean-style tasks. Patterns are globs relative to the working
//! directory; an unresolved `${NAME}` in a pattern is an error rather than
//! being passed through, so a typo never widens what gets deleted.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{interpolate_strict, Context, Policy, StepReport};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Remove everything matching `patterns` and apply the failure policy
pub fn execute_remove(
    patterns: &[String],
    policy: Policy,
    ctx: &Context,
    vars: &HashMap<String, String>,
) -> StepReport {
    let mut targets = Vec::new();
    for pattern in patterns {
        match expand_pattern(pattern, &ctx.working_dir, vars) {
            Ok(found) => targets.extend(found),
            Err(e) => return StepReport::fatal(e.to_string()),
        }
    }

    for target in &targets {
        let display = target
            .strip_prefix(&ctx.working_dir)
            .unwrap_or(target)
            .display()
            .to_string();
        ctx.reporter.command(&format!("rm -rf {}", display));

        if ctx.dry_run {
            continue;
        }
        if let Err(e) = remove_path(target) {
            return StepReport::failed(policy, None, e.to_string());
        }
    }

    StepReport::succeeded(None)
}

/// Matching paths for one pattern, deepest first so children go before parents
fn expand_pattern(
    pattern: &str,
    working_dir: &Path,
    vars: &HashMap<String, String>,
) -> ExecutionResult<Vec<PathBuf>> {
    let expanded = interpolate_strict(pattern, vars)?;
    let pattern_error = |error: &str| ExecutionError::Pattern {
        pattern: format!("{} ({})", pattern, expanded),
        error: error.to_string(),
    };

    if expanded.trim().is_empty() {
        return Err(pattern_error("expands to an empty path"));
    }

    let full = normalize(&working_dir.join(&expanded));
    if encloses(&full, working_dir) {
        return Err(pattern_error("would remove the working directory"));
    }

    let mut paths = glob::glob(&full.to_string_lossy())
        .map_err(|e| pattern_error(&e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| pattern_error(&e.to_string()))?;

    if paths.iter().any(|path| encloses(path, working_dir)) {
        return Err(pattern_error("matches the working directory"));
    }

    paths.sort_by(|a, b| b.components().count().cmp(&a.components().count()));
    Ok(paths)
}

/// Lexical cleanup: drops `.` and resolves `..` against earlier components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if ends_in_name(&out) => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn ends_in_name(path: &Path) -> bool {
    matches!(path.components().next_back(), Some(Component::Normal(_)))
}

/// Canonical form of a removal candidate. The final component is kept as is
/// so a symlink is judged by its own location, not its target.
fn resolved(path: &Path) -> PathBuf {
    let path = normalize(path);
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        if !parent.as_os_str().is_empty() {
            if let Ok(parent) = fs::canonicalize(parent) {
                return parent.join(name);
            }
        }
    }
    fs::canonicalize(&path).unwrap_or(path)
}

/// Whether removing `candidate` would take `working_dir` with it
fn encloses(candidate: &Path, working_dir: &Path) -> bool {
    let dir = fs::canonicalize(working_dir).unwrap_or_else(|_| normalize(working_dir));
    dir.starts_with(resolved(candidate))
        || normalize(working_dir).starts_with(normalize(candidate))
}

fn remove_path(path: &Path) -> ExecutionResult<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        // Already gone, e.g. inside a directory removed earlier
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };

    result.map_err(|e| ExecutionError::Remove {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}
