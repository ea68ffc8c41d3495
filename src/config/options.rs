//! Option resolution
//!
//! Every option is resolved once per invocation with the precedence
//! caller override > environment > default. The result is an immutable
//! [`Configuration`] snapshot shared by every task in the run.

use crate::config::types::OptionDef;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::interpolate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEPS: &str = "DEPS";
pub const TESTS: &str = "TESTS";
pub const VIRTUALENV: &str = "VIRTUALENV";
pub const BUILDBOT: &str = "BUILDBOT";
pub const BUILDROOT: &str = "BUILDROOT";
pub const ENVPATH: &str = "ENVPATH";
pub const BINPATH: &str = "BINPATH";
pub const REPORTS: &str = "REPORTS";
pub const DISTRIBUTIONS: &str = "DISTRIBUTIONS";
pub const TEST_FLAGS: &str = "TEST_FLAGS";

/// Kind of value an option holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Text,
    List,
}

impl OptionKind {
    fn parse(raw: &str) -> ConfigResult<Self> {
        match raw {
            "bool" | "boolean" => Ok(OptionKind::Bool),
            "string" | "path" => Ok(OptionKind::Text),
            "list" => Ok(OptionKind::List),
            other => Err(ConfigError::Invalid(format!(
                "Invalid option type: {}. Must be one of: bool, string, path, list",
                other
            ))),
        }
    }
}

/// A recognized option
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub name: String,
    pub kind: OptionKind,
    pub default: Option<String>,
    pub environment: Option<String>,
    pub required: bool,
    pub usage: Option<String>,
}

impl OptionSpec {
    fn builtin(name: &str, kind: OptionKind, default: &str, usage: &str) -> Self {
        OptionSpec {
            name: name.to_string(),
            kind,
            default: Some(default.to_string()),
            environment: None,
            required: false,
            usage: Some(usage.to_string()),
        }
    }

    /// Create from a task file declaration
    pub fn from_config(name: String, def: &OptionDef) -> ConfigResult<Self> {
        Ok(OptionSpec {
            kind: OptionKind::parse(&def.option_type)?,
            default: def.default.clone(),
            environment: def.environment.clone(),
            required: def.required,
            usage: def.usage.clone(),
            name,
        })
    }

    /// Environment variable this option reads
    pub fn env_key(&self) -> &str {
        self.environment.as_deref().unwrap_or(&self.name)
    }
}

/// The options every run recognizes, before task file additions
pub fn builtin_options() -> Vec<OptionSpec> {
    use OptionKind::*;

    vec![
        OptionSpec::builtin(DEPS, Bool, "1", "Install and upgrade dependencies"),
        OptionSpec::builtin(TESTS, Bool, "1", "Run the test suite"),
        OptionSpec::builtin(VIRTUALENV, Bool, "1", "Bootstrap an isolated environment"),
        OptionSpec::builtin(BUILDBOT, Bool, "0", "Enable CI-only tasks"),
        OptionSpec::builtin(BUILDROOT, Text, ".", "Root for artifacts, reports and the sentinel"),
        OptionSpec::builtin(ENVPATH, Text, "${BUILDROOT}/.env", "Isolated environment location"),
        // Default depends on VIRTUALENV; filled in by `resolve`.
        OptionSpec {
            default: None,
            ..OptionSpec::builtin(BINPATH, Text, "", "Prefix for external tool invocations")
        },
        OptionSpec::builtin(REPORTS, Text, "${BUILDROOT}/reports", "Test report directory"),
        OptionSpec::builtin(DISTRIBUTIONS, List, "sdist", "Distribution formats to build"),
        OptionSpec::builtin(TEST_FLAGS, Text, "", "Extra flags for the test runner"),
    ]
}

/// Built-in options followed by the task file's own declarations.
/// A declaration with a built-in name replaces the built-in.
pub fn option_specs(declared: &[(String, OptionDef)]) -> ConfigResult<Vec<OptionSpec>> {
    let mut specs = builtin_options();

    for (name, def) in declared {
        let spec = OptionSpec::from_config(name.clone(), def)?;
        match specs.iter_mut().find(|s| s.name == *name) {
            Some(existing) => *existing = spec,
            None => specs.push(spec),
        }
    }

    Ok(specs)
}

/// A resolved option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl Value {
    /// String form used for `${NAME}` interpolation
    pub fn render(&self) -> String {
        match self {
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Text(s) => s.clone(),
            Value::List(items) => items.join(" "),
        }
    }
}

/// Immutable option snapshot for one run
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    values: HashMap<String, Value>,
    vars: HashMap<String, String>,
}

/// Resolve every option in `specs`.
///
/// `environment` is passed in rather than read here so resolution stays a
/// pure function. Keys in `overrides` or `environment` that no option declares
/// are ignored.
pub fn resolve(
    specs: &[OptionSpec],
    environment: &HashMap<String, String>,
    overrides: &HashMap<String, String>,
) -> ConfigResult<Configuration> {
    // First pass: pick the raw string for each option
    let mut raw: HashMap<String, String> = HashMap::new();

    for spec in specs {
        let chosen = overrides
            .get(&spec.name)
            .or_else(|| environment.get(spec.env_key()))
            .cloned()
            .or_else(|| spec.default.clone());

        match chosen {
            Some(value) => {
                raw.insert(spec.name.clone(), value);
            }
            None if spec.required => return Err(ConfigError::MissingOption(spec.name.clone())),
            None => {}
        }
    }

    // The tool prefix follows the environment toggle unless given explicitly
    if !raw.contains_key(BINPATH) && specs.iter().any(|s| s.name == BINPATH) {
        let virtualenv = match raw.get(VIRTUALENV) {
            Some(value) => parse_bool(VIRTUALENV, value)?,
            None => false,
        };
        let prefix = if virtualenv { "${ENVPATH}/bin/" } else { "" };
        raw.insert(BINPATH.to_string(), prefix.to_string());
    }

    // Second pass: expand ${NAME} references between options, then type
    let mut values = HashMap::new();
    for spec in specs {
        let Some(value) = raw.get(&spec.name) else {
            continue;
        };
        let expanded = interpolate(value, &raw).map_err(|e| ConfigError::InvalidOption {
            name: spec.name.clone(),
            error: e.to_string(),
        })?;

        let typed = match spec.kind {
            OptionKind::Bool => Value::Bool(parse_bool(&spec.name, &expanded)?),
            OptionKind::Text => Value::Text(expanded),
            OptionKind::List => Value::List(split_list(&expanded)),
        };
        values.insert(spec.name.clone(), typed);
    }

    let vars = values
        .iter()
        .map(|(name, value)| (name.clone(), value.render()))
        .collect();

    Ok(Configuration { values, vars })
}

/// Parse a boolean toggle the way make-style flags are usually written
pub fn parse_bool(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidOption {
            name: name.to_string(),
            error: format!("'{}' is not a boolean", other),
        }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

impl Configuration {
    /// Get a resolved value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Boolean option value; unknown or non-boolean options read as false
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(Value::Bool(true)))
    }

    /// Text option value; empty when unset
    pub fn text(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(Value::Text(s)) => s,
            _ => "",
        }
    }

    /// All options rendered as strings, for interpolation
    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    pub fn dependencies_enabled(&self) -> bool {
        self.flag(DEPS)
    }

    pub fn tests_enabled(&self) -> bool {
        self.flag(TESTS)
    }

    pub fn virtualenv_enabled(&self) -> bool {
        self.flag(VIRTUALENV)
    }

    pub fn ci_mode(&self) -> bool {
        self.flag(BUILDBOT)
    }

    pub fn build_root(&self) -> &Path {
        Path::new(self.text(BUILDROOT))
    }

    pub fn env_path(&self) -> &Path {
        Path::new(self.text(ENVPATH))
    }

    pub fn tool_path_prefix(&self) -> &str {
        self.text(BINPATH)
    }

    pub fn reports_dir(&self) -> &Path {
        Path::new(self.text(REPORTS))
    }

    pub fn test_flags(&self) -> &str {
        self.text(TEST_FLAGS)
    }

    pub fn distribution_formats(&self) -> &[String] {
        match self.values.get(DISTRIBUTIONS) {
            Some(Value::List(items)) => items,
            _ => &[],
        }
    }

    /// Build root resolved against a working directory
    pub fn build_root_in(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(self.build_root())
    }
}
