// src/config/resolve.rs
// Project configuration lookup and `extends` chain resolution

use super::jsonc;
use crate::error::{EmitError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key naming the parent configuration
pub const EXTENDS_KEY: &str = "extends";

/// Key holding the compiler options object
pub const COMPILER_OPTIONS_KEY: &str = "compilerOptions";

/// A fully merged, un-typed project configuration.
///
/// After [`resolve`] the `extends` key is gone and `compilerOptions` holds the
/// merge of the whole chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectConfig {
    fields: Map<String, Value>,
}

impl ProjectConfig {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The `compilerOptions` object, if the chain defines one
    pub fn compiler_options(&self) -> Option<&Value> {
        self.fields.get(COMPILER_OPTIONS_KEY)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Find `config_name` in `dir` or the nearest ancestor that has it.
///
/// Multi-segment and absolute names are joined to each ancestor, so
/// `./tsconfig.base.json` and `/abs/tsconfig.json` behave as expected.
pub fn find_config_file(dir: &Path, config_name: &str) -> Option<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(config_name))
        .find(|candidate| candidate.is_file())
}

/// Load `config_name` found upward from `working_dir` and flatten its
/// `extends` chain into one configuration.
pub fn resolve(config_name: &str, working_dir: &Path) -> Result<ProjectConfig> {
    let mut visited = Vec::new();
    let fields = resolve_chain(config_name, working_dir, &mut visited)?;
    debug!(
        config = %config_name,
        depth = visited.len(),
        "Resolved project configuration"
    );
    Ok(ProjectConfig::new(fields))
}

fn resolve_chain(
    config_name: &str,
    search_dir: &Path,
    visited: &mut Vec<PathBuf>,
) -> Result<Map<String, Value>> {
    let path = locate(config_name, search_dir).ok_or_else(|| EmitError::ConfigNotFound {
        name: config_name.to_string(),
        search_root: search_dir.to_path_buf(),
    })?;
    let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());

    if visited.contains(&canonical) {
        let mut chain = visited.clone();
        chain.push(canonical);
        return Err(EmitError::ConfigCycle {
            name: config_name.to_string(),
            chain,
        });
    }
    visited.push(canonical);

    let mut config = read_config(&path, config_name)?;
    debug!(path = %path.display(), "Read project configuration");

    let Some(extends) = config.remove(EXTENDS_KEY) else {
        return Ok(config);
    };
    let parent_name = match extends {
        Value::String(name) => name,
        other => {
            return Err(EmitError::ConfigParse {
                name: config_name.to_string(),
                path,
                reason: format!("'extends' must be a string, found {}", json_kind(&other)),
            });
        }
    };

    let parent_dir = path.parent().unwrap_or(search_dir);
    let parent = resolve_chain(&parent_name, parent_dir, visited)?;
    Ok(merge(parent, config))
}

/// Merge a child configuration over its resolved parent.
///
/// `compilerOptions` objects are merged key by key with the child winning;
/// every other top-level key the child defines replaces the parent's.
pub fn merge(parent: Map<String, Value>, child: Map<String, Value>) -> Map<String, Value> {
    let mut merged = parent;
    for (key, value) in child {
        if key == COMPILER_OPTIONS_KEY {
            if let (Some(Value::Object(base)), Value::Object(over)) =
                (merged.get_mut(COMPILER_OPTIONS_KEY), &value)
            {
                for (option, option_value) in over {
                    base.insert(option.clone(), option_value.clone());
                }
                continue;
            }
        }
        merged.insert(key, value);
    }
    merged.remove(EXTENDS_KEY);
    merged
}

/// Read one configuration file without following `extends`
pub fn read_config(path: &Path, config_name: &str) -> Result<Map<String, Value>> {
    let parse_error = |reason: String| EmitError::ConfigParse {
        name: config_name.to_string(),
        path: path.to_path_buf(),
        reason,
    };

    let text = std::fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;
    let value = jsonc::parse(&text).map_err(|e| parse_error(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(parse_error(format!(
            "expected an object, found {}",
            json_kind(&value)
        )));
    };

    if let Some(options) = fields.get(COMPILER_OPTIONS_KEY) {
        if !options.is_object() {
            return Err(parse_error(format!(
                "'compilerOptions' must be an object, found {}",
                json_kind(options)
            )));
        }
    }

    Ok(fields)
}

fn locate(config_name: &str, dir: &Path) -> Option<PathBuf> {
    let with_json = (!config_name.ends_with(".json")).then(|| format!("{config_name}.json"));

    let found = find_config_file(dir, config_name)
        .or_else(|| with_json.as_deref().and_then(|name| find_config_file(dir, name)));
    if found.is_some() || is_path_like(config_name) {
        return found;
    }

    // Bare specifiers such as `@tsconfig/node20/tsconfig.json` live in node_modules
    let candidates = [
        config_name.to_string(),
        format!("{config_name}.json"),
        format!("{config_name}/tsconfig.json"),
    ];
    dir.ancestors().find_map(|ancestor| {
        let modules = ancestor.join("node_modules");
        candidates
            .iter()
            .map(|candidate| modules.join(candidate))
            .find(|candidate| candidate.is_file())
    })
}

fn is_path_like(name: &str) -> bool {
    name.starts_with('.') || Path::new(name).is_absolute()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
