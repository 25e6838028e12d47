// src/config/options.rs
// Typed compiler options converted from a raw `compilerOptions` object

use super::resolve::{COMPILER_OPTIONS_KEY, ProjectConfig};
use crate::error::{EmitError, Result};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// An enum-like option value: the canonical name and the compiler's numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    pub name: &'static str,
    pub code: u32,
}

/// One typed option value
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Number(Number),
    String(String),
    /// Absolute path, resolved against the working directory
    Path(PathBuf),
    Enum(EnumValue),
    List(Vec<OptionValue>),
    Object(Map<String, Value>),
}

impl OptionValue {
    /// JSON form suitable for a generated project file
    pub fn to_json(&self) -> Value {
        match self {
            OptionValue::Bool(b) => Value::Bool(*b),
            OptionValue::Number(n) => Value::Number(n.clone()),
            OptionValue::String(s) => Value::String(s.clone()),
            OptionValue::Path(p) => Value::String(p.to_string_lossy().into_owned()),
            OptionValue::Enum(e) => Value::String(e.name.to_string()),
            OptionValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            OptionValue::Object(map) => Value::Object(map.clone()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            OptionValue::Path(p) => Some(p),
            _ => None,
        }
    }
}

/// Validated compiler options keyed by option name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOptions {
    values: BTreeMap<String, OptionValue>,
}

impl CompilerOptions {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: OptionValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        self.values.remove(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).and_then(OptionValue::as_bool).unwrap_or(false)
    }

    /// Numeric code of an enum option, e.g. `module: "commonjs"` → 1
    pub fn enum_code(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            OptionValue::Enum(e) => Some(e.code),
            _ => None,
        }
    }

    /// The options as a `compilerOptions` JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

// ============================================================================
// Option declarations
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum OptionKind {
    Boolean,
    Number,
    String,
    Path,
    Enum(&'static [(&'static str, u32)]),
    StringList,
    PathList,
    LibList,
    ObjectList,
    Paths,
}

const MODULE_KINDS: &[(&str, u32)] = &[
    ("none", 0),
    ("commonjs", 1),
    ("amd", 2),
    ("umd", 3),
    ("system", 4),
    ("es6", 5),
    ("es2015", 5),
    ("es2020", 6),
    ("es2022", 7),
    ("esnext", 99),
    ("node16", 100),
    ("node18", 101),
    ("node20", 102),
    ("nodenext", 199),
    ("preserve", 200),
];

const SCRIPT_TARGETS: &[(&str, u32)] = &[
    ("es3", 0),
    ("es5", 1),
    ("es6", 2),
    ("es2015", 2),
    ("es2016", 3),
    ("es2017", 4),
    ("es2018", 5),
    ("es2019", 6),
    ("es2020", 7),
    ("es2021", 8),
    ("es2022", 9),
    ("es2023", 10),
    ("es2024", 11),
    ("esnext", 99),
];

const MODULE_RESOLUTION_KINDS: &[(&str, u32)] = &[
    ("classic", 1),
    ("node", 2),
    ("node10", 2),
    ("node16", 3),
    ("nodenext", 99),
    ("bundler", 100),
];

const JSX_EMITS: &[(&str, u32)] = &[
    ("preserve", 1),
    ("react", 2),
    ("react-native", 3),
    ("react-jsx", 4),
    ("react-jsxdev", 5),
];

const NEW_LINE_KINDS: &[(&str, u32)] = &[("crlf", 0), ("lf", 1)];

const MODULE_DETECTION_KINDS: &[(&str, u32)] = &[("legacy", 1), ("auto", 2), ("force", 3)];

const IMPORTS_NOT_USED_AS_VALUES: &[(&str, u32)] = &[("remove", 0), ("preserve", 1), ("error", 2)];

const BOOLEAN_OPTIONS: &[&str] = &[
    "allowArbitraryExtensions",
    "allowImportingTsExtensions",
    "allowJs",
    "allowSyntheticDefaultImports",
    "allowUmdGlobalAccess",
    "allowUnreachableCode",
    "allowUnusedLabels",
    "alwaysStrict",
    "assumeChangesOnlyAffectDirectDependencies",
    "checkJs",
    "composite",
    "declaration",
    "declarationMap",
    "diagnostics",
    "disableReferencedProjectLoad",
    "disableSizeLimit",
    "disableSolutionSearching",
    "disableSourceOfProjectReferenceRedirect",
    "downlevelIteration",
    "emitBOM",
    "emitDeclarationOnly",
    "emitDecoratorMetadata",
    "erasableSyntaxOnly",
    "esModuleInterop",
    "exactOptionalPropertyTypes",
    "experimentalDecorators",
    "explainFiles",
    "extendedDiagnostics",
    "forceConsistentCasingInFileNames",
    "importHelpers",
    "incremental",
    "inlineSourceMap",
    "inlineSources",
    "isolatedDeclarations",
    "isolatedModules",
    "keyofStringsOnly",
    "libReplacement",
    "listEmittedFiles",
    "listFiles",
    "noCheck",
    "noEmit",
    "noEmitHelpers",
    "noEmitOnError",
    "noErrorTruncation",
    "noFallthroughCasesInSwitch",
    "noImplicitAny",
    "noImplicitOverride",
    "noImplicitReturns",
    "noImplicitThis",
    "noImplicitUseStrict",
    "noLib",
    "noPropertyAccessFromIndexSignature",
    "noResolve",
    "noStrictGenericChecks",
    "noUncheckedIndexedAccess",
    "noUncheckedSideEffectImports",
    "noUnusedLocals",
    "noUnusedParameters",
    "preserveConstEnums",
    "preserveSymlinks",
    "preserveValueImports",
    "preserveWatchOutput",
    "pretty",
    "removeComments",
    "resolveJsonModule",
    "resolvePackageJsonExports",
    "resolvePackageJsonImports",
    "rewriteRelativeImportExtensions",
    "skipDefaultLibCheck",
    "skipLibCheck",
    "sourceMap",
    "strict",
    "strictBindCallApply",
    "strictBuiltinIteratorReturn",
    "strictFunctionTypes",
    "strictNullChecks",
    "strictPropertyInitialization",
    "stripInternal",
    "suppressExcessPropertyErrors",
    "suppressImplicitAnyIndexErrors",
    "traceResolution",
    "useDefineForClassFields",
    "useUnknownInCatchVariables",
    "verbatimModuleSyntax",
];

const STRING_OPTIONS: &[&str] = &[
    "charset",
    "ignoreDeprecations",
    "jsxFactory",
    "jsxFragmentFactory",
    "jsxImportSource",
    "locale",
    "reactNamespace",
    "sourceRoot",
];

const PATH_OPTIONS: &[&str] = &[
    "baseUrl",
    "declarationDir",
    "generateCpuProfile",
    "generateTrace",
    "mapRoot",
    "out",
    "outDir",
    "outFile",
    "rootDir",
    "tsBuildInfoFile",
];

fn option_kind(name: &str) -> Option<OptionKind> {
    let kind = match name {
        "module" => OptionKind::Enum(MODULE_KINDS),
        "target" => OptionKind::Enum(SCRIPT_TARGETS),
        "moduleResolution" => OptionKind::Enum(MODULE_RESOLUTION_KINDS),
        "jsx" => OptionKind::Enum(JSX_EMITS),
        "newLine" => OptionKind::Enum(NEW_LINE_KINDS),
        "moduleDetection" => OptionKind::Enum(MODULE_DETECTION_KINDS),
        "importsNotUsedAsValues" => OptionKind::Enum(IMPORTS_NOT_USED_AS_VALUES),
        "maxNodeModuleJsDepth" => OptionKind::Number,
        "lib" => OptionKind::LibList,
        "types" | "moduleSuffixes" | "customConditions" => OptionKind::StringList,
        "typeRoots" | "rootDirs" => OptionKind::PathList,
        "plugins" => OptionKind::ObjectList,
        "paths" => OptionKind::Paths,
        _ if BOOLEAN_OPTIONS.contains(&name) => OptionKind::Boolean,
        _ if STRING_OPTIONS.contains(&name) => OptionKind::String,
        _ if PATH_OPTIONS.contains(&name) => OptionKind::Path,
        _ => return None,
    };
    Some(kind)
}

static LIB_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(es5|es6|es7|es20[0-9]{2}|esnext|dom|webworker|scripthost|decorators)(\.[a-z0-9]+(\.[a-z0-9]+)*)?$")
        .expect("lib name pattern is valid")
});

// ============================================================================
// Processing
// ============================================================================

/// Convert the raw `compilerOptions` of `config` into typed options.
///
/// Relative paths resolve against `working_dir`. Fails with
/// [`EmitError::OptionsValidation`] naming `config_name` when an option is
/// unknown or its value does not fit the option's type.
pub fn process(config: &ProjectConfig, config_name: &str, working_dir: &Path) -> Result<CompilerOptions> {
    let mut options = CompilerOptions::default();

    let Some(raw) = config.compiler_options() else {
        return Ok(options);
    };
    let Value::Object(raw) = raw else {
        return Err(EmitError::OptionsValidation {
            name: config_name.to_string(),
            option: COMPILER_OPTIONS_KEY.to_string(),
            reason: "expected an object".to_string(),
        });
    };

    for (name, value) in raw {
        if value.is_null() {
            continue;
        }
        let invalid = |reason: String| EmitError::OptionsValidation {
            name: config_name.to_string(),
            option: name.clone(),
            reason,
        };
        let kind = option_kind(name).ok_or_else(|| invalid("unknown compiler option".to_string()))?;
        let converted = convert(kind, value, working_dir).map_err(invalid)?;
        options.set(name, converted);
    }

    debug!(config = %config_name, options = options.values.len(), "Processed compiler options");
    Ok(options)
}

fn convert(kind: OptionKind, value: &Value, working_dir: &Path) -> std::result::Result<OptionValue, String> {
    match kind {
        OptionKind::Boolean => value
            .as_bool()
            .map(OptionValue::Bool)
            .ok_or_else(|| expected("a boolean", value)),
        OptionKind::Number => match value {
            Value::Number(n) => Ok(OptionValue::Number(n.clone())),
            _ => Err(expected("a number", value)),
        },
        OptionKind::String => as_str(value).map(|s| OptionValue::String(s.to_string())),
        OptionKind::Path => as_str(value).map(|s| OptionValue::Path(resolve_path(working_dir, s))),
        OptionKind::Enum(table) => {
            let raw = as_str(value)?;
            let lower = raw.to_ascii_lowercase();
            table
                .iter()
                .find(|(name, _)| *name == lower)
                .map(|&(name, code)| OptionValue::Enum(EnumValue { name, code }))
                .ok_or_else(|| {
                    let allowed: Vec<&str> = table.iter().map(|(name, _)| *name).collect();
                    format!("unknown value '{}', expected one of: {}", raw, allowed.join(", "))
                })
        }
        OptionKind::StringList => list(value, |item| as_str(item).map(|s| OptionValue::String(s.to_string()))),
        OptionKind::PathList => list(value, |item| {
            as_str(item).map(|s| OptionValue::Path(resolve_path(working_dir, s)))
        }),
        OptionKind::LibList => list(value, |item| {
            let lower = as_str(item)?.to_ascii_lowercase();
            if LIB_NAME_RE.is_match(&lower) {
                Ok(OptionValue::String(lower))
            } else {
                Err(format!("unknown library '{}'", lower))
            }
        }),
        OptionKind::ObjectList => list(value, |item| match item {
            Value::Object(map) => Ok(OptionValue::Object(map.clone())),
            _ => Err(expected("an object", item)),
        }),
        OptionKind::Paths => {
            let Value::Object(map) = value else {
                return Err(expected("an object", value));
            };
            for (pattern, targets) in map {
                let valid = targets
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string));
                if !valid {
                    return Err(format!("substitutions for pattern '{}' must be an array of strings", pattern));
                }
            }
            Ok(OptionValue::Object(map.clone()))
        }
    }
}

fn list(
    value: &Value,
    item: impl Fn(&Value) -> std::result::Result<OptionValue, String>,
) -> std::result::Result<OptionValue, String> {
    let Value::Array(items) = value else {
        return Err(expected("an array", value));
    };
    items.iter().map(item).collect::<std::result::Result<Vec<_>, _>>().map(OptionValue::List)
}

fn as_str(value: &Value) -> std::result::Result<&str, String> {
    value.as_str().ok_or_else(|| expected("a string", value))
}

fn expected(what: &str, found: &Value) -> String {
    format!("expected {}, found {}", what, found)
}

fn resolve_path(working_dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        normalize(&working_dir.join(path))
    }
}

/// Lexically drop `.` segments and fold `..` into their parent
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
