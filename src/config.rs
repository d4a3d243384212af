use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use serde_json::Value;
use ts_rs::TS;

use crate::error::{LoaderError, Result};

const MODULE_TO_PLUGINS_MAP: &str = "moduleToPluginsMap";

/// Directory plugin names are joined against in direct mode: this crate's own root.
pub fn default_base_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Loader options, tagged by `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "mode", rename_all = "camelCase")]
#[ts(export)]
pub enum LoaderOptions {
    /// Inject the configured plugins into every file.
    Direct(DirectOptions),
    /// Inject plugins only into files that require one of the trigger modules.
    Dependencies(DependencyOptions),
}

#[serde_inline_default]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DirectOptions {
    /// plugin name -> enabled, in declaration order
    #[ts(type = "Record<string, boolean>")]
    pub plugins: IndexMap<String, bool>,

    #[serde_inline_default(default_base_dir())]
    #[ts(type = "string")]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DependencyOptions {
    /// trigger module id -> plugin module ids, both absolute
    #[serde(default)]
    #[ts(type = "Record<string, Array<string>>")]
    pub module_to_plugins_map: IndexMap<String, Vec<String>>,
}

impl DirectOptions {
    pub fn new<I, S>(plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            plugins: plugins.into_iter().map(|name| (name.into(), true)).collect(),
            base_dir: default_base_dir(),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }
}

impl DependencyOptions {
    pub fn new(module_to_plugins_map: IndexMap<String, Vec<String>>) -> Self {
        Self {
            module_to_plugins_map,
        }
    }
}

impl LoaderOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(config_error)?;
        Self::from_value(value)
    }

    /// Reads either the tagged form or the legacy untagged shapes:
    /// `{ "moduleToPluginsMap": { .. } }` or `{ "<plugin>": <flag>, .. }`.
    pub fn from_value(value: Value) -> Result<Self> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(LoaderError::Config(format!(
                    "options must be an object, found {other}"
                )))
            }
        };

        if object.contains_key("mode") {
            return serde_json::from_value(Value::Object(object)).map_err(config_error);
        }

        if let Some(map) = object.get(MODULE_TO_PLUGINS_MAP) {
            let module_to_plugins_map = match map {
                Value::Null => IndexMap::new(),
                Value::Object(_) => serde_json::from_value(map.clone()).map_err(config_error)?,
                other => {
                    return Err(LoaderError::Config(format!(
                        "{MODULE_TO_PLUGINS_MAP} must be an object, found {other}"
                    )))
                }
            };
            return Ok(Self::Dependencies(DependencyOptions::new(module_to_plugins_map)));
        }

        let plugins = object
            .into_iter()
            .map(|(name, flag)| {
                let enabled = is_truthy(&flag);
                (name, enabled)
            })
            .collect();

        Ok(Self::Direct(DirectOptions {
            plugins,
            base_dir: default_base_dir(),
        }))
    }
}

fn config_error(err: serde_json::Error) -> LoaderError {
    LoaderError::Config(err.to_string())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
