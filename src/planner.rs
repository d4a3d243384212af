use std::{collections::HashSet, path::Path};

use indexmap::IndexMap;
use path_absolutize::*;

use crate::{
    config::DirectOptions,
    error::{LoaderError, Result},
    resolver::ModuleId,
};

/// One injected module and the label written next to its require call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterEntry {
    pub id: ModuleId,
    pub label: String,
}

/// Plugins injected unconditionally in direct mode, in key order.
///
/// Every configured key is an entry whatever its flag says. Names are joined
/// against `base_dir`.
pub fn plan_direct(options: &DirectOptions) -> Result<Vec<FooterEntry>> {
    options
        .plugins
        .keys()
        .map(|name| {
            let path = Path::new(name)
                .absolutize_from(&options.base_dir)
                .map_err(|_| LoaderError::InvalidPath {
                    name: name.clone(),
                    base: options.base_dir.clone(),
                })?;
            Ok(FooterEntry {
                id: ModuleId::from(path.into_owned()),
                label: name.clone(),
            })
        })
        .collect()
}

/// Plugins of every trigger found among `resolved`, in the order triggers were
/// first required. A trigger required twice contributes once; plugins shared
/// by different triggers are listed once per trigger.
pub fn plan_dependencies(
    module_to_plugins_map: &IndexMap<String, Vec<String>>,
    resolved: &[ModuleId],
    context: &Path,
) -> Vec<FooterEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for id in resolved {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let Some(plugins) = module_to_plugins_map.get(id.as_str()) else {
            continue;
        };
        entries.extend(plugins.iter().map(|plugin| FooterEntry {
            id: ModuleId::from(plugin.as_str()),
            label: relative_label(plugin, context),
        }));
    }

    entries
}

fn relative_label(plugin: &str, context: &Path) -> String {
    pathdiff::diff_paths(plugin, context)
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(|relative| relative.to_string_lossy().into_owned())
        .unwrap_or_else(|| plugin.to_string())
}
