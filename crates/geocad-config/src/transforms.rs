//! Post-parse transforms for project configurations.
//!
//! Expands `${variable}` references in every path-valued field and anchors relative
//! paths to the directory of the configuration file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::ProjectConfig;

/// Apply all transforms to a project configuration in the correct order.
pub fn apply_transforms(config: &mut ProjectConfig, base_dir: Option<&Path>) {
    // 1. Expand variables in paths
    expand_path_variables(config);

    // 2. Anchor relative paths
    if let Some(base) = base_dir {
        resolve_relative_paths(config, base);
    }
}

fn expand_path_variables(config: &mut ProjectConfig) {
    let vars: HashMap<String, String> = config
        .variables
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if vars.is_empty() {
        return;
    }

    let expand = |path: &mut PathBuf| {
        let raw = path.to_string_lossy().into_owned();
        let expanded = expand_variables(&raw, &vars);
        if expanded != raw {
            *path = PathBuf::from(expanded);
        }
    };

    for layer in &mut config.layers {
        if let Some(ref mut source) = layer.source {
            expand(&mut source.path);
        }
    }
    if let Some(ref mut dxf) = config.output.dxf {
        expand(dxf);
    }
    for report in &mut config.reports {
        expand(&mut report.path);
    }
}

fn resolve_relative_paths(config: &mut ProjectConfig, base: &Path) {
    let anchor = |path: &mut PathBuf| {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    };

    for layer in &mut config.layers {
        if let Some(ref mut source) = layer.source {
            anchor(&mut source.path);
        }
    }
    if let Some(ref mut dxf) = config.output.dxf {
        anchor(dxf);
    }
    for report in &mut config.reports {
        anchor(&mut report.path);
    }
}

/// Expand `${variable}` patterns in a string.
///
/// Replaces each occurrence of `${key}` with the corresponding value from `vars`.
/// Variables that do not appear in `vars` are left as-is.
pub fn expand_variables(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("${{{}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}
