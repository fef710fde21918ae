//! Layer dependency resolution: reference collection, producer mapping, and
//! topological ordering with cycle detection.

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;

use geocad_config::{LayerConfig, ProjectConfig};
use geocad_types::{GeocadError, Result};

use crate::keys;
use crate::registry::OperationRegistry;

// ---------------------------------------------------------------------------
// ExecutionPlan
// ---------------------------------------------------------------------------

/// Resolved processing order for the enabled layers of a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Enabled layer names; every layer follows the layers it references.
    pub order: Vec<String>,
    /// Layers each enabled layer depends on, in declaration order.
    pub dependencies: IndexMap<String, Vec<String>>,
    /// Disabled layer names, in declaration order.
    pub disabled: Vec<String>,
}

impl ExecutionPlan {
    pub fn position(&self, layer: &str) -> Option<usize> {
        self.order.iter().position(|l| l == layer)
    }

    pub fn dependencies_of(&self, layer: &str) -> &[String] {
        self.dependencies
            .get(layer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// DependencyResolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// A name read by a layer, with the step that reads it. Layer-level
/// `source_layer` reads before step 0.
struct Reference {
    name: String,
    step: usize,
}

pub struct DependencyResolver<'r> {
    registry: &'r OperationRegistry,
}

impl<'r> DependencyResolver<'r> {
    pub fn new(registry: &'r OperationRegistry) -> Self {
        Self { registry }
    }

    /// Compute the processing order of `config`'s enabled layers.
    ///
    /// Fails with `UnresolvedReference` for names no enabled layer produces and
    /// with `CyclicDependency` when references form a cycle. Nothing is read
    /// or executed.
    pub fn resolve(&self, config: &ProjectConfig) -> Result<ExecutionPlan> {
        let enabled: Vec<&LayerConfig> = config.enabled_layers().collect();
        let disabled: Vec<String> = config
            .layers
            .iter()
            .filter(|l| !l.enabled)
            .map(|l| l.name.clone())
            .collect();
        let declared: HashMap<&str, usize> = enabled
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name.as_str(), i))
            .collect();

        let mut producers: HashMap<String, Vec<&str>> = HashMap::new();
        for layer in &enabled {
            for key in keys::published_keys(layer) {
                let owners = producers.entry(key).or_default();
                if !owners.contains(&layer.name.as_str()) {
                    owners.push(layer.name.as_str());
                }
            }
        }

        let mut dependencies: IndexMap<String, Vec<String>> = IndexMap::new();
        for layer in &enabled {
            let own_keys = keys::output_keys(layer);
            let mut deps: HashSet<&str> = HashSet::new();

            for reference in self.references(layer)? {
                // Keys written by earlier steps of the same chain.
                if let Some(j) = own_keys.iter().position(|k| *k == reference.name) {
                    if j < reference.step {
                        continue;
                    }
                    return Err(GeocadError::CyclicDependency {
                        layers: vec![layer.name.clone(), layer.name.clone()],
                    });
                }
                if reference.name == layer.name {
                    return Err(GeocadError::CyclicDependency {
                        layers: vec![layer.name.clone(), layer.name.clone()],
                    });
                }
                match producers.get(&reference.name) {
                    Some(owners) => {
                        deps.extend(owners.iter().copied().filter(|o| *o != layer.name));
                    }
                    None => {
                        if disabled.contains(&reference.name) {
                            tracing::warn!(
                                layer = %layer.name,
                                reference = %reference.name,
                                "Reference names a disabled layer"
                            );
                        }
                        return Err(GeocadError::UnresolvedReference {
                            reference: reference.name,
                            referrer: layer.name.clone(),
                        });
                    }
                }
            }

            let mut deps: Vec<String> = deps.into_iter().map(str::to_string).collect();
            deps.sort_by_key(|d| declared.get(d.as_str()).copied().unwrap_or(usize::MAX));
            dependencies.insert(layer.name.clone(), deps);
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut stack: Vec<&str> = Vec::new();
        for layer in &enabled {
            visit(&layer.name, &dependencies, &mut marks, &mut stack)?;
        }
        let order = stable_order(&enabled, &declared, &dependencies);

        tracing::debug!(order = ?order, disabled = ?disabled, "Resolved layer order");
        Ok(ExecutionPlan {
            order,
            dependencies,
            disabled,
        })
    }

    fn references(&self, layer: &LayerConfig) -> Result<Vec<Reference>> {
        let mut refs = Vec::new();
        if let Some(ref name) = layer.source_layer {
            refs.push(Reference {
                name: name.clone(),
                step: 0,
            });
        }
        for (i, op) in layer.operations.iter().enumerate() {
            if let Some(ref name) = op.source_layer {
                refs.push(Reference {
                    name: name.clone(),
                    step: i,
                });
            }
            let operation = self.registry.resolve(&op.op_type, &layer.name, i)?;
            refs.extend(
                operation
                    .referenced_layers(&op.parameters)
                    .into_iter()
                    .map(|name| Reference { name, step: i }),
            );
        }
        Ok(refs)
    }
}

/// Depth-first cycle check with three-colour marking.
fn visit<'c>(
    name: &'c str,
    dependencies: &'c IndexMap<String, Vec<String>>,
    marks: &mut HashMap<&'c str, Mark>,
    stack: &mut Vec<&'c str>,
) -> Result<()> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = stack.iter().position(|n| *n == name).unwrap_or(0);
            let mut layers: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
            layers.push(name.to_string());
            return Err(GeocadError::CyclicDependency { layers });
        }
        None => {}
    }

    marks.insert(name, Mark::InProgress);
    stack.push(name);
    for dep in dependencies.get(name).into_iter().flatten() {
        visit(dep, dependencies, marks, stack)?;
    }
    stack.pop();
    marks.insert(name, Mark::Done);
    Ok(())
}

/// Kahn's algorithm over an acyclic dependency map. Among the layers whose
/// dependencies are all emitted, the earliest declared goes next.
fn stable_order(
    enabled: &[&LayerConfig],
    declared: &HashMap<&str, usize>,
    dependencies: &IndexMap<String, Vec<String>>,
) -> Vec<String> {
    let mut pending: Vec<usize> = vec![0; enabled.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); enabled.len()];
    for (i, layer) in enabled.iter().enumerate() {
        for dep in dependencies.get(&layer.name).into_iter().flatten() {
            if let Some(&j) = declared.get(dep.as_str()) {
                pending[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..enabled.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(enabled.len());
    while let Some(i) = ready.pop_first() {
        order.push(enabled[i].name.clone());
        for &d in &dependents[i] {
            pending[d] -= 1;
            if pending[d] == 0 {
                ready.insert(d);
            }
        }
    }
    order
}
