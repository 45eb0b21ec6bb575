//! Dependency graph and generation order

use crate::stack::{ComponentId, DependencySpec, ProjectContext};
use indexmap::IndexMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Component '{component}' requires '{spec}' but it's not available")]
    UnresolvedDependency {
        component: ComponentId,
        spec: DependencySpec,
    },

    #[error("Circular dependencies detected: {}", format_cycle(.cycle))]
    CyclicDependency { cycle: Vec<ComponentId> },
}

fn format_cycle(cycle: &[ComponentId]) -> String {
    let mut names: Vec<String> = cycle.iter().map(ToString::to_string).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names.join(" -> ")
}

/// Result of resolving one run's components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Generation order. Empty when a cycle was found.
    pub order: Vec<ComponentId>,
    /// Resolved `(dependency, dependent)` edges in discovery order.
    pub edges: Vec<(ComponentId, ComponentId)>,
    pub errors: Vec<ResolveError>,
}

impl Resolution {
    pub fn has_cycle(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, ResolveError::CyclicDependency { .. }))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &ResolveError> {
        self.errors
            .iter()
            .filter(|e| matches!(e, ResolveError::UnresolvedDependency { .. }))
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Builds the `dependency -> dependent` graph and orders it.
///
/// Concrete specs must name a component in `components`. Capability specs
/// go to the owner of the first connection exposing the capability. Nodes
/// with no ordering constraint keep the order of `components`.
pub fn resolve(
    components: &[ComponentId],
    dependencies: &IndexMap<ComponentId, Vec<DependencySpec>>,
    context: &ProjectContext,
) -> Resolution {
    let index: IndexMap<&ComponentId, usize> =
        components.iter().enumerate().map(|(i, c)| (c, i)).collect();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); components.len()];
    let mut resolution = Resolution::default();

    for (component, specs) in dependencies {
        let Some(&to) = index.get(component) else {
            continue;
        };
        for spec in specs {
            let target = match spec {
                DependencySpec::Component(id) => index.get(id).copied(),
                DependencySpec::Capability(capability) => context
                    .service_by_capability(capability)
                    .and_then(|conn| index.get(&conn.owner).copied()),
            };

            match target {
                Some(from) if from == to => {
                    debug!(component = %component, spec = %spec, "Self dependency");
                    let cycle = vec![component.clone()];
                    if !resolution.errors.iter().any(
                        |e| matches!(e, ResolveError::CyclicDependency { cycle: c } if *c == cycle),
                    ) {
                        resolution.errors.push(ResolveError::CyclicDependency { cycle });
                    }
                }
                Some(from) => {
                    if !adjacency[from].contains(&to) {
                        adjacency[from].push(to);
                        resolution
                            .edges
                            .push((components[from].clone(), components[to].clone()));
                    }
                }
                None => {
                    debug!(component = %component, spec = %spec, "Unresolved dependency");
                    resolution.errors.push(ResolveError::UnresolvedDependency {
                        component: component.clone(),
                        spec: spec.clone(),
                    });
                }
            }
        }
    }

    let cycles = elementary_cycles(&adjacency);
    let self_loops = resolution
        .errors
        .iter()
        .any(|e| matches!(e, ResolveError::CyclicDependency { .. }));
    if self_loops || !cycles.is_empty() {
        for cycle in cycles {
            resolution.errors.push(ResolveError::CyclicDependency {
                cycle: cycle.into_iter().map(|i| components[i].clone()).collect(),
            });
        }
        return resolution;
    }

    resolution.order = topological_sort(&adjacency)
        .into_iter()
        .map(|i| components[i].clone())
        .collect();
    resolution
}

/// Kahn's algorithm; ready nodes are taken lowest index first.
fn topological_sort(adjacency: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree = vec![0usize; adjacency.len()];
    for targets in adjacency {
        for &t in targets {
            in_degree[t] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(adjacency.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &dependent in &adjacency[node] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }
    order
}

/// Every elementary cycle, each rooted at its lowest index node.
fn elementary_cycles(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    fn walk(
        start: usize,
        node: usize,
        adjacency: &[Vec<usize>],
        path: &mut Vec<usize>,
        on_path: &mut [bool],
        cycles: &mut Vec<Vec<usize>>,
    ) {
        for &next in &adjacency[node] {
            if next == start {
                cycles.push(path.clone());
            } else if next > start && !on_path[next] {
                path.push(next);
                on_path[next] = true;
                walk(start, next, adjacency, path, on_path, cycles);
                on_path[next] = false;
                path.pop();
            }
        }
    }

    let mut cycles = Vec::new();
    let mut on_path = vec![false; adjacency.len()];
    for start in 0..adjacency.len() {
        let mut path = vec![start];
        on_path[start] = true;
        walk(start, start, adjacency, &mut path, &mut on_path, &mut cycles);
        on_path[start] = false;
    }
    cycles
}
