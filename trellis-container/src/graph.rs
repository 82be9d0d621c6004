//! Module dependency graph and instantiation order.
//!
//! Nodes are module descriptors. Module `A` gets an edge to module `B`
//! when one of `A`'s dependency slots could be satisfied by one of `B`'s
//! factories:
//! - named slot: the module declaring a factory with that exact name
//! - typed slot: every module declaring a factory of exactly that type,
//!   or, when there is none, every module with a factory assignable to it
//!
//! Slots that match nothing get no edge; they fail later, at resolution.
//! The graph only lives for the duration of a build.

use std::collections::HashMap;

use tracing::{debug, instrument, trace, warn};

use crate::capability::is_assignable;
use crate::descriptor::{FactoryDeclaration, ModuleDescriptor};
use crate::error::{CircularDependencyError, DuplicateNameError, Result, TrellisError};
use crate::key::{SlotKey, TypeKey};

/// Dependency edges between modules, indexed like the descriptor slice.
#[derive(Debug)]
pub(crate) struct DependencyGraph<'a> {
    modules: &'a [ModuleDescriptor],
    /// `edges[i]` lists the modules `i` depends on, in first-seen order.
    edges: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    /// Builds the graph. Fails if two factories share a name.
    #[instrument(skip_all, name = "graph_build", fields(modules = modules.len()))]
    pub fn build(modules: &'a [ModuleDescriptor]) -> Result<Self> {
        let providers_by_name = index_names(modules)?;

        let mut edges = vec![Vec::new(); modules.len()];
        for (consumer, module) in modules.iter().enumerate() {
            for slot in &module.slots {
                let providers: Vec<usize> = match &slot.key {
                    SlotKey::Name(name) => providers_by_name.get(name.as_str()).copied().into_iter().collect(),
                    SlotKey::Type(key) => providers_of_type(modules, *key),
                };

                if providers.is_empty() {
                    trace!(module = %module.name, slot = %slot.key, "Slot has no static provider");
                }

                for provider in providers {
                    if !edges[consumer].contains(&provider) {
                        edges[consumer].push(provider);
                    }
                }
            }
        }

        debug!(
            edges = edges.iter().map(Vec::len).sum::<usize>(),
            "Dependency graph built"
        );

        Ok(Self { modules, edges })
    }

    /// Modules that module `index` depends on.
    pub fn dependencies_of(&self, index: usize) -> &[usize] {
        &self.edges[index]
    }

    /// Orders modules so each comes after every module it depends on.
    ///
    /// Depth-first, visiting modules and their edges in input order, so
    /// unrelated modules keep their relative input order.
    ///
    /// # Errors
    /// [`TrellisError::CircularDependency`] naming the modules in the loop.
    #[instrument(skip(self), name = "graph_schedule")]
    pub fn instantiation_order(&self) -> Result<Vec<usize>> {
        let mut scheduler = Scheduler {
            graph: self,
            state: vec![Mark::Unvisited; self.modules.len()],
            path: Vec::new(),
            order: Vec::with_capacity(self.modules.len()),
        };

        for index in 0..self.modules.len() {
            scheduler.visit(index)?;
        }

        debug!(
            order = ?scheduler.order.iter().map(|&i| self.modules[i].name.as_str()).collect::<Vec<_>>(),
            "Instantiation order computed"
        );
        Ok(scheduler.order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    /// On the current DFS path
    Visiting,
    Done,
}

struct Scheduler<'g, 'a> {
    graph: &'g DependencyGraph<'a>,
    state: Vec<Mark>,
    path: Vec<usize>,
    order: Vec<usize>,
}

impl Scheduler<'_, '_> {
    /// Post-order DFS from `root` using an explicit stack of
    /// `(module, next edge)` frames, so chain depth is not bounded by the
    /// thread stack.
    fn visit(&mut self, root: usize) -> Result<()> {
        if self.state[root] != Mark::Unvisited {
            return Ok(());
        }

        self.enter(root);
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = frames.last_mut() {
            let (index, next) = *frame;
            let dependency = self.graph.dependencies_of(index).get(next).copied();

            match dependency {
                Some(dependency) => {
                    frame.1 += 1;
                    match self.state[dependency] {
                        Mark::Done => {}
                        Mark::Visiting => return Err(self.cycle_through(dependency)),
                        Mark::Unvisited => {
                            self.enter(dependency);
                            frames.push((dependency, 0));
                        }
                    }
                }
                None => {
                    frames.pop();
                    self.path.pop();
                    self.state[index] = Mark::Done;
                    self.order.push(index);
                }
            }
        }

        Ok(())
    }

    fn enter(&mut self, index: usize) {
        self.state[index] = Mark::Visiting;
        self.path.push(index);
    }

    fn cycle_through(&self, index: usize) -> TrellisError {
        let start = self.path.iter().position(|&i| i == index).unwrap_or(0);

        let modules = self.graph.modules;
        let mut chain: Vec<String> = self.path[start..]
            .iter()
            .map(|&i| modules[i].name.clone())
            .collect();
        chain.push(modules[index].name.clone());

        warn!(cycle = ?chain, "Circular dependency detected");
        TrellisError::CircularDependency(CircularDependencyError { chain })
    }
}

/// Maps every factory name to its module, rejecting duplicates.
fn index_names(modules: &[ModuleDescriptor]) -> Result<HashMap<&str, usize>> {
    let mut by_name: HashMap<&str, usize> = HashMap::new();

    for (index, module) in modules.iter().enumerate() {
        for factory in &module.factories {
            if let Some(&first) = by_name.get(factory.name.as_str()) {
                warn!(name = %factory.name, "Instance name declared twice");
                return Err(TrellisError::DuplicateName(DuplicateNameError {
                    name: factory.name.clone(),
                    first_module: modules[first].name.clone(),
                    second_module: module.name.clone(),
                }));
            }
            by_name.insert(factory.name.as_str(), index);
        }
    }

    Ok(by_name)
}

/// Modules able to satisfy a typed slot: exact declared type first, else assignable.
fn providers_of_type(modules: &[ModuleDescriptor], key: TypeKey) -> Vec<usize> {
    let exact = modules_with(modules, |factory| factory.capabilities.declared() == key);
    if !exact.is_empty() {
        return exact;
    }
    modules_with(modules, |factory| is_assignable(&factory.capabilities, key))
}

fn modules_with(modules: &[ModuleDescriptor], accept: impl Fn(&FactoryDeclaration) -> bool) -> Vec<usize> {
    modules
        .iter()
        .enumerate()
        .filter(|(_, module)| module.factories.iter().any(&accept))
        .map(|(index, _)| index)
        .collect()
}
