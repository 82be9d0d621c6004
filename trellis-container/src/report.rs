//! Construction report: what a container built, in which order.

use std::fmt;

use serde::Serialize;
use trellis_support::rendering::{PlanStep, render_plan};

/// Modules in instantiation order with the instances each produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerReport {
    pub modules: Vec<ModuleReport>,
}

/// One instantiated module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub instances: Vec<InstanceSummary>,
}

/// One registered instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSummary {
    pub name: String,
    /// Declared type, fully qualified
    pub type_name: &'static str,
    /// Extra types the instance is assignable to
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignable_to: Vec<&'static str>,
}

impl ContainerReport {
    /// Module names in the order they were instantiated.
    pub fn order(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// Total number of instances.
    pub fn instance_count(&self) -> usize {
        self.modules.iter().map(|m| m.instances.len()).sum()
    }
}

impl fmt::Display for ContainerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<PlanStep> = self
            .modules
            .iter()
            .map(|module| PlanStep {
                module: module.name.clone(),
                instances: module
                    .instances
                    .iter()
                    .map(|i| (i.name.clone(), i.type_name.to_string()))
                    .collect(),
            })
            .collect();
        f.write_str(&render_plan(&steps))
    }
}
