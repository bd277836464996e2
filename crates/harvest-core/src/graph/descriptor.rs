//! `GraphDescriptor`: grafo congelado listo para inspección o serialización.
use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Diagnostic, GraphError};
use crate::model::{Artifact, Task};
use crate::scope::IdentityConflict;

/// Arista padre -> hijo (el hijo depende del padre).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub parent: String,
    pub child: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphDescriptor {
    pub name: String,
    pub artifacts: Vec<Artifact>,
    pub tasks: IndexMap<String, Task>,
    pub edges: Vec<Edge>,
    pub fingerprint: String,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub conflicts: Vec<IdentityConflict>,
}

impl GraphDescriptor {
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Tasks cuyo nombre empieza con `prefix`, en orden de registro.
    pub fn tasks_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.values().filter(move |t| t.name.starts_with(prefix))
    }

    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.parent == name)
            .map(|e| e.child.as_str())
            .collect()
    }

    /// Tasks sin dependientes.
    pub fn sinks(&self) -> Vec<&str> {
        self.tasks
            .keys()
            .filter(|n| !self.edges.iter().any(|e| &e.parent == *n))
            .map(String::as_str)
            .collect()
    }

    /// Tasks sin dependencias.
    pub fn sources(&self) -> Vec<&str> {
        self.tasks
            .values()
            .filter(|t| t.dependencies.is_empty())
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Orden topológico (Kahn), estable respecto al orden de registro.
    pub fn topological_order(&self) -> Result<Vec<&str>, GraphError> {
        let mut indegree: IndexMap<&str, usize> = self.tasks.keys().map(|k| (k.as_str(), 0)).collect();
        let mut children: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for e in &self.edges {
            let Some(d) = indegree.get_mut(e.child.as_str()) else {
                return Err(GraphError::Internal(format!("edge to unknown task '{}'", e.child)));
            };
            *d += 1;
            children.entry(e.parent.as_str()).or_default().push(e.child.as_str());
        }
        let mut queue: VecDeque<&str> = indegree.iter().filter(|(_, d)| **d == 0).map(|(k, _)| *k).collect();
        let mut order = Vec::with_capacity(self.tasks.len());
        while let Some(n) = queue.pop_front() {
            order.push(n);
            if let Some(cs) = children.get(n) {
                for &c in cs {
                    if let Some(d) = indegree.get_mut(c) {
                        *d -= 1;
                        if *d == 0 {
                            queue.push_back(c);
                        }
                    }
                }
            }
        }
        if order.len() != self.tasks.len() {
            let stuck = indegree.iter()
                                .find(|(_, d)| **d > 0)
                                .map(|(k, _)| k.to_string())
                                .unwrap_or_default();
            return Err(GraphError::Cycle(stuck));
        }
        Ok(order)
    }

    /// Todas las dependencias aparecen antes que el task en el orden de
    /// registro.
    pub fn dependencies_precede(&self) -> bool {
        self.tasks.values().enumerate().all(|(i, t)| {
                                           t.dependencies
                                            .iter()
                                            .all(|d| self.tasks.get_index_of(d).is_some_and(|j| j < i))
                                       })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, deps: &[&str]) -> Task {
        Task { name: name.into(),
               executable: "ih-error-log".into(),
               arguments: vec![],
               inputs: IndexMap::new(),
               outputs: IndexMap::new(),
               dependencies: deps.iter().map(|d| d.to_string()).collect(),
               label: None,
               walltime: None }
    }

    fn graph(tasks: Vec<Task>) -> GraphDescriptor {
        let edges = tasks.iter()
                         .flat_map(|t| {
                             t.dependencies.iter().map(move |d| Edge { parent: d.clone(),
                                                                       child: t.name.clone() })
                         })
                         .collect();
        GraphDescriptor { name: "g".into(),
                          artifacts: vec![],
                          tasks: tasks.into_iter().map(|t| (t.name.clone(), t)).collect(),
                          edges,
                          fingerprint: String::new(),
                          diagnostics: vec![],
                          conflicts: vec![] }
    }

    #[test]
    fn topological_order_respects_edges() {
        let g = graph(vec![task("a", &[]), task("b", &["a"]), task("c", &["a"]), task("d", &["b", "c"])]);
        assert_eq!(g.topological_order().unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(g.sinks(), vec!["d"]);
        assert_eq!(g.sources(), vec!["a"]);
        assert_eq!(g.dependents_of("a"), vec!["b", "c"]);
        assert!(g.dependencies_precede());
    }

    #[test]
    fn cycle_is_reported() {
        let g = graph(vec![task("a", &["b"]), task("b", &["a"])]);
        assert!(matches!(g.topological_order(), Err(GraphError::Cycle(_))));
        assert!(!g.dependencies_precede());
    }
}
