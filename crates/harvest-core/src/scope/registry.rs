//! `Scope`: registros de artifacts y tasks de un grafo emitido.
//!
//! Cada variante de grafo (completo, sólo extracción, estadísticas) recibe su
//! propio `Scope` explícito. Las registraciones duplicadas son idempotentes:
//! gana la primera, y si el contenido difiere queda un `IdentityConflict`.
//! Las dependencias sólo pueden apuntar a tasks ya registrados, de modo que
//! el grafo es acíclico por construcción.
use indexmap::IndexMap;
use log::{debug, warn};

use super::{ConflictKind, IdentityConflict};
use crate::arguments::{resolve_arguments, ArgumentContext};
use crate::constants::COMPILER_VERSION;
use crate::errors::{Diagnostic, GraphError};
use crate::graph::{Edge, GraphDescriptor};
use crate::hashing::graph_fingerprint;
use crate::model::{Artifact, ArtifactKey, ArtifactRole, GraphFingerprintInput, Task, TaskSpec};
use crate::signature::SignatureTable;

#[derive(Debug, Clone)]
pub struct Scope {
    name: String,
    artifacts: IndexMap<ArtifactKey, Artifact>,
    tasks: IndexMap<String, Task>,
    conflicts: Vec<IdentityConflict>,
    diagnostics: Vec<Diagnostic>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               artifacts: IndexMap::new(),
               tasks: IndexMap::new(),
               conflicts: Vec::new(),
               diagnostics: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registra un archivo de entrada con su ubicación física.
    pub fn register_input(&mut self,
                          category: &str,
                          name: &str,
                          path: &str,
                          derived_prefix: Option<&str>)
                          -> &Artifact {
        let artifact = Artifact { category: category.to_string(),
                                  role: ArtifactRole::Input,
                                  name: name.to_string(),
                                  path: Some(path.to_string()),
                                  transfer: false,
                                  derived_prefix: derived_prefix.map(str::to_string) };
        self.insert_artifact(artifact)
    }

    /// Registra un archivo producido por algún task del scope.
    pub fn register_output(&mut self, category: &str, name: &str, transfer: bool) -> &Artifact {
        let artifact = Artifact { category: category.to_string(),
                                  role: ArtifactRole::Output,
                                  name: name.to_string(),
                                  path: None,
                                  transfer,
                                  derived_prefix: None };
        self.insert_artifact(artifact)
    }

    fn insert_artifact(&mut self, artifact: Artifact) -> &Artifact {
        let key = artifact.key();
        if let Some(existing) = self.artifacts.get(&key) {
            if *existing != artifact {
                let identity = format!("{}/{:?}/{}", key.category, key.role, key.name);
                warn!("register_artifact:conflict scope={} artifact={}", self.name, identity);
                self.conflicts.push(IdentityConflict { kind: ConflictKind::Artifact,
                                                       identity,
                                                       detail: format!("kept {:?}, ignored {:?}", existing, artifact) });
            }
        }
        self.artifacts.entry(key).or_insert(artifact)
    }

    pub fn artifact_exists(&self, category: &str, role: ArtifactRole, name: &str) -> bool {
        self.artifacts.contains_key(&ArtifactKey::new(category, role, name))
    }

    pub fn artifact(&self, category: &str, role: ArtifactRole, name: &str) -> Option<&Artifact> {
        self.artifacts.get(&ArtifactKey::new(category, role, name))
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    pub fn task_exists(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn conflicts(&self) -> &[IdentityConflict] {
        &self.conflicts
    }

    /// Registra un task resolviendo sus argumentos contra la firma del
    /// ejecutable.
    ///
    /// Errores fatales: ejecutable desconocido o dependencia ausente en el
    /// scope. Los argumentos requeridos sin resolver quedan como diagnósticos.
    pub fn register_task(&mut self, spec: TaskSpec, table: &SignatureTable) -> Result<&Task, GraphError> {
        let signature = table.require(&spec.executable)?;

        if self.tasks.contains_key(&spec.name) {
            self.note_task_conflict(&spec);
            return self.tasks
                       .get(&spec.name)
                       .ok_or_else(|| GraphError::Internal(format!("task '{}' vanished", spec.name)));
        }

        let mut dependencies: Vec<String> = Vec::with_capacity(spec.dependencies.len());
        for dep in &spec.dependencies {
            if !self.tasks.contains_key(dep) {
                return Err(GraphError::UnknownDependency { scope: self.name.clone(),
                                                           task: spec.name.clone(),
                                                           dependency: dep.clone() });
            }
            if !dependencies.contains(dep) {
                dependencies.push(dep.clone());
            }
        }

        let ctx = ArgumentContext { task: &spec.name,
                                    inputs: &spec.inputs,
                                    outputs: &spec.outputs };
        let resolution = resolve_arguments(&ctx, signature.arguments.as_ref(), &spec.arguments);
        self.diagnostics.extend(resolution.diagnostics);

        let task = Task { name: spec.name.clone(),
                          executable: spec.executable,
                          arguments: resolution.arguments,
                          inputs: spec.inputs,
                          outputs: spec.outputs,
                          dependencies,
                          label: spec.label,
                          walltime: spec.walltime };
        Ok(self.tasks.entry(spec.name).or_insert(task))
    }

    fn note_task_conflict(&mut self, spec: &TaskSpec) {
        let Some(existing) = self.tasks.get(&spec.name) else {
            return;
        };
        let same = existing.executable == spec.executable
                   && existing.inputs == spec.inputs
                   && existing.outputs == spec.outputs
                   && existing.label == spec.label
                   && existing.walltime == spec.walltime;
        if !same {
            warn!("register_task:conflict scope={} task={}", self.name, spec.name);
            self.conflicts.push(IdentityConflict { kind: ConflictKind::Task,
                                                   identity: spec.name.clone(),
                                                   detail: format!("kept executable '{}', ignored '{}'",
                                                                   existing.executable, spec.executable) });
        }
    }

    /// Congela el scope en un `GraphDescriptor` con su fingerprint.
    pub fn finish(self) -> GraphDescriptor {
        let artifacts: Vec<Artifact> = self.artifacts.into_values().collect();
        let edges: Vec<Edge> = self.tasks
                                   .values()
                                   .flat_map(|t| {
                                       t.dependencies.iter().map(move |d| Edge { parent: d.clone(),
                                                                                 child: t.name.clone() })
                                   })
                                   .collect();
        let input = GraphFingerprintInput { compiler_version: COMPILER_VERSION,
                                            scope: &self.name,
                                            artifacts: &artifacts,
                                            tasks: self.tasks.values().collect() };
        let fingerprint = match graph_fingerprint(&input) {
            Ok(f) => f,
            Err(e) => {
                warn!("finish:fingerprint_failed scope={} err={}", self.name, e);
                String::new()
            }
        };
        debug!("finish:done scope={} tasks={} artifacts={} edges={}",
               self.name,
               self.tasks.len(),
               artifacts.len(),
               edges.len());
        GraphDescriptor { name: self.name,
                          artifacts,
                          tasks: self.tasks,
                          edges,
                          fingerprint,
                          diagnostics: self.diagnostics,
                          conflicts: self.conflicts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileBinding;

    fn table() -> SignatureTable {
        SignatureTable::builtin()
    }

    fn resize(name: &str, input: &str, output: &str) -> TaskSpec {
        TaskSpec::new(name, "ih-resize").input("base", FileBinding::new(input, false))
                                        .output("small", FileBinding::new(output, false))
                                        .arg("--scale", 0.5)
    }

    #[test]
    fn duplicate_input_returns_first_and_keeps_size() {
        let mut s = Scope::new("full");
        s.register_input("rgb", "a.png", "/data/a.png", None);
        let again = s.register_input("rgb", "a.png", "/data/a.png", None).clone();
        assert_eq!(again.path.as_deref(), Some("/data/a.png"));
        assert_eq!(s.artifact_count(), 1);
        assert!(s.conflicts().is_empty());
    }

    #[test]
    fn conflicting_artifact_is_recorded_not_replaced() {
        let mut s = Scope::new("full");
        s.register_input("rgb", "a.png", "/data/a.png", None);
        let kept = s.register_input("rgb", "a.png", "/other/a.png", None).clone();
        assert_eq!(kept.path.as_deref(), Some("/data/a.png"));
        assert_eq!(s.conflicts().len(), 1);
        assert_eq!(s.conflicts()[0].kind, ConflictKind::Artifact);
    }

    #[test]
    fn same_name_different_role_or_category_are_distinct() {
        let mut s = Scope::new("full");
        s.register_input("rgb", "x.png", "/p", None);
        s.register_output("rgb", "x.png", false);
        s.register_output("fluo", "x.png", false);
        assert_eq!(s.artifact_count(), 3);
        assert!(s.artifact_exists("rgb", ArtifactRole::Output, "x.png"));
        assert!(!s.artifact_exists("raw", ArtifactRole::Output, "x.png"));
    }

    #[test]
    fn task_resolves_arguments_to_bound_files() {
        let mut s = Scope::new("full");
        let t = s.register_task(resize("r", "in.jpg", "out.png"), &table()).unwrap();
        assert_eq!(t.argv(),
                   vec!["--input", "in.jpg", "--output", "out.png", "--writeblank", "", "--scale", "0.5"]);
    }

    #[test]
    fn unknown_dependency_is_fatal() {
        let mut s = Scope::new("full");
        let err = s.register_task(resize("r", "a", "b").depends_on(["ghost"]), &table()).unwrap_err();
        assert_eq!(err,
                   GraphError::UnknownDependency { scope: "full".into(),
                                                   task: "r".into(),
                                                   dependency: "ghost".into() });
        assert_eq!(s.task_count(), 0);
    }

    #[test]
    fn unknown_executable_is_fatal() {
        let mut s = Scope::new("full");
        let err = s.register_task(TaskSpec::new("x", "ih-unknown"), &table()).unwrap_err();
        assert_eq!(err, GraphError::UnknownExecutable("ih-unknown".into()));
    }

    #[test]
    fn duplicate_task_is_noop_and_conflict_detectable() {
        let mut s = Scope::new("full");
        s.register_task(resize("r", "a", "b"), &table()).unwrap();
        s.register_task(resize("r", "a", "b"), &table()).unwrap();
        assert_eq!(s.task_count(), 1);
        assert!(s.conflicts().is_empty());
        let kept = s.register_task(TaskSpec::new("r", "ih-equalize-hist"), &table()).unwrap().clone();
        assert_eq!(kept.executable, "ih-resize");
        assert_eq!(s.conflicts().len(), 1);
        assert_eq!(s.conflicts()[0].kind, ConflictKind::Task);
    }

    #[test]
    fn missing_required_argument_is_diagnostic_and_task_still_registered() {
        let mut s = Scope::new("full");
        let spec = TaskSpec::new("t", "ih-threshold").input("gray", FileBinding::new("g.png", false))
                                                      .output("bin", FileBinding::new("b.png", false));
        let t = s.register_task(spec, &table()).unwrap();
        assert!(t.argument("--thresh").is_none());
        assert_eq!(s.diagnostics().len(), 1);
        assert!(s.diagnostics()[0].message.contains("--thresh"));
    }

    #[test]
    fn finish_builds_edges_and_stable_fingerprint() {
        let build = || {
            let mut s = Scope::new("full");
            s.register_task(resize("a", "in", "mid"), &table()).unwrap();
            s.register_task(resize("b", "mid", "out").depends_on(["a", "a"]), &table()).unwrap();
            s.finish()
        };
        let g1 = build();
        let g2 = build();
        assert_eq!(g1.edges,
                   vec![Edge { parent: "a".into(),
                               child: "b".into() }]);
        assert_eq!(g1.task("b").unwrap().dependencies, vec!["a".to_string()]);
        assert_eq!(g1.fingerprint.len(), 64);
        assert_eq!(g1.fingerprint, g2.fingerprint);
    }
}
