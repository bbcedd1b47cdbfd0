// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{Result, SuiteError};
use crate::task::{ResourceName, Task, TaskDescriptor, TaskIndex};

/// A task list whose `after` references have been turned into index links
/// and checked for cycles. Nothing has run yet.
#[derive(Debug)]
pub struct ResolvedSuite {
    tasks: Vec<Task>,
    /// Edge direction: dependency -> dependent.
    graph: DiGraphMap<TaskIndex, ()>,
}

impl ResolvedSuite {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<TaskIndex> {
        self.tasks.iter().position(|t| t.id() == id)
    }

    /// Tasks that list `index` in their `after`.
    pub fn dependents_of(&self, index: TaskIndex) -> Vec<TaskIndex> {
        let mut dependents: Vec<TaskIndex> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        dependents.sort_unstable();
        dependents
    }

    /// One valid causal order (dependencies first), for dry-run output.
    pub fn topological_order(&self) -> Vec<TaskIndex> {
        // Acyclic by construction, so the sort cannot fail.
        toposort(&self.graph, None).unwrap_or_else(|_| (0..self.tasks.len()).collect())
    }

    pub(crate) fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}

/// Turn descriptors into a [`ResolvedSuite`].
///
/// Fails on duplicate ids, invalid resource names, `after` ids that do not
/// exist ([`SuiteError::DependencyNotFound`]) and cycles
/// ([`SuiteError::CircularDependency`]). Input order is preserved.
pub fn resolve(descriptors: Vec<TaskDescriptor>) -> Result<ResolvedSuite> {
    let links = link(descriptors.iter().map(|d| (d.id.as_str(), d.after.as_slice())))?;
    check_cycles(&links, |i| descriptors[i].id.as_str())?;

    let mut tasks = Vec::with_capacity(descriptors.len());
    for (descriptor, dependencies) in descriptors.into_iter().zip(links) {
        let resources = parse_resources(&descriptor.id, &descriptor.resources)?;
        let name = descriptor.name.unwrap_or_else(|| descriptor.id.clone());
        tasks.push(Task::new(
            descriptor.id,
            name,
            resources,
            dependencies,
            descriptor.body,
            descriptor.skip,
        ));
    }

    let mut graph: DiGraphMap<TaskIndex, ()> = DiGraphMap::new();
    for (index, task) in tasks.iter().enumerate() {
        graph.add_node(index);
        for &dep in task.dependencies() {
            graph.add_edge(dep, index, ());
        }
    }

    debug!(tasks = tasks.len(), edges = graph.edge_count(), "resolved task graph");
    Ok(ResolvedSuite { tasks, graph })
}

/// Check ids and `after` references without building tasks.
///
/// Used by config validation so a bad suite file is rejected at load time.
pub fn validate_graph<'a, I>(entries: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let entries: Vec<(&str, &[String])> = entries.into_iter().collect();
    let links = link(entries.iter().copied())?;
    check_cycles(&links, |i| entries[i].0)
}

/// Validate a resource list and drop duplicates, keeping first occurrence.
pub fn parse_resources(task: &str, names: &[String]) -> Result<Vec<ResourceName>> {
    let mut seen = HashSet::new();
    let mut parsed = Vec::with_capacity(names.len());
    for raw in names {
        let name = ResourceName::from_str(raw).map_err(|_| SuiteError::InvalidResource {
            task: task.to_string(),
            resource: raw.clone(),
        })?;
        if seen.insert(name.clone()) {
            parsed.push(name);
        }
    }
    Ok(parsed)
}

/// Map every `after` id to the index of the task it names.
fn link<'a, I>(entries: I) -> Result<Vec<Vec<TaskIndex>>>
where
    I: Iterator<Item = (&'a str, &'a [String])> + Clone,
{
    let mut by_id: HashMap<&str, TaskIndex> = HashMap::new();
    for (index, (id, _)) in entries.clone().enumerate() {
        if by_id.insert(id, index).is_some() {
            return Err(SuiteError::DuplicateTask { id: id.to_string() });
        }
    }

    entries
        .map(|(id, after)| {
            let mut deps: Vec<TaskIndex> = Vec::with_capacity(after.len());
            for dep in after {
                let index = *by_id.get(dep.as_str()).ok_or_else(|| {
                    SuiteError::DependencyNotFound {
                        missing: dep.clone(),
                        task: id.to_string(),
                    }
                })?;
                if !deps.contains(&index) {
                    deps.push(index);
                }
            }
            Ok(deps)
        })
        .collect()
}

/// Depth-first walk from every task with dependencies.
///
/// A dependency found on the active path is a cycle. Tasks whose whole
/// dependency cone has been walked go into `checked` and are never walked
/// again, which keeps diamond-heavy graphs linear.
fn check_cycles<'a>(links: &[Vec<TaskIndex>], id_of: impl Fn(TaskIndex) -> &'a str) -> Result<()> {
    let mut checked: HashSet<TaskIndex> = HashSet::new();

    for root in 0..links.len() {
        if links[root].is_empty() || checked.contains(&root) {
            continue;
        }

        let mut on_path: HashSet<TaskIndex> = HashSet::from([root]);
        // (task, next dependency position to visit)
        let mut stack: Vec<(TaskIndex, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            match links[node].get(frame.1).copied() {
                Some(dep) => {
                    frame.1 += 1;
                    if on_path.contains(&dep) {
                        return Err(SuiteError::CircularDependency {
                            task: id_of(dep).to_string(),
                        });
                    }
                    if checked.contains(&dep) {
                        continue;
                    }
                    on_path.insert(dep);
                    stack.push((dep, 0));
                }
                None => {
                    stack.pop();
                    on_path.remove(&node);
                    checked.insert(node);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(deps_of: &[&[usize]]) -> Vec<Vec<TaskIndex>> {
        deps_of.iter().map(|deps| deps.to_vec()).collect()
    }

    fn name(i: TaskIndex) -> &'static str {
        ["t0", "t1", "t2", "t3", "t4", "t5"][i]
    }

    #[test]
    fn diamond_is_acyclic() {
        // 3 -> {1, 2} -> 0
        assert!(check_cycles(&links(&[&[], &[0], &[0], &[1, 2]]), name).is_ok());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = check_cycles(&links(&[&[0]]), name).unwrap_err();
        assert!(matches!(err, SuiteError::CircularDependency { ref task } if task == "t0"));
    }

    #[test]
    fn cycle_behind_acyclic_prefix_is_found() {
        // 0 -> 1 -> 2 -> 3 -> 1
        let err = check_cycles(&links(&[&[1], &[2], &[3], &[1]]), name).unwrap_err();
        match err {
            SuiteError::CircularDependency { task } => {
                assert!(["t1", "t2", "t3"].contains(&task.as_str()), "got {task}");
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn resources_are_deduplicated_in_order() {
        let parsed = parse_resources(
            "t",
            &["b".to_string(), "a".to_string(), "b".to_string()],
        )
        .unwrap();
        let names: Vec<&str> = parsed.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
