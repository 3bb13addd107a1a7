//! Dependency graph and statement ordering.
//!
//! Edges run from a dependency to its dependent, so a topological order
//! lists dependencies first. Ties are broken by `(kind rank, qualified
//! name)`, which keeps the output byte-identical across runs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::{debug, warn};

use crate::change::Change;
use crate::snapshot::{ObjectId, Snapshot};
use crate::statements::Fragment;

/// Note attached to the diagnostic change recorded for a broken cycle.
pub const CYCLE_NOTE: &str = "dependency cycle broken by declaration order";

/// A topological order, plus the nodes emitted early to break cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    /// Nodes, dependencies first.
    pub order: Vec<ObjectId>,
    /// Nodes emitted while some of their dependencies were still pending.
    pub broken: Vec<ObjectId>,
}

/// A directed graph of object dependencies.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<ObjectId, ()>,
    node_map: BTreeMap<ObjectId, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph over `roots` and everything they transitively
    /// depend on in `snapshot`. Roots keep their order as declaration order.
    pub fn from_snapshot<'a>(
        roots: impl IntoIterator<Item = &'a ObjectId>,
        snapshot: &Snapshot,
    ) -> Self {
        let mut dag = Self::new();
        let mut queue = VecDeque::new();
        for root in roots {
            dag.add_object(root);
            queue.push_back(root.clone());
        }

        let mut visited = BTreeSet::new();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id.clone()) {
                continue;
            }
            for dep in snapshot.dependencies_of(&id).unwrap_or_default() {
                dag.add_dependency(&id, &dep);
                queue.push_back(dep);
            }
        }
        dag
    }

    /// Adds a node if it is not present yet.
    pub fn add_object(&mut self, id: &ObjectId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.node_map.insert(id.clone(), idx);
        idx
    }

    /// Records that `dependent` depends on `dependency`.
    pub fn add_dependency(&mut self, dependent: &ObjectId, dependency: &ObjectId) {
        if dependent == dependency {
            return;
        }
        let from = self.add_object(dependency);
        let to = self.add_object(dependent);
        self.graph.update_edge(from, to, ());
    }

    /// Returns true if the node is present.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Direct dependencies of a node, sorted.
    #[must_use]
    pub fn dependencies(&self, id: &ObjectId) -> BTreeSet<ObjectId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct dependents of a node, sorted.
    #[must_use]
    pub fn dependents(&self, id: &ObjectId) -> BTreeSet<ObjectId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &ObjectId, direction: Direction) -> BTreeSet<ObjectId> {
        self.node_map
            .get(id)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, direction)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Kahn's algorithm with a sorted ready set.
    ///
    /// When every remaining node still waits on a dependency, the one
    /// declared first is emitted and recorded in [`Ordering::broken`].
    #[must_use]
    pub fn topological_order(&self) -> Ordering {
        let count = self.graph.node_count();
        let mut pending: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.graph.neighbors_directed(idx, Direction::Incoming).count())
            .collect();
        let mut emitted = vec![false; count];
        let mut ready: BTreeSet<(&ObjectId, NodeIndex)> = self
            .graph
            .node_indices()
            .filter(|idx| pending[idx.index()] == 0)
            .map(|idx| (&self.graph[idx], idx))
            .collect();

        let mut ordering = Ordering::default();
        while ordering.order.len() < count {
            let next = if let Some((_, idx)) = ready.pop_first() {
                idx
            } else {
                let Some(idx) = self.graph.node_indices().find(|i| !emitted[i.index()]) else {
                    break;
                };
                ordering.broken.push(self.graph[idx].clone());
                idx
            };

            emitted[next.index()] = true;
            ordering.order.push(self.graph[next].clone());
            for dependent in self.graph.neighbors_directed(next, Direction::Outgoing) {
                let remaining = &mut pending[dependent.index()];
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 && !emitted[dependent.index()] {
                    ready.insert((&self.graph[dependent], dependent));
                }
            }
        }
        ordering
    }
}

/// Ordered fragments for a set of changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Linearized {
    /// Fragments in emission order.
    pub fragments: Vec<Fragment>,
    /// One diagnostic change per node emitted to break a cycle.
    pub diagnostics: Vec<Change>,
}

/// Orders the statements of `changes`.
///
/// Drops follow the reverse topological order of the source snapshot,
/// creates and alters the forward order of the target snapshot, and
/// trailing metadata comes last in create order. Changes sharing a node
/// keep their generation order.
#[must_use]
pub fn linearize(changes: &[Change], source: &Snapshot, target: &Snapshot) -> Linearized {
    let mut by_node: BTreeMap<&ObjectId, Vec<&Change>> = BTreeMap::new();
    for change in changes.iter().filter(|c| !c.is_diagnostic()) {
        by_node.entry(&change.node).or_default().push(change);
    }
    let roots: Vec<&ObjectId> = changes.iter().map(|c| &c.node).collect();

    let drop_graph = DependencyGraph::from_snapshot(roots.iter().copied(), source);
    let mut create_graph = DependencyGraph::from_snapshot(roots.iter().copied(), target);
    for change in changes {
        for dep in &change.depends_on {
            create_graph.add_dependency(&change.node, dep);
        }
    }

    let drops = drop_graph.topological_order();
    let creates = create_graph.topological_order();
    debug!(
        drop_nodes = drops.order.len(),
        create_nodes = creates.order.len(),
        "Ordered dependency graphs"
    );

    let on = |node: &ObjectId| by_node.get(node).into_iter().flatten().copied();
    let mut fragments = Vec::new();
    for node in drops.order.iter().rev() {
        for change in on(node) {
            fragments.extend(change.drop.iter().map(|sql| Fragment::new(sql, change.destructive)));
        }
    }
    for node in &creates.order {
        for change in on(node) {
            fragments.extend(change.create.iter().map(|sql| Fragment::new(sql, change.destructive)));
        }
    }
    for node in &creates.order {
        for change in on(node) {
            fragments.extend(change.trailing.iter().map(|sql| Fragment::new(sql, false)));
        }
    }

    let broken: BTreeSet<&ObjectId> = drops.broken.iter().chain(&creates.broken).collect();
    let diagnostics = broken
        .into_iter()
        .map(|node| {
            warn!(object = %node, "Broke dependency cycle by declaration order");
            Change::diagnostic(node.clone(), CYCLE_NOTE)
        })
        .collect();

    Linearized {
        fragments,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Column, Function, ObjectKind, Table, View};

    fn sql(linearized: &Linearized) -> Vec<&str> {
        linearized.fragments.iter().map(|f| f.sql.as_str()).collect()
    }

    #[test]
    fn test_order_dependencies_first() {
        let mut dag = DependencyGraph::new();
        let t = ObjectId::table("public", "t");
        let v = ObjectId::view("public", "v");
        let w = ObjectId::view("public", "w");
        dag.add_dependency(&w, &v);
        dag.add_dependency(&v, &t);

        let ordering = dag.topological_order();
        assert_eq!(ordering.order, vec![t, v.clone(), w.clone()]);
        assert!(ordering.broken.is_empty());
        assert_eq!(dag.dependents(&v), BTreeSet::from([w]));
    }

    #[test]
    fn test_tie_break_by_kind_then_name() {
        let mut dag = DependencyGraph::new();
        dag.add_object(&ObjectId::view("public", "a"));
        dag.add_object(&ObjectId::table("public", "b"));
        dag.add_object(&ObjectId::table("public", "a"));
        dag.add_object(&ObjectId::schema("public"));

        let order = dag.topological_order().order;
        assert_eq!(
            order.iter().map(|id| id.kind).collect::<Vec<_>>(),
            vec![
                ObjectKind::Schema,
                ObjectKind::Table,
                ObjectKind::Table,
                ObjectKind::View
            ]
        );
        assert_eq!(order[1].name, "\"public\".\"a\"");
    }

    #[test]
    fn test_cycle_is_broken_by_declaration_order() {
        let f = ObjectId::function("public", "f", "");
        let g = ObjectId::function("public", "g", "");
        let mut dag = DependencyGraph::new();
        dag.add_object(&g);
        dag.add_dependency(&f, &g);
        dag.add_dependency(&g, &f);

        let ordering = dag.topological_order();
        assert_eq!(ordering.order, vec![g.clone(), f]);
        assert_eq!(ordering.broken, vec![g]);
    }

    #[test]
    fn test_linearize_view_recreation() {
        let t = Table::new("public", "t").column(Column::new("id", "integer"));
        let v = View::new("public", "v", "select id from t").depends_on(ObjectId::table("public", "t"));
        let w = View::new("public", "w", "select id from v").depends_on(ObjectId::view("public", "v"));
        let snapshot = Snapshot::new().with(t).with(v).with(w);

        let changes = vec![
            Change::new(ObjectId::view("public", "v"))
                .drop_sql("drop view v;")
                .create_sql("create view v;")
                .trailing_sql("alter view v owner to o;"),
            Change::new(ObjectId::view("public", "w"))
                .drop_sql("drop view w;")
                .create_sql("create view w;")
                .trailing_sql("alter view w owner to o;"),
        ];

        let linearized = linearize(&changes, &snapshot, &snapshot);
        assert_eq!(
            sql(&linearized),
            vec![
                "drop view w;",
                "drop view v;",
                "create view v;",
                "create view w;",
                "alter view v owner to o;",
                "alter view w owner to o;",
            ]
        );
        assert!(linearized.diagnostics.is_empty());
    }

    #[test]
    fn test_linearize_records_cycle_diagnostic() {
        let f = Function::new("public", "f", "integer", "sql", "select g()")
            .depends_on(ObjectId::function("public", "g", ""));
        let g = Function::new("public", "g", "integer", "sql", "select f()")
            .depends_on(ObjectId::function("public", "f", ""));
        let target = Snapshot::new().with(f).with(g);

        let changes = vec![
            Change::new(ObjectId::function("public", "f", "")).create_sql("create f;"),
            Change::new(ObjectId::function("public", "g", "")).create_sql("create g;"),
        ];
        let linearized = linearize(&changes, &Snapshot::new(), &target);

        assert_eq!(sql(&linearized), vec!["create f;", "create g;"]);
        assert_eq!(linearized.diagnostics.len(), 1);
        assert_eq!(linearized.diagnostics[0].note.as_deref(), Some(CYCLE_NOTE));
    }
}
