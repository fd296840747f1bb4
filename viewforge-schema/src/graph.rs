use std::collections::{BTreeSet, HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::{ForeignKey, SchemaError, SchemaSource};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableNode {
    pub index: usize,
    pub name: String,
}

/// Columns joined by the foreign key that produced an arc. Both arcs of a
/// relationship carry the columns in referencing-table order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyLink {
    pub from_column: String,
    pub to_column: String,
}

/// Tables connected by their foreign keys. Every relationship is stored as a
/// pair of opposite arcs because the graph only answers connectivity
/// questions. Immutable once built.
#[derive(Clone, Debug, Default)]
pub struct SchemaGraph {
    graph: DiGraph<TableNode, ForeignKeyLink>,
}

impl SchemaGraph {
    pub async fn build(source: &dyn SchemaSource) -> Result<Self, SchemaError> {
        let tables = source.list_tables().await?;
        let mut foreign_keys = Vec::new();
        for table in &tables {
            for foreign_key in source.list_foreign_keys(table).await? {
                foreign_keys.push((table.clone(), foreign_key));
            }
        }

        let graph = Self::from_parts(tables, foreign_keys);
        tracing::debug!(
            tables = graph.node_count(),
            arcs = graph.edge_count(),
            "built schema graph"
        );
        Ok(graph)
    }

    /// Builds the graph from a table list and `(referencing table, foreign key)`
    /// pairs. Referenced tables are matched case-insensitively; keys pointing
    /// outside the table list are skipped.
    pub fn from_parts(
        tables: Vec<String>,
        foreign_keys: impl IntoIterator<Item = (String, ForeignKey)>,
    ) -> Self {
        let mut graph = DiGraph::with_capacity(tables.len(), 0);
        let mut by_name: HashMap<String, NodeIndex> = HashMap::new();
        for (index, name) in tables.into_iter().enumerate() {
            let node = graph.add_node(TableNode {
                index,
                name: name.clone(),
            });
            by_name.entry(name.to_lowercase()).or_insert(node);
        }

        for (table, foreign_key) in foreign_keys {
            let from = by_name.get(&table.to_lowercase()).copied();
            let to = by_name
                .get(&foreign_key.referenced_table.to_lowercase())
                .copied();
            let (Some(from), Some(to)) = (from, to) else {
                tracing::warn!(
                    table = %table,
                    referenced_table = %foreign_key.referenced_table,
                    "skipping foreign key that references a table outside the schema"
                );
                continue;
            };

            let link = ForeignKeyLink {
                from_column: foreign_key.from_column,
                to_column: foreign_key.referenced_column,
            };
            graph.add_edge(from, to, link.clone());
            graph.add_edge(to, from, link);
        }

        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn table(&self, index: usize) -> Option<&TableNode> {
        self.graph.node_weight(NodeIndex::new(index))
    }

    pub fn table_name(&self, index: usize) -> Option<&str> {
        self.table(index).map(|node| node.name.as_str())
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.graph
            .node_weights()
            .map(|node| node.name.as_str())
            .collect()
    }

    /// Distinct neighbours of `index` in ascending index order.
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        if index >= self.node_count() {
            return Vec::new();
        }
        self.graph
            .neighbors(NodeIndex::new(index))
            .map(|node| node.index())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether the subgraph induced by `nodes` is connected. The empty set
    /// counts as connected.
    pub fn is_connected(&self, nodes: &[usize]) -> bool {
        let members: BTreeSet<usize> = nodes.iter().copied().collect();
        let Some(&start) = members.iter().next() else {
            return true;
        };

        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for neighbor in self.neighbors(node) {
                if members.contains(&neighbor) && seen.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        seen.len() == members.len()
    }
}
