use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::{SchemaError, SchemaGraph};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SampledSubschema {
    /// Node indices in the order they joined the sample.
    pub nodes: Vec<usize>,
    pub tables: Vec<String>,
}

impl SampledSubschema {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Grows random connected sub-schemas out of a [`SchemaGraph`].
pub struct SchemaSampler;

impl SchemaSampler {
    /// Samples `size` distinct tables. The sample grows one hop at a time from
    /// the most recently added table, restarts from another sampled table
    /// that still has unsampled neighbours when stuck, and only jumps to an
    /// unrelated table when the sampled component is exhausted.
    pub fn sample<R>(
        graph: &SchemaGraph,
        size: usize,
        rng: &mut R,
    ) -> Result<SampledSubschema, SchemaError>
    where
        R: Rng + ?Sized,
    {
        let available = graph.node_count();
        if size > available {
            return Err(SchemaError::InvalidSampleSize {
                requested: size,
                available,
            });
        }
        if size == 0 {
            return Ok(SampledSubschema::default());
        }

        let mut included = vec![false; available];
        let mut order = Vec::with_capacity(size);

        let mut current = rng.gen_range(0..available);
        included[current] = true;
        order.push(current);

        while order.len() < size {
            if let Some(&next) = fresh_neighbors(graph, current, &included).choose(rng) {
                current = next;
            } else if let Some(next) = restart_from_sample(graph, &order, &included, rng) {
                current = next;
            } else {
                let outside: Vec<usize> = (0..available).filter(|&node| !included[node]).collect();
                let Some(&next) = outside.choose(rng) else {
                    break;
                };
                tracing::debug!(
                    table = graph.table_name(next).unwrap_or_default(),
                    "sampled component exhausted; jumping to a disconnected table"
                );
                current = next;
            }
            included[current] = true;
            order.push(current);
        }

        let tables = order
            .iter()
            .filter_map(|&node| graph.table_name(node).map(str::to_string))
            .collect();

        Ok(SampledSubschema {
            nodes: order,
            tables,
        })
    }
}

fn fresh_neighbors(graph: &SchemaGraph, node: usize, included: &[bool]) -> Vec<usize> {
    graph
        .neighbors(node)
        .into_iter()
        .filter(|&neighbor| !included[neighbor])
        .collect()
}

fn restart_from_sample<R>(
    graph: &SchemaGraph,
    order: &[usize],
    included: &[bool],
    rng: &mut R,
) -> Option<usize>
where
    R: Rng + ?Sized,
{
    let restart_points: Vec<usize> = order
        .iter()
        .copied()
        .filter(|&node| !fresh_neighbors(graph, node, included).is_empty())
        .collect();
    let &restart = restart_points.choose(rng)?;
    fresh_neighbors(graph, restart, included).choose(rng).copied()
}
