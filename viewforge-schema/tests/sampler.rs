use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use viewforge_schema::{ForeignKey, SchemaError, SchemaGraph, SchemaSampler};

fn fk(table: &str, referenced: &str) -> (String, ForeignKey) {
    (
        table.to_string(),
        ForeignKey {
            from_column: format!("{referenced}_id"),
            referenced_table: referenced.to_string(),
            referenced_column: "id".to_string(),
        },
    )
}

fn tables(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// customers <- orders -> products, orders <- items, products <- suppliers,
/// plus a chain regions <- stores <- staff.
fn retail_graph() -> SchemaGraph {
    SchemaGraph::from_parts(
        tables(&[
            "customers",
            "orders",
            "products",
            "items",
            "suppliers",
            "regions",
            "stores",
            "staff",
        ]),
        vec![
            fk("orders", "customers"),
            fk("orders", "products"),
            fk("items", "orders"),
            fk("products", "suppliers"),
            fk("stores", "regions"),
            fk("staff", "stores"),
            fk("orders", "stores"),
        ],
    )
}

fn isolated_graph(count: usize) -> SchemaGraph {
    let names = (0..count).map(|index| format!("t{index}")).collect();
    SchemaGraph::from_parts(names, Vec::new())
}

#[test]
fn sample_returns_requested_number_of_distinct_tables() {
    let graph = retail_graph();

    for size in 0..=graph.node_count() {
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sample = SchemaSampler::sample(&graph, size, &mut rng).expect("valid size");

            assert_eq!(sample.len(), size);
            let distinct: BTreeSet<_> = sample.nodes.iter().collect();
            assert_eq!(distinct.len(), size, "seed {seed} produced duplicates");
            assert_eq!(sample.tables.len(), size);
        }
    }
}

#[test]
fn sample_of_connected_graph_is_connected() {
    let graph = retail_graph();
    assert!(graph.is_connected(&(0..graph.node_count()).collect::<Vec<_>>()));

    for size in 1..=graph.node_count() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sample = SchemaSampler::sample(&graph, size, &mut rng).expect("valid size");

            assert!(
                graph.is_connected(&sample.nodes),
                "seed {seed} size {size} sampled {:?}",
                sample.tables
            );
        }
    }
}

#[test]
fn oversized_sample_is_rejected() {
    let graph = retail_graph();
    let mut rng = StdRng::seed_from_u64(7);

    let error = SchemaSampler::sample(&graph, 9, &mut rng).expect_err("too large");

    assert!(matches!(
        error,
        SchemaError::InvalidSampleSize {
            requested: 9,
            available: 8
        }
    ));
}

#[test]
fn sampling_is_deterministic_for_a_fixed_seed() {
    let graph = retail_graph();

    let first = SchemaSampler::sample(&graph, 5, &mut StdRng::seed_from_u64(42)).expect("sample");
    let second = SchemaSampler::sample(&graph, 5, &mut StdRng::seed_from_u64(42)).expect("sample");

    assert_eq!(first, second);
}

#[test]
fn disconnected_schema_still_reaches_requested_size() {
    let graph = isolated_graph(6);

    let sample = SchemaSampler::sample(&graph, 4, &mut StdRng::seed_from_u64(3)).expect("sample");

    assert_eq!(sample.len(), 4);
    let distinct: BTreeSet<_> = sample.tables.iter().collect();
    assert_eq!(distinct.len(), 4);
}

#[test]
fn sample_covers_whole_component_before_jumping() {
    // a-b connected, c-d connected, no link between the pairs.
    let graph = SchemaGraph::from_parts(
        tables(&["a", "b", "c", "d"]),
        vec![fk("a", "b"), fk("c", "d")],
    );

    for seed in 0..20 {
        let sample = SchemaSampler::sample(&graph, 2, &mut StdRng::seed_from_u64(seed))
            .expect("sample");
        assert!(graph.is_connected(&sample.nodes), "seed {seed}");
    }
}

#[test]
fn star_schema_restarts_from_the_hub() {
    // Every leaf references the hub, so after stepping onto a leaf the
    // sampler has to restart from the hub to stay connected.
    let graph = SchemaGraph::from_parts(
        tables(&["hub", "l1", "l2", "l3", "l4"]),
        vec![
            fk("l1", "hub"),
            fk("l2", "hub"),
            fk("l3", "hub"),
            fk("l4", "hub"),
        ],
    );

    for seed in 0..20 {
        let sample = SchemaSampler::sample(&graph, 4, &mut StdRng::seed_from_u64(seed))
            .expect("sample");
        assert!(sample.tables.contains(&"hub".to_string()), "seed {seed}");
        assert!(graph.is_connected(&sample.nodes), "seed {seed}");
    }
}
