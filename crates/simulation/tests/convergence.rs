//! End-to-end convergence of the protocol on the simulated network.

use bfstree_simulation::{BootstrapConfig, NetworkConfig, SimulationRunner};
use bfstree_test_helpers::{
    assert_bfs_tree, assert_children_mirror_parents, assert_complete_partition,
};
use bfstree_types::{Layer, NodeId, StaticTopology};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing_test::traced_test;

fn shapes() -> Vec<(&'static str, StaticTopology)> {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    vec![
        ("path", StaticTopology::path(8)),
        ("ring", StaticTopology::ring(9)),
        ("star", StaticTopology::star(7)),
        ("complete", StaticTopology::complete(6)),
        ("grid", StaticTopology::grid(5, 4)),
        ("random", StaticTopology::random_connected(30, 45, &mut rng)),
        ("sparse", StaticTopology::random_connected(25, 3, &mut rng)),
    ]
}

/// Run to quiescence, checking every node's invariants and monotone layers
/// after each step.
fn run_checked(runner: &mut SimulationRunner) {
    let mut layers: BTreeMap<NodeId, Layer> =
        runner.nodes().map(|n| (n.id(), n.layer())).collect();

    while runner.step() {
        runner.check_invariants().unwrap();
        for node in runner.nodes() {
            let previous = layers.insert(node.id(), node.layer()).unwrap();
            assert!(
                node.layer() <= previous,
                "{} went from layer {previous} to {}",
                node.id(),
                node.layer()
            );
        }
        let root = runner.node(runner.root()).unwrap();
        assert_eq!(root.layer(), Layer::ROOT);
        assert_eq!(root.parent(), None);
    }
}

#[traced_test]
#[test]
fn fifo_links_converge_to_consistent_bfs_tree() {
    for (name, topology) in shapes() {
        for seed in 0..5 {
            let mut runner = SimulationRunner::new(
                &topology,
                BootstrapConfig::default(),
                NetworkConfig::default().fifo(),
                seed,
            )
            .unwrap();
            run_checked(&mut runner);

            let reports = runner.reports();
            assert_bfs_tree(&topology, NodeId(0), &reports);
            assert_complete_partition(&topology, &reports);
            assert_children_mirror_parents(&reports);
            assert!(runner.is_quiescent(), "{name}/{seed} not quiescent");
        }
    }
}

#[traced_test]
#[test]
fn unordered_links_still_build_bfs_tree() {
    for (_, topology) in shapes() {
        for seed in 0..5 {
            let mut runner = SimulationRunner::new(
                &topology,
                BootstrapConfig::default(),
                NetworkConfig::default(),
                seed,
            )
            .unwrap();
            run_checked(&mut runner);

            let reports = runner.reports();
            assert_bfs_tree(&topology, NodeId(0), &reports);
            assert_complete_partition(&topology, &reports);
        }
    }
}

#[traced_test]
#[test]
fn non_default_root() {
    let topology = StaticTopology::grid(4, 4);
    let root = NodeId(10);
    let mut runner = SimulationRunner::new(
        &topology,
        BootstrapConfig::default().with_root(root),
        NetworkConfig::default().fifo(),
        8,
    )
    .unwrap();
    run_checked(&mut runner);

    let reports = runner.reports();
    assert_bfs_tree(&topology, root, &reports);
    assert_children_mirror_parents(&reports);
    assert_eq!(runner.node(NodeId(0)).unwrap().layer(), Layer(4));
}

#[traced_test]
#[test]
fn duplicate_links_are_ignored() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut topology = StaticTopology::random_connected(20, 15, &mut rng);
    topology.duplicate_random_links(12, &mut rng);

    let mut runner = SimulationRunner::new(
        &topology,
        BootstrapConfig::default(),
        NetworkConfig::default().fifo(),
        1,
    )
    .unwrap();
    assert_eq!(runner.disabled_links().len(), 12);
    run_checked(&mut runner);

    let reports = runner.reports();
    assert_bfs_tree(&topology, NodeId(0), &reports);
    assert_complete_partition(&topology, &reports);
    assert_children_mirror_parents(&reports);
}

#[traced_test]
#[test]
fn immediate_delivery() {
    let topology = StaticTopology::grid(6, 3);
    let mut runner = SimulationRunner::new(
        &topology,
        BootstrapConfig::default(),
        NetworkConfig::immediate().fifo(),
        0,
    )
    .unwrap();
    run_checked(&mut runner);

    let reports = runner.reports();
    assert_bfs_tree(&topology, NodeId(0), &reports);
    assert_children_mirror_parents(&reports);
}

#[traced_test]
#[test]
fn disconnected_nodes_stay_unset() {
    let mut topology = StaticTopology::new((0..4).map(NodeId)).unwrap();
    topology.add_link(NodeId(0), NodeId(1)).unwrap();
    topology.add_link(NodeId(2), NodeId(3)).unwrap();

    let mut runner = SimulationRunner::new(
        &topology,
        BootstrapConfig::default(),
        NetworkConfig::default(),
        3,
    )
    .unwrap();
    run_checked(&mut runner);

    let island = runner.node(NodeId(2)).unwrap();
    assert_eq!(island.layer(), Layer::UNSET);
    assert_eq!(island.parent(), None);
    assert_eq!(runner.node(NodeId(1)).unwrap().layer(), Layer(1));
}

#[traced_test]
#[test]
fn reparenting_happens_under_skewed_latency() {
    // Wide latency spread on a dense graph makes long paths win early races
    let topology = StaticTopology::complete(8);
    let mut total_reparents = 0;
    for seed in 0..10 {
        let mut runner = SimulationRunner::new(
            &topology,
            BootstrapConfig::default(),
            NetworkConfig::default()
                .with_latency(Duration::from_millis(1), Duration::from_secs(5)),
            seed,
        )
        .unwrap();
        run_checked(&mut runner);
        total_reparents += runner.stats().reparents;

        // Everyone ends adjacent to the root
        for node in runner.nodes().filter(|n| !n.is_root()) {
            assert_eq!(node.parent(), Some(NodeId(0)));
            assert_eq!(node.layer(), Layer(1));
        }
    }
    // Each non-root node adopts a parent at least once; anything above that
    // is a node switching to the root after a longer path got there first
    assert!(total_reparents > 7 * 10);
}
