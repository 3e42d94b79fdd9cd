//! Assertions over converged runs.
//!
//! Every runner ends with a list of [`NodeReport`]s. These helpers check
//! them against the global topology, which nodes themselves never see.

use bfstree_node::NodeReport;
use bfstree_types::{Layer, NodeId, StaticTopology, Topology};
use std::collections::{BTreeMap, BTreeSet};

fn by_id(reports: &[NodeReport]) -> BTreeMap<NodeId, &NodeReport> {
    reports.iter().map(|r| (r.id, r)).collect()
}

/// Distinct neighbors of `node`, parallel links collapsed.
pub fn neighbors_of(topology: &StaticTopology, node: NodeId) -> BTreeSet<NodeId> {
    topology
        .raw_links(node)
        .into_iter()
        .map(|link| link.remote)
        .collect()
}

/// Parent pointers form a tree rooted at `root` spanning every node, with
/// each layer equal to the hop distance from the root.
pub fn assert_bfs_tree(topology: &StaticTopology, root: NodeId, reports: &[NodeReport]) {
    let reports = by_id(reports);
    let distances = topology.hop_distances(root);
    assert_eq!(
        reports.len(),
        topology.node_count(),
        "one report per node expected"
    );

    for (id, report) in &reports {
        let expected = distances[id];
        assert_eq!(
            report.layer,
            Layer(expected),
            "{id} has layer {} but is {expected} hops from the root",
            report.layer
        );

        if *id == root {
            assert_eq!(report.parent, None, "root has a parent");
            continue;
        }

        let parent = report
            .parent
            .unwrap_or_else(|| panic!("{id} has no parent"));
        assert!(
            neighbors_of(topology, *id).contains(&parent),
            "{id} picked non-neighbor {parent} as parent"
        );
        assert_eq!(
            reports[&parent].layer.get().map(|l| l + 1),
            Some(report.layer.0),
            "{id} is not one layer below its parent {parent}"
        );
    }

    // Walk up from every node; layers strictly decrease so this must end at the root
    for id in reports.keys() {
        let mut current = *id;
        for _ in 0..reports.len() {
            match reports[&current].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        assert_eq!(current, root, "{id} does not lead to the root");
    }
}

/// Every distinct neighbor sits in exactly one of parent / children / other.
pub fn assert_complete_partition(topology: &StaticTopology, reports: &[NodeReport]) {
    for report in reports {
        let mut seen = BTreeSet::new();
        let classified = report
            .parent
            .iter()
            .chain(report.children.iter())
            .chain(report.other.iter());
        for peer in classified {
            assert!(
                seen.insert(*peer),
                "{} classifies {peer} more than once",
                report.id
            );
        }
        assert_eq!(
            seen,
            neighbors_of(topology, report.id),
            "{} did not classify exactly its neighbors",
            report.id
        );
    }
}

/// `child ∈ children(p)` exactly when `parent(child) = p`.
pub fn assert_children_mirror_parents(reports: &[NodeReport]) {
    let reports = by_id(reports);
    for (id, report) in &reports {
        for child in &report.children {
            assert_eq!(
                reports[child].parent,
                Some(*id),
                "{id} lists {child} as child but its parent is {:?}",
                reports[child].parent
            );
        }
        if let Some(parent) = report.parent {
            assert!(
                reports[&parent].children.contains(id),
                "{parent} is parent of {id} but does not list it as child"
            );
        }
    }
}
