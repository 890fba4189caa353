use approx::assert_relative_eq;
use cf_mesh::{DRUM, Junction, MeshBuilder, MeshError, Network, TeeOrientation, TubeSpec};
use proptest::prelude::*;

/// Drum above `headers` nodes; every header gets a downcomer and a heated riser,
/// headers are chained in a ring, and `extra` adds tubes between node pairs.
fn random_network(headers: usize, extra: &[(usize, usize)]) -> Network {
    let mut b = MeshBuilder::new();
    let drum = b.add_point(0.0, 0.0, 20.0);
    let nodes: Vec<usize> = (0..headers)
        .map(|i| b.add_point(3.0 * i as f64 + 1.0, (i % 2) as f64, 2.0 * i as f64))
        .collect();
    for &n in &nodes {
        b.add_tube(TubeSpec::new(drum, n, 0.1));
        b.add_tube(TubeSpec::new(n, drum, 0.05).with_heat(5.0e4));
    }
    for i in 0..headers {
        b.add_tube(TubeSpec::new(nodes[i], nodes[(i + 1) % headers], 0.08));
    }
    let all: Vec<usize> = std::iter::once(drum).chain(nodes.iter().copied()).collect();
    for &(a, c) in extra {
        let (a, c) = (all[a % all.len()], all[c % all.len()]);
        if a != c {
            b.add_tube(TubeSpec::new(a, c, 0.06));
        }
    }
    b.build().unwrap()
}

fn sides(net: &Network) -> Vec<(bool, bool)> {
    net.nodes
        .iter()
        .map(|n| (!n.arriving.is_empty(), !n.leaving.is_empty()))
        .collect()
}

#[test]
fn horizontal_header_with_riser_is_tee() {
    let mut b = MeshBuilder::new();
    let drum = b.add_point(0.0, 0.0, 10.0);
    let west = b.add_point(-2.0, 0.0, 0.0);
    let mid = b.add_point(0.0, 0.0, 0.0);
    let east = b.add_point(2.0, 0.0, 0.0);
    let west_up = b.add_point(-2.0, 0.0, 10.0);
    let east_up = b.add_point(2.0, 0.0, 10.0);
    b.add_tube(TubeSpec::new(drum, west_up, 0.1));
    b.add_tube(TubeSpec::new(west_up, west, 0.1));
    b.add_tube(TubeSpec::new(west, mid, 0.1));
    b.add_tube(TubeSpec::new(mid, east, 0.1));
    b.add_tube(TubeSpec::new(east, east_up, 0.1).with_heat(1.0e5));
    b.add_tube(TubeSpec::new(east_up, drum, 0.1));
    b.add_tube(TubeSpec::new(mid, drum, 0.05).with_heat(1.0e5));
    let net = b.build().unwrap();

    let tee_node = net.points[mid].node.unwrap();
    let info = net.nodes[tee_node].tee().unwrap();
    assert_eq!(info.orientation, TeeOrientation::StraightHorOffVerUp);
    assert_eq!(info.off_tube, 6);
    let mut straight = info.straight_tubes;
    straight.sort_unstable();
    assert_eq!(straight, [2, 3]);
}

#[test]
fn zeroing_leaves_a_deflection() {
    let mut b = MeshBuilder::new();
    let drum = b.add_point(0.0, 0.0, 10.0);
    let low = b.add_point(0.0, 0.0, 0.0);
    let side = b.add_point(3.0, 0.0, 0.0);
    let side_up = b.add_point(3.0, 0.0, 10.0);
    b.add_tube(TubeSpec::new(drum, low, 0.1));
    b.add_tube(TubeSpec::new(low, side, 0.05));
    b.add_tube(TubeSpec::new(side, side_up, 0.05).with_heat(1.0e5));
    b.add_tube(TubeSpec::new(side_up, drum, 0.05));
    b.add_tube(TubeSpec::new(drum, low, 0.1));
    let mut net = b.build().unwrap();

    let low_node = net.points[low].node.unwrap();
    let spare = net.tubes[4].branch;
    assert!(net.zeroing_is_safe(spare));
    net.zero_branch(spare).unwrap();
    assert!(net.branches[spare].zeroed);
    match net.nodes[low_node].junction {
        Junction::Deflection { angle_deg } => assert_relative_eq!(angle_deg, 90.0, epsilon = 1e-9),
        ref other => panic!("expected deflection, got {other:?}"),
    }
    // The remaining supply is now the only one.
    let supply = net.tubes[0].branch;
    assert_eq!(
        net.zero_branch(supply),
        Err(MeshError::UnsafeZeroing { branch: supply })
    );
    assert!(net.topology_defect().is_none());
}

#[test]
fn renumbering_moves_references() {
    let mut net = random_network(3, &[]);
    let perm = [0, 3, 1, 2];
    let before: Vec<(usize, usize)> = net
        .branches
        .iter()
        .map(|b| (b.node_in, b.node_out))
        .collect();
    let points: Vec<usize> = net.nodes.iter().map(|n| n.point).collect();
    net.renumber_nodes(&perm).unwrap();
    for (branch, (i, o)) in net.branches.iter().zip(before) {
        assert_eq!((branch.node_in, branch.node_out), (perm[i], perm[o]));
    }
    for (old, &point) in points.iter().enumerate() {
        assert_eq!(net.nodes[perm[old]].point, point);
        assert_eq!(net.points[point].node, Some(perm[old]));
    }
    assert_eq!(net.nodes[DRUM].junction, Junction::Drum);
}

proptest! {
    #[test]
    fn reversing_twice_is_identity(
        headers in 2usize..5,
        extra in prop::collection::vec((0usize..5, 0usize..5), 0..4),
        order in prop::collection::vec(0usize..64, 1..12),
    ) {
        let original = random_network(headers, &extra);
        let mut net = original.clone();
        let count = net.branches.len();
        for &b in &order {
            net.reverse_branch(b % count).unwrap();
        }
        for &b in order.iter().rev() {
            net.reverse_branch(b % count).unwrap();
        }
        prop_assert_eq!(net, original);
    }

    #[test]
    fn safe_zeroing_never_starves_a_node(
        headers in 2usize..5,
        extra in prop::collection::vec((0usize..5, 0usize..5), 0..4),
        flips in prop::collection::vec(any::<bool>(), 16),
        targets in prop::collection::vec(0usize..64, 1..8),
    ) {
        let mut net = random_network(headers, &extra);
        let count = net.branches.len();
        for (b, &flip) in flips.iter().enumerate().take(count) {
            if flip {
                net.reverse_branch(b).unwrap();
            }
        }
        for &t in &targets {
            let b = t % count;
            let before = sides(&net);
            let snapshot = net.clone();
            if net.zeroing_is_safe(b) {
                net.zero_branch(b).unwrap();
                let after = sides(&net);
                for (was, now) in before.iter().zip(&after) {
                    prop_assert!(!was.0 || now.0);
                    prop_assert!(!was.1 || now.1);
                }
            } else {
                prop_assert!(net.zero_branch(b).is_err());
                prop_assert_eq!(&net, &snapshot);
            }
        }
    }
}
