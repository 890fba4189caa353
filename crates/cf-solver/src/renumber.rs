//! Node layering for solver locality.

use cf_mesh::{BranchKind, DRUM, Network};

use crate::search::hop_distances;

/// New index for every old node: downcomer-outlet side first, drum side last.
///
/// The key is hop distance from the nearest downcomer outlet minus hop
/// distance from the drum; ties keep the old order. The drum stays 0.
pub fn layered_order(net: &Network) -> Vec<usize> {
    let count = net.nodes.len();
    let mut outlets: Vec<usize> = net
        .branches
        .iter()
        .filter(|b| b.is_active() && b.kind == BranchKind::Downcomer)
        .map(|b| b.node_out)
        .collect();
    outlets.sort_unstable();
    outlets.dedup();

    let from_down = hop_distances(net, &outlets);
    let from_drum = hop_distances(net, &[DRUM]);
    let far = count as i64;
    let key = |n: usize| {
        from_down[n].map_or(far, |d| d as i64) - from_drum[n].map_or(far, |d| d as i64)
    };

    let mut order: Vec<usize> = (0..count).filter(|&n| n != DRUM).collect();
    order.sort_by_key(|&n| (key(n), n));

    let mut new_index = vec![DRUM; count];
    for (rank, old) in order.into_iter().enumerate() {
        new_index[old] = rank + 1;
    }
    new_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_mesh::{MeshBuilder, TubeSpec};

    #[test]
    fn downcomer_outlet_comes_first() {
        // Drum, collector (near the drum), bottom header (downcomer outlet).
        let mut b = MeshBuilder::new();
        let drum = b.add_point(0.0, 0.0, 20.0);
        let collector = b.add_point(1.0, 0.0, 18.0);
        let header = b.add_point(1.0, 0.0, 0.0);
        let side = b.add_point(3.0, 0.0, 0.0);
        let side_up = b.add_point(3.0, 0.0, 18.0);
        b.add_tube(TubeSpec::new(collector, drum, 0.1));
        b.add_tube(TubeSpec::new(drum, header, 0.1));
        b.add_tube(TubeSpec::new(header, collector, 0.05).with_heat(1.0e5));
        b.add_tube(TubeSpec::new(header, side, 0.05));
        b.add_tube(TubeSpec::new(side, side_up, 0.05).with_heat(1.0e5));
        b.add_tube(TubeSpec::new(side_up, collector, 0.05));
        let mut net = b.build().unwrap();
        let dc = net.tubes[1].branch;
        net.branches[dc].kind = BranchKind::Downcomer;

        let order = layered_order(&net);
        let old_header = net.points[header].node.unwrap();
        let old_collector = net.points[collector].node.unwrap();
        assert_eq!(order[DRUM], DRUM);
        assert_eq!(order[old_header], 1);
        assert_eq!(order[old_collector], 2);
        net.renumber_nodes(&order).unwrap();
        assert_eq!(net.points[header].node, Some(1));
    }
}
