//! Weighted and unweighted searches over the active branch graph.
//!
//! Searches ignore branch direction: every active branch can be traversed
//! from either end. Callers decide per step whether a branch may be used and
//! what it costs. The network is viewed as a petgraph `DiGraph` with one
//! edge per usable traversal; node indices match the network's.

use petgraph::algo::{astar, dijkstra};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use cf_mesh::Network;

/// One traversed branch, from `from` to `to` in search order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hop {
    pub branch: usize,
    pub from: usize,
    pub to: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    /// Hops from the start node to `end`
    pub hops: Vec<Hop>,
    pub end: usize,
    pub cost: f64,
}

/// Neighbours of `node` through active branches, in branch index order.
fn hops_from(net: &Network, node: usize) -> Vec<Hop> {
    let n = &net.nodes[node];
    let mut hops: Vec<Hop> = n
        .leaving
        .iter()
        .map(|&b| Hop {
            branch: b,
            from: node,
            to: net.branches[b].node_out,
        })
        .chain(n.arriving.iter().map(|&b| Hop {
            branch: b,
            from: node,
            to: net.branches[b].node_in,
        }))
        .filter(|h| h.to != node)
        .collect();
    hops.sort_by_key(|h| h.branch);
    hops
}

/// Traversal graph of the network holding every hop `cost` accepts.
fn traversal_graph(
    net: &Network,
    cost: impl Fn(&Hop) -> Option<f64>,
) -> DiGraph<(), (Hop, f64)> {
    let mut graph = DiGraph::with_capacity(net.nodes.len(), 2 * net.branches.len());
    for _ in 0..net.nodes.len() {
        graph.add_node(());
    }
    for node in 0..net.nodes.len() {
        for hop in hops_from(net, node) {
            if let Some(w) = cost(&hop) {
                graph.add_edge(
                    NodeIndex::new(hop.from),
                    NodeIndex::new(hop.to),
                    (hop, w.max(0.0)),
                );
            }
        }
    }
    graph
}

/// Cheapest route from `start` to any node accepted by `is_target`.
///
/// `cost` returns `None` for hops that may not be used.
pub fn cheapest_route(
    net: &Network,
    start: usize,
    is_target: impl Fn(usize) -> bool,
    cost: impl Fn(&Hop) -> Option<f64>,
) -> Option<Route> {
    let graph = traversal_graph(net, cost);
    let (total, path) = astar(
        &graph,
        NodeIndex::new(start),
        |n| is_target(n.index()),
        |e| e.weight().1,
        |_| 0.0,
    )?;

    // Parallel branches share both ends; the path names nodes, so take the
    // cheapest edge of each step (lowest branch index on ties).
    let hops = path
        .windows(2)
        .map(|pair| {
            graph
                .edges_connecting(pair[0], pair[1])
                .map(|e| *e.weight())
                .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.branch.cmp(&b.0.branch)))
                .map(|(hop, _)| hop)
        })
        .collect::<Option<Vec<Hop>>>()?;
    let end = path.last().map_or(start, |n| n.index());
    Some(Route {
        hops,
        end,
        cost: total,
    })
}

/// Hop distance of every node from the nearest of `sources`; `None` when unreachable.
pub fn hop_distances(net: &Network, sources: &[usize]) -> Vec<Option<usize>> {
    let mut graph = traversal_graph(net, |_| Some(1.0));
    // A virtual root one free step before every source.
    let root = graph.add_node(());
    for &s in sources {
        let hop = Hop {
            branch: usize::MAX,
            from: root.index(),
            to: s,
        };
        graph.add_edge(root, NodeIndex::new(s), (hop, 0.0));
    }
    let dist = dijkstra(&graph, root, None, |e| usize::from(e.source() != root));
    (0..net.nodes.len())
        .map(|n| dist.get(&NodeIndex::new(n)).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_mesh::{DRUM, MeshBuilder, TubeSpec};

    /// Drum, two intermediate nodes A and B, and a bottom node C.
    /// Drum-A and A-C are short; drum-B and B-C are long.
    fn diamond() -> Network {
        let mut b = MeshBuilder::new();
        let drum = b.add_point(0.0, 0.0, 10.0);
        let a = b.add_point(-1.0, 0.0, 5.0);
        let bb = b.add_point(3.0, 0.0, 5.0);
        let c = b.add_point(0.0, 0.0, 0.0);
        b.add_tube(TubeSpec::new(drum, a, 0.1));
        b.add_tube(TubeSpec::new(drum, bb, 0.1));
        b.add_tube(TubeSpec::new(a, c, 0.1));
        b.add_tube(TubeSpec::new(bb, c, 0.1));
        b.add_tube(TubeSpec::new(a, drum, 0.1));
        b.add_tube(TubeSpec::new(bb, drum, 0.1));
        b.add_tube(TubeSpec::new(c, a, 0.1));
        b.build().unwrap()
    }

    #[test]
    fn follows_cheapest_branches() {
        let net = diamond();
        let c = net.points[3].node.unwrap();
        let route = cheapest_route(&net, c, |n| n == DRUM, |h| Some(net.branches[h.branch].length))
            .unwrap();
        assert_eq!(route.end, DRUM);
        assert_eq!(route.hops.first().unwrap().from, c);
        assert_eq!(route.hops.last().unwrap().to, DRUM);
        let a = net.points[1].node.unwrap();
        assert!(route.hops.iter().any(|h| h.to == a));
        for pair in route.hops.windows(2) {
            assert_eq!(pair[0].to, pair[1].from);
        }
    }

    #[test]
    fn parallel_branches_resolve_to_the_cheaper_one() {
        let net = diamond();
        let a = net.points[1].node.unwrap();
        let twins: Vec<usize> = (0..net.branches.len())
            .filter(|&b| {
                let br = &net.branches[b];
                (br.node_in, br.node_out) == (a, DRUM) || (br.node_in, br.node_out) == (DRUM, a)
            })
            .collect();
        assert_eq!(twins.len(), 2);
        let route = cheapest_route(
            &net,
            a,
            |n| n == DRUM,
            |h| Some(100.0 - h.branch as f64),
        )
        .unwrap();
        assert_eq!(route.hops.len(), 1);
        assert_eq!(route.hops[0].branch, twins[1]);
        assert_eq!(route.cost, 100.0 - twins[1] as f64);
    }

    #[test]
    fn excluded_hops_block_the_route() {
        let net = diamond();
        let c = net.points[3].node.unwrap();
        assert!(cheapest_route(&net, c, |n| n == DRUM, |_| None).is_none());
    }

    #[test]
    fn start_on_target_gives_empty_route() {
        let net = diamond();
        let route = cheapest_route(&net, DRUM, |n| n == DRUM, |_| Some(1.0)).unwrap();
        assert!(route.hops.is_empty());
        assert_eq!(route.cost, 0.0);
    }

    #[test]
    fn hop_layers() {
        let net = diamond();
        let dist = hop_distances(&net, &[DRUM]);
        assert_eq!(dist[DRUM], Some(0));
        let c = net.points[3].node.unwrap();
        assert_eq!(dist[c], Some(2));
    }

    #[test]
    fn hop_layers_from_several_sources() {
        let net = diamond();
        let a = net.points[1].node.unwrap();
        let c = net.points[3].node.unwrap();
        let dist = hop_distances(&net, &[DRUM, c]);
        assert_eq!(dist[DRUM], Some(0));
        assert_eq!(dist[c], Some(0));
        assert_eq!(dist[a], Some(1));
        assert!(dist.iter().all(Option::is_some));
    }
}
