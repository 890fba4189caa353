//! Nodal pressure solve.
//!
//! With every branch linearized as `g = (p_in - p_out - C)/L`, mass balance
//! at the non-drum nodes is a symmetric linear system in the node pressures
//! (the drum is the reference at zero). The system is assembled in triplet
//! form and factored with a sparse Cholesky; a dense LU takes over when the
//! matrix is not positive definite.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use tracing::{debug, warn};

use crate::config::SolverConfig;
use crate::error::{SolverError, SolverResult};
use cf_mesh::{DRUM, Network};

#[derive(Clone, Debug, PartialEq)]
pub struct NodalSolution {
    /// Pressure of every node relative to the drum [Pa]
    pub pressures: Vec<f64>,
    /// Flow of every branch implied by the pressures; zero for zeroed branches
    pub g_new: Vec<f64>,
    pub max_node_imbalance: f64,
}

/// Index of each node in the unknown vector, `None` for the drum and idle nodes.
fn unknown_indices(net: &Network) -> (Vec<Option<usize>>, usize) {
    let mut next = 0;
    let map = net
        .nodes
        .iter()
        .enumerate()
        .map(|(n, node)| {
            if n == DRUM || node.degree() == 0 {
                None
            } else {
                next += 1;
                Some(next - 1)
            }
        })
        .collect();
    (map, next)
}

fn solve_system(coo: &CooMatrix<f64>, rhs: DVector<f64>) -> SolverResult<DVector<f64>> {
    let csc = CscMatrix::from(coo);
    match CscCholesky::factor(&csc) {
        Ok(chol) => {
            let x = chol.solve(&DMatrix::from_column_slice(rhs.len(), 1, rhs.as_slice()));
            Ok(DVector::from_column_slice(x.as_slice()))
        }
        Err(err) => {
            warn!(?err, "nodal matrix not positive definite, using dense LU");
            DMatrix::from(coo)
                .lu()
                .solve(&rhs)
                .ok_or(SolverError::SingularSystem)
        }
    }
}

/// Solve for node pressures and write them (and the previous ones) to the nodes.
pub fn solve_pressures(net: &mut Network, config: &SolverConfig) -> SolverResult<NodalSolution> {
    let (index, count) = unknown_indices(net);
    let mut coo = CooMatrix::new(count, count);
    let mut rhs = DVector::zeros(count);

    for b in net.active_branches() {
        let branch = &net.branches[b];
        if branch.is_loop() {
            continue;
        }
        let k = 1.0 / branch.dp_linear;
        let kc = k * branch.dp_constant;
        let (i, j) = (index[branch.node_in], index[branch.node_out]);
        if let Some(i) = i {
            coo.push(i, i, k);
            rhs[i] += kc;
            if let Some(j) = j {
                coo.push(i, j, -k);
            }
        }
        if let Some(j) = j {
            coo.push(j, j, k);
            rhs[j] -= kc;
            if let Some(i) = i {
                coo.push(j, i, -k);
            }
        }
    }

    let solution = match count {
        0 => DVector::zeros(0),
        1 => {
            let a: f64 = coo.triplet_iter().map(|(_, _, v)| *v).sum();
            if !(a > 0.0) {
                return Err(SolverError::SingularSystem);
            }
            DVector::from_element(1, rhs[0] / a)
        }
        _ => solve_system(&coo, rhs)?,
    };
    if solution.iter().any(|p| !p.is_finite()) {
        return Err(SolverError::SingularSystem);
    }

    let pressures: Vec<f64> = index
        .iter()
        .map(|slot| slot.map_or(0.0, |k| solution[k]))
        .collect();
    let mut g_new = vec![0.0; net.branches.len()];
    for b in net.active_branches() {
        let branch = &net.branches[b];
        let dp = pressures[branch.node_in] - pressures[branch.node_out];
        g_new[b] = (dp - branch.dp_constant) / branch.dp_linear;
    }

    let mut max_node_imbalance = 0.0_f64;
    for (n, node) in net.nodes.iter_mut().enumerate() {
        let inflow: f64 = node.arriving.iter().map(|&a| g_new[a]).sum();
        let outflow: f64 = node.leaving.iter().map(|&l| g_new[l]).sum();
        node.p_prev = node.p;
        node.p = pressures[n];
        let imbalance = inflow - outflow;
        node.g_in = inflow;
        node.g_sum = imbalance;
        if n == DRUM {
            continue;
        }
        if imbalance.abs() > config.mass_imbalance_tol {
            return Err(SolverError::MassImbalance { node: n, imbalance });
        }
        max_node_imbalance = max_node_imbalance.max(imbalance.abs());
    }
    debug!(unknowns = count, max_node_imbalance, "nodal pressures solved");

    Ok(NodalSolution {
        pressures,
        g_new,
        max_node_imbalance,
    })
}
