//! Multi-section marches through the public API.

use cf_hydraulics::*;
use cf_water::{Correlation, Iapws97Saturation, WaterSteam};

const P_DRUM: f64 = 8.0e6;

fn march_tube(
    solver: &SectionSolver<'_>,
    geom: SectionGeometry,
    sections: usize,
    g: f64,
    heat: f64,
    inlet: Station,
) -> (Station, f64) {
    let piece = SectionGeometry {
        length: geom.length / sections as f64,
        height: geom.height / sections as f64,
        ..geom
    };
    let mut state = inlet;
    let mut dp = 0.0;
    for _ in 0..sections {
        let out = solver.march(&piece, &state, g, heat / sections as f64).unwrap();
        dp += out.dp_friction + out.dp_acceleration + out.dp_static;
        state = out.outlet;
    }
    (state, dp)
}

#[test]
fn section_count_barely_changes_riser_drop() {
    let water = Iapws97Saturation::new();
    let model = Correlation::ZuberFindlay;
    let solver = SectionSolver::new(&water, &model, 0.1 * P_DRUM);
    let geom = SectionGeometry {
        diameter: 0.06,
        length: 12.0,
        height: 12.0,
        roughness: 4.5e-5,
    };
    let sat = water.saturation(P_DRUM).unwrap();
    let g = 2.0;
    let mass_velocity = g / flow_area(geom.diameter);
    let inlet = solver.station(P_DRUM, sat.h_liq, &geom, mass_velocity).unwrap();

    let (coarse_out, coarse_dp) = march_tube(&solver, geom, 6, g, 600.0e3, inlet);
    let (fine_out, fine_dp) = march_tube(&solver, geom, 24, g, 600.0e3, inlet);

    assert!(fine_out.x > 0.0);
    assert!((coarse_out.h - fine_out.h).abs() < 1e-6);
    assert!((coarse_dp - fine_dp).abs() / fine_dp.abs() < 0.05);
}

#[test]
fn pressure_balance_matches_station_difference() {
    let water = Iapws97Saturation::new();
    let model = Correlation::Homogeneous;
    let solver = SectionSolver::new(&water, &model, 0.1 * P_DRUM);
    let geom = SectionGeometry {
        diameter: 0.1,
        length: 10.0,
        height: -10.0,
        roughness: 4.5e-5,
    };
    let sat = water.saturation(P_DRUM).unwrap();
    let inlet = solver
        .station(P_DRUM, sat.h_liq - 20.0e3, &geom, 1000.0)
        .unwrap();
    let (out, dp) = march_tube(&solver, geom, 10, 7.85, 0.0, inlet);
    assert!((P_DRUM - out.p_pa - dp).abs() < 1.0);
    assert!(out.p_pa > P_DRUM);
}
