//! Tee detection and orientation.
//!
//! A Tee is a three-tube junction where two straight tubes of equal diameter
//! run collinear and a third, not wider, "off" tube leaves at roughly a
//! right angle. Classification only looks at angles and elevations, so it is
//! unaffected by the order the tubes are presented in or by a rotation of the
//! plant about the vertical axis.

use cf_core::numeric::acos_deg;
use nalgebra::Vector3;

use crate::error::MeshResult;

/// Collinear when within this many degrees of 0° or 180°.
const COLLINEAR_TOL_DEG: f64 = 10.0;
/// Off tube must meet the straight run within [OFF_MIN_DEG, OFF_MAX_DEG].
const OFF_MIN_DEG: f64 = 45.0;
const OFF_MAX_DEG: f64 = 135.0;
/// Inclination at or below which a tube counts as horizontal.
const HORIZONTAL_DEG: f64 = 10.0;
/// Inclination at or above which a tube counts as vertical.
const VERTICAL_DEG: f64 = 60.0;
const DIAMETER_REL_TOL: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TeeOrientation {
    StraightHorOffHor,
    StraightHorOffVerUp,
    StraightHorOffVerDown,
    StraightHorOffInclinedUp,
    StraightHorOffInclinedDown,
    StraightVerOffHor,
    Other,
}

impl TeeOrientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StraightHorOffHor => "straight-hor/off-hor",
            Self::StraightHorOffVerUp => "straight-hor/off-ver-up",
            Self::StraightHorOffVerDown => "straight-hor/off-ver-down",
            Self::StraightHorOffInclinedUp => "straight-hor/off-incl-up",
            Self::StraightHorOffInclinedDown => "straight-hor/off-incl-down",
            Self::StraightVerOffHor => "straight-ver/off-hor",
            Self::Other => "other",
        }
    }
}

/// Tee metadata stored on a node.
#[derive(Clone, Debug, PartialEq)]
pub struct TeeInfo {
    pub straight_tubes: [usize; 2],
    pub off_tube: usize,
    pub straight_branches: [usize; 2],
    pub off_branch: usize,
    pub orientation: TeeOrientation,
}

/// One tube end meeting at a candidate Tee node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TeeCandidate {
    pub tube: usize,
    pub branch: usize,
    /// Unit-free direction of the tube pointing away from the node.
    pub away: Vector3<f64>,
    pub diameter: f64,
    /// No bend along the tube.
    pub straight: bool,
}

/// Classification result: positions refer to the candidate slice after
/// sorting by tube index.
#[derive(Clone, Debug, PartialEq)]
pub struct TeeMatch {
    pub straight: [TeeCandidate; 2],
    pub off: TeeCandidate,
    pub orientation: TeeOrientation,
}

impl TeeMatch {
    pub fn into_info(self) -> TeeInfo {
        TeeInfo {
            straight_tubes: [self.straight[0].tube, self.straight[1].tube],
            off_tube: self.off.tube,
            straight_branches: [self.straight[0].branch, self.straight[1].branch],
            off_branch: self.off.branch,
            orientation: self.orientation,
        }
    }
}

fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> MeshResult<f64> {
    let cosine = a.dot(b) / (a.norm() * b.norm());
    Ok(acos_deg(cosine, "tube angle")?)
}

/// Inclination from horizontal in degrees, positive upward.
fn inclination_deg(v: &Vector3<f64>) -> MeshResult<f64> {
    let horizontal = (v.x * v.x + v.y * v.y).sqrt();
    let angle_from_vertical = angle_between(v, &Vector3::z())?;
    if horizontal == 0.0 {
        return Ok(if v.z > 0.0 { 90.0 } else { -90.0 });
    }
    Ok(90.0 - angle_from_vertical)
}

fn orientation(straight_incl: f64, off_incl: f64) -> TeeOrientation {
    let s = straight_incl.abs();
    if s <= HORIZONTAL_DEG {
        if off_incl.abs() <= HORIZONTAL_DEG {
            TeeOrientation::StraightHorOffHor
        } else if off_incl >= VERTICAL_DEG {
            TeeOrientation::StraightHorOffVerUp
        } else if off_incl <= -VERTICAL_DEG {
            TeeOrientation::StraightHorOffVerDown
        } else if off_incl > 0.0 {
            TeeOrientation::StraightHorOffInclinedUp
        } else {
            TeeOrientation::StraightHorOffInclinedDown
        }
    } else if s >= VERTICAL_DEG && off_incl.abs() <= HORIZONTAL_DEG {
        TeeOrientation::StraightVerOffHor
    } else {
        TeeOrientation::Other
    }
}

/// Classify three tube ends meeting at one point.
///
/// Returns `Ok(None)` when the ends do not form a Tee.
pub fn classify_tee(candidates: &[TeeCandidate]) -> MeshResult<Option<TeeMatch>> {
    if candidates.len() != 3 {
        return Ok(None);
    }
    let mut ends = [candidates[0], candidates[1], candidates[2]];
    ends.sort_by_key(|c| c.tube);

    let mut best: Option<(f64, usize, usize, usize)> = None;
    for (i, j, k) in [(0, 1, 2), (0, 2, 1), (1, 2, 0)] {
        let (a, b, off) = (&ends[i], &ends[j], &ends[k]);
        if !a.straight || !b.straight {
            continue;
        }
        let d_ref = a.diameter.max(b.diameter);
        if (a.diameter - b.diameter).abs() > DIAMETER_REL_TOL * d_ref {
            continue;
        }
        if off.diameter > d_ref * (1.0 + DIAMETER_REL_TOL) {
            continue;
        }
        let pair = angle_between(&a.away, &b.away)?;
        let deviation = pair.min(180.0 - pair);
        if deviation > COLLINEAR_TOL_DEG {
            continue;
        }
        let off_angle = angle_between(&a.away, &off.away)?;
        if !(OFF_MIN_DEG..=OFF_MAX_DEG).contains(&off_angle) {
            continue;
        }
        if best.is_none_or(|(dev, ..)| deviation < dev) {
            best = Some((deviation, i, j, k));
        }
    }

    let Some((_, i, j, k)) = best else {
        return Ok(None);
    };
    let straight_incl = inclination_deg(&ends[i].away)?;
    let off_incl = inclination_deg(&ends[k].away)?;
    Ok(Some(TeeMatch {
        straight: [ends[i], ends[j]],
        off: ends[k],
        orientation: orientation(straight_incl, off_incl),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end(tube: usize, away: [f64; 3], diameter: f64) -> TeeCandidate {
        TeeCandidate {
            tube,
            branch: tube,
            away: Vector3::new(away[0], away[1], away[2]),
            diameter,
            straight: true,
        }
    }

    #[test]
    fn horizontal_run_with_riser() {
        let ends = [
            end(0, [1.0, 0.0, 0.0], 0.1),
            end(1, [-1.0, 0.0, 0.0], 0.1),
            end(2, [0.0, 0.0, 1.0], 0.05),
        ];
        let tee = classify_tee(&ends).unwrap().unwrap();
        assert_eq!(tee.off.tube, 2);
        assert_eq!(tee.orientation, TeeOrientation::StraightHorOffVerUp);
    }

    #[test]
    fn downward_off_tube() {
        let ends = [
            end(4, [0.0, 1.0, 0.0], 0.1),
            end(5, [0.0, 0.0, -1.0], 0.1),
            end(6, [0.0, -1.0, 0.0], 0.1),
        ];
        let tee = classify_tee(&ends).unwrap().unwrap();
        assert_eq!(tee.off.tube, 5);
        assert_eq!(tee.orientation, TeeOrientation::StraightHorOffVerDown);
    }

    #[test]
    fn vertical_run_with_horizontal_off() {
        let ends = [
            end(0, [0.0, 0.0, 1.0], 0.1),
            end(1, [0.0, 0.0, -1.0], 0.1),
            end(2, [1.0, 0.0, 0.0], 0.08),
        ];
        let tee = classify_tee(&ends).unwrap().unwrap();
        assert_eq!(tee.orientation, TeeOrientation::StraightVerOffHor);
    }

    #[test]
    fn wider_off_tube_is_not_a_tee() {
        let ends = [
            end(0, [1.0, 0.0, 0.0], 0.1),
            end(1, [-1.0, 0.0, 0.0], 0.1),
            end(2, [0.0, 0.0, 1.0], 0.2),
        ];
        assert!(classify_tee(&ends).unwrap().is_none());
    }

    #[test]
    fn shallow_off_angle_is_not_a_tee() {
        let ends = [
            end(0, [1.0, 0.0, 0.0], 0.1),
            end(1, [-1.0, 0.0, 0.0], 0.1),
            end(2, [1.0, 0.0, 0.3], 0.05),
        ];
        assert!(classify_tee(&ends).unwrap().is_none());
    }

    #[test]
    fn bent_straight_tube_disqualifies() {
        let mut ends = [
            end(0, [1.0, 0.0, 0.0], 0.1),
            end(1, [-1.0, 0.0, 0.0], 0.1),
            end(2, [0.0, 0.0, 1.0], 0.05),
        ];
        ends[0].straight = false;
        assert!(classify_tee(&ends).unwrap().is_none());
    }

    #[test]
    fn two_ends_never_tee() {
        let ends = [end(0, [1.0, 0.0, 0.0], 0.1), end(1, [-1.0, 0.0, 0.0], 0.1)];
        assert!(classify_tee(&ends).unwrap().is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn rotate_z(v: Vector3<f64>, angle: f64) -> Vector3<f64> {
            let (s, c) = angle.sin_cos();
            Vector3::new(c * v.x - s * v.y, s * v.x + c * v.y, v.z)
        }

        // Off-tube elevations away from the 10°/60° class boundaries.
        fn off_elevation() -> impl Strategy<Value = f64> {
            prop_oneof![Just(0.0), Just(30.0), Just(-30.0), Just(80.0), Just(-80.0), Just(90.0), Just(-90.0)]
        }

        proptest! {
            #[test]
            fn classification_ignores_order_and_heading(
                perm in 0usize..6,
                heading in 0.0f64..std::f64::consts::TAU,
                elevation in off_elevation(),
                d_off in 0.02f64..0.1,
            ) {
                let e = elevation.to_radians();
                let base = [
                    end(10, [1.0, 0.0, 0.0], 0.1),
                    end(11, [-1.0, 0.0, 0.0], 0.1),
                    end(12, [0.0, e.cos(), e.sin()], d_off),
                ];
                let reference = classify_tee(&base).unwrap();

                let order = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]][perm];
                let mut shuffled: Vec<TeeCandidate> = order.iter().map(|&i| base[i]).collect();
                for c in &mut shuffled {
                    c.away = rotate_z(c.away, heading);
                }
                let result = classify_tee(&shuffled).unwrap();

                prop_assert_eq!(reference.is_some(), result.is_some());
                if let (Some(a), Some(b)) = (reference, result) {
                    prop_assert_eq!(a.orientation, b.orientation);
                    prop_assert_eq!(a.off.tube, b.off.tube);
                    let mut sa = [a.straight[0].tube, a.straight[1].tube];
                    let mut sb = [b.straight[0].tube, b.straight[1].tube];
                    sa.sort_unstable();
                    sb.sort_unstable();
                    prop_assert_eq!(sa, sb);
                }
            }
        }
    }
}
