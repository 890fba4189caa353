//! Junction-loss model.
//!
//! A passage through a node is tagged with one of ten flow-topology cases.
//! Tee coefficients are equal-area 90° handbook approximations referenced to
//! the velocity head of the passage's own tube; `flow_ratio` is the passage
//! flow over the combined flow through the Tee.

/// Flow-topology case of one passage through a junction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JunctionCase {
    /// Dividing Tee, straight inlet continuing straight.
    DividingRun,
    /// Dividing Tee, straight inlet turning into the off tube.
    DividingBranch,
    /// Dividing Tee fed through the off tube into a straight tube.
    DividingOffToRun,
    /// Combining Tee, straight inlet continuing straight.
    CombiningRun,
    /// Combining Tee, off inlet turning into the straight outlet.
    CombiningBranch,
    /// Combining Tee, straight inlet turning into the off outlet.
    CombiningRunToOff,
    /// Leaving a drum or header into a tube.
    Entrance,
    /// Leaving a tube into a drum or header.
    Exit,
    /// Two-tube node that turns the flow through `angle_deg`.
    Deflection { angle_deg: f64 },
    /// Straight two-tube node.
    Through,
}

pub fn junction_loss(case: JunctionCase, flow_ratio: f64) -> f64 {
    let q = flow_ratio.clamp(0.0, 1.0);
    match case {
        JunctionCase::DividingRun => 0.36 * (1.0 - q).powi(2),
        JunctionCase::DividingBranch => 1.08 + 0.3 * (1.0 - q).powi(2),
        JunctionCase::DividingOffToRun => 1.2,
        JunctionCase::CombiningRun => 0.36 + 0.6 * (1.0 - q).powi(2),
        JunctionCase::CombiningBranch => 1.08 + 0.4 * (1.0 - q).powi(2),
        JunctionCase::CombiningRunToOff => 1.5,
        JunctionCase::Entrance => 0.5,
        JunctionCase::Exit => 1.0,
        JunctionCase::Deflection { angle_deg } => crate::local::mitre_loss(angle_deg),
        JunctionCase::Through => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_through_cheaper_than_turning() {
        for q in [0.2, 0.5, 0.9] {
            assert!(
                junction_loss(JunctionCase::DividingRun, q)
                    < junction_loss(JunctionCase::DividingBranch, q)
            );
            assert!(
                junction_loss(JunctionCase::CombiningRun, q)
                    < junction_loss(JunctionCase::CombiningBranch, q)
            );
        }
    }

    #[test]
    fn plain_cases() {
        assert_eq!(junction_loss(JunctionCase::Entrance, 1.0), 0.5);
        assert_eq!(junction_loss(JunctionCase::Exit, 1.0), 1.0);
        assert_eq!(junction_loss(JunctionCase::Through, 1.0), 0.0);
        assert!(junction_loss(JunctionCase::Deflection { angle_deg: 90.0 }, 1.0) > 0.9);
    }

    #[test]
    fn ratio_is_clamped() {
        assert_eq!(
            junction_loss(JunctionCase::DividingRun, -3.0),
            junction_loss(JunctionCase::DividingRun, 0.0)
        );
    }
}
