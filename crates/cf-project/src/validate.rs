//! Project validation logic.
//!
//! Checks what the mesh builder cannot see: ids and references, the drum
//! state and the solver settings. Per-tube geometry is checked again when
//! the mesh is built.

use crate::schema::{BoilerProject, LATEST_VERSION, TubeDef};
use std::collections::HashSet;

/// Critical pressure of water [bar]
const CRITICAL_PRESSURE_BAR: f64 = 220.64;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Project has no {what}")]
    Empty { what: &'static str },
}

fn invalid(field: String, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_project(project: &BoilerProject) -> Result<(), ValidationError> {
    if project.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    let p = project.drum.pressure_bar;
    if !(p.is_finite() && p > 0.0 && p < CRITICAL_PRESSURE_BAR) {
        return Err(invalid(
            "drum.pressure_bar".into(),
            p,
            "must lie between 0 and the critical pressure",
        ));
    }
    let sub = project.drum.subcooling_kj_per_kg;
    if !(sub.is_finite() && sub >= 0.0) {
        return Err(invalid(
            "drum.subcooling_kj_per_kg".into(),
            sub,
            "must be non-negative",
        ));
    }

    project
        .solver
        .validate()
        .map_err(|e| invalid("solver".into(), "settings", &e.to_string()))?;

    if project.points.is_empty() {
        return Err(ValidationError::Empty { what: "points" });
    }
    if project.tubes.is_empty() {
        return Err(ValidationError::Empty { what: "tubes" });
    }

    let mut point_ids = HashSet::new();
    for point in &project.points {
        if !point_ids.insert(point.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: point.id.clone(),
                context: "points".to_string(),
            });
        }
        if ![point.x_m, point.y_m, point.z_m].iter().all(|c| c.is_finite()) {
            return Err(invalid(
                format!("points[{}]", point.id),
                "coordinates",
                "must be finite",
            ));
        }
    }

    for (index, tube) in project.tubes.iter().enumerate() {
        for end in [&tube.from, &tube.to] {
            if !point_ids.contains(end.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: end.clone(),
                    context: format!("tubes[{index}]"),
                });
            }
        }
        validate_tube(index, tube)?;
    }

    Ok(())
}

fn validate_tube(index: usize, tube: &TubeDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("tubes[{index}].{name}");
    if !(tube.diameter_mm.is_finite() && tube.diameter_mm > 0.0) {
        return Err(invalid(field("diameter_mm"), tube.diameter_mm, "must be positive"));
    }
    for (name, bore) in [
        ("orifice_in_mm", tube.orifice_in_mm),
        ("orifice_out_mm", tube.orifice_out_mm),
    ] {
        if bore < 0.0 || bore >= tube.diameter_mm {
            return Err(invalid(
                field(name),
                bore,
                "must be zero or smaller than the tube diameter",
            ));
        }
    }
    if let Some(length) = tube.length_m
        && !(length.is_finite() && length > 0.0)
    {
        return Err(invalid(field("length_m"), length, "must be positive"));
    }
    if !(tube.heat_kw.is_finite() && tube.heat_kw >= 0.0) {
        return Err(invalid(field("heat_kw"), tube.heat_kw, "must be non-negative"));
    }
    if !(0.0..=180.0).contains(&tube.bend_angle_deg) {
        return Err(invalid(
            field("bend_angle_deg"),
            tube.bend_angle_deg,
            "must lie between 0 and 180",
        ));
    }
    if tube.bend_angle_deg > 0.0 && tube.bend_radius_mm < tube.diameter_mm / 2.0 {
        return Err(invalid(
            field("bend_radius_mm"),
            tube.bend_radius_mm,
            "a bend needs a radius of at least half the diameter",
        ));
    }
    Ok(())
}
