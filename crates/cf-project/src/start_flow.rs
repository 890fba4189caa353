//! Start-flow tables.
//!
//! Plain text, one `branch_index signed_flow` pair per line in kg/s. A
//! negative flow asks for the branch to be reversed before the first
//! iteration. Blank lines and `#` comments are skipped.

use crate::{ProjectError, ProjectResult};
use std::path::Path;

pub fn parse_start_flows(text: &str) -> ProjectResult<Vec<(usize, f64)>> {
    let mut flows = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let fields: Vec<&str> = content.split_whitespace().collect();
        let [branch, flow] = fields[..] else {
            return Err(ProjectError::StartFlow {
                line,
                what: format!("expected `branch flow`, got `{content}`"),
            });
        };
        let branch = branch.parse::<usize>().map_err(|e| ProjectError::StartFlow {
            line,
            what: format!("bad branch index `{branch}`: {e}"),
        })?;
        let flow = flow.parse::<f64>().map_err(|e| ProjectError::StartFlow {
            line,
            what: format!("bad flow `{flow}`: {e}"),
        })?;
        if !flow.is_finite() {
            return Err(ProjectError::StartFlow {
                line,
                what: format!("flow must be finite, got {flow}"),
            });
        }
        flows.push((branch, flow));
    }
    Ok(flows)
}

pub fn load_start_flows(path: &Path) -> ProjectResult<Vec<(usize, f64)>> {
    let content = std::fs::read_to_string(path)?;
    parse_start_flows(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# downcomers\n0 12.5\n\n1  -3.0   # reversed riser\n   \n";
        let flows = parse_start_flows(text).unwrap();
        assert_eq!(flows, vec![(0, 12.5), (1, -3.0)]);
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = parse_start_flows("0 1.0\n2\n").unwrap_err();
        match err {
            ProjectError::StartFlow { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn bad_fields_are_rejected() {
        assert!(parse_start_flows("-1 2.0").is_err());
        assert!(parse_start_flows("1 fast").is_err());
        assert!(parse_start_flows("1 NaN").is_err());
    }
}
