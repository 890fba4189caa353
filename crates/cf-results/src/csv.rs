//! Comma-separated results tables.

use crate::types::{BranchRecord, NodeRecord};
use crate::{ResultsError, ResultsResult};

/// A record that is one line of a results table.
pub trait TableRow: Sized {
    const FILE: &'static str;
    const HEADER: &'static str;

    fn to_line(&self) -> String;
    fn from_fields(fields: &[&str]) -> Result<Self, String>;
}

pub fn write_table<T: TableRow>(rows: &[T]) -> String {
    let mut out = String::from(T::HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&row.to_line());
        out.push('\n');
    }
    out
}

pub fn read_table<T: TableRow>(text: &str) -> ResultsResult<Vec<T>> {
    let columns = T::HEADER.split(',').count();
    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let table_error = |what: String| ResultsError::Table {
            file: T::FILE,
            line: index + 1,
            what,
        };
        if fields.len() != columns {
            return Err(table_error(format!(
                "expected {columns} fields, got {}",
                fields.len()
            )));
        }
        rows.push(T::from_fields(&fields).map_err(table_error)?);
    }
    Ok(rows)
}

fn field<T: std::str::FromStr>(fields: &[&str], i: usize, name: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    fields[i]
        .parse()
        .map_err(|e| format!("{name} `{}`: {e}", fields[i]))
}

impl TableRow for BranchRecord {
    const FILE: &'static str = "branches.csv";
    const HEADER: &'static str = "branch,kind,node_in,node_out,tubes,g_kg_s,q_kw,length_m,height_m,\
dp_dyn_pa,dp_stat_pa,h_in_kj_per_kg,h_out_kj_per_kg,x_out,reversals,zeroed";

    fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.branch,
            self.kind,
            self.node_in,
            self.node_out,
            self.tubes,
            self.g_kg_s,
            self.q_kw,
            self.length_m,
            self.height_m,
            self.dp_dyn_pa,
            self.dp_stat_pa,
            self.h_in_kj_per_kg,
            self.h_out_kj_per_kg,
            self.x_out,
            self.reversals,
            self.zeroed
        )
    }

    fn from_fields(f: &[&str]) -> Result<Self, String> {
        Ok(Self {
            branch: field(f, 0, "branch")?,
            kind: f[1].to_string(),
            node_in: field(f, 2, "node_in")?,
            node_out: field(f, 3, "node_out")?,
            tubes: field(f, 4, "tubes")?,
            g_kg_s: field(f, 5, "g_kg_s")?,
            q_kw: field(f, 6, "q_kw")?,
            length_m: field(f, 7, "length_m")?,
            height_m: field(f, 8, "height_m")?,
            dp_dyn_pa: field(f, 9, "dp_dyn_pa")?,
            dp_stat_pa: field(f, 10, "dp_stat_pa")?,
            h_in_kj_per_kg: field(f, 11, "h_in_kj_per_kg")?,
            h_out_kj_per_kg: field(f, 12, "h_out_kj_per_kg")?,
            x_out: field(f, 13, "x_out")?,
            reversals: field(f, 14, "reversals")?,
            zeroed: field(f, 15, "zeroed")?,
        })
    }
}

impl TableRow for NodeRecord {
    const FILE: &'static str = "nodes.csv";
    const HEADER: &'static str =
        "node,point,elevation_m,junction,p_bar,dp_drum_pa,g_in_kg_s,g_sum_kg_s,h_mix_kj_per_kg,\
         x_mix,steam_to_off";

    fn to_line(&self) -> String {
        let steam_to_off = self.steam_to_off.map(|s| s.to_string()).unwrap_or_default();
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.node,
            self.point,
            self.elevation_m,
            self.junction,
            self.p_bar,
            self.dp_drum_pa,
            self.g_in_kg_s,
            self.g_sum_kg_s,
            self.h_mix_kj_per_kg,
            self.x_mix,
            steam_to_off
        )
    }

    fn from_fields(f: &[&str]) -> Result<Self, String> {
        let steam_to_off = if f[10].is_empty() {
            None
        } else {
            Some(field(f, 10, "steam_to_off")?)
        };
        Ok(Self {
            node: field(f, 0, "node")?,
            point: field(f, 1, "point")?,
            elevation_m: field(f, 2, "elevation_m")?,
            junction: f[3].to_string(),
            p_bar: field(f, 4, "p_bar")?,
            dp_drum_pa: field(f, 5, "dp_drum_pa")?,
            g_in_kg_s: field(f, 6, "g_in_kg_s")?,
            g_sum_kg_s: field(f, 7, "g_sum_kg_s")?,
            h_mix_kj_per_kg: field(f, 8, "h_mix_kj_per_kg")?,
            x_mix: field(f, 9, "x_mix")?,
            steam_to_off,
        })
    }
}
