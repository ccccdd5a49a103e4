//! Turn an assignment into the result grid and summary lines the club posts.

use std::io::Write;

use chrono::NaiveDate;

use crate::model::Participant;
use crate::partition::Assignment;

pub type Grid = Vec<Vec<String>>;

fn cell(member: &Participant) -> String {
    format!("{} ({}/{})", member.name, member.tier, member.gender.short())
}

/// Title row, blank row, label row, then one row per member slot.
pub fn format_grid(assignment: &Assignment, title: &str, date: NaiveDate) -> Grid {
    let date = date.format("%Y-%m-%d");
    if assignment.is_empty() {
        return vec![vec![format!("No assignment ({} - {})", title, date)]];
    }

    let mut rows: Grid = vec![
        vec![format!("Court assignment ({} - {})", title, date)],
        Vec::new(),
        assignment
            .groups
            .iter()
            .map(|g| g.label.to_string())
            .collect(),
    ];

    let depth = assignment.groups.iter().map(|g| g.len()).max().unwrap_or(0);
    for slot in 0..depth {
        rows.push(
            assignment
                .groups
                .iter()
                .map(|g| g.members.get(slot).map(cell).unwrap_or_default())
                .collect(),
        );
    }
    rows
}

/// One line per group: size, tier histogram, gender split and latecomers.
pub fn summary_lines(assignment: &Assignment) -> Vec<String> {
    let mut lines: Vec<String> = assignment
        .groups
        .iter()
        .map(|g| {
            let tiers: Vec<String> = g
                .stats
                .tiers
                .iter()
                .rev()
                .map(|(tier, count)| format!("{}:{}", tier, count))
                .collect();
            let names: Vec<&str> = g.members.iter().map(|m| m.name.as_str()).collect();
            format!(
                "{} ({} members, {}, M:{}, F:{}, late:{}): {}",
                g.label,
                g.stats.size,
                tiers.join(" "),
                g.stats.male,
                g.stats.female,
                g.stats.late,
                names.join(", ")
            )
        })
        .collect();
    lines.push(format!("Total assigned: {}", assignment.total_members()));
    lines
}

/// The roster section for a date: a heading row, a header row, then one row per member.
pub fn member_list(heading: &str, members: &[&Participant]) -> Grid {
    if members.is_empty() {
        return vec![vec![format!("{} (none)", heading)]];
    }
    let mut rows: Grid = vec![
        vec![heading.to_string()],
        vec![
            "id".to_string(),
            "name".to_string(),
            "grade".to_string(),
            "tier".to_string(),
            "gender".to_string(),
        ],
    ];
    rows.extend(members.iter().map(|m| {
        vec![
            m.id.clone(),
            m.name.clone(),
            m.grade.clone(),
            m.tier.to_string(),
            m.gender.short().to_string(),
        ]
    }));
    rows
}

/// Write grid rows as CSV. Rows may differ in length.
pub fn write_csv<W: Write>(grid: &Grid, writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);
    for row in grid {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Plain-text rendering with columns padded to the widest cell.
pub fn render_table(grid: &Grid) -> String {
    let columns = grid.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    // Title rows have a single cell and would stretch the first column
    for row in grid.iter().filter(|r| r.len() > 1) {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(value.chars().count());
        }
    }

    let mut out = String::new();
    for row in grid {
        // Short rows leave blank trailing cells; drop them so no dangling separator remains
        let used = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
        let line: Vec<String> = row[..used]
            .iter()
            .enumerate()
            .map(|(i, value)| {
                if row.len() == 1 {
                    value.clone()
                } else {
                    let pad = widths[i].saturating_sub(value.chars().count());
                    format!("{}{}", value, " ".repeat(pad))
                }
            })
            .collect();
        out.push_str(line.join(" | ").trim_end());
        out.push('\n');
    }
    out
}
