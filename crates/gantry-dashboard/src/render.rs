//! HTML rendering of the assembled dashboard.

use crate::builder::{Cell, CellStatus, Dashboard};
use gantry_core::report::job_display_name;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn render_cell(cell: &Option<Cell>) -> String {
    let Some(cell) = cell else {
        return "<td></td>".to_string();
    };

    let label = match &cell.status {
        CellStatus::Passed => "passed".to_string(),
        CellStatus::Failed(reason) => escape(reason),
        CellStatus::Pending => "running".to_string(),
    };

    let mut td = format!(
        "<td><a href=\"{}\">{}</a>",
        cell.log_url, label
    );
    for (name, elapsed) in &cell.phases {
        td.push_str(&format!("<br/>{}: {}", escape(name), escape(elapsed)));
    }
    if let Some(version) = cell.final_schema_version {
        td.push_str(&format!("<br/>Final schema version: {}", version));
    }
    if let Some(version) = cell.expected_final_schema_version {
        td.push_str(&format!("<br/>Expected schema version: {}", version));
    }
    if let Some(hb) = cell.heartbeat_at {
        td.push_str(&format!("<br/>Run at {}", hb.format("%Y-%m-%d %H:%M:%S")));
    }
    for (attempt, url) in &cell.alternates {
        td.push_str(&format!(" <a href=\"{}\">#{}</a>", url, attempt));
    }
    td.push_str("</td>");
    td
}

/// Render the full dashboard document.
pub fn render(dashboard: &Dashboard) -> String {
    let mut doc = String::new();
    doc.push_str(
        "<html><head><title>Gantry CI</title>\n\
         <link rel=\"stylesheet\" type=\"text/css\" href=\"/style.css\" />\n\
         </head><body>\n\
         <h1>Gantry CI</h1>\n",
    );

    let stats = &dashboard.stats;
    doc.push_str(&format!(
        "<p>{} work items: {} queued, {} completed, {} rechecks.",
        stats.total, stats.queued, stats.completed, stats.rechecks
    ));
    if let Some(hb) = stats.latest_heartbeat {
        doc.push_str(&format!(
            " Latest worker heartbeat {}.",
            hb.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    doc.push_str("</p>\n");

    doc.push_str("<table>\n<tr><th>patchset</th>");
    for job in &dashboard.jobs {
        doc.push_str(&format!("<th>{}</th>", escape(&job_display_name(job))));
    }
    doc.push_str("</tr>\n");

    for row in &dashboard.rows {
        doc.push_str(&format!("<tr><td>{}</td>", escape(&row.patchset.to_string())));
        for cell in &row.cells {
            doc.push_str(&render_cell(cell));
        }
        doc.push_str("</tr>\n");
    }

    doc.push_str("</table>\n");
    doc.push_str(&format!(
        "<p>Generated {}.</p>\n</body></html>",
        dashboard.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::keys::{Attempt, PatchsetRef};
    use gantry_core::work::QueueStats;

    fn dashboard() -> Dashboard {
        Dashboard {
            generated_at: chrono::Utc::now(),
            stats: QueueStats {
                total: 4,
                rechecks: 1,
                completed: 2,
                queued: 2,
                latest_heartbeat: None,
            },
            jobs: vec!["sqlalchemy_migration_nova_mysql".to_string()],
            rows: vec![
                crate::builder::Row {
                    patchset: PatchsetRef::new("I1234", 2),
                    cells: vec![Some(Cell {
                        attempt: Attempt::new(1),
                        status: CellStatus::Failed("Failed: patchset too slow".to_string()),
                        log_url: "/ci/I1234/2/sqlalchemy_migration_nova_mysql_attempt1/log.html"
                            .to_string(),
                        phases: vec![
                            ("trunk".to_string(), "5 seconds".to_string()),
                            ("patchset".to_string(), "42 seconds".to_string()),
                        ],
                        final_schema_version: Some(152),
                        expected_final_schema_version: Some(153),
                        heartbeat_at: None,
                        alternates: vec![(
                            Attempt::FIRST,
                            "/ci/I1234/2/sqlalchemy_migration_nova_mysql/log.html".to_string(),
                        )],
                    })],
                },
                crate::builder::Row {
                    patchset: PatchsetRef::new("I5678", 1),
                    cells: vec![None],
                },
            ],
        }
    }

    #[test]
    fn test_render_links_latest_and_alternates() {
        let html = render(&dashboard());
        assert!(html.contains(
            "<a href=\"/ci/I1234/2/sqlalchemy_migration_nova_mysql_attempt1/log.html\">Failed: patchset too slow</a>"
        ));
        assert!(html.contains(
            "<a href=\"/ci/I1234/2/sqlalchemy_migration_nova_mysql/log.html\">#0</a>"
        ));
    }

    #[test]
    fn test_render_missing_job_is_empty_cell() {
        let html = render(&dashboard());
        assert!(html.contains("<tr><td>I5678 #1</td><td></td></tr>"));
    }

    #[test]
    fn test_render_cell_lists_phases_and_versions() {
        let html = render(&dashboard());
        assert!(html.contains("<br/>trunk: 5 seconds"));
        assert!(html.contains("<br/>patchset: 42 seconds"));
        assert!(html.contains("<br/>Final schema version: 152"));
        assert!(html.contains("<br/>Expected schema version: 153"));
    }

    #[test]
    fn test_render_headers_use_display_names() {
        let html = render(&dashboard());
        assert!(html.contains("<th>nova upgrade mysql</th>"));
        assert!(html.contains("4 work items: 2 queued, 2 completed, 1 rechecks."));
    }
}
