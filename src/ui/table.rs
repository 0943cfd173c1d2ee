use tabled::{settings::Style, Table, Tabled};

use crate::pipeline::FileReport;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "File")]
    path: String,
    #[tabled(rename = "Inline")]
    inlined: usize,
    #[tabled(rename = "Hoisted")]
    hoisted: usize,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// One row per file that gained declarations
pub fn declarations_table(reports: &[FileReport]) -> String {
    let rows: Vec<FileRow> = reports
        .iter()
        .filter(|report| !report.stats.is_empty())
        .map(|report| FileRow {
            path: report.path.display().to_string(),
            inlined: report.stats.inlined.len(),
            hoisted: report.stats.hoisted.len(),
        })
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_is_blank() {
        assert!(TableBuilder::new().build().is_empty());
        assert!(declarations_table(&[]).is_empty());
    }

    #[test]
    fn test_stats_table_lists_rows() {
        let table = stats_table(&[("Files", "3"), ("Declared", "7")]);
        assert!(table.contains("Metric"));
        assert!(table.contains("Declared"));
        assert!(table.contains('7'));
    }
}
