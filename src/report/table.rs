use std::fmt;

/// One report cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Blank,
}

impl Cell {
    /// Counters are stored as REAL; they render as whole numbers.
    pub fn count(value: f64) -> Cell {
        Cell::Int(value.round() as i64)
    }

    pub fn text(value: impl Into<String>) -> Cell {
        Cell::Text(value.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Text(_) | Cell::Blank => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v:.3}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Blank => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Totals, printed after a `---` separator.
    pub footer: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            footer: Vec::new(),
        }
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn cell(&self, row: usize, header: &str) -> Option<&Cell> {
        let col = self.column(header)?;
        self.rows.get(row)?.get(col)
    }

    pub fn footer_cell(&self, row: usize, header: &str) -> Option<&Cell> {
        let col = self.column(header)?;
        self.footer.get(row)?.get(col)
    }

    /// Header plus every row and footer row, rendered to strings.
    pub fn to_string_rows(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(self.rows.len() + self.footer.len() + 1);
        out.push(self.headers.clone());
        for row in self.rows.iter().chain(self.footer.iter()) {
            out.push(row.iter().map(|c| c.to_string()).collect());
        }
        out
    }
}

impl fmt::Display for ReportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = |row: &[Cell]| row.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        let body = self.rows.iter().map(|r| rendered(r)).collect::<Vec<_>>();
        let footer = self.footer.iter().map(|r| rendered(r)).collect::<Vec<_>>();
        let separator = vec!["---".to_string(); self.headers.len()];

        let mut widths = self
            .headers
            .iter()
            .map(|h| h.chars().count())
            .collect::<Vec<_>>();
        let sized = body.iter().chain(footer.iter()).chain(
            (!footer.is_empty())
                .then_some(&separator)
                .into_iter(),
        );
        for row in sized {
            for (idx, value) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(idx) {
                    *width = (*width).max(value.chars().count());
                }
            }
        }

        if !self.title.is_empty() {
            writeln!(f, "{}", self.title)?;
        }
        write_line(f, &widths, &self.headers)?;
        for row in &body {
            write_line(f, &widths, row)?;
        }
        if !footer.is_empty() {
            write_line(f, &widths, &separator)?;
            for row in &footer {
                write_line(f, &widths, row)?;
            }
        }
        Ok(())
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, widths: &[usize], row: &[String]) -> fmt::Result {
    let line = widths
        .iter()
        .enumerate()
        .map(|(idx, &width)| {
            let value = row.get(idx).map(String::as_str).unwrap_or("");
            format!("{value:>width$}")
        })
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(f, "{line}")
}

/// `num / max(1, den)`.
pub fn per(num: f64, den: f64) -> f64 {
    num / den.max(1.0)
}

pub fn ratio(num: f64, den: f64) -> String {
    ratio_prec(num, den, 3)
}

pub fn ratio_prec(num: f64, den: f64, precision: usize) -> String {
    format!("{:.*}", precision, per(num, den))
}

pub fn percent(num: f64, den: f64) -> String {
    format!("{:.2}%", per(num, den) * 100.0)
}

pub fn whole(value: f64) -> String {
    format!("{}", value.round() as i64)
}

/// Appends the cross-mode marker.
pub fn flagged(value: String, flag: bool) -> String {
    if flag { format!("{value}*") } else { value }
}

pub fn time_to_string(seconds: f64) -> String {
    let total_minutes = (seconds.max(0.0) as i64) / 60;
    let (hours, minutes) = (total_minutes / 60, total_minutes % 60);
    if hours > 0 {
        format!("{hours} hours {minutes} minutes")
    } else {
        format!("{minutes} minutes")
    }
}
