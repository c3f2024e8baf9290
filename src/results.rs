//! Presentation helpers for a successful search.

use latweb_protocol::ExecResult;
use std::{fmt, str::FromStr};

use crate::error::FormError;

pub type SearchResult = ExecResult;

/// `"<s> s"` below one minute, `"<m> min <s> s"` otherwise; seconds are
/// rounded to milliseconds.
pub fn format_cpu_time(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let rem = seconds % 60.0;
    let minutes = ((seconds - rem) / 60.0).round() as u64;
    let rem = (rem * 1000.0).round() / 1000.0;
    if minutes == 0 {
        format!("{rem} s")
    } else {
        format!("{minutes} min {rem} s")
    }
}

/// Points of the rank-1 lattice with `n` points; point `i` has coordinates
/// `((i * a_j) mod n) / n` for each component `a_j` of `generator`.
pub fn lattice_points(n: u64, generator: &[u64]) -> Vec<Vec<f64>> {
    if n == 0 {
        return vec![];
    }
    (0..n)
        .map(|i| {
            generator
                .iter()
                .map(|a| ((i as u128 * *a as u128) % n as u128) as f64 / n as f64)
                .collect()
        })
        .collect()
}

/// Two-dimensional projection of the lattice on one-based coordinates
/// `first` and `second`, clamped to the available dimensions.
pub fn projection(result: &SearchResult, first: usize, second: usize) -> Vec<(f64, f64)> {
    let dim = result.generating_vector.len();
    if dim == 0 {
        return vec![];
    }
    let clamp = |c: usize| c.clamp(1, dim) - 1;
    let (a, b) = (
        result.generating_vector[clamp(first)],
        result.generating_vector[clamp(second)],
    );
    lattice_points(result.size, &[a, b])
        .into_iter()
        .map(|p| (p[0], p[1]))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeLanguage {
    C,
    Python,
    Matlab,
}

impl CodeLanguage {
    pub const ALL: [CodeLanguage; 3] = [Self::C, Self::Python, Self::Matlab];

    pub fn title(self) -> &'static str {
        match self {
            Self::C => "C Code",
            Self::Python => "Python Code",
            Self::Matlab => "Matlab Code",
        }
    }
}

impl FromStr for CodeLanguage {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" => Ok(Self::C),
            "python" | "py" => Ok(Self::Python),
            "matlab" | "m" => Ok(Self::Matlab),
            other => Err(FormError::unknown("language", other)),
        }
    }
}

/// Source code that regenerates the lattice points of `result`.
pub fn code_snippet(language: CodeLanguage, result: &SearchResult) -> String {
    let n = result.size;
    let list = result
        .generating_vector
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    match language {
        CodeLanguage::C => format!(
            "int n = {n};\n\
             int s = {s};\n\
             int a[] = {{{list}}};\n\
             double points[n][s];\n\
             int i, j;\n\
             for (i = 0; i < n; i++)\n  \
             for (j = 0; j < s; j++)\n    \
             points[i][j] = ((long long)i * a[j]) % n / (double)n;",
            s = result.generating_vector.len()
        ),
        CodeLanguage::Python => format!(
            "n = {n}\n\
             a = [{list}]\n\
             points = [[(i * aj % n) / float(n) for aj in a] for i in range(n)]"
        ),
        CodeLanguage::Matlab => format!(
            "n = {n};\n\
             a = [{list}];\n\
             points = zeros(n,length(a));\n\
             for i = 1:n\n    \
             points(i,:) = mod((i - 1) * a, n) / n;\n\
             end"
        ),
    }
}

/// Plain-text summary of a search result.
pub struct ResultSummary<'a>(pub &'a SearchResult);

impl fmt::Display for ResultSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        let generator = r
            .generating_vector
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "Lattice size:      {}", r.size)?;
        writeln!(f, "Generating vector: {generator}")?;
        writeln!(f, "Merit value:       {}", r.merit)?;
        writeln!(f, "CPU time:          {}", format_cpu_time(r.cpu_seconds))?;
        write!(f, "Command line:      {}", r.command)
    }
}
