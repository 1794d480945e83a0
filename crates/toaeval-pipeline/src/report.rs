//! Parsing of engine text output.

use std::collections::BTreeMap;
use toaeval_core::ReconstructionStats;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ReportError {
    #[error("analysis report has no `{0}` field")]
    MissingField(&'static str),
    #[error("analysis report field `{field}` has invalid value `{value}`")]
    InvalidValue { field: &'static str, value: String },
}

const POINTS: &str = "points";
const OBSERVATIONS: &str = "observations";
const MEAN_ERROR: &str = "mean reprojection error";

/// Drop a leading glog prefix such as `I0612 10:11:12.123 model.cc:42] `.
fn strip_log_prefix(line: &str) -> &str {
    match line.find("] ") {
        Some(pos) if line.starts_with(['I', 'W', 'E', 'F']) => &line[pos + 2..],
        _ => line,
    }
}

/// `key: value` lines of a report, keys and values trimmed and lower-cased.
///
/// Lines without a colon are ignored; a repeated key keeps its last value.
pub fn report_fields(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(strip_log_prefix)
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_lowercase()))
        .collect()
}

fn field<'a>(
    fields: &'a BTreeMap<String, String>,
    name: &'static str,
) -> Result<&'a str, ReportError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or(ReportError::MissingField(name))
}

fn invalid(field: &'static str, value: &str) -> ReportError {
    ReportError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

/// Extract point count, observation count and mean reprojection error from
/// a model analysis report. The error's `px` suffix is optional.
pub fn parse_analysis_report(text: &str) -> Result<ReconstructionStats, ReportError> {
    let fields = report_fields(text);

    let points = field(&fields, POINTS)?;
    let observations = field(&fields, OBSERVATIONS)?;
    let error = field(&fields, MEAN_ERROR)?;

    Ok(ReconstructionStats {
        points: points.parse().map_err(|_| invalid(POINTS, points))?,
        observations: observations
            .parse()
            .map_err(|_| invalid(OBSERVATIONS, observations))?,
        mean_reprojection_error: error
            .trim_end_matches("px")
            .trim()
            .parse()
            .map_err(|_| invalid(MEAN_ERROR, error))?,
    })
}

/// Highlights of a mapper log, each the last matching line from the marker
/// onwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapperSummary {
    pub initial_pair: Option<String>,
    pub elapsed: Option<String>,
    pub points: Option<String>,
    pub mean_reprojection_error: Option<String>,
}

fn last_from(log: &str, marker: &str) -> Option<String> {
    log.lines()
        .rev()
        .find_map(|line| line.find(marker).map(|pos| line[pos..].trim().to_string()))
}

impl MapperSummary {
    pub fn from_log(log: &str) -> Self {
        Self {
            initial_pair: last_from(log, "Initializing with image pair"),
            elapsed: last_from(log, "Elapsed time"),
            points: last_from(log, "Points:"),
            mean_reprojection_error: last_from(log, "Mean reprojection error"),
        }
    }

    /// Non-empty highlights in a fixed order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        [
            &self.initial_pair,
            &self.elapsed,
            &self.points,
            &self.mean_reprojection_error,
        ]
        .into_iter()
        .filter_map(|line| line.as_deref())
    }
}
