use serde::{Deserialize, Serialize};

use super::{require_non_negative, round_currency, CalcError, MONTHS_PER_YEAR, WEEKS_PER_YEAR};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStream {
    pub name: String,
    pub annual: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamShare {
    pub name: String,
    pub annual: i64,
    pub monthly: i64,
    pub percent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamsSummary {
    pub streams: Vec<StreamShare>,
    pub total_annual: i64,
    pub total_monthly: i64,
    pub total_weekly: i64,
}

impl StreamsSummary {
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

/// Totals the income streams that report a positive amount; empty streams are dropped.
pub fn summarize_streams(streams: &[IncomeStream]) -> Result<StreamsSummary, CalcError> {
    let mut active = Vec::new();
    for stream in streams {
        if require_non_negative("annual", stream.annual)? > 0.0 {
            active.push(stream);
        }
    }

    let total: f64 = active.iter().map(|stream| stream.annual).sum();
    if total <= 0.0 {
        return Err(CalcError::invalid(
            "streams",
            "at least one stream must report income",
        ));
    }

    let streams = active
        .into_iter()
        .map(|stream| StreamShare {
            name: stream.name.clone(),
            annual: round_currency(stream.annual),
            monthly: round_currency(stream.annual / MONTHS_PER_YEAR),
            percent: round_currency(stream.annual / total * 100.0),
        })
        .collect();

    Ok(StreamsSummary {
        streams,
        total_annual: round_currency(total),
        total_monthly: round_currency(total / MONTHS_PER_YEAR),
        total_weekly: round_currency(total / WEEKS_PER_YEAR),
    })
}
