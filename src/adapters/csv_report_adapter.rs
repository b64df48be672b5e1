//! CSV report adapter.

use crate::domain::combine::{CompositeScore, CorrelationMatrix};
use crate::domain::error::RegimeError;
use crate::domain::factor::FactorResult;
use crate::domain::indicator::{IndicatorSeries, IndicatorValue};
use crate::ports::report_port::ReportPort;
use chrono::NaiveDateTime;
use std::io::Write;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvReportAdapter {
    precision: usize,
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self { precision: 6 }
    }
}

impl CsvReportAdapter {
    fn num(&self, v: f64) -> String {
        format!("{:.*}", self.precision, v)
    }
}

fn ts(t: NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

fn write_err(e: impl std::fmt::Display) -> RegimeError {
    RegimeError::ReportWrite {
        reason: e.to_string(),
    }
}

/// Column names and cell values of one indicator value shape.
fn value_columns(label: &str, value: &IndicatorValue) -> Vec<(String, f64)> {
    let named = |parts: &[(&str, f64)]| -> Vec<(String, f64)> {
        parts
            .iter()
            .map(|(suffix, v)| (format!("{}.{}", label, suffix), *v))
            .collect()
    };
    match *value {
        IndicatorValue::Simple(v) => vec![(label.to_string(), v)],
        IndicatorValue::Macd {
            dif,
            dea,
            histogram,
        } => named(&[("dif", dif), ("dea", dea), ("hist", histogram)]),
        IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } => named(&[("upper", upper), ("middle", middle), ("lower", lower)]),
        IndicatorValue::Kdj { k, d, j } => named(&[("k", k), ("d", d), ("j", j)]),
        IndicatorValue::Asi { asi, asit } => named(&[("asi", asi), ("asit", asit)]),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_scores(
        &self,
        scores: &[CompositeScore],
        out: &mut dyn Write,
    ) -> Result<(), RegimeError> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(["timestamp", "composite_score", "factor_count"])
            .map_err(write_err)?;
        for s in scores {
            wtr.write_record([
                ts(s.timestamp),
                self.num(s.composite_score),
                s.factor_count.to_string(),
            ])
            .map_err(write_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_factors(
        &self,
        factors: &[Vec<FactorResult>],
        out: &mut dyn Write,
    ) -> Result<(), RegimeError> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(["timestamp", "factor", "value", "weight"])
            .map_err(write_err)?;
        for r in factors.iter().flatten() {
            wtr.write_record([
                ts(r.timestamp),
                r.factor_name.clone(),
                self.num(r.value),
                r.weight.to_string(),
            ])
            .map_err(write_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_indicators(
        &self,
        series: &[IndicatorSeries],
        out: &mut dyn Write,
    ) -> Result<(), RegimeError> {
        let mut wtr = csv::Writer::from_writer(out);
        let Some(longest) = series.iter().max_by_key(|s| s.len()) else {
            wtr.write_record(["timestamp"]).map_err(write_err)?;
            wtr.flush()?;
            return Ok(());
        };

        let mut header = vec!["timestamp".to_string()];
        let mut widths = Vec::with_capacity(series.len());
        for s in series {
            let label = s.indicator_type.to_string();
            let cols: Vec<String> = match s.values.first() {
                Some(p) => value_columns(&label, &p.value)
                    .into_iter()
                    .map(|(name, _)| name)
                    .collect(),
                None => vec![label],
            };
            widths.push(cols.len());
            header.extend(cols);
        }
        wtr.write_record(&header).map_err(write_err)?;

        for (i, anchor) in longest.values.iter().enumerate() {
            let mut row = vec![ts(anchor.timestamp)];
            for (s, &width) in series.iter().zip(&widths) {
                match s.values.get(i) {
                    Some(p) if p.valid => row.extend(
                        value_columns("", &p.value)
                            .into_iter()
                            .map(|(_, v)| self.num(v)),
                    ),
                    _ => row.extend(std::iter::repeat_n(String::new(), width)),
                }
            }
            wtr.write_record(&row).map_err(write_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_correlation(
        &self,
        matrix: &CorrelationMatrix,
        out: &mut dyn Write,
    ) -> Result<(), RegimeError> {
        let mut wtr = csv::Writer::from_writer(out);
        let mut header = vec![String::new()];
        header.extend(matrix.names.iter().cloned());
        wtr.write_record(&header).map_err(write_err)?;
        for (name, row) in matrix.names.iter().zip(&matrix.values) {
            let mut record = vec![name.clone()];
            record.extend(row.iter().map(|v| v.map(|v| self.num(v)).unwrap_or_default()));
            wtr.write_record(&record).map_err(write_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
