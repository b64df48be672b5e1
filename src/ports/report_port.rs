//! Report output port trait.

use crate::domain::combine::{CompositeScore, CorrelationMatrix};
use crate::domain::error::RegimeError;
use crate::domain::factor::FactorResult;
use crate::domain::indicator::IndicatorSeries;
use std::io::Write;

/// Port for writing analysis results as tables.
pub trait ReportPort {
    fn write_scores(&self, scores: &[CompositeScore], out: &mut dyn Write)
        -> Result<(), RegimeError>;

    fn write_factors(
        &self,
        factors: &[Vec<FactorResult>],
        out: &mut dyn Write,
    ) -> Result<(), RegimeError>;

    /// One row per bar, the columns of every series side by side.
    fn write_indicators(
        &self,
        series: &[IndicatorSeries],
        out: &mut dyn Write,
    ) -> Result<(), RegimeError>;

    fn write_correlation(
        &self,
        matrix: &CorrelationMatrix,
        out: &mut dyn Write,
    ) -> Result<(), RegimeError>;
}
