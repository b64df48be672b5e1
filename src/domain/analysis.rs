//! Analysis pipeline: bars in, factor series + composite regime score out.

use crate::domain::combine::{
    combine_factors, factor_correlation, CombineOptions, CompositeScore, CorrelationMatrix,
    ScoreSummary,
};
use crate::domain::error::RegimeError;
use crate::domain::factor::{compute_factor, FactorKind, FactorRegistry, FactorResult, TrendParams};
use crate::domain::ohlcv::{ensure_time_ordered, OhlcvBar};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Factors to compute, each with its weight.
    pub factors: Vec<(FactorKind, f64)>,
    pub combine: CombineOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::preset()
    }
}

impl AnalysisConfig {
    /// The stock five-factor blend, trend-heavy.
    pub fn preset() -> Self {
        Self {
            factors: vec![
                (FactorKind::Trend(TrendParams::default()), 2.5),
                (FactorKind::Rsi { period: 14 }, 1.8),
                (FactorKind::Cci { period: 14 }, 1.5),
                (FactorKind::Momentum { period: 20 }, 1.2),
                (FactorKind::Volatility { period: 20 }, 0.8),
            ],
            combine: CombineOptions::default(),
        }
    }

    pub fn registry(&self) -> Result<FactorRegistry, RegimeError> {
        let mut registry = FactorRegistry::new();
        let mut seen = BTreeSet::new();
        for (kind, weight) in &self.factors {
            let id = kind.id();
            if !seen.insert(id) {
                return Err(RegimeError::ConfigInvalid {
                    section: format!("factor.{}", id),
                    key: "period".into(),
                    reason: "factor listed more than once".into(),
                });
            }
            registry.register(id, *weight)?;
        }
        Ok(registry)
    }

    /// Fewest bars for which at least one factor emits a point.
    pub fn minimum_bars(&self) -> usize {
        self.factors
            .iter()
            .map(|(kind, _)| kind.minimum_bars())
            .min()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct RegimeReport {
    /// One series per configured factor, in configuration order.
    pub factors: Vec<Vec<FactorResult>>,
    pub composite: Vec<CompositeScore>,
    pub correlation: CorrelationMatrix,
}

impl RegimeReport {
    pub fn latest(&self) -> Option<&CompositeScore> {
        self.composite.last()
    }

    pub fn summary(&self) -> Option<ScoreSummary> {
        ScoreSummary::from_scores(&self.composite)
    }
}

pub fn run_analysis(bars: &[OhlcvBar], config: &AnalysisConfig) -> Result<RegimeReport, RegimeError> {
    ensure_time_ordered(bars)?;
    let registry = config.registry()?;

    let factors: Vec<Vec<FactorResult>> = config
        .factors
        .iter()
        .map(|(kind, _)| compute_factor(bars, kind, &registry))
        .collect();

    let composite = combine_factors(&factors, &config.combine)?;
    let correlation = factor_correlation(&factors);

    debug!(
        bars = bars.len(),
        factors = factors.len(),
        scores = composite.len(),
        "analysis complete"
    );

    Ok(RegimeReport {
        factors,
        composite,
        correlation,
    })
}
