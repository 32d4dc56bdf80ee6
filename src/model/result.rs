//! Estimator output: per-timestep series plus the two-row summary.

use chrono::NaiveDate;

/// One timestep of the impact series.
#[derive(Debug, Clone)]
pub struct ImpactPoint {
    pub date: NaiveDate,
    /// Observed value for the treated unit, if present in the data.
    pub observed: Option<f64>,
    /// Counterfactual posterior-predictive mean and credible interval.
    pub posterior_mean: f64,
    pub posterior_lower: f64,
    pub posterior_upper: f64,
    /// Pointwise effect (observed minus counterfactual), where observed.
    pub point_effect: Option<f64>,
    pub point_effect_lower: Option<f64>,
    pub point_effect_upper: Option<f64>,
    /// Running post-period effect; zero before the post-period.
    pub cumulative_effect: f64,
    pub cumulative_lower: f64,
    pub cumulative_upper: f64,
    pub in_post: bool,
}

/// One summary row (`average` or `cumulative`) over the post-period.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRow {
    pub actual: f64,
    pub predicted: f64,
    pub predicted_lower: f64,
    pub predicted_upper: f64,
    pub abs_effect: f64,
    pub abs_effect_lower: f64,
    pub abs_effect_upper: f64,
    pub rel_effect: f64,
    pub rel_effect_lower: f64,
    pub rel_effect_upper: f64,
}

/// Post-period summary: averaged and cumulative rows plus the posterior
/// tail probability of no effect.
#[derive(Debug, Clone, Copy)]
pub struct ImpactSummary {
    pub average: SummaryRow,
    pub cumulative: SummaryRow,
    pub p_value: f64,
}

/// Everything one estimator invocation produces. Ephemeral: recomputed on
/// every run, never persisted.
#[derive(Debug, Clone)]
pub struct ImpactResult {
    pub series: Vec<ImpactPoint>,
    pub summary: ImpactSummary,
}

impl ImpactResult {
    /// The post-period slice of the series, for charts that must not shade
    /// outside the analyzed window.
    pub fn post_series(&self) -> impl Iterator<Item = &ImpactPoint> {
        self.series.iter().filter(|p| p.in_post)
    }
}
