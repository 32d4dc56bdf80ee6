//! Causal Impact Estimator Module
//!
//! Bayesian synthetic control: the treated unit is regressed on the
//! standardized control units over the pre-period with a conjugate
//! Normal-Inverse-Gamma ridge prior, and counterfactual trajectories are drawn
//! from the posterior predictive. Credible intervals are empirical quantiles
//! across draws; the significance measure is the posterior tail probability of
//! a zero cumulative effect.
//!
//! Draw-level RNGs are derived from the configured seed, so results are
//! reproducible regardless of how rayon schedules the draws.

use crate::config::AnalysisSettings;
use crate::data::{LoadError, TidyTable};
use crate::model::result::{ImpactPoint, ImpactResult, ImpactSummary, SummaryRow};
use crate::model::window::AnalysisWindow;
use ndarray::{Array1, Array2};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use statrs::distribution::{Gamma, Normal};
use thiserror::Error;

/// Weakly informative Inverse-Gamma prior on the observation variance.
const PRIOR_SHAPE: f64 = 0.01;
const PRIOR_RATE: f64 = 0.01;

const EPS: f64 = 1e-12;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("table access failed: {0}")]
    Data(#[from] LoadError),
    #[error("post-period contains no observed rows")]
    EmptyPost,
    #[error("pre-period has {have} usable rows; need at least {need}")]
    TooFewPreRows { have: usize, need: usize },
    #[error("treated unit has no variance over the pre-period")]
    DegenerateTreated,
    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Estimator settings.
#[derive(Debug, Clone, Copy)]
pub struct ImpactOptions {
    pub seed: u64,
    pub draws: usize,
    pub credible_level: f64,
    /// Ridge penalty on the control weights (prior precision).
    pub ridge: f64,
}

impl Default for ImpactOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            draws: 1000,
            credible_level: 0.95,
            ridge: 1.0,
        }
    }
}

impl From<&AnalysisSettings> for ImpactOptions {
    fn from(settings: &AnalysisSettings) -> Self {
        Self {
            seed: settings.seed,
            draws: settings.draws,
            credible_level: settings.credible_level,
            ..Self::default()
        }
    }
}

/// Synthetic-control estimator: `fit(table, window) -> ImpactResult`.
pub struct CausalImpact {
    options: ImpactOptions,
}

impl CausalImpact {
    pub fn new(options: ImpactOptions) -> Self {
        Self { options }
    }

    pub fn fit(
        &self,
        table: &TidyTable,
        window: &AnalysisWindow,
    ) -> Result<ImpactResult, ModelError> {
        let started = std::time::Instant::now();

        let dates = table.dates();
        let n = dates.len();

        let pre_idx: Vec<usize> = (0..n).filter(|&t| window.pre.contains(dates[t])).collect();
        let post_idx: Vec<usize> = (0..n).filter(|&t| window.post.contains(dates[t])).collect();
        if post_idx.is_empty() {
            return Err(ModelError::EmptyPost);
        }

        let treated = table.values(table.treated_unit())?;
        let control_names = &table.units()[1..];
        let k = control_names.len();
        let p = k + 1;

        // Standardize controls against their pre-period moments; missing cells
        // are imputed with the pre-period mean (zero after standardization).
        let mut controls = Array2::from_elem((n, k), f64::NAN);
        for (j, name) in control_names.iter().enumerate() {
            let values = table.values(name)?;
            for (t, value) in values.iter().enumerate() {
                if let Some(v) = value {
                    controls[[t, j]] = *v;
                }
            }
        }
        for j in 0..k {
            let pre_values: Vec<f64> = pre_idx
                .iter()
                .map(|&t| controls[[t, j]])
                .filter(|v| v.is_finite())
                .collect();
            let (mean, std) = moments(&pre_values);
            let std = if std > EPS { std } else { 1.0 };
            for t in 0..n {
                let v = controls[[t, j]];
                controls[[t, j]] = if v.is_finite() { (v - mean) / std } else { 0.0 };
            }
        }

        let y_pre: Vec<f64> = pre_idx.iter().filter_map(|&t| treated[t]).collect();
        let (y_mean, y_std) = moments(&y_pre);
        if !(y_std > EPS) {
            return Err(ModelError::DegenerateTreated);
        }

        // Design matrix over the full series: intercept plus controls.
        let mut full_x = Array2::zeros((n, p));
        for t in 0..n {
            full_x[[t, 0]] = 1.0;
            for j in 0..k {
                full_x[[t, j + 1]] = controls[[t, j]];
            }
        }

        let fit_rows: Vec<usize> = pre_idx
            .iter()
            .copied()
            .filter(|&t| treated[t].is_some())
            .collect();
        let m = fit_rows.len();
        let need = p + 2;
        if m < need {
            return Err(ModelError::TooFewPreRows { have: m, need });
        }

        let mut xf = Array2::zeros((m, p));
        let mut yf = Array1::zeros(m);
        for (row, &t) in fit_rows.iter().enumerate() {
            for c in 0..p {
                xf[[row, c]] = full_x[[t, c]];
            }
            if let Some(obs) = treated[t] {
                yf[row] = (obs - y_mean) / y_std;
            }
        }

        // Conjugate posterior: A = X'X + ridge*I, beta_hat = A^-1 X'y.
        let mut a = xf.t().dot(&xf);
        for c in 0..p {
            a[[c, c]] += self.options.ridge;
        }
        let xty = xf.t().dot(&yf);
        let l = cholesky(&a)
            .ok_or_else(|| ModelError::Numerical("design matrix not positive definite".into()))?;
        let beta_hat = back_sub_transpose(&l, &forward_sub(&l, &xty));

        let a_n = PRIOR_SHAPE + 0.5 * m as f64;
        let b_n = (PRIOR_RATE + 0.5 * (yf.dot(&yf) - beta_hat.dot(&xty))).max(1e-9);
        let gamma = Gamma::new(a_n, b_n)
            .map_err(|e| ModelError::Numerical(format!("variance posterior: {e}")))?;
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ModelError::Numerical(format!("standard normal: {e}")))?;

        let seed = self.options.seed;
        let draws = self.options.draws.max(2);

        // One counterfactual trajectory per posterior-predictive draw.
        let trajectories: Vec<Vec<f64>> = (0..draws)
            .into_par_iter()
            .map(|draw| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(draw as u64));
                let sigma2 = 1.0 / gamma.sample(&mut rng).max(EPS);
                let sigma = sigma2.sqrt();

                let z: Array1<f64> = (0..p).map(|_| normal.sample(&mut rng)).collect();
                let spread = back_sub_transpose(&l, &z);
                let beta = &beta_hat + &spread.mapv(|v| v * sigma);

                (0..n)
                    .map(|t| {
                        let mu = full_x.row(t).dot(&beta);
                        let eps = normal.sample(&mut rng);
                        y_mean + y_std * (mu + sigma * eps)
                    })
                    .collect()
            })
            .collect();

        let result = self.assemble(table, window, &post_idx, &treated, &trajectories)?;

        tracing::info!(
            pre_rows = m,
            controls = k,
            draws,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "causal impact fit complete"
        );
        Ok(result)
    }

    /// Reduce the per-draw trajectories to the series and summary.
    fn assemble(
        &self,
        table: &TidyTable,
        window: &AnalysisWindow,
        post_idx: &[usize],
        treated: &[Option<f64>],
        trajectories: &[Vec<f64>],
    ) -> Result<ImpactResult, ModelError> {
        let dates = table.dates();
        let n = dates.len();
        let draws = trajectories.len();
        let alpha = (1.0 - self.options.credible_level) / 2.0;

        let mut series = Vec::with_capacity(n);
        for t in 0..n {
            let mut column: Vec<f64> = trajectories.iter().map(|traj| traj[t]).collect();
            column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let mean = column.iter().sum::<f64>() / draws as f64;
            let lower = quantile(&column, alpha);
            let upper = quantile(&column, 1.0 - alpha);
            let observed = treated[t];

            series.push(ImpactPoint {
                date: dates[t],
                observed,
                posterior_mean: mean,
                posterior_lower: lower,
                posterior_upper: upper,
                point_effect: observed.map(|obs| obs - mean),
                point_effect_lower: observed.map(|obs| obs - upper),
                point_effect_upper: observed.map(|obs| obs - lower),
                cumulative_effect: 0.0,
                cumulative_lower: 0.0,
                cumulative_upper: 0.0,
                in_post: window.post.contains(dates[t]),
            });
        }

        // Running cumulative effect across the post-period, draw by draw.
        let mut running = vec![0.0_f64; draws];
        for &t in post_idx {
            if let Some(obs) = treated[t] {
                for (d, traj) in trajectories.iter().enumerate() {
                    running[d] += obs - traj[t];
                }
            }
            let mut sorted = running.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            series[t].cumulative_effect = running.iter().sum::<f64>() / draws as f64;
            series[t].cumulative_lower = quantile(&sorted, alpha);
            series[t].cumulative_upper = quantile(&sorted, 1.0 - alpha);
        }

        // Post-period rows with an observed value drive the summary.
        let observed_post: Vec<(usize, f64)> = post_idx
            .iter()
            .filter_map(|&t| treated[t].map(|obs| (t, obs)))
            .collect();
        if observed_post.is_empty() {
            return Err(ModelError::EmptyPost);
        }
        let npost = observed_post.len() as f64;
        let actual_cum: f64 = observed_post.iter().map(|(_, obs)| obs).sum();

        let pred_cum: Vec<f64> = trajectories
            .iter()
            .map(|traj| observed_post.iter().map(|&(t, _)| traj[t]).sum())
            .collect();
        let abs_cum: Vec<f64> = pred_cum.iter().map(|pred| actual_cum - pred).collect();
        let rel: Vec<f64> = pred_cum
            .iter()
            .zip(&abs_cum)
            .map(|(pred, abs)| if pred.abs() > EPS { abs / pred } else { 0.0 })
            .collect();

        let positive = abs_cum.iter().filter(|&&v| v > 0.0).count();
        let negative = abs_cum.iter().filter(|&&v| v < 0.0).count();
        let p_value = (1 + positive.min(negative)) as f64 / (1 + draws) as f64;

        let cumulative = summary_row(actual_cum, &pred_cum, &abs_cum, &rel, alpha);
        let avg_pred: Vec<f64> = pred_cum.iter().map(|v| v / npost).collect();
        let avg_abs: Vec<f64> = abs_cum.iter().map(|v| v / npost).collect();
        let average = summary_row(actual_cum / npost, &avg_pred, &avg_abs, &rel, alpha);

        Ok(ImpactResult {
            series,
            summary: ImpactSummary {
                average,
                cumulative,
                p_value,
            },
        })
    }
}

fn summary_row(
    actual: f64,
    predicted: &[f64],
    abs_effect: &[f64],
    rel_effect: &[f64],
    alpha: f64,
) -> SummaryRow {
    let (predicted_mean, predicted_lower, predicted_upper) = draw_stats(predicted, alpha);
    let (abs_mean, abs_lower, abs_upper) = draw_stats(abs_effect, alpha);
    let (rel_mean, rel_lower, rel_upper) = draw_stats(rel_effect, alpha);
    SummaryRow {
        actual,
        predicted: predicted_mean,
        predicted_lower,
        predicted_upper,
        abs_effect: abs_mean,
        abs_effect_lower: abs_lower,
        abs_effect_upper: abs_upper,
        rel_effect: rel_mean,
        rel_effect_lower: rel_lower,
        rel_effect_upper: rel_upper,
    }
}

fn draw_stats(values: &[f64], alpha: f64) -> (f64, f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    (mean, quantile(&sorted, alpha), quantile(&sorted, 1.0 - alpha))
}

/// Sample mean and standard deviation.
fn moments(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };
    (mean, variance.sqrt())
}

/// Quantile with linear interpolation over pre-sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lower as f64;
    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
/// The regression has only a handful of controls, so a direct decomposition
/// avoids pulling in a LAPACK backend.
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let p = a.nrows();
    let mut l = Array2::<f64>::zeros((p, p));
    for i in 0..p {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for c in 0..j {
                sum -= l[[i, c]] * l[[j, c]];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve L x = b for lower-triangular L.
fn forward_sub(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let p = b.len();
    let mut x = Array1::zeros(p);
    for i in 0..p {
        let mut sum = b[i];
        for c in 0..i {
            sum -= l[[i, c]] * x[c];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Solve L^T x = b for lower-triangular L.
fn back_sub_transpose(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let p = b.len();
    let mut x = Array1::zeros(p);
    for i in (0..p).rev() {
        let mut sum = b[i];
        for c in i + 1..p {
            sum -= l[[c, i]] * x[c];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}
