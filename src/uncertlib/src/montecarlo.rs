// Monte Carlo propagation
use std::collections::HashMap;

use mathru::algebra::linear::matrix::{General, CholeskyDecomposition};
use mathru::statistics::distrib::{Continuous, Normal};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use tracing::{debug, info, warn};

use crate::dists::{DistKind, UncertaintyComponent};
use crate::error::{Result, UncertError};
use crate::expr::Expr;
use crate::registry::{EvalTier, Registry};
use crate::result::MonteCarloResult;


pub(crate) struct McOutput {
    pub results: Vec<MonteCarloResult>,
    /// Evaluation tiers settled by probing, to be cached on the functions
    pub tiers: Vec<(String, EvalTier)>,
}


fn standard_normals(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)).collect()
}

// Standard normal draws to samples of one zero-centered component
fn component_samples(comp: &UncertaintyComponent, z: &[f64], std_norm: &Normal<f64>) -> Vec<f64> {
    match comp.dist() {
        DistKind::Normal => {
            let std = comp.std_dev();
            z.iter().map(|zi| std * zi).collect()
        },
        _ => z.iter().map(|zi| comp.ppf(std_norm.cdf(*zi))).collect(),
    }
}

/// Evaluate one sample at a time
fn eval_elementwise(expr: &Expr, cols: &HashMap<String, Vec<f64>>, n: usize) -> Result<Vec<f64>> {
    (0..n).map(|s| {
        let lookup = |name: &str| cols.get(name).map(|c| c[s]);
        expr.eval_with(&lookup)
    }).collect()
}


pub(crate) fn calculate(reg: &Registry, nsamples: usize, seed: Option<u64>, conf: f64) -> Result<McOutput> {
    if nsamples < 1 {
        return Err(UncertError::config("Number of samples must be at least 1"));
    }
    let vars = reg.used_variables()?;
    let nvars = vars.len();
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    debug!("Drawing {} samples of {} variables", nsamples, nvars);

    // First components are correlated through the Cholesky factor of the correlation matrix
    let mut z: Vec<Vec<f64>> = (0..nvars).map(|_| standard_normals(&mut rng, nsamples)).collect();
    let correlated = vars.iter().enumerate().any(|(i, v1)| {
        vars[i+1..].iter().any(|v2| reg.correlation(v1.name(), v2.name()) != 0.0)
    });
    if correlated {
        let mut corr = vec![0.0; nvars * nvars];
        for i in 0..nvars {
            for j in 0..nvars {
                corr[j*nvars + i] = reg.correlation(vars[i].name(), vars[j].name());
            }
        }
        let l = General::new(nvars, nvars, corr)
            .dec_cholesky()
            .map_err(|_| UncertError::config("Correlation matrix is not positive definite"))?
            .l();
        if (0..nvars).any(|i| !(l[[i, i]] > 0.0 && l[[i, i]].is_finite())) {
            return Err(UncertError::config("Correlation matrix is not positive definite"));
        }
        let mut zc = vec![vec![0.0; nsamples]; nvars];
        for (i, row) in zc.iter_mut().enumerate() {
            for k in 0..=i {
                let lik = l[[i, k]];
                if lik != 0.0 {
                    for (out, zk) in row.iter_mut().zip(z[k].iter()) {
                        *out += lik * zk;
                    }
                }
            }
        }
        z = zc;
    }

    let std_norm: Normal<f64> = Normal::new(0.0, 1.0);
    let mut cols: HashMap<String, Vec<f64>> = HashMap::with_capacity(nvars);
    for (var, zvar) in vars.iter().zip(z.iter()) {
        let mut samples = vec![var.nominal(); nsamples];
        for (c, comp) in var.uncerts().iter().enumerate() {
            let offsets = if c == 0 {
                component_samples(comp, zvar, &std_norm)
            } else {
                component_samples(comp, &standard_normals(&mut rng, nsamples), &std_norm)
            };
            for (s, o) in samples.iter_mut().zip(offsets.iter()) {
                *s += o;
            }
        }
        cols.insert(var.name().to_string(), samples);
    }

    let mut results = Vec::new();
    let mut tiers = Vec::new();
    for func in reg.functions() {
        let base = func.base_expr();
        let values = match func.tier() {
            EvalTier::Elementwise => eval_elementwise(base, &cols, nsamples)?,
            EvalTier::Vectorized => match base.eval_batch(&cols, nsamples) {
                Ok(v) => v,
                Err(_) => {
                    warn!("{} could not be evaluated on sample arrays, evaluating per sample", func.name());
                    eval_elementwise(base, &cols, nsamples)?
                },
            },
            EvalTier::Probe => match base.eval_batch(&cols, nsamples) {
                Ok(v) => {
                    tiers.push((func.name().to_string(), EvalTier::Vectorized));
                    v
                },
                Err(_) => {
                    warn!("{} is not vectorizable, falling back to per-sample evaluation", func.name());
                    tiers.push((func.name().to_string(), EvalTier::Elementwise));
                    eval_elementwise(base, &cols, nsamples)?
                },
            },
        };
        results.push(MonteCarloResult::new(values, conf));
    }
    info!("Monte Carlo calculated {} functions with {} samples", results.len(), nsamples);
    Ok(McOutput{results, tiers})
}
