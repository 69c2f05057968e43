// Structures for calculation results
use std::f64::consts::PI;
use std::sync::Arc;

use mathru::algebra::linear::matrix::General;
use tabled::{builder::Builder, settings::Style};

use crate::dists::linspace;
use crate::error::{Result, UncertError};
use crate::stats;


/// Grid size of joint density contours
pub const CONTOUR_N: usize = 50;
const HIST_BINS: usize = 50;


/// Matrices of one GUM calculation, shared by all function results
#[derive(Clone, Debug)]
pub struct GumComponents {
    pub varnames: Vec<String>,
    pub funcnames: Vec<String>,
    pub ux: General<f64>,   // Input covariance
    pub cx: General<f64>,   // Sensitivity coefficients, one row per function
    pub uy: General<f64>,   // Output covariance
    pub partial_eqs: Vec<Vec<String>>,
}


#[derive(Clone, Debug)]
pub struct GumResult {
    pub expected: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub degrees_freedom: f64,
    pub coverage_factor: f64,
    pub confidence: f64,
    pub sensitivities: Vec<f64>,  // Aligned with gum.varnames
    pub proportions: Vec<f64>,
    pub gum: Arc<GumComponents>,
}
impl GumResult {
    pub fn expanded(&self) -> f64 {
        self.std_dev * self.coverage_factor
    }
    pub fn sensitivity(&self, varname: &str) -> Option<f64> {
        self.gum.varnames.iter().position(|v| v == varname).map(|i| self.sensitivities[i])
    }
    pub fn proportion(&self, varname: &str) -> Option<f64> {
        self.gum.varnames.iter().position(|v| v == varname).map(|i| self.proportions[i])
    }
}


#[derive(Clone, Debug)]
pub struct Histogram {
    pub bins: Vec<f64>,  // Bin centers
    pub density: Vec<f64>,  // Density of each bin
    pub width: f64,   // Width of all bins
    pub low: f64,     // Lower bound of coverage region
    pub high: f64,    // Upper bound of coverage region
}
impl Histogram {
    fn new(sorted: &[f64], bins: usize, low: f64, high: f64) -> Self {
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let width = (max - min) / bins as f64;
        if width <= 0.0 || !width.is_finite() {
            // Every sample identical: one bin holding all probability
            return Self{bins: vec![min], density: vec![1.0], width: 0.0, low, high};
        }
        let mut counts: Vec<usize> = vec![0; bins];
        let centers: Vec<f64> = (0..bins).map(|i| min + i as f64*width + width/2.0).collect();
        for samp in sorted.iter() {
            let idx = (((samp - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        let n = sorted.len() as f64;
        let density: Vec<f64> = counts.iter().map(|i| *i as f64/n/width).collect();
        Self{
            bins: centers,
            density,
            width,
            low,
            high,
        }
    }
}


/// Coverage interval with its effective coverage factor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverageInterval {
    pub low: f64,
    pub high: f64,
    pub k: f64,
}
impl CoverageInterval {
    fn new((low, high): (f64, f64), std_dev: f64) -> Self {
        let k = if std_dev > 0.0 { (high - low) / (2.0 * std_dev) } else { f64::NAN };
        Self{low, high, k}
    }
}


#[derive(Clone, Debug)]
pub struct MonteCarloResult {
    pub samples: Vec<f64>,
    pub expected: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub confidence: f64,
    pub symmetric: CoverageInterval,
    pub shortest: CoverageInterval,
    pub hist: Histogram,
}
impl MonteCarloResult {
    pub fn new(samples: Vec<f64>, conf: f64) -> Self {
        let mean = stats::mean(&samples);
        let variance = stats::variance(&samples);
        let stddev = variance.sqrt();

        let sorted = stats::sorted(&samples);
        let symmetric = CoverageInterval::new(stats::symmetric_interval(&sorted, conf), stddev);
        let shortest = CoverageInterval::new(stats::shortest_interval(&sorted, conf), stddev);
        let hist = Histogram::new(&sorted, HIST_BINS, symmetric.low, symmetric.high);

        Self{
            samples,
            expected: mean,
            variance,
            std_dev: stddev,
            confidence: conf,
            symmetric,
            shortest,
            hist,
        }
    }
    /// Expanded uncertainty interval, shortest or symmetric
    pub fn expanded(&self, shortest: bool) -> CoverageInterval {
        if shortest { self.shortest } else { self.symmetric }
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Gum,
    Mc,
}


/// Result of one method for one function
#[derive(Clone, Copy, Debug)]
pub enum UncertResult<'a> {
    Gum(&'a GumResult),
    Montecarlo(&'a MonteCarloResult),
}
impl UncertResult<'_> {
    pub fn expected(&self) -> f64 {
        match self {
            UncertResult::Gum(v) => v.expected,
            UncertResult::Montecarlo(v) => v.expected,
        }
    }
    pub fn std_uncert(&self) -> f64 {
        match self {
            UncertResult::Gum(v) => v.std_dev,
            UncertResult::Montecarlo(v) => v.std_dev,
        }
    }
    pub fn degrees_freedom(&self) -> f64 {
        match self {
            UncertResult::Gum(v) => v.degrees_freedom,
            UncertResult::Montecarlo(_) => f64::INFINITY,
        }
    }
    /// Expanded interval (symmetric for Monte Carlo)
    pub fn interval(&self) -> (f64, f64) {
        match self {
            UncertResult::Gum(v) => (v.expected - v.expanded(), v.expected + v.expanded()),
            UncertResult::Montecarlo(v) => (v.symmetric.low, v.symmetric.high),
        }
    }
}


#[derive(Clone, Debug)]
pub struct FunctionResult {
    pub name: String,
    pub gum: Option<GumResult>,
    pub mc: Option<MonteCarloResult>,
}


/// 50x50 grid of the joint GUM density of two functions
#[derive(Clone, Debug)]
pub struct Contour {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<Vec<f64>>,
    pub pdf: Vec<Vec<f64>>,
}


/// Results of all functions from one calculation
#[derive(Clone, Debug, Default)]
pub struct CalculationOutput {
    functions: Vec<FunctionResult>,
}
impl CalculationOutput {
    pub(crate) fn new(functions: Vec<FunctionResult>) -> Self {
        Self{functions}
    }
    pub fn len(&self) -> usize {
        self.functions.len()
    }
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }
    pub fn functions(&self) -> &[FunctionResult] {
        &self.functions
    }
    pub fn get(&self, idx: usize) -> Option<&FunctionResult> {
        self.functions.get(idx)
    }
    pub fn by_name(&self, name: &str) -> Option<&FunctionResult> {
        self.functions.iter().find(|f| f.name == name)
    }
    pub fn gum(&self, name: &str) -> Option<&GumResult> {
        self.by_name(name).and_then(|f| f.gum.as_ref())
    }
    pub fn mc(&self, name: &str) -> Option<&MonteCarloResult> {
        self.by_name(name).and_then(|f| f.mc.as_ref())
    }
    /// Result of one method for the function at `fidx`
    pub fn get_output(&self, fidx: usize, method: Method) -> Result<UncertResult<'_>> {
        let func = self.functions.get(fidx)
            .ok_or_else(|| UncertError::config(format!("No function at index {}", fidx)))?;
        let result = match method {
            Method::Gum => func.gum.as_ref().map(UncertResult::Gum),
            Method::Mc => func.mc.as_ref().map(UncertResult::Montecarlo),
        };
        result.ok_or_else(|| UncertError::config(format!("{:?} was not calculated for `{}`", method, func.name)))
    }

    // Follow a new function order without recalculating
    pub(crate) fn reorder(&mut self, names: &[String]) {
        let mut old = std::mem::take(&mut self.functions);
        for name in names {
            if let Some(i) = old.iter().position(|f| &f.name == name) {
                self.functions.push(old.remove(i));
            }
        }
        self.functions.extend(old);
    }

    /// Joint density grid of two functions from the GUM output covariance
    pub fn contour(&self, f1: &str, f2: &str) -> Result<Contour> {
        let g1 = self.gum(f1).ok_or_else(|| UncertError::config(format!("No GUM result for `{}`", f1)))?;
        let g2 = self.gum(f2).ok_or_else(|| UncertError::config(format!("No GUM result for `{}`", f2)))?;
        let comps = &g1.gum;
        let i1 = comps.funcnames.iter().position(|n| n == f1);
        let i2 = comps.funcnames.iter().position(|n| n == f2);
        let (i1, i2) = match (i1, i2) {
            (Some(i1), Some(i2)) => (i1, i2),
            _ => return Err(UncertError::config("Functions were not calculated together")),
        };
        let (s1, s2) = (g1.std_dev, g2.std_dev);
        if s1 <= 0.0 || s2 <= 0.0 {
            return Err(UncertError::config("Contour needs nonzero uncertainty in both functions"));
        }
        // Perfectly correlated outputs would make the density singular
        let limit = 1.0 - 1E-9;
        let rho = (comps.uy[[i1, i2]] / (s1 * s2)).clamp(-limit, limit);

        let xs = linspace(g1.expected - 4.0*s1, g1.expected + 4.0*s1, CONTOUR_N);
        let ys = linspace(g2.expected - 4.0*s2, g2.expected + 4.0*s2, CONTOUR_N);
        let norm = (2.0 * PI * s1 * s2 * (1.0 - rho*rho).sqrt()).recip();
        let mut x = Vec::with_capacity(CONTOUR_N);
        let mut y = Vec::with_capacity(CONTOUR_N);
        let mut pdf = Vec::with_capacity(CONTOUR_N);
        for yv in ys.iter() {
            let dy = (yv - g2.expected) / s2;
            x.push(xs.clone());
            y.push(vec![*yv; CONTOUR_N]);
            pdf.push(xs.iter().map(|xv| {
                let dx = (xv - g1.expected) / s1;
                let q = (dx*dx - 2.0*rho*dx*dy + dy*dy) / (1.0 - rho*rho);
                norm * (-q / 2.0).exp()
            }).collect());
        }
        Ok(Contour{x, y, pdf})
    }

    pub fn summary(&self, ndig: usize) -> String {
        // GUM/Monte Carlo result summary of all functions
        let mut report = String::new();

        if self.functions.iter().any(|f| f.gum.is_some()) {
            let mut builder = Builder::default();
            builder.push_record(vec![
                "Function", "Value", "Standard Uncertainty", "Expanded Uncertainty",
                "Deg. Freedom", "Coverage Factor", "Confidence"
            ]);
            for func in self.functions.iter() {
                if let Some(gum) = &func.gum {
                    builder.push_record(vec![
                        func.name.clone(),
                        format!("{1:.0$}", ndig, gum.expected),
                        format!("{1:.0$}", ndig, gum.std_dev),
                        format!("{1:.0$}", ndig, gum.expanded()),
                        format!("{:.1}", gum.degrees_freedom),
                        format!("{:.3}", gum.coverage_factor),
                        format!("{:.2} %", gum.confidence*100.0),
                    ]);
                }
            }
            let mut table = builder.build();
            table.with(Style::rounded());
            report.push_str("GUM\n\n");
            report.push_str(&table.to_string());
        }

        if self.functions.iter().any(|f| f.mc.is_some()) {
            report.push_str("\n\nMonte Carlo\n\n");
            let mut builder = Builder::default();
            builder.push_record(vec![
                "Function", "Value", "Standard Uncertainty", "Symmetric Interval",
                "Shortest Interval", "Coverage Factor", "Confidence"
            ]);
            for func in self.functions.iter() {
                if let Some(mc) = &func.mc {
                    builder.push_record(vec![
                        func.name.clone(),
                        format!("{1:.0$}", ndig, mc.expected),
                        format!("{1:.0$}", ndig, mc.std_dev),
                        format!("({1:.0$}, {2:.0$})", ndig, mc.symmetric.low, mc.symmetric.high),
                        format!("({1:.0$}, {2:.0$})", ndig, mc.shortest.low, mc.shortest.high),
                        format!("{:.3}", mc.symmetric.k),
                        format!("{:.2} %", mc.confidence*100.0),
                    ]);
                }
            }
            let mut table = builder.build();
            table.with(Style::rounded());
            report.push_str(&table.to_string());
        }
        report
    }
}
