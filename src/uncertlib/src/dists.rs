// Probability distributions of uncertainty components
use std::collections::BTreeMap;
use std::fmt;
use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use mathru::special::gamma::gamma;
use mathru::statistics::distrib::{Continuous, Gamma};

use crate::error::{Result, UncertError};
use crate::student::{norminv, t_inv2t};


fn default_infinity() -> f64 {
    f64::INFINITY
}


#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DistKind {
    Normal,
    T,
    Uniform,
    Triangular,
    Arcsine,
    Gamma,
    Lognormal,
    Exponential,
    Burr,
}
impl DistKind {
    pub fn name(&self) -> &'static str {
        match self {
            DistKind::Normal => "normal",
            DistKind::T => "t",
            DistKind::Uniform => "uniform",
            DistKind::Triangular => "triangular",
            DistKind::Arcsine => "arcsine",
            DistKind::Gamma => "gamma",
            DistKind::Lognormal => "lognormal",
            DistKind::Exponential => "exponential",
            DistKind::Burr => "burr",
        }
    }
    /// Shape parameters with their default values
    fn shape_params(&self) -> &'static [(&'static str, f64)] {
        match self {
            DistKind::T => &[("df", 10.0)],
            DistKind::Gamma => &[("a", 1.0)],
            DistKind::Lognormal => &[("s", 0.5)],
            DistKind::Burr => &[("c", 4.0), ("d", 1.0)],
            _ => &[],
        }
    }
    /// Name of the native width parameter
    fn spread_param(&self) -> &'static str {
        match self {
            DistKind::Normal => "std",
            DistKind::Uniform | DistKind::Triangular | DistKind::Arcsine => "a",
            _ => "scale",
        }
    }
}
impl fmt::Display for DistKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
impl FromStr for DistKind {
    type Err = UncertError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(DistKind::Normal),
            "t" => Ok(DistKind::T),
            "uniform" => Ok(DistKind::Uniform),
            "triangular" => Ok(DistKind::Triangular),
            "arcsine" => Ok(DistKind::Arcsine),
            "gamma" => Ok(DistKind::Gamma),
            "lognormal" => Ok(DistKind::Lognormal),
            "exponential" => Ok(DistKind::Exponential),
            "burr" => Ok(DistKind::Burr),
            _ => Err(UncertError::config(format!("Unknown distribution `{}`", s))),
        }
    }
}


/// One uncertainty component of an input variable.
///
/// Components are zero-centered: samples are offsets added to the variable's
/// nominal value. The width may be given by the native parameter of the
/// distribution or by `std` (and `unc` with coverage factor `k` for normal).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UncertaintyComponent {
    dist: DistKind,
    #[serde(default)]
    params: BTreeMap<String, f64>,
    #[serde(default = "default_infinity")]
    degf: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}
impl UncertaintyComponent {
    pub fn new(dist: DistKind, params: &[(&str, f64)]) -> Result<Self> {
        let mut comp = Self{
            dist,
            params: params.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            degf: f64::INFINITY,
            name: None,
        };
        comp.check_args()?;
        Ok(comp)
    }
    pub fn normal(std: f64) -> Result<Self> {
        Self::new(DistKind::Normal, &[("std", std)])
    }
    pub fn with_degf(mut self, degf: f64) -> Result<Self> {
        self.degf = degf;
        self.check_args()?;
        Ok(self)
    }
    pub fn dist(&self) -> DistKind {
        self.dist
    }
    pub fn params(&self) -> &BTreeMap<String, f64> {
        &self.params
    }
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }
    pub fn degf(&self) -> f64 {
        self.degf
    }
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parameters needed to define the distribution
    pub fn required_args(&self) -> Vec<&'static str> {
        let mut args: Vec<&'static str> = self.dist.shape_params().iter().map(|(n, _)| *n).collect();
        args.push(self.dist.spread_param());
        args
    }

    /// Validate parameters and fill in defaults for omitted shape parameters
    pub fn check_args(&mut self) -> Result<()> {
        let dist = self.dist;
        for (name, default) in dist.shape_params() {
            self.params.entry(name.to_string()).or_insert(*default);
        }
        let mut allowed = self.required_args();
        allowed.push("std");
        if dist == DistKind::Normal {
            allowed.extend(["unc", "k"]);
        }
        for (name, value) in self.params.iter() {
            if !allowed.contains(&name.as_str()) {
                return Err(UncertError::config(format!("Unknown parameter `{}` for {} distribution", name, dist)));
            }
            if !value.is_finite() {
                return Err(UncertError::config(format!("Parameter `{}` must be finite", name)));
            }
        }
        for (name, _) in dist.shape_params() {
            if self.params[*name] <= 0.0 {
                return Err(UncertError::config(format!("{} distribution `{}` must be positive", dist, name)));
            }
        }
        match dist {
            DistKind::T if self.params["df"] <= 2.0 => {
                return Err(UncertError::config("t distribution `df` must be greater than 2"));
            },
            DistKind::Burr if self.params["c"] <= 2.0 => {
                return Err(UncertError::config("burr distribution `c` must be greater than 2"));
            },
            _ => {},
        }

        let native = dist.spread_param();
        let spread = if self.params.contains_key(native) {
            native
        } else if self.params.contains_key("std") {
            "std"
        } else if dist == DistKind::Normal && self.params.contains_key("unc") {
            if self.param("k").map_or(false, |k| k <= 0.0) {
                return Err(UncertError::config("Coverage factor `k` must be positive"));
            }
            "unc"
        } else {
            return Err(UncertError::config(format!("{} distribution requires `{}` or `std`", dist, native)));
        };
        if self.params[spread] < 0.0 {
            return Err(UncertError::config(format!("Parameter `{}` must not be negative", spread)));
        }
        if self.degf.is_nan() || self.degf <= 0.0 {
            return Err(UncertError::config("Degrees of freedom must be positive"));
        }
        Ok(())
    }

    // Standard deviation of the distribution with unit native spread
    fn std_per_spread(&self) -> f64 {
        match self.dist {
            DistKind::Normal | DistKind::Exponential => 1.0,
            DistKind::T => {
                let df = self.params["df"];
                (df / (df - 2.0)).sqrt()
            },
            DistKind::Uniform => 3f64.sqrt().recip(),
            DistKind::Triangular => 6f64.sqrt().recip(),
            DistKind::Arcsine => 2f64.sqrt().recip(),
            DistKind::Gamma => self.params["a"].sqrt(),
            DistKind::Lognormal => {
                let s2 = self.params["s"].powi(2);
                ((s2.exp() - 1.0) * s2.exp()).sqrt()
            },
            DistKind::Burr => {
                let m1 = self.burr_moment(1.0);
                (self.burr_moment(2.0) - m1 * m1).sqrt()
            },
        }
    }

    // Raw moment of the unit-scale Burr type III distribution
    fn burr_moment(&self, k: f64) -> f64 {
        let c = self.params["c"];
        let d = self.params["d"];
        let (p, q) = (d + k / c, 1.0 - k / c);
        d * gamma(p) * gamma(q) / gamma(p + q)
    }

    /// Value of the native width parameter
    pub fn spread(&self) -> f64 {
        let native = self.dist.spread_param();
        if let Some(v) = self.param(native) {
            v
        } else if let Some(std) = self.param("std") {
            std / self.std_per_spread()
        } else {
            // Normal given as expanded uncertainty
            self.param("unc").unwrap_or(0.0) / self.param("k").unwrap_or(2.0)
        }
    }

    pub fn std_dev(&self) -> f64 {
        match self.dist {
            DistKind::Normal => self.spread(),
            _ => self.spread() * self.std_per_spread(),
        }
    }
    pub fn variance(&self) -> f64 {
        self.std_dev().powi(2)
    }

    /// Centered inverse cumulative distribution
    pub fn ppf(&self, u: f64) -> f64 {
        let scale = self.spread();
        if scale == 0.0 {
            return 0.0;
        }
        match self.dist {
            DistKind::Normal => scale * norminv(u).unwrap_or(f64::NAN),
            DistKind::T => {
                let df = self.params["df"];
                let q = t_inv2t((2.0 * u - 1.0).abs(), df).unwrap_or(f64::NAN);
                (u - 0.5).signum() * q * scale
            },
            DistKind::Uniform => scale * (2.0 * u - 1.0),
            DistKind::Triangular => {
                if u < 0.5 {
                    scale * ((2.0 * u).sqrt() - 1.0)
                } else {
                    scale * (1.0 - (2.0 * (1.0 - u)).sqrt())
                }
            },
            DistKind::Arcsine => scale * (PI * (u - 0.5)).sin(),
            DistKind::Gamma => {
                let a = self.params["a"];
                Gamma::new(a, scale.recip()).quantile(u) - a * scale
            },
            DistKind::Lognormal => {
                let s = self.params["s"];
                scale * ((s * norminv(u).unwrap_or(f64::NAN)).exp() - (s * s / 2.0).exp())
            },
            DistKind::Exponential => -scale * (1.0 - u).ln() - scale,
            DistKind::Burr => {
                let c = self.params["c"];
                let d = self.params["d"];
                scale * ((u.powf(-d.recip()) - 1.0).powf(-c.recip()) - self.burr_moment(1.0))
            },
        }
    }
}
impl fmt::Display for UncertaintyComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}({})", self.dist, params.join(", "))
    }
}


pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    // Vector of evenly spaced values
    let mut out: Vec<f64> = Vec::with_capacity(n);
    let step = (stop - start) / (n as f64 - 1.0);
    for i in 0..n {
        out.push(start + i as f64 * step);
    }
    out
}
