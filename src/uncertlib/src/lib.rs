// Uncertainty Calculator Library
//
// Measurement functions of uncertain inputs are propagated two ways: the GUM
// linearized method and Monte Carlo sampling.
use std::fs;
use std::path::Path;

use tracing::{debug, info};

mod gum;
mod montecarlo;
mod stats;
mod student;
pub mod callable;
pub mod cfg;
pub mod dists;
pub mod error;
pub mod expr;
pub mod registry;
pub mod result;

pub use crate::callable::{Callable, Kwargs, NotVectorizable};
pub use crate::cfg::{ConfigFile, CorrelationCoeff, Settings, VariableConfig};
pub use crate::dists::{DistKind, UncertaintyComponent};
pub use crate::error::{Result, UncertError};
pub use crate::expr::Expr;
pub use crate::registry::{EvalTier, InputVariable, ModelFunction, Slot};
pub use crate::result::{CalculationOutput, Contour, FunctionResult, GumResult, Method, MonteCarloResult, UncertResult};

use crate::expr::{check_name, split_assignment};
use crate::registry::Registry;


/// Uncertainty calculator: functions, inputs, correlations and the last output.
///
/// Any change to the model bumps a generation counter. Output computed for an
/// older generation is refused by [`UncertCalc::output`].
#[derive(Debug, Default)]
pub struct UncertCalc {
    registry: Registry,
    settings: Settings,
    generation: u64,
    output: Option<(u64, CalculationOutput)>,
}

impl UncertCalc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculator from a list of "name = expression" strings
    pub fn from_functions(funcs: &[&str]) -> Result<Self> {
        let mut calc = Self::new();
        for f in funcs {
            calc.set_function(f, None, None)?;
        }
        Ok(calc)
    }

    /// Calculator from a TOML configuration
    pub fn from_config(config: &str) -> Result<Self> {
        let cfg = ConfigFile::load_toml(config)?;
        let mut calc = Self::new();
        for f in cfg.functions.iter() {
            calc.set_function(f, None, None)?;
        }
        for var in cfg.variable.iter() {
            calc.set_input(&var.name, var.nominal)?;
            for comp in var.uncertainty.iter() {
                calc.set_uncert(&var.name, comp.clone())?;
            }
        }
        for c in cfg.correlation.iter() {
            calc.set_correlation(&c.v1, &c.v2, c.coeff)?;
        }
        calc.set_samples(cfg.settings.samples)?;
        calc.set_confidence(cfg.settings.confidence)?;
        calc.set_seed(cfg.settings.seed)?;
        debug!("Loaded {} functions and {} variables", cfg.functions.len(), cfg.variable.len());
        Ok(calc)
    }

    pub fn from_configfile<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = fs::read_to_string(path)?;
        Self::from_config(&config)
    }

    /// Current model as a TOML configuration. Callable functions cannot be saved.
    pub fn get_config(&self) -> Result<String> {
        let mut functions = Vec::new();
        for func in self.registry.functions() {
            if func.is_callable() {
                return Err(UncertError::config(format!("Function `{}` is a callable and cannot be saved", func.name())));
            }
            functions.push(func.equation());
        }
        let variable = self.registry.variables()
            .map(|v| VariableConfig{
                name: v.name().to_string(),
                nominal: v.nominal(),
                uncertainty: v.uncerts().to_vec(),
            })
            .collect();
        let cfg = ConfigFile{
            functions,
            settings: self.settings.clone(),
            variable,
            correlation: self.registry.correlations().to_vec(),
        };
        cfg.to_toml()
    }

    pub fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.get_config()?)?;
        Ok(())
    }

    // Count a successful change to the model
    fn changed<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_ok() {
            self.generation += 1;
        }
        result
    }

    /// Add or redefine a function from an expression, optionally written as
    /// "name = expression".
    ///
    /// The name is taken from `name`, then from the expression, then from the
    /// function already at `idx`, and finally generated as f1, f2, ...
    pub fn set_function(&mut self, expr: &str, name: Option<&str>, idx: Option<usize>) -> Result<()> {
        let (lhs, rhs) = split_assignment(expr)?;
        let name = match (name, lhs) {
            (Some(n), _) => n.to_string(),
            (None, Some(n)) => n,
            (None, None) => idx
                .and_then(|i| self.registry.function_names().get(i).cloned())
                .unwrap_or_else(|| self.registry.default_name()),
        };
        check_name(&name)?;
        let func = ModelFunction::parse(&name, &rhs)?;
        let result = self.registry.declare_function(func, idx);
        self.changed(result)
    }

    /// Add or redefine a function computed by a Rust closure.
    ///
    /// `kwnames` gives the argument names, required for keyword-collection callables.
    pub fn set_callable(&mut self, callable: Callable, kwnames: Option<&[&str]>, idx: Option<usize>) -> Result<()> {
        check_name(callable.name())?;
        let bound = callable.bind(kwnames)?;
        let result = self.registry.declare_function(ModelFunction::from_callable(bound), idx);
        self.changed(result)
    }

    pub fn remove_function(&mut self, name: &str) -> Result<()> {
        let result = self.registry.remove_function(name);
        self.changed(result)
    }

    pub fn get_functionnames(&self) -> &[String] {
        self.registry.function_names()
    }

    /// Change the order functions are listed in. Results are reordered
    /// along with them and stay valid.
    pub fn reorder(&mut self, names: &[&str]) -> Result<()> {
        self.registry.reorder(names)?;
        if let Some((_, out)) = self.output.as_mut() {
            out.reorder(self.registry.function_names());
        }
        Ok(())
    }

    pub fn get_function(&self, idx: usize) -> Result<&ModelFunction> {
        self.registry.function_at(idx)
            .ok_or_else(|| UncertError::config(format!("No function at index {}", idx)))
    }

    /// Names the function at `idx` was declared with, functions included
    pub fn get_basenames(&self, idx: usize) -> Result<Vec<String>> {
        Ok(self.get_function(idx)?.basenames())
    }

    /// Expression of the function at `idx` in terms of input variables only
    pub fn get_base_expression(&self, idx: usize) -> Result<&Expr> {
        Ok(self.get_function(idx)?.base_expr())
    }

    /// Add an input variable or change its nominal value
    pub fn set_input(&mut self, name: &str, nominal: f64) -> Result<()> {
        let result = self.registry.set_input(name, nominal);
        self.changed(result)
    }

    pub fn remove_input(&mut self, name: &str) -> Result<()> {
        let result = self.registry.remove_input(name);
        self.changed(result)
    }

    /// Add an uncertainty component to an input
    pub fn set_uncert(&mut self, name: &str, comp: UncertaintyComponent) -> Result<()> {
        let result = self.registry.add_uncert(name, comp);
        self.changed(result)
    }

    pub fn update_uncert(&mut self, name: &str, idx: usize, comp: UncertaintyComponent) -> Result<()> {
        let result = self.registry.update_uncert(name, idx, comp);
        self.changed(result)
    }

    pub fn remove_uncert(&mut self, name: &str, idx: usize) -> Result<()> {
        let result = self.registry.remove_uncert(name, idx);
        self.changed(result)
    }

    pub fn clear_uncerts(&mut self, name: &str) -> Result<()> {
        let result = self.registry.clear_uncerts(name);
        self.changed(result)
    }

    /// Symbols used by the functions that are not yet declared inputs
    pub fn get_reqd_inputs(&self) -> Vec<String> {
        self.registry.required_inputs()
    }

    /// Declare every missing input with nominal 0 and zero uncertainty
    pub fn add_required_inputs(&mut self) -> Result<()> {
        let result = self.registry.add_required_inputs();
        self.changed(result)
    }

    pub fn get_input(&self, name: &str) -> Option<&Slot> {
        self.registry.get(name)
    }

    pub fn set_correlation(&mut self, v1: &str, v2: &str, coeff: f64) -> Result<()> {
        let result = self.registry.set_correlation(v1, v2, coeff);
        self.changed(result)
    }

    pub fn get_correlation(&self, v1: &str, v2: &str) -> f64 {
        self.registry.correlation(v1, v2)
    }

    pub fn get_corr_list(&self) -> &[CorrelationCoeff] {
        self.registry.correlations()
    }

    pub fn set_samples(&mut self, samples: usize) -> Result<()> {
        if samples < 1 {
            return Err(UncertError::config("Number of samples must be at least 1"));
        }
        self.settings.samples = samples;
        self.generation += 1;
        Ok(())
    }

    pub fn samples(&self) -> usize {
        self.settings.samples
    }

    /// Fixed seed for reproducible Monte Carlo, or None for fresh entropy each run.
    /// TOML integers are signed 64-bit, so larger seeds are rejected.
    pub fn set_seed(&mut self, seed: Option<u64>) -> Result<()> {
        if let Some(s) = seed {
            if s > i64::MAX as u64 {
                return Err(UncertError::config(format!("Seed {} is larger than {}", s, i64::MAX)));
            }
        }
        self.settings.seed = seed;
        self.generation += 1;
        Ok(())
    }

    pub fn seed(&self) -> Option<u64> {
        self.settings.seed
    }

    pub fn set_confidence(&mut self, conf: f64) -> Result<()> {
        if !(conf > 0.0 && conf < 1.0) {
            return Err(UncertError::config(format!("Confidence {} must be between 0 and 1", conf)));
        }
        self.settings.confidence = conf;
        self.generation += 1;
        Ok(())
    }

    pub fn confidence(&self) -> f64 {
        self.settings.confidence
    }

    // Run Monte Carlo and cache the evaluation tiers it settled
    fn run_mc(&mut self) -> Result<Vec<MonteCarloResult>> {
        let mc = montecarlo::calculate(&self.registry, self.settings.samples, self.settings.seed, self.settings.confidence)?;
        for (name, tier) in mc.tiers.iter() {
            debug!("{} evaluates as {:?}", name, tier);
            self.registry.set_tier(name, *tier);
        }
        Ok(mc.results)
    }

    fn store(&mut self, gum: Option<Vec<GumResult>>, mc: Option<Vec<MonteCarloResult>>) -> Result<&CalculationOutput> {
        let mut gum = gum.map(|g| g.into_iter());
        let mut mc = mc.map(|m| m.into_iter());
        let functions = self.registry.function_names().iter()
            .map(|name| FunctionResult{
                name: name.clone(),
                gum: gum.as_mut().and_then(|g| g.next()),
                mc: mc.as_mut().and_then(|m| m.next()),
            })
            .collect();
        self.output = Some((self.generation, CalculationOutput::new(functions)));
        self.output()
    }

    /// Calculate both GUM and Monte Carlo. On failure the previous output is kept.
    pub fn calculate(&mut self) -> Result<&CalculationOutput> {
        let gum = gum::calculate(&self.registry, self.settings.confidence)?;
        let mc = self.run_mc()?;
        info!("Calculated GUM and Monte Carlo for {} functions", gum.len());
        self.store(Some(gum), Some(mc))
    }

    pub fn calculate_gum(&mut self) -> Result<&CalculationOutput> {
        let gum = gum::calculate(&self.registry, self.settings.confidence)?;
        self.store(Some(gum), None)
    }

    pub fn calculate_mc(&mut self) -> Result<&CalculationOutput> {
        let mc = self.run_mc()?;
        self.store(None, Some(mc))
    }

    /// Output of the last calculation, if nothing changed since
    pub fn output(&self) -> Result<&CalculationOutput> {
        match &self.output {
            Some((generation, out)) if *generation == self.generation => Ok(out),
            _ => Err(UncertError::StaleOutput),
        }
    }

    /// Joint GUM density of two functions on a 50x50 grid
    pub fn get_contour(&self, f1: &str, f2: &str) -> Result<Contour> {
        self.output()?.contour(f1, f2)
    }
}
