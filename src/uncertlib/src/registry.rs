// Name registry of input variables and model functions
use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::callable::BoundCallable;
use crate::cfg::CorrelationCoeff;
use crate::dists::UncertaintyComponent;
use crate::error::{Result, UncertError};
use crate::expr::Expr;


/// Measured input quantity
#[derive(Clone, Debug, PartialEq)]
pub struct InputVariable {
    name: String,
    nominal: f64,
    uncerts: Vec<UncertaintyComponent>,
}
impl InputVariable {
    pub fn new(name: &str, nominal: f64) -> Self {
        Self{name: name.to_string(), nominal, uncerts: Vec::new()}
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn nominal(&self) -> f64 {
        self.nominal
    }
    pub fn uncerts(&self) -> &[UncertaintyComponent] {
        &self.uncerts
    }
    /// Combined variance of all components
    pub fn variance(&self) -> f64 {
        self.uncerts.iter().map(|u| u.variance()).sum()
    }
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
    /// Welch-Satterthwaite degrees of freedom over the components
    pub fn degrees_freedom(&self) -> f64 {
        let denom: f64 = self.uncerts.iter()
            .filter(|u| u.degf().is_finite())
            .map(|u| u.variance().powi(2) / u.degf())
            .sum();
        if denom == 0.0 {
            f64::INFINITY
        } else {
            self.variance().powi(2) / denom
        }
    }
}


/// How Monte Carlo samples are pushed through a function
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalTier {
    /// Whole sample arrays at once
    Vectorized,
    /// One sample at a time
    Elementwise,
    /// Try arrays on the next run and remember the outcome
    Probe,
}


/// Model function as declared, with its expression in base variables
#[derive(Clone, Debug)]
pub struct ModelFunction {
    name: String,
    source: Option<String>,
    expr: Expr,
    base: Expr,
    tier: EvalTier,
}
impl ModelFunction {
    pub fn parse(name: &str, src: &str) -> Result<Self> {
        let expr = Expr::parse(src)?;
        Ok(Self{
            name: name.to_string(),
            source: Some(src.to_string()),
            base: expr.clone(),
            expr,
            tier: EvalTier::Vectorized,
        })
    }
    pub fn from_callable(callable: BoundCallable) -> Self {
        let name = callable.name().to_string();
        let expr = Expr::call(callable);
        Self{name, source: None, base: expr.clone(), expr, tier: EvalTier::Probe}
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Expression text as entered, None for callables
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
    pub fn is_callable(&self) -> bool {
        self.source.is_none()
    }
    /// Declared expression, may reference other functions
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
    /// Expression with all functions substituted out
    pub fn base_expr(&self) -> &Expr {
        &self.base
    }
    /// Names the declared expression depends on
    pub fn basenames(&self) -> Vec<String> {
        self.expr.free_symbols()
    }
    pub fn tier(&self) -> EvalTier {
        self.tier
    }
    /// "name = expression"
    pub fn equation(&self) -> String {
        match &self.source {
            Some(src) => format!("{} = {}", self.name, src),
            None => format!("{} = {}", self.name, self.expr),
        }
    }
}


/// One registered name
#[derive(Clone, Debug)]
pub enum Slot {
    Variable(InputVariable),
    Function(ModelFunction),
}


/// Variables and functions by name. A name is either one or the other.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    slots: IndexMap<String, Slot>,
    order: Vec<String>,
    correlations: Vec<CorrelationCoeff>,
}
impl Registry {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }
    pub fn function_names(&self) -> &[String] {
        &self.order
    }
    pub fn functions(&self) -> impl Iterator<Item = &ModelFunction> {
        self.order.iter().filter_map(|name| self.function(name))
    }
    pub fn function(&self, name: &str) -> Option<&ModelFunction> {
        match self.slots.get(name) {
            Some(Slot::Function(f)) => Some(f),
            _ => None,
        }
    }
    pub fn function_at(&self, idx: usize) -> Option<&ModelFunction> {
        self.order.get(idx).and_then(|name| self.function(name))
    }
    pub fn variable(&self, name: &str) -> Option<&InputVariable> {
        match self.slots.get(name) {
            Some(Slot::Variable(v)) => Some(v),
            _ => None,
        }
    }
    fn variable_mut(&mut self, name: &str) -> Result<&mut InputVariable> {
        match self.slots.get_mut(name) {
            Some(Slot::Variable(v)) => Ok(v),
            Some(Slot::Function(_)) => Err(UncertError::config(format!("`{}` is a function, not an input", name))),
            None => Err(UncertError::config(format!("`{}` is not a declared input", name))),
        }
    }
    /// Declared variables in declaration order
    pub fn variables(&self) -> impl Iterator<Item = &InputVariable> {
        self.slots.values().filter_map(|s| match s {
            Slot::Variable(v) => Some(v),
            _ => None,
        })
    }

    /// First unused name of the form f1, f2, ...
    pub fn default_name(&self) -> String {
        (1..).map(|i| format!("f{}", i))
            .find(|name| !self.slots.contains_key(name))
            .unwrap_or_default()
    }

    /// Add or redefine a function.
    ///
    /// With `idx`, the function at that position is replaced, even when the new
    /// function has a different name. A variable with the same name becomes a
    /// function and loses its uncertainties and correlations. The change is
    /// made on a copy and only kept if substitution succeeds.
    pub fn declare_function(&mut self, func: ModelFunction, idx: Option<usize>) -> Result<()> {
        let mut tentative = self.clone();
        let name = func.name().to_string();

        let replaced = idx.and_then(|i| tentative.order.get(i).cloned().map(|old| (i, old)));
        match replaced {
            Some((i, old)) => {
                if old != name {
                    if tentative.function(&name).is_some() {
                        return Err(UncertError::config(format!("Function `{}` is already defined", name)));
                    }
                    tentative.slots.shift_remove(&old);
                    tentative.order[i] = name.clone();
                }
            },
            None => {
                if tentative.function(&name).is_none() {
                    tentative.order.push(name.clone());
                }
            },
        }
        if tentative.variable(&name).is_some() {
            debug!("`{}` changes from variable to function", name);
            tentative.correlations.retain(|c| c.v1 != name && c.v2 != name);
        }
        // insert keeps the position of an existing key
        tentative.slots.insert(name, Slot::Function(func));
        tentative.substitute()?;
        *self = tentative;
        Ok(())
    }

    pub fn remove_function(&mut self, name: &str) -> Result<()> {
        if self.function(name).is_none() {
            return Err(UncertError::config(format!("No function named `{}`", name)));
        }
        self.slots.shift_remove(name);
        self.order.retain(|n| n != name);
        self.substitute()
    }

    /// Change presentation order of the functions
    pub fn reorder(&mut self, names: &[&str]) -> Result<()> {
        let mut sorted_new: Vec<&str> = names.to_vec();
        let mut sorted_old: Vec<&str> = self.order.iter().map(|s| s.as_str()).collect();
        sorted_new.sort_unstable();
        sorted_old.sort_unstable();
        if sorted_new != sorted_old {
            return Err(UncertError::config("New order must list every function exactly once"));
        }
        self.order = names.iter().map(|s| s.to_string()).collect();
        Ok(())
    }

    /// Add a variable or change its nominal value
    pub fn set_input(&mut self, name: &str, nominal: f64) -> Result<()> {
        crate::expr::check_name(name)?;
        match self.slots.get_mut(name) {
            Some(Slot::Variable(v)) => v.nominal = nominal,
            Some(Slot::Function(_)) => {
                return Err(UncertError::config(format!("`{}` is a function, not an input", name)));
            },
            None => { self.slots.insert(name.to_string(), Slot::Variable(InputVariable::new(name, nominal))); },
        }
        Ok(())
    }

    pub fn remove_input(&mut self, name: &str) -> Result<()> {
        self.variable_mut(name)?;
        self.slots.shift_remove(name);
        self.correlations.retain(|c| c.v1 != name && c.v2 != name);
        Ok(())
    }

    pub fn add_uncert(&mut self, name: &str, mut comp: UncertaintyComponent) -> Result<()> {
        comp.check_args()?;
        self.variable_mut(name)?.uncerts.push(comp);
        Ok(())
    }

    pub fn update_uncert(&mut self, name: &str, idx: usize, mut comp: UncertaintyComponent) -> Result<()> {
        comp.check_args()?;
        let var = self.variable_mut(name)?;
        match var.uncerts.get_mut(idx) {
            Some(u) => *u = comp,
            None => return Err(UncertError::config(format!("`{}` has no uncertainty component {}", name, idx))),
        }
        Ok(())
    }

    pub fn remove_uncert(&mut self, name: &str, idx: usize) -> Result<()> {
        let var = self.variable_mut(name)?;
        if idx >= var.uncerts.len() {
            return Err(UncertError::config(format!("`{}` has no uncertainty component {}", name, idx)));
        }
        var.uncerts.remove(idx);
        Ok(())
    }

    pub fn clear_uncerts(&mut self, name: &str) -> Result<()> {
        self.variable_mut(name)?.uncerts.clear();
        Ok(())
    }

    pub fn set_correlation(&mut self, v1: &str, v2: &str, coeff: f64) -> Result<()> {
        if v1 == v2 {
            return Err(UncertError::config("A variable cannot be correlated with itself"));
        }
        if !coeff.is_finite() || coeff.abs() > 1.0 {
            return Err(UncertError::config(format!("Correlation coefficient {} outside [-1, 1]", coeff)));
        }
        for v in [v1, v2] {
            if self.variable(v).is_none() {
                return Err(UncertError::config(format!("`{}` is not a declared input", v)));
            }
        }
        let existing = self.correlations.iter_mut()
            .find(|c| (c.v1 == v1 && c.v2 == v2) || (c.v1 == v2 && c.v2 == v1));
        match existing {
            Some(c) => c.coeff = coeff,
            None => self.correlations.push(CorrelationCoeff{v1: v1.to_string(), v2: v2.to_string(), coeff}),
        }
        Ok(())
    }

    pub fn correlation(&self, v1: &str, v2: &str) -> f64 {
        if v1 == v2 {
            return 1.0;
        }
        self.correlations.iter()
            .find(|c| (c.v1 == v1 && c.v2 == v2) || (c.v1 == v2 && c.v2 == v1))
            .map_or(0.0, |c| c.coeff)
    }

    pub fn correlations(&self) -> &[CorrelationCoeff] {
        &self.correlations
    }

    /// Recompute every function's base expression.
    ///
    /// Each pass replaces function names by their declared expressions. More
    /// passes than there are functions means the definitions are cyclic.
    pub fn substitute(&mut self) -> Result<()> {
        let nfuncs = self.order.len();
        let exprs: HashMap<String, Expr> = self.functions()
            .map(|f| (f.name.clone(), f.expr.clone()))
            .collect();

        let mut bases: Vec<(String, Expr)> = Vec::with_capacity(nfuncs);
        for func in self.functions() {
            let mut base = func.expr.clone();
            let mut passes = 0;
            loop {
                let pending: HashMap<String, Expr> = base.free_symbols().into_iter()
                    .filter_map(|s| exprs.get(&s).map(|e| (s, e.clone())))
                    .collect();
                if pending.is_empty() {
                    break;
                }
                if passes == nfuncs {
                    return Err(UncertError::CircularDependency(func.name.clone()));
                }
                base = base.substitute(&pending);
                passes += 1;
            }
            debug!("{}: {} substitution passes", func.name, passes);
            bases.push((func.name.clone(), base));
        }

        for (name, base) in bases {
            if let Some(Slot::Function(f)) = self.slots.get_mut(&name) {
                // Keep a resolved evaluation tier while the base expression is unchanged
                if f.base != base || f.tier == EvalTier::Probe {
                    f.tier = if !base.has_callables() {
                        EvalTier::Vectorized
                    } else if base.callables_vectorized() {
                        EvalTier::Probe
                    } else {
                        EvalTier::Elementwise
                    };
                }
                f.base = base;
            }
        }
        Ok(())
    }

    /// Record the outcome of a vectorization probe
    pub fn set_tier(&mut self, name: &str, tier: EvalTier) {
        if let Some(Slot::Function(f)) = self.slots.get_mut(name) {
            f.tier = tier;
        }
    }

    /// Base symbols of all functions in order of first appearance
    fn base_symbols(&self) -> IndexSet<String> {
        self.functions().flat_map(|f| f.base.free_symbols()).collect()
    }

    /// Symbols the functions need that are not declared inputs
    pub fn required_inputs(&self) -> Vec<String> {
        self.base_symbols().into_iter()
            .filter(|s| self.variable(s).is_none())
            .collect()
    }

    /// Declare missing inputs with nominal 0 and zero normal uncertainty
    pub fn add_required_inputs(&mut self) -> Result<()> {
        for name in self.required_inputs() {
            self.set_input(&name, 0.0)?;
            self.add_uncert(&name, UncertaintyComponent::normal(0.0)?)?;
        }
        Ok(())
    }

    /// Inputs used by any function, in declaration order.
    /// Fails on the first undeclared symbol.
    pub fn used_variables(&self) -> Result<Vec<&InputVariable>> {
        let symbols = self.base_symbols();
        if let Some(missing) = symbols.iter().find(|s| self.variable(s).is_none()) {
            return Err(UncertError::UndefinedVariable(missing.clone()));
        }
        Ok(self.variables().filter(|v| symbols.contains(v.name())).collect())
    }
}
