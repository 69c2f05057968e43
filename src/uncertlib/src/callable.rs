// Opaque model functions supplied as Rust closures
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::error::{Result, UncertError};
use crate::expr::check_name;


/// Keyword arguments handed to a keyword-bag callable
pub type Kwargs = HashMap<String, f64>;

type PositionalFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;
type KeywordFn = Box<dyn Fn(&Kwargs) -> f64 + Send + Sync>;
type BatchFn = Box<dyn Fn(&[&[f64]]) -> std::result::Result<Vec<f64>, NotVectorizable> + Send + Sync>;


/// Raised by a batch closure that cannot operate on whole sample arrays
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("function cannot be evaluated on sample arrays")]
pub struct NotVectorizable;


/// How a callable receives its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// Named parameters, in order
    Named(Vec<String>),
    /// Any keyword collection; names must be supplied at declaration
    KeywordBag,
}

enum ScalarFn {
    Positional(PositionalFn),
    Keywords(KeywordFn),
}


/// A user function with named inputs.
///
/// The scalar closure is always required. A batch closure may be attached with
/// [`Callable::vectorized`]; it receives one slice per argument and returns the
/// whole output array, or [`NotVectorizable`] to request per-sample evaluation.
pub struct Callable {
    name: String,
    signature: Signature,
    scalar: ScalarFn,
    batch: Option<BatchFn>,
}
impl Callable {
    pub fn new<F>(name: &str, args: &[&str], f: F) -> Self
    where F: Fn(&[f64]) -> f64 + Send + Sync + 'static {
        Self{
            name: name.to_string(),
            signature: Signature::Named(args.iter().map(|s| s.to_string()).collect()),
            scalar: ScalarFn::Positional(Box::new(f)),
            batch: None,
        }
    }
    pub fn with_kwargs<F>(name: &str, f: F) -> Self
    where F: Fn(&Kwargs) -> f64 + Send + Sync + 'static {
        Self{
            name: name.to_string(),
            signature: Signature::KeywordBag,
            scalar: ScalarFn::Keywords(Box::new(f)),
            batch: None,
        }
    }
    pub fn vectorized<F>(mut self, f: F) -> Self
    where F: Fn(&[&[f64]]) -> std::result::Result<Vec<f64>, NotVectorizable> + Send + Sync + 'static {
        self.batch = Some(Box::new(f));
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
    pub fn bind(self, kwnames: Option<&[&str]>) -> Result<BoundCallable> {
        // Resolve the argument names used as free symbols
        let argnames: Vec<String> = match (&self.signature, kwnames) {
            (Signature::KeywordBag, None) => {
                return Err(UncertError::config(format!(
                    "function `{}` takes a keyword collection, argument names must be given", self.name)));
            },
            (Signature::KeywordBag, Some(names)) => names.iter().map(|s| s.to_string()).collect(),
            (Signature::Named(args), None) => args.clone(),
            (Signature::Named(args), Some(names)) => {
                if names.len() != args.len() {
                    return Err(UncertError::config(format!(
                        "function `{}` takes {} arguments, {} names given", self.name, args.len(), names.len())));
                }
                names.iter().map(|s| s.to_string()).collect()
            },
        };
        for arg in argnames.iter() {
            check_name(arg).map_err(|e| UncertError::config(format!("function `{}`: {}", self.name, e)))?;
        }
        Ok(BoundCallable{callable: self, argnames})
    }
}
impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("vectorized", &self.batch.is_some())
            .finish()
    }
}


/// Callable with resolved argument names, as stored in expression trees
#[derive(Debug)]
pub struct BoundCallable {
    callable: Callable,
    argnames: Vec<String>,
}
impl BoundCallable {
    pub fn name(&self) -> &str {
        &self.callable.name
    }
    pub fn argnames(&self) -> &[String] {
        &self.argnames
    }
    pub fn has_batch(&self) -> bool {
        self.callable.batch.is_some()
    }
    pub fn call(&self, args: &[f64]) -> f64 {
        match &self.callable.scalar {
            ScalarFn::Positional(f) => f(args),
            ScalarFn::Keywords(f) => {
                let kwargs: Kwargs = self.argnames.iter().cloned().zip(args.iter().copied()).collect();
                f(&kwargs)
            },
        }
    }
    /// Evaluate `n` samples at once. Output of any other length counts as not vectorizable.
    pub fn call_batch(&self, args: &[&[f64]], n: usize) -> std::result::Result<Vec<f64>, NotVectorizable> {
        let f = self.callable.batch.as_ref().ok_or(NotVectorizable)?;
        let out = f(args)?;
        if out.len() != n {
            return Err(NotVectorizable);
        }
        Ok(out)
    }
}


/// Central-difference step for a variable at `x`
pub fn fd_step(x: f64) -> f64 {
    if x != 0.0 && x.is_finite() {
        x.abs() * 1E-6
    } else {
        1E-6
    }
}
