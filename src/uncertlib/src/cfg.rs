// TOML configuration, serializable
use serde::{Serialize, Deserialize};

use crate::dists::UncertaintyComponent;
use crate::error::Result;

// serde default functions
fn default_095() -> f64 { 0.95 }
fn default_samples() -> usize { 1_000_000 }


// Pairwise correlation between two input variables
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CorrelationCoeff {
    pub v1: String,
    pub v2: String,
    pub coeff: f64
}


// Calculation settings
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Settings {
    #[serde(default = "default_095")]
    pub confidence: f64,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}
impl Default for Settings {
    fn default() -> Self {
        Settings{confidence: 0.95, samples: 1_000_000, seed: None}
    }
}


// One input variable with its uncertainty components
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct VariableConfig {
    pub name: String,
    pub nominal: f64,
    #[serde(default)]
    pub uncertainty: Vec<UncertaintyComponent>,  // singular naming makes the TOML nicer
}


// Whole calculator configuration
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct ConfigFile {
    // "name = expression"
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub variable: Vec<VariableConfig>,
    #[serde(default)]
    pub correlation: Vec<CorrelationCoeff>,
}
impl ConfigFile {
    pub fn load_toml(config: &str) -> Result<ConfigFile> {
        Ok(toml::from_str::<ConfigFile>(config)?)
    }
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}
