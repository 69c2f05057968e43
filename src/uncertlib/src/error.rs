// Error taxonomy for the uncertainty calculator
use thiserror::Error;


#[derive(Debug, Error)]
pub enum UncertError {
    /// Malformed declaration: bad distribution parameters, sample count,
    /// keyword-bag callable without argument names, etc.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A symbol in a function's base expression has no declared nominal value
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    /// Function substitution did not terminate
    #[error("circular dependency in function `{0}`")]
    CircularDependency(String),

    #[error("cannot parse `{expr}`: {msg}")]
    Parse { expr: String, msg: String },

    /// Results were requested after the model changed
    #[error("calculation output is out of date, recalculate first")]
    StaleOutput,

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UncertError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        UncertError::Configuration(msg.into())
    }
    pub(crate) fn parse(expr: &str, msg: impl Into<String>) -> Self {
        UncertError::Parse{expr: expr.to_string(), msg: msg.into()}
    }
}

pub type Result<T> = std::result::Result<T, UncertError>;
