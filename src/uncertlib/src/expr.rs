// Symbolic expression trees
//
// Expressions are immutable. Substitution and differentiation build new trees.
// Named functions are only recognized with call syntax, so `gamma/2` has the
// free symbol `gamma` while `gamma(x)` calls the gamma function.
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use lazy_static::lazy_static;

use crate::callable::{fd_step, BoundCallable, NotVectorizable};
use crate::error::{Result, UncertError};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Log,
    Log10,
    Sqrt,
    Abs,
    Gamma,
    /// Sign of the argument, zero at zero. Only produced by differentiating `abs`.
    Sign,
}
impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Asin => "asin",
            Builtin::Acos => "acos",
            Builtin::Atan => "atan",
            Builtin::Atan2 => "atan2",
            Builtin::Sinh => "sinh",
            Builtin::Cosh => "cosh",
            Builtin::Tanh => "tanh",
            Builtin::Exp => "exp",
            Builtin::Log => "log",
            Builtin::Log10 => "log10",
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::Gamma => "gamma",
            Builtin::Sign => "sign",
        }
    }
    fn arity(&self) -> usize {
        match self {
            Builtin::Atan2 => 2,
            _ => 1,
        }
    }
    fn apply(&self, args: &[f64]) -> f64 {
        let x = args[0];
        match self {
            Builtin::Sin => x.sin(),
            Builtin::Cos => x.cos(),
            Builtin::Tan => x.tan(),
            Builtin::Asin => x.asin(),
            Builtin::Acos => x.acos(),
            Builtin::Atan => x.atan(),
            Builtin::Atan2 => x.atan2(args[1]),
            Builtin::Sinh => x.sinh(),
            Builtin::Cosh => x.cosh(),
            Builtin::Tanh => x.tanh(),
            Builtin::Exp => x.exp(),
            Builtin::Log => x.ln(),
            Builtin::Log10 => x.log10(),
            Builtin::Sqrt => x.sqrt(),
            Builtin::Abs => x.abs(),
            Builtin::Gamma => mathru::special::gamma::gamma(x),
            Builtin::Sign => if x == 0.0 { 0.0 } else { x.signum() },
        }
    }
}


// Reserved words. Anything else is a free symbol (an input variable or another function).
lazy_static! {
    static ref FUNCTIONS: HashMap<&'static str, Builtin> = {
        let mut m = HashMap::new();
        for f in [Builtin::Sin, Builtin::Cos, Builtin::Tan, Builtin::Asin, Builtin::Acos,
                  Builtin::Atan, Builtin::Atan2, Builtin::Sinh, Builtin::Cosh, Builtin::Tanh,
                  Builtin::Exp, Builtin::Log, Builtin::Log10, Builtin::Sqrt, Builtin::Abs,
                  Builtin::Gamma] {
            m.insert(f.name(), f);
        }
        m.insert("ln", Builtin::Log);
        m
    };
    static ref CONSTANTS: HashMap<&'static str, f64> = {
        let mut m = HashMap::new();
        m.insert("pi", PI);
        m.insert("π", PI);
        m
    };
}


#[derive(Clone, Debug)]
pub enum Expr {
    Num(f64),
    Const(&'static str, f64),
    Sym(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Func(Builtin, Vec<Expr>),
    Call(Arc<BoundCallable>, Vec<Expr>),
    /// Derivative of the inner expression by central difference
    NumDiff(Box<Expr>, String),
}

impl PartialEq for Expr {
    fn eq(&self, other: &Expr) -> bool {
        use Expr::*;
        match (self, other) {
            (Num(a), Num(b)) => a == b,
            (Const(a, _), Const(b, _)) => a == b,
            (Sym(a), Sym(b)) => a == b,
            (Neg(a), Neg(b)) => a == b,
            (Add(a1, a2), Add(b1, b2))
            | (Sub(a1, a2), Sub(b1, b2))
            | (Mul(a1, a2), Mul(b1, b2))
            | (Div(a1, a2), Div(b1, b2))
            | (Pow(a1, a2), Pow(b1, b2)) => a1 == b1 && a2 == b2,
            (Func(f, a), Func(g, b)) => f == g && a == b,
            (Call(f, a), Call(g, b)) => Arc::ptr_eq(f, g) && a == b,
            (NumDiff(a, v), NumDiff(b, w)) => a == b && v == w,
            _ => false,
        }
    }
}


// Simplifying constructors used by differentiation
fn num(v: f64) -> Expr {
    Expr::Num(v)
}
fn neg(a: Expr) -> Expr {
    match a {
        Expr::Num(v) => num(-v),
        Expr::Neg(inner) => *inner,
        _ => Expr::Neg(Box::new(a)),
    }
}
fn add(a: Expr, b: Expr) -> Expr {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => num(x + y),
        (Some(x), _) if x == 0.0 => b,
        (_, Some(y)) if y == 0.0 => a,
        _ => Expr::Add(Box::new(a), Box::new(b)),
    }
}
fn sub(a: Expr, b: Expr) -> Expr {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => num(x - y),
        (Some(x), _) if x == 0.0 => neg(b),
        (_, Some(y)) if y == 0.0 => a,
        _ => Expr::Sub(Box::new(a), Box::new(b)),
    }
}
fn mul(a: Expr, b: Expr) -> Expr {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => num(x * y),
        (Some(x), _) | (_, Some(x)) if x == 0.0 => num(0.0),
        (Some(x), _) if x == 1.0 => b,
        (_, Some(y)) if y == 1.0 => a,
        (Some(x), _) if x == -1.0 => neg(b),
        (_, Some(y)) if y == -1.0 => neg(a),
        _ => Expr::Mul(Box::new(a), Box::new(b)),
    }
}
fn div(a: Expr, b: Expr) -> Expr {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) if y != 0.0 => num(x / y),
        (Some(x), _) if x == 0.0 => num(0.0),
        (_, Some(y)) if y == 1.0 => a,
        _ => Expr::Div(Box::new(a), Box::new(b)),
    }
}
fn pow(a: Expr, b: Expr) -> Expr {
    match b.as_num() {
        Some(y) if y == 0.0 => num(1.0),
        Some(y) if y == 1.0 => a,
        _ => Expr::Pow(Box::new(a), Box::new(b)),
    }
}
fn func(f: Builtin, a: Expr) -> Expr {
    Expr::Func(f, vec![a])
}


impl Expr {
    pub fn parse(src: &str) -> Result<Expr> {
        let tokens = tokenize(src)?;
        let mut parser = Parser{src, tokens, pos: 0};
        if parser.tokens.is_empty() {
            return Err(UncertError::parse(src, "empty expression"));
        }
        let expr = parser.expression()?;
        if parser.pos < parser.tokens.len() {
            return Err(UncertError::parse(src, format!("unexpected `{}`", parser.tokens[parser.pos])));
        }
        Ok(expr)
    }

    /// Expression that applies a callable to its named arguments
    pub fn call(callable: BoundCallable) -> Expr {
        let args = callable.argnames().iter().map(|a| Expr::Sym(a.clone())).collect();
        Expr::Call(Arc::new(callable), args)
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Expr::Num(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_num() == Some(0.0)
    }

    /// Free symbols in order of first appearance
    pub fn free_symbols(&self) -> Vec<String> {
        let mut out = IndexSet::new();
        self.collect_symbols(&mut out);
        out.into_iter().collect()
    }

    fn collect_symbols(&self, out: &mut IndexSet<String>) {
        match self {
            Expr::Num(_) | Expr::Const(..) => {},
            Expr::Sym(s) => { out.insert(s.clone()); },
            Expr::Neg(a) => a.collect_symbols(out),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            },
            Expr::Func(_, args) | Expr::Call(_, args) => {
                for a in args {
                    a.collect_symbols(out);
                }
            },
            Expr::NumDiff(a, _) => a.collect_symbols(out),
        }
    }

    /// True when the tree contains opaque callables
    pub fn has_callables(&self) -> bool {
        self.any_node(&|e| matches!(e, Expr::Call(..)))
    }

    /// True when every opaque callable in the tree offers batch evaluation
    pub fn callables_vectorized(&self) -> bool {
        !self.any_node(&|e| matches!(e, Expr::Call(c, _) if !c.has_batch()))
    }

    fn any_node(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Expr::Num(_) | Expr::Const(..) | Expr::Sym(_) => false,
            Expr::Neg(a) | Expr::NumDiff(a, _) => a.any_node(pred),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.any_node(pred) || b.any_node(pred)
            },
            Expr::Func(_, args) | Expr::Call(_, args) => args.iter().any(|a| a.any_node(pred)),
        }
    }

    /// Replace symbols by expressions
    pub fn substitute(&self, map: &HashMap<String, Expr>) -> Expr {
        let sub = |e: &Expr| Box::new(e.substitute(map));
        match self {
            Expr::Num(_) | Expr::Const(..) => self.clone(),
            Expr::Sym(s) => match map.get(s) {
                Some(e) => e.clone(),
                None => self.clone(),
            },
            Expr::Neg(a) => Expr::Neg(sub(a)),
            Expr::Add(a, b) => Expr::Add(sub(a), sub(b)),
            Expr::Sub(a, b) => Expr::Sub(sub(a), sub(b)),
            Expr::Mul(a, b) => Expr::Mul(sub(a), sub(b)),
            Expr::Div(a, b) => Expr::Div(sub(a), sub(b)),
            Expr::Pow(a, b) => Expr::Pow(sub(a), sub(b)),
            Expr::Func(f, args) => Expr::Func(*f, args.iter().map(|a| a.substitute(map)).collect()),
            Expr::Call(c, args) => Expr::Call(c.clone(), args.iter().map(|a| a.substitute(map)).collect()),
            Expr::NumDiff(a, v) => Expr::NumDiff(sub(a), v.clone()),
        }
    }

    /// Partial derivative with respect to `var`.
    /// Opaque callables and the gamma function fall back to central differences.
    pub fn derivative(&self, var: &str) -> Expr {
        match self {
            Expr::Num(_) | Expr::Const(..) => num(0.0),
            Expr::Sym(s) => num(if s == var { 1.0 } else { 0.0 }),
            Expr::Neg(a) => neg(a.derivative(var)),
            Expr::Add(a, b) => add(a.derivative(var), b.derivative(var)),
            Expr::Sub(a, b) => sub(a.derivative(var), b.derivative(var)),
            Expr::Mul(a, b) => {
                add(mul(a.derivative(var), (**b).clone()),
                    mul((**a).clone(), b.derivative(var)))
            },
            Expr::Div(a, b) => {
                let da = a.derivative(var);
                let db = b.derivative(var);
                if db.is_zero() {
                    div(da, (**b).clone())
                } else {
                    div(sub(mul(da, (**b).clone()), mul((**a).clone(), db)),
                        pow((**b).clone(), num(2.0)))
                }
            },
            Expr::Pow(a, b) => {
                let da = a.derivative(var);
                let db = b.derivative(var);
                let base = (**a).clone();
                let exponent = (**b).clone();
                if db.is_zero() {
                    // d(u^n) = n u^(n-1) du
                    mul(mul(exponent.clone(), pow(base, sub(exponent, num(1.0)))), da)
                } else if da.is_zero() {
                    // d(c^v) = c^v ln(c) dv
                    mul(mul(self.clone(), func(Builtin::Log, base)), db)
                } else {
                    // d(u^v) = u^v (dv ln(u) + v du / u)
                    mul(self.clone(),
                        add(mul(db, func(Builtin::Log, base.clone())),
                            div(mul(exponent, da), base)))
                }
            },
            Expr::Func(f, args) => self.derivative_builtin(*f, args, var),
            Expr::Call(..) | Expr::NumDiff(..) => {
                if self.free_symbols().iter().any(|s| s == var) {
                    Expr::NumDiff(Box::new(self.clone()), var.to_string())
                } else {
                    num(0.0)
                }
            },
        }
    }

    fn derivative_builtin(&self, f: Builtin, args: &[Expr], var: &str) -> Expr {
        let u = args[0].clone();
        if f == Builtin::Atan2 {
            // d atan2(y, x) = (x dy - y dx) / (x^2 + y^2)
            let x = args[1].clone();
            let dy = u.derivative(var);
            let dx = x.derivative(var);
            if dy.is_zero() && dx.is_zero() {
                return num(0.0);
            }
            return div(sub(mul(x.clone(), dy), mul(u.clone(), dx)),
                       add(pow(x, num(2.0)), pow(u, num(2.0))));
        }
        let du = u.derivative(var);
        if du.is_zero() {
            return num(0.0);
        }
        let outer = match f {
            Builtin::Sin => func(Builtin::Cos, u),
            Builtin::Cos => neg(func(Builtin::Sin, u)),
            Builtin::Tan => div(num(1.0), pow(func(Builtin::Cos, u), num(2.0))),
            Builtin::Asin => div(num(1.0), func(Builtin::Sqrt, sub(num(1.0), pow(u, num(2.0))))),
            Builtin::Acos => neg(div(num(1.0), func(Builtin::Sqrt, sub(num(1.0), pow(u, num(2.0)))))),
            Builtin::Atan => div(num(1.0), add(num(1.0), pow(u, num(2.0)))),
            Builtin::Sinh => func(Builtin::Cosh, u),
            Builtin::Cosh => func(Builtin::Sinh, u),
            Builtin::Tanh => sub(num(1.0), pow(func(Builtin::Tanh, u), num(2.0))),
            Builtin::Exp => func(Builtin::Exp, u),
            Builtin::Log => div(num(1.0), u),
            Builtin::Log10 => div(num(1.0), mul(u, func(Builtin::Log, num(10.0)))),
            Builtin::Sqrt => div(num(1.0), mul(num(2.0), func(Builtin::Sqrt, u))),
            Builtin::Abs => func(Builtin::Sign, u),
            Builtin::Sign => num(0.0),
            Builtin::Gamma => return Expr::NumDiff(Box::new(self.clone()), var.to_string()),
            Builtin::Atan2 => unreachable!(),
        };
        mul(outer, du)
    }

    /// Evaluate with named values
    pub fn eval(&self, values: &HashMap<String, f64>) -> Result<f64> {
        self.eval_with(&|name: &str| values.get(name).copied())
    }

    /// Evaluate with a symbol lookup
    pub fn eval_with(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Result<f64> {
        let v = match self {
            Expr::Num(v) | Expr::Const(_, v) => *v,
            Expr::Sym(s) => lookup(s).ok_or_else(|| UncertError::UndefinedVariable(s.clone()))?,
            Expr::Neg(a) => -a.eval_with(lookup)?,
            Expr::Add(a, b) => a.eval_with(lookup)? + b.eval_with(lookup)?,
            Expr::Sub(a, b) => a.eval_with(lookup)? - b.eval_with(lookup)?,
            Expr::Mul(a, b) => a.eval_with(lookup)? * b.eval_with(lookup)?,
            Expr::Div(a, b) => a.eval_with(lookup)? / b.eval_with(lookup)?,
            Expr::Pow(a, b) => a.eval_with(lookup)?.powf(b.eval_with(lookup)?),
            Expr::Func(f, args) => {
                let vals = args.iter().map(|a| a.eval_with(lookup)).collect::<Result<Vec<f64>>>()?;
                f.apply(&vals)
            },
            Expr::Call(c, args) => {
                let vals = args.iter().map(|a| a.eval_with(lookup)).collect::<Result<Vec<f64>>>()?;
                c.call(&vals)
            },
            Expr::NumDiff(a, var) => {
                let x = lookup(var).ok_or_else(|| UncertError::UndefinedVariable(var.clone()))?;
                let h = fd_step(x);
                let hi = a.eval_with(&|n: &str| if n == var { Some(x + h) } else { lookup(n) })?;
                let lo = a.eval_with(&|n: &str| if n == var { Some(x - h) } else { lookup(n) })?;
                (hi - lo) / (2.0 * h)
            },
        };
        Ok(v)
    }

    /// Evaluate over whole sample arrays.
    /// Fails with `NotVectorizable` if a callable cannot take arrays.
    pub fn eval_batch(&self, cols: &HashMap<String, Vec<f64>>, n: usize) -> std::result::Result<Vec<f64>, NotVectorizable> {
        let binary = |a: &Expr, b: &Expr, op: fn(f64, f64) -> f64| -> std::result::Result<Vec<f64>, NotVectorizable> {
            let x = a.eval_batch(cols, n)?;
            let y = b.eval_batch(cols, n)?;
            Ok(x.iter().zip(y.iter()).map(|(p, q)| op(*p, *q)).collect())
        };
        match self {
            Expr::Num(v) | Expr::Const(_, v) => Ok(vec![*v; n]),
            Expr::Sym(s) => cols.get(s).cloned().ok_or(NotVectorizable),
            Expr::Neg(a) => Ok(a.eval_batch(cols, n)?.into_iter().map(|x| -x).collect()),
            Expr::Add(a, b) => binary(a, b, |x, y| x + y),
            Expr::Sub(a, b) => binary(a, b, |x, y| x - y),
            Expr::Mul(a, b) => binary(a, b, |x, y| x * y),
            Expr::Div(a, b) => binary(a, b, |x, y| x / y),
            Expr::Pow(a, b) => binary(a, b, f64::powf),
            Expr::Func(f, args) => {
                let vals = args.iter().map(|a| a.eval_batch(cols, n)).collect::<std::result::Result<Vec<Vec<f64>>, _>>()?;
                let mut out = Vec::with_capacity(n);
                let mut point = vec![0.0; vals.len()];
                for i in 0..n {
                    for (p, v) in point.iter_mut().zip(vals.iter()) {
                        *p = v[i];
                    }
                    out.push(f.apply(&point));
                }
                Ok(out)
            },
            Expr::Call(c, args) => {
                let vals = args.iter().map(|a| a.eval_batch(cols, n)).collect::<std::result::Result<Vec<Vec<f64>>, _>>()?;
                let slices: Vec<&[f64]> = vals.iter().map(|v| v.as_slice()).collect();
                c.call_batch(&slices, n)
            },
            Expr::NumDiff(..) => Err(NotVectorizable),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Num(v) if *v < 0.0 => 3,
            Expr::Pow(..) => 4,
            _ => 5,
        }
    }
}


fn write_child(f: &mut fmt::Formatter, e: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", e)
    } else {
        write!(f, "{}", e)
    }
}

fn write_args(f: &mut fmt::Formatter, name: &str, args: &[Expr]) -> fmt::Result {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    write!(f, "{}({})", name, args.join(", "))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{}", v),
            Expr::Const(name, _) => write!(f, "{}", name),
            Expr::Sym(s) => write!(f, "{}", s),
            Expr::Neg(a) => {
                write!(f, "-")?;
                write_child(f, a, a.precedence() < 4)
            },
            Expr::Add(a, b) => {
                write_child(f, a, false)?;
                write!(f, " + ")?;
                write_child(f, b, false)
            },
            Expr::Sub(a, b) => {
                write_child(f, a, false)?;
                write!(f, " - ")?;
                write_child(f, b, b.precedence() <= 1)
            },
            Expr::Mul(a, b) => {
                write_child(f, a, a.precedence() < 2)?;
                write!(f, "*")?;
                write_child(f, b, b.precedence() < 2)
            },
            Expr::Div(a, b) => {
                write_child(f, a, a.precedence() < 2)?;
                write!(f, "/")?;
                write_child(f, b, b.precedence() <= 2)
            },
            Expr::Pow(a, b) => {
                write_child(f, a, a.precedence() <= 4)?;
                write!(f, "^")?;
                write_child(f, b, b.precedence() < 4)
            },
            Expr::Func(func, args) => write_args(f, func.name(), args),
            Expr::Call(c, args) => write_args(f, c.name(), args),
            Expr::NumDiff(a, var) => write!(f, "∂({})/∂{}", a, var),
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Num(v) => write!(f, "{}", v),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Op(c) => write!(f, "{}", c),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // Exponent only when digits follow, so `2e` stays a product error rather than a number
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let v = text.parse::<f64>()
                .map_err(|_| UncertError::parse(src, format!("invalid number `{}`", text)))?;
            tokens.push(Token::Num(v));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            let tok = match c {
                '+' | '-' | '/' | '^' => Token::Op(c),
                '*' => {
                    if i + 1 < chars.len() && chars[i + 1] == '*' {
                        i += 1;
                        Token::Op('^')
                    } else {
                        Token::Op('*')
                    }
                },
                '(' => Token::LParen,
                ')' => Token::RParen,
                ',' => Token::Comma,
                _ => return Err(UncertError::parse(src, format!("unexpected character `{}`", c))),
            };
            tokens.push(tok);
            i += 1;
        }
    }
    Ok(tokens)
}


// Recursive descent:
//   expression := term (('+' | '-') term)*
//   term       := unary (('*' | '/') unary)*
//   unary      := ('+' | '-') unary | power
//   power      := atom ('^' unary)?
//   atom       := number | constant | symbol | function '(' args ')' | '(' expression ')'
struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}
impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }
    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }
    fn error(&self, msg: impl Into<String>) -> UncertError {
        UncertError::parse(self.src, msg)
    }
    fn expect(&mut self, tok: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == tok => Ok(()),
            Some(t) => Err(self.error(format!("expected `{}`, found `{}`", tok, t))),
            None => Err(self.error(format!("expected `{}`", tok))),
        }
    }
    fn expression(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op)) = self.peek().cloned() {
            if op != '+' && op != '-' {
                break;
            }
            self.pos += 1;
            let rhs = self.term()?;
            lhs = if op == '+' {
                Expr::Add(Box::new(lhs), Box::new(rhs))
            } else {
                Expr::Sub(Box::new(lhs), Box::new(rhs))
            };
        }
        Ok(lhs)
    }
    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op)) = self.peek().cloned() {
            if op != '*' && op != '/' {
                break;
            }
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = if op == '*' {
                Expr::Mul(Box::new(lhs), Box::new(rhs))
            } else {
                Expr::Div(Box::new(lhs), Box::new(rhs))
            };
        }
        Ok(lhs)
    }
    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            },
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            },
            _ => self.power(),
        }
    }
    fn power(&mut self) -> Result<Expr> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }
    fn atom(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    let f = *FUNCTIONS.get(name.as_str())
                        .ok_or_else(|| self.error(format!("unknown function `{}`", name)))?;
                    let mut args = vec![self.expression()?];
                    while let Some(Token::Comma) = self.peek() {
                        self.pos += 1;
                        args.push(self.expression()?);
                    }
                    self.expect(Token::RParen)?;
                    if args.len() != f.arity() {
                        return Err(self.error(format!(
                            "`{}` takes {} argument(s), {} given", name, f.arity(), args.len())));
                    }
                    Ok(Expr::Func(f, args))
                } else if let Some((cname, value)) = CONSTANTS.get_key_value(name.as_str()) {
                    Ok(Expr::Const(*cname, *value))
                } else {
                    Ok(Expr::Sym(name))
                }
            },
            Some(Token::LParen) => {
                let e = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(e)
            },
            Some(t) => Err(self.error(format!("unexpected `{}`", t))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}


/// Split `"name = expression"` into its parts
pub fn split_assignment(src: &str) -> Result<(Option<String>, String)> {
    match src.split_once('=') {
        Some((lhs, rhs)) => {
            let name = lhs.trim();
            check_name(name).map_err(|e| UncertError::parse(src, e.to_string()))?;
            Ok((Some(name.to_string()), rhs.trim().to_string()))
        },
        None => Ok((None, src.trim().to_string())),
    }
}

/// Check that `name` can be used as a variable or function name
pub fn check_name(name: &str) -> Result<()> {
    let valid = name.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !valid {
        return Err(UncertError::config(format!("invalid name `{}`", name)));
    }
    if CONSTANTS.contains_key(name) {
        return Err(UncertError::config(format!("`{}` is a reserved name", name)));
    }
    Ok(())
}
