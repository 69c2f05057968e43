// Uncertainty calculator scenarios through the public API
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::{assert_abs_diff_eq, assert_relative_eq};

use uncertlib::{Callable, DistKind, EvalTier, Kwargs, Method, NotVectorizable, Slot, UncertCalc, UncertError, UncertaintyComponent};


fn normal(std: f64) -> UncertaintyComponent {
    UncertaintyComponent::normal(std).unwrap()
}

fn is_variable(u: &UncertCalc, name: &str) -> bool {
    matches!(u.get_input(name), Some(Slot::Variable(_)))
}

fn is_function(u: &UncertCalc, name: &str) -> bool {
    matches!(u.get_input(name), Some(Slot::Function(_)))
}


const CONFIG: &str = r#"
functions = ["f = (a + b) / c", "g = a - b", "h = b * c"]

[settings]
samples = 1000000

[[variable]]
name = "a"
nominal = 10.0

[[variable.uncertainty]]
dist = "normal"
params = { std = 0.2 }
degf = 10

[[variable]]
name = "b"
nominal = 25.0

[[variable.uncertainty]]
dist = "gamma"
params = { a = 5.0, scale = 2.0 }

[[variable]]
name = "c"
nominal = 2.0

[[variable.uncertainty]]
dist = "normal"
params = { std = 0.1 }
degf = 88

[[correlation]]
v1 = "a"
v2 = "b"
coeff = -0.36

[[correlation]]
v1 = "a"
v2 = "c"
coeff = -0.4

[[correlation]]
v1 = "b"
v2 = "c"
coeff = 0.86
"#;


#[test]
fn test_chain() {
    let mut u = UncertCalc::new();
    u.set_seed(Some(0)).unwrap();
    u.set_samples(20_000).unwrap();
    u.set_input("x", 100.0).unwrap();
    u.set_uncert("x", normal(1.0)).unwrap();
    u.set_input("y", 50.0).unwrap();
    u.set_uncert("y", normal(1.0)).unwrap();
    u.set_function("x+y", Some("f"), None).unwrap();
    u.set_function("2*f", Some("g"), None).unwrap();
    u.set_function("2*g", Some("h"), None).unwrap();

    let out = u.calculate().unwrap();
    let (f, g, h) = (out.gum("f").unwrap(), out.gum("g").unwrap(), out.gum("h").unwrap());
    assert_eq!(f.expected, g.expected / 2.0);
    assert_eq!(g.expected, h.expected / 2.0);
    assert_relative_eq!(f.std_dev, g.std_dev / 2.0, max_relative = 1E-12);
    assert_relative_eq!(g.std_dev, h.std_dev / 2.0, max_relative = 1E-12);
    let (f, g, h) = (out.mc("f").unwrap(), out.mc("g").unwrap(), out.mc("h").unwrap());
    assert_relative_eq!(f.expected, g.expected / 2.0, max_relative = 0.02);
    assert_relative_eq!(g.expected, h.expected / 2.0, max_relative = 0.02);
    assert_relative_eq!(f.std_dev, g.std_dev / 2.0, max_relative = 0.05);
    assert_relative_eq!(g.std_dev, h.std_dev / 2.0, max_relative = 0.05);

    // Redefining f trickles down to g and h
    let oldh_mean = out.gum("h").unwrap().expected;
    let oldh_unc = out.gum("h").unwrap().std_dev;
    u.set_function("(x+y)/2", Some("f"), None).unwrap();
    let out = u.calculate().unwrap();
    assert_eq!(oldh_mean / 2.0, out.gum("h").unwrap().expected);
    assert_eq!(oldh_unc / 2.0, out.gum("h").unwrap().std_dev);
    let (f, g) = (out.mc("f").unwrap(), out.mc("g").unwrap());
    assert_relative_eq!(f.expected, g.expected / 2.0, max_relative = 0.02);
    assert_relative_eq!(f.std_dev, g.std_dev / 2.0, max_relative = 0.02);
    assert_eq!(u.get_functionnames(), &["f".to_string(), "g".to_string(), "h".to_string()]);
}

#[test]
fn test_double_chain() {
    // Declaration order doesn't matter
    let mut u = UncertCalc::from_functions(&["g = a*b*f", "f = a+b*c+h", "h=a+d"]).unwrap();
    u.set_samples(5000).unwrap();
    for (name, nom, std) in [("a", 10.0, 1.0), ("b", 10.0, 1.0), ("c", 1.0, 0.5), ("d", 1.0, 0.5)] {
        u.set_input(name, nom).unwrap();
        u.set_uncert(name, normal(std)).unwrap();
    }
    let out = u.calculate().unwrap();
    assert!(out.summary(3).contains("Monte Carlo"));
    assert_eq!(out.gum("g").unwrap().expected, 10.0 * 10.0 * (10.0 + 10.0 * 1.0 + 11.0));

    let symbols = u.get_base_expression(0).unwrap().free_symbols();
    assert_eq!(symbols, vec!["a", "b", "c", "d"]);
    assert_eq!(u.get_basenames(0).unwrap(), vec!["a", "b", "f"]);
}

#[test]
fn test_callable() {
    let mut u = UncertCalc::new();
    u.set_seed(Some(0)).unwrap();
    u.set_samples(10_000).unwrap();
    u.set_callable(Callable::new("myfunc", &["a", "b"], |v| v[0] + v[1].powi(2)), None, None).unwrap();
    assert_eq!(u.get_reqd_inputs(), vec!["a", "b"]);
    u.add_required_inputs().unwrap();
    assert!(u.get_reqd_inputs().is_empty());
    assert!(is_variable(&u, "a") && is_variable(&u, "b") && is_function(&u, "myfunc"));
    assert_eq!(u.get_basenames(0).unwrap(), vec!["a", "b"]);

    u.set_input("a", 5.0).unwrap();
    u.set_input("b", 2.0).unwrap();
    u.set_uncert("a", normal(0.05)).unwrap();
    u.set_uncert("b", normal(0.02)).unwrap();
    let out = u.calculate().unwrap();
    let gum = out.get_output(0, Method::Gum).unwrap();
    assert_relative_eq!(gum.expected(), 9.0, max_relative = 1E-9);
    // d/db b^2 = 4 at b = 2
    let expected_unc = (0.05f64.powi(2) + (4.0 * 0.02f64).powi(2)).sqrt();
    assert_relative_eq!(gum.std_uncert(), expected_unc, max_relative = 1E-5);
    assert_relative_eq!(out.get_output(0, Method::Mc).unwrap().expected(), 9.0, max_relative = 1E-3);
}

#[test]
fn test_callablekwargs() {
    let product = || Callable::with_kwargs("myfunc", |kw: &Kwargs| kw["x"] * kw["y"]);

    let mut u = UncertCalc::new();
    let err = u.set_callable(product(), None, None);
    assert!(matches!(err, Err(UncertError::Configuration(_))));
    assert!(u.get_functionnames().is_empty());

    u.set_callable(product(), Some(&["x", "y"]), None).unwrap();
    assert_eq!(u.get_reqd_inputs(), vec!["x", "y"]);
    u.set_input("x", 2.0).unwrap();
    u.set_input("y", 4.0).unwrap();
    u.set_uncert("x", normal(0.1)).unwrap();
    u.set_uncert("y", normal(0.2)).unwrap();
    let out = u.calculate_gum().unwrap();
    assert_relative_eq!(out.get_output(0, Method::Gum).unwrap().expected(), 8.0, max_relative = 1E-12);
}

#[test]
fn test_chaincallable() {
    let mut u = UncertCalc::new();
    u.set_callable(Callable::new("myfunc1", &["x", "y"], |v| v[0] * v[1]), None, None).unwrap();
    u.set_callable(Callable::new("myfunc2", &["myfunc1"], |v| v[0] + 100.0), None, None).unwrap();
    assert_eq!(u.get_reqd_inputs(), vec!["x", "y"]);
    u.add_required_inputs().unwrap();
    assert_eq!(u.get_basenames(0).unwrap(), vec!["x", "y"]);
    assert_eq!(u.get_basenames(1).unwrap(), vec!["myfunc1"]);

    u.set_input("x", 2.0).unwrap();
    u.set_input("y", 10.0).unwrap();
    u.set_uncert("x", normal(0.1)).unwrap();
    u.set_uncert("y", normal(0.5)).unwrap();
    let out = u.calculate_gum().unwrap();
    assert_relative_eq!(out.get_output(0, Method::Gum).unwrap().expected(), 20.0, max_relative = 1E-12);
    assert_relative_eq!(out.get_output(1, Method::Gum).unwrap().expected(), 120.0, max_relative = 1E-12);
    assert!(out.get_output(0, Method::Mc).is_err());

    let cont = u.get_contour("myfunc1", "myfunc2").unwrap();
    for grid in [&cont.x, &cont.y, &cont.pdf] {
        assert_eq!(grid.len(), 50);
        assert!(grid.iter().all(|row| row.len() == 50));
    }
    assert!(cont.pdf.iter().flatten().all(|p| p.is_finite()));
}

// Temperature coefficient of resistance: slope of R/R1 - 1 against T - T1
fn tcr(kw: &Kwargs) -> f64 {
    let n = kw.len() / 2;
    let t: Vec<f64> = (1..=n).map(|i| kw[&format!("T{}", i)]).collect();
    let r: Vec<f64> = (1..=n).map(|i| kw[&format!("R{}", i)]).collect();
    let x: Vec<f64> = t.iter().map(|v| v - t[0]).collect();
    let y: Vec<f64> = r.iter().map(|v| v / r[0] - 1.0).collect();
    let xm = x.iter().sum::<f64>() / n as f64;
    let ym = y.iter().sum::<f64>() / n as f64;
    let sxy: f64 = x.iter().zip(y.iter()).map(|(a, b)| (a - xm) * (b - ym)).sum();
    let sxx: f64 = x.iter().map(|a| (a - xm).powi(2)).sum();
    sxy / sxx
}

#[test]
fn test_vectorize() {
    let probes = Arc::new(AtomicUsize::new(0));
    let counter = probes.clone();
    let callable = Callable::with_kwargs("tcr", tcr)
        .vectorized(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(NotVectorizable)
        });
    let names: Vec<String> = (1..=4).map(|i| format!("T{}", i)).chain((1..=4).map(|i| format!("R{}", i))).collect();
    let kwnames: Vec<&str> = names.iter().map(|s| s.as_str()).collect();

    let mut u = UncertCalc::new();
    u.set_samples(1000).unwrap();
    u.set_seed(Some(1)).unwrap();
    u.set_callable(callable, Some(&kwnames), None).unwrap();
    assert_eq!(u.get_function(0).unwrap().tier(), EvalTier::Probe);
    for (i, rval) in [100.0, 100.1, 100.2, 100.3].iter().enumerate() {
        let name = format!("R{}", i + 1);
        u.set_input(&name, *rval).unwrap();
        u.set_uncert(&name, normal(0.2)).unwrap();
    }
    for (i, tval) in [20.0, 22.0, 24.0, 26.0].iter().enumerate() {
        let name = format!("T{}", i + 1);
        u.set_input(&name, *tval).unwrap();
        u.set_uncert(&name, normal(0.05)).unwrap();
    }
    let out = u.calculate_mc().unwrap();
    assert_abs_diff_eq!(out.get_output(0, Method::Mc).unwrap().expected(), 0.0005, epsilon = 1E-4);
    assert_eq!(probes.load(Ordering::SeqCst), 1);
    assert_eq!(u.get_function(0).unwrap().tier(), EvalTier::Elementwise);

    // The failed probe is remembered
    u.calculate_mc().unwrap();
    assert_eq!(probes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_vectorize_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let callable = Callable::new("sq", &["x"], |v| v[0] * v[0])
        .vectorized(move |cols| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(cols[0].iter().map(|x| x * x).collect())
        });
    let mut u = UncertCalc::new();
    u.set_samples(100).unwrap();
    u.set_callable(callable, None, None).unwrap();
    u.set_input("x", 3.0).unwrap();
    u.set_uncert("x", normal(0.01)).unwrap();
    u.calculate_mc().unwrap();
    assert_eq!(u.get_function(0).unwrap().tier(), EvalTier::Vectorized);
    u.calculate_mc().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_vectorize_short_output() {
    // Batch output of the wrong length falls back to per-sample evaluation
    let callable = Callable::new("k", &[], |_| 2.0)
        .vectorized(|_| Ok(vec![2.0]));
    let mut u = UncertCalc::new();
    u.set_samples(50).unwrap();
    u.set_callable(callable, None, None).unwrap();
    let out = u.calculate_mc().unwrap();
    let mc = out.mc("k").unwrap();
    assert_eq!(mc.samples.len(), 50);
    assert_eq!(mc.expected, 2.0);
    assert_eq!(u.get_function(0).unwrap().tier(), EvalTier::Elementwise);
}

#[test]
fn test_callable_reserved_args() {
    let mut u = UncertCalc::new();
    let err = u.set_callable(Callable::new("f", &["pi", "x"], |v| v[0] * v[1]), None, None);
    assert!(matches!(err, Err(UncertError::Configuration(_))));
    assert!(u.get_functionnames().is_empty());
    u.set_callable(Callable::new("f", &["pi", "x"], |v| v[0] * v[1]), Some(&["p", "x"]), None).unwrap();
    assert_eq!(u.get_reqd_inputs(), vec!["p".to_string(), "x".to_string()]);
}

#[test]
fn test_exact_input_infinite_slope() {
    let mut u = UncertCalc::from_functions(&["f = y + sqrt(x)"]).unwrap();
    u.set_input("y", 1.0).unwrap();
    u.set_uncert("y", normal(0.1)).unwrap();
    u.add_required_inputs().unwrap();
    let out = u.calculate_gum().unwrap();
    let gum = out.gum("f").unwrap();
    assert_eq!(gum.expected, 1.0);
    assert_relative_eq!(gum.std_dev, 0.1, max_relative = 1E-12);
}

#[test]
fn test_constant() {
    let mut u = UncertCalc::new();
    u.set_samples(1000).unwrap();
    u.set_function("10", Some("a"), None).unwrap();
    u.set_function("a+b", None, None).unwrap();
    u.set_input("b", 5.0).unwrap();
    u.set_uncert("b", normal(0.1)).unwrap();
    let out = u.calculate().unwrap();
    let gum1 = out.gum("a").unwrap();
    assert_eq!(gum1.expected, 10.0);
    assert_eq!(gum1.std_dev, 0.0);
    assert!(gum1.degrees_freedom.is_infinite());
    let gum2 = out.get_output(1, Method::Gum).unwrap();
    assert_eq!(gum2.expected(), 15.0);
    assert_eq!(out.mc("a").unwrap().std_dev, 0.0);
}

#[test]
fn test_readconfig() {
    let u = UncertCalc::from_config(CONFIG).unwrap();
    let equations: Vec<String> = (0..3).map(|i| u.get_function(i).unwrap().equation()).collect();
    assert_eq!(equations, vec!["f = (a + b) / c", "g = a - b", "h = b * c"]);
    assert_eq!(u.samples(), 1_000_000);
    assert!(u.get_reqd_inputs().is_empty());

    let a = match u.get_input("a") {
        Some(Slot::Variable(v)) => v,
        _ => panic!("a should be a variable"),
    };
    assert_eq!(a.nominal(), 10.0);
    assert_eq!(a.uncerts()[0].param("std"), Some(0.2));
    assert_eq!(a.uncerts()[0].dist(), DistKind::Normal);
    assert_relative_eq!(a.degrees_freedom(), 10.0, max_relative = 1E-12);

    let b = match u.get_input("b") {
        Some(Slot::Variable(v)) => v,
        _ => panic!("b should be a variable"),
    };
    assert_eq!(b.nominal(), 25.0);
    assert_eq!(b.uncerts()[0].param("scale"), Some(2.0));
    assert_eq!(b.uncerts()[0].param("a"), Some(5.0));
    assert_eq!(b.uncerts()[0].dist(), DistKind::Gamma);
    assert!(b.degrees_freedom().is_infinite());

    let c = match u.get_input("c") {
        Some(Slot::Variable(v)) => v,
        _ => panic!("c should be a variable"),
    };
    assert_eq!(c.nominal(), 2.0);
    assert_eq!(c.uncerts()[0].param("std"), Some(0.1));
    assert_relative_eq!(c.degrees_freedom(), 88.0, max_relative = 1E-12);

    assert_eq!(u.get_corr_list().len(), 3);
    assert_eq!(u.get_correlation("b", "a"), -0.36);
    assert_eq!(u.get_correlation("c", "a"), -0.4);
    assert_eq!(u.get_correlation("b", "c"), 0.86);
}

#[test]
fn test_saveconfig() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved.toml");

    let u = UncertCalc::from_config(CONFIG).unwrap();
    u.save_config(&path).unwrap();
    let u2 = UncertCalc::from_configfile(&path).unwrap();

    for i in 0..3 {
        assert_eq!(u.get_function(i).unwrap().equation(), u2.get_function(i).unwrap().equation());
    }
    for (v1, v2) in [("a", "b"), ("a", "c"), ("b", "c")] {
        assert_eq!(u.get_correlation(v1, v2), u2.get_correlation(v1, v2));
    }
    assert_eq!(u.samples(), u2.samples());
    assert_eq!(u.get_config().unwrap(), u2.get_config().unwrap());

    let mut callable = UncertCalc::new();
    callable.set_callable(Callable::new("f", &["x"], |v| v[0]), None, None).unwrap();
    assert!(matches!(callable.get_config(), Err(UncertError::Configuration(_))));
}

#[test]
fn test_addinputs() {
    let mut u = UncertCalc::from_functions(&["a + b + c + d"]).unwrap();
    assert_eq!(u.get_functionnames(), &["f1".to_string()]);
    u.set_input("a", 1.0).unwrap();
    u.add_required_inputs().unwrap();
    assert!(["a", "b", "c", "d"].iter().all(|n| is_variable(&u, n)));
    match u.get_input("a") {
        Some(Slot::Variable(v)) => assert_eq!(v.nominal(), 1.0),
        _ => panic!("a should be a variable"),
    }

    let mut u = UncertCalc::new();
    u.set_callable(Callable::new("myfunc", &["j", "k", "l"], |v| v.iter().sum()), None, None).unwrap();
    u.add_required_inputs().unwrap();
    assert!(["j", "k", "l"].iter().all(|n| is_variable(&u, n)));
    u.calculate_gum().unwrap();
}

#[test]
fn test_checkinput() {
    let comp = UncertaintyComponent::new(DistKind::Gamma, &[("std", 1.0)]).unwrap();
    assert_eq!(comp.param("a"), Some(1.0));
    let bad = UncertaintyComponent::new(DistKind::Gamma, &[("std", 1.0), ("a", -1.0)]);
    assert!(matches!(bad, Err(UncertError::Configuration(_))));

    let mut u = UncertCalc::from_functions(&["a+b"]).unwrap();
    assert!(matches!(u.calculate_gum(), Err(UncertError::UndefinedVariable(_))));
    assert!(matches!(u.calculate_mc(), Err(UncertError::UndefinedVariable(_))));
}

#[test]
fn test_reqargs() {
    let args = UncertaintyComponent::new(DistKind::Gamma, &[("std", 1.0)]).unwrap().required_args();
    assert!(args.contains(&"a"));
    let args = UncertaintyComponent::new(DistKind::T, &[("std", 1.0)]).unwrap().required_args();
    assert!(args.contains(&"df"));
    let args = UncertaintyComponent::new(DistKind::Burr, &[("std", 1.0)]).unwrap().required_args();
    assert!(args.contains(&"c"));
    assert!(args.contains(&"d"));
}

#[test]
fn test_reserved() {
    // pi is the constant
    let mut u = UncertCalc::from_functions(&["pi"]).unwrap();
    let out = u.calculate_gum().unwrap();
    assert_relative_eq!(out.get_output(0, Method::Gum).unwrap().expected(), std::f64::consts::PI);
    assert!(u.get_basenames(0).unwrap().is_empty());

    // gamma alone is a variable
    let mut u = UncertCalc::from_functions(&["gamma/2"]).unwrap();
    u.set_input("gamma", 10.0).unwrap();
    let out = u.calculate_gum().unwrap();
    assert_relative_eq!(out.get_output(0, Method::Gum).unwrap().expected(), 5.0);
    assert_eq!(u.get_basenames(0).unwrap(), vec!["gamma"]);

    // cos is the cosine function
    let mut u = UncertCalc::from_functions(&["cos(x)"]).unwrap();
    u.set_input("x", std::f64::consts::PI).unwrap();
    let out = u.calculate_gum().unwrap();
    assert_relative_eq!(out.get_output(0, Method::Gum).unwrap().expected(), -1.0);
    assert_eq!(u.get_basenames(0).unwrap(), vec!["x"]);
}

#[test]
fn test_reorder() {
    let mut u = UncertCalc::from_functions(&["f=a+b", "g=a*b"]).unwrap();
    assert_eq!(u.get_functionnames(), &["f".to_string(), "g".to_string()]);
    u.add_required_inputs().unwrap();
    u.calculate_gum().unwrap();
    u.reorder(&["g", "f"]).unwrap();
    assert_eq!(u.get_functionnames(), &["g".to_string(), "f".to_string()]);
    // Presentation order only, results stay valid
    let out = u.output().unwrap();
    assert_eq!(out.names(), vec!["g", "f"]);
    assert!(u.reorder(&["g", "f", "h"]).is_err());
}

#[test]
fn test_seed() {
    let setup = |seed| {
        let mut u = UncertCalc::from_functions(&["f=a+b"]).unwrap();
        u.set_samples(1000).unwrap();
        u.set_seed(seed).unwrap();
        u.set_input("a", 10.0).unwrap();
        u.set_input("b", 5.0).unwrap();
        u.set_uncert("a", normal(0.1)).unwrap();
        u.set_uncert("b", normal(0.05)).unwrap();
        u
    };

    let mut u = setup(Some(10));
    let vals = u.calculate().unwrap().mc("f").unwrap().samples[..10].to_vec();
    let again = u.calculate().unwrap().mc("f").unwrap().samples[..10].to_vec();
    assert_eq!(vals, again);

    let mut u = setup(None);
    let vals = u.calculate().unwrap().mc("f").unwrap().samples[..10].to_vec();
    let again = u.calculate().unwrap().mc("f").unwrap().samples[..10].to_vec();
    assert_ne!(vals, again);
}

#[test]
fn test_change() {
    let mut u = UncertCalc::from_functions(&["R = V/I"]).unwrap();
    u.add_required_inputs().unwrap();
    assert!(is_function(&u, "R"));
    assert!(is_variable(&u, "V"));
    assert!(is_variable(&u, "I"));

    u.set_function("I*R", Some("V"), Some(0)).unwrap();
    u.add_required_inputs().unwrap();
    assert!(is_variable(&u, "R"));
    assert!(is_function(&u, "V"));
    assert!(is_variable(&u, "I"));
    assert_eq!(u.get_functionnames(), &["V".to_string()]);
}

#[test]
fn test_expanded() {
    let mut u = UncertCalc::from_functions(&["f = x"]).unwrap();
    u.set_samples(100_000).unwrap();
    u.set_seed(Some(12345)).unwrap();
    u.set_input("x", 2.0).unwrap();
    u.set_uncert("x", normal(0.5)).unwrap();
    let mc = u.calculate_mc().unwrap().mc("f").unwrap();
    let sym = mc.expanded(false);
    let short = mc.expanded(true);
    assert_abs_diff_eq!(sym.low, short.low, epsilon = 0.1);
    assert_abs_diff_eq!(sym.high, short.high, epsilon = 0.1);
    assert_abs_diff_eq!(sym.k, short.k, epsilon = 0.1);
}

#[test]
fn test_stale_output() {
    let mut u = UncertCalc::from_functions(&["f = a - b"]).unwrap();
    u.set_samples(1000).unwrap();
    for name in ["a", "b"] {
        u.set_input(name, 1.0).unwrap();
        u.set_uncert(name, normal(0.1)).unwrap();
    }
    assert!(matches!(u.output(), Err(UncertError::StaleOutput)));
    u.calculate().unwrap();
    u.update_uncert("a", 0, normal(0.2)).unwrap();
    assert!(matches!(u.output(), Err(UncertError::StaleOutput)));

    // GUM works with perfect correlation, Monte Carlo cannot sample it
    u.set_correlation("a", "b", 1.0).unwrap();
    let gum_unc = u.calculate_gum().unwrap().gum("f").unwrap().std_dev;
    assert_relative_eq!(gum_unc, 0.1, max_relative = 1E-9);
    assert!(matches!(u.calculate(), Err(UncertError::Configuration(_))));
    let out = u.output().unwrap();
    assert_eq!(out.gum("f").unwrap().std_dev, gum_unc);
    assert!(out.mc("f").is_none());
}
