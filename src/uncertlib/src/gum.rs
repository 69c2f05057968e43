// GUM propagation: first-order Taylor series with Welch-Satterthwaite degrees of freedom
use std::collections::HashMap;
use std::sync::Arc;

use mathru::algebra::linear::matrix::{General, Transpose};
use tracing::{debug, info};

use crate::error::Result;
use crate::registry::Registry;
use crate::result::{GumComponents, GumResult};
use crate::student;


pub(crate) fn calculate(reg: &Registry, conf: f64) -> Result<Vec<GumResult>> {
    let vars = reg.used_variables()?;
    let funcs: Vec<_> = reg.functions().collect();
    let nfunc = funcs.len();
    let nvars = vars.len();

    let varnames: Vec<String> = vars.iter().map(|v| v.name().to_string()).collect();
    let funcnames: Vec<String> = funcs.iter().map(|f| f.name().to_string()).collect();
    let values: HashMap<String, f64> = vars.iter().map(|v| (v.name().to_string(), v.nominal())).collect();
    let var_uncerts: Vec<f64> = vars.iter().map(|v| v.std_dev()).collect();
    let var_degfs: Vec<f64> = vars.iter().map(|v| v.degrees_freedom()).collect();
    let lookup = |name: &str| values.get(name).copied();

    // Covariance Matrix (column-major, symmetric)
    let mut ux_data = vec![0.0; nvars * nvars];
    for i in 0..nvars {
        for j in 0..nvars {
            let corr = reg.correlation(&varnames[i], &varnames[j]);
            ux_data[j*nvars + i] = corr * var_uncerts[i] * var_uncerts[j];
        }
    }
    let covariance = General::new(nvars, nvars, ux_data);

    // Sensitivity Matrix
    let mut cx_data = vec![0.0; nfunc * nvars];
    let mut func_expect: Vec<f64> = Vec::with_capacity(nfunc);
    let mut partials: Vec<Vec<String>> = Vec::with_capacity(nfunc);
    for (i, func) in funcs.iter().enumerate() {
        let base = func.base_expr();
        func_expect.push(base.eval_with(&lookup)?);
        let fvarnames = base.free_symbols();
        let mut fpartials: Vec<String> = Vec::new();
        for (j, name) in varnames.iter().enumerate() {
            if !fvarnames.contains(name) {
                continue;
            }
            let diff = base.derivative(name);
            cx_data[j*nfunc + i] = diff.eval_with(&lookup)?;
            fpartials.push(format!("∂{}/∂{} = {}", funcnames[i], name, diff));
        }
        partials.push(fpartials);
    }
    // Inputs without uncertainty contribute nothing, even where the sensitivity is not finite
    let cx_weighted: Vec<f64> = cx_data.iter().enumerate()
        .map(|(idx, c)| if var_uncerts[idx / nfunc] == 0.0 { 0.0 } else { *c })
        .collect();
    let cx = General::new(nfunc, nvars, cx_data);
    let cw = General::new(nfunc, nvars, cx_weighted);

    let uy = if nvars == 0 {
        General::zero(nfunc, nfunc)
    } else {
        cw.clone() * covariance.clone() * cw.clone().transpose()
    };
    // Rounding can leave a tiny negative variance. NaN is kept.
    let func_uncerts: Vec<f64> = (0..nfunc).map(|i| {
        let v = uy[[i, i]];
        if v < 0.0 { 0.0 } else { v.sqrt() }
    }).collect();

    let components = Arc::new(GumComponents{
        varnames: varnames.clone(),
        funcnames,
        ux: covariance,
        cx: cx.clone(),
        uy,
        partial_eqs: partials,
    });

    let mut results = Vec::with_capacity(nfunc);
    for i in 0..nfunc {
        let uc = func_uncerts[i];

        // Effective Deg. Freedom, infinite inputs drop out of the sum
        let mut denom: f64 = 0.0;
        for j in 0..nvars {
            if var_degfs[j].is_finite() {
                denom += (var_uncerts[j]*cw[[i, j]]).powi(4) / var_degfs[j];
            }
        }
        let degf = if denom > 0.0 { uc.powi(4) / denom } else { f64::INFINITY };
        let k = student::coverage_factor(conf, degf)?;

        let sensitivities: Vec<f64> = (0..nvars).map(|j| cx[[i, j]]).collect();
        let proportions: Vec<f64> = (0..nvars).map(|j| {
            if uc > 0.0 { (cw[[i, j]] * var_uncerts[j]).powi(2) / uc.powi(2) } else { 0.0 }
        }).collect();
        debug!("{}: mean {}, u {}, degf {}", components.funcnames[i], func_expect[i], uc, degf);

        results.push(GumResult{
            expected: func_expect[i],
            variance: uc.powi(2),
            std_dev: uc,
            degrees_freedom: degf,
            coverage_factor: k,
            confidence: conf,
            sensitivities,
            proportions,
            gum: components.clone(),
        });
    }
    info!("GUM calculated {} functions of {} variables", nfunc, nvars);
    Ok(results)
}
