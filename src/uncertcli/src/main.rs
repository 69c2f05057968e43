// Uncertainty CLI - Loads TOML file and prints GUM and Monte Carlo results
use std::{env, error::Error};

use tracing::debug;
use tracing_subscriber::EnvFilter;

use uncertlib::UncertCalc;


fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: [configfile] ");
        std::process::exit(0);
    }

    let mut calc = match UncertCalc::from_configfile(&args[1]) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("filename {}, {}", args[1], e);
            std::process::exit(1);
        }
    };
    debug!("Loaded {} with functions {:?}", args[1], calc.get_functionnames());

    // Deeply chained expressions recurse during substitution and differentiation
    const STACKSIZE: usize = 8;
    std::thread::Builder::new().stack_size(1024*1024*STACKSIZE).spawn(move || {
        match calc.calculate() {
            Ok(out) => println!("{}", out.summary(4)),
            Err(e) => eprintln!("{}", e),
        }
    })?.join().map_err(|_| "calculation thread panicked")?;

    Ok(())
}
