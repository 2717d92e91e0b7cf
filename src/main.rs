use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use log::*;

use reducer::{reduce, CommandOracle, Config, Oracle, ReduceError, Reducer};

/// Delta debugger for SMT benchmarks in SMT-LIB v2 format.
///
/// The command is run on the scratch file `$TMPDIR/tmp-<pid>.smt2`, whose
/// path is also exported as DDSMT_SCRATCH.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input file (in SMT-LIB v2 format), STDIN reads standard input
    infile: String,

    /// the output file
    outfile: PathBuf,

    /// the command (with optional arguments)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    cmd: Vec<String>,

    /// timeout for test runs in seconds (default: none)
    #[arg(short = 't', value_name = "val")]
    timeout: Option<f64>,

    /// increase verbosity
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbosity: u8,

    /// skip runtime consistency checks
    #[arg(short = 'o')]
    optimize: bool,
}

impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.infile != "STDIN" {
            let infile = Path::new(&self.infile);
            if !infile.exists() {
                bail!("given input file does not exist");
            }
            if infile.is_dir() {
                bail!("given input file is a directory");
            }
        }
        if self.outfile.exists() {
            bail!("given output file does already exist");
        }
        if let Some(t) = self.timeout {
            if !t.is_finite() || t <= 0.0 {
                bail!("timeout must be a positive number of seconds");
            }
        }
        Ok(())
    }

    fn config(&self) -> Config {
        Config { timeout: self.timeout.map(Duration::from_secs_f64), check_consistency: !self.optimize }
    }
}

/// Removes the scratch file when dropped.
struct Scratch(PathBuf);

impl Scratch {
    fn new() -> Scratch {
        Scratch(std::env::temp_dir().join(format!("tmp-{}.smt2", std::process::id())))
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if self.0.exists() {
            let _ = fs::remove_file(&self.0);
        }
    }
}

fn read_input(infile: &str) -> anyhow::Result<String> {
    if infile == "STDIN" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source).context("failed to read standard input")?;
        return Ok(source);
    }
    fs::read_to_string(infile).with_context(|| format!("failed to read '{}'", infile))
}

fn run(args: &Args, scratch: &Path, interrupted: Arc<AtomicBool>) -> anyhow::Result<()> {
    args.validate()?;
    info!("input  file: '{}'", args.infile);
    info!("output file: '{}'", args.outfile.display());
    info!("command:     '{}'", args.cmd.join(" "));

    let source = read_input(&args.infile)?;
    let formula = parser::parse(&source).context("failed parsing the input file")?;
    ir::dump::dump_to_file(&formula, scratch)
        .with_context(|| format!("unable to write '{}'", scratch.display()))?;

    let config = args.config();
    let mut oracle = CommandOracle::new(args.cmd.clone(), config.timeout, scratch);
    oracle.golden()?;

    let mut reducer = Reducer::new(formula, oracle, scratch, &args.outfile, config).with_interrupt(interrupted);
    reduce(&mut reducer)?;

    let insize = source.len();
    let outsize = fs::metadata(&args.outfile).map(|m| m.len() as usize).unwrap_or(insize);
    info!("input  file size: {} bytes", insize);
    info!(
        "output file size: {} bytes ({:.1}%)",
        outsize,
        if insize > 0 { outsize as f64 * 100.0 / insize as f64 } else { 100.0 }
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbosity);

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!("unable to install interrupt handler: {}", e);
    }

    let scratch = Scratch::new();
    let result = run(&args, &scratch.0, interrupted);
    drop(scratch);

    if let Err(e) = result {
        let level = match e.downcast_ref::<ReduceError>() {
            Some(ReduceError::NoReduction) | Some(ReduceError::Interrupted) => 4,
            _ => 5,
        };
        logging::raise_error(&format!("{:#}", e), level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_command_line() {
        let a = args(&["ddsmt", "-vv", "-t", "2.5", "in.smt2", "out.smt2", "z3", "-smt2", "/tmp/x.smt2"]);
        assert_eq!(a.verbosity, 2);
        assert_eq!(a.timeout, Some(2.5));
        assert_eq!(a.cmd, vec!["z3", "-smt2", "/tmp/x.smt2"]);
        assert!(a.config().check_consistency);
        assert!(!args(&["ddsmt", "-o", "a", "b", "c"]).config().check_consistency);
        assert!(Args::try_parse_from(["ddsmt", "in.smt2", "out.smt2"]).is_err());
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.smt2");
        let output = dir.path().join("out.smt2");
        let missing = args(&["ddsmt", input.to_str().unwrap(), output.to_str().unwrap(), "true"]);
        assert_eq!(missing.validate().unwrap_err().to_string(), "given input file does not exist");

        fs::write(&input, "(check-sat)\n").unwrap();
        assert!(missing.validate().is_ok());

        let directory = args(&["ddsmt", dir.path().to_str().unwrap(), output.to_str().unwrap(), "true"]);
        assert_eq!(directory.validate().unwrap_err().to_string(), "given input file is a directory");

        fs::write(&output, "").unwrap();
        assert_eq!(missing.validate().unwrap_err().to_string(), "given output file does already exist");

        let stdin = args(&["ddsmt", "-t", "0", "STDIN", "fresh.smt2", "true"]);
        assert!(stdin.validate().is_err());
    }

    #[test]
    fn test_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.smt2");
        let output = dir.path().join("out.smt2");
        let scratch = dir.path().join("scratch.smt2");
        fs::write(&input, "(set-logic QF_LIA)\n(declare-fun x () Int)\n(assert (> x 0))\n(assert (< x 5))\n(check-sat)\n")
            .unwrap();
        // passes while an upper bound on x is asserted
        let a = args(&[
            "ddsmt",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "sh",
            "-c",
            "grep -q '(assert (<' \"$DDSMT_SCRATCH\"",
        ]);
        run(&a, &scratch, Arc::new(AtomicBool::new(false))).unwrap();
        let out = fs::read_to_string(&output).unwrap();
        assert!(out.contains("(assert (<"));
        assert!(!out.contains("(assert (>"));
    }
}
