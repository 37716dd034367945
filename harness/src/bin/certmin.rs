//! `certmin`: run a certified minimization and print the result.
//!
//! Usage:
//!
//! ```text
//! certmin residue --count 8 --arity 2 --out bundle/
//! certmin verify bundle/
//! ```
//!
//! Output: key=value lines. Diagnostics go to stderr via `RUST_LOG`.

use std::path::PathBuf;
use std::process::ExitCode;

use certmin_harness::bundle_dir::{verify_bundle_dir, write_bundle_dir};
use certmin_harness::runner::{run_proof, ProofBundleV1};
use certmin_harness::worlds::residue_sieve::{CandidateSet, ResidueGuide, ResidueSieve};
use certmin_kernel::choice::Choice;
use certmin_search::arena::UNBOUNDED;
use certmin_search::policy::ProverPolicyV1;
use certmin_search::prover::ProofOutcome;
use certmin_search::strategy::{FewestCasesStrategy, FirstGroupStrategy, ProofStrategy};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// certmin: certified branch-and-bound minimization.
#[derive(Parser)]
#[command(name = "certmin", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Certify the fewest residue questions that identify a hidden integer.
    Residue(ResidueArgs),
    /// Verify a bundle directory written by `residue --out`.
    Verify {
        dir: PathBuf,
    },
}

#[derive(Args)]
struct ResidueArgs {
    /// Comma-separated candidate integers.
    #[arg(long, value_delimiter = ',', conflicts_with = "count")]
    candidates: Option<Vec<u64>>,
    /// Use candidates `0..count`.
    #[arg(long, default_value_t = 6)]
    count: u64,
    /// Groups are `(x, y)` for `x, y < arity`.
    #[arg(long, default_value_t = 2)]
    arity: u8,
    /// Root-level cut as `x,y,p`.
    #[arg(long, value_parser = parse_choice)]
    cut: Option<Choice>,
    #[arg(long, value_enum, default_value_t = StrategyArg::ResidueGuide)]
    strategy: StrategyArg,
    #[command(flatten)]
    policy: PolicyArgs,
    /// Write the proof bundle to this directory.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Also run the brute-force reference and report whether it agrees.
    #[arg(long)]
    check: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    ResidueGuide,
    FewestCases,
    FirstGroup,
}

/// Overrides for `ProverPolicyV1`; unset flags keep the defaults.
#[derive(Args)]
struct PolicyArgs {
    #[arg(long)]
    arena_capacity: Option<usize>,
    #[arg(long)]
    max_rounds: Option<usize>,
    #[arg(long)]
    initial_expansions: Option<usize>,
    #[arg(long)]
    max_proof_steps: Option<usize>,
    #[arg(long)]
    pool_abort_threshold: Option<usize>,
    #[arg(long)]
    max_bound_iterations: Option<usize>,
}

impl PolicyArgs {
    fn to_policy(&self) -> ProverPolicyV1 {
        let d = ProverPolicyV1::default();
        ProverPolicyV1 {
            arena_capacity: self.arena_capacity.unwrap_or(d.arena_capacity),
            max_rounds: self.max_rounds.unwrap_or(d.max_rounds),
            initial_expansions: self.initial_expansions.unwrap_or(d.initial_expansions),
            max_proof_steps: self.max_proof_steps.unwrap_or(d.max_proof_steps),
            pool_abort_threshold: self.pool_abort_threshold.unwrap_or(d.pool_abort_threshold),
            max_bound_iterations: self.max_bound_iterations.unwrap_or(d.max_bound_iterations),
            ..d
        }
    }
}

fn parse_choice(s: &str) -> Result<Choice, String> {
    let parts: Vec<u8> = s
        .split(',')
        .map(|part| part.trim().parse::<u8>().map_err(|e| format!("{part:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match parts[..] {
        [x, y, p] => Ok(Choice::new(x, y, p)),
        _ => Err(format!("expected x,y,p, got {s:?}")),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Residue(args) => run_residue(args),
        Command::Verify { dir } => run_verify(&dir),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_residue(args: ResidueArgs) -> Result<(), Box<dyn std::error::Error>> {
    let world = match args.candidates {
        Some(values) => ResidueSieve::new(args.arity, values)?,
        None => ResidueSieve::first_n(args.arity, args.count)?,
    };
    let strategy: &dyn ProofStrategy<CandidateSet> = match args.strategy {
        StrategyArg::ResidueGuide => &ResidueGuide,
        StrategyArg::FewestCases => &FewestCasesStrategy,
        StrategyArg::FirstGroup => &FirstGroupStrategy,
    };
    let run = run_proof(&world, strategy, args.cut, args.policy.to_policy())?;
    print_run(&run);

    if args.check {
        let reference = world.brute_force_minimum();
        println!("brute_force={reference}");
        // A cut certifies a subtree, which the reference does not cover.
        if args.cut.is_none() {
            println!("agrees={}", run.value() == Some(reference));
        }
    }
    if let Some(dir) = args.out {
        write_bundle_dir(&run.bundle, &dir)?;
        println!("bundle_dir={}", dir.display());
    }
    Ok(())
}

fn print_run(run: &ProofBundleV1) {
    match &run.outcome {
        ProofOutcome::Certified(cert) => {
            println!("status=certified");
            println!("value={}", cert.value);
            println!("subject={}", cert.subject.get());
            println!("rounds={}", cert.rounds);
            println!("arena_len={}", cert.arena_len);
            for aggregate in &cert.breakdown {
                println!("group={} bracket={}", aggregate.group, aggregate.bracket);
            }
        }
        ProofOutcome::Inconclusive {
            rounds,
            subject_bracket,
        } => {
            println!("status=inconclusive");
            println!("rounds={rounds}");
            println!("lower={}", subject_bracket.lower);
            if subject_bracket.upper != UNBOUNDED {
                println!("upper={}", subject_bracket.upper);
            }
        }
    }
    if let Ok(digest) = run.log.digest() {
        println!("proof_log_digest={}", digest.as_str());
    }
    println!("outcome_digest={}", run.outcome_digest.as_str());
    println!("bundle_digest={}", run.bundle.digest.as_str());
}

fn run_verify(dir: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = verify_bundle_dir(dir)?;
    println!("verified=true");
    println!("artifact_count={}", bundle.artifacts.len());
    println!("bundle_digest={}", bundle.digest.as_str());
    Ok(())
}
