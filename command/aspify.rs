//! Read a program; ground its non-stratifiable part, solve it
//! with clasp, and print the answer sets.

use std::fs::read_to_string;
use std::io::{stdin, stdout, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use atty::Stream;
use clap::Parser;

use aspify_ground::{Materializer, Registry};
use aspify_semantics::{format_answer, AspifCompiler};
use aspify_solver::{ClaspConfig, SolveMode};
use aspify_syntax::{parse_literal, parse_program, GroundAtom, Literal, Predicate};
use aspify_tracer::Trace;

#[derive(Parser)]
#[command(name = "aspify")]
#[command(about = "Answer set semantics for programs with non-stratifiable negation, via clasp")]
struct Args {
    /// Program file; standard input if absent or `-`
    file: Option<String>,

    /// Solver executable
    #[arg(long, env = "ASPIF_CLASP", default_value = "clasp")]
    clasp: PathBuf,

    /// Maximum number of answer sets (0 = all)
    #[arg(short = 'n', long, default_value = "0")]
    models: usize,

    /// Compute the cautious consequences instead of enumerating answer sets
    #[arg(long)]
    cautious: bool,

    /// Kill the solver after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the ground program and exit
    #[arg(long)]
    emit_aspif: bool,

    /// Output atoms of this predicate (`name/arity`) by name
    #[arg(long, value_name = "PREDICATE")]
    show: Vec<Predicate>,

    /// Print only the atoms that match this one in each answer set
    #[arg(long)]
    query: Option<String>,

    /// Trace levels, e.g., `analyze,ground` or `all`
    #[arg(long, value_parser = Trace::from_levels)]
    trace: Option<Trace>,
}

impl Args {
    fn config(&self) -> ClaspConfig {
        ClaspConfig {
            executable: self.clasp.clone(),
            mode: if self.cautious {
                SolveMode::Cautious
            } else {
                SolveMode::Enumerate {
                    max_models: self.models,
                }
            },
            timeout: self.timeout.map(Duration::from_secs),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let trace = args.trace.unwrap_or_else(Trace::none);
    if args.file.is_none() && atty::is(Stream::Stdin) && atty::is(Stream::Stdout) {
        println!("Welcome to aspify! Please enter your program, terminated with Ctrl-D.");
    }
    let input = read_file(args.file.as_deref())?;
    let kb = parse_program(&input).context("Parsing program")?;
    let query = args
        .query
        .as_deref()
        .map(parse_literal)
        .transpose()
        .context("Parsing query")?
        .map(Literal::into_atom);

    let mut compiler = AspifCompiler::new(kb, trace)?;
    if !args.show.is_empty() {
        compiler = compiler.with_names(args.show.iter().cloned());
    }
    let mut reasoner = Materializer::new(trace);
    if args.emit_aspif {
        compiler.ground(&mut reasoner, &mut Registry::new(), stdout().lock())?;
        return Ok(());
    }

    let stream = compiler
        .try_run(&mut reasoner, &args.config())
        .with_context(|| format!("Solving with {}", args.clasp.display()))?;
    let state = stream.state();
    for (i, answer) in stream.enumerate() {
        let answer = answer?;
        match &query {
            None => println!("{}", format_answer(&answer)),
            Some(query) => {
                println!("Answer {}:", i + 1);
                for tuple in answer.query(query) {
                    println!("  {}", GroundAtom::new(query.predicate().name, tuple.to_vec()));
                }
            }
        }
    }
    println!("{state}");
    Ok(())
}

/// Read a file or standard input and return the content as a string.
fn read_file(filename: Option<&str>) -> Result<String> {
    match filename {
        None | Some("-") => {
            let mut buffer = String::new();
            stdin()
                .read_to_string(&mut buffer)
                .context("Reading from stdin")?;
            Ok(buffer)
        }
        Some(filename) => read_to_string(filename).with_context(|| format!("Reading {filename}")),
    }
}
