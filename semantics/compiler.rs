//! Ground a knowledge base with negation into ASPIF, hand the ground
//! program to clasp, and read its answer sets back.
//!
//! Only the part of the program that bottom-up reasoning can't decide
//! (the predicates on or downstream of a cycle through negation) goes
//! to the solver; the rest is left to the [`Reasoner`], which also
//! materializes the over-approximation that bounds the grounding.

use std::io::{BufWriter, Write};

use thiserror::Error;

use aspify_ground::*;
use aspify_solver::*;
use aspify_syntax::*;
use aspify_tracer::*;

#[derive(Debug, Error)]
pub enum AspError {
    #[error(transparent)]
    Grounding(#[from] GroundingError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Searching for an answer set may fail.
pub type AnswerResult = Result<AnswerSet, SolverError>;

pub fn format_answer(answer: &AnswerSet) -> String {
    answer.to_string()
}

pub struct AspifCompiler {
    grounder: AspifGrounder,
    trace: Trace,
}

impl AspifCompiler {
    pub fn new(kb: KnowledgeBase, trace: Trace) -> Result<Self, AspError> {
        trace!(trace, Parse, "Preparing program:\n{}", kb);
        let grounder = AspifGrounder::new(kb, trace)?;
        Ok(Self { grounder, trace })
    }

    /// Output atoms over these predicates under their printed names.
    pub fn with_names(mut self, names: impl IntoIterator<Item = Predicate>) -> Self {
        self.grounder = self.grounder.with_names(names);
        self
    }

    pub fn grounder(&self) -> &AspifGrounder {
        &self.grounder
    }

    /// Write the ground program.
    pub fn ground<R, W>(
        &self,
        reasoner: &mut R,
        registry: &mut Registry,
        out: W,
    ) -> Result<(), AspError>
    where
        R: Reasoner + ?Sized,
        W: Write,
    {
        Ok(self.grounder.ground(reasoner, registry, out)?)
    }

    /// Ground the program into a fresh clasp process and solve it.
    pub fn try_run<R>(
        &self,
        reasoner: &mut R,
        config: &ClaspConfig,
    ) -> Result<AnswerSetStream, AspError>
    where
        R: Reasoner + ?Sized,
    {
        self.solve(reasoner, ClaspProcess::spawn(config, self.trace)?)
    }

    /// Ground the program into an already running solver process
    /// and collect its answer sets.
    pub fn solve<R>(
        &self,
        reasoner: &mut R,
        mut process: ClaspProcess,
    ) -> Result<AnswerSetStream, AspError>
    where
        R: Reasoner + ?Sized,
    {
        let mut registry = Registry::new();
        let grounded = process.input().map_err(AspError::from).and_then(|input| {
            self.ground(reasoner, &mut registry, BufWriter::new(input))
        });
        if let Err(e) = grounded {
            process.close()?;
            return Err(e);
        }
        trace!(self.trace, Ground, "Registered {} atoms", registry.len());

        let output = process.solve()?;
        Ok(AnswerSetStream::from_output(
            output,
            registry.into_literals(),
            self.trace,
        )?)
    }

    /// Like [`try_run`](Self::try_run), but any failure yields the
    /// (empty) error stream.
    pub fn run<R>(&self, reasoner: &mut R, config: &ClaspConfig) -> AnswerSetStream
    where
        R: Reasoner + ?Sized,
    {
        self.try_run(reasoner, config).unwrap_or_else(|e| {
            trace!(self.trace, Solve, "Solving failed: {e}");
            AnswerSetStream::error()
        })
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::process::Command;
    use std::time::{Duration, Instant};

    use super::*;

    const CHOICE: &str = "d(1). d(2).
                          a(X) :- d(X), not b(X).
                          b(X) :- d(X), not a(X).";

    fn compiler(text: &str) -> AspifCompiler {
        AspifCompiler::new(parse_program(text).expect("parse"), Trace::none()).expect("compiler")
    }

    fn sh(script: &str) -> ClaspProcess {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        ClaspProcess::spawn_command(command, None, Trace::none()).expect("spawn")
    }

    #[test]
    fn format() {
        let answer = AnswerSet::from_iter([atom!(b("c")), atom!(a)]);
        assert_eq!(format_answer(&answer), "{a, b(c)}");
        assert_eq!(format_answer(&AnswerSet::default()), "{}");
    }

    #[cfg(unix)]
    #[test]
    fn stand_in() {
        let compiler = compiler(CHOICE);
        let process = sh("cat >/dev/null; printf 'Answer: 1\\n1 3\\nAnswer: 2\\n2 4\\nSATISFIABLE\\n'; exit 10");
        let stream = compiler
            .solve(&mut Materializer::default(), process)
            .expect("solve");
        assert_eq!(stream.state(), ReasoningState::Satisfiable);
        let answers = stream.collect::<Result<Vec<_>, _>>().expect("answers");
        assert_eq!(
            answers.iter().map(format_answer).collect::<Vec<_>>(),
            ["{a(1), a(2)}", "{b(1), b(2)}"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn grounding_failure_closes_the_solver() {
        let compiler = compiler("@source e[1]: csv(\"/nonexistent/aspify.csv\"). e(X) :- e(X), not e(X).");
        let process = sh("exec sleep 10");
        assert!(matches!(
            compiler.solve(&mut Materializer::default(), process),
            Err(AspError::Grounding(GroundingError::Reasoner(_)))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_covers_grounding() {
        let mut text = (0..20_000).map(|i| format!("d({i}). ")).collect::<String>();
        text.push_str(CHOICE);
        let compiler = compiler(&text);
        let timeout = Duration::from_millis(200);
        let mut command = Command::new("sh");
        command.arg("-c").arg("exec sleep 8");
        let process = ClaspProcess::spawn_command(command, Some(timeout), Trace::none())
            .expect("spawn");
        let start = Instant::now();
        let stream = compiler
            .solve(&mut Materializer::default(), process)
            .expect("solve");
        assert!(start.elapsed() < Duration::from_secs(4));
        assert_eq!(stream.state(), ReasoningState::Interrupted);
    }

    #[test]
    fn missing_solver() {
        let config = ClaspConfig {
            executable: PathBuf::from("/nonexistent/clasp"),
            ..ClaspConfig::default()
        };
        let compiler = compiler(CHOICE);
        assert!(matches!(
            compiler.try_run(&mut Materializer::default(), &config),
            Err(AspError::Solver(SolverError::Spawn { .. }))
        ));
        let mut stream = compiler.run(&mut Materializer::default(), &config);
        assert_eq!(stream.state(), ReasoningState::Error);
        assert!(stream.next().is_none());
    }
}
