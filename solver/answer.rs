//! Parse the solver's textual output into answer sets.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::io::BufRead;

use aspify_ground::{Groundable, IdMap};
use aspify_syntax::*;
use aspify_tracer::*;

use super::{Outcome, SolverError, SolverOutput};

/// What the solver said about the program as a whole.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReasoningState {
    Satisfiable,
    Unsatisfiable,
    /// Stopped (e.g., by a timeout) before the search was complete.
    Interrupted,
    /// The solver could not be run, or its output could not be read.
    Error,
    /// No status line (yet).
    #[default]
    Unknown,
}

impl ReasoningState {
    fn from_status(line: &str) -> Option<Self> {
        use ReasoningState::*;
        [
            ("SATISFIABLE", Satisfiable),
            ("UNSATISFIABLE", Unsatisfiable),
            ("INTERRUPTED", Interrupted),
            ("UNKNOWN", Unknown),
        ]
        .into_iter()
        .find_map(|(prefix, state)| line.starts_with(prefix).then_some(state))
    }
}

impl fmt::Display for ReasoningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Satisfiable => "SATISFIABLE",
            Self::Unsatisfiable => "UNSATISFIABLE",
            Self::Interrupted => "INTERRUPTED",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// The atoms true in one model, grouped by predicate.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AnswerSet(BTreeMap<Predicate, BTreeSet<GroundAtom>>);

impl AnswerSet {
    pub fn all_literals(&self) -> impl Iterator<Item = &GroundAtom> {
        self.0.values().flatten()
    }

    pub fn literals_of(&self, predicate: &Predicate) -> impl Iterator<Item = &GroundAtom> {
        self.0.get(predicate).into_iter().flatten()
    }

    /// The argument tuples of every atom over `predicate`.
    pub fn query_predicate(&self, predicate: &Predicate) -> impl Iterator<Item = &[Constant]> {
        self.literals_of(predicate).map(|atom| atom.arguments.as_slice())
    }

    /// The argument tuples of every atom matching `query`: constant
    /// arguments must match exactly, variables match anything.
    pub fn query<'a>(
        &'a self,
        query: &'a Application<Term>,
    ) -> impl Iterator<Item = &'a [Constant]> + 'a {
        self.query_predicate(&query.predicate()).filter(move |tuple| {
            query.arguments.iter().zip(tuple.iter()).all(|(term, value)| match term {
                Term::Constant(c) => c == value,
                Term::Variable(_) | Term::Existential(_) => true,
            })
        })
    }

    pub fn contains(&self, atom: &GroundAtom) -> bool {
        self.0
            .get(&atom.predicate())
            .map(|atoms| atoms.contains(atom))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<GroundAtom> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = GroundAtom>>(iter: I) -> Self {
        let mut atoms = BTreeMap::<_, BTreeSet<_>>::new();
        for atom in iter {
            atoms.entry(atom.predicate()).or_default().insert(atom);
        }
        Self(atoms)
    }
}

impl fmt::Display for AnswerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "{{{}}}",
            self.all_literals()
                .map(|atom| atom.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }
}

/// The answer sets of one solver run. All output is read up front;
/// each answer set is decoded as it is taken from the stream. `None`
/// marks an `Answer:` line that the output ended after.
#[derive(Clone, Debug)]
pub struct AnswerSetStream {
    state: ReasoningState,
    pending: VecDeque<Option<String>>,
    ids: IdMap,
}

impl AnswerSetStream {
    /// The stream of a run that failed before any output was parsed.
    pub fn error() -> Self {
        Self {
            state: ReasoningState::Error,
            pending: VecDeque::new(),
            ids: IdMap::new(),
        }
    }

    /// Read solver output: the line after each `Answer:` line lists the
    /// atoms of one answer set; the last status line sets the state.
    pub fn parse(input: impl BufRead, ids: IdMap, trace: Trace) -> Result<Self, SolverError> {
        let mut state = ReasoningState::Unknown;
        let mut pending = VecDeque::new();
        let mut answer = false;
        for line in input.lines() {
            let line = line?;
            if answer {
                pending.push_back(Some(line));
                answer = false;
            } else if line.starts_with("Answer:") {
                answer = true;
            } else if let Some(status) = ReasoningState::from_status(&line) {
                trace!(trace, Parse, "Solver status: {line}");
                state = status;
            }
        }
        if answer {
            trace!(trace, Parse, "Output ended before the last answer set");
            pending.push_back(None);
        }
        trace!(trace, Parse, "{} answer sets, {state}", pending.len());
        Ok(Self { state, pending, ids })
    }

    /// Parse the output of a finished solver process. A run that timed
    /// out without reporting a status counts as interrupted.
    pub fn from_output(output: SolverOutput, ids: IdMap, trace: Trace) -> Result<Self, SolverError> {
        let mut stream = Self::parse(output.text.as_bytes(), ids, trace)?;
        if let (Outcome::TimedOut(_), ReasoningState::Unknown) = (output.outcome, stream.state) {
            stream.state = ReasoningState::Interrupted;
        }
        Ok(stream)
    }

    pub fn state(&self) -> ReasoningState {
        self.state
    }

    /// Atoms are normally named by their identifiers, but may also be
    /// printed ground atoms (see `AspifWriter`).
    fn decode(&self, line: &str) -> Result<AnswerSet, SolverError> {
        tokens(line)
            .into_iter()
            .map(|token| match token.parse::<i32>() {
                Ok(id) => self.ids.get(&id).cloned().ok_or(SolverError::UnknownId(id)),
                Err(_) => match parse_literal(token) {
                    Ok(Literal::Positive(atom)) => atom
                        .ground()
                        .map_err(|_| SolverError::MalformedId(token.to_owned())),
                    _ => Err(SolverError::MalformedId(token.to_owned())),
                },
            })
            .collect()
    }
}

/// Split a model line on whitespace outside of quoted strings.
fn tokens(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let (mut quoted, mut escaped) = (false, false);
    for (i, c) in line.char_indices() {
        if quoted {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => quoted = false,
                _ => (),
            }
        } else if c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(&line[s..i]);
            }
        } else {
            start.get_or_insert(i);
            quoted = c == '"';
        }
    }
    if let Some(s) = start {
        tokens.push(&line[s..]);
    }
    tokens
}

impl Iterator for AnswerSetStream {
    type Item = Result<AnswerSet, SolverError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(match self.pending.pop_front()? {
            Some(line) => self.decode(&line),
            None => Err(SolverError::TruncatedAnswer),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.pending.len(), Some(self.pending.len()))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    fn ids() -> IdMap {
        IdMap::from([
            (1, atom!(p("d", "c"))),
            (2, atom!(q("d"))),
            (3, atom!(q("c"))),
        ])
    }

    fn parse(text: &str) -> AnswerSetStream {
        AnswerSetStream::parse(text.as_bytes(), ids(), Trace::none()).expect("parse")
    }

    #[test]
    fn answer_sets() {
        let mut stream = parse("SATISFIABLE\nAnswer: 1\n1 2\nAnswer: 2\n1 3\n");
        assert_eq!(stream.state(), ReasoningState::Satisfiable);
        let first = stream.next().expect("first").expect("decode");
        let second = stream.next().expect("second").expect("decode");
        assert!(stream.next().is_none());
        assert_eq!(first, AnswerSet::from_iter([atom!(p("d", "c")), atom!(q("d"))]));
        assert_eq!(second, AnswerSet::from_iter([atom!(p("d", "c")), atom!(q("c"))]));
        assert_eq!(first.to_string(), "{p(d,c), q(d)}");
    }

    #[test]
    fn clasp_transcript() {
        let stream = parse(
            "clasp version 3.3.10\nReading from stdin\nSolving...\n\
             Answer: 1\n1 3\nAnswer: 2\n\nSATISFIABLE\n\n\
             Models       : 2\nCalls        : 1\n",
        );
        assert_eq!(stream.state(), ReasoningState::Satisfiable);
        let answers = stream.collect::<Result<Vec<_>, _>>().expect("decode");
        assert_eq!(answers.len(), 2);
        assert!(answers[1].is_empty());
    }

    #[test]
    fn truncated() {
        let mut stream = parse("Answer: 1\n1 2\nAnswer: 2\n");
        assert_eq!(stream.size_hint(), (2, Some(2)));
        assert!(matches!(stream.next(), Some(Ok(answer)) if answer.len() == 2));
        assert!(matches!(stream.next(), Some(Err(SolverError::TruncatedAnswer))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn unsatisfiable() {
        let mut stream = parse("UNSATISFIABLE\n");
        assert_eq!(stream.state(), ReasoningState::Unsatisfiable);
        assert!(stream.next().is_none());
    }

    #[test]
    fn no_status() {
        assert_eq!(parse("").state(), ReasoningState::Unknown);
        let output = SolverOutput {
            text: String::from("Solving...\n"),
            outcome: Outcome::TimedOut(Duration::from_secs(1)),
        };
        let stream = AnswerSetStream::from_output(output, ids(), Trace::none()).expect("parse");
        assert_eq!(stream.state(), ReasoningState::Interrupted);
    }

    #[test]
    fn error() {
        let mut stream = AnswerSetStream::error();
        assert_eq!(stream.state(), ReasoningState::Error);
        assert!(stream.next().is_none());
    }

    #[test]
    fn bad_ids() {
        let mut stream = parse("Answer: 1\n1 7\nAnswer: 2\n1 x(\n");
        assert!(matches!(stream.next(), Some(Err(SolverError::UnknownId(7)))));
        assert!(matches!(stream.next(), Some(Err(SolverError::MalformedId(t))) if t == "x("));
    }

    #[test]
    fn named_atoms() {
        let mut stream = parse("Answer: 1\np(d,c) 2\nSATISFIABLE\n");
        let answer = stream.next().expect("answer").expect("decode");
        assert!(answer.contains(&atom!(p("d", "c"))));
        assert!(answer.contains(&atom!(q("d"))));
    }

    #[test]
    fn quoted_names() {
        let mut stream = parse("Answer: 1\np(\"Foo\",\"hello world\")  q(\"a \\\" b\") 3\n");
        let answer = stream.next().expect("answer").expect("decode");
        assert_eq!(
            answer,
            AnswerSet::from_iter([
                atom!(p("Foo", "hello world")),
                atom!(q("a \" b")),
                atom!(q("c")),
            ])
        );
        assert_eq!(tokens(" 1  2 "), ["1", "2"]);
    }

    #[test]
    fn queries() {
        let answer = AnswerSet::from_iter([
            atom!(p("d", "c")),
            atom!(p("c", "c")),
            atom!(p("c", "d")),
            atom!(q("d")),
        ]);
        let p = Predicate::new("p", 2);
        assert_eq!(answer.len(), 4);
        assert_eq!(answer.literals_of(&p).count(), 3);
        assert_eq!(answer.query_predicate(&Predicate::new("q", 1)).count(), 1);
        assert_eq!(answer.query_predicate(&Predicate::new("q", 2)).count(), 0);

        let query: Application<Term> = atom!(p(var!(X), "c"));
        let tuples = answer.query(&query).collect::<Vec<_>>();
        assert_eq!(tuples.len(), 2);
        assert!(tuples.iter().all(|t| t[1] == Constant::from("c")));

        // Repeated variables are still wildcards.
        let query: Application<Term> = atom!(p(var!(X), var!(X)));
        assert_eq!(answer.query(&query).count(), 3);
    }
}
