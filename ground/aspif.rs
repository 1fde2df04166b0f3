//! Emit the over-approximated part of a knowledge base as a ground
//! program in the ASPIF text format:
//!
//! ```text
//! asp 1 0 0                     header
//! 1 0 1 <head> 0 <n> <lits..>   normal rule (n = 0 for a fact)
//! 4 <len> <name> 1 <id>         output: atom <id> prints as <name>
//! 0                             end of program
//! ```

use std::collections::BTreeSet;
use std::io::{self, Write};

use aspify_syntax::*;
use aspify_tracer::*;

use super::{
    Analysis, Approximation, GroundRule, GroundingError, GroundingTemplate, Reasoner, Registry,
};

/// Write ASPIF records. Every atom is announced with an output record
/// the first time it appears, just before the rule that mentions it.
pub struct AspifWriter<W: Write> {
    out: W,
    names: Option<BTreeSet<Predicate>>,
    announced: BTreeSet<i32>,
}

impl<W: Write> AspifWriter<W> {
    /// If `names` is given, atoms over those predicates are output under
    /// their printed names, e.g., `p(d,c)`. All others are output under
    /// their own identifier, so that a reader can map the solver's
    /// answers back through the registry.
    pub fn new(out: W, names: Option<BTreeSet<Predicate>>) -> Self {
        Self {
            out,
            names,
            announced: BTreeSet::new(),
        }
    }

    pub fn header(&mut self) -> io::Result<()> {
        writeln!(self.out, "asp 1 0 0")
    }

    fn announce(&mut self, id: i32, registry: &Registry) -> io::Result<()> {
        let id = id.abs();
        if !self.announced.insert(id) {
            return Ok(());
        }
        let name = match (&self.names, registry.reverse_lookup(id)) {
            (Some(names), Some(atom)) if names.contains(&atom.predicate()) => atom.to_string(),
            _ => id.to_string(),
        };
        writeln!(self.out, "4 {} {} 1 {}", name.len(), name, id)
    }

    pub fn rule(&mut self, rule: &GroundRule, registry: &Registry) -> io::Result<()> {
        self.announce(rule.head, registry)?;
        for &lit in &rule.body {
            self.announce(lit, registry)?;
        }
        writeln!(self.out, "{rule}")
    }

    /// Terminate the program and flush the output.
    pub fn end(&mut self) -> io::Result<()> {
        writeln!(self.out, "0")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Analyze and rewrite a knowledge base once, then ground it (any
/// number of times) against a reasoner.
#[derive(Clone, Debug)]
pub struct AspifGrounder {
    kb: KnowledgeBase,
    analysis: Analysis,
    approximation: Approximation,
    names: Option<BTreeSet<Predicate>>,
    trace: Trace,
}

impl AspifGrounder {
    pub fn new(kb: KnowledgeBase, trace: Trace) -> Result<Self, GroundingError> {
        let analysis = Analysis::new(&kb, trace);
        Self::from_analysis(kb, analysis, trace)
    }

    /// Use a precomputed (or hand-picked) set of approximated predicates.
    pub fn from_analysis(
        kb: KnowledgeBase,
        analysis: Analysis,
        trace: Trace,
    ) -> Result<Self, GroundingError> {
        let approximation = Approximation::new(&kb, &analysis, trace)?;
        Ok(Self {
            kb,
            analysis,
            approximation,
            names: None,
            trace,
        })
    }

    /// Request printed names for atoms over these predicates.
    pub fn with_names(mut self, names: impl IntoIterator<Item = Predicate>) -> Self {
        self.names = Some(names.into_iter().collect());
        self
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn approximation(&self) -> &Approximation {
        &self.approximation
    }

    /// Materialize the over-approximation with `reasoner`, then write
    /// the ground program to `out`, registering every atom it mentions
    /// in `registry`. Only over-approximated statements contribute.
    pub fn ground<R, W>(
        &self,
        reasoner: &mut R,
        registry: &mut Registry,
        out: W,
    ) -> Result<(), GroundingError>
    where
        R: Reasoner + ?Sized,
        W: Write,
    {
        reasoner.reason(self.approximation.program())?;

        let mut writer = AspifWriter::new(out, self.names.clone());
        let mut rules = 0;
        writer.header()?;
        for (i, statement) in self.kb.iter().enumerate() {
            match statement {
                Statement::Fact(atom) if self.analysis.is_approximated(&atom.predicate()) => {
                    let head = registry.atom_id(atom.clone())?;
                    writer.rule(&GroundRule { head, body: vec![] }, registry)?;
                    rules += 1;
                }
                Statement::Rule(rule) => {
                    let frontier = match self.approximation.frontier(i) {
                        Some(frontier) => frontier,
                        None => continue,
                    };
                    let template = GroundingTemplate::new(rule, frontier, |p| {
                        self.analysis.is_approximated(p)
                    })?;
                    let answers = reasoner.answer_query(frontier)?;
                    trace!(self.trace, Ground, "{} bindings for `{}`", answers.len(), rule);
                    for answer in answers {
                        for ground in template.instantiate(&answer, registry)? {
                            writer.rule(&ground, registry)?;
                            rules += 1;
                        }
                    }
                }
                Statement::DataSource(source)
                    if self.analysis.is_approximated(&source.predicate) =>
                {
                    let Predicate { name, arity } = &source.predicate;
                    let query = Application::new(
                        name.clone(),
                        (0..*arity).map(|j| Term::Variable(Symbol::new(format!("V{j}")))),
                    );
                    for tuple in reasoner.answer_query(&query)? {
                        let head = registry.atom_id(GroundAtom::new(name.clone(), tuple))?;
                        writer.rule(&GroundRule { head, body: vec![] }, registry)?;
                        rules += 1;
                    }
                }
                _ => (),
            }
        }
        writer.end()?;
        trace!(
            self.trace,
            Ground,
            "Ground program: {rules} rules over {} atoms",
            registry.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Materializer;

    fn ground(grounder: &AspifGrounder, registry: &mut Registry) -> String {
        let mut out = Vec::new();
        grounder
            .ground(&mut Materializer::default(), registry, &mut out)
            .expect("ground");
        String::from_utf8(out).expect("utf-8")
    }

    fn grounder(text: &str) -> AspifGrounder {
        AspifGrounder::new(parse_program(text).expect("parse"), Trace::none()).expect("grounder")
    }

    /// Force the given predicates to be approximated.
    fn forced(text: &str, approximated: &[Predicate]) -> AspifGrounder {
        let analysis = Analysis {
            approximated: approximated.iter().cloned().collect(),
            ..Analysis::default()
        };
        AspifGrounder::from_analysis(parse_program(text).expect("parse"), analysis, Trace::none())
            .expect("grounder")
    }

    const CHOICE: &str = "d(1). d(2).
                          a(X) :- d(X), not b(X).
                          b(X) :- d(X), not a(X).";

    #[test]
    fn facts() {
        let grounder = forced("p(d, c). p(c, c).", &[Predicate::new("p", 2)]);
        let mut registry = Registry::new();
        assert_eq!(
            ground(&grounder, &mut registry),
            "asp 1 0 0\n4 1 1 1 1\n1 0 1 1 0 0\n4 1 2 1 2\n1 0 1 2 0 0\n0\n"
        );
        let ids = registry.into_literals();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[&1], atom!(p("d", "c")));
        assert_eq!(ids[&2], atom!(p("c", "c")));
    }

    #[test]
    fn rules() {
        let mut registry = Registry::new();
        assert_eq!(
            ground(&grounder(CHOICE), &mut registry),
            "asp 1 0 0\n\
             4 1 1 1 1\n4 1 2 1 2\n1 0 1 1 0 1 -2\n\
             4 1 3 1 3\n4 1 4 1 4\n1 0 1 3 0 1 -4\n\
             1 0 1 2 0 1 -1\n\
             1 0 1 4 0 1 -3\n\
             0\n"
        );
        assert_eq!(registry.reverse_lookup(2), Some(&atom!(b(1))));
    }

    #[test]
    fn names() {
        let grounder = grounder(CHOICE).with_names([Predicate::new("a", 1)]);
        let mut registry = Registry::new();
        let text = ground(&grounder, &mut registry);
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[1..4], ["4 4 a(1) 1 1", "4 1 2 1 2", "1 0 1 1 0 1 -2"]);
    }

    #[test]
    fn nothing_to_ground() {
        let mut registry = Registry::new();
        let text = ground(&grounder("p(1). q(X) :- p(X), not r(X)."), &mut registry);
        assert_eq!(text, "asp 1 0 0\n0\n");
        assert!(registry.is_empty());
    }

    #[test]
    fn deterministic() {
        let grounder = grounder(CHOICE);
        let mut registry = Registry::new();
        let first = ground(&grounder, &mut registry);
        registry.reset();
        let second = ground(&grounder, &mut registry);
        assert_eq!(first, second);
    }

    #[test]
    fn bodies_are_approximated() {
        let grounder = grounder(
            "n(1). n(2). n(3). small(1).
             in(X) :- n(X), not small(X), not out(X).
             out(X) :- n(X), not in(X).
             big(X) :- in(X), n(X).",
        );
        let mut registry = Registry::new();
        let text = ground(&grounder, &mut registry);
        let analysis = grounder.analysis();
        let mut rules = 0;
        for line in text.lines().filter(|l| l.starts_with("1 0 1 ")) {
            let ids = line
                .split(' ')
                .skip(6)
                .map(|id| id.parse::<i32>().expect("id"))
                .collect::<Vec<_>>();
            for id in ids {
                let atom = registry.reverse_lookup(id).expect("registered");
                assert!(analysis.is_approximated(&atom.predicate()), "{atom} in {line}");
            }
            rules += 1;
        }
        // in(2), in(3), out(1..3), big(2), big(3).
        assert_eq!(rules, 7);
        assert!(!text.contains("small"));
    }

    #[test]
    fn data_source() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "1\n2").expect("write");
        let text = format!("@source e[1]: csv({:?}).", file.path().display().to_string());
        let grounder = forced(&text, &[Predicate::new("e", 1)]);
        let mut registry = Registry::new();
        assert_eq!(
            ground(&grounder, &mut registry),
            "asp 1 0 0\n4 1 1 1 1\n1 0 1 1 0 0\n4 1 2 1 2\n1 0 1 2 0 0\n0\n"
        );
        assert_eq!(registry.reverse_lookup(2), Some(&atom!(e(2))));
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure() {
        let mut registry = Registry::new();
        let result = grounder(CHOICE).ground(&mut Materializer::default(), &mut registry, Broken);
        assert!(matches!(result, Err(GroundingError::Io(_))));
    }
}
