//! A reference bottom-up reasoner for stratified programs.
//!
//! Facts and data sources seed the model; rules are then evaluated one
//! strongly connected component at a time, dependencies first, each to
//! a (naïve) fixpoint. Negation is only allowed across components,
//! where the negated predicate is already complete.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, space0},
    combinator::{all_consuming, map, opt, value},
    multi::{fold_many0, separated_list1},
    sequence::delimited,
    Finish, IResult,
};

use aspify_syntax::*;
use aspify_tracer::*;

use super::{
    Bindings, Groundable, GroundingError, PrecedenceGraph, Reasoner, ReasonerError, Safety,
};

/// The extension of every predicate: a set of argument tuples.
pub type Model = BTreeMap<Predicate, BTreeSet<Vec<Constant>>>;

#[derive(Clone, Debug)]
pub struct Materializer {
    model: Model,
    trace: Trace,
}

impl Default for Materializer {
    fn default() -> Self {
        Self::new(Trace::none())
    }
}

impl Materializer {
    pub fn new(trace: Trace) -> Self {
        Self {
            model: Model::new(),
            trace,
        }
    }

    /// The materialized consequences of the last call to `reason`.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Is this ground atom in the model?
    pub fn contains(&self, atom: &GroundAtom) -> bool {
        self.model
            .get(&atom.predicate())
            .map(|tuples| tuples.contains(&atom.arguments))
            .unwrap_or(false)
    }

    fn insert(&mut self, atom: GroundAtom) -> bool {
        let predicate = atom.predicate();
        self.model.entry(predicate).or_default().insert(atom.arguments)
    }

    fn load(&mut self, source: &DataSource) -> Result<(), ReasonerError> {
        let DataSource { predicate, source } = source;
        match source {
            Source::Csv(path) => {
                let text = fs::read_to_string(path).map_err(|source| {
                    ReasonerError::DataSource {
                        path: path.clone(),
                        source,
                    }
                })?;
                let tuples = self.model.entry(predicate.clone()).or_default();
                for (i, line) in text.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let row = csv_row(line)
                        .filter(|row| row.len() == predicate.arity)
                        .ok_or_else(|| ReasonerError::MalformedRow {
                            path: path.clone(),
                            line: i + 1,
                            arity: predicate.arity,
                        })?;
                    tuples.insert(row.iter().map(|cell| Constant::parse_value(cell)).collect());
                }
            }
        }
        Ok(())
    }

    /// All bindings of the body's variables that satisfy every body
    /// literal in the current model.
    fn matches(&self, body: &[Literal<Term>]) -> Result<Vec<Bindings>, ReasonerError> {
        let mut bindings = vec![Bindings::new()];
        for literal in body.iter().filter(|l| l.is_positive()) {
            let atom = literal.atom();
            let tuples = match self.model.get(&atom.predicate()) {
                Some(tuples) => tuples,
                None => return Ok(Vec::new()),
            };
            bindings = bindings
                .iter()
                .flat_map(|b| tuples.iter().filter_map(move |t| unify(atom, t, b)))
                .collect();
            if bindings.is_empty() {
                break;
            }
        }

        let mut satisfied = Vec::with_capacity(bindings.len());
        'bindings: for b in bindings {
            for literal in body.iter().filter(|l| l.is_negative()) {
                if self.contains(&literal.atom().ground_with(&b).map_err(unbound)?) {
                    continue 'bindings;
                }
            }
            satisfied.push(b);
        }
        Ok(satisfied)
    }

    /// Apply `rules` until nothing new is derived.
    fn fixpoint(&mut self, rules: &[&Rule<Term>]) -> Result<(), ReasonerError> {
        loop {
            let mut derived = Vec::new();
            for rule in rules {
                for bindings in self.matches(&rule.body)? {
                    for head in &rule.head {
                        derived.push(head.atom().ground_with(&bindings).map_err(unbound)?);
                    }
                }
            }

            let mut changed = false;
            for atom in derived {
                changed |= self.insert(atom);
            }
            if !changed {
                return Ok(());
            }
        }
    }
}

impl Reasoner for Materializer {
    fn reason(&mut self, kb: &KnowledgeBase) -> Result<(), ReasonerError> {
        self.model.clear();
        for statement in kb.iter() {
            match statement {
                Statement::Fact(atom) => {
                    self.insert(atom.clone());
                }
                Statement::DataSource(source) => self.load(source)?,
                Statement::Rule(rule) => {
                    if let Some(v) = rule
                        .head
                        .iter()
                        .flat_map(|l| l.atom().arguments.iter())
                        .find_map(|t| match t {
                            Term::Existential(v) => Some(v),
                            _ => None,
                        })
                    {
                        return Err(ReasonerError::Existential(v.clone()));
                    }
                    rule.check_safety().map_err(unbound)?;
                }
            }
        }

        // Dependencies first: reverse the order that Tarjan completes.
        let graph = PrecedenceGraph::new(kb);
        let components = graph.components();
        let mut position = BTreeMap::new();
        for (i, component) in components.iter().rev().enumerate() {
            if let Some(p) = component
                .iter()
                .find(|p| graph.negative_successors(p).any(|q| component.contains(q)))
            {
                return Err(ReasonerError::Unstratifiable(p.clone()));
            }
            for p in component {
                position.insert(p.clone(), i);
            }
        }

        // Each rule belongs to the earliest component among its heads;
        // all of its body predicates come before (or in) that one.
        let mut strata = vec![Vec::new(); components.len()];
        for rule in kb.rules() {
            if let Some(i) = rule.head.iter().map(|l| position[&l.predicate()]).min() {
                strata[i].push(rule);
            }
        }
        for (i, rules) in strata.iter().enumerate() {
            if !rules.is_empty() {
                self.fixpoint(rules)?;
                trace!(self.trace, Ground, "Materialized stratum {i} ({} rules)", rules.len());
            }
        }

        trace!(
            self.trace,
            Ground,
            "Materialized {} tuples over {} predicates",
            self.model.values().map(BTreeSet::len).sum::<usize>(),
            self.model.len()
        );
        Ok(())
    }

    fn answer_query(&self, query: &Application<Term>) -> Result<Vec<Vec<Constant>>, ReasonerError> {
        Ok(self
            .model
            .get(&query.predicate())
            .into_iter()
            .flat_map(|tuples| tuples.iter())
            .filter(|t| unify(query, t, &Bindings::new()).is_some())
            .cloned()
            .collect())
    }
}

/// Extend `bindings` so that `atom` matches `tuple`, if possible.
fn unify(atom: &Application<Term>, tuple: &[Constant], bindings: &Bindings) -> Option<Bindings> {
    if atom.arguments.len() != tuple.len() {
        return None;
    }
    let mut bindings = bindings.clone();
    for (term, value) in atom.arguments.iter().zip(tuple) {
        match term {
            Term::Constant(c) if c == value => (),
            Term::Constant(_) => return None,
            Term::Variable(v) | Term::Existential(v) => match bindings.get(v) {
                Some(bound) if bound == value => (),
                Some(_) => return None,
                None => {
                    bindings.insert(v.clone(), value.clone());
                }
            },
        }
    }
    Some(bindings)
}

fn unbound(error: GroundingError) -> ReasonerError {
    match error {
        GroundingError::UnboundVariable(v) | GroundingError::UnsafeVariable(v, _) => {
            ReasonerError::UnsafeVariable(v)
        }
        e => ReasonerError::Other(e.to_string()),
    }
}

/// A double-quoted CSV field, in which `""` stands for one quote.
fn quoted_field(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((is_not("\""), value("\"", tag("\"\"")))),
            String::new,
            |mut field, part| {
                field.push_str(part);
                field
            },
        ),
        char('"'),
    )(input)
}

fn field(input: &str) -> IResult<&str, String> {
    alt((
        delimited(space0, quoted_field, space0),
        map(opt(is_not(",")), |cell: Option<&str>| {
            cell.unwrap_or_default().trim().to_owned()
        }),
    ))(input)
}

/// The fields of one CSV line, or `None` if it is malformed.
fn csv_row(line: &str) -> Option<Vec<String>> {
    all_consuming(separated_list1(char(','), field))(line)
        .finish()
        .ok()
        .map(|(_, row)| row)
}
