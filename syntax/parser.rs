//! Parse the textual rule language with [nom](https://crates.io/crates/nom).
//!
//! ```text
//! % comment
//! p(d, c).
//! a(X) | b(X) :- c(X), not d(X).
//! @source e[2]: csv("edges.csv").
//! ```
//!
//! Whitespace may appear between any two tokens.

use std::path::PathBuf;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{all_consuming, map, opt},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    Finish, IResult,
};
use thiserror::Error;

use crate::lexer::{identifier, integer, keyword, space, string, variable};
use crate::{
    Application, Constant, DataSource, KnowledgeBase, Literal, Predicate, Rule, Source,
    Statement, Symbol, Term,
};

/// Things that may go wrong while parsing.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("syntax error near `{0}`")]
    Syntax(String),
    #[error("{0}")]
    Invalid(String),
}

impl ParseError {
    fn near(input: &str) -> Self {
        let snippet = input.trim_start().chars().take(40).collect::<String>();
        Self::Syntax(if snippet.is_empty() {
            String::from("end of input")
        } else {
            snippet
        })
    }
}

/// Parse a whole program.
pub fn parse_program(input: &str) -> Result<KnowledgeBase, ParseError> {
    all_consuming(terminated(many0(statement), space))(input)
        .finish()
        .map(|(_, statements)| KnowledgeBase::new(statements))
        .map_err(|e| ParseError::near(e.input))
}

/// Parse a single (possibly negated) literal, e.g., a query.
/// A trailing period is allowed.
pub fn parse_literal(input: &str) -> Result<Literal<Term>, ParseError> {
    all_consuming(terminated(literal, preceded(space, opt(char('.')))))(input)
        .finish()
        .map(|(_, literal)| literal)
        .map_err(|e| ParseError::near(e.input))
        .and_then(|literal| {
            if literal.atom().arguments.iter().any(|t| matches!(t, Term::Existential(_))) {
                Err(ParseError::Invalid(format!(
                    "existential variable in literal `{literal}`"
                )))
            } else {
                Ok(literal)
            }
        })
}

/// Skip leading space, then expect a single character.
fn token<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    preceded(space, char(c))
}

fn term(input: &str) -> IResult<&str, Term> {
    preceded(
        space,
        alt((
            map(preceded(pair(char('!'), space), variable), Term::Existential),
            map(variable, Term::Variable),
            map(integer, |i| Term::Constant(Constant::Number(i))),
            map(identifier, |s| Term::Constant(Constant::Name(s))),
            map(string, |s| Term::Constant(Constant::Name(Symbol::new(s)))),
        )),
    )(input)
}

fn atom(input: &str) -> IResult<&str, Application<Term>> {
    map(
        pair(
            preceded(space, identifier),
            opt(delimited(
                token('('),
                separated_list0(token(','), term),
                token(')'),
            )),
        ),
        |(predicate, arguments)| Application::new(predicate, arguments.unwrap_or_default()),
    )(input)
}

fn literal(input: &str) -> IResult<&str, Literal<Term>> {
    alt((
        map(preceded(preceded(space, keyword("not")), atom), Literal::Negative),
        map(atom, Literal::Positive),
    ))(input)
}

fn rule(input: &str) -> IResult<&str, Rule<Term>> {
    map(
        tuple((
            separated_list1(token('|'), map(atom, Literal::Positive)),
            opt(preceded(
                preceded(space, tag(":-")),
                separated_list1(token(','), literal),
            )),
            token('.'),
        )),
        |(head, body, _)| Rule::new(head, body.unwrap_or_default()),
    )(input)
}

fn data_source(input: &str) -> IResult<&str, DataSource> {
    map(
        tuple((
            token('@'),
            preceded(space, keyword("source")),
            preceded(space, identifier),
            delimited(token('['), preceded(space, integer), token(']')),
            token(':'),
            preceded(space, keyword("csv")),
            delimited(token('('), preceded(space, string), token(')')),
            token('.'),
        )),
        |(_, _, name, arity, _, _, path, _)| {
            DataSource::new(
                Predicate::new(name, arity.unsigned_abs() as usize),
                Source::Csv(PathBuf::from(path)),
            )
        },
    )(input)
}

/// A body-less rule with a single, ground head is a fact.
fn statement(input: &str) -> IResult<&str, Statement> {
    alt((
        map(data_source, Statement::DataSource),
        map(rule, |rule| match as_fact(&rule) {
            Some(fact) => Statement::Fact(fact),
            None => Statement::Rule(rule),
        }),
    ))(input)
}

fn as_fact(rule: &Rule<Term>) -> Option<Application<Constant>> {
    match (rule.head.as_slice(), rule.body.is_empty()) {
        ([Literal::Positive(atom)], true) => atom
            .arguments
            .iter()
            .map(|t| match t {
                Term::Constant(c) => Some(c.clone()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(|arguments| Application::new(atom.predicate.clone(), arguments)),
        _ => None,
    }
}
