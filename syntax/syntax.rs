//! Syntactic elements of a positive rule language extended with
//! negation as failure: predicates, terms, literals, rules, and the
//! knowledge bases that collect them.
//!
//! The surface syntax is a small subset of the "ASP-Core-2 Input
//! Language Format" (2012); see the [`parser`] module. Everything
//! here is function-free: a term is a constant or a variable.

mod lexer;
mod parser;

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub use parser::{parse_literal, parse_program, ParseError};

/// Uninterpreted element that names itself, a predicate, or a variable.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: String) -> Self {
        Symbol(name)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(String::from(s))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Uninterpreted element that represents itself.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Constant {
    Name(Symbol),
    Number(i64),
}

impl Constant {
    /// Read a constant from untyped text (e.g., a CSV cell):
    /// integers are numbers, anything else is a name.
    pub fn parse_value(s: &str) -> Self {
        s.parse::<i64>()
            .map(Self::Number)
            .unwrap_or_else(|_| Self::from(s))
    }
}

impl From<&str> for Constant {
    fn from(s: &str) -> Self {
        Self::Name(Symbol::from(s))
    }
}

impl From<Symbol> for Constant {
    fn from(s: Symbol) -> Self {
        Self::Name(s)
    }
}

impl From<i64> for Constant {
    fn from(i: i64) -> Self {
        Self::Number(i)
    }
}

/// Names that would not read back as the same constant (e.g., `Foo`,
/// `42`, `hello world`) print as quoted strings.
impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(s) if is_identifier(s.name()) => f.write_fmt(format_args!("{s}")),
            Self::Name(s) => {
                f.write_str("\"")?;
                for c in s.name().chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        c => f.write_fmt(format_args!("{c}"))?,
                    }
                }
                f.write_str("\"")
            }
            Self::Number(i) => f.write_fmt(format_args!("{i}")),
        }
    }
}

/// Does `name` lex as a constant identifier (see `lexer::identifier`)?
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_lowercase() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// A constant, a universally quantified variable, or an existentially
/// quantified one (a head variable that does not occur in the body).
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Term {
    Constant(Constant),
    Variable(Symbol),
    Existential(Symbol),
}

impl Term {
    pub fn is_variable(&self) -> bool {
        !matches!(self, Self::Constant(_))
    }

    /// The variable's name, if this term is one.
    pub fn variable(&self) -> Option<&Symbol> {
        match self {
            Self::Constant(_) => None,
            Self::Variable(v) | Self::Existential(v) => Some(v),
        }
    }
}

impl<T: Into<Constant>> From<T> for Term {
    fn from(t: T) -> Self {
        Self::Constant(t.into())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => c.fmt(f),
            Self::Variable(v) => v.fmt(f),
            Self::Existential(v) => f.write_fmt(format_args!("!{v}")),
        }
    }
}

/// A predicate is identified by its name and its arity.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Predicate {
    pub name: Symbol,
    pub arity: usize,
}

impl Predicate {
    pub fn new(name: impl Into<Symbol>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}/{}", self.name, self.arity))
    }
}

/// Parse `name/arity`.
impl FromStr for Predicate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::Invalid(format!("expected `name/arity`, found `{s}`"));
        let (name, arity) = s.trim().rsplit_once('/').ok_or_else(invalid)?;
        let arity = arity.parse::<usize>().map_err(|_| invalid())?;
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(name, arity))
    }
}

/// An _n_-ary predicate applied to a tuple of terms.
/// If _n_ = 0, the arguments are elided.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Application<T> {
    pub predicate: Symbol,
    pub arguments: Vec<T>,
}

impl<T> Application<T> {
    pub fn new(predicate: Symbol, arguments: impl IntoIterator<Item = T>) -> Self {
        Self {
            predicate,
            arguments: arguments.into_iter().collect(),
        }
    }

    pub fn predicate(&self) -> Predicate {
        Predicate::new(self.predicate.clone(), self.arguments.len())
    }
}

impl Application<Term> {
    /// Iterate over the variables of this atom, in order, with repeats.
    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.arguments.iter().filter_map(Term::variable)
    }
}

impl<T> fmt::Display for Application<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Application {
            predicate,
            arguments,
        } = self;
        if arguments.is_empty() {
            predicate.fmt(f)
        } else {
            f.write_fmt(format_args!(
                "{}({})",
                predicate,
                arguments
                    .iter()
                    .map(|arg| arg.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            ))
        }
    }
}

/// A ground atom.
pub type GroundAtom = Application<Constant>;

/// An atom or its negation as failure.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Literal<T> {
    Positive(Application<T>),
    Negative(Application<T>),
}

impl<T> Literal<T> {
    /// Negation-as-failure semantics (without double negation).
    pub fn negate(self) -> Self {
        use Literal::*;
        match self {
            Positive(atom) => Negative(atom),
            Negative(atom) => Positive(atom),
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive(..))
    }

    pub fn is_negative(&self) -> bool {
        !self.is_positive()
    }

    pub fn atom(&self) -> &Application<T> {
        match self {
            Self::Positive(atom) | Self::Negative(atom) => atom,
        }
    }

    pub fn into_atom(self) -> Application<T> {
        match self {
            Self::Positive(atom) | Self::Negative(atom) => atom,
        }
    }

    pub fn predicate(&self) -> Predicate {
        self.atom().predicate()
    }
}

impl<T> fmt::Display for Literal<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Literal::*;
        match self {
            Positive(atom) => f.write_fmt(format_args!("{}", atom)),
            Negative(atom) => f.write_fmt(format_args!("not {}", atom)),
        }
    }
}

/// Rules have a disjunctive head and a conjunctive body.
/// At this level we'll just collect vectors.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rule<T> {
    pub head: Vec<Literal<T>>,
    pub body: Vec<Literal<T>>,
}

impl<T> Rule<T> {
    pub fn new(
        head: impl IntoIterator<Item = Literal<T>>,
        body: impl IntoIterator<Item = Literal<T>>,
    ) -> Self {
        Self {
            head: head.into_iter().collect(),
            body: body.into_iter().collect(),
        }
    }
}

impl Rule<Term> {
    /// The distinct variables of the body, in order of first occurrence.
    pub fn body_variables(&self) -> Vec<Symbol> {
        let mut seen = BTreeSet::new();
        self.body
            .iter()
            .flat_map(|l| l.atom().variables())
            .filter(|v| seen.insert(*v))
            .cloned()
            .collect()
    }
}

impl<T> fmt::Display for Rule<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self
            .head
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        if self.body.is_empty() {
            f.write_fmt(format_args!("{head}."))
        } else {
            let body = self
                .body
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            f.write_fmt(format_args!("{head} :- {body}."))
        }
    }
}

/// Where a data source reads its tuples from.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Source {
    /// One tuple per line, comma-separated.
    Csv(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(path) => f.write_fmt(format_args!("csv({:?})", path.display().to_string())),
        }
    }
}

/// A declaration that the extension of a predicate is to be
/// read from some external source.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DataSource {
    pub predicate: Predicate,
    pub source: Source,
}

impl DataSource {
    pub fn new(predicate: Predicate, source: Source) -> Self {
        Self { predicate, source }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let DataSource { predicate, source } = self;
        f.write_fmt(format_args!(
            "@source {}[{}]: {}.",
            predicate.name, predicate.arity, source
        ))
    }
}

/// The statements of a knowledge base.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Statement {
    Fact(GroundAtom),
    Rule(Rule<Term>),
    DataSource(DataSource),
}

impl Statement {
    /// The predicates this statement mentions.
    pub fn predicates(&self) -> Vec<Predicate> {
        match self {
            Self::Fact(atom) => vec![atom.predicate()],
            Self::Rule(Rule { head, body }) => head
                .iter()
                .chain(body.iter())
                .map(Literal::predicate)
                .collect(),
            Self::DataSource(DataSource { predicate, .. }) => vec![predicate.clone()],
        }
    }
}

impl From<GroundAtom> for Statement {
    fn from(fact: GroundAtom) -> Self {
        Self::Fact(fact)
    }
}

impl From<Rule<Term>> for Statement {
    fn from(rule: Rule<Term>) -> Self {
        Self::Rule(rule)
    }
}

impl From<DataSource> for Statement {
    fn from(source: DataSource) -> Self {
        Self::DataSource(source)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fact(atom) => f.write_fmt(format_args!("{atom}.")),
            Self::Rule(rule) => rule.fmt(f),
            Self::DataSource(source) => source.fmt(f),
        }
    }
}

/// An ordered collection of statements.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KnowledgeBase(Vec<Statement>);

impl KnowledgeBase {
    pub fn new<S: Into<Statement>>(statements: impl IntoIterator<Item = S>) -> Self {
        Self(statements.into_iter().map(Into::into).collect())
    }

    pub fn push(&mut self, statement: impl Into<Statement>) {
        self.0.push(statement.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every predicate mentioned anywhere in the knowledge base.
    pub fn predicates(&self) -> BTreeSet<Predicate> {
        self.iter().flat_map(Statement::predicates).collect()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule<Term>> {
        self.iter().filter_map(|s| match s {
            Statement::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    pub fn facts(&self) -> impl Iterator<Item = &GroundAtom> {
        self.iter().filter_map(|s| match s {
            Statement::Fact(fact) => Some(fact),
            _ => None,
        })
    }
}

impl IntoIterator for KnowledgeBase {
    type Item = Statement;
    type IntoIter = <Vec<Statement> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Statement> for KnowledgeBase {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in self.iter() {
            s.fmt(f)?;
            f.write_str("\n")?;
        }
        Ok(())
    }
}

/// Render syntax as Rust tokens.
/// See the `program!` proc macro.
#[cfg(feature = "to-rust")]
mod to_rust {
    use proc_macro2::TokenStream;
    use quote::{quote, ToTokens};

    use super::*;

    impl ToTokens for Symbol {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            let name = self.name();
            tokens.extend(quote!(::aspify_syntax::Symbol::from(#name)));
        }
    }

    impl ToTokens for Constant {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            tokens.extend(match self {
                Constant::Name(n) => quote!(::aspify_syntax::Constant::Name(#n)),
                Constant::Number(i) => quote!(::aspify_syntax::Constant::Number(#i)),
            });
        }
    }

    impl ToTokens for Term {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            tokens.extend(match self {
                Term::Constant(c) => quote!(::aspify_syntax::Term::Constant(#c)),
                Term::Variable(v) => quote!(::aspify_syntax::Term::Variable(#v)),
                Term::Existential(v) => quote!(::aspify_syntax::Term::Existential(#v)),
            })
        }
    }

    impl ToTokens for Predicate {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            let name = &self.name;
            let arity = self.arity;
            tokens.extend(quote!(::aspify_syntax::Predicate::new(#name, #arity)));
        }
    }

    impl<T: ToTokens> ToTokens for Application<T> {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            let predicate = &self.predicate;
            let arguments = &self.arguments;
            tokens
                .extend(quote!(::aspify_syntax::Application::new(#predicate, [#(#arguments),*])));
        }
    }

    impl<T: ToTokens> ToTokens for Literal<T> {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            tokens.extend(match self {
                Literal::Positive(atom) => quote!(::aspify_syntax::Literal::Positive(#atom)),
                Literal::Negative(atom) => quote!(::aspify_syntax::Literal::Negative(#atom)),
            });
        }
    }

    impl<T: ToTokens> ToTokens for Rule<T> {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            let head = &self.head;
            let body = &self.body;
            tokens.extend(quote!(::aspify_syntax::Rule::new([#(#head),*], [#(#body),*])));
        }
    }

    impl ToTokens for DataSource {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            let predicate = &self.predicate;
            let source = match &self.source {
                Source::Csv(path) => {
                    let path = path.display().to_string();
                    quote!(::aspify_syntax::Source::Csv(::std::path::PathBuf::from(#path)))
                }
            };
            tokens.extend(quote!(::aspify_syntax::DataSource::new(#predicate, #source)));
        }
    }

    impl ToTokens for Statement {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            tokens.extend(match self {
                Statement::Fact(atom) => quote!(::aspify_syntax::Statement::Fact(#atom)),
                Statement::Rule(rule) => quote!(::aspify_syntax::Statement::Rule(#rule)),
                Statement::DataSource(source) => {
                    quote!(::aspify_syntax::Statement::DataSource(#source))
                }
            })
        }
    }

    impl ToTokens for KnowledgeBase {
        fn to_tokens(&self, tokens: &mut TokenStream) {
            let statements = &self.0;
            tokens.extend(quote!(::aspify_syntax::KnowledgeBase::new::<
                ::aspify_syntax::Statement,
            >([#(#statements),*])));
        }
    }
}

/// These constructor macros can make tests involving syntactic elements
/// much more readable. They are *not* intended as a public interface,
/// and *should* be behind `#[cfg(test)]`, but [cargo can't currently
/// export test code across crates](https://github.com/rust-lang/cargo/issues/8379).
#[cfg(any(test, feature = "macros"))]
mod macros {
    #[macro_export]
    macro_rules! sym {
        ($name: ident) => {
            Symbol::from(stringify!($name))
        };
    }

    #[macro_export]
    macro_rules! var {
        ($name: ident) => {
            Term::Variable(sym!($name))
        };
    }

    #[macro_export]
    macro_rules! atom {
        ($pred: ident) => {
            Application::new(sym!($pred), [])
        };
        ($pred: ident($($arg: expr),* $(,)?)) => {
            Application::new(sym!($pred), [$($arg.into()),*])
        };
    }

    #[macro_export]
    macro_rules! pos {
        ($pred: ident $(($($args: tt)*))?) => {
            Literal::Positive(atom!($pred$(($($args)*))?))
        };
    }

    #[macro_export]
    macro_rules! neg {
        ($pred: ident $(($($args: tt)*))?) => {
            Literal::Negative(atom!($pred$(($($args)*))?))
        };
    }

    #[macro_export]
    macro_rules! fact {
        ($pred: ident $(($($arg: expr),* $(,)?))?) => {
            Statement::Fact(Application::<Constant>::new(sym!($pred), [$($($arg.into()),*)?]))
        };
    }

    #[macro_export]
    macro_rules! rule {
        ([$($head: expr),* $(,)?]) => {
            Statement::Rule(Rule::<Term>::new([$($head),*], []))
        };
        ([$($head: expr),* $(,)?], [$($body: expr),* $(,)?]) => {
            Statement::Rule(Rule::<Term>::new([$($head),*], [$($body),*]))
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        let rule = Rule::<Term>::new(
            [
                Literal::Positive(Application::new(
                    Symbol::from("a"),
                    [Term::Variable(Symbol::from("X"))],
                )),
                Literal::Positive(Application::new(Symbol::from("b"), [])),
            ],
            [
                Literal::Positive(Application::new(
                    Symbol::from("c"),
                    [Term::Variable(Symbol::from("X")), Term::from("d")],
                )),
                Literal::Negative(Application::new(
                    Symbol::from("e"),
                    [Term::Variable(Symbol::from("X"))],
                )),
            ],
        );
        assert_eq!(rule.to_string(), "a(X) | b :- c(X,d), not e(X).");
        assert_eq!(
            Statement::Fact(Application::new(
                Symbol::from("p"),
                [Constant::from("d"), Constant::from(3)]
            ))
            .to_string(),
            "p(d,3)."
        );
    }

    #[test]
    fn predicates() {
        let kb = KnowledgeBase::new([
            Statement::Fact(Application::new(Symbol::from("p"), [Constant::from(1)])),
            Statement::DataSource(DataSource::new(
                Predicate::new("q", 2),
                Source::Csv(PathBuf::from("q.csv")),
            )),
        ]);
        assert_eq!(
            kb.predicates(),
            BTreeSet::from([Predicate::new("p", 1), Predicate::new("q", 2)])
        );
        assert_eq!(kb.facts().count(), 1);
        assert_eq!(kb.rules().count(), 0);
    }

    #[test]
    fn body_variables() {
        let x = Term::Variable(Symbol::from("X"));
        let y = Term::Variable(Symbol::from("Y"));
        let rule = Rule::new(
            [Literal::Positive(Application::new(
                Symbol::from("h"),
                [x.clone()],
            ))],
            [
                Literal::Positive(Application::new(
                    Symbol::from("p"),
                    [y.clone(), x.clone(), Term::from("c")],
                )),
                Literal::Negative(Application::new(Symbol::from("q"), [x, y])),
            ],
        );
        assert_eq!(
            rule.body_variables(),
            vec![Symbol::from("Y"), Symbol::from("X")]
        );
    }

    #[test]
    fn predicate_from_str() {
        assert_eq!("p/2".parse::<Predicate>().ok(), Some(Predicate::new("p", 2)));
        assert_eq!("a/b/0".parse::<Predicate>().ok(), Some(Predicate::new("a/b", 0)));
        assert!("p".parse::<Predicate>().is_err());
        assert!("/1".parse::<Predicate>().is_err());
        assert!("p/x".parse::<Predicate>().is_err());
    }

    #[test]
    fn constant_values() {
        assert_eq!(Constant::parse_value("42"), Constant::Number(42));
        assert_eq!(Constant::parse_value("-7"), Constant::Number(-7));
        assert_eq!(Constant::parse_value("bob"), Constant::from("bob"));
    }
}
