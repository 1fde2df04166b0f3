//! Lexical elements: whitespace and comments, names, numbers, strings.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{char, digit1, hex_digit1, multispace1, none_of, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize, value},
    multi::{many0, many0_count, many1},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use crate::Symbol;

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('%'), opt(is_not("\r\n"))))(input)
}

/// Skip any amount of whitespace and `%` comments.
pub(crate) fn space(input: &str) -> IResult<&str, ()> {
    value((), many0_count(alt((multispace1, comment))))(input)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn name_tail(input: &str) -> IResult<&str, &str> {
    recognize(many0_count(satisfy(is_name_char)))(input)
}

/// A constant or predicate name: starts with a lowercase letter or `_`.
pub(crate) fn identifier(input: &str) -> IResult<&str, Symbol> {
    let (input, name) = recognize(pair(
        satisfy(|c| c.is_lowercase() || c == '_'),
        name_tail,
    ))(input)?;
    Ok((input, Symbol::new(name.to_owned())))
}

/// A variable name: starts with an uppercase letter.
pub(crate) fn variable(input: &str) -> IResult<&str, Symbol> {
    let (input, name) = recognize(pair(satisfy(char::is_uppercase), name_tail))(input)?;
    Ok((input, Symbol::new(name.to_owned())))
}

/// A reserved word that is not the prefix of a longer name.
pub(crate) fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(peek(satisfy(is_name_char))))
}

// TODO: remove when escaped_transform handles opt(..).
// Needs investigation, probably related to nom#{1118,1336}.
fn empty_string(input: &str) -> IResult<&str, String> {
    map(tag(r#""""#), |_| String::new())(input)
}

fn quoted_string(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        escaped_transform(
            none_of(r#"\""#),
            '\\',
            alt((
                value("\\", tag("\\")),
                value("\"", tag("\"")),
                value("\n", tag("n")),
                value("\r", tag("r")),
                value("\t", tag("t")),
            )),
        ),
        char('"'),
    )(input)
}

pub(crate) fn string(input: &str) -> IResult<&str, String> {
    alt((empty_string, quoted_string))(input)
}

#[allow(clippy::from_str_radix_10)]
fn decimal(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(many1(terminated(digit1, many0(char('_'))))),
        |digits: &str| i64::from_str_radix(&digits.replace('_', ""), 10),
    )(input)
}

fn hexadecimal(input: &str) -> IResult<&str, i64> {
    map_res(
        preceded(
            alt((tag("0x"), tag("0X"))),
            recognize(many1(terminated(hex_digit1, many0(char('_'))))),
        ),
        |digits: &str| i64::from_str_radix(&digits.replace('_', ""), 16),
    )(input)
}

/// An optionally negated integer. A space may separate the sign
/// from the digits, as it does when Rust tokens are rendered.
pub(crate) fn integer(input: &str) -> IResult<&str, i64> {
    let (input, sign) = opt(terminated(char('-'), space))(input)?;
    let (input, magnitude) = alt((hexadecimal, decimal))(input)?;
    Ok((input, if sign.is_some() { -magnitude } else { magnitude }))
}
