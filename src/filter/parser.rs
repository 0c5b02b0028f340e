//! Filter expression parser using nom.

use super::ast::*;
use crate::core::{Result, TopographError};
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, not, opt, peek, recognize, value as nom_value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// Parse a filter expression string into an AST
pub fn parse_filter_expression(input: &str) -> Result<FilterExpression> {
    let input = input.trim();

    if input.is_empty() {
        return Ok(FilterExpression::All);
    }

    match filter_expression(input) {
        Ok((remaining, expression)) => {
            if !remaining.trim().is_empty() {
                Err(TopographError::parse(format!(
                    "Unexpected input after filter: '{}'",
                    remaining
                )))
            } else {
                Ok(expression)
            }
        },
        Err(e) => Err(TopographError::parse(format!("Failed to parse filter: {}", e))),
    }
}

/// Parse a filter expression and flatten it into the conjunction of filters
/// a topology request carries. Disjunctions cannot be expressed there and are
/// rejected.
pub fn parse_filters(input: &str) -> Result<Vec<Filter>> {
    let expression = parse_filter_expression(input)?;
    let mut filters = Vec::new();
    flatten_conjunction(expression, &mut filters)?;
    Ok(filters)
}

fn flatten_conjunction(expression: FilterExpression, out: &mut Vec<Filter>) -> Result<()> {
    match expression {
        FilterExpression::All => Ok(()),
        FilterExpression::Comparison(filter) => {
            out.push(filter);
            Ok(())
        },
        FilterExpression::Group(inner) => flatten_conjunction(*inner, out),
        FilterExpression::Logical {
            op: LogicalOp::And,
            left,
            right,
        } => {
            flatten_conjunction(*left, out)?;
            flatten_conjunction(*right, out)
        },
        FilterExpression::Logical {
            op: LogicalOp::Or,
            left,
            right,
        } => Err(TopographError::parse(format!(
            "'||' is not supported in root filters: {} || {}",
            left, right
        ))),
    }
}

/// Parse a filter expression (the main expression)
fn filter_expression(input: &str) -> IResult<&str, FilterExpression> {
    logical_or(input)
}

/// Parse logical OR expressions
fn logical_or(input: &str) -> IResult<&str, FilterExpression> {
    let (input, first) = logical_and(input)?;

    let (input, rest) = many0(tuple((
        preceded(multispace0, tag("||")),
        preceded(multispace0, logical_and),
    )))(input)?;

    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, (_, right)| FilterExpression::Logical {
                op: LogicalOp::Or,
                left: Box::new(acc),
                right: Box::new(right),
            }),
    ))
}

/// Parse logical AND expressions
fn logical_and(input: &str) -> IResult<&str, FilterExpression> {
    let (input, first) = primary_expression(input)?;

    let (input, rest) = many0(tuple((
        preceded(multispace0, tag("&&")),
        preceded(multispace0, primary_expression),
    )))(input)?;

    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, (_, right)| FilterExpression::Logical {
                op: LogicalOp::And,
                left: Box::new(acc),
                right: Box::new(right),
            }),
    ))
}

fn primary_expression(input: &str) -> IResult<&str, FilterExpression> {
    preceded(multispace0, alt((grouped_expression, comparison)))(input)
}

fn grouped_expression(input: &str) -> IResult<&str, FilterExpression> {
    map(
        delimited(
            char('('),
            preceded(multispace0, filter_expression),
            preceded(multispace0, char(')')),
        ),
        |expression| FilterExpression::Group(Box::new(expression)),
    )(input)
}

fn comparison(input: &str) -> IResult<&str, FilterExpression> {
    map(
        tuple((attribute_key, preceded(multispace0, operator), preceded(multispace0, filter_value))),
        |(key, operator, value)| FilterExpression::Comparison(Filter { key, operator, value }),
    )(input)
}

/// Parse attribute keys (e.g., name, http.status_code)
fn attribute_key(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            many0(pair(char('.'), take_while1(|c: char| c.is_alphanumeric() || c == '_'))),
        )),
        |s: &str| s.to_string(),
    )(input)
}

fn operator(input: &str) -> IResult<&str, Operator> {
    alt((
        nom_value(Operator::Like, tag("=~")),
        nom_value(Operator::NotEquals, tag("!=")),
        nom_value(Operator::GreaterThanOrEqualTo, tag(">=")),
        nom_value(Operator::LessThanOrEqualTo, tag("<=")),
        nom_value(Operator::Equals, tag("=")),
        nom_value(Operator::GreaterThan, tag(">")),
        nom_value(Operator::LessThan, tag("<")),
        nom_value(Operator::Contains, tag_no_case("contains")),
    ))(input)
}

fn filter_value(input: &str) -> IResult<&str, Value> {
    alt((
        map(duration_millis, |millis| Value::DurationMillis { millis }),
        map(boolean_value, Value::Boolean),
        map(integer_value, Value::Integer),
        map(string_literal, Value::String),
    ))(input)
}

/// Parse string literals (quoted or unquoted for simple identifiers)
fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        map(delimited(char('"'), take_while1(|c| c != '"'), char('"')), |s: &str| {
            s.to_string()
        }),
        map(
            take_while1(|c: char| {
                c.is_alphanumeric() || c == '_' || c == '-' || c == '/' || c == '.'
            }),
            |s: &str| s.to_string(),
        ),
    ))(input)
}

/// Parse duration values (e.g., 100ms, 1s, 5m) into milliseconds
fn duration_millis(input: &str) -> IResult<&str, u64> {
    map_res(pair(digit1, duration_unit_divisor), |(num_str, (mul, div)): (&str, (u64, u64))| {
        num_str.parse::<u64>().map(|n| n.saturating_mul(mul) / div)
    })(input)
}

/// Returns (multiplier, divisor) converting the unit to milliseconds
fn duration_unit_divisor(input: &str) -> IResult<&str, (u64, u64)> {
    terminated(
        alt((
            nom_value((1, 1_000_000), tag("ns")),
            nom_value((1, 1_000), tag("us")),
            nom_value((1, 1), tag("ms")),
            nom_value((1_000, 1), tag("s")),
            nom_value((60_000, 1), tag("m")),
        )),
        peek(not(take_while1(|c: char| c.is_alphanumeric() || c == '_'))),
    )(input)
}

fn boolean_value(input: &str) -> IResult<&str, bool> {
    terminated(
        alt((nom_value(true, tag_no_case("true")), nom_value(false, tag_no_case("false")))),
        peek(not(take_while1(|c: char| c.is_alphanumeric() || c == '_'))),
    )(input)
}

fn integer_value(input: &str) -> IResult<&str, i64> {
    map_res(
        terminated(
            recognize(pair(opt(char('-')), digit1)),
            peek(not(take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.'))),
        ),
        |s: &str| s.parse::<i64>(),
    )(input)
}
