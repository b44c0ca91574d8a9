use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{
        alpha1, alphanumeric1, anychar, char, line_ending, multispace0, multispace1, space0,
    },
    combinator::{all_consuming, consumed, map, map_opt, recognize, verify},
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use std::rc::Rc;

use crate::{
    proc::UserProc,
    typ::{Expr, ExprKind, Op},
};

pub type Span<'a> = nom_locate::LocatedSpan<&'a str>;
pub type ParseError<'a> = nom::error::Error<Span<'a>>;

fn ws<'a, F: 'a, O>(inner: F) -> impl FnMut(Span<'a>) -> IResult<Span<'a>, O>
where
    F: FnMut(Span<'a>) -> IResult<Span<'a>, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn ws_no_newline<'a, F: 'a, O>(inner: F) -> impl FnMut(Span<'a>) -> IResult<Span<'a>, O>
where
    F: FnMut(Span<'a>) -> IResult<Span<'a>, O>,
{
    delimited(space0, inner, space0)
}

fn with_span<'a, F: 'a>(inner: F) -> impl FnMut(Span<'a>) -> IResult<Span<'a>, Expr>
where
    F: FnMut(Span<'a>) -> IResult<Span<'a>, ExprKind>,
{
    map(consumed(inner), |(input, kind): (Span, ExprKind)| {
        let start = input.location_offset();
        Expr {
            kind,
            span: start..start + input.fragment().len(),
        }
    })
}

const RESERVED: &[&str] = &["to", "end"];

// A letter, then letters and digits. Dashes are allowed in the middle, as long as a letter
// follows: `pen-up` is a single word, but in `:x-1` the name stops at `x`.
fn ident(input: Span) -> IResult<Span, String> {
    let dashed = recognize(pair(char('-'), alpha1));
    let name = recognize(pair(alpha1, many0(alt((alphanumeric1, dashed)))));
    verify(map(name, |s: Span| s.to_string()), |s: &str| {
        !RESERVED.contains(&s)
    })(input)
}

pub fn word(input: Span) -> IResult<Span, Expr> {
    with_span(map(ident, ExprKind::Word))(input)
}

pub fn param(input: Span) -> IResult<Span, Expr> {
    with_span(map(preceded(char(':'), ident), ExprKind::Var))(input)
}

pub fn num(input: Span) -> IResult<Span, Expr> {
    with_span(map(double, ExprKind::Num))(input)
}

pub fn op(input: Span) -> IResult<Span, Expr> {
    with_span(map(map_opt(anychar, Op::from_char), ExprKind::Op))(input)
}

// An operator stuck to the end of an item is always binary, so `:x-1` and `5-1` are
// subtractions. A `-` with a space before it and a digit after is the sign of a number:
// `fd -1` moves backwards.
pub fn bare_list(input: Span) -> IResult<Span, Expr> {
    with_span(map(
        pair(expr, many0(alt((op, preceded(multispace0, expr))))),
        |(first, mut rest)| {
            rest.insert(0, first);
            ExprKind::List(rest)
        },
    ))(input)
}

pub fn list(input: Span) -> IResult<Span, Expr> {
    with_span(map(
        delimited(char('('), ws(bare_list), char(')')),
        |expr| expr.kind,
    ))(input)
}

pub fn quoted_list(input: Span) -> IResult<Span, Expr> {
    with_span(map(
        delimited(char('['), ws(bare_list), char(']')),
        |expr| ExprKind::Quote(Box::new(expr)),
    ))(input)
}

pub fn quote(input: Span) -> IResult<Span, Expr> {
    with_span(map(preceded(char('"'), expr), |expr| {
        ExprKind::Quote(Box::new(expr))
    }))(input)
}

pub fn proc_def(input: Span) -> IResult<Span, Expr> {
    with_span(map(
        tuple((
            terminated(tag("to"), multispace1),
            ws_no_newline(ident),
            many0(ws_no_newline(preceded(char(':'), ident))),
            line_ending,
            ws(bare_list),
            tag("end"),
        )),
        |(_to, name, params, _newline, body, _end)| {
            ExprKind::Define(Rc::new(UserProc { name, params, body }))
        },
    ))(input)
}

// Words come before numbers, so that `inf` and `nan` are names rather than numbers.
pub fn expr(input: Span) -> IResult<Span, Expr> {
    alt((proc_def, word, num, op, list, quoted_list, quote, param))(input)
}

pub fn program(input: Span) -> IResult<Span, Expr> {
    all_consuming(ws(bare_list))(input)
}
