//! A small LOGO interpreter whose turtle is a [`tortoise::TurtleState`].
//!
//! Besides the usual logo commands (`forward`, `right`, `penup`, and so on), the tortoise's
//! own primitives are available under their own names: `reset`, `pen-up`, `pen-down`,
//! `turn` and `move`. Unlike the logo commands, these output what the turtle reports back
//! (the previous pen state, the new heading in degrees, or the new position).

use nom::error::ErrorKind;

pub mod parse;
mod proc;
pub mod typ;

pub use parse::ParseError;
pub use proc::{Procedure, UserProc};
pub use typ::{Env, EvalError, Expr, ExprKind, Op};

/// Parse a whole program.
pub fn program(input: &str) -> Result<Expr, ParseError<'_>> {
    match parse::program(input.into()) {
        Ok((_, prog)) => Ok(prog),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(e),
        // Our parsers are all complete, but just in case...
        Err(nom::Err::Incomplete(_)) => Err(nom::error::Error::new(
            parse::Span::from(input),
            ErrorKind::Complete,
        )),
    }
}

/// Describe where (and roughly why) parsing failed.
pub fn describe_parse_error(e: &ParseError) -> String {
    format!(
        "Parse error at {}:{}: {:?}",
        e.input.location_line(),
        e.input.get_utf8_column(),
        e.code,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tortoise::{DrawCmd, RecordingSink};

    fn run(src: &str) -> (Result<Option<Expr>, EvalError>, Env, RecordingSink) {
        let sink = RecordingSink::new();
        let mut env = Env::new(sink.clone());
        let res = program(src).unwrap().eval(&mut env);
        (res, env, sink)
    }

    fn nums(s: &str) -> Vec<f64> {
        s.trim_matches(|c| c == '[' || c == ']')
            .split_whitespace()
            .map(|x| x.parse().unwrap())
            .collect()
    }

    fn approx(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn primitives_output_values() {
        let (res, mut env, sink) =
            run("show pen-up show pen-down show turn 90 show turn 45 show move 2 print pos");
        assert!(res.unwrap().is_none());

        let printed = env.take_printed();
        assert_eq!(printed.len(), 6);
        assert_eq!(printed[0], "true");
        assert_eq!(printed[1], "false");
        assert!(approx(&nums(&printed[2]), &[90.0]));
        assert!(approx(&nums(&printed[3]), &[135.0]));

        let s = 2f64.sqrt();
        assert!(printed[4].starts_with('['));
        assert!(approx(&nums(&printed[4]), &[-s, s]));
        assert!(!printed[5].starts_with('['));
        assert!(approx(&nums(&printed[5]), &[-s, s]));

        assert_eq!(sink.lines().len(), 1);
        assert!(env.take_printed().is_empty());
    }

    #[test]
    fn logo_commands_drive_the_turtle() {
        let (res, env, sink) = run("cs fd 3 lt 90 fd 1 rt 90 bk 1 pu fd 10 pd");
        res.unwrap();

        let t = env.turtle();
        assert!(t.is_pen_down());
        assert!(approx(&[t.heading_degrees()], &[0.0]));
        let p = t.position();
        assert!(approx(&[p.x, p.y], &[12.0, 1.0]));

        let cmds = sink.commands();
        assert_eq!(cmds.len(), 4);
        assert_eq!(cmds[0], DrawCmd::Clear);
        let (from, to) = sink.lines()[2];
        assert!(approx(&[from.x, from.y, to.x, to.y], &[3.0, 1.0, 2.0, 1.0]));
    }

    #[test]
    fn reset_outputs_nothing() {
        let (res, env, sink) = run("fd 1 rt 30 pu reset");
        assert!(res.unwrap().is_none());
        assert_eq!(env.turtle(), &tortoise::TurtleState::new());
        assert_eq!(sink.clears(), 1);
    }

    #[test]
    fn user_procedures() {
        let (res, mut env, sink) = run(
            "to square :side
  repeat 4 [fd :side lt 90]
end
make \"n 2
square :n * 1.5
print heading",
        );
        res.unwrap();
        assert_eq!(sink.lines().len(), 4);
        assert!(approx(&nums(&env.take_printed()[0]), &[360.0]));
        let p = env.turtle().position();
        assert!(approx(&[p.x, p.y], &[0.0, 0.0]));
    }

    #[test]
    fn unused_outputs_are_errors() {
        let (res, _, sink) = run("move 1 turn 90");
        assert!(matches!(res, Err(EvalError::UnusedVal(_))));
        assert_eq!(sink.lines().len(), 1);
    }

    #[test]
    fn subtraction_without_spaces() {
        let (res, env, sink) = run("make \"x 5 fd :x-1 rt 90 fd 5-2");
        assert!(res.unwrap().is_none());
        let (from, to) = sink.lines()[0];
        assert!(approx(&[from.x, from.y, to.x, to.y], &[0.0, 0.0, 4.0, 0.0]));
        let p = env.turtle().position();
        assert!(approx(&[p.x, p.y], &[4.0, -3.0]));
    }

    #[test]
    fn parse_errors_have_locations() {
        let e = program("fd 10\nrepeat 4 [fd 1").unwrap_err();
        assert!(describe_parse_error(&e).starts_with("Parse error at 2:"));
    }
}
