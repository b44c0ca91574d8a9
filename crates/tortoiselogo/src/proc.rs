//! Procedures: the ones written in logo, and the builtin ones that drive the tortoise.

use std::{fmt, rc::Rc};

use tortoise::kurbo::Point;

use crate::{
    typ::{write_items, EvalResult},
    Env, EvalError, Expr, ExprKind,
};

/// A procedure defined with `to ... end`.
#[derive(Debug, PartialEq)]
pub struct UserProc {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

/// Something that can be called by name.
#[derive(Clone, Debug)]
pub enum Procedure {
    Builtin(&'static Builtin),
    User(Rc<UserProc>),
}

impl Procedure {
    pub fn builtin(name: &str) -> Option<Procedure> {
        BUILTINS
            .iter()
            .find(|b| b.name == name)
            .map(Procedure::Builtin)
    }

    pub fn name(&self) -> &str {
        match self {
            Procedure::Builtin(b) => b.name,
            Procedure::User(p) => &p.name,
        }
    }

    /// How many inputs the procedure takes. The caller has to collect exactly this many.
    pub fn arity(&self) -> usize {
        match self {
            Procedure::Builtin(b) => b.arity,
            Procedure::User(p) => p.params.len(),
        }
    }

    pub fn call(&self, inputs: Vec<Expr>, env: &mut Env) -> EvalResult {
        match self {
            Procedure::Builtin(b) => (b.run)(&mut Inputs::new(b.name, inputs), env),
            Procedure::User(p) => env.scoped(|env| {
                for (param, input) in p.params.iter().zip(inputs) {
                    env.def_var(param, input);
                }
                p.body.eval(env)
            }),
        }
    }
}

pub struct Builtin {
    name: &'static str,
    arity: usize,
    run: fn(&mut Inputs, &mut Env) -> EvalResult,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "builtin {}", self.name)
    }
}

const fn builtin(
    name: &'static str,
    arity: usize,
    run: fn(&mut Inputs, &mut Env) -> EvalResult,
) -> Builtin {
    Builtin { name, arity, run }
}

/// The inputs to a builtin, taken in order and checked for type as they're taken.
pub struct Inputs {
    proc: &'static str,
    inputs: std::vec::IntoIter<Expr>,
    taken: usize,
}

impl Inputs {
    fn new(proc: &'static str, inputs: Vec<Expr>) -> Inputs {
        Inputs {
            proc,
            inputs: inputs.into_iter(),
            taken: 0,
        }
    }

    fn any(&mut self) -> Result<Expr, EvalError> {
        let input = self
            .inputs
            .next()
            .ok_or_else(|| EvalError::NotEnoughInputs {
                proc: self.proc.to_owned(),
                got: self.taken,
                expected: self.taken + 1,
            })?;
        self.taken += 1;
        Ok(input)
    }

    fn reject(&self, arg: Expr) -> EvalError {
        EvalError::BadArg {
            proc: self.proc.to_owned(),
            arg,
        }
    }

    fn num(&mut self) -> Result<f64, EvalError> {
        let input = self.any()?;
        match input.kind {
            ExprKind::Num(x) => Ok(x),
            _ => Err(self.reject(input)),
        }
    }

    fn bool(&mut self) -> Result<bool, EvalError> {
        let input = self.any()?;
        match input.kind {
            ExprKind::Bool(b) => Ok(b),
            _ => Err(self.reject(input)),
        }
    }

    fn word(&mut self) -> Result<String, EvalError> {
        let input = self.any()?;
        match input.kind {
            ExprKind::Word(w) => Ok(w),
            _ => Err(self.reject(input)),
        }
    }

    /// A list of instructions, like the body of `repeat`.
    fn list(&mut self) -> Result<Expr, EvalError> {
        let input = self.any()?;
        match input.kind {
            ExprKind::List(_) => Ok(input),
            _ => Err(self.reject(input)),
        }
    }

    /// A whole number of times to do something.
    fn count(&mut self) -> Result<u64, EvalError> {
        let input = self.any()?;
        match input.kind {
            ExprKind::Num(x) if x.is_finite() && x >= 0.0 && x.fract() == 0.0 => Ok(x as u64),
            _ => Err(self.reject(input)),
        }
    }
}

fn output(kind: ExprKind) -> EvalResult {
    Ok(Some(Expr::unspanned(kind)))
}

// Positions come out as a two-element list, `[x y]`.
fn point(p: Point) -> ExprKind {
    let coord = |x| Expr::unspanned(ExprKind::Num(x));
    ExprKind::List(vec![coord(p.x), coord(p.y)])
}

static BUILTINS: &[Builtin] = &[
    // The tortoise's own primitives, which output whatever the turtle reports back.
    builtin("reset", 0, reset),
    builtin("pen-up", 0, pen_up),
    builtin("pen-down", 0, pen_down),
    builtin("turn", 1, turn),
    builtin("move", 1, move_),
    // The usual logo commands, which don't output anything.
    builtin("forward", 1, forward),
    builtin("fd", 1, forward),
    builtin("back", 1, back),
    builtin("bk", 1, back),
    builtin("left", 1, left),
    builtin("lt", 1, left),
    builtin("right", 1, right),
    builtin("rt", 1, right),
    builtin("penup", 0, penup),
    builtin("pu", 0, penup),
    builtin("pendown", 0, pendown),
    builtin("pd", 0, pendown),
    builtin("clearscreen", 0, reset),
    builtin("cs", 0, reset),
    builtin("pos", 0, pos),
    builtin("heading", 0, heading),
    builtin("pendownp", 0, pendownp),
    // Everything else.
    builtin("print", 1, print),
    builtin("show", 1, show),
    builtin("make", 2, make),
    builtin("sum", 2, sum),
    builtin("prod", 2, prod),
    builtin("if", 2, if_),
    builtin("repeat", 2, repeat),
];

fn reset(_: &mut Inputs, env: &mut Env) -> EvalResult {
    env.turtle_do(|t, sink| t.reset(sink))?;
    Ok(None)
}

fn pen_up(_: &mut Inputs, env: &mut Env) -> EvalResult {
    let was_down = env.turtle_do(|t, _| t.pen_up());
    output(ExprKind::Bool(was_down))
}

fn pen_down(_: &mut Inputs, env: &mut Env) -> EvalResult {
    let was_down = env.turtle_do(|t, _| t.pen_down());
    output(ExprKind::Bool(was_down))
}

fn turn(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let degrees = inputs.num()?;
    let heading = env.turtle_do(|t, _| t.turn(degrees));
    output(ExprKind::Num(heading))
}

fn move_(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let length = inputs.num()?;
    let pos = env.turtle_do(|t, sink| t.move_by(length, sink))?;
    output(point(pos))
}

fn forward(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let length = inputs.num()?;
    env.turtle_do(|t, sink| t.move_by(length, sink))?;
    Ok(None)
}

fn back(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let length = inputs.num()?;
    env.turtle_do(|t, sink| t.move_by(-length, sink))?;
    Ok(None)
}

fn left(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let degrees = inputs.num()?;
    env.turtle_do(|t, _| t.turn(degrees));
    Ok(None)
}

fn right(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let degrees = inputs.num()?;
    env.turtle_do(|t, _| t.turn(-degrees));
    Ok(None)
}

fn penup(_: &mut Inputs, env: &mut Env) -> EvalResult {
    env.turtle_do(|t, _| t.pen_up());
    Ok(None)
}

fn pendown(_: &mut Inputs, env: &mut Env) -> EvalResult {
    env.turtle_do(|t, _| t.pen_down());
    Ok(None)
}

fn pos(_: &mut Inputs, env: &mut Env) -> EvalResult {
    output(point(env.turtle().position()))
}

fn heading(_: &mut Inputs, env: &mut Env) -> EvalResult {
    output(ExprKind::Num(env.turtle().heading_degrees()))
}

fn pendownp(_: &mut Inputs, env: &mut Env) -> EvalResult {
    output(ExprKind::Bool(env.turtle().is_pen_down()))
}

// `print` leaves off the outer brackets of a list; `show` doesn't.
struct Printed<'a>(&'a Expr);

impl fmt::Display for Printed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            ExprKind::List(items) => write_items(f, items),
            _ => write!(f, "{}", self.0),
        }
    }
}

fn print(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let val = inputs.any()?;
    env.print(Printed(&val).to_string());
    Ok(None)
}

fn show(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let val = inputs.any()?;
    env.print(val.to_string());
    Ok(None)
}

fn make(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let name = inputs.word()?;
    let val = inputs.any()?;
    env.def_var(&name, val);
    Ok(None)
}

fn sum(inputs: &mut Inputs, _: &mut Env) -> EvalResult {
    output(ExprKind::Num(inputs.num()? + inputs.num()?))
}

fn prod(inputs: &mut Inputs, _: &mut Env) -> EvalResult {
    output(ExprKind::Num(inputs.num()? * inputs.num()?))
}

fn if_(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let cond = inputs.bool()?;
    let body = inputs.list()?;
    if cond {
        body.eval(env)
    } else {
        Ok(None)
    }
}

fn repeat(inputs: &mut Inputs, env: &mut Env) -> EvalResult {
    let count = inputs.count()?;
    let body = inputs.list()?;
    for _ in 0..count {
        if let Some(val) = body.eval(env)? {
            return Err(EvalError::UnusedVal(val));
        }
    }
    Ok(None)
}
