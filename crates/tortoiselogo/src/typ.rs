use std::{collections::HashMap, fmt, ops::Range, rc::Rc};

use tortoise::{DrawSink, SinkError, TurtleState};

use crate::proc::{Procedure, UserProc};

pub type EvalResult = Result<Option<Expr>, EvalError>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Lt,
    Gt,
}

// Operator precedence, with the loosest-binding ones first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd)]
pub enum Priority {
    Stop,
    Cmp,
    Add,
    Mul,
}

impl Op {
    pub fn from_char(c: char) -> Option<Op> {
        let op = match c {
            '+' => Op::Add,
            '-' => Op::Sub,
            '*' => Op::Mul,
            '/' => Op::Div,
            '=' => Op::Eq,
            '<' => Op::Lt,
            '>' => Op::Gt,
            _ => return None,
        };
        Some(op)
    }

    pub fn priority(self) -> Priority {
        match self {
            Op::Eq | Op::Lt | Op::Gt => Priority::Cmp,
            Op::Add | Op::Sub => Priority::Add,
            Op::Mul | Op::Div => Priority::Mul,
        }
    }

    // Like the turtle itself, arithmetic lets infinities and NaNs through.
    fn apply(self, l: f64, r: f64) -> ExprKind {
        match self {
            Op::Add => ExprKind::Num(l + r),
            Op::Sub => ExprKind::Num(l - r),
            Op::Mul => ExprKind::Num(l * r),
            Op::Div => ExprKind::Num(l / r),
            Op::Eq => ExprKind::Bool(l == r),
            Op::Lt => ExprKind::Bool(l < r),
            Op::Gt => ExprKind::Bool(l > r),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
            Op::Eq => '=',
            Op::Lt => '<',
            Op::Gt => '>',
        };
        write!(f, "{c}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Num(f64),
    Bool(bool),
    /// A procedure name, unless it's quoted.
    Word(String),
    /// `:name`
    Var(String),
    Op(Op),
    List(Vec<Expr>),
    /// `"word` or `[a list]`, which evaluate to what they contain.
    Quote(Box<Expr>),
    /// `to name :param ... end`
    Define(Rc<UserProc>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    /// Byte offsets into the source.
    pub span: Range<usize>,
}

impl Expr {
    /// An expression that doesn't come from the source, like the output of a builtin.
    pub fn unspanned(kind: ExprKind) -> Expr {
        Expr { kind, span: 0..0 }
    }

    /// Evaluate this expression on its own.
    ///
    /// Words and operators need their neighbors, so on their own they run as a list of one.
    pub fn eval(&self, env: &mut Env) -> EvalResult {
        let kind = match &self.kind {
            ExprKind::List(items) => return eval_list(items, env),
            ExprKind::Word(_) | ExprKind::Op(_) => {
                return eval_list(std::slice::from_ref(self), env)
            }
            ExprKind::Define(proc) => {
                env.def_proc(Rc::clone(proc));
                return Ok(None);
            }
            ExprKind::Num(_) | ExprKind::Bool(_) => self.kind.clone(),
            ExprKind::Quote(inner) => inner.kind.clone(),
            ExprKind::Var(name) => {
                env.lookup_var(name)
                    .ok_or_else(|| EvalError::UnknownVar(name.clone()))?
                    .kind
            }
        };
        Ok(Some(Expr {
            kind,
            span: self.span.clone(),
        }))
    }
}

pub(crate) fn write_items(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    let mut sep = "";
    for item in items {
        write!(f, "{sep}{item}")?;
        sep = " ";
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Num(x) => write!(f, "{x}"),
            ExprKind::Bool(b) => write!(f, "{b}"),
            ExprKind::Word(w) => f.write_str(w),
            ExprKind::Var(name) => write!(f, ":{name}"),
            ExprKind::Op(op) => write!(f, "{op}"),
            ExprKind::List(items) => {
                f.write_str("[")?;
                write_items(f, items)?;
                f.write_str("]")
            }
            ExprKind::Quote(inner) if matches!(inner.kind, ExprKind::List(_)) => {
                write!(f, "{inner}")
            }
            ExprKind::Quote(inner) => write!(f, "\"{inner}"),
            ExprKind::Define(proc) => write!(f, "to {}", proc.name),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("I don't know how to {0}")]
    UnknownProc(String),
    #[error(":{0} has no value")]
    UnknownVar(String),
    #[error("Not enough inputs to {proc} (got {got}, expected {expected})")]
    NotEnoughInputs {
        proc: String,
        got: usize,
        expected: usize,
    },
    #[error("{from} didn't output to {to}")]
    NoOutput { from: String, to: String },
    #[error("{proc} doesn't like {arg} as input")]
    BadArg { proc: String, arg: Expr },
    #[error("Missing input to {0}")]
    MissingOpInput(Op),
    #[error("{op} doesn't like {arg} as input")]
    BadOpArg { op: Op, arg: Expr },
    #[error("You don't say what to do with {0}")]
    UnusedVal(Expr),
    #[error("There's nothing to run in an empty list")]
    EmptyList,
    #[error("the tortoise can't draw: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Default)]
struct Scope {
    vars: HashMap<String, Expr>,
    procs: HashMap<String, Rc<UserProc>>,
}

/// Everything a running program can see: variables and procedures, the turtle, and
/// where the turtle draws.
pub struct Env {
    globals: Scope,
    // One per running user procedure, innermost last.
    locals: Vec<Scope>,
    turtle: TurtleState,
    sink: Box<dyn DrawSink>,
    printed: Vec<String>,
}

impl Env {
    /// A fresh environment drawing into `sink`.
    ///
    /// This doesn't reset the turtle (and so doesn't clear the sink).
    pub fn new(sink: impl DrawSink + 'static) -> Env {
        Env {
            globals: Scope::default(),
            locals: Vec::new(),
            turtle: TurtleState::new(),
            sink: Box::new(sink),
            printed: Vec::new(),
        }
    }

    fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.locals
            .iter()
            .rev()
            .chain(std::iter::once(&self.globals))
    }

    fn innermost(&mut self) -> &mut Scope {
        self.locals.last_mut().unwrap_or(&mut self.globals)
    }

    /// User procedures shadow builtins of the same name.
    pub fn lookup_proc(&self, name: &str) -> Option<Procedure> {
        self.scopes()
            .find_map(|scope| scope.procs.get(name))
            .map(|proc| Procedure::User(Rc::clone(proc)))
            .or_else(|| Procedure::builtin(name))
    }

    pub fn lookup_var(&self, name: &str) -> Option<Expr> {
        self.scopes()
            .find_map(|scope| scope.vars.get(name))
            .cloned()
    }

    pub fn scoped<U>(&mut self, f: impl FnOnce(&mut Env) -> U) -> U {
        self.locals.push(Scope::default());
        let res = f(self);
        self.locals.pop();
        res
    }

    pub fn def_var(&mut self, name: &str, val: Expr) {
        self.innermost().vars.insert(name.to_owned(), val);
    }

    pub fn def_proc(&mut self, proc: Rc<UserProc>) {
        self.innermost().procs.insert(proc.name.clone(), proc);
    }

    pub fn turtle(&self) -> &TurtleState {
        &self.turtle
    }

    /// Run something on the turtle, giving it access to the sink.
    pub fn turtle_do<U>(
        &mut self,
        f: impl FnOnce(&mut TurtleState, &mut Box<dyn DrawSink>) -> U,
    ) -> U {
        f(&mut self.turtle, &mut self.sink)
    }

    /// Shut down the sink. The environment shouldn't draw anything afterwards.
    pub fn close(&mut self) -> Result<(), SinkError> {
        self.sink.close()
    }

    pub fn print(&mut self, line: String) {
        self.printed.push(line);
    }

    /// Everything printed since the last call.
    pub fn take_printed(&mut self) -> Vec<String> {
        std::mem::take(&mut self.printed)
    }
}

/// Evaluate a list, one procedure call at a time.
///
/// Each procedure decides how many inputs it takes, so `fd 1 rt 90` is two calls: `fd`
/// takes the `1`, and then `rt` takes the `90`. Only the last call in the list is allowed
/// to output something; that output is the value of the list.
fn eval_list(mut list: &[Expr], env: &mut Env) -> EvalResult {
    loop {
        let (val, rest) = eval_list_once(list, Priority::Stop, env)?;
        match (val, rest.is_empty()) {
            (val, true) => return Ok(val),
            (Some(val), false) => return Err(EvalError::UnusedVal(val)),
            (None, false) => list = rest,
        }
    }
}

/// Evaluate a single call (or value) from the front of `list`, returning its output together
/// with the rest of the list.
///
/// A binary operator following the output is swallowed too, but only if it binds tighter
/// than `priority`: at priority `Add`, `2 * 3 fd 1` evaluates to `6` with `fd 1` left over,
/// while `2 + 3` stops at `2`.
fn eval_list_once<'a>(
    list: &'a [Expr],
    priority: Priority,
    env: &mut Env,
) -> Result<(Option<Expr>, &'a [Expr]), EvalError> {
    let (first, rest) = list.split_first().ok_or(EvalError::EmptyList)?;
    let (val, rest) = match &first.kind {
        ExprKind::Word(name) => {
            let proc = env
                .lookup_proc(name)
                .ok_or_else(|| EvalError::UnknownProc(name.clone()))?;
            let (inputs, rest) = collect_inputs(&proc, rest, priority, env)?;
            log::trace!("calling {} with {} inputs", proc.name(), inputs.len());
            (proc.call(inputs, env)?, rest)
        }
        ExprKind::Op(op) => return Err(EvalError::MissingOpInput(*op)),
        _ => (first.eval(env)?, rest),
    };

    match (val, rest.split_first()) {
        (
            Some(lhs),
            Some((
                Expr {
                    kind: ExprKind::Op(op),
                    ..
                },
                after,
            )),
        ) if op.priority() > priority => {
            let (val, rest) = eval_op_chain(lhs, *op, after, priority, env)?;
            Ok((Some(val), rest))
        }
        (val, _) => Ok((val, rest)),
    }
}

fn collect_inputs<'a>(
    proc: &Procedure,
    mut list: &'a [Expr],
    priority: Priority,
    env: &mut Env,
) -> Result<(Vec<Expr>, &'a [Expr]), EvalError> {
    let wanted = proc.arity();
    let mut inputs = Vec::with_capacity(wanted);
    while inputs.len() < wanted {
        let Some(next) = list.first() else {
            return Err(EvalError::NotEnoughInputs {
                proc: proc.name().to_owned(),
                got: inputs.len(),
                expected: wanted,
            });
        };
        let (input, rest) = eval_list_once(list, priority, env)?;
        let input = input.ok_or_else(|| EvalError::NoOutput {
            from: next.to_string(),
            to: proc.name().to_owned(),
        })?;
        inputs.push(input);
        list = rest;
    }
    Ok((inputs, list))
}

/// Finish a chain of binary operators, given the value to the left of `op`. The chain stops
/// at the first operator that doesn't bind tighter than `priority`. Returns the value of the
/// chain, and whatever follows it.
fn eval_op_chain<'a>(
    mut lhs: Expr,
    mut op: Op,
    mut list: &'a [Expr],
    priority: Priority,
    env: &mut Env,
) -> Result<(Expr, &'a [Expr]), EvalError> {
    loop {
        let (rhs, rest) = eval_list_once(list, op.priority(), env)?;
        let rhs = rhs.ok_or(EvalError::MissingOpInput(op))?;
        lhs = operate(op, &lhs, &rhs)?;

        match rest.split_first() {
            Some((
                Expr {
                    kind: ExprKind::Op(next),
                    ..
                },
                after,
            )) if next.priority() > priority => {
                op = *next;
                list = after;
            }
            _ => return Ok((lhs, rest)),
        }
    }
}

fn operate(op: Op, lhs: &Expr, rhs: &Expr) -> Result<Expr, EvalError> {
    let kind = match (&lhs.kind, &rhs.kind) {
        (ExprKind::Num(l), ExprKind::Num(r)) => op.apply(*l, *r),
        (ExprKind::Num(_), _) => {
            return Err(EvalError::BadOpArg {
                op,
                arg: rhs.clone(),
            })
        }
        _ => {
            return Err(EvalError::BadOpArg {
                op,
                arg: lhs.clone(),
            })
        }
    };
    let span = lhs.span.start.min(rhs.span.start)..lhs.span.end.max(rhs.span.end);
    Ok(Expr { kind, span })
}
