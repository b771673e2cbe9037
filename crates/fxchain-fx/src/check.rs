//! Name resolution and arity checking. Turns a parsed [`EffectDef`] into an
//! executable [`Program`].

use fxchain_core::{Color, FxError, FxResult};

use crate::ast::*;
use crate::eval::{binary, Builtin, PixelEnv, Value};
use crate::lexer::Span;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Const(Value),
    Param(usize),
    Local(usize),
    Time,
    Frame,
    Call(Builtin, Vec<Node>),
    Bin(Op, Box<Node>, Box<Node>),
    Neg(Box<Node>),
}

/// A declared program parameter and its default.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramParam {
    pub name: String,
    pub default: f64,
}

/// A compiled effect program, ready for per-pixel evaluation.
#[derive(Debug, Clone)]
pub struct Program {
    name: String,
    params: Vec<ProgramParam>,
    lets: Vec<Node>,
    result: Node,
    uses_time: bool,
}

impl Program {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ProgramParam] {
        &self.params
    }

    /// True when output depends on `time`, `frame` or animated noise.
    pub fn uses_time(&self) -> bool {
        self.uses_time
    }

    /// Evaluate at one pixel. `params` holds one value per declared parameter,
    /// in declaration order; `locals` is scratch space reused between calls.
    pub fn eval(&self, env: &PixelEnv, params: &[f32], locals: &mut Vec<Value>) -> [f32; 4] {
        locals.clear();
        for node in &self.lets {
            let value = eval_node(node, env, params, locals);
            locals.push(value);
        }
        eval_node(&self.result, env, params, locals).color()
    }
}

fn eval_node(node: &Node, env: &PixelEnv, params: &[f32], locals: &[Value]) -> Value {
    match node {
        Node::Const(v) => *v,
        Node::Param(i) => Value::Scalar(params.get(*i).copied().unwrap_or(0.0)),
        Node::Local(i) => locals.get(*i).copied().unwrap_or(Value::Scalar(0.0)),
        Node::Time => Value::Scalar(env.time),
        Node::Frame => Value::Scalar(env.frame),
        Node::Call(builtin, args) => {
            let mut values = [Value::Scalar(0.0); 3];
            for (slot, arg) in values.iter_mut().zip(args) {
                *slot = eval_node(arg, env, params, locals);
            }
            builtin.call(&values[..args.len().min(3)], env)
        }
        Node::Bin(op, l, r) => binary(
            *op,
            eval_node(l, env, params, locals),
            eval_node(r, env, params, locals),
        ),
        Node::Neg(inner) => binary(
            Op::Mul,
            Value::Scalar(-1.0),
            eval_node(inner, env, params, locals),
        ),
    }
}

/// Resolves one effect definition.
pub struct Checker {
    params: Vec<ProgramParam>,
    locals: Vec<String>,
    uses_time: bool,
}

impl Checker {
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            locals: Vec::new(),
            uses_time: false,
        }
    }

    pub fn check(mut self, def: &EffectDef) -> FxResult<Program> {
        for p in &def.params {
            if self.params.iter().any(|q| q.name == p.name) {
                return Err(error_at(format!("duplicate parameter '{}'", p.name), p.span));
            }
            self.params.push(ProgramParam {
                name: p.name.clone(),
                default: p.default_value.unwrap_or(0.0),
            });
        }

        let mut lets = Vec::new();
        let mut result = None;
        for (i, stmt) in def.body.iter().enumerate() {
            let is_last = i + 1 == def.body.len();
            match stmt {
                Statement::Let { name, value, .. } => {
                    lets.push(self.resolve(value)?);
                    self.locals.push(name.clone());
                }
                Statement::Expr(expr) if is_last => result = Some(self.resolve(expr)?),
                Statement::Expr(expr) => {
                    return Err(error_at(
                        "only the final statement may be a bare expression",
                        expr.span(),
                    ));
                }
            }
        }

        let result = result.ok_or_else(|| {
            error_at(
                format!("effect '{}' must end with an expression", def.name),
                def.span,
            )
        })?;

        Ok(Program {
            name: def.name.clone(),
            params: self.params,
            lets,
            result,
            uses_time: self.uses_time,
        })
    }

    fn resolve(&mut self, expr: &Expr) -> FxResult<Node> {
        match expr {
            Expr::Number(v, _) => Ok(Node::Const(Value::Scalar(*v as f32))),
            Expr::ColorHex(hex, span) => Color::from_hex(hex)
                .map(|c| Node::Const(Value::Color(c.to_array())))
                .map_err(|_| error_at(format!("invalid hex color: #{}", hex), *span)),
            Expr::Ident(name, span) => self.resolve_ident(name, *span),
            Expr::Call { name, args, span } => {
                let args = args
                    .iter()
                    .map(|a| self.resolve(a))
                    .collect::<FxResult<Vec<_>>>()?;
                self.call(name, args, *span)
            }
            Expr::Pipe { left, right, .. } => {
                let piped = self.resolve(left)?;
                match &**right {
                    Expr::Call { name, args, span } => {
                        let mut all = vec![piped];
                        for a in args {
                            all.push(self.resolve(a)?);
                        }
                        self.call(name, all, *span)
                    }
                    Expr::Ident(name, span) => self.call(name, vec![piped], *span),
                    other => Err(error_at("right side of '->' must be a function", other.span())),
                }
            }
            Expr::Neg(inner, _) => Ok(Node::Neg(Box::new(self.resolve(inner)?))),
            Expr::BinOp {
                op, left, right, ..
            } => Ok(Node::Bin(
                *op,
                Box::new(self.resolve(left)?),
                Box::new(self.resolve(right)?),
            )),
        }
    }

    fn resolve_ident(&mut self, name: &str, span: Span) -> FxResult<Node> {
        if let Some(i) = self.locals.iter().rposition(|l| l == name) {
            return Ok(Node::Local(i));
        }
        if let Some(i) = self.params.iter().position(|p| p.name == name) {
            return Ok(Node::Param(i));
        }
        match name {
            "time" => {
                self.uses_time = true;
                Ok(Node::Time)
            }
            "frame" => {
                self.uses_time = true;
                Ok(Node::Frame)
            }
            _ => match Builtin::lookup(name) {
                Some(b) if b.arity().0 == 0 => self.call(name, Vec::new(), span),
                Some(_) => Err(error_at(
                    format!("function '{}' used without arguments", name),
                    span,
                )),
                None => Err(error_at(format!("unknown identifier '{}'", name), span)),
            },
        }
    }

    fn call(&mut self, name: &str, args: Vec<Node>, span: Span) -> FxResult<Node> {
        let builtin = Builtin::lookup(name)
            .ok_or_else(|| error_at(format!("unknown function '{}'", name), span))?;
        let (min, max) = builtin.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            };
            return Err(error_at(
                format!(
                    "'{}' takes {} argument(s), got {}",
                    name,
                    expected,
                    args.len()
                ),
                span,
            ));
        }
        if builtin.reads_time() {
            self.uses_time = true;
        }
        Ok(Node::Call(builtin, args))
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

fn error_at(message: impl Into<String>, span: Span) -> FxError {
    FxError::parse(message, span.line, span.column)
}
