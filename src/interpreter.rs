mod environment;

use std::fmt::Display;

use crate::{
    ast::{Expression, Program, Statement},
    tokenizer::{Token, TokenKind},
};

pub use self::environment::{Environment, Globals};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Error executing statement: {current_statement} - {kind}")]
    Execution {
        kind: RuntimeError,
        current_statement: Statement,
    },
}

impl ExecutionError {
    pub fn kind(&self) -> &RuntimeError {
        match self {
            ExecutionError::Execution { kind, .. } => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Invalid less than operation: {0} < {1}")]
    InvalidLess(Value, Value),
    #[error("Invalid less than or equal operation: {0} <= {1}")]
    InvalidLessEqual(Value, Value),
    #[error("Invalid greater than operation: {0} > {1}")]
    InvalidGreater(Value, Value),
    #[error("Invalid greater than or equal operation: {0} >= {1}")]
    InvalidGreaterEqual(Value, Value),
    #[error("Invalid equality operation: {0} == {1}")]
    InvalidEqual(Value, Value),
    #[error("Invalid inequality operation: {0} != {1}")]
    InvalidNotEqual(Value, Value),
    #[error("Invalid addition operation: {0} + {1}")]
    InvalidAdd(Value, Value),
    #[error("Invalid subtraction operation: {0} - {1}")]
    InvalidSub(Value, Value),
    #[error("Invalid multiplication operation: {0} * {1}")]
    InvalidMult(Value, Value),
    #[error("Invalid division operation: {0} / {1}")]
    InvalidDiv(Value, Value),
    #[error("Invalid remainder operation: {0} % {1}")]
    InvalidRem(Value, Value),
    #[error("Invalid and operation: {0} && {1}")]
    InvalidAnd(Value, Value),
    #[error("Invalid or operation: {0} || {1}")]
    InvalidOr(Value, Value),
    #[error("Invalid negate operation: -{0}")]
    InvalidNegate(Value),
    #[error("Invalid not operation: !{0}")]
    InvalidNot(Value),
    #[error("Undeclared variable: {0}")]
    UndeclaredVariable(String),
    #[error("Unsupported binary operator: {0}")]
    UnsupportedBinary(String),
    #[error("Unsupported unary operator: {0}")]
    UnsupportedUnary(String),
    #[error("Invalid assignment target: {0}")]
    InvalidAssignmentTarget(String),
}

#[derive(Debug)]
pub struct Interpreter<E: Environment = Globals> {
    environment: E,
}

impl Default for Interpreter<Globals> {
    fn default() -> Self {
        Self::new(Globals::default())
    }
}

impl<E: Environment> Interpreter<E> {
    pub fn new(environment: E) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    /// Runs every statement in order and returns the value of the last one.
    /// Stops at the first statement that fails; bindings made by earlier
    /// statements are kept.
    #[tracing::instrument(level = "debug", skip_all, fields(statements = program.0.len()))]
    pub fn interpret(&mut self, program: &Program) -> Result<Option<Value>, ExecutionError> {
        let mut last = None;
        for stmt in program.0.iter() {
            match self.execute(stmt) {
                Ok(value) => last = Some(value),
                Err(e) => {
                    return Err(ExecutionError::Execution {
                        kind: e,
                        current_statement: stmt.clone(),
                    })
                }
            }
        }

        Ok(last)
    }

    pub fn execute(&mut self, stmt: &Statement) -> Result<Value, RuntimeError> {
        match stmt {
            Statement::Expression(expression) => self.evaluate(expression),
        }
    }

    pub fn evaluate(&mut self, expression: &Expression) -> Result<Value, RuntimeError> {
        match expression {
            Expression::Number(n) => Ok(Value::Number(*n)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Boolean(b) => Ok(Value::Boolean(*b)),
            Expression::Identifier(name) => self.environment.get(name),
            Expression::Binary(target, op, value) if op.kind == TokenKind::Equal => {
                self.assign(target, value)
            }
            Expression::Binary(a, op, b) => {
                let a = self.evaluate(a)?;
                let b = self.evaluate(b)?;
                binary(op, a, b)
            }
            Expression::Unary(op, x) => {
                let x = self.evaluate(x)?;
                unary(op, x)
            }
        }
    }

    fn assign(&mut self, target: &Expression, value: &Expression) -> Result<Value, RuntimeError> {
        let Expression::Identifier(name) = target else {
            return Err(RuntimeError::InvalidAssignmentTarget(target.to_string()));
        };
        let value = self.evaluate(value)?;
        self.environment.set(name, value.clone());
        Ok(value)
    }
}

fn binary(op: &Token, a: Value, b: Value) -> Result<Value, RuntimeError> {
    match op.kind {
        TokenKind::Plus => match (a, b) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (a, b) => Err(RuntimeError::InvalidAdd(a, b)),
        },
        TokenKind::Minus => match (a, b) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (a, b) => Err(RuntimeError::InvalidSub(a, b)),
        },
        TokenKind::Star => match (a, b) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (a, b) => Err(RuntimeError::InvalidMult(a, b)),
        },
        TokenKind::Slash => match (a, b) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            (a, b) => Err(RuntimeError::InvalidDiv(a, b)),
        },
        TokenKind::Percent => match (a, b) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
            (a, b) => Err(RuntimeError::InvalidRem(a, b)),
        },
        TokenKind::And => match (a, b) {
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(a && b)),
            (a, b) => Err(RuntimeError::InvalidAnd(a, b)),
        },
        TokenKind::Or => match (a, b) {
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(a || b)),
            (a, b) => Err(RuntimeError::InvalidOr(a, b)),
        },
        TokenKind::EqualEqual => match equals(&a, &b) {
            Some(equal) => Ok(Value::Boolean(equal)),
            None => Err(RuntimeError::InvalidEqual(a, b)),
        },
        TokenKind::BangEqual => match equals(&a, &b) {
            Some(equal) => Ok(Value::Boolean(!equal)),
            None => Err(RuntimeError::InvalidNotEqual(a, b)),
        },
        kind @ (TokenKind::Less
        | TokenKind::LessEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual) => {
            let ordered = match (&a, &b) {
                (Value::Number(x), Value::Number(y)) => Some(holds(kind, x, y)),
                (Value::String(x), Value::String(y)) => Some(holds(kind, x, y)),
                _ => None,
            };
            match ordered {
                Some(result) => Ok(Value::Boolean(result)),
                None => Err(match kind {
                    TokenKind::Less => RuntimeError::InvalidLess(a, b),
                    TokenKind::LessEqual => RuntimeError::InvalidLessEqual(a, b),
                    TokenKind::Greater => RuntimeError::InvalidGreater(a, b),
                    _ => RuntimeError::InvalidGreaterEqual(a, b),
                }),
            }
        }
        _ => Err(RuntimeError::UnsupportedBinary(op.lexeme.clone())),
    }
}

/// `None` when the operands are of different kinds.
fn equals(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => Some(a == b),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a == b),
        (Value::String(a), Value::String(b)) => Some(a == b),
        _ => None,
    }
}

fn holds<T: PartialOrd + ?Sized>(kind: TokenKind, a: &T, b: &T) -> bool {
    match kind {
        TokenKind::Less => a < b,
        TokenKind::LessEqual => a <= b,
        TokenKind::Greater => a > b,
        _ => a >= b,
    }
}

fn unary(op: &Token, x: Value) -> Result<Value, RuntimeError> {
    match op.kind {
        TokenKind::Minus => match x {
            Value::Number(n) => Ok(Value::Number(-n)),
            x => Err(RuntimeError::InvalidNegate(x)),
        },
        TokenKind::Not => match x {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            x => Err(RuntimeError::InvalidNot(x)),
        },
        _ => Err(RuntimeError::UnsupportedUnary(op.lexeme.clone())),
    }
}
