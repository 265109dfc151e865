//! Safe evaluation of step guard conditions
//!
//! Conditions come from a repository-tracked YAML file, so they are parsed
//! into a small syntax tree and interpreted against an allow-list instead of
//! being handed to a shell. The accepted language:
//!
//! - `ENV['NAME']` reads an environment variable (`nil` when unset)
//! - `File.exist?(path)`, `File.directory?(path)`, `File.file?(path)`, `Dir.exist?(path)`
//! - `==` and `!=` with one of the calls above on the left
//! - `&&`, `||`, `and`, `or`, parentheses
//! - string, integer, boolean, symbol and array literals; a symbol is its name
//!   as a string, so `ENV['RAILS_ENV'] == :development` compares text
//!
//! Anything else, including backticks and `%x{}`, makes the whole expression false.

mod parser;

pub use parser::{parse, Node};

use crate::core::env::{EnvStore, MemoryEnv};
use crate::core::error::ConditionError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Runtime value produced while interpreting a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    Array(Vec<Value>),
    Const(String),
}

impl Value {
    /// Ruby truthiness: only `nil` and `false` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

/// Evaluates guard conditions for custom steps and pre-steps
#[derive(Clone, Default)]
pub struct ConditionEvaluator {
    base_dir: Option<PathBuf>,
    env: Option<Arc<dyn EnvStore>>,
}

impl fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("base_dir", &self.base_dir)
            .field("env", &self.env.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl ConditionEvaluator {
    /// Evaluator reading the process environment, resolving paths against the working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths in file predicates against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Read `ENV[...]` from a fixed map instead of the process environment
    pub fn with_env<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(Arc::new(MemoryEnv::with_vars(vars)));
        self
    }

    /// Read `ENV[...]` through `env`, seeing whatever earlier steps exported there
    pub fn with_env_store(mut self, env: Arc<dyn EnvStore>) -> Self {
        self.env = Some(env);
        self
    }

    /// Evaluate a condition. No condition means "run"; any failure means "don't".
    pub fn evaluate(&self, expression: Option<&str>) -> bool {
        let expression = match expression {
            Some(expr) if !expr.trim().is_empty() => expr,
            _ => return true,
        };

        match self.try_evaluate(expression) {
            Ok(result) => {
                debug!("Condition `{}` evaluated to {}", expression, result);
                result
            }
            Err(e) => {
                warn!("Condition evaluation failed: {}", e);
                false
            }
        }
    }

    /// Evaluate a condition, surfacing parse and safety errors
    pub fn try_evaluate(&self, expression: &str) -> Result<bool, ConditionError> {
        let program = parse(expression)?;
        Ok(self.eval(&program)?.is_truthy())
    }

    fn eval(&self, node: &Node) -> Result<Value, ConditionError> {
        match node {
            Node::Program(statements) => {
                // every statement is checked; the first one decides
                let mut first = None;
                for statement in statements {
                    let value = self.eval(statement)?;
                    first.get_or_insert(value);
                }
                Ok(first.unwrap_or(Value::Nil))
            }
            Node::And(left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(Value::Bool(left.is_truthy() && right.is_truthy()))
            }
            Node::Or(left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(Value::Bool(left.is_truthy() || right.is_truthy()))
            }
            Node::Call {
                receiver,
                method,
                args,
            } => self.eval_call(receiver.as_deref(), method, args),
            Node::Const(name) => Ok(Value::Const(name.clone())),
            Node::Str(s) => Ok(Value::Str(s.clone())),
            Node::Bool(b) => Ok(Value::Bool(*b)),
            Node::Int(i) => Ok(Value::Int(*i)),
            Node::Symbol(s) => Ok(Value::Str(s.clone())),
            Node::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_, _>>()?,
            )),
            Node::Parens(inner) => self.eval(inner),
            Node::ShellEscape(cmd) => Err(ConditionError::ShellEscape(cmd.clone())),
        }
    }

    fn eval_call(
        &self,
        receiver: Option<&Node>,
        method: &str,
        args: &[Node],
    ) -> Result<Value, ConditionError> {
        match receiver {
            None => Err(ConditionError::UnsafeCall(method.to_string())),
            Some(Node::Const(name)) => match name.as_str() {
                "ENV" | "File" | "Dir" => self.eval_builtin(name, method, args),
                _ => Err(ConditionError::UnsafeCall(format!("{}.{}", name, method))),
            },
            Some(call @ Node::Call { .. }) if method == "==" || method == "!=" => {
                let [other] = args else {
                    return Err(ConditionError::UnsafeNode(format!(
                        "{} with {} arguments",
                        method,
                        args.len()
                    )));
                };
                let left = self.eval(call)?;
                let right = self.eval(other)?;
                let equal = left == right;
                Ok(Value::Bool(if method == "==" { equal } else { !equal }))
            }
            Some(other) => Err(ConditionError::UnsafeCall(format!(
                "{} on {}",
                method,
                other.kind()
            ))),
        }
    }

    fn eval_builtin(
        &self,
        receiver: &str,
        method: &str,
        args: &[Node],
    ) -> Result<Value, ConditionError> {
        match (receiver, method) {
            ("ENV", "[]") => {
                let name = self.string_arg(receiver, method, args)?;
                Ok(self.lookup_env(&name).map(Value::Str).unwrap_or(Value::Nil))
            }
            ("File", "exist?") | ("Dir", "exist?") | ("File", "directory?") | ("File", "file?") => {
                let path = self.resolve(&self.string_arg(receiver, method, args)?);
                let result = match (receiver, method) {
                    ("File", "exist?") => path.exists(),
                    ("File", "file?") => path.is_file(),
                    _ => path.is_dir(),
                };
                Ok(Value::Bool(result))
            }
            _ => Err(ConditionError::UnsafeCall(format!("{}.{}", receiver, method))),
        }
    }

    fn string_arg(&self, receiver: &str, method: &str, args: &[Node]) -> Result<String, ConditionError> {
        let [arg] = args else {
            return Err(ConditionError::UnsafeCall(format!(
                "{}.{} expects one argument, got {}",
                receiver,
                method,
                args.len()
            )));
        };
        match self.eval(arg)? {
            Value::Str(s) => Ok(s),
            other => Err(ConditionError::UnsafeNode(format!(
                "{}.{} argument must be a string, got {:?}",
                receiver, method, other
            ))),
        }
    }

    fn lookup_env(&self, name: &str) -> Option<String> {
        match &self.env {
            Some(env) => env.get(name),
            None => std::env::var(name).ok(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(Path::new(path)),
            None => PathBuf::from(path),
        }
    }
}
