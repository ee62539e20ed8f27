//! Tree-walking evaluator.
//!
//! The walker descends statements, pipelines, commands, and arguments,
//! resolving command heads against the environment.  Macros (`if`,
//! `foreach`, `proc`) receive the raw syntax subtree through [`MacroArgs`]
//! and decide what to evaluate; ordinary commands receive eagerly evaluated
//! [`InvocationArgs`].
//!
//! A pipeline threads each command's result into the next command: for
//! invokables it is prepended to the positional arguments, for macros it is
//! surfaced through `has_pipe` / `pipe_arg`.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ast::{Arg, Cmd, DotChain, DotSuffix, ListHash, Pipeline};
use crate::env::Frame;
use crate::error::EvalError;
use crate::host::CallArgs;
use crate::instance::InstCore;
use crate::value::{ClosureValue, Value};

// ── Context ───────────────────────────────────────────────────────────────────

/// Cancellation context threaded through every builtin and macro.
///
/// The evaluator polls it at statement boundaries and unwinds with the halt
/// kind when it fires; blocking host builtins are expected to observe it
/// themselves.
#[derive(Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

// ── Callable argument carriers ────────────────────────────────────────────────

/// Eagerly evaluated arguments handed to an invokable.
pub struct InvocationArgs {
    pub(crate) eval: Evaluator,
    pub(crate) frame: Rc<Frame>,
    pub(crate) args: Vec<Value>,
    pub(crate) kwargs: HashMap<String, Vec<Value>>,
}

impl InvocationArgs {
    pub(crate) fn expect_args(&self, n: usize) -> Result<(), EvalError> {
        if self.args.len() < n {
            return Err(EvalError::arg(format!("expected at least {n} arguments")));
        }
        Ok(())
    }

    pub(crate) fn string_arg(&self, i: usize) -> Result<String, EvalError> {
        match self.args.get(i) {
            None => Err(EvalError::arg(format!("expected at least {} arguments", i + 1))),
            Some(Value::Nil) => Err(EvalError::arg("expected a string argument")),
            Some(v) => Ok(v.to_string()),
        }
    }

    /// An invokable argument; a string resolves through the command table.
    pub(crate) fn invokable_arg(&self, i: usize) -> Result<Value, EvalError> {
        match self.args.get(i) {
            None => Err(EvalError::arg(format!("expected at least {} arguments", i + 1))),
            Some(v) if v.is_invokable() => Ok(v.clone()),
            Some(Value::Str(s)) => self
                .frame
                .lookup_cmd(s)
                .ok_or_else(|| EvalError::arg(format!("\"{s}\" is not invokable"))),
            Some(_) => Err(EvalError::arg("expected an invokable argument")),
        }
    }

    /// Same evaluator and frame, fresh positional arguments.
    pub(crate) fn fork(&self, args: Vec<Value>) -> InvocationArgs {
        InvocationArgs {
            eval: self.eval.clone(),
            frame: self.frame.clone(),
            args,
            kwargs: HashMap::new(),
        }
    }

    pub(crate) fn shift(&self, n: usize) -> InvocationArgs {
        InvocationArgs {
            eval: self.eval.clone(),
            frame: self.frame.clone(),
            args: self.args.get(n..).map(|s| s.to_vec()).unwrap_or_default(),
            kwargs: self.kwargs.clone(),
        }
    }
}

/// What a macro sees: the raw command node plus an evaluation handle.
pub struct MacroArgs<'a> {
    pub(crate) eval: &'a Evaluator,
    pub(crate) frame: Rc<Frame>,
    pub(crate) has_pipe: bool,
    pub(crate) pipe_arg: Value,
    cmd: &'a Cmd,
    shift: usize,
}

/// A macro implementation registered in the macro table.
pub type MacroFn = Rc<dyn for<'a> Fn(&Context, &mut MacroArgs<'a>) -> Result<Value, EvalError>>;

impl<'a> MacroArgs<'a> {
    pub fn nargs(&self) -> usize {
        self.cmd.args.len().saturating_sub(self.shift)
    }

    pub fn shift(&mut self, n: usize) {
        self.shift += n;
    }

    fn raw_arg(&self, n: usize) -> Option<&DotChain> {
        self.cmd.args.get(self.shift + n)
    }

    /// True when argument `n` is exactly the given bare identifier.
    pub fn ident_is(&self, n: usize, expected: &str) -> bool {
        self.raw_arg(n)
            .and_then(DotChain::as_ident)
            .is_some_and(|name| name == expected)
    }

    /// Consume and return a leading bare identifier, if present.
    pub fn shift_ident(&mut self) -> Option<String> {
        let name = self.raw_arg(0)?.as_ident()?.to_owned();
        self.shift += 1;
        Some(name)
    }

    /// Evaluate argument `n` in the macro's frame.
    pub fn eval_arg(&self, ctx: &Context, n: usize) -> Result<Value, EvalError> {
        let chain = self
            .raw_arg(n)
            .ok_or_else(|| EvalError::arg("not enough arguments"))?;
        self.eval.eval_dot(ctx, &self.frame, chain)
    }

    /// Evaluate argument `n`, which must be a block, binding its formal
    /// parameters to `bindings` and optionally pushing a scope.
    pub fn eval_block(
        &self,
        ctx: &Context,
        n: usize,
        bindings: &[Value],
        push_scope: bool,
    ) -> Result<Value, EvalError> {
        let obj = self.eval_arg(ctx, n)?;
        let block = match obj {
            Value::Block(block) => block,
            other => {
                return Err(EvalError::type_err(format!(
                    "expected a block, found {}",
                    other.type_name()
                )))
            }
        };

        let frame = if push_scope {
            self.frame.fork()
        } else {
            self.frame.clone()
        };
        for (i, name) in block.params.iter().enumerate() {
            if i < bindings.len() {
                frame.define(name, bindings[i].clone());
            }
        }

        self.eval.eval_statements(ctx, &frame, &block.statements)
    }
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Evaluator {
    pub(crate) core: Rc<InstCore>,
}

impl Evaluator {
    /// Evaluate statements in order; the value is the last one's.
    pub(crate) fn eval_statements(
        &self,
        ctx: &Context,
        frame: &Rc<Frame>,
        statements: &[Pipeline],
    ) -> Result<Value, EvalError> {
        let mut result = Value::Nil;
        for pipeline in statements {
            if ctx.is_cancelled() {
                return Err(EvalError::Halt);
            }
            result = self.eval_pipeline(ctx, frame, pipeline)?;
        }
        Ok(result)
    }

    pub(crate) fn eval_pipeline(
        &self,
        ctx: &Context,
        frame: &Rc<Frame>,
        pipeline: &Pipeline,
    ) -> Result<Value, EvalError> {
        let mut cmds = pipeline.cmds.iter();
        let first = cmds.next().expect("pipeline is never empty");
        let mut result = self.eval_cmd(ctx, frame, None, first)?;
        for cmd in cmds {
            result = self.eval_cmd(ctx, frame, Some(result), cmd)?;
        }
        Ok(result)
    }

    fn eval_cmd(
        &self,
        ctx: &Context,
        frame: &Rc<Frame>,
        pipe: Option<Value>,
        cmd: &Cmd,
    ) -> Result<Value, EvalError> {
        if let Some(name) = cmd.head.as_ident() {
            if let Some(mac) = frame.lookup_macro(name) {
                let mut margs = MacroArgs {
                    eval: self,
                    frame: frame.clone(),
                    has_pipe: pipe.is_some(),
                    pipe_arg: pipe.unwrap_or(Value::Nil),
                    cmd,
                    shift: 0,
                };
                return mac(ctx, &mut margs);
            }

            if let Some(target) = frame.lookup_cmd(name) {
                let (args, kwargs) = self.eval_args(ctx, frame, &cmd.args, pipe)?;
                return self.invoke(ctx, frame, &target, args, kwargs);
            }

            if let Some(handler) = self.core.missing.clone() {
                let (args, kwargs) = self.eval_args(ctx, frame, &cmd.args, pipe)?;
                let inv = InvocationArgs {
                    eval: self.clone(),
                    frame: frame.clone(),
                    args,
                    kwargs,
                };
                return handler(ctx, name, CallArgs::new(inv));
            }

            if !cmd.args.is_empty() || pipe.is_some() {
                return Err(EvalError::UnknownCommand(name.to_owned()));
            }
        }

        // The head is not a resolvable name: treat it as a plain argument.
        // With arguments (or a piped input) the result must be invokable;
        // alone it simply produces its value.
        let head = self.eval_dot(ctx, frame, &cmd.head)?;
        if cmd.args.is_empty() && pipe.is_none() {
            return Ok(head);
        }
        if !head.is_invokable() {
            return Err(EvalError::type_err(format!(
                "{} is not invokable",
                head.type_name()
            )));
        }
        let (args, kwargs) = self.eval_args(ctx, frame, &cmd.args, pipe)?;
        self.invoke(ctx, frame, &head, args, kwargs)
    }

    /// Evaluate an argument list left-to-right, grouping switch flags.
    fn eval_args(
        &self,
        ctx: &Context,
        frame: &Rc<Frame>,
        args: &[DotChain],
        pipe: Option<Value>,
    ) -> Result<(Vec<Value>, HashMap<String, Vec<Value>>), EvalError> {
        let mut positional: Vec<Value> = pipe.into_iter().collect();
        let mut kwargs: HashMap<String, Vec<Value>> = HashMap::new();
        let mut open_switch: Option<String> = None;

        for chain in args {
            if let Some(flag) = chain.as_ident().filter(|name| name.starts_with('-')) {
                let name = flag.trim_start_matches('-').to_owned();
                kwargs.entry(name.clone()).or_default();
                open_switch = Some(name);
                continue;
            }
            let value = self.eval_dot(ctx, frame, chain)?;
            match &open_switch {
                Some(name) => kwargs.get_mut(name).expect("switch is open").push(value),
                None => positional.push(value),
            }
        }

        Ok((positional, kwargs))
    }

    /// Evaluate an argument and apply its `.suffix` selectors.
    pub(crate) fn eval_dot(
        &self,
        ctx: &Context,
        frame: &Rc<Frame>,
        chain: &DotChain,
    ) -> Result<Value, EvalError> {
        let mut value = self.eval_arg(ctx, frame, &chain.arg)?;
        for suffix in &chain.suffixes {
            value = match suffix {
                DotSuffix::Key(key) => {
                    if !value.is_hashable() {
                        return Err(EvalError::type_err(format!(
                            "cannot index {} with key \"{key}\"",
                            value.type_name()
                        )));
                    }
                    value.hash_value(key)
                }
                DotSuffix::Sub(pipeline) => {
                    let key = self.eval_pipeline(ctx, frame, pipeline)?;
                    if value.is_listable() {
                        match key {
                            Value::Int(i) if i >= 0 => value.list_index(i as usize),
                            _ => Value::Nil,
                        }
                    } else if value.is_hashable() {
                        value.hash_value(&key.to_string())
                    } else {
                        return Err(EvalError::type_err(format!(
                            "cannot index {}",
                            value.type_name()
                        )));
                    }
                }
            };
        }
        Ok(value)
    }

    fn eval_arg(&self, ctx: &Context, frame: &Rc<Frame>, arg: &Arg) -> Result<Value, EvalError> {
        match arg {
            Arg::Str(s) => Ok(Value::str(s.clone())),
            Arg::Int(n) => Ok(Value::Int(*n)),
            Arg::Ident(name) => Ok(Value::str(name.clone())),
            // A missing variable reads as nil, never an error.
            Arg::Var(name) => Ok(frame.get_var(name).unwrap_or(Value::Nil)),
            Arg::Sub(None) => Ok(Value::Nil),
            Arg::Sub(Some(pipeline)) => self.eval_pipeline(ctx, frame, pipeline),
            Arg::ListOrHash(lh) => self.eval_list_or_hash(ctx, frame, lh),
            Arg::Block(block) => Ok(Value::Block(block.clone())),
        }
    }

    fn eval_list_or_hash(
        &self,
        ctx: &Context,
        frame: &Rc<Frame>,
        lh: &ListHash,
    ) -> Result<Value, EvalError> {
        let pairs = match lh {
            ListHash::EmptyList => return Ok(Value::list(Vec::new())),
            ListHash::EmptyHash => return Ok(Value::hash(HashMap::new())),
            ListHash::Pairs(pairs) => pairs,
        };

        // The first element decides: a `:` separator makes it a hash.
        if pairs[0].right.is_some() {
            let mut map = HashMap::with_capacity(pairs.len());
            for pair in pairs {
                let right = pair.right.as_ref().ok_or_else(|| {
                    EvalError::arg("hash literal elements must all be key:value pairs")
                })?;
                let key = self.eval_arg(ctx, frame, &pair.left)?;
                let value = self.eval_arg(ctx, frame, right)?;
                map.insert(key.to_string(), value);
            }
            Ok(Value::hash(map))
        } else {
            let mut items = Vec::with_capacity(pairs.len());
            for pair in pairs {
                if pair.right.is_some() {
                    return Err(EvalError::arg(
                        "list literal elements must not be key:value pairs",
                    ));
                }
                items.push(self.eval_arg(ctx, frame, &pair.left)?);
            }
            Ok(Value::list(items))
        }
    }

    /// Invoke an invokable value with evaluated arguments.
    pub(crate) fn invoke(
        &self,
        ctx: &Context,
        frame: &Rc<Frame>,
        target: &Value,
        args: Vec<Value>,
        kwargs: HashMap<String, Vec<Value>>,
    ) -> Result<Value, EvalError> {
        match target {
            Value::Builtin(b) => (b.0)(
                ctx,
                InvocationArgs {
                    eval: self.clone(),
                    frame: frame.clone(),
                    args,
                    kwargs,
                },
            ),
            Value::Closure(closure) => self.invoke_closure(ctx, closure, &args),
            Value::Block(block) => {
                // A bare block invoked (e.g. by `map`) runs in a child of
                // the calling frame; only supplied parameters are bound.
                let child = frame.fork();
                for (i, name) in block.params.iter().enumerate() {
                    if i < args.len() {
                        child.define(name, args[i].clone());
                    }
                }
                self.eval_statements(ctx, &child, &block.statements)
            }
            other => Err(EvalError::type_err(format!(
                "{} is not invokable",
                other.type_name()
            ))),
        }
    }

    /// Invoke a closure: fork its captured frame, bind every formal
    /// parameter (missing arguments bind to nil), and translate a `return`
    /// signal into a normal result.
    pub(crate) fn invoke_closure(
        &self,
        ctx: &Context,
        closure: &ClosureValue,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        let frame = closure.frame.fork();
        for (i, name) in closure.block.params.iter().enumerate() {
            frame.define(name, args.get(i).cloned().unwrap_or(Value::Nil));
        }

        match self.eval_statements(ctx, &frame, &closure.block.statements) {
            Err(EvalError::Return(value)) => Ok(value),
            other => other,
        }
    }
}
