//! The canonical builtin commands and the `if` / `foreach` / `proc` macros.
//!
//! Commands receive eagerly evaluated [`InvocationArgs`]; the three macros
//! receive [`MacroArgs`] and drive evaluation themselves, which is how `if`
//! avoids evaluating untaken branches and `foreach` re-evaluates its block
//! per iteration.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::env::Frame;
use crate::error::EvalError;
use crate::eval::{Context, InvocationArgs, MacroArgs};
use crate::value::{ClosureValue, Value};

/// Install the default command and macro tables into a root frame.
pub(crate) fn register(root: &Rc<Frame>) {
    root.add_cmd("echo", Value::builtin(echo_builtin));
    root.add_cmd("set", Value::builtin(set_builtin));
    root.add_cmd("toUpper", Value::builtin(to_upper_builtin));
    root.add_cmd("eq", Value::builtin(eq_builtin));
    root.add_cmd("cat", Value::builtin(cat_builtin));
    root.add_cmd("len", Value::builtin(len_builtin));
    root.add_cmd("index", Value::builtin(index_builtin));
    root.add_cmd("head", Value::builtin(head_builtin));
    root.add_cmd("map", Value::builtin(map_builtin));
    root.add_cmd("filter", Value::builtin(filter_builtin));
    root.add_cmd("reduce", Value::builtin(reduce_builtin));
    root.add_cmd("keys", Value::builtin(keys_builtin));
    root.add_cmd("add", Value::builtin(add_builtin));
    root.add_cmd("call", Value::builtin(call_builtin));
    root.add_cmd("break", Value::builtin(break_builtin));
    root.add_cmd("continue", Value::builtin(continue_builtin));
    root.add_cmd("return", Value::builtin(return_builtin));

    root.add_macro("if", Rc::new(if_macro));
    root.add_macro("foreach", Rc::new(foreach_macro));
    root.add_macro("proc", Rc::new(proc_macro));
}

// ── Output ────────────────────────────────────────────────────────────────────

fn echo_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    let mut line = String::new();
    for arg in &args.args {
        if !arg.is_nil() {
            line.push_str(&arg.to_string());
        }
    }

    writeln!(args.eval.core.out.borrow_mut(), "{line}")
        .map_err(|e| EvalError::Host(e.to_string()))?;
    Ok(Value::Nil)
}

// ── Variables ─────────────────────────────────────────────────────────────────

fn set_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(2)?;
    let name = args.string_arg(0)?;
    let value = args.args[1].clone();
    args.frame.set_or_define(&name, value.clone());
    Ok(value)
}

// ── Strings ───────────────────────────────────────────────────────────────────

fn to_upper_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(1)?;
    let s = args.string_arg(0)?;
    Ok(Value::str(s.to_uppercase()))
}

fn cat_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    let mut out = String::new();
    for arg in &args.args {
        if !arg.is_nil() {
            out.push_str(&arg.to_string());
        }
    }
    Ok(Value::str(out))
}

// ── Comparison ────────────────────────────────────────────────────────────────

fn eq_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(2)?;
    let equal = match (&args.args[0], &args.args[1]) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        _ => false,
    };
    Ok(Value::Bool(equal))
}

// ── Collections ───────────────────────────────────────────────────────────────

fn len_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(1)?;
    let v = &args.args[0];
    let n = match v {
        Value::Str(s) => s.chars().count(),
        _ if v.is_listable() => v.list_len(),
        _ if v.is_hashable() => v.hash_len(),
        _ => 0,
    };
    Ok(Value::Int(n as i64))
}

/// `index val k1 k2 ...`: successive indexing.  Listables take int keys
/// (anything else, including out-of-range, yields nil); hashables take
/// string keys.  A non-indexable value ends the walk early.
fn index_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(1)?;
    let mut value = args.args[0].clone();

    for key in &args.args[1..] {
        if value.is_listable() {
            value = match key {
                Value::Int(i) if *i >= 0 => value.list_index(*i as usize),
                _ => return Ok(Value::Nil),
            };
        } else if value.is_hashable() {
            match key {
                Value::Str(k) => value = value.hash_value(k),
                other => {
                    return Err(EvalError::arg(format!(
                        "expected a string key for a hashable, found {}",
                        other.type_name()
                    )))
                }
            }
        } else {
            return Ok(value);
        }
    }

    Ok(value)
}

fn head_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(1)?;
    let v = &args.args[0];
    if !v.is_listable() {
        return Err(EvalError::type_err(format!(
            "expected a listable value, found {}",
            v.type_name()
        )));
    }
    if v.list_len() == 0 {
        return Ok(Value::Nil);
    }
    Ok(v.list_index(0))
}

fn keys_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(1)?;
    let v = &args.args[0];
    if !v.is_hashable() {
        return Err(EvalError::type_err(format!(
            "expected a hashable value, found {}",
            v.type_name()
        )));
    }
    let mut keys = Vec::with_capacity(v.hash_len());
    v.hash_each(|k, _| {
        keys.push(Value::str(k));
        Ok(())
    })?;
    Ok(Value::list(keys))
}

// ── Higher-order commands ─────────────────────────────────────────────────────

fn map_builtin(ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(2)?;
    let target = args.invokable_arg(1)?;
    let v = &args.args[0];
    if !v.is_listable() {
        return Err(EvalError::type_err(format!(
            "expected a listable value, found {}",
            v.type_name()
        )));
    }

    let mut out = Vec::with_capacity(v.list_len());
    for i in 0..v.list_len() {
        let mapped = args
            .eval
            .invoke(ctx, &args.frame, &target, vec![v.list_index(i)], HashMap::new())?;
        out.push(mapped);
    }
    Ok(Value::list(out))
}

/// Keeps listable elements (or hashable entries) for which the callable is
/// truthy.  Hashable entries pass `(key, value)`.
fn filter_builtin(ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(2)?;
    let target = args.invokable_arg(1)?;
    let v = &args.args[0];

    if v.is_listable() {
        let mut out = Vec::new();
        for i in 0..v.list_len() {
            let item = v.list_index(i);
            let keep = args
                .eval
                .invoke(ctx, &args.frame, &target, vec![item.clone()], HashMap::new())?;
            if keep.is_truthy() {
                out.push(item);
            }
        }
        return Ok(Value::list(out));
    }

    if v.is_hashable() {
        let mut out = HashMap::new();
        v.hash_each(|k, item| {
            let keep = args.eval.invoke(
                ctx,
                &args.frame,
                &target,
                vec![Value::str(k), item.clone()],
                HashMap::new(),
            )?;
            if keep.is_truthy() {
                out.insert(k.to_owned(), item);
            }
            Ok(())
        })?;
        return Ok(Value::hash(out));
    }

    Err(EvalError::type_err(format!(
        "expected a listable or hashable value, found {}",
        v.type_name()
    )))
}

/// `reduce listable [init] callable`; the callable receives
/// `(element, accumulator)`.
fn reduce_builtin(ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(2)?;
    let (mut acc, target) = if args.args.len() >= 3 {
        (args.args[1].clone(), args.invokable_arg(2)?)
    } else {
        (Value::Nil, args.invokable_arg(1)?)
    };

    let v = &args.args[0];
    if !v.is_listable() {
        return Err(EvalError::type_err(format!(
            "expected a listable value, found {}",
            v.type_name()
        )));
    }
    for i in 0..v.list_len() {
        acc = args.eval.invoke(
            ctx,
            &args.frame,
            &target,
            vec![v.list_index(i), acc],
            HashMap::new(),
        )?;
    }
    Ok(acc)
}

fn call_builtin(ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    args.expect_args(1)?;
    let target = &args.args[0];
    if !target.is_invokable() {
        return Err(EvalError::type_err(format!(
            "expected an invokable value, found {}",
            target.type_name()
        )));
    }
    let rest = args.shift(1);
    args.eval.invoke(ctx, &args.frame, target, rest.args, rest.kwargs)
}

// ── Arithmetic ────────────────────────────────────────────────────────────────

/// Integer addition; nil arguments count as zero.
fn add_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    let mut sum = 0i64;
    for arg in &args.args {
        match arg {
            Value::Int(n) => sum += n,
            Value::Nil => {}
            other => {
                return Err(EvalError::type_err(format!(
                    "expected int arguments, found {}",
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::Int(sum))
}

// ── Control signals ───────────────────────────────────────────────────────────

fn break_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    Err(EvalError::Break(
        args.args.first().cloned().unwrap_or(Value::Nil),
    ))
}

fn continue_builtin(_ctx: &Context, _args: InvocationArgs) -> Result<Value, EvalError> {
    Err(EvalError::Continue)
}

fn return_builtin(_ctx: &Context, args: InvocationArgs) -> Result<Value, EvalError> {
    Err(EvalError::Return(
        args.args.first().cloned().unwrap_or(Value::Nil),
    ))
}

// ── Macros ────────────────────────────────────────────────────────────────────

/// `if guard { .. } elif guard { .. } else { .. }` with any number of
/// `elif` arms.  Taken blocks run in the current scope.
fn if_macro(ctx: &Context, args: &mut MacroArgs<'_>) -> Result<Value, EvalError> {
    if args.nargs() < 2 {
        return Err(EvalError::arg("if: need at least 2 arguments"));
    }

    if args.eval_arg(ctx, 0)?.is_truthy() {
        return args.eval_block(ctx, 1, &[], false);
    }
    args.shift(2);

    while args.ident_is(0, "elif") {
        args.shift(1);
        if args.nargs() < 2 {
            return Err(EvalError::arg("if: need at least 2 arguments"));
        }
        if args.eval_arg(ctx, 0)?.is_truthy() {
            return args.eval_block(ctx, 1, &[], false);
        }
        args.shift(2);
    }

    if args.ident_is(0, "else") && args.nargs() > 1 {
        return args.eval_block(ctx, 1, &[], false);
    }
    if args.nargs() == 0 {
        return Ok(Value::Nil);
    }

    Err(EvalError::arg("malformed if-elif-else"))
}

/// `foreach items { |v| .. }`, or `items | foreach { |v| .. }`.  Listables
/// bind one parameter, hashables bind `(key, value)`.  A fresh scope is
/// pushed per iteration; `break` ends the loop with its argument as the
/// result, `continue` skips to the next element.
fn foreach_macro(ctx: &Context, args: &mut MacroArgs<'_>) -> Result<Value, EvalError> {
    let (items, block_idx) = if args.has_pipe {
        if args.nargs() < 1 {
            return Err(EvalError::arg("foreach: need at least 1 argument"));
        }
        (args.pipe_arg.clone(), 0)
    } else {
        if args.nargs() < 2 {
            return Err(EvalError::arg("foreach: need at least 2 arguments"));
        }
        (args.eval_arg(ctx, 0)?, 1)
    };

    let mut last = Value::Nil;

    if items.is_listable() {
        for i in 0..items.list_len() {
            match args.eval_block(ctx, block_idx, &[items.list_index(i)], true) {
                Ok(v) => last = v,
                Err(EvalError::Continue) => {}
                Err(EvalError::Break(v)) => return Ok(v),
                Err(e) => return Err(e),
            }
        }
        return Ok(last);
    }

    if items.is_hashable() {
        let margs: &MacroArgs<'_> = args;
        let result = items.hash_each(|k, v| {
            match margs.eval_block(ctx, block_idx, &[Value::str(k), v], true) {
                Ok(v) => {
                    last = v;
                    Ok(())
                }
                Err(EvalError::Continue) => Ok(()),
                Err(e) => Err(e),
            }
        });
        return match result {
            Ok(()) => Ok(last),
            Err(EvalError::Break(v)) => Ok(v),
            Err(e) => Err(e),
        };
    }

    Err(EvalError::type_err(format!(
        "foreach: expected a listable or hashable value, found {}",
        items.type_name()
    )))
}

/// `proc name? { |params| .. }`: wrap a block and its defining frame into a
/// closure.  With a name, the closure also registers as a global command.
fn proc_macro(ctx: &Context, args: &mut MacroArgs<'_>) -> Result<Value, EvalError> {
    if args.nargs() < 1 {
        return Err(EvalError::arg("proc: need at least 1 argument"));
    }

    let mut proc_name = None;
    if args.nargs() == 2 {
        proc_name = Some(args.shift_ident().ok_or_else(|| {
            EvalError::arg("malformed procedure: expected an identifier as first argument")
        })?);
    }

    let block = match args.eval_arg(ctx, 0)? {
        Value::Block(block) => block,
        other => {
            return Err(EvalError::arg(format!(
                "malformed procedure: expected a block, found {}",
                other.type_name()
            )))
        }
    };

    let closure = Value::Closure(Rc::new(ClosureValue {
        block,
        frame: args.frame.clone(),
    }));
    if let Some(name) = proc_name {
        args.frame.add_cmd(&name, closure.clone());
    }
    Ok(closure)
}
