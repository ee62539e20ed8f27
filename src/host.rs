//! Host interop: argument binding for native builtins, proxy descriptors
//! for host data, and the callable wrapper that lets host code re-enter the
//! interpreter.
//!
//! Every capability here is a descriptor the host supplies: [`HostSeq`]
//! and [`HostRecord`] expose host collections to scripts, and
//! [`FromValue`] describes how a script value lands in a host type.
//! Opaque and proxy values keep an `Rc<dyn Any>` handle to the host value
//! they wrap, so [`Host`] binds hand it back by downcast.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::env::Frame;
use crate::error::EvalError;
use crate::eval::{Context, Evaluator, InvocationArgs};
use crate::value::Value;

// ── Handler types ─────────────────────────────────────────────────────────────

/// A native command registered by the host.
pub type BuiltinHandler = Rc<dyn Fn(&Context, CallArgs) -> Result<Value, EvalError>>;

/// Fallback invoked for names that resolve to no command or macro.
pub type MissingHandler = Rc<dyn Fn(&Context, &str, CallArgs) -> Result<Value, EvalError>>;

/// Wrap a host handler as an invokable command value.
pub(crate) fn builtin_value(f: BuiltinHandler) -> Value {
    Value::builtin(move |ctx, inv| f(ctx, CallArgs::new(inv)))
}

// ── Proxy descriptors ─────────────────────────────────────────────────────────

/// A host sequence surfaced to scripts as a listable value.  Elements are
/// converted on access.
pub trait HostSeq: 'static {
    fn len(&self) -> usize;
    fn get(&self, i: usize) -> Value;
}

impl<T> HostSeq for Vec<T>
where
    T: Clone + Into<Value> + 'static,
{
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, i: usize) -> Value {
        self[i].clone().into()
    }
}

/// A host record surfaced to scripts as a hashable value.  Iteration order
/// is the declaration order of `field_names`; a `None` field reads as nil.
pub trait HostRecord: 'static {
    fn field_names(&self) -> &'static [&'static str];
    fn field(&self, name: &str) -> Option<Value>;
}

// ── Bind targets ──────────────────────────────────────────────────────────────

/// Evaluation handles available while binding (used by [`Callable`]).
pub struct BindCx<'a> {
    pub(crate) eval: &'a Evaluator,
    pub(crate) frame: &'a Rc<Frame>,
}

/// A host type that script values can bind into.  Tuples compose targets,
/// consuming one cursor slot per scalar.
pub trait FromValue: Sized {
    const SLOTS: usize = 1;

    fn from_values(vals: &[Value], cx: &BindCx<'_>) -> Result<Self, EvalError>;

    /// Non-consuming, non-failing variant of the same matching.
    fn can_from(vals: &[Value]) -> bool;
}

/// Any value binds to a string through its display form.
impl FromValue for String {
    fn from_values(vals: &[Value], _cx: &BindCx<'_>) -> Result<Self, EvalError> {
        match &vals[0] {
            Value::Nil => Ok(String::new()),
            v => Ok(v.to_string()),
        }
    }

    fn can_from(_vals: &[Value]) -> bool {
        true
    }
}

/// Integers bind only from integer values.
impl FromValue for i64 {
    fn from_values(vals: &[Value], _cx: &BindCx<'_>) -> Result<Self, EvalError> {
        match &vals[0] {
            Value::Int(n) => Ok(*n),
            other => Err(EvalError::arg(format!(
                "expected an int argument, found {}",
                other.type_name()
            ))),
        }
    }

    fn can_from(vals: &[Value]) -> bool {
        matches!(vals[0], Value::Int(_))
    }
}

/// The "any" escape: the raw value.
impl FromValue for Value {
    fn from_values(vals: &[Value], _cx: &BindCx<'_>) -> Result<Self, EvalError> {
        Ok(vals[0].clone())
    }

    fn can_from(_vals: &[Value]) -> bool {
        true
    }
}

/// A shared handle to the host value behind an opaque or proxy.
pub struct Host<T>(pub Rc<T>);

impl<T: Any> FromValue for Host<T> {
    fn from_values(vals: &[Value], _cx: &BindCx<'_>) -> Result<Self, EvalError> {
        host_obj(&vals[0])?
            .downcast::<T>()
            .map(Host)
            .map_err(|_| EvalError::arg("host value has a different type"))
    }

    fn can_from(vals: &[Value]) -> bool {
        match host_obj(&vals[0]) {
            Ok(obj) => obj.is::<T>(),
            Err(_) => false,
        }
    }
}

fn host_obj(v: &Value) -> Result<Rc<dyn Any>, EvalError> {
    match v {
        Value::Opaque(o) => Ok(o.obj.clone()),
        Value::Seq(p) => Ok(p.obj.clone()),
        Value::Record(p) => Ok(p.obj.clone()),
        other => Err(EvalError::arg(format!(
            "expected a host value, found {}",
            other.type_name()
        ))),
    }
}

impl FromValue for Callable {
    fn from_values(vals: &[Value], cx: &BindCx<'_>) -> Result<Self, EvalError> {
        if !vals[0].is_invokable() {
            return Err(EvalError::arg(format!(
                "expected an invokable argument, found {}",
                vals[0].type_name()
            )));
        }
        Ok(Callable {
            inner: Some(CallableInner {
                target: vals[0].clone(),
                eval: cx.eval.clone(),
                frame: cx.frame.clone(),
            }),
        })
    }

    fn can_from(vals: &[Value]) -> bool {
        vals[0].is_invokable()
    }
}

impl<A: FromValue, B: FromValue> FromValue for (A, B) {
    const SLOTS: usize = A::SLOTS + B::SLOTS;

    fn from_values(vals: &[Value], cx: &BindCx<'_>) -> Result<Self, EvalError> {
        let (a, b) = vals.split_at(A::SLOTS);
        Ok((A::from_values(a, cx)?, B::from_values(b, cx)?))
    }

    fn can_from(vals: &[Value]) -> bool {
        let (a, b) = vals.split_at(A::SLOTS);
        A::can_from(a) && B::can_from(b)
    }
}

impl<A: FromValue, B: FromValue, C: FromValue> FromValue for (A, B, C) {
    const SLOTS: usize = A::SLOTS + B::SLOTS + C::SLOTS;

    fn from_values(vals: &[Value], cx: &BindCx<'_>) -> Result<Self, EvalError> {
        let (a, rest) = vals.split_at(A::SLOTS);
        let (b, c) = rest.split_at(B::SLOTS);
        Ok((
            A::from_values(a, cx)?,
            B::from_values(b, cx)?,
            C::from_values(c, cx)?,
        ))
    }

    fn can_from(vals: &[Value]) -> bool {
        let (a, rest) = vals.split_at(A::SLOTS);
        let (b, c) = rest.split_at(B::SLOTS);
        A::can_from(a) && B::can_from(b) && C::can_from(c)
    }
}

// ── CallArgs ──────────────────────────────────────────────────────────────────

/// The argument view a host builtin receives: a cursor over the positional
/// arguments plus the switch map.
pub struct CallArgs {
    inner: InvocationArgs,
    pos: usize,
}

impl CallArgs {
    pub(crate) fn new(inner: InvocationArgs) -> CallArgs {
        CallArgs { inner, pos: 0 }
    }

    /// Positional arguments remaining at the cursor.
    pub fn n_args(&self) -> usize {
        self.inner.args.len() - self.pos
    }

    fn rest(&self) -> &[Value] {
        &self.inner.args[self.pos..]
    }

    fn bind_cx(&self) -> BindCx<'_> {
        BindCx {
            eval: &self.inner.eval,
            frame: &self.inner.frame,
        }
    }

    /// Bind the next positional argument(s) into a host type, advancing the
    /// cursor on success.  Tuple targets bind several arguments at once.
    pub fn bind<T: FromValue>(&mut self) -> Result<T, EvalError> {
        if self.n_args() < T::SLOTS {
            return Err(EvalError::arg("wrong number of arguments"));
        }
        let v = T::from_values(&self.rest()[..T::SLOTS], &self.bind_cx())?;
        self.pos += T::SLOTS;
        Ok(v)
    }

    /// Whether [`CallArgs::bind`] with the same target would succeed; does
    /// not move the cursor.
    pub fn can_bind<T: FromValue>(&self) -> bool {
        self.n_args() >= T::SLOTS && T::can_from(&self.rest()[..T::SLOTS])
    }

    /// Shorthand for binding the host value behind an opaque or proxy.
    pub fn bind_host<T: Any>(&mut self) -> Result<Rc<T>, EvalError> {
        self.bind::<Host<T>>().map(|h| h.0)
    }

    /// Advance the cursor without binding.
    pub fn shift(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.inner.args.len());
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.inner.kwargs.contains_key(name)
    }

    /// Bind a switch's value.  A switch that is absent, or whose value
    /// count does not match the target, binds nothing.
    pub fn bind_switch<T: FromValue>(&self, name: &str) -> Result<Option<T>, EvalError> {
        let vals = match self.inner.kwargs.get(name) {
            Some(vals) if vals.len() == T::SLOTS => vals,
            _ => return Ok(None),
        };
        T::from_values(vals, &self.bind_cx()).map(Some)
    }

    /// True when the invocation runs in the root frame; commands that
    /// refuse to run nested check this.
    pub fn is_top_level(&self) -> bool {
        self.inner.frame.is_root()
    }
}

// ── Callable ──────────────────────────────────────────────────────────────────

/// A script callable captured by host code.  Holds the evaluator, the frame
/// it was bound in, and the target, so the host can invoke it well after
/// the binding builtin returned.  A default-constructed handle is nil and
/// invokes to nil.
#[derive(Clone, Default)]
pub struct Callable {
    inner: Option<CallableInner>,
}

#[derive(Clone)]
struct CallableInner {
    target: Value,
    eval: Evaluator,
    frame: Rc<Frame>,
}

impl Callable {
    pub fn is_nil(&self) -> bool {
        self.inner.is_none()
    }

    /// Re-enter the interpreter and invoke the captured target.
    pub fn invoke(&self, ctx: &Context, args: &[Value]) -> Result<Value, EvalError> {
        match &self.inner {
            None => Ok(Value::Nil),
            Some(inner) => inner.eval.invoke(
                ctx,
                &inner.frame,
                &inner.target,
                args.to_vec(),
                HashMap::new(),
            ),
        }
    }
}

// ── Modules ───────────────────────────────────────────────────────────────────

/// A namespaced pack of builtins; each entry registers as `name:key`.
pub struct Module {
    pub(crate) name: String,
    pub(crate) builtins: Vec<(String, BuiltinHandler)>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            builtins: Vec::new(),
        }
    }

    pub fn builtin(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Context, CallArgs) -> Result<Value, EvalError> + 'static,
    ) -> Module {
        self.builtins.push((name.into(), Rc::new(f)));
        self
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_can_from() {
        assert!(String::can_from(&[Value::from("x")]));
        assert!(String::can_from(&[Value::Int(3)]));
        assert!(i64::can_from(&[Value::Int(3)]));
        assert!(!i64::can_from(&[Value::from("3")]));
    }

    #[test]
    fn tuple_slots_compose() {
        assert_eq!(<(String, i64)>::SLOTS, 2);
        assert_eq!(<(String, i64, Value)>::SLOTS, 3);
        assert!(<(String, i64)>::can_from(&[Value::from("a"), Value::Int(1)]));
        assert!(!<(String, i64)>::can_from(&[Value::from("a"), Value::from("b")]));
    }

    #[test]
    fn host_downcast() {
        struct Thing(#[allow(dead_code)] u8);
        let v = Value::opaque(Thing(7));
        assert!(Host::<Thing>::can_from(std::slice::from_ref(&v)));
        assert!(!Host::<String>::can_from(std::slice::from_ref(&v)));
        assert!(!Host::<Thing>::can_from(&[Value::Int(1)]));
    }

    #[test]
    fn vec_is_a_host_seq() {
        let seq: &dyn HostSeq = &vec![1i64, 2, 3];
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.get(2), Value::Int(3));
    }

    #[test]
    fn default_callable_is_nil() {
        assert!(Callable::default().is_nil());
    }
}
