//! Runtime value type for UCL.
//!
//! Values are a closed tagged union.  Compound payloads sit behind `Rc` so
//! cloning a value is cheap and blocks embedded in closures share the parsed
//! tree.  Host data enters the model three ways: sequence proxies (listable),
//! record proxies (hashable), and opaques (carry-only).
//!
//! Capability queries (`is_listable`, `is_hashable`, `is_invokable`) are what
//! the evaluator and builtins test at use sites; there is no inheritance
//! between variants.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Block;
use crate::env::Frame;
use crate::error::EvalError;
use crate::eval::{Context, InvocationArgs};
use crate::host::{HostRecord, HostSeq};

// ── Payload types ─────────────────────────────────────────────────────────────

/// A block bound to the frame where `proc` ran.
#[derive(Clone)]
pub struct ClosureValue {
    pub(crate) block: Rc<Block>,
    pub(crate) frame: Rc<Frame>,
}

/// A native command.
#[derive(Clone)]
pub struct Builtin(
    pub(crate) Rc<dyn Fn(&Context, InvocationArgs) -> Result<Value, EvalError>>,
);

/// A host sequence surfaced as a listable value.  `obj` keeps the original
/// host value alive for bind-backs; `seq` is the access descriptor.
#[derive(Clone)]
pub struct SeqProxy {
    pub(crate) obj: Rc<dyn Any>,
    pub(crate) seq: Rc<dyn HostSeq>,
}

/// A host record surfaced as a hashable value.
#[derive(Clone)]
pub struct RecordProxy {
    pub(crate) obj: Rc<dyn Any>,
    pub(crate) rec: Rc<dyn HostRecord>,
}

/// A host value carried by identity only.
#[derive(Clone)]
pub struct OpaqueValue {
    pub(crate) obj: Rc<dyn Any>,
}

// ── Value ─────────────────────────────────────────────────────────────────────

/// A UCL runtime value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Str(Rc<str>),
    Int(i64),
    Bool(bool),
    List(Rc<Vec<Value>>),
    Hash(Rc<HashMap<String, Value>>),
    /// An unevaluated block literal; becomes a closure at `proc` time.
    Block(Rc<Block>),
    Closure(Rc<ClosureValue>),
    Builtin(Builtin),
    Seq(SeqProxy),
    Record(RecordProxy),
    Opaque(OpaqueValue),
}

impl Value {
    // ── Constructors ──────────────────────────────────────────────────────────

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(Rc::from(s.into()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(items))
    }

    pub fn hash(map: HashMap<String, Value>) -> Value {
        Value::Hash(Rc::new(map))
    }

    pub(crate) fn builtin(
        f: impl Fn(&Context, InvocationArgs) -> Result<Value, EvalError> + 'static,
    ) -> Value {
        Value::Builtin(Builtin(Rc::new(f)))
    }

    /// Expose a host vector as a listable proxy; elements convert to values
    /// on access.
    pub fn seq_of<T>(items: Vec<T>) -> Value
    where
        T: Clone + Into<Value> + 'static,
    {
        let rc = Rc::new(items);
        Value::Seq(SeqProxy {
            obj: rc.clone(),
            seq: rc,
        })
    }

    /// Expose any [`HostSeq`] implementation, keeping a shared handle to it.
    pub fn seq_rc<T: HostSeq + 'static>(seq: Rc<T>) -> Value {
        Value::Seq(SeqProxy {
            obj: seq.clone(),
            seq,
        })
    }

    /// Expose a host record as a hashable proxy keyed by its field names.
    pub fn record<T: HostRecord + 'static>(rec: T) -> Value {
        Value::record_rc(Rc::new(rec))
    }

    pub fn record_rc<T: HostRecord + 'static>(rec: Rc<T>) -> Value {
        Value::Record(RecordProxy {
            obj: rec.clone(),
            rec,
        })
    }

    /// Mark a host value as carry-only: scripts can pass it around and hand
    /// it back to host commands, nothing else.
    pub fn opaque<T: 'static>(v: T) -> Value {
        Value::Opaque(OpaqueValue { obj: Rc::new(v) })
    }

    /// Like [`Value::opaque`], but sharing an existing handle so the host
    /// keeps access to the same underlying value.
    pub fn opaque_rc<T: 'static>(v: Rc<T>) -> Value {
        Value::Opaque(OpaqueValue { obj: v })
    }

    // ── Basic queries ─────────────────────────────────────────────────────────

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Str(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Hash(map) => !map.is_empty(),
            Value::Block(block) => !block.statements.is_empty(),
            Value::Closure(_) | Value::Builtin(_) => true,
            Value::Seq(p) => p.seq.len() > 0,
            Value::Record(_) | Value::Opaque(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Hash(_) => "hash",
            Value::Block(_) => "block",
            Value::Closure(_) => "proc",
            Value::Builtin(_) => "builtin",
            Value::Seq(_) => "host list",
            Value::Record(_) => "host record",
            Value::Opaque(_) => "opaque",
        }
    }

    // ── Listable capability ───────────────────────────────────────────────────

    pub fn is_listable(&self) -> bool {
        matches!(self, Value::List(_) | Value::Seq(_))
    }

    pub fn list_len(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            Value::Seq(p) => p.seq.len(),
            _ => 0,
        }
    }

    /// Element at `i`, or nil when out of range or not listable.
    pub fn list_index(&self, i: usize) -> Value {
        match self {
            Value::List(items) => items.as_slice().get(i).cloned().unwrap_or(Value::Nil),
            Value::Seq(p) => {
                if i < p.seq.len() {
                    p.seq.get(i)
                } else {
                    Value::Nil
                }
            }
            _ => Value::Nil,
        }
    }

    // ── Hashable capability ───────────────────────────────────────────────────

    pub fn is_hashable(&self) -> bool {
        matches!(self, Value::Hash(_) | Value::Record(_))
    }

    pub fn hash_len(&self) -> usize {
        match self {
            Value::Hash(map) => map.len(),
            Value::Record(p) => p.rec.field_names().len(),
            _ => 0,
        }
    }

    /// Value under `key`, or nil when absent or not hashable.
    pub fn hash_value(&self, key: &str) -> Value {
        match self {
            Value::Hash(map) => map.get(key).cloned().unwrap_or(Value::Nil),
            Value::Record(p) => p.rec.field(key).unwrap_or(Value::Nil),
            _ => Value::Nil,
        }
    }

    /// Iterate entries; records iterate in field declaration order.
    pub fn hash_each<F>(&self, mut f: F) -> Result<(), EvalError>
    where
        F: FnMut(&str, Value) -> Result<(), EvalError>,
    {
        match self {
            Value::Hash(map) => {
                for (k, v) in map.iter() {
                    f(k, v.clone())?;
                }
                Ok(())
            }
            Value::Record(p) => {
                for name in p.rec.field_names() {
                    f(name, p.rec.field(name).unwrap_or(Value::Nil))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ── Invokable capability ──────────────────────────────────────────────────

    pub fn is_invokable(&self) -> bool {
        matches!(self, Value::Block(_) | Value::Closure(_) | Value::Builtin(_))
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(Rc::new(items.into_iter().map(Into::into).collect()))
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(map: HashMap<String, T>) -> Self {
        Value::Hash(Rc::new(map.into_iter().map(|(k, v)| (k, v.into())).collect()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Nil,
        }
    }
}

// ── Display / Debug / PartialEq ───────────────────────────────────────────────

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "(nil)"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(true) => write!(f, "(true)"),
            Value::Bool(false) => write!(f, "(false)"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Hash(map) => {
                if map.is_empty() {
                    return write!(f, "[:]");
                }
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                write!(f, "[")?;
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{k}:{}", map[k.as_str()])?;
                }
                write!(f, "]")
            }
            Value::Block(_) => write!(f, "block"),
            Value::Closure(_) => write!(f, "(proc)"),
            Value::Builtin(_) => write!(f, "(builtin)"),
            Value::Seq(p) => write!(f, "(host list, {} elements)", p.seq.len()),
            Value::Record(_) => write!(f, "(host record)"),
            Value::Opaque(_) => write!(f, "(opaque)"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Hash(map) => f.debug_map().entries(map.iter()).finish(),
            other => write!(f, "{other}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Block(a), Value::Block(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Seq(a), Value::Seq(b)) => Rc::ptr_eq(&a.obj, &b.obj),
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(&a.obj, &b.obj),
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(&a.obj, &b.obj),
            _ => false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
