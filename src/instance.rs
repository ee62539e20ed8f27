//! The embeddable interpreter instance.
//!
//! An [`Instance`] owns the root frame (with the default command table
//! installed), the output writer, and the optional missing-command
//! handler.  Hosts construct one through [`Instance::builder`], register
//! extra builtins, and then call [`Instance::eval`] or
//! [`Instance::eval_and_display`] per script.
//!
//! A single instance is single-threaded: one `eval` at a time.  Separate
//! instances are fully independent.

use std::cell::RefCell;
use std::io;
use std::io::Write;
use std::rc::Rc;

use crate::builtins;
use crate::env::Frame;
use crate::error::EvalError;
use crate::eval::{Context, Evaluator};
use crate::host::{builtin_value, CallArgs, MissingHandler, Module};
use crate::parser::parse;
use crate::value::Value;

// ── Instance ──────────────────────────────────────────────────────────────────

pub(crate) struct InstCore {
    pub(crate) out: RefCell<Box<dyn io::Write>>,
    pub(crate) missing: Option<MissingHandler>,
    pub(crate) root: Rc<Frame>,
}

pub struct Instance {
    core: Rc<InstCore>,
}

impl Default for Instance {
    fn default() -> Self {
        Instance::new()
    }
}

impl Instance {
    /// An instance with the default builtins, writing to stdout.
    pub fn new() -> Instance {
        Instance::builder().build()
    }

    pub fn builder() -> InstanceBuilder {
        InstanceBuilder {
            out: Box::new(io::stdout()),
            missing: None,
            modules: Vec::new(),
        }
    }

    /// Register a host builtin in the root command table.
    pub fn set_builtin(
        &self,
        name: &str,
        f: impl Fn(&Context, CallArgs) -> Result<Value, EvalError> + 'static,
    ) {
        self.core.root.add_cmd(name, builtin_value(Rc::new(f)));
    }

    fn evaluator(&self) -> Evaluator {
        Evaluator {
            core: self.core.clone(),
        }
    }

    /// Parse and evaluate `src`, returning the last pipeline's value.
    ///
    /// A halt unwinds cleanly to a nil result.  Uncaught control signals
    /// (`break` outside a loop and friends) surface as errors.
    pub fn eval(&self, ctx: &Context, src: &str) -> Result<Value, EvalError> {
        match self.eval_raw(ctx, src) {
            Err(EvalError::Halt) => Ok(Value::Nil),
            other => other,
        }
    }

    /// Like [`Instance::eval`], but write the result's human-readable form
    /// to the output writer: lists print one element per line, nil prints
    /// as `(nil)`.
    pub fn eval_and_display(&self, ctx: &Context, src: &str) -> Result<(), EvalError> {
        match self.eval_raw(ctx, src) {
            Ok(v) => self.display_result(&v),
            Err(EvalError::Halt) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn eval_raw(&self, ctx: &Context, src: &str) -> Result<Value, EvalError> {
        let script = parse(src)?;
        self.evaluator()
            .eval_statements(ctx, &self.core.root, &script.statements)
    }

    fn display_result(&self, v: &Value) -> Result<(), EvalError> {
        if v.is_listable() {
            for i in 0..v.list_len() {
                self.display_result(&v.list_index(i))?;
            }
            return Ok(());
        }
        writeln!(self.core.out.borrow_mut(), "{v}").map_err(|e| EvalError::Host(e.to_string()))
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Configuration for a new [`Instance`]; the option set is closed.
pub struct InstanceBuilder {
    out: Box<dyn io::Write>,
    missing: Option<MissingHandler>,
    modules: Vec<Module>,
}

impl InstanceBuilder {
    /// Line-oriented output destination for `echo` and result display.
    pub fn output(mut self, w: impl io::Write + 'static) -> Self {
        self.out = Box::new(w);
        self
    }

    /// Fallback for command names that resolve to nothing.
    pub fn missing_handler(
        mut self,
        f: impl Fn(&Context, &str, CallArgs) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        self.missing = Some(Rc::new(f));
        self
    }

    /// Register a namespaced builtin pack; each entry lands in the command
    /// table as `module:name`.
    pub fn module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    pub fn build(self) -> Instance {
        let root = Frame::new_root();
        builtins::register(&root);
        for module in self.modules {
            for (key, f) in module.builtins {
                root.add_cmd(&format!("{}:{key}", module.name), builtin_value(f));
            }
        }
        Instance {
            core: Rc::new(InstCore {
                out: RefCell::new(self.out),
                missing: self.missing,
                root,
            }),
        }
    }
}

// ── Line-oriented writer adapter ──────────────────────────────────────────────

/// Adapt a per-line callback into an [`io::Write`], for hosts that consume
/// output line by line (a REPL widget, a log pane).
pub fn line_writer<F: FnMut(String)>(f: F) -> LineWriter<F> {
    LineWriter {
        buf: Vec::new(),
        f,
    }
}

pub struct LineWriter<F> {
    buf: Vec<u8>,
    f: F,
}

impl<F: FnMut(String)> io::Write for LineWriter<F> {
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        for &b in p {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                (self.f)(line);
            } else {
                self.buf.push(b);
            }
        }
        Ok(p.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_returns_last_value() {
        let inst = Instance::new();
        let ctx = Context::new();
        let v = inst.eval(&ctx, "set x \"hi\" ; cat $x \"!\"").unwrap();
        assert_eq!(v, Value::from("hi!"));
    }

    #[test]
    fn cancelled_context_halts_to_nil() {
        let inst = Instance::new();
        let ctx = Context::new();
        ctx.cancel();
        let v = inst.eval(&ctx, "echo \"never\"").unwrap();
        assert_eq!(v, Value::Nil);
    }

    #[test]
    fn uncaught_break_is_an_error() {
        let inst = Instance::new();
        let err = inst.eval(&Context::new(), "break").unwrap_err();
        assert!(matches!(err, EvalError::Break(_)));
    }

    #[test]
    fn line_writer_splits_lines() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = lines.clone();
        let mut w = line_writer(move |line| sink.borrow_mut().push(line));
        w.write_all(b"one\ntw").unwrap();
        w.write_all(b"o\n").unwrap();
        assert_eq!(*lines.borrow(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn display_via_line_writer() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = lines.clone();
        let inst = Instance::builder()
            .output(line_writer(move |line| sink.borrow_mut().push(line)))
            .build();
        inst.eval_and_display(&Context::new(), "echo \"hello\"")
            .unwrap();
        assert_eq!(*lines.borrow(), vec!["hello".to_string(), "(nil)".to_string()]);
    }
}
