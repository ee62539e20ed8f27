//! UCL: an embeddable command language.
//!
//! UCL's surface is a shell/Tcl hybrid: whitespace-separated commands,
//! pipelines via `|`, nested invocations via `(...)`, block literals via
//! `{ ... }`, and list/hash literals via `[ ... ]`.  The crate provides:
//!
//! - A lexer and recursive-descent parser producing an immutable tree
//! - A tree-walking evaluator over lexically scoped frames
//! - A tagged value model, including proxies for host data
//! - Pipelines that thread each stage's value into the next command
//! - Macros (`if`, `foreach`, `proc`) that receive unevaluated arguments
//! - A host-interop layer: argument binding, callable handles, and
//!   namespaced builtin modules
//!
//! # Quick start
//!
//! ```
//! use ucl::{Context, Instance, Value};
//!
//! let inst = Instance::new();
//! let ctx = Context::new();
//!
//! inst.set_builtin("greet", |_ctx, mut args| {
//!     let name: String = args.bind()?;
//!     Ok(Value::from(format!("Hello, {name}")))
//! });
//!
//! let v = inst.eval(&ctx, r#"greet "world" | toUpper"#).unwrap();
//! assert_eq!(v, Value::from("HELLO, WORLD"));
//! ```

pub mod ast;
mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod host;
pub mod instance;
pub mod lexer;
pub mod modules;
pub mod parser;
pub mod value;

// Re-exports for convenience.
pub use error::{EvalError, ParseError};
pub use eval::Context;
pub use host::{BuiltinHandler, CallArgs, Callable, FromValue, Host, HostRecord, HostSeq, Module};
pub use instance::{line_writer, Instance, InstanceBuilder};
pub use parser::parse;
pub use value::Value;
