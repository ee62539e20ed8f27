//! Optional builtin module packs.
//!
//! These are ordinary host registrations bundled for convenience; nothing
//! in the core depends on them.  Register with
//! [`InstanceBuilder::module`](crate::InstanceBuilder::module), after which
//! scripts call them by qualified name (`os:env`, `fs:lines`).

use std::path::PathBuf;

use crate::error::EvalError;
use crate::host::Module;
use crate::value::Value;

/// `os:env name [default]`: environment variable lookup.  Returns the
/// variable's value, else the default (of any shape), else `""`.
pub fn os() -> Module {
    Module::new("os").builtin("env", |_ctx, mut args| {
        let name: String = args.bind()?;
        if let Ok(v) = std::env::var(&name) {
            return Ok(Value::from(v));
        }
        if let Ok(default) = args.bind::<Value>() {
            return Ok(default);
        }
        Ok(Value::from(""))
    })
}

/// `fs:lines path`: read a file under `root` into a list of line strings.
/// The root acts as a sandbox prefix for hosts that expose a limited tree.
pub fn fs(root: impl Into<PathBuf>) -> Module {
    let root = root.into();
    Module::new("fs").builtin("lines", move |_ctx, mut args| {
        let name: String = args.bind()?;
        let path = root.join(&name);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| EvalError::Host(format!("{}: {e}", path.display())))?;
        let lines: Vec<String> = content.lines().map(str::to_owned).collect();
        Ok(Value::from(lines))
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
