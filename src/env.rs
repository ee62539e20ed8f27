//! Evaluation frames: lexically scoped variables plus the command and
//! macro tables.
//!
//! Frames form a parent chain shared through `Rc`; closures keep their
//! defining frame alive by holding one of these handles.  The per-frame maps
//! sit behind `RefCell` so `set` can mutate an outer binding through a
//! shared handle.
//!
//! Two registration rules are load-bearing:
//!
//! - Commands and macros always live in the root frame, wherever the
//!   registering code runs.  `proc f { ... }` inside a nested scope makes
//!   `f` callable at the top level.
//! - Variable writes use "set or define": the nearest enclosing frame that
//!   already binds the name is updated, otherwise the current frame gains
//!   the binding.  This is what lets closures observe mutations of captured
//!   variables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::MacroFn;
use crate::value::Value;

pub struct Frame {
    parent: Option<Rc<Frame>>,
    vars: RefCell<HashMap<String, Value>>,
    cmds: RefCell<HashMap<String, Value>>,
    macros: RefCell<HashMap<String, MacroFn>>,
}

impl Frame {
    pub fn new_root() -> Rc<Frame> {
        Rc::new(Frame {
            parent: None,
            vars: RefCell::new(HashMap::new()),
            cmds: RefCell::new(HashMap::new()),
            macros: RefCell::new(HashMap::new()),
        })
    }

    /// Push a child scope.
    pub fn fork(self: &Rc<Frame>) -> Rc<Frame> {
        Rc::new(Frame {
            parent: Some(self.clone()),
            vars: RefCell::new(HashMap::new()),
            cmds: RefCell::new(HashMap::new()),
            macros: RefCell::new(HashMap::new()),
        })
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    fn root_ref(&self) -> &Frame {
        let mut frame = self;
        while let Some(parent) = &frame.parent {
            frame = parent;
        }
        frame
    }

    // ── Variables ─────────────────────────────────────────────────────────────

    /// Strict lexical read, walking parent-ward.
    pub fn get_var(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.get_var(name))
    }

    /// Assign to the nearest enclosing binding, or define here.
    pub fn set_or_define(&self, name: &str, value: Value) {
        if !self.try_set(name, &value) {
            self.vars.borrow_mut().insert(name.to_owned(), value);
        }
    }

    fn try_set(&self, name: &str, value: &Value) -> bool {
        if self.vars.borrow().contains_key(name) {
            self.vars.borrow_mut().insert(name.to_owned(), value.clone());
            return true;
        }
        match &self.parent {
            Some(p) => p.try_set(name, value),
            None => false,
        }
    }

    /// Bind in this frame only, shadowing any outer binding.  Used for
    /// formal parameters.
    pub fn define(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_owned(), value);
    }

    // ── Commands & macros ─────────────────────────────────────────────────────

    /// Register an invokable under `name` in the root frame.
    pub fn add_cmd(&self, name: &str, cmd: Value) {
        self.root_ref().cmds.borrow_mut().insert(name.to_owned(), cmd);
    }

    pub fn add_macro(&self, name: &str, mac: MacroFn) {
        self.root_ref()
            .macros
            .borrow_mut()
            .insert(name.to_owned(), mac);
    }

    pub fn lookup_cmd(&self, name: &str) -> Option<Value> {
        if let Some(cmd) = self.cmds.borrow().get(name) {
            return Some(cmd.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup_cmd(name))
    }

    pub fn lookup_macro(&self, name: &str) -> Option<MacroFn> {
        if let Some(mac) = self.macros.borrow().get(name) {
            return Some(mac.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup_macro(name))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
