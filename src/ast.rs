//! Syntax tree for UCL scripts.
//!
//! A script is a sequence of pipelines separated by newlines or semicolons.
//! Each pipeline chains commands with `|`; each command is a head dot-chain
//! followed by argument dot-chains.  Parsed trees are immutable; block nodes
//! are reference-counted so closures can share them for their whole lifetime.

use std::rc::Rc;

/// A whole script: statement pipelines in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub statements: Vec<Pipeline>,
}

/// Commands joined by `|`.  Always non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub cmds: Vec<Cmd>,
}

/// A single command: the head names (or evaluates to) the thing being
/// invoked; the rest are its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Cmd {
    pub head: DotChain,
    pub args: Vec<DotChain>,
}

/// An argument with zero or more `.suffix` selectors applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct DotChain {
    pub arg: Arg,
    pub suffixes: Vec<DotSuffix>,
}

impl DotChain {
    /// The bare identifier this chain consists of, if it is exactly that.
    pub fn as_ident(&self) -> Option<&str> {
        if !self.suffixes.is_empty() {
            return None;
        }
        match &self.arg {
            Arg::Ident(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// A `.suffix` selector: a literal key or a computed one.
#[derive(Debug, Clone, PartialEq)]
pub enum DotSuffix {
    /// `.name` (possibly `a:b` qualified).
    Key(String),
    /// `.(pipeline)`.
    Sub(Pipeline),
}

/// One argument position.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Double-quoted string literal (escapes already processed).
    Str(String),
    Int(i64),
    /// Bare identifier, `:`-joined if qualified; a leading `-` marks a
    /// switch flag at argument position.
    Ident(String),
    /// `$name`.
    Var(String),
    /// `(pipeline)`; `None` is the empty `()`, which evaluates to nil.
    Sub(Option<Box<Pipeline>>),
    ListOrHash(ListHash),
    Block(Rc<Block>),
}

/// A `[ ... ]` literal.  Whether it is a list or a hash is decided by the
/// first element pair: a `:` separator makes it (and every other element) a
/// key/value pair.
#[derive(Debug, Clone, PartialEq)]
pub enum ListHash {
    /// `[]`
    EmptyList,
    /// `[:]`
    EmptyHash,
    Pairs(Vec<ElementPair>),
}

/// `left` or `left : right` inside a `[ ... ]` literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementPair {
    pub left: Arg,
    pub right: Option<Arg>,
}

/// A `{ |params| statements }` literal.  Not yet a closure; a block picks up
/// a captured frame only when `proc` wraps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub params: Vec<String>,
    pub statements: Vec<Pipeline>,
}
