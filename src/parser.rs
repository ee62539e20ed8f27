//! Recursive-descent parser over the token stream.
//!
//! Grammar (statement separators written `SEP`):
//!
//! ```text
//! script      ::= SEP* (statements SEP*)?
//! statements  ::= pipeline (SEP+ pipeline)*
//! pipeline    ::= command ("|" command)*
//! command     ::= dot dot*
//! dot         ::= arg ("." dotsfx)*
//! dotsfx      ::= ident_chain | "(" pipeline ")"
//! arg         ::= Str | Int | ident_chain | "$" Ident
//!               | "(" pipeline? ")" | list_or_hash | block
//! list_or_hash::= "[" "]" | "[" ":" "]" | "[" SEP? pair+ "]"
//! pair        ::= arg (":" arg)? SEP?
//! block       ::= "{" SEP? ("|" Ident+ "|" SEP?)? statements? SEP? "}"
//! ident_chain ::= Ident (":" Ident)*
//! ```

use std::rc::Rc;

use crate::ast::{Arg, Block, Cmd, DotChain, DotSuffix, ElementPair, ListHash, Pipeline, Script};
use crate::error::ParseError;
use crate::lexer::{tokenize, Spanned, Token};

/// Parse a whole source string into a [`Script`].
pub fn parse(src: &str) -> Result<Script, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_script()
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].token.clone();
        if t != Token::Eof {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                token.describe(),
                self.peek().describe()
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let at = &self.tokens[self.pos];
        ParseError::new(message, at.line, at.column)
    }

    fn skip_seps(&mut self) {
        while self.eat(&Token::Sep) {}
    }

    // ── Script & statements ───────────────────────────────────────────────────

    fn parse_script(&mut self) -> Result<Script, ParseError> {
        self.skip_seps();
        let mut statements = Vec::new();
        while *self.peek() != Token::Eof {
            statements.push(self.parse_pipeline()?);
            self.skip_seps();
        }
        Ok(Script { statements })
    }

    /// Statements inside a `{ ... }` body, up to (not consuming) the `}`.
    fn parse_statements_until_brace(&mut self) -> Result<Vec<Pipeline>, ParseError> {
        self.skip_seps();
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => return Ok(statements),
                Token::Eof => return Err(self.error("expected \"}\", found end of input")),
                _ => {
                    statements.push(self.parse_pipeline()?);
                    self.skip_seps();
                }
            }
        }
    }

    // ── Pipelines & commands ──────────────────────────────────────────────────

    fn parse_pipeline(&mut self) -> Result<Pipeline, ParseError> {
        let mut cmds = vec![self.parse_cmd()?];
        while self.eat(&Token::Pipe) {
            cmds.push(self.parse_cmd()?);
        }
        Ok(Pipeline { cmds })
    }

    fn parse_cmd(&mut self) -> Result<Cmd, ParseError> {
        let head = self.parse_dot()?;
        let mut args = Vec::new();
        while self.starts_arg() {
            args.push(self.parse_dot()?);
        }
        Ok(Cmd { head, args })
    }

    fn starts_arg(&self) -> bool {
        matches!(
            self.peek(),
            Token::Str(_)
                | Token::Int(_)
                | Token::Ident(_)
                | Token::Dollar
                | Token::LParen
                | Token::LBracket
                | Token::LBrace
        )
    }

    fn parse_dot(&mut self) -> Result<DotChain, ParseError> {
        let arg = self.parse_arg()?;
        let mut suffixes = Vec::new();
        while self.eat(&Token::Dot) {
            suffixes.push(self.parse_dot_suffix()?);
        }
        Ok(DotChain { arg, suffixes })
    }

    fn parse_dot_suffix(&mut self) -> Result<DotSuffix, ParseError> {
        match self.peek() {
            Token::Ident(_) => Ok(DotSuffix::Key(self.parse_ident_chain()?)),
            Token::LParen => {
                self.advance();
                let sub = self.parse_pipeline()?;
                self.expect(&Token::RParen)?;
                Ok(DotSuffix::Sub(sub))
            }
            other => Err(self.error(format!(
                "expected identifier or \"(\" after \".\", found {}",
                other.describe()
            ))),
        }
    }

    // ── Arguments ─────────────────────────────────────────────────────────────

    fn parse_arg(&mut self) -> Result<Arg, ParseError> {
        match self.peek().clone() {
            Token::Str(s) => {
                self.advance();
                Ok(Arg::Str(s))
            }
            Token::Int(n) => {
                self.advance();
                Ok(Arg::Int(n))
            }
            Token::Ident(_) => Ok(Arg::Ident(self.parse_ident_chain()?)),
            Token::Dollar => {
                self.advance();
                match self.advance() {
                    Token::Ident(name) => Ok(Arg::Var(name)),
                    other => Err(self.error(format!(
                        "expected variable name after \"$\", found {}",
                        other.describe()
                    ))),
                }
            }
            Token::LParen => {
                self.advance();
                if self.eat(&Token::RParen) {
                    return Ok(Arg::Sub(None));
                }
                let sub = self.parse_pipeline()?;
                self.expect(&Token::RParen)?;
                Ok(Arg::Sub(Some(Box::new(sub))))
            }
            Token::LBracket => {
                self.advance();
                Ok(Arg::ListOrHash(self.parse_list_or_hash()?))
            }
            Token::LBrace => {
                self.advance();
                Ok(Arg::Block(Rc::new(self.parse_block()?)))
            }
            other => Err(self.error(format!("expected argument, found {}", other.describe()))),
        }
    }

    fn parse_ident_chain(&mut self) -> Result<String, ParseError> {
        let mut name = match self.advance() {
            Token::Ident(s) => s,
            other => {
                return Err(self.error(format!(
                    "expected identifier, found {}",
                    other.describe()
                )))
            }
        };
        // Qualified names: mod:sub:name.  A colon only joins when an
        // identifier follows directly; `[x: "1"]` keeps its pair colon.
        while *self.peek() == Token::Colon {
            if let Token::Ident(_) = self.tokens[self.pos + 1].token {
                self.advance();
                if let Token::Ident(part) = self.advance() {
                    name.push(':');
                    name.push_str(&part);
                }
            } else {
                break;
            }
        }
        Ok(name)
    }

    /// After the opening `[`.
    fn parse_list_or_hash(&mut self) -> Result<ListHash, ParseError> {
        if self.eat(&Token::RBracket) {
            return Ok(ListHash::EmptyList);
        }
        if self.eat(&Token::Colon) {
            self.expect(&Token::RBracket)?;
            return Ok(ListHash::EmptyHash);
        }
        self.skip_seps();
        let mut pairs = Vec::new();
        loop {
            let left = self.parse_arg()?;
            let right = if self.eat(&Token::Colon) {
                Some(self.parse_arg()?)
            } else {
                None
            };
            pairs.push(ElementPair { left, right });
            self.skip_seps();
            if self.eat(&Token::RBracket) {
                return Ok(ListHash::Pairs(pairs));
            }
            if *self.peek() == Token::Eof {
                return Err(self.error("expected \"]\", found end of input"));
            }
        }
    }

    /// After the opening `{`.
    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.skip_seps();
        let mut params = Vec::new();
        if self.eat(&Token::Pipe) {
            loop {
                match self.advance() {
                    Token::Ident(name) => params.push(name),
                    Token::Pipe if !params.is_empty() => break,
                    other => {
                        return Err(self.error(format!(
                            "expected parameter name, found {}",
                            other.describe()
                        )))
                    }
                }
            }
            self.skip_seps();
        }
        let statements = self.parse_statements_until_brace()?;
        self.expect(&Token::RBrace)?;
        Ok(Block { params, statements })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Script {
        parse(src).expect("parse failed")
    }

    fn single_cmd(src: &str) -> Cmd {
        let script = parse_ok(src);
        assert_eq!(script.statements.len(), 1);
        assert_eq!(script.statements[0].cmds.len(), 1);
        script.statements[0].cmds[0].clone()
    }

    #[test]
    fn empty_script() {
        assert!(parse_ok("").statements.is_empty());
        assert!(parse_ok("\n;;\n# just a comment\n").statements.is_empty());
    }

    #[test]
    fn command_with_args() {
        let cmd = single_cmd(r#"echo "hello " "world""#);
        assert_eq!(cmd.head.as_ident(), Some("echo"));
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.args[0].arg, Arg::Str("hello ".into()));
    }

    #[test]
    fn pipeline_chain() {
        let script = parse_ok(r#"list "a" | map { |x| toUpper $x } | joinpipe"#);
        assert_eq!(script.statements[0].cmds.len(), 3);
    }

    #[test]
    fn statements_split_on_newline_and_semicolon() {
        let script = parse_ok("echo \"a\" ; echo \"b\"\necho \"c\"");
        assert_eq!(script.statements.len(), 3);
    }

    #[test]
    fn empty_parens_are_nil() {
        let cmd = single_cmd("len ()");
        assert_eq!(cmd.args[0].arg, Arg::Sub(None));
    }

    #[test]
    fn var_reference() {
        let cmd = single_cmd("echo $name");
        assert_eq!(cmd.args[0].arg, Arg::Var("name".into()));
    }

    #[test]
    fn empty_list_and_hash() {
        assert_eq!(single_cmd("len []").args[0].arg, Arg::ListOrHash(ListHash::EmptyList));
        assert_eq!(single_cmd("len [:]").args[0].arg, Arg::ListOrHash(ListHash::EmptyHash));
    }

    #[test]
    fn list_literal() {
        let cmd = single_cmd(r#"len ["a" "b" "c"]"#);
        match &cmd.args[0].arg {
            Arg::ListOrHash(ListHash::Pairs(pairs)) => {
                assert_eq!(pairs.len(), 3);
                assert!(pairs.iter().all(|p| p.right.is_none()));
            }
            other => panic!("expected list pairs, got {other:?}"),
        }
    }

    #[test]
    fn hash_literal_with_ident_keys() {
        let cmd = single_cmd(r#"len [one:"1" two:"2"]"#);
        match &cmd.args[0].arg {
            Arg::ListOrHash(ListHash::Pairs(pairs)) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0].left, Arg::Ident("one".into()));
                assert_eq!(pairs[0].right, Some(Arg::Str("1".into())));
            }
            other => panic!("expected hash pairs, got {other:?}"),
        }
    }

    #[test]
    fn multiline_list_literal() {
        let script = parse_ok("len [\n  $one:$n1\n  three:\"3\"\n]");
        assert_eq!(script.statements.len(), 1);
    }

    #[test]
    fn block_with_params() {
        let cmd = single_cmd("map $xs { |k v| echo $k }");
        match &cmd.args[1].arg {
            Arg::Block(block) => {
                assert_eq!(block.params, vec!["k".to_string(), "v".to_string()]);
                assert_eq!(block.statements.len(), 1);
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn empty_block_bodies() {
        for src in ["proc greet {}", "proc greet {\n}", "proc greet {\n# bla\n\n# di\n}"] {
            let cmd = single_cmd(src);
            match &cmd.args[1].arg {
                Arg::Block(block) => assert!(block.statements.is_empty()),
                other => panic!("expected block, got {other:?}"),
            }
        }
    }

    #[test]
    fn params_on_their_own_line() {
        let cmd = single_cmd("proc greet {\n# doc\n|x|\n\nreturn $x\n}");
        match &cmd.args[1].arg {
            Arg::Block(block) => {
                assert_eq!(block.params, vec!["x".to_string()]);
                assert_eq!(block.statements.len(), 1);
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn qualified_command_name() {
        let cmd = single_cmd(r#"os:env "HOME""#);
        assert_eq!(cmd.head.as_ident(), Some("os:env"));
    }

    #[test]
    fn dot_suffixes() {
        let cmd = single_cmd("$x.alpha.(head $ks)");
        assert_eq!(cmd.head.suffixes.len(), 2);
        assert_eq!(cmd.head.suffixes[0], DotSuffix::Key("alpha".into()));
        assert!(matches!(cmd.head.suffixes[1], DotSuffix::Sub(_)));
    }

    #[test]
    fn switch_args_stay_idents() {
        let cmd = single_cmd(r#"add2 -sep "," -upcase"#);
        assert_eq!(cmd.args[0].arg, Arg::Ident("-sep".into()));
        assert_eq!(cmd.args[2].arg, Arg::Ident("-upcase".into()));
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let err = parse("proc greet {\necho \"hi\"").unwrap_err();
        assert!(err.message.contains("}"));
    }

    #[test]
    fn error_carries_position() {
        let err = parse("echo )").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 6);
    }
}
