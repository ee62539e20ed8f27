//! Property tests for the lexer, parser, and a few evaluation laws.

use proptest::prelude::*;
use ucl::lexer::{tokenize, Token};
use ucl::{parse, Context, Instance, Value};

proptest! {
    /// The parser returns Ok or Err on arbitrary input; it never panics.
    #[test]
    fn parser_does_not_panic(s in "\\PC*") {
        let _ = parse(&s);
    }
}

proptest! {
    /// Integer literals lex to their value, including negatives.
    #[test]
    fn int_literals_roundtrip(n in any::<i64>()) {
        let toks = tokenize(&n.to_string()).unwrap();
        prop_assert_eq!(&toks[0].token, &Token::Int(n));
    }
}

proptest! {
    /// Identifiers lex as a single token covering the whole spelling.
    #[test]
    fn idents_lex_whole(s in "[a-zA-Z_][a-zA-Z0-9_-]{0,20}") {
        let toks = tokenize(&s).unwrap();
        prop_assert_eq!(&toks[0].token, &Token::Ident(s.clone()));
        prop_assert_eq!(&toks[1].token, &Token::Eof);
    }
}

proptest! {
    /// String literals round-trip through escaping and the lexer.
    #[test]
    fn string_literals_roundtrip(s in "\\PC*") {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\t', "\\t")
            .replace('\r', "\\r");
        let toks = tokenize(&format!("\"{escaped}\"")).unwrap();
        prop_assert_eq!(&toks[0].token, &Token::Str(s.clone()));
    }
}

proptest! {
    /// `set` returns the stored value and `$name` reads it back.
    #[test]
    fn set_then_read_roundtrips(n in any::<i64>()) {
        let inst = Instance::new();
        let v = inst.eval(&Context::new(), &format!("set x {n} ; cat $x")).unwrap();
        prop_assert_eq!(v, Value::from(n.to_string()));
    }
}

proptest! {
    /// A list literal of string elements evaluates to a list of the same
    /// length, in order.
    #[test]
    fn list_literals_preserve_order(items in proptest::collection::vec("[a-z]{1,8}", 0..8)) {
        let inst = Instance::new();
        inst.set_builtin("firstarg", |_ctx, mut args| args.bind::<Value>());

        let literal = if items.is_empty() {
            "[]".to_string()
        } else {
            format!("[{}]", items.iter().map(|s| format!("{s:?}")).collect::<Vec<_>>().join(" "))
        };
        let v = inst.eval(&Context::new(), &format!("firstarg {literal}")).unwrap();
        prop_assert_eq!(v.list_len(), items.len());
        for (i, item) in items.iter().enumerate() {
            prop_assert_eq!(v.list_index(i), Value::from(item.as_str()));
        }
    }
}
