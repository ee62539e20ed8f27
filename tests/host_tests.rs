//! Host-interop tests: argument binding, switches, host value round-trips,
//! opaques, callable handles, the missing-command handler, and top-level
//! detection.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ucl::{Callable, Context, Host, Instance, Value};

// ── Binding positional arguments ──────────────────────────────────────────────

#[test]
fn bind_two_strings() {
    let inst = Instance::new();
    inst.set_builtin("add2", |_ctx, mut args| {
        let (x, y): (String, String) = args.bind()?;
        Ok(Value::from(x + &y))
    });

    let res = inst
        .eval(&Context::new(), r#"add2 "Hello, " "World""#)
        .unwrap();
    assert_eq!(res, Value::from("Hello, World"));
}

#[test]
fn bind_advances_the_cursor() {
    let inst = Instance::new();
    inst.set_builtin("add2", |_ctx, mut args| {
        let x: String = args.bind()?;
        let y: String = args.bind()?;
        Ok(Value::from(x + &y))
    });

    let res = inst
        .eval(&Context::new(), r#"add2 "Hello, " "World""#)
        .unwrap();
    assert_eq!(res, Value::from("Hello, World"));
}

#[test]
fn bind_wrong_arity_fails() {
    let inst = Instance::new();
    inst.set_builtin("add2", |_ctx, mut args| {
        let (x, y): (String, String) = args.bind()?;
        Ok(Value::from(x + &y))
    });

    let err = inst.eval(&Context::new(), r#"add2 "only one""#).unwrap_err();
    assert_eq!(err.kind(), "arg error");
}

#[test]
fn bind_int_requires_int() {
    let inst = Instance::new();
    inst.set_builtin("wantInt", |_ctx, mut args| {
        let n: i64 = args.bind()?;
        Ok(Value::Int(n * 2))
    });

    let ctx = Context::new();
    assert_eq!(inst.eval(&ctx, "wantInt 21").unwrap(), Value::Int(42));
    assert!(inst.eval(&ctx, r#"wantInt "21""#).is_err());
}

// ── Switches ──────────────────────────────────────────────────────────────────

#[test]
fn switches_group_values_by_name() {
    let inst = Instance::new();
    inst.set_builtin("add2", |_ctx, args| {
        let sep: String = args.bind_switch("sep")?.unwrap_or_default();
        let x: String = args.bind_switch("left")?.unwrap_or_default();
        let y: String = args.bind_switch("right")?.unwrap_or_default();
        let mut v = format!("{x}{sep}{y}");
        if args.has_switch("upcase") {
            v = v.to_uppercase();
        }
        Ok(Value::from(v))
    });

    let ctx = Context::new();
    let cases = [
        (r#"add2 -sep ", " -right "world" -left "Hello""#, "Hello, world"),
        (r#"add2 -right "right" -left "left" -sep ":""#, "left:right"),
        (r#"add2 -left "left" -sep ":" -right "right" -upcase"#, "LEFT:RIGHT"),
    ];
    for (expr, want) in cases {
        assert_eq!(inst.eval(&ctx, expr).unwrap(), Value::from(want), "for {expr:?}");
    }
}

// ── Host values behind opaques ────────────────────────────────────────────────

#[derive(Debug, PartialEq, Clone)]
struct Pair {
    x: String,
    y: String,
}

#[test]
fn builtin_returns_host_value() {
    let inst = Instance::new();
    inst.set_builtin("add2", |_ctx, mut args| {
        let (x, y): (String, String) = args.bind()?;
        Ok(Value::opaque(Pair { x, y }))
    });

    let res = inst
        .eval(&Context::new(), r#"add2 "Hello" "World""#)
        .unwrap();
    assert!(matches!(res, Value::Opaque(_)), "expected an opaque, got {res:?}");
}

#[test]
fn host_value_round_trips_through_args_and_vars() {
    for expr in [
        r#"join (add2 "left" "right")"#,
        r#"set x (add2 "blue" "green") ; join $x"#,
    ] {
        let inst = Instance::new();
        inst.set_builtin("add2", |_ctx, mut args| {
            let (x, y): (String, String) = args.bind()?;
            Ok(Value::opaque(Pair { x, y }))
        });
        inst.set_builtin("join", |_ctx, mut args| {
            let pair: Rc<Pair> = args.bind_host()?;
            Ok(Value::from(format!("{}:{}", pair.x, pair.y)))
        });

        let res = inst.eval(&Context::new(), expr).unwrap();
        let want = if expr.starts_with("join") {
            "left:right"
        } else {
            "blue:green"
        };
        assert_eq!(res, Value::from(want), "for {expr:?}");
    }
}

#[test]
fn host_sequences_are_lists() {
    let inst = Instance::new();
    inst.set_builtin("countTo3", |_ctx, _args| {
        Ok(Value::seq_of(vec!["1", "2", "3"]))
    });

    let ctx = Context::new();
    let v = inst.eval(&ctx, "countTo3").unwrap();
    assert_eq!(v.list_len(), 3);
    assert_eq!(v.list_index(0), Value::from("1"));
    assert_eq!(v.list_index(2), Value::from("3"));

    // And they iterate.
    let out = Rc::new(RefCell::new(String::new()));
    let sink = out.clone();
    let inst = Instance::builder()
        .output(ucl::line_writer(move |line| {
            let mut buf = sink.borrow_mut();
            buf.push_str(&line);
            buf.push('\n');
        }))
        .build();
    inst.set_builtin("countTo3", |_ctx, _args| {
        Ok(Value::seq_of(vec!["1", "2", "3"]))
    });
    inst.eval(&ctx, "foreach (countTo3) { |x| echo $x }").unwrap();
    assert_eq!(*out.borrow(), "1\n2\n3\n");
}

// ── Opaques ───────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Clone)]
struct OpaqueThing {
    x: String,
    y: String,
    z: String,
}

fn opaque_instance() -> (Instance, Rc<RefCell<OpaqueThing>>) {
    let thing = Rc::new(RefCell::new(OpaqueThing {
        x: "do".into(),
        y: "not".into(),
        z: "touch".into(),
    }));

    let inst = Instance::new();
    let shared = thing.clone();
    inst.set_builtin("getOpaque", move |_ctx, _args| {
        Ok(Value::opaque_rc(shared.clone()))
    });
    inst.set_builtin("setProp", |_ctx, mut args| {
        let thing: Rc<RefCell<OpaqueThing>> = args.bind_host()?;
        let mut thing = thing.borrow_mut();
        if let Some(x) = args.bind_switch::<String>("x")? {
            thing.x = x;
        }
        if let Some(y) = args.bind_switch::<String>("y")? {
            thing.y = y;
        }
        if let Some(z) = args.bind_switch::<String>("z")? {
            thing.z = z;
        }
        Ok(Value::Nil)
    });

    (inst, thing)
}

#[test]
fn opaques_carry_by_identity() {
    let (inst, thing) = opaque_instance();
    let ctx = Context::new();

    let direct = inst.eval(&ctx, "getOpaque").unwrap();
    assert_eq!(direct, Value::opaque_rc(thing.clone()));

    let carried = inst.eval(&ctx, "set x (getOpaque) ; $x").unwrap();
    assert_eq!(carried, Value::opaque_rc(thing.clone()));
}

#[test]
fn opaques_do_not_iterate() {
    let (inst, _thing) = opaque_instance();
    let err = inst
        .eval(&Context::new(), "foreach (getOpaque) { |x| echo $x }")
        .unwrap_err();
    assert_eq!(err.kind(), "type error");
}

#[test]
fn host_mutates_through_opaque_binds() {
    let (inst, thing) = opaque_instance();
    let ctx = Context::new();

    inst.eval(&ctx, r#"set x (getOpaque) ; setProp $x -x "do" -y "touch" -z "this""#)
        .unwrap();
    assert_eq!(
        *thing.borrow(),
        OpaqueThing {
            x: "do".into(),
            y: "touch".into(),
            z: "this".into()
        }
    );

    inst.eval(&ctx, r#"setProp (getOpaque) -x "yes" ; setProp (getOpaque) -y "this" -z "too""#)
        .unwrap();
    assert_eq!(
        *thing.borrow(),
        OpaqueThing {
            x: "yes".into(),
            y: "this".into(),
            z: "too".into()
        }
    );
}

#[test]
fn binding_nil_as_host_value_fails() {
    let (inst, _thing) = opaque_instance();
    let err = inst
        .eval(&Context::new(), r#"setProp $unboundVar -x "yes""#)
        .unwrap_err();
    assert_eq!(err.kind(), "arg error");
}

// ── can_bind ──────────────────────────────────────────────────────────────────

#[test]
fn can_bind_probes_without_consuming() {
    struct ProxyObj;

    let cases: [(&str, &[&str]); 4] = [
        ("probe", &[]),
        (r#"probe "yes""#, &["str"]),
        (r#"probe "yes" 213"#, &["str", "int"]),
        (r#"probe "yes" 213 (proxy)"#, &["all", "str", "int", "proxy"]),
    ];

    for (expr, want) in cases {
        let seen: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let inst = Instance::new();
        inst.set_builtin("proxy", |_ctx, _args| Ok(Value::opaque(ProxyObj)));
        inst.set_builtin("probe", move |_ctx, mut args| {
            let mut res = sink.borrow_mut();
            if args.can_bind::<(String, i64, Host<ProxyObj>)>() {
                res.push("all");
            }
            if args.can_bind::<String>() {
                res.push("str");
            }
            args.shift(1);
            if args.can_bind::<i64>() {
                res.push("int");
            }
            args.shift(1);
            if args.can_bind::<Host<ProxyObj>>() {
                res.push("proxy");
            }
            Ok(Value::Nil)
        });

        inst.eval(&Context::new(), expr).unwrap();
        assert_eq!(*seen.borrow(), want, "for {expr:?}");
    }
}

// ── Callable handles ──────────────────────────────────────────────────────────

#[test]
fn bound_callable_invokes_a_block() {
    let inst = Instance::new();
    inst.set_builtin("wrap", |ctx, mut args| {
        let inv: Callable = args.bind()?;
        let res = inv.invoke(ctx, &[Value::from("hello")])?;
        Ok(Value::from(format!("[[{res}]]")))
    });

    let res = inst
        .eval(&Context::new(), "wrap { |x| toUpper $x }")
        .unwrap();
    assert_eq!(res, Value::from("[[HELLO]]"));
}

#[test]
fn callable_outlives_the_binding_call() {
    let inst = Instance::new();
    let captured: Rc<RefCell<Callable>> = Rc::new(RefCell::new(Callable::default()));

    let slot = captured.clone();
    inst.set_builtin("wrap", move |_ctx, mut args| {
        *slot.borrow_mut() = args.bind()?;
        Ok(Value::Nil)
    });

    let ctx = Context::new();
    assert!(captured.borrow().is_nil());
    assert_eq!(
        captured.borrow().invoke(&ctx, &[Value::from("hello")]).unwrap(),
        Value::Nil
    );

    inst.eval(&ctx, "wrap { |x| toUpper $x }").unwrap();
    assert!(!captured.borrow().is_nil());
    assert_eq!(
        captured.borrow().invoke(&ctx, &[Value::from("hello")]).unwrap(),
        Value::from("HELLO")
    );
}

// ── Missing-command handler ───────────────────────────────────────────────────

#[test]
fn missing_handler_sees_name_and_args() {
    let inst = Instance::builder()
        .missing_handler(|_ctx, name, mut args| {
            if let Ok(msg) = args.bind::<String>() {
                return Ok(Value::from(format!("was {name}: {msg}")));
            }
            Ok(Value::from(format!("was {name}")))
        })
        .build();

    let ctx = Context::new();
    assert_eq!(inst.eval(&ctx, "alpha").unwrap(), Value::from("was alpha"));
    assert_eq!(
        inst.eval(&ctx, r#"bravo "this""#).unwrap(),
        Value::from("was bravo: this")
    );
    assert_eq!(inst.eval(&ctx, "charlie").unwrap(), Value::from("was charlie"));
}

// ── is_top_level ──────────────────────────────────────────────────────────────

#[test]
fn top_level_detection() {
    let seen: Rc<RefCell<HashMap<String, bool>>> = Rc::new(RefCell::new(HashMap::new()));

    let inst = Instance::new();
    let sink = seen.clone();
    inst.set_builtin("lvl", move |_ctx, mut args| {
        let n: String = args.bind()?;
        sink.borrow_mut().insert(n, args.is_top_level());
        Ok(Value::Nil)
    });

    let ctx = Context::new();
    inst.eval(&ctx, r#"lvl "one""#).unwrap();
    assert_eq!(seen.borrow()["one"], true);

    inst.eval(&ctx, r#"echo (lvl "two")"#).unwrap();
    assert_eq!(seen.borrow()["two"], true);

    inst.eval(&ctx, r#"proc doLvl { |n| lvl $n } ; doLvl "three""#)
        .unwrap();
    assert_eq!(seen.borrow()["three"], false);

    inst.eval(&ctx, r#"doLvl "four""#).unwrap();
    assert_eq!(seen.borrow()["four"], false);

    inst.eval(&ctx, r#"["a"] | map { |x| doLvl "five" ; $x }"#)
        .unwrap();
    assert_eq!(seen.borrow()["five"], false);

    inst.eval(&ctx, r#"if 1 { lvl "six" }"#).unwrap();
    assert_eq!(seen.borrow()["six"], true);
}
