//! `uclsh`: an interactive shell over the UCL interpreter.
//!
//! Usage:
//!   uclsh                 read-eval-print loop
//!   uclsh -c <cmd>        evaluate one command and exit
//!   uclsh <file>          run a script file

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use ucl::{Context, EvalError, Instance};

// ── Argument parsing ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CliArgs {
    /// Command to evaluate and exit (`-c <cmd>`).
    command: Option<String>,
    /// Script file to run.
    file: Option<String>,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut out = CliArgs::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" => {
                out.command = Some(args.next().ok_or("-c requires a command")?);
            }
            flag if flag.starts_with('-') => return Err(format!("unknown flag {flag}")),
            file => {
                if out.file.is_some() {
                    return Err("only one script file may be given".into());
                }
                out.file = Some(file.to_owned());
            }
        }
    }
    Ok(out)
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("uclsh: {e}");
            eprintln!("Usage: uclsh [-c <cmd>] [<file>]");
            std::process::exit(1);
        }
    };

    let inst = Instance::builder()
        .module(ucl::modules::os())
        .module(ucl::modules::fs("."))
        .build();
    let ctx = Context::new();

    if let Some(cmd) = args.command {
        run(&inst, &ctx, &cmd);
        return;
    }

    if let Some(file) = args.file {
        let src = match std::fs::read_to_string(&file) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("uclsh: {file}: {e}");
                std::process::exit(1);
            }
        };
        run(&inst, &ctx, &src);
        return;
    }

    repl(&inst, &ctx);
}

fn run(inst: &Instance, ctx: &Context, src: &str) {
    if let Err(e) = inst.eval_and_display(ctx, src) {
        report(&e);
        std::process::exit(1);
    }
}

fn repl(inst: &Instance, ctx: &Context) {
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("uclsh: readline: {e}");
            std::process::exit(1);
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                if let Err(e) = inst.eval_and_display(ctx, &line) {
                    report(&e);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("uclsh: {e}");
                break;
            }
        }
    }
}

fn report(err: &EvalError) {
    eprintln!("{}: {err}", err.kind());
}
