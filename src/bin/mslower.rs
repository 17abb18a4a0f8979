//! `mslower`: a thin driver over the lowering core, mainly useful for
//! smoke-testing the pipeline end to end since the real parser that would
//! feed it source text is an external collaborator (crate docs §1/§6).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

/// CLI arguments for the `mslower` binary.
#[derive(Parser, Debug)]
#[command(name = "mslower", version, about = "Microstatement lowering core driver")]
struct CliArgs {
    /// Emit a `tracing::trace!` event for every microstatement appended.
    #[arg(long)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lower a small built-in fixture and print its rendered microstatements.
    Demo,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    mslower::init_tracing();

    match args.command {
        Command::Demo => run_demo(args.trace),
    }
}

/// `function add(a: int64, b: int64): int64 { return a + b; } add(2, 3)`,
/// built directly through the fixture builder since there is no parser to
/// drive in this core.
fn run_demo(trace: bool) -> Result<()> {
    use mslower::ast::test_support::Builder;
    use mslower::ast::{FunctionBody, TypeRef};
    use mslower::config::LowerOptions;

    let scope = mslower::root_scope();
    let mut builder = Builder::new();

    let a = builder.var("a");
    let b = builder.var("b");
    let sum = builder.binop(a, "+", b);
    let body_exit = builder.exit_with(sum);

    let def = builder.function_def(
        Some("add"),
        vec![("a", TypeRef::simple("int64")), ("b", TypeRef::simple("int64"))],
        Some(TypeRef::simple("int64")),
        FunctionBody::Statements(vec![body_exit]),
    );

    let two = builder.constant("2");
    let three = builder.constant("3");

    let arena = std::rc::Rc::new(std::cell::RefCell::new(builder.arena));
    let opts = LowerOptions::new().with_trace_microstatements(trace);

    let (statements, result) =
        mslower::lower_call(&scope, &arena, def, &[two, three], &opts).context("lowering the demo call failed")?;

    for stmt in &statements {
        println!("{}", stmt.render());
    }
    println!("=> {}", result.name);
    Ok(())
}
