//! myjql: a single-file key/value table behind a line-oriented shell.

mod commands;
mod repl;
mod statement;

use myjql_storage::Table;
use repl::Repl;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Logging goes to stderr; stdout carries only the shell protocol.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args();
    let _program = args.next();
    let Some(path) = args.next() else {
        println!("Must supply a database filename.");
        process::exit(1);
    };

    let table = match Table::open(&path) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let mut repl = match Repl::new(table) {
        Ok(repl) => repl,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let run_result = repl.run();
    if let Err(err) = &run_result {
        eprintln!("{err}");
    }

    // The shutdown path runs on every exit: announce, then flush+close.
    println!("bye~");
    let close_result = repl.close();
    if let Err(err) = &close_result {
        eprintln!("{err}");
    }

    if run_result.is_err() || close_result.is_err() {
        process::exit(1);
    }
}
