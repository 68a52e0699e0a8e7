//! CLI front-end: `clap` for argument parsing, `simple_logger` for the
//! logging backend, one pipeline call, and either a clause dump or a
//! rendered diagnostic.

use std::io::{self, Read};

use clap::{App, Arg};
use log::LevelFilter;

use cypher_frontend::{ast::ClauseData, FrontendOptions};

fn main() {
    let mut app = App::new("cypher-frontend")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parser, AST rewriter and semantic validator for a Cypher-like graph query language")
        .arg(Arg::with_name("query").help("Query text; reads stdin if omitted").index(1))
        .arg(Arg::with_name("parse-only").long("parse-only").help("Stop after the AST Builder; skip rewriting and validation"))
        .arg(Arg::with_name("timing").long("timing").help("Log pass-boundary timings at debug level"))
        .arg(Arg::with_name("verbose").short("v").long("verbose").help("Enable debug logging"));
    #[cfg(feature = "dot")]
    {
        app = app.arg(Arg::with_name("dot").long("dot").takes_value(true).value_name("FILE").help("Write the validated clause graph to FILE in DOT format"));
    }
    let matches = app.get_matches();

    let level = if matches.is_present("verbose") { LevelFilter::Debug } else { LevelFilter::Warn };
    simple_logger::SimpleLogger::new().with_level(level).init().expect("logger already initialized");

    let text = match matches.value_of("query") {
        Some(q) => q.to_string(),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).expect("failed to read query from stdin");
            buf
        }
    };

    let opts =
        FrontendOptions { parse_only: matches.is_present("parse-only"), timing: matches.is_present("timing"), ..FrontendOptions::default() };

    let procedures = cypher_frontend::BuiltinProcedureRegistry::new();
    let functions = cypher_frontend::BuiltinFunctionRegistry;

    match cypher_frontend::run_with(&text, &opts, &procedures, &functions) {
        Ok(handle) => {
            #[cfg(feature = "dot")]
            if let Some(path) = matches.value_of("dot") {
                let mut file = std::fs::File::create(path).expect("failed to create DOT file");
                cypher_frontend::export::export_dot(handle.body(), &mut file).expect("failed to write DOT file");
            }
            for (i, clause) in handle.body().clauses.iter().enumerate() {
                println!("{i}: {}", clause_summary(&clause.data));
            }
        }
        Err(diag) => {
            eprintln!("{}", diag.render(&text));
            std::process::exit(1);
        }
    }
}

fn clause_summary(data: &ClauseData) -> String {
    match data {
        ClauseData::Match(m) if m.optional => format!("OPTIONAL MATCH ({} pattern(s))", m.patterns.len()),
        ClauseData::Match(m) => format!("MATCH ({} pattern(s))", m.patterns.len()),
        ClauseData::Create(c) => format!("CREATE ({} pattern(s))", c.patterns.len()),
        ClauseData::Merge(_) => "MERGE".to_string(),
        ClauseData::Set(s) => format!("SET ({} item(s))", s.items.len()),
        ClauseData::Remove(r) => format!("REMOVE ({} item(s))", r.items.len()),
        ClauseData::Delete(d) if d.detach => "DETACH DELETE".to_string(),
        ClauseData::Delete(_) => "DELETE".to_string(),
        ClauseData::With(_) => "WITH".to_string(),
        ClauseData::Return(_) => "RETURN".to_string(),
        ClauseData::Unwind(u) => format!("UNWIND AS {}", u.alias),
        ClauseData::Foreach(_) => "FOREACH".to_string(),
        ClauseData::Call(c) => format!("CALL {}", c.name),
        ClauseData::CallSubquery(_) => "CALL {...}".to_string(),
        ClauseData::Union(u) if u.all => "UNION ALL".to_string(),
        ClauseData::Union(_) => "UNION".to_string(),
        ClauseData::Unsupported(u) => format!("(unsupported: {})", u.name),
    }
}
