use std::{
    error::Error,
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use meow::{
    lexer, parser,
    token::TokenKind,
    util::{
        fmt::{tree, Context, Show},
        intern::Interner,
    },
    Diagnostics,
};

mod logger;

#[derive(Parser)]
#[command(name = "meowc", version)]
#[command(about = "Compiles meow programs into C")]
struct Args {
    /// Path to the source file. Reads from stdin when omitted.
    file: Option<PathBuf>,

    /// Where to write the output. Writes to stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Which stage output to emit.
    #[arg(long, value_enum, default_value_t = Emit::C)]
    emit: Emit,

    /// Logs more about each stage (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
enum Emit {
    /// One token per line, with its position.
    Tokens,
    /// The syntax tree.
    Ast,
    /// The C translation unit.
    C,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(error) = logger::init(level) {
        eprintln!("failed to install logger: {error}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let src = read_source(args.file.as_deref())?;

    let output = match args.emit {
        Emit::Tokens => emit_tokens(&src),
        Emit::Ast => emit_ast(&src)?,
        Emit::C => meow::compile(&src)?,
    };

    write_output(args.output.as_deref(), &output)
}

fn emit_tokens(src: &str) -> String {
    let ident_interner = Interner::default();
    let ctx = Context {
        ident_interner: &ident_interner,
    };

    let mut out = String::new();
    for token in lexer::lex_in_new(src) {
        if let TokenKind::Error(error) = token.kind {
            log::warn!("{:#}", token.span().wrap(error).display(&ctx));
        }
        let position = token.span().position();
        let lexeme = token.lexeme(src);
        out.push_str(&format!("{position} {:?} {lexeme:?}\n", token.kind));
    }
    out
}

fn emit_ast(src: &str) -> Result<String, Diagnostics> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    let mut ident_interner = Interner::default();

    match parser::parse_program(src, &mut tokens, &mut ident_interner) {
        Ok(program) => Ok(tree::print_program_string(&ident_interner, &program)),
        Err(errors) => Err(Diagnostics::new(&ident_interner, &errors)),
    }
}

fn read_source(path: Option<&Path>) -> Result<String, Box<dyn Error>> {
    let Some(path) = path else {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        return Ok(src);
    };
    log::debug!("reading {}", path.display());
    fs::read_to_string(path)
        .map_err(|error| format!("failed to read {}: {error}", path.display()).into())
}

fn write_output(path: Option<&Path>, output: &str) -> Result<(), Box<dyn Error>> {
    match path {
        Some(path) => fs::write(path, output)
            .map_err(|error| format!("failed to write {}: {error}", path.display()).into()),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
