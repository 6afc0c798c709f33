use std::{
    io::{BufRead, Write},
    num::NonZeroUsize,
    path::PathBuf,
};

use clap::{Args, Parser, Subcommand};
use mathsol::{
    ast::printer::AstPrinter,
    interpreter::{ExecutionError, Interpreter, Value},
    parser::{self, ParseError},
    source::{self, SourceError},
    tokenizer::{self, Token, Tokenizer},
};

#[derive(Debug, Parser)]
#[command(version, about = "MathSol language interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    options: Options,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Repl)
    }
}

#[derive(Debug, Args)]
struct Options {
    /// Print the tokens of each input
    #[arg(short = 't', long, global = true)]
    tokens: bool,

    /// Print the parse tree of each input
    #[arg(short = 'T', long, global = true)]
    tree: bool,

    /// Bytes read at a time from a source file
    #[arg(long, default_value = "8", global = true)]
    chunk_size: NonZeroUsize,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute a source file
    Run(RunArgs),
    /// Evaluate lines from stdin
    Repl,
    /// Evaluate an expression given as arguments, e.g. `eval 1000 - 7`
    Eval(EvalArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    file: PathBuf,
}

#[derive(Debug, Args)]
struct EvalArgs {
    #[arg(
        required = true,
        num_args = 1..,
        allow_hyphen_values = true,
        trailing_var_arg = true
    )]
    expression: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
enum InterpretError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

fn main() {
    init_tracing();
    let args = Cli::parse();
    let stdout = std::io::stdout();
    let mut session = Session::new(&args.options, stdout.lock());

    let result = match args.command() {
        Command::Repl => session.repl(std::io::stdin().lock()),
        Command::Run(args) => session.run_file(args),
        Command::Eval(args) => session.eval(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

struct Session<'a, W: Write> {
    options: &'a Options,
    interpreter: Interpreter,
    out: W,
}

impl<'a, W: Write> Session<'a, W> {
    fn new(options: &'a Options, out: W) -> Self {
        Self {
            options,
            interpreter: Interpreter::default(),
            out,
        }
    }

    fn repl(&mut self, mut input: impl BufRead) -> Result<(), InterpretError> {
        writeln!(self.out, "Welcome to the MathSol REPL!")?;
        writeln!(self.out, "EOF to exit. (Ctrl+D on *nix, Ctrl+Z on Windows)")?;

        let mut tokenizer = Tokenizer::new();
        let mut line = String::new();
        loop {
            write!(self.out, "mathsol> ")?;
            self.out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }

            let mut tokens = tokenizer.tokenize(&line);
            // A last line without a newline ends the input.
            if !line.ends_with('\n') {
                tokens.extend(tokenizer.eof());
                return self.show(&tokens);
            }
            self.show(&tokens)?;
        }

        let tokens = tokenizer.eof();
        self.show(&tokens)
    }

    fn run_file(&mut self, args: &RunArgs) -> Result<(), InterpretError> {
        let file = std::fs::File::open(&args.file)?;
        let tokens = source::tokenize_reader(file, self.options.chunk_size)?;
        if let Some(value) = self.interpret(&tokens)? {
            writeln!(self.out, "{}", value)?;
        }
        Ok(())
    }

    fn eval(&mut self, args: &EvalArgs) -> Result<(), InterpretError> {
        let tokens = tokenizer::tokens(&args.expression.join(" "));
        if let Some(value) = self.interpret(&tokens)? {
            writeln!(self.out, "{}", value)?;
        }
        Ok(())
    }

    fn show(&mut self, tokens: &[Token]) -> Result<(), InterpretError> {
        match self.interpret(tokens) {
            Ok(Some(value)) => writeln!(self.out, "{}", value)?,
            Ok(None) => {}
            Err(e @ InterpretError::IO(_)) => return Err(e),
            Err(e) => writeln!(self.out, "Error: {}", e)?,
        }
        Ok(())
    }

    fn interpret(&mut self, tokens: &[Token]) -> Result<Option<Value>, InterpretError> {
        if self.options.tokens {
            let rendered: Vec<String> = tokens.iter().map(Token::to_string).collect();
            writeln!(self.out, "{}", rendered.join(" "))?;
        }

        let parsed = parser::program(tokens);
        if self.options.tree {
            write!(self.out, "{}", AstPrinter::new().print_parsed(&parsed))?;
        }

        let program = parsed.into_result()?;
        Ok(self.interpreter.interpret(&program)?)
    }
}
