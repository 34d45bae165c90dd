use std::fs::File;
use std::io::{self, Read};

use anyhow::{Context as _, Result, bail};
use mython::lexer::Lexer;
use mython::parser;
use mython::runtime::{Closure, StreamContext};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next();
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let source: Box<dyn Read> = match &input_path {
        Some(path) => Box::new(File::open(path).with_context(|| format!("Opening {path}"))?),
        None => Box::new(io::stdin()),
    };

    let mut lexer = Lexer::new(source).context("Lexing program")?;
    let program = parser::parse(&mut lexer).context("Parsing program")?;

    let mut closure = Closure::new();
    let mut ctx = StreamContext::new(io::stdout().lock());
    program
        .eval(&mut closure, &mut ctx)
        .context("Running program")?;
    Ok(())
}
