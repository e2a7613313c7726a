pub mod ast;
pub mod ast_printer;
pub mod builtins;
pub mod capture;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod value;

use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::value::Value;

/// Scan, parse and run `source` on `interpreter`.
pub fn run(source: &str, interpreter: &mut Interpreter) -> Result<Value> {
    let tokens = scanner::tokenize(source)?;
    let statements = Parser::new(&tokens).parse()?;

    interpreter.interpret(&statements)
}
