pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod source;
pub mod tokenizer;
