use std::fmt::Display;

use super::{Expression, Program, Statement, Visitor};
use crate::{parser::Parsed, tokenizer::Token};

/// Renders an AST as an indented tree, two spaces per level.
#[derive(Debug, Default)]
pub struct AstPrinter {
    depth: usize,
}

impl AstPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_expression(&mut self, expression: &Expression) -> String {
        expression.accept(self)
    }

    pub fn print_statement(&mut self, statement: &Statement) -> String {
        statement.accept(self)
    }

    pub fn print(&mut self, program: &Program) -> String {
        self.depth = 0;
        let mut out = String::new();
        for statement in &program.0 {
            out.push_str(&statement.accept(self));
            out.push('\n');
        }
        out
    }

    /// Like `print`, with a placeholder where parsing gave up.
    pub fn print_parsed(&mut self, parsed: &Parsed) -> String {
        let mut out = self.print(&parsed.program);
        if let Some(error) = &parsed.error {
            out.push_str(&self.leaf("<unparsed", &error.kind));
            out.push('\n');
        }
        out
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }

    fn leaf(&self, label: &str, payload: impl Display) -> String {
        format!("{}[{}: {}]", self.indent(), label, payload)
    }

    fn node(&mut self, label: &str, children: &[&Expression]) -> String {
        let mut out = format!("{}[{}", self.indent(), label);
        self.depth += 1;
        for child in children {
            out.push('\n');
            out.push_str(&child.accept(self));
        }
        self.depth -= 1;
        out.push('\n');
        out.push_str(&self.indent());
        out.push(']');
        out
    }
}

impl Visitor for AstPrinter {
    type Output = String;

    fn visit_number(&mut self, value: f64) -> String {
        self.leaf("Numeric", value)
    }

    fn visit_string(&mut self, value: &str) -> String {
        self.leaf("String", format_args!("\"{}\"", value))
    }

    fn visit_boolean(&mut self, value: bool) -> String {
        self.leaf("Boolean", value)
    }

    fn visit_identifier(&mut self, name: &str) -> String {
        self.leaf("Identifier", name)
    }

    fn visit_binary(&mut self, left: &Expression, operator: &Token, right: &Expression) -> String {
        self.node(&format!("Binary: {}", operator.lexeme), &[left, right])
    }

    fn visit_unary(&mut self, operator: &Token, operand: &Expression) -> String {
        self.node(&format!("Unary: {}", operator.lexeme), &[operand])
    }

    fn visit_expression_statement(&mut self, expression: &Expression) -> String {
        self.node("ExpressionStatement", &[expression])
    }
}
