pub mod printer;

use std::fmt::Display;

use crate::tokenizer::Token;

#[derive(Debug, Clone, Default)]
pub struct Program(pub Vec<Statement>);

#[derive(Debug, Clone)]
pub enum Statement {
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub enum Expression {
    Number(f64),
    String(String),
    Boolean(bool),
    Identifier(String),
    Binary(Box<Expression>, Token, Box<Expression>),
    Unary(Token, Box<Expression>),
}

impl Expression {
    pub fn binary(left: Expression, operator: Token, right: Expression) -> Self {
        Expression::Binary(Box::new(left), operator, Box::new(right))
    }

    pub fn unary(operator: Token, operand: Expression) -> Self {
        Expression::Unary(operator, Box::new(operand))
    }

    /// Builds a string literal from a string token's lexeme, dropping the
    /// delimiting quotes.
    pub fn string_literal(lexeme: &str) -> Self {
        let value = if lexeme.len() < 2 {
            ""
        } else {
            &lexeme[1..lexeme.len() - 1]
        };
        Expression::String(value.to_string())
    }

    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Expression::Number(value) => visitor.visit_number(*value),
            Expression::String(value) => visitor.visit_string(value),
            Expression::Boolean(value) => visitor.visit_boolean(*value),
            Expression::Identifier(name) => visitor.visit_identifier(name),
            Expression::Binary(left, operator, right) => {
                visitor.visit_binary(left, operator, right)
            }
            Expression::Unary(operator, operand) => visitor.visit_unary(operator, operand),
        }
    }
}

impl Statement {
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Statement::Expression(expression) => visitor.visit_expression_statement(expression),
        }
    }
}

pub trait Visitor {
    type Output;

    fn visit_number(&mut self, value: f64) -> Self::Output;
    fn visit_string(&mut self, value: &str) -> Self::Output;
    fn visit_boolean(&mut self, value: bool) -> Self::Output;
    fn visit_identifier(&mut self, name: &str) -> Self::Output;
    fn visit_binary(
        &mut self,
        left: &Expression,
        operator: &Token,
        right: &Expression,
    ) -> Self::Output;
    fn visit_unary(&mut self, operator: &Token, operand: &Expression) -> Self::Output;
    fn visit_expression_statement(&mut self, expression: &Expression) -> Self::Output;
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for statement in &self.0 {
            writeln!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Expression(expr) => write!(f, "{};", expr),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", n),
            Expression::String(s) => write!(f, "{:?}", s),
            Expression::Boolean(b) => write!(f, "{}", b),
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Binary(left, op, right) => {
                write!(f, "({} {} {})", op.lexeme, left, right)
            }
            Expression::Unary(op, right) => write!(f, "({} {})", op.lexeme, right),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokenizer::TokenKind;

    #[test]
    fn test_string_literal_strips_quotes() {
        assert!(matches!(
            Expression::string_literal("'abc'"),
            Expression::String(s) if s == "abc"
        ));
        assert!(matches!(
            Expression::string_literal("\"\""),
            Expression::String(s) if s.is_empty()
        ));
    }

    #[test]
    fn test_display_is_prefix_form() {
        let expr = Expression::binary(
            Expression::Number(1.0),
            Token::new(TokenKind::Plus, "+"),
            Expression::unary(
                Token::new(TokenKind::Minus, "-"),
                Expression::Identifier("x".to_string()),
            ),
        );
        assert_eq!(expr.to_string(), "(+ 1 (- x))");
        assert_eq!(Statement::Expression(expr).to_string(), "(+ 1 (- x));");
    }

    struct Depth;

    impl Visitor for Depth {
        type Output = usize;

        fn visit_number(&mut self, _: f64) -> usize {
            1
        }
        fn visit_string(&mut self, _: &str) -> usize {
            1
        }
        fn visit_boolean(&mut self, _: bool) -> usize {
            1
        }
        fn visit_identifier(&mut self, _: &str) -> usize {
            1
        }
        fn visit_binary(&mut self, left: &Expression, _: &Token, right: &Expression) -> usize {
            1 + left.accept(self).max(right.accept(self))
        }
        fn visit_unary(&mut self, _: &Token, operand: &Expression) -> usize {
            1 + operand.accept(self)
        }
        fn visit_expression_statement(&mut self, expression: &Expression) -> usize {
            expression.accept(self)
        }
    }

    #[test]
    fn test_accept_dispatches_per_kind() {
        let expr = Expression::binary(
            Expression::Boolean(true),
            Token::new(TokenKind::And, "&&"),
            Expression::unary(
                Token::new(TokenKind::Not, "!"),
                Expression::String("s".to_string()),
            ),
        );
        assert_eq!(Statement::Expression(expr).accept(&mut Depth), 3);
    }
}
