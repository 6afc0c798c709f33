use std::cell::RefCell;

use tracing::debug;

use crate::{
    ast::{Expression, Program, Statement},
    tokenizer::{Token, TokenKind},
};

/// The statements parsed before the first failure, and that failure if any.
#[derive(Debug)]
pub struct Parsed {
    pub program: Program,
    pub error: Option<ParseError>,
}

impl Parsed {
    pub fn into_result(self) -> Result<Program, ParseError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.program),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    rules: Vec<&'static str>,
    pub token: Option<Token>,
}

impl ParseError {
    /// Grammar rules that were being parsed, outermost first.
    pub fn rules(&self) -> &[&'static str] {
        &self.rules
    }
}

impl std::error::Error for ParseError {}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "While parsing {}", self.rules.join(" > "))?;
        write!(f, "{}", self.kind)?;
        if let Some(token) = &self.token {
            write!(f, " but found \"{}\"", token.lexeme.escape_debug())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("Expected \"{0}\"")]
    Expected(TokenKind),
    #[error("Unexpected \"{0}\"")]
    Unexpected(TokenKind),
    #[error("Expected identifier")]
    ExpectedIdentifier,
    #[error("Invalid number literal {0}")]
    InvalidNumber(String),
    #[error("Lexical error: {0}")]
    Lexical(String),
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("Expression nested too deeply")]
    TooDeep,
}

/// Rule frames allowed on the stack, counting operators folded into a
/// single binary chain. Bounds the depth of every tree the parser returns.
const MAX_DEPTH: usize = 512;

#[derive(Debug)]
struct ParseContext {
    stack: RefCell<Vec<&'static str>>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, name: &'static str) -> ParseContextGuard<'_> {
        self.stack.borrow_mut().push(name);
        ParseContextGuard::new(self)
    }

    fn descend(
        &self,
        name: &'static str,
        tokens: &[Token],
    ) -> Result<ParseContextGuard<'_>, ParseError> {
        self.check_depth(0, tokens)?;
        Ok(self.push(name))
    }

    fn check_depth(&self, extra: usize, tokens: &[Token]) -> Result<(), ParseError> {
        if self.depth() + extra >= MAX_DEPTH {
            return Err(self.error(ParseErrorKind::TooDeep, tokens));
        }
        Ok(())
    }

    fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    fn pop(&self) {
        self.stack.borrow_mut().pop();
    }

    fn error(&self, kind: ParseErrorKind, tokens: &[Token]) -> ParseError {
        ParseError {
            kind,
            rules: self.stack.borrow().clone(),
            token: tokens.first().cloned(),
        }
    }
}

struct ParseContextGuard<'a> {
    context: &'a ParseContext,
}

impl<'a> ParseContextGuard<'a> {
    fn new(context: &'a ParseContext) -> Self {
        Self { context }
    }
}

impl<'a> Drop for ParseContextGuard<'a> {
    fn drop(&mut self) {
        self.context.pop();
    }
}

type ParseResult<'a, T> = Result<(T, &'a [Token]), ParseError>;

/// Parses statements until the end of input or the first statement that
/// fails. Comment tokens are ignored.
pub fn program(tokens: &[Token]) -> Parsed {
    let significant: Vec<Token> = tokens
        .iter()
        .filter(|token| token.kind != TokenKind::Comment)
        .cloned()
        .collect();

    let context = ParseContext::new();
    let _guard = context.push("program");
    let mut statements = Vec::new();
    let mut tokens = significant.as_slice();

    loop {
        tokens = skip_eols(tokens);
        if is_at_end(tokens) {
            break;
        }

        match statement(&context, tokens) {
            Ok((stmt, rest)) => {
                statements.push(stmt);
                tokens = rest;
            }
            Err(error) => {
                debug!(%error, parsed = statements.len(), "parsing stopped");
                return Parsed {
                    program: Program(statements),
                    error: Some(error),
                };
            }
        }
    }

    Parsed {
        program: Program(statements),
        error: None,
    }
}

/// Skips past the next statement terminator, or up to the end of input.
pub fn synchronize(tokens: &[Token]) -> &[Token] {
    let mut tokens = tokens;
    while let Some(token) = tokens.first() {
        match token.kind {
            TokenKind::Eof => return tokens,
            TokenKind::Semicolon | TokenKind::Eol => return &tokens[1..],
            _ => tokens = &tokens[1..],
        }
    }
    tokens
}

fn is_at_end(tokens: &[Token]) -> bool {
    tokens
        .first()
        .map_or(true, |token| token.kind == TokenKind::Eof)
}

fn skip_eols(tokens: &[Token]) -> &[Token] {
    let start = tokens
        .iter()
        .position(|token| token.kind != TokenKind::Eol)
        .unwrap_or(tokens.len());
    &tokens[start..]
}

fn statement<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Statement> {
    let _guard = context.descend("statement", tokens)?;
    expression_statement(context, tokens)
}

fn expression_statement<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
) -> ParseResult<'a, Statement> {
    let _guard = context.descend("expression_statement", tokens)?;
    let (expr, tokens) = expression(context, tokens)?;
    let tokens = match tokens.first().map(Token::kind) {
        Some(TokenKind::Semicolon | TokenKind::Eol) => &tokens[1..],
        _ => tokens,
    };
    Ok((Statement::Expression(expr), tokens))
}

fn expression<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("expression", tokens)?;
    assignment(context, tokens)
}

fn assignment<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("assignment", tokens)?;
    let (expr, rest) = logical_or(context, tokens)?;

    match rest.first() {
        Some(token) if token.kind == TokenKind::Equal => {
            if !matches!(expr, Expression::Identifier(_)) {
                return Err(context.error(ParseErrorKind::ExpectedIdentifier, rest));
            }
            let (value, rest) = assignment(context, &rest[1..])?;
            Ok((Expression::binary(expr, token.clone(), value), rest))
        }
        _ => Ok((expr, rest)),
    }
}

fn binary<'a>(
    context: &ParseContext,
    precedence: impl Fn(&ParseContext, &'a [Token]) -> ParseResult<'a, Expression>,
    operators: &[TokenKind],
    tokens: &'a [Token],
) -> ParseResult<'a, Expression> {
    let (mut expr, mut tokens) = precedence(context, tokens)?;
    let mut folded = 0;

    while let Some(token) = tokens.first() {
        if !operators.contains(&token.kind) {
            break;
        }
        folded += 1;
        context.check_depth(folded, tokens)?;
        let (right, rest) = precedence(context, &tokens[1..])?;
        expr = Expression::binary(expr, token.clone(), right);
        tokens = rest;
    }

    Ok((expr, tokens))
}

fn logical_or<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("logical_or", tokens)?;
    binary(context, logical_and, &[TokenKind::Or], tokens)
}

fn logical_and<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("logical_and", tokens)?;
    binary(context, equality, &[TokenKind::And], tokens)
}

fn equality<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("equality", tokens)?;
    binary(
        context,
        comparison,
        &[TokenKind::EqualEqual, TokenKind::BangEqual],
        tokens,
    )
}

fn comparison<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("comparison", tokens)?;
    binary(
        context,
        term,
        &[
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ],
        tokens,
    )
}

fn term<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("term", tokens)?;
    binary(
        context,
        factor,
        &[TokenKind::Plus, TokenKind::Minus],
        tokens,
    )
}

fn factor<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("factor", tokens)?;
    binary(
        context,
        unary,
        &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
        tokens,
    )
}

fn unary<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("unary", tokens)?;

    match tokens.first() {
        Some(token) if matches!(token.kind, TokenKind::Not | TokenKind::Minus) => {
            let (operand, rest) = unary(context, &tokens[1..])?;
            Ok((Expression::unary(token.clone(), operand), rest))
        }
        _ => primary(context, tokens),
    }
}

fn primary<'a>(context: &ParseContext, tokens: &'a [Token]) -> ParseResult<'a, Expression> {
    let _guard = context.descend("primary", tokens)?;
    let Some(token) = tokens.first() else {
        return Err(context.error(ParseErrorKind::UnexpectedEnd, tokens));
    };
    let rest = &tokens[1..];

    match token.kind {
        TokenKind::True => Ok((Expression::Boolean(true), rest)),
        TokenKind::False => Ok((Expression::Boolean(false), rest)),
        TokenKind::Inf => Ok((Expression::Number(f64::INFINITY), rest)),
        TokenKind::Number => match token.lexeme.parse::<f64>() {
            Ok(n) => Ok((Expression::Number(n), rest)),
            Err(_) => Err(context.error(
                ParseErrorKind::InvalidNumber(token.lexeme.clone()),
                tokens,
            )),
        },
        TokenKind::String => Ok((Expression::string_literal(&token.lexeme), rest)),
        TokenKind::Identifier => Ok((Expression::Identifier(token.lexeme.clone()), rest)),
        TokenKind::LeftParen => {
            let (expr, rest) = expression(context, rest)?;
            let rest = consume(context, rest, TokenKind::RightParen)?;
            Ok((expr, rest))
        }
        TokenKind::Error => Err(context.error(
            ParseErrorKind::Lexical(token.lexeme.clone()),
            tokens,
        )),
        TokenKind::Eof => Err(context.error(ParseErrorKind::UnexpectedEnd, tokens)),
        kind => Err(context.error(ParseErrorKind::Unexpected(kind), tokens)),
    }
}

fn consume<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
    kind: TokenKind,
) -> Result<&'a [Token], ParseError> {
    match tokens.first().map(Token::kind) {
        Some(k) if k == kind => Ok(&tokens[1..]),
        _ => Err(context.error(ParseErrorKind::Expected(kind), tokens)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokenizer::tokens;

    fn parse(source: &str) -> Parsed {
        program(&tokens(source))
    }

    fn expressions(source: &str) -> Vec<String> {
        parse(source)
            .into_result()
            .expect("source should parse")
            .0
            .iter()
            .map(|Statement::Expression(expr)| expr.to_string())
            .collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(expressions("1 + 2 * 3"), vec!["(+ 1 (* 2 3))"]);
        assert_eq!(expressions("1 * 2 - 6 / 3 % 2"), vec!["(- (* 1 2) (% (/ 6 3) 2))"]);
        assert_eq!(
            expressions("a < b == c >= d"),
            vec!["(== (< a b) (>= c d))"]
        );
        assert_eq!(
            expressions("a || b && c == d"),
            vec!["(|| a (&& b (== c d)))"]
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(expressions("1 - 2 - 3"), vec!["(- (- 1 2) 3)"]);
        assert_eq!(expressions("a and b and c"), vec!["(and (and a b) c)"]);
    }

    #[test]
    fn test_grouping() {
        assert_eq!(expressions("(1 + 2) * 3"), vec!["(* (+ 1 2) 3)"]);
        assert_eq!(expressions("((x))"), vec!["x"]);
    }

    #[test]
    fn test_unary_is_right_recursive() {
        assert_eq!(expressions("- -x"), vec!["(- (- x))"]);
        assert_eq!(expressions("!not true"), vec!["(! (not true))"]);
        assert_eq!(expressions("-a * b"), vec!["(* (- a) b)"]);
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            expressions("'hi'; true; false; inf; 2.5"),
            vec!["\"hi\"", "true", "false", "inf", "2.5"]
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(expressions("a = b = 1 + 2"), vec!["(= a (= b (+ 1 2)))"]);
    }

    #[test]
    fn test_assignment_to_non_identifier_fails() {
        let parsed = parse("1 = 2");
        assert!(parsed.program.0.is_empty());
        assert_eq!(
            parsed.error.map(|e| e.kind),
            Some(ParseErrorKind::ExpectedIdentifier)
        );
    }

    #[test]
    fn test_terminators_are_optional() {
        assert_eq!(expressions("1;\n\n2\n3;"), vec!["1", "2", "3"]);
        assert_eq!(expressions("1 2"), vec!["1", "2"]);
        assert!(expressions("\n\n").is_empty());
    }

    #[test]
    fn test_comments_are_ignored() {
        assert_eq!(
            expressions("# header\n1 + 2 # trailing\n"),
            vec!["(+ 1 2)"]
        );
    }

    #[test]
    fn test_comment_after_statement() {
        assert_eq!(expressions("1 # one\n2"), vec!["1", "2"]);
    }

    #[test]
    fn test_unmatched_paren_stops_parsing() {
        let parsed = parse("1\n(2 + 3\n4");
        assert_eq!(parsed.program.0.len(), 1);
        let error = parsed.error.expect("should fail");
        assert_eq!(error.kind, ParseErrorKind::Expected(TokenKind::RightParen));
        assert_eq!(error.token.map(|t| t.kind), Some(TokenKind::Eol));
    }

    #[test]
    fn test_statements_after_failure_are_not_parsed() {
        let parsed = parse("1 + \n2\n3");
        assert!(parsed.program.0.is_empty());
        assert_eq!(
            parsed.error.map(|e| e.kind),
            Some(ParseErrorKind::Unexpected(TokenKind::Eol))
        );
    }

    #[test]
    fn test_error_records_rule_chain() {
        let error = parse("(").error.expect("should fail");
        assert_eq!(error.kind, ParseErrorKind::UnexpectedEnd);
        assert_eq!(error.rules().first(), Some(&"program"));
        assert_eq!(error.rules().last(), Some(&"primary"));
        assert!(error.to_string().starts_with("While parsing program > statement"));
    }

    #[test]
    fn test_lexical_error_token_is_rejected() {
        let error = parse("1 + 'abc\n").error.expect("should fail");
        assert_eq!(
            error.kind,
            ParseErrorKind::Lexical("unterminated string: 'abc".to_string())
        );
    }

    #[test]
    fn test_malformed_number_is_parse_failure() {
        let tokens = vec![
            Token::new(TokenKind::Number, "1.2.3"),
            Token::new(TokenKind::Eof, "EOF"),
        ];
        let parsed = program(&tokens);
        assert_eq!(
            parsed.error.map(|e| e.kind),
            Some(ParseErrorKind::InvalidNumber("1.2.3".to_string()))
        );
    }

    #[test]
    fn test_missing_eof_is_end_of_input() {
        let tokens = vec![Token::new(TokenKind::Number, "1")];
        assert_eq!(program(&tokens).program.0.len(), 1);
    }

    #[test]
    fn test_unparsable_statement_start() {
        let parsed = parse(") 1");
        assert!(parsed.program.0.is_empty());
        assert_eq!(
            parsed.error.map(|e| e.kind),
            Some(ParseErrorKind::Unexpected(TokenKind::RightParen))
        );
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let source = "(".repeat(10_000) + "1" + &")".repeat(10_000);
        let error = parse(&source).error.expect("should fail");
        assert_eq!(error.kind, ParseErrorKind::TooDeep);
        assert!(error.rules().len() <= MAX_DEPTH);
    }

    #[test]
    fn test_long_unary_run_is_rejected() {
        let source = "- ".repeat(20_000) + "1";
        let parsed = parse(&source);
        assert!(parsed.program.0.is_empty());
        assert_eq!(parsed.error.map(|e| e.kind), Some(ParseErrorKind::TooDeep));
    }

    #[test]
    fn test_long_operator_chain_is_rejected() {
        let source = vec!["1"; 10_000].join(" + ");
        assert_eq!(
            parse(&source).error.map(|e| e.kind),
            Some(ParseErrorKind::TooDeep)
        );
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let source = "(".repeat(30) + "1" + &")".repeat(30);
        assert_eq!(expressions(&source), vec!["1"]);

        let source = "- ".repeat(100) + "1";
        let expected = "(- ".repeat(100) + "1" + &")".repeat(100);
        assert_eq!(expressions(&source), vec![expected]);

        assert_eq!(expressions(&vec!["1"; 200].join(" + ")).len(), 1);
    }

    #[test]
    fn test_synchronize() {
        let tokens = tokens("1 + ; 2\n3");
        let rest = synchronize(&tokens);
        assert_eq!(rest.first().map(|t| t.lexeme.as_str()), Some("2"));
        let rest = synchronize(rest);
        assert_eq!(rest.first().map(|t| t.lexeme.as_str()), Some("3"));
        let rest = synchronize(rest);
        assert_eq!(rest.first().map(Token::kind), Some(TokenKind::Eof));
        assert_eq!(synchronize(rest).len(), 1);
    }
}
