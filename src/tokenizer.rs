use std::fmt::Display;

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    If,
    Else,
    While,
    For,
    Func,
    Return,
    True,
    False,
    Null,
    Inf,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    PlusPlus,
    MinusMinus,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    Equal,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Not,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Semicolon,
    Colon,
    Comma,
    Dot,
    DotDot,
    Ellipsis,
    Question,

    // Literals
    Number,
    String,
    Identifier,

    Comment,
    Eol,
    Eof,
    Error,
}

/// Operators and delimiters, matched by longest prefix. Keywords are not
/// listed here: they are recognized after a whole identifier is scanned.
const FIXED: &[(&str, TokenKind)] = &[
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("**", TokenKind::StarStar),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
    ("+=", TokenKind::PlusEqual),
    ("-=", TokenKind::MinusEqual),
    ("*=", TokenKind::StarEqual),
    ("/=", TokenKind::SlashEqual),
    ("=", TokenKind::Equal),
    ("==", TokenKind::EqualEqual),
    ("!=", TokenKind::BangEqual),
    ("<", TokenKind::Less),
    ("<=", TokenKind::LessEqual),
    (">", TokenKind::Greater),
    (">=", TokenKind::GreaterEqual),
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
    ("!", TokenKind::Not),
    ("(", TokenKind::LeftParen),
    (")", TokenKind::RightParen),
    ("[", TokenKind::LeftBracket),
    ("]", TokenKind::RightBracket),
    ("{", TokenKind::LeftBrace),
    ("}", TokenKind::RightBrace),
    (";", TokenKind::Semicolon),
    (":", TokenKind::Colon),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    ("..", TokenKind::DotDot),
    ("...", TokenKind::Ellipsis),
    ("?", TokenKind::Question),
];

impl TokenKind {
    fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "func" => TokenKind::Func,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "inf" => TokenKind::Inf,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            _ => return None,
        };
        Some(kind)
    }

    fn lexeme(self) -> Option<&'static str> {
        FIXED
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(lexeme, _)| *lexeme)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(lexeme) = self.lexeme() {
            return write!(f, "{}", lexeme);
        }
        match self {
            TokenKind::If => write!(f, "if"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::While => write!(f, "while"),
            TokenKind::For => write!(f, "for"),
            TokenKind::Func => write!(f, "func"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Null => write!(f, "null"),
            TokenKind::Inf => write!(f, "inf"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::String => write!(f, "string"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Comment => write!(f, "comment"),
            TokenKind::Eol => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Error => write!(f, "error"),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }
}

// Tokens are identified by kind; the lexeme is payload.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Token {}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}: {}]", self.kind, self.lexeme.escape_debug())
    }
}

/// Incremental tokenizer. Source may be fed in chunks split at any
/// character; a token that might still grow when more input arrives is held
/// back as the pending fragment until the next `tokenize` call or `eof`.
#[derive(Debug, Default)]
pub struct Tokenizer {
    pending: String,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn tokenize(&mut self, chunk: &str) -> Vec<Token> {
        let mut source = std::mem::take(&mut self.pending);
        source.push_str(chunk);

        let (tokens, rest) = scan(&source, false);
        if !rest.is_empty() {
            trace!(pending = rest, "deferring incomplete token");
        }
        self.pending = rest.to_string();
        tokens
    }

    pub fn eof(&mut self) -> Vec<Token> {
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            trace!(pending = pending.as_str(), "flushing pending fragment");
        }

        let (mut tokens, rest) = scan(&pending, true);
        debug_assert!(rest.is_empty(), "end-of-input scan always resolves");
        tokens.push(Token::new(TokenKind::Eof, "EOF"));
        tokens
    }
}

/// Tokenizes a complete source in one go.
pub fn tokens(source: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new();
    let mut tokens = tokenizer.tokenize(source);
    tokens.extend(tokenizer.eof());
    tokens
}

fn scan(source: &str, at_end: bool) -> (Vec<Token>, &str) {
    let mut tokens = Vec::new();
    let mut remaining = source;

    loop {
        remaining = remaining.trim_start_matches(|c| matches!(c, ' ' | '\t' | '\r'));
        if remaining.is_empty() {
            break;
        }
        match token(remaining, at_end) {
            Some((token, rest)) => {
                tokens.push(token);
                remaining = rest;
            }
            None => break,
        }
    }

    (tokens, remaining)
}

/// Scans one token from the start of `source`. Returns `None` when the
/// token runs to the end of `source` and more input could still change it.
fn token(source: &str, at_end: bool) -> Option<(Token, &str)> {
    let first = source.chars().next()?;
    if first == '\n' {
        return Some(split(TokenKind::Eol, source, 1));
    }

    match fixed(source, at_end) {
        Fixed::Matched(kind, len) => return Some(split(kind, source, len)),
        Fixed::Deferred => return None,
        Fixed::NoMatch => {}
    }

    match first {
        '#' => comment(source, at_end),
        '0'..='9' => number(source, at_end),
        '\'' | '"' => string(source, first, at_end),
        c if c.is_ascii_alphabetic() || c == '_' => identifier(source, at_end),
        c => Some((
            Token::new(TokenKind::Error, format!("unexpected character '{}'", c)),
            &source[c.len_utf8()..],
        )),
    }
}

fn split(kind: TokenKind, source: &str, len: usize) -> (Token, &str) {
    (Token::new(kind, &source[..len]), &source[len..])
}

enum Fixed {
    Matched(TokenKind, usize),
    Deferred,
    NoMatch,
}

fn fixed(source: &str, at_end: bool) -> Fixed {
    let mut candidates: Vec<&(&str, TokenKind)> = FIXED.iter().collect();
    let mut longest = None;

    for (i, c) in source.char_indices() {
        let width = i + c.len_utf8();
        let prefix = &source[..width];
        candidates.retain(|(lexeme, _)| lexeme.starts_with(prefix));

        if candidates.is_empty() {
            // Back off to the longest lexeme seen before this character.
            break;
        }
        if let Some((_, kind)) = candidates.iter().find(|(lexeme, _)| *lexeme == prefix) {
            longest = Some((*kind, width));
            if candidates.len() == 1 {
                return Fixed::Matched(*kind, width);
            }
        }
    }

    // Candidates left over mean the source ran out while a longer lexeme was
    // still possible.
    if !candidates.is_empty() && !at_end {
        return Fixed::Deferred;
    }
    match longest {
        Some((kind, len)) => Fixed::Matched(kind, len),
        None => Fixed::NoMatch,
    }
}

fn comment(source: &str, at_end: bool) -> Option<(Token, &str)> {
    match source.find('\n') {
        Some(end) => Some((
            Token::new(TokenKind::Comment, source[..end].trim_end_matches('\r')),
            &source[end..],
        )),
        None if at_end => Some(split(TokenKind::Comment, source, source.len())),
        None => None,
    }
}

fn number(source: &str, at_end: bool) -> Option<(Token, &str)> {
    let mut dotted = false;
    for (i, c) in source.char_indices() {
        match c {
            '0'..='9' => {}
            '.' if !dotted => dotted = true,
            _ => return Some(split(TokenKind::Number, source, i)),
        }
    }
    at_end.then(|| split(TokenKind::Number, source, source.len()))
}

fn string(source: &str, quote: char, at_end: bool) -> Option<(Token, &str)> {
    for (i, c) in source.char_indices().skip(1) {
        if c == quote {
            return Some(split(TokenKind::String, source, i + c.len_utf8()));
        }
        if c == '\n' {
            return Some((
                Token::new(
                    TokenKind::Error,
                    format!("unterminated string: {}", &source[..i]),
                ),
                &source[i..],
            ));
        }
    }
    at_end.then(|| {
        (
            Token::new(
                TokenKind::Error,
                format!("unterminated string at end of input: {}", source),
            ),
            "",
        )
    })
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn identifier(source: &str, at_end: bool) -> Option<(Token, &str)> {
    let len = match source.char_indices().find(|(_, c)| !is_identifier_char(*c)) {
        Some((len, _)) => len,
        None if at_end => source.len(),
        None => return None,
    };

    let word = &source[..len];
    let kind = TokenKind::keyword(word).unwrap_or(TokenKind::Identifier);
    Some((Token::new(kind, word), &source[len..]))
}
