//! Splits an expression string into tokens with a single ordered `nom` alternation.
//!
//! The alternation is tried left to right at every offset, so the order of the
//! branches decides ambiguities: names before numbers (so `a.b` stays one name),
//! `//` before `/`, `..` before `.`, `::` before `:` and `!=`/`<=`/`>=` before
//! their one-character prefixes. Whitespace runs are matched and discarded.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{anychar, char, digit0, digit1, multispace1, one_of, satisfy},
    combinator::{opt, recognize},
    sequence::pair,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An NCName, QName, `prefix:*`, `*:local` or `*`. Operator keywords and
    /// axis names are names too; the parser decides by position.
    Name,
    /// `$name`
    Variable,
    Number,
    /// A quoted string, quotes included in `text`.
    Literal,
    /// `= != < <= > >= + -`
    Operator,
    /// Everything else: `/ // . .. @ :: ( ) [ ] , |` and stray characters.
    Punct,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the token in the source expression.
    pub offset: usize,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    /// The literal's content without its surrounding quotes.
    pub fn literal_value(&self) -> &str {
        match self.kind {
            TokenKind::Literal => &self.text[1..self.text.len() - 1],
            _ => &self.text,
        }
    }

    fn classify(text: &str, offset: usize) -> Token {
        let mut chars = text.chars();
        let first = chars.next().unwrap_or(' ');
        let second = chars.next();
        let kind = match first {
            '"' | '\'' if text.len() >= 2 && text.ends_with(first) => TokenKind::Literal,
            '$' if text.len() > 1 => TokenKind::Variable,
            c if c.is_ascii_digit() => TokenKind::Number,
            '.' if second.is_some_and(|c| c.is_ascii_digit()) => TokenKind::Number,
            '*' => TokenKind::Name,
            c if is_name_start(c) => TokenKind::Name,
            _ => match text {
                "=" | "!=" | "<" | "<=" | ">" | ">=" | "+" | "-" => TokenKind::Operator,
                _ => TokenKind::Punct,
            },
        };
        Token {
            kind,
            text: text.to_string(),
            offset,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_name_start), take_while(is_name_char))).parse(input)
}

fn name_part(input: &str) -> IResult<&str, &str> {
    alt((tag("*"), nc_name)).parse(input)
}

fn name(input: &str) -> IResult<&str, &str> {
    recognize((
        opt(char('$')),
        name_part,
        opt(pair(char(':'), name_part)),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    ))
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, &str> {
    alt((
        recognize((char('"'), take_while(|c| c != '"'), char('"'))),
        recognize((char('\''), take_while(|c| c != '\''), char('\''))),
    ))
    .parse(input)
}

fn master_token(input: &str) -> IResult<&str, &str> {
    alt((
        name,
        tag("//"),
        tag(".."),
        tag("::"),
        number,
        literal,
        recognize(pair(one_of("!<>"), char('='))),
        multispace1,
        take_while1(char::is_whitespace),
        recognize(anychar),
    ))
    .parse(input)
}

/// A token cursor with arbitrary lookahead.
#[derive(Debug, Clone, Default)]
pub struct Lexer {
    tokens: Vec<Token>,
    index: usize,
}

impl Lexer {
    pub fn tokenize(source: &str) -> Self {
        let mut tokens = Vec::new();
        let mut rest = source;
        while let Ok((remaining, text)) = master_token(rest) {
            if !text.chars().all(char::is_whitespace) {
                tokens.push(Token::classify(text, source.len() - rest.len()));
            }
            rest = remaining;
        }
        Lexer { tokens, index: 0 }
    }

    /// The token `offset` places ahead of the cursor.
    pub fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    /// Whether the token at the cursor has exactly this text.
    pub fn peek_is(&self, text: &str) -> bool {
        self.peek(0).is_some_and(|token| token.is(text))
    }

    /// Steps the cursor back by one token.
    pub fn back(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// True once every token has been consumed.
    pub fn is_empty(&self) -> bool {
        self.index >= self.tokens.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.len() - self.index.min(self.tokens.len())
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned()?;
        self.index += 1;
        Some(token)
    }
}
