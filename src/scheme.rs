use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till1, take_while},
    multi::many0,
    sequence::{preceded, terminated},
};

use crate::ast::{IntegerType, Value};
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Parentheses and whitespace end a run of token characters
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')'
}

/// Parse a single token: a parenthesis or a maximal run of non-delimiters
fn parse_token(input: &str) -> IResult<&str, &str> {
    alt((tag("("), tag(")"), take_till1(is_delimiter))).parse(input)
}

/// Parse every token in the input, skipping surrounding whitespace
fn parse_tokens(input: &str) -> IResult<&str, Vec<&str>> {
    terminated(
        many0(preceded(take_while(char::is_whitespace), parse_token)),
        take_while(char::is_whitespace),
    )
    .parse(input)
}

/// Split program text into tokens.
///
/// Every `(` and `)` is its own token; any other run of characters between whitespace
/// and parentheses is one token.
pub fn tokenize(input: &str) -> Result<Vec<&str>, Error> {
    match parse_tokens(input) {
        Ok(("", tokens)) => Ok(tokens),
        Ok((remaining, _)) => Err(ParseError::new(
            ParseErrorKind::InvalidSyntax,
            "could not tokenize input",
            Some(remaining.chars().take(10).collect()),
        )
        .into()),
        Err(e) => Err(ParseError::from_message(
            ParseErrorKind::InvalidSyntax,
            format!("could not tokenize input: {e}"),
        )
        .into()),
    }
}

/// Read position over a token sequence. Tokens are consumed in order and never revisited.
#[derive(Debug, Clone)]
pub struct TokenCursor<'a> {
    tokens: &'a [&'a str],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [&'a str]) -> Self {
        TokenCursor { tokens, pos: 0 }
    }

    /// The next unconsumed token, without consuming it
    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    /// Consume and return the next token
    pub fn next_token(&mut self) -> Option<&'a str> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    /// Tokens not yet consumed
    pub fn remaining(&self) -> &'a [&'a str] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

fn unexpected_eof() -> Error {
    ParseError::from_message(ParseErrorKind::Incomplete, "unexpected end of input").into()
}

/// Read one expression from the cursor
pub fn read_from_tokens(cursor: &mut TokenCursor<'_>) -> Result<Value, Error> {
    read_expr(cursor, 0)
}

fn read_expr(cursor: &mut TokenCursor<'_>, depth: usize) -> Result<Value, Error> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(ParseError::from_message(
            ParseErrorKind::TooDeep,
            format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
        )
        .into());
    }

    let token = cursor.next_token().ok_or_else(unexpected_eof)?;

    match token {
        "(" => {
            let mut elements = Vec::new();
            loop {
                match cursor.peek() {
                    Some(")") => {
                        cursor.next_token();
                        return Ok(Value::list(elements));
                    }
                    Some(_) => elements.push(read_expr(cursor, depth + 1)?),
                    None => return Err(unexpected_eof()),
                }
            }
        }
        ")" => Err(ParseError::new(
            ParseErrorKind::UnexpectedCloseParen,
            "unexpected )",
            Some(token.to_owned()),
        )
        .into()),
        atom => Ok(parse_atom(atom)),
    }
}

/// Drop `_` digit separators. `None` unless every `_` sits between two digits.
fn strip_digit_separators(token: &str) -> Option<String> {
    let bytes = token.as_bytes();
    let separated = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    });
    separated.then(|| token.replace('_', ""))
}

/// Classify a token: integer first, then float, and anything else is a symbol.
///
/// Numbers may group digits with single underscores, as in `1_000_000`.
pub fn parse_atom(token: &str) -> Value {
    let digits = if token.contains('_') {
        strip_digit_separators(token)
    } else {
        Some(token.to_owned())
    };

    match digits {
        Some(digits) => {
            if let Ok(n) = digits.parse::<IntegerType>() {
                Value::Integer(n)
            } else if let Ok(x) = digits.parse::<f64>() {
                Value::Float(x)
            } else {
                Value::Symbol(token.to_owned())
            }
        }
        None => Value::Symbol(token.to_owned()),
    }
}

/// Parse a complete S-expression from input.
///
/// Exactly one expression must be present; tokens after it are an error.
pub fn parse_scheme(input: &str) -> Result<Value, Error> {
    let tokens = tokenize(input)?;
    let mut cursor = TokenCursor::new(&tokens);
    let value = read_from_tokens(&mut cursor)?;

    match cursor.remaining() {
        [] => Ok(value),
        [next, ..] => Err(ParseError::new(
            ParseErrorKind::TrailingContent,
            format!("unexpected input after expression: '{}'", cursor.remaining().join(" ")),
            Some((*next).to_owned()),
        )
        .into()),
    }
}
