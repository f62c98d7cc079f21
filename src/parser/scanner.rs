use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

/// Prefixed to every command line by the session; keywords are only
/// recognized directly after it.
pub const COMMAND_PREFIX: char = '?';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Exe,
    Src,
    Args,
    Quit,
    Break,
    Breaks,
    Delete,
    Print,
    Run,
    Clear,
    StepIn,
    NextLine,
    StepOut,
    Continue,
    Memory,
    Info,
    Stack,
    List,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        let keyword = match word {
            "exe" | "bin" => Keyword::Exe,
            "src" => Keyword::Src,
            "args" => Keyword::Args,
            "quit" | "q" => Keyword::Quit,
            "break" | "b" => Keyword::Break,
            "breaks" => Keyword::Breaks,
            "delete" | "d" => Keyword::Delete,
            "print" | "p" => Keyword::Print,
            "run" | "r" => Keyword::Run,
            "clear" => Keyword::Clear,
            "step" | "s" | "in" => Keyword::StepIn,
            "next" | "n" => Keyword::NextLine,
            "out" | "jump" | "o" | "j" => Keyword::StepOut,
            "cont" | "continue" | "c" => Keyword::Continue,
            "memory" | "m" => Keyword::Memory,
            "info" | "i" => Keyword::Info,
            "stack" => Keyword::Stack,
            "list" | "l" => Keyword::List,
            _ => return None,
        };
        Some(keyword)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Ident(String),
    SelfRef,
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Colon,
    Accessor,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Comma,
    SemiColon,
    And,
    Or,
    Eql,
    Neql,
    Les,
    LesEql,
    Gtr,
    GtrEql,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || matches!(ch, '_' | '@' | COMMAND_PREFIX)
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '@' | '.' | COMMAND_PREFIX)
}

/// Split a command line into tokens.
pub fn tokenize(line: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if is_ident_start(ch) {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if !is_ident_char(c) {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(word_token(word)?);
            continue;
        }

        if ch.is_ascii_digit() {
            tokens.push(number(&mut chars)?);
            continue;
        }

        chars.next();
        let token = match ch {
            '\'' => char_literal(&mut chars)?,
            '"' => string_literal(&mut chars)?,
            ':' => Token::Colon,
            '[' => Token::OpenBracket,
            ']' => Token::CloseBracket,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            ',' => Token::Comma,
            ';' => Token::SemiColon,
            '&' => Token::And,
            '|' => Token::Or,
            '=' => Token::Eql,
            '+' => Token::Add,
            '*' => Token::Mul,
            '/' => Token::Div,
            '%' => Token::Mod,
            '-' => {
                if chars.next_if_eq(&'>').is_some() {
                    Token::Accessor
                } else {
                    Token::Sub
                }
            }
            '<' => {
                if chars.next_if_eq(&'=').is_some() {
                    Token::LesEql
                } else if chars.next_if_eq(&'>').is_some() {
                    Token::Neql
                } else {
                    Token::Les
                }
            }
            '>' => {
                if chars.next_if_eq(&'=').is_some() {
                    Token::GtrEql
                } else {
                    Token::Gtr
                }
            }
            other => return Err(ParseError::new(format!("unexpected character '{other}'"))),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn word_token(word: String) -> Result<Token, ParseError> {
    if let Some(rest) = word.strip_prefix(COMMAND_PREFIX) {
        return Keyword::lookup(rest)
            .map(Token::Keyword)
            .ok_or_else(|| ParseError::new(format!("unknown command '{rest}'")));
    }
    if word == "@self" {
        return Ok(Token::SelfRef);
    }
    Ok(Token::Ident(word))
}

fn number(chars: &mut Peekable<Chars<'_>>) -> Result<Token, ParseError> {
    let mut text = String::new();

    if chars.next_if_eq(&'0').is_some() {
        if chars.next_if(|c| matches!(c, 'x' | 'X')).is_some() {
            while let Some(c) = chars.next_if(char::is_ascii_hexdigit) {
                text.push(c);
            }
            return u64::from_str_radix(&text, 16)
                .map(|value| Token::Int(value as i64))
                .map_err(|_| ParseError::new(format!("invalid hex number '0x{text}'")));
        }
        text.push('0');
    }

    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        text.push(c);
    }

    let mut lookahead = chars.clone();
    let is_float = lookahead.next() == Some('.') && lookahead.peek().is_some_and(char::is_ascii_digit);
    if !is_float {
        return text
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| ParseError::new(format!("invalid number '{text}'")));
    }

    chars.next();
    text.push('.');
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        text.push(c);
    }
    text.parse::<f64>()
        .map(Token::Float)
        .map_err(|_| ParseError::new(format!("invalid number '{text}'")))
}

fn escape(ch: char) -> char {
    match ch {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn char_literal(chars: &mut Peekable<Chars<'_>>) -> Result<Token, ParseError> {
    let value = match chars.next() {
        Some('\\') => chars.next().map(escape),
        Some('\'') | None => None,
        other => other,
    };
    match (value, chars.next()) {
        (Some(value), Some('\'')) => Ok(Token::Char(value)),
        _ => Err(ParseError::new("invalid character literal")),
    }
}

fn string_literal(chars: &mut Peekable<Chars<'_>>) -> Result<Token, ParseError> {
    let mut value = String::new();
    loop {
        match chars.next() {
            Some('"') => return Ok(Token::Str(value)),
            Some('\\') => match chars.next() {
                Some(c) => value.push(escape(c)),
                None => break,
            },
            Some(c) => value.push(c),
            None => break,
        }
    }
    Err(ParseError::new("unterminated string"))
}
