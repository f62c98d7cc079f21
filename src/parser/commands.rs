//! Recursive-descent parser for debugger command lines.
//!
//! Expression precedence, lowest first: `&` `|`, one comparison
//! (`= <> < <= > >=`), `+ -`, `* / %`, then literals, references and
//! parenthesized expressions.

use super::scanner::{tokenize, Keyword, ParseError, Token};
use super::types::{BinaryOp, Command, Expression, FilePosition, Reference};

/// Parse one command line already carrying the command prefix.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(line)?,
        pos: 0,
    };
    let command = parser.command()?;
    parser.eat(&Token::SemiColon);
    match parser.peek() {
        Some(token) => Err(ParseError::new(format!("unexpected {token:?}"))),
        None => Ok(command),
    }
}

fn literal_word(word: &str) -> Option<Expression> {
    match word {
        "true" => Some(Expression::Bool(true)),
        "false" => Some(Expression::Bool(false)),
        "Nil" => Some(Expression::Nil),
        _ => None,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(ParseError::new(format!("expected {what}")))
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::SemiColon))
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        let Some(Token::Keyword(keyword)) = self.advance() else {
            return Err(ParseError::new("expected a command"));
        };
        let command = match keyword {
            Keyword::Exe => Command::LoadExecutable(self.text("a program file")?),
            Keyword::Src => Command::SourceDirectory(self.text("a source directory")?),
            Keyword::Args => Command::Arguments(self.text("program arguments")?),
            Keyword::Quit => Command::Quit,
            Keyword::Break => Command::Break(self.position()?),
            Keyword::Breaks => Command::Breaks,
            Keyword::Delete => Command::Delete(self.position()?),
            Keyword::List => Command::List(self.position()?),
            Keyword::Print => Command::Print(self.expression()?),
            Keyword::Run => Command::Run,
            Keyword::Clear => Command::Clear,
            Keyword::StepIn => Command::StepInto,
            Keyword::NextLine => Command::NextLine,
            Keyword::StepOut => Command::StepOut,
            Keyword::Continue => Command::Continue,
            Keyword::Memory => Command::Memory,
            Keyword::Stack => Command::Stack,
            Keyword::Info => self.info()?,
        };
        Ok(command)
    }

    fn text(&mut self, what: &str) -> Result<String, ParseError> {
        match self.advance() {
            Some(Token::Str(text)) | Some(Token::Ident(text)) => Ok(text),
            _ => Err(ParseError::new(format!("expected {what}"))),
        }
    }

    fn position(&mut self) -> Result<FilePosition, ParseError> {
        let mut position = FilePosition::default();
        if self.at_end() {
            return Ok(position);
        }
        if let Some(Token::Ident(_) | Token::Str(_)) = self.peek() {
            position.file = Some(self.text("a file name")?);
            self.expect(Token::Colon, "':' after the file name")?;
            if self.at_end() {
                return Ok(position);
            }
        }
        match self.advance() {
            Some(Token::Int(line)) => {
                let line =
                    i32::try_from(line).map_err(|_| ParseError::new("line number out of range"))?;
                position.line = Some(line);
                Ok(position)
            }
            _ => Err(ParseError::new("expected a line number")),
        }
    }

    fn info(&mut self) -> Result<Command, ParseError> {
        let mut class = None;
        let mut method = None;
        if !self.at_end() {
            class = Some(self.setting("class")?);
            if !self.at_end() {
                method = Some(self.setting("method")?);
            }
        }
        Ok(Command::Info { class, method })
    }

    /// `key=value`
    fn setting(&mut self, key: &str) -> Result<String, ParseError> {
        match self.advance() {
            Some(Token::Ident(word)) if word == key => {}
            _ => return Err(ParseError::new(format!("expected '{key}='"))),
        }
        self.expect(Token::Eql, "'='")?;
        self.text(key)
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        self.logic()
    }

    fn logic(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::And) => BinaryOp::And,
                Some(Token::Or) => BinaryOp::Or,
                _ => break,
            };
            self.pos += 1;
            let right = self.comparison()?;
            left = Expression::binary(op, left, right);
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expression, ParseError> {
        let left = self.term()?;
        let op = match self.peek() {
            Some(Token::Eql) => BinaryOp::Eql,
            Some(Token::Neql) => BinaryOp::Neql,
            Some(Token::Les) => BinaryOp::Les,
            Some(Token::LesEql) => BinaryOp::LesEql,
            Some(Token::Gtr) => BinaryOp::Gtr,
            Some(Token::GtrEql) => BinaryOp::GtrEql,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.term()?;
        Ok(Expression::binary(op, left, right))
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Add) => BinaryOp::Add,
                Some(Token::Sub) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.factor()?;
            left = Expression::binary(op, left, right);
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.simple()?;
        loop {
            let op = match self.peek() {
                Some(Token::Mul) => BinaryOp::Mul,
                Some(Token::Div) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.simple()?;
            left = Expression::binary(op, left, right);
        }
        Ok(left)
    }

    fn simple(&mut self) -> Result<Expression, ParseError> {
        match self.advance() {
            Some(Token::Ident(name)) => match literal_word(&name) {
                Some(literal) => Ok(literal),
                None => Ok(Expression::Reference(self.reference(name)?)),
            },
            Some(Token::SelfRef) => {
                let mut reference = Reference::self_ref();
                if self.eat(&Token::Accessor) {
                    reference.next = Some(Box::new(self.field()?));
                }
                Ok(Expression::Reference(reference))
            }
            Some(Token::Int(value)) => Ok(Expression::Int(value)),
            Some(Token::Float(value)) => Ok(Expression::Float(value)),
            Some(Token::Char(value)) => Ok(Expression::Char(value)),
            Some(Token::Sub) => match self.advance() {
                Some(Token::Int(value)) => Ok(Expression::Int(value.wrapping_neg())),
                Some(Token::Float(value)) => Ok(Expression::Float(-value)),
                _ => Err(ParseError::new("expected a number after '-'")),
            },
            Some(Token::OpenParen) => {
                let inner = self.logic()?;
                self.expect(Token::CloseParen, "')'")?;
                Ok(inner)
            }
            Some(token) => Err(ParseError::new(format!("unexpected {token:?}"))),
            None => Err(ParseError::new("expected an expression")),
        }
    }

    fn field(&mut self) -> Result<Reference, ParseError> {
        match self.advance() {
            Some(Token::Ident(name)) => self.reference(name),
            _ => Err(ParseError::new("expected a field name after '->'")),
        }
    }

    fn reference(&mut self, name: String) -> Result<Reference, ParseError> {
        let mut reference = Reference::new(name);
        if self.eat(&Token::OpenBracket) {
            let mut indices = vec![self.logic()?];
            while self.eat(&Token::Comma) {
                indices.push(self.logic()?);
            }
            self.expect(Token::CloseBracket, "']'")?;
            reference.indices = Some(indices);
        }
        if self.eat(&Token::Accessor) {
            reference.next = Some(Box::new(self.field()?));
        }
        Ok(reference)
    }
}
