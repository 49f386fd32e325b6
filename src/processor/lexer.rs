//! Line-oriented lexer for CX source.
//!
//! Each source line is tokenized on its own; tokens never span lines.
//
//  Lexical items:
//
//      Comment   ::= line starting with '?' or '//'
//      String    ::= '"' .*? '"' | '\'' .*? '\''   (quotes kept in the text)
//      Symbol    ::= '=' | '.' | '(' | ')' | ','   (always single tokens)
//      Word      ::= anything else up to whitespace / symbol / quote
//
//  Words are classified afterwards: `#get`, `#from`, `program`, `define`,
//  `class` and `finish` are keywords, the rest (other `#words` included)
//  are identifiers.
//
//  Words are bounded by MAX_TOKEN_LENGTH. String literals are only bounded
//  by the line; each model field checks its own limit.

use crate::error::{CompileError, CompileErrorKind};
use crate::model::{MAX_LINE_LENGTH, MAX_TOKEN_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Comment,
    DirectiveGet,
    DirectiveFrom,
    KeywordProgram,
    KeywordDefine,
    KeywordClass,
    KeywordFinish,
    StringLiteral,
    Identifier,
    Equals,
    Dot,
    LParen,
    RParen,
    Comma,
    /// Never produced by `tokenize`; the parser ignores it.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    /// Content of a string literal without its quotes.
    ///
    /// `None` for non-strings and for literals whose closing quote is
    /// missing.
    pub fn unquoted(&self) -> Option<&str> {
        if self.kind != TokenKind::StringLiteral {
            return None;
        }
        let quote = self.text.chars().next()?;
        let inner = self.text.strip_prefix(quote)?;
        inner.strip_suffix(quote)
    }
}

fn classify_word(word: &str) -> TokenKind {
    match word {
        "#get" => TokenKind::DirectiveGet,
        "#from" => TokenKind::DirectiveFrom,
        "program" => TokenKind::KeywordProgram,
        "define" => TokenKind::KeywordDefine,
        "class" => TokenKind::KeywordClass,
        "finish" => TokenKind::KeywordFinish,
        _ => TokenKind::Identifier,
    }
}

fn symbol_kind(c: char) -> Option<TokenKind> {
    match c {
        '=' => Some(TokenKind::Equals),
        '.' => Some(TokenKind::Dot),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        ',' => Some(TokenKind::Comma),
        _ => None,
    }
}

struct Lexer {
    line: usize,
    tokens: Vec<Token>,
    current: String,
    quote: Option<char>,
}

impl Lexer {
    fn new(line: usize) -> Self {
        Self {
            line,
            tokens: Vec::new(),
            current: String::new(),
            quote: None,
        }
    }

    fn push_char(&mut self, c: char) -> Result<(), CompileError> {
        if self.current.len() + c.len_utf8() > MAX_TOKEN_LENGTH {
            return Err(CompileError::new(
                self.line,
                CompileErrorKind::TokenTooLong {
                    max: MAX_TOKEN_LENGTH,
                },
            ));
        }
        self.current.push(c);
        Ok(())
    }

    /// Emit the pending word (if any) as a keyword / identifier.
    fn flush_word(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.current);
        let kind = classify_word(&text);
        self.tokens.push(Token::new(kind, text, self.line));
    }

    fn flush_string(&mut self) {
        let text = std::mem::take(&mut self.current);
        self.tokens
            .push(Token::new(TokenKind::StringLiteral, text, self.line));
    }

    fn feed(&mut self, c: char) -> Result<(), CompileError> {
        if let Some(q) = self.quote {
            self.current.push(c);
            if c == q {
                self.quote = None;
                self.flush_string();
            }
            return Ok(());
        }

        match c {
            ' ' | '\t' => self.flush_word(),
            '"' | '\'' => {
                self.flush_word();
                self.quote = Some(c);
                self.current.push(c);
            }
            c => match symbol_kind(c) {
                Some(kind) => {
                    self.flush_word();
                    self.tokens.push(Token::new(kind, c.to_string(), self.line));
                }
                None => self.push_char(c)?,
            },
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<Token> {
        if self.quote.is_some() {
            // unterminated quote: whatever was collected is still a string
            self.flush_string();
        } else {
            self.flush_word();
        }
        self.tokens
    }
}

/// Split one source line into tokens. Blank lines give an empty vector.
pub fn tokenize(line: &str, line_no: usize) -> Result<Vec<Token>, CompileError> {
    if line.len() > MAX_LINE_LENGTH {
        return Err(CompileError::new(
            line_no,
            CompileErrorKind::LineTooLong {
                len: line.len(),
                max: MAX_LINE_LENGTH,
            },
        ));
    }

    if line.starts_with('?') || line.starts_with("//") {
        return Ok(vec![Token::new(TokenKind::Comment, line, line_no)]);
    }

    let mut lexer = Lexer::new(line_no);
    for c in line.chars() {
        lexer.feed(c)?;
    }
    Ok(lexer.finish())
}
