// tamarin-parser - Lexer for Tamarin
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for Tamarin source code.
//!
//! Converts a source string into a stream of tokens, one per call to
//! [`Lexer::next_token`]. After the input is exhausted the lexer returns
//! `Eof` tokens indefinitely.

use crate::token::{Token, TokenKind, lookup_ident};

/// The lexer walks the source bytes with one byte of lookahead.
pub struct Lexer<'a> {
    input: &'a [u8],
    /// Position of the byte currently under examination.
    position: usize,
    /// Position of the next byte to read.
    read_position: usize,
    /// The byte under examination, 0 at end of input.
    ch: u8,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer {
            input: source.as_bytes(),
            position: 0,
            read_position: 0,
            ch: 0,
        };
        lexer.read_char();
        lexer
    }

    /// Scan and return the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let token = match self.ch {
            b'=' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    Token::new(TokenKind::Eq, "==")
                } else {
                    Token::new(TokenKind::Assign, "=")
                }
            }
            b'!' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    Token::new(TokenKind::NotEq, "!=")
                } else {
                    Token::new(TokenKind::Bang, "!")
                }
            }
            b'+' => Token::new(TokenKind::Plus, "+"),
            b'-' => Token::new(TokenKind::Minus, "-"),
            b'*' => Token::new(TokenKind::Asterisk, "*"),
            b'/' => Token::new(TokenKind::Slash, "/"),
            b'<' => Token::new(TokenKind::Lt, "<"),
            b'>' => Token::new(TokenKind::Gt, ">"),
            b',' => Token::new(TokenKind::Comma, ","),
            b';' => Token::new(TokenKind::Semicolon, ";"),
            b':' => Token::new(TokenKind::Colon, ":"),
            b'(' => Token::new(TokenKind::Lparen, "("),
            b')' => Token::new(TokenKind::Rparen, ")"),
            b'{' => Token::new(TokenKind::Lbrace, "{"),
            b'}' => Token::new(TokenKind::Rbrace, "}"),
            b'[' => Token::new(TokenKind::Lbracket, "["),
            b']' => Token::new(TokenKind::Rbracket, "]"),
            b'"' => Token::new(TokenKind::Str, self.read_string()),
            0 => Token::eof(),
            _ => {
                if is_letter(self.ch) {
                    // Early return: read_identifier has already advanced past
                    // the final character.
                    let literal = self.read_identifier();
                    return Token::new(lookup_ident(&literal), literal);
                } else if self.ch.is_ascii_digit() {
                    return Token::new(TokenKind::Int, self.read_number());
                } else {
                    Token::new(TokenKind::Illegal, (self.ch as char).to_string())
                }
            }
        };

        self.read_char();
        token
    }

    /// Collect all tokens up to and excluding `Eof` into a vector.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn read_char(&mut self) {
        self.ch = self.input.get(self.read_position).copied().unwrap_or(0);
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> u8 {
        self.input.get(self.read_position).copied().unwrap_or(0)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, b' ' | b'\t' | b'\r' | b'\n') {
            self.read_char();
        }
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while is_letter(self.ch) {
            self.read_char();
        }
        String::from_utf8_lossy(&self.input[start..self.position]).into_owned()
    }

    fn read_number(&mut self) -> String {
        let start = self.position;
        while self.ch.is_ascii_digit() {
            self.read_char();
        }
        String::from_utf8_lossy(&self.input[start..self.position]).into_owned()
    }

    /// Read string contents up to but not including the closing quote.
    /// No escape processing; an unterminated string ends at end of input.
    fn read_string(&mut self) -> String {
        let start = self.position + 1;
        loop {
            self.read_char();
            if self.ch == b'"' || self.ch == 0 {
                break;
            }
        }
        String::from_utf8_lossy(&self.input[start..self.position]).into_owned()
    }
}

/// Identifier characters: letters and underscore, no digits.
fn is_letter(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

// ============================================================================
// Tests
// ============================================================================
