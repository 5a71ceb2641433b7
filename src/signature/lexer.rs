//! Лексер для сигнатур внешних функций.

use logos::Logos;

use super::error::SignatureError;
use super::token::{Span, Spanned, Token};

/// Внутренние токены для logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
enum LogosToken {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[token("*")]
    Star,

    #[token("->")]
    Arrow,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Лексер сигнатур.
pub struct Lexer<'a> {
    logos: logos::Lexer<'a, LogosToken>,
    source: &'a str,
    peeked: Option<Spanned<Token>>,
}

impl<'a> Lexer<'a> {
    /// Создать новый лексер.
    pub fn new(source: &'a str) -> Self {
        Self {
            logos: LogosToken::lexer(source),
            source,
            peeked: None,
        }
    }

    /// Получить следующий токен.
    pub fn next_token(&mut self) -> Result<Spanned<Token>, SignatureError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }

        self.read_token()
    }

    /// Посмотреть на следующий токен без его потребления.
    pub fn peek_token(&mut self) -> Result<&Spanned<Token>, SignatureError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.read_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Прочитать токен из logos.
    fn read_token(&mut self) -> Result<Spanned<Token>, SignatureError> {
        match self.logos.next() {
            Some(Ok(logos_token)) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                Ok(Spanned::new(convert_token(logos_token), span))
            }
            Some(Err(())) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                Err(SignatureError::LexerError { span })
            }
            None => {
                let pos = self.source.len();
                Ok(Spanned::new(Token::Eof, Span::new(pos, pos)))
            }
        }
    }
}

fn convert_token(logos_token: LogosToken) -> Token {
    match logos_token {
        LogosToken::LParen => Token::LParen,
        LogosToken::RParen => Token::RParen,
        LogosToken::Comma => Token::Comma,
        LogosToken::Star => Token::Star,
        LogosToken::Arrow => Token::Arrow,
        LogosToken::Ident(s) => Token::Ident(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer_signature() {
        let mut lexer = Lexer::new("(Counter* self, int n) -> int");

        assert!(matches!(lexer.next_token().unwrap().value, Token::LParen));
        assert!(matches!(
            lexer.next_token().unwrap().value,
            Token::Ident(s) if s == "Counter"
        ));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Star));
        assert!(matches!(
            lexer.next_token().unwrap().value,
            Token::Ident(s) if s == "self"
        ));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Comma));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Ident(_)));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Ident(_)));
        assert!(matches!(lexer.next_token().unwrap().value, Token::RParen));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Arrow));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Ident(_)));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Eof));
    }

    #[test]
    fn test_lexer_peek_does_not_consume() {
        let mut lexer = Lexer::new("int");
        assert!(matches!(lexer.peek_token().unwrap().value, Token::Ident(_)));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Ident(_)));
        assert!(matches!(lexer.next_token().unwrap().value, Token::Eof));
    }

    #[test]
    fn test_lexer_rejects_garbage() {
        let mut lexer = Lexer::new("int [3]");
        assert!(lexer.next_token().is_ok());
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.span().start, 4);
    }
}
