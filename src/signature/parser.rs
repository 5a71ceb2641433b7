//! Парсер сигнатур и типов.

use super::error::SignatureError;
use super::lexer::Lexer;
use super::token::{Span, Spanned, Token};
use super::Signature;
use crate::types::{ForeignType, Param, Primitive};

/// Накопленные спецификаторы типа (`unsigned long const ...`).
#[derive(Debug, Default)]
struct TypeSpecifiers {
    is_const: bool,
    /// `Some(true)` - `signed`, `Some(false)` - `unsigned`.
    signedness: Option<bool>,
    short: bool,
    longs: u8,
    int: bool,
    char: bool,
    base: Option<ForeignType>,
    saw_struct: bool,
}

impl TypeSpecifiers {
    fn has_any(&self) -> bool {
        self.signedness.is_some()
            || self.short
            || self.longs > 0
            || self.int
            || self.char
            || self.base.is_some()
    }

    /// Является ли слово продолжением типа (иначе это имя параметра).
    fn accepts(&self, word: &str) -> bool {
        match word {
            "const" | "struct" => true,
            "signed" | "unsigned" | "short" | "long" | "int" | "char" => self.base.is_none(),
            _ => (self.saw_struct && self.base.is_none()) || !self.has_any(),
        }
    }

    fn push(&mut self, word: &str, span: Span) -> Result<(), SignatureError> {
        let duplicate = |what: &str| SignatureError::invalid_type(span, format!("duplicate `{}`", what));
        match word {
            "const" => self.is_const = true,
            "struct" => {
                if self.has_any() || self.saw_struct {
                    return Err(SignatureError::invalid_type(span, "unexpected `struct`"));
                }
                self.saw_struct = true;
            }
            "signed" | "unsigned" => {
                if self.signedness.is_some() {
                    return Err(duplicate("signed/unsigned"));
                }
                self.signedness = Some(word == "signed");
            }
            "short" => {
                if self.short {
                    return Err(duplicate("short"));
                }
                self.short = true;
            }
            "long" => {
                if self.longs == 2 {
                    return Err(SignatureError::invalid_type(span, "too many `long`"));
                }
                self.longs += 1;
            }
            "int" => {
                if self.int {
                    return Err(duplicate("int"));
                }
                self.int = true;
            }
            "char" => {
                if self.char {
                    return Err(duplicate("char"));
                }
                self.char = true;
            }
            _ => {
                let base = if self.saw_struct {
                    ForeignType::Named(word.to_string())
                } else if word == "void" {
                    ForeignType::Void
                } else if let Some(prim) = Primitive::from_keyword(word) {
                    ForeignType::Primitive(prim)
                } else {
                    ForeignType::Named(word.to_string())
                };
                self.base = Some(base);
            }
        }
        Ok(())
    }

    fn resolve(&self, span: Span) -> Result<ForeignType, SignatureError> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }
        if self.saw_struct {
            return Err(SignatureError::invalid_type(span, "expected struct name after `struct`"));
        }

        let unsigned = self.signedness == Some(false);
        let prim = if self.char {
            if self.short || self.longs > 0 || self.int {
                return Err(SignatureError::invalid_type(span, "`char` cannot be combined with `short`, `long` or `int`"));
            }
            match self.signedness {
                None => Primitive::Char,
                Some(true) => Primitive::SChar,
                Some(false) => Primitive::UChar,
            }
        } else if self.short {
            if self.longs > 0 {
                return Err(SignatureError::invalid_type(span, "`short` cannot be combined with `long`"));
            }
            if unsigned { Primitive::UShort } else { Primitive::Short }
        } else if self.longs == 2 {
            if unsigned { Primitive::ULongLong } else { Primitive::LongLong }
        } else if self.longs == 1 {
            if unsigned { Primitive::ULong } else { Primitive::Long }
        } else if self.int || self.signedness.is_some() {
            if unsigned { Primitive::UInt } else { Primitive::Int }
        } else {
            return Err(SignatureError::invalid_type(span, "missing type specifier"));
        };
        Ok(ForeignType::Primitive(prim))
    }
}

/// Парсер сигнатур вида `(T name, U) -> R`.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Создать новый парсер.
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Распарсить полную сигнатуру до конца ввода.
    pub fn parse_signature(&mut self) -> Result<Signature, SignatureError> {
        self.expect(Token::LParen, "`(`")?;

        let mut params: Vec<Spanned<Param>> = Vec::new();
        if matches!(self.lexer.peek_token()?.value, Token::RParen) {
            self.lexer.next_token()?;
        } else {
            loop {
                params.push(self.parse_param()?);
                let token = self.lexer.next_token()?;
                match token.value {
                    Token::Comma => continue,
                    Token::RParen => break,
                    other => {
                        return Err(SignatureError::unexpected_token(token.span, "`,` or `)`", &other))
                    }
                }
            }
        }

        // `(void)` означает пустой список параметров
        if params.len() == 1 && params[0].value.ty.is_void() && params[0].value.name.is_none() {
            params.clear();
        }
        if let Some(param) = params.iter().find(|p| p.value.ty.is_void()) {
            return Err(SignatureError::invalid_type(param.span, "parameter cannot have type `void`"));
        }

        let returns = if matches!(self.lexer.peek_token()?.value, Token::Arrow) {
            self.lexer.next_token()?;
            self.parse_type()?.value
        } else {
            ForeignType::Void
        };

        self.expect(Token::Eof, "end of input")?;

        Ok(Signature {
            params: params.into_iter().map(|p| p.value).collect(),
            returns,
        })
    }

    /// Распарсить одиночный тип до конца ввода (для полей структур).
    pub fn parse_standalone_type(&mut self) -> Result<ForeignType, SignatureError> {
        let ty = self.parse_type()?;
        self.expect(Token::Eof, "end of input")?;
        Ok(ty.value)
    }

    fn parse_param(&mut self) -> Result<Spanned<Param>, SignatureError> {
        let ty = self.parse_type()?;
        let name = match &self.lexer.peek_token()?.value {
            Token::Ident(name) => Some(name.clone()),
            _ => None,
        };

        match name {
            Some(name) => {
                let token = self.lexer.next_token()?;
                Ok(Spanned::new(Param::named(name, ty.value), ty.span.merge(token.span)))
            }
            None => Ok(Spanned::new(Param::new(ty.value), ty.span)),
        }
    }

    /// Тип: спецификаторы, затем ноль или больше `*` (каждая может нести `const`).
    fn parse_type(&mut self) -> Result<Spanned<ForeignType>, SignatureError> {
        let mut specifiers = TypeSpecifiers::default();
        let mut span: Option<Span> = None;

        loop {
            let word = match self.lexer.peek_token()?.value.as_ident() {
                Some(word) if specifiers.accepts(word) => word.to_string(),
                _ => break,
            };
            let token = self.lexer.next_token()?;
            span = Some(span.map_or(token.span, |s| s.merge(token.span)));
            specifiers.push(&word, token.span)?;
        }

        let Some(mut span) = span else {
            let token = self.lexer.next_token()?;
            return Err(SignatureError::unexpected_token(token.span, "type", &token.value));
        };

        let mut ty = specifiers.resolve(span)?;
        let mut pointee_const = specifiers.is_const;
        let mut depth = 0;

        while matches!(self.lexer.peek_token()?.value, Token::Star) {
            let star = self.lexer.next_token()?;
            span = span.merge(star.span);
            ty = ForeignType::Pointer {
                pointee: Box::new(ty),
                is_const: pointee_const,
            };
            depth += 1;
            pointee_const = false;

            if self.lexer.peek_token()?.value.as_ident() == Some("const") {
                let token = self.lexer.next_token()?;
                span = span.merge(token.span);
                pointee_const = true;
            }
        }

        if depth == 0 {
            if let ForeignType::Named(name) = &ty {
                return Err(SignatureError::invalid_type(
                    span,
                    format!("struct `{}` can only be passed by pointer", name),
                ));
            }
        }

        Ok(Spanned::new(ty, span))
    }

    fn expect(&mut self, expected: Token, description: &str) -> Result<Spanned<Token>, SignatureError> {
        let token = self.lexer.next_token()?;
        if token.value == expected {
            Ok(token)
        } else {
            Err(SignatureError::unexpected_token(token.span, description, &token.value))
        }
    }
}
