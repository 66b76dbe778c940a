//! Parser for the winding description language.

use std::collections::HashMap;

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::error::{Result, TfmrError};

/// Parser for winding descriptions.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire description.
    pub fn parse(&mut self) -> Result<WindingAst> {
        let mut ast = WindingAst::new();

        while self.current.kind != TokenKind::Eof {
            match &self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => {
                    let directive = self.parse_directive()?;
                    if ast.get(directive.kind).is_some() {
                        return Err(TfmrError::DuplicateDirective {
                            directive: directive.kind.name().to_string(),
                            line: directive.line,
                        });
                    }
                    ast.directives.push(directive);
                }
                _ => {
                    return Err(TfmrError::parse(
                        self.current.line,
                        format!("expected a directive, got {:?}", self.current.text),
                    ));
                }
            }

            // Consume newline or EOF
            if self.current.kind == TokenKind::Newline {
                self.advance()?;
            }
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(TfmrError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn parse_directive(&mut self) -> Result<DirectiveDef> {
        let name = self.current.text.clone();
        let line = self.current.line;
        let kind = DirectiveKind::from_name(&name).ok_or_else(|| TfmrError::UnknownDirective {
            directive: name.clone(),
            line,
        })?;
        self.advance()?;

        let mut params = HashMap::new();

        // key=value pairs until end of line
        while self.current.kind != TokenKind::Newline && self.current.kind != TokenKind::Eof {
            let key = self.expect(TokenKind::Identifier)?.text.to_lowercase();
            self.expect(TokenKind::Equals)?;

            if !kind.allowed_params().iter().any(|k| *k == key) {
                return Err(TfmrError::invalid_parameter(
                    kind.name(),
                    &key,
                    format!(
                        "unknown parameter at line {} (expected one of: {})",
                        line,
                        kind.allowed_params().join(", ")
                    ),
                ));
            }

            let value = match self.current.kind {
                TokenKind::Number => {
                    let text = self.current.text.clone();
                    let v = parse_value(&text).ok_or_else(|| {
                        TfmrError::invalid_parameter(
                            kind.name(),
                            &key,
                            format!("invalid number '{}' at line {}", text, line),
                        )
                    })?;
                    ParamValue::Number(v)
                }
                TokenKind::Identifier => ParamValue::Word(self.current.text.to_lowercase()),
                _ => {
                    return Err(TfmrError::parse(
                        line,
                        format!("expected a value for '{}'", key),
                    ));
                }
            };
            self.advance()?;

            if params.insert(key.clone(), value).is_some() {
                return Err(TfmrError::invalid_parameter(
                    kind.name(),
                    &key,
                    format!("given more than once at line {}", line),
                ));
            }
        }

        Ok(DirectiveDef { kind, params, line })
    }
}
