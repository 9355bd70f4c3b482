//! Recursive-descent parser producing an [`Expr`] AST from the token
//! stream (§6.3). Grammar (loosest-binding first):
//!
//! ```text
//! program    := def* pipe
//! def        := "def" ident ("(" ident ("," ident)* ")")? ":" pipe ";"
//! pipe       := compare ("|" compare)*
//! compare    := postfix (("==" | "!=") postfix)?
//! postfix    := primary ( "." ident | ".[" "]" | "[" pipe? "]" )*
//! primary    := "." | ".." | "$" ident | ident ["(" pipe ("," pipe)* ")"]
//!             | string | number | "true" | "false" | "null"
//!             | "{" (ident|string) ":" pipe ("," ...)* "}"
//!             | "[" pipe? "]" | "(" pipe ")"
//! ```

use crate::error::QueryError;

use super::lexer::Token;

#[derive(Debug, Clone)]
pub enum Expr {
    Identity,
    RecurseDescent,
    Field(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Iterate(Box<Expr>),
    Pipe(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Var(String),
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Object(Vec<(ObjKey, Expr)>),
    Array(Option<Box<Expr>>),
}

#[derive(Debug, Clone)]
pub enum ObjKey {
    Literal(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct FuncDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub defs: Vec<FuncDef>,
    pub body: Expr,
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

pub fn parse(tokens: &[Token]) -> Result<Program, QueryError> {
    let mut p = Parser { tokens, pos: 0 };
    let mut defs = Vec::new();
    while p.peek() == Some(&Token::Def) {
        defs.push(p.parse_def()?);
    }
    let body = p.parse_pipe()?;
    if p.pos != p.tokens.len() {
        return Err(QueryError::Parse {
            offset: p.pos,
            message: "unexpected trailing tokens".to_string(),
        });
    }
    Ok(Program { defs, body })
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expect(&mut self, tok: &Token) -> Result<(), QueryError> {
        if self.peek() == Some(tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(QueryError::Parse {
                offset: self.pos,
                message: format!("expected {tok:?}, found {:?}", self.peek()),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<String, QueryError> {
        match self.bump() {
            Some(Token::Ident(s)) => Ok(s.clone()),
            other => Err(QueryError::Parse {
                offset: self.pos,
                message: format!("expected identifier, found {other:?}"),
            }),
        }
    }

    fn parse_def(&mut self) -> Result<FuncDef, QueryError> {
        self.expect(&Token::Def)?;
        let name = self.expect_ident()?;
        let mut params = Vec::new();
        if self.peek() == Some(&Token::LParen) {
            self.bump();
            loop {
                params.push(self.expect_ident()?);
                match self.peek() {
                    Some(Token::Comma) => {
                        self.bump();
                    }
                    Some(Token::RParen) => {
                        self.bump();
                        break;
                    }
                    other => {
                        return Err(QueryError::Parse {
                            offset: self.pos,
                            message: format!("expected `,` or `)`, found {other:?}"),
                        })
                    }
                }
            }
        }
        self.expect(&Token::Colon)?;
        let body = self.parse_pipe()?;
        self.expect(&Token::Semicolon)?;
        Ok(FuncDef { name, params, body })
    }

    fn parse_pipe(&mut self) -> Result<Expr, QueryError> {
        let mut lhs = self.parse_compare()?;
        while self.peek() == Some(&Token::Pipe) {
            self.bump();
            let rhs = self.parse_compare()?;
            lhs = Expr::Pipe(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_compare(&mut self) -> Result<Expr, QueryError> {
        let lhs = self.parse_postfix()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.bump();
                let rhs = self.parse_postfix()?;
                Ok(Expr::Eq(Box::new(lhs), Box::new(rhs)))
            }
            Some(Token::Ne) => {
                self.bump();
                let rhs = self.parse_postfix()?;
                Ok(Expr::Ne(Box::new(lhs), Box::new(rhs)))
            }
            _ => Ok(lhs),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, QueryError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.bump();
                    let name = self.expect_ident()?;
                    expr = Expr::Field(Box::new(expr), name);
                }
                Some(Token::LBracket) => {
                    self.bump();
                    if self.peek() == Some(&Token::RBracket) {
                        self.bump();
                        expr = Expr::Iterate(Box::new(expr));
                    } else {
                        let index = self.parse_pipe()?;
                        self.expect(&Token::RBracket)?;
                        expr = Expr::Index(Box::new(expr), Box::new(index));
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, QueryError> {
        match self.bump().cloned() {
            Some(Token::DotDot) => Ok(Expr::RecurseDescent),
            Some(Token::Dot) => {
                if let Some(Token::Ident(_)) = self.peek() {
                    let name = self.expect_ident()?;
                    Ok(Expr::Field(Box::new(Expr::Identity), name))
                } else {
                    Ok(Expr::Identity)
                }
            }
            Some(Token::Var(name)) => Ok(Expr::Var(name)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Null) => Ok(Expr::Null),
            Some(Token::LParen) => {
                let inner = self.parse_pipe()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                if self.peek() == Some(&Token::RBracket) {
                    self.bump();
                    Ok(Expr::Array(None))
                } else {
                    let inner = self.parse_pipe()?;
                    self.expect(&Token::RBracket)?;
                    Ok(Expr::Array(Some(Box::new(inner))))
                }
            }
            Some(Token::LBrace) => {
                let mut entries = Vec::new();
                if self.peek() != Some(&Token::RBrace) {
                    loop {
                        let key = match self.bump().cloned() {
                            Some(Token::Ident(s)) => ObjKey::Literal(s),
                            Some(Token::Str(s)) => ObjKey::Literal(s),
                            Some(Token::LParen) => {
                                let e = self.parse_pipe()?;
                                self.expect(&Token::RParen)?;
                                ObjKey::Computed(Box::new(e))
                            }
                            other => {
                                return Err(QueryError::Parse {
                                    offset: self.pos,
                                    message: format!("expected object key, found {other:?}"),
                                })
                            }
                        };
                        self.expect(&Token::Colon)?;
                        let value = self.parse_compare()?;
                        entries.push((key, value));
                        match self.peek() {
                            Some(Token::Comma) => {
                                self.bump();
                            }
                            Some(Token::RBrace) => break,
                            other => {
                                return Err(QueryError::Parse {
                                    offset: self.pos,
                                    message: format!("expected `,` or `}}`, found {other:?}"),
                                })
                            }
                        }
                    }
                }
                self.expect(&Token::RBrace)?;
                Ok(Expr::Object(entries))
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.bump();
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.parse_pipe()?);
                            match self.peek() {
                                Some(Token::Comma) => {
                                    self.bump();
                                }
                                Some(Token::RParen) => break,
                                other => {
                                    return Err(QueryError::Parse {
                                        offset: self.pos,
                                        message: format!("expected `,` or `)`, found {other:?}"),
                                    })
                                }
                            }
                        }
                    }
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Call(name, Vec::new()))
                }
            }
            other => Err(QueryError::Parse {
                offset: self.pos,
                message: format!("unexpected token {other:?}"),
            }),
        }
    }
}
