//! Recursive descent parser for the test script dialect.
//!
//! Semicolons are optional after simple statements. Statements that start
//! with `{` are blocks, never object literals.

use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, FunctionDef, LogicalOp, Stmt, StmtKind, UnaryOp};
use crate::error::SyntaxError;
use crate::lexer::{tokenize, Spanned, Token};

/// Parse a whole program
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let mut parser = Parser::new(source)?;
    let mut statements = Vec::new();
    while !parser.at(&Token::Eof) {
        statements.push(parser.parse_statement()?);
    }
    Ok(statements)
}

/// Parser state
struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, SyntaxError> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn current(&self) -> &Spanned {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn advance(&mut self) -> Token {
        let token = self.current().token.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> SyntaxError {
        let current = self.current();
        SyntaxError::new(
            format!("Unexpected token '{}'", current.token),
            current.line,
            current.column,
        )
    }

    fn expect(&mut self, token: &Token) -> Result<(), SyntaxError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn identifier(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Identifier or keyword in property-name position
    fn property_name(&mut self) -> Result<String, SyntaxError> {
        if let Some(text) = self.peek().keyword_text() {
            self.advance();
            return Ok(text.to_string());
        }
        self.identifier()
    }

    fn end_of_statement(&mut self) {
        self.eat(&Token::Semicolon);
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let (line, column) = (self.current().line, self.current().column);
        let kind = match self.peek() {
            Token::Var | Token::Let | Token::Const => {
                self.advance();
                let mut declarations = Vec::new();
                loop {
                    let name = self.identifier()?;
                    let init = if self.eat(&Token::Equal) {
                        Some(self.parse_expression()?)
                    } else {
                        None
                    };
                    declarations.push((name, init));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.end_of_statement();
                StmtKind::Var(declarations)
            }
            Token::Function => {
                self.advance();
                let name = self.identifier()?;
                StmtKind::Function(self.parse_function_rest(Some(name))?)
            }
            Token::Return => {
                self.advance();
                let value = match self.peek() {
                    Token::Semicolon | Token::RightBrace | Token::Eof => None,
                    _ => Some(self.parse_expression()?),
                };
                self.end_of_statement();
                StmtKind::Return(value)
            }
            Token::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                self.end_of_statement();
                StmtKind::Throw(value)
            }
            Token::If => {
                self.advance();
                self.expect(&Token::LeftParen)?;
                let test = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                let then = Box::new(self.parse_statement()?);
                let otherwise = if self.eat(&Token::Else) {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                StmtKind::If {
                    test,
                    then,
                    otherwise,
                }
            }
            Token::Try => {
                self.advance();
                let body = self.parse_block()?;
                let mut param = None;
                let mut handler = None;
                if self.eat(&Token::Catch) {
                    if self.eat(&Token::LeftParen) {
                        param = Some(self.identifier()?);
                        self.expect(&Token::RightParen)?;
                    }
                    handler = Some(self.parse_block()?);
                }
                let finalizer = if self.eat(&Token::Finally) {
                    Some(self.parse_block()?)
                } else {
                    None
                };
                if handler.is_none() && finalizer.is_none() {
                    return Err(self.unexpected());
                }
                StmtKind::Try {
                    body,
                    param,
                    handler,
                    finalizer,
                }
            }
            Token::LeftBrace => StmtKind::Block(self.parse_block()?),
            Token::Debugger => {
                self.advance();
                self.end_of_statement();
                StmtKind::Debugger
            }
            Token::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            _ => {
                let expr = self.parse_expression()?;
                self.end_of_statement();
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt { kind, line, column })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.expect(&Token::LeftBrace)?;
        let mut statements = Vec::new();
        while !self.eat(&Token::RightBrace) {
            if self.at(&Token::Eof) {
                return Err(self.unexpected());
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parameters and body, after `function [name]`
    fn parse_function_rest(&mut self, name: Option<String>) -> Result<Rc<FunctionDef>, SyntaxError> {
        self.expect(&Token::LeftParen)?;
        let mut params = Vec::new();
        if !self.eat(&Token::RightParen) {
            loop {
                params.push(self.identifier()?);
                if self.eat(&Token::RightParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }
        let body = self.parse_block()?;
        Ok(Rc::new(FunctionDef { name, params, body }))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, SyntaxError> {
        let target = self.parse_or()?;
        if !self.at(&Token::Equal) {
            return Ok(target);
        }
        if !matches!(target, Expr::Ident(_) | Expr::Member(..) | Expr::Index(..)) {
            let current = self.current();
            return Err(SyntaxError::new(
                "Invalid left-hand side in assignment",
                current.line,
                current.column,
            ));
        }
        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expr::Assign(Box::new(target), Box::new(value)))
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::PipePipe) {
            let right = self.parse_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AmpAmp) {
            let right = self.parse_equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::StrictEqual => BinaryOp::StrictEq,
                Token::StrictNotEqual => BinaryOp::StrictNe,
                Token::EqualEqual => BinaryOp::LooseEq,
                Token::NotEqual => BinaryOp::LooseNe,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Less => BinaryOp::Lt,
                Token::Greater => BinaryOp::Gt,
                Token::LessEqual => BinaryOp::Le,
                Token::GreaterEqual => BinaryOp::Ge,
                Token::In => BinaryOp::In,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Negate,
            Token::Plus => UnaryOp::Plus,
            Token::Typeof => UnaryOp::Typeof,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = if self.at(&Token::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            expr = match self.peek() {
                Token::Dot => {
                    self.advance();
                    Expr::Member(Box::new(expr), self.property_name()?)
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&Token::RightBracket)?;
                    Expr::Index(Box::new(expr), Box::new(index))
                }
                Token::LeftParen => Expr::Call(Box::new(expr), self.parse_arguments()?),
                _ => return Ok(expr),
            };
        }
    }

    /// `new Callee.member[index](args)`; arguments are optional
    fn parse_new(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(&Token::New)?;
        let mut callee = if self.at(&Token::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            callee = match self.peek() {
                Token::Dot => {
                    self.advance();
                    Expr::Member(Box::new(callee), self.property_name()?)
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&Token::RightBracket)?;
                    Expr::Index(Box::new(callee), Box::new(index))
                }
                _ => break,
            };
        }
        let args = if self.at(&Token::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr::New(Box::new(callee), args))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(&Token::LeftParen)?;
        let mut args = Vec::new();
        if self.eat(&Token::RightParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.eat(&Token::RightParen) {
                return Ok(args);
            }
            self.expect(&Token::Comma)?;
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let expr = match self.peek().clone() {
            Token::Number(n) => Expr::Number(n),
            Token::String(s) => Expr::String(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
            Token::This => Expr::This,
            Token::Identifier(name) => Expr::Ident(name),
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                return Ok(inner);
            }
            Token::LeftBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.eat(&Token::RightBracket) {
                    items.push(self.parse_expression()?);
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RightBracket)?;
                        break;
                    }
                }
                return Ok(Expr::Array(items));
            }
            Token::LeftBrace => {
                self.advance();
                let mut entries = Vec::new();
                while !self.eat(&Token::RightBrace) {
                    let key = match self.peek().clone() {
                        Token::String(s) => {
                            self.advance();
                            s
                        }
                        Token::Number(n) => {
                            self.advance();
                            n.to_string()
                        }
                        _ => self.property_name()?,
                    };
                    self.expect(&Token::Colon)?;
                    entries.push((key, self.parse_expression()?));
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RightBrace)?;
                        break;
                    }
                }
                return Ok(Expr::Object(entries));
            }
            Token::Function => {
                self.advance();
                let name = match self.peek() {
                    Token::Identifier(_) => Some(self.identifier()?),
                    _ => None,
                };
                return Ok(Expr::Function(self.parse_function_rest(name)?));
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(expr)
    }
}
