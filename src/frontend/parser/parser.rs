//! Recursive descent parser for the SysY subset.
//!
//! Expressions use precedence climbing over the operator table in `ast`;
//! assignment is parsed as the loosest, right-associative binary operator and
//! validated as an lvalue store during lowering, mirroring the expression
//! grammar of the reference language.

use crate::common::error::{CompileError, CompileResult};
use crate::frontend::lexer::{Token, TokenKind};
use super::ast::*;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(mut self) -> CompileResult<SyntaxTree> {
        let mut items = Vec::new();
        while !matches!(self.peek(), TokenKind::Eof) {
            self.parse_item(&mut items)?;
        }
        Ok(items)
    }

    // === Token access helpers ===

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)].kind
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> &TokenKind {
        let pos = self.pos;
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        &self.tokens[pos].kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> CompileResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_ident(&mut self, what: &str) -> CompileResult<String> {
        if let TokenKind::Ident(name) = self.peek() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> CompileError {
        CompileError::Syntax(format!("expected {} at line {}", what, self.line()))
    }

    // === Declarations ===

    /// Top-level item: a (possibly const, possibly multi-declarator) variable
    /// definition, or a function definition.
    fn parse_item(&mut self, items: &mut Vec<Item>) -> CompileResult<()> {
        match self.peek() {
            TokenKind::KwConst => {
                for def in self.parse_var_defs()? {
                    items.push(Item::Var(def));
                }
                Ok(())
            }
            TokenKind::KwInt | TokenKind::KwVoid => {
                // `int f(` starts a function; anything else is a declaration.
                if matches!(self.peek_at(1), TokenKind::Ident(_))
                    && matches!(self.peek_at(2), TokenKind::LParen)
                {
                    let func = self.parse_func_def()?;
                    items.push(Item::Func(func));
                    Ok(())
                } else {
                    for def in self.parse_var_defs()? {
                        items.push(Item::Var(def));
                    }
                    Ok(())
                }
            }
            _ => Err(self.unexpected("declaration")),
        }
    }

    /// `['const'] 'int' Def {',' Def} ';'` — one `VarDef` per declarator.
    fn parse_var_defs(&mut self) -> CompileResult<Vec<VarDef>> {
        let is_const = self.eat(&TokenKind::KwConst);
        self.expect(&TokenKind::KwInt, "'int'")?;
        let mut defs = Vec::new();
        loop {
            defs.push(self.parse_var_declarator(is_const)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(defs)
    }

    fn parse_var_declarator(&mut self, is_const: bool) -> CompileResult<VarDef> {
        let name = self.expect_ident("identifier")?;
        let mut dims = Vec::new();
        while self.eat(&TokenKind::LBracket) {
            dims.push(self.parse_exp()?);
            self.expect(&TokenKind::RBracket, "']'")?;
        }
        let init = if self.eat(&TokenKind::Assign) {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        Ok(VarDef { name, dims, init, is_const })
    }

    /// `InitVal: Exp | '{' [InitVal {',' InitVal}] '}'`
    fn parse_initializer(&mut self) -> CompileResult<Initializer> {
        if self.eat(&TokenKind::LBrace) {
            let mut list = Vec::new();
            if !self.eat(&TokenKind::RBrace) {
                loop {
                    list.push(self.parse_initializer()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace, "'}'")?;
            }
            Ok(Initializer::List(list))
        } else {
            Ok(Initializer::Exp(self.parse_exp()?))
        }
    }

    fn parse_func_def(&mut self) -> CompileResult<FuncDef> {
        let returns_int = matches!(self.advance(), TokenKind::KwInt);
        let name = self.expect_ident("function name")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen, "')'")?;
        }
        let body = self.parse_block()?;
        Ok(FuncDef { name, params, body, returns_int })
    }

    /// `'int' Ident ['[' ']' {'[' Exp ']'}]` — the leading array dimension is
    /// always elided (the parameter decays to a pointer).
    fn parse_param(&mut self) -> CompileResult<Param> {
        self.expect(&TokenKind::KwInt, "'int'")?;
        let name = self.expect_ident("parameter name")?;
        let dims = if self.eat(&TokenKind::LBracket) {
            self.expect(&TokenKind::RBracket, "']'")?;
            let mut tail = Vec::new();
            while self.eat(&TokenKind::LBracket) {
                tail.push(self.parse_exp()?);
                self.expect(&TokenKind::RBracket, "']'")?;
            }
            Some(tail)
        } else {
            None
        };
        Ok(Param { name, dims })
    }

    // === Statements ===

    fn parse_block(&mut self) -> CompileResult<Block> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut block = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            if matches!(self.peek(), TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            self.parse_stmt(&mut block)?;
        }
        Ok(block)
    }

    fn parse_stmt(&mut self, block: &mut Block) -> CompileResult<()> {
        match self.peek() {
            TokenKind::KwConst | TokenKind::KwInt => {
                for def in self.parse_var_defs()? {
                    block.push(Stmt::VarDef(def));
                }
            }
            TokenKind::LBrace => {
                block.push(Stmt::Block(self.parse_block()?));
            }
            TokenKind::KwIf => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let cond = self.parse_exp()?;
                self.expect(&TokenKind::RParen, "')'")?;
                let then_block = self.parse_stmt_as_block()?;
                let else_block = if self.eat(&TokenKind::KwElse) {
                    self.parse_stmt_as_block()?
                } else {
                    Vec::new()
                };
                block.push(Stmt::If { cond, then_block, else_block });
            }
            TokenKind::KwWhile => {
                self.advance();
                self.expect(&TokenKind::LParen, "'('")?;
                let cond = self.parse_exp()?;
                self.expect(&TokenKind::RParen, "')'")?;
                let body = self.parse_stmt_as_block()?;
                block.push(Stmt::While { cond, body });
            }
            TokenKind::KwBreak => {
                self.advance();
                self.expect(&TokenKind::Semicolon, "';'")?;
                block.push(Stmt::Break);
            }
            TokenKind::KwContinue => {
                self.advance();
                self.expect(&TokenKind::Semicolon, "';'")?;
                block.push(Stmt::Continue);
            }
            TokenKind::KwReturn => {
                self.advance();
                let value = if self.eat(&TokenKind::Semicolon) {
                    None
                } else {
                    let exp = self.parse_exp()?;
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    Some(exp)
                };
                block.push(Stmt::Return(value));
            }
            TokenKind::Semicolon => {
                self.advance();
            }
            _ => {
                let exp = self.parse_exp()?;
                self.expect(&TokenKind::Semicolon, "';'")?;
                block.push(Stmt::Exp(exp));
            }
        }
        Ok(())
    }

    /// A single statement in branch position becomes a one-statement block so
    /// lowering only ever sees blocks.
    fn parse_stmt_as_block(&mut self) -> CompileResult<Block> {
        if matches!(self.peek(), TokenKind::LBrace) {
            self.parse_block()
        } else {
            let mut block = Vec::new();
            self.parse_stmt(&mut block)?;
            Ok(block)
        }
    }

    // === Expressions ===

    fn parse_exp(&mut self) -> CompileResult<Exp> {
        let lhs = self.parse_unary()?;
        self.parse_binary_rhs(lhs, u8::MAX)
    }

    /// Precedence climbing. `max_priority` is the loosest level this call may
    /// consume; assignment additionally recurses right-associatively.
    fn parse_binary_rhs(&mut self, mut lhs: Exp, max_priority: u8) -> CompileResult<Exp> {
        while let Some(op) = self.peek_binary_op() {
            let priority = op.priority();
            if priority > max_priority {
                break;
            }
            self.advance();
            let mut rhs = self.parse_unary()?;
            if op == BinaryOp::Assign {
                // Right-associative: consume everything to the right first.
                rhs = self.parse_binary_rhs(rhs, BinaryOp::Assign.priority())?;
            } else {
                // Left-associative: only bind tighter operators to the right.
                while let Some(next) = self.peek_binary_op() {
                    if next.priority() >= priority {
                        break;
                    }
                    rhs = self.parse_binary_rhs(rhs, next.priority())?;
                }
            }
            lhs = Exp::Binary { op, left: Box::new(lhs), right: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let op = match self.peek() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::Assign => BinaryOp::Assign,
            TokenKind::AndAnd => BinaryOp::And,
            TokenKind::OrOr => BinaryOp::Or,
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Ge => BinaryOp::Ge,
            _ => return None,
        };
        Some(op)
    }

    fn parse_unary(&mut self) -> CompileResult<Exp> {
        let op = match self.peek() {
            TokenKind::Plus => Some(UnaryOp::Pos),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let child = self.parse_unary()?;
            return Ok(Exp::Unary { op, child: Box::new(child) });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> CompileResult<Exp> {
        match self.peek().clone() {
            TokenKind::Integer(value) => {
                self.advance();
                Ok(Exp::Integer(value))
            }
            TokenKind::LParen => {
                self.advance();
                let exp = self.parse_exp()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(exp)
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_exp()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                        self.expect(&TokenKind::RParen, "')'")?;
                    }
                    Ok(Exp::Call { name, args })
                } else {
                    let mut subscripts = Vec::new();
                    while self.eat(&TokenKind::LBracket) {
                        subscripts.push(self.parse_exp()?);
                        self.expect(&TokenKind::RBracket, "']'")?;
                    }
                    Ok(Exp::Var { name, subscripts })
                }
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}
