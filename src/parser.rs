//! Recursive-descent parser producing the executable AST.
//!
//! The parser drives the lexer's token cursor directly and keeps a symbol
//! table of the classes defined so far, so instantiations reference their
//! `Class` value at parse time. The returned top-level program is a
//! `Compound`.

use std::collections::HashMap;
use std::io::Read;
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};

use crate::ast::{BinaryOperator, Statement};
use crate::lexer::{Lexer, Token};
use crate::runtime::ops::Comparator;
use crate::runtime::{Class, Method};

pub fn parse<R: Read>(lexer: &mut Lexer<R>) -> Result<Statement> {
    Parser::new(lexer).parse_program()
}

struct Parser<'a, R> {
    lexer: &'a mut Lexer<R>,
    classes: HashMap<String, Rc<Class>>,
}

impl<'a, R: Read> Parser<'a, R> {
    fn new(lexer: &'a mut Lexer<R>) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    fn parse_program(mut self) -> Result<Statement> {
        let mut statements = Vec::new();
        while *self.current() != Token::Eof {
            if self.consume_newlines()? {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Statement::Compound { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Class => self.parse_class_definition(),
            Token::If => self.parse_if_else(),
            Token::Print => self.parse_print(),
            Token::Return => self.parse_return(),
            Token::Id(_) => self.parse_assignment_or_call(),
            token => bail!("Unexpected token {token} at statement start"),
        }
    }

    fn parse_class_definition(&mut self) -> Result<Statement> {
        self.expect(Token::Class)?;
        let name = self.expect_id()?;
        let parent = if *self.current() == Token::Char(b'(') {
            self.advance()?;
            let parent_name = self.expect_id()?;
            self.expect(Token::Char(b')'))?;
            Some(self.lookup_class(&parent_name)?)
        } else {
            None
        };
        self.expect(Token::Char(b':'))?;
        self.expect(Token::Newline)?;
        self.expect(Token::Indent)?;

        let mut methods = Vec::new();
        while *self.current() != Token::Dedent && *self.current() != Token::Eof {
            methods.push(self.parse_method()?);
        }
        self.expect(Token::Dedent)?;

        let class = Class::new(name.clone(), methods, parent.as_ref());
        self.classes.insert(name, Rc::clone(&class));
        Ok(Statement::ClassDefinition { class })
    }

    fn parse_method(&mut self) -> Result<Method> {
        self.expect(Token::Def)?;
        let name = self.expect_id()?;
        self.expect(Token::Char(b'('))?;
        let mut formal_params = Vec::new();
        if *self.current() != Token::Char(b')') {
            loop {
                formal_params.push(self.expect_id()?);
                if *self.current() == Token::Char(b',') {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(Token::Char(b')'))?;
        self.expect(Token::Char(b':'))?;
        let body = self.parse_suite()?;
        Ok(Method {
            name,
            formal_params,
            body: Box::new(Statement::MethodBody {
                body: Box::new(body),
            }),
        })
    }

    /// A suite is either an indented block or a single statement inline on
    /// the same line.
    fn parse_suite(&mut self) -> Result<Statement> {
        let mut statements = Vec::new();
        if *self.current() == Token::Newline {
            self.advance()?;
            self.expect(Token::Indent)?;
            while *self.current() != Token::Dedent && *self.current() != Token::Eof {
                statements.push(self.parse_statement()?);
            }
            self.expect(Token::Dedent)?;
        } else {
            statements.push(self.parse_statement()?);
        }
        Ok(Statement::Compound { statements })
    }

    fn parse_if_else(&mut self) -> Result<Statement> {
        self.expect(Token::If)?;
        let condition = self.parse_test()?;
        self.expect(Token::Char(b':'))?;
        let then_body = self.parse_suite()?;
        let else_body = if *self.current() == Token::Else {
            self.advance()?;
            self.expect(Token::Char(b':'))?;
            Some(Box::new(self.parse_suite()?))
        } else {
            None
        };
        Ok(Statement::IfElse {
            condition: Box::new(condition),
            then_body: Box::new(then_body),
            else_body,
        })
    }

    fn parse_print(&mut self) -> Result<Statement> {
        self.expect(Token::Print)?;
        let mut args = Vec::new();
        if *self.current() != Token::Newline {
            loop {
                args.push(self.parse_test()?);
                if *self.current() == Token::Char(b',') {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(Token::Newline)?;
        Ok(Statement::Print { args })
    }

    fn parse_return(&mut self) -> Result<Statement> {
        self.expect(Token::Return)?;
        let value = if *self.current() == Token::Newline {
            Statement::NoneConst
        } else {
            self.parse_test()?
        };
        self.expect(Token::Newline)?;
        Ok(Statement::Return {
            value: Box::new(value),
        })
    }

    /// Statement starting with a name: an assignment to the name or one of
    /// its fields, or a statement-position call.
    fn parse_assignment_or_call(&mut self) -> Result<Statement> {
        let path = self.parse_dotted_name()?;
        let statement = if *self.current() == Token::Char(b'=') {
            self.advance()?;
            let value = self.parse_test()?;
            let mut path = path;
            let field = path
                .pop()
                .ok_or_else(|| anyhow!("Assignment target is empty"))?;
            if path.is_empty() {
                Statement::Assignment {
                    name: field,
                    value: Box::new(value),
                }
            } else {
                Statement::FieldAssignment {
                    path,
                    field,
                    value: Box::new(value),
                }
            }
        } else if *self.current() == Token::Char(b'(') {
            self.parse_call(path)?
        } else {
            bail!("Expected '=' or '(' after name, got {}", self.current());
        };
        self.expect(Token::Newline)?;
        Ok(statement)
    }

    /// Finishes a dotted name followed by `(`: instantiation for a bare
    /// class name, a method call otherwise. Further `.name(...)` segments
    /// chain method calls on the result.
    fn parse_call(&mut self, mut path: Vec<String>) -> Result<Statement> {
        let args = self.parse_call_args()?;
        let mut expr = if path.len() == 1 {
            let name = path.remove(0);
            let class = self.lookup_class(&name)?;
            Statement::NewInstance { class, args }
        } else {
            let method = path
                .pop()
                .ok_or_else(|| anyhow!("Call target is empty"))?;
            Statement::MethodCall {
                object: Box::new(Statement::VariableValue { path }),
                method,
                args,
            }
        };
        while *self.current() == Token::Char(b'.') {
            self.advance()?;
            let method = self.expect_id()?;
            if *self.current() != Token::Char(b'(') {
                bail!("Expected '(' after '.{method}' on a call result");
            }
            let args = self.parse_call_args()?;
            expr = Statement::MethodCall {
                object: Box::new(expr),
                method,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Statement>> {
        self.expect(Token::Char(b'('))?;
        let mut args = Vec::new();
        if *self.current() != Token::Char(b')') {
            loop {
                args.push(self.parse_test()?);
                if *self.current() == Token::Char(b',') {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(Token::Char(b')'))?;
        Ok(args)
    }

    fn parse_test(&mut self) -> Result<Statement> {
        let mut expr = self.parse_and_test()?;
        while *self.current() == Token::Or {
            self.advance()?;
            let rhs = self.parse_and_test()?;
            expr = Statement::Or {
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_and_test(&mut self) -> Result<Statement> {
        let mut expr = self.parse_not_test()?;
        while *self.current() == Token::And {
            self.advance()?;
            let rhs = self.parse_not_test()?;
            expr = Statement::And {
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_not_test(&mut self) -> Result<Statement> {
        if *self.current() == Token::Not {
            self.advance()?;
            let arg = self.parse_not_test()?;
            return Ok(Statement::Not { arg: Box::new(arg) });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Statement> {
        let lhs = self.parse_additive()?;
        let comparator = match self.current() {
            Token::Eq => Comparator::Equal,
            Token::NotEq => Comparator::NotEqual,
            Token::Char(b'<') => Comparator::Less,
            Token::Char(b'>') => Comparator::Greater,
            Token::LessOrEq => Comparator::LessOrEqual,
            Token::GreaterOrEq => Comparator::GreaterOrEqual,
            _ => return Ok(lhs),
        };
        self.advance()?;
        let rhs = self.parse_additive()?;
        Ok(Statement::Comparison {
            comparator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> Result<Statement> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current() {
                Token::Char(b'+') => BinaryOperator::Add,
                Token::Char(b'-') => BinaryOperator::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_term()?;
            expr = Statement::BinaryOp {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Statement> {
        let mut expr = self.parse_primary()?;
        loop {
            let op = match self.current() {
                Token::Char(b'*') => BinaryOperator::Mult,
                Token::Char(b'/') => BinaryOperator::Div,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_primary()?;
            expr = Statement::BinaryOp {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Statement> {
        match self.current().clone() {
            Token::Number(value) => {
                self.advance()?;
                Ok(Statement::NumberConst(value))
            }
            Token::String(value) => {
                self.advance()?;
                Ok(Statement::StringConst(value))
            }
            Token::True => {
                self.advance()?;
                Ok(Statement::BoolConst(true))
            }
            Token::False => {
                self.advance()?;
                Ok(Statement::BoolConst(false))
            }
            Token::None => {
                self.advance()?;
                Ok(Statement::NoneConst)
            }
            Token::Char(b'(') => {
                self.advance()?;
                let expr = self.parse_test()?;
                self.expect(Token::Char(b')'))?;
                Ok(expr)
            }
            Token::Id(_) => {
                let path = self.parse_dotted_name()?;
                if *self.current() == Token::Char(b'(') {
                    if path.len() == 1 && path[0] == "str" {
                        self.advance()?;
                        let arg = self.parse_test()?;
                        self.expect(Token::Char(b')'))?;
                        return Ok(Statement::Stringify { arg: Box::new(arg) });
                    }
                    return self.parse_call(path);
                }
                Ok(Statement::VariableValue { path })
            }
            token => bail!("Expected an expression, got {token}"),
        }
    }

    fn parse_dotted_name(&mut self) -> Result<Vec<String>> {
        let mut path = vec![self.expect_id()?];
        while *self.current() == Token::Char(b'.') {
            self.advance()?;
            path.push(self.expect_id()?);
        }
        Ok(path)
    }

    fn consume_newlines(&mut self) -> Result<bool> {
        let mut consumed = false;
        while *self.current() == Token::Newline {
            consumed = true;
            self.advance()?;
        }
        Ok(consumed)
    }

    fn current(&self) -> &Token {
        self.lexer.current()
    }

    fn advance(&mut self) -> Result<Token> {
        Ok(self.lexer.advance()?)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if *self.current() == expected {
            self.advance()?;
            Ok(())
        } else {
            bail!("Expected {expected}, got {}", self.current())
        }
    }

    fn expect_id(&mut self) -> Result<String> {
        if let Token::Id(name) = self.current() {
            let name = name.clone();
            self.advance()?;
            Ok(name)
        } else {
            bail!("Expected an identifier, got {}", self.current())
        }
    }

    fn lookup_class(&self, name: &str) -> Result<Rc<Class>> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown class '{name}'"))
    }
}
