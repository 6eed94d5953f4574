// ABOUTME: Recursive-descent parser turning tokens into statements with panic-mode recovery

use crate::ast::{Expr, FunctionExpr, Stmt};
use crate::error::{ErrorReporter, ParseError};
use crate::token::{Token, TokenKind};
use std::rc::Rc;

/// Hard ceiling on parameter and argument counts. Exceeding it is reported
/// as a parse error but does not halt parsing.
const MAX_ARGS: usize = 255;

/// Parse a token sequence into a program. Errors are recorded through the
/// reporter; the returned statements are whatever could be recovered, so a
/// caller must check `reporter.had_error()` before executing them.
pub fn parse(tokens: Vec<Token>, reporter: &mut ErrorReporter) -> Vec<Stmt> {
    Parser::new(tokens, reporter).program()
}

pub struct Parser<'r> {
    tokens: Vec<Token>,
    current: usize,
    reporter: &'r mut ErrorReporter,
}

impl<'r> Parser<'r> {
    pub fn new(tokens: Vec<Token>, reporter: &'r mut ErrorReporter) -> Self {
        Parser {
            tokens,
            current: 0,
            reporter,
        }
    }

    fn program(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        statements
    }

    /// The statement-boundary error recovery point: a `ParseError` raised
    /// anywhere below lands here, and the parser re-synchronizes before
    /// continuing with the next declaration.
    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_kind(TokenKind::Var) {
            self.var_declaration()
        } else if self.check(TokenKind::Fun) && self.check_next(TokenKind::Identifier) {
            self.advance();
            self.function_declaration("function")
        } else if self.match_kind(TokenKind::Class) {
            self.class_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;
        let initializer = if self.match_kind(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn function_declaration(&mut self, kind: &str) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name."))?;
        let function = self.function_body(kind)?;
        Ok(Stmt::Function { name, function })
    }

    fn function_body(&mut self, kind: &str) -> Result<Rc<FunctionExpr>, ParseError> {
        self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name."))?;
        let params = self.parameters()?;
        self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block_statements()?;
        Ok(Rc::new(FunctionExpr { params, body }))
    }

    fn parameters(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    let token = self.peek().clone();
                    self.reporter
                        .error_at_token(&token, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        Ok(params)
    }

    fn class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect class name.")?;
        let superclass = if self.match_kind(TokenKind::Less) {
            let super_name = self.consume(TokenKind::Identifier, "Expect superclass name.")?;
            Some(Expr::Variable { name: super_name })
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            // The `fun` keyword is optional in front of a method.
            self.match_kind(TokenKind::Fun);
            methods.push(self.function_declaration("method")?);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_kind(TokenKind::Print) {
            return self.print_statement();
        }
        if self.match_kind(TokenKind::LeftBrace) {
            let statements = self.block_statements()?;
            return Ok(Stmt::Block { statements });
        }
        if self.match_kind(TokenKind::If) {
            return self.if_statement();
        }
        if self.match_kind(TokenKind::While) {
            return self.while_statement();
        }
        if self.match_kind(TokenKind::For) {
            return self.for_statement();
        }
        if self.match_kind(TokenKind::Return) {
            return self.return_statement();
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print { expr })
    }

    /// Consumes declarations up to and including the closing brace. The
    /// opening brace has already been consumed by the caller.
    fn block_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        // `else` binds to the nearest unmatched `if`.
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.match_kind(TokenKind::Var) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            initializer,
            condition,
            increment,
            body,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expr { expr })
    }

    //
    // Expression grammar, precedence low to high.
    //

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.check_error_productions()?;
        self.comma()
    }

    /// Error productions: a binary operator with no left operand at the
    /// start of an expression. The operator and its right operand are
    /// consumed so synchronization does not trip over them again.
    fn check_error_productions(&mut self) -> Result<(), ParseError> {
        use TokenKind::*;
        let classes: [(&[TokenKind], fn(&mut Self) -> Result<Expr, ParseError>); 4] = [
            (&[BangEqual, EqualEqual], Self::comparison),
            (&[Greater, GreaterEqual, Less, LessEqual], Self::addition),
            (&[Plus], Self::multiplication),
            (&[Slash, Star], Self::unary),
        ];
        for (operators, rhs) in classes {
            if operators.contains(&self.peek().kind) {
                let op = self.advance().clone();
                self.reporter
                    .error_at_token(&op, "Missing left hand operand");
                let _ = rhs(self)?;
                return Err(ParseError);
            }
        }
        Ok(())
    }

    fn comma(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.assignment()?;
        while self.match_kind(TokenKind::Comma) {
            let op = self.previous().clone();
            let right = self.assignment()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    /// Assignment parses its higher-precedence form first and, on `=`,
    /// reinterprets the left-hand side as a storage target.
    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.conditional()?;

        if self.match_kind(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);
            return Ok(match expr {
                Expr::Variable { name } => Expr::Assignment { name, value },
                Expr::Get { object, name } => Expr::Set {
                    object,
                    name,
                    value,
                },
                other => {
                    self.reporter
                        .error_at_token(&equals, "Invalid assignment target.");
                    other
                }
            });
        }

        Ok(expr)
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let expr = self.logic_or()?;
        if self.match_kind(TokenKind::Question) {
            let then_branch = self.expression()?;
            self.consume(
                TokenKind::Colon,
                "Expect ':' after then branch of conditional expression.",
            )?;
            let else_branch = self.conditional()?;
            return Ok(Expr::Conditional {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }
        Ok(expr)
    }

    fn logic_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.logic_and()?;
        while self.match_kind(TokenKind::Or) {
            let op = self.previous().clone();
            let right = self.logic_and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;
        while self.match_kind(TokenKind::And) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[TokenKind::BangEqual, TokenKind::EqualEqual],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::addition,
        )
    }

    fn addition(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[TokenKind::Minus, TokenKind::Plus], Self::multiplication)
    }

    fn multiplication(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[TokenKind::Slash, TokenKind::Star], Self::unary)
    }

    /// One left-associative binary precedence level; iteration instead of
    /// left recursion.
    fn binary_level(
        &mut self,
        operators: &[TokenKind],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut expr = next(self)?;
        while self.match_any(operators) {
            let op = self.previous().clone();
            let right = next(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_any(&[
            TokenKind::Bang,
            TokenKind::Minus,
            TokenKind::PlusPlus,
            TokenKind::MinusMinus,
        ]) {
            let op = self.previous().clone();
            let right = Box::new(self.unary()?);
            return Ok(Expr::Unary { op, right });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.call()?;
        while self.match_any(&[TokenKind::PlusPlus, TokenKind::MinusMinus]) {
            let op = self.previous().clone();
            expr = Expr::Postfix {
                left: Box::new(expr),
                op,
            };
        }
        Ok(expr)
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.match_kind(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(TokenKind::Dot) {
                let name =
                    self.consume(TokenKind::Identifier, "Expect property name after '.'.")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Arguments sit at assignment precedence, so a comma inside a call is
    /// always an argument separator and never the comma operator.
    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    let token = self.peek().clone();
                    self.reporter
                        .error_at_token(&token, "Can't have more than 255 arguments.");
                }
                args.push(self.assignment()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        })
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        if self.match_any(&[
            TokenKind::False,
            TokenKind::True,
            TokenKind::Nil,
            TokenKind::Number,
            TokenKind::String,
        ]) {
            return Ok(Expr::Literal {
                value: self.previous().literal.clone(),
            });
        }

        if self.match_kind(TokenKind::LeftParen) {
            let inner = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping {
                inner: Box::new(inner),
            });
        }

        if self.match_kind(TokenKind::This) {
            return Ok(Expr::This {
                keyword: self.previous().clone(),
            });
        }

        if self.match_kind(TokenKind::Super) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenKind::Identifier, "Expect superclass method name.")?;
            return Ok(Expr::Super { keyword, method });
        }

        if self.match_kind(TokenKind::Identifier) {
            return Ok(Expr::Variable {
                name: self.previous().clone(),
            });
        }

        if self.match_kind(TokenKind::Fun) {
            let function = self.function_body("function")?;
            return Ok(Expr::Function { function });
        }

        let token = self.peek().clone();
        Err(self.error(&token, "Expect expression."))
    }

    //
    // Token cursor helpers.
    //

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|t| t.kind == kind)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.contains(&self.peek().kind) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        let token = self.peek().clone();
        Err(self.error(&token, message))
    }

    fn error(&mut self, token: &Token, message: &str) -> ParseError {
        self.reporter.error_at_token(token, message);
        ParseError
    }

    /// Panic-mode recovery: discard tokens until just after a semicolon or
    /// just before a keyword that starts a statement.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn parse_source(source: &str) -> (Vec<Stmt>, ErrorReporter) {
        let mut reporter = ErrorReporter::new();
        let tokens = scan(source, &mut reporter);
        let program = parse(tokens, &mut reporter);
        (program, reporter)
    }

    fn parse_expression(source: &str) -> Expr {
        let (mut program, reporter) = parse_source(&format!("{source};"));
        assert!(!reporter.had_error(), "unexpected parse error in {source}");
        match program.remove(0) {
            Stmt::Expr { expr } => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let expr = parse_expression("1 + 2 * 3");
        match expr {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op.kind, TokenKind::Plus);
                assert!(matches!(*right, Expr::Binary { .. }));
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expression("a = b = 1");
        match expr {
            Expr::Assignment { name, value } => {
                assert_eq!(name.lexeme, "a");
                assert!(matches!(*value, Expr::Assignment { .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_dotted_assignment_becomes_set() {
        let expr = parse_expression("point.x = 3");
        assert!(matches!(expr, Expr::Set { .. }));
    }

    #[test]
    fn test_invalid_assignment_target_is_reported() {
        let (_, reporter) = parse_source("1 = 2;");
        assert!(reporter.had_error());
    }

    #[test]
    fn test_comma_operator_at_expression_level() {
        let expr = parse_expression("1, 2");
        match expr {
            Expr::Binary { op, .. } => assert_eq!(op.kind, TokenKind::Comma),
            other => panic!("expected comma binary, got {other:?}"),
        }
    }

    #[test]
    fn test_comma_in_call_separates_arguments() {
        let expr = parse_expression("f(1, 2)");
        match expr {
            Expr::Call { args, .. } => assert_eq!(args.len(), 2),
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_conditional_expression() {
        let expr = parse_expression("a ? 1 : 2");
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_postfix_increment() {
        let expr = parse_expression("i++");
        match expr {
            Expr::Postfix { op, .. } => assert_eq!(op.kind, TokenKind::PlusPlus),
            other => panic!("expected postfix, got {other:?}"),
        }
    }

    #[test]
    fn test_anonymous_function_expression() {
        let expr = parse_expression("fun (x) { return x; }");
        assert!(matches!(expr, Expr::Function { .. }));
    }

    #[test]
    fn test_fun_keyword_starts_declaration_when_named() {
        let (program, reporter) = parse_source("fun twice(x) { return x * 2; }");
        assert!(!reporter.had_error());
        assert!(matches!(program[0], Stmt::Function { .. }));
    }

    #[test]
    fn test_else_binds_to_nearest_if() {
        let (program, reporter) = parse_source("if (a) if (b) print 1; else print 2;");
        assert!(!reporter.had_error());
        match &program[0] {
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                assert!(else_branch.is_none());
                assert!(matches!(
                    **then_branch,
                    Stmt::If {
                        else_branch: Some(_),
                        ..
                    }
                ));
            }
            other => panic!("expected if statement, got {other:?}"),
        }
    }

    #[test]
    fn test_class_with_and_without_fun_keyword_on_methods() {
        let (program, reporter) =
            parse_source("class A { greet() { print 1; } fun wave() { print 2; } }");
        assert!(!reporter.had_error());
        match &program[0] {
            Stmt::Class { methods, .. } => assert_eq!(methods.len(), 2),
            other => panic!("expected class statement, got {other:?}"),
        }
    }

    #[test]
    fn test_class_with_superclass() {
        let (program, reporter) = parse_source("class B < A { }");
        assert!(!reporter.had_error());
        match &program[0] {
            Stmt::Class { superclass, .. } => assert!(superclass.is_some()),
            other => panic!("expected class statement, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_left_operand_error_production() {
        let (_, reporter) = parse_source("* 3;");
        assert!(reporter.had_error());
    }

    #[test]
    fn test_synchronize_recovers_following_statements() {
        let (program, reporter) = parse_source("var = 1; print 2;");
        assert!(reporter.had_error());
        // The bad declaration is dropped; the print statement survives.
        assert_eq!(program.len(), 1);
        assert!(matches!(program[0], Stmt::Print { .. }));
    }

    #[test]
    fn test_too_many_arguments_is_reported_but_parse_continues() {
        let args: Vec<String> = (0..=MAX_ARGS).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (program, reporter) = parse_source(&source);
        assert!(reporter.had_error());
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn test_for_statement_clauses_are_optional() {
        let (program, reporter) = parse_source("for (;;) print 1;");
        assert!(!reporter.had_error());
        match &program[0] {
            Stmt::For {
                initializer,
                condition,
                increment,
                ..
            } => {
                assert!(initializer.is_none());
                assert!(condition.is_none());
                assert!(increment.is_none());
            }
            other => panic!("expected for statement, got {other:?}"),
        }
    }
}
