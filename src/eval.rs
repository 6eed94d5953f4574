// ABOUTME: Tree-walking evaluator: expression and statement semantics, call protocol

use crate::ast::{Expr, Stmt};
use crate::builtins::register_builtins;
use crate::config::InterpreterOptions;
use crate::env::{Environment, EnvironmentManager};
use crate::error::{ErrorReporter, RuntimeError};
use crate::token::{Literal, Token, TokenKind};
use crate::value::{Class, Function, Instance, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Recovered runtime errors allowed across a program before the evaluator
/// gives up on the remaining statements.
pub const MAX_RUNTIME_ERRORS: usize = 20;

pub struct Evaluator {
    env: EnvironmentManager,
    runtime_error_count: usize,
}

impl Evaluator {
    pub fn new(options: &InterpreterOptions) -> Self {
        let env = EnvironmentManager::new(options.strict_uninitialized);
        register_builtins(&env);
        Evaluator {
            env,
            runtime_error_count: 0,
        }
    }

    /// Drive a whole program. Each top-level statement is guarded: a runtime
    /// error is reported and counted, and evaluation continues with the next
    /// statement until too many have accumulated. A value surfacing at
    /// the top level (a stray `return`) ends execution.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut ErrorReporter) {
        self.runtime_error_count = 0;
        for stmt in statements {
            match self.eval_stmt(stmt) {
                Ok(None) => {}
                Ok(Some(_)) => break,
                Err(error) => {
                    reporter.runtime_error(&error);
                    self.runtime_error_count += 1;
                    if self.runtime_error_count > MAX_RUNTIME_ERRORS {
                        eprintln!("Too many errors occurred. Exiting evaluation.");
                        break;
                    }
                }
            }
        }
    }

    /// Evaluate statements in order, short-circuiting on the first surfaced
    /// `return` value.
    pub fn eval_stmts(&mut self, statements: &[Stmt]) -> Result<Option<Value>, RuntimeError> {
        for stmt in statements {
            if let Some(value) = self.eval_stmt(stmt)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Evaluate one statement. `Some(value)` means a `return` surfaced from
    /// within and is unwinding toward the call site; errors travel on the
    /// `Err` channel only.
    pub fn eval_stmt(&mut self, stmt: &Stmt) -> Result<Option<Value>, RuntimeError> {
        match stmt {
            Stmt::Expr { expr } => {
                self.eval_expr(expr)?;
                Ok(None)
            }
            Stmt::Print { expr } => {
                let value = self.eval_expr(expr)?;
                println!("> {value}");
                Ok(None)
            }
            Stmt::Block { statements } => {
                let restore = self.env.current_env();
                self.env.create_new_env();
                let result = self.eval_stmts(statements);
                // Teardown runs on the error path too, so a failing block
                // never corrupts the chain.
                self.env.discard_envs_till(&restore);
                result
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                self.env.define(name.lexeme.clone(), value);
                Ok(None)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.eval_stmt(else_branch)
                } else {
                    Ok(None)
                }
            }
            Stmt::While { condition, body } => {
                let mut result = None;
                while result.is_none() && self.eval_expr(condition)?.is_truthy() {
                    result = self.eval_stmt(body)?;
                }
                Ok(result)
            }
            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let restore = self.env.current_env();
                self.env.create_new_env();
                let result = self.eval_for(initializer, condition, increment, body);
                self.env.discard_envs_till(&restore);
                result
            }
            Stmt::Function { name, function } => {
                let closure = self.env.current_env();
                let value = Function {
                    name: name.lexeme.clone(),
                    declaration: Rc::clone(function),
                    closure,
                    is_method: false,
                    is_initializer: false,
                };
                self.env.define(name.lexeme.clone(), Value::Function(Rc::new(value)));
                // Definitions later in the same scope must stay invisible to
                // the closure we just captured.
                self.env.create_new_env();
                Ok(None)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                Ok(Some(value))
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.eval_class_stmt(name, superclass, methods),
        }
    }

    fn eval_for(
        &mut self,
        initializer: &Option<Box<Stmt>>,
        condition: &Option<Expr>,
        increment: &Option<Expr>,
        body: &Stmt,
    ) -> Result<Option<Value>, RuntimeError> {
        if let Some(init) = initializer {
            self.eval_stmt(init)?;
        }
        let mut result = None;
        loop {
            if let Some(condition) = condition {
                if !self.eval_expr(condition)?.is_truthy() {
                    break;
                }
            }
            result = self.eval_stmt(body)?;
            if result.is_some() {
                break;
            }
            if let Some(increment) = increment {
                self.eval_expr(increment)?;
            }
        }
        Ok(result)
    }

    fn eval_class_stmt(
        &mut self,
        name: &Token,
        superclass: &Option<Expr>,
        methods: &[Stmt],
    ) -> Result<Option<Value>, RuntimeError> {
        // Pre-declare the name so methods can close over it; the real class
        // value replaces the placeholder below.
        self.env.define(name.lexeme.clone(), Value::Nil);

        let superclass = match superclass {
            Some(expr) => match self.eval_expr(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::new(
                        name,
                        "Superclass must be a class; Can't inherit from non-class",
                    ))
                }
            },
            None => None,
        };

        // Methods of a subclass capture a scope where `super` names the
        // superclass.
        if let Some(superclass) = &superclass {
            self.env.create_new_env();
            self.env.define("super", Value::Class(Rc::clone(superclass)));
        }

        let closure = self.env.current_env();
        let mut method_map = HashMap::new();
        for method in methods {
            if let Stmt::Function {
                name: method_name,
                function,
            } = method
            {
                let is_initializer = method_name.lexeme == "init";
                let value = Function {
                    name: method_name.lexeme.clone(),
                    declaration: Rc::clone(function),
                    closure: Rc::clone(&closure),
                    is_method: true,
                    is_initializer,
                };
                method_map.insert(method_name.lexeme.clone(), Value::Function(Rc::new(value)));
            }
        }

        if superclass.is_some() {
            if let Some(parent) = self.env.current_env().parent() {
                self.env.set_current_env(parent);
            }
        }

        let class = Class {
            name: name.lexeme.clone(),
            superclass,
            methods: method_map,
        };
        self.env.assign(name, Value::Class(Rc::new(class)))?;
        // As with function declarations, later same-scope definitions stay
        // invisible to the method closures.
        self.env.create_new_env();
        Ok(None)
    }

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal { value } => Ok(value_from_literal(value)),
            Expr::Grouping { inner } => self.eval_expr(inner),
            Expr::Unary { op, right } => self.eval_unary_expr(op, right),
            Expr::Postfix { left, op } => self.eval_postfix_expr(left, op),
            Expr::Binary { left, op, right } => self.eval_binary_expr(left, op, right),
            Expr::Logical { left, op, right } => self.eval_logical_expr(left, op, right),
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_expr(then_branch)
                } else {
                    self.eval_expr(else_branch)
                }
            }
            Expr::Variable { name } => self.env.get(name),
            Expr::Assignment { name, value } => {
                let value = self.eval_expr(value)?;
                self.env.assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                args,
            } => self.eval_call_expr(callee, paren, args),
            Expr::Function { function } => {
                let closure = self.env.current_env();
                let value = Function {
                    name: "anonymous".to_string(),
                    declaration: Rc::clone(function),
                    closure,
                    is_method: false,
                    is_initializer: false,
                };
                self.env.create_new_env();
                Ok(Value::Function(Rc::new(value)))
            }
            Expr::Get { object, name } => self.eval_get_expr(object, name),
            Expr::Set {
                object,
                name,
                value,
            } => self.eval_set_expr(object, name, value),
            Expr::This { keyword } => self.env.get(keyword),
            Expr::Super { keyword, method } => self.eval_super_expr(keyword, method),
        }
    }

    fn eval_unary_expr(&mut self, op: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let right = self.eval_expr(right)?;
        match op.kind {
            TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
            TokenKind::Minus => Ok(Value::Number(-self.check_number(op, &right)?)),
            TokenKind::PlusPlus => Ok(Value::Number(self.check_number(op, &right)? + 1.0)),
            TokenKind::MinusMinus => Ok(Value::Number(self.check_number(op, &right)? - 1.0)),
            _ => Err(RuntimeError::new(
                op,
                format!("Illegal unary expression: {}{right}", op.lexeme),
            )),
        }
    }

    /// Postfix `++`/`--` yields the old value and writes back old ± 1. Only
    /// a plain variable is a valid target.
    fn eval_postfix_expr(&mut self, left: &Expr, op: &Token) -> Result<Value, RuntimeError> {
        let old = self.eval_expr(left)?;
        match left {
            Expr::Variable { name } => {
                let n = self.check_number(op, &old)?;
                let stepped = match op.kind {
                    TokenKind::PlusPlus => n + 1.0,
                    _ => n - 1.0,
                };
                self.env.assign(name, Value::Number(stepped))?;
                Ok(old)
            }
            _ => Err(RuntimeError::new(
                op,
                "Operand of a postfix expression must be a variable.",
            )),
        }
    }

    fn eval_binary_expr(
        &mut self,
        left: &Expr,
        op: &Token,
        right: &Expr,
    ) -> Result<Value, RuntimeError> {
        let left = self.eval_expr(left)?;
        let right = self.eval_expr(right)?;
        match op.kind {
            // The comma operator evaluates the left operand for its side
            // effects and yields the right one.
            TokenKind::Comma => Ok(right),
            TokenKind::BangEqual => Ok(Value::Bool(!left.is_equal(&right))),
            TokenKind::EqualEqual => Ok(Value::Bool(left.is_equal(&right))),
            TokenKind::Minus => Ok(Value::Number(
                self.check_number(op, &left)? - self.check_number(op, &right)?,
            )),
            TokenKind::Star => Ok(Value::Number(
                self.check_number(op, &left)? * self.check_number(op, &right)?,
            )),
            TokenKind::Slash => {
                let denominator = self.check_number(op, &right)?;
                if denominator == 0.0 {
                    return Err(RuntimeError::new(op, "Division by zero is illegal"));
                }
                Ok(Value::Number(self.check_number(op, &left)? / denominator))
            }
            TokenKind::Less => Ok(Value::Bool(
                self.check_number(op, &left)? < self.check_number(op, &right)?,
            )),
            TokenKind::LessEqual => Ok(Value::Bool(
                self.check_number(op, &left)? <= self.check_number(op, &right)?,
            )),
            TokenKind::Greater => Ok(Value::Bool(
                self.check_number(op, &left)? > self.check_number(op, &right)?,
            )),
            TokenKind::GreaterEqual => Ok(Value::Bool(
                self.check_number(op, &left)? >= self.check_number(op, &right)?,
            )),
            TokenKind::Plus => match (&left, &right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                _ if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) => {
                    Ok(Value::Str(format!("{left}{right}")))
                }
                _ => Err(RuntimeError::new(
                    op,
                    format!(
                        "Operands to 'plus' must be numbers or strings; This is invalid: {left} + {right}"
                    ),
                )),
            },
            _ => Err(RuntimeError::new(
                op,
                format!(
                    "Attempted to apply invalid operator to binary expr: {}",
                    op.lexeme
                ),
            )),
        }
    }

    fn eval_logical_expr(
        &mut self,
        left: &Expr,
        op: &Token,
        right: &Expr,
    ) -> Result<Value, RuntimeError> {
        let left = self.eval_expr(left)?;
        match op.kind {
            TokenKind::Or if left.is_truthy() => Ok(left),
            TokenKind::And if !left.is_truthy() => Ok(left),
            TokenKind::Or | TokenKind::And => self.eval_expr(right),
            _ => Err(RuntimeError::new(
                op,
                format!("Illegal logical operator: {}", op.lexeme),
            )),
        }
    }

    /// The call protocol. Builtins dispatch immediately; calling a class
    /// constructs an instance and runs its `init` if it has one; anything
    /// else must be a function value.
    fn eval_call_expr(
        &mut self,
        callee: &Expr,
        paren: &Token,
        args: &[Expr],
    ) -> Result<Value, RuntimeError> {
        let callee = self.eval_expr(callee)?;

        match callee {
            Value::Builtin(builtin) => {
                if builtin.arity != args.len() {
                    return Err(RuntimeError::new(
                        paren,
                        format!(
                            "Expected {} arguments. Got {} arguments.",
                            builtin.arity,
                            args.len()
                        ),
                    ));
                }
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval_expr(arg)?);
                }
                (builtin.func)(&evaluated)
            }
            Value::Class(class) => {
                let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));
                match class.find_method("init") {
                    Some(Value::Function(init)) => {
                        let bound = bind_method(&init, Rc::clone(&instance));
                        self.invoke(&bound, paren, args, Some(Value::Instance(instance)))
                    }
                    // No initializer: construction is already complete.
                    _ => Ok(Value::Instance(instance)),
                }
            }
            Value::Function(function) => self.invoke(&function, paren, args, None),
            _ => Err(RuntimeError::new(
                paren,
                "Attempted to invoke a non-function",
            )),
        }
    }

    /// Execute a function body in a fresh frame on top of its closure.
    /// `construction` carries the instance when this call is a class
    /// construction running `init`.
    fn invoke(
        &mut self,
        function: &Rc<Function>,
        paren: &Token,
        args: &[Expr],
        construction: Option<Value>,
    ) -> Result<Value, RuntimeError> {
        if function.arity() != args.len() {
            return Err(RuntimeError::new(
                paren,
                format!(
                    "Expected {} arguments. Got {} arguments.",
                    function.arity(),
                    args.len()
                ),
            ));
        }

        // Arguments are evaluated in the caller's environment, left to
        // right, before any context switch.
        let mut evaluated = Vec::with_capacity(args.len());
        for arg in args {
            evaluated.push(self.eval_expr(arg)?);
        }

        let caller_env = self.env.current_env();
        self.env.set_current_env(Rc::clone(&function.closure));
        self.env.create_new_env();
        for (param, arg) in function.declaration.params.iter().zip(evaluated) {
            self.env.define(param.lexeme.clone(), arg);
        }

        let result = self.eval_stmts(&function.declaration.body);

        // Unwind everything the call created before looking at the result,
        // so the caller's environment is restored on the error path too.
        // Methods also discard the frame binding `this`.
        if function.is_method {
            if let Some(parent) = function.closure.parent() {
                self.env.discard_envs_till(&parent);
            }
        } else {
            self.env.discard_envs_till(&function.closure);
        }
        self.env.set_current_env(caller_env);

        if let Some(value) = result? {
            if !function.is_initializer {
                return Ok(value);
            }
            if !matches!(value, Value::Nil) {
                return Err(RuntimeError::new(
                    paren,
                    "Initializer can't return a value other than 'this'",
                ));
            }
        }
        // No surfaced value (or an initializer's bare return): construction
        // yields the instance, an ordinary call yields nil.
        Ok(construction.unwrap_or(Value::Nil))
    }

    fn eval_get_expr(&mut self, object: &Expr, name: &Token) -> Result<Value, RuntimeError> {
        let object = self.eval_expr(object)?;
        let Value::Instance(instance) = &object else {
            return Err(RuntimeError::new(name, "Only instances have properties"));
        };

        if let Some(field) = instance.borrow().get_field(&name.lexeme) {
            return Ok(field);
        }
        if let Some(method) = instance.borrow().class.find_method(&name.lexeme) {
            // A method looked up through an instance is returned with
            // `this` already bound to that instance.
            if let Value::Function(function) = &method {
                return Ok(Value::Function(bind_method(function, Rc::clone(instance))));
            }
            return Ok(method);
        }

        Err(RuntimeError::new(
            name,
            format!(
                "Attempted to access undefined property: {} on {object}",
                name.lexeme
            ),
        ))
    }

    fn eval_set_expr(
        &mut self,
        object: &Expr,
        name: &Token,
        value: &Expr,
    ) -> Result<Value, RuntimeError> {
        let object = self.eval_expr(object)?;
        let Value::Instance(instance) = object else {
            return Err(RuntimeError::new(name, "Only instances have fields."));
        };
        let value = self.eval_expr(value)?;
        instance
            .borrow_mut()
            .set_field(name.lexeme.clone(), value.clone());
        Ok(value)
    }

    fn eval_super_expr(&mut self, keyword: &Token, method: &Token) -> Result<Value, RuntimeError> {
        let Value::Class(superclass) = self.env.get(keyword)? else {
            return Err(RuntimeError::new(keyword, "'super' is not bound to a class."));
        };
        let Some(resolved) = superclass.find_method(&method.lexeme) else {
            return Err(RuntimeError::new(
                keyword,
                format!(
                    "Attempted to access undefined property {} on super.",
                    method.lexeme
                ),
            ));
        };

        let this_token = Token::synthetic(TokenKind::This, "this");
        let Value::Instance(instance) = self.env.get(&this_token)? else {
            return Err(RuntimeError::new(keyword, "'this' is not bound to an instance."));
        };
        match &resolved {
            Value::Function(function) => Ok(Value::Function(bind_method(function, instance))),
            _ => Ok(resolved),
        }
    }

    fn check_number(&self, op: &Token, value: &Value) -> Result<f64, RuntimeError> {
        match value {
            Value::Number(n) => Ok(*n),
            other => Err(RuntimeError::new(
                op,
                format!("Attempted to perform arithmetic operation on non-numeric literal {other}"),
            )),
        }
    }
}

/// Produce a new function whose closure is a fresh child of the method's
/// closure with `this` bound to the receiver. The original method value is
/// untouched; this is the only mechanism that makes `this` visible inside a
/// method body.
fn bind_method(method: &Rc<Function>, instance: Rc<RefCell<Instance>>) -> Rc<Function> {
    let bound_closure = Environment::with_parent(Rc::clone(&method.closure));
    bound_closure.define("this", Value::Instance(instance));
    Rc::new(Function {
        name: method.name.clone(),
        declaration: Rc::clone(&method.declaration),
        closure: bound_closure,
        is_method: method.is_method,
        is_initializer: method.is_initializer,
    })
}

/// Literal tokens keep `true`/`false`/`nil` as string payloads; coerce them
/// to their typed values here.
fn value_from_literal(literal: &Option<Literal>) -> Value {
    match literal {
        None => Value::Nil,
        Some(Literal::Number(n)) => Value::Number(*n),
        Some(Literal::Str(s)) => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "nil" => Value::Nil,
            _ => Value::Str(s.clone()),
        },
    }
}
