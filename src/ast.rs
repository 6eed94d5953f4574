// ABOUTME: AST node definitions: closed sums over expression and statement variants

use crate::token::{Literal, Token};
use std::rc::Rc;

/// A function literal: parameter list plus body. Named function and method
/// declarations wrap one of these, as does the anonymous `fun (..) {..}`
/// expression form. It sits behind `Rc` so runtime function values can share
/// the node without owning the tree.
#[derive(Debug)]
pub struct FunctionExpr {
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// Expression nodes. Each child is exclusively owned by its parent; the AST
/// is a strict tree.
#[derive(Debug)]
pub enum Expr {
    Binary {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },
    Unary {
        op: Token,
        right: Box<Expr>,
    },
    /// `++`/`--` after an expression; valid only on variables at runtime.
    Postfix {
        left: Box<Expr>,
        op: Token,
    },
    Grouping {
        inner: Box<Expr>,
    },
    Literal {
        value: Option<Literal>,
    },
    /// Ternary `cond ? then : else`.
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Variable {
        name: Token,
    },
    Assignment {
        name: Token,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        /// Closing parenthesis, kept for error reporting at the call site.
        paren: Token,
        args: Vec<Expr>,
    },
    Function {
        function: Rc<FunctionExpr>,
    },
    Get {
        object: Box<Expr>,
        name: Token,
    },
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },
    This {
        keyword: Token,
    },
    Super {
        keyword: Token,
        method: Token,
    },
}

/// Statement nodes.
#[derive(Debug)]
pub enum Stmt {
    Expr {
        expr: Expr,
    },
    Print {
        expr: Expr,
    },
    Block {
        statements: Vec<Stmt>,
    },
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },
    Function {
        name: Token,
        function: Rc<FunctionExpr>,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Class {
        name: Token,
        /// A `Variable` expression naming the superclass, when present.
        superclass: Option<Expr>,
        /// `Function` statements, one per method.
        methods: Vec<Stmt>,
    },
}
