// ABOUTME: Environment chain and the manager that tracks the current scope

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One lexical scope: a binding map plus a parent pointer. The chain forms a
/// tree rooted at the single global environment; every non-global scope has
/// exactly one parent. Scopes are shared (`Rc`) because function values
/// capture the scope active at their definition site and keep it alive past
/// the scope's syntactic exit.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// The root scope with no parent.
    pub fn global() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// A child scope nested inside `parent`.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Insert into THIS scope unconditionally, shadowing any outer binding
    /// of the same name. Defining never fails.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Overwrite the nearest existing binding, walking outward. Assignment
    /// never creates a binding; returns false when the name is unseen all
    /// the way to the global scope.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    /// Look up a name, walking outward; the first hit wins. Lookup never
    /// modifies the chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    pub fn parent(&self) -> Option<Rc<Environment>> {
        self.parent.clone()
    }

    pub fn is_global(&self) -> bool {
        self.parent.is_none()
    }
}

/// Owns the "current environment" pointer on behalf of the evaluator and
/// translates raw chain operations into runtime errors carrying source
/// positions.
#[derive(Debug)]
pub struct EnvironmentManager {
    current: Rc<Environment>,
    strict_uninitialized: bool,
}

impl EnvironmentManager {
    pub fn new(strict_uninitialized: bool) -> Self {
        EnvironmentManager {
            current: Environment::global(),
            strict_uninitialized,
        }
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.current.define(name, value);
    }

    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if self.current.assign(&name.lexeme, value) {
            Ok(())
        } else {
            Err(RuntimeError::new(
                name,
                "Can't assign to an undefined variable.",
            ))
        }
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        match self.current.get(&name.lexeme) {
            // A nil placeholder is indistinguishable from `var x = nil;`,
            // so strict mode rejects reading either.
            Some(Value::Nil) if self.strict_uninitialized => Err(RuntimeError::new(
                name,
                "Attempted to access an uninitialized variable.",
            )),
            Some(value) => Ok(value),
            None => Err(RuntimeError::new(
                name,
                "Attempted to access an undefined variable.",
            )),
        }
    }

    /// Push a fresh child of the current scope.
    pub fn create_new_env(&mut self) {
        self.current = Environment::with_parent(Rc::clone(&self.current));
    }

    /// Handle to the current scope, used to snapshot closures and to mark
    /// restore points for scoped teardown.
    pub fn current_env(&self) -> Rc<Environment> {
        Rc::clone(&self.current)
    }

    pub fn set_current_env(&mut self, env: Rc<Environment>) {
        self.current = env;
    }

    /// Pop scopes until `target` is current again (or the global scope is
    /// reached). Used to unwind block and call frames on every exit path.
    pub fn discard_envs_till(&mut self, target: &Rc<Environment>) {
        while !self.current.is_global() && !Rc::ptr_eq(&self.current, target) {
            let parent = self
                .current
                .parent()
                .expect("non-global environment has a parent");
            self.current = parent;
        }
    }
}
