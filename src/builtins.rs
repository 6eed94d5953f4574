// ABOUTME: Native functions available to every Boop program

use crate::env::EnvironmentManager;
use crate::error::RuntimeError;
use crate::value::{Builtin, NativeFn, Value};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Define the standard natives in the current (global) environment. Called
/// once at evaluator construction.
pub fn register_builtins(env: &EnvironmentManager) {
    define_native(env, "clock", 0, clock);
}

/// Install a single native under `name`. The current environment becomes the
/// builtin's closure, mirroring how user functions capture their definition
/// scope.
pub fn define_native(env: &EnvironmentManager, name: &str, arity: usize, func: NativeFn) {
    let builtin = Builtin {
        name: name.to_string(),
        closure: env.current_env(),
        arity,
        func,
    };
    env.define(name, Value::Builtin(Rc::new(builtin)));
}

/// Wall-clock time in milliseconds as a Boop number.
fn clock(_args: &[Value]) -> Result<Value, RuntimeError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Ok(Value::Number(elapsed.as_millis() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenKind};

    #[test]
    fn test_clock_is_registered_with_arity_zero() {
        let env = EnvironmentManager::new(false);
        register_builtins(&env);
        let token = Token::new(TokenKind::Identifier, "clock", None, 1);
        match env.get(&token).unwrap() {
            Value::Builtin(builtin) => {
                assert_eq!(builtin.name, "clock");
                assert_eq!(builtin.arity, 0);
            }
            other => panic!("expected builtin, got {other:?}"),
        }
    }

    #[test]
    fn test_clock_returns_a_number() {
        let result = clock(&[]).unwrap();
        assert!(matches!(result, Value::Number(ms) if ms > 0.0));
    }
}
