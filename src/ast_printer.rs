// ABOUTME: Pretty printer rendering the AST back to canonical Boop source

use crate::ast::{Expr, FunctionExpr, Stmt};
use crate::token::Literal;

/// Render a whole program, one statement per line.
pub fn print_program(statements: &[Stmt]) -> String {
    statements
        .iter()
        .map(print_stmt)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render one statement on a single line. Parentheses appear exactly where
/// `Grouping` nodes sit, so re-parsing the output reproduces the tree.
pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expr { expr } => format!("{};", print_expr(expr)),
        Stmt::Print { expr } => format!("print {};", print_expr(expr)),
        Stmt::Block { statements } => {
            if statements.is_empty() {
                "{ }".to_string()
            } else {
                let inner = statements
                    .iter()
                    .map(print_stmt)
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{{ {inner} }}")
            }
        }
        Stmt::Var { name, initializer } => match initializer {
            Some(init) => format!("var {} = {};", name.lexeme, print_expr(init)),
            None => format!("var {};", name.lexeme),
        },
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut out = format!(
                "if ({}) {}",
                print_expr(condition),
                print_stmt(then_branch)
            );
            if let Some(else_branch) = else_branch {
                out.push_str(&format!(" else {}", print_stmt(else_branch)));
            }
            out
        }
        Stmt::While { condition, body } => {
            format!("while ({}) {}", print_expr(condition), print_stmt(body))
        }
        Stmt::For {
            initializer,
            condition,
            increment,
            body,
        } => {
            let init = match initializer {
                Some(stmt) => print_stmt(stmt),
                None => ";".to_string(),
            };
            let cond = match condition {
                Some(expr) => format!(" {}", print_expr(expr)),
                None => String::new(),
            };
            let incr = match increment {
                Some(expr) => format!(" {}", print_expr(expr)),
                None => String::new(),
            };
            format!("for ({init}{cond};{incr}) {}", print_stmt(body))
        }
        Stmt::Function { name, function } => {
            format!("fun {}{}", name.lexeme, print_function(function))
        }
        Stmt::Return { value, .. } => match value {
            Some(expr) => format!("return {};", print_expr(expr)),
            None => "return;".to_string(),
        },
        Stmt::Class {
            name,
            superclass,
            methods,
        } => {
            let mut out = format!("class {}", name.lexeme);
            if let Some(superclass) = superclass {
                out.push_str(&format!(" < {}", print_expr(superclass)));
            }
            out.push_str(" {");
            for method in methods {
                if let Stmt::Function { name, function } = method {
                    out.push_str(&format!(" {}{}", name.lexeme, print_function(function)));
                }
            }
            out.push_str(" }");
            out
        }
    }
}

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Binary { left, op, right } => {
            use crate::token::TokenKind;
            if op.kind == TokenKind::Comma {
                format!("{}, {}", print_expr(left), print_expr(right))
            } else {
                format!(
                    "{} {} {}",
                    print_expr(left),
                    op.lexeme,
                    print_expr(right)
                )
            }
        }
        Expr::Logical { left, op, right } => format!(
            "{} {} {}",
            print_expr(left),
            op.lexeme,
            print_expr(right)
        ),
        Expr::Unary { op, right } => {
            let rendered = print_expr(right);
            // `-` followed by a leading `-` would re-lex as `--`.
            if op.lexeme.ends_with('-') && rendered.starts_with('-') {
                format!("{} {rendered}", op.lexeme)
            } else {
                format!("{}{rendered}", op.lexeme)
            }
        }
        Expr::Postfix { left, op } => format!("{}{}", print_expr(left), op.lexeme),
        Expr::Grouping { inner } => format!("({})", print_expr(inner)),
        Expr::Literal { value } => print_literal(value),
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => format!(
            "{} ? {} : {}",
            print_expr(condition),
            print_expr(then_branch),
            print_expr(else_branch)
        ),
        Expr::Variable { name } => name.lexeme.clone(),
        Expr::Assignment { name, value } => {
            format!("{} = {}", name.lexeme, print_expr(value))
        }
        Expr::Call { callee, args, .. } => {
            let args = args.iter().map(print_expr).collect::<Vec<_>>().join(", ");
            format!("{}({args})", print_expr(callee))
        }
        Expr::Function { function } => format!("fun {}", print_function(function)),
        Expr::Get { object, name } => format!("{}.{}", print_expr(object), name.lexeme),
        Expr::Set {
            object,
            name,
            value,
        } => format!(
            "{}.{} = {}",
            print_expr(object),
            name.lexeme,
            print_expr(value)
        ),
        Expr::This { .. } => "this".to_string(),
        Expr::Super { method, .. } => format!("super.{}", method.lexeme),
    }
}

fn print_function(function: &FunctionExpr) -> String {
    let params = function
        .params
        .iter()
        .map(|p| p.lexeme.clone())
        .collect::<Vec<_>>()
        .join(", ");
    if function.body.is_empty() {
        format!("({params}) {{ }}")
    } else {
        let body = function
            .body
            .iter()
            .map(print_stmt)
            .collect::<Vec<_>>()
            .join(" ");
        format!("({params}) {{ {body} }}")
    }
}

/// Keyword literals are stored as string payloads indistinguishable from
/// quoted `"true"`, so both render bare; the evaluator coerces them the
/// same way.
fn print_literal(literal: &Option<Literal>) -> String {
    match literal {
        None => "nil".to_string(),
        Some(Literal::Number(n)) => {
            if n.fract() == 0.0 && n.is_finite() {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Some(Literal::Str(s)) => match s.as_str() {
            "true" | "false" | "nil" => s.clone(),
            _ => format!("\"{s}\""),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorReporter;
    use crate::parser::parse;
    use crate::scanner::scan;

    fn parse_clean(source: &str) -> Vec<Stmt> {
        let mut reporter = ErrorReporter::new();
        let tokens = scan(source, &mut reporter);
        let program = parse(tokens, &mut reporter);
        assert!(!reporter.had_error(), "parse error in: {source}");
        program
    }

    /// print(parse(src)) re-parses to a tree that prints identically.
    fn assert_round_trip(source: &str) {
        let first = print_program(&parse_clean(source));
        let second = print_program(&parse_clean(&first));
        assert_eq!(first, second, "printer round-trip diverged for: {source}");
    }

    #[test]
    fn test_grouping_is_preserved() {
        let program = parse_clean("(1 + 2) * 3;");
        assert_eq!(print_program(&program), "(1 + 2) * 3;");
        assert_round_trip("(1 + 2) * 3;");
    }

    #[test]
    fn test_statements_round_trip() {
        for source in [
            "print 1 + 2 * 3;",
            "var a = \"hi\";",
            "var empty;",
            "{ var x = 1; print x; }",
            "if (a) print 1; else print 2;",
            "while (true) { x = x + 1; }",
            "for (var j = 0; j < 5; j = j + 1) sum = sum + j;",
            "for (;;) print 1;",
            "fun f(n) { if (n <= 1) return 1; return n * f(n - 1); }",
            "var inc = fun (x) { return x + 1; };",
            "class A { greet() { print \"hi\"; } }",
            "class B < A { speak() { super.speak(); print \"B\"; } }",
            "p.x = p.x + 1;",
            "i++;",
            "--j;",
            "a ? b : c;",
            "x = 1, y = 2;",
            "print clock();",
            "return;",
        ] {
            assert_round_trip(source);
        }
    }

    #[test]
    fn test_negative_of_negative_does_not_merge() {
        assert_round_trip("- -x;");
        let program = parse_clean("- -x;");
        assert_eq!(print_program(&program), "- -x;");
    }

    #[test]
    fn test_keyword_literals_print_bare() {
        let program = parse_clean("print true;");
        assert_eq!(print_program(&program), "print true;");
    }

    #[test]
    fn test_strings_print_quoted() {
        let program = parse_clean("print \"boop\";");
        assert_eq!(print_program(&program), "print \"boop\";");
    }
}
