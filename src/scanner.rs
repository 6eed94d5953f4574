// ABOUTME: Lexer turning Boop source text into a token sequence using nom combinators

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{opt, recognize, value},
    IResult, Parser,
};

use crate::error::ErrorReporter;
use crate::token::{keyword_kind, Literal, Token, TokenKind};

/// Scan an entire source string into tokens. The returned sequence is always
/// terminated by an `Eof` token. Lexical errors are recorded through the
/// reporter and the offending input is skipped, so scanning always reaches
/// the end of the source.
pub fn scan(source: &str, reporter: &mut ErrorReporter) -> Vec<Token> {
    Scanner::new(source).scan_tokens(reporter)
}

struct Scanner<'src> {
    rest: &'src str,
    line: usize,
}

impl<'src> Scanner<'src> {
    fn new(source: &'src str) -> Self {
        Scanner { rest: source, line: 1 }
    }

    fn scan_tokens(mut self, reporter: &mut ErrorReporter) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            if self.rest.is_empty() {
                break;
            }
            match self.next_token(reporter) {
                Some(token) => tokens.push(token),
                None => continue,
            }
        }
        tokens.push(Token::new(TokenKind::Eof, "", None, self.line));
        tokens
    }

    /// Consume whitespace and `//` comments, tracking line numbers.
    fn skip_trivia(&mut self) {
        loop {
            let before = self.rest;
            if let Some(stripped) = self.rest.strip_prefix('\n') {
                self.line += 1;
                self.rest = stripped;
                continue;
            }
            if let Ok((rest, _)) = horizontal_space(self.rest) {
                self.rest = rest;
            }
            if let Ok((rest, _)) = line_comment(self.rest) {
                self.rest = rest;
            }
            if self.rest.len() == before.len() {
                break;
            }
        }
    }

    fn next_token(&mut self, reporter: &mut ErrorReporter) -> Option<Token> {
        let start = self.rest;
        let line = self.line;

        if let Ok((rest, kind)) = operator(start) {
            let lexeme = &start[..start.len() - rest.len()];
            self.rest = rest;
            return Some(Token::new(kind, lexeme, None, line));
        }

        if start.starts_with('"') {
            return self.string_token(reporter);
        }

        if let Ok((rest, lexeme)) = number(start) {
            self.rest = rest;
            let parsed: f64 = lexeme.parse().unwrap_or_default();
            return Some(Token::new(
                TokenKind::Number,
                lexeme,
                Some(Literal::Number(parsed)),
                line,
            ));
        }

        if let Ok((rest, lexeme)) = identifier(start) {
            self.rest = rest;
            return Some(match keyword_kind(lexeme) {
                // The keyword literals keep their lexeme as a literal so the
                // evaluator can coerce them to typed values.
                Some(kind @ (TokenKind::True | TokenKind::False | TokenKind::Nil)) => {
                    Token::new(kind, lexeme, Some(Literal::Str(lexeme.to_string())), line)
                }
                Some(kind) => Token::new(kind, lexeme, None, line),
                None => Token::new(TokenKind::Identifier, lexeme, None, line),
            });
        }

        // Nothing matched: report the character and skip it.
        let unexpected = start.chars().next().expect("non-empty input");
        reporter.error(line, format!("Unexpected character: {unexpected}"));
        self.rest = &start[unexpected.len_utf8()..];
        None
    }

    /// Strings are double-quoted with no escape sequences; the surrounding
    /// quotes are stripped from the literal. Multi-line strings are legal
    /// and advance the line counter.
    fn string_token(&mut self, reporter: &mut ErrorReporter) -> Option<Token> {
        let line = self.line;
        match string_literal(self.rest) {
            Ok((rest, content)) => {
                self.line += content.matches('\n').count();
                self.rest = rest;
                Some(Token::new(
                    TokenKind::String,
                    format!("\"{content}\""),
                    Some(Literal::Str(content.to_string())),
                    line,
                ))
            }
            Err(_) => {
                reporter.error(line, "Unterminated string.");
                self.line += self.rest.matches('\n').count();
                self.rest = "";
                None
            }
        }
    }
}

fn horizontal_space(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c == ' ' || c == '\t' || c == '\r').parse(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize((tag("//"), take_while(|c| c != '\n'))).parse(input)
}

/// Punctuation and operators, longest match first so `==` never lexes as
/// two `=` tokens.
fn operator(input: &str) -> IResult<&str, TokenKind> {
    alt((
        alt((
            value(TokenKind::BangEqual, tag("!=")),
            value(TokenKind::EqualEqual, tag("==")),
            value(TokenKind::GreaterEqual, tag(">=")),
            value(TokenKind::LessEqual, tag("<=")),
            value(TokenKind::PlusPlus, tag("++")),
            value(TokenKind::MinusMinus, tag("--")),
        )),
        alt((
            value(TokenKind::LeftParen, char('(')),
            value(TokenKind::RightParen, char(')')),
            value(TokenKind::LeftBrace, char('{')),
            value(TokenKind::RightBrace, char('}')),
            value(TokenKind::Comma, char(',')),
            value(TokenKind::Dot, char('.')),
            value(TokenKind::Semicolon, char(';')),
            value(TokenKind::Question, char('?')),
            value(TokenKind::Colon, char(':')),
            value(TokenKind::Slash, char('/')),
            value(TokenKind::Star, char('*')),
            value(TokenKind::Minus, char('-')),
            value(TokenKind::Plus, char('+')),
            value(TokenKind::Bang, char('!')),
            value(TokenKind::Equal, char('=')),
            value(TokenKind::Greater, char('>')),
            value(TokenKind::Less, char('<')),
        )),
    ))
    .parse(input)
}

/// Numbers are optionally fractional decimals: `123`, `3.14`. A trailing dot
/// is not part of the number, so `123.` lexes as a number then a dot.
fn number(input: &str) -> IResult<&str, &str> {
    recognize((digit1, opt((char('.'), digit1)))).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize((
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    let (input, _) = char('"').parse(input)?;
    let (input, content) = take_while(|c| c != '"').parse(input)?;
    let (input, _) = char('"').parse(input)?;
    Ok((input, content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut reporter = ErrorReporter::new();
        scan(source, &mut reporter).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_source_yields_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("== = ++ + <= <"),
            vec![
                TokenKind::EqualEqual,
                TokenKind::Equal,
                TokenKind::PlusPlus,
                TokenKind::Plus,
                TokenKind::LessEqual,
                TokenKind::Less,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_literal_parses_as_f64() {
        let mut reporter = ErrorReporter::new();
        let tokens = scan("3.14", &mut reporter);
        assert_eq!(tokens[0].literal, Some(Literal::Number(3.14)));
    }

    #[test]
    fn test_trailing_dot_is_not_part_of_number() {
        assert_eq!(
            kinds("123.abs"),
            vec![
                TokenKind::Number,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_quotes_are_stripped() {
        let mut reporter = ErrorReporter::new();
        let tokens = scan("\"hi there\"", &mut reporter);
        assert_eq!(tokens[0].literal, Some(Literal::Str("hi there".to_string())));
        assert_eq!(tokens[0].lexeme, "\"hi there\"");
    }

    #[test]
    fn test_unterminated_string_is_reported() {
        let mut reporter = ErrorReporter::new();
        let tokens = scan("\"oops", &mut reporter);
        assert!(reporter.had_error());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("var variable while whilst"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::While,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_literals_carry_lexeme() {
        let mut reporter = ErrorReporter::new();
        let tokens = scan("true", &mut reporter);
        assert_eq!(tokens[0].literal, Some(Literal::Str("true".to_string())));
    }

    #[test]
    fn test_comments_and_lines() {
        let mut reporter = ErrorReporter::new();
        let tokens = scan("// header\nvar x; // trailing\nprint x;", &mut reporter);
        assert_eq!(tokens[0].kind, TokenKind::Var);
        assert_eq!(tokens[0].line, 2);
        let print = tokens.iter().find(|t| t.kind == TokenKind::Print).unwrap();
        assert_eq!(print.line, 3);
    }

    #[test]
    fn test_unexpected_character_is_skipped() {
        let mut reporter = ErrorReporter::new();
        let tokens = scan("var @ x;", &mut reporter);
        assert!(reporter.had_error());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }
}
