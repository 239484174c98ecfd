// Lexer for PCL .pcl source files.
//
// Tokenizes component source: keywords, plain and qualified identifiers,
// literals, the arrow operator family and punctuation. Uses the `logos`
// crate for DFA-based lexing.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters produce `LexError`; lexing continues
//   one character later. Integer literals outside the i64 range are
//   reported as such and skipped whole.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Why logos rejected a slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LexErrorKind {
    #[default]
    IllegalCharacter,
    IntegerOutOfRange,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// PCL token types.
///
/// Keywords and operators are matched as fixed strings. Literals carry
/// parsed values. Identifiers carry no value; use the span to retrieve
/// the text from the source.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+|#[^\n]*")]
#[logos(error = LexErrorKind)]
pub enum Token {
    // ── Keywords ──
    #[token("component")]
    Component,
    #[token("inputs")]
    #[token("input")]
    Inputs,
    #[token("outputs")]
    #[token("output")]
    Outputs,
    #[token("configuration")]
    Configuration,
    #[token("declare")]
    Declare,
    #[token("new")]
    New,
    #[token("with")]
    With,
    #[token("as")]
    As,
    #[token("import")]
    Import,
    #[token("wire")]
    Wire,
    #[token("merge")]
    Merge,
    #[token("split")]
    Split,
    #[token("first")]
    First,
    #[token("second")]
    Second,
    #[token("top")]
    Top,
    #[token("bottom")]
    Bottom,
    #[token("do")]
    Do,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("endif")]
    EndIf,
    #[token("let")]
    Let,
    #[token("in")]
    In,
    #[token("return")]
    Return,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("xor")]
    Xor,

    // ── Operators ──
    #[token(":=")]
    Assign,
    #[token("->")]
    MapsTo,
    #[token("<-")]
    LeftArrow,
    #[token(">>>")]
    Composition,
    #[token("***")]
    ParallelTuple,
    #[token("&&&")]
    ParallelScalar,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token(">=")]
    GtEq,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token("<")]
    Lt,

    // ── Punctuation ──
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("@")]
    At,

    // ── Literals ──
    //
    // Booleans are case-insensitive and must outrank the identifier regex,
    // which matches the same text.
    #[regex(r"[Tt][Rr][Uu][Ee]", |_| true, priority = 10)]
    #[regex(r"[Ff][Aa][Ll][Ss][Ee]", |_| false, priority = 10)]
    Boolean(bool),

    /// Float literal with optional sign and exponent (e.g. `-1.5e3`).
    #[regex(r"-?[0-9]+\.[0-9]+([eE][-+]?[0-9]+)?", parse_float)]
    Float(f64),

    /// Integer literal with optional sign.
    #[regex(r"-?[0-9]+", parse_integer)]
    Integer(i64),

    /// String literal with backslash escapes.
    #[regex(r#""([^"\\]|\\.)*""#, parse_string)]
    StringLit(String),

    // ── Identifiers ──
    /// Dotted path: `a.b`, `pkg.module.name`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)+")]
    QualIdent,

    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_]*`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Component => write!(f, "component"),
            Token::Inputs => write!(f, "inputs"),
            Token::Outputs => write!(f, "outputs"),
            Token::Configuration => write!(f, "configuration"),
            Token::Declare => write!(f, "declare"),
            Token::New => write!(f, "new"),
            Token::With => write!(f, "with"),
            Token::As => write!(f, "as"),
            Token::Import => write!(f, "import"),
            Token::Wire => write!(f, "wire"),
            Token::Merge => write!(f, "merge"),
            Token::Split => write!(f, "split"),
            Token::First => write!(f, "first"),
            Token::Second => write!(f, "second"),
            Token::Top => write!(f, "top"),
            Token::Bottom => write!(f, "bottom"),
            Token::Do => write!(f, "do"),
            Token::If => write!(f, "if"),
            Token::Then => write!(f, "then"),
            Token::Else => write!(f, "else"),
            Token::EndIf => write!(f, "endif"),
            Token::Let => write!(f, "let"),
            Token::In => write!(f, "in"),
            Token::Return => write!(f, "return"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Xor => write!(f, "xor"),
            Token::Assign => write!(f, ":="),
            Token::MapsTo => write!(f, "->"),
            Token::LeftArrow => write!(f, "<-"),
            Token::Composition => write!(f, ">>>"),
            Token::ParallelTuple => write!(f, "***"),
            Token::ParallelScalar => write!(f, "&&&"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::GtEq => write!(f, ">="),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Lt => write!(f, "<"),
            Token::Comma => write!(f, ","),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::At => write!(f, "@"),
            Token::Boolean(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Token::Float(v) => write!(f, "{v}"),
            Token::Integer(v) => write!(f, "{v}"),
            Token::StringLit(s) => write!(f, "\"{s}\""),
            Token::QualIdent => write!(f, "<qualified identifier>"),
            Token::Ident => write!(f, "<identifier>"),
        }
    }
}

// ── Callbacks ──

fn parse_float(lex: &mut logos::Lexer<'_, Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

fn parse_integer(lex: &mut logos::Lexer<'_, Token>) -> Result<i64, LexErrorKind> {
    lex.slice()
        .parse()
        .map_err(|_| LexErrorKind::IntegerOutOfRange)
}

fn parse_string(lex: &mut logos::Lexer<'_, Token>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1]; // strip quotes
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => result.push('\n'),
                't' => result.push('\t'),
                'r' => result.push('\r'),
                other => result.push(other),
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

// ── Public API ──

/// Lex a PCL source string into tokens.
///
/// Returns all successfully lexed tokens together with any errors for
/// unrecognised characters. Lexing is non-fatal: errors are collected and
/// the lexer continues past bad characters.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(LexErrorKind::IntegerOutOfRange) => errors.push(LexError {
                span,
                message: format!(
                    "integer literal {} out of range",
                    &source[span.start..span.end]
                ),
            }),
            Err(LexErrorKind::IllegalCharacter) => {
                let bad = source[span.start..].chars().next().unwrap_or('?');
                errors.push(LexError {
                    span,
                    message: format!("illegal character [{}]", bad),
                });
            }
        }
    }

    LexResult { tokens, errors }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: lex and assert no errors, return token list.
    fn lex_ok(source: &str) -> Vec<Token> {
        let result = lex(source);
        assert!(
            result.errors.is_empty(),
            "unexpected lex errors: {:?}",
            result.errors
        );
        result.tokens.into_iter().map(|(t, _)| t).collect()
    }

    /// Helper: lex and return (tokens, errors).
    fn lex_all(source: &str) -> (Vec<Token>, Vec<LexError>) {
        let result = lex(source);
        let tokens = result.tokens.into_iter().map(|(t, _)| t).collect();
        (tokens, result.errors)
    }

    // ── Keywords ──

    #[test]
    fn header_keywords() {
        let tokens = lex_ok("component inputs outputs configuration declare new with as import");
        assert_eq!(
            tokens,
            vec![
                Token::Component,
                Token::Inputs,
                Token::Outputs,
                Token::Configuration,
                Token::Declare,
                Token::New,
                Token::With,
                Token::As,
                Token::Import,
            ]
        );
    }

    #[test]
    fn singular_aliases() {
        let tokens = lex_ok("input output");
        assert_eq!(tokens, vec![Token::Inputs, Token::Outputs]);
    }

    #[test]
    fn combinator_keywords() {
        let tokens = lex_ok("wire merge split first second top bottom");
        assert_eq!(
            tokens,
            vec![
                Token::Wire,
                Token::Merge,
                Token::Split,
                Token::First,
                Token::Second,
                Token::Top,
                Token::Bottom,
            ]
        );
    }

    #[test]
    fn do_block_keywords() {
        let tokens = lex_ok("do if then else endif let in return and or xor");
        assert_eq!(
            tokens,
            vec![
                Token::Do,
                Token::If,
                Token::Then,
                Token::Else,
                Token::EndIf,
                Token::Let,
                Token::In,
                Token::Return,
                Token::And,
                Token::Or,
                Token::Xor,
            ]
        );
    }

    #[test]
    fn keywords_are_case_sensitive() {
        let tokens = lex_ok("Component IF");
        assert_eq!(tokens, vec![Token::Ident, Token::Ident]);
    }

    #[test]
    fn keyword_prefix_is_ident() {
        // `splitter` is an identifier, not keyword `split` + `ter`
        let tokens = lex_ok("split splitter inputs_x");
        assert_eq!(tokens, vec![Token::Split, Token::Ident, Token::Ident]);
    }

    // ── Operators ──

    #[test]
    fn arrow_operators() {
        let tokens = lex_ok(":= -> <- >>> *** &&&");
        assert_eq!(
            tokens,
            vec![
                Token::Assign,
                Token::MapsTo,
                Token::LeftArrow,
                Token::Composition,
                Token::ParallelTuple,
                Token::ParallelScalar,
            ]
        );
    }

    #[test]
    fn comparison_operators() {
        let tokens = lex_ok("== != > < >= <=");
        assert_eq!(
            tokens,
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::Gt,
                Token::Lt,
                Token::GtEq,
                Token::LtEq,
            ]
        );
    }

    #[test]
    fn punctuation() {
        let tokens = lex_ok(", ( ) [ ] @");
        assert_eq!(
            tokens,
            vec![
                Token::Comma,
                Token::LParen,
                Token::RParen,
                Token::LBracket,
                Token::RBracket,
                Token::At,
            ]
        );
    }

    // ── Literals ──

    #[test]
    fn numbers() {
        let tokens = lex_ok("42 -7 3.25 -0.5 1.0e3 2.5E-2");
        assert_eq!(
            tokens,
            vec![
                Token::Integer(42),
                Token::Integer(-7),
                Token::Float(3.25),
                Token::Float(-0.5),
                Token::Float(1000.0),
                Token::Float(0.025),
            ]
        );
    }

    #[test]
    fn booleans_ignore_case() {
        let tokens = lex_ok("true False TRUE false");
        assert_eq!(
            tokens,
            vec![
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Boolean(true),
                Token::Boolean(false),
            ]
        );
    }

    #[test]
    fn boolean_prefix_is_ident() {
        let tokens = lex_ok("trueish");
        assert_eq!(tokens, vec![Token::Ident]);
    }

    #[test]
    fn string_with_escapes() {
        let tokens = lex_ok(r#""say \"hi\"" "a\\b""#);
        assert_eq!(
            tokens,
            vec![
                Token::StringLit("say \"hi\"".into()),
                Token::StringLit("a\\b".into()),
            ]
        );
    }

    // ── Identifiers ──

    #[test]
    fn qualified_vs_plain() {
        let tokens = lex_ok("lower pkg.lower a.b.c");
        assert_eq!(tokens, vec![Token::Ident, Token::QualIdent, Token::QualIdent]);
    }

    #[test]
    fn maps_to_after_number_is_not_negative() {
        let tokens = lex_ok("1 -> x");
        assert_eq!(tokens, vec![Token::Integer(1), Token::MapsTo, Token::Ident]);
    }

    // ── Comments and whitespace ──

    #[test]
    fn comments_skipped() {
        let tokens = lex_ok("# a comment\ncomponent # trailing\n  x");
        assert_eq!(tokens, vec![Token::Component, Token::Ident]);
    }

    // ── Spans ──

    #[test]
    fn spans_correct() {
        let result = lex("as foo");
        assert!(result.errors.is_empty());
        assert_eq!(result.tokens.len(), 2);
        assert_eq!(result.tokens[0].1, Span { start: 0, end: 2 });
        assert_eq!(result.tokens[1].1, Span { start: 3, end: 6 });
    }

    // ── Error recovery ──

    #[test]
    fn error_recovery() {
        let (tokens, errors) = lex_all("foo ~ bar");
        assert_eq!(tokens, vec![Token::Ident, Token::Ident]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, Span { start: 4, end: 5 });
        assert_eq!(errors[0].message, "illegal character [~]");
    }

    #[test]
    fn oversized_integer_reported_whole() {
        let (tokens, errors) = lex_all("x 99999999999999999999 y");
        assert_eq!(tokens, vec![Token::Ident, Token::Ident]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, Span { start: 2, end: 22 });
        assert_eq!(
            errors[0].message,
            "integer literal 99999999999999999999 out of range"
        );
        assert_eq!(lex_ok("-9223372036854775808"), vec![Token::Integer(i64::MIN)]);
    }

    #[test]
    fn multiple_errors_reported() {
        let (tokens, errors) = lex_all("a $ b % c");
        assert_eq!(tokens.len(), 3);
        assert_eq!(errors.len(), 2);
    }

    // ── Full component snippet ──

    #[test]
    fn component_snippet() {
        let source = "component upper\n  inputs s\n  outputs s\n  declare\n    l := new lower\n  as l >>> wire s -> s\n";
        let tokens = lex_ok(source);
        assert_eq!(
            tokens,
            vec![
                Token::Component,
                Token::Ident, // upper
                Token::Inputs,
                Token::Ident, // s
                Token::Outputs,
                Token::Ident, // s
                Token::Declare,
                Token::Ident, // l
                Token::Assign,
                Token::New,
                Token::Ident, // lower
                Token::As,
                Token::Ident, // l
                Token::Composition,
                Token::Wire,
                Token::Ident,
                Token::MapsTo,
                Token::Ident,
            ]
        );
    }
}
