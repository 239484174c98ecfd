// Parser for PCL .pcl source files.
//
// Parses a token stream (from the lexer) into an AST: imports followed by
// one component whose body is an arrow expression or a do-block. Uses
// chumsky combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any lexical and syntax diagnostics.
// Failure modes: syntax errors are recorded with the unexpected token; the
//   parser resynchronises on the recovery set and keeps going, so several
//   errors can be reported per file.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::recovery::via_parser;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::diag::{codes, Diagnostic};
use crate::lexer::Token;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub module: Option<Module>,
    pub errors: Vec<Diagnostic>,
}

/// Tokens the parser resynchronises on after a syntax error.
const RECOVERY_SET: [Token; 9] = [
    Token::RParen,
    Token::Composition,
    Token::ParallelTuple,
    Token::ParallelScalar,
    Token::As,
    Token::Declare,
    Token::Do,
    Token::If,
    Token::Return,
];

/// Parse a PCL source string. Lexes then parses.
///
/// Returns an AST (if parsing produced one) plus lexical and syntax errors.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = module_parser(source);
    let (module, parse_errors) = parser.parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut errors: Vec<Diagnostic> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Diagnostic::error(codes::E0001, span, e.message)
        })
        .collect();
    errors.extend(
        parse_errors
            .into_iter()
            .map(|e| syntax_diagnostic(source, &e)),
    );

    ParseResult { module, errors }
}

fn syntax_diagnostic(source: &str, err: &Rich<'_, Token, SimpleSpan>) -> Diagnostic {
    let span = *err.span();
    let message = match err.found() {
        Some(_) => format!(
            "parser failure at or near {}",
            source.get(span.start..span.end).unwrap_or("?")
        ),
        None => "unexpected end of input".to_string(),
    };
    Diagnostic::error(codes::E0002, span, message)
}

// ── Main parser builder ──
//
// All grammar rules are built inside `module_parser` so that the `source`
// reference is captured once and shared by all combinators.

fn module_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Module, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let text = move |span: SimpleSpan| source[span.start..span.end].to_string();

    // ── Identifiers ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: text(span),
            span,
        }
    });

    // Import paths accept both `lowercase` and `text.lowercase`.
    let module_path = just(Token::Ident)
        .or(just(Token::QualIdent))
        .map_with(move |_, e| {
            let span: SimpleSpan = e.span();
            Ident {
                name: text(span),
                span,
            }
        });

    // `alias.function` split at the last dot.
    let call_name = just(Token::QualIdent).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        let full = &source[span.start..span.end];
        let (package, function) = full.rsplit_once('.').unwrap_or((full, ""));
        let dot = span.start + package.len();
        (
            Ident {
                name: package.to_string(),
                span: (span.start..dot).into(),
            },
            Ident {
                name: function.to_string(),
                span: (dot + 1..span.end).into(),
            },
        )
    });

    // ── Literals and operands ──

    let literal = select! {
        Token::Integer(n) = e => Literal { value: LiteralValue::Integer(n), span: e.span() },
        Token::Float(v) = e => Literal { value: LiteralValue::Float(v), span: e.span() },
        Token::StringLit(s) = e => Literal { value: LiteralValue::Str(s), span: e.span() },
        Token::Boolean(b) = e => Literal { value: LiteralValue::Bool(b), span: e.span() },
    };

    let ident_or_literal = choice((
        literal.clone().map(Operand::Literal),
        ident.clone().map(Operand::Ident),
    ));

    let operand = choice((
        just(Token::At)
            .ignore_then(ident.clone())
            .map(Operand::State),
        ident_or_literal.clone(),
    ));

    // ── Conditions ──
    //
    // or < and < xor < == < != < > < < < >= < <= < atom, all left-associative.

    macro_rules! cond_level {
        ($lower:expr, $tok:expr, $op:expr) => {{
            let lower = $lower;
            lower
                .clone()
                .foldl_with(
                    just($tok).to($op).then(lower).repeated(),
                    |left, (op, right), e| Condition::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                        span: e.span(),
                    },
                )
                .boxed()
        }};
    }

    let condition = recursive(|cond| {
        let atom = choice((
            operand.clone().map(Condition::Terminal),
            cond.delimited_by(just(Token::LParen), just(Token::RParen))
                .map_with(|c, e| Condition::Paren(Box::new(c), e.span())),
        ))
        .boxed();
        let le = cond_level!(atom, Token::LtEq, CondOp::Le);
        let ge = cond_level!(le, Token::GtEq, CondOp::Ge);
        let lt = cond_level!(ge, Token::Lt, CondOp::Lt);
        let gt = cond_level!(lt, Token::Gt, CondOp::Gt);
        let ne = cond_level!(gt, Token::NotEq, CondOp::Ne);
        let eq = cond_level!(ne, Token::EqEq, CondOp::Eq);
        let xor = cond_level!(eq, Token::Xor, CondOp::Xor);
        let and = cond_level!(xor, Token::And, CondOp::And);
        cond_level!(and, Token::Or, CondOp::Or)
    });

    // ── Arrow expressions ──

    let merge_mapping = choice((
        just(Token::Top)
            .ignore_then(
                ident
                    .clone()
                    .delimited_by(just(Token::LBracket), just(Token::RBracket)),
            )
            .map(MergeSource::Top),
        just(Token::Bottom)
            .ignore_then(
                ident
                    .clone()
                    .delimited_by(just(Token::LBracket), just(Token::RBracket)),
            )
            .map(MergeSource::Bottom),
        literal.clone().map(MergeSource::Literal),
    ))
    .then_ignore(just(Token::MapsTo))
    .then(ident.clone())
    .map_with(|(source, to), e| MergeMapping {
        source,
        to,
        span: e.span(),
    });

    let wire_mapping = ident_or_literal
        .clone()
        .then_ignore(just(Token::MapsTo))
        .then(ident.clone())
        .map_with(|(from, to), e| WireMapping {
            from,
            to,
            span: e.span(),
        });

    let wire_mappings = wire_mapping
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>();

    let arrow = recursive(|arrow| {
        let unary = recursive(|unary| {
            let first = just(Token::First)
                .ignore_then(unary.clone())
                .map(|e| ExprKind::First(Box::new(e)));
            let second = just(Token::Second)
                .ignore_then(unary.clone())
                .map(|e| ExprKind::Second(Box::new(e)));
            let split = just(Token::Split).to(ExprKind::Split);
            let merge = just(Token::Merge)
                .ignore_then(
                    merge_mapping
                        .clone()
                        .separated_by(just(Token::Comma))
                        .at_least(1)
                        .collect::<Vec<_>>(),
                )
                .map(ExprKind::Merge);
            let wire_tuple = just(Token::Wire)
                .ignore_then(
                    wire_mappings
                        .clone()
                        .delimited_by(just(Token::LParen), just(Token::RParen)),
                )
                .then_ignore(just(Token::Comma))
                .then(
                    wire_mappings
                        .clone()
                        .delimited_by(just(Token::LParen), just(Token::RParen)),
                )
                .map(|(top, bottom)| ExprKind::WireTuple(top, bottom));
            let wire = just(Token::Wire)
                .ignore_then(wire_mappings.clone())
                .map(ExprKind::Wire);
            let if_expr = just(Token::If)
                .ignore_then(condition.clone())
                .then_ignore(just(Token::Then).or_not())
                .then(unary.clone())
                .then_ignore(just(Token::Else).or_not())
                .then(unary.clone())
                .map(|((condition, then_branch), else_branch)| ExprKind::If {
                    condition,
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                });
            let identifier = ident.clone().map(ExprKind::Identifier);
            let paren = arrow
                .clone()
                .delimited_by(just(Token::LParen), just(Token::RParen))
                .map(|e| ExprKind::Paren(Box::new(e)));

            choice((
                first, second, split, merge, wire_tuple, wire, if_expr, identifier, paren,
            ))
            .map_with(|kind, e| Expr {
                kind,
                span: e.span(),
            })
            .recover_with(via_parser(
                none_of(RECOVERY_SET)
                    .repeated()
                    .at_least(1)
                    .map_with(|_, e| Expr {
                        kind: ExprKind::Error,
                        span: e.span(),
                    }),
            ))
            .boxed()
        });

        let scalar = unary
            .clone()
            .foldl_with(
                just(Token::ParallelScalar).ignore_then(unary).repeated(),
                |l, r, e| Expr {
                    kind: ExprKind::ParallelScalar(Box::new(l), Box::new(r)),
                    span: e.span(),
                },
            )
            .boxed();

        let tuple = scalar
            .clone()
            .foldl_with(
                just(Token::ParallelTuple).ignore_then(scalar).repeated(),
                |l, r, e| Expr {
                    kind: ExprKind::ParallelTuple(Box::new(l), Box::new(r)),
                    span: e.span(),
                },
            )
            .boxed();

        tuple
            .clone()
            .foldl_with(
                just(Token::Composition).ignore_then(tuple).repeated(),
                |l, r, e| Expr {
                    kind: ExprKind::Composition(Box::new(l), Box::new(r)),
                    span: e.span(),
                },
            )
            .boxed()
    });

    // ── Do-block commands ──

    let call = call_name
        .then(
            operand
                .clone()
                .separated_by(just(Token::Comma))
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .map_with(|((package, function), args), e| FunctionCall {
            package,
            function,
            args,
            span: e.span(),
        });

    let return_value = just(Token::Return).ignore_then(choice((
        just(Token::LParen)
            .then(just(Token::RParen))
            .map_with(|_, e| ReturnValue::Unit(e.span())),
        operand.clone().map(ReturnValue::Value),
    )));

    let command = recursive(|command| {
        let target = ident
            .clone()
            .then_ignore(just(Token::LeftArrow))
            .or_not();

        let let_binding = ident
            .clone()
            .then_ignore(just(Token::LeftArrow))
            .then(call.clone())
            .map_with(|(target, call), e| LetBinding {
                target,
                call,
                span: e.span(),
            });

        let let_cmd = just(Token::Let)
            .ignore_then(let_binding.repeated().at_least(1).collect::<Vec<_>>())
            .then_ignore(just(Token::In))
            .then(call.clone())
            .map(|(bindings, body)| CommandKind::Let { bindings, body });

        let block = command
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .then(return_value.clone())
            .map_with(|(commands, ret), e| Block {
                commands,
                ret,
                span: e.span(),
            });

        let if_cmd = just(Token::If)
            .ignore_then(condition.clone())
            .then_ignore(just(Token::Then))
            .then(block.clone())
            .then_ignore(just(Token::Else))
            .then(block)
            .then_ignore(just(Token::EndIf))
            .map(|((condition, then_block), else_block)| CommandKind::If {
                condition,
                then_block,
                else_block,
            });

        target
            .then(choice((let_cmd, if_cmd, call.clone().map(CommandKind::Call))))
            .map_with(|(target, kind), e| Command {
                target,
                kind,
                span: e.span(),
            })
            .recover_with(via_parser(
                none_of([Token::Return, Token::Else, Token::EndIf, Token::In])
                    .then(none_of(RECOVERY_SET).repeated())
                    .map_with(|_, e| Command {
                        target: None,
                        kind: CommandKind::Error,
                        span: e.span(),
                    }),
            ))
            .boxed()
    });

    let return_mapping = ident
        .clone()
        .then_ignore(just(Token::LeftArrow))
        .then(operand.clone())
        .map_with(|(to, from), e| ReturnMapping {
            to,
            from,
            span: e.span(),
        });

    let do_block = command
        .repeated()
        .collect::<Vec<_>>()
        .then(just(Token::Return).map_with(|_, e| e.span()))
        .then(
            return_mapping
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .map_with(|((commands, return_span), returns), e| DoBlock {
            commands,
            returns,
            return_span,
            span: e.span(),
        });

    // ── Component header ──

    let id_list = ident
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>();

    let signal_list = choice((
        id_list
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .then_ignore(just(Token::Comma))
            .then(
                id_list
                    .clone()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(top, bottom)| SignalList::Tuple(top, bottom)),
        id_list.clone().map(SignalList::Flat),
    ));

    // ── Declarations ──

    let config_mapping = ident_or_literal
        .then_ignore(just(Token::MapsTo))
        .then(ident.clone())
        .map_with(|(from, to), e| ConfigMapping {
            from,
            to,
            span: e.span(),
        });

    let declaration = ident
        .clone()
        .then_ignore(just(Token::Assign))
        .then_ignore(just(Token::New))
        .then(ident.clone())
        .then(
            just(Token::With)
                .ignore_then(
                    config_mapping
                        .separated_by(just(Token::Comma))
                        .at_least(1)
                        .collect::<Vec<_>>(),
                )
                .or_not(),
        )
        .map_with(|((name, component), with_clause), e| {
            Some(Declaration {
                name,
                component,
                with_clause,
                span: e.span(),
            })
        })
        .recover_with(via_parser(
            none_of([Token::As, Token::Do])
                .then(none_of(RECOVERY_SET).repeated())
                .to(None),
        ));

    let declarations = just(Token::Declare)
        .ignore_then(declaration.repeated().at_least(1).collect::<Vec<_>>())
        .map(|decls| decls.into_iter().flatten().collect::<Vec<_>>());

    // ── Component ──

    let arrow_definition = declarations
        .or_not()
        .then_ignore(just(Token::As))
        .then(arrow)
        .map(|(decls, expr)| (decls.unwrap_or_default(), Definition::Arrow(expr)));

    let do_definition = just(Token::Do)
        .ignore_then(do_block)
        .map(|block| (Vec::new(), Definition::Do(block)));

    let component = just(Token::Component)
        .ignore_then(ident.clone())
        .then_ignore(just(Token::Inputs))
        .then(signal_list.clone())
        .then_ignore(just(Token::Outputs))
        .then(signal_list)
        .then(just(Token::Configuration).ignore_then(id_list).or_not())
        .then(choice((arrow_definition, do_definition)))
        .map_with(
            |((((name, inputs), outputs), configuration), (declarations, definition)), e| {
                Component {
                    name,
                    inputs,
                    outputs,
                    configuration: configuration.unwrap_or_default(),
                    declarations,
                    definition,
                    span: e.span(),
                }
            },
        );

    // ── Imports ──

    let import = just(Token::Import)
        .ignore_then(module_path)
        .then_ignore(just(Token::As))
        .then(ident)
        .map_with(|(module_path, alias), e| Import {
            module_path,
            alias,
            span: e.span(),
        });

    // ── Module ──

    import
        .repeated()
        .collect::<Vec<_>>()
        .then(component)
        .then_ignore(end())
        .map_with(|(imports, component), e| Module {
            imports,
            component,
            span: e.span(),
        })
}

// ── Tests ──
