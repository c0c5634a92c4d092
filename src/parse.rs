// SPDX: CC0-1.0

// shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    eval::{Associativity, Ident, Idents, Operation, OperationTyp, OperatorTyp, Program},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, TokTyp},
    Number,
};
use core::{fmt, num::ParseFloatError};
use std::sync::Arc;

#[derive(Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
    ExpectedOperand,
    ExpectedOperator,
    StrayComma,
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
            Self::ExpectedOperand => write!(f, "expected a value"),
            Self::ExpectedOperator => write!(f, "expected an operator"),
            Self::StrayComma => write!(f, "comma outside of function arguments"),
        }
    }
}

#[derive(Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at column {}", self.typ, self.loc.start() + 1)
    }
}

impl std::error::Error for ParseErr {}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Fun,
    OpenParen,
}

#[derive(Clone, Debug)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

impl ShuntOp {
    // function application binds tighter than any operator
    const FUN_PRECEDENCE: i8 = i8::MAX;

    /// Whether this stacked op must be emitted before pushing `incoming`.
    fn yields_to(&self, incoming: OperatorTyp) -> bool {
        if incoming.is_prefix() {
            // a prefix operator has no left operand yet
            return false;
        }
        let prec = match self.typ {
            ShuntOpTyp::OpenParen => return false,
            ShuntOpTyp::Fun => Self::FUN_PRECEDENCE,
            ShuntOpTyp::Operator(op) => op.precedence(),
        };
        prec > incoming.precedence()
            || (prec == incoming.precedence() && incoming.associativity() == Associativity::Left)
    }

    fn into_output(self) -> Option<Operation> {
        let typ = match self.typ {
            ShuntOpTyp::Operator(typ) => OperationTyp::Operator(typ),
            ShuntOpTyp::Fun => OperationTyp::Ident,
            ShuntOpTyp::OpenParen => return None,
        };
        Some(Operation { typ, loc: self.loc })
    }
}

/// Parse infix tokens into a postfix program. An empty token stream gives an
/// empty program.
pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Program, ParseErr> {
    let mut out: Vec<Operation> = Vec::new(); // output queue
    let mut ops: Vec<ShuntOp> = Vec::new(); // operator stack

    // true at the start and after anything that needs a right-hand side
    let mut want_operand = true;
    let mut last: Option<SubStr> = None;

    let fail = |typ, loc| Err(ParseErr { typ, loc });

    for tok in lex {
        let tok = tok?;
        last = Some(tok.loc.clone());
        match tok.typ {
            TokTyp::Number => {
                if !want_operand {
                    return fail(ParseErrTyp::ExpectedOperator, tok.loc);
                }
                let num: Number = tok.loc.get().parse().map_err(|err| ParseErr {
                    typ: ParseErrTyp::ParseNum(err),
                    loc: tok.loc.clone(),
                })?;
                out.push(Operation {
                    typ: OperationTyp::Val(num),
                    loc: tok.loc,
                });
                want_operand = false;
            }

            TokTyp::Ident => {
                if !want_operand {
                    return fail(ParseErrTyp::ExpectedOperator, tok.loc);
                }
                match idents.get(&tok.loc.clone().into()) {
                    // still wants its argument, either `(...)` or a bare operand
                    Some(Ident::Fun(_)) => ops.push(ShuntOp {
                        typ: ShuntOpTyp::Fun,
                        loc: tok.loc,
                    }),
                    // unknown identifiers are assumed to be variables and are
                    // reported when evaluated
                    Some(Ident::Const(_) | Ident::Var(_)) | None => {
                        out.push(Operation {
                            typ: OperationTyp::Ident,
                            loc: tok.loc,
                        });
                        want_operand = false;
                    }
                }
            }

            TokTyp::Op(o1) => {
                if want_operand != o1.is_prefix() {
                    let typ = if want_operand {
                        ParseErrTyp::ExpectedOperand
                    } else {
                        ParseErrTyp::ExpectedOperator
                    };
                    return fail(typ, tok.loc);
                }
                while ops.last().is_some_and(|o2| o2.yields_to(o1)) {
                    if let Some(op) = ops.pop().and_then(ShuntOp::into_output) {
                        out.push(op);
                    }
                }
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(o1),
                    loc: tok.loc,
                });
                want_operand = true;
            }

            TokTyp::Comma => {
                if want_operand {
                    return fail(ParseErrTyp::ExpectedOperand, tok.loc);
                }
                pop_until_paren(&mut ops, &mut out);
                // only valid directly inside a function's argument list
                let in_args = matches!(
                    ops.as_slice(),
                    [
                        ..,
                        ShuntOp { typ: ShuntOpTyp::Fun, .. },
                        ShuntOp { typ: ShuntOpTyp::OpenParen, .. }
                    ]
                );
                if !in_args {
                    return fail(ParseErrTyp::StrayComma, tok.loc);
                }
                want_operand = true;
            }

            TokTyp::OpenParen => {
                if !want_operand {
                    return fail(ParseErrTyp::ExpectedOperator, tok.loc);
                }
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc: tok.loc,
                });
            }

            TokTyp::CloseParen => {
                if want_operand {
                    return fail(ParseErrTyp::ExpectedOperand, tok.loc);
                }
                pop_until_paren(&mut ops, &mut out);
                if ops.pop().is_none() {
                    return fail(ParseErrTyp::ParenMismatch, tok.loc);
                }

                // a function directly before the parentheses takes them as
                // its argument list
                if ops.last().is_some_and(|op| op.typ == ShuntOpTyp::Fun) {
                    if let Some(op) = ops.pop().and_then(ShuntOp::into_output) {
                        out.push(op);
                    }
                }
            }

            TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => {
                return fail(ParseErrTyp::LexErr(LexErrTyp::Unsupported(tok.typ)), tok.loc);
            }
        }
    }

    if want_operand {
        if let Some(last) = last {
            return fail(ParseErrTyp::ExpectedOperand, SubStr::end_of(last.src()));
        }
    }

    while let Some(op) = ops.pop() {
        let loc = op.loc.clone();
        match op.into_output() {
            Some(op) => out.push(op),
            None => return fail(ParseErrTyp::ParenMismatch, loc),
        }
    }

    Ok(Program::new(out))
}

/// Lex and parse `src` in one step.
pub fn compile(src: &Arc<String>, idents: &Idents) -> Result<Program, ParseErr> {
    parse(Lexer::new(src), idents)
}

/// Move ops into `out` until an open parenthesis is on top of `ops` (which
/// is left in place) or `ops` is empty.
fn pop_until_paren(ops: &mut Vec<ShuntOp>, out: &mut Vec<Operation>) {
    while ops
        .last()
        .is_some_and(|op| op.typ != ShuntOpTyp::OpenParen)
    {
        if let Some(op) = ops.pop().and_then(ShuntOp::into_output) {
            out.push(op);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdlib;
    use std::sync::Arc;

    fn postfix(src: &str) -> Result<Vec<String>, ParseErr> {
        let idents = stdlib::standard_idents();
        let src = Arc::new(src.to_string());
        let prog = parse(Lexer::new(&src), &idents)?;
        Ok(prog.ops().map(ToString::to_string).collect())
    }

    #[test]
    fn precedence() {
        assert_eq!(
            postfix("1 + 2 * x").unwrap(),
            ["push 1", "push 2", "load 'x'", "call 'mul'", "call 'add'"]
        );
    }

    #[test]
    fn function_arguments() {
        assert_eq!(
            postfix("pow(x, 1 + 1)").unwrap(),
            ["load 'x'", "push 1", "push 1", "call 'add'", "load 'pow'"]
        );
    }

    #[test]
    fn paren_mismatch() {
        let err = postfix("(x + 1").unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::ParenMismatch));
        assert_eq!(err.loc.start(), 0);

        let err = postfix("x + 1)").unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::ParenMismatch));
        assert_eq!(err.loc.start(), 5);
    }

    #[test]
    fn bad_number() {
        let err = postfix("1.2.3").unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::ParseNum(_)));
        assert_eq!(err.loc.get(), "1.2.3");
    }

    #[test]
    fn bare_function_argument() {
        assert_eq!(
            postfix("sin x + 1").unwrap(),
            ["load 'x'", "load 'sin'", "push 1", "call 'add'"]
        );
        assert_eq!(postfix("-x^2").unwrap(), ["load 'x'", "push 2", "call 'pow'", "call 'neg'"]);
    }

    #[test]
    fn postfix_input_is_rejected() {
        for (src, col) in [("x sin", 2), ("1 2 add", 2), ("x 2 pow", 2), ("2(x)", 1)] {
            let err = postfix(src).unwrap_err();
            assert!(matches!(err.typ, ParseErrTyp::ExpectedOperator), "{src}");
            assert_eq!(err.loc.start(), col, "{src}");
        }
    }

    #[test]
    fn missing_operands() {
        let err = postfix("x +").unwrap_err();
        assert!(matches!(err.typ, ParseErrTyp::ExpectedOperand));
        assert_eq!(err.loc.start(), 3);

        for src in ["* x", "x + * 2", "sin", "sin()", "pow(x, )"] {
            let err = postfix(src).unwrap_err();
            assert!(matches!(err.typ, ParseErrTyp::ExpectedOperand), "{src}");
        }
        assert!(postfix("").unwrap().is_empty());
    }

    #[test]
    fn commas_need_a_function() {
        for src in ["1, 2", "(x, 1)", "sin x, 2"] {
            let err = postfix(src).unwrap_err();
            assert!(matches!(err.typ, ParseErrTyp::StrayComma), "{src}");
        }
        assert!(postfix("pow(sin(x), 2)").is_ok());
    }

    #[test]
    fn lex_errors_propagate() {
        let err = postfix("x = 1").unwrap_err();
        assert!(matches!(
            err.typ,
            ParseErrTyp::LexErr(LexErrTyp::Unsupported(TokTyp::XEqual))
        ));
    }
}
