// SPDX: CC0-1.0

use crate::eval::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

/// Span into a shared expression source, used to underline errors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    /// Zero-width span just past the end of `src`.
    #[inline]
    pub fn end_of(src: Arc<String>) -> Self {
        let start = src.len();
        Self::new(src, start, 1)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        let end = (self.start + self.len).min(self.src.len());
        self.src.get(self.start.min(end)..end).unwrap_or_default()
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OperatorTyp),
    Comma,
    OpenParen,
    CloseParen,

    // recognized, but not part of the expression grammar
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::XGreater
                | Self::XLess
                | Self::XEqual
                | Self::XPipe
                | Self::XOpenSquareBracket
                | Self::XCloseSquareBracket
                | Self::XOpenCurly
                | Self::XCloseCurly
        )
    }

    /// Whether a `-` following this token starts a new operand.
    const fn expects_operand(&self) -> bool {
        matches!(self, Self::Op(_) | Self::Comma | Self::OpenParen)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    prev: Option<TokTyp>,
    has_errored: bool, // yield None after the first error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            prev: None,
            has_errored: false,
        }
    }

    fn span(&self, start: usize, len: usize) -> SubStr {
        SubStr::new(Arc::clone(self.src), start, len)
    }

    fn trim_whitespace(&mut self) {
        while self.cur.next_if(|(_, chr)| chr.is_whitespace()).is_some() {}
    }

    fn single(chr: char) -> Option<TokTyp> {
        let typ = match chr {
            '+' => TokTyp::Op(OperatorTyp::Add),
            '*' => TokTyp::Op(OperatorTyp::Mul),
            '/' => TokTyp::Op(OperatorTyp::Div),
            '^' => TokTyp::Op(OperatorTyp::Exp),
            ',' => TokTyp::Comma,
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        Some(typ)
    }

    /// Consume the longest run of characters matching `predicate`.
    fn consume_run<P>(&mut self, start: usize, predicate: P) -> usize
    where
        P: Fn(char) -> bool,
    {
        let mut end = start;
        while let Some((idx, chr)) = self.cur.next_if(|(_, chr)| predicate(*chr)) {
            end = idx + chr.len_utf8();
        }
        end - start
    }

    fn lex_one(&mut self, idx: usize, chr: char) -> Result<Tok, LexErr> {
        let typ = if let Some(typ) = Self::single(chr) {
            self.cur.next();
            typ
        } else if chr == '-' {
            self.cur.next();
            let negation = self.prev.map_or(true, |prev| prev.expects_operand());
            TokTyp::Op(if negation {
                OperatorTyp::Neg
            } else {
                OperatorTyp::Sub
            })
        } else if chr.is_ascii_alphabetic() {
            let len = self.consume_run(idx, |c| c.is_ascii_alphabetic());
            return Ok(Tok {
                typ: TokTyp::Ident,
                loc: self.span(idx, len),
            });
        } else if chr.is_ascii_digit() || chr == '.' {
            let len = self.consume_run(idx, |c| c.is_ascii_digit() || c == '.');
            return Ok(Tok {
                typ: TokTyp::Number,
                loc: self.span(idx, len),
            });
        } else {
            return Err(LexErr {
                typ: LexErrTyp::InvalidChar,
                loc: self.span(idx, chr.len_utf8()),
            });
        };

        if typ.is_unsupported() {
            Err(LexErr {
                typ: LexErrTyp::Unsupported(typ),
                loc: self.span(idx, 1),
            })
        } else {
            Ok(Tok {
                typ,
                loc: self.span(idx, 1),
            })
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.trim_whitespace();
        let (idx, chr) = self.cur.peek().copied()?;
        let ret = self.lex_one(idx, chr);
        match ret {
            Ok(ref tok) => self.prev = Some(tok.typ),
            Err(_) => self.has_errored = true,
        }
        Some(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typs(src: &str) -> Vec<TokTyp> {
        let src = Arc::new(src.to_string());
        Lexer::new(&src).map(|tok| tok.unwrap().typ).collect()
    }

    #[test]
    fn minus_is_sub_after_operand() {
        use OperatorTyp::{Neg, Sub};
        assert_eq!(
            typs("x-1"),
            [TokTyp::Ident, TokTyp::Op(Sub), TokTyp::Number]
        );
        assert_eq!(typs("-x"), [TokTyp::Op(Neg), TokTyp::Ident]);
        assert_eq!(
            typs("2*-x"),
            [
                TokTyp::Number,
                TokTyp::Op(OperatorTyp::Mul),
                TokTyp::Op(Neg),
                TokTyp::Ident
            ]
        );
        assert_eq!(
            typs("(-1)"),
            [
                TokTyp::OpenParen,
                TokTyp::Op(Neg),
                TokTyp::Number,
                TokTyp::CloseParen
            ]
        );
    }

    #[test]
    fn spans_cover_whole_tokens() {
        let src = Arc::new(String::from("  sin(x)  + 12.5"));
        let toks: Vec<_> = Lexer::new(&src).map(Result::unwrap).collect();
        let texts: Vec<_> = toks.iter().map(|tok| tok.loc.get()).collect();
        assert_eq!(texts, ["sin", "(", "x", ")", "+", "12.5"]);
        assert_eq!(toks[0].loc.start(), 2);
    }

    #[test]
    fn stops_after_error() {
        let src = Arc::new(String::from("x $ y"));
        let mut lex = Lexer::new(&src);
        assert!(lex.next().unwrap().is_ok());
        let err = lex.next().unwrap().unwrap_err();
        assert_eq!(err.typ, LexErrTyp::InvalidChar);
        assert_eq!(err.loc.start(), 2);
        assert!(lex.next().is_none());
    }

    #[test]
    fn unsupported_tokens() {
        let src = Arc::new(String::from("|x|"));
        let err = Lexer::new(&src).next().unwrap().unwrap_err();
        assert_eq!(err.typ, LexErrTyp::Unsupported(TokTyp::XPipe));
    }
}
