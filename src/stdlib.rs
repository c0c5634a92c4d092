// SPDX: CC0-1.0

use crate::{eval::*, Number};
use core::f64::consts; // assumes Number = f64
use std::collections::HashMap;

/// The free variable of every plotted expression.
pub const X: &str = "x";

/// Helper functions and constants available to expressions, with `x`
/// declared but unbound. Operators are not callable by name.
pub fn standard_idents() -> Idents {
    let mut ret = HashMap::new();

    let funs: [(&'static str, usize, fn(&[Number]) -> Number); 19] = [
        ("abs", 1, abs),
        ("sqrt", 1, sqrt),
        ("cbrt", 1, cbrt),
        ("pow", 2, pow),
        ("exp", 1, exp),
        ("ln", 1, ln),
        ("log", 2, log),
        // trig
        ("sin", 1, sin),
        ("cos", 1, cos),
        ("tan", 1, tan),
        ("csc", 1, csc),
        ("sec", 1, sec),
        ("cot", 1, cot),
        ("arcsin", 1, arcsin),
        ("arccos", 1, arccos),
        ("arctan", 1, arctan),
        ("asin", 1, arcsin),
        ("acos", 1, arccos),
        ("atan", 1, arctan),
    ];
    for (name, arity, fun) in funs {
        ret.insert(name.into(), Ident::Fun(Fun::new(arity, fun)));
    }

    ret.insert("pi".into(), Ident::Const(consts::PI));
    ret.insert("tau".into(), Ident::Const(consts::TAU));
    ret.insert("e".into(), Ident::Const(consts::E));

    ret.insert(X.into(), Ident::Var(None));
    ret
}

/// Set the value of `x` for the next evaluation.
pub fn bind_x(idents: &mut Idents, x: Number) {
    idents.insert(X.into(), Ident::Var(Some(x)));
}

// arity is checked by the evaluator before calling
fn unary(args: &[Number]) -> Number {
    args[0]
}

fn binary(args: &[Number]) -> (Number, Number) {
    (args[0], args[1])
}

pub fn neg(args: &[Number]) -> Number {
    -unary(args)
}

pub fn add(args: &[Number]) -> Number {
    let (x, y) = binary(args);
    x + y
}

pub fn sub(args: &[Number]) -> Number {
    let (x, y) = binary(args);
    x - y
}

pub fn mul(args: &[Number]) -> Number {
    let (x, y) = binary(args);
    x * y
}

pub fn div(args: &[Number]) -> Number {
    let (x, y) = binary(args);
    x / y
}

pub fn pow(args: &[Number]) -> Number {
    let (x, exp) = binary(args);
    x.powf(exp)
}

pub fn abs(args: &[Number]) -> Number {
    unary(args).abs()
}

pub fn sqrt(args: &[Number]) -> Number {
    unary(args).sqrt()
}

pub fn cbrt(args: &[Number]) -> Number {
    unary(args).cbrt()
}

pub fn exp(args: &[Number]) -> Number {
    unary(args).exp()
}

pub fn ln(args: &[Number]) -> Number {
    unary(args).ln()
}

pub fn log(args: &[Number]) -> Number {
    let (x, base) = binary(args);
    x.log(base)
}

pub fn sin(args: &[Number]) -> Number {
    unary(args).sin()
}

pub fn cos(args: &[Number]) -> Number {
    unary(args).cos()
}

pub fn tan(args: &[Number]) -> Number {
    unary(args).tan()
}

pub fn csc(args: &[Number]) -> Number {
    unary(args).sin().recip()
}

pub fn sec(args: &[Number]) -> Number {
    unary(args).cos().recip()
}

pub fn cot(args: &[Number]) -> Number {
    unary(args).tan().recip()
}

pub fn arcsin(args: &[Number]) -> Number {
    unary(args).asin()
}

pub fn arccos(args: &[Number]) -> Number {
    unary(args).acos()
}

pub fn arctan(args: &[Number]) -> Number {
    unary(args).atan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_are_bound() {
        let idents = standard_idents();
        for name in [
            "sin", "cos", "tan", "csc", "sec", "cot", "arcsin", "arccos", "arctan", "sqrt", "cbrt",
            "pow", "abs",
        ] {
            assert!(
                matches!(idents.get(&name.into()), Some(Ident::Fun(_))),
                "{name} is missing"
            );
        }
        assert!(matches!(idents.get(&"pi".into()), Some(Ident::Const(v)) if *v == consts::PI));
        assert!(matches!(idents.get(&"e".into()), Some(Ident::Const(v)) if *v == consts::E));
        assert!(matches!(idents.get(&X.into()), Some(Ident::Var(None))));
        assert!(matches!(idents.get(&"exp".into()), Some(Ident::Fun(f)) if f.arity == 1));
        for name in ["neg", "add", "sub", "mul", "div"] {
            assert!(idents.get(&name.into()).is_none(), "{name} is exposed");
        }
    }

    #[test]
    fn reciprocal_trig() {
        let x = 0.7;
        assert!((csc(&[x]) - 1.0 / x.sin()).abs() < 1e-12);
        assert!((sec(&[x]) - 1.0 / x.cos()).abs() < 1e-12);
        assert!((cot(&[x]) - 1.0 / x.tan()).abs() < 1e-12);
        assert!(csc(&[0.0]).is_infinite());
    }

    #[test]
    fn bind_replaces_value() {
        let mut idents = standard_idents();
        bind_x(&mut idents, 2.0);
        bind_x(&mut idents, 3.0);
        assert!(matches!(idents.get(&X.into()), Some(Ident::Var(Some(v))) if *v == 3.0));
    }
}
