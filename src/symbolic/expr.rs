//! Owned symbolic expression trees.
//!
//! Expressions are built through smart constructors ([`Expr::add`], [`Expr::mul`],
//! ...) which fold constants and drop identities (`0 + e`, `1 · e`, `e^1`), so
//! substitution and differentiation results stay readable without a general
//! simplifier.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::math::Scalar;
use crate::symbolic::ExprError;

/// A named symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Elementary functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Func {
    Exp,
    Ln,
    Sqrt,
    Sinh,
    Cosh,
}

impl Func {
    pub fn name(self) -> &'static str {
        match self {
            Func::Exp => "exp",
            Func::Ln => "log",
            Func::Sqrt => "sqrt",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
        }
    }

    pub fn apply<S: Scalar>(self, v: &S) -> S {
        match self {
            Func::Exp => v.exp(),
            Func::Ln => v.ln(),
            Func::Sqrt => v.sqrt(),
            Func::Sinh => v.sinh(),
            Func::Cosh => v.cosh(),
        }
    }

    /// `f'(arg)`, the outer derivative used by the chain rule.
    fn derivative(self, arg: &Expr) -> Expr {
        match self {
            Func::Exp => Expr::call(Func::Exp, arg.clone()),
            Func::Ln => Expr::div(Expr::num(1.0), arg.clone()),
            Func::Sqrt => Expr::div(
                Expr::num(1.0),
                Expr::mul(Expr::num(2.0), Expr::call(Func::Sqrt, arg.clone())),
            ),
            Func::Sinh => Expr::call(Func::Cosh, arg.clone()),
            Func::Cosh => Expr::call(Func::Sinh, arg.clone()),
        }
    }
}

/// Relational operator of a piecewise condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cmp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Cmp::Lt => lhs < rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Gt => lhs > rhs,
            Cmp::Ge => lhs >= rhs,
        }
    }

    fn operator(self) -> &'static str {
        match self {
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
        }
    }
}

/// `lhs <cmp> rhs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub lhs: Expr,
    pub cmp: Cmp,
    pub rhs: Expr,
}

impl Condition {
    pub fn new(lhs: Expr, cmp: Cmp, rhs: Expr) -> Self {
        Self { lhs, cmp, rhs }
    }

    fn map(&self, f: &impl Fn(&Expr) -> Expr) -> Condition {
        Condition::new(f(&self.lhs), self.cmp, f(&self.rhs))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.cmp.operator(), self.rhs)
    }
}

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "lowercase")]
pub enum Expr {
    Num(f64),
    Sym(Symbol),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Call(Func, Box<Expr>),
    /// First branch whose condition holds wins, else `otherwise`.
    Piecewise {
        branches: Vec<(Condition, Expr)>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn num(value: f64) -> Expr {
        Expr::Num(value)
    }

    pub fn sym(name: &str) -> Expr {
        Expr::Sym(Symbol::new(name))
    }

    fn as_num(&self) -> Option<f64> {
        match self {
            Expr::Num(v) => Some(*v),
            _ => None,
        }
    }

    pub fn add(a: Expr, b: Expr) -> Expr {
        match (a.as_num(), b.as_num()) {
            (Some(x), Some(y)) => Expr::Num(x + y),
            (Some(x), _) if x == 0.0 => b,
            (_, Some(y)) if y == 0.0 => a,
            _ => Expr::Add(Box::new(a), Box::new(b)),
        }
    }

    pub fn sub(a: Expr, b: Expr) -> Expr {
        match (a.as_num(), b.as_num()) {
            (Some(x), Some(y)) => Expr::Num(x - y),
            (_, Some(y)) if y == 0.0 => a,
            (Some(x), _) if x == 0.0 => Expr::neg(b),
            _ if a == b => Expr::Num(0.0),
            _ => Expr::Sub(Box::new(a), Box::new(b)),
        }
    }

    pub fn mul(a: Expr, b: Expr) -> Expr {
        match (a.as_num(), b.as_num()) {
            (Some(x), Some(y)) => Expr::Num(x * y),
            (Some(x), _) | (_, Some(x)) if x == 0.0 => Expr::Num(0.0),
            (Some(x), _) if x == 1.0 => b,
            (_, Some(y)) if y == 1.0 => a,
            (Some(x), _) if x == -1.0 => Expr::neg(b),
            (_, Some(y)) if y == -1.0 => Expr::neg(a),
            _ => Expr::Mul(Box::new(a), Box::new(b)),
        }
    }

    pub fn div(a: Expr, b: Expr) -> Expr {
        match (a.as_num(), b.as_num()) {
            (Some(x), Some(y)) if y != 0.0 => Expr::Num(x / y),
            (Some(x), _) if x == 0.0 => Expr::Num(0.0),
            (_, Some(y)) if y == 1.0 => a,
            _ => Expr::Div(Box::new(a), Box::new(b)),
        }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        match (base.as_num(), exponent.as_num()) {
            (_, Some(e)) if e == 0.0 => Expr::Num(1.0),
            (_, Some(e)) if e == 1.0 => base,
            (Some(b), Some(e)) if b.powf(e).is_finite() => Expr::Num(b.powf(e)),
            _ => Expr::Pow(Box::new(base), Box::new(exponent)),
        }
    }

    pub fn neg(a: Expr) -> Expr {
        match a {
            Expr::Num(v) => Expr::Num(-v),
            Expr::Neg(inner) => *inner,
            other => Expr::Neg(Box::new(other)),
        }
    }

    pub fn call(func: Func, arg: Expr) -> Expr {
        if let Some(v) = arg.as_num() {
            let folded = func.apply(&v);
            if folded.is_finite() {
                return Expr::Num(folded);
            }
        }
        Expr::Call(func, Box::new(arg))
    }

    pub fn exp(arg: Expr) -> Expr {
        Expr::call(Func::Exp, arg)
    }

    pub fn sqrt(arg: Expr) -> Expr {
        Expr::call(Func::Sqrt, arg)
    }

    pub fn sinh(arg: Expr) -> Expr {
        Expr::call(Func::Sinh, arg)
    }

    pub fn cosh(arg: Expr) -> Expr {
        Expr::call(Func::Cosh, arg)
    }

    pub fn piecewise(branches: Vec<(Condition, Expr)>, otherwise: Expr) -> Expr {
        if branches.is_empty() {
            return otherwise;
        }
        Expr::Piecewise {
            branches,
            otherwise: Box::new(otherwise),
        }
    }

    /// Rebuild the tree bottom-up, replacing leaves through `leaf`.
    fn rebuild(&self, leaf: &impl Fn(&Expr) -> Expr) -> Expr {
        let go = |e: &Expr| e.rebuild(leaf);
        match self {
            Expr::Num(_) | Expr::Sym(_) => leaf(self),
            Expr::Add(a, b) => Expr::add(go(a), go(b)),
            Expr::Sub(a, b) => Expr::sub(go(a), go(b)),
            Expr::Mul(a, b) => Expr::mul(go(a), go(b)),
            Expr::Div(a, b) => Expr::div(go(a), go(b)),
            Expr::Pow(a, b) => Expr::pow(go(a), go(b)),
            Expr::Neg(a) => Expr::neg(go(a)),
            Expr::Call(func, a) => Expr::call(*func, go(a)),
            Expr::Piecewise {
                branches,
                otherwise,
            } => Expr::piecewise(
                branches
                    .iter()
                    .map(|(cond, e)| (cond.map(&go), go(e)))
                    .collect(),
                go(otherwise),
            ),
        }
    }

    /// Substitute symbols by expressions. Unmapped symbols are kept.
    pub fn subs(&self, map: &HashMap<Symbol, Expr>) -> Expr {
        self.rebuild(&|leaf| match leaf {
            Expr::Sym(s) => map.get(s).cloned().unwrap_or_else(|| leaf.clone()),
            _ => leaf.clone(),
        })
    }

    /// Substitute a single symbol.
    pub fn subs_one(&self, symbol: &Symbol, value: Expr) -> Expr {
        let mut map = HashMap::with_capacity(1);
        map.insert(symbol.clone(), value);
        self.subs(&map)
    }

    /// Whether `symbol` appears anywhere in the expression.
    pub fn contains(&self, symbol: &Symbol) -> bool {
        match self {
            Expr::Num(_) => false,
            Expr::Sym(s) => s == symbol,
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.contains(symbol) || b.contains(symbol)
            }
            Expr::Neg(a) | Expr::Call(_, a) => a.contains(symbol),
            Expr::Piecewise {
                branches,
                otherwise,
            } => {
                otherwise.contains(symbol)
                    || branches.iter().any(|(cond, e)| {
                        cond.lhs.contains(symbol) || cond.rhs.contains(symbol) || e.contains(symbol)
                    })
            }
        }
    }

    /// Symbolic derivative with respect to `symbol`.
    ///
    /// Piecewise expressions are differentiated branch by branch; the
    /// conditions are kept as they are.
    pub fn diff(&self, symbol: &Symbol) -> Expr {
        if !self.contains(symbol) {
            return Expr::Num(0.0);
        }
        match self {
            Expr::Num(_) => Expr::Num(0.0),
            Expr::Sym(s) => Expr::Num(if s == symbol { 1.0 } else { 0.0 }),
            Expr::Add(a, b) => Expr::add(a.diff(symbol), b.diff(symbol)),
            Expr::Sub(a, b) => Expr::sub(a.diff(symbol), b.diff(symbol)),
            Expr::Mul(a, b) => Expr::add(
                Expr::mul(a.diff(symbol), (**b).clone()),
                Expr::mul((**a).clone(), b.diff(symbol)),
            ),
            Expr::Div(a, b) => {
                if b.contains(symbol) {
                    Expr::div(
                        Expr::sub(
                            Expr::mul(a.diff(symbol), (**b).clone()),
                            Expr::mul((**a).clone(), b.diff(symbol)),
                        ),
                        Expr::pow((**b).clone(), Expr::num(2.0)),
                    )
                } else {
                    Expr::div(a.diff(symbol), (**b).clone())
                }
            }
            Expr::Pow(a, b) => {
                if b.contains(symbol) {
                    // d(a^b) = a^b (b' ln a + b a' / a)
                    Expr::mul(
                        self.clone(),
                        Expr::add(
                            Expr::mul(b.diff(symbol), Expr::call(Func::Ln, (**a).clone())),
                            Expr::div(Expr::mul((**b).clone(), a.diff(symbol)), (**a).clone()),
                        ),
                    )
                } else {
                    Expr::mul(
                        Expr::mul(
                            (**b).clone(),
                            Expr::pow((**a).clone(), Expr::sub((**b).clone(), Expr::num(1.0))),
                        ),
                        a.diff(symbol),
                    )
                }
            }
            Expr::Neg(a) => Expr::neg(a.diff(symbol)),
            Expr::Call(func, a) => Expr::mul(func.derivative(a), a.diff(symbol)),
            Expr::Piecewise {
                branches,
                otherwise,
            } => Expr::piecewise(
                branches
                    .iter()
                    .map(|(cond, e)| (cond.clone(), e.diff(symbol)))
                    .collect(),
                otherwise.diff(symbol),
            ),
        }
    }

    /// All symbols appearing in the expression, conditions included.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(s) => {
                out.insert(s.clone());
            }
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Neg(a) | Expr::Call(_, a) => a.collect_symbols(out),
            Expr::Piecewise {
                branches,
                otherwise,
            } => {
                for (cond, e) in branches {
                    cond.lhs.collect_symbols(out);
                    cond.rhs.collect_symbols(out);
                    e.collect_symbols(out);
                }
                otherwise.collect_symbols(out);
            }
        }
    }

    /// Evaluate directly by walking the tree.
    ///
    /// `env` resolves symbols; an unresolved symbol is an error.
    pub fn eval<S, F>(&self, env: &F) -> Result<S, ExprError>
    where
        S: Scalar,
        F: Fn(&Symbol) -> Option<S>,
    {
        Ok(match self {
            Expr::Num(v) => S::from_f64(*v),
            Expr::Sym(s) => env(s).ok_or_else(|| ExprError::Unbound(s.clone()))?,
            Expr::Add(a, b) => a.eval(env)? + b.eval(env)?,
            Expr::Sub(a, b) => a.eval(env)? - b.eval(env)?,
            Expr::Mul(a, b) => a.eval(env)? * b.eval(env)?,
            Expr::Div(a, b) => a.eval(env)? / b.eval(env)?,
            Expr::Pow(a, b) => a.eval(env)?.powf(&b.eval(env)?),
            Expr::Neg(a) => -a.eval(env)?,
            Expr::Call(func, a) => func.apply(&a.eval(env)?),
            Expr::Piecewise {
                branches,
                otherwise,
            } => {
                for (cond, e) in branches {
                    let lhs: S = cond.lhs.eval(env)?;
                    let rhs: S = cond.rhs.eval(env)?;
                    if cond.cmp.holds(lhs.value(), rhs.value()) {
                        return e.eval(env);
                    }
                }
                otherwise.eval(env)?
            }
        })
    }

    /// Evaluate with `f64` values looked up by symbol name.
    pub fn eval_f64(&self, values: &HashMap<&str, f64>) -> Result<f64, ExprError> {
        self.eval(&|s: &Symbol| values.get(s.name()).copied())
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Pow(..) => 4,
            Expr::Num(v) if *v < 0.0 => 3,
            _ => 5,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        if self.precedence() < min_prec {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    /// Right operands and negated operands also wrap negative literals.
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        match self {
            Expr::Num(v) if *v < 0.0 => write!(f, "({v})"),
            _ => self.fmt_child(f, min_prec),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Sym(s) => write!(f, "{s}"),
            Expr::Add(a, b) => {
                a.fmt_child(f, 1)?;
                f.write_str(" + ")?;
                b.fmt_operand(f, 1)
            }
            Expr::Sub(a, b) => {
                a.fmt_child(f, 1)?;
                f.write_str(" - ")?;
                b.fmt_operand(f, 2)
            }
            Expr::Mul(a, b) => {
                a.fmt_child(f, 2)?;
                f.write_str("*")?;
                b.fmt_operand(f, 2)
            }
            Expr::Div(a, b) => {
                a.fmt_child(f, 2)?;
                f.write_str("/")?;
                b.fmt_operand(f, 3)
            }
            Expr::Pow(a, b) => {
                a.fmt_child(f, 5)?;
                f.write_str("**")?;
                b.fmt_operand(f, 5)
            }
            Expr::Neg(a) => {
                f.write_str("-")?;
                a.fmt_operand(f, 3)
            }
            Expr::Call(func, a) => write!(f, "{}({a})", func.name()),
            Expr::Piecewise {
                branches,
                otherwise,
            } => {
                f.write_str("Piecewise(")?;
                for (cond, e) in branches {
                    write!(f, "({e}, {cond}), ")?;
                }
                write!(f, "({otherwise}, True))")
            }
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Num(value)
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Expr::Sym(symbol)
    }
}

impl From<&Symbol> for Expr {
    fn from(symbol: &Symbol) -> Self {
        Expr::Sym(symbol.clone())
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::add(self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::sub(self, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul(self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::div(self, rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::neg(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x() -> Symbol {
        Symbol::new("x")
    }

    fn at(expr: &Expr, x: f64) -> f64 {
        let values = HashMap::from([("x", x)]);
        expr.eval_f64(&values).unwrap()
    }

    #[test]
    fn constructors_fold_identities() {
        let x = Expr::sym("x");
        assert_eq!(Expr::add(Expr::num(0.0), x.clone()), x);
        assert_eq!(Expr::mul(Expr::num(1.0), x.clone()), x);
        assert_eq!(Expr::mul(Expr::num(0.0), x.clone()), Expr::num(0.0));
        assert_eq!(Expr::pow(x.clone(), Expr::num(1.0)), x);
        assert_eq!(Expr::sub(x.clone(), x.clone()), Expr::num(0.0));
        assert_eq!(Expr::neg(Expr::neg(x.clone())), x);
        assert_eq!(Expr::add(Expr::num(2.0), Expr::num(3.0)), Expr::num(5.0));
    }

    #[test]
    fn derivative_of_product_and_chain() {
        // d/dx [x * sinh(2x)] = sinh(2x) + 2x cosh(2x)
        let x_e = Expr::sym("x");
        let e = x_e.clone() * Expr::sinh(Expr::num(2.0) * x_e);
        let d = e.diff(&x());
        for &v in &[0.0, 0.3, 1.7] {
            let expected = (2.0 * v).sinh() + 2.0 * v * (2.0 * v).cosh();
            assert_relative_eq!(at(&d, v), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn derivative_of_quotient_and_sqrt() {
        let x_e = Expr::sym("x");
        let e = Expr::sqrt(x_e.clone()) / (x_e.clone() + Expr::num(1.0));
        let d = e.diff(&x());
        let v: f64 = 2.0;
        let expected = (1.0 / (2.0 * v.sqrt()) * (v + 1.0) - v.sqrt()) / (v + 1.0).powi(2);
        assert_relative_eq!(at(&d, v), expected, epsilon = 1e-12);
    }

    #[test]
    fn derivative_of_symbolic_exponent() {
        // d/dx 2^x = 2^x ln 2
        let e = Expr::pow(Expr::num(2.0), Expr::sym("x"));
        let d = e.diff(&x());
        assert_relative_eq!(at(&d, 1.5), 2f64.powf(1.5) * 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn derivative_without_symbol_is_zero() {
        let e = Expr::exp(Expr::sym("y"));
        assert_eq!(e.diff(&x()), Expr::num(0.0));
    }

    #[test]
    fn subs_replaces_symbols_and_folds() {
        let e = Expr::sym("a") * Expr::sym("x") + Expr::sym("b");
        let map = HashMap::from([
            (Symbol::new("a"), Expr::num(0.0)),
            (Symbol::new("b"), Expr::num(4.0)),
        ]);
        assert_eq!(e.subs(&map), Expr::num(4.0));
    }

    #[test]
    fn piecewise_selects_first_matching_branch() {
        let x_e = Expr::sym("x");
        let e = Expr::piecewise(
            vec![(Condition::new(x_e.clone(), Cmp::Lt, Expr::num(1.0)), x_e.clone())],
            Expr::num(10.0) * x_e,
        );
        assert_relative_eq!(at(&e, 0.5), 0.5);
        assert_relative_eq!(at(&e, 1.0), 10.0);
        let d = e.diff(&x());
        assert_relative_eq!(at(&d, 0.5), 1.0);
        assert_relative_eq!(at(&d, 2.0), 10.0);
    }

    #[test]
    fn free_symbols_include_conditions() {
        let e = Expr::piecewise(
            vec![(Condition::new(Expr::sym("x"), Cmp::Lt, Expr::sym("x_wa")), Expr::sym("a"))],
            Expr::sym("b"),
        );
        let names: Vec<String> = e.free_symbols().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "x", "x_wa"]);
    }

    #[test]
    fn unbound_symbol_is_an_error() {
        let e = Expr::sym("x") + Expr::sym("y");
        let err = e.eval_f64(&HashMap::from([("x", 1.0)])).unwrap_err();
        assert_eq!(err, ExprError::Unbound(Symbol::new("y")));
    }

    #[test]
    fn display_parenthesizes_by_precedence() {
        let e = (Expr::sym("a") - Expr::sym("b")) * Expr::cosh(Expr::sym("m") * Expr::sym("x"));
        assert_eq!(e.to_string(), "(a - b)*cosh(m*x)");
        let e = Expr::sym("a") - (Expr::sym("b") + Expr::sym("c"));
        assert_eq!(e.to_string(), "a - (b + c)");
    }

    #[test]
    fn display_wraps_negative_literal_operands() {
        let a = || Box::new(Expr::sym("a"));
        let num = |v: f64| Box::new(Expr::Num(v));
        assert_eq!(Expr::Sub(a(), num(-1.0)).to_string(), "a - (-1)");
        assert_eq!(Expr::Mul(a(), num(-2.0)).to_string(), "a*(-2)");
        assert_eq!(Expr::Add(a(), num(-0.5)).to_string(), "a + (-0.5)");
        assert_eq!(Expr::Neg(num(-3.0)).to_string(), "-(-3)");
        assert_eq!(Expr::Mul(num(-2.0), a()).to_string(), "-2*a");
    }

    #[test]
    fn serde_round_trip_preserves_structure() {
        let e = Expr::piecewise(
            vec![(
                Condition::new(Expr::sym("x"), Cmp::Lt, Expr::sym("x_wa")),
                Expr::sinh(Expr::sym("x")),
            )],
            Expr::pow(Expr::sym("x"), Expr::num(2.0)),
        );
        let json = serde_json::to_string(&e).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
