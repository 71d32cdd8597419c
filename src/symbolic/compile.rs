//! Compile expressions into flat stack programs ("lambdify").
//!
//! A [`Program`] fixes the argument order once, so evaluating it is a single
//! linear pass over instructions with no symbol lookups. The same program can
//! be run over any [`Scalar`], which is how one compiled model serves both the
//! fitter (`f64`) and uncertainty propagation (`UFloat`).

use crate::math::Scalar;
use crate::symbolic::{Cmp, Expr, ExprError, Func, Symbol};

#[derive(Debug, Clone, PartialEq)]
enum Instr {
    Const(f64),
    Arg(usize),
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Neg,
    Call(Func),
    /// Pops `value`, `rhs`, `lhs`, `fallback`; pushes `value` when `lhs cmp rhs`
    /// holds, else `fallback`.
    Select(Cmp),
}

/// A compiled, numerically callable expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    args: Vec<Symbol>,
    instrs: Vec<Instr>,
    max_depth: usize,
}

impl Program {
    /// Compile `expr` with the given positional argument order.
    ///
    /// Every free symbol of `expr` must appear in `args`. Extra arguments are
    /// allowed and simply ignored.
    pub fn compile(expr: &Expr, args: &[Symbol]) -> Result<Self, ExprError> {
        if let Some(missing) = expr.free_symbols().into_iter().find(|s| !args.contains(s)) {
            return Err(ExprError::Unbound(missing));
        }

        let mut program = Program {
            args: args.to_vec(),
            instrs: Vec::new(),
            max_depth: 0,
        };
        let mut depth = 0usize;
        program.emit(expr, &mut depth)?;
        Ok(program)
    }

    pub fn args(&self) -> &[Symbol] {
        &self.args
    }

    fn push(&mut self, instr: Instr, depth: &mut usize, delta: isize) {
        self.instrs.push(instr);
        *depth = depth.saturating_add_signed(delta);
        self.max_depth = self.max_depth.max(*depth);
    }

    fn emit(&mut self, expr: &Expr, depth: &mut usize) -> Result<(), ExprError> {
        match expr {
            Expr::Num(v) => self.push(Instr::Const(*v), depth, 1),
            Expr::Sym(s) => {
                let idx = self
                    .args
                    .iter()
                    .position(|a| a == s)
                    .ok_or_else(|| ExprError::Unbound(s.clone()))?;
                self.push(Instr::Arg(idx), depth, 1);
            }
            Expr::Add(a, b) => self.emit_binary(a, b, Instr::Add, depth)?,
            Expr::Sub(a, b) => self.emit_binary(a, b, Instr::Sub, depth)?,
            Expr::Mul(a, b) => self.emit_binary(a, b, Instr::Mul, depth)?,
            Expr::Div(a, b) => self.emit_binary(a, b, Instr::Div, depth)?,
            Expr::Pow(a, b) => self.emit_binary(a, b, Instr::Pow, depth)?,
            Expr::Neg(a) => {
                self.emit(a, depth)?;
                self.push(Instr::Neg, depth, 0);
            }
            Expr::Call(func, a) => {
                self.emit(a, depth)?;
                self.push(Instr::Call(*func), depth, 0);
            }
            Expr::Piecewise {
                branches,
                otherwise,
            } => {
                // Fold from the last branch backwards so the first matching
                // branch ends up outermost.
                self.emit(otherwise, depth)?;
                for (cond, value) in branches.iter().rev() {
                    self.emit(&cond.lhs, depth)?;
                    self.emit(&cond.rhs, depth)?;
                    self.emit(value, depth)?;
                    self.push(Instr::Select(cond.cmp), depth, -3);
                }
            }
        }
        Ok(())
    }

    fn emit_binary(&mut self, a: &Expr, b: &Expr, instr: Instr, depth: &mut usize) -> Result<(), ExprError> {
        self.emit(a, depth)?;
        self.emit(b, depth)?;
        self.push(instr, depth, -1);
        Ok(())
    }

    /// Evaluate with positional arguments.
    pub fn eval<S: Scalar>(&self, args: &[S]) -> Result<S, ExprError> {
        if args.len() != self.args.len() {
            return Err(ExprError::Arity {
                expected: self.args.len(),
                got: args.len(),
            });
        }

        let mut stack: Vec<S> = Vec::with_capacity(self.max_depth);
        for instr in &self.instrs {
            match instr {
                Instr::Const(v) => stack.push(S::from_f64(*v)),
                Instr::Arg(i) => stack.push(args[*i].clone()),
                Instr::Add | Instr::Sub | Instr::Mul | Instr::Div | Instr::Pow => {
                    let b = pop(&mut stack)?;
                    let a = pop(&mut stack)?;
                    stack.push(match instr {
                        Instr::Add => a + b,
                        Instr::Sub => a - b,
                        Instr::Mul => a * b,
                        Instr::Div => a / b,
                        _ => a.powf(&b),
                    });
                }
                Instr::Neg => {
                    let a = pop(&mut stack)?;
                    stack.push(-a);
                }
                Instr::Call(func) => {
                    let a = pop(&mut stack)?;
                    stack.push(func.apply(&a));
                }
                Instr::Select(cmp) => {
                    let value = pop(&mut stack)?;
                    let rhs = pop(&mut stack)?;
                    let lhs = pop(&mut stack)?;
                    let fallback = pop(&mut stack)?;
                    stack.push(if cmp.holds(lhs.value(), rhs.value()) {
                        value
                    } else {
                        fallback
                    });
                }
            }
        }

        let result = pop(&mut stack)?;
        if stack.is_empty() {
            Ok(result)
        } else {
            Err(ExprError::Malformed)
        }
    }
}

fn pop<S>(stack: &mut Vec<S>) -> Result<S, ExprError> {
    stack.pop().ok_or(ExprError::Malformed)
}
