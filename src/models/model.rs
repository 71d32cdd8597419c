//! Compiled model callables.
//!
//! A [`Model`] is the derived expression compiled with argument order
//! `[independent, free, fixed]` and the fixed values bound in advance, so the
//! fitter only supplies `x` and the free parameters. The partial derivatives
//! with respect to each free parameter are compiled alongside for the Jacobian.

use std::collections::BTreeMap;

use crate::domain::FitParams;
use crate::math::{Scalar, UFloat};
use crate::symbolic::{Expr, ExprError, Param, Program, Symbol};

#[derive(Debug, Clone)]
pub struct Model {
    program: Program,
    gradient: Vec<Program>,
    free: Vec<Param>,
    fixed: Vec<(Param, f64)>,
}

impl Model {
    /// Compile `expr` for the free/fixed split described by `params`.
    pub fn new(expr: &Expr, params: &FitParams) -> Result<Self, ExprError> {
        let fixed_values = params.fixed_values();
        let mut fixed = Vec::with_capacity(params.fixed_params.len());
        for &p in &params.fixed_params {
            let value = fixed_values
                .get(&p)
                .copied()
                .ok_or_else(|| ExprError::Unbound(p.symbol()))?;
            fixed.push((p, value));
        }

        let args: Vec<Symbol> = params
            .independent_params
            .iter()
            .chain(&params.free_params)
            .chain(&params.fixed_params)
            .map(|p| p.symbol())
            .collect();

        let program = Program::compile(expr, &args)?;
        let gradient = params
            .free_params
            .iter()
            .map(|p| Program::compile(&expr.diff(&p.symbol()), &args))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            program,
            gradient,
            free: params.free_params.clone(),
            fixed,
        })
    }

    pub fn free_params(&self) -> &[Param] {
        &self.free
    }

    pub fn fixed_values(&self) -> &[(Param, f64)] {
        &self.fixed
    }

    fn args<S: Scalar>(&self, x: S, free: &[S]) -> Result<Vec<S>, ExprError> {
        if free.len() != self.free.len() {
            return Err(ExprError::Arity {
                expected: self.free.len(),
                got: free.len(),
            });
        }
        let mut args = Vec::with_capacity(1 + self.free.len() + self.fixed.len());
        args.push(x);
        args.extend_from_slice(free);
        args.extend(self.fixed.iter().map(|(_, v)| S::from_f64(*v)));
        Ok(args)
    }

    /// `T(x)` for free parameter values in `free_params` order.
    pub fn eval(&self, x: f64, free: &[f64]) -> Result<f64, ExprError> {
        self.program.eval(&self.args(x, free)?)
    }

    /// `T(x)` over many positions.
    pub fn eval_many(&self, xs: &[f64], free: &[f64]) -> Result<Vec<f64>, ExprError> {
        xs.iter().map(|&x| self.eval(x, free)).collect()
    }

    /// `∂T/∂p` for each free parameter, written into `out`.
    pub fn gradient(&self, x: f64, free: &[f64], out: &mut [f64]) -> Result<(), ExprError> {
        let args = self.args(x, free)?;
        for (slot, program) in out.iter_mut().zip(&self.gradient) {
            *slot = program.eval(&args)?;
        }
        Ok(())
    }

    /// Evaluate with named values, falling back to the bound fixed values.
    ///
    /// This is the keyword-style call: any parameter, fixed ones included, may
    /// be overridden.
    pub fn eval_with(&self, x: f64, values: &BTreeMap<Param, f64>) -> Result<f64, ExprError> {
        let args = self.named_args(values, |v| *v, x)?;
        self.program.eval(&args)
    }

    /// Uncertainty-aware evaluation with named values.
    ///
    /// Parameters missing from `values` take their bound fixed value with no
    /// uncertainty.
    pub fn eval_uncertain(&self, x: UFloat, values: &BTreeMap<Param, UFloat>) -> Result<UFloat, ExprError> {
        let args = self.named_args(values, |v| v.clone(), x)?;
        self.program.eval(&args)
    }

    fn named_args<V, S: Scalar>(
        &self,
        values: &BTreeMap<Param, V>,
        lift: impl Fn(&V) -> S,
        x: S,
    ) -> Result<Vec<S>, ExprError> {
        let mut args = Vec::with_capacity(self.program.args().len());
        args.push(x);
        for &p in &self.free {
            let v = values.get(&p).ok_or_else(|| ExprError::Unbound(p.symbol()))?;
            args.push(lift(v));
        }
        for &(p, fixed) in &self.fixed {
            args.push(values.get(&p).map(&lift).unwrap_or_else(|| S::from_f64(fixed)));
        }
        Ok(args)
    }
}
