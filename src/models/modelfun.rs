//! Derivation of the piecewise steady-state temperature profile of the rod.
//!
//! In each domain the rod behaves as a fin with radial convection:
//!
//! ```text
//! k T'' = (2 h / r) (T - T_inf)
//! ```
//!
//! with the general solution, for `m = sqrt(2 h / (k r))`,
//!
//! ```text
//! T*(x) = T_inf + (T_0 - T_inf) cosh(m (x - x_0)) + q_0 / (k m) sinh(m (x - x_0))
//! ```
//!
//! which satisfies `T*(x_0) = T_0` and `k T*'(x_0) = q_0`. Positive `q_0` is heat
//! conducted toward the origin of the domain (the boiling surface).
//!
//! The water-side solution starts at the boiling surface `x_s`. The air-side
//! solution starts at the interface `x_wa` with the temperature and flux the
//! water side reaches there, so both quantities are continuous.

use std::collections::HashMap;

use crate::symbolic::{Cmp, Condition, Expr, Intermediate, Param, Symbol};

/// The fin equation for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct FinOde {
    pub x: Symbol,
    pub k: Expr,
    pub h: Expr,
    pub r: Expr,
    pub t_inf: Expr,
}

impl FinOde {
    /// The equation for a general domain, in terms of intermediate symbols.
    pub fn general() -> Self {
        Self {
            x: Param::X.symbol(),
            k: Param::K.expr(),
            h: Intermediate::H.expr(),
            r: Param::R.expr(),
            t_inf: Intermediate::TInf.expr(),
        }
    }

    /// `m = sqrt(2 h / (k r))`
    pub fn fin_parameter(&self) -> Expr {
        Expr::sqrt(Expr::num(2.0) * self.h.clone() / (self.k.clone() * self.r.clone()))
    }

    /// Closed-form solution through `T(x_0) = t_0` with `k T'(x_0) = q_0`.
    pub fn solve(&self, x_0: Expr, t_0: Expr, q_0: Expr) -> Expr {
        let m = self.fin_parameter();
        let arg = m.clone() * (Expr::Sym(self.x.clone()) - x_0);
        self.t_inf.clone()
            + (t_0 - self.t_inf.clone()) * Expr::cosh(arg.clone())
            + q_0 / (self.k.clone() * m) * Expr::sinh(arg)
    }

    /// `k T'' - (2 h / r) (T - T_inf)` for a candidate `T`; zero for a solution.
    pub fn residual(&self, candidate: &Expr) -> Expr {
        let second = candidate.diff(&self.x).diff(&self.x);
        self.k.clone() * second
            - Expr::num(2.0) * self.h.clone() / self.r.clone() * (candidate.clone() - self.t_inf.clone())
    }
}

/// Every intermediate result of the derivation.
#[derive(Debug, Clone)]
pub struct ModelDerivation {
    pub ode: FinOde,
    /// General solution in intermediate symbols.
    pub t_int: Expr,
    /// Water-side profile.
    pub t_w: Expr,
    /// Air-side profile with interface values substituted.
    pub t_a: Expr,
    /// Interface temperature, from each side.
    pub t_wa_w: Expr,
    pub t_wa_a: Expr,
    /// Interface heat flux `k T'(x_wa)`, from each side.
    pub q_wa_w: Expr,
    pub q_wa_a: Expr,
    /// Piecewise temperature `T(x)`.
    pub t: Expr,
}

impl ModelDerivation {
    /// The final model expression.
    pub fn model(&self) -> &Expr {
        &self.t
    }
}

fn map(pairs: impl IntoIterator<Item = (Symbol, Expr)>) -> HashMap<Symbol, Expr> {
    pairs.into_iter().collect()
}

/// Derive the piecewise model.
pub fn derive() -> ModelDerivation {
    let ode = FinOde::general();
    let x = Param::X.symbol();
    let k = Param::K.expr();

    let t_int = ode.solve(
        Intermediate::X0.expr(),
        Intermediate::T0.expr(),
        Intermediate::Q0.expr(),
    );

    let t_w = t_int.subs(&map([
        (Intermediate::T0.symbol(), Param::Ts.expr()),
        (Intermediate::Q0.symbol(), Param::Qs.expr()),
        (Intermediate::TInf.symbol(), Param::TInfW.expr()),
        (Intermediate::H.symbol(), Param::Hw.expr()),
        (Intermediate::X0.symbol(), Param::Xs.expr()),
    ]));

    let t_wa_w = t_w.subs_one(&x, Param::Xwa.expr());
    let q_wa_w = (k.clone() * t_w.diff(&x)).subs_one(&x, Param::Xwa.expr());

    let t_a_general = t_int.subs(&map([
        (Intermediate::T0.symbol(), Intermediate::Twa.expr()),
        (Intermediate::Q0.symbol(), Intermediate::Qwa.expr()),
        (Intermediate::TInf.symbol(), Param::TInfA.expr()),
        (Intermediate::H.symbol(), Param::Ha.expr()),
        (Intermediate::X0.symbol(), Param::Xwa.expr()),
    ]));
    let t_a = t_a_general.subs(&map([
        (Intermediate::Twa.symbol(), t_wa_w.clone()),
        (Intermediate::Qwa.symbol(), q_wa_w.clone()),
    ]));

    let t_wa_a = t_a.subs_one(&x, Param::Xwa.expr());
    let q_wa_a = (k * t_a.diff(&x)).subs_one(&x, Param::Xwa.expr());

    let t = Expr::piecewise(
        vec![(
            Condition::new(Param::X.expr(), Cmp::Lt, Param::Xwa.expr()),
            t_w.clone(),
        )],
        t_a.clone(),
    );

    ModelDerivation {
        ode,
        t_int,
        t_w,
        t_a,
        t_wa_w,
        t_wa_a,
        q_wa_w,
        q_wa_a,
        t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeSet;

    /// A handful of physically plausible parameter sets.
    fn cases() -> Vec<HashMap<&'static str, f64>> {
        let base = [
            ("T_s", 105.0),
            ("q_s", 2e5),
            ("h_a", 12.0),
            ("h_w", 1.0),
            ("r", 0.0047625),
            ("T_infa", 25.0),
            ("T_infw", 100.0),
            ("x_s", 0.0),
            ("x_wa", 0.0381),
            ("k", 400.0),
        ];
        let mut out = Vec::new();
        for (i, &x) in [0.0, 0.02, 0.0381, 0.07, 0.1].iter().enumerate() {
            let mut m: HashMap<&str, f64> = base.into_iter().collect();
            m.insert("x", x);
            m.insert("h_a", 5.0 + 10.0 * i as f64);
            m.insert("q_s", -5e4 + 6e4 * i as f64);
            out.push(m);
        }
        out
    }

    #[test]
    fn general_solution_satisfies_ode() {
        let ode = FinOde::general();
        let d = derive();
        let residual = ode.residual(&d.t_int);
        for mut vals in cases() {
            vals.insert("h", 30.0);
            vals.insert("T_inf", 40.0);
            vals.insert("T_0", 90.0);
            vals.insert("q_0", 1.5e4);
            vals.insert("x_0", 0.01);
            let t = d.t_int.eval_f64(&vals).unwrap();
            let r = residual.eval_f64(&vals).unwrap();
            // Scale of the individual terms is ~ (2h/r)(T - T_inf).
            let scale = 2.0 * 30.0 / 0.0047625 * (t - 40.0).abs().max(1.0);
            assert!(r.abs() <= 1e-9 * scale, "residual {r} too large");
        }
    }

    #[test]
    fn general_solution_meets_initial_conditions() {
        let d = derive();
        let x = Param::X.symbol();
        let x0 = Intermediate::X0.expr();
        let at_origin = d.t_int.subs_one(&x, x0.clone());
        let flux_at_origin = (Param::K.expr() * d.t_int.diff(&x)).subs_one(&x, x0);
        let vals: HashMap<&str, f64> = [
            ("h", 8.0),
            ("k", 300.0),
            ("r", 0.004),
            ("T_inf", 20.0),
            ("T_0", 75.0),
            ("q_0", -3e4),
            ("x_0", 0.05),
        ]
        .into_iter()
        .collect();
        assert_relative_eq!(at_origin.eval_f64(&vals).unwrap(), 75.0, epsilon = 1e-9);
        assert_relative_eq!(flux_at_origin.eval_f64(&vals).unwrap(), -3e4, max_relative = 1e-12);
    }

    #[test]
    fn temperature_continuous_at_interface() {
        let d = derive();
        for vals in cases() {
            let w = d.t_wa_w.eval_f64(&vals).unwrap();
            let a = d.t_wa_a.eval_f64(&vals).unwrap();
            assert_relative_eq!(w, a, max_relative = 1e-12);
        }
    }

    #[test]
    fn temperature_gradient_continuous_at_interface() {
        let d = derive();
        for vals in cases() {
            let w = d.q_wa_w.eval_f64(&vals).unwrap();
            let a = d.q_wa_a.eval_f64(&vals).unwrap();
            assert_relative_eq!(w, a, max_relative = 1e-9);
        }
    }

    #[test]
    fn model_depends_only_on_params() {
        let d = derive();
        let expected: BTreeSet<Symbol> = Param::ALL.iter().map(|p| p.symbol()).collect();
        assert_eq!(d.model().free_symbols(), expected);
    }

    #[test]
    fn model_reproduces_surface_conditions() {
        let d = derive();
        let mut vals = cases().remove(0);
        vals.insert("x", 0.0);
        assert_relative_eq!(d.t.eval_f64(&vals).unwrap(), 105.0, epsilon = 1e-9);
    }
}
