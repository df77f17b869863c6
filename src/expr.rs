//! In-process symbolic expression backend.
//!
//! Expressions are hash-consed into a pool: every `Expr` is an index into an
//! arena, and structurally identical expressions always receive the same
//! index. Combined with the canonicalization the smart constructors perform,
//! expression equality is handle equality, which is what the solver's
//! changed/stable bookkeeping relies on.
//!
//! The representation is a rational-coefficient sum-of-products grammar with
//! opaque `min`/`max`/`div` wrappers and the sentinels `-oo`, `+oo`, `NaN`
//! and bottom:
//!
//! - sums are flattened, numeric terms folded, and like terms combined;
//! - products are flattened, coefficients folded and kept first, and products
//!   distribute over sums;
//! - `x - y` is represented as `x + (-1)*y`;
//! - `min`/`max` flatten, deduplicate, and drop any member that differs from
//!   another by a numeric constant in the dominated direction.
//!
//! The syntactic size of an expression (its recursive operand count) is
//! memoized at interning time; the solver caps bound growth with it.

use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;

/// An opaque reference to an interned expression.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expr(u32);
entity_impl!(Expr, "expr");

/// The structure of an interned expression.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ExprData {
    /// A rational constant.
    Number(BigRational),
    /// A free symbol, identified by name.
    Symbol(String),
    /// `-oo`.
    MinusInf,
    /// `+oo`.
    PlusInf,
    /// Result of undefined arithmetic such as `+oo + -oo`.
    Nan,
    /// The not-yet-evaluated placeholder state.
    Bottom,
    /// An n-ary sum. Non-numeric terms ordered by their coefficient-stripped
    /// key, at most one numeric term, kept last. Never nested.
    Add(Vec<Expr>),
    /// An n-ary product. At most one numeric coefficient, kept first; the
    /// remaining factors are sorted by handle. Never nested, never contains a
    /// sum.
    Mul(Vec<Expr>),
    /// An unevaluated quotient. The algebra treats signed and unsigned
    /// division alike; the flag only records which instruction produced the
    /// quotient, so materialization can emit the matching opcode.
    Div {
        /// Dividend.
        num: Expr,
        /// Divisor.
        den: Expr,
        /// True when the dividing instruction was `udiv`.
        unsigned: bool,
    },
    /// An n-ary minimum, flattened and deduplicated.
    Min(Vec<Expr>),
    /// An n-ary maximum, flattened and deduplicated.
    Max(Vec<Expr>),
}

/// The expression pool: arena, interner, and the constructors.
pub struct ExprPool {
    data: PrimaryMap<Expr, ExprData>,
    interner: FxHashMap<ExprData, Expr>,
    sizes: SecondaryMap<Expr, u32>,
    minus_inf: Expr,
    plus_inf: Expr,
    nan: Expr,
    bottom: Expr,
    zero: Expr,
    one: Expr,
}

impl ExprPool {
    /// Create a pool with the sentinels pre-interned.
    pub fn new() -> Self {
        let mut pool = Self {
            data: PrimaryMap::new(),
            interner: FxHashMap::default(),
            sizes: SecondaryMap::new(),
            minus_inf: Expr(0),
            plus_inf: Expr(0),
            nan: Expr(0),
            bottom: Expr(0),
            zero: Expr(0),
            one: Expr(0),
        };
        pool.minus_inf = pool.intern(ExprData::MinusInf);
        pool.plus_inf = pool.intern(ExprData::PlusInf);
        pool.nan = pool.intern(ExprData::Nan);
        pool.bottom = pool.intern(ExprData::Bottom);
        pool.zero = pool.intern(ExprData::Number(BigRational::zero()));
        pool.one = pool.intern(ExprData::Number(BigRational::one()));
        pool
    }

    fn intern(&mut self, data: ExprData) -> Expr {
        if let Some(&e) = self.interner.get(&data) {
            return e;
        }
        let size = match &data {
            ExprData::Number(_)
            | ExprData::Symbol(_)
            | ExprData::MinusInf
            | ExprData::PlusInf
            | ExprData::Nan
            | ExprData::Bottom => 1,
            ExprData::Add(parts)
            | ExprData::Mul(parts)
            | ExprData::Min(parts)
            | ExprData::Max(parts) => parts.iter().map(|&p| self.sizes[p]).sum(),
            ExprData::Div { num, den, .. } => self.sizes[*num] + self.sizes[*den],
        };
        let e = self.data.push(data.clone());
        self.sizes[e] = size;
        self.interner.insert(data, e);
        e
    }

    /// The structure of `e`.
    pub fn data(&self, e: Expr) -> &ExprData {
        &self.data[e]
    }

    /// The syntactic size of `e`: its recursive operand count, with every
    /// leaf counting one.
    pub fn size(&self, e: Expr) -> u32 {
        self.sizes[e]
    }

    /// `-oo`.
    pub fn minus_inf(&self) -> Expr {
        self.minus_inf
    }

    /// `+oo`.
    pub fn plus_inf(&self) -> Expr {
        self.plus_inf
    }

    /// The NaN sentinel.
    pub fn nan(&self) -> Expr {
        self.nan
    }

    /// The bottom placeholder.
    pub fn bottom(&self) -> Expr {
        self.bottom
    }

    /// The constant zero.
    pub fn zero(&self) -> Expr {
        self.zero
    }

    /// The constant one.
    pub fn one(&self) -> Expr {
        self.one
    }

    /// Intern a rational constant.
    pub fn number(&mut self, n: BigRational) -> Expr {
        self.intern(ExprData::Number(n))
    }

    /// Intern an integer constant.
    pub fn number_i64(&mut self, n: i64) -> Expr {
        self.number(BigRational::from_integer(BigInt::from(n)))
    }

    /// Intern an unsigned integer constant.
    pub fn number_u64(&mut self, n: u64) -> Expr {
        self.number(BigRational::from_integer(BigInt::from(n)))
    }

    /// Intern a free symbol.
    pub fn symbol(&mut self, name: &str) -> Expr {
        self.intern(ExprData::Symbol(name.to_string()))
    }

    /// Is `e` the `-oo` sentinel?
    pub fn is_minus_inf(&self, e: Expr) -> bool {
        e == self.minus_inf
    }

    /// Is `e` the `+oo` sentinel?
    pub fn is_plus_inf(&self, e: Expr) -> bool {
        e == self.plus_inf
    }

    /// Is `e` either infinity?
    fn is_inf(&self, e: Expr) -> bool {
        e == self.minus_inf || e == self.plus_inf
    }

    /// Is `e` the bottom placeholder?
    pub fn is_bottom(&self, e: Expr) -> bool {
        e == self.bottom
    }

    /// Is `e` the NaN sentinel?
    pub fn is_nan(&self, e: Expr) -> bool {
        e == self.nan
    }

    /// The numeric value of `e` if it is a constant.
    pub fn as_number(&self, e: Expr) -> Option<&BigRational> {
        match &self.data[e] {
            ExprData::Number(q) => Some(q),
            _ => None,
        }
    }

    fn propagated_sentinel(&self, a: Expr, b: Expr) -> Option<Expr> {
        if a == self.bottom || b == self.bottom {
            Some(self.bottom)
        } else if a == self.nan || b == self.nan {
            Some(self.nan)
        } else {
            None
        }
    }

    /// `a + b`.
    pub fn add(&mut self, a: Expr, b: Expr) -> Expr {
        if let Some(s) = self.propagated_sentinel(a, b) {
            return s;
        }
        if self.is_inf(a) || self.is_inf(b) {
            return if self.is_inf(a) && self.is_inf(b) && a != b {
                self.nan
            } else if self.is_inf(a) {
                a
            } else {
                b
            };
        }

        // Decompose both sides into (coefficient, term-key) pairs and combine
        // like terms. The `None` key collects the numeric part.
        let mut terms: BTreeMap<Option<Expr>, BigRational> = BTreeMap::new();
        for side in [a, b] {
            let parts: Vec<Expr> = match &self.data[side] {
                ExprData::Add(parts) => parts.clone(),
                _ => vec![side],
            };
            for part in parts {
                let (key, coeff) = self.split_term(part);
                let entry = terms.entry(key).or_insert_with(BigRational::zero);
                *entry += coeff;
            }
        }
        terms.retain(|_, c| !c.is_zero());

        let constant = terms.remove(&None);
        let mut out = Vec::with_capacity(terms.len() + 1);
        for (key, coeff) in terms {
            let key = key.unwrap();
            out.push(self.scale_term(coeff, key));
        }
        if let Some(c) = constant {
            out.push(self.number(c));
        }
        match out.len() {
            0 => self.zero,
            1 => out[0],
            _ => self.intern(ExprData::Add(out)),
        }
    }

    /// Split a canonical term into its key (the term with the coefficient
    /// stripped) and its rational coefficient. Numbers have no key.
    fn split_term(&mut self, term: Expr) -> (Option<Expr>, BigRational) {
        match &self.data[term] {
            ExprData::Number(q) => (None, q.clone()),
            ExprData::Mul(factors) => {
                if let ExprData::Number(c) = &self.data[factors[0]] {
                    let c = c.clone();
                    let rest = factors[1..].to_vec();
                    let key = if rest.len() == 1 {
                        rest[0]
                    } else {
                        self.intern(ExprData::Mul(rest))
                    };
                    (Some(key), c)
                } else {
                    (Some(term), BigRational::one())
                }
            }
            _ => (Some(term), BigRational::one()),
        }
    }

    /// Rebuild a term from its coefficient and key.
    fn scale_term(&mut self, coeff: BigRational, key: Expr) -> Expr {
        if coeff.is_one() {
            return key;
        }
        let c = self.number(coeff);
        match &self.data[key] {
            ExprData::Mul(factors) => {
                let mut out = Vec::with_capacity(factors.len() + 1);
                out.push(c);
                out.extend_from_slice(factors);
                self.intern(ExprData::Mul(out))
            }
            _ => self.intern(ExprData::Mul(vec![c, key])),
        }
    }

    /// `-a`.
    pub fn neg(&mut self, a: Expr) -> Expr {
        let minus_one = self.number_i64(-1);
        self.mul(minus_one, a)
    }

    /// `a - b`.
    pub fn sub(&mut self, a: Expr, b: Expr) -> Expr {
        let nb = self.neg(b);
        self.add(a, nb)
    }

    /// `a * b`.
    pub fn mul(&mut self, a: Expr, b: Expr) -> Expr {
        if let Some(s) = self.propagated_sentinel(a, b) {
            return s;
        }
        if a == self.zero || b == self.zero {
            return if self.is_inf(a) || self.is_inf(b) {
                self.nan
            } else {
                self.zero
            };
        }
        if self.is_inf(a) || self.is_inf(b) {
            return self.mul_inf(a, b);
        }

        // Distribute over sums so that like-term combination in `add` sees
        // every product.
        if let ExprData::Add(parts) = &self.data[a] {
            let parts = parts.clone();
            return self.distribute(&parts, b);
        }
        if let ExprData::Add(parts) = &self.data[b] {
            let parts = parts.clone();
            return self.distribute(&parts, a);
        }

        let mut coeff = BigRational::one();
        let mut factors: Vec<Expr> = Vec::new();
        for side in [a, b] {
            let parts: Vec<Expr> = match &self.data[side] {
                ExprData::Mul(parts) => parts.clone(),
                _ => vec![side],
            };
            for part in parts {
                match &self.data[part] {
                    ExprData::Number(q) => coeff *= q.clone(),
                    _ => factors.push(part),
                }
            }
        }
        if coeff.is_zero() {
            return self.zero;
        }
        factors.sort();
        if factors.is_empty() {
            return self.number(coeff);
        }
        if coeff.is_one() {
            return if factors.len() == 1 {
                factors[0]
            } else {
                self.intern(ExprData::Mul(factors))
            };
        }
        let c = self.number(coeff);
        let mut out = Vec::with_capacity(factors.len() + 1);
        out.push(c);
        out.extend(factors);
        self.intern(ExprData::Mul(out))
    }

    fn distribute(&mut self, parts: &[Expr], factor: Expr) -> Expr {
        let mut acc = self.zero;
        for &part in parts {
            let p = self.mul(part, factor);
            acc = self.add(acc, p);
        }
        acc
    }

    /// Multiply when at least one side is an infinity. The sign of the other
    /// side must be determined for the result to be an infinity; a product
    /// with a sign-indeterminate factor is NaN.
    fn mul_inf(&mut self, a: Expr, b: Expr) -> Expr {
        let sign_of = |pool: &Self, e: Expr| -> Option<bool> {
            // true = negative
            if e == pool.minus_inf {
                Some(true)
            } else if e == pool.plus_inf {
                Some(false)
            } else {
                match &pool.data[e] {
                    ExprData::Number(q) => Some(q.is_negative()),
                    _ => None,
                }
            }
        };
        match (sign_of(self, a), sign_of(self, b)) {
            (Some(na), Some(nb)) => {
                if na == nb {
                    self.plus_inf
                } else {
                    self.minus_inf
                }
            }
            _ => self.nan,
        }
    }

    /// `a / b`. Quotients that fold stay exact rationals regardless of
    /// `unsigned`; the flag survives only on opaque quotient nodes.
    pub fn div(&mut self, a: Expr, b: Expr, unsigned: bool) -> Expr {
        if let Some(s) = self.propagated_sentinel(a, b) {
            return s;
        }
        if b == self.one {
            return a;
        }
        if b == self.zero {
            return self.nan;
        }
        if a == self.zero && !self.is_inf(b) {
            return self.zero;
        }
        if let (ExprData::Number(qa), ExprData::Number(qb)) = (&self.data[a], &self.data[b]) {
            let q = qa.clone() / qb.clone();
            return self.number(q);
        }
        if self.is_inf(a) {
            if let ExprData::Number(q) = &self.data[b] {
                return if q.is_negative() == (a == self.minus_inf) {
                    self.plus_inf
                } else {
                    self.minus_inf
                };
            }
        }
        if self.is_inf(b) && matches!(self.data[a], ExprData::Number(_)) {
            return self.zero;
        }
        self.intern(ExprData::Div {
            num: a,
            den: b,
            unsigned,
        })
    }

    /// `min(a, b)`.
    pub fn min(&mut self, a: Expr, b: Expr) -> Expr {
        self.extremum(a, b, true)
    }

    /// `max(a, b)`.
    pub fn max(&mut self, a: Expr, b: Expr) -> Expr {
        self.extremum(a, b, false)
    }

    fn extremum(&mut self, a: Expr, b: Expr, is_min: bool) -> Expr {
        if a == b {
            return a;
        }
        if let Some(s) = self.propagated_sentinel(a, b) {
            return s;
        }
        let (dominant, neutral) = if is_min {
            (self.minus_inf, self.plus_inf)
        } else {
            (self.plus_inf, self.minus_inf)
        };
        if a == dominant || b == dominant {
            return dominant;
        }
        if a == neutral {
            return b;
        }
        if b == neutral {
            return a;
        }

        let mut members: Vec<Expr> = Vec::new();
        for side in [a, b] {
            let parts: Vec<Expr> = match &self.data[side] {
                ExprData::Min(parts) if is_min => parts.clone(),
                ExprData::Max(parts) if !is_min => parts.clone(),
                _ => vec![side],
            };
            for part in parts {
                self.admit_member(&mut members, part, is_min);
            }
        }
        members.sort();
        members.dedup();
        match members.len() {
            1 => members[0],
            _ => {
                if is_min {
                    self.intern(ExprData::Min(members))
                } else {
                    self.intern(ExprData::Max(members))
                }
            }
        }
    }

    /// Add `candidate` to the member list of a min/max, dropping whichever
    /// side of a numerically comparable pair is dominated.
    fn admit_member(&mut self, members: &mut Vec<Expr>, candidate: Expr, is_min: bool) {
        let mut keep = true;
        members.retain(|&m| {
            if !keep {
                return true;
            }
            let diff = self.sub(candidate, m);
            match self.as_number(diff) {
                Some(q) => {
                    let candidate_wins = if is_min {
                        q.is_negative()
                    } else {
                        q.is_positive()
                    };
                    if candidate_wins {
                        // Existing member is dominated.
                        false
                    } else {
                        keep = false;
                        true
                    }
                }
                None => true,
            }
        });
        if keep {
            members.push(candidate);
        }
    }

    /// A displayable wrapper for `e`.
    pub fn display(&self, e: Expr) -> DisplayExpr<'_> {
        DisplayExpr { pool: self, expr: e }
    }
}

/// Wrapper for human-readable expression output.
pub struct DisplayExpr<'a> {
    pool: &'a ExprPool,
    expr: Expr,
}

impl<'a> DisplayExpr<'a> {
    fn write(&self, f: &mut fmt::Formatter, e: Expr) -> fmt::Result {
        let pool = self.pool;
        match pool.data(e) {
            ExprData::Number(q) => write_number(f, q),
            ExprData::Symbol(s) => f.write_str(s),
            ExprData::MinusInf => f.write_str("-oo"),
            ExprData::PlusInf => f.write_str("+oo"),
            ExprData::Nan => f.write_str("NaN"),
            ExprData::Bottom => f.write_str("_BOT_"),
            ExprData::Add(parts) => {
                for (i, &part) in parts.iter().enumerate() {
                    if i == 0 {
                        self.write(f, part)?;
                        continue;
                    }
                    if let Some((abs, rest)) = self.negative_term(part) {
                        f.write_str(" - ")?;
                        self.write_scaled(f, abs, rest)?;
                    } else {
                        f.write_str(" + ")?;
                        self.write(f, part)?;
                    }
                }
                Ok(())
            }
            ExprData::Mul(parts) => {
                for (i, &part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("*")?;
                    }
                    if matches!(pool.data(part), ExprData::Div { .. }) {
                        f.write_str("(")?;
                        self.write(f, part)?;
                        f.write_str(")")?;
                    } else {
                        self.write(f, part)?;
                    }
                }
                Ok(())
            }
            ExprData::Div { num, den, .. } => {
                let parens = |x: Expr| {
                    matches!(
                        pool.data(x),
                        ExprData::Add(_) | ExprData::Mul(_) | ExprData::Div { .. }
                    )
                };
                if parens(*num) {
                    write!(f, "({})", pool.display(*num))?;
                } else {
                    self.write(f, *num)?;
                }
                f.write_str("/")?;
                if parens(*den) {
                    write!(f, "({})", pool.display(*den))
                } else {
                    self.write(f, *den)
                }
            }
            ExprData::Min(parts) | ExprData::Max(parts) => {
                f.write_str(if matches!(pool.data(e), ExprData::Min(_)) {
                    "min("
                } else {
                    "max("
                })?;
                for (i, &part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.write(f, part)?;
                }
                f.write_str(")")
            }
        }
    }

    /// If `term` is negative (a negative number, or a product with a negative
    /// coefficient), return its absolute numeric part and remaining factors.
    fn negative_term(&self, term: Expr) -> Option<(BigRational, Vec<Expr>)> {
        match self.pool.data(term) {
            ExprData::Number(q) if q.is_negative() => Some((-q.clone(), Vec::new())),
            ExprData::Mul(parts) => match self.pool.data(parts[0]) {
                ExprData::Number(q) if q.is_negative() => {
                    Some((-q.clone(), parts[1..].to_vec()))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn write_scaled(&self, f: &mut fmt::Formatter, abs: BigRational, rest: Vec<Expr>) -> fmt::Result {
        if rest.is_empty() {
            return write_number(f, &abs);
        }
        if !abs.is_one() {
            write_number(f, &abs)?;
            f.write_str("*")?;
        }
        for (i, &part) in rest.iter().enumerate() {
            if i > 0 {
                f.write_str("*")?;
            }
            self.write(f, part)?;
        }
        Ok(())
    }
}

fn write_number(f: &mut fmt::Formatter, q: &BigRational) -> fmt::Result {
    if q.is_integer() {
        write!(f, "{}", q.numer())
    } else {
        write!(f, "{}/{}", q.numer(), q.denom())
    }
}

impl<'a> fmt::Display for DisplayExpr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write(f, self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(pool: &ExprPool, e: Expr) -> String {
        pool.display(e).to_string()
    }

    #[test]
    fn numbers_fold() {
        let mut p = ExprPool::new();
        let three = p.number_i64(3);
        let four = p.number_i64(4);
        let seven = p.add(three, four);
        assert_eq!(p.as_number(seven).unwrap(), &BigRational::from_integer(7.into()));
        let twelve = p.mul(three, four);
        assert_eq!(text(&p, twelve), "12");
        let two = p.number_i64(2);
        let q = p.div(seven, two, false);
        assert_eq!(text(&p, q), "7/2");
    }

    #[test]
    fn like_terms_combine() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let two_a = p.add(a, a);
        assert_eq!(text(&p, two_a), "2*a");
        let zero = p.sub(two_a, two_a);
        assert_eq!(zero, p.zero());
    }

    #[test]
    fn sub_then_add_cancels() {
        let mut p = ExprPool::new();
        let n = p.symbol("n");
        let one = p.one();
        let n_minus_1 = p.sub(n, one);
        assert_eq!(text(&p, n_minus_1), "n - 1");
        let back = p.add(n_minus_1, one);
        assert_eq!(back, n);
    }

    #[test]
    fn products_distribute() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let one = p.one();
        let a1 = p.add(a, one);
        let two = p.number_i64(2);
        let d = p.mul(two, a1);
        assert_eq!(text(&p, d), "2*a + 2");
    }

    #[test]
    fn canonical_handles_are_equal() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let b = p.symbol("b");
        let x = p.sub(a, b);
        let y = p.sub(a, b);
        assert_eq!(x, y);
        let m1 = p.mul(a, b);
        let m2 = p.mul(b, a);
        assert_eq!(m1, m2);
    }

    #[test]
    fn infinities() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let five = p.number_i64(5);
        let pinf = p.plus_inf();
        let minf = p.minus_inf();

        assert_eq!(p.add(pinf, five), pinf);
        assert_eq!(p.add(minf, a), minf);
        assert_eq!(p.add(pinf, minf), p.nan());
        let neg = p.number_i64(-1);
        assert_eq!(p.mul(neg, pinf), minf);
        assert_eq!(p.mul(p.zero(), pinf), p.nan());
        assert_eq!(p.mul(a, pinf), p.nan());
        assert_eq!(p.min(minf, a), minf);
        assert_eq!(p.min(pinf, a), a);
        assert_eq!(p.max(pinf, a), pinf);
        assert_eq!(p.max(minf, a), a);
    }

    #[test]
    fn min_max_prune_comparable_members() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let b = p.symbol("b");
        let one = p.one();
        let a1 = p.add(a, one);

        assert_eq!(p.min(a, a), a);
        assert_eq!(p.min(a, a1), a);
        assert_eq!(p.max(a, a1), a1);

        let three = p.number_i64(3);
        let five = p.number_i64(5);
        assert_eq!(p.min(three, five), three);
        assert_eq!(p.max(three, five), five);

        let m = p.min(a, b);
        assert!(matches!(p.data(m), ExprData::Min(parts) if parts.len() == 2));
        // Flattening keeps n-ary minima flat.
        let c = p.symbol("c");
        let m2 = p.min(m, c);
        assert!(matches!(p.data(m2), ExprData::Min(parts) if parts.len() == 3));
    }

    #[test]
    fn division_simplifies() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let one = p.one();
        assert_eq!(p.div(a, one, false), a);
        assert_eq!(p.div(p.zero(), a, false), p.zero());
        let two = p.number_i64(2);
        let a1 = p.add(a, one);
        let d = p.div(a1, two, false);
        assert!(matches!(p.data(d), ExprData::Div { .. }));
        assert_eq!(text(&p, d), "(a + 1)/2");
    }

    #[test]
    fn division_remembers_signedness() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let b = p.symbol("b");
        let signed = p.div(a, b, false);
        let unsigned = p.div(a, b, true);
        // Distinct handles, identical rendering.
        assert_ne!(signed, unsigned);
        assert_eq!(text(&p, signed), "a/b");
        assert_eq!(text(&p, unsigned), "a/b");
        assert!(matches!(p.data(unsigned), ExprData::Div { unsigned: true, .. }));
        // Folding ignores the flag.
        let four = p.number_i64(4);
        let two = p.number_i64(2);
        assert_eq!(p.div(four, two, true), two);
    }

    #[test]
    fn sizes() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let b = p.symbol("b");
        assert_eq!(p.size(a), 1);
        let one = p.one();
        let b1 = p.sub(b, one);
        assert_eq!(p.size(b1), 2);
        let m = p.min(a, b1);
        assert_eq!(p.size(m), 3);
        assert_eq!(p.size(p.plus_inf()), 1);
    }

    #[test]
    fn display_forms() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let b = p.symbol("b");
        let one = p.one();
        let e = p.sub(a, b);
        assert_eq!(text(&p, e), "a - b");
        let e2 = p.sub(b, one);
        assert_eq!(text(&p, e2), "b - 1");
        let two = p.number_i64(-2);
        let t = p.mul(two, b);
        let e3 = p.add(a, t);
        assert_eq!(text(&p, e3), "a - 2*b");
        let mm = p.min(a, b);
        assert_eq!(text(&p, mm), "min(a, b)");
        assert_eq!(text(&p, p.bottom()), "_BOT_");
        assert_eq!(text(&p, p.minus_inf()), "-oo");
    }
}
