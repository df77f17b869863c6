//! Symbolic ranges: a pair of expressions bounding a value.

use crate::expr::{Expr, ExprPool};
use core::fmt;

/// A closed symbolic interval `[lower, upper]`.
///
/// Both bounds live in an `ExprPool`; two ranges are equal exactly when their
/// interned bounds are. The bottom range `[_BOT_, _BOT_]` marks a value that
/// has not been evaluated yet.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Range {
    /// Lower bound.
    pub lower: Expr,
    /// Upper bound.
    pub upper: Expr,
}

impl Range {
    /// The range `[lower, upper]`.
    pub fn new(lower: Expr, upper: Expr) -> Self {
        Self { lower, upper }
    }

    /// The degenerate range `[e, e]`.
    pub fn exact(e: Expr) -> Self {
        Self { lower: e, upper: e }
    }

    /// The bottom range of `pool`.
    pub fn bottom(pool: &ExprPool) -> Self {
        Self::exact(pool.bottom())
    }

    /// Is this the bottom range?
    pub fn is_bottom(&self, pool: &ExprPool) -> bool {
        pool.is_bottom(self.lower) && pool.is_bottom(self.upper)
    }

    /// Interval addition: `[l1 + l2, u1 + u2]`.
    pub fn add(self, other: Range, pool: &mut ExprPool) -> Range {
        Range {
            lower: pool.add(self.lower, other.lower),
            upper: pool.add(self.upper, other.upper),
        }
    }

    /// Interval subtraction: `[l1 - u2, u1 - l2]`.
    pub fn sub(self, other: Range, pool: &mut ExprPool) -> Range {
        Range {
            lower: pool.sub(self.lower, other.upper),
            upper: pool.sub(self.upper, other.lower),
        }
    }

    /// Interval multiplication: the minimum and maximum of the four endpoint
    /// products. With symbolic endpoints the extrema usually stay symbolic
    /// `min`/`max` expressions.
    pub fn mul(self, other: Range, pool: &mut ExprPool) -> Range {
        let products = [
            pool.mul(self.lower, other.lower),
            pool.mul(self.lower, other.upper),
            pool.mul(self.upper, other.lower),
            pool.mul(self.upper, other.upper),
        ];
        Range {
            lower: fold(pool, &products, ExprPool::min),
            upper: fold(pool, &products, ExprPool::max),
        }
    }

    /// Interval division: the minimum and maximum of the four endpoint
    /// quotients. `unsigned` is recorded on any quotient that stays
    /// symbolic. Callers are expected to have widened away infinite bounds
    /// first; a denominator interval spanning zero is not detected.
    pub fn div(self, other: Range, unsigned: bool, pool: &mut ExprPool) -> Range {
        let quotients = [
            pool.div(self.lower, other.lower, unsigned),
            pool.div(self.lower, other.upper, unsigned),
            pool.div(self.upper, other.lower, unsigned),
            pool.div(self.upper, other.upper, unsigned),
        ];
        Range {
            lower: fold(pool, &quotients, ExprPool::min),
            upper: fold(pool, &quotients, ExprPool::max),
        }
    }

    /// A displayable wrapper rendering `[lower, upper]`.
    pub fn display<'a>(&self, pool: &'a ExprPool) -> DisplayRange<'a> {
        DisplayRange { pool, range: *self }
    }
}

fn fold(pool: &mut ExprPool, parts: &[Expr], op: fn(&mut ExprPool, Expr, Expr) -> Expr) -> Expr {
    let mut acc = parts[0];
    for &p in &parts[1..] {
        acc = op(pool, acc, p);
    }
    acc
}

/// Wrapper for human-readable range output.
pub struct DisplayRange<'a> {
    pool: &'a ExprPool,
    range: Range,
}

impl<'a> fmt::Display for DisplayRange<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.pool.display(self.range.lower),
            self.pool.display(self.range.upper)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_arithmetic() {
        let mut p = ExprPool::new();
        let three = Range::exact(p.number_i64(3));
        let four = Range::exact(p.number_i64(4));
        let seven = three.add(four, &mut p);
        assert_eq!(seven, Range::exact(p.number_i64(7)));
        let twelve = three.mul(four, &mut p);
        assert_eq!(twelve, Range::exact(p.number_i64(12)));
    }

    #[test]
    fn symbolic_add_sub() {
        let mut p = ExprPool::new();
        let a = p.symbol("a");
        let b = p.symbol("b");
        let one = p.one();
        let ra = Range::exact(a);
        let rb = Range::new(p.sub(b, one), b);

        let sum = ra.add(rb, &mut p);
        let a_plus_b = p.add(a, b);
        let expect_lo = p.sub(a_plus_b, one);
        assert_eq!(sum.lower, expect_lo);
        assert_eq!(sum.upper, a_plus_b);

        let diff = ra.sub(rb, &mut p);
        let a_minus_b = p.sub(a, b);
        assert_eq!(diff.lower, a_minus_b);
        let b_minus_1 = p.sub(b, one);
        let expect_hi = p.sub(a, b_minus_1);
        assert_eq!(diff.upper, expect_hi);
    }

    #[test]
    fn numeric_interval_mul() {
        let mut p = ExprPool::new();
        let r1 = Range::new(p.number_i64(-2), p.number_i64(3));
        let r2 = Range::new(p.number_i64(4), p.number_i64(5));
        let prod = r1.mul(r2, &mut p);
        assert_eq!(prod.lower, p.number_i64(-10));
        assert_eq!(prod.upper, p.number_i64(15));
    }

    #[test]
    fn numeric_interval_div() {
        let mut p = ExprPool::new();
        let r1 = Range::new(p.number_i64(8), p.number_i64(12));
        let r2 = Range::new(p.number_i64(2), p.number_i64(4));
        let q = r1.div(r2, false, &mut p);
        assert_eq!(q.lower, p.number_i64(2));
        assert_eq!(q.upper, p.number_i64(6));
    }

    #[test]
    fn bottom_and_display() {
        let mut p = ExprPool::new();
        let bot = Range::bottom(&p);
        assert!(bot.is_bottom(&p));
        let a = p.symbol("a");
        let one = p.one();
        let r = Range::new(a, p.sub(a, one));
        assert_eq!(r.display(&p).to_string(), "[a, a - 1]");
    }
}
