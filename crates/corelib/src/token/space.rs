//! The modular integer space tokens live in.

use num_bigint::BigInt;
use num_traits::{One, Signed};

use crate::error::{Error, Result};
use crate::token::Token;

/// Closed interval `[min, max]` treated as a ring of `max - min + 1` positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSpace {
    min: BigInt,
    max: BigInt,
    range: BigInt,
}

impl TokenSpace {
    pub fn new(min: impl Into<BigInt>, max: impl Into<BigInt>) -> Result<Self> {
        let min = min.into();
        let max = max.into();
        if max < min {
            return Err(Error::InvalidConfig(format!(
                "token space max {} is below min {}",
                max, min
            )));
        }
        Ok(Self::from_ordered(min, max))
    }

    /// Caller guarantees `min <= max`.
    pub(crate) fn from_ordered(min: BigInt, max: BigInt) -> Self {
        let range = &max - &min + BigInt::one();
        Self { min, max, range }
    }

    pub fn min(&self) -> &BigInt {
        &self.min
    }

    pub fn max(&self) -> &BigInt {
        &self.max
    }

    /// Number of positions on the ring (`max - min + 1`).
    pub fn range(&self) -> &BigInt {
        &self.range
    }

    pub fn min_token(&self) -> Token {
        Token::new(self.min.clone())
    }

    pub fn max_token(&self) -> Token {
        Token::new(self.max.clone())
    }

    pub fn contains(&self, token: &Token) -> bool {
        let v = token.value();
        v >= &self.min && v <= &self.max
    }

    /// Fails with [`Error::TokenOutOfRange`] unless `token` lies on this ring.
    pub fn check(&self, token: &Token) -> Result<()> {
        if self.contains(token) {
            Ok(())
        } else {
            Err(Error::TokenOutOfRange {
                token: token.to_string(),
                min: self.min.to_string(),
                max: self.max.to_string(),
            })
        }
    }

    /// Wraps an arbitrary integer back onto the ring.
    pub fn normalize(&self, value: BigInt) -> Token {
        let mut offset = (value - &self.min) % &self.range;
        if offset.is_negative() {
            offset += &self.range;
        }
        Token::new(offset + &self.min)
    }

    /// Clockwise distance from `from` to `to`, in `[0, range)`.
    pub fn distance(&self, from: &Token, to: &Token) -> BigInt {
        let diff = to.value() - from.value();
        if diff.is_negative() {
            diff + &self.range
        } else {
            diff
        }
    }

    /// Midpoint of the clockwise arc starting at `from` that is `gap` long.
    pub fn midpoint(&self, from: &Token, gap: &BigInt) -> Token {
        let half = gap / BigInt::from(2);
        self.normalize(from.value() + half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> TokenSpace {
        TokenSpace::new(0, 999).unwrap()
    }

    #[test]
    fn test_range() {
        assert_eq!(small().range(), &BigInt::from(1000));
        let signed = TokenSpace::new(i64::MIN, i64::MAX).unwrap();
        assert_eq!(signed.range(), &(BigInt::one() << 64));
    }

    #[test]
    fn test_normalize_wraps_both_ways() {
        let space = small();
        assert_eq!(space.normalize(BigInt::from(1000)), Token::from(0i64));
        assert_eq!(space.normalize(BigInt::from(-1)), Token::from(999i64));
        assert_eq!(space.normalize(BigInt::from(2501)), Token::from(501i64));
        assert_eq!(space.normalize(BigInt::from(-2501)), Token::from(499i64));
    }

    #[test]
    fn test_distance_wraps() {
        let space = small();
        assert_eq!(space.distance(&Token::from(0i64), &Token::from(100i64)), BigInt::from(100));
        assert_eq!(space.distance(&Token::from(100i64), &Token::from(0i64)), BigInt::from(900));
    }

    #[test]
    fn test_check_rejects_out_of_range() {
        let space = small();
        assert!(space.check(&Token::from(999i64)).is_ok());
        assert!(matches!(
            space.check(&Token::from(1000i64)),
            Err(Error::TokenOutOfRange { .. })
        ));
        assert!(TokenSpace::new(5, 4).is_err());
    }
}
