//! Token generator: plans ring positions for nodes joining a datacenter.
//!
//! Allocation decisions are made only by [`TokenGenerator::growing_cluster`];
//! [`TokenGenerator::new_token`] drains the queue it fills.
//!
//! # Algorithm
//!
//! - Empty ring: `delta` tokens equally spaced around the whole ring, shifted
//!   by a fixed origin.
//! - Populated ring: repeatedly split the widest gap (including the gap that
//!   wraps from the largest token back to the smallest) at its midpoint. Each
//!   inserted token takes part in the next search, so bursts spread evenly.

use std::collections::{BTreeSet, VecDeque};

use num_bigint::{BigInt, RandBigInt};
use num_traits::Zero;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::partitioner::Partitioner;
use crate::token::{Token, TokenSpace};

/// Stateful ring-partitioning algorithm, one per datacenter.
///
/// Every token in `current_tokens ∪ next_tokens` lies inside `space`; this is
/// checked on every path that accepts tokens from outside.
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    space: TokenSpace,
    origin: BigInt,
    /// Tokens believed live.
    current_tokens: BTreeSet<Token>,
    /// Planned allocations not yet handed out, FIFO.
    next_tokens: VecDeque<Token>,
}

impl TokenGenerator {
    /// Generator over `partitioner`'s ring with a fixed origin shift.
    pub fn new(partitioner: &dyn Partitioner, origin: BigInt) -> Self {
        Self::with_space(partitioner.space(), origin)
    }

    /// Generator whose origin is drawn once, uniformly from `[0, range)`.
    pub fn with_random_origin(partitioner: &dyn Partitioner) -> Self {
        let space = partitioner.space();
        let origin = rand::thread_rng().gen_bigint_range(&BigInt::zero(), space.range());
        Self::with_space(space, origin)
    }

    /// Uses `shift` as the origin when configured, a random one otherwise.
    pub fn from_shift(partitioner: &dyn Partitioner, shift: Option<BigInt>) -> Self {
        match shift {
            Some(origin) => Self::new(partitioner, origin),
            None => Self::with_random_origin(partitioner),
        }
    }

    pub fn with_space(space: TokenSpace, origin: BigInt) -> Self {
        Self {
            space,
            origin,
            current_tokens: BTreeSet::new(),
            next_tokens: VecDeque::new(),
        }
    }

    pub fn space(&self) -> &TokenSpace {
        &self.space
    }

    pub fn origin(&self) -> &BigInt {
        &self.origin
    }

    pub fn current_tokens(&self) -> &BTreeSet<Token> {
        &self.current_tokens
    }

    /// Planned but not yet handed out, in hand-out order.
    pub fn pending_tokens(&self) -> impl Iterator<Item = &Token> {
        self.next_tokens.iter()
    }

    /// Hands out the next planned token, recording it as live.
    ///
    /// Returns `None` when nothing is planned: the node picks its own position.
    pub fn new_token(&mut self) -> Option<Token> {
        let token = self.next_tokens.pop_front()?;
        self.current_tokens.insert(token.clone());
        Some(token)
    }

    /// Plans `delta` more allocations, appended to the pending queue.
    ///
    /// Fails with [`Error::RingExhausted`] (planning nothing) if some
    /// insertion would find no gap of at least two positions.
    pub fn growing_cluster(&mut self, delta: usize) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        let planned = if self.current_tokens.is_empty() && self.next_tokens.is_empty() {
            self.equidistant(delta)
        } else {
            self.split_widest_gaps(delta)?
        };
        debug!(
            delta,
            live = self.current_tokens.len(),
            pending = self.next_tokens.len() + planned.len(),
            "planned token allocations"
        );
        self.next_tokens.extend(planned);
        Ok(())
    }

    fn equidistant(&self, delta: usize) -> Vec<Token> {
        let n = BigInt::from(delta);
        (0..delta)
            .map(|i| {
                let offset = self.space.range() * BigInt::from(i) / &n;
                self.space.normalize(self.space.min() + offset + &self.origin)
            })
            .collect()
    }

    fn split_widest_gaps(&self, delta: usize) -> Result<Vec<Token>> {
        let mut ring: BTreeSet<Token> = self
            .current_tokens
            .iter()
            .chain(self.next_tokens.iter())
            .cloned()
            .collect();
        let mut planned = Vec::with_capacity(delta);
        let two = BigInt::from(2);
        for _ in 0..delta {
            let (start, gap) = widest_gap(&self.space, &ring).ok_or(Error::RingExhausted)?;
            if gap < two {
                return Err(Error::RingExhausted);
            }
            let token = self.space.midpoint(&start, &gap);
            trace!(%start, %gap, %token, "splitting widest gap");
            ring.insert(token.clone());
            planned.push(token);
        }
        Ok(planned)
    }

    /// Forgets the given tokens.
    pub fn shrinking_cluster(&mut self, tokens: &BTreeSet<Token>) {
        for token in tokens {
            self.current_tokens.remove(token);
        }
    }

    /// Adds tokens a node already owns. All or nothing: an out-of-range token
    /// leaves the live set untouched.
    pub fn record_tokens(&mut self, tokens: &BTreeSet<Token>) -> Result<()> {
        for token in tokens {
            self.space.check(token)?;
        }
        self.current_tokens.extend(tokens.iter().cloned());
        Ok(())
    }

    /// Replaces the live set wholesale with ground truth.
    pub fn refresh(&mut self, tokens: BTreeSet<Token>) -> Result<()> {
        for token in &tokens {
            self.space.check(token)?;
        }
        self.current_tokens = tokens;
        Ok(())
    }

    /// Position a fresh node takes to stand in for the owner of `old`:
    /// one step counter-clockwise, wrapping `min` to `max`.
    pub fn token_for_replacement_node(&self, old: &Token) -> Result<Token> {
        self.space.check(old)?;
        Ok(self.space.normalize(old.value() - BigInt::from(1)))
    }

    pub fn tokens_for_replacement_node(&self, old: &BTreeSet<Token>) -> Result<BTreeSet<Token>> {
        old.iter()
            .map(|t| self.token_for_replacement_node(t))
            .collect()
    }
}

/// Start and length of the widest clockwise gap; ties go to the lowest start.
/// A lone token owns the whole ring.
fn widest_gap(space: &TokenSpace, ring: &BTreeSet<Token>) -> Option<(Token, BigInt)> {
    let first = ring.iter().next()?;
    if ring.len() == 1 {
        return Some((first.clone(), space.range().clone()));
    }
    let mut best: Option<(&Token, BigInt)> = None;
    for (from, to) in ring.iter().zip(ring.iter().skip(1).chain(std::iter::once(first))) {
        let gap = space.distance(from, to);
        if best.as_ref().map_or(true, |(_, widest)| gap > *widest) {
            best = Some((from, gap));
        }
    }
    best.map(|(start, gap)| (start.clone(), gap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::PartitionerKind;

    fn small(origin: i64) -> TokenGenerator {
        TokenGenerator::with_space(TokenSpace::new(0, 999).unwrap(), BigInt::from(origin))
    }

    fn drain(generator: &mut TokenGenerator) -> Vec<Token> {
        std::iter::from_fn(|| generator.new_token()).collect()
    }

    #[test]
    fn test_new_token_empty_queue() {
        let mut generator = small(0);
        assert_eq!(generator.new_token(), None);
    }

    #[test]
    fn test_equidistant_with_origin() {
        let mut generator = small(10);
        generator.growing_cluster(4).unwrap();
        let tokens = drain(&mut generator);
        let expected: Vec<Token> = [10i64, 260, 510, 760].into_iter().map(Token::from).collect();
        assert_eq!(tokens, expected);
        assert_eq!(generator.current_tokens().len(), 4);
    }

    #[test]
    fn test_origin_wraps() {
        let mut generator = small(900);
        generator.growing_cluster(2).unwrap();
        assert_eq!(drain(&mut generator), vec![Token::from(900i64), Token::from(400i64)]);
    }

    #[test]
    fn test_best_gap_prefers_wraparound() {
        let mut generator = small(0);
        generator
            .refresh([Token::from(0i64), Token::from(100i64)].into_iter().collect())
            .unwrap();
        generator.growing_cluster(1).unwrap();
        assert_eq!(generator.new_token(), Some(Token::from(550i64)));
    }

    #[test]
    fn test_best_gap_burst_spreads() {
        let mut generator = small(0);
        generator.refresh([Token::from(0i64)].into_iter().collect()).unwrap();
        generator.growing_cluster(3).unwrap();
        // 0 -> 500 (whole ring), then 0..500 split at 250, then 500..1000 at 750
        assert_eq!(
            drain(&mut generator),
            vec![Token::from(500i64), Token::from(250i64), Token::from(750i64)]
        );
    }

    #[test]
    fn test_pending_tokens_count_as_members() {
        let mut generator = small(0);
        generator.growing_cluster(2).unwrap();
        // 0 and 500 pending; next split lands in the first widest gap
        generator.growing_cluster(1).unwrap();
        let pending: Vec<_> = generator.pending_tokens().cloned().collect();
        assert_eq!(pending, vec![Token::from(0i64), Token::from(500i64), Token::from(250i64)]);
    }

    #[test]
    fn test_exhausted_ring_plans_nothing() {
        let mut generator =
            TokenGenerator::with_space(TokenSpace::new(0, 3).unwrap(), BigInt::from(0));
        generator
            .refresh((0i64..4).map(Token::from).collect())
            .unwrap();
        assert_eq!(generator.growing_cluster(1), Err(Error::RingExhausted));
        assert_eq!(generator.pending_tokens().count(), 0);
    }

    #[test]
    fn test_replacement_token() {
        let generator = TokenGenerator::new(&PartitionerKind::Random, BigInt::from(0));
        assert_eq!(
            generator.token_for_replacement_node(&Token::from(0u64)).unwrap(),
            Token::from(u128::MAX >> 1)
        );
        assert_eq!(
            generator.token_for_replacement_node(&Token::from(77u64)).unwrap(),
            Token::from(76u64)
        );
        assert!(generator.token_for_replacement_node(&Token::from(-1i64)).is_err());
    }

    #[test]
    fn test_shrink_and_refresh() {
        let mut generator = small(0);
        generator.growing_cluster(2).unwrap();
        drain(&mut generator);
        generator.shrinking_cluster(&[Token::from(0i64)].into_iter().collect());
        assert_eq!(
            generator.current_tokens().iter().cloned().collect::<Vec<_>>(),
            vec![Token::from(500i64)]
        );
        assert!(generator
            .refresh([Token::from(1000i64)].into_iter().collect())
            .is_err());
    }

    #[test]
    fn test_record_tokens_is_atomic() {
        let mut generator = small(0);
        generator
            .record_tokens(&[Token::from(100i64)].into_iter().collect())
            .unwrap();
        let mixed: BTreeSet<Token> = [Token::from(200i64), Token::from(1000i64)].into_iter().collect();
        assert!(generator.record_tokens(&mixed).is_err());
        assert_eq!(
            generator.current_tokens().iter().cloned().collect::<Vec<_>>(),
            vec![Token::from(100i64)]
        );

        // recorded tokens steer growth away from themselves
        generator.growing_cluster(1).unwrap();
        assert_eq!(generator.new_token(), Some(Token::from(600i64)));
    }
}
