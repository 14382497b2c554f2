//! Pair scheduler module - random pairing and elimination
//!
//! Owns the shuffled working queue and decides which two images are
//! compared next, until fewer than two images remain in the folder.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::file_ops::StorageError;

/// Identifier for a candidate image within the session folder (its file name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user's verdict on the pair currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    KeepBoth,
    DiscardLeft,
    DiscardRight,
    DiscardBoth,
}

/// What the scheduler wants shown next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPair {
    /// A normal comparison; a decision is expected back.
    Pair(ImageId, ImageId),
    /// Exactly two images are left. Informational, no decision expected.
    FinalPair(ImageId, ImageId),
    /// A single image survived the session.
    Remainder(ImageId),
    /// Nothing left to compare.
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Active,
    FinalPair,
    Ended,
}

/// Storage backing a comparison session.
///
/// The file system is the single point of truth; the scheduler re-reads
/// the listing instead of trusting its own bookkeeping.
pub trait ImageStore {
    /// Current listing of eligible images, freshly read.
    fn list_eligible(&self) -> Result<Vec<ImageId>, StorageError>;

    /// Durably remove an image from all future listings.
    fn discard(&mut self, id: &ImageId) -> Result<(), StorageError>;
}

/// Random pairing / elimination scheduler.
///
/// Each round shuffles the full current listing into a working queue and
/// drains it two at a time, so every eligible image is shown exactly once
/// per round. With an odd count the leftover image simply lands in the
/// next round's shuffle, because a rebuild always starts from a fresh
/// listing. Sessions move `Active -> FinalPair -> Ended` and never back.
pub struct PairScheduler {
    working_queue: Vec<ImageId>,
    round: u32,
    phase: SessionPhase,
    rng: StdRng,
}

impl Default for PairScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PairScheduler {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Seeded constructor for deterministic tests.
    #[cfg(test)]
    fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            working_queue: Vec::new(),
            round: 0,
            phase: SessionPhase::Active,
            rng,
        }
    }

    /// Number of the round currently being drained. Starts at 1 once the
    /// first pair has been drawn.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_ended(&self) -> bool {
        self.phase == SessionPhase::Ended
    }

    /// Decide what to show next, re-reading the listing from `store`.
    pub fn next_pair<S: ImageStore>(&mut self, store: &S) -> Result<NextPair, StorageError> {
        match self.phase {
            SessionPhase::Active => {}
            // The final pair is displayed exactly once; any further call
            // closes the session.
            SessionPhase::FinalPair | SessionPhase::Ended => {
                self.phase = SessionPhase::Ended;
                return Ok(NextPair::Ended);
            }
        }

        let mut listing = store.list_eligible()?;

        match listing.len() {
            0 => {
                self.phase = SessionPhase::Ended;
                Ok(NextPair::Ended)
            }
            1 => {
                self.phase = SessionPhase::Ended;
                Ok(NextPair::Remainder(listing.remove(0)))
            }
            2 => {
                self.phase = SessionPhase::FinalPair;
                let right = listing.remove(1);
                let left = listing.remove(0);
                Ok(NextPair::FinalPair(left, right))
            }
            _ => {
                if self.working_queue.len() < 2 {
                    listing.shuffle(&mut self.rng);
                    self.working_queue = listing;
                    self.round += 1;
                    log::info!("Round {}", self.round);
                }
                let left = self.working_queue.remove(0);
                let right = self.working_queue.remove(0);
                Ok(NextPair::Pair(left, right))
            }
        }
    }

    /// Apply the user's decision on the pair just shown.
    ///
    /// Storage failures propagate unchanged; the scheduler never retries
    /// or undoes a discard, the caller ends the session instead.
    pub fn apply_decision<S: ImageStore>(
        &mut self,
        store: &mut S,
        left: &ImageId,
        right: &ImageId,
        decision: Decision,
    ) -> Result<(), StorageError> {
        let targets = match decision {
            Decision::KeepBoth => vec![],
            Decision::DiscardLeft => vec![left.clone()],
            Decision::DiscardRight => vec![right.clone()],
            Decision::DiscardBoth => vec![left.clone(), right.clone()],
        };

        for id in &targets {
            store.discard(id)?;
            // A discarded id must never resurface from the queue.
            self.working_queue.retain(|queued| queued != id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct MemStore {
        images: Vec<ImageId>,
        fail_discard: bool,
    }

    impl MemStore {
        fn new(names: &[&str]) -> Self {
            Self {
                images: names.iter().map(|n| ImageId::new(*n)).collect(),
                fail_discard: false,
            }
        }

        fn names(&self) -> BTreeSet<String> {
            self.images.iter().map(|id| id.as_str().to_string()).collect()
        }
    }

    impl ImageStore for MemStore {
        fn list_eligible(&self) -> Result<Vec<ImageId>, StorageError> {
            Ok(self.images.clone())
        }

        fn discard(&mut self, id: &ImageId) -> Result<(), StorageError> {
            if self.fail_discard {
                return Err(StorageError::Conflict {
                    name: id.to_string(),
                    existing: 1,
                    incoming: 2,
                });
            }
            self.images.retain(|img| img != id);
            Ok(())
        }
    }

    fn expect_pair(scheduler: &mut PairScheduler, store: &MemStore) -> (ImageId, ImageId) {
        match scheduler.next_pair(store).unwrap() {
            NextPair::Pair(left, right) => (left, right),
            other => panic!("expected a pair, got {:?}", other),
        }
    }

    #[test]
    fn one_round_shows_every_image_exactly_once() {
        let store = MemStore::new(&["a.png", "b.png", "c.png", "d.png", "e.png", "f.png"]);
        let mut scheduler = PairScheduler::seeded(7);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let (left, right) = expect_pair(&mut scheduler, &store);
            seen.push(left);
            seen.push(right);
        }

        assert_eq!(scheduler.round(), 1);
        let unique: BTreeSet<_> = seen.iter().map(|id| id.as_str()).collect();
        assert_eq!(unique.len(), 6);

        // The queue is empty now, so the next draw starts round two.
        expect_pair(&mut scheduler, &store);
        assert_eq!(scheduler.round(), 2);
    }

    #[test]
    fn never_pairs_an_image_with_itself() {
        let store = MemStore::new(&["a.png", "b.png", "c.png", "d.png", "e.png"]);
        let mut scheduler = PairScheduler::seeded(42);

        for _ in 0..50 {
            let (left, right) = expect_pair(&mut scheduler, &store);
            assert_ne!(left, right);
        }
    }

    #[test]
    fn odd_leftover_carries_into_the_next_round() {
        let store = MemStore::new(&["a.png", "b.png", "c.png", "d.png", "e.png"]);
        let mut scheduler = PairScheduler::seeded(3);

        expect_pair(&mut scheduler, &store);
        expect_pair(&mut scheduler, &store);
        assert_eq!(scheduler.round(), 1);

        // Only one id is left in the queue, so the third draw reshuffles
        // the full current listing.
        expect_pair(&mut scheduler, &store);
        assert_eq!(scheduler.round(), 2);
    }

    #[test]
    fn discarded_images_never_reappear() {
        let mut store = MemStore::new(&["a.png", "b.png", "c.png", "d.png", "e.png", "f.png"]);
        let mut scheduler = PairScheduler::seeded(11);
        let mut discarded: BTreeSet<String> = BTreeSet::new();

        loop {
            match scheduler.next_pair(&store).unwrap() {
                NextPair::Pair(left, right) => {
                    assert!(!discarded.contains(left.as_str()));
                    assert!(!discarded.contains(right.as_str()));
                    let before = store.images.len();
                    scheduler
                        .apply_decision(&mut store, &left, &right, Decision::DiscardLeft)
                        .unwrap();
                    assert_eq!(store.images.len(), before - 1);
                    discarded.insert(left.as_str().to_string());
                }
                NextPair::FinalPair(left, right) => {
                    assert!(!discarded.contains(left.as_str()));
                    assert!(!discarded.contains(right.as_str()));
                }
                NextPair::Remainder(id) => {
                    assert!(!discarded.contains(id.as_str()));
                }
                NextPair::Ended => break,
            }
        }
    }

    #[test]
    fn discard_both_terminates_within_bounds() {
        let mut store = MemStore::new(&["a", "b", "c", "d", "e", "f", "g", "h", "i"]);
        let mut scheduler = PairScheduler::seeded(5);
        let mut steps = 0;

        loop {
            steps += 1;
            assert!(steps <= 9, "session did not terminate within N steps");
            match scheduler.next_pair(&store).unwrap() {
                NextPair::Pair(left, right) => {
                    scheduler
                        .apply_decision(&mut store, &left, &right, Decision::DiscardBoth)
                        .unwrap();
                }
                NextPair::Ended => break,
                _ => {}
            }
        }

        assert!(scheduler.is_ended());
    }

    #[test]
    fn two_images_surface_as_the_final_pair_then_end() {
        let store = MemStore::new(&["a.png", "b.png"]);
        let mut scheduler = PairScheduler::seeded(1);

        match scheduler.next_pair(&store).unwrap() {
            NextPair::FinalPair(left, right) => {
                assert_eq!(left.as_str(), "a.png");
                assert_eq!(right.as_str(), "b.png");
            }
            other => panic!("expected the final pair, got {:?}", other),
        }
        assert!(!scheduler.is_ended());

        assert_eq!(scheduler.next_pair(&store).unwrap(), NextPair::Ended);
        assert!(scheduler.is_ended());
        assert_eq!(scheduler.next_pair(&store).unwrap(), NextPair::Ended);
    }

    #[test]
    fn reaching_two_mid_session_ends_with_the_survivors() {
        let mut store = MemStore::new(&["a.png", "b.png", "c.png", "d.png"]);
        let mut scheduler = PairScheduler::seeded(9);

        let (left, right) = expect_pair(&mut scheduler, &store);
        scheduler
            .apply_decision(&mut store, &left, &right, Decision::DiscardBoth)
            .unwrap();

        match scheduler.next_pair(&store).unwrap() {
            NextPair::FinalPair(a, b) => {
                let survivors: BTreeSet<_> =
                    [a.as_str().to_string(), b.as_str().to_string()].into();
                assert_eq!(survivors, store.names());
            }
            other => panic!("expected the final pair, got {:?}", other),
        }
    }

    #[test]
    fn single_image_surfaces_as_remainder() {
        let store = MemStore::new(&["last.png"]);
        let mut scheduler = PairScheduler::seeded(1);

        assert_eq!(
            scheduler.next_pair(&store).unwrap(),
            NextPair::Remainder(ImageId::new("last.png"))
        );
        assert!(scheduler.is_ended());
    }

    #[test]
    fn empty_store_ends_immediately() {
        let store = MemStore::new(&[]);
        let mut scheduler = PairScheduler::seeded(1);

        assert_eq!(scheduler.next_pair(&store).unwrap(), NextPair::Ended);
        assert!(scheduler.is_ended());
    }

    #[test]
    fn keep_both_discards_nothing() {
        let mut store = MemStore::new(&["a.png", "b.png", "c.png", "d.png"]);
        let mut scheduler = PairScheduler::seeded(2);

        let (left, right) = expect_pair(&mut scheduler, &store);
        scheduler
            .apply_decision(&mut store, &left, &right, Decision::KeepBoth)
            .unwrap();

        assert_eq!(store.images.len(), 4);
    }

    #[test]
    fn decisions_map_to_the_right_sides() {
        let mut store = MemStore::new(&["a.png", "b.png", "c.png", "d.png", "e.png"]);
        let mut scheduler = PairScheduler::seeded(6);

        let (left, right) = expect_pair(&mut scheduler, &store);
        scheduler
            .apply_decision(&mut store, &left, &right, Decision::DiscardLeft)
            .unwrap();
        assert!(!store.images.contains(&left));
        assert!(store.images.contains(&right));

        let (left, right) = expect_pair(&mut scheduler, &store);
        scheduler
            .apply_decision(&mut store, &left, &right, Decision::DiscardRight)
            .unwrap();
        assert!(store.images.contains(&left));
        assert!(!store.images.contains(&right));
    }

    #[test]
    fn queued_ids_are_purged_when_discarded() {
        let mut store = MemStore::new(&["a.png", "b.png", "c.png", "d.png", "e.png", "f.png"]);
        let mut scheduler = PairScheduler::seeded(13);

        let (first, second) = expect_pair(&mut scheduler, &store);
        let mut queued: Vec<ImageId> = store
            .images
            .iter()
            .filter(|id| **id != first && **id != second)
            .cloned()
            .collect();
        let z = queued.remove(0);
        let w = queued.remove(0);

        // Discard two images that are still waiting in the queue.
        scheduler
            .apply_decision(&mut store, &z, &w, Decision::DiscardBoth)
            .unwrap();

        // Still round one: the queue keeps the two untouched survivors.
        let (third, fourth) = expect_pair(&mut scheduler, &store);
        assert_eq!(scheduler.round(), 1);
        let drawn: BTreeSet<_> = [third.clone(), fourth.clone()].into();
        let expected: BTreeSet<_> = queued.into_iter().collect();
        assert_eq!(drawn, expected);
    }

    #[test]
    fn storage_failures_propagate() {
        let mut store = MemStore::new(&["a.png", "b.png", "c.png"]);
        store.fail_discard = true;
        let mut scheduler = PairScheduler::seeded(4);

        let (left, right) = expect_pair(&mut scheduler, &store);
        let err = scheduler
            .apply_decision(&mut store, &left, &right, Decision::DiscardLeft)
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
    }
}
