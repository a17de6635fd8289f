//! # Stanza Order
//!
//! Decides which stanza plays after the current one. Without a chorus the
//! stanzas play in document order. With a chorus, it is sung after every verse:
//!
//! ```text
//! stanzas:  [Verse 1, Verse 2, Chorus, Verse 3]     chorus = 2
//! order:     V1 → C → V2 → C → V3 → C → END
//! ```
//!
//! The chorus slot in the document never consumes a verse turn, and the chorus
//! never plays twice in a row. While the chorus plays, the resolver remembers
//! which verse comes back afterward.

/// Stanza sequencing state for one playback session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureResolver {
    /// Verse to return to once the chorus finishes
    resume_verse: Option<usize>,
}

impl StructureResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the remembered verse, as at the start of a session.
    pub fn reset(&mut self) {
        self.resume_verse = None;
    }

    pub fn resume_verse(&self) -> Option<usize> {
        self.resume_verse
    }

    /// Index of the stanza to play after `current`, or `None` at the end.
    ///
    /// # Example
    /// ```rust
    /// use hymnal::structure::StructureResolver;
    ///
    /// let mut resolver = StructureResolver::new();
    /// let (len, chorus) = (4, Some(2));
    ///
    /// let mut order = vec![];
    /// let mut current = 0;
    /// while let Some(next) = resolver.next_stanza_index(len, current, chorus) {
    ///     order.push(next);
    ///     current = next;
    /// }
    /// assert_eq!(order, vec![2, 1, 2, 3, 2]);
    /// ```
    pub fn next_stanza_index(
        &mut self,
        stanza_count: usize,
        current: usize,
        chorus: Option<usize>,
    ) -> Option<usize> {
        let next = match chorus {
            None => current + 1,
            Some(chorus) if current != chorus => {
                let mut real_next = current + 1;
                if real_next == chorus {
                    real_next += 1;
                }
                self.resume_verse = Some(real_next);
                chorus
            }
            Some(_) => self.resume_verse.take().unwrap_or(current + 1),
        };

        (next < stanza_count).then_some(next)
    }
}

/// Stateless form for one-off queries: the remembered verse is passed in and
/// the updated value handed back alongside the answer.
pub fn next_stanza_index(
    stanza_count: usize,
    current: usize,
    chorus: Option<usize>,
    resume_verse: Option<usize>,
) -> (Option<usize>, Option<usize>) {
    let mut resolver = StructureResolver { resume_verse };
    let next = resolver.next_stanza_index(stanza_count, current, chorus);
    (next, resolver.resume_verse)
}

/// The full play order from `start` until the end of the hymn.
pub fn play_order(stanza_count: usize, start: usize, chorus: Option<usize>) -> Vec<usize> {
    let mut order = Vec::new();
    if start >= stanza_count {
        return order;
    }
    order.push(start);

    let mut resolver = StructureResolver::new();
    let mut current = start;
    // Each verse is visited at most once, each followed by at most one chorus
    let limit = stanza_count * 2 + 1;
    while let Some(next) = resolver.next_stanza_index(stanza_count, current, chorus) {
        order.push(next);
        current = next;
        if order.len() > limit {
            break;
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_chorus_plays_in_order() {
        let mut resolver = StructureResolver::new();
        assert_eq!(resolver.next_stanza_index(3, 0, None), Some(1));
        assert_eq!(resolver.next_stanza_index(3, 1, None), Some(2));
        assert_eq!(resolver.next_stanza_index(3, 2, None), None);
    }

    #[test]
    fn test_chorus_between_every_verse() {
        // [Verse1, Verse2, Chorus, Verse3]
        let mut resolver = StructureResolver::new();
        let chorus = Some(2);
        let mut current = 0;
        let mut sequence = Vec::new();
        loop {
            let next = resolver.next_stanza_index(4, current, chorus);
            sequence.push(next);
            match next {
                Some(n) => current = n,
                None => break,
            }
        }
        assert_eq!(sequence, vec![Some(2), Some(1), Some(2), Some(3), Some(2), None]);
    }

    #[test]
    fn test_chorus_first_in_document() {
        // [Chorus, Verse1, Verse2]
        assert_eq!(play_order(3, 0, Some(0)), vec![0, 1, 0, 2, 0]);
    }

    #[test]
    fn test_chorus_last_in_document() {
        // [Verse1, Verse2, Chorus]
        assert_eq!(play_order(3, 0, Some(2)), vec![0, 2, 1, 2]);
    }

    #[test]
    fn test_starting_on_chorus_without_memory() {
        let mut resolver = StructureResolver::new();
        assert_eq!(resolver.next_stanza_index(4, 2, Some(2)), Some(3));
    }

    #[test]
    fn test_memory_consumed_once() {
        let mut resolver = StructureResolver::new();
        assert_eq!(resolver.next_stanza_index(5, 0, Some(1)), Some(1));
        assert_eq!(resolver.resume_verse(), Some(2));
        assert_eq!(resolver.next_stanza_index(5, 1, Some(1)), Some(2));
        assert_eq!(resolver.resume_verse(), None);
    }

    #[test]
    fn test_reset_forgets_resume_verse() {
        let mut resolver = StructureResolver::new();
        resolver.next_stanza_index(4, 0, Some(2));
        resolver.reset();
        assert_eq!(resolver.next_stanza_index(4, 2, Some(2)), Some(3));
    }

    #[test]
    fn test_stateless_form() {
        let (next, memory) = next_stanza_index(4, 1, Some(2), None);
        assert_eq!(next, Some(2));
        assert_eq!(memory, Some(3));
        let (next, memory) = next_stanza_index(4, 2, Some(2), memory);
        assert_eq!(next, Some(3));
        assert_eq!(memory, None);
    }

    #[test]
    fn test_single_stanza() {
        assert_eq!(play_order(1, 0, None), vec![0]);
        assert_eq!(play_order(1, 0, Some(0)), vec![0]);
        assert!(play_order(0, 0, None).is_empty());
    }
}
