//! Short random post identifiers.
//!
//! An id is [`ID_PREFIX`] followed by [`ID_BODY_LEN`] characters drawn
//! uniformly from `[0-9a-z]`, e.g. `_k3j9x0q2a`. Ids are not globally unique;
//! callers that need uniqueness check against their own working set.

use rand::Rng;

pub const ID_PREFIX: char = '_';
pub const ID_BODY_LEN: usize = 9;
pub const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[must_use]
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut id = String::with_capacity(1 + ID_BODY_LEN);
    id.push(ID_PREFIX);
    id.extend(
        (0..ID_BODY_LEN).map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())])),
    );

    id
}

#[must_use]
pub fn generate() -> String {
    generate_with(&mut rand::rng())
}

#[cfg(test)]
mod tests {
    use crate::id::{ID_ALPHABET, ID_BODY_LEN, ID_PREFIX, generate, generate_with};
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    fn is_well_formed(id: &str) -> bool {
        id.strip_prefix(ID_PREFIX).is_some_and(|body| {
            body.len() == ID_BODY_LEN && body.bytes().all(|byte| ID_ALPHABET.contains(&byte))
        })
    }

    #[test]
    fn generated_ids_are_well_formed() {
        for _ in 0..1000 {
            let id = generate();
            assert!(is_well_formed(&id), "{id} is malformed");
            assert!(id.starts_with(ID_PREFIX));
            assert_eq!(id.len(), 1 + ID_BODY_LEN);
        }
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let first = generate_with(&mut StdRng::seed_from_u64(7));
        let second = generate_with(&mut StdRng::seed_from_u64(7));
        let other = generate_with(&mut StdRng::seed_from_u64(8));

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn ids_rarely_collide() {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let ids: HashSet<String> = (0..10_000).map(|_| generate_with(&mut rng)).collect();

        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn well_formedness() {
        assert!(is_well_formed("_0123abcxy"));
        assert!(!is_well_formed("0123abcxyz"));
        assert!(!is_well_formed("_0123abcx"));
        assert!(!is_well_formed("_0123abcxyz"));
        assert!(!is_well_formed("_0123ABCxy"));
        assert!(!is_well_formed(""));
    }
}
