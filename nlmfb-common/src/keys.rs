//! Participant access keys
//!
//! Each participant is shown a single common word at the end of the study
//! which they paste into the crowdsourcing platform to claim credit.

use rand::seq::SliceRandom;
use rand::Rng;

/// Short, unambiguous English words used as access keys
pub const WORDLIST: &[&str] = &[
    "anchor", "apple", "arrow", "autumn", "badge", "bamboo", "banner", "barley",
    "beacon", "blossom", "bottle", "branch", "bridge", "bucket", "butter", "cabin",
    "camera", "candle", "canyon", "carpet", "castle", "cedar", "cherry", "circle",
    "cloud", "clover", "cobalt", "copper", "cotton", "crystal", "dancer", "desert",
    "dolphin", "dragon", "eagle", "ember", "falcon", "feather", "fiddle", "forest",
    "fossil", "garden", "ginger", "glacier", "granite", "harbor", "hazel", "helmet",
    "honey", "island", "jacket", "jungle", "kettle", "ladder", "lantern", "lemon",
    "lizard", "magnet", "maple", "marble", "meadow", "mirror", "monkey", "nectar",
    "needle", "orange", "orchid", "oyster", "paddle", "panther", "pebble", "pepper",
    "pillow", "planet", "pocket", "puzzle", "rabbit", "raven", "ribbon", "river",
    "rocket", "saddle", "salmon", "shadow", "silver", "spider", "spring", "summit",
    "sunset", "tablet", "thunder", "timber", "tomato", "tunnel", "velvet", "violet",
    "walnut", "willow", "window", "winter", "yellow", "zephyr",
];

/// Pick a key uniformly at random from [`WORDLIST`]
pub fn generate_key() -> String {
    generate_key_with(&mut rand::thread_rng())
}

pub fn generate_key_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    // WORDLIST is a non-empty constant
    WORDLIST.choose(rng).copied().unwrap_or("anchor").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_key_comes_from_wordlist() {
        for _ in 0..50 {
            let key = generate_key();
            assert!(WORDLIST.contains(&key.as_str()));
        }
    }

    #[test]
    fn test_seeded_keys_are_reproducible() {
        let a = generate_key_with(&mut StdRng::seed_from_u64(7));
        let b = generate_key_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_keys_fit_column() {
        assert!(WORDLIST.iter().all(|w| !w.is_empty() && w.len() <= 80));
    }
}
