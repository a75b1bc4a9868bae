//! Pilot item lists
//!
//! Each of the 12 stories contributes two items that differ on every
//! factor, so a pilot covers both levels of each factor per story.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{AnalysisResult, Table};

/// Stories used in the pilot
pub const PILOT_STORIES: std::ops::RangeInclusive<u32> = 1..=12;

/// Condition, first mention, recent mention, knowledge cue
const FACTOR_LEVELS: [[&str; 2]; 4] = [["tb", "fb"], ["s", "e"], ["s", "e"], ["im", "ex"]];

/// Draw the pilot item ids: two per story, complementary on every factor
pub fn pilot_item_ids<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    let mut items = Vec::new();
    for story in PILOT_STORIES {
        let mut first = Vec::with_capacity(FACTOR_LEVELS.len());
        let mut second = Vec::with_capacity(FACTOR_LEVELS.len());
        for levels in FACTOR_LEVELS {
            let mut pair = levels;
            pair.shuffle(rng);
            first.push(pair[0]);
            second.push(pair[1]);
        }
        items.push(item_id(story, &first));
        items.push(item_id(story, &second));
    }
    items
}

fn item_id(story: u32, levels: &[&str]) -> String {
    format!(
        "{}_{}_1_{}_{}_{}",
        story, levels[0], levels[1], levels[2], levels[3]
    )
}

/// Single `item_id` column table
pub fn pilot_table(item_ids: Vec<String>) -> AnalysisResult<Table> {
    let mut table = Table::new(vec!["item_id".to_string()]);
    for id in item_ids {
        table.push_row(vec![id])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_two_complementary_items_per_story() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = pilot_item_ids(&mut rng);
        assert_eq!(items.len(), 24);

        for pair in items.chunks(2) {
            let a: Vec<&str> = pair[0].split('_').collect();
            let b: Vec<&str> = pair[1].split('_').collect();
            assert_eq!(a.len(), 6);
            assert_eq!(a[0], b[0]);
            assert_eq!(a[2], "1");
            for factor in [1, 3, 4, 5] {
                assert_ne!(a[factor], b[factor], "{} vs {}", pair[0], pair[1]);
            }
        }
        assert!(items[0].starts_with("1_"));
        assert!(items[23].starts_with("12_"));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = pilot_item_ids(&mut StdRng::seed_from_u64(42));
        let b = pilot_item_ids(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_pilot_table() {
        let table = pilot_table(vec!["1_tb_1_s_e_im".to_string()]).unwrap();
        assert_eq!(table.headers(), &["item_id"]);
        assert_eq!(table.len(), 1);
    }
}
