//! Bubble categories and the weighted table they are drawn from

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sound::SoundEffect;
use crate::tuning::TuningError;

/// The closed set of bubble kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Red,
    Teal,
    Yellow,
    Green,
    Pink,
    /// Rare special bubble with animated colors
    Rainbow,
}

/// How a category is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleStyle {
    /// Single body color (0xRRGGBB)
    Solid { rgb: u32 },
    /// Hue-cycling body with sparkles
    Rainbow,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Red,
        Category::Teal,
        Category::Yellow,
        Category::Green,
        Category::Pink,
        Category::Rainbow,
    ];

    /// Points awarded for popping
    pub fn points(self) -> u32 {
        match self {
            Category::Red => 10,
            Category::Teal => 15,
            Category::Yellow => 20,
            Category::Green => 25,
            Category::Pink => 30,
            Category::Rainbow => 50,
        }
    }

    pub fn style(self) -> BubbleStyle {
        match self {
            Category::Red => BubbleStyle::Solid { rgb: 0xFF6B6B },
            Category::Teal => BubbleStyle::Solid { rgb: 0x4ECDC4 },
            Category::Yellow => BubbleStyle::Solid { rgb: 0xFFD93D },
            Category::Green => BubbleStyle::Solid { rgb: 0x6BCB77 },
            Category::Pink => BubbleStyle::Solid { rgb: 0xFF8CC3 },
            Category::Rainbow => BubbleStyle::Rainbow,
        }
    }

    /// Sound played when a bubble of this category pops
    pub fn sound(self) -> SoundEffect {
        match self {
            Category::Rainbow => SoundEffect::RainbowPop,
            _ => SoundEffect::Pop,
        }
    }

    pub fn is_special(self) -> bool {
        matches!(self.style(), BubbleStyle::Rainbow)
    }
}

/// One row of the category table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWeight {
    pub category: Category,
    pub weight: u32,
}

/// Default selection weights (sum 100)
pub const DEFAULT_WEIGHTS: [CategoryWeight; 6] = [
    CategoryWeight { category: Category::Red, weight: 30 },
    CategoryWeight { category: Category::Teal, weight: 25 },
    CategoryWeight { category: Category::Yellow, weight: 20 },
    CategoryWeight { category: Category::Green, weight: 15 },
    CategoryWeight { category: Category::Pink, weight: 8 },
    CategoryWeight { category: Category::Rainbow, weight: 2 },
];

/// Ordered, validated weight table. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    entries: Vec<CategoryWeight>,
    total_weight: u32,
}

impl CategoryTable {
    /// Build a table, rejecting empty tables, zero total weight and duplicates
    pub fn new(entries: Vec<CategoryWeight>) -> Result<Self, TuningError> {
        if entries.is_empty() {
            return Err(TuningError::EmptyCategoryTable);
        }

        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.category == entry.category) {
                return Err(TuningError::DuplicateCategory(entry.category));
            }
        }

        let total_weight = entries
            .iter()
            .try_fold(0u32, |acc, e| acc.checked_add(e.weight))
            .ok_or(TuningError::WeightOverflow)?;
        if total_weight == 0 {
            return Err(TuningError::ZeroTotalWeight);
        }

        Ok(Self {
            entries,
            total_weight,
        })
    }

    pub fn entries(&self) -> &[CategoryWeight] {
        &self.entries
    }

    pub fn total_weight(&self) -> u32 {
        self.total_weight
    }

    /// Cumulative-weight scan over `roll` in [0, total_weight).
    ///
    /// Subtracts each weight in table order and returns the first category
    /// that brings the remainder to <= 0. Zero-weight rows never match.
    pub fn pick(&self, roll: f64) -> Category {
        let mut remainder = roll;
        let mut last_live = None;
        for entry in &self.entries {
            if entry.weight == 0 {
                continue;
            }
            last_live = Some(entry.category);
            remainder -= f64::from(entry.weight);
            if remainder <= 0.0 {
                return entry.category;
            }
        }
        // Rounding left a sliver past the final row
        last_live.unwrap_or(self.entries[0].category)
    }

    /// Weighted random draw
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Category {
        let roll = rng.random::<f64>() * f64::from(self.total_weight);
        self.pick(roll)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_WEIGHTS.to_vec(),
            total_weight: DEFAULT_WEIGHTS.iter().map(|e| e.weight).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashMap;

    #[test]
    fn test_points_are_fixed_set() {
        let points: Vec<u32> = Category::ALL.iter().map(|c| c.points()).collect();
        assert_eq!(points, vec![10, 15, 20, 25, 30, 50]);
    }

    #[test]
    fn test_only_rainbow_is_special() {
        for category in Category::ALL {
            assert_eq!(category.is_special(), category == Category::Rainbow);
        }
        assert_eq!(Category::Rainbow.sound(), SoundEffect::RainbowPop);
        assert_eq!(Category::Teal.sound(), SoundEffect::Pop);
    }

    #[test]
    fn test_default_table_totals_100() {
        let table = CategoryTable::default();
        assert_eq!(table.total_weight(), 100);
        assert_eq!(table.entries().len(), 6);
    }

    #[test]
    fn test_rejects_empty_table() {
        assert_eq!(
            CategoryTable::new(Vec::new()),
            Err(TuningError::EmptyCategoryTable)
        );
    }

    #[test]
    fn test_rejects_zero_total_weight() {
        let entries = vec![
            CategoryWeight { category: Category::Red, weight: 0 },
            CategoryWeight { category: Category::Pink, weight: 0 },
        ];
        assert_eq!(CategoryTable::new(entries), Err(TuningError::ZeroTotalWeight));
    }

    #[test]
    fn test_rejects_duplicate_category() {
        let entries = vec![
            CategoryWeight { category: Category::Red, weight: 1 },
            CategoryWeight { category: Category::Red, weight: 2 },
        ];
        assert_eq!(
            CategoryTable::new(entries),
            Err(TuningError::DuplicateCategory(Category::Red))
        );
    }

    #[test]
    fn test_pick_boundaries_follow_table_order() {
        let table = CategoryTable::default();
        assert_eq!(table.pick(0.0), Category::Red);
        // Remainder hits exactly zero on the first row: first match wins
        assert_eq!(table.pick(30.0), Category::Red);
        assert_eq!(table.pick(30.5), Category::Teal);
        assert_eq!(table.pick(55.0), Category::Teal);
        assert_eq!(table.pick(97.5), Category::Pink);
        assert_eq!(table.pick(99.9), Category::Rainbow);
        // Past the end falls back to the last live row
        assert_eq!(table.pick(150.0), Category::Rainbow);
    }

    #[test]
    fn test_zero_weight_rows_never_picked() {
        let table = CategoryTable::new(vec![
            CategoryWeight { category: Category::Red, weight: 0 },
            CategoryWeight { category: Category::Teal, weight: 5 },
            CategoryWeight { category: Category::Pink, weight: 0 },
        ])
        .unwrap();
        assert_eq!(table.pick(0.0), Category::Teal);
        assert_eq!(table.pick(4.99), Category::Teal);
        assert_eq!(table.pick(10.0), Category::Teal);
    }

    #[test]
    fn test_pick_resolves_fractions_in_large_tables() {
        let heavy = 1u32 << 25;
        let table = CategoryTable::new(vec![
            CategoryWeight { category: Category::Red, weight: heavy },
            CategoryWeight { category: Category::Teal, weight: 1 },
        ])
        .unwrap();
        assert_eq!(table.pick(f64::from(heavy)), Category::Red);
        assert_eq!(table.pick(f64::from(heavy) + 0.5), Category::Teal);
    }

    #[test]
    fn test_sample_frequencies_converge() {
        let table = CategoryTable::default();
        let mut rng = Pcg32::seed_from_u64(7);
        let draws = 100_000;

        let mut counts: HashMap<Category, u32> = HashMap::new();
        for _ in 0..draws {
            *counts.entry(table.sample(&mut rng)).or_default() += 1;
        }

        for entry in table.entries() {
            let observed = counts.get(&entry.category).copied().unwrap_or(0) as f64 / draws as f64;
            let expected = entry.weight as f64 / table.total_weight() as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "{:?}: observed {observed}, expected {expected}",
                entry.category
            );
            assert!(observed > 0.0, "{:?} never drawn", entry.category);
        }
    }
}
