use chrono::{Datelike, Utc};
use rand::seq::SliceRandom;

pub const CATEGORIES: [&str; 10] = [
    "gaming headsets",
    "wireless keyboards",
    "standing desks",
    "webcams",
    "monitors",
    "speakers",
    "tablets",
    "smartwatches",
    "coffee makers",
    "air fryers",
];

pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Every category formatted as a search query for `year`.
pub fn trending_categories(year: i32) -> Vec<String> {
    CATEGORIES.iter().map(|c| format!("best {} {}", c, year)).collect()
}

/// Picks one trending category at random.
pub fn pick_category<R: rand::Rng + ?Sized>(rng: &mut R, year: i32) -> String {
    let category = CATEGORIES.choose(rng).copied().unwrap_or(CATEGORIES[0]);
    format!("best {} {}", category, year)
}

/// Uses `requested` when given, otherwise a random pick for the current year.
pub fn select_category(requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|c| !c.is_empty()) {
        Some(category) => category.to_string(),
        None => pick_category(&mut rand::thread_rng(), current_year()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_trending_categories_are_suffixed_with_year() {
        let all = trending_categories(2025);
        assert_eq!(all.len(), CATEGORIES.len());
        assert_eq!(all[0], "best gaming headsets 2025");
        assert!(all.iter().all(|c| c.ends_with(" 2025")));
    }

    #[test]
    fn test_pick_category_comes_from_list() {
        let mut rng = StdRng::seed_from_u64(7);
        let all = trending_categories(2030);
        for _ in 0..20 {
            assert!(all.contains(&pick_category(&mut rng, 2030)));
        }
    }

    #[test]
    fn test_requested_category_wins() {
        assert_eq!(select_category(Some(" best drones 2025 ")), "best drones 2025");
        assert!(select_category(Some("  ")).starts_with("best "));
        assert!(select_category(None).ends_with(&current_year().to_string()));
    }
}
