//! Entity extraction for shopping requests.
//!
//! Extracts structured entities from normalized Russian or English text:
//! - Budget amounts ("за 1500", "under 2k", "1500 руб")
//! - Party size ("на двоих", "for three", "4 people")
//! - Meal types
//! - Excluded and required product tags
//! - Quick-cooking hints

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Amount after a budget keyword
    static ref BUDGET_PREFIXED: Regex = Regex::new(
        r"\b(?:за|до|бюджет\w*|в пределах|не дороже|не более|under|below|within|budget(?:\s+of)?|up to|max(?:imum)?)\s+(\d+(?:[.,]\d+)?)(?:(k|к)\b|\s*(тыс\w*|thousand))?"
    ).unwrap();

    /// Amount followed by a currency marker
    static ref BUDGET_SUFFIXED: Regex = Regex::new(
        r"(\d+(?:[.,]\d+)?)(?:(k|к)\b|\s*(тыс\w*|thousand))?\s*(?:₽|руб\w*|rub\w*|р\b)"
    ).unwrap();

    /// Russian collective numerals ("на двоих")
    static ref PEOPLE_COLLECTIVE: Regex = Regex::new(
        r"(?:на|для)\s+(одного|себя|двоих|троих|четверых|пятерых|шестерых|семерых|восьмерых)"
    ).unwrap();

    /// Number followed by a people noun
    static ref PEOPLE_COUNT: Regex = Regex::new(
        r"(\d+)\s*(?:человек\w*|персон\w*|гост\w*|people|persons?|guests?|чел\b)"
    ).unwrap();

    /// English "for two"
    static ref PEOPLE_ENGLISH: Regex = Regex::new(
        r"\bfor\s+(one|two|three|four|five|six|seven|eight)\b"
    ).unwrap();

    static ref MEAL: Regex = Regex::new(
        r"\b(завтрак\w*|обед\w*|ужин\w*|перекус\w*|breakfast|lunch|dinner|supper|snacks?)\b"
    ).unwrap();

    /// Negated product list ("без молока и мяса", "без мяса и без сахара", "no dairy or meat")
    static ref EXCLUSION: Regex = Regex::new(
        r"\b(?:без|no|without|excluding|exclude)\s+(\w+(?:(?:\s*,\s*|\s+(?:и|или|and|or)\s+)(?:(?:без|no|without)\s+)?\w+)*)"
    ).unwrap();

    /// "dairy-free", "gluten free"
    static ref FREE_FROM: Regex = Regex::new(r"\b(\w+)[\s-]free\b").unwrap();

    static ref QUICK: Regex = Regex::new(
        r"\b(?:быстр\w*|на скорую руку|quick\w*|fast|easy)\b"
    ).unwrap();
}

/// Word stems mapped to the product tags they negate.
const EXCLUDE_STEMS: &[(&str, &str)] = &[
    ("молок", "dairy"),
    ("молоч", "dairy"),
    ("лактоз", "dairy"),
    ("сыр", "dairy"),
    ("dairy", "dairy"),
    ("milk", "dairy"),
    ("lactose", "dairy"),
    ("cheese", "dairy"),
    ("мяс", "meat"),
    ("meat", "meat"),
    ("рыб", "fish"),
    ("fish", "fish"),
    ("сахар", "sugar"),
    ("sugar", "sugar"),
    ("алкогол", "alcohol"),
    ("alcohol", "alcohol"),
    ("глютен", "gluten"),
    ("gluten", "gluten"),
    ("орех", "nuts"),
    ("nut", "nuts"),
];

/// Word stems mapped to tags every product must carry.
const INCLUDE_STEMS: &[(&str, &str)] = &[
    ("веган", "vegan"),
    ("vegan", "vegan"),
    ("вегетариан", "vegetarian"),
    ("vegetarian", "vegetarian"),
    ("халяль", "halal"),
    ("halal", "halal"),
    ("детск", "children_goods"),
    ("kids", "children_goods"),
    ("children", "children_goods"),
];

/// An extracted entity
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Budget(f64),
    People(u32),
    MealType(&'static str),
    ExcludeTag(&'static str),
    IncludeTag(&'static str),
    Quick,
}

/// Extract all entities from normalized text
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();

    if let Some(people) = extract_people(text) {
        entities.push(Entity::People(people));
    }

    if let Some(budget) = extract_budget(text) {
        entities.push(Entity::Budget(budget));
    }

    for cap in MEAL.captures_iter(text) {
        if let Some(meal) = meal_tag(&cap[1]) {
            entities.push(Entity::MealType(meal));
        }
    }

    for cap in EXCLUSION.captures_iter(text) {
        for word in cap[1].split(|c: char| !c.is_alphanumeric()) {
            if let Some(tag) = lookup_stem(word, EXCLUDE_STEMS) {
                entities.push(Entity::ExcludeTag(tag));
            }
        }
    }

    for cap in FREE_FROM.captures_iter(text) {
        if let Some(tag) = lookup_stem(&cap[1], EXCLUDE_STEMS) {
            entities.push(Entity::ExcludeTag(tag));
        }
    }

    for word in text.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if let Some(tag) = lookup_stem(word, INCLUDE_STEMS) {
            entities.push(Entity::IncludeTag(tag));
        }
    }

    if QUICK.is_match(text) {
        entities.push(Entity::Quick);
    }

    entities.dedup();
    entities
}

/// Extract the budget in rubles, preferring an explicit budget keyword
pub fn extract_budget(text: &str) -> Option<f64> {
    BUDGET_PREFIXED
        .captures(text)
        .or_else(|| BUDGET_SUFFIXED.captures(text))
        .and_then(|cap| {
            let amount: f64 = cap[1].replace(',', ".").parse().ok()?;
            let thousands = cap.get(2).is_some() || cap.get(3).is_some();
            Some(if thousands { amount * 1000.0 } else { amount })
        })
}

/// Extract the party size
pub fn extract_people(text: &str) -> Option<u32> {
    if let Some(cap) = PEOPLE_COUNT.captures(text) {
        return cap[1].parse().ok();
    }
    if let Some(cap) = PEOPLE_COLLECTIVE.captures(text) {
        return match &cap[1] {
            "одного" | "себя" => Some(1),
            "двоих" => Some(2),
            "троих" => Some(3),
            "четверых" => Some(4),
            "пятерых" => Some(5),
            "шестерых" => Some(6),
            "семерых" => Some(7),
            "восьмерых" => Some(8),
            _ => None,
        };
    }
    PEOPLE_ENGLISH.captures(text).and_then(|cap| match &cap[1] {
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        _ => None,
    })
}

fn meal_tag(word: &str) -> Option<&'static str> {
    if word.starts_with("завтрак") || word == "breakfast" {
        Some("breakfast")
    } else if word.starts_with("обед") || word == "lunch" {
        Some("lunch")
    } else if word.starts_with("ужин") || word == "dinner" || word == "supper" {
        Some("dinner")
    } else if word.starts_with("перекус") || word.starts_with("snack") {
        Some("snack")
    } else {
        None
    }
}

fn lookup_stem(word: &str, table: &[(&str, &'static str)]) -> Option<&'static str> {
    let word = word.trim();
    if word.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|(stem, _)| word.starts_with(stem))
        .map(|(_, tag)| *tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_russian_dinner_request() {
        let entities = extract_entities("ужин на двоих за 1500 без молока");
        assert!(entities.contains(&Entity::People(2)));
        assert!(entities.contains(&Entity::Budget(1500.0)));
        assert!(entities.contains(&Entity::MealType("dinner")));
        assert!(entities.contains(&Entity::ExcludeTag("dairy")));
    }

    #[test]
    fn test_budget_forms() {
        assert_eq!(extract_budget("завтрак до 800 рублей"), Some(800.0));
        assert_eq!(extract_budget("lunch under 2k"), Some(2000.0));
        assert_eq!(extract_budget("обед на 3 человек 1200 руб"), Some(1200.0));
        assert_eq!(extract_budget("за 1.5 тыс"), Some(1500.0));
        assert_eq!(extract_budget("ужин на двоих"), None);
    }

    #[test]
    fn test_people_forms() {
        assert_eq!(extract_people("ужин на троих"), Some(3));
        assert_eq!(extract_people("dinner for two"), Some(2));
        assert_eq!(extract_people("обед на 4 человека"), Some(4));
        assert_eq!(extract_people("breakfast for 3 people"), Some(3));
        assert_eq!(extract_people("просто ужин"), None);
    }

    #[test]
    fn test_people_count_is_not_a_budget() {
        assert_eq!(extract_budget("dinner for 3 people"), None);
    }

    #[test]
    fn test_exclusion_lists() {
        let entities = extract_entities("обед без мяса и рыбы");
        assert!(entities.contains(&Entity::ExcludeTag("meat")));
        assert!(entities.contains(&Entity::ExcludeTag("fish")));

        let entities = extract_entities("ужин без мяса и без сахара, no nuts");
        assert!(entities.contains(&Entity::ExcludeTag("meat")));
        assert!(entities.contains(&Entity::ExcludeTag("sugar")));
        assert!(entities.contains(&Entity::ExcludeTag("nuts")));

        let entities = extract_entities("dairy-free breakfast");
        assert!(entities.contains(&Entity::ExcludeTag("dairy")));
        assert!(entities.contains(&Entity::MealType("breakfast")));
    }

    #[test]
    fn test_include_and_quick() {
        let entities = extract_entities("быстрый веганский ужин");
        assert!(entities.contains(&Entity::IncludeTag("vegan")));
        assert!(entities.contains(&Entity::Quick));
    }
}
