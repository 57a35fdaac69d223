use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Whether a category (and therefore a transaction) adds to or subtracts from a balance.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Income,
    #[default]
    Outcome,
}

serde_plain::derive_display_from_serialize!(Direction);
serde_plain::derive_fromstr_from_deserialize!(Direction);

/// A single emoji glyph. It travels as a string and only the first character is kept.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Emoji(char);

impl Emoji {
    pub const PLACEHOLDER: Emoji = Emoji('❓');

    pub fn new(c: char) -> Self {
        Self(c)
    }

    /// Takes the first character of `s`, or `None` if it is empty.
    pub fn parse(s: &str) -> Option<Self> {
        s.chars().next().map(Self)
    }

    pub fn glyph(&self) -> char {
        self.0
    }
}

impl Display for Emoji {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Emoji {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Emoji {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Emoji::parse(&s).ok_or_else(|| serde::de::Error::custom("empty emoji string"))
    }
}

/// A transaction category.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub emoji: Emoji,
    pub is_income: bool,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>, emoji: char, is_income: bool) -> Self {
        Self {
            id,
            name: name.into(),
            emoji: Emoji::new(emoji),
            is_income,
        }
    }

    /// A neutral stand-in used when the real category is not known locally.
    pub fn placeholder(id: i64) -> Self {
        Self {
            id,
            name: String::new(),
            emoji: Emoji::PLACEHOLDER,
            is_income: false,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.is_income {
            Direction::Income
        } else {
            Direction::Outcome
        }
    }
}

/// Returns the categories whose name fuzzily matches `pattern`, best match first.
///
/// Matching is a case-insensitive subsequence test. Each matched character scores `1 - gap`,
/// where `gap` is the distance from the previous hit, so tight matches rank higher. Ties are
/// ordered by name. An empty (or whitespace-only) pattern returns every category unchanged.
pub fn search<'a>(categories: &'a [Category], pattern: &str) -> Vec<&'a Category> {
    let pattern = pattern.trim().to_lowercase();
    if pattern.is_empty() {
        return categories.iter().collect();
    }
    let mut scored: Vec<(&Category, i64)> = categories
        .iter()
        .filter_map(|c| fuzzy_score(&c.name.to_lowercase(), &pattern).map(|s| (c, s)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.name.cmp(&b.0.name)));
    scored.into_iter().map(|(c, _)| c).collect()
}

fn fuzzy_score(source: &str, pattern: &str) -> Option<i64> {
    let mut wanted = pattern.chars().peekable();
    let mut score = 0i64;
    let mut last_hit = 0usize;
    for (ix, c) in source.chars().enumerate() {
        match wanted.peek() {
            Some(p) if *p == c => {
                score += 1 - (ix - last_hit) as i64;
                last_hit = ix;
                wanted.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    wanted.peek().is_none().then_some(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_json() {
        let json = r#"{"id": 1, "name": "Salary", "emoji": "💰", "isIncome": true}"#;
        let c: Category = serde_json::from_str(json).unwrap();
        assert_eq!(c.emoji.glyph(), '💰');
        assert_eq!(c.direction(), Direction::Income);
        let back = serde_json::to_string(&c).unwrap();
        assert!(back.contains("\"isIncome\":true"));
    }

    #[test]
    fn test_empty_emoji_rejected() {
        let json = r#"{"id": 1, "name": "Salary", "emoji": "", "isIncome": true}"#;
        assert!(serde_json::from_str::<Category>(json).is_err());
    }

    #[test]
    fn test_emoji_keeps_first_char() {
        assert_eq!(Emoji::parse("ab").unwrap().glyph(), 'a');
        assert!(Emoji::parse("").is_none());
    }

    #[test]
    fn test_direction_text() {
        assert_eq!(Direction::Outcome.to_string(), "outcome");
        assert_eq!("income".parse::<Direction>().unwrap(), Direction::Income);
    }

    #[test]
    fn test_search() {
        let categories = vec![
            Category::new(1, "Restaurants", '🍽', false),
            Category::new(2, "Rent", '🏠', false),
            Category::new(3, "Salary", '💵', true),
        ];
        let found: Vec<&str> = search(&categories, "RE")
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(found, vec!["Rent", "Restaurants"]);

        let found: Vec<i64> = search(&categories, "rnt").iter().map(|c| c.id).collect();
        assert_eq!(found, vec![2, 1]);

        assert!(search(&categories, "xyz").is_empty());
        assert_eq!(search(&categories, "  ").len(), 3);
    }
}
