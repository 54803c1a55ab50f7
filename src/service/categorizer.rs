//! Keyword-scored expense categorisation.
//!
//! Scoring, per category:
//! - +3 for every catalog keyword contained in the lowercased text
//! - +2 for every word of at least 7 letters within edit similarity 0.85 of a
//!   single-word keyword it does not contain (OCR typos such as "vegetabel")
//! - +2 to "Children & Education" / "Home & Rent" for their context words
//! - +1 to "Home & Rent" and "Investment & Savings" when the first 2-8 digit
//!   number in the text exceeds 5000
//!
//! Ties rank by catalog order, and only the best of categories sharing a base
//! name (the part before `&`) is kept. Text that scores nothing suggests
//! "Other".

use crate::error::BudgetError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

pub const FALLBACK_CATEGORY: &str = "Other";
const EDUCATION: &str = "Children & Education";
const HOME: &str = "Home & Rent";
const INVESTMENT: &str = "Investment & Savings";
const LARGE_AMOUNT: f64 = 5000.0;
const FUZZY_THRESHOLD: f64 = 0.85;
const FUZZY_MIN_LEN: usize = 7;

static EDUCATION_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(tuition|school|education|student|exam|fees|college)\b")
        .expect("valid education regex")
});
static HOME_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(rent|maintenance|society|home)\b").expect("valid home regex")
});
static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2,8}\b").expect("valid number regex"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Category {
    fn new(name: &str, emoji: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            emoji: emoji.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Suggestion {
    pub category: String,
    pub score: u32,
    pub emoji: String,
    pub explanation: String,
}

pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new(
            "Food & Dining",
            "🍛",
            &[
                "restaurant", "food", "lunch", "dinner", "breakfast", "snacks", "cafe", "pizza",
                "groceries", "meal", "coffee", "tea", "swiggy", "zomato", "ubereats", "grocery",
                "milk", "eggs", "vegetable", "fruit",
            ],
        ),
        Category::new(
            "Transport",
            "🚗",
            &[
                "uber", "ola", "taxi", "metro", "bus", "train", "flight", "cab", "auto", "petrol",
                "diesel", "fuel", "toll", "parking", "commute", "travel",
            ],
        ),
        Category::new(
            "Utilities & Bills",
            "💡",
            &[
                "electricity", "water", "gas", "phone", "recharge", "internet", "wifi",
                "broadband", "dth", "postpaid", "prepaid", "bill", "utility",
            ],
        ),
        Category::new(
            "Shopping",
            "🛍️",
            &[
                "amazon", "flipkart", "myntra", "shopping", "clothes", "apparel", "shoes", "bags",
                "fashion", "accessory", "mall", "purchase",
            ],
        ),
        Category::new(
            "Entertainment",
            "🎬",
            &[
                "movie", "netflix", "hotstar", "prime", "cinema", "entertainment", "music",
                "spotify", "concert", "game", "pubg", "bookmyshow", "fun", "party",
            ],
        ),
        Category::new(
            "Medical & Health",
            "💊",
            &[
                "doctor", "medicine", "pharmacy", "hospital", "clinic", "health", "appointment",
                "test", "surgery", "fitness", "gym", "yoga", "medication",
            ],
        ),
        Category::new(
            "Gifts & Donations",
            "🎁",
            &[
                "gift", "donation", "charity", "ngo", "help", "birthday", "present", "wedding",
                "anniversary", "contribution",
            ],
        ),
        Category::new(
            EDUCATION,
            "🎒",
            &[
                "school", "tuition", "education", "exam", "fees", "books", "stationery",
                "college", "child", "student", "course", "learning",
            ],
        ),
        Category::new(
            INVESTMENT,
            "💹",
            &[
                "investment", "mutual fund", "sip", "stocks", "shares", "fd", "rd", "deposit",
                "nps", "insurance", "lic", "policy", "savings",
            ],
        ),
        Category::new(
            "Personal Care",
            "🧴",
            &[
                "salon", "spa", "haircut", "beauty", "parlour", "grooming", "cosmetics",
                "skincare",
            ],
        ),
        Category::new(
            HOME,
            "🏠",
            &[
                "rent", "maintenance", "society", "home", "repair", "furniture", "decor",
                "appliance",
            ],
        ),
        Category::new(
            FALLBACK_CATEGORY,
            "🔖",
            &["miscellaneous", "other", "unknown", "uncategorized"],
        ),
    ]
}

/// Category catalog plus a keyword index in first-seen order.
#[derive(Debug, Clone)]
pub struct Categorizer {
    categories: Vec<Category>,
    keywords: Vec<(String, Vec<usize>)>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(default_categories())
    }
}

impl Categorizer {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut categorizer = Self {
            categories: Vec::new(),
            keywords: Vec::new(),
        };
        for category in categories {
            categorizer.push(category);
        }
        categorizer
    }

    /// Catalog from `path` when it exists, the built-in catalog otherwise.
    pub async fn load(path: &Path) -> Result<Self, BudgetError> {
        match tokio::fs::read(path).await {
            Ok(raw) => {
                let categories: Vec<Category> = serde_json::from_slice(&raw)?;
                info!(path = %path.display(), count = categories.len(), "category catalog loaded");
                Ok(Self::new(categories))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), BudgetError> {
        let json = serde_json::to_vec_pretty(&self.categories)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    fn push(&mut self, category: Category) {
        let idx = self.categories.len();
        for kw in &category.keywords {
            let kw = kw.to_lowercase();
            match self.keywords.iter_mut().find(|(k, _)| *k == kw) {
                Some((_, cats)) => cats.push(idx),
                None => self.keywords.push((kw, vec![idx])),
            }
        }
        self.categories.push(category);
    }

    /// Add a user-defined category. Blank keywords are dropped.
    pub fn add_custom(
        &mut self,
        name: &str,
        emoji: Option<&str>,
        keywords: &[String],
    ) -> Result<Category, BudgetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BudgetError::Validation(
                "category name must not be empty".to_string(),
            ));
        }
        if self.contains(name) {
            return Err(BudgetError::Validation(format!(
                "category `{name}` already exists"
            )));
        }
        let emoji = emoji
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or("🔖");
        let category = Category {
            name: name.to_string(),
            emoji: emoji.to_string(),
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        };
        self.push(category.clone());
        info!(category = %category.name, keywords = category.keywords.len(), "custom category added");
        Ok(category)
    }

    /// Up to `top_n` ranked suggestions for free text.
    pub fn suggest(&self, text: &str, top_n: usize) -> Vec<Suggestion> {
        let text_l = text.to_lowercase();
        let mut scores = vec![0u32; self.categories.len()];
        let mut matched: Vec<Vec<String>> = vec![Vec::new(); self.categories.len()];

        for (kw, cats) in &self.keywords {
            if text_l.contains(kw.as_str()) {
                for &idx in cats {
                    scores[idx] += 3;
                    matched[idx].push(kw.clone());
                }
            }
        }

        let words = text_l
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| w.chars().count() >= FUZZY_MIN_LEN);
        for word in words {
            for (kw, cats) in &self.keywords {
                if kw.contains(' ') || text_l.contains(kw.as_str()) {
                    continue;
                }
                if strsim::normalized_damerau_levenshtein(word, kw) >= FUZZY_THRESHOLD {
                    for &idx in cats {
                        scores[idx] += 2;
                        matched[idx].push(format!("{word} ~ {kw} (fuzzy)"));
                    }
                }
            }
        }

        let mut bump = |name: &str, by: u32| {
            if let Some(idx) = self.index_of(name) {
                scores[idx] += by;
            }
        };
        if EDUCATION_CONTEXT.is_match(&text_l) {
            bump(EDUCATION, 2);
        }
        if HOME_CONTEXT.is_match(&text_l) {
            bump(HOME, 2);
        }
        let large_amount = FIRST_NUMBER
            .find(&text_l)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .is_some_and(|amt| amt > LARGE_AMOUNT);
        if large_amount {
            bump(HOME, 1);
            bump(INVESTMENT, 1);
        }

        let mut ranked: Vec<usize> = (0..scores.len()).filter(|&i| scores[i] > 0).collect();
        if ranked.is_empty() {
            return vec![self.fallback()];
        }
        ranked.sort_by(|&a, &b| scores[b].cmp(&scores[a]).then(a.cmp(&b)));

        let mut seen_bases = HashSet::new();
        ranked
            .into_iter()
            .filter(|&idx| seen_bases.insert(base_name(&self.categories[idx].name)))
            .take(top_n)
            .map(|idx| {
                let category = &self.categories[idx];
                let explanation = if matched[idx].is_empty() {
                    "No strong keyword match.".to_string()
                } else {
                    format!("Matched keywords: {}", matched[idx].join(", "))
                };
                Suggestion {
                    category: category.name.clone(),
                    score: scores[idx],
                    emoji: category.emoji.clone(),
                    explanation,
                }
            })
            .collect()
    }

    /// Name of the best suggestion.
    pub fn best(&self, text: &str) -> String {
        self.suggest(text, 1)
            .into_iter()
            .next()
            .map(|s| s.category)
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
    }

    fn fallback(&self) -> Suggestion {
        let emoji = self
            .index_of(FALLBACK_CATEGORY)
            .map(|idx| self.categories[idx].emoji.clone())
            .unwrap_or_default();
        Suggestion {
            category: FALLBACK_CATEGORY.to_string(),
            score: 1,
            emoji,
            explanation: "No strong keyword match.".to_string(),
        }
    }
}

/// `"Food & Dining"` -> `"food"`.
fn base_name(name: &str) -> String {
    name.split('&').next().unwrap_or(name).trim().to_lowercase()
}
