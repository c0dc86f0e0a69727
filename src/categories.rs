use crate::error::{FinancePlannerError, Result};
use crate::schema::{Category, CategoryClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The categories a user can assign, indexed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryBook {
    categories: BTreeMap<String, Category>,
}

impl CategoryBook {
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for category in categories {
            if category.id.trim().is_empty() {
                return Err(FinancePlannerError::InvalidInput(format!(
                    "Category '{}' has an empty id",
                    category.name
                )));
            }
            if map.contains_key(&category.id) {
                return Err(FinancePlannerError::InvalidInput(format!(
                    "Duplicate category id '{}'",
                    category.id
                )));
            }
            map.insert(category.id.clone(), category);
        }
        Ok(Self { categories: map })
    }

    /// Starter set created for new users.
    pub fn turkish_defaults() -> Self {
        let defaults = [
            ("salary", "Maaş", CategoryClass::Revenue),
            ("sales", "Satış Gelirleri", CategoryClass::Revenue),
            ("freelance", "Serbest Çalışma", CategoryClass::Revenue),
            ("goods", "Satılan Mal Maliyeti", CategoryClass::CostOfSales),
            ("rent", "Kira", CategoryClass::OperatingExpense),
            ("utilities", "Faturalar", CategoryClass::OperatingExpense),
            ("groceries", "Market", CategoryClass::OperatingExpense),
            ("dining", "Yeme İçme", CategoryClass::OperatingExpense),
            ("transport", "Ulaşım", CategoryClass::OperatingExpense),
            ("health", "Sağlık", CategoryClass::OperatingExpense),
            ("subscriptions", "Abonelikler", CategoryClass::OperatingExpense),
            ("marketing", "Pazarlama", CategoryClass::OperatingExpense),
            ("interest_income", "Faiz Geliri", CategoryClass::FinancialIncome),
            ("bank_fees", "Banka Masrafları", CategoryClass::FinancialExpense),
            ("interest_expense", "Kredi Faizi", CategoryClass::FinancialExpense),
            ("tax", "Vergi", CategoryClass::Tax),
            ("transfer", "Virman / Kart Ödemesi", CategoryClass::Transfer),
        ];

        Self {
            categories: defaults
                .into_iter()
                .map(|(id, name, class)| (id.to_string(), Category::new(id, name, class)))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.categories.contains_key(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        let wanted = normalize_name(name);
        self.categories
            .values()
            .find(|c| normalize_name(&c.name) == wanted)
    }

    pub fn class_of(&self, id: &str) -> Option<CategoryClass> {
        self.get(id).map(|c| c.class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// One `id: name (class)` line per category, for inclusion in model prompts.
    pub fn prompt_listing(&self) -> String {
        self.categories
            .values()
            .map(|c| {
                let class = serde_json::to_value(c.class)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                format!("- {}: {} ({})", c.id, c.name, class)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Case- and dotted/dotless-i-insensitive key. Bank exports often upper-case Turkish
/// text as plain ASCII (`KADIKOY`), so `ı`, `i`, `I` and `İ` all fold to `i`.
pub(crate) fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace('\u{307}', "")
        .replace('ı', "i")
}
