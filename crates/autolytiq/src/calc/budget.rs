use serde::{Deserialize, Serialize};

use super::{require_positive, round_currency, CalcError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategoryKind {
    Needs,
    Wants,
    Savings,
}

impl BudgetCategoryKind {
    pub const fn ordered() -> [Self; 3] {
        [Self::Needs, Self::Wants, Self::Savings]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Needs => "Needs",
            Self::Wants => "Wants",
            Self::Savings => "Savings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategoryRule {
    pub name: String,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub kind: BudgetCategoryKind,
    pub percent: u8,
    pub subcategories: Vec<SubcategoryRule>,
}

/// Percentage table used to split take-home pay.
///
/// Weekly and daily figures divide the monthly amount by fixed approximations rather
/// than calendar-exact counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRule {
    pub name: String,
    pub categories: Vec<CategoryRule>,
    pub weeks_per_month: f64,
    pub days_per_month: f64,
}

fn category(kind: BudgetCategoryKind, percent: u8, subcategories: &[(&str, u8)]) -> CategoryRule {
    CategoryRule {
        kind,
        percent,
        subcategories: subcategories
            .iter()
            .map(|(name, percent)| SubcategoryRule {
                name: (*name).to_string(),
                percent: *percent,
            })
            .collect(),
    }
}

impl AllocationRule {
    pub fn fifty_thirty_twenty() -> Self {
        Self {
            name: "50/30/20".to_string(),
            categories: vec![
                category(
                    BudgetCategoryKind::Needs,
                    50,
                    &[
                        ("Housing", 25),
                        ("Utilities", 5),
                        ("Groceries", 10),
                        ("Transportation", 10),
                    ],
                ),
                category(
                    BudgetCategoryKind::Wants,
                    30,
                    &[
                        ("Dining Out", 5),
                        ("Subscriptions", 5),
                        ("Travel/Fun", 10),
                        ("Personal", 10),
                    ],
                ),
                category(
                    BudgetCategoryKind::Savings,
                    20,
                    &[("Emergency Fund", 10), ("Investments", 5), ("Goals", 5)],
                ),
            ],
            weeks_per_month: 4.33,
            days_per_month: 30.0,
        }
    }

    /// Variant for high-cost areas where housing takes a larger share.
    pub fn sixty_twenty_twenty() -> Self {
        Self {
            name: "60/20/20".to_string(),
            categories: vec![
                category(
                    BudgetCategoryKind::Needs,
                    60,
                    &[
                        ("Housing", 30),
                        ("Utilities", 5),
                        ("Groceries", 15),
                        ("Transportation", 10),
                    ],
                ),
                category(
                    BudgetCategoryKind::Wants,
                    20,
                    &[
                        ("Dining Out", 5),
                        ("Subscriptions", 5),
                        ("Travel/Fun", 5),
                        ("Personal", 5),
                    ],
                ),
                category(
                    BudgetCategoryKind::Savings,
                    20,
                    &[("Emergency Fund", 10), ("Investments", 5), ("Goals", 5)],
                ),
            ],
            weeks_per_month: 4.33,
            days_per_month: 30.0,
        }
    }

    pub fn category(&self, kind: BudgetCategoryKind) -> Option<&CategoryRule> {
        self.categories.iter().find(|category| category.kind == kind)
    }

    /// Ensures each category appears once, parents total 100, and children sum to parents.
    pub fn validate(&self) -> Result<(), CalcError> {
        if self.categories.len() != BudgetCategoryKind::ordered().len() {
            return Err(CalcError::invalid(
                "allocation_rule",
                "needs, wants, and savings must each appear once",
            ));
        }
        for kind in BudgetCategoryKind::ordered() {
            let rule = self.category(kind).ok_or(CalcError::invalid(
                "allocation_rule",
                "needs, wants, and savings must each appear once",
            ))?;
            let children: u32 = rule
                .subcategories
                .iter()
                .map(|sub| u32::from(sub.percent))
                .sum();
            if children != u32::from(rule.percent) {
                return Err(CalcError::invalid(
                    "allocation_rule",
                    "subcategory percentages must sum to their category",
                ));
            }
        }

        let total: u32 = self
            .categories
            .iter()
            .map(|category| u32::from(category.percent))
            .sum();
        if total != 100 {
            return Err(CalcError::invalid(
                "allocation_rule",
                "category percentages must sum to 100",
            ));
        }

        require_positive("weeks_per_month", self.weeks_per_month)?;
        require_positive("days_per_month", self.days_per_month)?;
        Ok(())
    }
}

impl Default for AllocationRule {
    fn default() -> Self {
        Self::fifty_thirty_twenty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subcategory {
    pub name: String,
    pub percent: u8,
    pub monthly: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetCategory {
    pub kind: BudgetCategoryKind,
    pub name: &'static str,
    pub percent: u8,
    pub monthly: i64,
    pub weekly: i64,
    pub daily: i64,
    pub subcategories: Vec<Subcategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetAllocation {
    pub rule: String,
    pub net_monthly: i64,
    pub needs: BudgetCategory,
    pub wants: BudgetCategory,
    pub savings: BudgetCategory,
}

/// Splits `net_monthly` take-home pay according to `rule`.
pub fn allocate_budget(rule: &AllocationRule, net_monthly: f64) -> Result<BudgetAllocation, CalcError> {
    let net_monthly = require_positive("net_monthly", net_monthly)?;
    rule.validate()?;

    let allocate = |kind: BudgetCategoryKind| -> Result<BudgetCategory, CalcError> {
        let category = rule.category(kind).ok_or(CalcError::invalid(
            "allocation_rule",
            "needs, wants, and savings must each appear once",
        ))?;
        let monthly = net_monthly * share(category.percent);
        Ok(BudgetCategory {
            kind,
            name: kind.label(),
            percent: category.percent,
            monthly: round_currency(monthly),
            weekly: round_currency(monthly / rule.weeks_per_month),
            daily: round_currency(monthly / rule.days_per_month),
            subcategories: category
                .subcategories
                .iter()
                .map(|sub| Subcategory {
                    name: sub.name.clone(),
                    percent: sub.percent,
                    monthly: round_currency(net_monthly * share(sub.percent)),
                })
                .collect(),
        })
    };

    Ok(BudgetAllocation {
        rule: rule.name.clone(),
        net_monthly: round_currency(net_monthly),
        needs: allocate(BudgetCategoryKind::Needs)?,
        wants: allocate(BudgetCategoryKind::Wants)?,
        savings: allocate(BudgetCategoryKind::Savings)?,
    })
}

fn share(percent: u8) -> f64 {
    f64::from(percent) / 100.0
}
