//! Sales report layout for plain text export

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::SalesTotals;
use crate::types::DateRange;

/// One sale line with catalog names resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesReportRow {
    pub date: NaiveDate,
    pub depot: String,
    pub product: String,
    pub bags_sold: i64,
    pub total_amount: Decimal,
    pub commission_earned: Decimal,
}

/// Sales in a date range with their totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReport {
    pub range: DateRange,
    pub rows: Vec<SalesReportRow>,
    pub totals: SalesTotals,
}

const RULE_WIDTH: usize = 60;

impl SalesReport {
    pub fn new(range: DateRange, rows: Vec<SalesReportRow>) -> Self {
        let totals = rows.iter().fold(SalesTotals::default(), |mut acc, row| {
            acc.total_bags += row.bags_sold;
            acc.total_sales += row.total_amount;
            acc.total_commissions += row.commission_earned;
            acc
        });
        Self {
            range,
            rows,
            totals,
        }
    }

    /// Download name, e.g. `sales_report_2024-11-01_to_2024-11-30.txt`
    pub fn filename(&self, extension: &str) -> String {
        format!(
            "sales_report_{}_to_{}.{}",
            self.range.start, self.range.end, extension
        )
    }

    /// Fixed-column text layout with a trailing totals line
    pub fn render_text(&self, company_name: &str, currency_symbol: &str) -> String {
        let money = |amount: Decimal| format!("{}{:.2}", currency_symbol, amount);

        let mut lines = Vec::with_capacity(self.rows.len() + 6);
        lines.push(format!(
            "{} - Sales Report ({} to {})",
            company_name, self.range.start, self.range.end
        ));
        lines.push("=".repeat(RULE_WIDTH));
        lines.push(format!(
            "{:<12} {:<15} {:<15} {:<6} {:<12} {:<12}",
            "Date", "Depot", "Product", "Bags", "Amount", "Commission"
        ));
        lines.push("-".repeat(RULE_WIDTH));
        for row in &self.rows {
            lines.push(format!(
                "{:<12} {:<15} {:<15} {:<6} {:<12} {:<12}",
                row.date.to_string(),
                row.depot,
                row.product,
                row.bags_sold,
                money(row.total_amount),
                money(row.commission_earned)
            ));
        }
        lines.push("-".repeat(RULE_WIDTH));
        lines.push(format!(
            "{:<51} {:<12} {:<12}",
            "TOTAL",
            money(self.totals.total_sales),
            money(self.totals.total_commissions)
        ));

        lines
            .iter()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
