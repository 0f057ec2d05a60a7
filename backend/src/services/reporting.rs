//! Reporting service for the dashboard and sales report export

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::settlement::SettlementService;
use super::stock::{StockHistoryView, StockService, StockView};
use crate::error::AppResult;
use crate::models::UcfPayment;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_sales: Decimal,
    pub total_commissions: Decimal,
    pub total_stock_value: Decimal,
    pub total_available_bags: i64,
    pub stocks: Vec<StockView>,
    pub recent_payments: Vec<UcfPayment>,
    pub recent_history: Vec<StockHistoryView>,
}

const RECENT_PAYMENTS: i64 = 5;
const RECENT_HISTORY: i64 = 10;

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All-time totals, current stock and the latest activity
    pub async fn get_dashboard_metrics(&self) -> AppResult<DashboardMetrics> {
        let (total_sales, total_commissions) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT COALESCE(SUM(total_amount), 0), COALESCE(SUM(commission_earned), 0)
            FROM daily_sales
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let stock_service = StockService::new(self.db.clone());
        let stocks = stock_service.list_stocks().await?;
        let recent_history = stock_service.recent_history(RECENT_HISTORY).await?;
        let recent_payments = SettlementService::new(self.db.clone())
            .recent_payments(RECENT_PAYMENTS)
            .await?;

        Ok(DashboardMetrics {
            total_sales,
            total_commissions,
            total_stock_value: stocks.iter().map(|s| s.monetary_value).sum(),
            total_available_bags: stocks.iter().map(|s| s.available_bags).sum(),
            stocks,
            recent_payments,
            recent_history,
        })
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record).map_err(|e| {
                crate::error::AppError::Internal(format!("CSV serialization error: {}", e))
            })?;
        }
        let csv_data = String::from_utf8(wtr.into_inner().map_err(|e| {
            crate::error::AppError::Internal(format!("CSV writer error: {}", e))
        })?)
        .map_err(|e| crate::error::AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::report::SalesReportRow;

    #[test]
    fn test_export_sales_rows_to_csv() {
        let rows = vec![SalesReportRow {
            date: NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
            depot: "MONZE".to_string(),
            product: "UREA".to_string(),
            bags_sold: 2,
            total_amount: Decimal::new(240000, 2),
            commission_earned: Decimal::new(10000, 2),
        }];

        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("date,depot,product,bags_sold,total_amount,commission_earned")
        );
        assert_eq!(lines.next(), Some("2024-11-04,MONZE,UREA,2,2400.00,100.00"));
        assert_eq!(lines.next(), None);
    }
}
