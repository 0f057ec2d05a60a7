//! In-memory ledger used by the offline client and in tests.
//!
//! All writes go through a [`UnitOfWork`] that stages changes on a private copy of the
//! book; `commit` swaps the copy in, dropping it discards every staged change.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    plan_adjustment, plan_opening, plan_sale, set_quantity, LedgerError, LedgerResult,
    StockMutation,
};
use crate::models::{
    sort_newest_first, CounterpartyBalance, DailyBalance, DailySale, Depot, NewDepot, NewProduct,
    Product, RecordPayment, RecordSale, SaleOutcome, Stock, StockChangeType, StockHistory,
    UcfPayment,
};
use crate::types::DateRange;
use crate::validation::{
    validate_amount, validate_description, validate_name, validate_quantity, validate_unit_price,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BookState {
    depots: Vec<Depot>,
    products: Vec<Product>,
    stocks: Vec<Stock>,
    history: Vec<StockHistory>,
    sales: Vec<DailySale>,
    payments: Vec<UcfPayment>,
    balances: Vec<DailyBalance>,
}

/// Stock history query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub stock_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &StockHistory) -> bool {
        self.stock_id.map_or(true, |id| entry.stock_id == id)
            && self.start_date.map_or(true, |start| entry.date >= start)
            && self.end_date.map_or(true, |end| entry.date <= end)
    }
}

/// In-memory depot ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Book {
    state: BookState,
}

/// Staged writes against a [`Book`]
pub struct UnitOfWork<'a> {
    target: &'a mut BookState,
    staged: BookState,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a unit of work. Nothing is visible until it is committed.
    pub fn begin(&mut self) -> UnitOfWork<'_> {
        let staged = self.state.clone();
        UnitOfWork {
            target: &mut self.state,
            staged,
        }
    }

    fn write<T>(&mut self, op: impl FnOnce(&mut UnitOfWork<'_>) -> LedgerResult<T>) -> LedgerResult<T> {
        let mut uow = self.begin();
        let value = op(&mut uow)?;
        uow.commit();
        Ok(value)
    }

    pub fn upsert_depot(&mut self, input: NewDepot) -> LedgerResult<(Depot, bool)> {
        self.write(|uow| uow.upsert_depot(input))
    }

    pub fn upsert_product(&mut self, input: NewProduct) -> LedgerResult<(Product, bool)> {
        self.write(|uow| uow.upsert_product(input))
    }

    pub fn create_stock(
        &mut self,
        depot_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        date: NaiveDate,
    ) -> LedgerResult<Stock> {
        self.write(|uow| uow.create_stock(depot_id, product_id, quantity, date))
    }

    pub fn record_sale(&mut self, input: &RecordSale) -> LedgerResult<SaleOutcome> {
        self.write(|uow| uow.record_sale(input))
    }

    pub fn update_stock(
        &mut self,
        stock_id: Uuid,
        new_quantity: Decimal,
        change_type: StockChangeType,
        description: Option<String>,
        date: NaiveDate,
    ) -> LedgerResult<(Stock, StockHistory)> {
        self.write(|uow| uow.update_stock(stock_id, new_quantity, change_type, description, date))
    }

    pub fn adjust_stock(
        &mut self,
        stock_id: Uuid,
        delta: Decimal,
        change_type: StockChangeType,
        description: Option<String>,
        date: NaiveDate,
    ) -> LedgerResult<(Stock, StockHistory)> {
        self.write(|uow| uow.adjust_stock(stock_id, delta, change_type, description, date))
    }

    pub fn record_payment(&mut self, input: RecordPayment) -> LedgerResult<UcfPayment> {
        self.write(|uow| uow.record_payment(input))
    }

    /// Materialize the rollup for `date`, replacing any earlier row for that date
    pub fn save_daily_balance(
        &mut self,
        date: NaiveDate,
        opening_balance: Option<Decimal>,
    ) -> LedgerResult<DailyBalance> {
        self.write(|uow| Ok(uow.save_daily_balance(date, opening_balance)))
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn depots(&self) -> &[Depot] {
        &self.state.depots
    }

    pub fn products(&self) -> &[Product] {
        &self.state.products
    }

    pub fn stocks(&self) -> &[Stock] {
        &self.state.stocks
    }

    pub fn stock(&self, stock_id: Uuid) -> Option<&Stock> {
        self.state.stocks.iter().find(|s| s.id == stock_id)
    }

    pub fn stock_for(&self, depot_id: Uuid, product_id: Uuid) -> Option<&Stock> {
        self.state.stock_for(depot_id, product_id)
    }

    /// Matching history entries, newest first
    pub fn history(&self, filter: &HistoryFilter) -> Vec<StockHistory> {
        // Reverse insertion order so entries created in the same instant stay newest first
        let mut entries: Vec<StockHistory> = self
            .state
            .history
            .iter()
            .rev()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect();
        sort_newest_first(&mut entries);
        entries
    }

    /// Sales dated inside `range` (inclusive), oldest first
    pub fn sales_between(&self, range: DateRange) -> Vec<DailySale> {
        let mut sales: Vec<DailySale> = self
            .state
            .sales
            .iter()
            .filter(|s| range.contains(s.date))
            .cloned()
            .collect();
        sales.sort_by_key(|s| s.date);
        sales
    }

    pub fn sales(&self) -> &[DailySale] {
        &self.state.sales
    }

    /// Payments, newest first
    pub fn payments(&self) -> Vec<UcfPayment> {
        let mut payments: Vec<UcfPayment> = self.state.payments.iter().rev().cloned().collect();
        payments.sort_by(|a, b| b.date.cmp(&a.date));
        payments
    }

    /// Live rollup for `date`
    pub fn daily_balance(&self, date: NaiveDate, opening_balance: Option<Decimal>) -> DailyBalance {
        self.state.daily_balance(date, opening_balance)
    }

    /// Previously materialized rollup for `date`, as it was last saved
    pub fn saved_daily_balance(&self, date: NaiveDate) -> Option<&DailyBalance> {
        self.state.balances.iter().find(|b| b.date == date)
    }

    pub fn counterparty_balance(&self) -> CounterpartyBalance {
        CounterpartyBalance::calculate(&self.state.sales, &self.state.payments)
    }
}

impl BookState {
    fn stock_for(&self, depot_id: Uuid, product_id: Uuid) -> Option<&Stock> {
        self.stocks
            .iter()
            .find(|s| s.depot_id == depot_id && s.product_id == product_id)
    }

    fn daily_balance(&self, date: NaiveDate, opening_balance: Option<Decimal>) -> DailyBalance {
        let opening = opening_balance.unwrap_or_else(|| self.carried_opening(date));
        DailyBalance::calculate(date, opening, &self.sales, &self.payments)
    }

    /// Closing balance of the latest materialized rollup before `date`
    fn carried_opening(&self, date: NaiveDate) -> Decimal {
        self.balances
            .iter()
            .filter(|b| b.date < date)
            .max_by_key(|b| b.date)
            .map(|b| b.closing_balance)
            .unwrap_or(Decimal::ZERO)
    }
}

impl<'a> UnitOfWork<'a> {
    /// Make every staged change visible
    pub fn commit(self) {
        *self.target = self.staged;
    }

    pub fn upsert_depot(&mut self, input: NewDepot) -> LedgerResult<(Depot, bool)> {
        validate_name(&input.name).map_err(|e| LedgerError::validation("name", e))?;
        let name = input.name.trim();
        if let Some(existing) = self.staged.depots.iter().find(|d| d.name == name) {
            return Ok((existing.clone(), false));
        }
        let depot = Depot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            district: input.district,
            manager: input.manager,
            phone: input.phone,
            nrc: input.nrc,
            created_at: Utc::now(),
        };
        self.staged.depots.push(depot.clone());
        Ok((depot, true))
    }

    pub fn upsert_product(&mut self, input: NewProduct) -> LedgerResult<(Product, bool)> {
        validate_name(&input.name).map_err(|e| LedgerError::validation("name", e))?;
        validate_unit_price(input.price_per_bag)
            .map_err(|e| LedgerError::validation("price_per_bag", e))?;
        validate_unit_price(input.commission_per_bag)
            .map_err(|e| LedgerError::validation("commission_per_bag", e))?;
        let name = input.name.trim();
        if let Some(existing) = self.staged.products.iter().find(|p| p.name == name) {
            return Ok((existing.clone(), false));
        }
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price_per_bag: input.price_per_bag,
            commission_per_bag: input.commission_per_bag,
            created_at: Utc::now(),
        };
        self.staged.products.push(product.clone());
        Ok((product, true))
    }

    /// Change a product's bag price. Recorded sales keep the amounts they were sold at.
    pub fn set_product_price(
        &mut self,
        product_id: Uuid,
        price_per_bag: Decimal,
        commission_per_bag: Decimal,
    ) -> LedgerResult<Product> {
        validate_unit_price(price_per_bag).map_err(|e| LedgerError::validation("price_per_bag", e))?;
        validate_unit_price(commission_per_bag)
            .map_err(|e| LedgerError::validation("commission_per_bag", e))?;
        let product = self
            .staged
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| LedgerError::NotFound("Product".to_string()))?;
        product.price_per_bag = price_per_bag;
        product.commission_per_bag = commission_per_bag;
        Ok(product.clone())
    }

    pub fn create_stock(
        &mut self,
        depot_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        date: NaiveDate,
    ) -> LedgerResult<Stock> {
        validate_quantity(quantity).map_err(|e| LedgerError::validation("quantity", e))?;
        self.depot(depot_id)?;
        self.product(product_id)?;
        if self.staged.stock_for(depot_id, product_id).is_some() {
            return Err(LedgerError::DuplicateKey(
                "stock for this depot and product".to_string(),
            ));
        }

        let now = Utc::now();
        let stock = Stock {
            id: Uuid::new_v4(),
            depot_id,
            product_id,
            quantity,
            updated_at: now,
        };
        self.staged.stocks.push(stock.clone());
        if let Some(opening) = plan_opening(&stock, date) {
            self.staged
                .history
                .push(opening.to_history(Uuid::new_v4(), now));
        }
        Ok(stock)
    }

    /// Record a sale: snapshot amounts, create or accumulate the day's row, deduct
    /// stock and write the sale's history entry.
    pub fn record_sale(&mut self, input: &RecordSale) -> LedgerResult<SaleOutcome> {
        self.depot(input.depot_id)?;
        let product = self.product(input.product_id)?.clone();
        let stock = self.staged.stock_for(input.depot_id, input.product_id).cloned();
        let plan = plan_sale(
            stock.as_ref(),
            input.depot_id,
            &product,
            input.date,
            input.bags_sold,
        )?;

        let now = Utc::now();
        let existing = self.staged.sales.iter_mut().find(|s| {
            s.date == input.date
                && s.depot_id == input.depot_id
                && s.product_id == input.product_id
        });
        let sale = match existing {
            Some(_) if !input.accumulate => {
                return Err(LedgerError::DuplicateKey(format!(
                    "sale for this depot and product on {}",
                    input.date
                )));
            }
            Some(row) => {
                row.accumulate(&plan.amounts, now);
                row.clone()
            }
            None => {
                let row = DailySale {
                    id: Uuid::new_v4(),
                    date: input.date,
                    depot_id: input.depot_id,
                    product_id: input.product_id,
                    bags_sold: plan.amounts.bags_sold,
                    total_amount: plan.amounts.total_amount,
                    commission_earned: plan.amounts.commission_earned,
                    created_at: now,
                    updated_at: now,
                };
                self.staged.sales.push(row.clone());
                row
            }
        };

        let (_, history) = self.commit_mutation(&plan.mutation)?;

        Ok(SaleOutcome {
            sale,
            amounts: plan.amounts,
            history,
            available_bags_before: plan.available_bags_before,
            available_bags_after: plan.available_bags_after,
        })
    }

    pub fn update_stock(
        &mut self,
        stock_id: Uuid,
        new_quantity: Decimal,
        change_type: StockChangeType,
        description: Option<String>,
        date: NaiveDate,
    ) -> LedgerResult<(Stock, StockHistory)> {
        let stock = self.stock(stock_id)?;
        let mutation = set_quantity(&stock, new_quantity, change_type, description, date)?;
        self.commit_mutation(&mutation)
    }

    pub fn adjust_stock(
        &mut self,
        stock_id: Uuid,
        delta: Decimal,
        change_type: StockChangeType,
        description: Option<String>,
        date: NaiveDate,
    ) -> LedgerResult<(Stock, StockHistory)> {
        let stock = self.stock(stock_id)?;
        let mutation = plan_adjustment(&stock, delta, change_type, description, date)?;
        self.commit_mutation(&mutation)
    }

    pub fn record_payment(&mut self, input: RecordPayment) -> LedgerResult<UcfPayment> {
        validate_amount(input.amount).map_err(|e| LedgerError::validation("amount", e))?;
        validate_description(&input.description)
            .map_err(|e| LedgerError::validation("description", e))?;
        let payment = UcfPayment {
            id: Uuid::new_v4(),
            date: input.date,
            payment_type: input.payment_type,
            amount: input.amount,
            description: input.description,
            reference_number: input.reference_number.filter(|r| !r.trim().is_empty()),
            created_at: Utc::now(),
        };
        self.staged.payments.push(payment.clone());
        Ok(payment)
    }

    pub fn save_daily_balance(
        &mut self,
        date: NaiveDate,
        opening_balance: Option<Decimal>,
    ) -> DailyBalance {
        let balance = self.staged.daily_balance(date, opening_balance);
        self.staged.balances.retain(|b| b.date != date);
        self.staged.balances.push(balance.clone());
        balance
    }

    /// Write a planned mutation and its audit entry together
    fn commit_mutation(&mut self, mutation: &StockMutation) -> LedgerResult<(Stock, StockHistory)> {
        let now = Utc::now();
        let stock = self
            .staged
            .stocks
            .iter_mut()
            .find(|s| s.id == mutation.stock_id)
            .ok_or_else(|| LedgerError::NotFound("Stock".to_string()))?;
        if stock.quantity != mutation.previous_quantity {
            return Err(LedgerError::validation(
                "stock",
                "stock changed since the mutation was planned",
            ));
        }
        *stock = mutation.apply_to(stock, now);
        let stock = stock.clone();

        let history = mutation.to_history(Uuid::new_v4(), now);
        self.staged.history.push(history.clone());
        Ok((stock, history))
    }

    fn depot(&self, depot_id: Uuid) -> LedgerResult<&Depot> {
        self.staged
            .depots
            .iter()
            .find(|d| d.id == depot_id)
            .ok_or_else(|| LedgerError::NotFound("Depot".to_string()))
    }

    fn product(&self, product_id: Uuid) -> LedgerResult<&Product> {
        self.staged
            .products
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| LedgerError::NotFound("Product".to_string()))
    }

    fn stock(&self, stock_id: Uuid) -> LedgerResult<Stock> {
        self.staged
            .stocks
            .iter()
            .find(|s| s.id == stock_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound("Stock".to_string()))
    }
}
