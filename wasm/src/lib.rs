//! WebAssembly module for the Depot Ledger
//!
//! Provides client-side computation for:
//! - Available bag and stock value calculations
//! - Sale previews before a sale is submitted
//! - An offline ledger that applies the same stock rules as the server

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

use shared::ledger::{self, Book, HistoryFilter, LedgerError};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

fn log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, JsValue> {
    Decimal::from_str(value.trim()).map_err(|e| js_error(format!("Invalid {}: {}", field, e)))
}

fn from_json<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| js_error(format!("Invalid {} JSON: {}", what, e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(js_error)
}

/// Ledger errors cross into JavaScript as JSON so the client can show the shortfall
fn ledger_error(err: LedgerError) -> JsValue {
    #[derive(Serialize)]
    struct ErrorBody {
        message: String,
        shortfall_bags: Option<i64>,
    }
    let body = ErrorBody {
        shortfall_bags: err.shortfall(),
        message: err.to_string(),
    };
    match serde_json::to_string(&body) {
        Ok(json) => JsValue::from_str(&json),
        Err(_) => js_error(err),
    }
}

/// Whole bags available in a quantity given in tonnes, e.g. "2.03" -> 40
#[wasm_bindgen]
pub fn calculate_available_bags(quantity: &str) -> Result<i64, JsValue> {
    Ok(available_bags(parse_decimal("quantity", quantity)?))
}

/// Value of a quantity in tonnes at a per-bag price
#[wasm_bindgen]
pub fn calculate_stock_value(quantity: &str, price_per_bag: &str) -> Result<String, JsValue> {
    let quantity = parse_decimal("quantity", quantity)?;
    let price = parse_decimal("price_per_bag", price_per_bag)?;
    Ok((quantity * Decimal::from(BAGS_PER_TONNE) * price).to_string())
}

/// Tonnes taken out of stock by selling `bags` bags
#[wasm_bindgen]
pub fn convert_bags_to_tonnes(bags: i64) -> String {
    bags_to_tonnes(bags).to_string()
}

#[derive(Deserialize)]
struct SalePreviewRequest {
    stock: Option<Stock>,
    depot_id: Uuid,
    product: Product,
    date: NaiveDate,
    bags_sold: i64,
}

/// Plan a sale without recording it. Returns the sale plan as JSON, or the rejection.
#[wasm_bindgen]
pub fn preview_sale(request_json: &str) -> Result<String, JsValue> {
    let request: SalePreviewRequest = from_json("sale preview", request_json)?;
    let plan = ledger::plan_sale(
        request.stock.as_ref(),
        request.depot_id,
        &request.product,
        request.date,
        request.bags_sold,
    )
    .map_err(ledger_error)?;
    to_json(&plan)
}

/// Check a manager phone number
#[wasm_bindgen]
pub fn is_valid_phone(phone: &str) -> bool {
    validate_zambian_phone(phone).is_ok()
}

/// Check a manager NRC number
#[wasm_bindgen]
pub fn is_valid_nrc(nrc: &str) -> bool {
    validate_nrc(nrc).is_ok()
}

#[derive(Deserialize)]
struct CreateStockRequest {
    depot_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    date: NaiveDate,
}

#[derive(Deserialize)]
struct UpdateStockRequest {
    stock_id: Uuid,
    quantity: Decimal,
    change_type: StockChangeType,
    description: Option<String>,
    date: NaiveDate,
}

/// Ledger kept in the browser while offline. State round-trips as JSON so it can be
/// persisted in local storage between sessions.
#[wasm_bindgen]
pub struct OfflineBook {
    book: Book,
}

#[wasm_bindgen]
impl OfflineBook {
    /// Empty ledger seeded with the initial depots and products
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<OfflineBook, JsValue> {
        let mut book = Book::new();
        for depot in initial_depots() {
            book.upsert_depot(depot).map_err(ledger_error)?;
        }
        for product in initial_products() {
            book.upsert_product(product).map_err(ledger_error)?;
        }
        Ok(OfflineBook { book })
    }

    /// Restore a ledger saved with `to_json`
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(state_json: &str) -> Result<OfflineBook, JsValue> {
        Ok(OfflineBook {
            book: from_json("book", state_json)?,
        })
    }

    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        to_json(&self.book)
    }

    pub fn depots(&self) -> Result<String, JsValue> {
        to_json(&self.book.depots())
    }

    pub fn products(&self) -> Result<String, JsValue> {
        to_json(&self.book.products())
    }

    pub fn stocks(&self) -> Result<String, JsValue> {
        to_json(&self.book.stocks())
    }

    #[wasm_bindgen(js_name = createStock)]
    pub fn create_stock(&mut self, request_json: &str) -> Result<String, JsValue> {
        let request: CreateStockRequest = from_json("stock", request_json)?;
        let stock = self
            .book
            .create_stock(
                request.depot_id,
                request.product_id,
                request.quantity,
                request.date,
            )
            .map_err(ledger_error)?;
        to_json(&stock)
    }

    #[wasm_bindgen(js_name = recordSale)]
    pub fn record_sale(&mut self, sale_json: &str) -> Result<String, JsValue> {
        let sale: RecordSale = from_json("sale", sale_json)?;
        let outcome = self.book.record_sale(&sale).map_err(ledger_error)?;
        log(&format!(
            "Offline sale of {} bags recorded, {} bags left",
            outcome.amounts.bags_sold, outcome.available_bags_after
        ));
        to_json(&outcome)
    }

    #[wasm_bindgen(js_name = updateStock)]
    pub fn update_stock(&mut self, request_json: &str) -> Result<String, JsValue> {
        let request: UpdateStockRequest = from_json("stock update", request_json)?;
        let (stock, history) = self
            .book
            .update_stock(
                request.stock_id,
                request.quantity,
                request.change_type,
                request.description,
                request.date,
            )
            .map_err(ledger_error)?;
        to_json(&(stock, history))
    }

    #[wasm_bindgen(js_name = recordPayment)]
    pub fn record_payment(&mut self, payment_json: &str) -> Result<String, JsValue> {
        let payment: RecordPayment = from_json("payment", payment_json)?;
        let payment = self.book.record_payment(payment).map_err(ledger_error)?;
        to_json(&payment)
    }

    /// History entries matching the filter JSON (`{}` for everything), newest first
    pub fn history(&self, filter_json: &str) -> Result<String, JsValue> {
        let filter: HistoryFilter = from_json("history filter", filter_json)?;
        to_json(&self.book.history(&filter))
    }

    /// Live rollup for an ISO date
    #[wasm_bindgen(js_name = dailyBalance)]
    pub fn daily_balance(&self, date: &str, opening_balance: Option<String>) -> Result<String, JsValue> {
        let date = NaiveDate::from_str(date).map_err(|e| js_error(format!("Invalid date: {}", e)))?;
        let opening = opening_balance
            .map(|o| parse_decimal("opening_balance", &o))
            .transpose()?;
        to_json(&self.book.daily_balance(date, opening))
    }

    #[wasm_bindgen(js_name = counterpartyBalance)]
    pub fn counterparty_balance(&self) -> Result<String, JsValue> {
        to_json(&self.book.counterparty_balance())
    }
}
