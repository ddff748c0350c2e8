pub mod dashboard;
pub mod stock;

pub use stock::StockService;
