pub mod products;
pub mod reports;
pub mod suppliers;
pub mod system;
pub mod transactions;
