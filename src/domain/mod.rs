pub mod order;
pub mod tax;

pub use order::{Order, OrderError, OrderStatus};
pub use tax::{split_inclusive, TaxSplit};
