//! Row types and read queries for the `merchants` table.

mod read;
mod types;

pub use read::{get_merchant_by_slug, list_active_merchants};
pub use types::{MerchantCandidateRow, MerchantDistanceRow, MerchantRow};
