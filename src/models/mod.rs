mod combined;
mod epoch;
mod pool;
mod price;
mod token;

pub use combined::{CombinedRecord, RewardValue};
pub use epoch::{EpochRecord, RewardAmount};
pub use pool::PoolRecord;
pub use price::{PricePoint, PriceSourceKind};
pub use token::{TokenAddress, TokenRecord, TokenRegistry, DEFAULT_TOKEN_DECIMALS};
