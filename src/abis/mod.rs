pub mod multicall;
pub mod oracle;

pub use multicall::{Call3, IMulticall3, McResult, IERC20};
pub use oracle::ISpotPriceOracle;
