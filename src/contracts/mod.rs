//! Contract bindings for the read-only calls the prober and evaluator make.
//!
//! Only the functions actually called are declared. Everything here is a `view` call or,
//! for the QuoterV2, a state-changing function that is always executed through `eth_call`.

pub mod concentrated;
pub mod constant_product;
pub mod dual_pool;

pub use concentrated::{
    IUniswapV3Factory, IUniswapV3Pool, QuoteExactInputSingleParams, QuoteExactOutputSingleParams,
    QuoterV2,
};
pub use constant_product::{IUniswapV2Factory, IUniswapV2Pair};
pub use dual_pool::{ISolidlyFactory, ISolidlyPair};
