//! REST calls to the auction gateway: auctions, bids and follow interest.

mod client;
mod error;
mod status;
mod types;

#[cfg(test)]
mod tests;

pub use client::{GatewayClient, INVALID_BID_MESSAGE};
pub use error::ApiError;
pub use status::{StatusLevel, StatusMessage};
pub use types::{Auction, BidReceipt, InterestRequest, NewAuction, NewBid};
