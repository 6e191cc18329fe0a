use thiserror::Error;

use crate::{
    db_types::{OrderId, RatingSubject},
    traits::MarketplaceError,
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Order {0} does not exist")]
    UnknownOrder(OrderId),
    #[error("User {user} is not a party to order {order_id}")]
    NotAParty { order_id: OrderId, user: String },
    #[error("Listing {0} is no longer available")]
    ListingUnavailable(i64),
    #[error("{0}")]
    Database(#[from] MarketplaceError),
}

#[derive(Debug, Clone, Error)]
pub enum RatingError {
    #[error("Score {0} is out of range. Ratings are 1-5 stars.")]
    InvalidScore(i64),
    #[error("User {rater} has already rated {subject}")]
    DuplicateRating { subject: RatingSubject, rater: String },
    #[error("There is no open rating window for {0}")]
    NoSuchPendingRating(RatingSubject),
    #[error("User {rater} is not expected to rate {subject}")]
    NotExpectedRater { subject: RatingSubject, rater: String },
    #[error("{0}")]
    Database(#[from] MarketplaceError),
}

#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    #[error("User {user} does not own listing {listing_id}")]
    NotOwner { listing_id: i64, user: String },
    #[error("Listing {0} does not exist or is not active")]
    ListingNotFound(i64),
    #[error("Scheduled event {0} does not exist")]
    EventNotFound(i64),
    #[error("{0}")]
    Database(#[from] MarketplaceError),
}
