use log::*;

use crate::{
    db_types::{Listing, Side, UserId},
    traits::{MarketplaceDatabase, MarketplaceError},
};

/// Finds opposite-side listings for an incoming buy/sell request.
///
/// Candidates are active listings in the same guild and zone on the opposite side whose item matches the request
/// (case-insensitive, with "All Items" acting as a wildcard), excluding the requester's own listings. They come back
/// oldest first, so the earliest poster gets first shot. The caller decides how many to consume; the order flow takes
/// exactly one per request to avoid notification storms.
pub struct Matcher<B> {
    db: B,
}

impl<B> Matcher<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> Matcher<B>
where B: MarketplaceDatabase
{
    pub async fn find_matches(
        &self,
        requester: &UserId,
        guild: &str,
        side: Side,
        zone: &str,
        item: &str,
    ) -> Result<Vec<Listing>, MarketplaceError> {
        let candidates = self.db.fetch_active_listings(guild, side.opposite(), zone, Some(item)).await?;
        let matches = candidates.into_iter().filter(|l| &l.owner != requester).collect::<Vec<_>>();
        trace!("🔎️ {} candidate(s) for a {side} request on {item} in {zone}", matches.len());
        Ok(matches)
    }
}
