//! Chunk generation.
//!
//! An offer sells liquidity in indivisible units of its minimum order
//! size. Expansion turns each offer into the chunks one solve may draw
//! from: every chunk of an offer has the same all-in cost, and the
//! chunk count is bounded by `max_size` (or by one when the seller
//! cannot fulfil parallel orders).

use tracing::warn;

use crate::types::Offer;

/// Parts-per-million denominator for fee rates.
const PPM: u128 = 1_000_000;

/// One indivisible purchasable unit derived from an offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// All-in cost of buying this chunk, in satoshis.
    pub cost: u64,
    /// Liquidity obtained, equal to the source offer's `min_size`.
    pub liquidity: u64,
    /// Seller account, copied from the source offer.
    pub account: String,
}

/// All-in cost of one minimum-size order, floored to a whole satoshi.
fn chunk_cost(offer: &Offer, include_amboss_fee: bool) -> u64 {
    let total_ppm = offer.fee_rate as u128
        + if include_amboss_fee { offer.amboss_fee_rate as u128 } else { 0 };
    let fee_sats = (offer.min_size as u128 * total_ppm / PPM) as u64;
    offer.base_fee + fee_sats
}

/// All-in cost per satoshi of liquidity at the offer's minimum size.
///
/// The marketplace fee is always included: this is the buyer's real
/// price, used to order offers before solving. Callers must drop
/// `min_size == 0` offers first.
pub fn price_per_sat(offer: &Offer) -> f64 {
    chunk_cost(offer, true) as f64 / offer.min_size as f64
}

/// Expand one offer into its purchasable chunks.
///
/// Returns an empty vector when `min_size == 0`, since no meaningful
/// chunk can be formed. `max_chunks` is `max_size / min_size`, capped
/// at one for sellers that reject parallel orders.
pub fn expand_offer(offer: &Offer, include_amboss_fee: bool) -> Vec<Chunk> {
    if offer.min_size == 0 {
        return Vec::new();
    }
    let cost = chunk_cost(offer, include_amboss_fee);
    let mut max_chunks = offer.max_size / offer.min_size;
    if !offer.allow_parallel {
        max_chunks = max_chunks.min(1);
    }
    (0..max_chunks)
        .map(|_| Chunk {
            cost,
            liquidity: offer.min_size,
            account: offer.account.clone(),
        })
        .collect()
}

/// Expand a batch of offers, preserving offer order.
///
/// Chunk order doubles as the solver's tie-break order, so callers sort
/// the slice by price before expanding. Offers with `min_size == 0` are
/// skipped with a warning.
pub fn expand_offers(offers: &[Offer], include_amboss_fee: bool) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for offer in offers {
        if offer.min_size == 0 {
            warn!(offer_id = %offer.id, "Offer has min_size 0, skipping");
            continue;
        }
        chunks.extend(expand_offer(offer, include_amboss_fee));
    }
    chunks
}
