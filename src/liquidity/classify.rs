//! Offer network-restriction classification.
//!
//! Magma sellers can attach a `NODE_SOCKETS` condition that excludes
//! counterparties reachable only over Tor. Offers carrying such a
//! condition are left out of the Tor-eligible purchasing-power curve.

use crate::types::Offer;

/// Whether an offer refuses Tor-only counterparties.
///
/// True iff any condition has `condition == "NODE_SOCKETS"` and either
/// rejects the value `TOR` (`NOT_EQUAL_TO`) or demands the value
/// `CLEARNET` (`CONTAINS`). Values compare case-insensitively and as
/// whole words; the marketplace posts socket classes, not substrings,
/// so `CONTAINS` is an equality check here.
pub fn is_network_restricted(offer: &Offer) -> bool {
    offer.conditions.iter().any(|c| {
        c.condition == "NODE_SOCKETS"
            && ((c.operator == "NOT_EQUAL_TO" && c.value.eq_ignore_ascii_case("tor"))
                || (c.operator == "CONTAINS" && c.value.eq_ignore_ascii_case("clearnet")))
    })
}
