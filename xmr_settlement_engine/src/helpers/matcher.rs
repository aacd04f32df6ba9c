//! The invoice matcher.
//!
//! Pure functions only: given the expected amount, the transfers visible for the invoice's
//! receiving subaddress and the current chain height, decide which transfer (if any) pays the
//! invoice and how deeply it is confirmed. All settlement decisions flow through
//! [`best_transfer_match`], so the matching policy lives in exactly one place.
//!
//! Policy:
//! * A transfer qualifies when its amount is `>=` the requested amount. No tolerance band,
//!   no partial payments.
//! * A previously recorded transaction stays matched for as long as it remains visible, even if
//!   a larger or fresher transfer arrives later.
//! * Otherwise, ties are broken by the greatest block height (freshest first); transfers still
//!   in the txpool (height zero) rank lowest and carry zero confirmations.

use xsg_common::Piconero;

use crate::db_types::{IncomingTransfer, TransferMatch};

/// Selects the best candidate transfer for an invoice, or `None` if no qualifying payment has
/// arrived yet.
pub fn best_transfer_match(
    expected: Piconero,
    recorded_txid: Option<&str>,
    transfers: &[IncomingTransfer],
    current_height: u64,
) -> Option<TransferMatch> {
    let candidates: Vec<&IncomingTransfer> = transfers.iter().filter(|t| t.amount >= expected).collect();
    let sticky = recorded_txid.and_then(|txid| candidates.iter().find(|t| t.txid == txid).copied());
    let chosen = match sticky {
        Some(t) => t,
        None => candidates.into_iter().max_by_key(|t| t.height)?,
    };
    Some(TransferMatch {
        txid: chosen.txid.clone(),
        amount: chosen.amount,
        height: chosen.height,
        confirmations: confirmations_at(chosen.height, current_height),
    })
}

/// Confirmation depth of a transfer mined at `height` when the chain tip is `current_height`.
/// Unmined transfers (height zero) have zero confirmations.
pub fn confirmations_at(height: u64, current_height: u64) -> u64 {
    if height > 0 {
        current_height.saturating_sub(height)
    } else {
        0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn xmr(amount: f64) -> Piconero {
        Piconero::from_xmr(amount)
    }

    #[test]
    fn no_qualifying_transfer_means_no_match() {
        let transfers = vec![IncomingTransfer::new("tx1", xmr(0.3), 990)];
        assert!(best_transfer_match(xmr(1.0), None, &transfers, 1000).is_none());
        assert!(best_transfer_match(xmr(1.0), None, &[], 1000).is_none());
    }

    #[test]
    fn exact_and_overpaying_transfers_qualify() {
        let transfers = vec![IncomingTransfer::new("tx1", xmr(1.0), 990)];
        let m = best_transfer_match(xmr(1.0), None, &transfers, 1000).unwrap();
        assert_eq!(m.txid, "tx1");
        assert_eq!(m.confirmations, 10);

        let transfers = vec![IncomingTransfer::new("tx2", xmr(1.5), 990)];
        assert!(best_transfer_match(xmr(1.0), None, &transfers, 1000).is_some());
    }

    #[test]
    fn ties_break_towards_the_freshest_transfer() {
        // Amounts 1.0 and 1.2 against an expected 1.0, heights 100 and 105, tip at 110:
        // the height-105 transfer wins with 5 confirmations.
        let transfers =
            vec![IncomingTransfer::new("older", xmr(1.0), 100), IncomingTransfer::new("fresher", xmr(1.2), 105)];
        let m = best_transfer_match(xmr(1.0), None, &transfers, 110).unwrap();
        assert_eq!(m.txid, "fresher");
        assert_eq!(m.height, 105);
        assert_eq!(m.confirmations, 5);
    }

    #[test]
    fn recorded_transaction_stays_matched_while_visible() {
        let transfers =
            vec![IncomingTransfer::new("recorded", xmr(1.0), 100), IncomingTransfer::new("fresher", xmr(1.2), 105)];
        let m = best_transfer_match(xmr(1.0), Some("recorded"), &transfers, 110).unwrap();
        assert_eq!(m.txid, "recorded");
        assert_eq!(m.confirmations, 10);
    }

    #[test]
    fn vanished_recorded_transaction_falls_back_to_best_candidate() {
        let transfers = vec![IncomingTransfer::new("replacement", xmr(1.0), 105)];
        let m = best_transfer_match(xmr(1.0), Some("gone"), &transfers, 110).unwrap();
        assert_eq!(m.txid, "replacement");
    }

    #[test]
    fn unmined_transfers_have_zero_confirmations_and_rank_lowest() {
        let transfers = vec![IncomingTransfer::new("pool", xmr(1.0), 0)];
        let m = best_transfer_match(xmr(1.0), None, &transfers, 1000).unwrap();
        assert_eq!(m.confirmations, 0);

        let transfers =
            vec![IncomingTransfer::new("pool", xmr(1.0), 0), IncomingTransfer::new("mined", xmr(1.0), 400)];
        let m = best_transfer_match(xmr(1.0), None, &transfers, 1000).unwrap();
        assert_eq!(m.txid, "mined");
    }

    #[test]
    fn tip_below_transfer_height_saturates_to_zero() {
        // The wallet can briefly report a height behind the transfer during a rescan.
        assert_eq!(confirmations_at(1000, 990), 0);
    }
}
