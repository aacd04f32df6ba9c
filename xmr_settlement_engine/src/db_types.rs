use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use xsg_common::Piconero;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------      InvoiceId      ---------------------------------------------------------
/// The opaque, unique identifier assigned to an invoice by the (external) creation API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct InvoiceId(pub String);

impl FromStr for InvoiceId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for InvoiceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl InvoiceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    InvoiceStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// The invoice has been created and no qualifying payment has been observed yet.
    Pending,
    /// A qualifying transfer has been seen on-chain, but is not buried deeply enough yet.
    Paid,
    /// The matched transfer reached the required confirmation depth and the subscription has
    /// been credited. Terminal.
    Confirmed,
    /// The invoice aged out before a payment arrived. Terminal.
    Expired,
    /// Set by admin tooling when a payment is returned. Terminal; the watcher never sets or
    /// inspects this state.
    Refunded,
}

impl InvoiceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Confirmed | InvoiceStatus::Expired | InvoiceStatus::Refunded)
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "Pending"),
            InvoiceStatus::Paid => write!(f, "Paid"),
            InvoiceStatus::Confirmed => write!(f, "Confirmed"),
            InvoiceStatus::Expired => write!(f, "Expired"),
            InvoiceStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Confirmed" => Ok(Self::Confirmed),
            "Expired" => Ok(Self::Expired),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid invoice status: {s}"))),
        }
    }
}

impl From<String> for InvoiceStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid invoice status: {value}. But this conversion cannot fail. Defaulting to Pending");
            InvoiceStatus::Pending
        })
    }
}

//--------------------------------------  SubscriptionPlan   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SubscriptionPlan {
    Monthly,
    Yearly,
}

impl SubscriptionPlan {
    /// The entitlement period one paid invoice buys.
    pub fn duration(&self) -> Duration {
        match self {
            SubscriptionPlan::Monthly => Duration::days(30),
            SubscriptionPlan::Yearly => Duration::days(365),
        }
    }
}

impl Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionPlan::Monthly => write!(f, "Monthly"),
            SubscriptionPlan::Yearly => write!(f, "Yearly"),
        }
    }
}

impl FromStr for SubscriptionPlan {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            s => Err(ConversionError(format!("Invalid subscription plan: {s}"))),
        }
    }
}

//--------------------------------------       Invoice       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub invoice_id: InvoiceId,
    pub user_id: String,
    /// The receiving (sub)address payments for this invoice arrive on.
    pub receiving_address: String,
    /// Wallet account the receiving address belongs to.
    pub account_index: u32,
    /// Subaddress (minor) index under the account. `None` means the whole account is scanned
    /// and only the amount threshold isolates this invoice.
    pub address_index: Option<u32>,
    pub amount_requested: Piconero,
    pub plan: SubscriptionPlan,
    pub status: InvoiceStatus,
    pub tx_hash: Option<String>,
    pub confirmations: i64,
    pub required_confirmations: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

//--------------------------------------      NewInvoice     ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_id: InvoiceId,
    pub user_id: String,
    pub receiving_address: String,
    pub account_index: u32,
    pub address_index: Option<u32>,
    pub amount_requested: Piconero,
    pub plan: SubscriptionPlan,
    pub required_confirmations: i64,
    pub created_at: DateTime<Utc>,
}

impl NewInvoice {
    pub fn new(
        invoice_id: InvoiceId,
        user_id: &str,
        receiving_address: &str,
        amount_requested: Piconero,
        plan: SubscriptionPlan,
        required_confirmations: i64,
    ) -> Self {
        Self {
            invoice_id,
            user_id: user_id.to_string(),
            receiving_address: receiving_address.to_string(),
            account_index: 0,
            address_index: None,
            amount_requested,
            plan,
            required_confirmations,
            created_at: Utc::now(),
        }
    }

    pub fn on_subaddress(mut self, account_index: u32, address_index: u32) -> Self {
        self.account_index = account_index;
        self.address_index = Some(address_index);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//--------------------------------------    Subscription     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: String,
    pub plan: SubscriptionPlan,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active_at(&self, t: DateTime<Utc>) -> bool {
        self.expires_at > t
    }
}

//--------------------------------------  IncomingTransfer   ---------------------------------------------------------
/// An incoming on-chain transfer, reduced to the fields the matcher needs. The watcher maps
/// wallet RPC transfer records into this type, which keeps the engine free of any RPC types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingTransfer {
    pub txid: String,
    pub amount: Piconero,
    /// Block height the transfer was mined at; zero while it is still in the transaction pool.
    pub height: u64,
}

impl IncomingTransfer {
    pub fn new(txid: &str, amount: Piconero, height: u64) -> Self {
        Self { txid: txid.to_string(), amount, height }
    }
}

//--------------------------------------    TransferMatch    ---------------------------------------------------------
/// The matcher's verdict: the best candidate transfer for an invoice, with its confirmation
/// depth at the current chain height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMatch {
    pub txid: String,
    pub amount: Piconero,
    pub height: u64,
    pub confirmations: u64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invoice_status_round_trips_through_strings() {
        for status in
            [InvoiceStatus::Pending, InvoiceStatus::Paid, InvoiceStatus::Confirmed, InvoiceStatus::Expired, InvoiceStatus::Refunded]
        {
            assert_eq!(status.to_string().parse::<InvoiceStatus>().unwrap(), status);
        }
        assert!("Settled".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!InvoiceStatus::Pending.is_terminal());
        assert!(!InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Confirmed.is_terminal());
        assert!(InvoiceStatus::Expired.is_terminal());
        assert!(InvoiceStatus::Refunded.is_terminal());
    }

    #[test]
    fn plans_parse_from_api_identifiers() {
        assert_eq!("monthly".parse::<SubscriptionPlan>().unwrap(), SubscriptionPlan::Monthly);
        assert_eq!("yearly".parse::<SubscriptionPlan>().unwrap(), SubscriptionPlan::Yearly);
        assert!("weekly".parse::<SubscriptionPlan>().is_err());
        assert_eq!(SubscriptionPlan::Monthly.duration(), Duration::days(30));
        assert_eq!(SubscriptionPlan::Yearly.duration(), Duration::days(365));
    }
}
