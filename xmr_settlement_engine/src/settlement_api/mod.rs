mod settlement_flow_api;

pub use settlement_flow_api::{SettlementFlowApi, SettlementOutcome};
