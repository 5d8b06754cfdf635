//! End-to-end flows against an in-memory host with every shared contract
//! deployed.

mod batch_flows;
mod delegated_signers;
mod migration_flows;
mod service_flows;
mod wallet_flows;
