//! Circulating supply is total supply minus everything held by the exclusion set. A single loop
//! refreshes the figures and publishes them to the [`SnapshotStore`] that the server reads from.

mod store;

pub use store::SnapshotStore;
pub use store::SupplySnapshot;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{future::try_join_all, try_join};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    exclusions::{ExclusionKind, ExclusionSet},
    ledger::{LedgerClient, LedgerQueryError},
    units::{TokenAmount, TOKEN_DECIMALS},
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("excluded balances {excluded} exceed total supply {total_supply}")]
pub struct NegativeSupplyError {
    pub total_supply: TokenAmount,
    pub excluded: TokenAmount,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    LedgerQuery(#[from] LedgerQueryError),
    #[error(transparent)]
    NegativeSupply(#[from] NegativeSupplyError),
}

/// Everything fetched from the ledger in one cycle, in base units.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SupplyParts {
    pub total_supply: TokenAmount,
    pub distribution: TokenAmount,
    pub private_offering: TokenAmount,
    pub advisors_reward: TokenAmount,
    pub burned: TokenAmount,
}

impl SupplyParts {
    pub fn excluded(&self) -> TokenAmount {
        [
            &self.distribution,
            &self.private_offering,
            &self.advisors_reward,
            &self.burned,
        ]
        .into_iter()
        .sum()
    }

    pub fn circulating(&self) -> Result<TokenAmount, NegativeSupplyError> {
        let excluded = self.excluded();
        self.total_supply
            .checked_sub(&excluded)
            .ok_or_else(|| NegativeSupplyError {
                total_supply: self.total_supply.clone(),
                excluded,
            })
    }

    fn add_balance(&mut self, kind: ExclusionKind, balance: TokenAmount) {
        let part = match kind {
            ExclusionKind::Distribution => &mut self.distribution,
            ExclusionKind::PrivateOffering => &mut self.private_offering,
            ExclusionKind::AdvisorsReward => &mut self.advisors_reward,
            ExclusionKind::Burn => &mut self.burned,
        };
        *part = std::mem::take(part) + balance;
    }
}

/// Reads total supply and every excluded balance. The reads are independent and summing is
/// order-free, so they all go out at once. The first failing read fails the whole fetch.
pub async fn fetch_supply_parts(
    ledger: &impl LedgerClient,
    exclusions: &ExclusionSet,
) -> Result<SupplyParts, LedgerQueryError> {
    let balances = exclusions.entries().iter().map(|entry| async move {
        let balance = ledger.balance_of(&entry.address).await?;
        Ok::<_, LedgerQueryError>((entry.kind, balance))
    });

    let (total_supply, balances) = try_join!(ledger.total_supply(), try_join_all(balances))?;

    let mut parts = SupplyParts {
        total_supply,
        ..SupplyParts::default()
    };

    for (kind, balance) in balances {
        parts.add_balance(kind, balance);
    }

    Ok(parts)
}

/// The per-cycle report, `<UTC timestamp> <circulating>, <total>`. The log subscriber adds its
/// own prefix in front of it.
fn supply_log_line(now: DateTime<Utc>, snapshot: &SupplySnapshot) -> String {
    format!(
        "{} {}, {}",
        now.format("%Y-%m-%d %H:%M:%S UTC"),
        snapshot.circulating_supply,
        snapshot.total_supply
    )
}

/// Runs a single refresh cycle. On success the new snapshot is published, on failure the
/// previously published snapshot stays untouched.
#[instrument(skip_all)]
pub async fn refresh_supply(
    ledger: &impl LedgerClient,
    exclusions: &ExclusionSet,
    store: &SnapshotStore,
) -> Result<SupplySnapshot, RefreshError> {
    let parts = fetch_supply_parts(ledger, exclusions).await?;

    debug!(
        total_supply = %parts.total_supply,
        distribution = %parts.distribution,
        private_offering = %parts.private_offering,
        advisors_reward = %parts.advisors_reward,
        burned = %parts.burned,
        "fetched supply parts"
    );

    let circulating = parts.circulating()?;

    let snapshot = SupplySnapshot {
        total_supply: parts.total_supply.to_display(TOKEN_DECIMALS),
        circulating_supply: circulating.to_display(TOKEN_DECIMALS),
    };

    store.publish(snapshot.clone());

    info!("{}", supply_log_line(Utc::now(), &snapshot));

    Ok(snapshot)
}

/// Refreshes forever. The next cycle is scheduled `interval` after the previous one finished,
/// whether it succeeded or not, so cycles never overlap.
pub async fn run_refresh_loop(
    ledger: &impl LedgerClient,
    exclusions: &ExclusionSet,
    store: &SnapshotStore,
    interval: Duration,
) {
    info!(
        interval_seconds = interval.as_secs(),
        excluded_addresses = exclusions.entries().len(),
        "starting supply refresh loop"
    );

    loop {
        match refresh_supply(ledger, exclusions, store).await {
            Ok(_) => (),
            Err(RefreshError::LedgerQuery(err)) => {
                warn!(%err, "supply refresh failed, keeping last snapshot");
            }
            Err(RefreshError::NegativeSupply(err)) => {
                error!(%err, "computed negative circulating supply, check the exclusion set");
            }
        }

        sleep(interval).await;
    }
}
