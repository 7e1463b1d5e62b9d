use ee_api_types::{Address, Listing, ListingId, ListingStatus, format_ether};
use ee_chain_client::{ClientError, ClientResult, ReadOnlyContract};
use tracing::{debug, warn};

/// Fresh listing snapshots from the registry. Each call is independent.
pub struct ListingLoader<'a> {
    contract: &'a ReadOnlyContract,
}

impl<'a> ListingLoader<'a> {
    pub fn new(contract: &'a ReadOnlyContract) -> Self {
        Self { contract }
    }

    pub async fn load_all_approved(&self) -> ClientResult<Vec<Listing>> {
        self.load_with_status(ListingStatus::Approved).await
    }

    /// Callers decide whether the account may see these.
    pub async fn load_pending(&self) -> ClientResult<Vec<Listing>> {
        self.load_with_status(ListingStatus::Pending).await
    }

    pub async fn load_owned(&self, owner: &Address) -> ClientResult<Vec<Listing>> {
        let ids = self.contract.reads().listing_ids_for_owner(owner).await?;
        let listings = self.details(&ids).await;
        debug!(owner = %owner, count = listings.len(), "loaded owned listings");
        Ok(listings)
    }

    /// Accrued commission, formatted in ether.
    pub async fn load_admin_balance(&self, admin: &Address) -> ClientResult<String> {
        let balance = self.contract.reads().admin_balance(admin).await?;
        Ok(format_ether(balance))
    }

    async fn load_with_status(&self, status: ListingStatus) -> ClientResult<Vec<Listing>> {
        let ids = self.contract.reads().all_listing_ids().await?;
        let listings: Vec<Listing> = self
            .details(&ids)
            .await
            .into_iter()
            .filter(|listing| listing.status == status)
            .collect();
        debug!(status = status.label(), total = ids.len(), kept = listings.len(), "loaded listings");
        Ok(listings)
    }

    /// Ids whose details cannot be read or validated are logged and skipped.
    async fn details(&self, ids: &[ListingId]) -> Vec<Listing> {
        let mut listings = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.listing(id).await {
                Ok(listing) => listings.push(listing),
                Err(err) => warn!("{err}"),
            }
        }
        listings
    }

    async fn listing(&self, id: ListingId) -> ClientResult<Listing> {
        let skipped = |reason: String| ClientError::PartialLoadFailure { id, reason };
        let record = self
            .contract
            .reads()
            .listing_details(id)
            .await
            .map_err(|err| skipped(err.diagnostic()))?;
        Listing::try_from(record).map_err(|err| skipped(err.to_string()))
    }
}
