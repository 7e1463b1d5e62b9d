use ee_api_types::{Address, ContractGeneration, RoleSet};
use ee_chain_client::{ClientResult, ReadOnlyContract};
use std::cell::Cell;
use tracing::{debug, info, warn};

/// Works out the caller's tier and remembers which contract interface the
/// deployment answers to.
#[derive(Debug, Default)]
pub struct RoleResolver {
    generation: Cell<Option<ContractGeneration>>,
}

impl RoleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Option<ContractGeneration> {
        self.generation.get()
    }

    /// Forgets the negotiated generation.
    pub fn reset(&self) {
        self.generation.set(None);
    }

    /// Never fails. With no cached generation the current interface is
    /// probed first and the legacy one second; the one that answers is
    /// cached. A cached generation that stops answering yields no roles and
    /// clears the cache.
    pub async fn resolve(&self, contract: &ReadOnlyContract, account: &Address) -> RoleSet {
        match self.generation.get() {
            Some(generation) => match dispatch(generation, contract, account).await {
                Ok(roles) => roles,
                Err(err) => {
                    warn!(?generation, "role lookup failed on cached interface: {err}");
                    self.reset();
                    RoleSet::NONE
                }
            },
            None => self.negotiate(contract, account).await,
        }
    }

    async fn negotiate(&self, contract: &ReadOnlyContract, account: &Address) -> RoleSet {
        let current_err = match current_roles(contract, account).await {
            Ok(roles) => {
                self.adopt(ContractGeneration::Current);
                return roles;
            }
            Err(err) => err,
        };
        debug!("current role interface unavailable: {current_err}");

        match legacy_roles(contract, account).await {
            Ok(roles) => {
                self.adopt(ContractGeneration::Legacy);
                roles
            }
            Err(err) => {
                warn!(account = %account, "could not resolve roles: {current_err}; legacy: {err}");
                RoleSet::NONE
            }
        }
    }

    fn adopt(&self, generation: ContractGeneration) {
        info!(?generation, "contract interface negotiated");
        self.generation.set(Some(generation));
    }
}

async fn dispatch(
    generation: ContractGeneration,
    contract: &ReadOnlyContract,
    account: &Address,
) -> ClientResult<RoleSet> {
    match generation {
        ContractGeneration::Current => current_roles(contract, account).await,
        ContractGeneration::Legacy => legacy_roles(contract, account).await,
    }
}

async fn current_roles(contract: &ReadOnlyContract, account: &Address) -> ClientResult<RoleSet> {
    let reads = contract.reads();
    let super_admin = reads.super_admin().await? == *account;
    let admin = reads.is_admin(account).await?;
    let registered = reads.is_user_registered(account).await?;
    Ok(RoleSet::compose(super_admin, admin, registered))
}

/// The single admin of an old deployment is also its super admin; everyone
/// else may trade.
async fn legacy_roles(contract: &ReadOnlyContract, account: &Address) -> ClientResult<RoleSet> {
    let admin = contract.reads().legacy_admin().await? == *account;
    Ok(RoleSet::compose(admin, admin, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ee_api_types::RoleTier;
    use ee_chain_client::memory::{InMemoryLedger, InMemoryWallet};
    use ee_chain_client::{ContractAccessor, ContractConfig};
    use std::rc::Rc;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn read_only(ledger: &Rc<InMemoryLedger>) -> ReadOnlyContract {
        ContractAccessor::new(
            ContractConfig::default(),
            Rc::new(InMemoryWallet::missing()),
            ledger.clone(),
        )
        .read_only()
    }

    #[tokio::test]
    async fn super_admin_implies_lower_tiers() {
        let ledger = Rc::new(InMemoryLedger::current(addr(9)));
        let resolver = RoleResolver::new();
        let roles = resolver.resolve(&read_only(&ledger), &addr(9)).await;
        assert!(roles.is_super_admin() && roles.is_admin() && roles.is_registered_user());
        assert_eq!(resolver.generation(), Some(ContractGeneration::Current));
    }

    #[tokio::test]
    async fn current_interface_tiers() {
        let ledger = Rc::new(InMemoryLedger::current(addr(9)));
        ledger.add_admin(addr(2));
        ledger.register_user(addr(3));
        let contract = read_only(&ledger);
        let resolver = RoleResolver::new();

        assert_eq!(resolver.resolve(&contract, &addr(2)).await.tier(), RoleTier::Admin);
        assert_eq!(resolver.resolve(&contract, &addr(3)).await.tier(), RoleTier::RegisteredUser);
        assert_eq!(resolver.resolve(&contract, &addr(4)).await, RoleSet::NONE);
    }

    #[tokio::test]
    async fn legacy_interface_is_used_when_current_raises() {
        let ledger = Rc::new(InMemoryLedger::legacy(addr(9)));
        let contract = read_only(&ledger);
        let resolver = RoleResolver::new();

        let admin = resolver.resolve(&contract, &addr(9)).await;
        assert!(admin.is_super_admin() && admin.is_admin() && admin.is_registered_user());
        assert_eq!(resolver.generation(), Some(ContractGeneration::Legacy));

        let other = resolver.resolve(&contract, &addr(1)).await;
        assert_eq!(other, RoleSet::compose(false, false, true));
    }

    #[tokio::test]
    async fn cached_generation_skips_renegotiation() {
        let ledger = Rc::new(InMemoryLedger::legacy(addr(9)));
        let contract = read_only(&ledger);
        let resolver = RoleResolver::new();

        resolver.resolve(&contract, &addr(1)).await;
        resolver.resolve(&contract, &addr(1)).await;
        assert_eq!(ledger.calls("superAdmin"), 1);
        assert_eq!(ledger.calls("admin"), 2);
    }

    #[tokio::test]
    async fn both_interfaces_failing_yields_no_roles() {
        let ledger = Rc::new(InMemoryLedger::without_role_interface());
        let resolver = RoleResolver::new();
        assert_eq!(resolver.resolve(&read_only(&ledger), &addr(1)).await, RoleSet::NONE);
        assert_eq!(resolver.generation(), None);
    }

    #[tokio::test]
    async fn stale_cache_degrades_and_clears() {
        let ledger = Rc::new(InMemoryLedger::without_role_interface());
        let resolver = RoleResolver::new();
        resolver.generation.set(Some(ContractGeneration::Current));

        assert_eq!(resolver.resolve(&read_only(&ledger), &addr(1)).await, RoleSet::NONE);
        assert_eq!(resolver.generation(), None);
        assert_eq!(ledger.calls("admin"), 0);
    }
}
