//! Read-only inspection of the property registry over a node's HTTP
//! JSON-RPC endpoint (`ESTATE_RPC_URL`, default `http://127.0.0.1:7545`).
//!
//! ```text
//! estate-cli marketplace
//! estate-cli pending
//! estate-cli owned <address>
//! estate-cli roles <address>
//! estate-cli earnings <address>
//! ```

use anyhow::{Context, bail};
use ee_api_types::{Address, parse_address};
use ee_chain_client::{ClientError, ContractConfig};
use ee_client_core::{ListingLoader, RoleResolver};
use serde::Serialize;
use tracing::info;

const USAGE: &str = "usage: estate-cli <marketplace | pending | owned <address> | roles <address> | earnings <address>>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Marketplace,
    Pending,
    Owned(Address),
    Roles(Address),
    Earnings(Address),
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let address = |index: usize| -> anyhow::Result<Address> {
        let raw = args.get(index).with_context(|| format!("missing address\n{USAGE}"))?;
        parse_address(raw).with_context(|| format!("invalid address {raw:?}"))
    };
    match args.first().map(String::as_str) {
        Some("marketplace") => Ok(Command::Marketplace),
        Some("pending") => Ok(Command::Pending),
        Some("owned") => Ok(Command::Owned(address(1)?)),
        Some("roles") => Ok(Command::Roles(address(1)?)),
        Some("earnings") => Ok(Command::Earnings(address(1)?)),
        Some(other) => bail!("unknown command {other:?}\n{USAGE}"),
        None => bail!(USAGE),
    }
}

#[derive(Serialize)]
struct RolesReport {
    account: Address,
    tier: &'static str,
    is_super_admin: bool,
    is_admin: bool,
    is_registered_user: bool,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let config = ContractConfig::from_env();
    info!(rpc = %config.rpc_url, contract = %config.address, "inspecting registry");
    let (accessor, _wallet) = ee_chain_evm::http_accessor(config);
    let contract = accessor.read_only();
    let loader = ListingLoader::new(&contract);

    let remote = |err: ClientError| anyhow::anyhow!(err.diagnostic());
    match command {
        Command::Marketplace => print_json(&loader.load_all_approved().await.map_err(remote)?),
        Command::Pending => print_json(&loader.load_pending().await.map_err(remote)?),
        Command::Owned(owner) => print_json(&loader.load_owned(&owner).await.map_err(remote)?),
        Command::Earnings(admin) => {
            let balance = loader.load_admin_balance(&admin).await.map_err(remote)?;
            println!("{balance} ETH");
            Ok(())
        }
        Command::Roles(account) => {
            let roles = RoleResolver::new().resolve(&contract, &account).await;
            print_json(&RolesReport {
                account,
                tier: roles.tier().badge(),
                is_super_admin: roles.is_super_admin(),
                is_admin: roles.is_admin(),
                is_registered_user: roles.is_registered_user(),
            })
        }
    }
}
