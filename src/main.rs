use anyhow::{bail, Context, Result};
use std::env;

use credit_registry::{
    logging, ClientVerifier, CreditStore, CustomerStore, HttpClientVerifier, ServiceConfig,
    VerificationOutcome, VERSION,
};

fn usage() {
    eprintln!("credit-registry {}", VERSION);
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  credit-registry init                 create both SQLite schemas");
    eprintln!("  credit-registry verify <customer_id> ask the client directory about a customer");
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = env::args().collect();
    let config = ServiceConfig::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(&config),
        Some("verify") => {
            let customer_id = args
                .get(2)
                .context("verify needs a customer id")?
                .parse::<i64>()
                .context("customer id must be an integer")?;
            run_verify(&config, customer_id).await
        }
        _ => {
            usage();
            std::process::exit(2);
        }
    }
}

fn run_init(config: &ServiceConfig) -> Result<()> {
    println!("Setting up databases...");

    let credits = CreditStore::open(&config.credit_db_path).with_context(|| {
        format!("failed to open {}", config.credit_db_path.display())
    })?;
    println!(
        "✓ Credit database ready at {} ({} applications)",
        config.credit_db_path.display(),
        credits.count()?
    );

    let customers = CustomerStore::open(&config.directory_db_path).with_context(|| {
        format!("failed to open {}", config.directory_db_path.display())
    })?;
    println!(
        "✓ Customer database ready at {} ({} customers)",
        config.directory_db_path.display(),
        customers.list()?.len()
    );

    Ok(())
}

async fn run_verify(config: &ServiceConfig, customer_id: i64) -> Result<()> {
    if customer_id < 1 {
        bail!("customer id must be a positive integer");
    }

    let verifier = HttpClientVerifier::new(&config.directory_url, config.verify_timeout)
        .context("failed to build HTTP client")?;

    match verifier.verify(customer_id).await {
        VerificationOutcome::Found(customer) => {
            println!(
                "✓ Customer {} found: {} ({})",
                customer.id,
                customer.full_name(),
                customer.identity_number
            );
            Ok(())
        }
        VerificationOutcome::NotFound => {
            println!("✗ Customer {} does not exist", customer_id);
            std::process::exit(1);
        }
        VerificationOutcome::Unavailable { reason } => {
            bail!("client directory unavailable at {}: {}", config.directory_url, reason)
        }
    }
}
