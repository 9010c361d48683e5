use clap::Parser;
use governance_scripts::{
    artifacts::Artifacts,
    cli::Cli,
    deployer::Deployer,
    errors::ScriptError,
    ledger::AlloyLedger,
    registry::DeploymentRegistry,
    verification::{ForgeVerifier, RetryPolicy},
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let Cli {
        priv_key,
        rpc_url,
        deployments,
        artifacts,
        sources,
        verifier,
        verifier_url,
        explorer_api_key,
        verify_attempts,
        verify_delay_ms,
        redeploy,
        silent,
        command,
    } = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    let ledger = AlloyLedger::connect(&priv_key, &rpc_url)?;
    let explorer = ForgeVerifier {
        verifier,
        verifier_url,
        api_key: explorer_api_key,
        rpc_url,
        sources_dir: sources.into(),
    };
    let registry = DeploymentRegistry::load(deployments)?;
    let retry_policy = RetryPolicy {
        max_attempts: verify_attempts,
        delay: Duration::from_millis(verify_delay_ms),
        ..Default::default()
    };

    let mut deployer = Deployer::new(ledger, explorer, Artifacts::new(artifacts), registry)
        .with_retry_policy(retry_policy)
        .with_redeploy(redeploy);

    command.run(&mut deployer, silent).await
}
