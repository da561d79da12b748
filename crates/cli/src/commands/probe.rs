use super::CommandContext;
use serde_json::json;

pub async fn execute(context: &CommandContext) -> eyre::Result<()> {
    let (driver, connector) = context.connect(true).await?;

    let provider = connector.provider();
    let session = provider.admin_session().await?;
    let counters = driver.counters();
    let report = json!({
        "admin_keyspace": session.keyspace().as_str(),
        "cluster_builds": counters.cluster_builds,
        "connects": counters.connects,
        "cached_sessions": provider.sessions().len(),
        "cached_clusters": provider.sessions().clusters().len(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    connector.shutdown().await;
    Ok(())
}
