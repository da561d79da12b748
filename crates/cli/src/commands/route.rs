use super::CommandContext;
use eyre::{eyre, WrapErr};
use mage_core::StatementOptions;
use serde_json::json;

pub async fn execute(context: &CommandContext, tenant: &str, fetch: Option<&str>) -> eyre::Result<()> {
    let (_driver, connector) = context.connect(true).await?;

    let session = connector
        .provider()
        .tenant_session(tenant)
        .await
        .wrap_err_with(|| format!("routing tenant '{tenant}'"))?;

    let mut report = json!({
        "tenant": tenant,
        "keyspace": session.keyspace().as_str(),
    });

    if let Some(target) = fetch {
        let (table, key) = target
            .split_once(':')
            .ok_or_else(|| eyre!("expected TABLE:KEY, got '{target}'"))?;
        let read = connector.consistency().read_option()?;
        let row = session
            .fetch(table, key, read.apply(StatementOptions::default()))
            .await?;
        report["row"] = row.map(serde_json::Value::Object).unwrap_or_default();
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    connector.shutdown().await;
    Ok(())
}
