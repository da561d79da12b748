use super::CommandContext;
use mage_config::ConfigSource;
use serde_json::json;

pub fn execute(context: &CommandContext) -> eyre::Result<()> {
    let sources: Vec<String> = context
        .loaded
        .sources
        .iter()
        .map(|source| match source {
            ConfigSource::Default => "defaults".to_string(),
            ConfigSource::ConfigFile(path) => format!("file {}", path.display()),
            ConfigSource::EnvironmentVariable(name) => format!("env {name}"),
            ConfigSource::Overrides => "command line".to_string(),
        })
        .collect();

    let report = json!({
        "settings": context.loaded.settings,
        "sources": sources,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
