mod cli;
mod output;

use std::path::Path;

use azurerm::definition::{self, Definition};
use azurerm::plan::Action;
use azurerm::provider::Provider;
use azurerm::resourceids::{ID_TYPES, parse_by_type, parse_segments};
use azurerm::services;
use azurerm::state::StateFile;
use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use cli::{AuthArgs, Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::ParseId { id_type, id } => parse_id(id_type.as_deref(), &id)?,
        Command::Resources => {
            println!("{}", output::resources_table(&services::resources()));
        }
        Command::Plan(args) => {
            let provider = provider(&cli.auth)?;
            let definition = Definition::load(&args.file)?;
            let mut state = load_state(&args.state.path)?;
            definition::refresh(&provider, &mut state).await?;

            let planned = definition::plan(&provider, &definition, &state)?;
            if planned.is_empty() {
                println!("No changes. Your infrastructure matches the configuration.");
                return Ok(());
            }
            let replaced = planned.count(Action::Replace);
            println!("{}", output::plan_table(&planned));
            println!(
                "Plan: {} to add, {} to change, {} to destroy.",
                planned.count(Action::Create) + replaced,
                planned.count(Action::Update),
                planned.destroy.len() + replaced
            );
        }
        Command::Apply(args) => {
            let provider = provider(&cli.auth)?;
            let definition = Definition::load(&args.file)?;
            let mut state = load_state(&args.state.path)?;
            definition::refresh(&provider, &mut state).await?;

            // NOTE: State is written even when apply fails part-way.
            let result = definition::apply(&provider, &definition, &mut state).await;
            state.save(&args.state.path)?;
            let summary = result?;
            println!("Apply complete! Resources: {}.", summary);
        }
        Command::Refresh(args) => {
            let provider = provider(&cli.auth)?;
            let mut state = load_state(&args.path)?;
            let drift = definition::refresh(&provider, &mut state).await?;
            state.save(&args.path)?;

            if drift.is_empty() {
                println!("No drift detected.");
            } else {
                println!("{}", output::drift_table(&drift));
            }
        }
        Command::Import {
            resource_type,
            name,
            id,
            state: args,
        } => {
            let provider = provider(&cli.auth)?;
            let mut state = load_state(&args.path)?;
            definition::import(&provider, &mut state, &resource_type, &name, &id).await?;
            state.save(&args.path)?;
            println!("Import successful! {}.{} is now managed.", resource_type, name);
        }
        Command::Destroy(args) => {
            let provider = provider(&cli.auth)?;
            let mut state = load_state(&args.path)?;
            definition::refresh(&provider, &mut state).await?;

            let result = definition::destroy(&provider, &mut state).await;
            state.save(&args.path)?;
            println!("Destroy complete! Resources: {} destroyed.", result?);
        }
    }

    Ok(())
}

fn provider(auth: &AuthArgs) -> Result<Provider> {
    let config = auth.provider_config()?;
    Ok(Provider::from_config(&config)?)
}

fn load_state(path: &Path) -> Result<StateFile> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No state file, starting empty");
        return Ok(StateFile::new());
    }
    Ok(StateFile::load(path)?)
}

fn parse_id(id_type: Option<&str>, id: &str) -> Result<()> {
    let tree = match id_type {
        Some(id_type) => {
            let (description, values) = parse_by_type(id_type, id).ok_or_else(|| {
                eyre!(
                    "unknown ID type {:?}, expected one of: {}",
                    id_type,
                    ID_TYPES.join(", ")
                )
            })??;
            let values: Vec<(String, String)> = values
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect();
            output::id_tree(description, &values)
        }
        None => output::id_tree(id, &parse_segments(id)),
    };
    println!("{}", tree);
    Ok(())
}
