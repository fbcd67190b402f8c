mod config;
mod display;
mod engine;

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;

use fortios_core::ResourceId;
use fortios_core::plan::{Plan, describe};
use fortios_core::resource::attributes_to_json;
use fortios_core::schema::{FieldMode, ResourceSchema};
use fortios_provider::{FortiosProvider, schemas};
use fortios_state::{LockInfo, StateBackend, StateFile, create_backend};

use crate::config::{ConfigFile, ProviderSettings};
use crate::display::{format_effect, print_plan};
use crate::engine::Applied;

#[derive(Parser)]
#[command(name = "fortios")]
#[command(
    version,
    about = "Declarative configuration management for FortiGate devices",
    long_about = None
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, global = true, env = "FORTIOS_CONFIG", default_value = "fortios.json")]
    config: PathBuf,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Device host name or base URL
    #[arg(long, global = true, env = "FORTIOS_HOST")]
    host: Option<String>,

    /// REST API administrator token
    #[arg(long, global = true, env = "FORTIOS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Default virtual domain
    #[arg(long, global = true, env = "FORTIOS_VDOM")]
    vdom: Option<String>,

    /// Accept any TLS certificate
    #[arg(long, global = true, env = "FORTIOS_INSECURE")]
    insecure: bool,

    /// PEM file with the CA that signed the device certificate
    #[arg(long, global = true, env = "FORTIOS_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// Retries after a connection failure
    #[arg(long, global = true, env = "FORTIOS_RETRIES")]
    retries: Option<u32>,

    /// Path to the state file
    #[arg(long, global = true, env = "FORTIOS_STATE")]
    state: Option<PathBuf>,

    /// Order of keyed lists: alphabetical or natural
    #[arg(long, global = true, env = "FORTIOS_SORT")]
    sort: Option<String>,
}

impl ConnectionArgs {
    fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            host: self.host.clone(),
            token: self.token.clone(),
            vdom: self.vdom.clone(),
            insecure: self.insecure.then_some(true),
            ca_cert: self.ca_cert.clone(),
            retries: self.retries,
            timeout_secs: None,
            state: self.state.clone(),
            sort: self.sort.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate,
    /// Show execution plan without applying changes
    Plan,
    /// Apply changes to reach the desired configuration
    Apply {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Delete every resource recorded in the state file
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Bring an existing device object under management
    Import {
        /// Resource type (e.g., firewall_address)
        resource_type: String,
        /// Resource name to record it under
        name: String,
        /// Device-side identity (mkey); defaults to the name
        identifier: Option<String>,
    },
    /// Refresh the state file from the device
    Refresh,
    /// Show the resource catalog, or the fields of one resource type
    Schema { resource_type: Option<String> },
    /// Generate shell completions
    Completions { shell: Shell },
    /// Remove a stale state lock
    ForceUnlock { lock_id: String },
}

/// Everything a command needs after settings are resolved
struct Context {
    config: ConfigFile,
    settings: ProviderSettings,
}

impl Context {
    fn load(cli: &Cli, config_required: bool) -> Result<Self, String> {
        let config = ConfigFile::load(&cli.config, config_required).map_err(|e| e.to_string())?;
        let settings = cli.connection.settings().or(config.provider.clone());
        Ok(Self { config, settings })
    }

    async fn provider(&self) -> Result<FortiosProvider, String> {
        let client_config = self.settings.client_config().map_err(|e| e.to_string())?;
        let sort = self.settings.sort_mode().map_err(|e| e.to_string())?;
        FortiosProvider::connect(&client_config, sort)
            .await
            .map_err(|e| e.to_string())
    }

    async fn backend(&self) -> Result<Box<dyn StateBackend>, String> {
        let path = self.settings.state_path();
        create_backend(&path.to_string_lossy())
            .await
            .map_err(|e| e.to_string())
    }

    /// Lock the state while `command` changes the configured device
    async fn lock(&self, backend: &dyn StateBackend, command: &str) -> Result<LockInfo, String> {
        backend
            .acquire_lock(command, &self.settings.lock_target())
            .await
            .map_err(|e| format!("{}; run `fortios force-unlock <ID>` if it is stale", e))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Validate => run_validate(&cli),
        Commands::Plan => run_plan(&cli).await,
        Commands::Apply { auto_approve } => run_apply(&cli, *auto_approve).await,
        Commands::Destroy { auto_approve } => run_destroy(&cli, *auto_approve).await,
        Commands::Import {
            resource_type,
            name,
            identifier,
        } => run_import(&cli, resource_type, name, identifier.as_deref()).await,
        Commands::Refresh => run_refresh(&cli).await,
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "fortios", &mut std::io::stdout());
            Ok(())
        }
        Commands::ForceUnlock { lock_id } => run_force_unlock(&cli, lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise each -v raises the level from warn
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run_validate(cli: &Cli) -> Result<(), String> {
    let ctx = Context::load(cli, true)?;
    let sort = ctx.settings.sort_mode().map_err(|e| e.to_string())?;
    let resources = ctx
        .config
        .desired_resources(sort)
        .map_err(|e| e.to_string())?;

    println!(
        "{}",
        format!("Configuration is valid ({} resources).", resources.len()).green()
    );
    Ok(())
}

async fn run_plan(cli: &Cli) -> Result<(), String> {
    let ctx = Context::load(cli, true)?;
    let sort = ctx.settings.sort_mode().map_err(|e| e.to_string())?;
    let desired = ctx
        .config
        .desired_resources(sort)
        .map_err(|e| e.to_string())?;

    let backend = ctx.backend().await?;
    let state_file = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();
    let provider = ctx.provider().await?;

    let current = engine::refresh(&provider, &state_file)
        .await
        .map_err(|e| format!("Failed to refresh state: {}", e))?;
    let plan = engine::plan(&provider, &desired, &current);
    print_plan(&plan);
    Ok(())
}

async fn run_apply(cli: &Cli, auto_approve: bool) -> Result<(), String> {
    let ctx = Context::load(cli, true)?;
    let sort = ctx.settings.sort_mode().map_err(|e| e.to_string())?;
    let desired = ctx
        .config
        .desired_resources(sort)
        .map_err(|e| e.to_string())?;

    let backend = ctx.backend().await?;
    let provider = ctx.provider().await?;
    let lock = ctx.lock(backend.as_ref(), "apply").await?;

    let result: Result<(), String> = async {
        let mut state_file = backend
            .read_state()
            .await
            .map_err(|e| e.to_string())?
            .unwrap_or_default();

        let current = engine::refresh(&provider, &state_file)
            .await
            .map_err(|e| format!("Failed to refresh state: {}", e))?;
        for state in current.values() {
            state_file.record(state);
        }

        let plan = engine::plan(&provider, &desired, &current);
        if !plan.changes_device() {
            println!("{}", "No changes needed.".green());
            save_state(backend.as_ref(), &mut state_file).await?;
            return Ok(());
        }

        print_plan(&plan);
        if !auto_approve && !confirm("Do you want to apply these changes?")? {
            println!("{}", "Apply cancelled.".yellow());
            return Ok(());
        }

        println!("{}", "Applying changes...".cyan().bold());
        println!();
        log::info!("applying plan: {}", plan.summary());
        let outcome = execute(&provider, &plan, &mut state_file).await;
        save_state(backend.as_ref(), &mut state_file).await?;
        outcome.report("Apply")
    }
    .await;

    release_lock(backend.as_ref(), &lock).await;
    result
}

async fn run_destroy(cli: &Cli, auto_approve: bool) -> Result<(), String> {
    let ctx = Context::load(cli, false)?;
    let backend = ctx.backend().await?;
    let provider = ctx.provider().await?;
    let lock = ctx.lock(backend.as_ref(), "destroy").await?;

    let result: Result<(), String> = async {
        let Some(mut state_file) = backend.read_state().await.map_err(|e| e.to_string())? else {
            println!("{}", "No state recorded; nothing to destroy.".green());
            return Ok(());
        };

        let current = engine::refresh(&provider, &state_file)
            .await
            .map_err(|e| format!("Failed to refresh state: {}", e))?;
        for state in current.values() {
            state_file.record(state);
        }

        // Planning against an empty configuration deletes everything still present
        let plan = engine::plan(&provider, &[], &current);
        if plan.is_empty() {
            println!("{}", "No resources to destroy.".green());
            save_state(backend.as_ref(), &mut state_file).await?;
            return Ok(());
        }

        print_plan(&plan);
        let prompt = "Do you really want to destroy all resources? \
                      Global settings are reset to their defaults.";
        if !auto_approve && !confirm(prompt)? {
            println!("{}", "Destroy cancelled.".yellow());
            return Ok(());
        }

        println!("{}", "Destroying resources...".red().bold());
        println!();
        let outcome = execute(&provider, &plan, &mut state_file).await;
        save_state(backend.as_ref(), &mut state_file).await?;
        outcome.report("Destroy")
    }
    .await;

    release_lock(backend.as_ref(), &lock).await;
    result
}

async fn run_import(
    cli: &Cli,
    resource_type: &str,
    name: &str,
    identifier: Option<&str>,
) -> Result<(), String> {
    use fortios_core::provider::Provider;

    let ctx = Context::load(cli, false)?;
    if schemas::get(resource_type).is_none() {
        return Err(format!("Unknown resource type: {}", resource_type));
    }
    let backend = ctx.backend().await?;
    let provider = ctx.provider().await?;
    let lock = ctx.lock(backend.as_ref(), "import").await?;

    let result: Result<(), String> = async {
        let mut state_file = backend
            .read_state()
            .await
            .map_err(|e| e.to_string())?
            .unwrap_or_default();
        let id = ResourceId::new(resource_type, name);
        if state_file.find_resource(&id).is_some() {
            return Err(format!("{} is already managed", id));
        }

        let identifier = identifier.unwrap_or(name);
        let state = provider
            .import(&id, identifier, ctx.settings.vdom.as_deref())
            .await
            .map_err(|e| e.to_string())?;
        if !state.exists {
            return Err(format!("{} ({}) not found on the device", id, identifier));
        }

        state_file.record(&state);
        save_state(backend.as_ref(), &mut state_file).await?;

        let snippet = serde_json::json!({
            "type": resource_type,
            "name": name,
            "attributes": attributes_to_json(&state.attributes),
        });
        println!("{}", format!("Imported {}.", id).green().bold());
        println!("Add this resource to the configuration file to keep managing it:");
        println!(
            "{}",
            serde_json::to_string_pretty(&snippet).map_err(|e| e.to_string())?
        );
        Ok(())
    }
    .await;

    release_lock(backend.as_ref(), &lock).await;
    result
}

async fn run_refresh(cli: &Cli) -> Result<(), String> {
    let ctx = Context::load(cli, false)?;
    let backend = ctx.backend().await?;
    let provider = ctx.provider().await?;
    let lock = ctx.lock(backend.as_ref(), "refresh").await?;

    let result: Result<(), String> = async {
        let Some(mut state_file) = backend.read_state().await.map_err(|e| e.to_string())? else {
            println!("{}", "No state recorded; nothing to refresh.".green());
            return Ok(());
        };

        let current = engine::refresh(&provider, &state_file)
            .await
            .map_err(|e| format!("Failed to refresh state: {}", e))?;
        let vanished = current.values().filter(|s| !s.exists).count();
        for state in current.values() {
            state_file.record(state);
        }
        save_state(backend.as_ref(), &mut state_file).await?;

        println!(
            "{}",
            format!("Refreshed {} resources.", current.len() - vanished).green()
        );
        if vanished > 0 {
            println!(
                "{}",
                format!("{} resources no longer exist and were removed from state.", vanished)
                    .yellow()
            );
        }
        Ok(())
    }
    .await;

    release_lock(backend.as_ref(), &lock).await;
    result
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let Some(resource_type) = resource_type else {
        for schema in schemas::all_schemas() {
            println!(
                "{:<28} {}",
                schema.resource_type.cyan(),
                schema.description.as_deref().unwrap_or("")
            );
        }
        return Ok(());
    };

    let schema = schemas::get(resource_type)
        .ok_or_else(|| format!("Unknown resource type: {}", resource_type))?;
    print_schema(&schema);
    Ok(())
}

fn print_schema(schema: &ResourceSchema) {
    let capabilities = schemas::capabilities();
    println!(
        "{} ({}{})",
        schema.resource_type.cyan().bold(),
        schema.path,
        if schema.singleton { ", global setting" } else { "" }
    );
    if let Some(mkey) = &schema.mkey {
        println!("  identity: {}", mkey.bold());
    }
    println!();

    for field in &schema.fields {
        let mode = match field.mode {
            FieldMode::Required => "required".red().to_string(),
            FieldMode::Optional => "optional".normal().to_string(),
            FieldMode::Computed => "computed".dimmed().to_string(),
            FieldMode::OptionalComputed => "optional, computed".normal().to_string(),
        };
        let mut line = format!(
            "  {:<32} {:<14} {}",
            field.name,
            field.field_type.to_string(),
            mode
        );
        if let Some(default) = &field.default {
            line.push_str(&format!(", default {}", display::format_value(default)));
        }
        if let Some(range) = capabilities.range(&schema.resource_type, &field.name) {
            line.push_str(&format!(", FortiOS {}", range));
        }
        println!("{}", line);
    }
}

async fn run_force_unlock(cli: &Cli, lock_id: &str) -> Result<(), String> {
    let ctx = Context::load(cli, false)?;
    let backend = ctx.backend().await?;
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", format!("Lock {} removed.", lock_id).green());
    Ok(())
}

/// Counts of applied and failed effects
struct Outcome {
    succeeded: usize,
    failed: usize,
}

impl Outcome {
    fn report(&self, action: &str) -> Result<(), String> {
        println!();
        if self.failed == 0 {
            println!(
                "{}",
                format!("{} complete! {} changes applied.", action, self.succeeded)
                    .green()
                    .bold()
            );
            Ok(())
        } else {
            Err(format!(
                "{} failed. {} succeeded, {} failed.",
                action, self.succeeded, self.failed
            ))
        }
    }
}

/// Apply every effect, recording each success in the state file
async fn execute(provider: &FortiosProvider, plan: &Plan, state_file: &mut StateFile) -> Outcome {
    let mut outcome = Outcome {
        succeeded: 0,
        failed: 0,
    };

    for effect in engine::schedule(plan, state_file) {
        log::debug!("applying: {}", describe(effect));
        match engine::apply_effect(provider, effect).await {
            Ok(applied) => {
                println!("  {} {}", "✓".green(), format_effect(effect));
                if !matches!(applied, Applied::Observed(_)) {
                    outcome.succeeded += 1;
                }
                engine::record(state_file, &applied);
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
                outcome.failed += 1;
            }
        }
    }
    outcome
}

async fn release_lock(backend: &dyn StateBackend, lock: &LockInfo) {
    if let Err(e) = backend.release_lock(lock).await {
        log::warn!("failed to release state lock {}: {}", lock.id, e);
    }
}

async fn save_state(backend: &dyn StateBackend, state_file: &mut StateFile) -> Result<(), String> {
    state_file.increment_serial();
    backend
        .write_state(state_file)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!("  {}", "Only 'yes' will be accepted to confirm.".yellow());
    print!("\n  Enter a value: ");
    std::io::stdout().flush().map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    println!();
    Ok(input.trim() == "yes")
}
