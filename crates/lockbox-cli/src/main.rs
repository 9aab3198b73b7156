use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use lockbox_core::generator::generate_password;
use lockbox_core::paths::{default_store_path, settings_path};
use lockbox_core::storage::load_settings;
use lockbox_core::{LockboxSettings, PasswordPolicy, Record, Store};
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

const PASSWORD_ENV: &str = "LOCKBOX_PASSWORD";
const NEW_PASSWORD_ENV: &str = "LOCKBOX_NEW_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "lockbox")]
#[command(author, version, about = "Encrypted local credential store", long_about = None)]
struct Cli {
    /// Store file (defaults to the configured or platform path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new, empty store
    Init,

    /// List every entry with its index
    List {
        #[arg(long)]
        json: bool,
        /// Print secrets instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },

    /// Find entries whose title, username or url contains TERM (case-sensitive)
    Search {
        term: String,
        #[arg(long)]
        json: bool,
    },

    /// Add an entry; the secret is prompted for unless given or generated
    Add {
        title: String,
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long, default_value = "")]
        url: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, conflicts_with = "generate")]
        secret: Option<String>,
        /// Generate the secret
        #[arg(long)]
        generate: bool,
        #[arg(long, requires = "generate")]
        length: Option<usize>,
        #[arg(long, requires = "generate")]
        no_special: bool,
    },

    /// Replace fields of the entry at INDEX
    Update {
        index: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        secret: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete the entry at INDEX; later indices shift down by one
    Delete { index: usize },

    /// Change the master password and re-encrypt the store
    Passwd,

    /// Print a random password without touching the store
    Generate {
        #[arg(long)]
        length: Option<usize>,
        #[arg(long)]
        no_special: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockbox=info,lockbox_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings_file = match &cli.config {
        Some(path) => path.clone(),
        None => settings_path()?,
    };
    let settings = load_settings(&settings_file)
        .with_context(|| format!("load settings from {}", settings_file.display()))?;
    let store_path = match (&cli.store, &settings.store_path) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => path.clone(),
        (None, None) => default_store_path()?,
    };

    match cli.command {
        Commands::Init => init_command(&store_path),
        Commands::List { json, show_secrets } => {
            let store = open_existing(&store_path, &settings)?;
            let rows: Vec<(usize, &Record)> = store.all_entries().iter().enumerate().collect();
            print_records(&rows, json, show_secrets)
        }
        Commands::Search { term, json } => {
            let store = open_existing(&store_path, &settings)?;
            print_records(&store.search(&term), json, false)
        }
        Commands::Add {
            title,
            username,
            url,
            notes,
            secret,
            generate,
            length,
            no_special,
        } => {
            let mut store = open_existing(&store_path, &settings)?;
            if generate {
                let policy = policy_from(&settings, length, no_special);
                let record = store
                    .add_entry_with_generated_password(&title, &username, &url, &notes, &policy)?;
                println!("{}", record.secret);
            } else {
                let secret = match secret {
                    Some(secret) => secret,
                    None => rpassword::prompt_password("Entry secret: ")
                        .map_err(|e| anyhow!("password prompt: {e}"))?,
                };
                let record = Record::new(title, username, secret)
                    .with_url(url)
                    .with_notes(notes);
                store.add_entry(record)?;
            }
            info!(entries = store.len(), "entry added");
            store.close().context("save store")
        }
        Commands::Update {
            index,
            title,
            username,
            secret,
            url,
            notes,
        } => {
            let mut store = open_existing(&store_path, &settings)?;
            let mut record = store
                .get(index)
                .cloned()
                .ok_or_else(|| anyhow!("no entry at index {index} (store holds {})", store.len()))?;
            if let Some(title) = title {
                record.title = title;
            }
            if let Some(username) = username {
                record.username = username;
            }
            if let Some(secret) = secret {
                record.secret = secret;
            }
            if let Some(url) = url {
                record.url = url;
            }
            if let Some(notes) = notes {
                record.notes = notes;
            }
            store.update_entry(index, record)?;
            store.close().context("save store")
        }
        Commands::Delete { index } => {
            let mut store = open_existing(&store_path, &settings)?;
            let removed = store.delete_entry(index)?;
            println!("deleted {}", removed.title);
            store.close().context("save store")
        }
        Commands::Passwd => {
            let mut store = open_existing(&store_path, &settings)?;
            let new_password = prompt_password_twice(NEW_PASSWORD_ENV, "New master password: ")?;
            store.change_master_password(&new_password)?;
            store.close().context("save store")?;
            println!("master password changed");
            Ok(())
        }
        Commands::Generate { length, no_special } => {
            let policy = policy_from(&settings, length, no_special);
            let password = generate_password(&mut OsRng, &policy);
            if password.is_empty() {
                bail!("password generation failed");
            }
            println!("{password}");
            Ok(())
        }
    }
}

fn init_command(store_path: &Path) -> Result<()> {
    if store_path.exists() {
        bail!("store already exists at {}", store_path.display());
    }
    let password = prompt_password_twice(PASSWORD_ENV, "Create master password: ")?;
    let store = Store::open(&password, store_path)?;
    store.close().context("write new store")?;
    println!("store created at {}", store_path.display());
    Ok(())
}

fn open_existing(store_path: &Path, settings: &LockboxSettings) -> Result<Store> {
    if !store_path.exists() {
        bail!(
            "no store at {}; run `lockbox init` first",
            store_path.display()
        );
    }
    let password = prompt_password_once(PASSWORD_ENV, "Master password: ")?;
    let mut store = Store::open(&password, store_path)
        .with_context(|| format!("open store {}", store_path.display()))?;
    store.set_save_on_drop(settings.save_on_drop);
    for skipped in store.skipped_records() {
        eprintln!(
            "warning: dropped corrupted entry on line {}: {}",
            skipped.line, skipped.reason
        );
    }
    Ok(store)
}

fn policy_from(settings: &LockboxSettings, length: Option<usize>, no_special: bool) -> PasswordPolicy {
    PasswordPolicy {
        length: length.unwrap_or(settings.generator.length),
        include_special: settings.generator.include_special && !no_special,
    }
}

fn print_records(rows: &[(usize, &Record)], json: bool, show_secrets: bool) -> Result<()> {
    if json {
        let items: Vec<serde_json::Value> = rows
            .iter()
            .map(|(index, record)| {
                let secret = if show_secrets {
                    record.secret.as_str()
                } else {
                    "********"
                };
                serde_json::json!({
                    "index": index,
                    "title": record.title,
                    "username": record.username,
                    "secret": secret,
                    "url": record.url,
                    "notes": record.notes,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    for (index, record) in rows {
        let secret = if show_secrets {
            record.secret.as_str()
        } else {
            "********"
        };
        println!(
            "{index}\t{}\t{}\t{secret}\t{}",
            record.title, record.username, record.url
        );
    }
    Ok(())
}

fn prompt_password_once(env_key: &str, prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_key) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }
    let pw = rpassword::prompt_password(prompt).map_err(|e| anyhow!("password prompt: {e}"))?;
    if pw.is_empty() {
        bail!("master password cannot be empty");
    }
    Ok(Zeroizing::new(pw))
}

fn prompt_password_twice(env_key: &str, prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_key) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }
    let first = prompt_password_once(env_key, prompt)?;
    let second = Zeroizing::new(
        rpassword::prompt_password("Confirm password: ")
            .map_err(|e| anyhow!("password prompt: {e}"))?,
    );
    if *first != *second {
        bail!("passwords do not match");
    }
    Ok(first)
}
