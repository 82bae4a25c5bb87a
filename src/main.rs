use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use rsa_tool::config::RsaConfig;
use rsa_tool::rsa::{
    decrypt_file_with, encrypt_file_for_owner, read_private_key, read_public_key, save_key_pair,
    KeyGenerator, RandState, RsaResult,
};
use rsa_tool::util::{open_input, open_output, FileConfig};

#[derive(Parser)]
#[command(name = "rsa-tool", version, about = "textbook RSA key generation and file encryption")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a public / private key pair
    Keygen(KeygenArgs),
    /// Encrypt a file with a public key
    Encrypt(CryptArgs),
    /// Decrypt a file with a private key
    Decrypt(CryptArgs),
}

#[derive(Args)]
struct KeygenArgs {
    /// Public modulus n must have at least <BITS> bits
    #[arg(short = 'b', long)]
    bits: Option<u64>,

    /// Miller-Rabin iterations for primality testing
    #[arg(short = 'i', long)]
    iters: Option<u64>,

    /// Random seed. Default: current time
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Public key file
    #[arg(short = 'n', long, default_value = "rsa.pub")]
    pbfile: PathBuf,

    /// Private key file
    #[arg(short = 'd', long, default_value = "rsa.priv")]
    pvfile: PathBuf,

    /// Owner identity to sign. Default: $USER
    #[arg(long)]
    owner: Option<String>,
}

#[derive(Args)]
struct CryptArgs {
    /// Input file. Default: standard input
    #[arg(short = 'i', long)]
    infile: Option<PathBuf>,

    /// Output file. Default: standard output
    #[arg(short = 'o', long)]
    outfile: Option<PathBuf>,

    /// Key file. Default: rsa.pub for encrypt, rsa.priv for decrypt
    #[arg(short = 'n', long)]
    keyfile: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = RsaConfig::load(cli.config.as_deref())?;

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
    {
        log::warn!("cannot size the worker pool: {}", e);
    }

    let file_config = FileConfig::default().with_batch_blocks(config.batch_blocks);

    match cli.command {
        Command::Keygen(args) => keygen(args, &config),
        Command::Encrypt(args) => encrypt(args, &file_config),
        Command::Decrypt(args) => decrypt(args, &file_config),
    }
}

fn user_id() -> Option<String> {
    std::env::var("USER").ok().filter(|u| !u.is_empty())
}

fn keygen(args: KeygenArgs, config: &RsaConfig) -> anyhow::Result<()> {
    let nbits = args.bits.unwrap_or(config.nbits);
    let iters = args.iters.unwrap_or(config.iters);
    let seed = match args.seed {
        Some(seed) => seed,
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the epoch")?
            .as_secs(),
    };
    let owner = args
        .owner
        .or_else(user_id)
        .ok_or_else(|| anyhow!("no owner identity: pass --owner or set USER"))?;

    log::debug!("username = {}", owner);
    log::info!("generating {}-bit key pair with {} Miller-Rabin rounds", nbits, iters);

    let keypair = {
        let mut rng = RandState::new(seed);
        KeyGenerator::new(nbits, iters).generate(&owner, &mut rng)?
    };

    save_key_pair(&keypair, &args.pbfile, &args.pvfile).with_context(|| {
        format!(
            "cannot write {} and {}",
            args.pbfile.display(),
            args.pvfile.display()
        )
    })?;

    log::info!(
        "wrote {} and {} ({}-bit modulus)",
        args.pbfile.display(),
        args.pvfile.display(),
        keypair.bit_length()
    );
    Ok(())
}

fn encrypt(args: CryptArgs, file_config: &FileConfig) -> anyhow::Result<()> {
    let keyfile = args.keyfile.unwrap_or_else(|| PathBuf::from("rsa.pub"));
    let mut key_reader = open_input(Some(keyfile.as_path()))
        .with_context(|| format!("cannot open {}", keyfile.display()))?;
    let public_key = read_public_key(&mut key_reader)
        .with_context(|| format!("cannot read {}", keyfile.display()))?;

    let owner = user_id().unwrap_or_else(|| {
        log::warn!("USER is not set, checking against the key's own owner id");
        public_key.owner_id.clone()
    });

    log::debug!("username: {}", owner);
    log::debug!("user signature ({} bits): {}", public_key.s.bits(), public_key.s);
    log::debug!("n - modulus ({} bits): {}", public_key.n.bits(), public_key.n);
    log::debug!("e - public exponent ({} bits): {}", public_key.e.bits(), public_key.e);

    let mut input = open_input(args.infile.as_deref()).context("cannot open input")?;

    let mut opened = false;
    let result = encrypt_file_for_owner(
        &mut input,
        || {
            let output = open_output(args.outfile.as_deref())?;
            opened = true;
            Ok(output)
        },
        &public_key,
        &owner,
        file_config,
    );

    // an output that was never opened is not ours to remove
    discard_on_error(result, args.outfile.as_deref().filter(|_| opened))
}

fn decrypt(args: CryptArgs, file_config: &FileConfig) -> anyhow::Result<()> {
    let keyfile = args.keyfile.unwrap_or_else(|| PathBuf::from("rsa.priv"));
    let mut key_reader = open_input(Some(keyfile.as_path()))
        .with_context(|| format!("cannot open {}", keyfile.display()))?;
    let private_key = read_private_key(&mut key_reader)
        .with_context(|| format!("cannot read {}", keyfile.display()))?;

    log::debug!("n - modulus ({} bits): {}", private_key.n.bits(), private_key.n);
    log::debug!("d - private exponent ({} bits): {}", private_key.d.bits(), private_key.d);

    let mut input = open_input(args.infile.as_deref()).context("cannot open input")?;
    let mut output = open_output(args.outfile.as_deref()).context("cannot open output")?;

    let result = decrypt_file_with(&mut input, &mut output, &private_key, file_config);
    drop(output);
    discard_on_error(result, args.outfile.as_deref())
}

// partial output of a failed run is not valid, remove it
fn discard_on_error(result: RsaResult<()>, outfile: Option<&Path>) -> anyhow::Result<()> {
    if result.is_err() {
        if let Some(path) = outfile {
            if let Err(e) = std::fs::remove_file(path) {
                log::warn!("cannot remove partial output {}: {}", path.display(), e);
            }
        }
    }
    Ok(result?)
}
