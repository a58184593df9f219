use anyhow::{bail, Context, Result};
use clap::Parser;
use classgroup::{Discriminant, QuadraticForm};
use std::{fs, sync::Arc};
use tracing::debug;
use vdf::{
    cli::{self, HexString, ProveMode},
    driver::NoAccelerator,
    env,
    listener::{MultiSegmentCallback, TwoWesolowskiCallback},
    n_weso::SegmentManager,
    one_weso::prove_one_wesolowski,
    prover::prove_slow,
    two_weso::prove_two_wesolowski,
    verifier::verify_n_wesolowski,
    VdfConfig, VdfRun,
};

fn discriminant(args: &cli::DiscriminantArgs) -> Result<Discriminant> {
    let d = Discriminant::from_seed(&args.challenge.0, args.bits)?;
    debug!(bits = args.bits, "discriminant created");
    Ok(d)
}

fn input_form(d: &Discriminant, x: Option<&HexString>) -> Result<QuadraticForm> {
    match x {
        Some(bytes) => Ok(QuadraticForm::deserialize(d, &bytes.0)?),
        None => Ok(QuadraticForm::generator(d)),
    }
}

fn load_config(path: Option<&String>) -> Result<VdfConfig> {
    let config = match path {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            VdfConfig::from_json(&json)?
        }
        None => VdfConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn create_discriminant(args: cli::CreateDiscriminantArgs) -> Result<String> {
    let d = discriminant(&args.discriminant)?;
    Ok(format!("-0x{}", d.value().magnitude().to_str_radix(16)))
}

fn prove(args: cli::ProveArgs) -> Result<String> {
    let d = discriminant(&args.discriminant)?;
    let x = input_form(&d, args.x.as_ref())?;
    let config = load_config(args.config.as_ref())?;
    let proof = match args.mode {
        ProveMode::Slow => prove_slow(&d, &x, args.iterations)?,
        ProveMode::One => {
            prove_one_wesolowski(&d, &x, args.iterations, &config, Box::new(NoAccelerator))?
                .to_bytes()
        }
        ProveMode::Two => {
            let callback = Arc::new(TwoWesolowskiCallback::new(&x, &config)?);
            let run = VdfRun::start(d, x, callback, &config, Box::new(NoAccelerator), None)?;
            let proof = prove_two_wesolowski(&run, args.iterations)?;
            run.stop();
            proof.to_bytes()
        }
    };
    Ok(hex::encode(proof))
}

fn prove_n_weso(args: cli::ProveNWesoArgs) -> Result<String> {
    let d = discriminant(&args.discriminant)?;
    let x = input_form(&d, args.x.as_ref())?;
    let config = load_config(args.config.as_ref())?;
    let callback = Arc::new(MultiSegmentCallback::new(&x, &config)?);
    let run = VdfRun::start(
        d,
        x,
        callback,
        &config,
        Box::new(NoAccelerator),
        Some(args.iterations),
    )?;
    let manager = SegmentManager::new(&run)?;
    let proof = manager.prove(args.iterations)?;
    debug!(depth = proof.witness_type, "n-wesolowski proof assembled");
    Ok(format!("{} {}", proof.witness_type, proof.hex()))
}

fn verify(args: &cli::VerifyArgs, depth: usize) -> Result<String> {
    let d = discriminant(&args.discriminant)?;
    let x = input_form(&d, args.x.as_ref())?.serialize(&d)?;
    if !verify_n_wesolowski(&d, &x, &args.proof.0, args.iterations, depth)? {
        bail!("proof rejected");
    }
    Ok("ok".to_string())
}

pub fn main() -> Result<()> {
    env::init_console_subscriber();
    let args = cli::Commands::parse();
    let output = match args {
        cli::Commands::CreateDiscriminant(args) => create_discriminant(args),
        cli::Commands::Prove(args) => prove(args),
        cli::Commands::ProveNWeso(args) => prove_n_weso(args),
        cli::Commands::Verify(args) => verify(&args, 0),
        cli::Commands::VerifyNWeso(args) => verify(&args.verify, args.depth),
    };
    match output {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            Err(e)
        }
    }
}
