use clap::{arg, Parser, ValueEnum};
use std::{fmt::Display, str::FromStr};

#[derive(Debug, Clone)]
pub struct HexString(pub Vec<u8>);

impl FromStr for HexString {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        Ok(HexString(hex::decode(stripped)?))
    }
}

impl Display for HexString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

#[derive(Parser)]
pub struct DiscriminantArgs {
    #[arg(
        long,
        short = 'c',
        value_name = "CHALLENGE",
        help = "challenge seeding the discriminant (hex encoded)"
    )]
    pub challenge: HexString,

    #[arg(
        long,
        default_value_t = 1024,
        help = "discriminant size in bits, a multiple of 256"
    )]
    pub bits: usize,
}

#[derive(Parser)]
pub struct CreateDiscriminantArgs {
    #[command(flatten)]
    pub discriminant: DiscriminantArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProveMode {
    /// Square and prove on the calling thread.
    Slow,
    /// Driver thread and a single proof.
    One,
    /// Unbounded driver thread and a proof of three segments.
    Two,
}

#[derive(Parser)]
pub struct ProveArgs {
    #[command(flatten)]
    pub discriminant: DiscriminantArgs,

    #[arg(long, short = 'n', value_name = "ITERATIONS")]
    pub iterations: u64,

    #[arg(
        long,
        value_name = "FORM",
        help = "input form, 100 bytes (hex encoded); defaults to the generator"
    )]
    pub x: Option<HexString>,

    #[arg(long, value_enum, default_value_t = ProveMode::Slow)]
    pub mode: ProveMode,

    #[arg(long, value_name = "FILE", help = "JSON configuration file")]
    pub config: Option<String>,
}

#[derive(Parser)]
pub struct ProveNWesoArgs {
    #[command(flatten)]
    pub discriminant: DiscriminantArgs,

    #[arg(long, short = 'n', value_name = "ITERATIONS")]
    pub iterations: u64,

    #[arg(
        long,
        value_name = "FORM",
        help = "input form, 100 bytes (hex encoded); defaults to the generator"
    )]
    pub x: Option<HexString>,

    #[arg(long, value_name = "FILE", help = "JSON configuration file")]
    pub config: Option<String>,
}

#[derive(Parser)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub discriminant: DiscriminantArgs,

    #[arg(long, short = 'n', value_name = "ITERATIONS")]
    pub iterations: u64,

    #[arg(
        long,
        value_name = "FORM",
        help = "input form, 100 bytes (hex encoded); defaults to the generator"
    )]
    pub x: Option<HexString>,

    #[arg(long, short = 'p', value_name = "PROOF", help = "y ‖ proof (hex encoded)")]
    pub proof: HexString,
}

#[derive(Parser)]
pub struct VerifyNWesoArgs {
    #[command(flatten)]
    pub verify: VerifyArgs,

    #[arg(long, short = 'd', help = "number of chained segments in the proof")]
    pub depth: usize,
}

#[derive(Parser)]
#[command(
    name = "vdf",
    version = "0.1",
    about = "vdf - class group verifiable delay function"
)]
pub enum Commands {
    #[command(name = "create-discriminant")]
    CreateDiscriminant(CreateDiscriminantArgs),
    #[command(name = "prove")]
    Prove(ProveArgs),
    #[command(name = "prove-n-weso")]
    ProveNWeso(ProveNWesoArgs),
    #[command(name = "verify")]
    Verify(VerifyArgs),
    #[command(name = "verify-n-weso")]
    VerifyNWeso(VerifyNWesoArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_string_accepts_prefix() {
        let a: HexString = "0x0a0b".parse().unwrap();
        let b: HexString = "0a0b".parse().unwrap();
        assert_eq!(a.0, vec![10, 11]);
        assert_eq!(a.0, b.0);
        assert_eq!(a.to_string(), "0x0a0b");
        assert!("0xzz".parse::<HexString>().is_err());
    }

    #[test]
    fn test_parse_verify_n_weso() {
        let args = Commands::try_parse_from([
            "vdf",
            "verify-n-weso",
            "--challenge",
            "0x0001",
            "-n",
            "1000",
            "--proof",
            "00",
            "--depth",
            "2",
        ])
        .unwrap();
        match args {
            Commands::VerifyNWeso(args) => {
                assert_eq!(args.depth, 2);
                assert_eq!(args.verify.iterations, 1000);
                assert_eq!(args.verify.discriminant.bits, 1024);
                assert!(args.verify.x.is_none());
            }
            _ => panic!("wrong subcommand"),
        }
    }
}
