//! Produce a bcrypt hash for ADMIN_PASSWORD_HASH so the plaintext never has
//! to live in the environment.

use bcrypt::{hash, DEFAULT_COST};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "hash-password", about = "Hash an administrator password with bcrypt")]
struct Args {
    /// Password to hash
    password: String,

    /// bcrypt work factor (4-31)
    #[arg(long, default_value_t = DEFAULT_COST, value_parser = clap::value_parser!(u32).range(4..=31))]
    cost: u32,
}

fn main() {
    let args = Args::parse();

    match hash(&args.password, args.cost) {
        Ok(hashed) => {
            println!("\nCost     : {}", args.cost);
            println!("Hash     : {}\n", hashed);
            println!("# Paste this into your .env:");
            println!("ADMIN_PASSWORD_HASH={}", hashed);
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
