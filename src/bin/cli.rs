//! EmberKV CLI Client
//!
//! Command-line interface for interacting with EmberKV.

use std::io::{BufReader, Write};
use std::net::TcpStream;

use clap::{Parser, Subcommand};
use emberkv::protocol::{encode_command, read_response, Command, Response};

/// EmberKV CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "CLI for the EmberKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:1234")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Ask the server to compact its log
    Compact,
}

fn main() {
    let args = Args::parse();

    let command = match args.command {
        Commands::Get { key } => Command::Get { key },
        Commands::Set { key, value } => Command::Set { key, value },
        Commands::Compact => Command::Compact,
    };

    match execute(&args.server, &command) {
        Ok(Response::Ok) => println!("OK"),
        Ok(Response::Value(value)) => println!("{}", value),
        Ok(Response::Missing) => {
            eprintln!("(missing)");
            std::process::exit(1);
        }
        Ok(Response::Unsupported) => {
            eprintln!("{} is not supported by the server", command.name());
            std::process::exit(1);
        }
        Ok(Response::Error) => {
            eprintln!("server rejected the request");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}

fn execute(server: &str, command: &Command) -> emberkv::Result<Response> {
    let mut stream = TcpStream::connect(server)?;
    stream.set_nodelay(true)?;
    stream.write_all(&encode_command(command))?;

    let mut reader = BufReader::new(stream);
    read_response(&mut reader, command)
}
