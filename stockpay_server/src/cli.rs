use std::{env, env::VarError};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Sells finite digital stock for crypto, and reconciles payments, deliveries and refunds")]
pub struct Arguments {
    /// What to do. Runs the server if omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server and the reconciliation worker (the default)
    Serve,
    /// Add one item to the stock pool
    #[clap(name = "add-stock")]
    AddStock {
        #[arg(short = 'r', long = "region")]
        region: String,
        /// Product name or alias
        #[arg(short = 'v', long = "variant")]
        variant: String,
        /// Unit size, e.g. 0.5 or 1
        #[arg(short = 's', long = "size")]
        size: String,
        /// Opaque reference to the deliverable (a file id, a URL, a code)
        #[arg(short = 'p', long = "payload")]
        payload: String,
    },
    /// Pay out the refund for an order to its stored refund address
    #[clap(name = "refund-send")]
    RefundSend {
        #[arg(required = true, index = 1)]
        order_id: i64,
    },
    /// Print an order, its derived state, and the item delivered for it (if any)
    #[clap(name = "show-order")]
    ShowOrder {
        #[arg(required = true, index = 1)]
        order_id: i64,
    },
    /// List refunds that are waiting for a payout
    #[clap(name = "pending-refunds")]
    PendingRefunds,
    /// Print the current (non-secret) configuration environment
    Env,
}

pub fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 15] = [
        "RUST_LOG",
        "SPG_HOST",
        "SPG_PORT",
        "SPG_DATABASE_URL",
        "SPG_CATALOG_PATH",
        "SPG_NODE_URL",
        "SPG_NODE_USER",
        "SPG_ORACLE_URL",
        "SPG_HTTP_TIMEOUT",
        "SPG_POLL_INTERVAL",
        "SPG_MIN_CONFIRMATIONS",
        "SPG_QUOTE_LOCK",
        "SPG_SESSION_TTL",
        "SPG_MIN_REFUND_ADDRESS_LEN",
        "SPG_NOTIFY_WEBHOOK_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Arguments::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default() {
        let args = Arguments::try_parse_from(["stockpay_server"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn add_stock_args() {
        let args = Arguments::try_parse_from([
            "stockpay_server",
            "add-stock",
            "-r",
            "north",
            "--variant",
            "w",
            "-s",
            "1",
            "--payload",
            "file-001",
        ])
        .unwrap();
        match args.command {
            Some(Command::AddStock { region, variant, size, payload }) => {
                assert_eq!(region, "north");
                assert_eq!(variant, "w");
                assert_eq!(size, "1");
                assert_eq!(payload, "file-001");
            },
            other => panic!("Unexpected command: {other:?}"),
        }
        let args = Arguments::try_parse_from(["stockpay_server", "refund-send", "42"]).unwrap();
        assert!(matches!(args.command, Some(Command::RefundSend { order_id: 42 })));
        assert!(Arguments::try_parse_from(["stockpay_server", "refund-send"]).is_err());
    }
}
