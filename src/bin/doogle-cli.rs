use std::path::PathBuf;

use clap::{Parser, Subcommand};

use doogle_proxy::config::load_config;
use doogle_proxy::http::response::rewrite_location;
use doogle_proxy::http::ProxyError;
use doogle_proxy::overrides::OverrideResolver;
use doogle_proxy::rewrite::Rewriter;

#[derive(Parser)]
#[command(name = "doogle-cli")]
#[command(about = "Inspect how the proxy rewrites hosts and resolves overrides", long_about = None)]
struct Cli {
    /// TOML config file, same as the server's.
    #[arg(short, long, env = "DOOGLE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a public host maps upstream
    Host { host: String },
    /// Rewrite an upstream redirect target for a public host
    Location {
        url: String,
        #[arg(long)]
        host: String,
    },
    /// Check whether a request path is safe and has an override
    Check { path: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let rewriter = Rewriter::from_config(&config)?;

    match cli.command {
        Commands::Host { host } => {
            let host = host.to_ascii_lowercase();
            match rewriter.hosts.parse(&host) {
                Some(parts) => {
                    println!("subdomain: {:?}", parts.subdomain);
                    println!("name:      {:?}", parts.name);
                    println!("extension: {:?}", parts.extension);
                    println!("port:      {:?}", parts.port);
                }
                None => println!("{host} is not a recognized host; it passes through unchanged"),
            }
            println!("upstream:  {}", rewriter.hosts.to_upstream(&host));
            println!("base host: {}", rewriter.hosts.base_host(&host));
        }
        Commands::Location { url, host } => {
            let host = host.to_ascii_lowercase();
            match rewrite_location(&rewriter, &url, &host, &config.public.scheme)? {
                Some(location) => println!("{location}"),
                None => println!("{url} (relative, unchanged)"),
            }
        }
        Commands::Check { path } => {
            let resolver = OverrideResolver::from_config(&config.overrides)?;
            match resolver.resolve(&path).await {
                Ok(Some(file)) => println!("override: {} ({} bytes)", file.path.display(), file.len),
                Ok(None) => println!("no override under {}; request is proxied", resolver.root().display()),
                Err(ProxyError::PathTraversal(_)) => println!("forbidden: {path} escapes {}", resolver.root().display()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
