use anyhow::Context;
use clap::Parser;
use onward::config::Parameters;
use onward::proxy::{ForwardHandler, ProxyServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// A single-destination HTTP forward proxy.
#[derive(Parser, Debug)]
#[command(name = "onward", version, about)]
struct Args {
    /// Destination base URL every request is forwarded to
    destination: String,

    /// Path rewrite rule as '<pattern>:<replacement>' (repeatable, first match wins)
    #[arg(short = 'r', long = "rewrite", value_name = "PATTERN:REPLACEMENT")]
    rewrite: Vec<String>,

    /// Additional header as '<name>:<value>' (repeatable, added to inbound headers)
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    header: Vec<String>,

    /// Username for basic authentication against the destination
    #[arg(short, long, default_value = "")]
    username: String,

    /// Password for basic authentication against the destination
    #[arg(short, long, default_value = "")]
    password: String,

    /// Path of an additional CA certificate PEM trusted for the destination
    #[arg(long, value_name = "PATH")]
    ca_cert: Option<PathBuf>,

    /// Path of a PKCS#12 archive holding the client certificate and key
    #[arg(long, value_name = "PATH")]
    pkcs12: Option<PathBuf>,

    /// Password for the PKCS#12 archive
    #[arg(long, value_name = "PASSWORD", default_value = "")]
    pkcs12_password: String,

    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,
}

impl Args {
    fn into_parameters(self) -> Result<(String, Parameters), anyhow::Error> {
        let mut params = Parameters::default();
        for raw in &self.rewrite {
            params.rewrite_paths.push(Parameters::parse_rewrite(raw)?);
        }
        for raw in &self.header {
            params.headers.push(Parameters::parse_header(raw)?);
        }
        params.username = self.username;
        params.password = self.password;
        params.ca_cert_path = self.ca_cert;
        params.pkcs12_path = self.pkcs12;
        params.pkcs12_password = self.pkcs12_password;
        Ok((self.destination, params))
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let listen = args.listen;
    let (destination, params) = args.into_parameters()?;

    let handler = ForwardHandler::new(&destination, &params)
        .context("failed to set up the forward proxy")?;

    ProxyServer::new(listen, handler).run().await
}
