use clap::Parser;
use listdis::server::{self, Config, DEFAULT_BIND, DEFAULT_PORT};
use listdis::Error;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The port to listen on
    #[arg(short, long, env = "LISTDIS_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// The address to bind to
    #[arg(short, long, env = "LISTDIS_BIND", default_value = DEFAULT_BIND)]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let config = Config {
        bind: args.bind,
        port: args.port,
    };

    server::run(config).await
}
