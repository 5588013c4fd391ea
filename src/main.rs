use anyhow::Result;

use azwork::cancel::CancelToken;
use azwork::logging::{init_logging, LogConfig};
use azwork::repository::{RepositoryConfig, WorkItemRepository};
use azwork::{cli, config, ClientError};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = cli::parse_args(&args)?;

    // Load config
    let config = config::load_config()?;
    init_logging(LogConfig {
        level: config.log_level(),
        format: config.log_format(),
    });

    let repo = WorkItemRepository::new(RepositoryConfig::from(&config));

    // Ctrl-C cancels the in-flight request
    let token = CancelToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    match cli::run(&repo, invocation, &token).await {
        Err(err)
            if err
                .downcast_ref::<ClientError>()
                .is_some_and(ClientError::is_cancelled) =>
        {
            eprintln!("Cancelled");
            std::process::exit(130);
        }
        Err(err) => {
            if let Some(reason) = err.downcast_ref::<ClientError>().and_then(ClientError::reason) {
                eprintln!("{err}\n{reason}");
                std::process::exit(1);
            }
            Err(err)
        }
        Ok(()) => Ok(()),
    }
}
