use clap::Parser;
use sikiya::{
    app::{App, cli::Cli},
    auth::{AuthProvider, SERVICE, keyring::KeyringAuth},
    errors::AppError,
    logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<(), AppError> {
    let cli = Cli::parse();
    if cli.args.print_log_dir {
        println!("Log directory: {}", logging::get_data_dir().display());
        return Ok(());
    }
    if let Some(ref token) = cli.args.set_token {
        let auth = KeyringAuth::new(SERVICE)?;
        auth.set_token(token)?;
        println!("Token stored.");
        return Ok(());
    }

    let app = App::new(cli).await?;
    app.run().await
}
