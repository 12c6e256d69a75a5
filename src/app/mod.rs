use std::sync::Arc;

use inquire::Password;
use tracing::{info, warn};

use crate::{
    api::{FeedbackApi, client::HttpFeedbackClient},
    auth::{AuthProvider, SERVICE, keyring::KeyringAuth},
    config::Config,
    errors::AppError,
    feedback::ContentRef,
    logging,
    ui::{self, AppState, theme::Theme},
};

pub mod cli;

pub struct App {
    args: cli::Args,
    content: ContentRef,
    config: Config,
    theme: Theme,
    api: Arc<dyn FeedbackApi>,
}

impl App {
    pub async fn new(cli: cli::Cli) -> Result<Self, AppError> {
        let content = cli.args.content().ok_or_else(|| {
            AppError::Validation("either --article or --video is required".to_string())
        })?;
        let config = Config::load(&cli.args)?;
        let theme = Theme::from_config(&config.theme)?;
        let auth = KeyringAuth::new(SERVICE)?;
        let token = match auth.get_token().ok() {
            Some(token) => token,
            None => Self::handle_no_token(&auth)?,
        };
        let api = HttpFeedbackClient::new(&config.api.base_url, Some(token), config.api.timeout())?;
        Ok(Self {
            args: cli.args,
            content,
            config,
            theme,
            api: Arc::new(api),
        })
    }

    pub async fn run(self) -> Result<(), AppError> {
        logging::init(self.args.log_level)?;
        info!(content = %self.content, base_url = %self.config.api.base_url, "starting");
        let viewer = self.api.viewer().await.inspect_err(|err| {
            warn!(error = %err, "could not load the signed in user");
        })?;
        info!(role = %viewer.role, "signed in");
        let state = AppState::new(self.api, self.content, viewer, self.config, self.theme);
        ui::run(state).await
    }

    pub fn handle_no_token(auth: &impl AuthProvider) -> Result<String, AppError> {
        let prompt = Password::new("No token found. Please enter your Sikiya API token")
            .with_display_toggle_enabled()
            .without_confirmation()
            .with_display_mode(inquire::PasswordDisplayMode::Masked);
        let token = prompt.prompt()?;
        auth.set_token(&token)?;
        Ok(token)
    }
}
