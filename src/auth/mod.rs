use crate::errors::AppError;

pub mod keyring;

pub const SERVICE: &str = "sikiya";

pub trait AuthProvider {
    fn get_token(&self) -> Result<String, AppError>;
    fn set_token(&self, token: &str) -> Result<(), AppError>;
}
