use clap::Subcommand;
use athlete_timer_core::Database;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the API bearer token
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the stored token
    Logout,
    /// Whether a token is stored
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        AuthAction::Login { token } => {
            let token = token.trim();
            if token.is_empty() {
                return Err("token must not be empty".into());
            }
            db.set_auth_token(token)?;
            println!("token stored");
        }
        AuthAction::Logout => {
            db.clear_auth_token()?;
            println!("token removed");
        }
        AuthAction::Status => {
            let status = if db.auth_token()?.is_some() {
                "authenticated"
            } else {
                "not authenticated"
            };
            println!("{status}");
        }
    }
    Ok(())
}
