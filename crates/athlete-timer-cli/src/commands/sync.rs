use athlete_timer_core::{ApiClient, Config, Database};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let client = ApiClient::new(&config.api, db.auth_token()?)?;
    let pending = db.unsynced_results()?.len();
    let synced = client.flush_pending(&db)?;
    println!("synced {synced} of {pending} pending result(s)");
    Ok(())
}
