use crate::commands::prompt;
use crate::error::Error;
use crate::models::ConfigStore;
use crate::services::HelenApiClient;
use crate::utils::get_config_path;

pub fn run(username: String, password: Option<String>, site: Option<String>) {
    let password = password.unwrap_or_else(|| prompt("Password: "));

    match run_reauth(username, password, site) {
        Ok(site_id) => {
            println!("✅ Access token replaced for delivery site {}", site_id);
        }
        Err(e) => {
            eprintln!("❌ Re-authentication failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_reauth(username: String, password: String, site: Option<String>) -> Result<String, Error> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Config(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let store = ConfigStore::open(get_config_path())?;
        let configured = store.site_ids().await;

        let site_id = match site {
            Some(site_id) => site_id,
            None if configured.len() == 1 => configured[0].clone(),
            None if configured.is_empty() => {
                return Err(Error::Config(
                    "no delivery sites configured, run 'helensync login' first".to_string(),
                ));
            }
            None => {
                return Err(Error::Validation(format!(
                    "several delivery sites configured, pass --site (one of: {})",
                    configured.join(", ")
                )));
            }
        };

        let login = HelenApiClient::login(&username, &password).await?;

        // Only the token changes; progress state stays as it is so the next
        // cycle resumes exactly where the expired token left off.
        store.replace_token(&site_id, login.access_token).await?;
        Ok(site_id)
    })
}
