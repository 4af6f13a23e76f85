use crate::commands::prompt;
use crate::error::Error;
use crate::models::{ConfigStore, SiteConfig};
use crate::services::HelenApiClient;
use crate::utils::get_config_path;

pub fn run(
    username: String,
    password: Option<String>,
    site: Option<String>,
    backfill_days: u32,
    enable_cost: bool,
) {
    let password = password.unwrap_or_else(|| prompt("Password: "));

    match run_login(username, password, site, backfill_days, enable_cost) {
        Ok(site_id) => {
            println!("✅ Delivery site {} configured", site_id);
            println!("💡 Run 'helensync pull' to import the initial backfill ({} days)", backfill_days);
        }
        Err(e) => {
            eprintln!("❌ Login failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_login(
    username: String,
    password: String,
    site: Option<String>,
    backfill_days: u32,
    enable_cost: bool,
) -> Result<String, Error> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Config(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let login = HelenApiClient::login(&username, &password).await?;

        let site_id = select_site(site, &login.delivery_site_ids)?;

        let store = ConfigStore::open(get_config_path())?;
        store
            .add_site(SiteConfig::new(
                login.access_token,
                site_id.clone(),
                backfill_days,
                enable_cost,
            ))
            .await?;

        Ok(site_id)
    })
}

/// Resolve which delivery site to configure.
///
/// A single site on the account is selected automatically; with several, the
/// `--site` flag wins, otherwise the operator picks interactively.
fn select_site(requested: Option<String>, available: &[String]) -> Result<String, Error> {
    if available.is_empty() {
        return Err(Error::Site("account has no delivery sites".to_string()));
    }

    if let Some(site_id) = requested {
        if available.iter().any(|s| *s == site_id) {
            return Ok(site_id);
        }
        return Err(Error::Site(format!(
            "delivery site {} is not available on this account (available: {})",
            site_id,
            available.join(", ")
        )));
    }

    if available.len() == 1 {
        return Ok(available[0].clone());
    }

    println!("Multiple delivery sites found:");
    for (i, site_id) in available.iter().enumerate() {
        println!("  {}. {}", i + 1, site_id);
    }
    let choice = prompt(&format!("Select delivery site [1-{}]: ", available.len()));
    let index: usize = choice
        .parse()
        .map_err(|_| Error::Validation(format!("invalid selection '{}'", choice)))?;
    available
        .get(index.wrapping_sub(1))
        .cloned()
        .ok_or_else(|| Error::Validation(format!("invalid selection '{}'", choice)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_site_is_auto_selected() {
        let available = vec!["100200".to_string()];
        assert_eq!(select_site(None, &available).unwrap(), "100200");
    }

    #[test]
    fn test_requested_site_must_be_available() {
        let available = vec!["100200".to_string(), "100300".to_string()];
        assert_eq!(
            select_site(Some("100300".to_string()), &available).unwrap(),
            "100300"
        );
        assert!(select_site(Some("999".to_string()), &available).is_err());
    }

    #[test]
    fn test_empty_site_list_is_an_error() {
        assert!(select_site(None, &[]).is_err());
    }
}
