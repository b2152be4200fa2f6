//! `portal-nav`: headless front end for the portal API.
//!
//! ```text
//! portal-nav menu                     resolve and print the menu as JSON
//! portal-nav login <user> <password>  start a session
//! portal-nav me                       refresh the profile
//! portal-nav guard <ROLE>             evaluate a route requiring ROLE
//! portal-nav logout                   end the session
//! ```

use std::sync::Arc;

use anyhow::{Context, bail};

use portal_auth::{FileStorage, Role, TracingNavigator};
use portal_client::{ClientConfig, LoginRequest, Portal};
use portal_navigation::auth_menu_items;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    portal_observability::init();

    let config = ClientConfig::from_env().context("loading configuration")?;
    let storage = Arc::new(FileStorage::new(config.storage_path.clone()));
    let portal = Portal::connect(config, storage, Arc::new(TracingNavigator))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] | ["menu"] => {
            let Some(menu) = portal.render_menu().await else {
                bail!("session changed while resolving the menu");
            };
            let output = serde_json::json!({
                "role": portal.session().current_role(),
                "authenticated": portal.session().is_authenticated(),
                "menu": menu,
                "auth": auth_menu_items(portal.session().is_authenticated()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        ["login", username, password] => {
            let user = portal
                .auth()
                .login(&LoginRequest::new(*username, *password))
                .await
                .context("login failed")?;
            println!("logged in as {} ({})", user.username, user.role);
        }
        ["me"] => {
            let user = portal.auth().current_user().await.context("profile refresh failed")?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        ["guard", role] => {
            let required: Role = role.parse()?;
            let decision = portal.enter(required);
            println!("{decision:?}");
        }
        ["logout"] => portal.auth().logout().await,
        other => bail!("unrecognised arguments: {}", other.join(" ")),
    }

    Ok(())
}
