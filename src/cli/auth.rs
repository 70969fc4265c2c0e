//! CLI command handlers.

use crate::auth::{credential::redact, Registration};
use crate::session::Session;
use crate::transport::HttpRequest;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Handle `petsit auth login`.
pub async fn handle_login(session: &Session, email: &str, password: &str) -> CliResult {
    session.auth().sign_in(email, password).await?;
    println!("✅ Signed in as {email}");
    Ok(())
}

/// Handle `petsit auth register`.
pub async fn handle_register(session: &Session, registration: Registration) -> CliResult {
    session.auth().register(&registration).await?;
    println!("✅ Registered and signed in as {}", registration.email);
    Ok(())
}

/// Handle `petsit auth status`.
pub fn handle_status(session: &Session) -> CliResult {
    match session.auth().status() {
        Some(credential) => {
            println!("✅ Signed in");
            println!("  access token: {}", redact(credential.access_token()));
            let refresh = if credential.can_refresh() {
                "available"
            } else {
                "missing"
            };
            println!("  refresh token: {refresh}");
        }
        None => println!("❌ Not signed in"),
    }
    Ok(())
}

/// Handle `petsit auth logout`.
pub fn handle_logout(session: &Session) -> CliResult {
    session.auth().sign_out()?;
    println!("✅ Signed out");
    Ok(())
}

/// Handle `petsit get <path>`.
pub async fn handle_get(session: &Session, path: &str) -> CliResult {
    let transport = session.transport();
    let response = transport
        .execute(HttpRequest::get(transport.url(path)?))
        .await?;
    println!("{}", response.text());
    Ok(())
}
