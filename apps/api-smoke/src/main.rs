use std::{env, process};

use client_core::{DatingApi, LoginCredentials};
use client_http::HttpApi;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let api_url = env::var("BONDLY_API_URL").unwrap_or_else(|_| "http://localhost:7777".to_owned());
    let api = match HttpApi::new(&api_url) {
        Ok(api) => api,
        Err(err) => {
            eprintln!("Invalid BONDLY_API_URL: {err}");
            process::exit(2);
        }
    };

    match api.verify_session().await {
        Ok(()) => println!("{api_url} accepted an anonymous session check (unexpected but reachable)"),
        Err(err) if err.is_transport_failure() => {
            eprintln!("Bondly API at {api_url} is unreachable: {err}");
            process::exit(1);
        }
        Err(err) => match err.status {
            Some(status) => println!("{api_url} is reachable (verify-token answered {status})"),
            None => {
                eprintln!("Bondly API at {api_url} answered unexpectedly: {err}");
                process::exit(1);
            }
        },
    }

    let (Ok(email), Ok(password)) = (env::var("BONDLY_EMAIL"), env::var("BONDLY_PASSWORD")) else {
        println!("Set BONDLY_EMAIL and BONDLY_PASSWORD to run the live login check.");
        return;
    };

    let user = match api.login(&LoginCredentials { email, password }).await {
        Ok(user) => user,
        Err(err) => {
            eprintln!("Login failed: {err}");
            process::exit(1);
        }
    };
    if let Err(err) = api.verify_session().await {
        eprintln!("Logged in as {} but the session did not verify: {err}", user.id);
        process::exit(1);
    }
    println!("Logged in as {} and the session cookie verified", user.display_name());
}
