//! Powers on a server and prints the action progress.
//!
//! Run with: `HCLOUD_TOKEN=... cargo run --example power_on -- <server id>`

use hcloud::{Action, Backoff, Client, Context, Error};
use http::Method;
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize)]
struct ActionResult {
    action: Action,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("hcloud=debug")
        .init();

    let server_id: i64 = std::env::args()
        .nth(1)
        .ok_or("usage: power_on <server id>")?
        .parse()?;

    let client = Client::builder()
        .token(std::env::var("HCLOUD_TOKEN")?)
        .application("power-on-demo", env!("CARGO_PKG_VERSION"))
        .poll_backoff(Backoff::Constant(Duration::from_secs(1)))
        .build()?;

    let ctx = Context::background().with_timeout(Duration::from_secs(120));

    let req = client.new_request(
        &ctx,
        Method::POST,
        &format!("/servers/{}/actions/poweron", server_id),
        None,
    )?;
    let (result, response) = match client.execute_json::<ActionResult>(req).await {
        Ok(ok) => ok,
        Err(Error::Api(err)) => {
            println!("API refused the request: {}", err);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    println!(
        "Started action {} ({} requests left in this window)",
        result.action.id, response.meta.ratelimit.remaining
    );

    let (mut progress, mut errors) = client.action().watch_progress(&ctx, result.action);
    loop {
        tokio::select! {
            Some(p) = progress.recv() => println!("progress: {}%", p),
            result = errors.recv() => {
                match result {
                    Some(Err(e)) => println!("Action failed: {}", e),
                    Some(Ok(())) => println!("Server is running"),
                    None => {}
                }
                break;
            }
        }
    }

    Ok(())
}
