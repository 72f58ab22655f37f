use std::sync::Arc;

use crownstone_sse::{api::Credentials, config::Config, sse::event_type, Client, Event};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let credentials = match (
        std::env::var("CROWNSTONE_EMAIL"),
        std::env::var("CROWNSTONE_PASSWORD"),
    ) {
        (Ok(email), Ok(password)) => Some(Credentials::new(email, password)),
        _ => None,
    };

    let client = Client::new(Config::default(), credentials)
        .map_err(|e| {
            println!("Create client failed: {}", e);
            std::process::exit(1);
        })
        .unwrap();

    if let Ok(token) = std::env::var("CROWNSTONE_TOKEN") {
        client.set_access_token(token);
    }

    for presence in [
        event_type::ENTER_SPHERE,
        event_type::EXIT_SPHERE,
        event_type::ENTER_LOCATION,
        event_type::EXIT_LOCATION,
    ] {
        client.subscribe(presence, |event: Arc<Event>| async move {
            if let Some(presence) = event.as_presence() {
                println!(
                    "{}: user {} in sphere {}, location {:?}",
                    event.event_type(),
                    presence.user_id(),
                    presence.sphere_id(),
                    presence.location_id(),
                );
            }
        });
    }

    client.subscribe_blocking(event_type::SWITCH_STATE_UPDATE, |event| {
        if let Some(update) = event.as_switch_state_update() {
            println!(
                "switch state of {} is now {}",
                update.cloud_id(),
                update.switch_state()
            );
        }
    });

    if let Err(e) = client.start().await {
        println!("Start failed: {}, set CROWNSTONE_EMAIL/CROWNSTONE_PASSWORD or CROWNSTONE_TOKEN", e);
        std::process::exit(1);
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => client.stop(),
        _ = client.closed() => {}
    }

    client.closed().await;
}
