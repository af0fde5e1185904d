use analytics_dispatch::{adapters::AnyAdapter, Adapter, Event};
use std::env;

fn main() {
    env_logger::init();

    let connection_string = env::var("ANALYTICS_CONNECTION_STRING")
        .expect("env var ANALYTICS_CONNECTION_STRING should exist");

    let analytics =
        AnyAdapter::from_connection_string(connection_string, reqwest::blocking::Client::new())
            .expect("connection string should be valid");

    let event = Event::pageview("https://example.com/")
        .with_prop("documentTitle", "Home")
        .with_prop("screenWidth", 1920)
        .with_prop("screenHeight", 1080);
    if analytics.create_event(&event) {
        println!("{}: event created", analytics.name());
    } else {
        println!("{}: event not created, see logs", analytics.name());
    }
}
