//! Room control example
//!
//! Logs in to a processor, recalls a scene and prints feedback for a while.

use std::time::Duration;

use nwkrust::{AreaConfig, Device, DeviceEvent, LinkState, TcpTransport, Topology};
use tokio::time::timeout;

#[tokio::main]
async fn main() -> nwkrust::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Change to your processor's address
    let host = std::env::var("NWK_HOST").unwrap_or_else(|_| "192.168.1.50".to_string());

    let topology = Topology::new().with_area(
        AreaConfig::new(1, 1, "Living")
            .with_zone(10, "Downlights")
            .with_zone(11, "Lamps")
            .with_shade(20, "Window")
            .with_scene(1, "Bright")
            .with_scene(2, "Evening"),
    );

    let device = Device::new(topology)?;
    let mut events = device.subscribe();

    let driver = device.clone();
    let link = tokio::spawn(async move {
        let mut transport = TcpTransport::with_default_port(host);
        driver.run(&mut transport).await
    });

    println!("Waiting for login...");
    while let Ok(event) = events.recv().await {
        if event == DeviceEvent::LinkStateChanged(LinkState::Ready) {
            break;
        }
    }
    println!("Logged in");

    device.set_room_scene(1, 2)?;
    device.start_lowering_shade(1, 20)?;

    // Print feedback for ten seconds
    let _ = timeout(Duration::from_secs(10), async {
        while let Ok(event) = events.recv().await {
            println!("{:?}", event);
        }
    })
    .await;

    for load in device.loads(1)? {
        println!(
            "{}: {:.0}%",
            load.name,
            device.load_level(1, load.integration_id)? * 100.0
        );
    }

    link.abort();
    Ok(())
}
