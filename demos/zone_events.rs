//! Example: Subscribe to panel events and print state changes.

use elkm1_link::{ElkPanel, PanelConfig, PanelEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = PanelConfig::builder()
        .address("192.168.0.251:2101")
        .user_code("1234")
        .build();

    let mut panel = ElkPanel::connect(config).await?;
    let mut events = panel.subscribe();

    println!("Listening for panel events (Ctrl+C to stop)...\n");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(PanelEvent::ZoneChanged { zone, state, status }) => {
                        println!(
                            "Zone {zone}: {} / {}",
                            state.as_str(),
                            status.as_str()
                        );
                    }
                    Ok(PanelEvent::AreaChanged { area, armed }) => {
                        println!("Area {area}: {}", armed.as_str());
                    }
                    Ok(PanelEvent::Disconnected) => {
                        println!("Panel disconnected!");
                        break;
                    }
                    Ok(event) => {
                        println!("Event: {event:?}");
                    }
                    Err(e) => {
                        println!("Event channel error: {e}");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nDisconnecting...");
                break;
            }
        }
    }

    panel.disconnect().await;
    Ok(())
}
