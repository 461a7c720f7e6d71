//! Example: Connect to an Elk M1 panel and print entity status.

use elkm1_link::{ElkPanel, PanelConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = PanelConfig::builder()
        .address("192.168.0.251:2101")
        .user_code("1234")
        .build();

    println!("Connecting to panel...");
    let mut panel = ElkPanel::connect(config).await?;

    if let Some(versions) = panel.versions().await {
        println!("M1 firmware {}, M1XEP {}", versions.m1, versions.m1xep);
    }

    let zones = panel.zones().await;
    println!("\n--- Zones ---");
    for zone in &zones {
        if zone.is_configured() {
            println!(
                "  Zone {:3}: {:20} {:10} {:10} {}",
                zone.number(),
                zone.description(),
                zone.state().as_str(),
                zone.status().as_str(),
                zone.definition().as_str(),
            );
        }
    }

    let outputs = panel.outputs().await;
    println!("\n--- Outputs ---");
    for output in &outputs {
        if output.is_on() {
            println!("  Output {:3}: {} is on", output.number(), output.description());
        }
    }

    println!("\n--- Areas ---");
    for area in &panel.areas().await {
        println!(
            "  Area {}: {:20} {} ({})",
            area.number(),
            area.description(),
            area.armed().as_str(),
            area.arm_up().as_str(),
        );
    }

    let trouble = panel.trouble().await;
    if trouble.has_trouble() {
        println!("\nSystem trouble: {:?}", trouble.flags());
    }

    println!("\nPress Ctrl+C to disconnect...");
    tokio::signal::ctrl_c().await?;
    panel.disconnect().await;
    println!("Disconnected.");

    Ok(())
}
