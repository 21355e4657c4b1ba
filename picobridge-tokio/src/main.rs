//! PicoBridge host binary
//!
//! Brings the link up, connects to the broker and runs the liveness loop until
//! Ctrl-C. Typing `press` on stdin simulates a button press.

use log::{error, info, warn};
use picobridge_tokio::*;
use tokio::io::{AsyncBufReadExt, BufReader};

static EDGES: EdgeQueue = EdgeQueue::new();

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let RuntimeConfig {
        bridge: config,
        link_timeout,
    } = load_config()?;

    info!("Starting PicoBridge as {}", config.client_id);
    info!("  broker: {} (default port {})", config.broker, config.port);
    info!("  sensor topic: {}", config.sensor_topic);
    info!("  actuator topic: {}", config.actuator_topic);
    info!("  keep-alive: {}s", config.keep_alive_secs);

    let (handle, driver) = watch_link();
    let target = SocketAddr::parse(&config.broker, config.port).unwrap_or(SocketAddr {
        ip: [127, 0, 0, 1],
        port: config.port,
    });
    tokio::spawn(async move {
        match probe_host_address(target).await {
            Ok(address) => handle.assign(address),
            Err(e) => error!("No usable interface: {}", e),
        }
    });
    let mut link = NetworkLink::new(driver);
    bring_up_within(&mut link, link_timeout).await?;

    let gpio = SimGpio::new();
    let mut bridge = EventBridge::new(gpio.clone(), &config);
    if let Err(e) = bridge.configure(&EDGES) {
        warn!("Continuing with partial GPIO: {}", e);
    }

    let button = config.button_pin;
    tokio::spawn(async move {
        info!("Type 'press' to push the button");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match line.trim() {
                "press" => {
                    if let Err(e) = gpio.press(button) {
                        warn!("Button press failed: {}", e);
                    }
                    gpio.release(button);
                }
                "" => {}
                other => warn!("Unknown input {:?}", other),
            }
        }
    });

    let client = PubSubClient::from_config(TokioTransport::new(), StdTimeSource::new(), &config)?;
    let mut liveness = LivenessLoop::new(client, bridge, &EDGES, TokioDelay, config.poll_timeout_ms);
    if let Err(e) = liveness.client_mut().connect(&config.broker).await {
        error!("Connect failed: {}", e);
    }

    tokio::select! {
        _ = liveness.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down");
        }
    }

    if let Err(e) = liveness.client_mut().disconnect().await {
        warn!("Disconnect failed: {}", e);
    }
    Ok(())
}
