use std::sync::Arc;

use phoenix_socket_rs::{ResponseEffect, SocketConnection, SocketEvent, TransportOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:4000/socket/websocket".to_string());

    // Create socket
    let socket = SocketConnection::new(
        &endpoint,
        TransportOptions {
            reconnect_after_ms: Some(vec![1000, 2000, 5000, 10000]),
            on_state_change: Some(Arc::new(|event: SocketEvent| {
                match &event {
                    SocketEvent::Open => println!("socket open"),
                    SocketEvent::Closed(info) => {
                        println!("socket closed: code={:?} reason={}", info.code, info.reason)
                    }
                    SocketEvent::Error(detail) => println!("socket error: {}", detail),
                }
                ResponseEffect::Ignore
            })),
            ..Default::default()
        },
    )?;

    // Connect
    println!("Connecting to {}...", endpoint);
    socket.try_connect().await?;
    println!("Connected! ({})", socket);

    // Keep connection alive
    tokio::signal::ctrl_c().await?;

    // Disconnect
    println!("Disconnecting...");
    socket.disconnect().await?;
    println!("Disconnected!");

    Ok(())
}
