use std::sync::Arc;
use std::time::Duration;

use phoenix_socket_rs::{
    ChannelEvent, ChannelOptions, MessageHandler, ResponseEffect, SocketConnection,
    TransportOptions,
};
use serde_json::json;

/// Joins a chat room, echoes inbound messages and sends one of its own.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:4000/socket/websocket".to_string());

    let socket = SocketConnection::new(
        &endpoint,
        TransportOptions {
            params: Some(json!({"token": "demo"})),
            ..Default::default()
        },
    )?;

    socket.try_connect().await?;
    println!("Connected to {}", endpoint);

    let on_new_msg: MessageHandler = Arc::new(|payload| {
        println!("new_msg: {}", payload);
        ResponseEffect::Ignore
    });

    let channel = socket
        .channel(
            "room:lobby",
            ChannelOptions {
                params: Some(json!({"name": "demo-user"})),
                on: vec![("new_msg".to_string(), on_new_msg)],
                on_state_change: Some(Arc::new(|event: ChannelEvent| {
                    match &event {
                        ChannelEvent::Joined(reply) => println!("joined: {}", reply),
                        ChannelEvent::Rejected(reason) => println!("rejected: {}", reason),
                        ChannelEvent::Left => println!("left the room"),
                        ChannelEvent::Error(reason) => println!("channel error: {}", reason),
                    }
                    ResponseEffect::Ignore
                })),
            },
        )
        .await;

    let reply = channel.try_join(Duration::from_secs(5)).await?;
    println!("join reply: {} ({})", reply, channel);

    let ack = channel
        .try_push(
            "new_msg",
            json!({"body": "hello from rust"}),
            Duration::from_secs(5),
        )
        .await?;
    println!("push acked: {}", ack);

    tokio::signal::ctrl_c().await?;

    channel.leave().await;
    socket.disconnect().await?;
    Ok(())
}
