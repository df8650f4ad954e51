use std::time::Duration;

use netchan::packet::{packet_config, split, Packet, PacketReceiver, PacketSender};
use netchan_engine::connect_tcp;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

use crate::cmd::ChatArgs;
use crate::exit::{chan_error, io_error, transport_error, CliResult, SUCCESS};
use crate::output::{flush, print_message, OutputFormat};

pub async fn run(args: ChatArgs, format: OutputFormat) -> CliResult<i32> {
    let chan = connect_tcp::<Packet>(&args.addr, packet_config())
        .await
        .map_err(|err| transport_error("connect failed", err))?;
    info!(addr = %args.addr, "connected");

    let (tx, mut rx) = split(chan);
    let stdin = BufReader::new(tokio::io::stdin());
    let result = session(
        &tx,
        &mut rx,
        stdin,
        Duration::from_secs(args.keepalive),
        format,
    )
    .await;

    drop(tx);
    rx.shutdown().await;
    result?;

    match rx.error() {
        Some(err) => Err(chan_error("connection failed", err)),
        None => Ok(SUCCESS),
    }
}

/// Pump stdin lines out and print incoming messages until the server
/// acknowledges our quit or goes away.
async fn session<I>(
    tx: &PacketSender,
    rx: &mut PacketReceiver,
    input: I,
    keepalive: Duration,
    format: OutputFormat,
) -> CliResult<()>
where
    I: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut ticker = interval_at(Instant::now() + keepalive, keepalive);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut quitting = false;
    let mut interrupted = false;

    loop {
        tokio::select! {
            packet = rx.recv() => match packet {
                Some(Packet::Message { text }) => {
                    print_message(&text, format);
                    flush();
                }
                Some(Packet::KeepAlive) => {}
                Some(Packet::Quit) => {
                    debug!("server acknowledged quit");
                    return Ok(());
                }
                None => {
                    info!("server closed the connection");
                    return Ok(());
                }
            },
            line = lines.next_line(), if !quitting => match line {
                Ok(Some(text)) => {
                    if tx.message(text).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(None) => {
                    quitting = true;
                    if let Err(err) = tx.quit().await {
                        debug!(error = %err, "quit not sent");
                        return Ok(());
                    }
                }
                Err(err) => return Err(io_error("reading stdin failed", err)),
            },
            _ = ticker.tick() => {
                if let Err(err) = tx.keep_alive().await {
                    debug!(error = %err, "keepalive not sent");
                    return Ok(());
                }
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if quitting {
                    info!("interrupted while waiting for the server, leaving");
                    return Ok(());
                }
                quitting = true;
                if let Err(err) = tx.quit().await {
                    debug!(error = %err, "quit not sent");
                    return Ok(());
                }
            }
        }
    }
}
