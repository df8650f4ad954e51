#![cfg(feature = "cli")]

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use netchan::engine::{connect_tcp, Chan};
use netchan::packet::{packet_config, Packet};

fn free_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("ephemeral bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    drop(listener);
    addr
}

fn spawn_server(addr: &str) -> Child {
    Command::new(env!("CARGO_BIN_EXE_netchan"))
        .args(["--log-level", "error", "serve", addr])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve command should start")
}

async fn connect_with_retry(addr: &str, timeout: Duration) -> Chan<Packet> {
    let start = Instant::now();
    loop {
        match connect_tcp::<Packet>(addr, packet_config()).await {
            Ok(chan) => return chan,
            Err(err) => {
                if start.elapsed() >= timeout {
                    panic!("connect timeout: {err}");
                }
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        }
    }
}

fn stop(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[tokio::test]
async fn serve_relays_messages_and_echoes_control_packets() {
    let addr = free_addr();
    let server = spawn_server(&addr);
    let mut chan = connect_with_retry(&addr, Duration::from_secs(3)).await;

    chan.send(Packet::Message {
        text: "hello".to_string(),
    })
    .await
    .unwrap();
    match chan.recv().await {
        Some(Packet::Message { text }) => {
            assert!(text.starts_with("127.0.0.1:"), "{text}");
            assert!(text.ends_with(": hello"), "{text}");
        }
        other => panic!("unexpected packet: {other:?}"),
    }

    chan.send(Packet::KeepAlive).await.unwrap();
    assert_eq!(chan.recv().await, Some(Packet::KeepAlive));

    chan.send(Packet::Quit).await.unwrap();
    assert_eq!(chan.recv().await, Some(Packet::Quit));

    chan.close();
    assert_eq!(chan.recv().await, None);
    assert!(chan.error().is_none(), "{:?}", chan.error());

    stop(server);
}

#[tokio::test]
async fn chat_sends_stdin_and_prints_the_relay() {
    let addr = free_addr();
    let server = spawn_server(&addr);
    let mut probe = connect_with_retry(&addr, Duration::from_secs(3)).await;
    probe.shutdown().await;

    let mut client = Command::new(env!("CARGO_BIN_EXE_netchan"))
        .args(["--format", "raw", "--log-level", "error", "chat", &addr])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("chat command should start");

    {
        let mut stdin = client.stdin.take().expect("stdin should be piped");
        stdin.write_all(b"hello\n").expect("stdin should accept input");
    }

    let output = client.wait_with_output().expect("chat should exit");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "status: {:?}, stderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        stdout.lines().any(|line| line.ends_with(": hello")),
        "stdout: {stdout}"
    );

    stop(server);
}

#[test]
fn chat_to_closed_port_fails() {
    let addr = free_addr();
    let output = Command::new(env!("CARGO_BIN_EXE_netchan"))
        .args(["--log-level", "error", "chat", &addr])
        .stdin(Stdio::null())
        .output()
        .expect("chat command should run");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("connect failed"), "stderr: {stderr}");
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_netchan"))
        .arg("version")
        .output()
        .expect("version command should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("netchan {}", env!("CARGO_PKG_VERSION"))
    );
}
