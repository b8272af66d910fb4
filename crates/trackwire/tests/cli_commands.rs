#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use trackwire_peer::connect;
use trackwire_transport::Endpoint;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/twcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn wait_for_connect(path: &Path, timeout: Duration) {
    let endpoint = Endpoint::Unix(path.to_path_buf());
    let start = Instant::now();
    loop {
        if connect(&endpoint).is_ok() {
            return;
        }
        if start.elapsed() >= timeout {
            panic!("connect timeout");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn trackwire() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_trackwire"));
    command.arg("--log-level").arg("error");
    command
}

fn inspect_stdin(input: &[u8]) -> Output {
    let mut child = trackwire()
        .arg("--format")
        .arg("json")
        .arg("inspect")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("inspect should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(input)
        .expect("stdin should accept input");
    child.wait_with_output().expect("inspect should finish")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be one json document")
}

fn spawn_listener(sock_path: &Path, extra: &[&str]) -> Child {
    let child = trackwire()
        .arg("--format")
        .arg("json")
        .arg("listen")
        .arg(sock_path)
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");
    wait_for_connect(sock_path, Duration::from_secs(3));
    child
}

#[test]
fn version_prints_package_version() {
    let output = trackwire().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(&format!("trackwire {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn inspect_accepts_valid_message() {
    let output = inspect_stdin(br#"{"type":"req","id":12,"time":3.5,"data":{"req":"sensor_info"}}"#);
    assert_eq!(output.status.code(), Some(0));

    let report = json_stdout(&output);
    assert_eq!(report["id"], 12);
    assert_eq!(report["kind"], "req");
    assert_eq!(report["message"]["data"]["req"], "sensor_info");
}

#[test]
fn inspect_rejects_unknown_type_with_its_id() {
    let output = inspect_stdin(br#"{"id": 42, "type": "bogus"}"#);
    assert_eq!(output.status.code(), Some(60));

    let report = json_stdout(&output);
    assert_eq!(report["valid"], false);
    assert_eq!(report["recovered_id"], 42);
    assert_eq!(report["path"], "/type");
}

#[test]
fn inspect_recovers_id_from_truncated_input() {
    let output = inspect_stdin(br#"{"type": "req", "id": 7789, "ti"#);
    assert_eq!(output.status.code(), Some(60));

    let report = json_stdout(&output);
    assert_eq!(report["recovered_id"], 7789);
    assert!(report.get("path").is_none());
}

#[test]
fn send_request_waits_for_listener_ack() {
    let dir = unique_temp_dir("ack");
    let sock_path = dir.join("listen.sock");
    let mut listener = spawn_listener(&sock_path, &["--count", "1"]);

    let output = trackwire()
        .arg("--format")
        .arg("json")
        .arg("send")
        .arg(&sock_path)
        .arg("--req")
        .arg("sensor_info")
        .arg("--wait")
        .arg("--wait-timeout")
        .arg("3s")
        .output()
        .expect("send should run");

    assert!(output.status.success());
    let reply = json_stdout(&output);
    assert_eq!(reply["kind"], "ack");
    assert_eq!(reply["message"]["data"]["ack"], true);
    assert!(reply["reply_to"].is_i64());

    let listened = listener.wait_with_output().expect("listener should exit");
    assert!(listened.status.success());
    let received = json_stdout(&listened);
    assert_eq!(received["kind"], "req");
    assert_eq!(received["message"]["data"]["req"], "sensor_info");
    assert_eq!(received["id"], reply["reply_to"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn malformed_send_is_answered_with_nack() {
    let dir = unique_temp_dir("nack");
    let sock_path = dir.join("listen.sock");
    let mut listener = spawn_listener(&sock_path, &[]);

    let output = trackwire()
        .arg("--format")
        .arg("json")
        .arg("send")
        .arg(&sock_path)
        .arg("--raw")
        .arg(r#"{"type": "req", "id": 7789, "ti"#)
        .arg("--wait")
        .arg("--wait-timeout")
        .arg("3s")
        .output()
        .expect("send should run");

    assert!(output.status.success());
    let nack = json_stdout(&output);
    assert_eq!(nack["kind"], "ack");
    assert_eq!(nack["reply_to"], 7789);
    assert_eq!(nack["message"]["data"]["ack"], false);

    let _ = listener.kill();
    let _ = listener.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn raw_send_without_answer_times_out() {
    let dir = unique_temp_dir("silent");
    let sock_path = dir.join("listen.sock");
    let mut listener = spawn_listener(&sock_path, &["--no-ack"]);

    let output = trackwire()
        .arg("--format")
        .arg("json")
        .arg("send")
        .arg(&sock_path)
        .arg("--raw")
        .arg(r#"{"type":"req","id":5,"time":1.0,"data":{"req":"status"}}"#)
        .arg("--wait")
        .arg("--wait-timeout")
        .arg("300ms")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(124));
    assert!(output.stdout.is_empty());

    let _ = listener.kill();
    let _ = listener.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn idle_listener_stops_on_interrupt() {
    let dir = unique_temp_dir("sigint");
    let sock_path = dir.join("listen.sock");
    let mut listener = spawn_listener(&sock_path, &[]);

    let status = Command::new("kill")
        .arg("-INT")
        .arg(listener.id().to_string())
        .status()
        .expect("kill should run");
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(3);
    let code = loop {
        if let Some(status) = listener.try_wait().expect("listener status") {
            break status.code();
        }
        if Instant::now() >= deadline {
            let _ = listener.kill();
            panic!("listener ignored the interrupt");
        }
        thread::sleep(Duration::from_millis(25));
    };
    assert_eq!(code, Some(0));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_to_missing_socket_fails() {
    let dir = unique_temp_dir("missing");
    let output = trackwire()
        .arg("send")
        .arg(dir.join("absent.sock"))
        .arg("--req")
        .arg("status")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(1));
    let _ = std::fs::remove_dir_all(&dir);
}
