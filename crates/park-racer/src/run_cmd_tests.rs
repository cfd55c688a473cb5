use super::*;
use racer_config::ConfigFormat;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const COOKIE_VALUE: &str = "SESSDATA=abc; bili_jct=0123abcd; DedeUserID=42";

const SNAPSHOT: &str = r#"{"code":0,"message":"0","data":{
    "reserve_list":{"20240712":[
        {"reserve_id":6016,"act_title":"Stage A","reserve_begin_time":1720760400,"is_vip_ticket":0},
        {"reserve_id":6018,"act_title":"VIP Lounge","reserve_begin_time":1720760400,"is_vip_ticket":1}
    ]},
    "user_ticket_info":[
        {"ticket":"15111332527932","sku_name":"单日票","screen_name":"7月12日"}
    ]}}"#;

/// Minimal upstream: `/info` answers with `snapshot`, every other path pops
/// the next reservation reply.
struct Upstream {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Upstream {
    async fn start(snapshot: &'static str, replies: Vec<&'static str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let replies = Arc::new(Mutex::new(VecDeque::from(replies)));
        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let request = read_request(&mut stream).await;
                let line = request.lines().next().unwrap_or_default().to_string();
                let body = if line.contains("/info") {
                    snapshot
                } else {
                    replies
                        .lock()
                        .unwrap()
                        .pop_front()
                        .unwrap_or(r#"{"code":76647,"message":"exhausted"}"#)
                };
                seen.lock().unwrap().push(line);
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        Self { base, requests }
    }

    fn request_lines(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn reserve_calls(&self) -> usize {
        self.request_lines()
            .iter()
            .filter(|line| line.starts_with("POST /do"))
            .count()
    }
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn config(base: &str, job: serde_json::Value, audit_path: &Path) -> RacerConfig {
    let json = serde_json::json!({
        "cookie": COOKIE_VALUE,
        "buvid": "XY1234",
        "job": job,
        "ntp_servers": [],
        "audit_path": audit_path,
        "endpoints": {"info_url": format!("{base}/info"), "reserve_url": format!("{base}/do")},
        "racing": {"backoff_ms": 10, "success_cooldown_ms": 10, "request_timeout_ms": 2000}
    });
    RacerConfig::parse(&json.to_string(), ConfigFormat::Json).unwrap()
}

fn audit_lines(path: &Path) -> usize {
    std::fs::read_to_string(path).unwrap().lines().count()
}

#[tokio::test]
async fn test_full_run_reserves_and_audits() {
    let upstream = Upstream::start(SNAPSHOT, vec![r#"{"code":0,"message":"0","ttl":1}"#]).await;
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("response.txt");
    let config = config(
        &upstream.base,
        serde_json::json!({"6016": "15111332527932"}),
        &audit_path,
    );

    let summary = execute(&config, false).await.unwrap().unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.terminated, 0);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.gated_calls, 1);
    assert_eq!(upstream.reserve_calls(), 1);
    assert!(upstream.request_lines()[0].starts_with("GET /info?csrf=0123abcd&reserve_date="));
    assert_eq!(audit_lines(&audit_path), 1);
}

#[tokio::test]
async fn test_dry_run_fires_nothing() {
    let upstream = Upstream::start(SNAPSHOT, Vec::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("response.txt");
    let config = config(
        &upstream.base,
        serde_json::json!({"6016": "15111332527932"}),
        &audit_path,
    );

    assert!(execute(&config, true).await.unwrap().is_none());
    assert_eq!(upstream.reserve_calls(), 0);
    assert!(!audit_path.exists());
}

#[tokio::test]
async fn test_skipped_pairs_are_not_fatal() {
    let upstream = Upstream::start(SNAPSHOT, vec![r#"{"code":0,"message":"0"}"#]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(
        &upstream.base,
        serde_json::json!({
            "6016": "15111332527932",
            "6018": "15111332527932",
            "9999": "15111332527932",
            "6017": "NOPE"
        }),
        &dir.path().join("response.txt"),
    );

    let summary = execute(&config, false).await.unwrap().unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 3);
    assert_eq!(upstream.reserve_calls(), 1);
}

#[tokio::test]
async fn test_terminal_reply_ends_task() {
    let upstream = Upstream::start(SNAPSHOT, vec![r#"{"code":75574,"message":"已约满"}"#]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(
        &upstream.base,
        serde_json::json!({"6016": "15111332527932"}),
        &dir.path().join("response.txt"),
    );

    let summary = execute(&config, false).await.unwrap().unwrap();

    assert_eq!(summary.terminated, 1);
    assert_eq!(summary.gated_calls, 1);
}

#[tokio::test]
async fn test_rejected_snapshot_is_fatal() {
    let upstream = Upstream::start(r#"{"code":-101,"message":"账号未登录"}"#, Vec::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(
        &upstream.base,
        serde_json::json!({"6016": "15111332527932"}),
        &dir.path().join("response.txt"),
    );

    let err = execute(&config, false).await.unwrap_err();
    assert!(err.to_string().contains("Cannot race without the reservation snapshot"));
    assert_eq!(upstream.reserve_calls(), 0);
}

#[tokio::test]
async fn test_missing_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cli = Cli {
        config: dir.path().join("absent.json"),
        log_dir: None,
        dry_run: false,
    };
    let err = handle_run(&cli).await.unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[tokio::test]
async fn test_invalid_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("config.json");
    std::fs::write(&path, r#"{"cookie":"SESSDATA=abc","job":{"6016":"T1"}}"#).unwrap();
    let cli = Cli {
        config: path,
        log_dir: None,
        dry_run: true,
    };
    let err = handle_run(&cli).await.unwrap_err();
    assert!(format!("{err:#}").contains("bili_jct"));
}
