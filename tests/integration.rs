use redis::aio::MultiplexedConnection;
use redis::RedisError;
use serial_test::serial;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, Duration, Instant};

use listdis::server::serve;
use listdis::store::Store;

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    tokio::spawn(serve(listener, Store::new()));

    address
}

async fn connect(address: &str) -> Result<MultiplexedConnection, RedisError> {
    let client = redis::Client::open(format!("redis://{}/", address))?;
    client.get_multiplexed_async_connection().await
}

/// Sends raw bytes and reads until `expected` bytes of reply arrived.
async fn raw_roundtrip(address: &str, request: &[u8], expected: usize) -> Vec<u8> {
    let mut stream = TcpStream::connect(address).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut reply = vec![0; expected];
    stream.read_exact(&mut reply).await.unwrap();
    reply
}

#[tokio::test]
async fn test_ping_and_echo() {
    let address = start_server().await;
    let mut con = connect(&address).await.unwrap();

    let pong: String = redis::cmd("PING").query_async(&mut con).await.unwrap();
    assert_eq!(pong, "PONG");

    let echo: String = redis::cmd("ECHO")
        .arg("hello world")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(echo, "hello world");
}

#[tokio::test]
async fn test_set_and_get() {
    let address = start_server().await;
    let mut con = connect(&address).await.unwrap();

    let (ok, value, empty, missing): (String, String, String, Option<String>) = redis::pipe()
        .cmd("SET")
        .arg("set_get_key_1")
        .arg("Argentina")
        .cmd("GET")
        .arg("set_get_key_1")
        .cmd("SET")
        .arg("set_get_key_2")
        .arg("")
        .ignore()
        .cmd("GET")
        .arg("set_get_key_2")
        .cmd("GET")
        .arg("set_get_nonexistentkey")
        .query_async(&mut con)
        .await
        .unwrap();

    assert_eq!(ok, "OK");
    assert_eq!(value, "Argentina");
    assert_eq!(empty, "");
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_set_binary_value() {
    let address = start_server().await;
    let mut con = connect(&address).await.unwrap();

    let value = vec![0u8, 13, 10, 255, 36];

    let _: () = redis::cmd("SET")
        .arg("binary")
        .arg(&value[..])
        .query_async(&mut con)
        .await
        .unwrap();
    let stored: Vec<u8> = redis::cmd("GET")
        .arg("binary")
        .query_async(&mut con)
        .await
        .unwrap();

    assert_eq!(stored, value);
}

#[tokio::test]
#[serial]
async fn test_set_with_expiration() {
    let address = start_server().await;
    let mut con = connect(&address).await.unwrap();

    let _: () = redis::cmd("SET")
        .arg("px_key")
        .arg("v")
        .arg("PX")
        .arg(100)
        .query_async(&mut con)
        .await
        .unwrap();

    let value: Option<String> = redis::cmd("GET")
        .arg("px_key")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(value, Some("v".to_string()));

    sleep(Duration::from_millis(150)).await;

    let value: Option<String> = redis::cmd("GET")
        .arg("px_key")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_set_errors() {
    let address = start_server().await;
    let mut con = connect(&address).await.unwrap();

    let err = redis::cmd("SET")
        .arg("k")
        .arg("v")
        .arg("PX")
        .arg("soon")
        .query_async::<_, ()>(&mut con)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("value is not an integer or out of range"));

    let err = redis::cmd("SET")
        .arg("k")
        .arg("v")
        .arg("KEEPTTL")
        .query_async::<_, ()>(&mut con)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("syntax error"));

    let err = redis::cmd("SET")
        .arg("k")
        .query_async::<_, ()>(&mut con)
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("wrong number of arguments for 'set' command"));
}

#[tokio::test]
async fn test_list_commands() {
    let address = start_server().await;
    let mut con = connect(&address).await.unwrap();

    let len: i64 = redis::cmd("RPUSH")
        .arg("list")
        .arg("a")
        .arg("b")
        .arg("c")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(len, 3);

    let len: i64 = redis::cmd("LPUSH")
        .arg("list")
        .arg("y")
        .arg("z")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(len, 5);

    let all: Vec<String> = redis::cmd("LRANGE")
        .arg("list")
        .arg(0)
        .arg(-1)
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(all, vec!["z", "y", "a", "b", "c"]);

    let tail: Vec<String> = redis::cmd("LRANGE")
        .arg("list")
        .arg(-2)
        .arg(100)
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(tail, vec!["b", "c"]);

    let head: Option<String> = redis::cmd("LPOP")
        .arg("list")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(head, Some("z".to_string()));

    let popped: Vec<String> = redis::cmd("LPOP")
        .arg("list")
        .arg(10)
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(popped, vec!["y", "a", "b", "c"]);

    let len: i64 = redis::cmd("LLEN")
        .arg("list")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(len, 0);

    let missing: Option<String> = redis::cmd("LPOP")
        .arg("list")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(missing, None);

    let empty: Vec<String> = redis::cmd("LRANGE")
        .arg("list")
        .arg(0)
        .arg(-1)
        .query_async(&mut con)
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_unknown_command() {
    let address = start_server().await;
    let mut con = connect(&address).await.unwrap();

    let err = redis::cmd("FLUSHALL")
        .query_async::<_, ()>(&mut con)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unknown command 'flushall'"));

    // The connection is still usable.
    let pong: String = redis::cmd("PING").query_async(&mut con).await.unwrap();
    assert_eq!(pong, "PONG");
}

#[tokio::test]
#[serial]
async fn test_blpop_hand_off() {
    let address = start_server().await;
    let mut consumer = connect(&address).await.unwrap();
    let mut producer = connect(&address).await.unwrap();

    let blocked = tokio::spawn(async move {
        redis::cmd("BLPOP")
            .arg("queue")
            .arg(0)
            .query_async::<_, Option<(String, String)>>(&mut consumer)
            .await
    });
    sleep(Duration::from_millis(50)).await;

    let len: i64 = redis::cmd("RPUSH")
        .arg("queue")
        .arg("x")
        .query_async(&mut producer)
        .await
        .unwrap();
    assert_eq!(len, 0);

    let popped = blocked.await.unwrap().unwrap();
    assert_eq!(popped, Some(("queue".to_string(), "x".to_string())));

    let len: i64 = redis::cmd("LLEN")
        .arg("queue")
        .query_async(&mut producer)
        .await
        .unwrap();
    assert_eq!(len, 0);
}

#[tokio::test]
#[serial]
async fn test_blpop_serves_clients_in_arrival_order() {
    let address = start_server().await;
    let mut first = connect(&address).await.unwrap();
    let mut second = connect(&address).await.unwrap();
    let mut producer = connect(&address).await.unwrap();

    let first = tokio::spawn(async move {
        redis::cmd("BLPOP")
            .arg("queue")
            .arg(0)
            .query_async::<_, Option<(String, String)>>(&mut first)
            .await
    });
    sleep(Duration::from_millis(50)).await;

    let second = tokio::spawn(async move {
        redis::cmd("BLPOP")
            .arg("queue")
            .arg(0)
            .query_async::<_, Option<(String, String)>>(&mut second)
            .await
    });
    sleep(Duration::from_millis(50)).await;

    let _: i64 = redis::cmd("RPUSH")
        .arg("queue")
        .arg("x")
        .query_async(&mut producer)
        .await
        .unwrap();
    let popped = first.await.unwrap().unwrap();
    assert_eq!(popped, Some(("queue".to_string(), "x".to_string())));

    let _: i64 = redis::cmd("RPUSH")
        .arg("queue")
        .arg("y")
        .query_async(&mut producer)
        .await
        .unwrap();
    let popped = second.await.unwrap().unwrap();
    assert_eq!(popped, Some(("queue".to_string(), "y".to_string())));
}

#[tokio::test]
#[serial]
async fn test_blpop_timeout() {
    let address = start_server().await;
    let mut con = connect(&address).await.unwrap();

    let started = Instant::now();
    let popped: Option<(String, String)> = redis::cmd("BLPOP")
        .arg("queue")
        .arg(0.1)
        .query_async(&mut con)
        .await
        .unwrap();

    assert_eq!(popped, None);
    assert!(started.elapsed() >= Duration::from_millis(100));

    // The timed out client no longer takes pushed elements.
    let len: i64 = redis::cmd("RPUSH")
        .arg("queue")
        .arg("x")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(len, 1);
}

#[tokio::test]
#[serial]
async fn test_blpop_disconnected_client_is_skipped() {
    let address = start_server().await;

    // A raw client blocks, then disconnects without waiting for the reply.
    let mut stream = TcpStream::connect(&address).await.unwrap();
    stream
        .write_all(b"*3\r\n$5\r\nBLPOP\r\n$5\r\nqueue\r\n$1\r\n0\r\n")
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;
    drop(stream);
    sleep(Duration::from_millis(50)).await;

    let mut con = connect(&address).await.unwrap();
    let len: i64 = redis::cmd("RPUSH")
        .arg("queue")
        .arg("x")
        .query_async(&mut con)
        .await
        .unwrap();
    assert_eq!(len, 1);
}

#[tokio::test]
async fn test_blpop_invalid_timeout() {
    let address = start_server().await;
    let mut con = connect(&address).await.unwrap();

    let err = redis::cmd("BLPOP")
        .arg("queue")
        .arg("later")
        .query_async::<_, ()>(&mut con)
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("timeout is not a float or out of range"));
}

#[tokio::test]
async fn test_inline_commands() {
    let address = start_server().await;

    let reply = raw_roundtrip(&address, b"PING\r\n", 7).await;
    assert_eq!(reply, b"+PONG\r\n");

    let reply = raw_roundtrip(&address, b"GET missing\r\n", 5).await;
    assert_eq!(reply, b"$-1\r\n");
}

#[tokio::test]
async fn test_protocol_error_keeps_connection_open() {
    let address = start_server().await;

    let expected = b"-ERR Protocol error: invalid bulk length\r\n+PONG\r\n";
    let reply = raw_roundtrip(
        &address,
        b"*2\r\n$abc\r\nfoo\r\n*1\r\n$4\r\nPING\r\n",
        expected.len(),
    )
    .await;

    assert_eq!(reply, expected);
}
