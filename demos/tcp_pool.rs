//! Pooling TCP connections to a local echo server, with Prometheus metrics

use esox_connectionpool::{Pool, PoolOptions, PrometheusMetrics};
use prometheus::{Encoder, Registry, TextEncoder};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn spawn_echo_server() -> io::Result<std::net::SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || {
                let mut writer = match stream.try_clone() {
                    Ok(writer) => writer,
                    Err(_) => return,
                };
                for line in BufReader::new(stream).lines().map_while(Result::ok) {
                    if writeln!(writer, "{line}").is_err() {
                        break;
                    }
                }
            });
        }
    });

    Ok(addr)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("esox_connectionpool=debug").init();

    println!("=== EsoxSolutions.ConnectionPool - TCP Example ===\n");

    let addr = spawn_echo_server()?;
    let registry = Registry::new();
    let metrics = PrometheusMetrics::register(&registry, "echo_pool")?;

    let pool = Arc::new(Pool::new(
        PoolOptions::<TcpStream>::new()
            .with_connect(move || {
                let stream = TcpStream::connect(addr)?;
                stream.set_read_timeout(Some(Duration::from_secs(1)))?;
                Ok(stream)
            })
            .with_health_check(|stream| matches!(stream.take_error(), Ok(None)))
            .with_connections(4)
            .with_probe_interval(Duration::from_millis(100))
            .with_metrics(Arc::new(metrics)),
    )?);

    println!("1. Exclusive request/response on pooled streams:");
    let mut workers = Vec::new();
    for i in 0..4 {
        let pool = Arc::clone(&pool);
        workers.push(thread::spawn(move || -> io::Result<()> {
            let Some(stream) = pool.ex_next() else {
                println!("   Worker {i}: pool exhausted");
                return Ok(());
            };
            writeln!(&*stream, "hello from worker {i}")?;
            let mut reply = String::new();
            BufReader::new(&*stream).read_line(&mut reply)?;
            println!("   Worker {i} got: {}", reply.trim_end());
            pool.return_connection(stream)
                .map_err(|e| io::Error::other(e.to_string()))
        }));
    }
    for worker in workers {
        if let Ok(Err(e)) = worker.join() {
            println!("   Worker failed: {e}");
        }
    }
    println!();

    println!("2. Metrics:");
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    print!("{}", String::from_utf8(buffer)?);

    pool.close();
    Ok(())
}
