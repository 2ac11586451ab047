use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;

/// Address from `MOCK_SERVER_ADDR`, else loopback on `PORT` (default 3000).
fn listen_addr() -> SocketAddr {
    if let Some(addr) = std::env::var("MOCK_SERVER_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        return addr;
    }
    let port = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(listen_addr()).await?;
    let addr = listener.local_addr()?;
    for route in ["/echo", "/status/{code}", "/delay/{ms}", "/secure", "/tasks"] {
        println!("http://{addr}{route}");
    }
    mock_server::run(listener).await
}
