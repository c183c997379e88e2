use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("mock Cloudflare API at http://{addr}/client/v4/");
    mock_server::run_app(listener, mock_server::app_with_zones(&["example.com", "example.org"])).await
}
