#[tokio::main]
async fn main() {
    premios::start_server().await;
}
