use fluent_http::fetch;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let url = std::env::args().nth(1).unwrap_or_else(|| "https://httpbin.org/json".to_string());
    let response = fetch(Url::parse(&url)?).await?;

    println!("{} {}", response.status(), response.content_type());
    if let Some(request) = response.to_original_request() {
        println!("requested: {} {}", request.method(), request.url());
    }

    // Fails with the expected and actual status when the server does not answer 2xx
    let response = response.assert_2xx()?;
    println!("{}", response.formatted_text().await);

    Ok(())
}
