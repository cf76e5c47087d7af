use url::Url;

use crate::errors::Result;
use crate::net::Response;

// Executes a prepared request and hands back a streaming response. The request is cloned up front
// (when its body allows it) so callers can inspect what was actually sent.
pub async fn send(client: &reqwest::Client, request: reqwest::Request) -> Result<Response> {
    let original = request.try_clone();
    let method = request.method().clone();
    let url = request.url().clone();

    let res = client.execute(request).await?;
    log::debug!("{method} {url} -> {}", res.status());

    Ok(Response::from_reqwest(res, original))
}

// Loads an URL with a one-off client. The body is not read yet
pub async fn fetch(url: Url) -> Result<Response> {
    let client = reqwest::Client::new();
    let request = client.get(url).build()?;
    send(&client, request).await
}
