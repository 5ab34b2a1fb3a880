use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use crate::{EsiError, EsiResult};

const CONFIRMATION_PAGE: &str = "<html><body>You can close this now.</body></html>";
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// One-shot local redirect listener: accepts exactly one connection, pulls
/// the `code=` query parameter out of the request target, answers with a
/// static confirmation page and shuts down. The listener is gone once this
/// returns.
pub(crate) async fn await_redirect(port: u16) -> EsiResult<String> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    log::debug!("waiting for SSO redirect on 127.0.0.1:{port}");

    let (mut stream, peer) = listener.accept().await?;
    log::debug!("redirect connection from {peer}");

    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..read]);
        if head.windows(4).any(|window| window == b"\r\n\r\n") || head.len() > MAX_HEAD_BYTES {
            break;
        }
    }

    let head = String::from_utf8_lossy(&head);
    let target = request_target(&head);
    let code = target.and_then(extract_code);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        CONFIRMATION_PAGE.len(),
        CONFIRMATION_PAGE
    );
    stream.write_all(response.as_bytes()).await?;
    let _ = stream.shutdown().await;

    code.ok_or(EsiError::MissingCode)
}

fn request_target(head: &str) -> Option<&str> {
    head.lines().next()?.split_whitespace().nth(1)
}

/// `code=` up to the next `&` or end of the target.
fn extract_code(target: &str) -> Option<String> {
    let start = target.find("code=")? + "code=".len();
    let rest = &target[start..];
    let end = rest.find('&').unwrap_or(rest.len());
    Some(rest[..end].to_owned())
}
