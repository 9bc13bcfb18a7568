use super::guard::current_user;
use crate::events::ChangeFeed;
use actix_web::web::Bytes;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use futures_util::stream;
use tokio::sync::broadcast::error::RecvError;

fn sse_frame(event: &str, data: &str) -> Bytes {
    Bytes::from(format!("event: {event}\ndata: {data}\n\n"))
}

/// Server-sent events berisi perubahan data. Klien cukup memuat ulang tabel
/// yang disebut di event; event `resync` berarti sebagian event terlewat.
#[utoipa::path(
    get,
    path = "/admin/events",
    tag = "admin",
    params(("access_token" = Option<String>, Query, description = "Token akses bila header tidak bisa dikirim")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Aliran event perubahan", content_type = "text/event-stream"))
)]
pub async fn change_events(feed: web::Data<ChangeFeed>, req: HttpRequest) -> Result<HttpResponse> {
    if let Err(e) = current_user(&req) {
        return Ok(e.error_response());
    }
    let rx = feed.subscribe();
    let body = stream::unfold(rx, |mut rx| async move {
        let frame = match rx.recv().await {
            Ok(event) => sse_frame("change", &serde_json::to_string(&event).unwrap_or_default()),
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("SSE subscriber lagged, skipped {skipped} events");
                sse_frame("resync", "{}")
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok::<_, actix_web::Error>(frame), rx))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body))
}

pub fn events_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/events", web::get().to(change_events));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_frame_format() {
        let frame = sse_frame("change", r#"{"table":"students"}"#);
        assert_eq!(
            frame,
            Bytes::from_static(b"event: change\ndata: {\"table\":\"students\"}\n\n")
        );
    }
}
