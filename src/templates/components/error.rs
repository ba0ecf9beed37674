use crate::errors::ServerError;
use astra::{Body, Response, ResponseBuilder};
use maud::{html, DOCTYPE};

/// Convert a ServerError into an HTML error page.
pub fn html_error_response(err: ServerError) -> Response {
    let status = err.status();
    let message = match &err {
        ServerError::NotFound => "Không tìm thấy trang".to_string(),
        ServerError::InternalError => "Lỗi hệ thống".to_string(),
        other => other.to_string(),
    };
    if status >= 500 {
        tracing::error!(status, error = %err, "request failed");
    }

    let page = html! {
        (DOCTYPE)
        html lang="vi" {
            head {
                meta charset="utf-8";
                title { "Lỗi " (status) }
            }
            body style="font-family: system-ui, sans-serif; max-width: 720px; margin: 4rem auto; padding: 1rem;" {
                h1 { "Lỗi " (status) }
                p style="color: #444;" { (message) }
                p { a href="/" { "← Về trang chủ" } }
            }
        }
    };

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(Body::from(page.into_string()))
        .unwrap_or_else(|_| Response::new(Body::from("Internal Server Error")))
}
